use chemviz_parser::schema::{
    FLOWRATE_COLUMN, NAME_COLUMN, NUMERIC_COLUMNS, PRESSURE_COLUMN, TEMPERATURE_COLUMN,
    TYPE_COLUMN,
};
use chemviz_parser::{RawRow, RawTable};
use indexmap::IndexMap;

use crate::types::{CellValue, EquipmentRow, SanitizedRow};

/// Coerces the measurement columns of every row to finite numbers.
///
/// Never fails and never drops a row. A cell that does not parse as a finite
/// `f64` becomes `0.0`.
#[derive(Debug, Clone, Copy)]
pub struct NumericSanitizer {
    numeric_columns: &'static [&'static str],
}

impl Default for NumericSanitizer {
    fn default() -> Self {
        Self {
            numeric_columns: &NUMERIC_COLUMNS,
        }
    }
}

impl NumericSanitizer {
    pub fn sanitize(&self, table: RawTable) -> Vec<SanitizedRow> {
        table
            .rows
            .into_iter()
            .map(|row| self.sanitize_row(row))
            .collect()
    }

    fn sanitize_row(&self, row: RawRow) -> SanitizedRow {
        let equipment = EquipmentRow {
            name: row.get(NAME_COLUMN).unwrap_or_default().to_string(),
            category: row.get(TYPE_COLUMN).unwrap_or_default().to_string(),
            flowrate: coerce_numeric(row.get(FLOWRATE_COLUMN)),
            pressure: coerce_numeric(row.get(PRESSURE_COLUMN)),
            temperature: coerce_numeric(row.get(TEMPERATURE_COLUMN)),
        };

        let mut cells = IndexMap::with_capacity(row.len());
        for (column, value) in row.iter() {
            let cell = match value {
                None => CellValue::Absent,
                Some(raw) if self.is_numeric(column) => {
                    CellValue::Number(coerce_numeric(Some(raw)))
                }
                Some(raw) => CellValue::Text(raw.to_string()),
            };
            cells.insert(column.to_string(), cell);
        }

        SanitizedRow { equipment, cells }
    }

    fn is_numeric(&self, column: &str) -> bool {
        self.numeric_columns.iter().any(|numeric| *numeric == column)
    }
}

/// Parses a measurement cell, substituting zero for absent, unparseable or
/// non-finite input.
pub fn coerce_numeric(raw: Option<&str>) -> f64 {
    raw.and_then(|value| value.trim().parse::<f64>().ok())
        .filter(|value| value.is_finite())
        .unwrap_or(0.0)
}
