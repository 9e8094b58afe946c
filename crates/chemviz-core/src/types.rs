use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A row after sanitization. Numeric fields are always finite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentRow {
    pub name: String,
    pub category: String,
    pub flowrate: f64,
    pub pressure: f64,
    pub temperature: f64,
}

/// A cell echoed back to the caller.
///
/// `Absent` is kept apart from `Number(0.0)` so a blank measurement is not
/// reported as a measured zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Text(String),
    Absent,
}

impl CellValue {
    pub fn is_absent(&self) -> bool {
        matches!(self, CellValue::Absent)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Text(value) => Some(value),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SanitizedRow {
    #[serde(skip)]
    pub equipment: EquipmentRow,
    #[serde(flatten)]
    pub cells: IndexMap<String, CellValue>,
}

impl SanitizedRow {
    pub fn cell(&self, column: &str) -> Option<&CellValue> {
        self.cells.get(column)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadSummary {
    pub total_count: usize,
    pub avg_flowrate: f64,
    pub avg_pressure: f64,
    pub avg_temperature: f64,
    /// Count per category, highest first; equal counts keep first-seen order.
    pub type_distribution: IndexMap<String, usize>,
}
