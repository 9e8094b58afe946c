use std::collections::HashMap;

use indexmap::IndexMap;
use polars::prelude::*;

use crate::types::{EquipmentRow, UploadSummary};

pub const NAME: &str = "name";
pub const CATEGORY: &str = "category";
pub const FLOWRATE: &str = "flowrate";
pub const PRESSURE: &str = "pressure";
pub const TEMPERATURE: &str = "temperature";

/// Computes the upload summary over sanitized rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct Aggregator;

impl Aggregator {
    pub fn summarize<'a, I>(&self, rows: I) -> PolarsResult<UploadSummary>
    where
        I: IntoIterator<Item = &'a EquipmentRow>,
    {
        let rows: Vec<&EquipmentRow> = rows.into_iter().collect();
        let df = build_equipment_frame(&rows)?;

        Ok(UploadSummary {
            total_count: df.height(),
            avg_flowrate: column_mean(&df, FLOWRATE)?,
            avg_pressure: column_mean(&df, PRESSURE)?,
            avg_temperature: column_mean(&df, TEMPERATURE)?,
            type_distribution: type_distribution(&df)?,
        })
    }
}

pub fn build_equipment_frame(rows: &[&EquipmentRow]) -> PolarsResult<DataFrame> {
    let names: Vec<&str> = rows.iter().map(|row| row.name.as_str()).collect();
    let categories: Vec<&str> = rows.iter().map(|row| row.category.as_str()).collect();
    let flowrate: Vec<f64> = rows.iter().map(|row| row.flowrate).collect();
    let pressure: Vec<f64> = rows.iter().map(|row| row.pressure).collect();
    let temperature: Vec<f64> = rows.iter().map(|row| row.temperature).collect();

    DataFrame::new(vec![
        Series::new(NAME.into(), names).into(),
        Series::new(CATEGORY.into(), categories).into(),
        Series::new(FLOWRATE.into(), flowrate).into(),
        Series::new(PRESSURE.into(), pressure).into(),
        Series::new(TEMPERATURE.into(), temperature).into(),
    ])
}

/// Mean of a measurement column rounded to two decimals; zero for an empty
/// frame.
fn column_mean(df: &DataFrame, column: &str) -> PolarsResult<f64> {
    let mean = df.column(column)?.f64()?.mean().unwrap_or(0.0);
    Ok(round_to_cents(mean))
}

fn type_distribution(df: &DataFrame) -> PolarsResult<IndexMap<String, usize>> {
    let categories = df.column(CATEGORY)?.str()?;

    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for category in categories.iter() {
        let category = category.unwrap_or_default();
        let count = counts.entry(category).or_insert_with(|| {
            order.push(category);
            0
        });
        *count += 1;
    }

    let mut entries: Vec<(&str, usize)> = order
        .into_iter()
        .map(|category| (category, counts[category]))
        .collect();
    // stable: equal counts stay in first-seen order
    entries.sort_by(|a, b| b.1.cmp(&a.1));

    Ok(entries
        .into_iter()
        .map(|(category, count)| (category.to_string(), count))
        .collect())
}

/// Rounds half away from zero to two decimal places.
pub fn round_to_cents(value: f64) -> f64 {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}
