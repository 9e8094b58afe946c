use std::collections::{HashMap, HashSet};

use csv::{ReaderBuilder, StringRecord};

use crate::errors::ParserError;
use crate::model::{RawRow, RawTable};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Parses an uploaded CSV file into a [`RawTable`].
///
/// The first record is the header row. Headers are trimmed and duplicates are
/// renamed (`Type`, `Type.1`, ...). Rows shorter than the header are padded
/// with absent cells; rows carrying extra non-empty fields are rejected.
pub fn parse_equipment_csv(content: &[u8]) -> Result<RawTable, ParserError> {
    let content = content.strip_prefix(UTF8_BOM).unwrap_or(content);

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content);

    let mut records = reader.records();

    let header_record = records.next().ok_or(ParserError::EmptyInput)??;
    let headers = normalize_headers(header_record.iter());
    if headers.iter().all(|header| header.is_empty()) {
        return Err(ParserError::EmptyInput);
    }

    let mut rows = Vec::new();
    for record in records {
        let record = record?;
        rows.push(build_row(&headers, &record)?);
    }

    Ok(RawTable::new(headers, rows))
}

/// Trims surrounding whitespace from each header and disambiguates repeats by
/// appending `.N` to later occurrences. A suffix is skipped when it would
/// collide with a header already in the file.
pub fn normalize_headers<'a>(raw: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let trimmed: Vec<String> = raw
        .into_iter()
        .map(|header| header.trim().to_string())
        .collect();
    let originals: HashSet<&str> = trimmed.iter().map(String::as_str).collect();

    let mut used: HashSet<String> = HashSet::with_capacity(trimmed.len());
    let mut suffixes: HashMap<&str, usize> = HashMap::new();
    let mut headers = Vec::with_capacity(trimmed.len());

    for header in &trimmed {
        let name = if used.contains(header) {
            let suffix = suffixes.entry(header.as_str()).or_insert(0);
            loop {
                *suffix += 1;
                let candidate = format!("{header}.{suffix}");
                if !used.contains(&candidate) && !originals.contains(candidate.as_str()) {
                    break candidate;
                }
            }
        } else {
            header.clone()
        };
        used.insert(name.clone());
        headers.push(name);
    }

    headers
}

fn build_row(headers: &[String], record: &StringRecord) -> Result<RawRow, ParserError> {
    if record.len() > headers.len() {
        let overflow = record
            .iter()
            .skip(headers.len())
            .any(|value| !value.trim().is_empty());
        if overflow {
            return Err(ParserError::DataRow {
                line_index: record.position().map(|pos| pos.line()).unwrap_or_default(),
                message: format!(
                    "expected {} fields, found {}",
                    headers.len(),
                    record.len()
                ),
            });
        }
    }

    let mut row = RawRow::with_capacity(headers.len());
    for (idx, header) in headers.iter().enumerate() {
        // only zero-length cells are absent; whitespace is kept as written
        let value = record
            .get(idx)
            .filter(|value| !value.is_empty())
            .map(str::to_string);
        row.insert(header.clone(), value);
    }

    Ok(row)
}
