use crate::errors::SchemaError;

pub const NAME_COLUMN: &str = "Equipment Name";
pub const TYPE_COLUMN: &str = "Type";
pub const FLOWRATE_COLUMN: &str = "Flowrate";
pub const PRESSURE_COLUMN: &str = "Pressure";
pub const TEMPERATURE_COLUMN: &str = "Temperature";

pub const REQUIRED_COLUMNS: [&str; 5] = [
    NAME_COLUMN,
    TYPE_COLUMN,
    FLOWRATE_COLUMN,
    PRESSURE_COLUMN,
    TEMPERATURE_COLUMN,
];

pub const NUMERIC_COLUMNS: [&str; 3] = [FLOWRATE_COLUMN, PRESSURE_COLUMN, TEMPERATURE_COLUMN];

#[derive(Debug, Clone, Copy)]
pub struct SchemaValidator {
    required: &'static [&'static str],
}

impl Default for SchemaValidator {
    fn default() -> Self {
        Self {
            required: &REQUIRED_COLUMNS,
        }
    }
}

impl SchemaValidator {
    pub fn new(required: &'static [&'static str]) -> Self {
        Self { required }
    }

    pub fn required(&self) -> &'static [&'static str] {
        self.required
    }

    /// Checks `headers` (already trimmed) against the required set.
    ///
    /// Missing columns are reported in the order of the required set, not the
    /// order they were looked up, so the message is stable for a given upload.
    pub fn validate<'a>(&self, headers: &'a [String]) -> Result<&'a [String], SchemaError> {
        let missing: Vec<&'static str> = self
            .required
            .iter()
            .copied()
            .filter(|required| !headers.iter().any(|header| header == required))
            .collect();

        if missing.is_empty() {
            Ok(headers)
        } else {
            Err(SchemaError::new(missing))
        }
    }
}
