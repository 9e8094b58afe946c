pub mod errors;
pub mod model;
mod reader;
pub mod schema;

pub use errors::{ParserError, SchemaError};
pub use model::{RawRow, RawTable};
pub use reader::{normalize_headers, parse_equipment_csv};
pub use schema::{SchemaValidator, NUMERIC_COLUMNS, REQUIRED_COLUMNS};
