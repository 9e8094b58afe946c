pub mod aggregate;
pub mod config;
#[cfg(feature = "runtime")]
pub mod db;
pub mod error;
pub mod history;
pub mod ingestion;
pub mod sanitize;
pub mod types;

pub use chemviz_parser::{RawRow, RawTable, SchemaError};
