//! CSV ingestion, mean imputation and train/test partitioning for bosque.

mod error;
mod reader;
mod table;

pub use error::IoError;
pub use reader::TableReader;
pub use table::{ImputationReport, Table};
