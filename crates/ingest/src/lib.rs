//! Delimited-text I/O for imputation data sets.
//!
//! Files carry two header rows (feature names, then type tags `i`/`d`/`c`)
//! followed by one record per row. A blank field is a missing value.

pub mod error;
pub mod reader;
pub mod writer;

pub use error::{IngestError, Result};
pub use reader::{parse_dataset, read_dataset};
pub use writer::{write_dataset, write_to};
