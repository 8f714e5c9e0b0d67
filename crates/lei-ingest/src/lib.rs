//! Reference dataset loading and batch input reading.

pub mod error;
pub mod input;
pub mod reference;

pub use error::{InputError, LoadError, Result};
pub use input::{InputColumns, read_csv_queries, read_queries, read_text_queries};
pub use reference::{load_reference, load_reference_from_reader};
