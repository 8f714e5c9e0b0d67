//! Shared types for LEI entity resolution.

pub mod config;
pub mod error;
pub mod load;
pub mod record;
pub mod result;
pub mod schema;

pub use config::MatchConfig;
pub use error::{ConfigError, Result};
pub use load::{DuplicateKey, LoadReport};
pub use record::{FullRecord, RecordId, RecordRef, RecordStore, ReferenceTable, SlimRecord};
pub use result::{Alternative, Classification, MatchMethod, MatchResult, MatchedEntity, Query};
pub use schema::{LoadMode, LoadOptions, ReferenceField};
