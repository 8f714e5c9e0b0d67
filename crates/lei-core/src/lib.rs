//! LEI resolution sessions.
//!
//! Typical use:
//!
//! ```no_run
//! use lei_core::load_reference;
//! use lei_model::{LoadMode, MatchConfig};
//!
//! let session = load_reference("golden-copy.csv", LoadMode::Slim)?;
//! let report = session.resolve_batch(&["ACME CORP. LTD".to_string()], &MatchConfig::default())?;
//! println!("{:?}", report.results[0].lei);
//! session.release();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod batch;
pub mod error;
pub mod session;

pub use batch::{
    BatchControl, BatchReport, CancellationToken, ProgressObserver, isolate, malformed_reason,
    resolve_isolated,
};
pub use error::{CoreError, Result};
pub use session::{Session, SessionOptions, load_reference};
