//! # kvtxn testkit
//!
//! Test utilities for kvtxn.
//!
//! This crate provides:
//! - Store fixtures for both concurrency modes
//! - Property-based test generators using proptest
//! - A reference model of a single transaction's buffered state
//! - Multi-threaded contention runners
//!
//! ## Usage
//!
//! ```rust
//! use kvtxn_testkit::prelude::*;
//!
//! for_each_mode(|store| {
//!     let mut tx = store.pending().start();
//!     tx.put(b"k", b"v").unwrap();
//!     tx.commit().unwrap();
//!     assert_eq!(store.committed(b"k"), Some(b"v".to_vec()));
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod model;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::model::*;
    pub use crate::stress::*;
    pub use crate::init_test_logging;
}

pub use fixtures::*;
pub use generators::*;
pub use model::*;
pub use stress::*;

/// Installs a `tracing` subscriber for tests.
///
/// Output is filtered by `RUST_LOG` (default `warn`) and captured by the
/// test harness. Calling it more than once is harmless.
pub fn init_test_logging() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
