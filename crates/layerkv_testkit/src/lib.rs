//! # layerkv Testkit
//!
//! Test utilities for layerkv.
//!
//! This crate provides:
//! - Test fixtures and store helpers
//! - A failure-injecting storage backend and crash recovery scenarios
//! - Property-based test generators using proptest
//! - A reference model for model-based testing
//! - Stress testing utilities
//!
//! ## Usage
//!
//! ```rust
//! use layerkv_testkit::prelude::*;
//!
//! let (mut test_store, backend) = TestStore::failing();
//! test_store.begin();
//! test_store.set("k", 1).unwrap();
//!
//! backend.fail_next_persist();
//! assert!(test_store.commit().is_err());
//! assert_eq!(test_store.depth(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod crash;
pub mod fixtures;
pub mod generators;
pub mod model;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::crash::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::model::*;
    pub use crate::stress::*;
}

pub use crash::*;
pub use fixtures::*;
pub use generators::*;
pub use model::*;
pub use stress::*;
