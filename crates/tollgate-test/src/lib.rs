//! Tollgate Test - shared test utilities for the Tollgate runtime.
//!
//! Fixtures for capability tokens, contexts, and callables in each
//! permission category, plus logging and temp-dir helpers. Use it as a
//! dev-dependency:
//!
//! ```toml
//! [dev-dependencies]
//! tollgate-test.workspace = true
//! ```
//!
//! ```rust,ignore
//! use tollgate_capabilities::scope;
//! use tollgate_test::{test_context, test_validator, vetted_host_fn};
//!
//! #[test]
//! fn read_needs_file_read() {
//!     let read = vetted_host_fn("fs.read_text", "fs", &["FILE_READ"]).into();
//!     let validator = test_validator();
//!     assert!(validator.safe_call(&read, &[]).is_err());
//!     scope::with_context(test_context(&["FILE_READ"]), || {
//!         assert!(validator.safe_call(&read, &[]).is_ok());
//!     });
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod fixtures;
pub mod harness;

pub use fixtures::*;
pub use harness::*;
