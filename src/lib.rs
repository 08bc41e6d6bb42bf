//! Data-driven tests.
//!
//! A test file is a sequence of directives, each with optional input and the
//! output it is expected to produce:
//!
//! ```text
//! # A comment.
//! echo
//! hello
//! ----
//! hello
//! ```
//!
//! The caller supplies a handler that turns each [`TestData`] into actual
//! output. The engine compares that output with the recorded expectation or,
//! when [`Config::rewrite`] is set, rewrites the file with the actual output
//! in place of every expectation.
//!
//! ```
//! use datadriven::{run_root, run_test_from_string, Config};
//!
//! run_root("echo", |case| {
//!     let input = "echo\nhello\n----\nhello\n";
//!     run_test_from_string(case, input, &Config::default(), |_, d| Ok(d.input.clone()))
//! });
//! ```
//!
//! Directories of test files are run with [`walk`], which gives every file
//! its own case named after its path.

pub mod args;
pub mod case;
pub mod loader;
pub mod reader;
pub mod rewrite;
pub mod runner;
pub mod schema;
pub mod test_data;
pub mod walk;

pub use args::{CmdArg, Dest, ScanValue};
pub use case::{Abort, Case, Outcome, run_root};
pub use loader::{LoadError, config_from_env, load_config};
pub use runner::{run_test, run_test_from_string};
pub use schema::Config;
pub use test_data::TestData;
pub use walk::walk;
