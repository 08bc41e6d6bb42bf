//! Run configuration.
//!
//! A [`Config`] is threaded explicitly through every run instead of living in
//! process-wide state, so files with different settings can run in one
//! process. It can be written as YAML or TOML (see [`crate::loader`]).

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Settings for running test files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Replace each expectation with the actual output and write the file
    /// back instead of comparing (default: false).
    #[serde(default)]
    pub rewrite: bool,

    /// Print every directive that matched its expectation (default: false).
    #[serde(default)]
    pub verbose: bool,
}

impl Config {
    /// Overlay explicitly set flags. A flag that is `false` leaves the
    /// current value alone.
    pub fn with_overrides(mut self, rewrite: bool, verbose: bool) -> Self {
        self.rewrite |= rewrite;
        self.verbose |= verbose;
        self
    }
}

/// Generate the JSON Schema for config files.
pub fn generate_schema() -> schemars::schema::RootSchema {
    schemars::schema_for!(Config)
}
