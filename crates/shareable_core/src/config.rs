//! Capacity hints for batch containers.
//!
//! Values only size initial allocations; no behavior depends on them.

use serde::Deserialize;

const DEFAULT_EXPECTED_DESIGNATORS: usize = 32;
const DEFAULT_EXPECTED_BATCH: usize = 4;
const DEFAULT_EXPECTED_OUTPUT: usize = 16;

/// Expected container sizes for manager operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShareConfig {
    /// Designators per collection.
    pub expected_designators: usize,
    /// Rows per `add_data` batch.
    pub expected_batch: usize,
    /// Rows returned from one read.
    pub expected_output: usize,
}

impl Default for ShareConfig {
    fn default() -> Self {
        Self {
            expected_designators: DEFAULT_EXPECTED_DESIGNATORS,
            expected_batch: DEFAULT_EXPECTED_BATCH,
            expected_output: DEFAULT_EXPECTED_OUTPUT,
        }
    }
}

impl ShareConfig {
    /// Parses a JSON object; missing keys keep their defaults.
    pub fn from_json_str(value: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(value)
    }
}
