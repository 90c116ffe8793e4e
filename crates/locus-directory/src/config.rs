//! Runtime configuration for directory instances
//!
//! Injected at construction by the composition root; nothing here is read
//! from process-wide globals.

use serde::Deserialize;

use locus_common::DEFAULT_QUEUE_WARN_DEPTH;

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DirectoryConfig {
    /// Per-key wait-queue depth above which the directory logs a warning.
    pub queue_warn_depth: usize,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            queue_warn_depth: DEFAULT_QUEUE_WARN_DEPTH,
        }
    }
}
