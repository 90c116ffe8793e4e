//! Per-kind directory registry
//!
//! Lazily creates one [`LocationDirectory`] per [`LocationKind`] and retains
//! it for the life of the process. Kinds share nothing; the registry is only
//! a lookup table. It is held and passed explicitly by the composition root
//! rather than reached through a global accessor.

use std::sync::Arc;

use dashmap::DashMap;

use crate::{
    config::DirectoryConfig,
    directory::LocationDirectory,
    model::LocationKind,
};

pub struct DirectoryRegistry {
    config: DirectoryConfig,
    directories: DashMap<LocationKind, Arc<LocationDirectory>>,
}

impl DirectoryRegistry {
    pub fn new(config: DirectoryConfig) -> Self {
        Self {
            config,
            directories: DashMap::new(),
        }
    }

    /// Directory for `kind`, created on first use.
    pub fn directory(&self, kind: LocationKind) -> Arc<LocationDirectory> {
        self.directories
            .entry(kind)
            .or_insert_with(|| Arc::new(LocationDirectory::new(kind, &self.config)))
            .clone()
    }

    /// Kinds that have been instantiated so far.
    pub fn kinds(&self) -> Vec<LocationKind> {
        self.directories.iter().map(|entry| *entry.key()).collect()
    }
}

impl Default for DirectoryRegistry {
    fn default() -> Self {
        Self::new(DirectoryConfig::default())
    }
}
