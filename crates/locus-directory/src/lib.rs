//! Locus Directory - Entity location resolution
//!
//! This crate provides:
//! - Key to host-address resolution for migrating entities
//! - The migration lock protocol (lock tickets with timeout liveness)
//! - Per-kind directory instances behind a lazily populated registry
//! - Payload handlers wired through an explicit registration table

pub mod config;
pub mod directory;
pub mod handler;
pub mod model;
pub mod registry;

// Re-export commonly used types
pub use config::DirectoryConfig;
pub use directory::LocationDirectory;
pub use handler::{HandlerRegistry, PayloadHandler, register_handlers};
pub use model::{Address, LocationKind, Payload};
pub use registry::DirectoryRegistry;
