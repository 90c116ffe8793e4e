//! Locus Common - Shared types and constants
//!
//! This crate provides the foundational pieces used across all Locus
//! components:
//! - Error types
//! - Common constants

pub mod error;

// Re-exports for convenience
pub use error::LocusError;

/// Queue depth above which the per-key mutex logs a warning.
///
/// A directory key normally has at most a handful of waiters (one migration
/// plus the messages routed to the entity while it moves); a queue this deep
/// means a lock holder is stuck or a timeout was never configured.
pub const DEFAULT_QUEUE_WARN_DEPTH: usize = 100;
