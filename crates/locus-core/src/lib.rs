//! Locus Core - Per-key asynchronous mutual exclusion
//!
//! This crate provides:
//! - `KeyedMutex`: FIFO-fair mutual exclusion scoped to a single key
//! - `KeyedMutexGuard`: release-on-drop handle for the critical section

pub mod keyed_mutex;

// Re-export commonly used types
pub use keyed_mutex::{KeyedMutex, KeyedMutexGuard};
