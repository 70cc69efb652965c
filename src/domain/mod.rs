//! Domain layer - pure types with no knowledge of locking, clocks or sinks.
//!
//! This layer contains the core concepts of message deduplication:
//! - Occurrence histories
//! - Eviction summaries and their rendering
//! - Cache configuration and its validation

pub mod config;
pub mod history;
pub mod summary;
