//! Application layer - orchestration of domain logic.
//!
//! This layer coordinates the domain types and manages the runtime behavior:
//! - Deduplicating cache (classification, recording, eviction)
//! - Producer-facing logger (emission and shutdown flush)
//! - Metrics
//!
//! ## Ports
//!
//! The application layer defines ports (traits) that infrastructure
//! adapters must implement. This keeps the application layer independent
//! from infrastructure details.

pub mod cache;
pub mod logger;
pub mod metrics;
pub mod ports;
