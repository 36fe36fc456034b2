//! Content store
//!
//! Orchestrates path mapping, backend I/O and model construction.

pub mod store;

pub use store::ContentStore;
