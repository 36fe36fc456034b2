//! Path handling
//!
//! Maps the caller-visible namespace onto the private and shared roots.

pub mod hidden;
pub mod mapper;

pub use hidden::{HIDDEN_MARKER, is_hidden_name, is_hidden_remainder};
pub use mapper::{PathMapper, PhysicalRoot, SHARED_PREFIX, base_name, normalize};
