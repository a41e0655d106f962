//! # Utilities
//!
//! Support code that is not part of the optimizer core itself.

pub mod serialization;
