//! Utility functions.

pub mod safe_cast;
