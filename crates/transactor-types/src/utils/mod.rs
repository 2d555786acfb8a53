//! Utility functions for formatting and unit conversion.

pub mod formatting;

pub use formatting::{parse_gwei, truncate_id, with_0x_prefix, without_0x_prefix};
