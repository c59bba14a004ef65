//! JSON resource inputs.

pub mod json_ranges;
pub mod key_set;
