//! Media identity, color parsing and text measurement.

pub mod color;
pub mod source;
pub mod text;
