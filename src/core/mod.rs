//! Marker grammar and splice primitives.

pub mod marker;
pub mod segment;
pub mod splice;
