//! Shared test support

pub mod fixtures;
pub mod helpers;
