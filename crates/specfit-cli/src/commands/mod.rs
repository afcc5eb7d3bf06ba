//! CLI command implementations.

pub mod common;
pub mod fit;
pub mod settings;
pub mod simulate;
