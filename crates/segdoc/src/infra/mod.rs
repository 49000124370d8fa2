//! Infrastructure adapters for parsing, configuration, and logging.

pub mod config;
pub mod literal;
pub mod logging;
pub mod python;
