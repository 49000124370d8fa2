//! Core domain types shared by the splitter and combiner.

pub mod errors;
pub mod model;
