pub mod app;
pub mod cli;
pub mod domain;
pub mod infra;

pub use app::combine::{CombineOutput, combine, combine_files};
pub use app::split::{SplitOutput, split, split_file};
pub use domain::model::{DocumentationMap, Mismatch};
