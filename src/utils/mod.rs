pub mod formatter;

pub use formatter::{DiffFormatter, ResponseFormat, ResponseFormatter};
