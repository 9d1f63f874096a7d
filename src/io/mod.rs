//! Model and motion readers/writers, and the batch configuration file.

pub mod config;
pub mod json;
