//! Data sets, batch options, the orchestrating service and its report.

pub mod data_set;
pub mod options;
pub mod report;
pub mod service;
