//! Batch reporting module

pub mod report;

pub use report::{BatchReport, BatchTotals};
