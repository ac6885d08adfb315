//! Run results: progress aggregation and the final report

pub mod aggregator;
pub mod report;

pub use aggregator::ResultAggregator;
pub use report::RunReport;
