//! # logtally-core
//!
//! Classifies timestamped service log lines as success or error and counts
//! them per service per hour.
//!
//! ## Pipeline
//!
//! For every line of every service:
//!
//! 1. [`timestamp::extract`] parses the line prefix; unparsable lines are skipped
//! 2. [`AnalysisRequest::in_window`] drops lines outside the requested window
//! 3. [`classify`] assigns exactly one [`Verdict`]
//! 4. [`Aggregator::update`] counts it in its `(service, hour)` bucket
//!
//! [`Report::build`] then reduces the buckets into per-service and global totals.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use logtally_core::{analyze_dir, AnalysisRequest, LogDirectory, LogType};
//!
//! let request = AnalysisRequest::new(start, end)?
//!     .with_log_type(LogType::Error)
//!     .with_error_filter("duplicate");
//! let analysis = analyze_dir(request, &LogDirectory::new("./logs", "log")).await?;
//! println!("{} errors", analysis.report.grand_total.error_count);
//! ```

pub mod aggregator;
pub mod classifier;
pub mod engine;
pub mod error;
pub mod report;
pub mod request;
pub mod source;
pub mod timestamp;

pub use aggregator::{percentage, Aggregator, BucketKey, BucketStats};
pub use classifier::{classify, Verdict};
pub use engine::{analyze, analyze_dir, analyze_lines, Analysis, RunStats, ServiceRun};
pub use error::{AnalysisError, RequestError, SourceError};
pub use report::{Report, ServiceReport, TypeShare};
pub use request::{AnalysisRequest, LogType};
pub use source::{LogDirectory, LogSource, LossyLines};
