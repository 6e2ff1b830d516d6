use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::RequestError;

/// Which verdicts an analysis counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogType {
    Success,
    Error,
    #[default]
    Both,
}

impl LogType {
    pub fn includes_success(self) -> bool {
        matches!(self, LogType::Success | LogType::Both)
    }

    pub fn includes_error(self) -> bool {
        matches!(self, LogType::Error | LogType::Both)
    }
}

/// Resolved parameters for one analysis run. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisRequest {
    start: NaiveDateTime,
    end: NaiveDateTime,
    include_success: bool,
    include_error: bool,
    success_filter: Option<String>,
    error_filter: Option<String>,
}

impl AnalysisRequest {
    /// Window `[start, end]`, counting both successes and errors, no filters.
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self, RequestError> {
        if start > end {
            return Err(RequestError::InvertedWindow { start, end });
        }
        Ok(Self {
            start,
            end,
            include_success: true,
            include_error: true,
            success_filter: None,
            error_filter: None,
        })
    }

    /// Window covering the `hours` hours up to and including `end`.
    ///
    /// Fails when the start would fall outside the representable date range.
    pub fn last_hours(end: NaiveDateTime, hours: u32) -> Result<Self, RequestError> {
        let start = Duration::try_hours(i64::from(hours))
            .and_then(|span| end.checked_sub_signed(span))
            .ok_or(RequestError::WindowOutOfRange { end, hours })?;
        Self::new(start, end)
    }

    pub fn with_log_type(mut self, log_type: LogType) -> Self {
        self.include_success = log_type.includes_success();
        self.include_error = log_type.includes_error();
        self
    }

    /// Only count successes whose reason tag contains `filter` (case-insensitive).
    /// An empty filter counts every success.
    pub fn with_success_filter(mut self, filter: impl Into<String>) -> Self {
        self.success_filter = normalize_filter(filter.into());
        self
    }

    /// Only count errors whose reason tag contains `filter` (case-insensitive).
    /// An empty filter counts every error.
    pub fn with_error_filter(mut self, filter: impl Into<String>) -> Self {
        self.error_filter = normalize_filter(filter.into());
        self
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn end(&self) -> NaiveDateTime {
        self.end
    }

    pub fn include_success(&self) -> bool {
        self.include_success
    }

    pub fn include_error(&self) -> bool {
        self.include_error
    }

    pub fn success_filter(&self) -> Option<&str> {
        self.success_filter.as_deref()
    }

    pub fn error_filter(&self) -> Option<&str> {
        self.error_filter.as_deref()
    }

    /// Inclusive on both ends.
    pub fn in_window(&self, ts: &NaiveDateTime) -> bool {
        self.start <= *ts && *ts <= self.end
    }

    pub(crate) fn counts_success(&self, tag: &str) -> bool {
        self.include_success && tag_matches(self.success_filter.as_deref(), tag)
    }

    pub(crate) fn counts_error(&self, tag: &str) -> bool {
        self.include_error && tag_matches(self.error_filter.as_deref(), tag)
    }
}

fn normalize_filter(filter: String) -> Option<String> {
    let trimmed = filter.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Filters are stored lowercased.
fn tag_matches(filter: Option<&str>, tag: &str) -> bool {
    match filter {
        Some(needle) => tag.to_lowercase().contains(needle),
        None => true,
    }
}
