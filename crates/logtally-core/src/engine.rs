//! Drives lines through extraction, windowing, classification and
//! aggregation, one service at a time.
//!
//! Each service gets a private [`Aggregator`]; results are merged once the
//! service has been read completely. A service that fails to read contributes
//! nothing to the report and is listed in [`Analysis::failures`] instead.

use std::io;
use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::aggregator::Aggregator;
use crate::classifier::{classify, Verdict};
use crate::error::{AnalysisError, SourceError};
use crate::report::Report;
use crate::request::AnalysisRequest;
use crate::source::{LogDirectory, LogSource};
use crate::timestamp::extract;

/// Line accounting for one service, or summed over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub lines_read: u64,
    /// No parsable timestamp prefix.
    pub unparsable: u64,
    pub out_of_window: u64,
    /// Classified as neither success nor error.
    pub unclassified: u64,
    /// Classified but excluded by type selection or filters.
    pub filtered: u64,
    pub counted: u64,
}

impl RunStats {
    pub fn absorb(&mut self, other: &RunStats) {
        self.lines_read += other.lines_read;
        self.unparsable += other.unparsable;
        self.out_of_window += other.out_of_window;
        self.unclassified += other.unclassified;
        self.filtered += other.filtered;
        self.counted += other.counted;
    }
}

/// Result of reading one service to the end.
#[derive(Debug, Clone, Default)]
pub struct ServiceRun {
    pub aggregator: Aggregator,
    pub stats: RunStats,
}

/// Outcome of a whole run.
#[derive(Debug, Serialize)]
pub struct Analysis {
    pub report: Report,
    pub stats: RunStats,
    #[serde(serialize_with = "serialize_failures")]
    pub failures: Vec<SourceError>,
}

fn serialize_failures<S: serde::Serializer>(
    failures: &[SourceError],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(failures.iter().map(|f| f.to_string()))
}

/// Process one service's lines.
pub fn analyze_lines<I>(
    service: &str,
    lines: I,
    request: &AnalysisRequest,
) -> Result<ServiceRun, SourceError>
where
    I: IntoIterator<Item = io::Result<String>>,
{
    let mut run = ServiceRun::default();

    for line in lines {
        let line = line.map_err(|source| SourceError::Read {
            service: service.to_string(),
            lines: run.stats.lines_read,
            source,
        })?;
        run.stats.lines_read += 1;

        let Some(ts) = extract(&line) else {
            run.stats.unparsable += 1;
            continue;
        };

        if !request.in_window(&ts) {
            run.stats.out_of_window += 1;
            continue;
        }

        let verdict = classify(&line);
        if verdict == Verdict::Neither {
            run.stats.unclassified += 1;
            continue;
        }

        if run.aggregator.update(service, &ts, &verdict, request) {
            run.stats.counted += 1;
        } else {
            run.stats.filtered += 1;
        }
    }

    info!(
        service = %service,
        lines = run.stats.lines_read,
        counted = run.stats.counted,
        unparsable = run.stats.unparsable,
        out_of_window = run.stats.out_of_window,
        "Processed service"
    );

    Ok(run)
}

/// Process every `(service, lines)` pair in turn.
pub fn analyze<S, I>(request: &AnalysisRequest, sources: S) -> Analysis
where
    S: IntoIterator<Item = (String, I)>,
    I: IntoIterator<Item = io::Result<String>>,
{
    let mut collector = Collector::default();
    for (service, lines) in sources {
        collector.accept(analyze_lines(&service, lines, request));
    }
    collector.finish()
}

/// Process every file in `dir`, one blocking worker per service.
pub async fn analyze_dir(
    request: AnalysisRequest,
    dir: &LogDirectory,
) -> Result<Analysis, AnalysisError> {
    let sources = dir.scan()?;
    info!(
        dir = ?dir.dir(),
        services = sources.len(),
        start = %request.start(),
        end = %request.end(),
        "Analyzing logs"
    );

    let request = Arc::new(request);
    let handles: Vec<_> = sources
        .into_iter()
        .map(|source| {
            let request = Arc::clone(&request);
            let service = source.service.clone();
            let handle = tokio::task::spawn_blocking(move || analyze_source(&source, &request));
            (service, handle)
        })
        .collect();

    let mut collector = Collector::default();
    for (service, handle) in handles {
        let result = handle.await.unwrap_or_else(|e| {
            Err(SourceError::Worker {
                service,
                reason: e.to_string(),
            })
        });
        collector.accept(result);
    }

    Ok(collector.finish())
}

fn analyze_source(source: &LogSource, request: &AnalysisRequest) -> Result<ServiceRun, SourceError> {
    let lines = source.open()?;
    analyze_lines(&source.service, lines, request)
}

/// Merge point for per-service results.
#[derive(Default)]
struct Collector {
    aggregator: Aggregator,
    stats: RunStats,
    failures: Vec<SourceError>,
}

impl Collector {
    fn accept(&mut self, result: Result<ServiceRun, SourceError>) {
        match result {
            Ok(run) => {
                self.stats.absorb(&run.stats);
                self.aggregator.merge(run.aggregator);
            }
            Err(e) => {
                warn!(service = %e.service(), "Skipping service: {}", e);
                self.failures.push(e);
            }
        }
    }

    fn finish(self) -> Analysis {
        Analysis {
            report: Report::build(&self.aggregator),
            stats: self.stats,
            failures: self.failures,
        }
    }
}
