//! Rendering run reports and handing them to a sink.
//!
//! Every derived figure (MB, energy per millisecond, lambda/plain ratios) is
//! computed here; the samples themselves only hold raw readings.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use tracing::info;

use crate::error::HarnessError;
use crate::schema::{Category, MeasurementSample, ResultRecord, RunReport, SuiteReport};

const BYTES_PER_MB: f64 = 1_048_576.0;

/// Target of the events [`LogSink`] emits. Logging setup keeps it at `info`.
pub const REPORT_TARGET: &str = "lambda_cost_bench::report";

/// Energy per millisecond: the raw delta floored at 0, over elapsed time floored at 1 ms.
///
/// A negative counter delta (noise or wraparound) is reported as no measurable cost.
pub fn energy_metric(sample: &MeasurementSample) -> Option<f64> {
    sample
        .energy_delta
        .map(|delta| delta.max(0.0) / sample.elapsed_ms.max(1.0))
}

pub fn format_record(record: &ResultRecord) -> String {
    let sample = &record.sample;
    let mut line = format!(
        "{}: Execution Time: {:.4} ms  Memory: {:.4} MB",
        record.case_name,
        sample.elapsed_ms,
        sample.memory_delta_bytes as f64 / BYTES_PER_MB,
    );
    if let Some(metric) = energy_metric(sample) {
        line.push_str(&format!("  Battery/Energy: {metric:.4}"));
    }
    line
}

/// One line per record, each terminated by `\n`.
pub fn format(report: &RunReport) -> String {
    let mut out = String::new();
    for record in &report.records {
        out.push_str(&format_record(record));
        out.push('\n');
    }
    out
}

/// Several runs back to back, with a `Run i/n` header when there is more than one.
///
/// With `compare`, each run is followed by its lambda vs. plain table.
pub fn format_runs(runs: &[RunReport], compare: bool) -> String {
    let mut text = String::new();
    for (i, run) in runs.iter().enumerate() {
        if runs.len() > 1 {
            text.push_str(&format!("Run {}/{}\n", i + 1, runs.len()));
        }
        text.push_str(&format(run));
        if compare {
            text.push('\n');
            text.push_str(&format_pairs(&compare_pairs(run)));
        }
    }
    text
}

/// Destination for a finished, formatted report.
pub trait Sink {
    fn emit(&mut self, formatted: &str) -> Result<(), HarnessError>;
}

impl<F: FnMut(&str)> Sink for F {
    fn emit(&mut self, formatted: &str) -> Result<(), HarnessError> {
        self(formatted);
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl Sink for StdoutSink {
    fn emit(&mut self, formatted: &str) -> Result<(), HarnessError> {
        let mut out = io::stdout().lock();
        out.write_all(formatted.as_bytes())?;
        out.flush()?;
        Ok(())
    }
}

/// Emits each line as a `tracing` event.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl Sink for LogSink {
    fn emit(&mut self, formatted: &str) -> Result<(), HarnessError> {
        for line in formatted.lines() {
            info!(target: REPORT_TARGET, "{line}");
        }
        Ok(())
    }
}

/// Holds the most recently emitted report, replacing the previous one.
#[derive(Debug, Default, Clone)]
pub struct BufferSink {
    buffer: String,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contents(&self) -> &str {
        &self.buffer
    }
}

impl Sink for BufferSink {
    fn emit(&mut self, formatted: &str) -> Result<(), HarnessError> {
        self.buffer.clear();
        self.buffer.push_str(formatted);
        Ok(())
    }
}

/// A lambda case next to the plain case that shares its pair key.
#[derive(Debug, Clone, PartialEq)]
pub struct PairComparison {
    pub pair: String,
    pub lambda_case: String,
    pub plain_case: String,
    pub lambda_ms: f64,
    pub plain_ms: f64,
    pub lambda_memory_bytes: i64,
    pub plain_memory_bytes: i64,
    /// `lambda_ms / plain_ms`; `None` when the plain case took no measurable time.
    pub time_ratio: Option<f64>,
}

/// Match each lambda record with the first plain record carrying the same pair key.
///
/// Output follows the order of the lambda records; unpaired records are skipped.
pub fn compare_pairs(report: &RunReport) -> Vec<PairComparison> {
    report
        .records
        .iter()
        .filter(|r| r.category == Category::Lambda)
        .filter_map(|lambda| {
            let key = lambda.pair.as_deref()?;
            let plain = report
                .records
                .iter()
                .find(|r| r.category == Category::NonLambda && r.pair.as_deref() == Some(key))?;

            let lambda_ms = lambda.sample.elapsed_ms;
            let plain_ms = plain.sample.elapsed_ms;
            Some(PairComparison {
                pair: key.to_string(),
                lambda_case: lambda.case_name.clone(),
                plain_case: plain.case_name.clone(),
                lambda_ms,
                plain_ms,
                lambda_memory_bytes: lambda.sample.memory_delta_bytes,
                plain_memory_bytes: plain.sample.memory_delta_bytes,
                time_ratio: (plain_ms > 0.0).then(|| lambda_ms / plain_ms),
            })
        })
        .collect()
}

pub fn format_pairs(pairs: &[PairComparison]) -> String {
    let width = pairs
        .iter()
        .map(|p| p.pair.len())
        .max()
        .unwrap_or(0)
        .max("pair".len());

    let mut out = format!(
        "{:<width$}  {:>12}  {:>12}  {:>8}\n",
        "pair", "lambda ms", "plain ms", "ratio"
    );
    for p in pairs {
        let ratio = p
            .time_ratio
            .map(|r| format!("{r:.4}"))
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!(
            "{:<width$}  {:>12.4}  {:>12.4}  {:>8}\n",
            p.pair, p.lambda_ms, p.plain_ms, ratio
        ));
    }
    out
}

pub fn write_json(path: &Path, report: &SuiteReport) -> Result<(), HarnessError> {
    let json = serde_json::to_string_pretty(report)?;
    fs::write(path, json)?;
    Ok(())
}
