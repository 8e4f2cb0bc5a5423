//! Benchmark registry and the sequential runner.

use std::fmt;

use tracing::{debug, info};

use crate::error::{CaseError, HarnessError};
use crate::harness::try_measure;
use crate::probe::ProbeSet;
use crate::schema::{Category, ResultRecord, RunReport};
use crate::CategoryFilter;

pub type Operation = Box<dyn Fn() -> Result<i64, CaseError>>;

/// A named unit of work. Immutable once built.
pub struct BenchmarkCase {
    name: String,
    category: Category,
    pair: Option<String>,
    operation: Operation,
}

impl BenchmarkCase {
    pub fn new(
        name: impl Into<String>,
        category: Category,
        operation: impl Fn() -> Result<i64, CaseError> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            category,
            pair: None,
            operation: Box::new(operation),
        }
    }

    /// Tag the case with the key it shares with its counterpart.
    pub fn paired(mut self, key: impl Into<String>) -> Self {
        self.pair = Some(key.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn pair(&self) -> Option<&str> {
        self.pair.as_deref()
    }

    pub fn invoke(&self) -> Result<i64, CaseError> {
        (self.operation)()
    }
}

impl fmt::Debug for BenchmarkCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BenchmarkCase")
            .field("name", &self.name)
            .field("category", &self.category)
            .field("pair", &self.pair)
            .finish_non_exhaustive()
    }
}

/// Ordered set of cases with unique names.
#[derive(Debug, Default)]
pub struct Registry {
    cases: Vec<BenchmarkCase>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, case: BenchmarkCase) -> Result<(), HarnessError> {
        if self.cases.iter().any(|c| c.name == case.name) {
            return Err(HarnessError::DuplicateCase(case.name));
        }
        self.cases.push(case);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    pub fn cases(&self) -> &[BenchmarkCase] {
        &self.cases
    }

    /// Keep only the cases selected by `filter`, preserving order.
    pub fn retain(&mut self, filter: CategoryFilter) {
        self.cases.retain(|c| filter.matches(c.category));
    }

    pub fn run(&self, probes: &mut ProbeSet) -> Result<RunReport, HarnessError> {
        run_all(&self.cases, probes)
    }
}

/// Measure every case once, strictly in order.
///
/// The first failing case aborts the run; nothing is returned for the cases
/// that already completed.
pub fn run_all(cases: &[BenchmarkCase], probes: &mut ProbeSet) -> Result<RunReport, HarnessError> {
    let mut records = Vec::with_capacity(cases.len());

    for (index, case) in cases.iter().enumerate() {
        let sample = try_measure(probes, || case.invoke()).map_err(|source| {
            HarnessError::Operation {
                case: case.name.clone(),
                source,
            }
        })?;

        debug!(
            case = %case.name,
            elapsed_ms = sample.elapsed_ms,
            memory_delta_bytes = sample.memory_delta_bytes,
            energy_delta = ?sample.energy_delta,
            "measured"
        );

        records.push(ResultRecord {
            case_name: case.name.clone(),
            category: case.category,
            pair: case.pair.clone(),
            index,
            sample,
        });
    }

    info!(cases = records.len(), "run complete");
    Ok(RunReport { records })
}
