use serde::{Deserialize, Serialize};

/// Whether a case is written with closures or with plain functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    Lambda,
    NonLambda,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Lambda => "lambda",
            Category::NonLambda => "non-lambda",
        }
    }
}

/// Time, memory and energy captured around one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MeasurementSample {
    /// Never negative.
    pub elapsed_ms: f64,
    /// End minus start; negative when more was freed than allocated.
    pub memory_delta_bytes: i64,
    /// Raw counter delta in probe units, unclamped. `None` when no reading was possible.
    pub energy_delta: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultRecord {
    pub case_name: String,
    pub category: Category,
    /// Pair key shared by a lambda case and its plain counterpart.
    pub pair: Option<String>,
    /// Position in the run, starting at 0.
    pub index: usize,
    pub sample: MeasurementSample,
}

/// One complete pass over the registry, in registration order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    pub records: Vec<ResultRecord>,
}

impl RunReport {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMeta {
    pub schema_version: u32,
    pub bench_version: String,
    pub profile: String,
    pub range: i64,
    pub memory_probe: String,
    pub energy_probe: Option<String>,
    pub timestamp_utc: String,
    pub git_sha: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteReport {
    pub run: RunMeta,
    pub runs: Vec<RunReport>,
}
