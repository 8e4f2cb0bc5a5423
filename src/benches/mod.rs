//! Paired workloads: each idiom written once with closures and once without.
//!
//! Every workload sums over `1..=range` (default 10 000) so the two halves of a
//! pair return the same value and differ only in how the code is written.

use crate::error::{CaseError, HarnessError};
use crate::registry::{BenchmarkCase, Registry};
use crate::schema::Category;


pub const DEFAULT_RANGE: i64 = 10_000;

/// Multiplier used by the "instantiated function type" pair.
pub const INSTANTIATE_FACTOR: i64 = 3;

/// First value of the receiver-scoped pair's span.
pub const RECEIVER_START: i64 = 1;

/// Configuration every workload borrows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SuiteConfig {
    pub range: i64,
}

impl Default for SuiteConfig {
    fn default() -> Self {
        Self {
            range: DEFAULT_RANGE,
        }
    }
}

pub type Workload = fn(&SuiteConfig) -> Result<i64, CaseError>;

/// (pair key, display label, lambda workload, plain workload)
pub const PAIRS: [(&str, &str, Workload, Workload); 11] = [
    (
        "higher_order",
        "Higher-order function",
        lambda::higher_order,
        plain::higher_order,
    ),
    (
        "function_type",
        "Function types",
        lambda::function_type,
        plain::function_type,
    ),
    (
        "instantiated_function_type",
        "Instantiating function type",
        lambda::instantiated_function_type,
        plain::instantiated_function_type,
    ),
    (
        "invoked_function_type",
        "Invoking function type instance",
        lambda::invoked_function_type,
        plain::invoked_function_type,
    ),
    ("inline", "Inline function", lambda::inline, plain::inline),
    (
        "expression_syntax",
        "Lambda expression syntax",
        lambda::expression_syntax,
        plain::expression_syntax,
    ),
    (
        "trailing_closure",
        "Passing trailing lambda",
        lambda::trailing_closure,
        plain::trailing_closure,
    ),
    (
        "implicit_parameter",
        "It: implicit name of a single parameter",
        lambda::implicit_parameter,
        plain::implicit_parameter,
    ),
    (
        "returning_value",
        "Returning value from a lambda",
        lambda::returning_value,
        plain::returning_value,
    ),
    (
        "unused_parameter",
        "Underscore for unused variables",
        lambda::unused_parameter,
        plain::unused_parameter,
    ),
    (
        "receiver_scoped",
        "Function literals with receiver",
        lambda::receiver_scoped,
        plain::receiver_scoped,
    ),
];

/// Build the full registry: every lambda case in pair order, then every plain case.
pub fn suite(cfg: &SuiteConfig) -> Result<Registry, HarnessError> {
    let mut registry = Registry::new();

    for (category, suffix) in [
        (Category::Lambda, "with lambda"),
        (Category::NonLambda, "without lambda"),
    ] {
        for (key, label, lambda_fn, plain_fn) in PAIRS {
            let workload = match category {
                Category::Lambda => lambda_fn,
                Category::NonLambda => plain_fn,
            };
            let cfg = *cfg;
            let case = BenchmarkCase::new(format!("{label} {suffix}"), category, move || {
                workload(&cfg)
            })
            .paired(key);
            registry.register(case)?;
        }
    }

    Ok(registry)
}

pub(crate) fn overflow(what: &'static str) -> CaseError {
    CaseError::Overflow { what }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUM_TO_10K: i64 = 50_005_000;

    #[test]
    fn pairs_agree_on_default_range() {
        let cfg = SuiteConfig::default();
        for (key, _, lambda_fn, plain_fn) in PAIRS {
            let l = lambda_fn(&cfg).unwrap();
            let p = plain_fn(&cfg).unwrap();
            assert_eq!(l, p, "pair {key} disagrees");
        }
    }

    #[test]
    fn pairs_agree_across_ranges() {
        for range in [1, 2, 17, 1_000, 12_345] {
            let cfg = SuiteConfig { range };
            for (key, _, lambda_fn, plain_fn) in PAIRS {
                assert_eq!(
                    lambda_fn(&cfg).unwrap(),
                    plain_fn(&cfg).unwrap(),
                    "pair {key} disagrees at range {range}"
                );
            }
        }
    }

    #[test]
    fn known_values_at_default_range() {
        let cfg = SuiteConfig::default();
        assert_eq!(plain::higher_order(&cfg).unwrap(), SUM_TO_10K);
        assert_eq!(plain::function_type(&cfg).unwrap(), SUM_TO_10K);
        assert_eq!(
            plain::instantiated_function_type(&cfg).unwrap(),
            SUM_TO_10K * INSTANTIATE_FACTOR
        );
        assert_eq!(
            plain::invoked_function_type(&cfg).unwrap(),
            2_500_500_025_000_000
        );
        assert_eq!(lambda::receiver_scoped(&cfg).unwrap(), SUM_TO_10K);
        assert_eq!(lambda::expression_syntax(&cfg).unwrap(), SUM_TO_10K);
    }

    #[test]
    fn empty_range_sums_to_zero() {
        let cfg = SuiteConfig { range: 0 };
        for (key, _, lambda_fn, plain_fn) in PAIRS {
            assert_eq!(lambda_fn(&cfg).unwrap(), 0, "lambda {key}");
            assert_eq!(plain_fn(&cfg).unwrap(), 0, "plain {key}");
        }
    }

    #[test]
    fn overflow_is_reported_not_wrapped() {
        let cfg = SuiteConfig { range: 100_000 };
        assert!(matches!(
            lambda::invoked_function_type(&cfg),
            Err(CaseError::Overflow { .. })
        ));
        assert!(matches!(
            plain::invoked_function_type(&cfg),
            Err(CaseError::Overflow { .. })
        ));
    }

    #[test]
    fn suite_registers_lambda_half_first() {
        let registry = suite(&SuiteConfig::default()).unwrap();
        assert_eq!(registry.len(), 22);

        let cases = registry.cases();
        assert!(cases[..11].iter().all(|c| c.category() == Category::Lambda));
        assert!(cases[11..].iter().all(|c| c.category() == Category::NonLambda));
        assert_eq!(cases[0].name(), "Higher-order function with lambda");
        assert_eq!(cases[11].name(), "Higher-order function without lambda");
        for i in 0..11 {
            assert_eq!(cases[i].pair(), cases[i + 11].pair());
        }
    }
}
