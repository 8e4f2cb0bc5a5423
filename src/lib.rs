use clap::ValueEnum;

pub mod benches;
pub mod error;
pub mod harness;
pub mod logging;
pub mod probe;
pub mod registry;
pub mod report;
pub mod schema;

use schema::Category;

/// Which half of the suite to run.
#[derive(Clone, Copy, Debug, Default, ValueEnum, PartialEq, Eq)]
pub enum CategoryFilter {
    /// Closure-based and plain cases.
    #[default]
    All,
    /// Closure-based cases only.
    Lambda,
    /// Plain-function cases only.
    NonLambda,
}

impl CategoryFilter {
    pub fn matches(&self, category: Category) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Lambda => category == Category::Lambda,
            CategoryFilter::NonLambda => category == Category::NonLambda,
        }
    }
}
