//! Subscriber setup for the binary.

use clap::ValueEnum;
use tracing_subscriber::EnvFilter;

use crate::report::REPORT_TARGET;

#[derive(Clone, Copy, Debug, Default, ValueEnum, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    #[default]
    Compact,
    Json,
}

/// Filter built from `directives` that always lets report lines through at `info`.
pub fn report_filter(directives: &str) -> EnvFilter {
    let directives = directives.trim();
    if directives.is_empty() {
        EnvFilter::new(format!("{REPORT_TARGET}=info"))
    } else {
        EnvFilter::new(format!("{directives},{REPORT_TARGET}=info"))
    }
}

/// Install the global subscriber on stderr. `RUST_LOG` wins over `default_level`.
pub fn init(default_level: &str, format: LogFormat) {
    let directives =
        std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_else(|_| default_level.to_string());

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(report_filter(&directives))
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Json => subscriber
            .json()
            .with_timer(tracing_subscriber::fmt::time::uptime())
            .init(),
        LogFormat::Compact => subscriber.compact().init(),
        LogFormat::Pretty => subscriber.pretty().init(),
    }
}
