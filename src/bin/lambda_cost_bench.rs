use clap::{Parser, Subcommand, ValueEnum};
use lambda_cost_bench::benches;
use lambda_cost_bench::error::HarnessError;
use lambda_cost_bench::harness::{BenchConfig, Profile};
use lambda_cost_bench::logging::{self, LogFormat};
use lambda_cost_bench::probe::{
    AllocatorProbe, CountingAllocator, MonotonicClock, ProbeSet, RaplProbe, ResidentMemoryProbe,
    RAPL_ENERGY_PATH,
};
use lambda_cost_bench::report::{self, LogSink, Sink, StdoutSink};
use lambda_cost_bench::schema::{RunMeta, SuiteReport};
use lambda_cost_bench::CategoryFilter;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[global_allocator]
static ALLOC: CountingAllocator = CountingAllocator;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ProfileArg {
    Quick,
    Full,
}

impl From<ProfileArg> for Profile {
    fn from(v: ProfileArg) -> Self {
        match v {
            ProfileArg::Quick => Profile::Quick,
            ProfileArg::Full => Profile::Full,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum MemoryArg {
    /// Live heap bytes from the counting allocator.
    Allocator,
    /// Resident set size of the process.
    Resident,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum EnergyArg {
    /// Use the RAPL counter if this machine has one.
    Auto,
    /// Require the RAPL counter.
    Rapl,
    /// Do not measure energy.
    #[value(name = "none")]
    Disabled,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FormatArg {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SinkArg {
    Stdout,
    Log,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Measure every selected case and report the results.
    Run {
        #[arg(long, value_enum, default_value_t = CategoryFilter::All)]
        category: CategoryFilter,

        /// Upper bound of the summed range in every workload.
        #[arg(long, default_value_t = benches::DEFAULT_RANGE)]
        range: i64,

        #[arg(long, value_enum, default_value_t = MemoryArg::Allocator)]
        memory: MemoryArg,

        #[arg(long, value_enum, default_value_t = EnergyArg::Auto)]
        energy: EnergyArg,

        /// Energy counter file used by `--energy rapl`.
        #[arg(long, value_name = "FILE", default_value = RAPL_ENERGY_PATH)]
        rapl_path: PathBuf,

        #[arg(long, value_enum, default_value_t = FormatArg::Text)]
        format: FormatArg,

        #[arg(long, value_enum, default_value_t = SinkArg::Stdout)]
        sink: SinkArg,

        /// Append a lambda vs. plain comparison table to text output.
        #[arg(long, default_value_t = false)]
        compare: bool,
    },

    /// List the registered cases in run order.
    List {
        #[arg(long, value_enum, default_value_t = CategoryFilter::All)]
        category: CategoryFilter,
    },
}

#[derive(Parser, Debug)]
#[command(name = "lambda-cost-bench")]
#[command(about = "Time, memory and energy cost of closures vs. plain functions")]
struct Args {
    #[arg(long, value_enum, default_value_t = ProfileArg::Quick, global = true)]
    profile: ProfileArg,

    /// Also write the JSON report here.
    #[arg(long, global = true)]
    out: Option<PathBuf>,

    /// Default log level when RUST_LOG is not set.
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    #[arg(long, value_enum, default_value_t = LogFormat::Compact, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    cmd: Command,
}

/// `unix:<seconds>`; enough to order reports.
fn now_unix_stamp() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    format!("unix:{secs}")
}

fn git_sha_short() -> Option<String> {
    // Best-effort: read from environment set by CI/build scripts.
    std::env::var("GIT_SHA")
        .ok()
        .or_else(|| std::env::var("GITHUB_SHA").ok())
        .map(|s| s.chars().take(12).collect())
}

fn build_probes(
    memory: MemoryArg,
    energy: EnergyArg,
    rapl_path: &Path,
) -> Result<ProbeSet, HarnessError> {
    let clock = MonotonicClock::new();
    let probes = match memory {
        MemoryArg::Allocator => ProbeSet::new(clock, AllocatorProbe),
        MemoryArg::Resident => ProbeSet::new(clock, ResidentMemoryProbe::open()?),
    };

    Ok(match energy {
        EnergyArg::Auto => match RaplProbe::detect() {
            Some(rapl) => probes.with_energy(rapl),
            None => probes,
        },
        EnergyArg::Rapl => probes.with_energy(RaplProbe::open(rapl_path)?),
        EnergyArg::Disabled => probes,
    })
}

fn main() -> Result<(), HarnessError> {
    let args = Args::parse();
    logging::init(&args.log_level, args.log_format);

    match args.cmd {
        Command::List { category } => {
            let mut registry = benches::suite(&benches::SuiteConfig::default())?;
            registry.retain(category);

            let mut listing = String::new();
            for case in registry.cases() {
                listing.push_str(&format!(
                    "{:<10}  {:<28}  {}\n",
                    case.category().as_str(),
                    case.pair().unwrap_or("-"),
                    case.name()
                ));
            }
            StdoutSink.emit(&listing)?;
        }
        Command::Run {
            category,
            range,
            memory,
            energy,
            rapl_path,
            format,
            sink,
            compare,
        } => {
            let cfg = BenchConfig {
                profile: args.profile.into(),
                range,
            };

            let mut registry = benches::suite(&cfg.suite())?;
            registry.retain(category);
            let mut probes = build_probes(memory, energy, &rapl_path)?;
            info!(
                cases = registry.len(),
                memory = probes.memory_name(),
                energy = ?probes.energy_name(),
                profile = cfg.profile.as_str(),
                "starting"
            );

            for i in 0..cfg.warmup_runs() {
                registry.run(&mut probes)?;
                debug!(warmup = i + 1, "warmup pass discarded");
            }

            let mut runs = Vec::with_capacity(cfg.runs() as usize);
            for _ in 0..cfg.runs() {
                runs.push(registry.run(&mut probes)?);
            }

            let suite_report = SuiteReport {
                run: RunMeta {
                    schema_version: 1,
                    bench_version: env!("CARGO_PKG_VERSION").to_string(),
                    profile: cfg.profile.as_str().to_string(),
                    range: cfg.range,
                    memory_probe: probes.memory_name().to_string(),
                    energy_probe: probes.energy_name().map(str::to_string),
                    timestamp_utc: now_unix_stamp(),
                    git_sha: git_sha_short(),
                },
                runs,
            };

            let formatted = match format {
                FormatArg::Text => report::format_runs(&suite_report.runs, compare),
                FormatArg::Json => {
                    let mut json = serde_json::to_string_pretty(&suite_report)?;
                    json.push('\n');
                    json
                }
            };

            let mut sink: Box<dyn Sink> = match sink {
                SinkArg::Stdout => Box::new(StdoutSink),
                SinkArg::Log => Box::new(LogSink),
            };
            sink.emit(&formatted)?;

            if let Some(out) = &args.out {
                report::write_json(out, &suite_report)?;
                info!(path = %out.display(), "report written");
            }
        }
    }

    Ok(())
}
