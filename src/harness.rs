use std::convert::Infallible;
use std::hint::black_box;

use crate::benches::SuiteConfig;
use crate::probe::ProbeSet;
use crate::schema::MeasurementSample;

#[derive(Clone, Copy, Debug)]
pub enum Profile {
    Quick,
    Full,
}

impl Profile {
    pub fn as_str(&self) -> &'static str {
        match self {
            Profile::Quick => "quick",
            Profile::Full => "full",
        }
    }
}

#[derive(Clone, Debug)]
pub struct BenchConfig {
    pub profile: Profile,
    pub range: i64,
}

impl BenchConfig {
    pub fn suite(&self) -> SuiteConfig {
        SuiteConfig { range: self.range }
    }

    /// Complete passes whose reports are thrown away before measuring.
    pub fn warmup_runs(&self) -> u32 {
        match self.profile {
            Profile::Quick => 0,
            Profile::Full => 1,
        }
    }

    /// Complete passes that end up in the report.
    pub fn runs(&self) -> u32 {
        match self.profile {
            Profile::Quick => 1,
            Profile::Full => 10,
        }
    }
}

/// Invoke `op` exactly once and capture time, memory and energy around it.
///
/// The returned value goes through [`black_box`] and is dropped before the
/// closing memory reading.
pub fn measure<T>(probes: &mut ProbeSet, op: impl FnOnce() -> T) -> MeasurementSample {
    match try_measure(probes, || Ok::<T, Infallible>(op())) {
        Ok(sample) => sample,
        Err(never) => match never {},
    }
}

/// Like [`measure`], but an `Err` from `op` is returned as-is and no sample is produced.
pub fn try_measure<T, E>(
    probes: &mut ProbeSet,
    op: impl FnOnce() -> Result<T, E>,
) -> Result<MeasurementSample, E> {
    let energy_start = probes.energy.as_mut().and_then(|e| e.read());
    let memory_start = probes.memory.used_bytes();
    let start_ms = probes.clock.now_ms();

    let outcome = op();

    let end_ms = probes.clock.now_ms();
    drop(black_box(outcome?));
    let memory_end = probes.memory.used_bytes();
    let energy_end = probes.energy.as_mut().and_then(|e| e.read());

    // f64::max also maps a NaN delta to 0.
    let elapsed_ms = (end_ms - start_ms).max(0.0);

    let energy_delta = match (energy_start, energy_end) {
        (Some(start), Some(end)) => Some(end - start),
        _ => None,
    };

    Ok(MeasurementSample {
        elapsed_ms,
        memory_delta_bytes: memory_end.wrapping_sub(memory_start) as i64,
        energy_delta,
    })
}
