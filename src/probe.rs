//! Probes the measurement wrapper reads but does not own.
//!
//! A [`ProbeSet`] bundles one clock, one memory meter and an optional energy
//! counter. Platform differences live entirely in which probes are plugged in;
//! the wrapper and the runner only see the traits below.

use std::alloc::{GlobalAlloc, Layout, System as SystemAlloc};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Instant;

use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};
use tracing::{debug, warn};

use crate::error::HarnessError;

/// Monotonic time source with (at least) millisecond resolution.
pub trait Clock {
    /// Current time in fractional milliseconds since an arbitrary origin.
    fn now_ms(&mut self) -> f64;
}

/// Reports how much memory the process is currently using, in bytes.
pub trait MemoryProbe {
    fn name(&self) -> &'static str;
    fn used_bytes(&mut self) -> u64;
}

/// Best-effort energy counter. `None` means the counter could not be read.
pub trait EnergyProbe {
    fn name(&self) -> &'static str;
    fn read(&mut self) -> Option<f64>;
}

/// [`Instant`]-backed clock anchored at construction.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&mut self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

static LIVE_HEAP_BYTES: AtomicUsize = AtomicUsize::new(0);
static COUNTING_INSTALLED: AtomicBool = AtomicBool::new(false);

/// Global allocator that tracks live heap bytes on top of the system allocator.
///
/// Install it in a binary (or test crate) to make [`AllocatorProbe`] meaningful:
///
/// ```ignore
/// #[global_allocator]
/// static ALLOC: lambda_cost_bench::probe::CountingAllocator =
///     lambda_cost_bench::probe::CountingAllocator;
/// ```
pub struct CountingAllocator;

// SAFETY: every call is forwarded unchanged to the system allocator; the
// counters are plain atomics and never influence the returned pointers.
unsafe impl GlobalAlloc for CountingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let ptr = SystemAlloc.alloc(layout);
        if !ptr.is_null() {
            COUNTING_INSTALLED.store(true, Ordering::Relaxed);
            LIVE_HEAP_BYTES.fetch_add(layout.size(), Ordering::Relaxed);
        }
        ptr
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        let ptr = SystemAlloc.alloc_zeroed(layout);
        if !ptr.is_null() {
            COUNTING_INSTALLED.store(true, Ordering::Relaxed);
            LIVE_HEAP_BYTES.fetch_add(layout.size(), Ordering::Relaxed);
        }
        ptr
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        SystemAlloc.dealloc(ptr, layout);
        LIVE_HEAP_BYTES.fetch_sub(layout.size(), Ordering::Relaxed);
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let new_ptr = SystemAlloc.realloc(ptr, layout, new_size);
        if !new_ptr.is_null() {
            let old_size = layout.size();
            if new_size >= old_size {
                LIVE_HEAP_BYTES.fetch_add(new_size - old_size, Ordering::Relaxed);
            } else {
                LIVE_HEAP_BYTES.fetch_sub(old_size - new_size, Ordering::Relaxed);
            }
        }
        new_ptr
    }
}

/// Live heap bytes as tracked by [`CountingAllocator`] (0 if it is not installed).
pub fn live_heap_bytes() -> usize {
    LIVE_HEAP_BYTES.load(Ordering::Relaxed)
}

/// Whether [`CountingAllocator`] has served at least one allocation.
pub fn counting_allocator_installed() -> bool {
    COUNTING_INSTALLED.load(Ordering::Relaxed)
}

/// Heap usage as seen by [`CountingAllocator`].
#[derive(Debug, Default, Clone, Copy)]
pub struct AllocatorProbe;

impl MemoryProbe for AllocatorProbe {
    fn name(&self) -> &'static str {
        "allocator"
    }

    fn used_bytes(&mut self) -> u64 {
        live_heap_bytes() as u64
    }
}

/// Resident set size of the current process, read through `sysinfo`.
pub struct ResidentMemoryProbe {
    system: System,
    pid: Pid,
    last: u64,
}

impl ResidentMemoryProbe {
    pub fn open() -> Result<Self, HarnessError> {
        let pid = sysinfo::get_current_pid().map_err(|e| HarnessError::ProbeUnavailable {
            probe: "resident-memory",
            reason: e.to_string(),
        })?;

        let mut probe = Self {
            system: System::new(),
            pid,
            last: 0,
        };
        probe.last = probe
            .refresh()
            .ok_or_else(|| HarnessError::ProbeUnavailable {
                probe: "resident-memory",
                reason: format!("process {pid} not visible"),
            })?;
        Ok(probe)
    }

    fn refresh(&mut self) -> Option<u64> {
        self.system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[self.pid]),
            false,
            ProcessRefreshKind::new().with_memory(),
        );
        self.system.process(self.pid).map(|p| p.memory())
    }
}

impl MemoryProbe for ResidentMemoryProbe {
    fn name(&self) -> &'static str {
        "resident"
    }

    fn used_bytes(&mut self) -> u64 {
        match self.refresh() {
            Some(bytes) => self.last = bytes,
            None => warn!(pid = %self.pid, "RSS refresh failed, reusing last reading"),
        }
        self.last
    }
}

/// Default location of the package-level RAPL counter on Linux.
pub const RAPL_ENERGY_PATH: &str = "/sys/class/powercap/intel-rapl:0/energy_uj";

/// Linux powercap (RAPL) energy counter, in microjoules.
#[derive(Debug, Clone)]
pub struct RaplProbe {
    path: PathBuf,
}

impl RaplProbe {
    /// Open the counter at `path`, failing if it cannot be read right now.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, HarnessError> {
        let path = path.as_ref().to_path_buf();
        read_counter(&path).map_err(|reason| HarnessError::ProbeUnavailable {
            probe: "rapl",
            reason,
        })?;
        Ok(Self { path })
    }

    /// Probe the default counter; `None` if this machine does not expose one.
    pub fn detect() -> Option<Self> {
        match Self::open(RAPL_ENERGY_PATH) {
            Ok(probe) => Some(probe),
            Err(e) => {
                debug!("no energy counter: {e}");
                None
            }
        }
    }
}

fn read_counter(path: &Path) -> Result<f64, String> {
    let raw = fs::read_to_string(path).map_err(|e| format!("{}: {e}", path.display()))?;
    raw.trim()
        .parse::<f64>()
        .map_err(|e| format!("{}: {e}", path.display()))
}

impl EnergyProbe for RaplProbe {
    fn name(&self) -> &'static str {
        "rapl"
    }

    fn read(&mut self) -> Option<f64> {
        match read_counter(&self.path) {
            Ok(v) => Some(v),
            Err(reason) => {
                warn!(%reason, "energy counter read failed");
                None
            }
        }
    }
}

/// Energy probe for platforms without a counter.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoEnergy;

impl EnergyProbe for NoEnergy {
    fn name(&self) -> &'static str {
        "none"
    }

    fn read(&mut self) -> Option<f64> {
        None
    }
}

/// Capability bundle handed to the harness.
pub struct ProbeSet {
    pub clock: Box<dyn Clock>,
    pub memory: Box<dyn MemoryProbe>,
    pub energy: Option<Box<dyn EnergyProbe>>,
}

impl ProbeSet {
    pub fn new(clock: impl Clock + 'static, memory: impl MemoryProbe + 'static) -> Self {
        Self {
            clock: Box::new(clock),
            memory: Box::new(memory),
            energy: None,
        }
    }

    pub fn with_energy(mut self, energy: impl EnergyProbe + 'static) -> Self {
        self.energy = Some(Box::new(energy));
        self
    }

    pub fn memory_name(&self) -> &'static str {
        self.memory.name()
    }

    pub fn energy_name(&self) -> Option<&'static str> {
        self.energy.as_ref().map(|e| e.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn monotonic_clock_never_goes_backwards() {
        let mut clock = MonotonicClock::new();
        let a = clock.now_ms();
        let b = clock.now_ms();
        assert!(a >= 0.0);
        assert!(b >= a);
    }

    #[test]
    fn rapl_probe_reads_counter_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "123456789").unwrap();

        let mut probe = RaplProbe::open(file.path()).unwrap();
        assert_eq!(probe.read(), Some(123_456_789.0));
    }

    #[test]
    fn rapl_probe_missing_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = RaplProbe::open(dir.path().join("energy_uj")).unwrap_err();
        assert!(matches!(
            err,
            HarnessError::ProbeUnavailable { probe: "rapl", .. }
        ));
    }

    #[test]
    fn rapl_probe_returns_none_after_counter_disappears() {
        let file = NamedTempFile::new().unwrap();
        fs::write(file.path(), "42\n").unwrap();
        let mut probe = RaplProbe::open(file.path()).unwrap();

        let path = file.path().to_path_buf();
        drop(file);
        assert!(!path.exists());
        assert_eq!(probe.read(), None);
    }

    #[test]
    fn no_energy_always_absent() {
        let mut probe = NoEnergy;
        assert_eq!(probe.read(), None);
    }

    #[test]
    fn resident_probe_reports_nonzero_rss() {
        let mut probe = ResidentMemoryProbe::open().unwrap();
        let first = probe.used_bytes();
        let second = probe.used_bytes();
        assert!(first > 0);
        assert!(second > 0);
    }

    #[test]
    fn resident_probe_reuses_last_reading_when_process_vanishes() {
        let mut probe = ResidentMemoryProbe {
            system: System::new(),
            pid: Pid::from_u32(u32::MAX),
            last: 4096,
        };
        assert_eq!(probe.used_bytes(), 4096);
        assert_eq!(probe.used_bytes(), 4096);
    }

    #[test]
    fn probe_set_names() {
        let probes = ProbeSet::new(MonotonicClock::new(), AllocatorProbe);
        assert_eq!(probes.memory_name(), "allocator");
        assert_eq!(probes.energy_name(), None);

        let probes = probes.with_energy(NoEnergy);
        assert_eq!(probes.energy_name(), Some("none"));
    }
}
