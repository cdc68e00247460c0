//! Execution stats for one unit of block-producing work.
//!
//! A builder is opened when the work starts and consumed by `build()` when it
//! finishes, so a builder can never be reused. Nothing here fails: when the
//! platform cannot report a reading, the stats carry the best fallback.

use std::fmt;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::runtime;

/// Execution stats for a block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecStats {
    /// Wall-clock start, seconds since the Unix epoch.
    pub start_time_s: Option<f64>,
    pub end_time_s: Option<f64>,
    /// Monotonic duration of the work.
    pub wall_time_s: Option<f64>,
    /// Process CPU time spent during the work; `None` without a CPU clock.
    pub cpu_time_s: Option<f64>,
    /// Time attributed to user-defined functions. Tracked apart from wall time.
    pub udf_time_s: f64,
    pub node_id: String,
    /// Peak resident memory of the process. May overestimate: earlier work on
    /// the same worker is not subtracted.
    pub max_rss_bytes: u64,
    pub task_idx: Option<usize>,
}

impl ExecStats {
    /// Empty stats stamped with the current node id.
    pub fn new() -> Self {
        Self {
            start_time_s: None,
            end_time_s: None,
            wall_time_s: None,
            cpu_time_s: None,
            udf_time_s: 0.0,
            node_id: runtime::node_id().to_string(),
            max_rss_bytes: 0,
            task_idx: None,
        }
    }

    pub fn builder() -> ExecStatsBuilder {
        ExecStatsBuilder::new()
    }
}

impl Default for ExecStats {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ExecStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn secs(v: Option<f64>) -> String {
            v.map(|s| format!("{s:.6}")).unwrap_or_else(|| "None".into())
        }
        write!(
            f,
            "{{wall_time_s: {}, cpu_time_s: {}, udf_time_s: {:.6}, node_id: {}}}",
            secs(self.wall_time_s),
            secs(self.cpu_time_s),
            self.udf_time_s,
            self.node_id
        )
    }
}

/// Scoped timer/sampler. Records start readings on creation.
#[derive(Debug)]
pub struct ExecStatsBuilder {
    start: Instant,
    start_time_s: f64,
    start_cpu: Option<Duration>,
    udf_time: Duration,
    task_idx: Option<usize>,
}

impl ExecStatsBuilder {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            start_time_s: unix_now_s(),
            start_cpu: sys::process_cpu_time(),
            udf_time: Duration::ZERO,
            task_idx: None,
        }
    }

    pub fn with_task_idx(mut self, task_idx: usize) -> Self {
        self.task_idx = Some(task_idx);
        self
    }

    /// Add time spent inside a user-defined function.
    pub fn record_udf_time(&mut self, elapsed: Duration) {
        self.udf_time += elapsed;
    }

    /// Run `f`, attributing its duration to UDF time.
    pub fn time_udf<T>(&mut self, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let out = f();
        self.record_udf_time(start.elapsed());
        out
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    /// Capture end readings and produce the immutable stats.
    pub fn build(self) -> ExecStats {
        let wall = self.start.elapsed();
        let end_cpu = sys::process_cpu_time();

        let mut stats = ExecStats::new();
        stats.start_time_s = Some(self.start_time_s);
        stats.end_time_s = Some(self.start_time_s + wall.as_secs_f64());
        stats.wall_time_s = Some(wall.as_secs_f64());
        stats.cpu_time_s = match (self.start_cpu, end_cpu) {
            (Some(start), Some(end)) => Some(end.saturating_sub(start).as_secs_f64()),
            _ => None,
        };
        stats.udf_time_s = self.udf_time.as_secs_f64();
        stats.max_rss_bytes = sys::max_rss_bytes();
        stats.task_idx = self.task_idx;

        tracing::trace!(
            wall_time_s = stats.wall_time_s,
            max_rss_bytes = stats.max_rss_bytes,
            "built exec stats"
        );
        stats
    }
}

impl Default for ExecStatsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn unix_now_s() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

/// Process resource readings.
mod sys {
    use std::time::Duration;

    /// Peak RSS of this process in bytes.
    ///
    /// Prefers `getrusage`'s `ru_maxrss` scaled by 1000. The kernel reports
    /// that value in kilobytes on Linux, so this is an approximation of bytes
    /// (1000, not 1024) kept for compatibility with existing consumers. Falls
    /// back to the *current* RSS when no peak is available.
    pub(super) fn max_rss_bytes() -> u64 {
        peak_rss_bytes()
            .filter(|&b| b > 0)
            .or_else(current_rss_bytes)
            .unwrap_or(0)
    }

    #[cfg(unix)]
    pub(super) fn process_cpu_time() -> Option<Duration> {
        let usage = self_usage()?;
        Some(timeval(usage.user_time()) + timeval(usage.system_time()))
    }

    #[cfg(not(unix))]
    pub(super) fn process_cpu_time() -> Option<Duration> {
        None
    }

    #[cfg(unix)]
    pub(super) fn peak_rss_bytes() -> Option<u64> {
        let usage = self_usage()?;
        u64::try_from(usage.max_rss()).ok().map(|kb| kb * 1000)
    }

    #[cfg(not(unix))]
    pub(super) fn peak_rss_bytes() -> Option<u64> {
        None
    }

    /// Current (not peak) RSS via process introspection.
    pub(super) fn current_rss_bytes() -> Option<u64> {
        let pid = sysinfo::get_current_pid().ok()?;
        let mut system = sysinfo::System::new();
        system.refresh_process(pid);
        system.process(pid).map(|p| p.memory())
    }

    #[cfg(unix)]
    fn self_usage() -> Option<nix::sys::resource::Usage> {
        use nix::sys::resource::{getrusage, UsageWho};

        getrusage(UsageWho::RUSAGE_SELF).ok()
    }

    #[cfg(unix)]
    fn timeval(tv: nix::sys::time::TimeVal) -> Duration {
        Duration::from_secs(tv.tv_sec().max(0) as u64)
            + Duration::from_micros(tv.tv_usec().max(0) as u64)
    }
}
