//! Stats providers: the operating-system and process statistics source.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                      StatsProvider (trait)                │
//! │  cpu_times / cpu_times_percent / virtual_memory / swap    │
//! │  disk_io_counters / net_io_counters / net_connections     │
//! │  process_memory / process_cpu_times / gc_counts           │
//! └──────────────┬───────────────────────────┬────────────────┘
//!                │                           │
//!       ┌────────▼────────┐         ┌────────▼────────┐
//!       │  ProcfsProvider │         │ FixtureProvider │
//!       │  (Linux /proc)  │         │ (fixed values)  │
//!       └────────┬────────┘         └─────────────────┘
//!                │
//!         ┌──────▼──────┐
//!         │  FileSystem │ (trait)
//!         └──────┬──────┘
//!          ┌─────┴─────┐
//!   ┌──────▼─────┐ ┌───▼────────┐
//!   │   RealFs   │ │   MockFs   │
//!   └────────────┘ └────────────┘
//! ```
//!
//! # Usage
//!
//! ```
//! use hoststat_core::provider::{MockFs, ProcfsProvider, StatsProvider};
//!
//! let provider = ProcfsProvider::new(MockFs::typical_system(), "/proc");
//! let cpus = provider.cpu_times().unwrap();
//! assert_eq!(cpus.len(), 4);
//! ```

pub mod fixture;
pub mod mock;
pub mod procfs;
pub mod traits;
pub mod types;

pub use fixture::FixtureProvider;
pub use mock::MockFs;
pub use procfs::ProcfsProvider;
pub use traits::{FileSystem, RealFs};
pub use types::{
    Connection, CpuTimes, DiskCounters, NetCounters, ProcessCpuTimes, ProcessMemory, SwapMemory,
    VirtualMemory,
};

use crate::error::Result;

/// Runtime implementation tag used in runtime metric names.
pub const DEFAULT_RUNTIME_NAME: &str = "rust";

/// Source of system and process statistics.
///
/// Implementations must be safe to call from several collectors at once.
/// Reads are side-effect free apart from whatever bookkeeping an
/// implementation needs for [`StatsProvider::cpu_times_percent`].
pub trait StatsProvider: Send + Sync {
    /// Cumulative per-CPU times in seconds, in CPU index order.
    fn cpu_times(&self) -> Result<Vec<CpuTimes>>;

    /// Per-CPU utilization in percent (`0..=100`) since the previous call.
    fn cpu_times_percent(&self) -> Result<Vec<CpuTimes>>;

    fn virtual_memory(&self) -> Result<VirtualMemory>;

    fn swap_memory(&self) -> Result<SwapMemory>;

    fn disk_io_counters(&self) -> Result<Vec<DiskCounters>>;

    fn net_io_counters(&self) -> Result<Vec<NetCounters>>;

    fn net_connections(&self) -> Result<Vec<Connection>>;

    fn process_memory(&self) -> Result<ProcessMemory>;

    fn process_cpu_times(&self) -> Result<ProcessCpuTimes>;

    /// Collection counts per garbage-collector generation.
    ///
    /// Empty for runtimes without a tracing collector.
    fn gc_counts(&self) -> Result<Vec<u64>> {
        Ok(Vec::new())
    }

    /// Lower-cased runtime implementation name.
    fn runtime_name(&self) -> String {
        DEFAULT_RUNTIME_NAME.to_string()
    }
}
