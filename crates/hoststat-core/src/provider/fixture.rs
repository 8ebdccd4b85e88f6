//! Provider returning fixed records.
//!
//! Used by tests and examples that need deterministic input without a
//! `/proc` layout. Every read returns a clone of the stored records.

use crate::error::Result;
use crate::provider::types::{
    Connection, CpuTimes, DiskCounters, NetCounters, ProcessCpuTimes, ProcessMemory, SwapMemory,
    VirtualMemory,
};
use crate::provider::{DEFAULT_RUNTIME_NAME, StatsProvider};

/// Stats provider backed by in-memory records.
#[derive(Debug, Clone)]
pub struct FixtureProvider {
    pub cpu_times: Vec<CpuTimes>,
    pub cpu_percent: Vec<CpuTimes>,
    pub virtual_memory: VirtualMemory,
    pub swap_memory: SwapMemory,
    pub disks: Vec<DiskCounters>,
    pub nics: Vec<NetCounters>,
    pub connections: Vec<Connection>,
    pub process_memory: ProcessMemory,
    pub process_cpu: ProcessCpuTimes,
    pub gc_counts: Vec<u64>,
    pub runtime_name: String,
}

impl Default for FixtureProvider {
    fn default() -> Self {
        Self {
            cpu_times: Vec::new(),
            cpu_percent: Vec::new(),
            virtual_memory: VirtualMemory::default(),
            swap_memory: SwapMemory::default(),
            disks: Vec::new(),
            nics: Vec::new(),
            connections: Vec::new(),
            process_memory: ProcessMemory::default(),
            process_cpu: ProcessCpuTimes::default(),
            gc_counts: Vec::new(),
            runtime_name: DEFAULT_RUNTIME_NAME.to_string(),
        }
    }
}

impl FixtureProvider {
    /// Creates a provider with no records.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cpu_times(mut self, cpus: Vec<CpuTimes>) -> Self {
        self.cpu_times = cpus;
        self
    }

    pub fn with_cpu_percent(mut self, cpus: Vec<CpuTimes>) -> Self {
        self.cpu_percent = cpus;
        self
    }

    pub fn with_virtual_memory(mut self, memory: VirtualMemory) -> Self {
        self.virtual_memory = memory;
        self
    }

    pub fn with_swap_memory(mut self, swap: SwapMemory) -> Self {
        self.swap_memory = swap;
        self
    }

    pub fn with_disks(mut self, disks: Vec<DiskCounters>) -> Self {
        self.disks = disks;
        self
    }

    pub fn with_nics(mut self, nics: Vec<NetCounters>) -> Self {
        self.nics = nics;
        self
    }

    pub fn with_connections(mut self, connections: Vec<Connection>) -> Self {
        self.connections = connections;
        self
    }

    pub fn with_process_memory(mut self, memory: ProcessMemory) -> Self {
        self.process_memory = memory;
        self
    }

    pub fn with_process_cpu(mut self, cpu: ProcessCpuTimes) -> Self {
        self.process_cpu = cpu;
        self
    }

    pub fn with_gc_counts(mut self, counts: Vec<u64>) -> Self {
        self.gc_counts = counts;
        self
    }

    pub fn with_runtime_name(mut self, name: impl Into<String>) -> Self {
        self.runtime_name = name.into();
        self
    }
}

impl StatsProvider for FixtureProvider {
    fn cpu_times(&self) -> Result<Vec<CpuTimes>> {
        Ok(self.cpu_times.clone())
    }

    fn cpu_times_percent(&self) -> Result<Vec<CpuTimes>> {
        Ok(self.cpu_percent.clone())
    }

    fn virtual_memory(&self) -> Result<VirtualMemory> {
        Ok(self.virtual_memory.clone())
    }

    fn swap_memory(&self) -> Result<SwapMemory> {
        Ok(self.swap_memory.clone())
    }

    fn disk_io_counters(&self) -> Result<Vec<DiskCounters>> {
        Ok(self.disks.clone())
    }

    fn net_io_counters(&self) -> Result<Vec<NetCounters>> {
        Ok(self.nics.clone())
    }

    fn net_connections(&self) -> Result<Vec<Connection>> {
        Ok(self.connections.clone())
    }

    fn process_memory(&self) -> Result<ProcessMemory> {
        Ok(self.process_memory.clone())
    }

    fn process_cpu_times(&self) -> Result<ProcessCpuTimes> {
        Ok(self.process_cpu.clone())
    }

    fn gc_counts(&self) -> Result<Vec<u64>> {
        Ok(self.gc_counts.clone())
    }

    fn runtime_name(&self) -> String {
        self.runtime_name.to_lowercase()
    }
}
