//! Raw stats records returned by a [`StatsProvider`](super::StatsProvider).
//!
//! Platform-dependent fields are `Option`s: `None` means the platform does not
//! expose the field. Each record has a `field(name)` lookup that doubles as its
//! capability table; collectors emit a measurement only when it returns a value.

use crate::labels::LabelValue;

/// Per-CPU time breakdown.
///
/// Used both for cumulative times (seconds) and for utilization (percent).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CpuTimes {
    pub user: Option<f64>,
    pub nice: Option<f64>,
    pub system: Option<f64>,
    pub idle: Option<f64>,
    pub iowait: Option<f64>,
    pub irq: Option<f64>,
    pub softirq: Option<f64>,
    pub steal: Option<f64>,
    pub guest: Option<f64>,
    pub guest_nice: Option<f64>,
}

impl CpuTimes {
    pub fn field(&self, name: &str) -> Option<f64> {
        match name {
            "user" => self.user,
            "nice" => self.nice,
            "system" => self.system,
            "idle" => self.idle,
            "iowait" => self.iowait,
            "irq" => self.irq,
            "softirq" => self.softirq,
            "steal" => self.steal,
            "guest" => self.guest,
            "guest_nice" => self.guest_nice,
            _ => None,
        }
    }
}

/// System virtual memory, in bytes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VirtualMemory {
    pub total: u64,
    pub used: Option<u64>,
    pub free: Option<u64>,
    pub available: Option<u64>,
    pub buffers: Option<u64>,
    pub cached: Option<u64>,
    pub shared: Option<u64>,
    pub slab: Option<u64>,
    pub active: Option<u64>,
    pub inactive: Option<u64>,
}

impl VirtualMemory {
    pub fn field(&self, name: &str) -> Option<u64> {
        match name {
            "total" => Some(self.total),
            "used" => self.used,
            "free" => self.free,
            "available" => self.available,
            "buffers" => self.buffers,
            "cached" => self.cached,
            "shared" => self.shared,
            "slab" => self.slab,
            "active" => self.active,
            "inactive" => self.inactive,
            _ => None,
        }
    }
}

/// Swap usage, in bytes. `sin`/`sout` are cumulative bytes swapped in/out.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SwapMemory {
    pub total: u64,
    pub used: Option<u64>,
    pub free: Option<u64>,
    pub sin: Option<u64>,
    pub sout: Option<u64>,
}

impl SwapMemory {
    pub fn field(&self, name: &str) -> Option<u64> {
        match name {
            "total" => Some(self.total),
            "used" => self.used,
            "free" => self.free,
            "sin" => self.sin,
            "sout" => self.sout,
            _ => None,
        }
    }
}

/// Cumulative I/O counters of one block device. Times are milliseconds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiskCounters {
    pub device: String,
    pub read_bytes: Option<u64>,
    pub write_bytes: Option<u64>,
    pub read_count: Option<u64>,
    pub write_count: Option<u64>,
    pub read_time: Option<u64>,
    pub write_time: Option<u64>,
    pub read_merged_count: Option<u64>,
    pub write_merged_count: Option<u64>,
    pub busy_time: Option<u64>,
}

impl DiskCounters {
    pub fn field(&self, name: &str) -> Option<u64> {
        match name {
            "read_bytes" => self.read_bytes,
            "write_bytes" => self.write_bytes,
            "read_count" => self.read_count,
            "write_count" => self.write_count,
            "read_time" => self.read_time,
            "write_time" => self.write_time,
            "read_merged_count" => self.read_merged_count,
            "write_merged_count" => self.write_merged_count,
            "busy_time" => self.busy_time,
            _ => None,
        }
    }
}

/// Cumulative counters of one network interface.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetCounters {
    pub interface: String,
    pub bytes_sent: Option<u64>,
    pub bytes_recv: Option<u64>,
    pub packets_sent: Option<u64>,
    pub packets_recv: Option<u64>,
    pub errin: Option<u64>,
    pub errout: Option<u64>,
    pub dropin: Option<u64>,
    pub dropout: Option<u64>,
}

impl NetCounters {
    pub fn field(&self, name: &str) -> Option<u64> {
        match name {
            "bytes_sent" => self.bytes_sent,
            "bytes_recv" => self.bytes_recv,
            "packets_sent" => self.packets_sent,
            "packets_recv" => self.packets_recv,
            "errin" => self.errin,
            "errout" => self.errout,
            "dropin" => self.dropin,
            "dropout" => self.dropout,
            _ => None,
        }
    }
}

/// Address family code for IPv4 sockets.
pub const AF_INET: u32 = 2;
/// Address family code for IPv6 sockets.
pub const AF_INET6: u32 = 10;
/// Socket kind code for stream (TCP) sockets.
pub const SOCK_STREAM: u32 = 1;
/// Socket kind code for datagram (UDP) sockets.
pub const SOCK_DGRAM: u32 = 2;

/// Connection status reported for sockets without a state machine (UDP).
pub const CONN_NONE: &str = "NONE";

/// One live network connection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Connection {
    pub fd: Option<i64>,
    pub family: u32,
    pub kind: u32,
    /// Local address as `ip:port`.
    pub laddr: String,
    /// Remote address as `ip:port`; empty for unconnected sockets.
    pub raddr: String,
    pub status: String,
    pub pid: Option<u32>,
}

impl Connection {
    /// Looks up a connection field.
    ///
    /// Returns `None` when the name is not a connection field at all, and
    /// `Some(None)` when the field exists but is unavailable for this record.
    pub fn field(&self, name: &str) -> Option<Option<LabelValue>> {
        let value = match name {
            "fd" => self.fd.map(LabelValue::Int),
            "family" => Some(LabelValue::Int(i64::from(self.family))),
            "type" => Some(LabelValue::Int(i64::from(self.kind))),
            "laddr" => Some(LabelValue::Str(self.laddr.clone())),
            "raddr" => Some(LabelValue::Str(self.raddr.clone())),
            "status" => Some(LabelValue::Str(self.status.clone())),
            "pid" => self.pid.map(|p| LabelValue::Int(i64::from(p))),
            _ => return None,
        };
        Some(value)
    }
}

/// Memory of the current process, in bytes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessMemory {
    pub rss: Option<u64>,
    pub vms: Option<u64>,
    pub shared: Option<u64>,
    pub text: Option<u64>,
    pub lib: Option<u64>,
    pub data: Option<u64>,
    pub dirty: Option<u64>,
}

impl ProcessMemory {
    pub fn field(&self, name: &str) -> Option<u64> {
        match name {
            "rss" => self.rss,
            "vms" => self.vms,
            "shared" => self.shared,
            "text" => self.text,
            "lib" => self.lib,
            "data" => self.data,
            "dirty" => self.dirty,
            _ => None,
        }
    }
}

/// CPU time accumulated by the current process, in seconds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessCpuTimes {
    pub user: Option<f64>,
    pub system: Option<f64>,
    pub children_user: Option<f64>,
    pub children_system: Option<f64>,
    pub iowait: Option<f64>,
}

impl ProcessCpuTimes {
    pub fn field(&self, name: &str) -> Option<f64> {
        match name {
            "user" => self.user,
            "system" => self.system,
            "children_user" => self.children_user,
            "children_system" => self.children_system,
            "iowait" => self.iowait,
            _ => None,
        }
    }
}
