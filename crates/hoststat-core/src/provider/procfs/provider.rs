//! `/proc` reader implementing [`StatsProvider`].

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Mutex;

use tracing::debug;

use super::parser::{
    CpuStat, parse_cpu_stats, parse_diskstats, parse_meminfo, parse_net_dev, parse_net_sockets,
    parse_proc_stat, parse_statm, parse_vmstat_swap, tcp_state_name,
};
use crate::error::Result;
use crate::provider::StatsProvider;
use crate::provider::traits::FileSystem;
use crate::provider::types::{
    AF_INET, AF_INET6, CONN_NONE, Connection, CpuTimes, DiskCounters, NetCounters,
    ProcessCpuTimes, ProcessMemory, SOCK_DGRAM, SOCK_STREAM, SwapMemory, VirtualMemory,
};

/// Clock ticks per second (USER_HZ). Standard value for Linux.
const CLK_TCK: f64 = 100.0;

/// Bytes per kernel page.
const PAGE_SIZE: u64 = 4096;

/// `/proc/diskstats` always counts 512-byte sectors regardless of the device.
const SECTOR_SIZE: u64 = 512;

/// Socket tables read for connections, with their family and kind.
const SOCKET_TABLES: &[(&str, u32, u32)] = &[
    ("net/tcp", AF_INET, SOCK_STREAM),
    ("net/tcp6", AF_INET6, SOCK_STREAM),
    ("net/udp", AF_INET, SOCK_DGRAM),
    ("net/udp6", AF_INET6, SOCK_DGRAM),
];

/// Reads system and process statistics from `/proc`.
pub struct ProcfsProvider<F: FileSystem> {
    fs: F,
    proc_path: String,
    /// Per-CPU tick counters from the previous `cpu_times_percent` call.
    last_cpu: Mutex<Option<Vec<CpuStat>>>,
}

impl<F: FileSystem> ProcfsProvider<F> {
    /// Creates a new provider.
    ///
    /// # Arguments
    /// * `fs` - Filesystem implementation (real or mock)
    /// * `proc_path` - Base path to proc filesystem (usually "/proc")
    pub fn new(fs: F, proc_path: impl Into<String>) -> Self {
        Self {
            fs,
            proc_path: proc_path.into(),
            last_cpu: Mutex::new(None),
        }
    }

    fn read(&self, relative: &str) -> Result<String> {
        let path = format!("{}/{}", self.proc_path, relative);
        Ok(self.fs.read_to_string(Path::new(&path))?)
    }

    fn exists(&self, relative: &str) -> bool {
        let path = format!("{}/{}", self.proc_path, relative);
        self.fs.exists(Path::new(&path))
    }

    /// Per-CPU lines of `/proc/stat`, aggregate line excluded.
    fn per_cpu_stats(&self) -> Result<Vec<CpuStat>> {
        let content = self.read("stat")?;
        let cpus = parse_cpu_stats(&content)?
            .into_iter()
            .filter(|c| c.cpu_id.is_some())
            .collect();
        Ok(cpus)
    }
}

fn ticks_to_secs(ticks: u64) -> f64 {
    ticks as f64 / CLK_TCK
}

fn cpu_times_from_ticks(stat: &CpuStat) -> CpuTimes {
    CpuTimes {
        user: Some(ticks_to_secs(stat.user)),
        nice: Some(ticks_to_secs(stat.nice)),
        system: Some(ticks_to_secs(stat.system)),
        idle: Some(ticks_to_secs(stat.idle)),
        iowait: stat.iowait.map(ticks_to_secs),
        irq: stat.irq.map(ticks_to_secs),
        softirq: stat.softirq.map(ticks_to_secs),
        steal: stat.steal.map(ticks_to_secs),
        guest: stat.guest.map(ticks_to_secs),
        guest_nice: stat.guest_nice.map(ticks_to_secs),
    }
}

/// Share of each field in the tick delta between two samples, in percent.
///
/// Counters that went backwards (CPU hotplug, counter reset) count as zero.
fn cpu_percent(prev: Option<&CpuStat>, curr: &CpuStat) -> CpuTimes {
    let base = CpuStat::default();
    let prev = prev.unwrap_or(&base);
    let total = curr.total().saturating_sub(prev.total());

    let pct = |now: u64, before: u64| -> f64 {
        if total == 0 {
            return 0.0;
        }
        let delta = now.saturating_sub(before) as f64;
        (delta / total as f64 * 100.0).clamp(0.0, 100.0)
    };
    let opt = |now: Option<u64>, before: Option<u64>| -> Option<f64> {
        now.map(|n| pct(n, before.unwrap_or(0)))
    };

    CpuTimes {
        user: Some(pct(curr.user, prev.user)),
        nice: Some(pct(curr.nice, prev.nice)),
        system: Some(pct(curr.system, prev.system)),
        idle: Some(pct(curr.idle, prev.idle)),
        iowait: opt(curr.iowait, prev.iowait),
        irq: opt(curr.irq, prev.irq),
        softirq: opt(curr.softirq, prev.softirq),
        steal: opt(curr.steal, prev.steal),
        guest: opt(curr.guest, prev.guest),
        guest_nice: opt(curr.guest_nice, prev.guest_nice),
    }
}

/// Formats a remote endpoint; unconnected sockets have no remote address.
fn format_remote(addr: &SocketAddr) -> String {
    if addr.ip().is_unspecified() && addr.port() == 0 {
        String::new()
    } else {
        addr.to_string()
    }
}

impl<F: FileSystem> StatsProvider for ProcfsProvider<F> {
    fn cpu_times(&self) -> Result<Vec<CpuTimes>> {
        let cpus = self.per_cpu_stats()?;
        Ok(cpus.iter().map(cpu_times_from_ticks).collect())
    }

    fn cpu_times_percent(&self) -> Result<Vec<CpuTimes>> {
        let cpus = self.per_cpu_stats()?;

        let mut last = self
            .last_cpu
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let previous = last.as_deref().unwrap_or(&[]);
        if previous.is_empty() {
            debug!("no previous CPU sample, measuring utilization since boot");
        }

        let percents = cpus
            .iter()
            .map(|curr| {
                let prev = previous.iter().find(|p| p.cpu_id == curr.cpu_id);
                cpu_percent(prev, curr)
            })
            .collect();

        *last = Some(cpus);
        Ok(percents)
    }

    fn virtual_memory(&self) -> Result<VirtualMemory> {
        let info = parse_meminfo(&self.read("meminfo")?)?;
        let kb = |v: u64| v * 1024;

        let cached = info.cached + info.s_reclaimable.unwrap_or(0);
        let used = info
            .mem_total
            .saturating_sub(info.mem_free)
            .saturating_sub(info.buffers)
            .saturating_sub(cached);
        // Kernels before 3.14 have no MemAvailable
        let available = info
            .mem_available
            .unwrap_or(info.mem_free + info.buffers + cached);

        Ok(VirtualMemory {
            total: kb(info.mem_total),
            used: Some(kb(used)),
            free: Some(kb(info.mem_free)),
            available: Some(kb(available)),
            buffers: Some(kb(info.buffers)),
            cached: Some(kb(cached)),
            shared: info.shmem.map(kb),
            slab: info.slab.map(kb),
            active: info.active.map(kb),
            inactive: info.inactive.map(kb),
        })
    }

    fn swap_memory(&self) -> Result<SwapMemory> {
        let info = parse_meminfo(&self.read("meminfo")?)?;

        let paging = if self.exists("vmstat") {
            Some(parse_vmstat_swap(&self.read("vmstat")?)?)
        } else {
            debug!("vmstat not available, swap in/out omitted");
            None
        };

        Ok(SwapMemory {
            total: info.swap_total * 1024,
            used: Some(info.swap_total.saturating_sub(info.swap_free) * 1024),
            free: Some(info.swap_free * 1024),
            sin: paging.as_ref().map(|p| p.pswpin * PAGE_SIZE),
            sout: paging.as_ref().map(|p| p.pswpout * PAGE_SIZE),
        })
    }

    fn disk_io_counters(&self) -> Result<Vec<DiskCounters>> {
        let disks = parse_diskstats(&self.read("diskstats")?)?;

        Ok(disks
            .into_iter()
            .map(|d| DiskCounters {
                device: d.device,
                read_bytes: Some(d.read_sectors * SECTOR_SIZE),
                write_bytes: Some(d.write_sectors * SECTOR_SIZE),
                read_count: Some(d.reads),
                write_count: Some(d.writes),
                read_time: Some(d.read_time),
                write_time: Some(d.write_time),
                read_merged_count: Some(d.r_merged),
                write_merged_count: Some(d.w_merged),
                busy_time: Some(d.io_time),
            })
            .collect())
    }

    fn net_io_counters(&self) -> Result<Vec<NetCounters>> {
        let devices = parse_net_dev(&self.read("net/dev")?)?;

        Ok(devices
            .into_iter()
            .map(|d| NetCounters {
                interface: d.interface,
                bytes_sent: Some(d.tx_bytes),
                bytes_recv: Some(d.rx_bytes),
                packets_sent: Some(d.tx_packets),
                packets_recv: Some(d.rx_packets),
                errin: Some(d.rx_errs),
                errout: Some(d.tx_errs),
                dropin: Some(d.rx_drop),
                dropout: Some(d.tx_drop),
            })
            .collect())
    }

    fn net_connections(&self) -> Result<Vec<Connection>> {
        let mut connections = Vec::new();

        for &(table, family, kind) in SOCKET_TABLES {
            if !self.exists(table) {
                debug!(table, "socket table not available, skipping");
                continue;
            }

            for entry in parse_net_sockets(&self.read(table)?)? {
                let status = if kind == SOCK_STREAM {
                    tcp_state_name(entry.state)
                } else {
                    CONN_NONE
                };
                connections.push(Connection {
                    fd: None,
                    family,
                    kind,
                    laddr: entry.local.to_string(),
                    raddr: format_remote(&entry.remote),
                    status: status.to_string(),
                    pid: None,
                });
            }
        }

        Ok(connections)
    }

    fn process_memory(&self) -> Result<ProcessMemory> {
        let statm = parse_statm(&self.read("self/statm")?)?;
        let pages = |v: u64| Some(v * PAGE_SIZE);

        Ok(ProcessMemory {
            rss: pages(statm.resident),
            vms: pages(statm.size),
            shared: pages(statm.shared),
            text: pages(statm.text),
            lib: pages(statm.lib),
            data: pages(statm.data),
            dirty: pages(statm.dirty),
        })
    }

    fn process_cpu_times(&self) -> Result<ProcessCpuTimes> {
        let stat = parse_proc_stat(&self.read("self/stat")?)?;

        Ok(ProcessCpuTimes {
            user: Some(ticks_to_secs(stat.utime)),
            system: Some(ticks_to_secs(stat.stime)),
            children_user: Some(stat.cutime.max(0) as f64 / CLK_TCK),
            children_system: Some(stat.cstime.max(0) as f64 / CLK_TCK),
            iowait: stat.delayacct_blkio_ticks.map(ticks_to_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CollectError;
    use crate::provider::mock::MockFs;

    fn typical() -> ProcfsProvider<MockFs> {
        ProcfsProvider::new(MockFs::typical_system(), "/proc")
    }

    fn legacy() -> ProcfsProvider<MockFs> {
        ProcfsProvider::new(MockFs::legacy_kernel(), "/proc")
    }

    #[test]
    fn test_cpu_times_per_cpu_in_seconds() {
        let cpus = typical().cpu_times().unwrap();

        assert_eq!(cpus.len(), 4);
        assert_eq!(cpus[0].user, Some(25.0));
        assert_eq!(cpus[0].idle, Some(200.0));
        assert_eq!(cpus[0].irq, Some(0.5));
        assert_eq!(cpus[3].guest_nice, Some(0.0));
    }

    #[test]
    fn test_cpu_times_legacy_columns_absent() {
        let cpus = legacy().cpu_times().unwrap();

        assert_eq!(cpus.len(), 2);
        assert_eq!(cpus[0].user, Some(50.0));
        assert_eq!(cpus[0].iowait, None);
        assert_eq!(cpus[0].steal, None);
    }

    #[test]
    fn test_cpu_times_percent_first_call_since_boot() {
        let cpus = typical().cpu_times_percent().unwrap();

        assert_eq!(cpus.len(), 4);
        let sum: f64 = ["user", "nice", "system", "idle", "iowait", "irq", "softirq", "steal"]
            .iter()
            .filter_map(|f| cpus[0].field(f))
            .sum();
        assert!((sum - 100.0).abs() < 1e-9);
        assert!((cpus[0].idle.unwrap() - 20000.0 / 23700.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_cpu_times_percent_uses_delta() {
        let mut fs = MockFs::typical_system();
        fs.add_file("/proc/stat", "cpu0 100 0 0 100 0 0 0 0 0 0\n");
        let provider = ProcfsProvider::new(fs, "/proc");
        provider.cpu_times_percent().unwrap();

        // The provider owns its MockFs, so build a second one sharing the sample
        let mut fs = MockFs::typical_system();
        fs.add_file("/proc/stat", "cpu0 175 0 0 125 0 0 0 0 0 0\n");
        let provider2 = ProcfsProvider {
            fs,
            proc_path: "/proc".to_string(),
            last_cpu: Mutex::new(provider.last_cpu.lock().unwrap().clone()),
        };

        let cpus = provider2.cpu_times_percent().unwrap();
        assert_eq!(cpus[0].user, Some(75.0));
        assert_eq!(cpus[0].idle, Some(25.0));
        assert_eq!(cpus[0].system, Some(0.0));
    }

    #[test]
    fn test_cpu_percent_zero_delta() {
        let stat = CpuStat {
            cpu_id: Some(0),
            user: 10,
            idle: 10,
            ..Default::default()
        };
        let pct = cpu_percent(Some(&stat), &stat);
        assert_eq!(pct.user, Some(0.0));
        assert_eq!(pct.iowait, None);
    }

    #[test]
    fn test_virtual_memory() {
        let mem = typical().virtual_memory().unwrap();

        assert_eq!(mem.total, 16384000 * 1024);
        assert_eq!(mem.free, Some(8192000 * 1024));
        assert_eq!(mem.available, Some(12000000 * 1024));
        // Cached includes reclaimable slab
        assert_eq!(mem.cached, Some((2048000 + 256000) * 1024));
        assert_eq!(
            mem.used,
            Some((16384000 - 8192000 - 512000 - 2304000) * 1024)
        );
        assert_eq!(mem.shared, Some(128000 * 1024));
        assert_eq!(mem.active, Some(4096000 * 1024));
    }

    #[test]
    fn test_virtual_memory_legacy_kernel() {
        let mem = legacy().virtual_memory().unwrap();

        assert_eq!(mem.total, 2048000 * 1024);
        assert_eq!(mem.available, Some((1024000 + 128000 + 256000) * 1024));
        assert_eq!(mem.shared, None);
        assert_eq!(mem.active, None);
    }

    #[test]
    fn test_swap_memory() {
        let swap = typical().swap_memory().unwrap();

        assert_eq!(swap.total, 4096000 * 1024);
        assert_eq!(swap.used, Some(1024000 * 1024));
        assert_eq!(swap.free, Some(3072000 * 1024));
        assert_eq!(swap.sin, Some(100 * 4096));
        assert_eq!(swap.sout, Some(200 * 4096));
    }

    #[test]
    fn test_swap_memory_without_vmstat() {
        let swap = legacy().swap_memory().unwrap();

        assert_eq!(swap.total, 0);
        assert_eq!(swap.sin, None);
        assert_eq!(swap.sout, None);
    }

    #[test]
    fn test_disk_io_counters() {
        let disks = typical().disk_io_counters().unwrap();

        assert_eq!(disks.len(), 2);
        assert_eq!(disks[0].device, "sda");
        assert_eq!(disks[0].read_bytes, Some(987654 * 512));
        assert_eq!(disks[0].write_bytes, Some(456789 * 512));
        assert_eq!(disks[0].read_count, Some(12345));
        assert_eq!(disks[0].read_time, Some(5000));
        assert_eq!(disks[0].read_merged_count, Some(100));
        assert_eq!(disks[0].busy_time, Some(4000));
        assert_eq!(disks[1].device, "nvme0n1");
    }

    #[test]
    fn test_net_io_counters() {
        let nics = typical().net_io_counters().unwrap();

        assert_eq!(nics.len(), 2);
        let eth0 = &nics[1];
        assert_eq!(eth0.interface, "eth0");
        assert_eq!(eth0.bytes_recv, Some(987654321));
        assert_eq!(eth0.bytes_sent, Some(123456789));
        assert_eq!(eth0.packets_recv, Some(654321));
        assert_eq!(eth0.packets_sent, Some(456789));
        assert_eq!(eth0.errin, Some(5));
        assert_eq!(eth0.errout, Some(2));
        assert_eq!(eth0.dropin, Some(10));
        assert_eq!(eth0.dropout, Some(7));
    }

    #[test]
    fn test_net_connections() {
        let conns = typical().net_connections().unwrap();

        assert_eq!(conns.len(), 5);

        assert_eq!(conns[0].laddr, "127.0.0.1:5432");
        assert_eq!(conns[0].raddr, "");
        assert_eq!(conns[0].status, "LISTEN");
        assert_eq!(conns[0].family, AF_INET);
        assert_eq!(conns[0].kind, SOCK_STREAM);
        assert_eq!(conns[0].pid, None);

        assert_eq!(conns[1].raddr, "127.0.0.1:54000");
        assert_eq!(conns[1].status, "ESTABLISHED");

        assert_eq!(conns[3].laddr, "[::]:22");
        assert_eq!(conns[3].family, AF_INET6);

        assert_eq!(conns[4].kind, SOCK_DGRAM);
        assert_eq!(conns[4].status, CONN_NONE);
        assert_eq!(conns[4].laddr, "0.0.0.0:68");
    }

    #[test]
    fn test_net_connections_skips_missing_tables() {
        let conns = legacy().net_connections().unwrap();
        assert_eq!(conns.len(), 4);
        assert!(conns.iter().all(|c| c.family == AF_INET));
    }

    #[test]
    fn test_process_memory() {
        let mem = typical().process_memory().unwrap();

        assert_eq!(mem.rss, Some(2000 * 4096));
        assert_eq!(mem.vms, Some(6250 * 4096));
        assert_eq!(mem.shared, Some(500 * 4096));
        assert_eq!(mem.data, Some(1500 * 4096));
    }

    #[test]
    fn test_process_cpu_times() {
        let cpu = typical().process_cpu_times().unwrap();

        assert_eq!(cpu.user, Some(1.5));
        assert_eq!(cpu.system, Some(0.75));
        assert_eq!(cpu.children_user, Some(0.2));
        assert_eq!(cpu.children_system, Some(0.1));
        assert_eq!(cpu.iowait, Some(0.12));
    }

    #[test]
    fn test_missing_source_is_io_error() {
        let mut fs = MockFs::typical_system();
        fs.remove_file("/proc/diskstats");
        let provider = ProcfsProvider::new(fs, "/proc");

        let err = provider.disk_io_counters().unwrap_err();
        assert!(matches!(err, CollectError::Io(_)));
    }

    #[test]
    fn test_custom_proc_path() {
        let mut fs = MockFs::new();
        fs.add_file("/host/proc/net/dev", "  eth1: 1 2 0 0 0 0 0 0 3 4 0 0 0 0 0 0\n");
        let provider = ProcfsProvider::new(fs, "/host/proc");

        let nics = provider.net_io_counters().unwrap();
        assert_eq!(nics[0].interface, "eth1");
        assert_eq!(nics[0].packets_sent, Some(4));
    }
}
