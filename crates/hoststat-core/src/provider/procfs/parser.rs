//! Parsers for `/proc` filesystem files.
//!
//! These are pure functions that parse the content of various `/proc` files
//! into structured data. They are designed to be easily testable with string inputs.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

/// Error type for parsing failures.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Parse error: {}", self.message)
    }
}

impl std::error::Error for ParseError {}

impl From<ParseError> for crate::error::CollectError {
    fn from(e: ParseError) -> Self {
        crate::error::CollectError::Parse(e.message)
    }
}

// ============ Process Stat Parser ============

/// Fields of `/proc/[pid]/stat` used for process CPU time.
#[derive(Debug, Clone, Default)]
pub struct ProcStat {
    pub utime: u64,
    pub stime: u64,
    pub cutime: i64,
    pub cstime: i64,
    /// Aggregated block I/O delay in clock ticks; absent on old kernels.
    pub delayacct_blkio_ticks: Option<u64>,
}

/// Parses `/proc/[pid]/stat` content.
///
/// The format is tricky because the comm field can contain spaces and parentheses.
/// Format: pid (comm) state ppid pgrp session tty_nr ...
pub fn parse_proc_stat(content: &str) -> Result<ProcStat, ParseError> {
    let content = content.trim();

    // comm is enclosed in the first '(' and the last ')'
    let open_paren = content
        .find('(')
        .ok_or_else(|| ParseError::new("missing '(' in stat"))?;
    let close_paren = content
        .rfind(')')
        .ok_or_else(|| ParseError::new("missing ')' in stat"))?;

    if close_paren <= open_paren {
        return Err(ParseError::new("invalid parentheses in stat"));
    }

    content[..open_paren]
        .trim()
        .parse::<u32>()
        .map_err(|_| ParseError::new("invalid pid"))?;

    // Field indices below are relative to the first field after ')'
    let fields: Vec<&str> = content[close_paren + 1..].split_whitespace().collect();

    if fields.len() < 22 {
        return Err(ParseError::new(format!(
            "not enough fields in stat: expected 22+, got {}",
            fields.len()
        )));
    }

    let parse_i64 = |idx: usize, name: &str| -> Result<i64, ParseError> {
        fields[idx]
            .parse()
            .map_err(|_| ParseError::new(format!("invalid {}", name)))
    };

    let parse_u64 = |idx: usize, name: &str| -> Result<u64, ParseError> {
        fields[idx]
            .parse()
            .map_err(|_| ParseError::new(format!("invalid {}", name)))
    };

    Ok(ProcStat {
        utime: parse_u64(11, "utime")?,
        stime: parse_u64(12, "stime")?,
        cutime: parse_i64(13, "cutime")?,
        cstime: parse_i64(14, "cstime")?,
        delayacct_blkio_ticks: fields.get(39).and_then(|s| s.parse().ok()),
    })
}

// ============ Process Statm Parser ============

/// Parsed data from `/proc/[pid]/statm`, in pages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcStatm {
    pub size: u64,
    pub resident: u64,
    pub shared: u64,
    pub text: u64,
    pub lib: u64,
    pub data: u64,
    pub dirty: u64,
}

/// Parses `/proc/[pid]/statm` content.
///
/// Format: size resident shared text lib data dt
pub fn parse_statm(content: &str) -> Result<ProcStatm, ParseError> {
    let values: Vec<u64> = content
        .split_whitespace()
        .map(|s| s.parse().map_err(|_| ParseError::new("invalid statm value")))
        .collect::<Result<_, _>>()?;

    if values.len() < 7 {
        return Err(ParseError::new(format!(
            "not enough fields in statm: expected 7, got {}",
            values.len()
        )));
    }

    Ok(ProcStatm {
        size: values[0],
        resident: values[1],
        shared: values[2],
        text: values[3],
        lib: values[4],
        data: values[5],
        dirty: values[6],
    })
}

// ============ Meminfo Parser ============

/// Parsed data from `/proc/meminfo`, in kB.
///
/// Fields introduced by newer kernels are optional.
#[derive(Debug, Clone, Default)]
pub struct MemInfo {
    pub mem_total: u64,
    pub mem_free: u64,
    pub mem_available: Option<u64>,
    pub buffers: u64,
    pub cached: u64,
    pub active: Option<u64>,
    pub inactive: Option<u64>,
    pub swap_total: u64,
    pub swap_free: u64,
    pub shmem: Option<u64>,
    pub slab: Option<u64>,
    pub s_reclaimable: Option<u64>,
}

/// Parses `/proc/meminfo` content.
pub fn parse_meminfo(content: &str) -> Result<MemInfo, ParseError> {
    let mut info = MemInfo::default();
    let mut saw_total = false;

    for line in content.lines() {
        let Some((key, rest)) = line.split_once(':') else {
            continue;
        };
        let Some(value) = rest.split_whitespace().next().and_then(|s| s.parse().ok()) else {
            continue;
        };

        match key.trim() {
            "MemTotal" => {
                info.mem_total = value;
                saw_total = true;
            }
            "MemFree" => info.mem_free = value,
            "MemAvailable" => info.mem_available = Some(value),
            "Buffers" => info.buffers = value,
            "Cached" => info.cached = value,
            "Active" => info.active = Some(value),
            "Inactive" => info.inactive = Some(value),
            "SwapTotal" => info.swap_total = value,
            "SwapFree" => info.swap_free = value,
            "Shmem" => info.shmem = Some(value),
            "Slab" => info.slab = Some(value),
            "SReclaimable" => info.s_reclaimable = Some(value),
            _ => {}
        }
    }

    if !saw_total {
        return Err(ParseError::new("missing MemTotal in meminfo"));
    }

    Ok(info)
}

// ============ Global Stat Parser ============

/// Per-CPU line from `/proc/stat`, in clock ticks.
///
/// Columns beyond `idle` were added over kernel versions and are `None` when
/// the line is shorter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CpuStat {
    pub cpu_id: Option<u32>, // None for aggregate "cpu" line
    pub user: u64,
    pub nice: u64,
    pub system: u64,
    pub idle: u64,
    pub iowait: Option<u64>,
    pub irq: Option<u64>,
    pub softirq: Option<u64>,
    pub steal: Option<u64>,
    pub guest: Option<u64>,
    pub guest_nice: Option<u64>,
}

impl CpuStat {
    /// Total busy and idle ticks, excluding guest time (already counted in user).
    pub fn total(&self) -> u64 {
        self.user
            + self.nice
            + self.system
            + self.idle
            + self.iowait.unwrap_or(0)
            + self.irq.unwrap_or(0)
            + self.softirq.unwrap_or(0)
            + self.steal.unwrap_or(0)
    }
}

/// Parses the CPU lines of `/proc/stat`.
///
/// Returns the aggregate line (if present) followed by per-CPU lines in file order.
pub fn parse_cpu_stats(content: &str) -> Result<Vec<CpuStat>, ParseError> {
    let mut cpus = Vec::new();

    for line in content.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        let Some(name) = parts.first() else {
            continue;
        };
        if !name.starts_with("cpu") {
            continue;
        }

        let cpu_id = if *name == "cpu" {
            None
        } else {
            Some(
                name.strip_prefix("cpu")
                    .and_then(|s| s.parse().ok())
                    .ok_or_else(|| ParseError::new(format!("invalid cpu line '{}'", name)))?,
            )
        };

        if parts.len() < 5 {
            return Err(ParseError::new(format!(
                "not enough columns for {}: expected 4+, got {}",
                name,
                parts.len() - 1
            )));
        }

        let get_val = |idx: usize| -> Result<Option<u64>, ParseError> {
            parts
                .get(idx)
                .map(|s| {
                    s.parse()
                        .map_err(|_| ParseError::new(format!("invalid value in {}", name)))
                })
                .transpose()
        };
        let required = |idx: usize| -> Result<u64, ParseError> { Ok(get_val(idx)?.unwrap_or(0)) };

        cpus.push(CpuStat {
            cpu_id,
            user: required(1)?,
            nice: required(2)?,
            system: required(3)?,
            idle: required(4)?,
            iowait: get_val(5)?,
            irq: get_val(6)?,
            softirq: get_val(7)?,
            steal: get_val(8)?,
            guest: get_val(9)?,
            guest_nice: get_val(10)?,
        });
    }

    Ok(cpus)
}

// ============ Vmstat Parser ============

/// Swap paging counters from `/proc/vmstat`, in pages.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VmstatSwap {
    pub pswpin: u64,
    pub pswpout: u64,
}

/// Parses the swap counters out of `/proc/vmstat`.
///
/// Format: key value (one per line)
pub fn parse_vmstat_swap(content: &str) -> Result<VmstatSwap, ParseError> {
    let mut info = VmstatSwap::default();

    for line in content.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 2 {
            continue;
        }

        let value: u64 = parts[1].parse().unwrap_or(0);
        match parts[0] {
            "pswpin" => info.pswpin = value,
            "pswpout" => info.pswpout = value,
            _ => {}
        }
    }

    Ok(info)
}

// ============ Disk Stats Parser ============

/// Parsed data from `/proc/diskstats`.
#[derive(Debug, Clone, Default)]
pub struct DiskStats {
    /// Device name (sda, nvme0n1, etc.)
    pub device: String,
    /// Number of reads completed
    pub reads: u64,
    /// Number of read requests merged
    pub r_merged: u64,
    /// Number of sectors read
    pub read_sectors: u64,
    /// Time spent reading (ms)
    pub read_time: u64,
    /// Number of writes completed
    pub writes: u64,
    /// Number of write requests merged
    pub w_merged: u64,
    /// Number of sectors written
    pub write_sectors: u64,
    /// Time spent writing (ms)
    pub write_time: u64,
    /// Time spent doing I/Os (ms)
    pub io_time: u64,
}

/// Parses `/proc/diskstats` content.
///
/// Format: major minor name reads r_merged r_sectors r_time writes w_merged w_sectors w_time io_pending io_time w_io_time [discards ...]
pub fn parse_diskstats(content: &str) -> Result<Vec<DiskStats>, ParseError> {
    let mut disks = Vec::new();

    for line in content.lines() {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 14 {
            continue; // Skip malformed lines
        }

        let get_val =
            |idx: usize| -> u64 { parts.get(idx).and_then(|s| s.parse().ok()).unwrap_or(0) };

        disks.push(DiskStats {
            device: parts[2].to_string(),
            reads: get_val(3),
            r_merged: get_val(4),
            read_sectors: get_val(5),
            read_time: get_val(6),
            writes: get_val(7),
            w_merged: get_val(8),
            write_sectors: get_val(9),
            write_time: get_val(10),
            io_time: get_val(12),
        });
    }

    Ok(disks)
}

// ============ Network Device Stats Parser ============

/// Parsed data from `/proc/net/dev`.
#[derive(Debug, Clone, Default)]
pub struct NetDevStats {
    /// Interface name (eth0, lo, etc.)
    pub interface: String,
    pub rx_bytes: u64,
    pub rx_packets: u64,
    pub rx_errs: u64,
    pub rx_drop: u64,
    pub tx_bytes: u64,
    pub tx_packets: u64,
    pub tx_errs: u64,
    pub tx_drop: u64,
}

/// Parses `/proc/net/dev` content.
///
/// Format:
/// Inter-|   Receive                                                |  Transmit
///  face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
///    lo: 1234567     1234    0    0    0     0          0         0  1234567     1234    0    0    0     0       0          0
pub fn parse_net_dev(content: &str) -> Result<Vec<NetDevStats>, ParseError> {
    let mut devices = Vec::new();

    for line in content.lines() {
        // Skip header lines
        if line.contains('|') || line.trim().is_empty() {
            continue;
        }

        let Some((interface, counters)) = line.split_once(':') else {
            continue;
        };

        let values: Vec<&str> = counters.split_whitespace().collect();
        if values.len() < 16 {
            continue;
        }

        let get_val =
            |idx: usize| -> u64 { values.get(idx).and_then(|s| s.parse().ok()).unwrap_or(0) };

        devices.push(NetDevStats {
            interface: interface.trim().to_string(),
            rx_bytes: get_val(0),
            rx_packets: get_val(1),
            rx_errs: get_val(2),
            rx_drop: get_val(3),
            tx_bytes: get_val(8),
            tx_packets: get_val(9),
            tx_errs: get_val(10),
            tx_drop: get_val(11),
        });
    }

    Ok(devices)
}

// ============ Socket Table Parser ============

/// One row of `/proc/net/{tcp,tcp6,udp,udp6}`.
#[derive(Debug, Clone, PartialEq)]
pub struct SocketEntry {
    pub local: SocketAddr,
    pub remote: SocketAddr,
    /// Kernel socket state code (`st` column).
    pub state: u8,
}

/// Maps a kernel TCP state code to its conventional name.
pub fn tcp_state_name(state: u8) -> &'static str {
    match state {
        0x01 => "ESTABLISHED",
        0x02 => "SYN_SENT",
        0x03 => "SYN_RECV",
        0x04 => "FIN_WAIT1",
        0x05 => "FIN_WAIT2",
        0x06 => "TIME_WAIT",
        0x07 => "CLOSE",
        0x08 => "CLOSE_WAIT",
        0x09 => "LAST_ACK",
        0x0A => "LISTEN",
        0x0B => "CLOSING",
        0x0C => "NEW_SYN_RECV",
        _ => "UNKNOWN",
    }
}

/// Decodes an `ADDR:PORT` pair as printed by the kernel.
///
/// The address is the in-kernel `__be32` words printed as host-order hex, so
/// reading each word back in native byte order restores network order.
fn parse_hex_socket_addr(field: &str) -> Result<SocketAddr, ParseError> {
    let (addr, port) = field
        .split_once(':')
        .ok_or_else(|| ParseError::new(format!("invalid socket address '{}'", field)))?;
    let port = u16::from_str_radix(port, 16)
        .map_err(|_| ParseError::new(format!("invalid port in '{}'", field)))?;

    let word = |chunk: &str| -> Result<[u8; 4], ParseError> {
        u32::from_str_radix(chunk, 16)
            .map(u32::to_ne_bytes)
            .map_err(|_| ParseError::new(format!("invalid address in '{}'", field)))
    };

    let ip = match addr.len() {
        8 => IpAddr::V4(Ipv4Addr::from(word(addr)?)),
        32 => {
            let mut octets = [0u8; 16];
            for (i, chunk) in octets.chunks_mut(4).enumerate() {
                chunk.copy_from_slice(&word(&addr[i * 8..i * 8 + 8])?);
            }
            IpAddr::V6(Ipv6Addr::from(octets))
        }
        _ => {
            return Err(ParseError::new(format!(
                "unexpected address length in '{}'",
                field
            )));
        }
    };

    Ok(SocketAddr::new(ip, port))
}

/// Parses a `/proc/net/{tcp,tcp6,udp,udp6}` table.
///
/// Format (after the header line):
/// sl local_address rem_address st tx_queue:rx_queue tr:tm->when retrnsmt uid timeout inode ...
pub fn parse_net_sockets(content: &str) -> Result<Vec<SocketEntry>, ParseError> {
    let mut entries = Vec::new();

    for line in content.lines().skip(1) {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 10 {
            continue;
        }

        let state = u8::from_str_radix(parts[3], 16)
            .map_err(|_| ParseError::new(format!("invalid socket state '{}'", parts[3])))?;

        entries.push(SocketEntry {
            local: parse_hex_socket_addr(parts[1])?,
            remote: parse_hex_socket_addr(parts[2])?,
            state,
        });
    }

    Ok(entries)
}
