//! Metric collectors.
//!
//! Each collector reads one kind of record from a [`StatsProvider`] and
//! expands it into labeled measurements, one per record and configured field
//! the record exposes. All provider reads and mapping checks happen before
//! the iterator is returned, so a returned iterator never fails.
//!
//! ```
//! use hoststat_core::collector::dispatch;
//! use hoststat_core::provider::{MockFs, ProcfsProvider};
//! use hoststat_core::{Configuration, LabelSet, MetricName};
//!
//! let provider = ProcfsProvider::new(MockFs::typical_system(), "/proc");
//! let config = Configuration::default_catalog();
//! let cpu = dispatch(MetricName::SystemCpuTime, &config, &provider, &LabelSet::new()).unwrap();
//! // 4 CPUs x [idle, user, system, irq]
//! assert_eq!(cpu.count(), 16);
//! ```

pub mod cpu;
pub mod disk;
pub mod memory;
pub mod network;
pub mod runtime;

use tracing::trace;

use crate::config::{Configuration, MetricName};
use crate::error::Result;
use crate::labels::LabelSet;
use crate::measurement::{Measurement, Measurements};
use crate::provider::StatsProvider;

/// Signature shared by all collectors.
pub type CollectorFn = fn(&Configuration, &dyn StatsProvider, &LabelSet) -> Result<Measurements>;

/// Returns the collector bound to `metric`.
pub fn collector_for(metric: MetricName) -> CollectorFn {
    match metric {
        MetricName::SystemCpuTime => cpu::cpu_time,
        MetricName::SystemCpuUtilization => cpu::cpu_utilization,
        MetricName::SystemMemoryUsage => memory::memory_usage,
        MetricName::SystemMemoryUtilization => memory::memory_utilization,
        MetricName::SystemSwapUsage => memory::swap_usage,
        MetricName::SystemSwapUtilization => memory::swap_utilization,
        MetricName::SystemDiskIo => disk::disk_io,
        MetricName::SystemDiskOperations => disk::disk_operations,
        MetricName::SystemDiskTime => disk::disk_time,
        MetricName::SystemDiskMerged => disk::disk_merged,
        MetricName::SystemNetworkDroppedPackets => network::dropped_packets,
        MetricName::SystemNetworkPackets => network::packets,
        MetricName::SystemNetworkErrors => network::errors,
        MetricName::SystemNetworkIo => network::io,
        MetricName::SystemNetworkConnections => network::connections,
        MetricName::RuntimeMemory => runtime::memory,
        MetricName::RuntimeCpuTime => runtime::cpu_time,
        MetricName::RuntimeGcCount => runtime::gc_count,
    }
}

/// Runs the collector for `metric`.
pub fn dispatch(
    metric: MetricName,
    config: &Configuration,
    provider: &dyn StatsProvider,
    base: &LabelSet,
) -> Result<Measurements> {
    trace!(metric = %metric, "collecting");
    collector_for(metric)(config, provider, base)
}

/// Expands each record into one measurement per selector entry.
///
/// `emit` returns `None` for fields the record does not expose. Records are
/// expanded lazily, one at a time.
pub(crate) fn expand<I, T, F>(records: I, selectors: Vec<T>, emit: F) -> Measurements
where
    I: IntoIterator,
    I::IntoIter: Send + 'static,
    T: Send + 'static,
    F: Fn(&I::Item, &T) -> Option<Measurement> + Send + 'static,
{
    Box::new(records.into_iter().flat_map(move |record| {
        selectors
            .iter()
            .filter_map(|selector| emit(&record, selector))
            .collect::<Vec<_>>()
    }))
}

/// `raw / total`, or `0.0` when the total is zero.
pub(crate) fn ratio(raw: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        raw as f64 / total as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::FixtureProvider;
    use crate::provider::types::{CpuTimes, NetCounters};
    use std::collections::HashSet;

    #[test]
    fn test_every_metric_has_a_collector() {
        let provider = FixtureProvider::new();
        let config = Configuration::default_catalog()
            .with_metric(MetricName::SystemDiskMerged, ["read", "write"]);

        for metric in MetricName::ALL {
            let result = dispatch(metric, &config, &provider, &LabelSet::new());
            assert!(result.is_ok(), "{} failed", metric);
        }
    }

    #[test]
    fn test_expand_skips_unexposed_fields() {
        let records = vec![(1u64, None), (2u64, Some(5u64))];
        let selectors = vec!["a".to_string(), "b".to_string()];

        let out: Vec<Measurement> = expand(records, selectors, |(id, b), sel: &String| {
            let value = if sel == "a" { Some(*id) } else { *b }?;
            Some(Measurement::new(value as f64, LabelSet::new().with("sel", sel.as_str())))
        })
        .collect();

        assert_eq!(out.len(), 3);
        assert_eq!(out[2].value, 5.0);
    }

    #[test]
    fn test_repeated_field_emits_once_per_record() {
        let provider = FixtureProvider::new().with_cpu_times(vec![CpuTimes {
            idle: Some(2.0),
            user: Some(1.0),
            ..Default::default()
        }]);
        let config =
            Configuration::empty().with_metric(MetricName::SystemCpuTime, ["idle", "idle", "user"]);

        let out: Vec<_> = dispatch(MetricName::SystemCpuTime, &config, &provider, &LabelSet::new())
            .unwrap()
            .collect();

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].labels.get_str("state"), Some("idle"));
        assert_eq!(out[1].labels.get_str("state"), Some("user"));
    }

    #[test]
    fn test_ratio_zero_total() {
        assert_eq!(ratio(10, 0), 0.0);
        assert_eq!(ratio(1, 4), 0.25);
    }

    #[test]
    fn test_missing_metric_fails() {
        let provider = FixtureProvider::new().with_cpu_times(vec![CpuTimes::default()]);
        let config = Configuration::empty();

        let err = dispatch(MetricName::SystemCpuTime, &config, &provider, &LabelSet::new())
            .err()
            .unwrap();
        assert!(matches!(
            err,
            crate::error::CollectError::MetricNotConfigured(MetricName::SystemCpuTime)
        ));
    }

    #[test]
    fn test_collection_is_idempotent() {
        let provider = FixtureProvider::new().with_nics(vec![
            NetCounters {
                interface: "eth0".to_string(),
                bytes_sent: Some(10),
                bytes_recv: Some(20),
                ..Default::default()
            },
            NetCounters {
                interface: "eth1".to_string(),
                bytes_sent: Some(30),
                bytes_recv: Some(40),
                ..Default::default()
            },
        ]);
        let config = Configuration::default_catalog();
        let base = LabelSet::new().with("host", "db-1");

        let collect = || -> HashSet<String> {
            dispatch(MetricName::SystemNetworkIo, &config, &provider, &base)
                .unwrap()
                .map(|m| format!("{}={}", serde_json::to_string(&m.labels).unwrap(), m.value))
                .collect()
        };

        let first = collect();
        assert_eq!(first.len(), 4);
        assert_eq!(first, collect());
    }

    #[test]
    fn test_concurrent_collectors_are_isolated() {
        let provider = FixtureProvider::new()
            .with_cpu_times(vec![CpuTimes {
                user: Some(1.0),
                idle: Some(2.0),
                system: Some(3.0),
                irq: Some(4.0),
                ..Default::default()
            }])
            .with_nics(vec![NetCounters {
                interface: "eth0".to_string(),
                packets_sent: Some(1),
                packets_recv: Some(2),
                ..Default::default()
            }]);
        let config = Configuration::default_catalog();
        let base = LabelSet::new().with("host", "db-1");

        std::thread::scope(|s| {
            let cpu = s.spawn(|| {
                (0..100)
                    .flat_map(|_| {
                        dispatch(MetricName::SystemCpuTime, &config, &provider, &base).unwrap()
                    })
                    .collect::<Vec<_>>()
            });
            let net = s.spawn(|| {
                (0..100)
                    .flat_map(|_| {
                        dispatch(MetricName::SystemNetworkPackets, &config, &provider, &base)
                            .unwrap()
                    })
                    .collect::<Vec<_>>()
            });

            for m in cpu.join().unwrap() {
                assert!(m.labels.get("device").is_none());
                assert!(m.labels.get("direction").is_none());
                assert_eq!(m.labels.len(), 3);
            }
            for m in net.join().unwrap() {
                assert!(m.labels.get("cpu").is_none());
                assert!(m.labels.get("state").is_none());
                assert_eq!(m.labels.len(), 3);
            }
        });

        assert_eq!(base.len(), 1);
    }
}
