//! Instrument registration.
//!
//! [`SystemMetricsInstrumentor`] binds every collector to an instrument
//! descriptor (name, kind, unit) and hands the pair to a [`RegistrationSink`].
//! [`Registry`] is the in-memory sink used by the daemon and tests: it keeps
//! the registered callbacks and runs them all on demand.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::collector::dispatch;
use crate::config::{Configuration, MetricName, resolve};
use crate::error::Result;
use crate::labels::LabelSet;
use crate::measurement::{Measurement, Measurements};
use crate::provider::StatsProvider;

/// Instrument kind a metric is registered as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentKind {
    /// Monotonic cumulative value.
    Counter,
    /// Point-in-time value.
    Gauge,
    /// Value that can go up and down.
    UpDownCounter,
}

/// Registration entry for one metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstrumentDescriptor {
    pub metric: MetricName,
    /// Exported instrument name; runtime metrics embed the runtime tag.
    pub name: String,
    pub kind: InstrumentKind,
    pub unit: String,
    pub description: String,
}

impl InstrumentDescriptor {
    /// Builds the descriptor of `metric` for the given runtime tag.
    pub fn for_metric(metric: MetricName, runtime: &str) -> Self {
        use InstrumentKind::*;

        let (name, kind, unit, description) = match metric {
            MetricName::SystemCpuTime => (None, Counter, "seconds", "System CPU time"),
            MetricName::SystemCpuUtilization => (None, Gauge, "1", "System CPU utilization"),
            MetricName::SystemMemoryUsage => (None, Gauge, "bytes", "System memory usage"),
            MetricName::SystemMemoryUtilization => {
                (None, Gauge, "1", "System memory utilization")
            }
            MetricName::SystemSwapUsage => (None, Gauge, "bytes", "System swap usage"),
            MetricName::SystemSwapUtilization => (None, Gauge, "1", "System swap utilization"),
            MetricName::SystemDiskIo => (None, Counter, "bytes", "System disk IO"),
            MetricName::SystemDiskOperations => {
                (None, Counter, "operations", "System disk operations")
            }
            MetricName::SystemDiskTime => (None, Counter, "seconds", "System disk time"),
            MetricName::SystemDiskMerged => {
                (None, Counter, "operations", "System disk merged operations")
            }
            MetricName::SystemNetworkDroppedPackets => (
                Some("system.network.dropped_packets".to_string()),
                Counter,
                "packets",
                "System network dropped packets",
            ),
            MetricName::SystemNetworkPackets => {
                (None, Counter, "packets", "System network packets")
            }
            MetricName::SystemNetworkErrors => (None, Counter, "errors", "System network errors"),
            MetricName::SystemNetworkIo => (None, Counter, "bytes", "System network io"),
            MetricName::SystemNetworkConnections => (
                None,
                UpDownCounter,
                "connections",
                "System network connections",
            ),
            MetricName::RuntimeMemory => (
                Some(format!("runtime.{}.memory", runtime)),
                Counter,
                "bytes",
                "memory",
            ),
            MetricName::RuntimeCpuTime => (
                Some(format!("runtime.{}.cpu_time", runtime)),
                Counter,
                "seconds",
                "CPU time",
            ),
            MetricName::RuntimeGcCount => (
                Some(format!("runtime.{}.gc_count", runtime)),
                Counter,
                "collections",
                "GC count",
            ),
        };

        let description = match metric {
            MetricName::RuntimeMemory | MetricName::RuntimeCpuTime | MetricName::RuntimeGcCount => {
                format!("Runtime {} {}", runtime, description)
            }
            _ => description.to_string(),
        };

        Self {
            metric,
            name: name.unwrap_or_else(|| metric.as_str().to_string()),
            kind,
            unit: unit.to_string(),
            description,
        }
    }
}

/// Collection callback bound to an instrument.
pub type Callback = Arc<dyn Fn() -> Result<Measurements> + Send + Sync>;

/// Host side of instrument registration.
pub trait RegistrationSink {
    fn register(&mut self, descriptor: InstrumentDescriptor, callback: Callback);
}

/// Registers the system and runtime metric instruments.
///
/// Collectors are bound to the configuration and base labels given at
/// construction; the configuration defaults to the built-in catalog.
pub struct SystemMetricsInstrumentor {
    provider: Arc<dyn StatsProvider>,
    labels: Arc<LabelSet>,
    config: Arc<Configuration>,
}

impl SystemMetricsInstrumentor {
    pub fn new(provider: Arc<dyn StatsProvider>) -> Self {
        Self {
            provider,
            labels: Arc::new(LabelSet::new()),
            config: Arc::new(resolve(None)),
        }
    }

    /// Sets the base labels merged into every measurement.
    pub fn with_labels(mut self, labels: LabelSet) -> Self {
        self.labels = Arc::new(labels);
        self
    }

    /// Replaces the whole configuration; it is not merged with the catalog.
    pub fn with_config(mut self, config: Configuration) -> Self {
        self.config = Arc::new(resolve(Some(config)));
        self
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    /// Metrics that get an instrument, in registration order.
    ///
    /// `system.disk.merged` is opt-in and only registered when configured.
    fn registered_metrics(&self) -> impl Iterator<Item = MetricName> + '_ {
        MetricName::ALL
            .into_iter()
            .filter(|m| *m != MetricName::SystemDiskMerged || self.config.contains(*m))
    }

    /// The registration table.
    pub fn descriptors(&self) -> Vec<InstrumentDescriptor> {
        let runtime = self.provider.runtime_name().to_lowercase();
        self.registered_metrics()
            .map(|m| InstrumentDescriptor::for_metric(m, &runtime))
            .collect()
    }

    /// Registers one instrument per metric with `sink`.
    pub fn instrument(&self, sink: &mut dyn RegistrationSink) {
        let descriptors = self.descriptors();
        let count = descriptors.len();

        for descriptor in descriptors {
            let metric = descriptor.metric;
            let provider = Arc::clone(&self.provider);
            let labels = Arc::clone(&self.labels);
            let config = Arc::clone(&self.config);

            debug!(name = %descriptor.name, kind = ?descriptor.kind, "registering instrument");
            let callback: Callback =
                Arc::new(move || dispatch(metric, &config, provider.as_ref(), &labels));
            sink.register(descriptor, callback);
        }

        info!(instruments = count, "system metrics instrumented");
    }

    /// Nothing is held after registration, so there is nothing to release.
    pub fn uninstrument(&self) {
        debug!("uninstrument requested, nothing to release");
    }
}

/// In-memory registration sink.
#[derive(Default)]
pub struct Registry {
    instruments: Vec<(InstrumentDescriptor, Callback)>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn instruments(&self) -> impl Iterator<Item = &InstrumentDescriptor> {
        self.instruments.iter().map(|(d, _)| d)
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }

    /// Runs every callback once, in registration order.
    ///
    /// A failing instrument does not stop the others.
    pub fn collect_all(&self) -> Vec<(InstrumentDescriptor, Result<Vec<Measurement>>)> {
        self.instruments
            .iter()
            .map(|(descriptor, callback)| {
                let start = Instant::now();
                let result = callback().map(|measurements| measurements.collect());
                trace!(
                    name = %descriptor.name,
                    elapsed_us = start.elapsed().as_micros() as u64,
                    "collected"
                );
                (descriptor.clone(), result)
            })
            .collect()
    }
}

impl RegistrationSink for Registry {
    fn register(&mut self, descriptor: InstrumentDescriptor, callback: Callback) {
        self.instruments.push((descriptor, callback));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CollectError;
    use crate::provider::types::NetCounters;
    use crate::provider::{FixtureProvider, MockFs, ProcfsProvider};

    fn descriptor<'a>(table: &'a [InstrumentDescriptor], name: &str) -> &'a InstrumentDescriptor {
        table.iter().find(|d| d.name == name).unwrap()
    }

    #[test]
    fn test_default_registration_table() {
        let instrumentor = SystemMetricsInstrumentor::new(Arc::new(FixtureProvider::new()));
        let table = instrumentor.descriptors();

        // 16 catalog metrics plus gc_count
        assert_eq!(table.len(), 17);
        assert!(table.iter().all(|d| d.metric != MetricName::SystemDiskMerged));

        let cpu = descriptor(&table, "system.cpu.time");
        assert_eq!(cpu.kind, InstrumentKind::Counter);
        assert_eq!(cpu.unit, "seconds");

        let util = descriptor(&table, "system.memory.utilization");
        assert_eq!(util.kind, InstrumentKind::Gauge);
        assert_eq!(util.unit, "1");

        let conns = descriptor(&table, "system.network.connections");
        assert_eq!(conns.kind, InstrumentKind::UpDownCounter);
        assert_eq!(conns.unit, "connections");

        let dropped = descriptor(&table, "system.network.dropped_packets");
        assert_eq!(dropped.metric, MetricName::SystemNetworkDroppedPackets);
        assert_eq!(dropped.unit, "packets");
    }

    #[test]
    fn test_runtime_names_templated() {
        let provider = FixtureProvider::new().with_runtime_name("Rust");
        let instrumentor = SystemMetricsInstrumentor::new(Arc::new(provider));
        let table = instrumentor.descriptors();

        let memory = descriptor(&table, "runtime.rust.memory");
        assert_eq!(memory.description, "Runtime rust memory");
        assert_eq!(memory.unit, "bytes");
        assert_eq!(descriptor(&table, "runtime.rust.cpu_time").unit, "seconds");
        assert_eq!(
            descriptor(&table, "runtime.rust.gc_count").unit,
            "collections"
        );
    }

    #[test]
    fn test_disk_merged_registered_when_configured() {
        let config = Configuration::default_catalog()
            .with_metric(MetricName::SystemDiskMerged, ["read", "write"]);
        let instrumentor =
            SystemMetricsInstrumentor::new(Arc::new(FixtureProvider::new())).with_config(config);

        let table = instrumentor.descriptors();
        assert_eq!(table.len(), 18);
        assert_eq!(descriptor(&table, "system.disk.merged").unit, "operations");
    }

    #[test]
    fn test_instrument_and_collect() {
        let provider = ProcfsProvider::new(MockFs::typical_system(), "/proc");
        let instrumentor = SystemMetricsInstrumentor::new(Arc::new(provider))
            .with_labels(LabelSet::new().with("host", "db-1"));

        let mut registry = Registry::new();
        instrumentor.instrument(&mut registry);
        assert_eq!(registry.len(), 17);

        let results = registry.collect_all();
        for (descriptor, result) in &results {
            let measurements = result.as_ref().unwrap();
            assert!(
                measurements
                    .iter()
                    .all(|m| m.labels.get_str("host") == Some("db-1")),
                "{} lost base labels",
                descriptor.name
            );
        }

        let (_, cpu) = results
            .iter()
            .find(|(d, _)| d.metric == MetricName::SystemCpuTime)
            .unwrap();
        assert_eq!(cpu.as_ref().unwrap().len(), 16);

        instrumentor.uninstrument();
    }

    #[test]
    fn test_partial_override_fails_omitted_metric() {
        let provider = FixtureProvider::new().with_nics(vec![NetCounters {
            interface: "eth0".to_string(),
            bytes_sent: Some(1),
            ..Default::default()
        }]);
        let config = Configuration::empty().with_metric(MetricName::SystemNetworkIo, ["transmit"]);
        let instrumentor =
            SystemMetricsInstrumentor::new(Arc::new(provider)).with_config(config);

        let mut registry = Registry::new();
        instrumentor.instrument(&mut registry);

        for (descriptor, result) in registry.collect_all() {
            match descriptor.metric {
                MetricName::SystemNetworkIo => assert_eq!(result.unwrap().len(), 1),
                MetricName::RuntimeGcCount => assert!(result.unwrap().is_empty()),
                other => assert!(
                    matches!(result, Err(CollectError::MetricNotConfigured(m)) if m == other),
                    "{} should not fall back to defaults",
                    other
                ),
            }
        }
    }

    #[test]
    fn test_instrument_kind_serialization() {
        let json = serde_json::to_string(&InstrumentKind::UpDownCounter).unwrap();
        assert_eq!(json, "\"up_down_counter\"");
    }
}
