//! Metric catalog and the configuration model selecting sub-fields per metric.
//!
//! A [`Configuration`] maps each [`MetricName`] to the ordered list of
//! sub-fields its collector emits. The built-in catalog is used unless the
//! caller supplies a replacement; a replacement is never merged with the
//! defaults, so metrics it omits are not collected.

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{CollectError, ConfigError};

/// Identifier of a metric in the fixed catalog.
///
/// Variants are declared in catalog order, which is also the iteration order
/// of a [`Configuration`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MetricName {
    #[serde(rename = "system.cpu.time")]
    SystemCpuTime,
    #[serde(rename = "system.cpu.utilization")]
    SystemCpuUtilization,
    #[serde(rename = "system.memory.usage")]
    SystemMemoryUsage,
    #[serde(rename = "system.memory.utilization")]
    SystemMemoryUtilization,
    #[serde(rename = "system.swap.usage")]
    SystemSwapUsage,
    #[serde(rename = "system.swap.utilization")]
    SystemSwapUtilization,
    #[serde(rename = "system.disk.io")]
    SystemDiskIo,
    #[serde(rename = "system.disk.operations")]
    SystemDiskOperations,
    #[serde(rename = "system.disk.time")]
    SystemDiskTime,
    #[serde(rename = "system.disk.merged")]
    SystemDiskMerged,
    #[serde(rename = "system.network.dropped.packets")]
    SystemNetworkDroppedPackets,
    #[serde(rename = "system.network.packets")]
    SystemNetworkPackets,
    #[serde(rename = "system.network.errors")]
    SystemNetworkErrors,
    #[serde(rename = "system.network.io")]
    SystemNetworkIo,
    #[serde(rename = "system.network.connections")]
    SystemNetworkConnections,
    #[serde(rename = "runtime.memory")]
    RuntimeMemory,
    #[serde(rename = "runtime.cpu.time")]
    RuntimeCpuTime,
    #[serde(rename = "runtime.gc_count")]
    RuntimeGcCount,
}

impl MetricName {
    /// Every metric the collectors know about.
    pub const ALL: [MetricName; 18] = [
        MetricName::SystemCpuTime,
        MetricName::SystemCpuUtilization,
        MetricName::SystemMemoryUsage,
        MetricName::SystemMemoryUtilization,
        MetricName::SystemSwapUsage,
        MetricName::SystemSwapUtilization,
        MetricName::SystemDiskIo,
        MetricName::SystemDiskOperations,
        MetricName::SystemDiskTime,
        MetricName::SystemDiskMerged,
        MetricName::SystemNetworkDroppedPackets,
        MetricName::SystemNetworkPackets,
        MetricName::SystemNetworkErrors,
        MetricName::SystemNetworkIo,
        MetricName::SystemNetworkConnections,
        MetricName::RuntimeMemory,
        MetricName::RuntimeCpuTime,
        MetricName::RuntimeGcCount,
    ];

    /// Configuration key of the metric.
    pub fn as_str(self) -> &'static str {
        match self {
            MetricName::SystemCpuTime => "system.cpu.time",
            MetricName::SystemCpuUtilization => "system.cpu.utilization",
            MetricName::SystemMemoryUsage => "system.memory.usage",
            MetricName::SystemMemoryUtilization => "system.memory.utilization",
            MetricName::SystemSwapUsage => "system.swap.usage",
            MetricName::SystemSwapUtilization => "system.swap.utilization",
            MetricName::SystemDiskIo => "system.disk.io",
            MetricName::SystemDiskOperations => "system.disk.operations",
            MetricName::SystemDiskTime => "system.disk.time",
            MetricName::SystemDiskMerged => "system.disk.merged",
            MetricName::SystemNetworkDroppedPackets => "system.network.dropped.packets",
            MetricName::SystemNetworkPackets => "system.network.packets",
            MetricName::SystemNetworkErrors => "system.network.errors",
            MetricName::SystemNetworkIo => "system.network.io",
            MetricName::SystemNetworkConnections => "system.network.connections",
            MetricName::RuntimeMemory => "runtime.memory",
            MetricName::RuntimeCpuTime => "runtime.cpu.time",
            MetricName::RuntimeGcCount => "runtime.gc_count",
        }
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MetricName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MetricName::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| format!("unknown metric name '{}'", s))
    }
}

/// Built-in catalog: metric key and its default fields.
const DEFAULT_CATALOG: &[(MetricName, &[&str])] = &[
    (MetricName::SystemCpuTime, &["idle", "user", "system", "irq"]),
    (MetricName::SystemCpuUtilization, &["idle", "user", "system", "irq"]),
    (MetricName::SystemMemoryUsage, &["used", "free", "cached"]),
    (MetricName::SystemMemoryUtilization, &["used", "free", "cached"]),
    (MetricName::SystemSwapUsage, &["used", "free"]),
    (MetricName::SystemSwapUtilization, &["used", "free"]),
    (MetricName::SystemDiskIo, &["read", "write"]),
    (MetricName::SystemDiskOperations, &["read", "write"]),
    (MetricName::SystemDiskTime, &["read", "write"]),
    (MetricName::SystemNetworkDroppedPackets, &["transmit", "receive"]),
    (MetricName::SystemNetworkPackets, &["transmit", "receive"]),
    (MetricName::SystemNetworkErrors, &["transmit", "receive"]),
    (MetricName::SystemNetworkIo, &["transmit", "receive"]),
    (MetricName::SystemNetworkConnections, &["family", "type"]),
    (MetricName::RuntimeMemory, &["rss", "vms"]),
    (MetricName::RuntimeCpuTime, &["user", "system"]),
];

/// Keeps the first occurrence of each field name, in order.
fn distinct_fields<I, S>(fields: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut seen = HashSet::new();
    fields
        .into_iter()
        .map(Into::into)
        .filter(|field: &String| seen.insert(field.clone()))
        .collect()
}

fn deserialize_metrics<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<MetricName, Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let metrics = BTreeMap::<MetricName, Vec<String>>::deserialize(deserializer)?;
    Ok(metrics
        .into_iter()
        .map(|(metric, fields)| (metric, distinct_fields(fields)))
        .collect())
}

/// Enabled sub-fields for each configured metric.
///
/// Field names are unique per metric; repeats are dropped on construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Configuration {
    #[serde(deserialize_with = "deserialize_metrics")]
    metrics: BTreeMap<MetricName, Vec<String>>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self::default_catalog()
    }
}

impl Configuration {
    /// Creates an empty configuration (no metric is collected).
    pub fn empty() -> Self {
        Self {
            metrics: BTreeMap::new(),
        }
    }

    /// Returns the built-in catalog of 16 metrics.
    pub fn default_catalog() -> Self {
        let metrics = DEFAULT_CATALOG
            .iter()
            .map(|(metric, fields)| (*metric, fields.iter().map(|f| f.to_string()).collect()))
            .collect();
        Self { metrics }
    }

    /// Sets the fields for one metric, replacing any previous selection.
    pub fn with_metric<I, S>(mut self, metric: MetricName, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.metrics.insert(metric, distinct_fields(fields));
        self
    }

    /// Parses a configuration from JSON.
    ///
    /// Format: `{"system.cpu.time": ["idle", "user"], ...}`. Unknown metric
    /// names are rejected.
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Loads a configuration from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// Returns the fields configured for `metric`.
    pub fn fields(&self, metric: MetricName) -> Result<&[String], CollectError> {
        self.metrics
            .get(&metric)
            .map(Vec::as_slice)
            .ok_or(CollectError::MetricNotConfigured(metric))
    }

    pub fn contains(&self, metric: MetricName) -> bool {
        self.metrics.contains_key(&metric)
    }

    /// Configured metric names in catalog order.
    pub fn metrics(&self) -> impl Iterator<Item = MetricName> + '_ {
        self.metrics.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

/// Resolves the active configuration: the caller's override if present,
/// otherwise the built-in catalog.
pub fn resolve(user: Option<Configuration>) -> Configuration {
    user.unwrap_or_else(Configuration::default_catalog)
}
