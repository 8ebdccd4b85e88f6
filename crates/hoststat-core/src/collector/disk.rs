//! Block device collectors.
//!
//! The configured field is the direction (`read`, `write`); the record field
//! read is the direction with a per-metric suffix.

use super::expand;
use crate::config::{Configuration, MetricName};
use crate::error::Result;
use crate::labels::{LabelSet, LabelValue};
use crate::measurement::{Measurement, Measurements};
use crate::provider::StatsProvider;

/// Shared body of the disk collectors: reads `<direction><suffix>` and
/// divides it by `divisor`.
fn collect_disk(
    metric: MetricName,
    suffix: &str,
    divisor: f64,
    config: &Configuration,
    provider: &dyn StatsProvider,
    base: &LabelSet,
) -> Result<Measurements> {
    let selectors: Vec<(String, String)> = config
        .fields(metric)?
        .iter()
        .map(|direction| (direction.clone(), format!("{}{}", direction, suffix)))
        .collect();
    let disks = provider.disk_io_counters()?;
    let base = base.clone();

    Ok(expand(disks, selectors, move |disk, (direction, field)| {
        let value = disk.field(field)?;
        Some(Measurement::new(
            value as f64 / divisor,
            base.extend([
                ("device", LabelValue::from(disk.device.as_str())),
                ("direction", LabelValue::from(direction.as_str())),
            ]),
        ))
    }))
}

/// `system.disk.io`: bytes read/written per device.
pub fn disk_io(
    config: &Configuration,
    provider: &dyn StatsProvider,
    base: &LabelSet,
) -> Result<Measurements> {
    collect_disk(MetricName::SystemDiskIo, "_bytes", 1.0, config, provider, base)
}

/// `system.disk.operations`: completed operations per device.
pub fn disk_operations(
    config: &Configuration,
    provider: &dyn StatsProvider,
    base: &LabelSet,
) -> Result<Measurements> {
    collect_disk(MetricName::SystemDiskOperations, "_count", 1.0, config, provider, base)
}

/// `system.disk.time`: seconds spent per direction; the provider reports ms.
pub fn disk_time(
    config: &Configuration,
    provider: &dyn StatsProvider,
    base: &LabelSet,
) -> Result<Measurements> {
    collect_disk(MetricName::SystemDiskTime, "_time", 1000.0, config, provider, base)
}

/// `system.disk.merged`: adjacent requests merged by the I/O scheduler.
pub fn disk_merged(
    config: &Configuration,
    provider: &dyn StatsProvider,
    base: &LabelSet,
) -> Result<Measurements> {
    collect_disk(MetricName::SystemDiskMerged, "_merged_count", 1.0, config, provider, base)
}
