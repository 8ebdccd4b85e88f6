//! Collectors for the current process.

use std::iter;

use super::expand;
use crate::config::{Configuration, MetricName};
use crate::error::Result;
use crate::labels::LabelSet;
use crate::measurement::{Measurement, Measurements};
use crate::provider::StatsProvider;

/// `runtime.memory`: process memory in bytes, labeled by `type`.
pub fn memory(
    config: &Configuration,
    provider: &dyn StatsProvider,
    base: &LabelSet,
) -> Result<Measurements> {
    let fields = config.fields(MetricName::RuntimeMemory)?.to_vec();
    let memory = provider.process_memory()?;
    let base = base.clone();

    Ok(expand(iter::once(memory), fields, move |mem, kind: &String| {
        let value = mem.field(kind)?;
        Some(Measurement::new(value as f64, base.with("type", kind.as_str())))
    }))
}

/// `runtime.cpu.time`: process CPU seconds, labeled by `type`.
pub fn cpu_time(
    config: &Configuration,
    provider: &dyn StatsProvider,
    base: &LabelSet,
) -> Result<Measurements> {
    let fields = config.fields(MetricName::RuntimeCpuTime)?.to_vec();
    let times = provider.process_cpu_times()?;
    let base = base.clone();

    Ok(expand(iter::once(times), fields, move |cpu, kind: &String| {
        let value = cpu.field(kind)?;
        Some(Measurement::new(value, base.with("type", kind.as_str())))
    }))
}

/// `runtime.gc_count`: collections per garbage-collector generation.
///
/// Not driven by the configuration; every generation the provider reports is
/// emitted with its index as the `count` label.
pub fn gc_count(
    _config: &Configuration,
    provider: &dyn StatsProvider,
    base: &LabelSet,
) -> Result<Measurements> {
    let counts = provider.gc_counts()?;
    let base = base.clone();

    Ok(Box::new(counts.into_iter().enumerate().map(
        move |(generation, count)| {
            Measurement::new(count as f64, base.with("count", generation.to_string()))
        },
    )))
}
