//! System memory and swap collectors.

use std::iter;

use super::{expand, ratio};
use crate::config::{Configuration, MetricName};
use crate::error::Result;
use crate::labels::LabelSet;
use crate::measurement::{Measurement, Measurements};
use crate::provider::StatsProvider;

/// `system.memory.usage`: bytes per memory state.
pub fn memory_usage(
    config: &Configuration,
    provider: &dyn StatsProvider,
    base: &LabelSet,
) -> Result<Measurements> {
    let fields = config.fields(MetricName::SystemMemoryUsage)?.to_vec();
    let memory = provider.virtual_memory()?;
    let base = base.clone();

    Ok(expand(iter::once(memory), fields, move |mem, state: &String| {
        let value = mem.field(state)?;
        Some(Measurement::new(value as f64, base.with("state", state.as_str())))
    }))
}

/// `system.memory.utilization`: share of total memory per state.
pub fn memory_utilization(
    config: &Configuration,
    provider: &dyn StatsProvider,
    base: &LabelSet,
) -> Result<Measurements> {
    let fields = config.fields(MetricName::SystemMemoryUtilization)?.to_vec();
    let memory = provider.virtual_memory()?;
    let total = memory.total;
    let base = base.clone();

    Ok(expand(iter::once(memory), fields, move |mem, state: &String| {
        let value = mem.field(state)?;
        Some(Measurement::new(
            ratio(value, total),
            base.with("state", state.as_str()),
        ))
    }))
}

/// `system.swap.usage`: bytes per swap state.
pub fn swap_usage(
    config: &Configuration,
    provider: &dyn StatsProvider,
    base: &LabelSet,
) -> Result<Measurements> {
    let fields = config.fields(MetricName::SystemSwapUsage)?.to_vec();
    let swap = provider.swap_memory()?;
    let base = base.clone();

    Ok(expand(iter::once(swap), fields, move |swap, state: &String| {
        let value = swap.field(state)?;
        Some(Measurement::new(value as f64, base.with("state", state.as_str())))
    }))
}

/// `system.swap.utilization`: share of total swap per state.
pub fn swap_utilization(
    config: &Configuration,
    provider: &dyn StatsProvider,
    base: &LabelSet,
) -> Result<Measurements> {
    let fields = config.fields(MetricName::SystemSwapUtilization)?.to_vec();
    let swap = provider.swap_memory()?;
    let total = swap.total;
    let base = base.clone();

    Ok(expand(iter::once(swap), fields, move |swap, state: &String| {
        let value = swap.field(state)?;
        Some(Measurement::new(
            ratio(value, total),
            base.with("state", state.as_str()),
        ))
    }))
}
