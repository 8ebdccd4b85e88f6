//! CPU time and utilization collectors.

use super::expand;
use crate::config::{Configuration, MetricName};
use crate::error::Result;
use crate::labels::{LabelSet, LabelValue};
use crate::measurement::{Measurement, Measurements};
use crate::provider::StatsProvider;

/// `system.cpu.time`: cumulative seconds per CPU and state.
pub fn cpu_time(
    config: &Configuration,
    provider: &dyn StatsProvider,
    base: &LabelSet,
) -> Result<Measurements> {
    let fields = config.fields(MetricName::SystemCpuTime)?.to_vec();
    let cpus = provider.cpu_times()?;
    let base = base.clone();

    Ok(expand(
        cpus.into_iter().enumerate(),
        fields,
        move |(idx, times), state: &String| {
            let value = times.field(state)?;
            Some(Measurement::new(value, cpu_labels(&base, state, *idx)))
        },
    ))
}

/// `system.cpu.utilization`: per CPU and state, as a ratio in `[0, 1]`.
pub fn cpu_utilization(
    config: &Configuration,
    provider: &dyn StatsProvider,
    base: &LabelSet,
) -> Result<Measurements> {
    let fields = config.fields(MetricName::SystemCpuUtilization)?.to_vec();
    let cpus = provider.cpu_times_percent()?;
    let base = base.clone();

    Ok(expand(
        cpus.into_iter().enumerate(),
        fields,
        move |(idx, percent), state: &String| {
            let value = percent.field(state)? / 100.0;
            Some(Measurement::new(value, cpu_labels(&base, state, *idx)))
        },
    ))
}

/// CPUs are numbered from 1 in labels.
fn cpu_labels(base: &LabelSet, state: &str, idx: usize) -> LabelSet {
    base.extend([
        ("state", LabelValue::from(state)),
        ("cpu", LabelValue::from(idx + 1)),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::FixtureProvider;
    use crate::provider::types::CpuTimes;

    fn two_cpus() -> Vec<CpuTimes> {
        vec![
            CpuTimes {
                user: Some(10.0),
                system: Some(5.0),
                idle: Some(100.0),
                irq: Some(1.0),
                ..Default::default()
            },
            CpuTimes {
                user: Some(20.0),
                system: Some(6.0),
                idle: Some(90.0),
                // irq not exposed by this record
                ..Default::default()
            },
        ]
    }

    #[test]
    fn test_cpu_time_one_per_cpu_and_exposed_state() {
        let provider = FixtureProvider::new().with_cpu_times(two_cpus());
        let config = Configuration::default_catalog();

        let out: Vec<_> = cpu_time(&config, &provider, &LabelSet::new())
            .unwrap()
            .collect();

        // 4 states on cpu 1, 3 on cpu 2
        assert_eq!(out.len(), 7);
        assert_eq!(out[0].labels.get_str("state"), Some("idle"));
        assert_eq!(out[0].labels.get("cpu"), Some(&LabelValue::Int(1)));
        assert_eq!(out[0].value, 100.0);
        assert_eq!(out[4].labels.get("cpu"), Some(&LabelValue::Int(2)));
        assert_eq!(out[5].labels.get_str("state"), Some("user"));
        assert_eq!(out[5].value, 20.0);
        assert!(
            out.iter()
                .all(|m| !(m.labels.get("cpu") == Some(&LabelValue::Int(2))
                    && m.labels.get_str("state") == Some("irq")))
        );
    }

    #[test]
    fn test_cpu_time_custom_fields() {
        let provider = FixtureProvider::new().with_cpu_times(two_cpus());
        let config =
            Configuration::empty().with_metric(MetricName::SystemCpuTime, ["steal", "system"]);

        let out: Vec<_> = cpu_time(&config, &provider, &LabelSet::new())
            .unwrap()
            .collect();

        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|m| m.labels.get_str("state") == Some("system")));
    }

    #[test]
    fn test_cpu_utilization_percent_to_ratio() {
        let provider = FixtureProvider::new().with_cpu_percent(vec![CpuTimes {
            user: Some(45.0),
            ..Default::default()
        }]);
        let config =
            Configuration::empty().with_metric(MetricName::SystemCpuUtilization, ["user"]);

        let out: Vec<_> = cpu_utilization(&config, &provider, &LabelSet::new())
            .unwrap()
            .collect();

        assert_eq!(out.len(), 1);
        assert_eq!(out[0].value, 0.45);
        assert_eq!(out[0].labels.get("cpu"), Some(&LabelValue::Int(1)));
    }

    #[test]
    fn test_cpu_labels_merge_base() {
        let provider = FixtureProvider::new().with_cpu_times(two_cpus());
        let config = Configuration::default_catalog();
        let base = LabelSet::new().with("host", "db-1");

        let out: Vec<_> = cpu_time(&config, &provider, &base).unwrap().collect();

        assert!(out.iter().all(|m| m.labels.get_str("host") == Some("db-1")));
        assert_eq!(base.len(), 1);
    }
}
