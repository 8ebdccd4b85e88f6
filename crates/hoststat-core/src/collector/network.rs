//! Network interface and connection collectors.

use std::collections::HashMap;

use tracing::debug;

use super::expand;
use crate::config::{Configuration, MetricName};
use crate::error::{CollectError, Result};
use crate::labels::{LabelSet, LabelValue};
use crate::measurement::{Measurement, Measurements};
use crate::provider::StatsProvider;
use crate::provider::types::{Connection, SOCK_DGRAM, SOCK_STREAM};

/// Traffic direction configured for an interface metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Receive,
    Transmit,
}

impl Direction {
    pub fn parse(metric: MetricName, direction: &str) -> Result<Self> {
        match direction {
            "receive" => Ok(Direction::Receive),
            "transmit" => Ok(Direction::Transmit),
            _ => Err(CollectError::UnknownDirection {
                metric,
                direction: direction.to_string(),
            }),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Receive => "receive",
            Direction::Transmit => "transmit",
        }
    }
}

/// Interface counter names for each direction of a metric.
struct CounterPair {
    receive: &'static str,
    transmit: &'static str,
}

impl CounterPair {
    fn field(&self, direction: Direction) -> &'static str {
        match direction {
            Direction::Receive => self.receive,
            Direction::Transmit => self.transmit,
        }
    }
}

const DROPPED: CounterPair = CounterPair {
    receive: "dropin",
    transmit: "dropout",
};
const PACKETS: CounterPair = CounterPair {
    receive: "packets_recv",
    transmit: "packets_sent",
};
const ERRORS: CounterPair = CounterPair {
    receive: "errin",
    transmit: "errout",
};
const BYTES: CounterPair = CounterPair {
    receive: "bytes_recv",
    transmit: "bytes_sent",
};

/// Shared body of the interface collectors.
///
/// Every configured direction is validated before any counter is read.
fn collect_interfaces(
    metric: MetricName,
    counters: &CounterPair,
    config: &Configuration,
    provider: &dyn StatsProvider,
    base: &LabelSet,
) -> Result<Measurements> {
    let selectors = config
        .fields(metric)?
        .iter()
        .map(|d| Direction::parse(metric, d).map(|dir| (dir, counters.field(dir))))
        .collect::<Result<Vec<_>>>()?;
    let nics = provider.net_io_counters()?;
    let base = base.clone();

    Ok(expand(nics, selectors, move |nic, (direction, field)| {
        let value = nic.field(field)?;
        Some(Measurement::new(
            value as f64,
            base.extend([
                ("device", LabelValue::from(nic.interface.as_str())),
                ("direction", LabelValue::from(direction.as_str())),
            ]),
        ))
    }))
}

/// `system.network.dropped.packets`: packets dropped per interface.
pub fn dropped_packets(
    config: &Configuration,
    provider: &dyn StatsProvider,
    base: &LabelSet,
) -> Result<Measurements> {
    collect_interfaces(
        MetricName::SystemNetworkDroppedPackets,
        &DROPPED,
        config,
        provider,
        base,
    )
}

/// `system.network.packets`: packets transferred per interface.
pub fn packets(
    config: &Configuration,
    provider: &dyn StatsProvider,
    base: &LabelSet,
) -> Result<Measurements> {
    collect_interfaces(MetricName::SystemNetworkPackets, &PACKETS, config, provider, base)
}

/// `system.network.errors`: transfer errors per interface.
pub fn errors(
    config: &Configuration,
    provider: &dyn StatsProvider,
    base: &LabelSet,
) -> Result<Measurements> {
    collect_interfaces(MetricName::SystemNetworkErrors, &ERRORS, config, provider, base)
}

/// `system.network.io`: bytes transferred per interface.
pub fn io(
    config: &Configuration,
    provider: &dyn StatsProvider,
    base: &LabelSet,
) -> Result<Measurements> {
    collect_interfaces(MetricName::SystemNetworkIo, &BYTES, config, provider, base)
}

fn protocol_name(kind: u32) -> Result<&'static str> {
    match kind {
        SOCK_STREAM => Ok("tcp"),
        SOCK_DGRAM => Ok("udp"),
        other => Err(CollectError::UnknownProtocol(other)),
    }
}

/// Label set identifying the group a connection is counted in.
fn connection_labels(base: &LabelSet, conn: &Connection, fields: &[String]) -> Result<LabelSet> {
    let mut dimensions = vec![
        ("protocol".to_string(), LabelValue::from(protocol_name(conn.kind)?)),
        ("state".to_string(), LabelValue::from(conn.status.as_str())),
    ];

    for field in fields {
        let value = conn
            .field(field)
            .ok_or_else(|| CollectError::UnsupportedField {
                metric: MetricName::SystemNetworkConnections,
                field: field.clone(),
            })?;
        if let Some(value) = value {
            dimensions.push((field.clone(), value));
        }
    }

    Ok(base.extend(dimensions))
}

/// Counts one connection into the group with these labels.
///
/// `index` maps a digest to every group slot carrying it, so colliding
/// digests still land in separate groups.
fn add_to_group(
    groups: &mut Vec<(u64, LabelSet)>,
    index: &mut HashMap<u64, Vec<usize>>,
    digest: u64,
    labels: LabelSet,
) {
    let slots = index.entry(digest).or_default();
    match slots.iter().find(|&&slot| groups[slot].1 == labels) {
        Some(&slot) => groups[slot].0 += 1,
        None => {
            slots.push(groups.len());
            groups.push((1, labels));
        }
    }
}

/// `system.network.connections`: number of connections per distinct
/// protocol, state and configured connection fields.
///
/// Groups are emitted in the order their first connection was seen.
pub fn connections(
    config: &Configuration,
    provider: &dyn StatsProvider,
    base: &LabelSet,
) -> Result<Measurements> {
    let fields = config.fields(MetricName::SystemNetworkConnections)?;
    let connections = provider.net_connections()?;

    let mut groups: Vec<(u64, LabelSet)> = Vec::new();
    let mut index: HashMap<u64, Vec<usize>> = HashMap::new();

    for conn in &connections {
        let labels = connection_labels(base, conn, fields)?;
        add_to_group(&mut groups, &mut index, labels.digest(), labels);
    }

    debug!(
        connections = connections.len(),
        groups = groups.len(),
        "aggregated connections"
    );

    Ok(Box::new(groups.into_iter().map(|(count, labels)| {
        Measurement::new(count as f64, labels)
    })))
}
