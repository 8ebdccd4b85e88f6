//! hoststat-core: configuration-driven system metrics collection.
//!
//! Provides:
//! - `config`: metric catalog and per-metric field selection
//! - `provider`: stats provider abstraction (procfs, fixtures, mock filesystem)
//! - `collector`: per-metric collection functions producing labeled measurements
//! - `labels`: label sets attached to measurements
//! - `registrar`: instrument registration table and in-memory registry

pub mod collector;
pub mod config;
pub mod error;
pub mod labels;
pub mod measurement;
pub mod provider;
pub mod registrar;

pub use config::{Configuration, MetricName, resolve};
pub use error::{CollectError, ConfigError};
pub use labels::{LabelSet, LabelValue};
pub use measurement::{Measurement, Measurements};
pub use registrar::{
    InstrumentDescriptor, InstrumentKind, Registry, RegistrationSink, SystemMetricsInstrumentor,
};
