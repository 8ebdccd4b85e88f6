//! Stats provider backed by the Linux `/proc` filesystem.
//!
//! `parser` holds pure functions over file contents; `provider` reads the
//! files through a [`FileSystem`](super::FileSystem) and converts units.

pub mod parser;
mod provider;

pub use parser::ParseError;
pub use provider::ProcfsProvider;
