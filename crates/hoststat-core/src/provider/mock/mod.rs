//! In-memory `/proc` fixtures for exercising the procfs provider anywhere.

mod filesystem;
mod scenarios;

pub use filesystem::MockFs;
