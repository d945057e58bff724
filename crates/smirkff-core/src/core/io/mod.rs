//! Provides input/output for topology documents.
//!
//! Molecular file formats are out of scope; topologies arrive either already
//! built by the caller or as a small TOML document listing atoms and bonds.
//! The [`traits::TopologyFile`] trait is the common interface for such formats.

pub mod toml_topology;
pub mod traits;
