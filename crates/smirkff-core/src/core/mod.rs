//! # Core Module
//!
//! The stateless foundation of the library: the molecular graph, the pattern
//! language, the force field rule set and file I/O.
//!
//! ## Architecture
//!
//! - **Molecular Representation** ([`models`]) - Atoms, bonds and the topology graph
//! - **Structural Elements** ([`topology`]) - Bond, angle, torsion and improper enumeration
//!   plus bond-separation pairs
//! - **Pattern Language** ([`smirks`]) - SMIRKS parsing and subgraph matching
//! - **Force Field** ([`forcefield`]) - Rule documents, handlers, units, merging and
//!   last-match-wins parameter resolution
//! - **File I/O** ([`io`]) - Topology documents
//!
//! Nothing in this module holds mutable state between calls; a loaded
//! [`forcefield::params::ForceField`] is immutable and may be shared across threads.

pub mod forcefield;
pub mod io;
pub mod models;
pub mod smirks;
pub mod topology;
