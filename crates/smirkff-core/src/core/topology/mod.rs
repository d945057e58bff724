//! # Topology Module
//!
//! Derived, read-only views of a [`Topology`](crate::core::models::topology::Topology)
//! that the assignment engine iterates over.
//!
//! ## Overview
//!
//! - [`elements`] - Enumeration of bonds, angles, proper torsions and improper centers
//!   in canonical atom-index order, plus the chain orientation convention used as a key
//! - [`separation`] - Shortest-path bond separations for 1-2 through 1-5 neighbor pairs
//!
//! Every enumeration is a pure function of the graph, so two calls on the same
//! topology always produce identical, identically ordered element lists.

pub mod elements;
pub mod separation;
