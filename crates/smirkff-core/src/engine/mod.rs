//! # Engine Module
//!
//! The stateful layer that applies a loaded force field to one topology.
//!
//! ## Overview
//!
//! An assignment run is a pure transform of a topology and a force field into a
//! [`assignment::ParameterAssignment`]. Each interaction class is handled by one
//! task that enumerates its structural elements in canonical atom order,
//! resolves each element with the last-match-wins policy, checks coverage and
//! assembles its part of the result. Elements are independent, so tasks resolve
//! them in parallel when the `parallel` feature is enabled; the output is the
//! same either way.
//!
//! ## Architecture
//!
//! - **Configuration** ([`config`]) - Document paths, handler selection, coverage policy
//! - **Context** ([`context`]) - Shared read-only inputs and the cancellation flag
//! - **Tasks** ([`tasks`]) - Bonds, angles, torsions, impropers, vdW, pair scales, charges
//! - **Output** ([`assignment`]) - The resolved parameters with CSV and TOML export
//! - **Progress Monitoring** ([`progress`]) - Stage and per-handler events for front-ends
//! - **Error Handling** ([`error`]) - [`error::AssignError`]

pub mod assignment;
pub mod config;
pub mod context;
pub mod error;
pub mod progress;
pub mod tasks;
