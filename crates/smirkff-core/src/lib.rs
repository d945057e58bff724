//! # SMIRK-FF Core Library
//!
//! Chemical-environment matching and hierarchical force field parameter assignment
//! for molecular topologies.
//!
//! ## Architectural Philosophy
//!
//! The library follows a three-layer architecture that keeps parsing, matching and
//! orchestration apart.
//!
//! - **[`core`]: The Foundation.** Stateless data models (`Topology`, `Atom`, `Bond`),
//!   derived graph properties and element enumeration, the SMIRKS pattern language with
//!   its matcher, the force field registry loaded from TOML rule documents, and I/O.
//!
//! - **[`engine`]: The Logic Core.** Configuration, the shared assignment context and one
//!   task per interaction class. Every task resolves its structural elements
//!   independently with last-declared-rule-wins precedence, in parallel when the
//!   `parallel` feature is enabled.
//!
//! - **[`workflows`]: The Public API.** Loads and merges rule documents and runs every
//!   selected task to produce a complete `ParameterAssignment`.

pub mod core;
pub mod engine;
pub mod workflows;
