//! # Force Field Module
//!
//! The rule set that maps chemical environments to parameters, and the
//! last-match-wins resolution that applies it to a topology.
//!
//! ## Overview
//!
//! A force field is read from one or more TOML rule documents. Each document
//! declares its handlers in order: one handler per interaction class (bonds,
//! angles, proper and improper torsions, van der Waals, electrostatics, library
//! charges), each with its own units, settings and an ordered list of rules. A
//! rule pairs a SMIRKS pattern with the parameters it assigns.
//!
//! Loading validates everything up front. Units must parse, every pattern must
//! compile and tag exactly the atoms its handler needs, and every rule must carry
//! the parameters its handler expects. Nothing is returned on failure.
//!
//! When several rules match the same element, the one declared last wins. Merging
//! a second document appends its rules after the existing ones, so later documents
//! override earlier ones.
//!
//! ## Key Components
//!
//! - [`params`] - [`params::ForceField`]: loading, validation, merging and serialization
//! - [`handlers`] - Handler kinds, parameter and settings types
//! - [`document`] - Serde mirror of the TOML document
//! - [`units`] - Declared unit triples
//! - [`parameterization`] - Per-element rule resolution and library charges
//! - [`error`] - [`error::LoadError`]
//!
//! ## Usage
//!
//! ```ignore
//! use smirkff::core::forcefield::params::ForceField;
//! use smirkff::core::forcefield::parameterization::{chain_orientations, resolve};
//!
//! let forcefield = ForceField::load(&["base.toml", "overrides.toml"])?;
//! let bonds = forcefield.bonds().expect("document declares bonds");
//! if let Some(hit) = resolve(bonds, &topology, &chain_orientations(&[0, 1])) {
//!     println!("{} -> {:?}", hit.rule.id, hit.rule.params);
//! }
//! ```

pub mod document;
pub mod error;
pub mod handlers;
pub mod parameterization;
pub mod params;
pub mod units;
