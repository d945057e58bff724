//! # Workflows Module
//!
//! Top-level entry points that tie the force field loader and the engine
//! together.
//!
//! ## Overview
//!
//! A workflow loads and merges the configured rule documents, builds the shared
//! context and runs every selected engine task in a fixed stage order, reporting
//! progress along the way.
//!
//! - **Assignment Workflow** ([`assign`]) - Rule documents and a topology in, a
//!   [`ParameterAssignment`](crate::engine::assignment::ParameterAssignment) out.

pub mod assign;
