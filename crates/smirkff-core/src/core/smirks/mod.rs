//! # SMIRKS Module
//!
//! Parsing and matching of chemical environment patterns written in SMIRKS, the
//! SMARTS dialect in which `:n` map tags pick out the atoms a parameter applies to.
//!
//! ## Overview
//!
//! A pattern string is compiled once into a [`pattern::Pattern`]: a small graph of
//! atom queries joined by bond queries. Each query is a closed expression tree of
//! primitives combined with `!`, `&`, `,` and `;`, evaluated by a single exhaustive
//! match. A `$(...)` primitive holds a nested pattern which must embed with its
//! first atom on the candidate atom.
//!
//! Matching is a backtracking subgraph search over a
//! [`Topology`](crate::core::models::topology::Topology). Only the tagged atoms are
//! reported, ordered by map index.
//!
//! ## Key Components
//!
//! - [`parser`] - String to pattern, with [`parser::SmirksError`] for malformed input
//! - [`pattern`] - Pattern, atom and bond expression types
//! - [`matcher`] - Embedding search: all matches, pinned checks, rooted checks
//! - [`substructures`] - Named patterns referenced as `$name`, with cycle rejection
//! - [`cache`] - Per-owner compiled pattern cache
//!
//! ## Example
//!
//! ```ignore
//! use smirkff::core::smirks::parser::parse_smirks;
//!
//! let pattern = parse_smirks("[#6X4:1]-[#1:2]")?;
//! for tuple in pattern.find_matches(&topology) {
//!     println!("{tuple:?}");
//! }
//! ```

pub mod cache;
pub mod matcher;
pub mod parser;
pub mod pattern;
pub mod substructures;
