//! # Core Models Module
//!
//! The molecular graph that force field parameters are assigned to.
//!
//! ## Overview
//!
//! A [`topology::Topology`] is an immutable, simple, undirected graph of atoms and
//! bonds. It is supplied by the caller (the library does not read molecular file
//! formats beyond the small TOML topology document in [`crate::core::io`]) and is
//! never mutated by the engine.
//!
//! ## Key Components
//!
//! - [`element`] - Chemical elements and symbol lookup
//! - [`atom`] - Atom attributes (element, formal charge, aromaticity, stereo tag)
//! - [`topology`] - Bonds, bond orders and the topology graph with derived ring data
//!
//! ## Usage
//!
//! ```ignore
//! use smirkff::core::models::{atom::Atom, element::Element, topology::{Bond, BondOrder, Topology}};
//!
//! let atoms = vec![Atom::new(Element::C), Atom::new(Element::C)];
//! let bonds = vec![Bond::new(0, 1, BondOrder::Single)];
//! let topology = Topology::new(atoms, bonds)?;
//! ```

pub mod atom;
pub mod element;
pub mod topology;
