use super::traits::TopologyFile;
use crate::core::models::atom::{Atom, Chirality};
use crate::core::models::element::Element;
use crate::core::models::topology::{Bond, BondOrder, BondStereo, Topology, TopologyError};
use serde::{Deserialize, Serialize};
use std::io::{self, BufRead, Read, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TomlTopologyError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("TOML parsing error: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Atom {index}: unknown element '{symbol}'")]
    UnknownElement { index: usize, symbol: String },
    #[error("Atom {index}: unknown chirality tag '{tag}'")]
    InvalidChirality { index: usize, tag: String },
    #[error("Bond {index}: invalid bond order '{order}'")]
    InvalidBondOrder { index: usize, order: String },
    #[error("Invalid topology: {0}")]
    Topology(#[from] TopologyError),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct TopologyDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default)]
    atoms: Vec<AtomRecord>,
    #[serde(default)]
    bonds: Vec<BondRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct AtomRecord {
    element: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    name: String,
    #[serde(default, skip_serializing_if = "is_zero_i8")]
    charge: i8,
    #[serde(default, skip_serializing_if = "is_false")]
    aromatic: bool,
    #[serde(default, skip_serializing_if = "is_zero_u8")]
    implicit_hydrogens: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    chirality: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct BondRecord {
    atoms: [usize; 2],
    #[serde(default = "default_order")]
    order: String,
    #[serde(default, skip_serializing_if = "is_false")]
    aromatic: bool,
    #[serde(default, skip_serializing_if = "is_no_stereo")]
    stereo: BondStereo,
}

fn default_order() -> String {
    "single".to_string()
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn is_zero_i8(value: &i8) -> bool {
    *value == 0
}

fn is_zero_u8(value: &u8) -> bool {
    *value == 0
}

fn is_no_stereo(value: &BondStereo) -> bool {
    *value == BondStereo::None
}

/// A topology written as TOML arrays of atoms and bonds.
///
/// ```toml
/// name = "ethanol"
///
/// [[atoms]]
/// element = "C"
/// implicit-hydrogens = 3
///
/// [[atoms]]
/// element = "O"
/// implicit-hydrogens = 1
///
/// [[bonds]]
/// atoms = [0, 1]
/// order = "single"
/// ```
///
/// Bond orders accept `single`, `double`, `triple`, `aromatic` and their short
/// forms. Chirality accepts `@` and `@@`.
pub struct TomlTopology;

impl TomlTopology {
    pub fn parse_str(content: &str) -> Result<Topology, TomlTopologyError> {
        let document: TopologyDocument = toml::from_str(content)?;
        build_topology(document)
    }

    pub fn to_toml_string(topology: &Topology) -> Result<String, TomlTopologyError> {
        Ok(toml::to_string_pretty(&to_document(topology))?)
    }
}

impl TopologyFile for TomlTopology {
    type Error = TomlTopologyError;

    fn read_from(reader: &mut impl BufRead) -> Result<Topology, Self::Error> {
        let mut content = String::new();
        reader.read_to_string(&mut content)?;
        Self::parse_str(&content)
    }

    fn write_to(topology: &Topology, writer: &mut impl Write) -> Result<(), Self::Error> {
        writer.write_all(Self::to_toml_string(topology)?.as_bytes())?;
        Ok(())
    }
}

fn build_topology(document: TopologyDocument) -> Result<Topology, TomlTopologyError> {
    let atoms = document
        .atoms
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            let element: Element =
                record
                    .element
                    .parse()
                    .map_err(|_| TomlTopologyError::UnknownElement {
                        index,
                        symbol: record.element.clone(),
                    })?;
            let chirality = match &record.chirality {
                Some(tag) => tag
                    .parse::<Chirality>()
                    .map_err(|_| TomlTopologyError::InvalidChirality {
                        index,
                        tag: tag.clone(),
                    })?,
                None => Chirality::None,
            };
            let mut atom = Atom::new(element)
                .with_name(&record.name)
                .with_charge(record.charge)
                .with_implicit_hydrogens(record.implicit_hydrogens)
                .with_chirality(chirality);
            atom.is_aromatic = record.aromatic;
            Ok(atom)
        })
        .collect::<Result<Vec<_>, TomlTopologyError>>()?;

    let bonds = document
        .bonds
        .into_iter()
        .enumerate()
        .map(|(index, record)| {
            let order: BondOrder =
                record
                    .order
                    .parse()
                    .map_err(|_| TomlTopologyError::InvalidBondOrder {
                        index,
                        order: record.order.clone(),
                    })?;
            let mut bond = Bond::new(record.atoms[0], record.atoms[1], order)
                .with_stereo(record.stereo);
            if record.aromatic {
                bond = bond.aromatic();
            }
            Ok(bond)
        })
        .collect::<Result<Vec<_>, TomlTopologyError>>()?;

    Ok(Topology::new(atoms, bonds)?)
}

fn to_document(topology: &Topology) -> TopologyDocument {
    let atoms = topology
        .atoms()
        .iter()
        .map(|atom| AtomRecord {
            element: atom.element.symbol().to_string(),
            name: atom.name.clone(),
            charge: atom.formal_charge,
            aromatic: atom.is_aromatic,
            implicit_hydrogens: atom.implicit_hydrogens,
            chirality: match atom.chirality {
                Chirality::None => None,
                Chirality::Clockwise => Some("@@".to_string()),
                Chirality::CounterClockwise => Some("@".to_string()),
            },
        })
        .collect();
    let bonds = topology
        .bonds()
        .iter()
        .map(|bond| BondRecord {
            atoms: [bond.atom1, bond.atom2],
            order: bond.order.to_string().to_lowercase(),
            aromatic: bond.is_aromatic && bond.order != BondOrder::Aromatic,
            stereo: bond.stereo,
        })
        .collect();
    TopologyDocument {
        name: None,
        atoms,
        bonds,
    }
}
