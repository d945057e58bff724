use super::element::Element;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Tetrahedral stereochemistry tag of an atom.
///
/// The tag is carried through from whatever produced the topology. The
/// pattern matcher compares it literally against `@`/`@@` primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Chirality {
    /// No stereochemistry specified.
    #[default]
    None,
    /// Clockwise (`@@`).
    Clockwise,
    /// Counter-clockwise (`@`).
    CounterClockwise,
}

impl FromStr for Chirality {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "" | "none" => Ok(Self::None),
            "@@" | "cw" | "clockwise" => Ok(Self::Clockwise),
            "@" | "ccw" | "counter-clockwise" | "counterclockwise" => Ok(Self::CounterClockwise),
            _ => Err(()),
        }
    }
}

/// An atom of a molecular topology graph.
///
/// Hydrogens are normally explicit atoms of the graph; `implicit_hydrogens`
/// exists for topologies that carry suppressed hydrogens and is added to the
/// hydrogen-count and connectivity primitives during matching.
#[derive(Debug, Clone, PartialEq)]
pub struct Atom {
    /// Optional label (e.g. "C1", "HO"), used only for reporting.
    pub name: String,
    /// The chemical element.
    pub element: Element,
    /// Formal charge in elementary charge units.
    pub formal_charge: i8,
    /// Aromaticity flag as perceived by the producer of the topology.
    pub is_aromatic: bool,
    /// Number of hydrogens attached but not present as graph nodes.
    pub implicit_hydrogens: u8,
    /// Stereochemistry tag.
    pub chirality: Chirality,
}

impl Atom {
    /// Creates a neutral, aliphatic atom with no implicit hydrogens.
    pub fn new(element: Element) -> Self {
        Self {
            name: String::new(),
            element,
            formal_charge: 0,
            is_aromatic: false,
            implicit_hydrogens: 0,
            chirality: Chirality::None,
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_charge(mut self, formal_charge: i8) -> Self {
        self.formal_charge = formal_charge;
        self
    }

    pub fn aromatic(mut self) -> Self {
        self.is_aromatic = true;
        self
    }

    pub fn with_implicit_hydrogens(mut self, count: u8) -> Self {
        self.implicit_hydrogens = count;
        self
    }

    pub fn with_chirality(mut self, chirality: Chirality) -> Self {
        self.chirality = chirality;
        self
    }
}
