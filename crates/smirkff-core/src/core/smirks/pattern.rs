use crate::core::models::atom::Chirality;
use std::fmt;
use std::sync::Arc;

/// A single atom test.
#[derive(Debug, Clone, PartialEq)]
pub enum AtomPrimitive {
    /// `*`
    Any,
    /// `#n` or an element symbol.
    AtomicNumber(u8),
    /// `a` or a lower-case symbol.
    Aromatic,
    /// `A` or an upper-case symbol inside brackets.
    Aliphatic,
    /// `Dn`: explicit neighbor count.
    Degree(u8),
    /// `Hn`: explicit hydrogen neighbors plus implicit hydrogens.
    TotalHydrogens(u8),
    /// `hn`: implicit hydrogens only.
    ImplicitHydrogens(u8),
    /// `Xn`: total connections including implicit hydrogens.
    Connectivity(u8),
    /// `vn`: total bond order.
    Valence(u8),
    /// `R` (true) or `R0` (false).
    InRing(bool),
    /// `rn`: size of the smallest ring through the atom. `r` alone is `InRing(true)`.
    SmallestRing(u8),
    /// `xn`: number of ring bonds.
    RingConnectivity(u8),
    /// `+n` / `-n`.
    Charge(i8),
    /// `@` / `@@`.
    Chirality(Chirality),
    /// `$(...)` or `$name`: the atom must be the first atom of an embedding of the inner pattern.
    Recursive(Arc<Pattern>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum AtomExpr {
    Primitive(AtomPrimitive),
    Not(Box<AtomExpr>),
    And(Vec<AtomExpr>),
    Or(Vec<AtomExpr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BondPrimitive {
    /// `-`: single and not aromatic.
    Single,
    /// `=`
    Double,
    /// `#`
    Triple,
    /// `:`: any bond flagged aromatic.
    Aromatic,
    /// `~`
    Any,
    /// `@`: bond is part of a ring.
    Ring,
    /// `/`
    Up,
    /// `\`
    Down,
    /// No bond symbol written between two atoms.
    SingleOrAromatic,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BondExpr {
    Primitive(BondPrimitive),
    Not(Box<BondExpr>),
    And(Vec<BondExpr>),
    Or(Vec<BondExpr>),
}

impl BondExpr {
    pub(crate) const IMPLICIT: BondExpr = BondExpr::Primitive(BondPrimitive::SingleOrAromatic);
}

#[derive(Debug, Clone, PartialEq)]
pub struct PatternAtom {
    pub expr: AtomExpr,
    /// The `:n` tag, if any.
    pub map_index: Option<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PatternBond {
    pub atom1: usize,
    pub atom2: usize,
    pub expr: BondExpr,
}

/// A parsed, immutable chemical environment pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    source: String,
    atoms: Vec<PatternAtom>,
    bonds: Vec<PatternBond>,
    adjacency: Vec<Vec<(usize, usize)>>,
    /// Pattern atom indices of the tagged atoms, ordered by map index.
    tagged: Vec<usize>,
}

impl Pattern {
    pub(crate) fn new(source: &str, atoms: Vec<PatternAtom>, bonds: Vec<PatternBond>) -> Self {
        let mut adjacency = vec![Vec::new(); atoms.len()];
        for (bond_idx, bond) in bonds.iter().enumerate() {
            adjacency[bond.atom1].push((bond.atom2, bond_idx));
            adjacency[bond.atom2].push((bond.atom1, bond_idx));
        }

        let mut tagged: Vec<(u8, usize)> = atoms
            .iter()
            .enumerate()
            .filter_map(|(i, a)| a.map_index.map(|m| (m, i)))
            .collect();
        tagged.sort_unstable();

        Self {
            source: source.to_string(),
            atoms,
            bonds,
            adjacency,
            tagged: tagged.into_iter().map(|(_, i)| i).collect(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn atoms(&self) -> &[PatternAtom] {
        &self.atoms
    }

    pub fn bonds(&self) -> &[PatternBond] {
        &self.bonds
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    pub(crate) fn adjacency(&self, atom: usize) -> &[(usize, usize)] {
        &self.adjacency[atom]
    }

    /// Pattern atoms reported in a match, in map index order.
    ///
    /// When nothing is tagged every atom is reported, in the order written.
    pub fn reported_atoms(&self) -> Vec<usize> {
        if self.tagged.is_empty() {
            (0..self.atoms.len()).collect()
        } else {
            self.tagged.clone()
        }
    }

    /// Number of atoms carrying a `:n` tag.
    pub fn tagged_count(&self) -> usize {
        self.tagged.len()
    }

    /// Map indices in ascending order.
    pub fn map_indices(&self) -> Vec<u8> {
        self.tagged
            .iter()
            .filter_map(|&i| self.atoms[i].map_index)
            .collect()
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
