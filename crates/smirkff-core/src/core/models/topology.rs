use super::atom::Atom;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[repr(u8)]
pub enum BondOrder {
    #[default]
    Single,
    Double,
    Triple,
    Aromatic,
}

impl BondOrder {
    /// Bond order in half-units (single = 2, aromatic = 3), so valence sums stay integral.
    pub fn half_units(self) -> u32 {
        match self {
            Self::Single => 2,
            Self::Double => 4,
            Self::Triple => 6,
            Self::Aromatic => 3,
        }
    }
}

#[derive(Debug, Error)]
#[error("Invalid bond order string")]
pub struct ParseBondOrderError;

impl FromStr for BondOrder {
    type Err = ParseBondOrderError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "1" | "s" | "single" => Ok(Self::Single),
            "2" | "d" | "double" => Ok(Self::Double),
            "3" | "t" | "triple" => Ok(Self::Triple),
            "ar" | "1.5" | "aromatic" => Ok(Self::Aromatic),
            _ => Err(ParseBondOrderError),
        }
    }
}

impl fmt::Display for BondOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Single => "Single",
                Self::Double => "Double",
                Self::Triple => "Triple",
                Self::Aromatic => "Aromatic",
            }
        )
    }
}

/// Directional (cis/trans) stereo tag of a bond, as written with `/` and `\`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BondStereo {
    #[default]
    None,
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bond {
    pub atom1: usize,  // Lower atom index
    pub atom2: usize,  // Higher atom index
    pub order: BondOrder,
    pub is_aromatic: bool,
    pub stereo: BondStereo,
}

impl Bond {
    /// Creates a bond; the atom pair is stored in ascending index order.
    pub fn new(atom1: usize, atom2: usize, order: BondOrder) -> Self {
        Self {
            atom1: atom1.min(atom2),
            atom2: atom1.max(atom2),
            order,
            is_aromatic: order == BondOrder::Aromatic,
            stereo: BondStereo::None,
        }
    }

    pub fn aromatic(mut self) -> Self {
        self.is_aromatic = true;
        self
    }

    pub fn with_stereo(mut self, stereo: BondStereo) -> Self {
        self.stereo = stereo;
        self
    }

    pub fn contains(&self, atom: usize) -> bool {
        self.atom1 == atom || self.atom2 == atom
    }

    /// Aromatic if either the flag or the order says so.
    #[inline]
    pub fn is_aromatic_bond(&self) -> bool {
        self.is_aromatic || self.order == BondOrder::Aromatic
    }

    /// Half-unit bond order used for valence sums. A Kekulé order on an
    /// aromatic-flagged bond takes precedence over the generic 1.5.
    fn valence_half_units(&self) -> u32 {
        self.order.half_units()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TopologyError {
    #[error("Bond ({atom1}, {atom2}) references an atom outside the topology ({n_atoms} atoms)")]
    AtomOutOfRange {
        atom1: usize,
        atom2: usize,
        n_atoms: usize,
    },
    #[error("Bond ({atom}, {atom}) connects an atom to itself")]
    SelfBond { atom: usize },
    #[error("Bond ({atom1}, {atom2}) is declared more than once")]
    DuplicateBond { atom1: usize, atom2: usize },
}

/// The read-only molecular graph that parameters are assigned to.
///
/// Atom indices are the canonical ordering: every enumeration the engine
/// performs walks atoms, bonds and neighbor lists in ascending index order.
/// Ring properties are derived once at construction time.
#[derive(Debug, Clone)]
pub struct Topology {
    /// Atoms in canonical order.
    atoms: Vec<Atom>,
    /// Bonds sorted by `(atom1, atom2)`.
    bonds: Vec<Bond>,
    /// Per atom, `(neighbor, bond index)` pairs sorted by neighbor index.
    adjacency: Vec<Vec<(usize, usize)>>,
    /// Per bond, whether it lies on at least one cycle.
    ring_bonds: Vec<bool>,
    /// Per atom, the size of the smallest cycle through it.
    smallest_rings: Vec<Option<usize>>,
}

impl Topology {
    /// Builds a topology from atoms and bonds, validating that the graph is simple.
    pub fn new(atoms: Vec<Atom>, bonds: Vec<Bond>) -> Result<Self, TopologyError> {
        let n_atoms = atoms.len();
        let mut bonds = bonds;

        for bond in &bonds {
            if bond.atom1 >= n_atoms || bond.atom2 >= n_atoms {
                return Err(TopologyError::AtomOutOfRange {
                    atom1: bond.atom1,
                    atom2: bond.atom2,
                    n_atoms,
                });
            }
            if bond.atom1 == bond.atom2 {
                return Err(TopologyError::SelfBond { atom: bond.atom1 });
            }
        }

        bonds.sort_by_key(|b| (b.atom1, b.atom2));
        if let Some(pair) = bonds
            .windows(2)
            .find(|w| (w[0].atom1, w[0].atom2) == (w[1].atom1, w[1].atom2))
        {
            return Err(TopologyError::DuplicateBond {
                atom1: pair[0].atom1,
                atom2: pair[0].atom2,
            });
        }

        let mut adjacency = vec![Vec::new(); n_atoms];
        for (idx, bond) in bonds.iter().enumerate() {
            adjacency[bond.atom1].push((bond.atom2, idx));
            adjacency[bond.atom2].push((bond.atom1, idx));
        }
        for neighbors in &mut adjacency {
            neighbors.sort_unstable();
        }

        let ring_bonds = find_ring_bonds(&adjacency, bonds.len());
        let smallest_rings = smallest_ring_per_atom(&adjacency, &bonds, &ring_bonds);

        Ok(Self {
            atoms,
            bonds,
            adjacency,
            ring_bonds,
            smallest_rings,
        })
    }

    pub fn atoms(&self) -> &[Atom] {
        &self.atoms
    }

    pub fn atom(&self, index: usize) -> Option<&Atom> {
        self.atoms.get(index)
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    pub fn bonds(&self) -> &[Bond] {
        &self.bonds
    }

    pub fn bond_count(&self) -> usize {
        self.bonds.len()
    }

    /// Neighbor atom indices of `atom`, ascending.
    pub fn neighbors(&self, atom: usize) -> impl Iterator<Item = usize> + '_ {
        self.adjacency[atom].iter().map(|&(n, _)| n)
    }

    /// `(neighbor, bond index)` pairs of `atom`, ascending by neighbor.
    pub fn neighbor_bonds(&self, atom: usize) -> &[(usize, usize)] {
        &self.adjacency[atom]
    }

    /// Number of explicit graph neighbors.
    pub fn degree(&self, atom: usize) -> usize {
        self.adjacency[atom].len()
    }

    /// Index of the bond between `a` and `b`, if any.
    pub fn bond_index(&self, a: usize, b: usize) -> Option<usize> {
        self.adjacency
            .get(a)?
            .binary_search_by_key(&b, |&(n, _)| n)
            .ok()
            .map(|pos| self.adjacency[a][pos].1)
    }

    pub fn bond_between(&self, a: usize, b: usize) -> Option<&Bond> {
        self.bond_index(a, b).map(|idx| &self.bonds[idx])
    }

    pub fn are_bonded(&self, a: usize, b: usize) -> bool {
        self.bond_index(a, b).is_some()
    }

    /// Explicit hydrogen neighbors plus implicit hydrogens.
    pub fn total_hydrogens(&self, atom: usize) -> usize {
        let explicit = self
            .neighbors(atom)
            .filter(|&n| self.atoms[n].element.is_hydrogen())
            .count();
        explicit + self.atoms[atom].implicit_hydrogens as usize
    }

    /// Explicit degree plus implicit hydrogens.
    pub fn connectivity(&self, atom: usize) -> usize {
        self.degree(atom) + self.atoms[atom].implicit_hydrogens as usize
    }

    /// Sum of bond orders (aromatic counted as 1.5, rounded down) plus implicit hydrogens.
    pub fn total_valence(&self, atom: usize) -> usize {
        let half_units: u32 = self.adjacency[atom]
            .iter()
            .map(|&(_, b)| self.bonds[b].valence_half_units())
            .sum();
        (half_units / 2) as usize + self.atoms[atom].implicit_hydrogens as usize
    }

    pub fn is_ring_bond(&self, bond_index: usize) -> bool {
        self.ring_bonds[bond_index]
    }

    pub fn is_in_ring(&self, atom: usize) -> bool {
        self.smallest_rings[atom].is_some()
    }

    pub fn smallest_ring_size(&self, atom: usize) -> Option<usize> {
        self.smallest_rings[atom]
    }

    /// Number of ring bonds incident to `atom`.
    pub fn ring_connectivity(&self, atom: usize) -> usize {
        self.adjacency[atom]
            .iter()
            .filter(|&&(_, b)| self.ring_bonds[b])
            .count()
    }
}

/// Marks every non-bridge bond with an iterative Tarjan lowlink walk.
fn find_ring_bonds(adjacency: &[Vec<(usize, usize)>], n_bonds: usize) -> Vec<bool> {
    let n_atoms = adjacency.len();
    let mut disc = vec![usize::MAX; n_atoms];
    let mut low = vec![0usize; n_atoms];
    let mut is_bridge = vec![false; n_bonds];
    let mut timer = 0usize;

    for root in 0..n_atoms {
        if disc[root] != usize::MAX {
            continue;
        }
        disc[root] = timer;
        low[root] = timer;
        timer += 1;

        // (atom, bond used to reach it, next adjacency cursor)
        let mut stack: Vec<(usize, Option<usize>, usize)> = vec![(root, None, 0)];
        while let Some(&(u, parent_bond, cursor)) = stack.last() {
            if cursor < adjacency[u].len() {
                if let Some(top) = stack.last_mut() {
                    top.2 += 1;
                }
                let (v, bond) = adjacency[u][cursor];
                if parent_bond == Some(bond) {
                    continue;
                }
                if disc[v] == usize::MAX {
                    disc[v] = timer;
                    low[v] = timer;
                    timer += 1;
                    stack.push((v, Some(bond), 0));
                } else {
                    low[u] = low[u].min(disc[v]);
                }
            } else {
                stack.pop();
                if let Some(&(p, _, _)) = stack.last() {
                    low[p] = low[p].min(low[u]);
                    if low[u] > disc[p] {
                        if let Some(bond) = parent_bond {
                            is_bridge[bond] = true;
                        }
                    }
                }
            }
        }
    }

    is_bridge.into_iter().map(|bridge| !bridge).collect()
}

/// For every ring bond, the shortest alternative path between its ends closes
/// the smallest ring through that bond; an atom takes the minimum over its bonds.
fn smallest_ring_per_atom(
    adjacency: &[Vec<(usize, usize)>],
    bonds: &[Bond],
    ring_bonds: &[bool],
) -> Vec<Option<usize>> {
    let mut smallest: Vec<Option<usize>> = vec![None; adjacency.len()];
    let mut distance = vec![usize::MAX; adjacency.len()];
    let mut touched = Vec::new();

    for (bond_idx, bond) in bonds.iter().enumerate() {
        if !ring_bonds[bond_idx] {
            continue;
        }

        let mut queue = VecDeque::new();
        distance[bond.atom1] = 0;
        touched.push(bond.atom1);
        queue.push_back(bond.atom1);
        let mut ring_size = None;

        'bfs: while let Some(u) = queue.pop_front() {
            for &(v, b) in &adjacency[u] {
                if b == bond_idx || !ring_bonds[b] || distance[v] != usize::MAX {
                    continue;
                }
                distance[v] = distance[u] + 1;
                touched.push(v);
                if v == bond.atom2 {
                    ring_size = Some(distance[v] + 1);
                    break 'bfs;
                }
                queue.push_back(v);
            }
        }

        for atom in touched.drain(..) {
            distance[atom] = usize::MAX;
        }

        if let Some(size) = ring_size {
            for atom in [bond.atom1, bond.atom2] {
                smallest[atom] = Some(smallest[atom].map_or(size, |s| s.min(size)));
            }
        }
    }

    smallest
}
