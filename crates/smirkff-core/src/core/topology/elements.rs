use crate::core::models::topology::Topology;
use itertools::Itertools;
use serde::Serialize;

/// Reverses a linear atom chain so that its first index is not greater than its last.
///
/// A chain and its reverse describe the same bond, angle or torsion; this is the
/// single orientation every match and every enumerated element is keyed by.
pub fn canonical_chain<const N: usize>(mut atoms: [usize; N]) -> [usize; N] {
    if N > 1 && atoms[0] > atoms[N - 1] {
        atoms.reverse();
    }
    atoms
}

/// A trivalent (or higher) center and one unordered triple of its neighbors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ImproperCenter {
    pub center: usize,
    /// Peripheral atoms, ascending.
    pub neighbors: [usize; 3],
}

/// Every bond as an ascending atom pair, in bond order.
pub fn enumerate_bonds(topology: &Topology) -> Vec<[usize; 2]> {
    topology
        .bonds()
        .iter()
        .map(|b| [b.atom1, b.atom2])
        .collect()
}

/// Every path of length two, canonically oriented and sorted.
pub fn enumerate_angles(topology: &Topology) -> Vec<[usize; 3]> {
    let mut angles = Vec::new();
    for center in 0..topology.atom_count() {
        let neighbors: Vec<usize> = topology.neighbors(center).collect();
        for (&a, &b) in neighbors.iter().tuple_combinations() {
            angles.push(canonical_chain([a, center, b]));
        }
    }
    angles.sort_unstable();
    angles
}

/// Every path of length three with distinct end atoms, canonically oriented and sorted.
pub fn enumerate_proper_torsions(topology: &Topology) -> Vec<[usize; 4]> {
    let mut torsions = Vec::new();
    for bond in topology.bonds() {
        let (j, k) = (bond.atom1, bond.atom2);
        for i in topology.neighbors(j).filter(|&i| i != k) {
            for l in topology.neighbors(k).filter(|&l| l != j && l != i) {
                torsions.push(canonical_chain([i, j, k, l]));
            }
        }
    }
    torsions.sort_unstable();
    torsions.dedup();
    torsions
}

/// Every center with at least three neighbors, paired with each neighbor triple.
pub fn enumerate_improper_centers(topology: &Topology) -> Vec<ImproperCenter> {
    let mut centers = Vec::new();
    for center in 0..topology.atom_count() {
        if topology.degree(center) < 3 {
            continue;
        }
        let neighbors: Vec<usize> = topology.neighbors(center).collect();
        for (a, b, c) in neighbors.into_iter().tuple_combinations() {
            centers.push(ImproperCenter {
                center,
                neighbors: [a, b, c],
            });
        }
    }
    centers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Atom;
    use crate::core::models::element::Element;
    use crate::core::models::topology::{Bond, BondOrder};

    fn chain(n: usize) -> Topology {
        let atoms = (0..n).map(|_| Atom::new(Element::C)).collect();
        let bonds = (0..n - 1)
            .map(|i| Bond::new(i, i + 1, BondOrder::Single))
            .collect();
        Topology::new(atoms, bonds).unwrap()
    }

    fn star() -> Topology {
        // Atom 0 bonded to 1, 2, 3 and 4.
        let atoms = (0..5).map(|_| Atom::new(Element::C)).collect();
        let bonds = (1..5).map(|i| Bond::new(0, i, BondOrder::Single)).collect();
        Topology::new(atoms, bonds).unwrap()
    }

    #[test]
    fn canonical_chain_reverses_only_when_needed() {
        assert_eq!(canonical_chain([3, 1, 0]), [0, 1, 3]);
        assert_eq!(canonical_chain([0, 1, 3]), [0, 1, 3]);
        assert_eq!(canonical_chain([5, 2, 1, 4]), [4, 1, 2, 5]);
        assert_eq!(canonical_chain([2, 9]), [2, 9]);
    }

    #[test]
    fn chain_of_four_has_one_of_each_term() {
        let topology = chain(4);
        assert_eq!(enumerate_bonds(&topology), vec![[0, 1], [1, 2], [2, 3]]);
        assert_eq!(enumerate_angles(&topology), vec![[0, 1, 2], [1, 2, 3]]);
        assert_eq!(enumerate_proper_torsions(&topology), vec![[0, 1, 2, 3]]);
        assert!(enumerate_improper_centers(&topology).is_empty());
    }

    #[test]
    fn star_center_yields_all_neighbor_triples() {
        let topology = star();
        let centers = enumerate_improper_centers(&topology);
        assert_eq!(centers.len(), 4);
        assert!(centers.iter().all(|c| c.center == 0));
        assert_eq!(centers[0].neighbors, [1, 2, 3]);
        assert_eq!(centers[3].neighbors, [2, 3, 4]);
        assert_eq!(enumerate_angles(&topology).len(), 6);
    }

    #[test]
    fn three_membered_ring_has_no_proper_torsions() {
        let atoms = (0..3).map(|_| Atom::new(Element::C)).collect();
        let bonds = vec![
            Bond::new(0, 1, BondOrder::Single),
            Bond::new(1, 2, BondOrder::Single),
            Bond::new(2, 0, BondOrder::Single),
        ];
        let topology = Topology::new(atoms, bonds).unwrap();
        assert!(enumerate_proper_torsions(&topology).is_empty());
        assert_eq!(enumerate_angles(&topology).len(), 3);
    }

    #[test]
    fn four_membered_ring_torsions_are_not_duplicated() {
        let atoms = (0..4).map(|_| Atom::new(Element::C)).collect();
        let bonds = (0..4)
            .map(|i| Bond::new(i, (i + 1) % 4, BondOrder::Single))
            .collect();
        let topology = Topology::new(atoms, bonds).unwrap();
        let torsions = enumerate_proper_torsions(&topology);
        assert_eq!(torsions.len(), 4);
        assert!(torsions.iter().all(|t| t[0] < t[3]));
    }
}
