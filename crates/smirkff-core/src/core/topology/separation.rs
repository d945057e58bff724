use crate::core::models::topology::Topology;
use serde::Serialize;
use std::collections::VecDeque;

/// Largest bond separation that receives its own scale factor (the 1-5 pair);
/// anything further apart interacts unscaled.
pub const MAX_SCALED_SEPARATION: u8 = 4;

/// An atom pair and the number of bonds on the shortest path between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct BondSeparation {
    pub atom1: usize,
    pub atom2: usize,
    pub bonds: u8,
}

/// All pairs `atom1 < atom2` within `MAX_SCALED_SEPARATION` bonds, sorted.
pub fn bond_separations(topology: &Topology) -> Vec<BondSeparation> {
    let n_atoms = topology.atom_count();
    let mut pairs = Vec::new();
    let mut depth = vec![u8::MAX; n_atoms];
    let mut visited = Vec::new();
    let mut queue = VecDeque::new();

    for source in 0..n_atoms {
        depth[source] = 0;
        visited.push(source);
        queue.push_back(source);

        while let Some(u) = queue.pop_front() {
            if depth[u] == MAX_SCALED_SEPARATION {
                continue;
            }
            for v in topology.neighbors(u) {
                if depth[v] != u8::MAX {
                    continue;
                }
                depth[v] = depth[u] + 1;
                visited.push(v);
                queue.push_back(v);
                if v > source {
                    pairs.push(BondSeparation {
                        atom1: source,
                        atom2: v,
                        bonds: depth[v],
                    });
                }
            }
        }

        for atom in visited.drain(..) {
            depth[atom] = u8::MAX;
        }
    }

    pairs.sort_unstable();
    pairs
}

/// Shortest bond distance between two atoms, or `None` if it exceeds
/// `MAX_SCALED_SEPARATION` (or the atoms are disconnected).
pub fn separation_between(topology: &Topology, a: usize, b: usize) -> Option<u8> {
    if a == b {
        return Some(0);
    }
    let mut depth = vec![u8::MAX; topology.atom_count()];
    let mut queue = VecDeque::from([a]);
    depth[a] = 0;
    while let Some(u) = queue.pop_front() {
        if depth[u] == MAX_SCALED_SEPARATION {
            continue;
        }
        for v in topology.neighbors(u) {
            if depth[v] == u8::MAX {
                depth[v] = depth[u] + 1;
                if v == b {
                    return Some(depth[v]);
                }
                queue.push_back(v);
            }
        }
    }
    None
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

    #[test]
    fn chain_separations_stop_at_the_one_five_pair() {
        let topology = chain(8);
        let pairs = bond_separations(&topology);
        assert!(pairs.iter().all(|p| p.bonds >= 1 && p.bonds <= 4));
        let from_zero: Vec<_> = pairs.iter().filter(|p| p.atom1 == 0).collect();
        assert_eq!(from_zero.len(), 4);
        assert_eq!(from_zero[3].atom2, 4);
        assert!(!pairs.iter().any(|p| p.atom1 == 0 && p.atom2 == 5));
    }

    #[test]
    fn ring_uses_shortest_path() {
        let atoms = (0..6).map(|_| Atom::new(Element::C)).collect();
        let bonds = (0..6)
            .map(|i| Bond::new(i, (i + 1) % 6, BondOrder::Single))
            .collect();
        let topology = Topology::new(atoms, bonds).unwrap();
        let pairs = bond_separations(&topology);
        let para = pairs.iter().find(|p| p.atom1 == 0 && p.atom2 == 3).unwrap();
        assert_eq!(para.bonds, 3);
        let ortho = pairs.iter().find(|p| p.atom1 == 0 && p.atom2 == 5).unwrap();
        assert_eq!(ortho.bonds, 1);
    }

    #[test]
    fn separation_between_matches_pair_list() {
        let topology = chain(8);
        assert_eq!(separation_between(&topology, 0, 3), Some(3));
        assert_eq!(separation_between(&topology, 2, 2), Some(0));
        assert_eq!(separation_between(&topology, 0, 4), Some(4));
        assert_eq!(separation_between(&topology, 0, 6), None);
    }
}
