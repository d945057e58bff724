use super::pattern::{AtomExpr, AtomPrimitive, BondExpr, BondPrimitive, Pattern};
use crate::core::models::topology::{BondOrder, BondStereo, Topology};
use std::collections::{BTreeSet, VecDeque};

/// How reported tuples that describe the same structural element are collapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TupleSymmetry {
    /// Every distinct tuple is its own element.
    None,
    /// A tuple and its reverse are the same element (bonds, angles, torsions).
    Chain,
    /// Tuples sharing the second atom and the same set of remaining atoms are
    /// the same element (impropers, center tagged `:2`).
    Improper,
}

impl TupleSymmetry {
    /// The representative tuple of an element.
    pub fn canonicalize(self, mut tuple: Vec<usize>) -> Vec<usize> {
        match self {
            TupleSymmetry::None => {}
            TupleSymmetry::Chain => {
                if tuple.first() > tuple.last() {
                    tuple.reverse();
                }
            }
            TupleSymmetry::Improper => {
                if tuple.len() == 4 {
                    let center = tuple[1];
                    let mut peripherals = [tuple[0], tuple[2], tuple[3]];
                    peripherals.sort_unstable();
                    tuple = vec![peripherals[0], center, peripherals[1], peripherals[2]];
                }
            }
        }
        tuple
    }
}

impl Pattern {
    /// Every distinct tuple of reported atoms (see [`Pattern::reported_atoms`])
    /// over all embeddings of the pattern, sorted.
    pub fn find_matches(&self, topology: &Topology) -> Vec<Vec<usize>> {
        let mut search = Search::new(self, topology, &[], false);
        search.run();
        search.found.into_iter().collect()
    }

    /// Like [`Pattern::find_matches`], with symmetric duplicates collapsed to one
    /// representative per element.
    pub fn find_unique_matches(
        &self,
        topology: &Topology,
        symmetry: TupleSymmetry,
    ) -> Vec<Vec<usize>> {
        let unique: BTreeSet<Vec<usize>> = self
            .find_matches(topology)
            .into_iter()
            .map(|t| symmetry.canonicalize(t))
            .collect();
        unique.into_iter().collect()
    }

    /// Whether some embedding maps the reported atoms exactly onto `atoms`, in order.
    pub fn matches_at(&self, topology: &Topology, atoms: &[usize]) -> bool {
        let reported = self.reported_atoms();
        if reported.len() != atoms.len() || atoms.iter().any(|&a| a >= topology.atom_count()) {
            return false;
        }
        let pins: Vec<(usize, usize)> = reported.into_iter().zip(atoms.iter().copied()).collect();
        let mut search = Search::new(self, topology, &pins, true);
        search.run();
        search.matched
    }

    /// Whether any embedding exists at all.
    pub fn has_match(&self, topology: &Topology) -> bool {
        let mut search = Search::new(self, topology, &[], true);
        search.run();
        search.matched
    }

    /// Whether some embedding places the pattern's first atom on `atom`.
    /// This is the test a `$(...)` primitive applies.
    pub fn matches_rooted(&self, topology: &Topology, atom: usize) -> bool {
        if self.atom_count() == 0 || atom >= topology.atom_count() {
            return false;
        }
        let mut search = Search::new(self, topology, &[(0, atom)], true);
        search.run();
        search.matched
    }
}

struct Search<'a> {
    pattern: &'a Pattern,
    topology: &'a Topology,
    /// Pattern atoms in the order they are assigned.
    order: Vec<usize>,
    pinned: Vec<Option<usize>>,
    /// Target atom assigned to each pattern atom. Also serves as the set of
    /// occupied targets.
    core_pattern: Vec<Option<usize>>,
    reported: Vec<usize>,
    stop_at_first: bool,
    matched: bool,
    found: BTreeSet<Vec<usize>>,
}

impl<'a> Search<'a> {
    fn new(
        pattern: &'a Pattern,
        topology: &'a Topology,
        pins: &[(usize, usize)],
        stop_at_first: bool,
    ) -> Self {
        let mut pinned = vec![None; pattern.atom_count()];
        for &(p, t) in pins {
            pinned[p] = Some(t);
        }
        Self {
            pattern,
            topology,
            order: search_order(pattern, pins),
            pinned,
            core_pattern: vec![None; pattern.atom_count()],
            reported: pattern.reported_atoms(),
            stop_at_first,
            matched: false,
            found: BTreeSet::new(),
        }
    }

    fn run(&mut self) {
        if self.pattern.atom_count() == 0 || self.pattern.atom_count() > self.topology.atom_count()
        {
            return;
        }
        self.extend(0);
    }

    fn done(&self) -> bool {
        self.stop_at_first && self.matched
    }

    fn extend(&mut self, depth: usize) {
        if depth == self.order.len() {
            self.matched = true;
            if !self.stop_at_first {
                let tuple: Option<Vec<usize>> =
                    self.reported.iter().map(|&p| self.core_pattern[p]).collect();
                if let Some(tuple) = tuple {
                    self.found.insert(tuple);
                }
            }
            return;
        }

        let pattern_atom = self.order[depth];
        for target_atom in self.candidates(pattern_atom) {
            if self.is_used(target_atom) || !self.is_feasible(pattern_atom, target_atom) {
                continue;
            }
            self.core_pattern[pattern_atom] = Some(target_atom);

            self.extend(depth + 1);

            self.core_pattern[pattern_atom] = None;

            if self.done() {
                return;
            }
        }
    }

    fn is_used(&self, target_atom: usize) -> bool {
        self.core_pattern.contains(&Some(target_atom))
    }

    fn candidates(&self, pattern_atom: usize) -> Vec<usize> {
        if let Some(target) = self.pinned[pattern_atom] {
            return vec![target];
        }
        let anchor = self
            .pattern
            .adjacency(pattern_atom)
            .iter()
            .find_map(|&(neighbor, _)| self.core_pattern[neighbor]);
        match anchor {
            Some(mapped) => self.topology.neighbors(mapped).collect(),
            None => (0..self.topology.atom_count()).collect(),
        }
    }

    fn is_feasible(&self, pattern_atom: usize, target_atom: usize) -> bool {
        for &(p_neighbor, p_bond) in self.pattern.adjacency(pattern_atom) {
            let Some(t_neighbor) = self.core_pattern[p_neighbor] else {
                continue;
            };
            match self.topology.bond_index(target_atom, t_neighbor) {
                Some(t_bond) => {
                    if !eval_bond(&self.pattern.bonds()[p_bond].expr, self.topology, t_bond) {
                        return false;
                    }
                }
                None => return false,
            }
        }
        // Atom expressions last: they may recurse into nested patterns.
        eval_atom(&self.pattern.atoms()[pattern_atom].expr, self.topology, target_atom)
    }
}

/// Pinned atoms first, then breadth-first outward so that each later atom has
/// an already-placed neighbor whenever the pattern is connected.
fn search_order(pattern: &Pattern, pins: &[(usize, usize)]) -> Vec<usize> {
    let n = pattern.atom_count();
    let mut order = Vec::with_capacity(n);
    let mut visited = vec![false; n];
    let mut queue = VecDeque::new();

    for &(p, _) in pins {
        if p < n && !visited[p] {
            visited[p] = true;
            order.push(p);
            queue.push_back(p);
        }
    }

    let mut next_root = 0;
    loop {
        while let Some(atom) = queue.pop_front() {
            for &(neighbor, _) in pattern.adjacency(atom) {
                if !visited[neighbor] {
                    visited[neighbor] = true;
                    order.push(neighbor);
                    queue.push_back(neighbor);
                }
            }
        }
        while next_root < n && visited[next_root] {
            next_root += 1;
        }
        if next_root == n {
            break;
        }
        visited[next_root] = true;
        order.push(next_root);
        queue.push_back(next_root);
    }
    order
}

pub(crate) fn eval_atom(expr: &AtomExpr, topology: &Topology, atom: usize) -> bool {
    match expr {
        AtomExpr::Primitive(p) => eval_atom_primitive(p, topology, atom),
        AtomExpr::Not(inner) => !eval_atom(inner, topology, atom),
        AtomExpr::And(terms) => terms.iter().all(|t| eval_atom(t, topology, atom)),
        AtomExpr::Or(terms) => terms.iter().any(|t| eval_atom(t, topology, atom)),
    }
}

fn eval_atom_primitive(primitive: &AtomPrimitive, topology: &Topology, index: usize) -> bool {
    let atom = &topology.atoms()[index];
    match primitive {
        AtomPrimitive::Any => true,
        AtomPrimitive::AtomicNumber(n) => atom.element.atomic_number() == *n,
        AtomPrimitive::Aromatic => atom.is_aromatic,
        AtomPrimitive::Aliphatic => !atom.is_aromatic,
        AtomPrimitive::Degree(n) => topology.degree(index) == *n as usize,
        AtomPrimitive::TotalHydrogens(n) => topology.total_hydrogens(index) == *n as usize,
        AtomPrimitive::ImplicitHydrogens(n) => atom.implicit_hydrogens == *n,
        AtomPrimitive::Connectivity(n) => topology.connectivity(index) == *n as usize,
        AtomPrimitive::Valence(n) => topology.total_valence(index) == *n as usize,
        AtomPrimitive::InRing(in_ring) => topology.is_in_ring(index) == *in_ring,
        AtomPrimitive::SmallestRing(n) => topology.smallest_ring_size(index) == Some(*n as usize),
        AtomPrimitive::RingConnectivity(n) => topology.ring_connectivity(index) == *n as usize,
        AtomPrimitive::Charge(c) => atom.formal_charge == *c,
        AtomPrimitive::Chirality(c) => atom.chirality == *c,
        AtomPrimitive::Recursive(inner) => inner.matches_rooted(topology, index),
    }
}

pub(crate) fn eval_bond(expr: &BondExpr, topology: &Topology, bond_index: usize) -> bool {
    match expr {
        BondExpr::Primitive(p) => eval_bond_primitive(*p, topology, bond_index),
        BondExpr::Not(inner) => !eval_bond(inner, topology, bond_index),
        BondExpr::And(terms) => terms.iter().all(|t| eval_bond(t, topology, bond_index)),
        BondExpr::Or(terms) => terms.iter().any(|t| eval_bond(t, topology, bond_index)),
    }
}

fn eval_bond_primitive(primitive: BondPrimitive, topology: &Topology, index: usize) -> bool {
    let bond = &topology.bonds()[index];
    let plain_single = bond.order == BondOrder::Single && !bond.is_aromatic_bond();
    match primitive {
        BondPrimitive::Single => plain_single,
        BondPrimitive::Double => bond.order == BondOrder::Double && !bond.is_aromatic_bond(),
        BondPrimitive::Triple => bond.order == BondOrder::Triple && !bond.is_aromatic_bond(),
        BondPrimitive::Aromatic => bond.is_aromatic_bond(),
        BondPrimitive::Any => true,
        BondPrimitive::Ring => topology.is_ring_bond(index),
        BondPrimitive::Up => plain_single && bond.stereo != BondStereo::Down,
        BondPrimitive::Down => plain_single && bond.stereo != BondStereo::Up,
        BondPrimitive::SingleOrAromatic => {
            bond.order == BondOrder::Single || bond.is_aromatic_bond()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::{Atom, Chirality};
    use crate::core::models::element::Element;
    use crate::core::models::topology::Bond;
    use crate::core::smirks::parser::parse_smirks;

    /// C0-C1 with three H on each carbon (atoms 2..=7).
    fn ethane() -> Topology {
        let mut atoms = vec![Atom::new(Element::C), Atom::new(Element::C)];
        atoms.extend((0..6).map(|_| Atom::new(Element::H)));
        let mut bonds = vec![Bond::new(0, 1, BondOrder::Single)];
        for h in 2..5 {
            bonds.push(Bond::new(0, h, BondOrder::Single));
        }
        for h in 5..8 {
            bonds.push(Bond::new(1, h, BondOrder::Single));
        }
        Topology::new(atoms, bonds).unwrap()
    }

    /// Ethanol heavy atoms, hydrogens implicit: C0-C1-O2.
    fn ethanol() -> Topology {
        let atoms = vec![
            Atom::new(Element::C).with_implicit_hydrogens(3),
            Atom::new(Element::C).with_implicit_hydrogens(2),
            Atom::new(Element::O).with_implicit_hydrogens(1),
        ];
        let bonds = vec![
            Bond::new(0, 1, BondOrder::Single),
            Bond::new(1, 2, BondOrder::Single),
        ];
        Topology::new(atoms, bonds).unwrap()
    }

    /// Benzene with one substituent carbon on atom 0 (toluene heavy atoms).
    fn toluene() -> Topology {
        let mut atoms: Vec<Atom> = (0..6)
            .map(|_| Atom::new(Element::C).aromatic().with_implicit_hydrogens(1))
            .collect();
        atoms[0].implicit_hydrogens = 0;
        atoms.push(Atom::new(Element::C).with_implicit_hydrogens(3));
        let mut bonds: Vec<Bond> = (0..6)
            .map(|i| Bond::new(i, (i + 1) % 6, BondOrder::Aromatic))
            .collect();
        bonds.push(Bond::new(0, 6, BondOrder::Single));
        Topology::new(atoms, bonds).unwrap()
    }

    #[test]
    fn carbon_carbon_pattern_matches_both_orientations() {
        let pattern = parse_smirks("[#6:1]-[#6:2]").unwrap();
        let topology = ethane();
        assert_eq!(pattern.find_matches(&topology), vec![vec![0, 1], vec![1, 0]]);
        assert_eq!(
            pattern.find_unique_matches(&topology, TupleSymmetry::Chain),
            vec![vec![0, 1]]
        );
    }

    #[test]
    fn untagged_atoms_collapse_into_one_tuple() {
        // Every H-C-C-H embedding reports the same tagged pair.
        let pattern = parse_smirks("[#1]-[#6:1]-[#6:2]-[#1]").unwrap();
        assert_eq!(
            pattern.find_matches(&ethane()),
            vec![vec![0, 1], vec![1, 0]]
        );
    }

    #[test]
    fn pinned_match_respects_tag_order() {
        let pattern = parse_smirks("[#6:1]-[#1:2]").unwrap();
        let topology = ethane();
        assert!(pattern.matches_at(&topology, &[0, 2]));
        assert!(!pattern.matches_at(&topology, &[2, 0]));
        assert!(!pattern.matches_at(&topology, &[0, 5]));
        assert!(!pattern.matches_at(&topology, &[0]));
        assert!(!pattern.matches_at(&topology, &[0, 99]));
    }

    #[test]
    fn pinned_atoms_never_share_a_target() {
        let pattern = parse_smirks("[*:1]~[*]~[*:2]").unwrap();
        let topology = ethanol();
        assert!(pattern.matches_at(&topology, &[0, 2]));
        assert!(pattern.matches_at(&topology, &[2, 0]));
        assert!(!pattern.matches_at(&topology, &[0, 0]));
        assert!(!pattern.matches_at(&topology, &[1, 1]));
    }

    #[test]
    fn hydrogen_counts_include_implicit_hydrogens() {
        let topology = ethanol();
        let methyl = parse_smirks("[#6H3:1]").unwrap();
        assert_eq!(methyl.find_matches(&topology), vec![vec![0]]);
        let hydroxyl = parse_smirks("[#8X2H1:1]").unwrap();
        assert_eq!(hydroxyl.find_matches(&topology), vec![vec![2]]);
        let carbon_h = parse_smirks("[#6h2:1]").unwrap();
        assert_eq!(carbon_h.find_matches(&topology), vec![vec![1]]);
    }

    #[test]
    fn recursive_environment_restricts_the_root_atom() {
        let topology = ethanol();
        let alcohol_carbon = parse_smirks("[#6;$([#6]-[#8]):1]").unwrap();
        assert_eq!(alcohol_carbon.find_matches(&topology), vec![vec![1]]);
        let not_alcohol = parse_smirks("[#6;!$([#6]-[#8]):1]").unwrap();
        assert_eq!(not_alcohol.find_matches(&topology), vec![vec![0]]);
    }

    #[test]
    fn aromatic_bond_matches_regardless_of_kekule_order() {
        let mut atoms: Vec<Atom> = (0..6).map(|_| Atom::new(Element::C).aromatic()).collect();
        atoms[0].implicit_hydrogens = 1;
        let bonds: Vec<Bond> = (0..6)
            .map(|i| {
                let order = if i % 2 == 0 {
                    BondOrder::Double
                } else {
                    BondOrder::Single
                };
                Bond::new(i, (i + 1) % 6, order).aromatic()
            })
            .collect();
        let topology = Topology::new(atoms, bonds).unwrap();

        let aromatic = parse_smirks("[c:1]:[c:2]").unwrap();
        assert_eq!(
            aromatic
                .find_unique_matches(&topology, TupleSymmetry::Chain)
                .len(),
            6
        );
        let single = parse_smirks("[#6:1]-[#6:2]").unwrap();
        assert!(single.find_matches(&topology).is_empty());
        let double = parse_smirks("[#6:1]=[#6:2]").unwrap();
        assert!(double.find_matches(&topology).is_empty());
        let not_aromatic = parse_smirks("[#6:1]!:[#6:2]").unwrap();
        assert!(not_aromatic.find_matches(&topology).is_empty());
    }

    #[test]
    fn ring_primitives_on_substituted_ring() {
        let topology = toluene();
        let ring_atoms = parse_smirks("[#6r6:1]").unwrap();
        assert_eq!(ring_atoms.find_matches(&topology).len(), 6);
        let chain_atom = parse_smirks("[#6R0:1]").unwrap();
        assert_eq!(chain_atom.find_matches(&topology), vec![vec![6]]);
        let exocyclic = parse_smirks("[#6:1]!@[#6:2]").unwrap();
        assert_eq!(
            exocyclic.find_unique_matches(&topology, TupleSymmetry::Chain),
            vec![vec![0, 6]]
        );
        let branch_point = parse_smirks("[cx2D3:1]").unwrap();
        assert_eq!(branch_point.find_matches(&topology), vec![vec![0]]);
    }

    #[test]
    fn six_membered_ring_pattern_closes() {
        let topology = toluene();
        let benzene = parse_smirks("c1ccccc1").unwrap();
        assert!(benzene.has_match(&topology));
        let cyclopentane = parse_smirks("C1CCCC1").unwrap();
        assert!(!cyclopentane.has_match(&topology));
    }

    #[test]
    fn impossible_pattern_is_an_empty_result() {
        let pattern = parse_smirks("[#7:1]-[#7:2]").unwrap();
        assert!(pattern.find_matches(&ethane()).is_empty());
        let too_big = parse_smirks("CCCCCCCCC").unwrap();
        assert!(too_big.find_matches(&ethanol()).is_empty());
    }

    #[test]
    fn disconnected_components_need_distinct_atoms() {
        let pattern = parse_smirks("[#8:1].[#8:2]").unwrap();
        assert!(pattern.find_matches(&ethanol()).is_empty());
        let pattern = parse_smirks("[#6:1].[#8:2]").unwrap();
        assert_eq!(
            pattern.find_matches(&ethanol()),
            vec![vec![0, 2], vec![1, 2]]
        );
    }

    #[test]
    fn chirality_is_compared_literally() {
        let atoms = vec![
            Atom::new(Element::C).with_chirality(Chirality::Clockwise),
            Atom::new(Element::C),
        ];
        let topology = Topology::new(atoms, vec![Bond::new(0, 1, BondOrder::Single)]).unwrap();
        let cw = parse_smirks("[#6@@:1]").unwrap();
        assert_eq!(cw.find_matches(&topology), vec![vec![0]]);
        let ccw = parse_smirks("[#6@:1]").unwrap();
        assert!(ccw.find_matches(&topology).is_empty());
    }

    #[test]
    fn improper_symmetry_keys_on_center() {
        assert_eq!(
            TupleSymmetry::Improper.canonicalize(vec![7, 3, 1, 5]),
            vec![1, 3, 5, 7]
        );
        assert_eq!(
            TupleSymmetry::Chain.canonicalize(vec![4, 2, 1]),
            vec![1, 2, 4]
        );
        assert_eq!(
            TupleSymmetry::None.canonicalize(vec![4, 2, 1]),
            vec![4, 2, 1]
        );
    }
}
