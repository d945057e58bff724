use super::handlers::{ChargeParams, Handler, LibraryChargeHandler, Rule};
use crate::core::models::topology::Topology;
use crate::core::topology::elements::ImproperCenter;
use itertools::Itertools;

/// The rule that won an element, and the element's atoms in the order of the
/// rule's map indices.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution<'a, P> {
    pub rule: &'a Rule<P>,
    pub atoms: Vec<usize>,
}

/// A chain in its given orientation, then reversed.
pub fn chain_orientations(atoms: &[usize]) -> Vec<Vec<usize>> {
    let forward = atoms.to_vec();
    let mut reverse = forward.clone();
    reverse.reverse();
    if reverse == forward {
        vec![forward]
    } else {
        vec![forward, reverse]
    }
}

/// Every ordering of the peripheral atoms with the center at the second position.
pub fn improper_orientations(improper: &ImproperCenter) -> Vec<Vec<usize>> {
    improper
        .neighbors
        .iter()
        .permutations(3)
        .map(|p| vec![*p[0], improper.center, *p[1], *p[2]])
        .collect()
}

/// Finds the winning rule for one element.
///
/// Rules are tried from the last declared to the first and the first hit wins,
/// which is the same as "the last matching rule wins". Each rule is tried against
/// every orientation in the order given.
pub fn resolve<'a, P, S>(
    handler: &'a Handler<P, S>,
    topology: &Topology,
    orientations: &[Vec<usize>],
) -> Option<Resolution<'a, P>> {
    handler.rules.iter().rev().find_map(|rule| {
        orientations
            .iter()
            .find(|atoms| rule.pattern.matches_at(topology, atoms))
            .map(|atoms| Resolution {
                rule,
                atoms: atoms.clone(),
            })
    })
}

/// A partial charge and the library charge rule that supplied it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AtomCharge<'a> {
    pub charge: f64,
    pub rule: &'a Rule<ChargeParams>,
}

/// Assigns library charges by matching each rule against the whole topology.
///
/// An atom takes its charge from the last declared rule that covers it. Atoms no
/// rule covers are `None`.
pub fn assign_library_charges<'a>(
    handler: &'a LibraryChargeHandler,
    topology: &Topology,
) -> Vec<Option<AtomCharge<'a>>> {
    let mut charges: Vec<Option<AtomCharge<'a>>> = vec![None; topology.atom_count()];
    let mut remaining = topology.atom_count();
    for rule in handler.rules.iter().rev() {
        if remaining == 0 {
            break;
        }
        for tuple in rule.pattern.find_matches(topology) {
            for (&atom, &charge) in tuple.iter().zip(&rule.params.charges) {
                if charges[atom].is_none() {
                    charges[atom] = Some(AtomCharge { charge, rule });
                    remaining -= 1;
                }
            }
        }
    }
    charges
}
