use super::{check_coverage, resolve_elements};
use crate::core::forcefield::handlers::{PairScales, VdwHandler, VdwParams};
use crate::core::topology::separation::bond_separations;
use crate::engine::assignment::{Assigned, ScaledPair};
use crate::engine::context::AssignmentContext;
use crate::engine::error::AssignError;
use tracing::{info, instrument};

/// Resolves Lennard-Jones parameters for every atom.
#[instrument(skip_all, name = "vdw_task")]
pub fn run_vdw(
    context: &AssignmentContext<'_>,
    handler: &VdwHandler,
) -> Result<Vec<Assigned<VdwParams>>, AssignError> {
    let atoms: Vec<usize> = (0..context.topology.atom_count()).collect();
    let resolved = resolve_elements(context, handler, &atoms, |&a| vec![vec![a]])?;
    check_coverage(context, handler, "atom", &atoms, &resolved, |&a| vec![a])?;

    let assigned: Vec<Assigned<VdwParams>> = atoms
        .iter()
        .zip(resolved)
        .filter_map(|(&atom, hit)| {
            hit.map(|hit| Assigned {
                atoms: vec![atom],
                rule_id: hit.rule.id.clone(),
                params: hit.rule.params,
            })
        })
        .collect();

    info!(
        atoms = atoms.len(),
        assigned = assigned.len(),
        combining_rule = handler.settings.combining_rule.as_str(),
        "Resolved vdW parameters."
    );
    Ok(assigned)
}

/// Scale factors for every pair within four bonds, from one shortest-path pass.
#[instrument(skip_all, name = "pair_scale_task")]
pub fn run_pair_scales(
    context: &AssignmentContext<'_>,
    vdw: Option<&PairScales>,
    electrostatics: Option<&PairScales>,
) -> Result<Vec<ScaledPair>, AssignError> {
    if vdw.is_none() && electrostatics.is_none() {
        return Ok(Vec::new());
    }
    let pairs: Vec<ScaledPair> = bond_separations(context.topology)
        .into_iter()
        .map(|sep| ScaledPair {
            atom1: sep.atom1,
            atom2: sep.atom2,
            bonds: sep.bonds,
            vdw: vdw.map(|s| s.for_separation(sep.bonds)),
            electrostatics: electrostatics.map(|s| s.for_separation(sep.bonds)),
        })
        .collect();
    context.check_cancelled()?;

    info!(pairs = pairs.len(), "Computed nonbonded pair scale factors.");
    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::forcefield::params::ForceField;
    use crate::core::models::atom::Atom;
    use crate::core::models::element::Element;
    use crate::core::models::topology::{Bond, BondOrder, Topology};
    use crate::engine::config::HandlerSelection;
    use crate::engine::progress::ProgressReporter;

    /// A straight chain of seven carbons.
    fn heptane() -> Topology {
        let atoms = (0..7)
            .map(|_| Atom::new(Element::C).with_implicit_hydrogens(2))
            .collect();
        let bonds = (0..6)
            .map(|i| Bond::new(i, i + 1, BondOrder::Single))
            .collect();
        Topology::new(atoms, bonds).unwrap()
    }

    #[test]
    fn pair_scales_follow_bond_separation() {
        let topology = heptane();
        let ff = ForceField::empty();
        let reporter = ProgressReporter::new();
        let selection = HandlerSelection::All;
        let context = AssignmentContext::new(&topology, &ff, &reporter, &selection);

        let pairs = run_pair_scales(
            &context,
            Some(&PairScales::VDW_DEFAULT),
            Some(&PairScales::ELECTROSTATICS_DEFAULT),
        )
        .unwrap();
        let find = |a: usize, b: usize| pairs.iter().find(|p| (p.atom1, p.atom2) == (a, b));

        assert_eq!(find(0, 1).unwrap().vdw, Some(0.0));
        assert_eq!(find(0, 2).unwrap().vdw, Some(0.0));
        assert_eq!(find(0, 3).unwrap().vdw, Some(0.5));
        assert_eq!(find(0, 4).unwrap().vdw, Some(1.0));
        assert!(find(0, 5).is_none());
        assert!(find(0, 6).is_none());
        assert!((find(0, 3).unwrap().electrostatics.unwrap() - 0.833_333_333_3).abs() < 1e-12);
    }

    #[test]
    fn missing_vdw_rule_names_the_atom() {
        let atoms = vec![Atom::new(Element::C), Atom::new(Element::O).with_name("O1")];
        let bonds = vec![Bond::new(0, 1, BondOrder::Double)];
        let topology = Topology::new(atoms, bonds).unwrap();
        let ff = ForceField::from_toml_str(
            r#"
            version = "0.3"
            [[handlers]]
            type = "vdW"
            units = { length = "angstrom", energy = "kcal/mol" }
            [[handlers.rules]]
            id = "carbon"
            smirks = "[#6:1]"
            epsilon = 0.086
            rmin-half = 1.908
            "#,
        )
        .unwrap();
        let reporter = ProgressReporter::new();
        let selection = HandlerSelection::All;
        let context = AssignmentContext::new(&topology, &ff, &reporter, &selection);

        let err = run_vdw(&context, ff.vdw().unwrap()).unwrap_err();
        assert!(matches!(&err, AssignError::Coverage { atoms, .. } if atoms == &vec![1]));
        assert!(err.to_string().contains("O1(1)"));
    }
}
