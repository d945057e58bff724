use crate::core::forcefield::handlers::LibraryChargeHandler;
use crate::core::forcefield::parameterization::assign_library_charges;
use crate::engine::assignment::Assigned;
use crate::engine::context::AssignmentContext;
use crate::engine::error::AssignError;
use crate::engine::progress::Progress;
use tracing::{debug, info, instrument};

/// Assigns library charges. Unlike the per-element tasks, every rule is matched
/// once against the whole topology and atoms keep the charge of the last
/// declared rule covering them.
#[instrument(skip_all, name = "library_charge_task")]
pub fn run(
    context: &AssignmentContext<'_>,
    handler: &LibraryChargeHandler,
) -> Result<Vec<Assigned<f64>>, AssignError> {
    context.check_cancelled()?;
    context.reporter.report(Progress::HandlerStart {
        handler: handler.kind,
        elements: context.topology.atom_count() as u64,
    });
    let per_atom = assign_library_charges(handler, context.topology);
    context.check_cancelled()?;
    context.reporter.report(Progress::HandlerFinish {
        handler: handler.kind,
        matched: per_atom.iter().filter(|c| c.is_some()).count() as u64,
    });

    if let Some(atom) = per_atom.iter().position(Option::is_none) {
        if handler.required && context.enforce_coverage {
            return Err(context.coverage_error(handler.kind, "atom", &[atom]));
        }
        debug!(
            uncovered = per_atom.iter().filter(|c| c.is_none()).count(),
            "Atoms without a library charge."
        );
    }

    let assigned: Vec<Assigned<f64>> = per_atom
        .into_iter()
        .enumerate()
        .filter_map(|(atom, charge)| {
            charge.map(|c| Assigned {
                atoms: vec![atom],
                rule_id: c.rule.id.clone(),
                params: c.charge,
            })
        })
        .collect();

    let total: f64 = assigned.iter().map(|a| a.params).sum();
    info!(
        assigned = assigned.len(),
        total_charge = total,
        "Assigned library charges."
    );
    Ok(assigned)
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

    fn water() -> Topology {
        let atoms = vec![
            Atom::new(Element::O),
            Atom::new(Element::H),
            Atom::new(Element::H),
        ];
        let bonds = vec![
            Bond::new(0, 1, BondOrder::Single),
            Bond::new(0, 2, BondOrder::Single),
        ];
        Topology::new(atoms, bonds).unwrap()
    }

    fn forcefield(required: bool) -> ForceField {
        ForceField::from_toml_str(&format!(
            r#"
            version = "0.3"
            [[handlers]]
            type = "LibraryCharges"
            required = {required}
            [[handlers.rules]]
            id = "tip3p"
            smirks = "[#1:2]-[#8X2:1]-[#1:3]"
            charges = [-0.834, 0.417, 0.417]
            [[handlers.rules]]
            id = "lone-oxygen"
            smirks = "[#8:1]"
            charges = [-0.5]
            "#
        ))
        .unwrap()
    }

    #[test]
    fn later_rule_overrides_per_atom() {
        let topology = water();
        let ff = forcefield(false);
        let reporter = ProgressReporter::new();
        let selection = HandlerSelection::All;
        let context = AssignmentContext::new(&topology, &ff, &reporter, &selection);

        let charges = run(&context, ff.library_charges().unwrap()).unwrap();
        assert_eq!(charges.len(), 3);
        assert_eq!(charges[0].params, -0.5);
        assert_eq!(charges[0].rule_id, "lone-oxygen");
        assert_eq!(charges[1].params, 0.417);
        assert_eq!(charges[2].rule_id, "tip3p");
    }

    #[test]
    fn required_library_charges_report_uncovered_atoms() {
        let atoms = vec![Atom::new(Element::C), Atom::new(Element::O)];
        let bonds = vec![Bond::new(0, 1, BondOrder::Double)];
        let topology = Topology::new(atoms, bonds).unwrap();
        let ff = forcefield(true);
        let reporter = ProgressReporter::new();
        let selection = HandlerSelection::All;
        let context = AssignmentContext::new(&topology, &ff, &reporter, &selection);

        let err = run(&context, ff.library_charges().unwrap()).unwrap_err();
        assert!(matches!(err, AssignError::Coverage { atoms, .. } if atoms == vec![0]));
    }
}
