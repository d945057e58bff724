use super::{check_coverage, resolve_elements};
use crate::core::forcefield::handlers::{ImproperConvention, TorsionHandler, TorsionParams};
use crate::core::forcefield::parameterization::improper_orientations;
use crate::core::topology::elements::{ImproperCenter, enumerate_improper_centers};
use crate::engine::assignment::Assigned;
use crate::engine::context::AssignmentContext;
use crate::engine::error::AssignError;
use itertools::Itertools;
use tracing::{info, instrument};

/// Expands one matched improper `[p0, center, p1, p2]` into the terms of the
/// convention. Trefoil keeps the three cyclic rotations of the peripherals,
/// starting from the matched order; six-fold keeps every ordering.
pub fn expand_improper(matched: &[usize], convention: ImproperConvention) -> Vec<Vec<usize>> {
    let center = matched[1];
    let peripherals = [matched[0], matched[2], matched[3]];
    match convention {
        ImproperConvention::Trefoil => (0..3)
            .map(|shift| {
                vec![
                    peripherals[shift],
                    center,
                    peripherals[(shift + 1) % 3],
                    peripherals[(shift + 2) % 3],
                ]
            })
            .collect(),
        ImproperConvention::Six => peripherals
            .iter()
            .permutations(3)
            .map(|p| vec![*p[0], center, *p[1], *p[2]])
            .collect(),
    }
}

/// Resolves every trivalent center and emits one term per convention ordering.
///
/// Each emitted term carries the full parameters of the winning rule. The
/// rule's `idivf` (by default the number of terms) divides the barrier.
#[instrument(skip_all, name = "improper_torsion_task")]
pub fn run(
    context: &AssignmentContext<'_>,
    handler: &TorsionHandler,
) -> Result<Vec<Assigned<TorsionParams>>, AssignError> {
    let centers = enumerate_improper_centers(context.topology);
    let resolved = resolve_elements(context, handler, &centers, improper_orientations)?;
    check_coverage(context, handler, "improper", &centers, &resolved, |c: &ImproperCenter| {
        vec![c.neighbors[0], c.center, c.neighbors[1], c.neighbors[2]]
    })?;

    let convention = handler.settings.convention;
    let mut terms: Vec<Assigned<TorsionParams>> = resolved
        .into_iter()
        .flatten()
        .flat_map(|hit| {
            expand_improper(&hit.atoms, convention)
                .into_iter()
                .map(move |atoms| Assigned {
                    atoms,
                    rule_id: hit.rule.id.clone(),
                    params: hit.rule.params.clone(),
                })
        })
        .collect();
    terms.sort_by(|a, b| a.atoms.cmp(&b.atoms));

    info!(
        centers = centers.len(),
        terms = terms.len(),
        convention = convention.as_str(),
        "Resolved improper torsion parameters."
    );
    Ok(terms)
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

    /// Formaldehyde: C0(=O1)(H2)H3.
    fn formaldehyde() -> Topology {
        let atoms = vec![
            Atom::new(Element::C),
            Atom::new(Element::O),
            Atom::new(Element::H),
            Atom::new(Element::H),
        ];
        let bonds = vec![
            Bond::new(0, 1, BondOrder::Double),
            Bond::new(0, 2, BondOrder::Single),
            Bond::new(0, 3, BondOrder::Single),
        ];
        Topology::new(atoms, bonds).unwrap()
    }

    fn rules(convention: &str) -> String {
        format!(
            r#"
            version = "0.3"
            [[handlers]]
            type = "ImproperTorsions"
            convention = "{convention}"
            units = {{ angle = "degree", energy = "kcal/mol" }}
            [[handlers.rules]]
            id = "carbonyl"
            smirks = "[*:1]~[#6X3:2](=[#8:3])~[*:4]"
            periodicity = [2]
            phase = [180.0]
            k = [10.5]
            "#
        )
    }

    #[test]
    fn trefoil_rotates_peripherals() {
        let terms = expand_improper(&[2, 0, 1, 3], ImproperConvention::Trefoil);
        assert_eq!(
            terms,
            vec![vec![2, 0, 1, 3], vec![1, 0, 3, 2], vec![3, 0, 2, 1]]
        );
        assert_eq!(expand_improper(&[2, 0, 1, 3], ImproperConvention::Six).len(), 6);
    }

    #[test]
    fn trefoil_emits_three_terms_with_divided_barrier() {
        let topology = formaldehyde();
        let ff = ForceField::from_toml_str(&rules("trefoil")).unwrap();
        let reporter = ProgressReporter::new();
        let selection = HandlerSelection::All;
        let context = AssignmentContext::new(&topology, &ff, &reporter, &selection);

        let terms = run(&context, ff.improper_torsions().unwrap()).unwrap();
        assert_eq!(terms.len(), 3);
        assert!(terms.iter().all(|t| t.atoms[1] == 0));
        assert!(terms.iter().all(|t| t.params.terms[0].idivf == 3.0));
        assert!(terms.windows(2).all(|w| w[0].atoms < w[1].atoms));
    }

    #[test]
    fn six_fold_convention_emits_six_terms() {
        let topology = formaldehyde();
        let ff = ForceField::from_toml_str(&rules("six")).unwrap();
        let reporter = ProgressReporter::new();
        let selection = HandlerSelection::All;
        let context = AssignmentContext::new(&topology, &ff, &reporter, &selection);

        let terms = run(&context, ff.improper_torsions().unwrap()).unwrap();
        assert_eq!(terms.len(), 6);
        assert!(terms.iter().all(|t| t.params.terms[0].idivf == 6.0));
    }
}
