use super::{check_coverage, resolve_elements};
use crate::core::forcefield::handlers::Handler;
use crate::core::forcefield::parameterization::chain_orientations;
use crate::core::topology::elements::{
    enumerate_angles, enumerate_bonds, enumerate_proper_torsions,
};
use crate::engine::assignment::Assigned;
use crate::engine::context::AssignmentContext;
use crate::engine::error::AssignError;
use tracing::{info, instrument};

/// Resolves linear chain elements (bonds, angles, proper torsions) against one
/// handler. Each chain is tried forward, then reversed.
fn run_chains<P, S, const N: usize>(
    context: &AssignmentContext<'_>,
    handler: &Handler<P, S>,
    element: &'static str,
    chains: Vec<[usize; N]>,
) -> Result<Vec<Assigned<P>>, AssignError>
where
    P: Clone + Sync,
    S: Sync,
{
    let resolved = resolve_elements(context, handler, &chains, |c| chain_orientations(c))?;
    check_coverage(context, handler, element, &chains, &resolved, |c| c.to_vec())?;

    let assigned: Vec<Assigned<P>> = chains
        .iter()
        .zip(resolved)
        .filter_map(|(chain, hit)| {
            hit.map(|hit| Assigned {
                atoms: chain.to_vec(),
                rule_id: hit.rule.id.clone(),
                params: hit.rule.params.clone(),
            })
        })
        .collect();

    info!(
        handler = %handler.kind,
        elements = chains.len(),
        assigned = assigned.len(),
        "Resolved {element} parameters."
    );
    Ok(assigned)
}

#[instrument(skip_all, name = "bond_task")]
pub fn run_bonds<P: Clone + Sync, S: Sync>(
    context: &AssignmentContext<'_>,
    handler: &Handler<P, S>,
) -> Result<Vec<Assigned<P>>, AssignError> {
    run_chains(context, handler, "bond", enumerate_bonds(context.topology))
}

#[instrument(skip_all, name = "angle_task")]
pub fn run_angles<P: Clone + Sync, S: Sync>(
    context: &AssignmentContext<'_>,
    handler: &Handler<P, S>,
) -> Result<Vec<Assigned<P>>, AssignError> {
    run_chains(context, handler, "angle", enumerate_angles(context.topology))
}

/// Resolves proper torsions. All Fourier terms of the winning rule are kept.
#[instrument(skip_all, name = "proper_torsion_task")]
pub fn run_proper_torsions<P: Clone + Sync, S: Sync>(
    context: &AssignmentContext<'_>,
    handler: &Handler<P, S>,
) -> Result<Vec<Assigned<P>>, AssignError> {
    run_chains(
        context,
        handler,
        "torsion",
        enumerate_proper_torsions(context.topology),
    )
}
