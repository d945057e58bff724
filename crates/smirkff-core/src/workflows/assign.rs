use crate::core::forcefield::handlers::HandlerKind;
use crate::core::forcefield::params::ForceField;
use crate::core::io::toml_topology::TomlTopology;
use crate::core::io::traits::TopologyFile;
use crate::core::models::topology::Topology;
use crate::engine::assignment::ParameterAssignment;
use crate::engine::config::AssignmentConfig;
use crate::engine::context::AssignmentContext;
use crate::engine::error::AssignError;
use crate::engine::progress::{ProgressReporter, Stage};
use crate::engine::tasks;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use tracing::{info, instrument, warn};

/// Loads the configured documents and assigns parameters to `topology`.
#[instrument(skip_all, name = "assignment_workflow")]
pub fn run(
    topology: &Topology,
    config: &AssignmentConfig,
    reporter: &ProgressReporter,
) -> Result<ParameterAssignment, AssignError> {
    let cancel = AtomicBool::new(false);
    run_with_cancel(topology, config, reporter, &cancel)
}

/// Like [`run`], stopping with [`AssignError::Cancelled`] once `cancel` is set.
pub fn run_with_cancel(
    topology: &Topology,
    config: &AssignmentConfig,
    reporter: &ProgressReporter,
    cancel: &AtomicBool,
) -> Result<ParameterAssignment, AssignError> {
    info!(
        documents = config.forcefield_paths.len(),
        "Loading force field documents."
    );
    let forcefield =
        reporter.stage(Stage::Loading, || ForceField::load(config.forcefield_paths.as_slice()))?;

    let context = AssignmentContext::new(topology, &forcefield, reporter, &config.handlers)
        .with_coverage(config.enforce_coverage)
        .with_cancel_flag(cancel);
    assign_parameters(&context)
}

/// Reads a TOML topology, then runs [`run`].
pub fn run_from_file(
    topology_path: &Path,
    config: &AssignmentConfig,
    reporter: &ProgressReporter,
) -> Result<ParameterAssignment, AssignError> {
    let topology = TomlTopology::read_from_path(topology_path)?;
    info!(
        atoms = topology.atom_count(),
        bonds = topology.bond_count(),
        "Read topology."
    );
    run(&topology, config, reporter)
}

/// Runs every selected task against an already loaded force field.
#[instrument(skip_all, name = "assign_parameters")]
pub fn assign_parameters(
    context: &AssignmentContext<'_>,
) -> Result<ParameterAssignment, AssignError> {
    let forcefield = context.forcefield;
    let mut assignment = ParameterAssignment::default();

    for kind in HandlerKind::ALL {
        if !context.wants(kind) {
            continue;
        }
        match forcefield.handler(kind) {
            Some(handler) => {
                assignment
                    .units
                    .insert(kind.as_str().to_string(), *handler.units());
            }
            None if kind.required_by_default() => {
                warn!(handler = %kind, "Force field declares no handler for this class.");
            }
            None => {}
        }
    }

    run_stage(context, Stage::Valence, |context| {
        if let Some(handler) = forcefield.bonds().filter(|h| context.wants(h.kind)) {
            assignment.bonds = tasks::valence::run_bonds(context, handler)?;
        }
        if let Some(handler) = forcefield.angles().filter(|h| context.wants(h.kind)) {
            assignment.angles = tasks::valence::run_angles(context, handler)?;
        }
        Ok(())
    })?;

    run_stage(context, Stage::Torsions, |context| {
        if let Some(handler) = forcefield.proper_torsions().filter(|h| context.wants(h.kind)) {
            assignment.proper_torsions = tasks::valence::run_proper_torsions(context, handler)?;
        }
        if let Some(handler) = forcefield
            .improper_torsions()
            .filter(|h| context.wants(h.kind))
        {
            assignment.improper_torsions = tasks::impropers::run(context, handler)?;
        }
        Ok(())
    })?;

    run_stage(context, Stage::Nonbonded, |context| {
        let vdw = forcefield.vdw().filter(|h| context.wants(h.kind));
        if let Some(handler) = vdw {
            assignment.vdw = tasks::nonbonded::run_vdw(context, handler)?;
        }
        let electrostatics = forcefield
            .electrostatics()
            .filter(|h| context.wants(h.kind));
        assignment.pairs = tasks::nonbonded::run_pair_scales(
            context,
            vdw.map(|h| &h.settings.scales),
            electrostatics.map(|h| &h.settings.scales),
        )?;
        Ok(())
    })?;

    if let Some(handler) = forcefield
        .library_charges()
        .filter(|h| context.wants(h.kind))
    {
        run_stage(context, Stage::Charges, |context| {
            assignment.charges = tasks::charges::run(context, handler)?;
            Ok(())
        })?;
    }

    info!(
        elements = assignment.element_count(),
        pairs = assignment.pairs.len(),
        "Parameter assignment complete."
    );
    Ok(assignment)
}

fn run_stage<'a>(
    context: &AssignmentContext<'a>,
    stage: Stage,
    body: impl FnOnce(&AssignmentContext<'a>) -> Result<(), AssignError>,
) -> Result<(), AssignError> {
    context.check_cancelled()?;
    context.reporter.stage(stage, || body(context))
}
