use crate::cli::AssignArgs;
use crate::config::build_config;
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use smirkff::{
    core::io::{toml_topology::TomlTopology, traits::TopologyFile},
    engine::{assignment::ParameterAssignment, progress::ProgressReporter},
    workflows,
};
use std::fs::File;
use std::path::Path;
use tracing::info;

pub fn run(args: AssignArgs) -> Result<()> {
    info!("Merging configuration from file and CLI arguments...");
    let app = build_config(&args)?;

    info!("Loading topology from {:?}", &app.topology_path);
    let topology =
        TomlTopology::read_from_path(&app.topology_path).map_err(|e| CliError::FileParsing {
            path: app.topology_path.clone(),
            source: e.into(),
        })?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!(
        "Assigning parameters to {} atoms from {} document(s)...",
        topology.atom_count(),
        app.core_config.forcefield_paths.len()
    );
    let assignment = workflows::assign::run(&topology, &app.core_config, &reporter)?;
    println!("{}", summary(&assignment));

    if let Some(path) = &app.toml_output {
        write_toml(&assignment, path)?;
        println!("✓ Assignment written to: {}", path.display());
    }
    if let Some(path) = &app.csv_output {
        write_csv(&assignment, path)?;
        println!("✓ CSV table written to: {}", path.display());
    }
    if app.toml_output.is_none() && app.csv_output.is_none() {
        print!("{}", assignment.to_toml_string()?);
    }
    Ok(())
}

fn summary(assignment: &ParameterAssignment) -> String {
    format!(
        "Assigned {} bonds, {} angles, {} proper torsions, {} improper terms, {} vdW atoms, {} charges; {} scaled pairs.",
        assignment.bonds.len(),
        assignment.angles.len(),
        assignment.proper_torsions.len(),
        assignment.improper_torsions.len(),
        assignment.vdw.len(),
        assignment.charges.len(),
        assignment.pairs.len(),
    )
}

fn write_toml(assignment: &ParameterAssignment, path: &Path) -> Result<()> {
    info!("Writing TOML assignment to {:?}", path);
    std::fs::write(path, assignment.to_toml_string()?)?;
    Ok(())
}

fn write_csv(assignment: &ParameterAssignment, path: &Path) -> Result<()> {
    info!("Writing CSV assignment to {:?}", path);
    assignment.write_csv(File::create(path)?)?;
    Ok(())
}
