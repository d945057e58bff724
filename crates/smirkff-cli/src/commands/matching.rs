use crate::cli::MatchArgs;
use crate::error::{CliError, Result};
use smirkff::core::forcefield::params::ForceField;
use smirkff::core::io::{toml_topology::TomlTopology, traits::TopologyFile};
use smirkff::core::models::topology::Topology;
use smirkff::core::smirks::matcher::TupleSymmetry;
use smirkff::core::smirks::parser::parse_smirks_with;
use smirkff::core::smirks::substructures::Substructures;
use tracing::info;

pub fn run(args: MatchArgs) -> Result<()> {
    let substructures = match &args.forcefield {
        Some(path) => ForceField::from_path(path)?.substructures().clone(),
        None => Substructures::new(),
    };
    let topology = TomlTopology::read_from_path(&args.topology).map_err(|e| {
        CliError::FileParsing {
            path: args.topology.clone(),
            source: e.into(),
        }
    })?;

    let matches = find(&args.smirks, &substructures, &topology, args.unique)?;
    info!("Pattern '{}' matched {} time(s).", args.smirks, matches.len());
    for tuple in &matches {
        let labels: Vec<String> = tuple
            .iter()
            .map(|&i| {
                let atom = &topology.atoms()[i];
                format!("{}{}", atom.element, i)
            })
            .collect();
        println!("{:?}  {}", tuple, labels.join("-"));
    }
    println!("{} match(es).", matches.len());
    Ok(())
}

fn find(
    smirks: &str,
    substructures: &Substructures,
    topology: &Topology,
    unique: bool,
) -> Result<Vec<Vec<usize>>> {
    let pattern = parse_smirks_with(smirks, substructures)
        .map_err(|e| CliError::Argument(format!("invalid pattern '{smirks}': {e}")))?;
    Ok(if unique {
        pattern.find_unique_matches(topology, TupleSymmetry::Chain)
    } else {
        pattern.find_matches(topology)
    })
}
