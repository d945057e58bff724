use crate::cli::CheckArgs;
use crate::error::Result;
use smirkff::core::forcefield::params::ForceField;
use tracing::info;

pub fn run(args: CheckArgs) -> Result<()> {
    info!("Validating {} force field document(s)...", args.forcefields.len());
    let forcefield = ForceField::load(args.forcefields.as_slice())?;
    print!("{}", describe(&forcefield, args.rules));
    println!("✓ Force field is valid.");
    Ok(())
}

/// One line per handler, optionally followed by its rules in declaration order.
fn describe(forcefield: &ForceField, rules: bool) -> String {
    let mut lines = vec![format!(
        "Force field version {}: {} handler(s), {} rule(s), {} named substructure(s)",
        forcefield.version(),
        forcefield.handlers().len(),
        forcefield.rule_count(),
        forcefield.substructures().len()
    )];
    for handler in forcefield.handlers() {
        lines.push(format!(
            "  {:<16} {:>5} rule(s)  required={}  units: {}",
            handler.kind().as_str(),
            handler.rule_count(),
            handler.required(),
            handler.units()
        ));
        if rules {
            lines.extend(
                handler
                    .rule_summaries()
                    .into_iter()
                    .map(|(id, smirks, sequence)| format!("    #{sequence:<4} {id:<12} {smirks}")),
            );
        }
    }
    lines.push(String::new());
    lines.join("\n")
}
