use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "Tony Kan, Ted Yu, William A. Goddard III, Victor Wai Tak Kam",
    version,
    about = "SMIRK-FF CLI - Assign force field parameters to molecular topologies from SMIRKS rule documents.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads for parallel matching.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Assign parameters to a topology and write the result.
    Assign(AssignArgs),
    /// Load and validate force field documents, then print a handler summary.
    Check(CheckArgs),
    /// Print every match of one SMIRKS pattern against a topology.
    Match(MatchArgs),
}

/// Arguments for the `assign` subcommand.
#[derive(Args, Debug, Clone)]
pub struct AssignArgs {
    /// Path to the input topology in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub topology: PathBuf,

    /// Force field document. Repeat to merge several; later documents take precedence.
    #[arg(short, long = "forcefield", value_name = "PATH")]
    pub forcefields: Vec<PathBuf>,

    /// Path to a configuration file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Write the assignment as TOML to this path.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Write the assignment as CSV to this path.
    #[arg(long, value_name = "PATH")]
    pub csv: Option<PathBuf>,

    /// Only run these handlers (comma-separated, e.g. Bonds,vdW).
    #[arg(long, value_name = "LIST", value_delimiter = ',')]
    pub handlers: Vec<String>,

    /// Report uncovered elements as warnings instead of failing.
    #[arg(long)]
    pub allow_uncovered: bool,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S assignment.enforce-coverage=false
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `check` subcommand.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Force field documents, merged in the given order.
    #[arg(required = true, value_name = "PATH")]
    pub forcefields: Vec<PathBuf>,

    /// List every rule of every handler.
    #[arg(long)]
    pub rules: bool,
}

/// Arguments for the `match` subcommand.
#[derive(Args, Debug)]
pub struct MatchArgs {
    /// The SMIRKS pattern to match.
    #[arg(required = true, value_name = "SMIRKS")]
    pub smirks: String,

    /// Path to the topology in TOML format.
    #[arg(short, long, required = true, value_name = "PATH")]
    pub topology: PathBuf,

    /// Force field document whose named substructures the pattern may reference.
    #[arg(short, long = "forcefield", value_name = "PATH")]
    pub forcefield: Option<PathBuf>,

    /// Collapse each match with its reverse, keeping the one whose first atom is lower.
    #[arg(long)]
    pub unique: bool,
}
