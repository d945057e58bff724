use super::config::ConfigError;
use crate::core::forcefield::error::LoadError;
use crate::core::forcefield::handlers::HandlerKind;
use crate::core::io::toml_topology::TomlTopologyError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssignError {
    #[error("Failed to load force field: {0}")]
    Load(#[from] LoadError),

    #[error("Failed to read topology: {0}")]
    Topology(#[from] TomlTopologyError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("No '{handler}' rule matches {element} {labels} (atoms {atoms:?})")]
    Coverage {
        handler: HandlerKind,
        element: &'static str,
        atoms: Vec<usize>,
        /// Element symbols with indices, e.g. `C0-H4`.
        labels: String,
    },

    #[error("Assignment was cancelled")]
    Cancelled,
}
