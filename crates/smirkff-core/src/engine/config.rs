use crate::core::forcefield::handlers::HandlerKind;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Handler selection is empty")]
    EmptySelection,
}

/// Which interaction classes an assignment run resolves.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum HandlerSelection {
    #[default]
    All,
    Only(Vec<HandlerKind>),
}

impl HandlerSelection {
    pub fn contains(&self, kind: HandlerKind) -> bool {
        match self {
            HandlerSelection::All => true,
            HandlerSelection::Only(kinds) => kinds.contains(&kind),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentConfig {
    /// Rule documents, merged in order. Later documents take precedence.
    pub forcefield_paths: Vec<PathBuf>,
    pub handlers: HandlerSelection,
    /// When false, unmatched elements of required handlers are skipped with a
    /// warning instead of failing the run.
    pub enforce_coverage: bool,
}

#[derive(Default)]
pub struct AssignmentConfigBuilder {
    forcefield_paths: Vec<PathBuf>,
    handlers: Option<HandlerSelection>,
    enforce_coverage: Option<bool>,
}

impl AssignmentConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn forcefield_path(mut self, path: PathBuf) -> Self {
        self.forcefield_paths.push(path);
        self
    }
    pub fn forcefield_paths(mut self, paths: Vec<PathBuf>) -> Self {
        self.forcefield_paths.extend(paths);
        self
    }
    pub fn handlers(mut self, selection: HandlerSelection) -> Self {
        self.handlers = Some(selection);
        self
    }
    pub fn enforce_coverage(mut self, enforce: bool) -> Self {
        self.enforce_coverage = Some(enforce);
        self
    }

    pub fn build(self) -> Result<AssignmentConfig, ConfigError> {
        if self.forcefield_paths.is_empty() {
            return Err(ConfigError::MissingParameter("forcefield_paths"));
        }
        let handlers = self.handlers.unwrap_or_default();
        if matches!(&handlers, HandlerSelection::Only(kinds) if kinds.is_empty()) {
            return Err(ConfigError::EmptySelection);
        }
        Ok(AssignmentConfig {
            forcefield_paths: self.forcefield_paths,
            handlers,
            enforce_coverage: self.enforce_coverage.unwrap_or(true),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_requires_a_forcefield_document() {
        let result = AssignmentConfigBuilder::new().build();
        assert_eq!(
            result,
            Err(ConfigError::MissingParameter("forcefield_paths"))
        );
    }

    #[test]
    fn builder_defaults_and_ordering() {
        let config = AssignmentConfigBuilder::new()
            .forcefield_path("base.toml".into())
            .forcefield_paths(vec!["extra.toml".into()])
            .build()
            .unwrap();
        assert_eq!(
            config.forcefield_paths,
            vec![PathBuf::from("base.toml"), PathBuf::from("extra.toml")]
        );
        assert_eq!(config.handlers, HandlerSelection::All);
        assert!(config.enforce_coverage);
    }

    #[test]
    fn empty_selection_is_rejected() {
        let result = AssignmentConfigBuilder::new()
            .forcefield_path("ff.toml".into())
            .handlers(HandlerSelection::Only(vec![]))
            .build();
        assert_eq!(result, Err(ConfigError::EmptySelection));
    }

    #[test]
    fn selection_contains() {
        let only = HandlerSelection::Only(vec![HandlerKind::Bonds, HandlerKind::Vdw]);
        assert!(only.contains(HandlerKind::Vdw));
        assert!(!only.contains(HandlerKind::Angles));
        assert!(HandlerSelection::All.contains(HandlerKind::LibraryCharges));
    }
}
