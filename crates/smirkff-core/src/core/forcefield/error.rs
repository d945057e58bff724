use super::handlers::HandlerKind;
use super::units::UnitError;
use crate::core::smirks::parser::SmirksError;
use crate::core::smirks::substructures::SubstructureError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
    #[error("TOML serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Unsupported document version '{version}' (supported: {})", .supported.join(", "))]
    UnsupportedVersion {
        version: String,
        supported: &'static [&'static str],
    },
    #[error("Handler '{handler}' appears more than once in one document")]
    DuplicateHandler { handler: HandlerKind },
    #[error("Handler '{handler}' has a rule without an id")]
    EmptyRuleId { handler: HandlerKind },
    #[error("Handler '{handler}' declares rule id '{rule_id}' more than once")]
    DuplicateRuleId {
        handler: HandlerKind,
        rule_id: String,
    },

    #[error(transparent)]
    Substructure(#[from] SubstructureError),
    #[error("Substructure '{name}' is defined differently by two merged documents")]
    ConflictingSubstructure { name: String },
    #[error("Invalid pattern in rule '{rule_id}' of handler '{handler}': {source}")]
    Pattern {
        handler: HandlerKind,
        rule_id: String,
        source: SmirksError,
    },
    #[error(
        "Rule '{rule_id}' of handler '{handler}' must tag atoms :1 to :{expected}, found map indices {found:?}"
    )]
    TaggedAtoms {
        handler: HandlerKind,
        rule_id: String,
        expected: usize,
        found: Vec<u8>,
    },

    #[error("Invalid unit in handler '{handler}': {source}")]
    Unit {
        handler: HandlerKind,
        source: UnitError,
    },
    #[error("Handler '{handler}' needs a {dimension} unit but declares none")]
    MissingUnit {
        handler: HandlerKind,
        dimension: &'static str,
    },

    #[error("Rule '{rule_id}' of handler '{handler}' extends '{extends}', which is not declared earlier in that handler")]
    UnknownReference {
        handler: HandlerKind,
        rule_id: String,
        extends: String,
    },
    #[error("Rule '{rule_id}' of handler '{handler}' is missing '{field}'")]
    MissingParameter {
        handler: HandlerKind,
        rule_id: String,
        field: &'static str,
    },
    #[error("Handler '{handler}' does not use '{field}'{}", .rule_id.as_ref().map(|id| format!(" (rule '{id}')")).unwrap_or_default())]
    UnexpectedField {
        handler: HandlerKind,
        rule_id: Option<String>,
        field: &'static str,
    },
    #[error("Rule '{rule_id}' of handler '{handler}': {message}")]
    InvalidParameter {
        handler: HandlerKind,
        rule_id: String,
        message: String,
    },
    #[error("Invalid setting '{setting}' in handler '{handler}': {message}")]
    InvalidSetting {
        handler: HandlerKind,
        setting: &'static str,
        message: String,
    },

    #[error("Cannot merge handler '{handler}': {reason}")]
    IncompatibleHandlers {
        handler: HandlerKind,
        reason: String,
    },
}
