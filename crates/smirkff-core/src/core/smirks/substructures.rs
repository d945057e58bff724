use super::parser::{SmirksError, is_name_char, parse_smirks_with, referenced_substructures};
use super::pattern::Pattern;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubstructureError {
    #[error("Invalid substructure name '{0}' (use letters, digits and '_')")]
    InvalidName(String),
    #[error("Substructure '{referenced_by}' references unknown substructure '{name}'")]
    Unknown { name: String, referenced_by: String },
    #[error("Substructure reference cycle: {}", .path.join(" -> "))]
    Cycle { path: Vec<String> },
    #[error("Substructure '{name}' is not a valid pattern: {source}")]
    Pattern { name: String, source: SmirksError },
}

/// Named patterns available to `$name` references.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Substructures {
    patterns: BTreeMap<String, Arc<Pattern>>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum VisitState {
    InProgress,
    Done,
}

impl Substructures {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a table of definitions, resolving references between them.
    ///
    /// Definitions may reference each other in any order; a reference cycle
    /// (including a definition naming itself) is rejected.
    pub fn from_definitions(definitions: &BTreeMap<String, String>) -> Result<Self, SubstructureError> {
        for name in definitions.keys() {
            if name.is_empty() || !name.bytes().all(is_name_char) {
                return Err(SubstructureError::InvalidName(name.clone()));
            }
        }

        let mut table = Self::new();
        let mut states: BTreeMap<&str, VisitState> = BTreeMap::new();
        let mut path: Vec<String> = Vec::new();
        for name in definitions.keys() {
            table.resolve(name, definitions, &mut states, &mut path)?;
        }
        Ok(table)
    }

    fn resolve<'d>(
        &mut self,
        name: &'d str,
        definitions: &'d BTreeMap<String, String>,
        states: &mut BTreeMap<&'d str, VisitState>,
        path: &mut Vec<String>,
    ) -> Result<(), SubstructureError> {
        match states.get(name) {
            Some(VisitState::Done) => return Ok(()),
            Some(VisitState::InProgress) => {
                let start = path.iter().position(|p| p == name).unwrap_or(0);
                let mut cycle = path[start..].to_vec();
                cycle.push(name.to_string());
                return Err(SubstructureError::Cycle { path: cycle });
            }
            None => {}
        }

        states.insert(name, VisitState::InProgress);
        path.push(name.to_string());

        let definition = &definitions[name];
        for reference in referenced_substructures(definition) {
            let Some((key, _)) = definitions.get_key_value(reference.as_str()) else {
                return Err(SubstructureError::Unknown {
                    name: reference,
                    referenced_by: name.to_string(),
                });
            };
            self.resolve(key.as_str(), definitions, states, path)?;
        }

        let pattern =
            parse_smirks_with(definition, self).map_err(|source| SubstructureError::Pattern {
                name: name.to_string(),
                source,
            })?;
        self.patterns.insert(name.to_string(), Arc::new(pattern));

        path.pop();
        states.insert(name, VisitState::Done);
        Ok(())
    }

    pub fn insert(&mut self, name: &str, pattern: Pattern) {
        self.patterns.insert(name.to_string(), Arc::new(pattern));
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Pattern>> {
        self.patterns.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.patterns.contains_key(name)
    }

    /// Source strings by name, in name order.
    pub fn definitions(&self) -> BTreeMap<String, String> {
        self.patterns
            .iter()
            .map(|(name, p)| (name.clone(), p.source().to_string()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
