use super::parser::{SmirksError, parse_smirks_with};
use super::pattern::Pattern;
use super::substructures::Substructures;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

/// Compiled patterns keyed by their source string.
///
/// Owned by a force field; entries live as long as the owner and are never evicted.
/// Identical strings across rules and handlers share one compiled pattern.
#[derive(Debug, Clone, Default)]
pub struct PatternCache {
    patterns: HashMap<String, Arc<Pattern>>,
}

impl PatternCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_parse(
        &mut self,
        smirks: &str,
        substructures: &Substructures,
    ) -> Result<Arc<Pattern>, SmirksError> {
        if let Some(pattern) = self.patterns.get(smirks) {
            trace!(smirks, "Pattern cache hit");
            return Ok(Arc::clone(pattern));
        }
        let pattern = Arc::new(parse_smirks_with(smirks, substructures)?);
        self.patterns
            .insert(smirks.to_string(), Arc::clone(&pattern));
        Ok(pattern)
    }

    pub fn get(&self, smirks: &str) -> Option<&Arc<Pattern>> {
        self.patterns.get(smirks)
    }

    /// Adopts entries from another cache that this one does not have yet.
    pub fn absorb(&mut self, other: &PatternCache) {
        for (smirks, pattern) in &other.patterns {
            self.patterns
                .entry(smirks.clone())
                .or_insert_with(|| Arc::clone(pattern));
        }
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}
