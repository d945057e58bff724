use super::document::{
    HandlerSection, Numbers, RuleDocument, RuleSection, SUPPORTED_VERSIONS, UnitsSection,
};
use super::error::LoadError;
use super::handlers::{
    AngleHandler, AngleParams, AnyHandler, BondHandler, BondParams, ChargeParams,
    ElectrostaticsHandler, ElectrostaticsSettings, Handler, HandlerKind, LibraryChargeHandler,
    PairScales, Rule, TorsionHandler, TorsionParams, TorsionSettings, TorsionTerm,
    ValenceSettings, VdwHandler, VdwParams, VdwSettings, VdwSize,
};
use super::units::Units;
use crate::core::smirks::cache::PatternCache;
use crate::core::smirks::substructures::Substructures;
use std::collections::HashSet;
use std::fmt::Debug;
use std::path::Path;
use tracing::{debug, info, warn};

/// An ordered, immutable collection of parameter handlers.
///
/// Built once from one or more rule documents. Every rule carries a sequence
/// number that records its global declaration order, including across merges.
#[derive(Debug, Clone)]
pub struct ForceField {
    version: String,
    substructures: Substructures,
    handlers: Vec<AnyHandler>,
    cache: PatternCache,
    next_sequence: u64,
}

impl ForceField {
    pub fn from_path(path: &Path) -> Result<Self, LoadError> {
        let path_str = path.to_string_lossy().to_string();
        let content = std::fs::read_to_string(path).map_err(|e| LoadError::Io {
            path: path_str.clone(),
            source: e,
        })?;
        let document: RuleDocument = toml::from_str(&content).map_err(|e| LoadError::Toml {
            path: path_str.clone(),
            source: e,
        })?;
        let forcefield = Self::from_document(document)?;
        info!(
            path = %path_str,
            handlers = forcefield.handlers.len(),
            rules = forcefield.rule_count(),
            "Loaded rule document."
        );
        Ok(forcefield)
    }

    /// Loads every document in order and merges them, later documents taking precedence.
    pub fn load<P: AsRef<Path>>(paths: &[P]) -> Result<Self, LoadError> {
        let mut iter = paths.iter();
        let Some(first) = iter.next() else {
            return Ok(Self::empty());
        };
        let mut forcefield = Self::from_path(first.as_ref())?;
        for path in iter {
            forcefield.merge(Self::from_path(path.as_ref())?)?;
        }
        Ok(forcefield)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, LoadError> {
        let document: RuleDocument = toml::from_str(content).map_err(|e| LoadError::Toml {
            path: "<string>".to_string(),
            source: e,
        })?;
        Self::from_document(document)
    }

    /// A force field with no handlers.
    pub fn empty() -> Self {
        Self {
            version: super::document::CURRENT_VERSION.to_string(),
            substructures: Substructures::new(),
            handlers: Vec::new(),
            cache: PatternCache::new(),
            next_sequence: 0,
        }
    }

    /// Validates a document and compiles all of its patterns. Nothing is returned
    /// unless every handler and rule is valid.
    pub fn from_document(document: RuleDocument) -> Result<Self, LoadError> {
        if !SUPPORTED_VERSIONS.contains(&document.version.as_str()) {
            return Err(LoadError::UnsupportedVersion {
                version: document.version,
                supported: SUPPORTED_VERSIONS,
            });
        }

        let mut forcefield = Self {
            version: document.version,
            substructures: Substructures::from_definitions(&document.substructures)?,
            handlers: Vec::with_capacity(document.handlers.len()),
            cache: PatternCache::new(),
            next_sequence: 0,
        };

        let mut seen = HashSet::new();
        for section in document.handlers {
            if !seen.insert(section.kind) {
                return Err(LoadError::DuplicateHandler {
                    handler: section.kind,
                });
            }
            let handler = forcefield.build_handler(section)?;
            debug!(
                handler = %handler.kind(),
                rules = handler.rule_count(),
                units = %handler.units(),
                "Built handler."
            );
            if handler.rule_count() == 0 && handler.kind() != HandlerKind::Electrostatics {
                warn!(handler = %handler.kind(), "Handler declares no rules.");
            }
            forcefield.handlers.push(handler);
        }
        Ok(forcefield)
    }

    fn build_handler(&mut self, section: HandlerSection) -> Result<AnyHandler, LoadError> {
        let kind = section.kind;
        check_settings(&section)?;
        let units = parse_units(kind, &section.units, &section)?;
        let required = section.required.unwrap_or(kind.required_by_default());
        let rules = resolve_inheritance(kind, &section.rules)?;

        Ok(match kind {
            HandlerKind::Bonds => AnyHandler::Bonds(BondHandler {
                kind,
                units,
                required,
                settings: valence_settings(&section),
                rules: self.compile_rules(kind, &rules, |r, _| bond_params(kind, r))?,
            }),
            HandlerKind::Angles => AnyHandler::Angles(AngleHandler {
                kind,
                units,
                required,
                settings: valence_settings(&section),
                rules: self.compile_rules(kind, &rules, |r, _| angle_params(kind, r))?,
            }),
            HandlerKind::ProperTorsions | HandlerKind::ImproperTorsions => {
                let settings = torsion_settings(&section)?;
                let default_idivf = settings
                    .default_idivf
                    .unwrap_or(if kind == HandlerKind::ImproperTorsions {
                        settings.convention.fold() as f64
                    } else {
                        1.0
                    });
                let handler = TorsionHandler {
                    kind,
                    units,
                    required,
                    rules: self.compile_rules(kind, &rules, |r, _| {
                        torsion_params(kind, r, default_idivf)
                    })?,
                    settings,
                };
                if kind == HandlerKind::ProperTorsions {
                    AnyHandler::ProperTorsions(handler)
                } else {
                    AnyHandler::ImproperTorsions(handler)
                }
            }
            HandlerKind::Vdw => AnyHandler::Vdw(VdwHandler {
                kind,
                units,
                required,
                settings: vdw_settings(&section)?,
                rules: self.compile_rules(kind, &rules, |r, _| vdw_params(kind, r))?,
            }),
            HandlerKind::Electrostatics => {
                if !rules.is_empty() {
                    return Err(LoadError::UnexpectedField {
                        handler: kind,
                        rule_id: None,
                        field: "rules",
                    });
                }
                AnyHandler::Electrostatics(ElectrostaticsHandler {
                    kind,
                    units,
                    required,
                    settings: electrostatics_settings(&section)?,
                    rules: Vec::new(),
                })
            }
            HandlerKind::LibraryCharges => AnyHandler::LibraryCharges(LibraryChargeHandler {
                kind,
                units,
                required,
                settings: (),
                rules: self.compile_rules(kind, &rules, |r, tagged| charge_params(kind, r, tagged))?,
            }),
        })
    }

    fn compile_rules<P>(
        &mut self,
        kind: HandlerKind,
        sections: &[RuleSection],
        build: impl Fn(&RuleSection, usize) -> Result<P, LoadError>,
    ) -> Result<Vec<Rule<P>>, LoadError> {
        let mut rules = Vec::with_capacity(sections.len());
        for section in sections {
            let smirks = section
                .smirks
                .as_deref()
                .ok_or_else(|| LoadError::MissingParameter {
                    handler: kind,
                    rule_id: section.id.clone(),
                    field: "smirks",
                })?;
            let pattern = self
                .cache
                .get_or_parse(smirks, &self.substructures)
                .map_err(|source| LoadError::Pattern {
                    handler: kind,
                    rule_id: section.id.clone(),
                    source,
                })?;

            let found = pattern.map_indices();
            let expected = kind.tagged_atoms().unwrap_or(found.len()).max(1);
            let tags_ok = found.len() == expected
                && found.iter().enumerate().all(|(i, &m)| m as usize == i + 1);
            if !tags_ok {
                return Err(LoadError::TaggedAtoms {
                    handler: kind,
                    rule_id: section.id.clone(),
                    expected,
                    found,
                });
            }

            let params = build(section, found.len())?;
            rules.push(Rule {
                id: section.id.clone(),
                smirks: smirks.to_string(),
                pattern,
                params,
                sequence: self.next_sequence,
            });
            self.next_sequence += 1;
        }
        Ok(rules)
    }

    /// Appends `other` after this force field. Rules of a handler kind present in
    /// both are appended to the existing handler, so they take precedence over it.
    ///
    /// On error `self` is left unchanged.
    pub fn merge(&mut self, other: ForceField) -> Result<(), LoadError> {
        let mut merged = self.clone();
        merged.absorb(other)?;
        *self = merged;
        Ok(())
    }

    fn absorb(&mut self, other: ForceField) -> Result<(), LoadError> {
        for (name, source) in other.substructures.definitions() {
            match self.substructures.get(&name) {
                Some(existing) if existing.source() != source => {
                    return Err(LoadError::ConflictingSubstructure { name });
                }
                Some(_) => {}
                None => {
                    if let Some(pattern) = other.substructures.get(&name) {
                        self.substructures.insert(&name, pattern.as_ref().clone());
                    }
                }
            }
        }
        self.cache.absorb(&other.cache);

        for incoming in other.handlers {
            let kind = incoming.kind();
            match self.handlers.iter_mut().find(|h| h.kind() == kind) {
                Some(existing) => {
                    append_handler(existing, incoming, &mut self.next_sequence)?;
                    debug!(handler = %kind, "Merged rules into existing handler.");
                }
                None => {
                    let mut incoming = incoming;
                    renumber(&mut incoming, &mut self.next_sequence);
                    self.handlers.push(incoming);
                    debug!(handler = %kind, "Added handler from merged document.");
                }
            }
        }
        Ok(())
    }

    /// The merged document, always written at the current format version.
    pub fn to_document(&self) -> RuleDocument {
        RuleDocument {
            version: super::document::CURRENT_VERSION.to_string(),
            substructures: self.substructures.definitions(),
            handlers: self.handlers.iter().map(handler_section).collect(),
        }
    }

    pub fn to_toml_string(&self) -> Result<String, LoadError> {
        Ok(toml::to_string_pretty(&self.to_document())?)
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn substructures(&self) -> &Substructures {
        &self.substructures
    }

    pub fn pattern_cache(&self) -> &PatternCache {
        &self.cache
    }

    /// Handlers in document order.
    pub fn handlers(&self) -> &[AnyHandler] {
        &self.handlers
    }

    pub fn handler(&self, kind: HandlerKind) -> Option<&AnyHandler> {
        self.handlers.iter().find(|h| h.kind() == kind)
    }

    pub fn rule_count(&self) -> usize {
        self.handlers.iter().map(AnyHandler::rule_count).sum()
    }

    pub fn bonds(&self) -> Option<&BondHandler> {
        self.handlers.iter().find_map(|h| match h {
            AnyHandler::Bonds(h) => Some(h),
            _ => None,
        })
    }

    pub fn angles(&self) -> Option<&AngleHandler> {
        self.handlers.iter().find_map(|h| match h {
            AnyHandler::Angles(h) => Some(h),
            _ => None,
        })
    }

    pub fn proper_torsions(&self) -> Option<&TorsionHandler> {
        self.handlers.iter().find_map(|h| match h {
            AnyHandler::ProperTorsions(h) => Some(h),
            _ => None,
        })
    }

    pub fn improper_torsions(&self) -> Option<&TorsionHandler> {
        self.handlers.iter().find_map(|h| match h {
            AnyHandler::ImproperTorsions(h) => Some(h),
            _ => None,
        })
    }

    pub fn vdw(&self) -> Option<&VdwHandler> {
        self.handlers.iter().find_map(|h| match h {
            AnyHandler::Vdw(h) => Some(h),
            _ => None,
        })
    }

    pub fn electrostatics(&self) -> Option<&ElectrostaticsHandler> {
        self.handlers.iter().find_map(|h| match h {
            AnyHandler::Electrostatics(h) => Some(h),
            _ => None,
        })
    }

    pub fn library_charges(&self) -> Option<&LibraryChargeHandler> {
        self.handlers.iter().find_map(|h| match h {
            AnyHandler::LibraryCharges(h) => Some(h),
            _ => None,
        })
    }
}

fn allowed_settings(kind: HandlerKind) -> &'static [&'static str] {
    match kind {
        HandlerKind::Bonds | HandlerKind::Angles => &["potential"],
        HandlerKind::ProperTorsions => &["potential", "idivf"],
        HandlerKind::ImproperTorsions => &["potential", "idivf", "convention"],
        HandlerKind::Vdw => &[
            "potential",
            "combining-rule",
            "scale12",
            "scale13",
            "scale14",
            "scale15",
            "cutoff",
            "switch-width",
        ],
        HandlerKind::Electrostatics => &[
            "method", "scale12", "scale13", "scale14", "scale15", "cutoff",
        ],
        HandlerKind::LibraryCharges => &[],
    }
}

fn allowed_parameters(kind: HandlerKind) -> &'static [&'static str] {
    match kind {
        HandlerKind::Bonds => &["length", "k"],
        HandlerKind::Angles => &["angle", "k"],
        HandlerKind::ProperTorsions | HandlerKind::ImproperTorsions => {
            &["periodicity", "phase", "k", "idivf"]
        }
        HandlerKind::Vdw => &["epsilon", "sigma", "rmin-half"],
        HandlerKind::Electrostatics => &[],
        HandlerKind::LibraryCharges => &["charges"],
    }
}

fn check_settings(section: &HandlerSection) -> Result<(), LoadError> {
    let allowed = allowed_settings(section.kind);
    match section
        .present_settings()
        .into_iter()
        .find(|s| !allowed.contains(s))
    {
        Some(field) => Err(LoadError::UnexpectedField {
            handler: section.kind,
            rule_id: None,
            field,
        }),
        None => Ok(()),
    }
}

fn parse_units(
    kind: HandlerKind,
    units: &UnitsSection,
    section: &HandlerSection,
) -> Result<Units, LoadError> {
    let parsed = Units::parse(
        units.length.as_deref(),
        units.energy.as_deref(),
        units.angle.as_deref(),
    )
    .map_err(|source| LoadError::Unit {
        handler: kind,
        source,
    })?;

    let needs_length = matches!(kind, HandlerKind::Bonds | HandlerKind::Vdw)
        || section.cutoff.is_some()
        || section.switch_width.is_some();
    let needs_energy = matches!(
        kind,
        HandlerKind::Bonds
            | HandlerKind::Angles
            | HandlerKind::ProperTorsions
            | HandlerKind::ImproperTorsions
            | HandlerKind::Vdw
    );
    let needs_angle = matches!(
        kind,
        HandlerKind::Angles | HandlerKind::ProperTorsions | HandlerKind::ImproperTorsions
    );

    for (needed, present, dimension) in [
        (needs_length, parsed.length.is_some(), "length"),
        (needs_energy, parsed.energy.is_some(), "energy"),
        (needs_angle, parsed.angle.is_some(), "angle"),
    ] {
        if needed && !present {
            return Err(LoadError::MissingUnit {
                handler: kind,
                dimension,
            });
        }
    }
    Ok(parsed)
}

/// Resolves `extends` references in declaration order and checks ids.
fn resolve_inheritance(
    kind: HandlerKind,
    sections: &[RuleSection],
) -> Result<Vec<RuleSection>, LoadError> {
    let allowed = allowed_parameters(kind);
    let mut resolved: Vec<RuleSection> = Vec::with_capacity(sections.len());
    for section in sections {
        if section.id.trim().is_empty() {
            return Err(LoadError::EmptyRuleId { handler: kind });
        }
        if resolved.iter().any(|r| r.id == section.id) {
            return Err(LoadError::DuplicateRuleId {
                handler: kind,
                rule_id: section.id.clone(),
            });
        }
        if let Some(field) = section
            .present_parameters()
            .into_iter()
            .find(|p| !allowed.contains(p))
        {
            return Err(LoadError::UnexpectedField {
                handler: kind,
                rule_id: Some(section.id.clone()),
                field,
            });
        }

        let mut rule = section.clone();
        if let Some(parent_id) = &section.extends {
            let parent = resolved.iter().find(|r| &r.id == parent_id).ok_or_else(|| {
                LoadError::UnknownReference {
                    handler: kind,
                    rule_id: section.id.clone(),
                    extends: parent_id.clone(),
                }
            })?;
            rule.inherit_from(parent);
        }
        resolved.push(rule);
    }
    Ok(resolved)
}

fn require<T: Clone>(
    kind: HandlerKind,
    rule: &RuleSection,
    value: &Option<T>,
    field: &'static str,
) -> Result<T, LoadError> {
    value.clone().ok_or_else(|| LoadError::MissingParameter {
        handler: kind,
        rule_id: rule.id.clone(),
        field,
    })
}

fn invalid(kind: HandlerKind, rule: &RuleSection, message: impl Into<String>) -> LoadError {
    LoadError::InvalidParameter {
        handler: kind,
        rule_id: rule.id.clone(),
        message: message.into(),
    }
}

fn single_k(kind: HandlerKind, rule: &RuleSection) -> Result<f64, LoadError> {
    match require(kind, rule, &rule.k, "k")? {
        Numbers::One(k) => Ok(k),
        Numbers::Many(_) => Err(invalid(kind, rule, "'k' must be a single value")),
    }
}

fn bond_params(kind: HandlerKind, rule: &RuleSection) -> Result<BondParams, LoadError> {
    let length = require(kind, rule, &rule.length, "length")?;
    if length <= 0.0 {
        return Err(invalid(kind, rule, "'length' must be positive"));
    }
    Ok(BondParams {
        length,
        k: single_k(kind, rule)?,
    })
}

fn angle_params(kind: HandlerKind, rule: &RuleSection) -> Result<AngleParams, LoadError> {
    Ok(AngleParams {
        angle: require(kind, rule, &rule.angle, "angle")?,
        k: single_k(kind, rule)?,
    })
}

fn torsion_params(
    kind: HandlerKind,
    rule: &RuleSection,
    default_idivf: f64,
) -> Result<TorsionParams, LoadError> {
    let periodicity = require(kind, rule, &rule.periodicity, "periodicity")?;
    let phase = require(kind, rule, &rule.phase, "phase")?;
    let k = require(kind, rule, &rule.k, "k")?;
    let k = k.as_slice();

    let n = periodicity.len();
    if n == 0 {
        return Err(invalid(kind, rule, "at least one term is required"));
    }
    if phase.len() != n || k.len() != n {
        return Err(invalid(
            kind,
            rule,
            format!(
                "'periodicity', 'phase' and 'k' must have equal lengths (got {}, {}, {})",
                n,
                phase.len(),
                k.len()
            ),
        ));
    }
    let idivf = match &rule.idivf {
        Some(values) if values.len() != n => {
            return Err(invalid(
                kind,
                rule,
                format!("'idivf' has {} values for {} terms", values.len(), n),
            ));
        }
        Some(values) => values.clone(),
        None => vec![default_idivf; n],
    };
    if periodicity.contains(&0) {
        return Err(invalid(kind, rule, "'periodicity' values must be positive"));
    }
    if idivf.iter().any(|&d| d <= 0.0) {
        return Err(invalid(kind, rule, "'idivf' values must be positive"));
    }

    let terms = (0..n)
        .map(|i| TorsionTerm {
            periodicity: periodicity[i],
            phase: phase[i],
            k: k[i],
            idivf: idivf[i],
        })
        .collect();
    Ok(TorsionParams { terms })
}

fn vdw_params(kind: HandlerKind, rule: &RuleSection) -> Result<VdwParams, LoadError> {
    let epsilon = require(kind, rule, &rule.epsilon, "epsilon")?;
    if epsilon < 0.0 {
        return Err(invalid(kind, rule, "'epsilon' must not be negative"));
    }
    let size = match (rule.sigma, rule.rmin_half) {
        (Some(sigma), None) => VdwSize::Sigma(sigma),
        (None, Some(rmin_half)) => VdwSize::RminHalf(rmin_half),
        (Some(_), Some(_)) => {
            return Err(invalid(kind, rule, "give either 'sigma' or 'rmin-half', not both"));
        }
        (None, None) => {
            return Err(LoadError::MissingParameter {
                handler: kind,
                rule_id: rule.id.clone(),
                field: "sigma",
            });
        }
    };
    Ok(VdwParams { epsilon, size })
}

fn charge_params(
    kind: HandlerKind,
    rule: &RuleSection,
    tagged: usize,
) -> Result<ChargeParams, LoadError> {
    let charges = require(kind, rule, &rule.charges, "charges")?;
    if charges.len() != tagged {
        return Err(invalid(
            kind,
            rule,
            format!("{} charges for {} tagged atoms", charges.len(), tagged),
        ));
    }
    Ok(ChargeParams { charges })
}

fn valence_settings(section: &HandlerSection) -> ValenceSettings {
    let mut settings = ValenceSettings::default();
    if let Some(potential) = &section.potential {
        settings.potential = potential.clone();
    }
    settings
}

fn torsion_settings(section: &HandlerSection) -> Result<TorsionSettings, LoadError> {
    let mut settings = TorsionSettings::default();
    if let Some(potential) = &section.potential {
        settings.potential = potential.clone();
    }
    if let Some(convention) = &section.convention {
        settings.convention = convention
            .parse()
            .map_err(|message| LoadError::InvalidSetting {
                handler: section.kind,
                setting: "convention",
                message,
            })?;
    }
    if let Some(idivf) = section.idivf {
        if idivf <= 0.0 {
            return Err(LoadError::InvalidSetting {
                handler: section.kind,
                setting: "idivf",
                message: "must be positive".to_string(),
            });
        }
        settings.default_idivf = Some(idivf);
    }
    Ok(settings)
}

fn pair_scales(section: &HandlerSection, defaults: PairScales) -> Result<PairScales, LoadError> {
    let scales = PairScales {
        scale12: section.scale12.unwrap_or(defaults.scale12),
        scale13: section.scale13.unwrap_or(defaults.scale13),
        scale14: section.scale14.unwrap_or(defaults.scale14),
        scale15: section.scale15.unwrap_or(defaults.scale15),
    };
    for (setting, value) in [
        ("scale12", scales.scale12),
        ("scale13", scales.scale13),
        ("scale14", scales.scale14),
        ("scale15", scales.scale15),
    ] {
        if !(0.0..=1.0).contains(&value) {
            return Err(LoadError::InvalidSetting {
                handler: section.kind,
                setting,
                message: format!("{value} is outside [0, 1]"),
            });
        }
    }
    Ok(scales)
}

fn check_cutoff(section: &HandlerSection) -> Result<(), LoadError> {
    if section.cutoff.is_some_and(|cutoff| cutoff <= 0.0) {
        return Err(LoadError::InvalidSetting {
            handler: section.kind,
            setting: "cutoff",
            message: "must be positive".to_string(),
        });
    }
    if let Some(width) = section.switch_width {
        let within_cutoff = section.cutoff.is_none_or(|cutoff| width < cutoff);
        if width < 0.0 || !within_cutoff {
            return Err(LoadError::InvalidSetting {
                handler: section.kind,
                setting: "switch-width",
                message: "must be non-negative and smaller than the cutoff".to_string(),
            });
        }
    }
    Ok(())
}

fn vdw_settings(section: &HandlerSection) -> Result<VdwSettings, LoadError> {
    check_cutoff(section)?;
    let mut settings = VdwSettings {
        scales: pair_scales(section, PairScales::VDW_DEFAULT)?,
        cutoff: section.cutoff,
        switch_width: section.switch_width,
        ..VdwSettings::default()
    };
    if let Some(potential) = &section.potential {
        settings.potential = potential.clone();
    }
    if let Some(rule) = &section.combining_rule {
        settings.combining_rule = rule.parse().map_err(|message| LoadError::InvalidSetting {
            handler: section.kind,
            setting: "combining-rule",
            message,
        })?;
    }
    Ok(settings)
}

fn electrostatics_settings(section: &HandlerSection) -> Result<ElectrostaticsSettings, LoadError> {
    check_cutoff(section)?;
    let mut settings = ElectrostaticsSettings {
        scales: pair_scales(section, PairScales::ELECTROSTATICS_DEFAULT)?,
        cutoff: section.cutoff,
        ..ElectrostaticsSettings::default()
    };
    if let Some(method) = &section.method {
        settings.method = method.clone();
    }
    Ok(settings)
}

fn append_rules<P, S: PartialEq + Debug>(
    existing: &mut Handler<P, S>,
    incoming: Handler<P, S>,
    next_sequence: &mut u64,
) -> Result<(), LoadError> {
    let kind = existing.kind;
    if existing.units != incoming.units {
        return Err(LoadError::IncompatibleHandlers {
            handler: kind,
            reason: format!(
                "units differ ({} vs {})",
                existing.units, incoming.units
            ),
        });
    }
    if existing.settings != incoming.settings {
        return Err(LoadError::IncompatibleHandlers {
            handler: kind,
            reason: format!(
                "settings differ ({:?} vs {:?})",
                existing.settings, incoming.settings
            ),
        });
    }
    if existing.required != incoming.required {
        return Err(LoadError::IncompatibleHandlers {
            handler: kind,
            reason: "'required' differs".to_string(),
        });
    }
    for rule in &incoming.rules {
        if existing.rule(&rule.id).is_some() {
            return Err(LoadError::DuplicateRuleId {
                handler: kind,
                rule_id: rule.id.clone(),
            });
        }
    }
    for mut rule in incoming.rules {
        rule.sequence = *next_sequence;
        *next_sequence += 1;
        existing.rules.push(rule);
    }
    Ok(())
}

fn append_handler(
    existing: &mut AnyHandler,
    incoming: AnyHandler,
    next_sequence: &mut u64,
) -> Result<(), LoadError> {
    match (existing, incoming) {
        (AnyHandler::Bonds(a), AnyHandler::Bonds(b)) => append_rules(a, b, next_sequence),
        (AnyHandler::Angles(a), AnyHandler::Angles(b)) => append_rules(a, b, next_sequence),
        (AnyHandler::ProperTorsions(a), AnyHandler::ProperTorsions(b)) => {
            append_rules(a, b, next_sequence)
        }
        (AnyHandler::ImproperTorsions(a), AnyHandler::ImproperTorsions(b)) => {
            append_rules(a, b, next_sequence)
        }
        (AnyHandler::Vdw(a), AnyHandler::Vdw(b)) => append_rules(a, b, next_sequence),
        (AnyHandler::Electrostatics(a), AnyHandler::Electrostatics(b)) => {
            append_rules(a, b, next_sequence)
        }
        (AnyHandler::LibraryCharges(a), AnyHandler::LibraryCharges(b)) => {
            append_rules(a, b, next_sequence)
        }
        (a, b) => Err(LoadError::IncompatibleHandlers {
            handler: a.kind(),
            reason: format!("cannot merge a '{}' handler into it", b.kind()),
        }),
    }
}

fn renumber(handler: &mut AnyHandler, next_sequence: &mut u64) {
    fn apply<P>(rules: &mut [Rule<P>], next_sequence: &mut u64) {
        for rule in rules {
            rule.sequence = *next_sequence;
            *next_sequence += 1;
        }
    }
    match handler {
        AnyHandler::Bonds(h) => apply(&mut h.rules, next_sequence),
        AnyHandler::Angles(h) => apply(&mut h.rules, next_sequence),
        AnyHandler::ProperTorsions(h) | AnyHandler::ImproperTorsions(h) => {
            apply(&mut h.rules, next_sequence)
        }
        AnyHandler::Vdw(h) => apply(&mut h.rules, next_sequence),
        AnyHandler::Electrostatics(h) => apply(&mut h.rules, next_sequence),
        AnyHandler::LibraryCharges(h) => apply(&mut h.rules, next_sequence),
    }
}

fn units_section(units: &Units) -> UnitsSection {
    UnitsSection {
        length: units.length.map(|u| u.as_str().to_string()),
        energy: units.energy.map(|u| u.as_str().to_string()),
        angle: units.angle.map(|u| u.as_str().to_string()),
    }
}

fn rule_section<P>(rule: &Rule<P>) -> RuleSection {
    RuleSection {
        id: rule.id.clone(),
        smirks: Some(rule.smirks.clone()),
        ..Default::default()
    }
}

fn base_section(kind: HandlerKind, units: &Units, required: bool) -> HandlerSection {
    let mut section = HandlerSection::new(kind);
    section.units = units_section(units);
    if required != kind.required_by_default() {
        section.required = Some(required);
    }
    section
}

fn set_scales(section: &mut HandlerSection, scales: &PairScales) {
    section.scale12 = Some(scales.scale12);
    section.scale13 = Some(scales.scale13);
    section.scale14 = Some(scales.scale14);
    section.scale15 = Some(scales.scale15);
}

fn torsion_section(h: &TorsionHandler) -> HandlerSection {
    let mut section = base_section(h.kind, &h.units, h.required);
    section.potential = Some(h.settings.potential.clone());
    section.idivf = h.settings.default_idivf;
    if h.kind == HandlerKind::ImproperTorsions {
        section.convention = Some(h.settings.convention.as_str().to_string());
    }
    section.rules = h
        .rules
        .iter()
        .map(|r| RuleSection {
            periodicity: Some(r.params.terms.iter().map(|t| t.periodicity).collect()),
            phase: Some(r.params.terms.iter().map(|t| t.phase).collect()),
            k: Some(Numbers::Many(r.params.terms.iter().map(|t| t.k).collect())),
            idivf: Some(r.params.terms.iter().map(|t| t.idivf).collect()),
            ..rule_section(r)
        })
        .collect();
    section
}

/// The document form of a handler, with every effective setting written out.
fn handler_section(handler: &AnyHandler) -> HandlerSection {
    match handler {
        AnyHandler::Bonds(h) => {
            let mut section = base_section(h.kind, &h.units, h.required);
            section.potential = Some(h.settings.potential.clone());
            section.rules = h
                .rules
                .iter()
                .map(|r| RuleSection {
                    length: Some(r.params.length),
                    k: Some(Numbers::One(r.params.k)),
                    ..rule_section(r)
                })
                .collect();
            section
        }
        AnyHandler::Angles(h) => {
            let mut section = base_section(h.kind, &h.units, h.required);
            section.potential = Some(h.settings.potential.clone());
            section.rules = h
                .rules
                .iter()
                .map(|r| RuleSection {
                    angle: Some(r.params.angle),
                    k: Some(Numbers::One(r.params.k)),
                    ..rule_section(r)
                })
                .collect();
            section
        }
        AnyHandler::ProperTorsions(h) | AnyHandler::ImproperTorsions(h) => torsion_section(h),
        AnyHandler::Vdw(h) => {
            let mut section = base_section(h.kind, &h.units, h.required);
            section.potential = Some(h.settings.potential.clone());
            section.combining_rule = Some(h.settings.combining_rule.as_str().to_string());
            set_scales(&mut section, &h.settings.scales);
            section.cutoff = h.settings.cutoff;
            section.switch_width = h.settings.switch_width;
            section.rules = h
                .rules
                .iter()
                .map(|r| {
                    let (sigma, rmin_half) = match r.params.size {
                        VdwSize::Sigma(s) => (Some(s), None),
                        VdwSize::RminHalf(v) => (None, Some(v)),
                    };
                    RuleSection {
                        epsilon: Some(r.params.epsilon),
                        sigma,
                        rmin_half,
                        ..rule_section(r)
                    }
                })
                .collect();
            section
        }
        AnyHandler::Electrostatics(h) => {
            let mut section = base_section(h.kind, &h.units, h.required);
            section.method = Some(h.settings.method.clone());
            set_scales(&mut section, &h.settings.scales);
            section.cutoff = h.settings.cutoff;
            section
        }
        AnyHandler::LibraryCharges(h) => {
            let mut section = base_section(h.kind, &h.units, h.required);
            section.rules = h
                .rules
                .iter()
                .map(|r| RuleSection {
                    charges: Some(r.params.charges.clone()),
                    ..rule_section(r)
                })
                .collect();
            section
        }
    }
}
