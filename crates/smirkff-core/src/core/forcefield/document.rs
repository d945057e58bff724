//! Serde mirror of the TOML rule document.
//!
//! These types only describe shape. Validation, inheritance and pattern
//! compilation happen when a document is turned into a
//! [`ForceField`](super::params::ForceField).

use super::handlers::HandlerKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Document versions this library reads.
pub const SUPPORTED_VERSIONS: &[&str] = &["0.1", "0.2", "0.3"];

/// Version written when serializing.
pub const CURRENT_VERSION: &str = "0.3";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleDocument {
    pub version: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub substructures: BTreeMap<String, String>,
    #[serde(default)]
    pub handlers: Vec<HandlerSection>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UnitsSection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub energy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub angle: Option<String>,
}

impl UnitsSection {
    pub fn is_empty(&self) -> bool {
        self.length.is_none() && self.energy.is_none() && self.angle.is_none()
    }
}

/// A handler section. Which optional settings are meaningful depends on `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct HandlerSection {
    #[serde(rename = "type")]
    pub kind: HandlerKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub potential: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub convention: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idivf: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub combining_rule: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale12: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale13: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale14: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale15: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cutoff: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub switch_width: Option<f64>,
    #[serde(default, skip_serializing_if = "UnitsSection::is_empty")]
    pub units: UnitsSection,
    #[serde(default)]
    pub rules: Vec<RuleSection>,
}

impl HandlerSection {
    pub fn new(kind: HandlerKind) -> Self {
        Self {
            kind,
            required: None,
            potential: None,
            convention: None,
            idivf: None,
            combining_rule: None,
            method: None,
            scale12: None,
            scale13: None,
            scale14: None,
            scale15: None,
            cutoff: None,
            switch_width: None,
            units: UnitsSection::default(),
            rules: Vec::new(),
        }
    }

    /// Names of settings present on the section, for rejecting ones the kind does not use.
    pub(crate) fn present_settings(&self) -> Vec<&'static str> {
        let flags = [
            ("potential", self.potential.is_some()),
            ("convention", self.convention.is_some()),
            ("idivf", self.idivf.is_some()),
            ("combining-rule", self.combining_rule.is_some()),
            ("method", self.method.is_some()),
            ("scale12", self.scale12.is_some()),
            ("scale13", self.scale13.is_some()),
            ("scale14", self.scale14.is_some()),
            ("scale15", self.scale15.is_some()),
            ("cutoff", self.cutoff.is_some()),
            ("switch-width", self.switch_width.is_some()),
        ];
        flags
            .into_iter()
            .filter_map(|(name, present)| present.then_some(name))
            .collect()
    }
}

/// A scalar, or a list of values for multi-term torsions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Numbers {
    One(f64),
    Many(Vec<f64>),
}

impl Numbers {
    pub fn as_slice(&self) -> &[f64] {
        match self {
            Numbers::One(v) => std::slice::from_ref(v),
            Numbers::Many(vs) => vs,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct RuleSection {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smirks: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub angle: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub k: Option<Numbers>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub periodicity: Option<Vec<u32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idivf: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub epsilon: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sigma: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rmin_half: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub charges: Option<Vec<f64>>,
}

impl RuleSection {
    /// Fills every field this rule leaves unset from `parent`.
    pub(crate) fn inherit_from(&mut self, parent: &RuleSection) {
        fn fill<T: Clone>(field: &mut Option<T>, parent: &Option<T>) {
            if field.is_none() {
                field.clone_from(parent);
            }
        }
        fill(&mut self.smirks, &parent.smirks);
        fill(&mut self.length, &parent.length);
        fill(&mut self.angle, &parent.angle);
        fill(&mut self.k, &parent.k);
        fill(&mut self.periodicity, &parent.periodicity);
        fill(&mut self.phase, &parent.phase);
        fill(&mut self.idivf, &parent.idivf);
        fill(&mut self.charges, &parent.charges);
        // The two size forms are alternatives; inherit the parent's only if neither is set.
        if self.sigma.is_none() && self.rmin_half.is_none() {
            self.sigma = parent.sigma;
            self.rmin_half = parent.rmin_half;
        }
        fill(&mut self.epsilon, &parent.epsilon);
    }

    pub(crate) fn present_parameters(&self) -> Vec<&'static str> {
        let flags = [
            ("length", self.length.is_some()),
            ("angle", self.angle.is_some()),
            ("k", self.k.is_some()),
            ("periodicity", self.periodicity.is_some()),
            ("phase", self.phase.is_some()),
            ("idivf", self.idivf.is_some()),
            ("epsilon", self.epsilon.is_some()),
            ("sigma", self.sigma.is_some()),
            ("rmin-half", self.rmin_half.is_some()),
            ("charges", self.charges.is_some()),
        ];
        flags
            .into_iter()
            .filter_map(|(name, present)| present.then_some(name))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_ordered_handlers_and_rules() {
        let doc: RuleDocument = toml::from_str(
            r#"
            version = "0.3"

            [substructures]
            halogen = "[F,Cl,Br,I]"

            [[handlers]]
            type = "Bonds"
            units = { length = "angstrom", energy = "kcal/mol" }

            [[handlers.rules]]
            id = "b1"
            smirks = "[#6:1]-[#6:2]"
            length = 1.5
            k = 300

            [[handlers]]
            type = "ProperTorsions"
            units = { angle = "degree", energy = "kcal/mol" }

            [[handlers.rules]]
            id = "t1"
            smirks = "[*:1]-[#6:2]-[#6:3]-[*:4]"
            periodicity = [3, 1]
            phase = [0.0, 180.0]
            k = [0.15, 0.2]
            "#,
        )
        .unwrap();

        assert_eq!(doc.version, "0.3");
        assert_eq!(doc.substructures["halogen"], "[F,Cl,Br,I]");
        assert_eq!(doc.handlers.len(), 2);
        assert_eq!(doc.handlers[0].kind, HandlerKind::Bonds);
        assert_eq!(doc.handlers[0].rules[0].k, Some(Numbers::One(300.0)));
        assert_eq!(
            doc.handlers[1].rules[0].k,
            Some(Numbers::Many(vec![0.15, 0.2]))
        );
        assert_eq!(doc.handlers[1].rules[0].periodicity, Some(vec![3, 1]));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result: Result<RuleDocument, _> = toml::from_str(
            r#"
            version = "0.3"
            [[handlers]]
            type = "Bonds"
            [[handlers.rules]]
            id = "b1"
            smirks = "[#6:1]-[#6:2]"
            lenght = 1.5
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn inheritance_fills_only_missing_fields() {
        let parent = RuleSection {
            id: "p".into(),
            smirks: Some("[#6:1]-[#6:2]".into()),
            length: Some(1.5),
            k: Some(Numbers::One(300.0)),
            ..Default::default()
        };
        let mut child = RuleSection {
            id: "c".into(),
            extends: Some("p".into()),
            smirks: Some("[#6:1]-[#8:2]".into()),
            k: Some(Numbers::One(450.0)),
            ..Default::default()
        };
        child.inherit_from(&parent);
        assert_eq!(child.smirks.as_deref(), Some("[#6:1]-[#8:2]"));
        assert_eq!(child.length, Some(1.5));
        assert_eq!(child.k, Some(Numbers::One(450.0)));
    }

    #[test]
    fn settings_and_parameters_are_listed_by_document_name() {
        let mut section = HandlerSection::new(HandlerKind::Vdw);
        section.scale14 = Some(0.5);
        section.switch_width = Some(1.0);
        assert_eq!(section.present_settings(), vec!["scale14", "switch-width"]);

        let rule = RuleSection {
            id: "n1".into(),
            epsilon: Some(0.1),
            rmin_half: Some(1.9),
            ..Default::default()
        };
        assert_eq!(rule.present_parameters(), vec!["epsilon", "rmin-half"]);
    }
}
