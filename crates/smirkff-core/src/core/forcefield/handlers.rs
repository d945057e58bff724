use super::units::Units;
use crate::core::smirks::pattern::Pattern;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Interaction class of a handler. Also the `type` tag of a handler section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HandlerKind {
    Bonds,
    Angles,
    ProperTorsions,
    ImproperTorsions,
    #[serde(rename = "vdW")]
    Vdw,
    Electrostatics,
    LibraryCharges,
}

impl HandlerKind {
    pub const ALL: [HandlerKind; 7] = [
        HandlerKind::Bonds,
        HandlerKind::Angles,
        HandlerKind::ProperTorsions,
        HandlerKind::ImproperTorsions,
        HandlerKind::Vdw,
        HandlerKind::Electrostatics,
        HandlerKind::LibraryCharges,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bonds => "Bonds",
            Self::Angles => "Angles",
            Self::ProperTorsions => "ProperTorsions",
            Self::ImproperTorsions => "ImproperTorsions",
            Self::Vdw => "vdW",
            Self::Electrostatics => "Electrostatics",
            Self::LibraryCharges => "LibraryCharges",
        }
    }

    /// Whether an element with no matching rule is an error when the document
    /// does not say otherwise.
    pub fn required_by_default(self) -> bool {
        matches!(self, Self::Bonds | Self::Angles | Self::Vdw)
    }

    /// Number of tagged atoms each rule pattern must carry, if fixed.
    pub fn tagged_atoms(self) -> Option<usize> {
        match self {
            Self::Bonds => Some(2),
            Self::Angles => Some(3),
            Self::ProperTorsions | Self::ImproperTorsions => Some(4),
            Self::Vdw => Some(1),
            Self::Electrostatics | Self::LibraryCharges => None,
        }
    }
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HandlerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HandlerKind::ALL
            .into_iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown handler type '{s}'"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BondParams {
    pub length: f64,
    pub k: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AngleParams {
    pub angle: f64,
    pub k: f64,
}

/// One Fourier term `k / idivf * (1 + cos(periodicity * phi - phase))`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TorsionTerm {
    pub periodicity: u32,
    pub phase: f64,
    pub k: f64,
    pub idivf: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TorsionParams {
    pub terms: Vec<TorsionTerm>,
}

/// Lennard-Jones size parameter in the form it was declared.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VdwSize {
    Sigma(f64),
    RminHalf(f64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VdwParams {
    pub epsilon: f64,
    pub size: VdwSize,
}

// 2^(1/6): rmin = 2^(1/6) * sigma
const RMIN_PER_SIGMA: f64 = 1.122_462_048_309_373;

impl VdwParams {
    pub fn sigma(&self) -> f64 {
        match self.size {
            VdwSize::Sigma(sigma) => sigma,
            VdwSize::RminHalf(rmin_half) => 2.0 * rmin_half / RMIN_PER_SIGMA,
        }
    }

    pub fn rmin_half(&self) -> f64 {
        match self.size {
            VdwSize::Sigma(sigma) => sigma * RMIN_PER_SIGMA / 2.0,
            VdwSize::RminHalf(rmin_half) => rmin_half,
        }
    }
}

impl Serialize for VdwParams {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("VdwParams", 3)?;
        state.serialize_field("epsilon", &self.epsilon)?;
        state.serialize_field("sigma", &self.sigma())?;
        state.serialize_field("rmin_half", &self.rmin_half())?;
        state.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargeParams {
    /// Partial charge per tagged atom, in map index order (elementary charge).
    pub charges: Vec<f64>,
}

/// Electrostatics rules carry no parameters of their own.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct NoParams;

/// A pattern with its parameters and its position in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule<P> {
    pub id: String,
    pub smirks: String,
    pub pattern: Arc<Pattern>,
    pub params: P,
    /// Strictly increasing across every rule of a force field, including merged ones.
    pub sequence: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImproperConvention {
    /// Three cyclic permutations of the peripheral atoms per center.
    #[default]
    Trefoil,
    /// All six permutations of the peripheral atoms per center.
    Six,
}

impl ImproperConvention {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trefoil => "trefoil",
            Self::Six => "six",
        }
    }

    /// Number of terms generated per center, and the default divisor of each.
    pub fn fold(self) -> usize {
        match self {
            Self::Trefoil => 3,
            Self::Six => 6,
        }
    }
}

impl FromStr for ImproperConvention {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trefoil" | "three" | "3" => Ok(Self::Trefoil),
            "six" | "6" => Ok(Self::Six),
            other => Err(format!("unknown improper convention '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CombiningRule {
    #[default]
    #[serde(rename = "Lorentz-Berthelot")]
    LorentzBerthelot,
    #[serde(rename = "geometric")]
    Geometric,
}

impl CombiningRule {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LorentzBerthelot => "Lorentz-Berthelot",
            Self::Geometric => "geometric",
        }
    }
}

impl FromStr for CombiningRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "lorentz-berthelot" | "lorentz_berthelot" | "arithmetic" => Ok(Self::LorentzBerthelot),
            "geometric" => Ok(Self::Geometric),
            other => Err(format!("unknown combining rule '{other}'")),
        }
    }
}

/// Nonbonded scale factors for 1-2, 1-3, 1-4 and 1-5 pairs (one to four bonds apart).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PairScales {
    pub scale12: f64,
    pub scale13: f64,
    pub scale14: f64,
    pub scale15: f64,
}

impl PairScales {
    pub const VDW_DEFAULT: PairScales = PairScales {
        scale12: 0.0,
        scale13: 0.0,
        scale14: 0.5,
        scale15: 1.0,
    };

    pub const ELECTROSTATICS_DEFAULT: PairScales = PairScales {
        scale12: 0.0,
        scale13: 0.0,
        scale14: 0.833_333_333_3,
        scale15: 1.0,
    };

    /// Scale for a pair `bonds` apart; pairs further apart are not scaled.
    pub fn for_separation(&self, bonds: u8) -> f64 {
        match bonds {
            1 => self.scale12,
            2 => self.scale13,
            3 => self.scale14,
            4 => self.scale15,
            _ => 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValenceSettings {
    pub potential: String,
}

impl Default for ValenceSettings {
    fn default() -> Self {
        Self {
            potential: "harmonic".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TorsionSettings {
    pub potential: String,
    /// Divisor applied to terms whose rule gives none.
    pub default_idivf: Option<f64>,
    /// Only meaningful for impropers.
    pub convention: ImproperConvention,
}

impl Default for TorsionSettings {
    fn default() -> Self {
        Self {
            potential: "k*(1+cos(periodicity*theta-phase))".to_string(),
            default_idivf: None,
            convention: ImproperConvention::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VdwSettings {
    pub potential: String,
    pub combining_rule: CombiningRule,
    pub scales: PairScales,
    pub cutoff: Option<f64>,
    pub switch_width: Option<f64>,
}

impl Default for VdwSettings {
    fn default() -> Self {
        Self {
            potential: "Lennard-Jones-12-6".to_string(),
            combining_rule: CombiningRule::default(),
            scales: PairScales::VDW_DEFAULT,
            cutoff: None,
            switch_width: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElectrostaticsSettings {
    pub method: String,
    pub scales: PairScales,
    pub cutoff: Option<f64>,
}

impl Default for ElectrostaticsSettings {
    fn default() -> Self {
        Self {
            method: "PME".to_string(),
            scales: PairScales::ELECTROSTATICS_DEFAULT,
            cutoff: None,
        }
    }
}

/// One interaction class: its declared units, settings and ordered rules.
#[derive(Debug, Clone, PartialEq)]
pub struct Handler<P, S> {
    pub kind: HandlerKind,
    pub units: Units,
    /// Whether an unmatched element is an error.
    pub required: bool,
    pub settings: S,
    /// Always ordered by `sequence`.
    pub rules: Vec<Rule<P>>,
}

impl<P, S: Default> Handler<P, S> {
    pub fn new(kind: HandlerKind, units: Units) -> Self {
        Self {
            kind,
            units,
            required: kind.required_by_default(),
            settings: S::default(),
            rules: Vec::new(),
        }
    }
}

impl<P, S> Handler<P, S> {
    pub fn rule(&self, id: &str) -> Option<&Rule<P>> {
        self.rules.iter().find(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

pub type BondHandler = Handler<BondParams, ValenceSettings>;
pub type AngleHandler = Handler<AngleParams, ValenceSettings>;
pub type TorsionHandler = Handler<TorsionParams, TorsionSettings>;
pub type VdwHandler = Handler<VdwParams, VdwSettings>;
pub type ElectrostaticsHandler = Handler<NoParams, ElectrostaticsSettings>;
pub type LibraryChargeHandler = Handler<ChargeParams, ()>;

/// A handler of any interaction class, as stored in document order.
#[derive(Debug, Clone, PartialEq)]
pub enum AnyHandler {
    Bonds(BondHandler),
    Angles(AngleHandler),
    ProperTorsions(TorsionHandler),
    ImproperTorsions(TorsionHandler),
    Vdw(VdwHandler),
    Electrostatics(ElectrostaticsHandler),
    LibraryCharges(LibraryChargeHandler),
}

impl AnyHandler {
    pub fn kind(&self) -> HandlerKind {
        match self {
            Self::Bonds(_) => HandlerKind::Bonds,
            Self::Angles(_) => HandlerKind::Angles,
            Self::ProperTorsions(_) => HandlerKind::ProperTorsions,
            Self::ImproperTorsions(_) => HandlerKind::ImproperTorsions,
            Self::Vdw(_) => HandlerKind::Vdw,
            Self::Electrostatics(_) => HandlerKind::Electrostatics,
            Self::LibraryCharges(_) => HandlerKind::LibraryCharges,
        }
    }

    pub fn units(&self) -> &Units {
        match self {
            Self::Bonds(h) => &h.units,
            Self::Angles(h) => &h.units,
            Self::ProperTorsions(h) | Self::ImproperTorsions(h) => &h.units,
            Self::Vdw(h) => &h.units,
            Self::Electrostatics(h) => &h.units,
            Self::LibraryCharges(h) => &h.units,
        }
    }

    pub fn required(&self) -> bool {
        match self {
            Self::Bonds(h) => h.required,
            Self::Angles(h) => h.required,
            Self::ProperTorsions(h) | Self::ImproperTorsions(h) => h.required,
            Self::Vdw(h) => h.required,
            Self::Electrostatics(h) => h.required,
            Self::LibraryCharges(h) => h.required,
        }
    }

    /// `(id, smirks, sequence)` of every rule, in declaration order.
    pub fn rule_summaries(&self) -> Vec<(&str, &str, u64)> {
        fn collect<P>(rules: &[Rule<P>]) -> Vec<(&str, &str, u64)> {
            rules
                .iter()
                .map(|r| (r.id.as_str(), r.smirks.as_str(), r.sequence))
                .collect()
        }
        match self {
            Self::Bonds(h) => collect(&h.rules),
            Self::Angles(h) => collect(&h.rules),
            Self::ProperTorsions(h) | Self::ImproperTorsions(h) => collect(&h.rules),
            Self::Vdw(h) => collect(&h.rules),
            Self::Electrostatics(h) => collect(&h.rules),
            Self::LibraryCharges(h) => collect(&h.rules),
        }
    }

    pub fn rule_count(&self) -> usize {
        match self {
            Self::Bonds(h) => h.len(),
            Self::Angles(h) => h.len(),
            Self::ProperTorsions(h) | Self::ImproperTorsions(h) => h.len(),
            Self::Vdw(h) => h.len(),
            Self::Electrostatics(h) => h.len(),
            Self::LibraryCharges(h) => h.len(),
        }
    }
}
