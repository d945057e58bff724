use crate::core::forcefield::handlers::{
    AngleParams, BondParams, HandlerKind, TorsionParams, VdwParams,
};
use crate::core::forcefield::units::Units;
use crate::core::topology::elements::canonical_chain;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;
use thiserror::Error;

/// One structural element with the parameters of the rule that won it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assigned<P> {
    /// Bonds, angles and proper torsions use the canonical orientation (first
    /// index not greater than last). Improper terms list the center second.
    pub atoms: Vec<usize>,
    pub rule_id: String,
    pub params: P,
}

/// Nonbonded scale factors of one atom pair, by shortest bond path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScaledPair {
    pub atom1: usize,
    pub atom2: usize,
    pub bonds: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vdw: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub electrostatics: Option<f64>,
}

/// The resolved parameters of one topology.
///
/// Every list is sorted by atoms. Elements of optional handlers that no rule
/// matched are absent. Pairs more than four bonds apart are not listed; their
/// scale is 1.0.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ParameterAssignment {
    pub bonds: Vec<Assigned<BondParams>>,
    pub angles: Vec<Assigned<AngleParams>>,
    pub proper_torsions: Vec<Assigned<TorsionParams>>,
    pub improper_torsions: Vec<Assigned<TorsionParams>>,
    pub vdw: Vec<Assigned<VdwParams>>,
    pub charges: Vec<Assigned<f64>>,
    pub pairs: Vec<ScaledPair>,
    /// Declared units of each handler that contributed, by document tag.
    pub units: BTreeMap<String, Units>,
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("TOML export failed: {0}")]
    Toml(#[from] toml::ser::Error),
    #[error("I/O error during export: {0}")]
    Io(#[from] std::io::Error),
}

fn find<'a, P>(list: &'a [Assigned<P>], atoms: &[usize]) -> Option<&'a Assigned<P>> {
    list.binary_search_by(|a| a.atoms.as_slice().cmp(atoms))
        .ok()
        .map(|i| &list[i])
}

impl ParameterAssignment {
    pub fn bond(&self, a: usize, b: usize) -> Option<&Assigned<BondParams>> {
        find(&self.bonds, &canonical_chain([a, b]))
    }

    pub fn angle(&self, a: usize, b: usize, c: usize) -> Option<&Assigned<AngleParams>> {
        find(&self.angles, &canonical_chain([a, b, c]))
    }

    pub fn proper_torsion(
        &self,
        a: usize,
        b: usize,
        c: usize,
        d: usize,
    ) -> Option<&Assigned<TorsionParams>> {
        find(&self.proper_torsions, &canonical_chain([a, b, c, d]))
    }

    /// All improper terms generated around `center`.
    pub fn impropers_around(&self, center: usize) -> Vec<&Assigned<TorsionParams>> {
        self.improper_torsions
            .iter()
            .filter(|t| t.atoms.get(1) == Some(&center))
            .collect()
    }

    pub fn vdw_of(&self, atom: usize) -> Option<&Assigned<VdwParams>> {
        find(&self.vdw, &[atom])
    }

    pub fn charge_of(&self, atom: usize) -> Option<f64> {
        find(&self.charges, &[atom]).map(|c| c.params)
    }

    fn pair(&self, a: usize, b: usize) -> Option<&ScaledPair> {
        let key = (a.min(b), a.max(b));
        self.pairs
            .binary_search_by(|p| (p.atom1, p.atom2).cmp(&key))
            .ok()
            .map(|i| &self.pairs[i])
    }

    /// vdW scale for a pair of distinct atoms, or `None` without a vdW handler.
    pub fn vdw_scale(&self, a: usize, b: usize) -> Option<f64> {
        if !self.units.contains_key(HandlerKind::Vdw.as_str()) {
            return None;
        }
        Some(self.pair(a, b).and_then(|p| p.vdw).unwrap_or(1.0))
    }

    /// Electrostatics scale for a pair of distinct atoms, or `None` without an
    /// electrostatics handler.
    pub fn electrostatics_scale(&self, a: usize, b: usize) -> Option<f64> {
        if !self.units.contains_key(HandlerKind::Electrostatics.as_str()) {
            return None;
        }
        Some(
            self.pair(a, b)
                .and_then(|p| p.electrostatics)
                .unwrap_or(1.0),
        )
    }

    pub fn element_count(&self) -> usize {
        self.bonds.len()
            + self.angles.len()
            + self.proper_torsions.len()
            + self.improper_torsions.len()
            + self.vdw.len()
            + self.charges.len()
    }

    pub fn to_toml_string(&self) -> Result<String, ExportError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Writes one CSV row per element: handler, atoms, winning rule, parameters.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), ExportError> {
        let mut csv = csv::Writer::from_writer(writer);
        let mut rows = Vec::with_capacity(self.element_count());
        push_rows(&mut rows, HandlerKind::Bonds, &self.bonds);
        push_rows(&mut rows, HandlerKind::Angles, &self.angles);
        push_rows(&mut rows, HandlerKind::ProperTorsions, &self.proper_torsions);
        push_rows(&mut rows, HandlerKind::ImproperTorsions, &self.improper_torsions);
        push_rows(&mut rows, HandlerKind::Vdw, &self.vdw);
        push_rows(&mut rows, HandlerKind::LibraryCharges, &self.charges);
        for row in rows {
            csv.serialize(row)?;
        }
        csv.flush()?;
        Ok(())
    }
}

#[derive(Serialize)]
struct CsvRow<'a> {
    handler: &'static str,
    atoms: String,
    rule_id: &'a str,
    parameters: String,
}

fn push_rows<'a, P: ParameterColumns>(
    rows: &mut Vec<CsvRow<'a>>,
    kind: HandlerKind,
    list: &'a [Assigned<P>],
) {
    rows.extend(list.iter().map(|a| CsvRow {
        handler: kind.as_str(),
        atoms: a
            .atoms
            .iter()
            .map(usize::to_string)
            .collect::<Vec<_>>()
            .join("-"),
        rule_id: &a.rule_id,
        parameters: a.params.columns(),
    }));
}

/// Flattens parameters into a `key=value;...` cell.
trait ParameterColumns {
    fn columns(&self) -> String;
}

impl ParameterColumns for BondParams {
    fn columns(&self) -> String {
        format!("length={};k={}", self.length, self.k)
    }
}

impl ParameterColumns for AngleParams {
    fn columns(&self) -> String {
        format!("angle={};k={}", self.angle, self.k)
    }
}

impl ParameterColumns for TorsionParams {
    fn columns(&self) -> String {
        self.terms
            .iter()
            .map(|t| {
                format!(
                    "periodicity={};phase={};k={};idivf={}",
                    t.periodicity, t.phase, t.k, t.idivf
                )
            })
            .collect::<Vec<_>>()
            .join("|")
    }
}

impl ParameterColumns for VdwParams {
    fn columns(&self) -> String {
        format!(
            "epsilon={};sigma={};rmin_half={}",
            self.epsilon,
            self.sigma(),
            self.rmin_half()
        )
    }
}

impl ParameterColumns for f64 {
    fn columns(&self) -> String {
        format!("charge={self}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::forcefield::handlers::{TorsionTerm, VdwSize};

    fn sample() -> ParameterAssignment {
        let mut units = BTreeMap::new();
        units.insert("vdW".to_string(), Units::default());
        ParameterAssignment {
            bonds: vec![Assigned {
                atoms: vec![0, 1],
                rule_id: "b1".into(),
                params: BondParams { length: 1.5, k: 300.0 },
            }],
            proper_torsions: vec![Assigned {
                atoms: vec![0, 1, 2, 3],
                rule_id: "t1".into(),
                params: TorsionParams {
                    terms: vec![
                        TorsionTerm {
                            periodicity: 3,
                            phase: 0.0,
                            k: 0.2,
                            idivf: 1.0,
                        },
                        TorsionTerm {
                            periodicity: 1,
                            phase: 180.0,
                            k: 0.1,
                            idivf: 1.0,
                        },
                    ],
                },
            }],
            vdw: vec![Assigned {
                atoms: vec![0],
                rule_id: "n1".into(),
                params: VdwParams {
                    epsilon: 0.1,
                    size: VdwSize::Sigma(3.0),
                },
            }],
            pairs: vec![ScaledPair {
                atom1: 0,
                atom2: 3,
                bonds: 3,
                vdw: Some(0.5),
                electrostatics: None,
            }],
            units,
            ..Default::default()
        }
    }

    #[test]
    fn lookups_accept_either_orientation() {
        let assignment = sample();
        assert_eq!(assignment.bond(1, 0).unwrap().rule_id, "b1");
        assert_eq!(assignment.proper_torsion(3, 2, 1, 0).unwrap().rule_id, "t1");
        assert!(assignment.angle(0, 1, 2).is_none());
        assert_eq!(assignment.vdw_of(0).unwrap().params.epsilon, 0.1);
    }

    #[test]
    fn pair_scales_default_to_one_beyond_listed_pairs() {
        let assignment = sample();
        assert_eq!(assignment.vdw_scale(3, 0), Some(0.5));
        assert_eq!(assignment.vdw_scale(0, 7), Some(1.0));
        assert_eq!(assignment.electrostatics_scale(0, 3), None);
    }

    #[test]
    fn csv_has_one_row_per_element() {
        let mut buffer = Vec::new();
        sample().write_csv(&mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "handler,atoms,rule_id,parameters");
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1], "Bonds,0-1,b1,length=1.5;k=300");
        assert!(lines[2].contains("periodicity=3;phase=0;k=0.2;idivf=1|periodicity=1"));
        assert!(lines[3].starts_with("vdW,0,n1,epsilon=0.1;sigma=3;"));
    }

    #[test]
    fn toml_export_contains_every_section() {
        let text = sample().to_toml_string().unwrap();
        assert!(text.contains("rule_id = \"b1\""));
        assert!(text.contains("[[pairs]]"));
        assert!(text.contains("rmin_half"));
    }
}
