use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("'{value}' is not a recognized {dimension} unit")]
pub struct UnitError {
    pub dimension: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LengthUnit {
    Angstrom,
    Nanometer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnergyUnit {
    #[serde(rename = "kilocalories_per_mole")]
    KcalPerMol,
    #[serde(rename = "kilojoules_per_mole")]
    KjPerMol,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AngleUnit {
    Degree,
    Radian,
}

impl LengthUnit {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Angstrom => "angstrom",
            Self::Nanometer => "nanometer",
        }
    }
}

impl EnergyUnit {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::KcalPerMol => "kilocalories_per_mole",
            Self::KjPerMol => "kilojoules_per_mole",
        }
    }
}

impl AngleUnit {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Degree => "degree",
            Self::Radian => "radian",
        }
    }
}

fn normalize(s: &str) -> String {
    s.trim().to_lowercase().replace([' ', '-'], "_")
}

impl FromStr for LengthUnit {
    type Err = UnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "angstrom" | "angstroms" | "a" | "å" => Ok(Self::Angstrom),
            "nanometer" | "nanometers" | "nm" => Ok(Self::Nanometer),
            _ => Err(UnitError {
                dimension: "length",
                value: s.to_string(),
            }),
        }
    }
}

impl FromStr for EnergyUnit {
    type Err = UnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "kilocalories_per_mole" | "kilocalorie_per_mole" | "kcal/mol" => Ok(Self::KcalPerMol),
            "kilojoules_per_mole" | "kilojoule_per_mole" | "kj/mol" => Ok(Self::KjPerMol),
            _ => Err(UnitError {
                dimension: "energy",
                value: s.to_string(),
            }),
        }
    }
}

impl FromStr for AngleUnit {
    type Err = UnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize(s).as_str() {
            "degree" | "degrees" | "deg" => Ok(Self::Degree),
            "radian" | "radians" | "rad" => Ok(Self::Radian),
            _ => Err(UnitError {
                dimension: "angle",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for LengthUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for EnergyUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for AngleUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The unit triple declared once per handler.
///
/// Force constants are expressed in the derived unit (energy per length squared
/// for bonds, energy per angle squared for angles, energy for torsion barriers).
/// Values are carried as declared; nothing is converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Units {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<LengthUnit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub energy: Option<EnergyUnit>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub angle: Option<AngleUnit>,
}

impl Units {
    pub fn parse(
        length: Option<&str>,
        energy: Option<&str>,
        angle: Option<&str>,
    ) -> Result<Self, UnitError> {
        Ok(Self {
            length: length.map(str::parse::<LengthUnit>).transpose()?,
            energy: energy.map(str::parse::<EnergyUnit>).transpose()?,
            angle: angle.map(str::parse::<AngleUnit>).transpose()?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.length.is_none() && self.energy.is_none() && self.angle.is_none()
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<&str> = [
            self.length.map(LengthUnit::as_str),
            self.energy.map(EnergyUnit::as_str),
            self.angle.map(AngleUnit::as_str),
        ]
        .into_iter()
        .flatten()
        .collect();
        if parts.is_empty() {
            f.write_str("dimensionless")
        } else {
            f.write_str(&parts.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_aliases_case_insensitively() {
        assert_eq!("Angstrom".parse::<LengthUnit>(), Ok(LengthUnit::Angstrom));
        assert_eq!(" nm ".parse::<LengthUnit>(), Ok(LengthUnit::Nanometer));
        assert_eq!("kcal/mol".parse::<EnergyUnit>(), Ok(EnergyUnit::KcalPerMol));
        assert_eq!(
            "kilojoules per mole".parse::<EnergyUnit>(),
            Ok(EnergyUnit::KjPerMol)
        );
        assert_eq!("degrees".parse::<AngleUnit>(), Ok(AngleUnit::Degree));
        assert_eq!("RAD".parse::<AngleUnit>(), Ok(AngleUnit::Radian));
    }

    #[test]
    fn rejects_unit_of_wrong_dimension() {
        let err = "degree".parse::<LengthUnit>().unwrap_err();
        assert_eq!(err.dimension, "length");
        assert_eq!(err.value, "degree");
        assert!("angstrom".parse::<EnergyUnit>().is_err());
    }

    #[test]
    fn parse_triple_and_display() {
        let units = Units::parse(Some("angstrom"), Some("kcal/mol"), None).unwrap();
        assert_eq!(units.length, Some(LengthUnit::Angstrom));
        assert_eq!(units.energy, Some(EnergyUnit::KcalPerMol));
        assert!(units.angle.is_none());
        assert_eq!(units.to_string(), "angstrom, kilocalories_per_mole");
        assert_eq!(Units::default().to_string(), "dimensionless");
        assert!(Units::parse(None, None, Some("furlong")).is_err());
    }

    #[test]
    fn canonical_names_round_trip_through_from_str() {
        for unit in [LengthUnit::Angstrom, LengthUnit::Nanometer] {
            assert_eq!(unit.as_str().parse::<LengthUnit>(), Ok(unit));
        }
        for unit in [EnergyUnit::KcalPerMol, EnergyUnit::KjPerMol] {
            assert_eq!(unit.as_str().parse::<EnergyUnit>(), Ok(unit));
        }
        for unit in [AngleUnit::Degree, AngleUnit::Radian] {
            assert_eq!(unit.as_str().parse::<AngleUnit>(), Ok(unit));
        }
    }
}
