use phf::{Map, phf_map};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[rustfmt::skip]
static SYMBOL_TO_ATOMIC_NUMBER: Map<&'static str, u8> = phf_map! {
    "H" => 1, "He" => 2,
    "Li" => 3, "Be" => 4, "B" => 5, "C" => 6, "N" => 7, "O" => 8, "F" => 9, "Ne" => 10,
    "Na" => 11, "Mg" => 12, "Al" => 13, "Si" => 14, "P" => 15, "S" => 16, "Cl" => 17, "Ar" => 18,
    "K" => 19, "Ca" => 20, "Sc" => 21, "Ti" => 22, "V" => 23, "Cr" => 24, "Mn" => 25,
    "Fe" => 26, "Co" => 27, "Ni" => 28, "Cu" => 29, "Zn" => 30, "Ga" => 31, "Ge" => 32,
    "As" => 33, "Se" => 34, "Br" => 35, "Kr" => 36,
    "Rb" => 37, "Sr" => 38, "Y" => 39, "Zr" => 40, "Nb" => 41, "Mo" => 42, "Tc" => 43,
    "Ru" => 44, "Rh" => 45, "Pd" => 46, "Ag" => 47, "Cd" => 48, "In" => 49, "Sn" => 50,
    "Sb" => 51, "Te" => 52, "I" => 53, "Xe" => 54,
    "Cs" => 55, "Ba" => 56, "Pt" => 78, "Au" => 79, "Hg" => 80, "Pb" => 82,
};

#[rustfmt::skip]
const SYMBOLS: [&str; 57] = [
    "*",
    "H", "He",
    "Li", "Be", "B", "C", "N", "O", "F", "Ne",
    "Na", "Mg", "Al", "Si", "P", "S", "Cl", "Ar",
    "K", "Ca", "Sc", "Ti", "V", "Cr", "Mn", "Fe", "Co", "Ni", "Cu", "Zn", "Ga", "Ge", "As", "Se", "Br", "Kr",
    "Rb", "Sr", "Y", "Zr", "Nb", "Mo", "Tc", "Ru", "Rh", "Pd", "Ag", "Cd", "In", "Sn", "Sb", "Te", "I", "Xe",
    "Cs", "Ba",
];

/// A chemical element, identified by its atomic number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Element(u8);

impl Element {
    pub const H: Element = Element(1);
    pub const C: Element = Element(6);
    pub const N: Element = Element(7);
    pub const O: Element = Element(8);
    pub const F: Element = Element(9);
    pub const P: Element = Element(15);
    pub const S: Element = Element(16);
    pub const CL: Element = Element(17);
    pub const BR: Element = Element(35);
    pub const I: Element = Element(53);

    /// Builds an element from its atomic number. Returns `None` for zero.
    pub fn from_atomic_number(atomic_number: u8) -> Option<Self> {
        (atomic_number > 0).then_some(Self(atomic_number))
    }

    /// Looks up an element by its case-sensitive symbol (e.g. `"Cl"`).
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        SYMBOL_TO_ATOMIC_NUMBER.get(symbol).copied().map(Self)
    }

    #[inline]
    pub fn atomic_number(self) -> u8 {
        self.0
    }

    pub fn symbol(self) -> &'static str {
        match self.0 {
            78 => "Pt",
            79 => "Au",
            80 => "Hg",
            82 => "Pb",
            n => SYMBOLS.get(n as usize).copied().unwrap_or("?"),
        }
    }

    #[inline]
    pub fn is_hydrogen(self) -> bool {
        self.0 == 1
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown element symbol '{0}'")]
pub struct ParseElementError(pub String);

impl FromStr for Element {
    type Err = ParseElementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Some(element) = Self::from_symbol(trimmed) {
            return Ok(element);
        }
        // Accept upper-case or lower-case spellings such as "CL" or "cl".
        let mut chars = trimmed.chars();
        let normalized: String = match chars.next() {
            Some(first) => first
                .to_uppercase()
                .chain(chars.flat_map(char::to_lowercase))
                .collect(),
            None => String::new(),
        };
        Self::from_symbol(&normalized).ok_or_else(|| ParseElementError(s.to_string()))
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_lookup_round_trips_through_atomic_number() {
        for symbol in ["H", "C", "N", "O", "Cl", "Br", "I", "Si", "Se"] {
            let element = Element::from_symbol(symbol).unwrap();
            assert_eq!(element.symbol(), symbol);
        }
    }

    #[test]
    fn from_str_normalizes_case() {
        assert_eq!("CL".parse::<Element>().unwrap(), Element::CL);
        assert_eq!("br".parse::<Element>().unwrap(), Element::BR);
        assert_eq!(" c ".parse::<Element>().unwrap(), Element::C);
    }

    #[test]
    fn from_str_rejects_unknown_symbols() {
        assert!("Xx".parse::<Element>().is_err());
        assert!("".parse::<Element>().is_err());
    }

    #[test]
    fn from_atomic_number_rejects_zero() {
        assert!(Element::from_atomic_number(0).is_none());
        assert_eq!(Element::from_atomic_number(8), Some(Element::O));
    }

    #[test]
    fn heavy_metals_have_symbols() {
        assert_eq!(Element::from_atomic_number(79).unwrap().symbol(), "Au");
        assert_eq!(Element::from_atomic_number(53).unwrap().symbol(), "I");
    }
}
