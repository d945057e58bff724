use super::pattern::{
    AtomExpr, AtomPrimitive, BondExpr, BondPrimitive, Pattern, PatternAtom, PatternBond,
};
use super::substructures::Substructures;
use crate::core::models::atom::Chirality;
use crate::core::models::element::Element;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SmirksError {
    #[error("Pattern is empty")]
    Empty,
    #[error("Unexpected '{found}' at position {position}")]
    UnexpectedChar { found: char, position: usize },
    #[error("Unexpected end of pattern, expected {expected}")]
    UnexpectedEnd { expected: &'static str },
    #[error("Unknown element '{symbol}' at position {position}")]
    UnknownElement { symbol: String, position: usize },
    #[error("Unsupported primitive '{primitive}' at position {position}: {reason}")]
    Unsupported {
        primitive: String,
        position: usize,
        reason: &'static str,
    },
    #[error("Number at position {position} is out of range")]
    NumberOutOfRange { position: usize },
    #[error("Bond at position {position} has no preceding atom")]
    DanglingBond { position: usize },
    #[error("Unbalanced parentheses at position {position}")]
    UnbalancedBranch { position: usize },
    #[error("Ring closure(s) {0:?} never closed")]
    UnclosedRing(Vec<u16>),
    #[error("Ring closure {label} at position {position} joins an atom to itself or repeats a bond")]
    InvalidRingClosure { label: u16, position: usize },
    #[error("Map index :{0} is used more than once")]
    DuplicateMapIndex(u8),
    #[error("Unknown substructure '${0}'")]
    UnknownSubstructure(String),
}

type Result<T> = std::result::Result<T, SmirksError>;

/// Parses a SMIRKS/SMARTS string without any named substructures in scope.
pub fn parse_smirks(smirks: &str) -> Result<Pattern> {
    parse_smirks_with(smirks, &Substructures::default())
}

/// Parses a SMIRKS/SMARTS string, resolving `$name` references against `substructures`.
pub fn parse_smirks_with(smirks: &str, substructures: &Substructures) -> Result<Pattern> {
    let smirks = smirks.trim();
    if smirks.is_empty() {
        return Err(SmirksError::Empty);
    }
    let mut parser = Parser::new(smirks, substructures);
    parser.parse()?;
    parser.finish()
}

/// Names referenced as `$name` (not `$(...)`) anywhere in the string, in order of first use.
pub fn referenced_substructures(smirks: &str) -> Vec<String> {
    let bytes = smirks.as_bytes();
    let mut names = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'$' {
            let start = i + 1;
            let mut end = start;
            while end < bytes.len() && is_name_char(bytes[end]) {
                end += 1;
            }
            if end > start {
                let name = smirks[start..end].to_string();
                if !names.contains(&name) {
                    names.push(name);
                }
            }
            i = end.max(i + 1);
        } else {
            i += 1;
        }
    }
    names
}

pub(crate) fn is_name_char(ch: u8) -> bool {
    ch.is_ascii_alphanumeric() || ch == b'_'
}

struct Parser<'a> {
    source: &'a str,
    input: &'a [u8],
    pos: usize,
    substructures: &'a Substructures,
    atoms: Vec<PatternAtom>,
    bonds: Vec<PatternBond>,
    branches: Vec<usize>,
    prev_atom: Option<usize>,
    pending_bond: Option<(BondExpr, usize)>,
    ring_closures: BTreeMap<u16, (usize, Option<BondExpr>)>,
    bracket_start: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str, substructures: &'a Substructures) -> Self {
        Self {
            source,
            input: source.as_bytes(),
            pos: 0,
            substructures,
            atoms: Vec::new(),
            bonds: Vec::new(),
            branches: Vec::new(),
            prev_atom: None,
            pending_bond: None,
            ring_closures: BTreeMap::new(),
            bracket_start: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let ch = self.peek();
        if ch.is_some() {
            self.pos += 1;
        }
        ch
    }

    fn unexpected(&self) -> SmirksError {
        match self.peek() {
            Some(ch) => SmirksError::UnexpectedChar {
                found: ch as char,
                position: self.pos,
            },
            None => SmirksError::UnexpectedEnd {
                expected: "more input",
            },
        }
    }

    fn expect(&mut self, ch: u8, expected: &'static str) -> Result<()> {
        match self.peek() {
            Some(c) if c == ch => {
                self.pos += 1;
                Ok(())
            }
            Some(_) => Err(self.unexpected()),
            None => Err(SmirksError::UnexpectedEnd { expected }),
        }
    }

    fn parse(&mut self) -> Result<()> {
        while let Some(ch) = self.peek() {
            match ch {
                b'(' => {
                    let prev = self
                        .prev_atom
                        .ok_or(SmirksError::UnbalancedBranch { position: self.pos })?;
                    self.advance();
                    self.branches.push(prev);
                }
                b')' => {
                    self.ensure_no_pending_bond()?;
                    let prev = self
                        .branches
                        .pop()
                        .ok_or(SmirksError::UnbalancedBranch { position: self.pos })?;
                    self.advance();
                    self.prev_atom = Some(prev);
                }
                b'.' => {
                    self.ensure_no_pending_bond()?;
                    self.advance();
                    self.prev_atom = None;
                }
                b'[' => self.parse_bracket_atom()?,
                b'*' => {
                    self.advance();
                    self.add_atom(AtomExpr::Primitive(AtomPrimitive::Any), None)?;
                }
                b'%' => {
                    let position = self.pos;
                    self.advance();
                    let label = self.parse_two_digit_label()?;
                    self.close_ring(label, position)?;
                }
                c if c.is_ascii_digit() => {
                    let position = self.pos;
                    self.advance();
                    self.close_ring((c - b'0') as u16, position)?;
                }
                c if is_bond_start(c) => {
                    let position = self.pos;
                    if self.pending_bond.is_some() {
                        return Err(self.unexpected());
                    }
                    let expr = self.parse_bond_expr()?;
                    self.pending_bond = Some((expr, position));
                }
                c if c.is_ascii_alphabetic() => self.parse_organic_atom()?,
                _ => return Err(self.unexpected()),
            }
        }

        if !self.branches.is_empty() {
            return Err(SmirksError::UnbalancedBranch { position: self.pos });
        }
        self.ensure_no_pending_bond()?;
        if !self.ring_closures.is_empty() {
            return Err(SmirksError::UnclosedRing(
                self.ring_closures.keys().copied().collect(),
            ));
        }
        Ok(())
    }

    fn finish(self) -> Result<Pattern> {
        if self.atoms.is_empty() {
            return Err(SmirksError::Empty);
        }
        let mut seen = BTreeSet::new();
        for index in self.atoms.iter().filter_map(|a| a.map_index) {
            if !seen.insert(index) {
                return Err(SmirksError::DuplicateMapIndex(index));
            }
        }
        Ok(Pattern::new(self.source, self.atoms, self.bonds))
    }

    fn ensure_no_pending_bond(&self) -> Result<()> {
        match &self.pending_bond {
            Some((_, position)) => Err(SmirksError::DanglingBond {
                position: *position,
            }),
            None => Ok(()),
        }
    }

    fn add_atom(&mut self, expr: AtomExpr, map_index: Option<u8>) -> Result<()> {
        let idx = self.atoms.len();
        self.atoms.push(PatternAtom { expr, map_index });
        match (self.prev_atom, self.pending_bond.take()) {
            (Some(prev), pending) => {
                let expr = pending.map(|(e, _)| e).unwrap_or(BondExpr::IMPLICIT);
                self.bonds.push(PatternBond {
                    atom1: prev,
                    atom2: idx,
                    expr,
                });
            }
            (None, Some((_, position))) => {
                return Err(SmirksError::DanglingBond { position });
            }
            (None, None) => {}
        }
        self.prev_atom = Some(idx);
        Ok(())
    }

    fn close_ring(&mut self, label: u16, position: usize) -> Result<()> {
        let current = self
            .prev_atom
            .ok_or(SmirksError::DanglingBond { position })?;
        let pending = self.pending_bond.take().map(|(e, _)| e);

        match self.ring_closures.remove(&label) {
            Some((open_atom, open_bond)) => {
                let already_bonded = self.bonds.iter().any(|b| {
                    (b.atom1 == open_atom && b.atom2 == current)
                        || (b.atom1 == current && b.atom2 == open_atom)
                });
                if open_atom == current || already_bonded {
                    return Err(SmirksError::InvalidRingClosure { label, position });
                }
                let expr = pending.or(open_bond).unwrap_or(BondExpr::IMPLICIT);
                self.bonds.push(PatternBond {
                    atom1: open_atom,
                    atom2: current,
                    expr,
                });
            }
            None => {
                self.ring_closures.insert(label, (current, pending));
            }
        }
        Ok(())
    }

    fn parse_two_digit_label(&mut self) -> Result<u16> {
        let mut label = 0u16;
        for _ in 0..2 {
            match self.advance() {
                Some(d) if d.is_ascii_digit() => label = label * 10 + (d - b'0') as u16,
                Some(_) => {
                    self.pos -= 1;
                    return Err(self.unexpected());
                }
                None => {
                    return Err(SmirksError::UnexpectedEnd {
                        expected: "two ring closure digits after '%'",
                    });
                }
            }
        }
        Ok(label)
    }

    fn parse_organic_atom(&mut self) -> Result<()> {
        let position = self.pos;
        let Some(ch) = self.advance() else {
            return Err(SmirksError::UnexpectedEnd {
                expected: "an atom",
            });
        };
        let (atomic_number, aromatic) = match ch {
            b'B' if self.peek() == Some(b'r') => {
                self.advance();
                (35, false)
            }
            b'C' if self.peek() == Some(b'l') => {
                self.advance();
                (17, false)
            }
            b'B' => (5, false),
            b'C' => (6, false),
            b'N' => (7, false),
            b'O' => (8, false),
            b'P' => (15, false),
            b'S' => (16, false),
            b'F' => (9, false),
            b'I' => (53, false),
            b'b' => (5, true),
            b'c' => (6, true),
            b'n' => (7, true),
            b'o' => (8, true),
            b'p' => (15, true),
            b's' => (16, true),
            _ => {
                return Err(SmirksError::UnknownElement {
                    symbol: (ch as char).to_string(),
                    position,
                });
            }
        };
        self.add_atom(element_expr(atomic_number, aromatic), None)
    }

    fn parse_bracket_atom(&mut self) -> Result<()> {
        self.expect(b'[', "'['")?;
        self.bracket_start = self.pos;
        let expr = self.parse_atom_expr()?;
        let map_index = if self.peek() == Some(b':') {
            self.advance();
            let position = self.pos;
            let n = self.parse_number()?;
            Some(u8::try_from(n).map_err(|_| SmirksError::NumberOutOfRange { position })?)
        } else {
            None
        };
        self.expect(b']', "']'")?;
        self.add_atom(expr, map_index)
    }

    // Precedence, loosest first: ';'  ','  '&' or juxtaposition  '!'

    fn parse_atom_expr(&mut self) -> Result<AtomExpr> {
        let mut terms = vec![self.parse_atom_or()?];
        while self.peek() == Some(b';') {
            self.advance();
            terms.push(self.parse_atom_or()?);
        }
        Ok(collapse(terms, AtomExpr::And))
    }

    fn parse_atom_or(&mut self) -> Result<AtomExpr> {
        let mut terms = vec![self.parse_atom_and()?];
        while self.peek() == Some(b',') {
            self.advance();
            terms.push(self.parse_atom_and()?);
        }
        Ok(collapse(terms, AtomExpr::Or))
    }

    fn parse_atom_and(&mut self) -> Result<AtomExpr> {
        let mut terms = vec![self.parse_atom_not()?];
        loop {
            match self.peek() {
                Some(b'&') => {
                    self.advance();
                    terms.push(self.parse_atom_not()?);
                }
                Some(ch) if is_atom_primitive_start(ch) => terms.push(self.parse_atom_not()?),
                _ => break,
            }
        }
        Ok(collapse(terms, AtomExpr::And))
    }

    fn parse_atom_not(&mut self) -> Result<AtomExpr> {
        if self.peek() == Some(b'!') {
            self.advance();
            Ok(AtomExpr::Not(Box::new(self.parse_atom_not()?)))
        } else {
            self.parse_atom_primitive()
        }
    }

    fn parse_atom_primitive(&mut self) -> Result<AtomExpr> {
        let position = self.pos;
        let Some(ch) = self.peek() else {
            return Err(SmirksError::UnexpectedEnd {
                expected: "an atom primitive",
            });
        };
        let primitive = match ch {
            b'*' => {
                self.advance();
                AtomPrimitive::Any
            }
            b'#' => {
                self.advance();
                let n = self.parse_number()?;
                AtomPrimitive::AtomicNumber(
                    u8::try_from(n).map_err(|_| SmirksError::NumberOutOfRange { position })?,
                )
            }
            b'$' => {
                self.advance();
                AtomPrimitive::Recursive(self.parse_recursive()?)
            }
            b'@' => {
                self.advance();
                if self.peek() == Some(b'@') {
                    self.advance();
                    AtomPrimitive::Chirality(Chirality::Clockwise)
                } else {
                    AtomPrimitive::Chirality(Chirality::CounterClockwise)
                }
            }
            b'+' | b'-' => {
                self.advance();
                let sign: i32 = if ch == b'+' { 1 } else { -1 };
                let magnitude = if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.parse_number()?
                } else {
                    let mut count = 1;
                    while self.peek() == Some(ch) {
                        self.advance();
                        count += 1;
                    }
                    count
                };
                let charge = i32::try_from(magnitude)
                    .ok()
                    .and_then(|m| i8::try_from(sign * m).ok())
                    .ok_or(SmirksError::NumberOutOfRange { position })?;
                AtomPrimitive::Charge(charge)
            }
            c if c.is_ascii_uppercase() => return self.parse_upper_primitive(),
            c if c.is_ascii_lowercase() => return self.parse_lower_primitive(),
            _ => return Err(self.unexpected()),
        };
        Ok(AtomExpr::Primitive(primitive))
    }

    fn parse_upper_primitive(&mut self) -> Result<AtomExpr> {
        let position = self.pos;
        let ch = self.input[self.pos];

        if let Some(next) = self.peek_at(1).filter(|c| c.is_ascii_lowercase()) {
            let symbol = format!("{}{}", ch as char, next as char);
            if let Some(element) = Element::from_symbol(&symbol) {
                self.pos += 2;
                return Ok(element_expr(element.atomic_number(), false));
            }
        }

        // A leading bare H is the hydrogen atom, not a hydrogen count.
        if ch == b'H' && position == self.bracket_start {
            self.advance();
            return Ok(element_expr(1, false));
        }

        self.advance();
        let primitive = match ch {
            b'A' => AtomPrimitive::Aliphatic,
            b'D' => AtomPrimitive::Degree(self.parse_count(1)?),
            b'H' => AtomPrimitive::TotalHydrogens(self.parse_count(1)?),
            b'X' => AtomPrimitive::Connectivity(self.parse_count(1)?),
            b'R' => match self.parse_optional_count()? {
                None => AtomPrimitive::InRing(true),
                Some(0) => AtomPrimitive::InRing(false),
                Some(n) => {
                    return Err(SmirksError::Unsupported {
                        primitive: format!("R{n}"),
                        position,
                        reason: "ring membership counts need an SSSR; use R, R0, r<n> or x<n>",
                    });
                }
            },
            _ => {
                let symbol = (ch as char).to_string();
                let element = Element::from_symbol(&symbol)
                    .ok_or(SmirksError::UnknownElement { symbol, position })?;
                return Ok(element_expr(element.atomic_number(), false));
            }
        };
        Ok(AtomExpr::Primitive(primitive))
    }

    fn parse_lower_primitive(&mut self) -> Result<AtomExpr> {
        let position = self.pos;
        let ch = self.input[self.pos];

        let two = (ch, self.peek_at(1));
        if matches!(two, (b's', Some(b'e')) | (b'a', Some(b's'))) {
            self.pos += 2;
            let atomic_number = if ch == b's' { 34 } else { 33 };
            return Ok(element_expr(atomic_number, true));
        }

        self.advance();
        let primitive = match ch {
            b'a' => AtomPrimitive::Aromatic,
            b'h' => AtomPrimitive::ImplicitHydrogens(self.parse_count(1)?),
            b'v' => AtomPrimitive::Valence(self.parse_count(1)?),
            b'x' => AtomPrimitive::RingConnectivity(self.parse_count(1)?),
            b'r' => match self.parse_optional_count()? {
                None => AtomPrimitive::InRing(true),
                Some(0) => AtomPrimitive::InRing(false),
                Some(n) => AtomPrimitive::SmallestRing(n),
            },
            b'b' => return Ok(element_expr(5, true)),
            b'c' => return Ok(element_expr(6, true)),
            b'n' => return Ok(element_expr(7, true)),
            b'o' => return Ok(element_expr(8, true)),
            b'p' => return Ok(element_expr(15, true)),
            b's' => return Ok(element_expr(16, true)),
            _ => {
                return Err(SmirksError::UnknownElement {
                    symbol: (ch as char).to_string(),
                    position,
                });
            }
        };
        Ok(AtomExpr::Primitive(primitive))
    }

    fn parse_recursive(&mut self) -> Result<Arc<Pattern>> {
        if self.peek() == Some(b'(') {
            self.advance();
            let start = self.pos;
            let mut depth = 1usize;
            while let Some(ch) = self.peek() {
                match ch {
                    b'(' => depth += 1,
                    b')' => {
                        depth -= 1;
                        if depth == 0 {
                            break;
                        }
                    }
                    _ => {}
                }
                self.pos += 1;
            }
            if depth != 0 {
                return Err(SmirksError::UnbalancedBranch { position: start - 1 });
            }
            let inner = &self.source[start..self.pos];
            self.advance();
            return Ok(Arc::new(parse_smirks_with(inner, self.substructures)?));
        }

        let start = self.pos;
        while self.peek().is_some_and(is_name_char) {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(self.unexpected());
        }
        let name = &self.source[start..self.pos];
        self.substructures
            .get(name)
            .cloned()
            .ok_or_else(|| SmirksError::UnknownSubstructure(name.to_string()))
    }

    fn parse_bond_expr(&mut self) -> Result<BondExpr> {
        let mut terms = vec![self.parse_bond_or()?];
        while self.peek() == Some(b';') {
            self.advance();
            terms.push(self.parse_bond_or()?);
        }
        Ok(collapse(terms, BondExpr::And))
    }

    fn parse_bond_or(&mut self) -> Result<BondExpr> {
        let mut terms = vec![self.parse_bond_and()?];
        while self.peek() == Some(b',') {
            self.advance();
            terms.push(self.parse_bond_and()?);
        }
        Ok(collapse(terms, BondExpr::Or))
    }

    fn parse_bond_and(&mut self) -> Result<BondExpr> {
        let mut terms = vec![self.parse_bond_not()?];
        loop {
            match self.peek() {
                Some(b'&') => {
                    self.advance();
                    terms.push(self.parse_bond_not()?);
                }
                Some(ch) if is_bond_start(ch) => terms.push(self.parse_bond_not()?),
                _ => break,
            }
        }
        Ok(collapse(terms, BondExpr::And))
    }

    fn parse_bond_not(&mut self) -> Result<BondExpr> {
        if self.peek() == Some(b'!') {
            self.advance();
            return Ok(BondExpr::Not(Box::new(self.parse_bond_not()?)));
        }
        let primitive = match self.peek() {
            Some(b'-') => BondPrimitive::Single,
            Some(b'=') => BondPrimitive::Double,
            Some(b'#') => BondPrimitive::Triple,
            Some(b':') => BondPrimitive::Aromatic,
            Some(b'~') => BondPrimitive::Any,
            Some(b'@') => BondPrimitive::Ring,
            Some(b'/') => BondPrimitive::Up,
            Some(b'\\') => BondPrimitive::Down,
            Some(_) => return Err(self.unexpected()),
            None => {
                return Err(SmirksError::UnexpectedEnd {
                    expected: "a bond primitive",
                });
            }
        };
        self.advance();
        Ok(BondExpr::Primitive(primitive))
    }

    fn parse_number(&mut self) -> Result<u32> {
        let position = self.pos;
        let mut n: u32 = 0;
        let mut found = false;
        while let Some(ch) = self.peek().filter(u8::is_ascii_digit) {
            self.advance();
            n = n
                .checked_mul(10)
                .and_then(|n| n.checked_add((ch - b'0') as u32))
                .ok_or(SmirksError::NumberOutOfRange { position })?;
            found = true;
        }
        if !found {
            return Err(match self.peek() {
                Some(_) => self.unexpected(),
                None => SmirksError::UnexpectedEnd {
                    expected: "a number",
                },
            });
        }
        Ok(n)
    }

    fn parse_optional_count(&mut self) -> Result<Option<u8>> {
        if !self.peek().is_some_and(|c| c.is_ascii_digit()) {
            return Ok(None);
        }
        let position = self.pos;
        let n = self.parse_number()?;
        u8::try_from(n)
            .map(Some)
            .map_err(|_| SmirksError::NumberOutOfRange { position })
    }

    fn parse_count(&mut self, default: u8) -> Result<u8> {
        Ok(self.parse_optional_count()?.unwrap_or(default))
    }
}

fn element_expr(atomic_number: u8, aromatic: bool) -> AtomExpr {
    AtomExpr::And(vec![
        AtomExpr::Primitive(AtomPrimitive::AtomicNumber(atomic_number)),
        AtomExpr::Primitive(if aromatic {
            AtomPrimitive::Aromatic
        } else {
            AtomPrimitive::Aliphatic
        }),
    ])
}

fn collapse<T>(mut terms: Vec<T>, combine: fn(Vec<T>) -> T) -> T {
    if terms.len() == 1 {
        terms.remove(0)
    } else {
        combine(terms)
    }
}

fn is_bond_start(ch: u8) -> bool {
    matches!(
        ch,
        b'-' | b'=' | b'#' | b':' | b'~' | b'@' | b'/' | b'\\' | b'!'
    )
}

fn is_atom_primitive_start(ch: u8) -> bool {
    ch.is_ascii_alphabetic() || matches!(ch, b'*' | b'#' | b'$' | b'@' | b'+' | b'-' | b'!')
}
