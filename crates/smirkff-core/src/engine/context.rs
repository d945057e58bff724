use super::config::HandlerSelection;
use super::error::AssignError;
use super::progress::ProgressReporter;
use crate::core::forcefield::handlers::HandlerKind;
use crate::core::forcefield::params::ForceField;
use crate::core::models::topology::Topology;
use std::sync::atomic::{AtomicBool, Ordering};

/// Read-only inputs shared by every assignment task.
#[derive(Clone, Copy)]
pub struct AssignmentContext<'a> {
    pub topology: &'a Topology,
    pub forcefield: &'a ForceField,
    pub reporter: &'a ProgressReporter<'a>,
    pub selection: &'a HandlerSelection,
    pub enforce_coverage: bool,
    cancel: Option<&'a AtomicBool>,
}

impl<'a> AssignmentContext<'a> {
    pub fn new(
        topology: &'a Topology,
        forcefield: &'a ForceField,
        reporter: &'a ProgressReporter<'a>,
        selection: &'a HandlerSelection,
    ) -> Self {
        Self {
            topology,
            forcefield,
            reporter,
            selection,
            enforce_coverage: true,
            cancel: None,
        }
    }

    pub fn with_coverage(mut self, enforce: bool) -> Self {
        self.enforce_coverage = enforce;
        self
    }

    /// Tasks poll `flag` between elements and stop with
    /// [`AssignError::Cancelled`] once it is set.
    pub fn with_cancel_flag(mut self, flag: &'a AtomicBool) -> Self {
        self.cancel = Some(flag);
        self
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    pub fn check_cancelled(&self) -> Result<(), AssignError> {
        if self.is_cancelled() {
            Err(AssignError::Cancelled)
        } else {
            Ok(())
        }
    }

    pub fn wants(&self, kind: HandlerKind) -> bool {
        self.selection.contains(kind)
    }

    /// Joins element symbols and indices, e.g. `C0-C1-H5`.
    pub fn atom_labels(&self, atoms: &[usize]) -> String {
        atoms
            .iter()
            .map(|&i| match self.topology.atom(i) {
                Some(atom) if !atom.name.is_empty() => format!("{}({})", atom.name, i),
                Some(atom) => format!("{}{}", atom.element, i),
                None => format!("?{i}"),
            })
            .collect::<Vec<_>>()
            .join("-")
    }

    pub fn coverage_error(
        &self,
        handler: HandlerKind,
        element: &'static str,
        atoms: &[usize],
    ) -> AssignError {
        AssignError::Coverage {
            handler,
            element,
            atoms: atoms.to_vec(),
            labels: self.atom_labels(atoms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::Atom;
    use crate::core::models::element::Element;
    use crate::core::models::topology::{Bond, BondOrder};

    fn water() -> Topology {
        let atoms = vec![
            Atom::new(Element::O).with_name("OW"),
            Atom::new(Element::H),
            Atom::new(Element::H),
        ];
        let bonds = vec![
            Bond::new(0, 1, BondOrder::Single),
            Bond::new(0, 2, BondOrder::Single),
        ];
        Topology::new(atoms, bonds).unwrap()
    }

    #[test]
    fn cancel_flag_is_observed() {
        let topology = water();
        let forcefield = ForceField::empty();
        let reporter = ProgressReporter::new();
        let selection = HandlerSelection::All;
        let flag = AtomicBool::new(false);
        let context = AssignmentContext::new(&topology, &forcefield, &reporter, &selection)
            .with_cancel_flag(&flag);

        assert!(context.check_cancelled().is_ok());
        flag.store(true, Ordering::Relaxed);
        assert!(matches!(
            context.check_cancelled(),
            Err(AssignError::Cancelled)
        ));
    }

    #[test]
    fn labels_prefer_atom_names() {
        let topology = water();
        let forcefield = ForceField::empty();
        let reporter = ProgressReporter::new();
        let selection = HandlerSelection::All;
        let context = AssignmentContext::new(&topology, &forcefield, &reporter, &selection);
        assert_eq!(context.atom_labels(&[1, 0, 2]), "H1-OW(0)-H2");

        let err = context.coverage_error(HandlerKind::Vdw, "atom", &[2]);
        assert_eq!(
            err.to_string(),
            "No 'vdW' rule matches atom H2 (atoms [2])"
        );
    }
}
