//! Tasks that resolve one interaction class each.
//!
//! Every task enumerates its structural elements in canonical order, resolves
//! them independently (in parallel with the `parallel` feature), then checks
//! coverage and cancellation before assembling its part of the assignment.

use super::context::AssignmentContext;
use super::error::AssignError;
use super::progress::Progress;
use crate::core::forcefield::handlers::Handler;
use crate::core::forcefield::parameterization::{Resolution, resolve};
use std::collections::HashSet;
use tracing::{debug, warn};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

pub mod charges;
pub mod impropers;
pub mod nonbonded;
pub mod valence;

/// Resolves every element against `handler`.
///
/// `orientations` lists the atom orders a rule may match an element in. The
/// result is aligned with `elements`.
pub(crate) fn resolve_elements<'h, P, S, E>(
    context: &AssignmentContext<'_>,
    handler: &'h Handler<P, S>,
    elements: &[E],
    orientations: impl Fn(&E) -> Vec<Vec<usize>> + Sync,
) -> Result<Vec<Option<Resolution<'h, P>>>, AssignError>
where
    P: Sync,
    S: Sync,
    E: Sync,
{
    context.reporter.report(Progress::HandlerStart {
        handler: handler.kind,
        elements: elements.len() as u64,
    });

    #[cfg(not(feature = "parallel"))]
    let iterator = elements.iter();

    #[cfg(feature = "parallel")]
    let iterator = elements.par_iter();

    let resolved: Vec<Option<Resolution<'h, P>>> = iterator
        .map(|element| {
            if context.is_cancelled() {
                return None;
            }
            let hit = resolve(handler, context.topology, &orientations(element));
            context.reporter.report(Progress::ElementResolved);
            hit
        })
        .collect();

    context.check_cancelled()?;
    context.reporter.report(Progress::HandlerFinish {
        handler: handler.kind,
        matched: resolved.iter().filter(|r| r.is_some()).count() as u64,
    });

    log_unused_rules(handler, &resolved);
    Ok(resolved)
}

/// Fails on the first unmatched element of a required handler, or logs the
/// unmatched count otherwise.
pub(crate) fn check_coverage<P, S, E>(
    context: &AssignmentContext<'_>,
    handler: &Handler<P, S>,
    element: &'static str,
    elements: &[E],
    resolved: &[Option<Resolution<'_, P>>],
    atoms_of: impl Fn(&E) -> Vec<usize>,
) -> Result<(), AssignError> {
    let mut unmatched = elements
        .iter()
        .zip(resolved)
        .filter(|(_, r)| r.is_none())
        .map(|(e, _)| atoms_of(e))
        .peekable();

    let Some(first) = unmatched.peek().cloned() else {
        return Ok(());
    };
    if handler.required && context.enforce_coverage {
        return Err(context.coverage_error(handler.kind, element, &first));
    }
    let count = unmatched.count();
    if handler.required {
        warn!(
            handler = %handler.kind,
            count,
            first = %context.atom_labels(&first),
            "Required handler left elements unassigned."
        );
    } else {
        debug!(handler = %handler.kind, count, "Elements without a matching rule.");
    }
    Ok(())
}

fn log_unused_rules<P, S>(handler: &Handler<P, S>, resolved: &[Option<Resolution<'_, P>>]) {
    let used: HashSet<u64> = resolved
        .iter()
        .flatten()
        .map(|r| r.rule.sequence)
        .collect();
    for rule in handler.rules.iter().filter(|r| !used.contains(&r.sequence)) {
        debug!(handler = %handler.kind, rule_id = %rule.id, "Rule assigned no element.");
    }
}
