use crate::core::forcefield::handlers::HandlerKind;
use std::fmt;

/// Stages of an assignment run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Loading,
    Valence,
    Torsions,
    Nonbonded,
    Charges,
}

impl Stage {
    pub fn label(self) -> &'static str {
        match self {
            Self::Loading => "Loading",
            Self::Valence => "Valence",
            Self::Torsions => "Torsions",
            Self::Nonbonded => "Nonbonded",
            Self::Charges => "Charges",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Events emitted while parameters are assigned.
///
/// Handler events nest inside a stage. `ElementResolved` may arrive from
/// several worker threads at once and in any order.
#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    StageStart(Stage),
    StageFinish(Stage),

    /// A handler starts resolving `elements` structural elements.
    HandlerStart { handler: HandlerKind, elements: u64 },
    ElementResolved,
    /// `matched` of the handler's elements found a rule.
    HandlerFinish { handler: HandlerKind, matched: u64 },
}

pub type ProgressCallback<'a> = Box<dyn Fn(Progress) + Send + Sync + 'a>;

#[derive(Default)]
pub struct ProgressReporter<'a> {
    callback: Option<ProgressCallback<'a>>,
}

impl<'a> ProgressReporter<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_callback(callback: ProgressCallback<'a>) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    #[inline]
    pub fn report(&self, event: Progress) {
        if let Some(cb) = &self.callback {
            cb(event);
        }
    }

    /// Runs `body` between the start and finish events of `stage`. The finish
    /// event is sent whether or not `body` fails.
    pub fn stage<T>(&self, stage: Stage, body: impl FnOnce() -> T) -> T {
        self.report(Progress::StageStart(stage));
        let result = body();
        self.report(Progress::StageFinish(stage));
        result
    }
}
