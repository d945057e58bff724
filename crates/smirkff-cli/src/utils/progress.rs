use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};
use smirkff::engine::progress::{Progress, ProgressCallback, Stage};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::warn;

const SPINNER_TICK_MS: u64 = 100;

#[derive(Default)]
struct Lines {
    stage: Option<ProgressBar>,
    handler: Option<ProgressBar>,
}

/// Draws assignment progress on stderr: a spinner for the running stage and,
/// beneath it, one bar per handler that stays behind with its match count.
#[derive(Clone)]
pub struct CliProgressHandler {
    multi: MultiProgress,
    lines: Arc<Mutex<Lines>>,
}

impl CliProgressHandler {
    pub fn new() -> Self {
        Self::with_draw_target(ProgressDrawTarget::stderr())
    }

    fn with_draw_target(target: ProgressDrawTarget) -> Self {
        Self {
            multi: MultiProgress::with_draw_target(target),
            lines: Arc::default(),
        }
    }

    pub fn get_callback(&self) -> ProgressCallback<'static> {
        let handler = self.clone();
        Box::new(move |event| handler.handle(event))
    }

    fn handle(&self, event: Progress) {
        let Ok(mut lines) = self.lines.lock() else {
            warn!("Progress state mutex was poisoned. Cannot update progress.");
            return;
        };

        match event {
            Progress::StageStart(stage) => {
                let spinner = self.multi.add(
                    ProgressBar::new_spinner()
                        .with_style(spinner_style())
                        .with_message(stage.label()),
                );
                spinner.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MS));
                lines.stage = Some(spinner);
            }
            Progress::StageFinish(stage) => {
                lines.handler = None;
                if let Some(spinner) = lines.stage.take() {
                    spinner.finish_with_message(finished_stage(stage));
                }
            }
            Progress::HandlerStart { handler, elements } => {
                let bar = self.multi.add(
                    ProgressBar::new(elements)
                        .with_style(bar_style())
                        .with_message(handler.as_str()),
                );
                lines.handler = Some(bar);
            }
            Progress::ElementResolved => {
                if let Some(bar) = &lines.handler {
                    bar.inc(1);
                }
            }
            Progress::HandlerFinish { handler, matched } => {
                if let Some(bar) = &lines.handler {
                    let total = bar.length().unwrap_or(0);
                    bar.set_position(total);
                    bar.finish_with_message(format!("{handler}: {matched}/{total} matched"));
                }
            }
        }
    }
}

impl Default for CliProgressHandler {
    fn default() -> Self {
        Self::new()
    }
}

fn finished_stage(stage: Stage) -> String {
    format!("✓ {stage}")
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.green} {msg}")
        .expect("Failed to create spinner style template")
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template("  {msg:<32} [{bar:30.cyan/blue}] {pos}/{len}")
        .expect("Failed to create bar style template")
        .progress_chars("=> ")
}
