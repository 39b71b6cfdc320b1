//! Live progress indicator and per-entry error lines.

use indicatif::{ProgressBar, ProgressStyle};

use crate::extract::TaskOutcome;

/// Renders a `pos/len` bar with rate and ETA on stderr and prints one error
/// line per failed entry above it.
///
/// Outcomes arrive in completion order; each is reported exactly once. When
/// stderr is not a terminal the bar is inert, but error lines still print.
pub struct Reporter {
    bar: ProgressBar,
}

impl Reporter {
    pub fn new(total: u64) -> Self {
        let bar = ProgressBar::new(total);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] [{wide_bar}] {pos}/{len} ({per_sec}, ETA {eta})")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        Self { bar }
    }

    /// Record one completed task: advance the bar, and surface the failure
    /// inline without disturbing the bar's rendering.
    pub fn observe(&mut self, outcome: &TaskOutcome) {
        if let Some(error) = &outcome.error {
            // A hidden bar (stderr is not a terminal) swallows println.
            if self.bar.is_hidden() {
                eprintln!("ERROR: {}: {error}", outcome.entry_name);
            } else {
                self.bar
                    .println(format!("ERROR: {}: {error}", outcome.entry_name));
            }
        }
        self.bar.inc(1);
    }

    pub fn finish(self) {
        self.bar.finish();
    }
}
