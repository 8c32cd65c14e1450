use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::progress::{ProgressState, ProgressTracker};

const BAR_TEMPLATE: &str = "{prefix} [{bar:40.cyan/blue}] {pos:>5}/{len:<5} {msg}";
const SPINNER_TEMPLATE: &str = "{spinner:.green} {prefix} {pos:>5} {msg}";

/// Mirrors tracker slots onto indicatif bars. Holds no download state of its
/// own beyond which bars are already finished.
pub struct ProgressRenderer {
    _multi: MultiProgress,
    bars: Vec<ProgressBar>,
    sized: Vec<bool>,
    finished: Vec<bool>,
}

impl ProgressRenderer {
    pub fn new(labels: &[String], target: ProgressDrawTarget) -> Self {
        let multi = MultiProgress::with_draw_target(target);
        let bars = labels
            .iter()
            .map(|label| {
                let pb = multi.add(ProgressBar::new(0));
                pb.set_style(spinner_style());
                pb.set_prefix(format!("Downloading {}", label));
                pb
            })
            .collect::<Vec<_>>();
        let n = bars.len();
        Self {
            _multi: multi,
            bars,
            sized: vec![false; n],
            finished: vec![false; n],
        }
    }

    /// Reads every slot and updates its bar.
    pub fn refresh(&mut self, tracker: &ProgressTracker) {
        for state in tracker.snapshot_all() {
            self.apply(&state);
        }
    }

    fn apply(&mut self, state: &ProgressState) {
        let i = state.index;
        let Some(pb) = self.bars.get(i) else {
            return;
        };
        if self.finished[i] {
            return;
        }

        if !self.sized[i] {
            if let Some(max) = state.display_max() {
                pb.set_length(max);
                pb.set_style(bar_style());
                self.sized[i] = true;
            }
        }

        pb.set_position(state.display());

        if state.status.is_terminal() {
            let label = state
                .label
                .clone()
                .unwrap_or_else(|| state.status.label().to_string());
            pb.finish_with_message(label);
            self.finished[i] = true;
        } else {
            pb.tick();
        }
    }

    pub fn all_finished(&self) -> bool {
        self.finished.iter().all(|f| *f)
    }
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template(BAR_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=>-")
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::with_template(SPINNER_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}
