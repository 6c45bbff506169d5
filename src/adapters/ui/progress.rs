//! indicatif helpers: per-phase score bars and a spinner for slow operations.

use crate::domain::PhaseProgress;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use std::time::Duration;

const PHASE_TEMPLATE: &str = "{prefix:>20.bold} [{bar:30.yellow/white}] {pos:>3} %  {msg}";

fn phase_style() -> ProgressStyle {
    ProgressStyle::with_template(PHASE_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▓░")
}

/// One bar per phase, left drawn after return.
pub fn show_phases(phases: &BTreeMap<String, PhaseProgress>) {
    let multi = MultiProgress::new();
    for (phase, p) in phases {
        let bar = multi.add(ProgressBar::new(100));
        bar.set_style(phase_style());
        bar.set_prefix(phase.clone());
        bar.set_message(format!("{}/{} tâches", p.done, p.total));
        bar.set_position(u64::from(p.score));
        bar.abandon();
    }
}

/// Spinner shown while `message` runs. Caller finishes it with `finish_and_clear`.
pub fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.yellow} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
