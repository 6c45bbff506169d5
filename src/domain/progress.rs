//! Weighted completion scoring.
//!
//! Score = Σ weight of done tasks ÷ Σ weight of all tasks, as a rounded percentage.
//! Used by the overview, checklist and dashboard screens, globally and per phase.

use crate::domain::entities::{TaskStatus, WeightedTask};
use serde::Serialize;
use std::collections::BTreeMap;

/// Per-phase result: weighted score plus raw task counts ("x/y tâches").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PhaseProgress {
    pub score: u8,
    pub total: usize,
    pub done: usize,
}

/// Round half up to the nearest integer, as shown on progress bars.
pub(crate) fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

/// `100 * part / whole`, rounded. None when `whole` is not strictly positive.
pub(crate) fn rounded_percent(part: f64, whole: f64) -> Option<f64> {
    if whole > 0.0 && whole.is_finite() {
        Some(round_half_up(100.0 * part / whole))
    } else {
        None
    }
}

/// Negative or non-finite weights count as zero.
fn effective_weight(weight: f64) -> f64 {
    if weight.is_finite() && weight > 0.0 {
        weight
    } else {
        0.0
    }
}

/// Completion percentage in `0..=100`.
///
/// Returns 0 for an empty list or when every weight is zero.
pub fn compute_progress<'a, I>(tasks: I) -> u8
where
    I: IntoIterator<Item = &'a WeightedTask>,
{
    let (done, total) = tasks.into_iter().fold((0.0_f64, 0.0_f64), |(done, total), t| {
        let w = effective_weight(t.weight);
        if t.status == TaskStatus::Done {
            (done + w, total + w)
        } else {
            (done, total + w)
        }
    });
    rounded_percent(done, total)
        .map(|p| p.clamp(0.0, 100.0) as u8)
        .unwrap_or(0)
}

/// Groups tasks by phase and scores each group independently.
/// Only phases present in the input appear in the result.
pub fn compute_progress_by_phase(tasks: &[WeightedTask]) -> BTreeMap<String, PhaseProgress> {
    let mut groups: BTreeMap<&str, Vec<&WeightedTask>> = BTreeMap::new();
    for task in tasks {
        groups.entry(task.phase.as_str()).or_default().push(task);
    }

    groups
        .into_iter()
        .map(|(phase, group)| {
            let done = group
                .iter()
                .filter(|t| t.status == TaskStatus::Done)
                .count();
            let progress = PhaseProgress {
                score: compute_progress(group.iter().copied()),
                total: group.len(),
                done,
            };
            (phase.to_string(), progress)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn task(phase: &str, weight: f64, status: TaskStatus) -> WeightedTask {
        WeightedTask {
            id: format!("{}-{}", phase, weight),
            phase: phase.to_string(),
            weight,
            status,
        }
    }

    #[test]
    fn test_empty_is_zero() {
        let tasks: Vec<WeightedTask> = Vec::new();
        assert_eq!(compute_progress(&tasks), 0);
    }

    #[test]
    fn test_zero_weights_is_zero() {
        let tasks = vec![
            task("A", 0.0, TaskStatus::Done),
            task("A", 0.0, TaskStatus::NotStarted),
        ];
        assert_eq!(compute_progress(&tasks), 0);
    }

    #[test]
    fn test_weighted_example() {
        let tasks = vec![
            task("A", 10.0, TaskStatus::Done),
            task("A", 10.0, TaskStatus::NotStarted),
            task("A", 5.0, TaskStatus::Done),
        ];
        assert_eq!(compute_progress(&tasks), 60);
    }

    #[test]
    fn test_rounds_half_up() {
        // 1 / 8 = 12.5%
        let tasks = vec![
            task("A", 1.0, TaskStatus::Done),
            task("A", 7.0, TaskStatus::InProgress),
        ];
        assert_eq!(compute_progress(&tasks), 13);
    }

    #[test]
    fn test_blocked_and_in_progress_do_not_count() {
        let tasks = vec![
            task("A", 10.0, TaskStatus::Blocked),
            task("A", 10.0, TaskStatus::InProgress),
        ];
        assert_eq!(compute_progress(&tasks), 0);
    }

    #[test]
    fn test_negative_weight_counts_as_zero() {
        let tasks = vec![
            task("A", -50.0, TaskStatus::NotStarted),
            task("A", 10.0, TaskStatus::Done),
        ];
        assert_eq!(compute_progress(&tasks), 100);
    }

    #[test]
    fn test_by_phase_example() {
        let tasks = vec![
            task("A", 10.0, TaskStatus::Done),
            task("B", 20.0, TaskStatus::NotStarted),
        ];
        let result = compute_progress_by_phase(&tasks);
        assert_eq!(result.len(), 2);
        assert_eq!(
            result["A"],
            PhaseProgress {
                score: 100,
                total: 1,
                done: 1
            }
        );
        assert_eq!(
            result["B"],
            PhaseProgress {
                score: 0,
                total: 1,
                done: 0
            }
        );
    }

    #[test]
    fn test_by_phase_counts_tasks_not_weights() {
        let tasks = vec![
            task("Études", 30.0, TaskStatus::Done),
            task("Études", 10.0, TaskStatus::NotStarted),
            task("Études", 10.0, TaskStatus::NotStarted),
        ];
        let result = compute_progress_by_phase(&tasks);
        let etudes = result["Études"];
        assert_eq!(etudes.score, 60);
        assert_eq!(etudes.total, 3);
        assert_eq!(etudes.done, 1);
    }

    #[test]
    fn test_by_phase_empty() {
        assert!(compute_progress_by_phase(&[]).is_empty());
    }

    fn status_strategy() -> impl Strategy<Value = TaskStatus> {
        prop_oneof![
            Just(TaskStatus::NotStarted),
            Just(TaskStatus::InProgress),
            Just(TaskStatus::Done),
            Just(TaskStatus::Blocked),
        ]
    }

    fn tasks_strategy() -> impl Strategy<Value = Vec<WeightedTask>> {
        prop::collection::vec(
            (0u32..4, -20i32..100, status_strategy()).prop_map(|(p, w, s)| {
                task(&format!("P{}", p), f64::from(w), s)
            }),
            0..40,
        )
    }

    proptest! {
        #[test]
        fn prop_progress_in_range(tasks in tasks_strategy()) {
            let p = compute_progress(&tasks);
            prop_assert!(p <= 100);
        }

        #[test]
        fn prop_progress_order_invariant(tasks in tasks_strategy()) {
            let mut reversed = tasks.clone();
            reversed.reverse();
            prop_assert_eq!(compute_progress(&tasks), compute_progress(&reversed));
        }

        #[test]
        fn prop_all_done_is_hundred(weights in prop::collection::vec(1i32..100, 1..20)) {
            let tasks: Vec<_> = weights
                .iter()
                .map(|w| task("A", f64::from(*w), TaskStatus::Done))
                .collect();
            prop_assert_eq!(compute_progress(&tasks), 100);
        }

        #[test]
        fn prop_none_done_is_zero(tasks in tasks_strategy()) {
            let pending: Vec<_> = tasks
                .into_iter()
                .filter(|t| t.status != TaskStatus::Done)
                .collect();
            prop_assert_eq!(compute_progress(&pending), 0);
        }

        #[test]
        fn prop_by_phase_only_input_phases(tasks in tasks_strategy()) {
            let result = compute_progress_by_phase(&tasks);
            for phase in result.keys() {
                prop_assert!(tasks.iter().any(|t| &t.phase == phase));
            }
            let total: usize = result.values().map(|p| p.total).sum();
            prop_assert_eq!(total, tasks.len());
        }
    }
}
