//! Pure progress aggregation strategies.
//!
//! Each function computes a percentage in [0,100] from an in-memory
//! snapshot and performs no I/O. Values are kept as `f64` here; rounding
//! to the persisted integer happens only at the store boundary so that
//! averaging across hierarchy levels does not compound rounding error.

use crate::goals::store::{ChildProgress, KeyResultMeasure, ProjectTaskFlags};

/// Mean of per-key-result completion ratios, each clamped to [0,100].
///
/// A zero-range key result (target == start) counts as all-or-nothing:
/// 100 once the current value has reached the target, 0 before.
pub fn from_key_results(key_results: &[KeyResultMeasure]) -> f64 {
    if key_results.is_empty() {
        return 0.0;
    }
    let sum: f64 = key_results
        .iter()
        .map(|kr| {
            let range = kr.target_value - kr.start_value;
            if range == 0.0 {
                if kr.current_value >= kr.target_value {
                    100.0
                } else {
                    0.0
                }
            } else {
                ((kr.current_value - kr.start_value) / range * 100.0).clamp(0.0, 100.0)
            }
        })
        .sum();
    sum / key_results.len() as f64
}

/// Mean of the children's stored progress values.
pub fn from_sub_objectives(children: &[ChildProgress]) -> f64 {
    if children.is_empty() {
        return 0.0;
    }
    let sum: i64 = children.iter().map(|c| i64::from(c.progress)).sum();
    sum as f64 / children.len() as f64
}

/// Completed share of top-level tasks across all linked projects.
pub fn from_projects(projects: &[ProjectTaskFlags]) -> f64 {
    let total: usize = projects.iter().map(|p| p.tasks.len()).sum();
    if total == 0 {
        return 0.0;
    }
    let completed: usize = projects
        .iter()
        .map(|p| p.tasks.iter().filter(|done| **done).count())
        .sum();
    completed as f64 / total as f64 * 100.0
}

/// Manual objectives keep whatever the user stored.
pub fn manual(stored_progress: i32) -> f64 {
    f64::from(stored_progress)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn kr(start: f64, current: f64, target: f64) -> KeyResultMeasure {
        KeyResultMeasure {
            start_value: start,
            current_value: current,
            target_value: target,
        }
    }

    fn child(progress: i32) -> ChildProgress {
        ChildProgress {
            id: Uuid::new_v4(),
            progress,
        }
    }

    fn project(tasks: &[bool]) -> ProjectTaskFlags {
        ProjectTaskFlags {
            project_id: Uuid::new_v4(),
            tasks: tasks.to_vec(),
        }
    }

    #[test]
    fn key_results_empty_set_is_zero() {
        assert_eq!(from_key_results(&[]), 0.0);
    }

    #[test]
    fn key_results_halfway_and_zero_range() {
        // start=0 target=10 current=5 -> 50%; zero-range at target -> 100%.
        let value = from_key_results(&[kr(0.0, 5.0, 10.0), kr(10.0, 10.0, 10.0)]);
        assert_eq!(value, 75.0);
    }

    #[test]
    fn key_results_zero_range_below_target_is_zero() {
        assert_eq!(from_key_results(&[kr(10.0, 9.0, 10.0)]), 0.0);
    }

    #[test]
    fn key_results_overshoot_clamps_to_100() {
        assert_eq!(from_key_results(&[kr(0.0, 250.0, 100.0)]), 100.0);
    }

    #[test]
    fn key_results_regression_clamps_to_0() {
        assert_eq!(from_key_results(&[kr(50.0, 10.0, 100.0)]), 0.0);
    }

    #[test]
    fn key_results_decreasing_target() {
        // Driving a value down from 100 to 20, currently at 60 -> 50%.
        assert_eq!(from_key_results(&[kr(100.0, 60.0, 20.0)]), 50.0);
    }

    #[test]
    fn key_results_all_met_is_100() {
        let value = from_key_results(&[kr(0.0, 10.0, 10.0), kr(5.0, 30.0, 20.0)]);
        assert_eq!(value, 100.0);
    }

    #[test]
    fn key_results_stay_in_range() {
        let value = from_key_results(&[
            kr(0.0, -500.0, 10.0),
            kr(0.0, 500.0, 10.0),
            kr(3.0, 3.0, 3.0),
        ]);
        assert!((0.0..=100.0).contains(&value));
    }

    #[test]
    fn sub_objectives_empty_set_is_zero() {
        assert_eq!(from_sub_objectives(&[]), 0.0);
    }

    #[test]
    fn sub_objectives_mean_is_unrounded() {
        let value = from_sub_objectives(&[child(33), child(33), child(34)]);
        assert!((value - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn sub_objectives_mean_of_stored_progress() {
        assert_eq!(from_sub_objectives(&[child(0), child(100)]), 50.0);
    }

    #[test]
    fn projects_no_tasks_is_zero() {
        assert_eq!(from_projects(&[]), 0.0);
        assert_eq!(from_projects(&[project(&[])]), 0.0);
    }

    #[test]
    fn projects_quarter_complete() {
        let value = from_projects(&[project(&[true, false, false, false])]);
        assert_eq!(value, 25.0);
    }

    #[test]
    fn projects_counts_across_all_linked_projects() {
        let value = from_projects(&[project(&[true, true]), project(&[false, false])]);
        assert_eq!(value, 50.0);
    }

    #[test]
    fn manual_returns_stored_value() {
        assert_eq!(manual(42), 42.0);
        assert_eq!(manual(0), 0.0);
    }
}
