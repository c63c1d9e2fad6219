//! Per-node progress rule.
//!
//! This is the single place encoding the business rule that only completed
//! states earn credit: "in review", "active" and "resolved" items count as
//! 0% until they reach a completed state. Pure functions, no I/O, so the
//! rule can be exercised in isolation.

use crate::domain::{ProgressResult, WorkItemRef};

/// States that count as 100% complete. Everything else, including
/// unrecognized state names, counts as 0%.
const COMPLETED_STATES: [&str; 3] = ["Done", "Closed", "Completed"];

/// Map a work item state to its leaf progress percentage.
pub fn state_progress(state: &str) -> u8 {
    if COMPLETED_STATES.contains(&state) {
        100
    } else {
        0
    }
}

/// Average the already-computed progress of a set of children, rounding
/// half-up to the nearest integer. An empty set yields 0.
pub fn calculate_progress(children: &[ProgressResult]) -> u8 {
    if children.is_empty() {
        return 0;
    }
    let total: u32 = children.iter().map(|c| u32::from(c.progress)).sum();
    // Mean of values in [0, 100] stays in [0, 100]
    (f64::from(total) / children.len() as f64).round() as u8
}

/// Progress of a single item given its finalized children: leaf items take
/// their state-derived value, parents take the rounded mean of their
/// children's progress.
pub fn calculate_item_progress(item: &WorkItemRef, children: &[ProgressResult]) -> u8 {
    if children.is_empty() {
        state_progress(&item.state)
    } else {
        calculate_progress(children)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RelationshipKind;

    fn leaf(state: &str) -> WorkItemRef {
        WorkItemRef {
            id: "1".to_string(),
            title: "Leaf".to_string(),
            state: state.to_string(),
            work_item_type: "Task".to_string(),
            release: None,
            relationship: None,
        }
    }

    fn resolved(progress: u8) -> ProgressResult {
        ProgressResult {
            item: leaf(if progress == 100 { "Done" } else { "New" }),
            progress,
            has_children: false,
        }
    }

    #[test]
    fn test_completed_states_map_to_100() {
        for state in ["Done", "Closed", "Completed"] {
            assert_eq!(state_progress(state), 100, "state {}", state);
        }
    }

    #[test]
    fn test_other_states_map_to_0() {
        for state in ["New", "Active", "In Review", "Resolved", "Committed", "", "Bogus"] {
            assert_eq!(state_progress(state), 0, "state {:?}", state);
        }
    }

    #[test]
    fn test_leaf_progress_comes_from_state() {
        assert_eq!(calculate_item_progress(&leaf("Done"), &[]), 100);
        assert_eq!(calculate_item_progress(&leaf("Active"), &[]), 0);
    }

    #[test]
    fn test_parent_progress_ignores_own_state() {
        let children = vec![resolved(100), resolved(0)];
        // A "New" parent with half-done children is 50%, not 0%
        assert_eq!(calculate_item_progress(&leaf("New"), &children), 50);
    }

    #[test]
    fn test_mean_rounds_down_below_half() {
        let children = vec![resolved(100), resolved(0), resolved(0)];
        // 33.33... rounds to 33
        assert_eq!(calculate_progress(&children), 33);
    }

    #[test]
    fn test_mean_rounds_half_up() {
        let children = vec![resolved(34), resolved(33)];
        // 33.5 rounds to 34
        assert_eq!(calculate_progress(&children), 34);
    }

    #[test]
    fn test_exact_mean_is_unchanged() {
        let children = vec![resolved(33), resolved(33)];
        assert_eq!(calculate_progress(&children), 33);
    }

    #[test]
    fn test_empty_children_average_to_zero() {
        assert_eq!(calculate_progress(&[]), 0);
    }

    #[test]
    fn test_backlog_item_with_five_tasks() {
        // 2 done, 3 not started: round((100+100+0+0+0)/5) = 40
        let children = vec![
            resolved(100),
            resolved(100),
            resolved(0),
            resolved(0),
            resolved(0),
        ];
        assert_eq!(calculate_item_progress(&leaf("Active"), &children), 40);
    }

    #[test]
    fn test_related_children_count_like_any_other() {
        let mut related = resolved(100);
        related.item.relationship = Some(RelationshipKind::Related);
        let children = vec![related, resolved(0)];
        assert_eq!(calculate_progress(&children), 50);
    }
}
