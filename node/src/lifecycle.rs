//! Goal execution state machine.
//!
//! Pure except for the injectable per-step delay: given an order, a cancel
//! token, and a feedback sink, [`run_goal`] produces the terminal outcome the
//! server reports. Tests run it with `Duration::ZERO` for determinism; the
//! node binary passes a real delay to model slow work and open a cancellation
//! window.

use std::thread;
use std::time::Duration;

use crate::goal::CancelToken;

/// Terminal outcome of executing an accepted goal.
///
/// Every accepted goal ends in exactly one of these; the partial sequence of
/// a canceled goal is always a prefix of what the full run would have built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GoalOutcome {
    Succeeded(Vec<i64>),
    Canceled(Vec<i64>),
}

impl GoalOutcome {
    pub fn sequence(&self) -> &[i64] {
        match self {
            Self::Succeeded(seq) | Self::Canceled(seq) => seq,
        }
    }

    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled(_))
    }
}

/// Acceptance rule: negative orders are rejected. Rejection is a normal
/// protocol outcome, not an error.
pub fn accepts_order(order: i64) -> bool {
    order >= 0
}

/// Execute one accepted goal to its terminal outcome.
///
/// For `order >= 2` the sequence starts `[0, 1]` and each further step first
/// checks the cancel token, then appends the next element, then invokes
/// `on_feedback` with the sequence so far, then sleeps `step_delay`. The
/// token is checked once more after the loop: a cancel that lands during the
/// final step's delay must still be honored before success is declared.
///
/// An order large enough to overflow `i64` succeeds early with the longest
/// representable prefix instead of wrapping or panicking.
pub fn run_goal(
    order: i64,
    cancel: &CancelToken,
    step_delay: Duration,
    mut on_feedback: impl FnMut(&[i64]),
) -> GoalOutcome {
    let mut sequence: Vec<i64> = Vec::new();
    if order == 1 {
        sequence.push(0);
    } else if order >= 2 {
        sequence.extend([0, 1]);
        for i in 2..order as usize {
            if cancel.is_canceled() {
                return GoalOutcome::Canceled(sequence);
            }
            // i64 holds elements up to index 92; beyond that the goal
            // succeeds with the longest representable prefix.
            let Some(next) = sequence[i - 1].checked_add(sequence[i - 2]) else {
                break;
            };
            sequence.push(next);
            on_feedback(&sequence);
            if !step_delay.is_zero() {
                thread::sleep(step_delay);
            }
        }
    }

    if cancel.is_canceled() {
        return GoalOutcome::Canceled(sequence);
    }
    GoalOutcome::Succeeded(sequence)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_plain(order: i64) -> GoalOutcome {
        run_goal(order, &CancelToken::new(), Duration::ZERO, |_| {})
    }

    #[test]
    fn negative_orders_are_rejected() {
        assert!(!accepts_order(-1));
        assert!(accepts_order(0));
        assert!(accepts_order(10));
    }

    #[test]
    fn order_zero_succeeds_with_empty_sequence() {
        assert_eq!(run_plain(0), GoalOutcome::Succeeded(vec![]));
    }

    #[test]
    fn order_one_succeeds_with_single_element() {
        assert_eq!(run_plain(1), GoalOutcome::Succeeded(vec![0]));
    }

    #[test]
    fn order_eight_builds_full_sequence() {
        assert_eq!(
            run_plain(8),
            GoalOutcome::Succeeded(vec![0, 1, 1, 2, 3, 5, 8, 13])
        );
    }

    #[test]
    fn sequence_length_equals_order() {
        for order in 2..20 {
            let outcome = run_plain(order);
            assert_eq!(outcome.sequence().len(), order as usize);
        }
    }

    /// Orders past the largest representable element succeed with the full
    /// `i64` prefix rather than overflowing.
    #[test]
    fn huge_order_stops_at_representable_prefix() {
        let outcome = run_plain(95);
        let sequence = outcome.sequence();

        assert!(!outcome.is_canceled());
        assert_eq!(sequence.len(), 93);
        assert_eq!(*sequence.last().expect("nonempty"), 7_540_113_804_746_346_429);
        for i in 2..sequence.len() {
            assert_eq!(sequence[i], sequence[i - 1] + sequence[i - 2]);
        }
    }

    /// Feedback messages are strictly increasing prefixes of the terminal
    /// sequence and there are `order - 2` of them.
    #[test]
    fn feedback_is_monotonic_prefix_chain() {
        let mut seen: Vec<Vec<i64>> = Vec::new();
        let outcome = run_goal(7, &CancelToken::new(), Duration::ZERO, |partial| {
            seen.push(partial.to_vec());
        });

        assert_eq!(seen.len(), 5);
        for (index, partial) in seen.iter().enumerate() {
            assert_eq!(partial.len(), index + 3);
            assert_eq!(&outcome.sequence()[..partial.len()], partial.as_slice());
        }
    }

    #[test]
    fn cancel_before_start_yields_initial_prefix() {
        let cancel = CancelToken::new();
        cancel.request();
        let outcome = run_goal(10, &cancel, Duration::ZERO, |_| {});
        assert_eq!(outcome, GoalOutcome::Canceled(vec![0, 1]));
    }

    /// Cancel observed at a loop checkpoint: the partial built so far is
    /// returned and no further feedback is published.
    #[test]
    fn cancel_mid_loop_returns_partial() {
        let cancel = CancelToken::new();
        let canceler = cancel.clone();
        let mut feedback_count = 0;
        let outcome = run_goal(10, &cancel, Duration::ZERO, |partial| {
            feedback_count += 1;
            if partial.len() == 6 {
                canceler.request();
            }
        });

        assert_eq!(outcome, GoalOutcome::Canceled(vec![0, 1, 1, 2, 3, 5]));
        assert_eq!(feedback_count, 4);
    }

    /// A cancel that lands while the final element is being processed is
    /// caught by the post-loop checkpoint, with the full sequence as the
    /// canceled partial.
    #[test]
    fn cancel_during_final_feedback_is_honored() {
        let cancel = CancelToken::new();
        let canceler = cancel.clone();
        let outcome = run_goal(5, &cancel, Duration::ZERO, |partial| {
            if partial.len() == 5 {
                canceler.request();
            }
        });
        assert_eq!(outcome, GoalOutcome::Canceled(vec![0, 1, 1, 2, 3]));
    }
}
