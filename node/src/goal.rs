//! Shared goal-protocol types.
//!
//! These types define the stable contract between the substrate, the server
//! lifecycle, and the client driver. They carry no I/O and stay deterministic
//! across runs.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};

/// Identifier assigned by the substrate when a goal is submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GoalId(pub u64);

impl std::fmt::Display for GoalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "goal-{}", self.0)
    }
}

/// Lifecycle status of a goal. Transitions are monotonic: no status is ever
/// revisited, and `Rejected`, `Canceled`, and `Succeeded` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalStatus {
    Pending,
    Accepted,
    Rejected,
    Executing,
    Canceled,
    Succeeded,
}

impl GoalStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Rejected | Self::Canceled | Self::Succeeded)
    }
}

/// Intermediate progress report for one goal. Each message carries a strict
/// prefix of the eventual terminal sequence, one element longer than the
/// previous message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feedback {
    pub partial_sequence: Vec<i64>,
}

/// The single terminal report for a goal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoalResult {
    pub sequence: Vec<i64>,
    pub canceled: bool,
}

/// Cooperative cancellation flag for one goal.
///
/// Single logical writer (the cancel callback), many readers (the execution
/// task at its loop checkpoints). The flag is write-once false→true and never
/// reset, so relaxed atomics would suffice; `SeqCst` keeps reasoning simple.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the goal as cancel-requested. Idempotent.
    pub fn request(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_canceled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Process-wide terminal-goal counters read by the server run predicate.
///
/// Each counter is incremented exactly once per goal reaching the matching
/// terminal state; mutation is increment-only.
#[derive(Debug, Default)]
pub struct ExecutionCounters {
    executed: AtomicUsize,
    canceled: AtomicUsize,
}

impl ExecutionCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_executed(&self) {
        self.executed.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_canceled(&self) {
        self.canceled.fetch_add(1, Ordering::SeqCst);
    }

    pub fn goals_executed(&self) -> usize {
        self.executed.load(Ordering::SeqCst)
    }

    pub fn goals_canceled(&self) -> usize {
        self.canceled.load(Ordering::SeqCst)
    }
}

/// Monotonic goal-id source owned by the substrate.
#[derive(Debug, Default)]
pub(crate) struct GoalIdSource {
    next: AtomicU64,
}

impl GoalIdSource {
    pub(crate) fn next(&self) -> GoalId {
        GoalId(self.next.fetch_add(1, Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_token_is_write_once() {
        let token = CancelToken::new();
        assert!(!token.is_canceled());
        token.request();
        token.request();
        assert!(token.is_canceled());
    }

    #[test]
    fn cancel_token_clones_share_state() {
        let token = CancelToken::new();
        let reader = token.clone();
        token.request();
        assert!(reader.is_canceled());
    }

    #[test]
    fn counters_track_terminal_goals_independently() {
        let counters = ExecutionCounters::new();
        counters.record_executed();
        counters.record_executed();
        counters.record_canceled();
        assert_eq!(counters.goals_executed(), 2);
        assert_eq!(counters.goals_canceled(), 1);
    }

    #[test]
    fn terminal_statuses() {
        assert!(GoalStatus::Rejected.is_terminal());
        assert!(GoalStatus::Canceled.is_terminal());
        assert!(GoalStatus::Succeeded.is_terminal());
        assert!(!GoalStatus::Pending.is_terminal());
        assert!(!GoalStatus::Accepted.is_terminal());
        assert!(!GoalStatus::Executing.is_terminal());
    }
}
