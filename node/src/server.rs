//! Server role: the recursive-sequence action server.
//!
//! Implements [`ActionHandler`] over the lifecycle state machine. Terminal
//! report lines go to stdout for the conformance harness; diagnostics go
//! through tracing on stderr.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, info};

use crate::goal::{ExecutionCounters, GoalId, GoalResult, GoalStatus};
use crate::lifecycle::{self, GoalOutcome};
use crate::report;
use crate::substrate::{ActionHandler, ActiveGoal, CancelDisposition, GoalDisposition};

/// How often the run predicate re-reads the counters.
const RUN_POLL_INTERVAL: Duration = Duration::from_millis(100);
/// Grace pause before returning, letting in-flight deliveries settle.
const DRAIN_PAUSE: Duration = Duration::from_millis(500);

/// Configuration for the server role.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Simulated per-step processing delay; also the cancellation window.
    pub step_delay: Duration,
    /// Suppress stdout report lines (used when the server is the silent
    /// in-process peer of an observed client).
    pub quiet: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            step_delay: Duration::from_millis(200),
            quiet: false,
        }
    }
}

/// Streaming action server: rejects negative orders, accepts every cancel
/// request, and runs each accepted goal through [`lifecycle::run_goal`].
pub struct SequenceServer {
    config: ServerConfig,
    counters: Arc<ExecutionCounters>,
}

impl SequenceServer {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            counters: Arc::new(ExecutionCounters::new()),
        }
    }

    pub fn counters(&self) -> Arc<ExecutionCounters> {
        Arc::clone(&self.counters)
    }

    /// Block until `samples` goals have reached the expected terminal state:
    /// canceled goals count when `expect_cancel` is set, executed goals
    /// otherwise.
    pub fn run(&self, samples: usize, expect_cancel: bool) {
        info!(
            samples,
            expect_cancel, "action server waiting for terminal goals"
        );
        loop {
            let reached = if expect_cancel {
                self.counters.goals_canceled()
            } else {
                self.counters.goals_executed()
            };
            if reached >= samples {
                break;
            }
            thread::sleep(RUN_POLL_INTERVAL);
        }
        thread::sleep(DRAIN_PAUSE);
    }
}

impl ActionHandler for SequenceServer {
    fn on_goal_request(&self, order: i64) -> GoalDisposition {
        if !lifecycle::accepts_order(order) {
            info!(order, "rejecting goal with negative order");
            return GoalDisposition::Reject;
        }
        GoalDisposition::Accept
    }

    fn on_cancel_request(&self, id: GoalId) -> CancelDisposition {
        debug!(%id, "cancel requested");
        CancelDisposition::Accept
    }

    fn on_execute(&self, goal: ActiveGoal) {
        debug!(id = %goal.id(), order = goal.order(), status = ?GoalStatus::Executing, "executing goal");
        let outcome = lifecycle::run_goal(
            goal.order(),
            goal.cancel_token(),
            self.config.step_delay,
            |partial| goal.publish_feedback(partial),
        );

        match outcome {
            GoalOutcome::Succeeded(sequence) => {
                self.counters.record_executed();
                debug!(id = %goal.id(), status = ?GoalStatus::Succeeded, "goal finished");
                if !self.config.quiet {
                    report::result_line(&sequence);
                }
                goal.finish(GoalResult {
                    sequence,
                    canceled: false,
                });
            }
            GoalOutcome::Canceled(sequence) => {
                self.counters.record_canceled();
                debug!(id = %goal.id(), status = ?GoalStatus::Canceled, "goal canceled");
                if !self.config.quiet {
                    report::canceled_line(&sequence);
                }
                goal.finish(GoalResult {
                    sequence,
                    canceled: true,
                });
            }
        }
    }
}
