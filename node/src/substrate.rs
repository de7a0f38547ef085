//! In-process goal-exchange substrate.
//!
//! The transport under the action protocol is an opaque capability: this
//! module provides the only implementation the repo ships, a channel-backed
//! substrate wiring one server handler to any number of client endpoints in
//! the same process. The [`ActionHandler`] trait is the seam a server
//! implements; tests substitute scripted handlers without touching the
//! lifecycle code.
//!
//! Delivery guarantees, per goal: feedback messages arrive in publish order
//! and always precede the terminal result, and exactly one result is ever
//! delivered. Nothing is guaranteed across distinct goals.

use std::collections::HashMap;
use std::sync::mpsc::{Receiver, Sender, channel};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Result, anyhow, bail};
use tracing::{debug, warn};

use crate::goal::{CancelToken, Feedback, GoalId, GoalIdSource, GoalResult, GoalStatus};

/// Server decision on a submitted goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalDisposition {
    Accept,
    Reject,
}

/// Server decision on a cancel request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelDisposition {
    Accept,
    Reject,
}

/// Callbacks a server registers with the substrate.
///
/// `on_goal_request` and `on_cancel_request` are invoked synchronously on the
/// submitting thread; `on_execute` runs on a worker-pool thread, one
/// invocation per accepted goal. The cancel callback and the execution task
/// for the same goal run concurrently and coordinate only through the goal's
/// [`CancelToken`].
pub trait ActionHandler: Send + Sync {
    fn on_goal_request(&self, order: i64) -> GoalDisposition;
    fn on_cancel_request(&self, id: GoalId) -> CancelDisposition;
    fn on_execute(&self, goal: ActiveGoal);
}

/// Server-side handle to one accepted goal.
///
/// Owned exclusively by the execution task. Terminating the goal consumes the
/// handle, so a second terminal result is impossible by construction.
pub struct ActiveGoal {
    id: GoalId,
    order: i64,
    cancel: CancelToken,
    feedback_tx: Sender<Feedback>,
    result_tx: Sender<GoalResult>,
    registry: Arc<Mutex<HashMap<GoalId, CancelToken>>>,
}

impl ActiveGoal {
    pub fn id(&self) -> GoalId {
        self.id
    }

    pub fn order(&self) -> i64 {
        self.order
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Publish an intermediate progress report. Errors (a departed client)
    /// are ignored: the server keeps executing and still records the goal's
    /// terminal state.
    pub fn publish_feedback(&self, partial_sequence: &[i64]) {
        let message = Feedback {
            partial_sequence: partial_sequence.to_vec(),
        };
        if self.feedback_tx.send(message).is_err() {
            warn!(id = %self.id, "feedback receiver dropped");
        }
    }

    /// Deliver the terminal result and retire the goal.
    pub fn finish(self, result: GoalResult) {
        if let Ok(mut goals) = self.registry.lock() {
            goals.remove(&self.id);
        }
        if self.result_tx.send(result).is_err() {
            warn!(id = %self.id, "result receiver dropped");
        }
    }
}

/// Client-side view of one submitted goal.
pub struct SubmittedGoal {
    pub id: GoalId,
    pub status: GoalStatus,
    pub feedback: Receiver<Feedback>,
    pub result: Receiver<GoalResult>,
}

impl SubmittedGoal {
    pub fn accepted(&self) -> bool {
        self.status == GoalStatus::Accepted
    }
}

struct Shared {
    handler: Mutex<Option<Arc<dyn ActionHandler>>>,
    goals: Arc<Mutex<HashMap<GoalId, CancelToken>>>,
    ids: GoalIdSource,
    jobs: Mutex<Option<Sender<ActiveGoal>>>,
}

impl Shared {
    fn handler(&self) -> Option<Arc<dyn ActionHandler>> {
        self.handler.lock().ok().and_then(|guard| guard.clone())
    }
}

/// Channel-backed substrate with a bounded execution worker pool.
pub struct LocalSubstrate {
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

/// Worker-pool size matching the reference server's two-thread executor.
pub const DEFAULT_WORKERS: usize = 2;

impl LocalSubstrate {
    pub fn new(workers: usize) -> Self {
        let (job_tx, job_rx) = channel::<ActiveGoal>();
        let job_rx = Arc::new(Mutex::new(job_rx));
        let shared = Arc::new(Shared {
            handler: Mutex::new(None),
            goals: Arc::new(Mutex::new(HashMap::new())),
            ids: GoalIdSource::default(),
            jobs: Mutex::new(Some(job_tx)),
        });

        let handles = (0..workers.max(1))
            .map(|_| {
                let job_rx = Arc::clone(&job_rx);
                let shared = Arc::clone(&shared);
                thread::spawn(move || worker_loop(&job_rx, &shared))
            })
            .collect();

        Self {
            shared,
            workers: handles,
        }
    }

    /// Register the server handler. At most one server per substrate.
    pub fn attach(&self, handler: Arc<dyn ActionHandler>) -> Result<()> {
        let mut guard = self
            .shared
            .handler
            .lock()
            .map_err(|_| anyhow!("substrate handler lock poisoned"))?;
        if guard.is_some() {
            bail!("a server is already attached to this substrate");
        }
        *guard = Some(handler);
        Ok(())
    }

    pub fn client(&self) -> ClientEndpoint {
        ClientEndpoint {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Stop accepting goals, drain queued executions, and join the pool.
    pub fn shutdown(mut self) {
        self.shutdown_inner();
    }

    fn shutdown_inner(&mut self) {
        if let Ok(mut jobs) = self.shared.jobs.lock() {
            jobs.take();
        }
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                warn!("goal worker panicked");
            }
        }
    }
}

impl Drop for LocalSubstrate {
    fn drop(&mut self) {
        self.shutdown_inner();
    }
}

fn worker_loop(jobs: &Arc<Mutex<Receiver<ActiveGoal>>>, shared: &Arc<Shared>) {
    loop {
        let job = {
            let Ok(guard) = jobs.lock() else {
                return;
            };
            guard.recv()
        };
        let Ok(goal) = job else {
            return;
        };
        match shared.handler() {
            Some(handler) => handler.on_execute(goal),
            // Cannot happen through ClientEndpoint (submission requires an
            // attached handler), but do not strand the client if it does.
            None => goal.finish(GoalResult {
                sequence: Vec::new(),
                canceled: true,
            }),
        }
    }
}

/// Client-side access to the substrate.
#[derive(Clone)]
pub struct ClientEndpoint {
    shared: Arc<Shared>,
}

impl ClientEndpoint {
    pub fn server_available(&self) -> bool {
        self.shared.handler().is_some()
    }

    /// Poll for an attached server with bounded retry.
    pub fn wait_for_server(&self, attempts: u32, interval: Duration) -> bool {
        for attempt in 0..attempts {
            if self.server_available() {
                return true;
            }
            debug!(attempt, "action server not available yet");
            thread::sleep(interval);
        }
        self.server_available()
    }

    /// Submit one goal and block for the accept/reject decision.
    ///
    /// On acceptance the execution job is queued on the worker pool and the
    /// returned handle carries the feedback and result receivers.
    pub fn submit_goal(&self, order: i64) -> Result<SubmittedGoal> {
        let handler = self
            .shared
            .handler()
            .ok_or_else(|| anyhow!("no action server attached"))?;

        let id = self.shared.ids.next();
        let (feedback_tx, feedback_rx) = channel();
        let (result_tx, result_rx) = channel();

        if handler.on_goal_request(order) == GoalDisposition::Reject {
            debug!(%id, order, "goal rejected");
            return Ok(SubmittedGoal {
                id,
                status: GoalStatus::Rejected,
                feedback: feedback_rx,
                result: result_rx,
            });
        }

        let cancel = CancelToken::new();
        self.shared
            .goals
            .lock()
            .map_err(|_| anyhow!("substrate goal registry poisoned"))?
            .insert(id, cancel.clone());

        let goal = ActiveGoal {
            id,
            order,
            cancel,
            feedback_tx,
            result_tx,
            registry: Arc::clone(&self.shared.goals),
        };

        let jobs = self
            .shared
            .jobs
            .lock()
            .map_err(|_| anyhow!("substrate job queue poisoned"))?;
        match jobs.as_ref() {
            Some(sender) => sender
                .send(goal)
                .map_err(|_| anyhow!("substrate worker pool stopped"))?,
            None => bail!("substrate is shut down"),
        }

        debug!(%id, order, "goal accepted");
        Ok(SubmittedGoal {
            id,
            status: GoalStatus::Accepted,
            feedback: feedback_rx,
            result: result_rx,
        })
    }

    /// Ask the server to cancel a goal. Returns whether the request was
    /// accepted; on acceptance the goal's cancel token is set, to be observed
    /// at the execution task's next checkpoint.
    pub fn request_cancel(&self, id: GoalId) -> bool {
        let Some(handler) = self.shared.handler() else {
            return false;
        };
        if handler.on_cancel_request(id) == CancelDisposition::Reject {
            return false;
        }
        let token = self
            .shared
            .goals
            .lock()
            .ok()
            .and_then(|goals| goals.get(&id).cloned());
        match token {
            Some(token) => {
                token.request();
                true
            }
            // Already terminal: the registry entry is gone.
            None => false,
        }
    }
}
