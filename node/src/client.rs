//! Client role: sequential goal driver.
//!
//! Submits goals one at a time and reports each terminal sequence as a
//! parseable stdout line before submitting the next. The driver never has two
//! goals in flight, though a correct server must not rely on that.

use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use rand::Rng;
use tracing::{debug, info};

use crate::report;
use crate::substrate::ClientEndpoint;

/// Bounded retry while waiting for the server to come up.
const SERVER_WAIT_ATTEMPTS: u32 = 50;
const SERVER_WAIT_INTERVAL: Duration = Duration::from_millis(100);

/// Configuration for the client role.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Order parameter sent with every goal.
    pub order: i64,
    /// Randomized 50-150 ms think-time before each submission.
    pub think_time: bool,
    /// Request cancellation after this many feedback messages.
    pub cancel_after: Option<usize>,
    /// Suppress stdout report lines (used when the client is the silent
    /// in-process peer of an observed server).
    pub quiet: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            order: 10,
            think_time: false,
            cancel_after: None,
            quiet: false,
        }
    }
}

/// Sequential action client over a substrate endpoint.
pub struct SequenceClient {
    endpoint: ClientEndpoint,
    config: ClientConfig,
}

impl SequenceClient {
    pub fn new(endpoint: ClientEndpoint, config: ClientConfig) -> Self {
        Self { endpoint, config }
    }

    /// Send `samples` goals and block for each terminal result.
    ///
    /// A rejected goal is recorded as an empty sequence and the run
    /// continues; rejection is a normal protocol outcome. Returns the
    /// terminal sequences in submission order.
    pub fn run(&self, samples: usize) -> Result<Vec<Vec<i64>>> {
        if !self
            .endpoint
            .wait_for_server(SERVER_WAIT_ATTEMPTS, SERVER_WAIT_INTERVAL)
        {
            bail!("action server never became available");
        }
        info!(samples, order = self.config.order, "running action client");

        let mut sequences = Vec::with_capacity(samples);
        for _ in 0..samples {
            if self.config.think_time {
                let pause = rand::thread_rng().gen_range(50..=150);
                thread::sleep(Duration::from_millis(pause));
            }
            let sequence = self.send_goal(self.config.order)?;
            if !self.config.quiet {
                report::result_line(&sequence);
            }
            sequences.push(sequence);
        }
        Ok(sequences)
    }

    /// Submit one goal and block until its terminal result.
    fn send_goal(&self, order: i64) -> Result<Vec<i64>> {
        let goal = self.endpoint.submit_goal(order)?;
        if !goal.accepted() {
            debug!(id = %goal.id, order, "goal rejected");
            return Ok(Vec::new());
        }

        if let Some(cancel_after) = self.config.cancel_after {
            let mut received = 0;
            while let Ok(feedback) = goal.feedback.recv() {
                received += 1;
                debug!(
                    id = %goal.id,
                    len = feedback.partial_sequence.len(),
                    "feedback received"
                );
                if received >= cancel_after {
                    self.endpoint.request_cancel(goal.id);
                    break;
                }
            }
        }

        let result = goal
            .result
            .recv()
            .context("server dropped goal before delivering a result")?;
        debug!(id = %goal.id, canceled = result.canceled, "terminal result received");
        Ok(result.sequence)
    }
}
