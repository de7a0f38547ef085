//! Node binary spawned by the conformance harness.
//!
//! Mirrors the CLI surface the harness builds commands for: `--action`
//! selects the streaming variant, `--client` the client role, and
//! `--expect-cancel` tells a streaming server to count cancellations towards
//! its sample target (with the peer driver cancelling each goal mid-flight).

use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use node::factory::{self, NodeSpec, Role, Variant};
use node::logging;

#[derive(Parser)]
#[command(name = "node", version, about = "Action-protocol reference node")]
struct Cli {
    /// Execute the client role instead of the server role.
    #[arg(short, long)]
    client: bool,

    /// Run the streaming action variant instead of the simple request/reply
    /// variant.
    #[arg(long)]
    action: bool,

    /// Server role: expect goals to be canceled and count cancellations
    /// towards the sample target.
    #[arg(long)]
    expect_cancel: bool,

    /// Goals (or replies) to process before exiting.
    #[arg(short, long, default_value_t = 10)]
    samples: usize,

    /// Order parameter sent with every streaming goal.
    #[arg(long, default_value_t = 10)]
    order: i64,

    /// Per-step processing delay in seconds (the cancellation window).
    #[arg(long, default_value_t = 0.2)]
    step_delay: f64,

    /// Cancel each goal after this many feedback messages (with
    /// --expect-cancel).
    #[arg(long, default_value_t = 4)]
    cancel_after: usize,

    /// Randomized think-time between client submissions.
    #[arg(short, long)]
    wait: bool,

    /// Verbose diagnostic logging on stderr.
    #[arg(short, long)]
    debug: bool,
}

impl Cli {
    fn into_spec(self) -> NodeSpec {
        NodeSpec {
            role: if self.client {
                Role::Client
            } else {
                Role::Server
            },
            variant: if self.action {
                Variant::Streaming
            } else {
                Variant::Simple
            },
            samples: self.samples,
            order: self.order,
            step_delay: Duration::from_secs_f64(self.step_delay.max(0.0)),
            think_time: self.wait,
            expect_cancel: self.expect_cancel,
            cancel_after: self.cancel_after,
        }
    }
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{:#}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.debug);
    factory::run_node(&cli.into_spec())
}
