//! Conformance-harness CLI.
//!
//! Two roles share one surface: `harness server` validates an action server
//! target (expected to exit on its own after serving the sample target, so a
//! timeout is a failure), `harness client` validates an action client target
//! and additionally checks every reported sequence against the recurrence
//! invariants. The process exit status equals the numeric verdict.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::{Args, Parser, Subcommand};
use tracing::{error, info};

use harness::logging;
use harness::parse::{parse_default, parse_output};
use harness::process::ProcessInvocation;
use harness::report::{RunReport, write_report};
use harness::validate::{
    ValidatePolicy, ValidationOutcome, client_validate, run_and_validate, server_validate,
};

#[derive(Parser)]
#[command(name = "harness", version, about = "Action-protocol conformance harness")]
struct Cli {
    #[command(subcommand)]
    role: Role,
}

#[derive(Subcommand)]
enum Role {
    /// Validate an action server target.
    Server {
        #[command(flatten)]
        common: CommonArgs,
        /// Expect goals to be canceled; the target counts cancellations
        /// towards its sample target.
        #[arg(long)]
        expect_cancel: bool,
    },
    /// Validate an action client target.
    Client {
        #[command(flatten)]
        common: CommonArgs,
    },
}

#[derive(Args)]
struct CommonArgs {
    /// Number of goals the target must send or serve.
    #[arg(short, long, default_value_t = 3)]
    samples: u32,

    /// Hard deadline in seconds for the target.
    #[arg(short, long, default_value_t = 20)]
    timeout: u64,

    /// Target program to spawn.
    #[arg(short, long)]
    exe: PathBuf,

    /// Startup grace period in seconds before timeout enforcement begins.
    #[arg(long, default_value_t = 0.0)]
    delay: f64,

    /// Verbose diagnostic logging on stderr.
    #[arg(short, long)]
    debug: bool,

    /// Write a JSON run report to this path.
    #[arg(long)]
    report: Option<PathBuf>,
}

impl CommonArgs {
    fn invocation(&self, role_args: &[&str]) -> ProcessInvocation {
        let mut command = vec![self.exe.display().to_string()];
        command.extend(role_args.iter().map(ToString::to_string));
        command.extend(["--samples".to_string(), self.samples.to_string()]);
        ProcessInvocation {
            command,
            timeout: Duration::from_secs(self.timeout),
            startup_delay: Duration::from_secs_f64(self.delay.max(0.0)),
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let outcome = run(&cli);
    std::process::exit(outcome.code.exit_code());
}

fn run(cli: &Cli) -> ValidationOutcome {
    let started = Instant::now();
    match &cli.role {
        Role::Server {
            common,
            expect_cancel,
        } => {
            logging::init(common.debug);
            let mut role_args = vec!["--action"];
            if *expect_cancel {
                role_args.push("--expect-cancel");
            }
            // A conforming server exits promptly once the sample target is
            // reached; hanging past the deadline is a failure.
            let policy = ValidatePolicy {
                timeout_as_error: true,
                allow_stderr: false,
            };
            let invocation = common.invocation(&role_args);
            let outcome = run_and_validate(&invocation, &policy, parse_default, server_validate);
            finish("server", common, &invocation, outcome, started)
        }
        Role::Client { common } => {
            logging::init(common.debug);
            let invocation = common.invocation(&["--action", "--client"]);
            let outcome = run_and_validate(
                &invocation,
                &ValidatePolicy::default(),
                parse_output,
                client_validate,
            );
            finish("client", common, &invocation, outcome, started)
        }
    }
}

fn finish(
    role: &str,
    common: &CommonArgs,
    invocation: &ProcessInvocation,
    outcome: ValidationOutcome,
    started: Instant,
) -> ValidationOutcome {
    info!(
        role,
        code = ?outcome.code,
        "validator finished with exit code {}",
        outcome.code.exit_code()
    );
    if let Some(path) = &common.report {
        let report = RunReport::new(
            role,
            &invocation.command,
            &outcome,
            started.elapsed().as_secs_f64(),
        );
        if let Err(err) = write_report(path, &report) {
            error!(err = format!("{err:#}"), "failed to write run report");
        }
    }
    outcome
}
