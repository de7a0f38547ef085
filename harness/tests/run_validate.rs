//! End-to-end pipeline scenarios: spawn a real (scripted) target, capture
//! its output under the deadline, parse, and validate.

use std::time::{Duration, Instant};

use harness::parse::{parse_default, parse_output};
use harness::process::ProcessInvocation;
use harness::validate::{
    ReturnCode, ValidatePolicy, client_validate, run_and_validate, server_validate,
};

fn shell_target(script: &str, timeout: Duration) -> ProcessInvocation {
    ProcessInvocation {
        command: vec!["sh".to_string(), "-c".to_string(), script.to_string()],
        timeout,
        startup_delay: Duration::ZERO,
    }
}

/// Scenario: three well-formed sequence lines, clean exit, empty stderr.
#[test]
fn well_formed_client_output_passes() {
    let invocation = shell_target(
        "echo 'Result { 0,1,1,2,3 }'; \
         echo 'Result: [0, 1, 1, 2]'; \
         echo 'result -> 0 1 1 2 3 5'",
        Duration::from_secs(5),
    );
    let outcome = run_and_validate(
        &invocation,
        &ValidatePolicy::default(),
        parse_output,
        client_validate,
    );
    assert_eq!(outcome.code, ReturnCode::Success);
}

/// Scenario: a sequence violating the recurrence at index 2 fails domain
/// validation with a diagnostic naming the sequence.
#[test]
fn recurrence_violation_fails_validation() {
    let invocation = shell_target("echo 'Result { 0,1,2,4 }'", Duration::from_secs(5));
    let outcome = run_and_validate(
        &invocation,
        &ValidatePolicy::default(),
        parse_output,
        client_validate,
    );
    assert_eq!(outcome.code, ReturnCode::NotValidMessages);
    assert!(outcome.diagnostic.expect("diagnostic").contains("[0, 1, 2, 4]"));
}

/// A target with no result lines at all is a validation failure, not a
/// harness error.
#[test]
fn missing_result_lines_fail_validation() {
    let invocation = shell_target("echo 'warming up'; echo 'done'", Duration::from_secs(5));
    let outcome = run_and_validate(
        &invocation,
        &ValidatePolicy::default(),
        parse_output,
        client_validate,
    );
    assert_eq!(outcome.code, ReturnCode::NotValidMessages);
}

#[test]
fn stderr_noise_fails_baseline_before_domain_checks() {
    let invocation = shell_target(
        "echo 'Result { 0,1,1 }'; echo 'oops' >&2",
        Duration::from_secs(5),
    );
    let outcome = run_and_validate(
        &invocation,
        &ValidatePolicy::default(),
        parse_output,
        client_validate,
    );
    assert_eq!(outcome.code, ReturnCode::StderrNotEmpty);
}

/// Scenario: a server target that never exits is stopped at the deadline and
/// reported as a timeout, without hanging the harness.
#[test]
fn hanging_server_target_times_out() {
    let started = Instant::now();
    let invocation = shell_target("sleep 30", Duration::from_millis(300));
    let policy = ValidatePolicy {
        timeout_as_error: true,
        allow_stderr: false,
    };
    let outcome = run_and_validate(&invocation, &policy, parse_default, server_validate);

    assert_eq!(outcome.code, ReturnCode::Timeout);
    assert!(started.elapsed() < Duration::from_secs(10));
}

/// The client role treats its own exit as the termination mode: a timeout
/// under the default policy is not a failure by itself.
#[test]
fn client_timeout_is_not_an_error_under_default_policy() {
    let invocation = shell_target(
        "echo 'Result { 0,1,1,2 }'; sleep 30",
        Duration::from_millis(300),
    );
    let outcome = run_and_validate(
        &invocation,
        &ValidatePolicy::default(),
        parse_output,
        client_validate,
    );
    assert_eq!(outcome.code, ReturnCode::Success);
}

#[test]
fn nonzero_exit_fails_server_validation() {
    let invocation = shell_target("exit 3", Duration::from_secs(5));
    let policy = ValidatePolicy {
        timeout_as_error: true,
        allow_stderr: false,
    };
    let outcome = run_and_validate(&invocation, &policy, parse_default, server_validate);
    assert_eq!(outcome.code, ReturnCode::CommandFailed);
}

/// Spawn failure aborts the run before parse/validate are ever invoked.
#[test]
fn missing_executable_is_fatal() {
    let invocation = ProcessInvocation {
        command: vec!["no-such-target-binary".to_string()],
        timeout: Duration::from_secs(1),
        startup_delay: Duration::ZERO,
    };
    let outcome = run_and_validate(
        &invocation,
        &ValidatePolicy::default(),
        |_, _| panic!("parse must not run on spawn failure"),
        |_, _, _| panic!("validate must not run on spawn failure"),
    );
    assert_eq!(outcome.code, ReturnCode::ProcessSpawnFailed);
}

/// The startup grace period extends the deadline for slow-starting targets.
#[test]
fn startup_delay_grants_grace_period() {
    let mut invocation = shell_target(
        "sleep 0.5; echo 'Result { 0,1,1 }'",
        Duration::from_millis(200),
    );
    invocation.startup_delay = Duration::from_millis(800);
    let outcome = run_and_validate(
        &invocation,
        &ValidatePolicy {
            timeout_as_error: true,
            allow_stderr: false,
        },
        parse_output,
        client_validate,
    );
    assert_eq!(outcome.code, ReturnCode::Success);
}
