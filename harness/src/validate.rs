//! Verdict production: baseline checks, domain checks, and the
//! spawn→capture→parse→validate pipeline.
//!
//! Malformed or missing result lines are never harness-fatal; they surface
//! as `NotValidMessages` with a diagnostic. The only fatal condition is a
//! target that cannot be spawned at all.

use serde::Serialize;
use tracing::{error, info, instrument};

use crate::parse::ParsedOutput;
use crate::process::{self, CapturedOutput, ProcessInvocation};

/// Enumerated verdict, mapped one-to-one onto the harness exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReturnCode {
    Success = 0,
    Timeout = 1,
    StderrNotEmpty = 2,
    NotValidMessages = 3,
    ProcessSpawnFailed = 4,
    CommandFailed = 5,
}

impl ReturnCode {
    pub fn exit_code(self) -> i32 {
        self as i32
    }
}

/// A verdict plus an optional diagnostic naming the first violated
/// invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationOutcome {
    pub code: ReturnCode,
    pub diagnostic: Option<String>,
}

impl ValidationOutcome {
    pub fn success() -> Self {
        Self {
            code: ReturnCode::Success,
            diagnostic: None,
        }
    }

    pub fn fail(code: ReturnCode, diagnostic: impl Into<String>) -> Self {
        Self {
            code,
            diagnostic: Some(diagnostic.into()),
        }
    }

    pub fn passed(&self) -> bool {
        self.code == ReturnCode::Success
    }
}

/// Baseline expectations on exit and stderr behavior.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatePolicy {
    /// Whether exceeding the deadline is itself a failure (server role) or
    /// the expected mode of termination.
    pub timeout_as_error: bool,
    /// Permit stderr output from the target.
    pub allow_stderr: bool,
}

/// Baseline validation: exit/timeout behavior matches policy and stderr is
/// empty unless the policy permits it. Callers short-circuit on any failure
/// here; domain checks are skipped.
pub fn validate_default(captured: &CapturedOutput, policy: &ValidatePolicy) -> ValidationOutcome {
    if captured.timed_out {
        if policy.timeout_as_error {
            return ValidationOutcome::fail(
                ReturnCode::Timeout,
                "target exceeded its deadline and was stopped",
            );
        }
    } else if captured.exit_code != Some(0) {
        return ValidationOutcome::fail(
            ReturnCode::CommandFailed,
            format!("target exited with status {:?}", captured.exit_code),
        );
    }

    if !policy.allow_stderr && !captured.stderr.trim().is_empty() {
        return ValidationOutcome::fail(
            ReturnCode::StderrNotEmpty,
            format!("target wrote to stderr: {}", captured.stderr.trim()),
        );
    }

    ValidationOutcome::success()
}

/// Domain validation for the recursive-sequence payload.
///
/// Requires at least one parsed sequence; each must be at least 2 long,
/// start `0, 1`, and satisfy `seq[i] == seq[i-1] + seq[i-2]`. The first
/// failing sequence short-circuits.
pub fn validate_recurrence(parsed: &ParsedOutput) -> ValidationOutcome {
    if parsed.sequences.is_empty() {
        return ValidationOutcome::fail(
            ReturnCode::NotValidMessages,
            "no result sequences were found in target output",
        );
    }
    for sequence in &parsed.sequences {
        if let Err(reason) = check_recurrence(sequence) {
            return ValidationOutcome::fail(
                ReturnCode::NotValidMessages,
                format!("invalid sequence {sequence:?}: {reason}"),
            );
        }
    }
    ValidationOutcome::success()
}

fn check_recurrence(sequence: &[i64]) -> Result<(), String> {
    if sequence.len() < 2 {
        return Err("shorter than 2 elements".to_string());
    }
    if sequence[0] != 0 || sequence[1] != 1 {
        return Err("does not start with 0, 1".to_string());
    }
    for i in 2..sequence.len() {
        if sequence[i] != sequence[i - 1] + sequence[i - 2] {
            return Err(format!("recurrence violated at index {i}"));
        }
    }
    Ok(())
}

/// Run the target and produce the final verdict.
///
/// The captured text goes through `parse`, then `validate` produces the
/// outcome returned verbatim. A spawn failure never reaches either function:
/// it aborts with `ProcessSpawnFailed`.
#[instrument(skip_all, fields(command = %invocation.command.join(" ")))]
pub fn run_and_validate<P, V>(
    invocation: &ProcessInvocation,
    policy: &ValidatePolicy,
    parse: P,
    validate: V,
) -> ValidationOutcome
where
    P: Fn(&str, &str) -> ParsedOutput,
    V: Fn(&CapturedOutput, &ParsedOutput, &ValidatePolicy) -> ValidationOutcome,
{
    let captured = match process::run_and_capture(invocation) {
        Ok(captured) => captured,
        Err(err) => {
            error!(err = format!("{err:#}"), "failed to run target");
            return ValidationOutcome::fail(ReturnCode::ProcessSpawnFailed, format!("{err:#}"));
        }
    };

    let parsed = parse(&captured.stdout, &captured.stderr);
    let outcome = validate(&captured, &parsed, policy);
    match &outcome.diagnostic {
        Some(diagnostic) if !outcome.passed() => error!(code = ?outcome.code, diagnostic),
        _ => info!(code = ?outcome.code, sequences = parsed.sequences.len(), "validation passed"),
    }
    outcome
}

/// Server-role validator: baseline checks only.
pub fn server_validate(
    captured: &CapturedOutput,
    _parsed: &ParsedOutput,
    policy: &ValidatePolicy,
) -> ValidationOutcome {
    validate_default(captured, policy)
}

/// Client-role validator: baseline first, then the recurrence check over
/// every reported sequence.
pub fn client_validate(
    captured: &CapturedOutput,
    parsed: &ParsedOutput,
    policy: &ValidatePolicy,
) -> ValidationOutcome {
    let baseline = validate_default(captured, policy);
    if !baseline.passed() {
        return baseline;
    }
    validate_recurrence(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn captured(stdout: &str, stderr: &str, exit_code: Option<i32>, timed_out: bool) -> CapturedOutput {
        CapturedOutput {
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
            exit_code,
            timed_out,
        }
    }

    fn parsed(sequences: Vec<Vec<i64>>) -> ParsedOutput {
        ParsedOutput {
            sequences,
            stderr: String::new(),
        }
    }

    #[test]
    fn clean_exit_with_empty_stderr_passes_baseline() {
        let outcome = validate_default(&captured("", "", Some(0), false), &ValidatePolicy::default());
        assert!(outcome.passed());
    }

    #[test]
    fn stderr_output_fails_baseline() {
        let outcome = validate_default(
            &captured("", "warning: x", Some(0), false),
            &ValidatePolicy::default(),
        );
        assert_eq!(outcome.code, ReturnCode::StderrNotEmpty);
    }

    #[test]
    fn stderr_output_passes_when_permitted() {
        let policy = ValidatePolicy {
            allow_stderr: true,
            ..ValidatePolicy::default()
        };
        let outcome = validate_default(&captured("", "warning: x", Some(0), false), &policy);
        assert!(outcome.passed());
    }

    #[test]
    fn timeout_respects_policy_flag() {
        let timed_out = captured("", "", None, true);
        let strict = ValidatePolicy {
            timeout_as_error: true,
            ..ValidatePolicy::default()
        };
        assert_eq!(
            validate_default(&timed_out, &strict).code,
            ReturnCode::Timeout
        );
        assert!(validate_default(&timed_out, &ValidatePolicy::default()).passed());
    }

    #[test]
    fn nonzero_exit_fails_baseline() {
        let outcome = validate_default(&captured("", "", Some(3), false), &ValidatePolicy::default());
        assert_eq!(outcome.code, ReturnCode::CommandFailed);
    }

    #[test]
    fn valid_sequences_pass_recurrence_check() {
        let outcome = validate_recurrence(&parsed(vec![vec![0, 1], vec![0, 1, 1, 2, 3, 5]]));
        assert!(outcome.passed());
    }

    #[test]
    fn recurrence_violation_is_reported_with_diagnostic() {
        let outcome = validate_recurrence(&parsed(vec![vec![0, 1, 2, 4]]));
        assert_eq!(outcome.code, ReturnCode::NotValidMessages);
        let diagnostic = outcome.diagnostic.expect("diagnostic");
        assert!(diagnostic.contains("[0, 1, 2, 4]"));
        assert!(diagnostic.contains("index 2"));
    }

    #[test]
    fn wrong_leading_pair_fails() {
        let outcome = validate_recurrence(&parsed(vec![vec![1, 1, 2]]));
        assert_eq!(outcome.code, ReturnCode::NotValidMessages);
    }

    #[test]
    fn missing_sequences_fail_domain_check() {
        let outcome = validate_recurrence(&parsed(Vec::new()));
        assert_eq!(outcome.code, ReturnCode::NotValidMessages);
    }

    #[test]
    fn client_validate_short_circuits_on_baseline_failure() {
        // Sequences are invalid too, but stderr must win.
        let outcome = client_validate(
            &captured("", "boom", Some(0), false),
            &parsed(vec![vec![9, 9]]),
            &ValidatePolicy::default(),
        );
        assert_eq!(outcome.code, ReturnCode::StderrNotEmpty);
    }

    #[test]
    fn exit_codes_are_stable() {
        assert_eq!(ReturnCode::Success.exit_code(), 0);
        assert_eq!(ReturnCode::Timeout.exit_code(), 1);
        assert_eq!(ReturnCode::StderrNotEmpty.exit_code(), 2);
        assert_eq!(ReturnCode::NotValidMessages.exit_code(), 3);
        assert_eq!(ReturnCode::ProcessSpawnFailed.exit_code(), 4);
        assert_eq!(ReturnCode::CommandFailed.exit_code(), 5);
    }
}
