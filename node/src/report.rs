//! Timestamped stdout report lines.
//!
//! These lines are the node's product output: the conformance harness parses
//! them for the `result` marker and a braced integer list. The timestamp
//! format deliberately avoids brackets so the harness's brace extraction
//! strategy always wins.

use chrono::{SecondsFormat, Utc};

/// Print one timestamped line to stdout.
pub fn line(message: &str) {
    println!(
        "{} {message}",
        Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
    );
}

/// Terminal report for a finished goal, e.g. `Result { 0,1,1,2,3 }`.
/// A rejected goal reports an empty list, which the harness discards.
pub fn result_line(sequence: &[i64]) {
    line(&format!("Result {{ {} }}", join(sequence)));
}

/// Terminal report for a canceled goal. Carries no `result` marker: partial
/// sequences are progress information, not per-goal results.
pub fn canceled_line(sequence: &[i64]) {
    line(&format!("Goal canceled with partial {{ {} }}", join(sequence)));
}

fn join(sequence: &[i64]) -> String {
    sequence
        .iter()
        .map(i64::to_string)
        .collect::<Vec<_>>()
        .join(",")
}
