//! Loosely-formatted result-line parsing.
//!
//! Target programs report terminal sequences as free-form text; the only
//! contract is a case-insensitive `result` marker and integers in one of a
//! few shapes (`Result { 0,1,1 }`, `Result: [0, 1, 1]`, `result -> 0 1 1`).
//! Extraction is an explicit ordered list of strategies, first one yielding
//! any integer token wins; collapsing this into a single regex would hide
//! the fallback order, which is load-bearing.

use std::sync::LazyLock;

use regex::Regex;

/// Parsed view of a target run: one integer sequence per matching stdout
/// line, in line order, plus the untouched stderr text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedOutput {
    pub sequences: Vec<Vec<i64>>,
    pub stderr: String,
}

/// Marker a line must carry to be considered a terminal report.
const RESULT_MARKER: &str = "result";
/// Fewer integer tokens than this and the line is not a sequence.
const MIN_SEQUENCE_LEN: usize = 2;

/// Extraction strategies in fallback order.
const STRATEGIES: [fn(&str) -> Vec<i64>; 2] = [extract_delimited, extract_colon_tail];

/// Parse stdout into sequences and pass stderr through unmodified.
pub fn parse_output(stdout: &str, stderr: &str) -> ParsedOutput {
    let sequences = stdout
        .lines()
        .filter(|line| line.to_lowercase().contains(RESULT_MARKER))
        .map(extract_sequence)
        .filter(|sequence| sequence.len() >= MIN_SEQUENCE_LEN)
        .collect();
    ParsedOutput {
        sequences,
        stderr: stderr.to_string(),
    }
}

/// Passthrough parse for roles whose sequences are not validated.
pub fn parse_default(_stdout: &str, stderr: &str) -> ParsedOutput {
    ParsedOutput {
        sequences: Vec::new(),
        stderr: stderr.to_string(),
    }
}

/// Apply the strategy chain to one line.
pub fn extract_sequence(line: &str) -> Vec<i64> {
    STRATEGIES
        .iter()
        .map(|strategy| strategy(line))
        .find(|tokens| !tokens.is_empty())
        .unwrap_or_default()
}

/// Integer tokens between the first `[...]` pair, then the first `{...}`
/// pair.
fn extract_delimited(line: &str) -> Vec<i64> {
    for (opening, closing) in [('[', ']'), ('{', '}')] {
        let Some(start) = line.find(opening) else {
            continue;
        };
        let Some(end) = line[start + 1..].find(closing) else {
            continue;
        };
        let tokens = integer_tokens(&line[start + 1..start + 1 + end]);
        if !tokens.is_empty() {
            return tokens;
        }
    }
    Vec::new()
}

/// Integer tokens after the last colon; with no colon, the whole line.
fn extract_colon_tail(line: &str) -> Vec<i64> {
    let tail = line.rsplit(':').next().unwrap_or(line);
    integer_tokens(tail)
}

fn integer_tokens(text: &str) -> Vec<i64> {
    static INTEGER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-?\d+").unwrap());
    INTEGER
        .find_iter(text)
        .filter_map(|token| token.as_str().parse().ok())
        .collect()
}
