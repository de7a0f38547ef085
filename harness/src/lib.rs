//! Conformance harness for the cancellable, feedback-streaming action
//! protocol.
//!
//! The harness drives a target program as a subprocess, captures its textual
//! output under a hard deadline, parses loosely-formatted result lines, and
//! validates them against protocol and domain invariants, producing a
//! deterministic verdict:
//!
//! - **[`process`]**: subprocess spawn, concurrent stream draining, and
//!   deadline enforcement;
//! - **[`parse`]**: marker-gated extraction of integer sequences via an
//!   ordered strategy chain;
//! - **[`validate`]**: the [`validate::ReturnCode`] taxonomy, baseline and
//!   domain checks, and the composed pipeline;
//! - **[`report`]**: optional JSON record of a run.
//!
//! The harness never links the target in-process: it observes stdout,
//! stderr, and exit behavior only.

pub mod logging;
pub mod parse;
pub mod process;
pub mod report;
pub mod validate;
