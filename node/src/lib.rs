//! Reference node for the cancellable, feedback-streaming action protocol.
//!
//! The node computes a classic recursive sequence as its example payload and
//! exercises the full goal lifecycle: accept/reject, execution with streamed
//! feedback, cooperative cancellation, and a single terminal result per
//! goal. The architecture separates:
//!
//! - **[`lifecycle`]**: the pure execution state machine (deterministic with
//!   a zero step delay, fully testable in isolation);
//! - **[`substrate`]**: the in-process goal-exchange capability behind the
//!   [`substrate::ActionHandler`] seam (network transport is out of scope);
//! - **[`server`] / [`client`] / [`simple`]**: the role implementations the
//!   [`factory`] selects between.
//!
//! Product output is timestamped stdout lines ([`report`]) parsed by the
//! conformance harness; tracing diagnostics stay on stderr.

pub mod client;
pub mod factory;
pub mod goal;
pub mod lifecycle;
pub mod logging;
pub mod report;
pub mod server;
pub mod simple;
pub mod substrate;
