//! Role and variant selection for the node binary.
//!
//! Exactly four node variants exist: `{client, server} x {simple, streaming}`,
//! chosen by explicit configuration rather than dynamic lookup. Because the
//! transport is an in-process capability, each spawned node wires both ends
//! of the substrate: the requested role reports to stdout while its opposite
//! runs as a silent peer, so a single process exhibits the complete exchange
//! the harness observes.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

use crate::client::{ClientConfig, SequenceClient};
use crate::server::{SequenceServer, ServerConfig};
use crate::simple::{AdditionClient, AdditionServer, LocalService};
use crate::substrate::{DEFAULT_WORKERS, LocalSubstrate};

/// Which side of the exchange this process reports for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Client,
    Server,
}

/// Streaming action with feedback and cancellation, or plain request/reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    Simple,
    Streaming,
}

/// Full node configuration resolved from the CLI.
#[derive(Debug, Clone)]
pub struct NodeSpec {
    pub role: Role,
    pub variant: Variant,
    /// Goals (or replies) to process before the node exits.
    pub samples: usize,
    /// Order parameter sent with every streaming goal.
    pub order: i64,
    /// Per-step processing delay on the server side.
    pub step_delay: Duration,
    /// Randomized think-time between client submissions.
    pub think_time: bool,
    /// Server role only: count canceled goals towards `samples` and have the
    /// peer driver cancel each goal after `cancel_after` feedback messages.
    pub expect_cancel: bool,
    pub cancel_after: usize,
}

/// Construct and run the selected node variant to completion.
pub fn run_node(spec: &NodeSpec) -> Result<()> {
    info!(role = ?spec.role, variant = ?spec.variant, samples = spec.samples, "starting node");
    match (spec.role, spec.variant) {
        (Role::Server, Variant::Streaming) => run_streaming_server(spec),
        (Role::Client, Variant::Streaming) => run_streaming_client(spec),
        (Role::Server, Variant::Simple) => run_simple_server(spec),
        (Role::Client, Variant::Simple) => run_simple_client(spec),
    }
}

fn run_streaming_server(spec: &NodeSpec) -> Result<()> {
    let substrate = LocalSubstrate::new(DEFAULT_WORKERS);
    let server = Arc::new(SequenceServer::new(ServerConfig {
        step_delay: spec.step_delay,
        quiet: false,
    }));
    substrate.attach(server.clone())?;

    let peer = SequenceClient::new(
        substrate.client(),
        ClientConfig {
            order: spec.order,
            think_time: spec.think_time,
            cancel_after: spec.expect_cancel.then_some(spec.cancel_after),
            quiet: true,
        },
    );
    let samples = spec.samples;
    let driver = thread::spawn(move || peer.run(samples));

    server.run(spec.samples, spec.expect_cancel);

    driver
        .join()
        .map_err(|_| anyhow::anyhow!("peer driver panicked"))?
        .context("peer driver failed")?;
    substrate.shutdown();
    Ok(())
}

fn run_streaming_client(spec: &NodeSpec) -> Result<()> {
    let substrate = LocalSubstrate::new(DEFAULT_WORKERS);
    let server = Arc::new(SequenceServer::new(ServerConfig {
        step_delay: spec.step_delay,
        quiet: true,
    }));
    substrate.attach(server)?;

    let client = SequenceClient::new(
        substrate.client(),
        ClientConfig {
            order: spec.order,
            think_time: spec.think_time,
            cancel_after: None,
            quiet: false,
        },
    );
    client.run(spec.samples)?;
    substrate.shutdown();
    Ok(())
}

fn run_simple_server(spec: &NodeSpec) -> Result<()> {
    let service = LocalService::new();
    let (server, done_rx) = AdditionServer::new(spec.samples);
    service.attach(server.clone())?;

    let service = Arc::new(service);
    let peer_service = Arc::clone(&service);
    let samples = spec.samples;
    let think_time = spec.think_time;
    let driver = thread::spawn(move || {
        AdditionClient::new(&peer_service, true).run(samples, think_time)
    });

    server.run(&done_rx);
    driver
        .join()
        .map_err(|_| anyhow::anyhow!("peer driver panicked"))?
        .context("peer driver failed")?;
    Ok(())
}

fn run_simple_client(spec: &NodeSpec) -> Result<()> {
    let service = LocalService::new();
    let (server, _done_rx) = AdditionServer::new(spec.samples);
    service.attach(server)?;

    AdditionClient::new(&service, false).run(spec.samples, spec.think_time)?;
    Ok(())
}
