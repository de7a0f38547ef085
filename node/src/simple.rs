//! Simple request/reply variant (no feedback, no cancellation).
//!
//! The uninteresting sibling of the streaming action: a client sends two
//! integers, the server replies with their sum. Kept minimal; it exists so
//! the role factory covers the full `{client, server} x {simple, streaming}`
//! grid.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{Sender, channel};
use std::sync::{Mutex, mpsc};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use tracing::{debug, info};

use crate::report;

/// Reply computation a simple server registers with the service.
pub trait ServiceHandler: Send + Sync {
    fn on_request(&self, a: i64, b: i64) -> i64;
}

struct ServiceShared {
    handler: Mutex<Option<Arc<dyn ServiceHandler>>>,
}

/// In-process request/reply channel pairing one server with its clients.
pub struct LocalService {
    shared: Arc<ServiceShared>,
}

impl Default for LocalService {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalService {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(ServiceShared {
                handler: Mutex::new(None),
            }),
        }
    }

    pub fn attach(&self, handler: Arc<dyn ServiceHandler>) -> Result<()> {
        let mut guard = self
            .shared
            .handler
            .lock()
            .map_err(|_| anyhow!("service handler lock poisoned"))?;
        if guard.is_some() {
            bail!("a service server is already attached");
        }
        *guard = Some(handler);
        Ok(())
    }

    pub fn call(&self, a: i64, b: i64) -> Result<i64> {
        let handler = self
            .shared
            .handler
            .lock()
            .map_err(|_| anyhow!("service handler lock poisoned"))?
            .clone()
            .ok_or_else(|| anyhow!("no service server attached"))?;
        Ok(handler.on_request(a, b))
    }

    pub fn available(&self) -> bool {
        self.shared
            .handler
            .lock()
            .is_ok_and(|guard| guard.is_some())
    }
}

/// Addition server counting replies served.
pub struct AdditionServer {
    served: AtomicUsize,
    done_tx: Mutex<Option<Sender<()>>>,
    samples: usize,
}

impl AdditionServer {
    pub fn new(samples: usize) -> (Arc<Self>, mpsc::Receiver<()>) {
        let (done_tx, done_rx) = channel();
        let server = Arc::new(Self {
            served: AtomicUsize::new(0),
            done_tx: Mutex::new(Some(done_tx)),
            samples,
        });
        (server, done_rx)
    }

    /// Block until `samples` replies have been served.
    pub fn run(&self, done_rx: &mpsc::Receiver<()>) {
        info!(samples = self.samples, "running addition server");
        if self.samples > 0 {
            // Wakes when the reply target is reached and the sender is
            // dropped.
            let _ = done_rx.recv();
        }
    }

    pub fn replies_served(&self) -> usize {
        self.served.load(Ordering::SeqCst)
    }
}

impl ServiceHandler for AdditionServer {
    fn on_request(&self, a: i64, b: i64) -> i64 {
        let served = self.served.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(a, b, served, "addition request");
        if served >= self.samples
            && let Ok(mut guard) = self.done_tx.lock()
        {
            // Dropping the sender wakes the run loop.
            guard.take();
        }
        a + b
    }
}

/// Addition client sending deterministic requests.
pub struct AdditionClient<'a> {
    service: &'a LocalService,
    quiet: bool,
}

impl<'a> AdditionClient<'a> {
    pub fn new(service: &'a LocalService, quiet: bool) -> Self {
        Self { service, quiet }
    }

    pub fn run(&self, samples: usize, think_time: bool) -> Result<Vec<i64>> {
        let mut sums = Vec::with_capacity(samples);
        for index in 0..samples as i64 {
            if think_time {
                thread::sleep(Duration::from_millis(50));
            }
            let sum = self
                .service
                .call(index, index + 1)
                .context("addition request failed")?;
            if !self.quiet {
                report::result_line(&[index, index + 1, sum]);
            }
            sums.push(sum);
        }
        Ok(sums)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn addition_round_trip() {
        let service = LocalService::new();
        let (server, _done_rx) = AdditionServer::new(3);
        service.attach(server.clone()).expect("attach");

        let client = AdditionClient::new(&service, true);
        let sums = client.run(3, false).expect("run");
        assert_eq!(sums, vec![1, 3, 5]);
        assert_eq!(server.replies_served(), 3);
    }

    #[test]
    fn call_without_server_errors() {
        let service = LocalService::new();
        assert!(!service.available());
        assert!(service.call(1, 2).is_err());
    }

    #[test]
    fn run_unblocks_once_target_served() {
        let service = LocalService::new();
        let (server, done_rx) = AdditionServer::new(2);
        service.attach(server.clone()).expect("attach");

        let waiter = {
            let server = server.clone();
            thread::spawn(move || server.run(&done_rx))
        };
        let client = AdditionClient::new(&service, true);
        client.run(2, false).expect("run");
        waiter.join().expect("server run");
    }
}
