// src/supervisor.rs
// =============================================================================
// Starts the service and stops it cleanly.
//
// What start() does:
// 1. Validate the configuration
// 2. Bind the client-facing TCP listener
// 3. Create the job queue and spawn a fixed pool of workers on it
// 4. Spawn the broker that feeds the queue from TCP clients
//
// Shutdown handshake:
// - shutdown() cancels the shared CancellationToken
// - the broker stops accepting and waits for its connections
// - each worker finishes a fetch that is already running, answers DONE
//   and exits
// - once the last worker is gone, jobs still queued resolve to DONE
// - shutdown() returns after every task has been joined
// =============================================================================

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::ServiceConfig;
use crate::dispatch::{job_queue, Broker, Worker};
use crate::fetch::Fetcher;

pub struct Service {
    addr: SocketAddr,
    cancel: CancellationToken,
    broker: JoinHandle<Result<()>>,
    workers: JoinSet<usize>,
}

impl Service {
    pub async fn start(config: &ServiceConfig, fetcher: Arc<dyn Fetcher>) -> Result<Self> {
        config.validate().context("invalid configuration")?;

        let broker = Broker::bind(config.listen).await?;
        let addr = broker.local_addr()?;
        let cancel = CancellationToken::new();
        let (jobs, queue) = job_queue(config.queue_depth);

        let mut workers = JoinSet::new();
        for id in 0..config.workers {
            let worker = Worker::new(id, queue.clone(), Arc::clone(&fetcher), cancel.clone());
            workers.spawn(worker.run());
        }
        // Only workers may hold the receiving side, so the queue closes
        // when the last of them exits
        drop(queue);

        let broker = tokio::spawn(broker.run(jobs, cancel.clone()));
        info!(%addr, workers = config.workers, "linkfinder listening");

        Ok(Self {
            addr,
            cancel,
            broker,
            workers,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stops accepting work and waits for every task to finish.
    ///
    /// Returns the number of requests the pool answered.
    pub async fn shutdown(mut self) -> Result<usize> {
        info!("shutting down");
        self.cancel.cancel();

        let mut answered = 0;
        while let Some(joined) = self.workers.join_next().await {
            answered += joined.context("worker task failed")?;
        }
        self.broker.await.context("broker task failed")??;

        info!(answered, "shutdown complete");
        Ok(answered)
    }
}
