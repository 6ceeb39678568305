// src/dispatch/queue.rs
// =============================================================================
// The typed job queue between client connections and the worker pool.
//
// How it works:
// 1. A connection turns each request line into a Job (URL + reply channel)
// 2. The Job goes onto a bounded FIFO channel
// 3. Whichever worker is idle takes the next Job off the channel
// 4. The worker answers through the Job's own oneshot channel, so the
//    reply can only reach the client that asked
//
// Fairness:
// - All workers share one receiver behind a tokio Mutex
// - tokio's Mutex is fair (FIFO), so idle workers take turns
// - A worker holds no lock while it fetches, so a busy worker never
//   blocks the others
//
// Rust concepts:
// - mpsc: many producers (connections), one consumer (the shared receiver)
// - oneshot: a channel that carries exactly one value
// - Arc<Mutex<T>>: shared ownership plus exclusive access
// =============================================================================

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot, Mutex};

use crate::extract::Reply;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    /// Every worker has exited, nothing will take new jobs
    #[error("job queue is closed")]
    Closed,
}

// One unit of work: the URL a client sent and where to send the answer
#[derive(Debug)]
pub struct Job {
    url: String,
    reply_to: oneshot::Sender<Reply>,
}

impl Job {
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Sends the reply for this job. Consumes the job, so a job can be
    /// answered at most once.
    ///
    /// Returns false when the client has already gone away.
    pub fn respond(self, reply: Reply) -> bool {
        self.reply_to.send(reply).is_ok()
    }
}

/// The reply a submitted job will eventually produce.
#[derive(Debug)]
pub struct PendingReply {
    rx: oneshot::Receiver<Reply>,
}

impl PendingReply {
    // A job dropped without an answer means its worker shut down before
    // getting to it, and the client is told so
    pub async fn wait(self) -> Reply {
        self.rx.await.unwrap_or(Reply::Done)
    }
}

/// Producer side, cloned into every client connection.
#[derive(Debug, Clone)]
pub struct JobSender {
    tx: mpsc::Sender<Job>,
}

impl JobSender {
    /// Queues a URL for the next idle worker.
    ///
    /// Waits while the queue is full, so a flood of clients slows down
    /// instead of growing memory without bound.
    pub async fn submit(&self, url: String) -> Result<PendingReply, QueueError> {
        let (reply_to, rx) = oneshot::channel();
        self.tx
            .send(Job { url, reply_to })
            .await
            .map_err(|_| QueueError::Closed)?;
        Ok(PendingReply { rx })
    }
}

/// Consumer side, cloned into every worker.
#[derive(Debug, Clone)]
pub struct JobReceiver {
    rx: Arc<Mutex<mpsc::Receiver<Job>>>,
}

impl JobReceiver {
    /// Takes the next job, waiting until one arrives.
    ///
    /// Returns None once every JobSender is gone and the queue is drained.
    pub async fn next(&self) -> Option<Job> {
        let mut rx = self.rx.lock().await;
        rx.recv().await
    }
}

/// Creates a queue holding at most `depth` waiting jobs.
///
/// Panics if `depth` is zero (ServiceConfig::validate rules that out).
pub fn job_queue(depth: usize) -> (JobSender, JobReceiver) {
    let (tx, rx) = mpsc::channel(depth);
    (
        JobSender { tx },
        JobReceiver {
            rx: Arc::new(Mutex::new(rx)),
        },
    )
}
