// src/dispatch/worker.rs
// =============================================================================
// A worker answers one request at a time, forever (or until shutdown).
//
// One iteration:
//   await job → fetch → parse + extract → encode → reply
//                 └── setup or transport failure ──→ reply ERROR
//
// Every per-request value (the URL, the fetch buffer, the parsed document,
// the link list) lives inside one iteration and is dropped before the next
// job is taken. Nothing is shared with other workers.
//
// Shutdown:
// - The CancellationToken is checked before waiting for a job and again
//   right before replying
// - A job held when shutdown is seen is answered DONE instead of its result
// - A fetch already in flight is never interrupted, it finishes first
// =============================================================================

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::queue::JobReceiver;
use crate::extract::{encode, links_in_page, Reply};
use crate::fetch::Fetcher;

pub struct Worker {
    id: usize,
    jobs: JobReceiver,
    fetcher: Arc<dyn Fetcher>,
    cancel: CancellationToken,
}

impl Worker {
    pub fn new(
        id: usize,
        jobs: JobReceiver,
        fetcher: Arc<dyn Fetcher>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            id,
            jobs,
            fetcher,
            cancel,
        }
    }

    /// Serves jobs until shutdown or until the queue closes.
    ///
    /// Returns how many requests this worker answered.
    pub async fn run(self) -> usize {
        let mut answered = 0;
        info!(worker = self.id, "worker ready");

        loop {
            // Cancellation wins over a job that is ready at the same moment
            let job = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                job = self.jobs.next() => match job {
                    Some(job) => job,
                    None => break,
                },
            };

            debug!(worker = self.id, url = job.url(), "request received");
            let reply = self.handle(job.url()).await;

            if self.cancel.is_cancelled() {
                debug!(worker = self.id, "shutdown seen before reply, sending DONE");
                job.respond(Reply::Done);
                answered += 1;
                break;
            }

            if !job.respond(reply) {
                debug!(worker = self.id, "client left before the reply was ready");
            }
            answered += 1;
        }

        info!(worker = self.id, answered, "worker stopped");
        answered
    }

    // fetch → parse → encode for one URL
    //
    // Only fetch failures produce ERROR. A page that parses to nothing is
    // still a success with an empty link list.
    async fn handle(&self, url: &str) -> Reply {
        let buffer = match self.fetcher.fetch(url).await {
            Ok(buffer) => buffer,
            Err(e) => {
                // setup = true: nothing was sent over the network
                warn!(worker = self.id, url, setup = e.is_setup(), error = %e, "fetch failed");
                return Reply::Error;
            }
        };

        debug!(worker = self.id, bytes = buffer.len(), "parsing");
        let links = links_in_page(&buffer.as_text());
        drop(buffer);

        debug!(worker = self.id, links = links.len(), "replying");
        encode(links)
    }
}
