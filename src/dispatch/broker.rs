// src/dispatch/broker.rs
// =============================================================================
// The public side of the service: accepts TCP clients and routes their
// requests to the worker pool.
//
// Protocol (strict request/reply, one message per line):
//   client → "http://example.com\n"
//   server → "{\"links\":[...]}\n"   or   "ERROR\n"   or   "DONE\n"
//
// The broker never looks inside a request or a reply. Each line becomes a
// Job on the queue; the reply that comes back through the Job is written
// to the same connection, and only then is the next line read.
//
// A line that is not UTF-8 cannot name a URL. It is answered ERROR right
// here and the connection stays open.
//
// Rust concepts:
// - Framed + AnyDelimiterCodec: cut the byte stream at '\n' without
//   insisting that each piece is valid UTF-8
// - JoinSet: owns every connection task so shutdown can wait for them
// - tokio::select!: wait on "shutdown" and "next event" at the same time
// =============================================================================

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tokio_util::codec::{AnyDelimiterCodec, AnyDelimiterCodecError, Framed};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::queue::JobSender;
use crate::extract::Reply;

/// Longest request line accepted from a client (64 KiB).
pub const MAX_REQUEST_BYTES: usize = 64 * 1024;

pub struct Broker {
    listener: TcpListener,
}

impl Broker {
    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("could not listen on {addr}"))?;
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accepts clients until `cancel` fires, then waits for every open
    /// connection to send its last reply.
    pub async fn run(self, jobs: JobSender, cancel: CancellationToken) -> Result<()> {
        let mut connections = JoinSet::new();

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        debug!(%peer, "client connected");
                        connections.spawn(serve_connection(stream, peer, jobs.clone(), cancel.clone()));
                    }
                    Err(e) => {
                        // Usually out of file descriptors; back off instead of spinning
                        warn!(error = %e, "accept failed");
                        tokio::time::sleep(Duration::from_millis(100)).await;
                    }
                },
                // Reap finished connections as we go
                Some(_) = connections.join_next(), if !connections.is_empty() => {}
            }
        }

        info!(open = connections.len(), "broker stopped accepting, draining connections");
        drop(jobs);
        while connections.join_next().await.is_some() {}
        Ok(())
    }
}

// Serves one client until it disconnects or the service shuts down
async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    jobs: JobSender,
    cancel: CancellationToken,
) {
    let codec =
        AnyDelimiterCodec::new_with_max_length(b"\n".to_vec(), b"\n".to_vec(), MAX_REQUEST_BYTES);
    let mut framed = Framed::new(stream, codec);

    loop {
        let line = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            line = framed.next() => line,
        };

        let reply = match line {
            Some(Ok(line)) => match std::str::from_utf8(&line) {
                Ok(url) => route(&jobs, url.trim().to_string()).await,
                Err(e) => {
                    debug!(%peer, error = %e, "request is not UTF-8");
                    Reply::Error
                }
            },
            Some(Err(AnyDelimiterCodecError::MaxChunkLengthExceeded)) => {
                warn!(%peer, "request line too long, closing connection");
                let _ = framed.send(Reply::Error.to_wire()).await;
                break;
            }
            Some(Err(AnyDelimiterCodecError::Io(e))) => {
                debug!(%peer, error = %e, "connection error");
                break;
            }
            None => break,
        };

        if let Err(e) = framed.send(reply.to_wire()).await {
            debug!(%peer, error = %e, "could not deliver reply");
            break;
        }
        if reply == Reply::Done {
            break;
        }
    }

    debug!(%peer, "client disconnected");
}

// Hands one request to the pool and waits for its reply
async fn route(jobs: &JobSender, url: String) -> Reply {
    match jobs.submit(url).await {
        Ok(pending) => pending.wait().await,
        Err(_) => Reply::Done,
    }
}
