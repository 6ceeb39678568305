// src/client.rs
// =============================================================================
// A small client for the service: connect, send one URL, read one reply.
//
// This is what `linkfinder query <url>` uses. It speaks the same line
// protocol as any other client, so it is also handy for poking at a
// running server by hand.
// =============================================================================

use anyhow::{anyhow, bail, Context, Result};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LinesCodec};

use crate::extract::{DONE_SENTINEL, ERROR_SENTINEL};

// What a reply line means to the person who asked
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Links(Vec<String>),
    Failed,
    ShuttingDown,
}

#[derive(Deserialize)]
struct LinksDocument {
    links: Vec<String>,
}

/// Sends `url` to the service at `server` and returns the raw reply line.
pub async fn query(server: &str, url: &str) -> Result<String> {
    let stream = TcpStream::connect(server)
        .await
        .with_context(|| format!("could not connect to {server}"))?;
    let mut framed = Framed::new(stream, LinesCodec::new());

    framed.send(url).await.context("could not send request")?;

    match framed.next().await {
        Some(line) => Ok(line.context("could not read reply")?),
        None => bail!("server closed the connection without replying"),
    }
}

/// Interprets a reply line.
pub fn parse_reply(reply: &str) -> Result<Answer> {
    match reply {
        ERROR_SENTINEL => Ok(Answer::Failed),
        DONE_SENTINEL => Ok(Answer::ShuttingDown),
        document => {
            let parsed: LinksDocument = serde_json::from_str(document)
                .map_err(|e| anyhow!("unexpected reply {document:?}: {e}"))?;
            Ok(Answer::Links(parsed.links))
        }
    }
}
