// src/dispatch/testing.rs
// =============================================================================
// Fetchers for tests. No network: pages come from memory.
// =============================================================================

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::fetch::{FetchBuffer, FetchError, Fetcher};

fn buffer_of(body: &str) -> FetchBuffer {
    let mut buffer = FetchBuffer::with_cap(usize::MAX);
    buffer
        .append(body.as_bytes())
        .expect("usize::MAX cap never overflows in tests");
    buffer
}

// Serves registered pages, refuses everything else like a dead host.
// Strings that are not URLs fail the way the real fetcher's setup does.
#[derive(Debug, Default)]
pub struct FakeFetcher {
    pages: HashMap<String, String>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, body: &str) -> Self {
        self.pages.insert(url.to_string(), body.to_string());
        self
    }
}

#[async_trait]
impl Fetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchBuffer, FetchError> {
        if let Err(source) = url::Url::parse(url) {
            return Err(FetchError::InvalidUrl {
                url: url.to_string(),
                source,
            });
        }

        match self.pages.get(url) {
            Some(body) => Ok(buffer_of(body)),
            None => Err(FetchError::Connect("connection refused".to_string())),
        }
    }
}

// Blocks inside fetch until the test releases it, so a test can act while
// a request is in flight
#[derive(Debug)]
pub struct GatedFetcher {
    body: String,
    entered: Notify,
    gate: Notify,
}

impl GatedFetcher {
    pub fn new(body: &str) -> Self {
        Self {
            body: body.to_string(),
            entered: Notify::new(),
            gate: Notify::new(),
        }
    }

    pub async fn wait_until_entered(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self) {
        self.gate.notify_one();
    }
}

#[async_trait]
impl Fetcher for GatedFetcher {
    async fn fetch(&self, _url: &str) -> Result<FetchBuffer, FetchError> {
        self.entered.notify_one();
        self.gate.notified().await;
        Ok(buffer_of(&self.body))
    }
}
