// src/config.rs
// =============================================================================
// Runtime settings for the service.
//
// The command line (src/cli.rs) is the only configuration surface. Its
// values are turned into a ServiceConfig here and checked once at startup,
// so the broker and workers never deal with half-valid settings.
// =============================================================================

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{bail, Result};

/// Where the service listens when no --listen is given.
pub const DEFAULT_LISTEN: &str = "0.0.0.0:5555";

/// Size of the worker pool when no --workers is given.
pub const DEFAULT_WORKERS: usize = 4;

/// Jobs that may wait for an idle worker before clients are held back.
pub const DEFAULT_QUEUE_DEPTH: usize = 64;

/// Largest page body we are willing to download (10 MiB).
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

pub const DEFAULT_MAX_REDIRECTS: usize = 10;

/// The service has always introduced itself as an old Firefox.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows; U; Windows NT 6.1; ru; rv:1.9.2b5) Gecko/20091204 Firefox/3.6b5";

/// How pages are downloaded.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub max_redirects: usize,
    /// None means a fetch may take as long as the server does
    pub timeout: Option<Duration>,
    pub max_body_bytes: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_redirects: DEFAULT_MAX_REDIRECTS,
            timeout: None,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

/// Everything `linkfinder serve` needs.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub listen: SocketAddr,
    pub workers: usize,
    pub queue_depth: usize,
    pub fetch: FetchConfig,
}

impl ServiceConfig {
    /// Rejects settings the service cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            bail!("worker pool needs at least one worker");
        }
        if self.queue_depth == 0 {
            bail!("queue depth must be at least 1");
        }
        if self.fetch.max_body_bytes == 0 {
            bail!("max body size must be greater than zero");
        }
        if self.fetch.user_agent.trim().is_empty() {
            bail!("user agent must not be empty");
        }
        Ok(())
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 5555)),
            workers: DEFAULT_WORKERS,
            queue_depth: DEFAULT_QUEUE_DEPTH,
            fetch: FetchConfig::default(),
        }
    }
}
