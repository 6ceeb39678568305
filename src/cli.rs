// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// Two subcommands:
// - serve: run the service (broker + worker pool)
// - query: ask a running service about one URL
//
// The flags of `serve` are the service's whole configuration surface;
// they are converted into a ServiceConfig (src/config.rs) before use.
// =============================================================================

use std::net::SocketAddr;
use std::time::Duration;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::config::{
    FetchConfig, ServiceConfig, DEFAULT_LISTEN, DEFAULT_MAX_BODY_BYTES, DEFAULT_MAX_REDIRECTS,
    DEFAULT_QUEUE_DEPTH, DEFAULT_USER_AGENT, DEFAULT_WORKERS,
};

// #[derive(Parser)] tells clap to automatically generate parsing code
// The #[command(...)] attributes configure how the CLI behaves
#[derive(Parser, Debug)]
#[command(
    name = "linkfinder",
    version = "0.1.0",
    about = "Fetch a page and reply with every link on it",
    long_about = "linkfinder runs a small network service: clients send a URL, a pool of workers \
                  fetches the page, and the client gets back the href of every <a> element as JSON."
)]
pub struct Cli {
    /// More log output (-v debug, -vv trace). RUST_LOG overrides this.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the link-finding service
    ///
    /// Example: linkfinder serve --listen 127.0.0.1:5555 --workers 8
    Serve(ServeArgs),

    /// Send one URL to a running service and print the links it found
    ///
    /// Example: linkfinder query https://www.rust-lang.org
    Query {
        /// URL of the page to scan
        url: String,

        /// Address of the service
        #[arg(long, default_value = "localhost:5555")]
        server: String,

        /// Print the reply exactly as received instead of a list
        #[arg(long)]
        raw: bool,
    },
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to accept clients on
    #[arg(long, default_value = DEFAULT_LISTEN)]
    pub listen: SocketAddr,

    /// Number of worker tasks fetching pages
    #[arg(long, default_value_t = DEFAULT_WORKERS)]
    pub workers: usize,

    /// Requests that may wait for a free worker
    #[arg(long, default_value_t = DEFAULT_QUEUE_DEPTH)]
    pub queue_depth: usize,

    /// Largest page body to download, in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_BODY_BYTES)]
    pub max_body_bytes: usize,

    /// User-Agent header sent with every fetch
    #[arg(long, default_value = DEFAULT_USER_AGENT)]
    pub user_agent: String,

    /// Redirects to follow before giving up
    #[arg(long, default_value_t = DEFAULT_MAX_REDIRECTS)]
    pub max_redirects: usize,

    /// Give up on a fetch after this many seconds (default: wait forever)
    #[arg(long)]
    pub timeout_secs: Option<u64>,
}

impl From<ServeArgs> for ServiceConfig {
    fn from(args: ServeArgs) -> Self {
        ServiceConfig {
            listen: args.listen,
            workers: args.workers,
            queue_depth: args.queue_depth,
            fetch: FetchConfig {
                user_agent: args.user_agent,
                max_redirects: args.max_redirects,
                timeout: args.timeout_secs.map(Duration::from_secs),
                max_body_bytes: args.max_body_bytes,
            },
        }
    }
}
