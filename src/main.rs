// src/main.rs
// =============================================================================
// This is the entry point of the linkfinder binary.
//
// What happens here:
// 1. Parse command-line arguments using clap
// 2. Set up logging (tracing) based on -v and RUST_LOG
// 3. Dispatch to the subcommand handler (serve or query)
// 4. Exit with proper code (0 = success, 1 = service replied ERROR/DONE,
//    2 = error)
// =============================================================================

mod cli;
mod client;
mod config;
mod dispatch;
mod extract;
mod fetch;
mod supervisor;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use client::Answer;
use config::ServiceConfig;
use fetch::HttpFetcher;
use supervisor::Service;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let exit_code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            // {:#} prints the whole context chain on one line
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

// Level used when RUST_LOG is not set
fn default_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

// RUST_LOG wins when set; otherwise -v picks the level
fn init_logging(verbose: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level(verbose)));

    // Logs go to stderr so `query` output on stdout stays clean
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Serve(args) => handle_serve(args.into()).await,
        Commands::Query { url, server, raw } => handle_query(&server, &url, raw).await,
    }
}

// Runs the service until Ctrl-C, then shuts it down cleanly
async fn handle_serve(config: ServiceConfig) -> Result<i32> {
    let fetcher = HttpFetcher::new(&config.fetch).context("could not create HTTP client")?;
    let service = Service::start(&config, Arc::new(fetcher)).await?;

    tokio::signal::ctrl_c()
        .await
        .context("could not listen for Ctrl-C")?;

    service.shutdown().await?;
    Ok(0)
}

// Asks a running service about one URL and prints what came back
async fn handle_query(server: &str, url: &str, raw: bool) -> Result<i32> {
    eprintln!("🔍 Asking {} about {}", server, url);
    let reply = client::query(server, url).await?;

    if raw {
        println!("{}", reply);
        return Ok(if reply.starts_with('{') { 0 } else { 1 });
    }

    match client::parse_reply(&reply)? {
        Answer::Links(links) => {
            for link in &links {
                println!("{}", link);
            }
            eprintln!("✅ {} link(s) found", links.len());
            Ok(0)
        }
        Answer::Failed => {
            eprintln!("❌ The page could not be fetched");
            Ok(1)
        }
        Answer::ShuttingDown => {
            eprintln!("⏹️  The service is shutting down");
            Ok(1)
        }
    }
}
