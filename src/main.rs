//! CLI entry point for ccmcp.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::Notify;

use ccmcp::rpc::RpcEngine;
use ccmcp::{AppContext, Config};

/// MCP-style JSON-RPC server: query a relational store, a REST API, and
/// local files through one tool catalogue.
#[derive(Debug, Parser)]
#[command(name = "ccmcp", version, about)]
struct Cli {
    /// Serve over a TCP socket instead of stdio.
    #[arg(long)]
    socket: bool,

    /// Socket bind host (only used with --socket).
    #[arg(long)]
    host: Option<String>,

    /// Socket bind port (only used with --socket).
    #[arg(long)]
    port: Option<u16>,
}

fn main() -> ExitCode {
    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to start async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env();
    if let Some(host) = cli.host {
        config.socket_host = host;
    }
    if let Some(port) = cli.port {
        config.socket_port = port;
    }

    let app = AppContext::build(config.clone())?;
    let engine = Arc::new(RpcEngine::new());

    if cli.socket {
        let shutdown = Arc::new(Notify::new());
        let shutdown_for_signal = Arc::clone(&shutdown);
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("received shutdown signal");
            shutdown_for_signal.notify_one();
        });

        ccmcp::transport::serve_socket(app, engine, &config.socket_host, config.socket_port, shutdown).await?;
    } else {
        let stdin = tokio::io::stdin();
        let stdout = tokio::io::stdout();
        ccmcp::transport::serve_lines(app, &engine, stdin, stdout).await;
    }

    Ok(())
}
