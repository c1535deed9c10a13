//! # adb-mcp
//!
//! MCP (Model Context Protocol) server that exposes Android Debug Bridge
//! automation as tools. Runs as a stdio JSON-RPC server, designed to be
//! launched by an AI agent host. Every tool call becomes one or more `adb`
//! invocations whose text output is parsed into a uniform result envelope.
//!
//! ## Architecture
//!
//! ```text
//! main.rs       entry point, config loading, logging, MCP server launch
//! config.rs     CLI / JSON file / env-var configuration
//! error.rs      error type for configuration and device enumeration
//! runner.rs     adb process invocation and outcome capture
//! devices.rs    device enumeration, default device, device info
//! parse.rs      parsers for adb text output (pure functions)
//! envelope.rs   the {success, data, error, message} result shape
//! ops/          tool handlers: device, screen, app, file, shell
//! tools.rs      tool definitions and dispatch
//! mcp.rs        MCP JSON-RPC protocol handler (stdio)
//! ```

mod config;
mod devices;
mod envelope;
mod error;
mod mcp;
mod ops;
mod parse;
mod runner;
mod tools;

use std::sync::Arc;

use clap::Parser;
use config::Cli;
use devices::DeviceRegistry;
use ops::ToolContext;
use runner::AdbRunner;
use tracing::info;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    let config = match config::load_config(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("adb-mcp: configuration error: {e}");
            std::process::exit(1);
        }
    };

    // Stdout is the protocol channel, so logs go to stderr.
    let log_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| config.log_level.clone());
    tracing_subscriber::fmt()
        .with_env_filter(log_filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    info!("adb-mcp v{} starting", env!("CARGO_PKG_VERSION"));
    info!(
        adb = %config.adb_path,
        default_device = config.default_device.as_deref().unwrap_or("none"),
        download_path = %config.paths.download_path,
        read_path = %config.paths.read_path,
        "configuration loaded"
    );

    config.paths.ensure_read_dir();

    let runner = Arc::new(AdbRunner::new(config.adb_path));
    let registry = DeviceRegistry::with_default(runner, config.default_device);
    let ctx = ToolContext::new(registry, config.paths);

    mcp::run_stdio(ctx).await;
    info!("adb-mcp stopped");
}
