use anyhow::Context;
use hmicore_core::{logging, HmiConfig, SharedClock, SystemClock};
use hmicore_runtime::{HmiRuntime, InboundMessage};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

const NODE_PROTOCOL_VERSION: u32 = 1;

#[derive(Debug, Serialize)]
struct NodeVersionHandshake {
    version: &'static str,
    protocol_version: u32,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|arg| arg == "--version-json") {
        let handshake = NodeVersionHandshake {
            version: env!("CARGO_PKG_VERSION"),
            protocol_version: NODE_PROTOCOL_VERSION,
        };
        println!("{}", serde_json::to_string(&handshake)?);
        return Ok(());
    }

    let config = match parse_config_path(&args)? {
        Some(path) => HmiConfig::from_file(&path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => HmiConfig::default_config(),
    };
    logging::init_with(&config.logging)?;

    let clock: SharedClock = Arc::new(SystemClock::new());
    let runtime = HmiRuntime::new(config, clock)?;
    runtime.start()?;
    info!(version = env!("CARGO_PKG_VERSION"), "hmicore-node started");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    info!("input closed");
                    break;
                };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                handle_line(&runtime, line);
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown requested");
                break;
            }
        }
    }

    runtime.stop();
    let stats = runtime.scheduler_stats();
    let log = runtime.event_log();
    info!(
        ticks = stats.tick_count,
        missed = stats.missed_ticks,
        avg_jitter_us = stats.avg_jitter_us,
        events = log.event_count(),
        warnings = log.warning_count(),
        errors = log.error_count(),
        checksum = %log.session_checksum(),
        "hmicore-node stopped"
    );
    Ok(())
}

fn handle_line(runtime: &HmiRuntime, line: &str) {
    let message = match InboundMessage::from_json(line) {
        Ok(message) => message,
        Err(err) => {
            warn!(%err, "undecodable message dropped");
            return;
        }
    };
    let kind = message.kind();
    match runtime.dispatch(message) {
        Ok(true) => {}
        Ok(false) => warn!(kind, "message rejected"),
        Err(err) => warn!(kind, %err, "message failed"),
    }
}

fn parse_config_path(args: &[String]) -> anyhow::Result<Option<PathBuf>> {
    let mut args_iter = args.iter();
    while let Some(arg) = args_iter.next() {
        if arg == "--config" {
            return match args_iter.next() {
                Some(path) => Ok(Some(PathBuf::from(path))),
                None => anyhow::bail!("--config was provided without a path"),
            };
        }
    }
    Ok(None)
}
