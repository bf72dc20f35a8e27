//! padmouse server entry point.
//!
//! Listens for the companion app and turns its touch gestures into cursor
//! movement, clicks, and scrolling on this machine.
//!
//! # Usage
//!
//! ```text
//! padmouse-server [OPTIONS]
//!
//! Options:
//!   --config <PATH>            Config file [default: platform config dir]
//!   --bind <IP>                Bind address [config default: 0.0.0.0]
//!   --port <PORT>              TCP port [config default: 8888]
//!   --policy <POLICY>          preempt | reject-new | concurrent
//!   --idle-timeout <SECS>      Seconds of silence before a session is dropped
//!   --sensitivity <FACTOR>     Pointer speed multiplier
//!   --wire-format <FORMAT>     auto | binary | json-lines
//!   --write-default-config     Write a default config file and exit
//! ```
//!
//! Every option can also be given through a `PADMOUSE_*` environment
//! variable (`PADMOUSE_PORT`, `PADMOUSE_POLICY`, ...).  Command-line values
//! override the config file, which overrides built-in defaults.  `RUST_LOG`
//! overrides the configured log level.

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use padmouse_core::WireFormat;
use tracing::info;
use tracing_subscriber::EnvFilter;

use padmouse_server::application::admission::SessionPolicy;
use padmouse_server::application::translate_input::CursorSink;
use padmouse_server::infrastructure::cursor_sink::TracingSink;
use padmouse_server::infrastructure::network::ServerListener;
use padmouse_server::infrastructure::storage::config::{
    config_file_path, load_config_from, save_config_to, AppConfig,
};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Wireless touchpad server.
#[derive(Debug, Parser)]
#[command(
    name = "padmouse-server",
    about = "Turns a phone into a wireless touchpad for this computer",
    version
)]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, env = "PADMOUSE_CONFIG")]
    config: Option<PathBuf>,

    /// IP address to listen on.
    #[arg(long, env = "PADMOUSE_BIND")]
    bind: Option<String>,

    /// TCP port to listen on.
    #[arg(long, env = "PADMOUSE_PORT")]
    port: Option<u16>,

    /// What to do when a second device connects.
    #[arg(long, value_enum, env = "PADMOUSE_POLICY")]
    policy: Option<SessionPolicy>,

    /// Seconds without any received byte before a session is torn down.
    #[arg(long, env = "PADMOUSE_IDLE_TIMEOUT")]
    idle_timeout: Option<u64>,

    /// Pointer and scroll speed multiplier.
    #[arg(long, env = "PADMOUSE_SENSITIVITY")]
    sensitivity: Option<f64>,

    /// Framing accepted from clients.
    #[arg(long, env = "PADMOUSE_WIRE_FORMAT")]
    wire_format: Option<WireFormat>,

    /// Write a default config file to the config path and exit.
    #[arg(long)]
    write_default_config: bool,
}

impl Cli {
    fn config_path(&self) -> anyhow::Result<PathBuf> {
        match &self.config {
            Some(path) => Ok(path.clone()),
            None => config_file_path().context("no --config given and no platform config dir"),
        }
    }

    /// Applies command-line overrides on top of `config`.
    fn apply_overrides(&self, mut config: AppConfig) -> AppConfig {
        if let Some(bind) = &self.bind {
            config.server.bind_address = bind.clone();
        }
        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(policy) = self.policy {
            config.server.session_policy = policy;
        }
        if let Some(secs) = self.idle_timeout {
            config.server.idle_timeout_secs = secs;
        }
        if let Some(sensitivity) = self.sensitivity {
            config.input.sensitivity = sensitivity;
        }
        if let Some(format) = self.wire_format {
            config.input.wire_format = format;
        }
        config
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config_path()?;

    if cli.write_default_config {
        save_config_to(&config_path, &AppConfig::default())
            .with_context(|| format!("failed to write {}", config_path.display()))?;
        println!("wrote default config to {}", config_path.display());
        return Ok(());
    }

    let file_config = load_config_from(&config_path)
        .with_context(|| format!("failed to load {}", config_path.display()))?;
    let config = cli.apply_overrides(file_config);

    // ── Logging setup ─────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level)),
        )
        .init();

    let settings = config.listener_settings().context("invalid configuration")?;
    let bind_addr = config.bind_addr()?;

    info!(
        "padmouse server starting (config {}, policy {}, sensitivity {})",
        config_path.display(),
        settings.policy,
        settings.translator.sensitivity
    );

    // The OS pointer primitive lives outside this crate; log actions until
    // a platform sink is wired in.
    let sink: Arc<dyn CursorSink> = Arc::new(TracingSink::new());
    let listener = ServerListener::bind(bind_addr, settings, sink).await?;

    // ── Status reporting ──────────────────────────────────────────────────────
    let mut status = listener.status();
    tokio::spawn(async move {
        while status.changed().await.is_ok() {
            let s = status.borrow_and_update().clone();
            info!(
                "status: {} ({} session(s), last peer {}, last close: {})",
                s.state,
                s.active_sessions,
                s.last_peer
                    .map_or_else(|| "-".to_string(), |p| p.to_string()),
                s.last_close.as_deref().unwrap_or("-"),
            );
        }
    });

    // ── Graceful shutdown flag ────────────────────────────────────────────────
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C; shutting down");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => tracing::error!("failed to listen for Ctrl+C signal: {e}"),
        }
    });

    listener.run(running).await;

    info!("padmouse server stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
