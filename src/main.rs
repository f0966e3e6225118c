use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use live_guide::hotkey::{self, HotkeyTarget, LineHotkeys};
use live_guide::session::control_channel;
use live_guide::{
    create_router, AppState, Config, ControlMode, NatsTransport, SessionManager,
    SessionSupervisor,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "live-guide", version, about = "Real-time voice and screen session coordinator")]
struct Cli {
    /// Config file path, without extension
    #[arg(long, default_value = "config/live-guide")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP control surface
    Serve {
        /// Also read t/r/q hotkeys from stdin and route them to the running session
        #[arg(long)]
        stdin_hotkeys: bool,
    },
    /// Run a single session in the foreground with stdin hotkeys
    Run {
        /// Hold-to-talk instead of toggle mute
        #[arg(long)]
        ptt: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;

    info!("Live Guide v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded config: {}", cfg.service.name);
    info!("Model: {}", cfg.session.model);

    let transport = Arc::new(NatsTransport::new(
        cfg.transport.nats_url.clone(),
        cfg.transport.subject_prefix.clone(),
    ));
    let devices = Arc::new(cfg.devices.file_devices());

    match cli.command {
        Command::Serve { stdin_hotkeys } => {
            let mut manager = SessionManager::new(cfg.session.clone(), transport, devices);
            if stdin_hotkeys {
                manager = manager.with_hotkeys(Box::new(LineHotkeys::stdin()));
            }
            let state = AppState::new(manager);
            let app = create_router(state.clone());

            let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("Failed to bind {}", addr))?;
            info!("HTTP control surface listening on {}", addr);

            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = tokio::signal::ctrl_c().await;
                    info!("Shutdown signal received");
                })
                .await
                .context("HTTP server failed")?;

            if state.manager.stop().await.is_ok() {
                info!("Stopped running session on shutdown");
            }
        }
        Command::Run { ptt } => {
            let mode = ControlMode::from_push_to_talk(ptt);
            let (control_tx, control_rx) = control_channel();
            let shutdown = CancellationToken::new();

            let supervisor = SessionSupervisor::new(
                cfg.session.clone(),
                mode,
                transport,
                devices,
                control_rx,
                shutdown.clone(),
            );

            let target = HotkeyTarget {
                mode,
                control_tx,
                shutdown: shutdown.clone(),
            };
            if let Err(e) = hotkey::spawn_listener(Box::new(LineHotkeys::stdin()), target) {
                warn!("Hotkeys unavailable: {}", e);
            }

            let signal_token = shutdown.clone();
            tokio::spawn(async move {
                let _ = tokio::signal::ctrl_c().await;
                info!("Shutdown signal received");
                signal_token.cancel();
            });

            let stats = supervisor.run().await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }

    Ok(())
}
