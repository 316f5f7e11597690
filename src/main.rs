//! rtsp-mosaic command line
//!
//! ```text
//! rtsp-mosaic --config streams.json
//! rtsp-mosaic --login admin --password secret --ip_address 10.0.0.5 --port 554 --source cam1 \
//!             --output out.mp4 --display
//! ```
//!
//! With `--display`, type `q` (or `esc`) and Enter to quit, `r` to reconnect
//! every stream and `s` to save a snapshot. Ctrl-C stops everything.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use rtsp_mosaic::{
    AppConfig, ConsoleDisplay, FfmpegBackend, Orchestrator, OrchestratorConfig, RecorderSession,
    RecorderTarget, SessionConfig, SessionManager, StreamEndpoint, Transport,
};

/// Multi-stream RTSP viewer and recorder
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Stream login (single stream without a config file)
    #[arg(long)]
    login: Option<String>,

    /// Stream password
    #[arg(long)]
    password: Option<String>,

    /// Stream host
    #[arg(long = "ip_address")]
    ip_address: Option<String>,

    /// Stream port
    #[arg(long)]
    port: Option<String>,

    /// Stream path on the host
    #[arg(long)]
    source: Option<String>,

    /// Record the first stream to this file
    #[arg(long)]
    output: Option<PathBuf>,

    /// Show the composite and read commands from stdin
    #[arg(long)]
    display: bool,

    /// Recording frame rate
    #[arg(long, default_value_t = 20)]
    fps: u32,

    /// Request RTP over UDP instead of interleaved TCP
    #[arg(long)]
    udp: bool,

    /// Where `s` saves snapshots
    #[arg(long, default_value = "snapshots")]
    snapshot_dir: PathBuf,
}

/// What to run, resolved from the flags and the config file
#[derive(Debug)]
struct Plan {
    streams: Vec<StreamEndpoint>,
    record_path: Option<PathBuf>,
    display: bool,
    orchestrator: OrchestratorConfig,
}

impl Plan {
    fn from_cli(cli: &Cli) -> Result<Self> {
        let mut orchestrator = OrchestratorConfig::default();

        let Some(path) = &cli.config else {
            let endpoint = single_endpoint(cli)?;
            return Ok(Self {
                streams: vec![endpoint],
                record_path: cli.output.clone(),
                display: cli.display,
                orchestrator,
            });
        };

        let config = AppConfig::load(path)
            .with_context(|| format!("failed to load {}", path.display()))?;

        if let Some(window) = config.display_window() {
            orchestrator = orchestrator.canvas_size(window.size()).grid(window.grid());
        }

        Ok(Self {
            record_path: cli
                .output
                .clone()
                .or_else(|| config.recording_path().map(PathBuf::from)),
            display: cli.display || config.display_window().is_some(),
            streams: config.streams,
            orchestrator,
        })
    }
}

fn single_endpoint(cli: &Cli) -> Result<StreamEndpoint> {
    match (&cli.login, &cli.password, &cli.ip_address, &cli.port, &cli.source) {
        (Some(login), Some(password), Some(host), Some(port), Some(source)) => Ok(
            StreamEndpoint::new(login, password, host, port, source),
        ),
        _ => bail!(
            "either --config or all of --login, --password, --ip_address, --port and --source are required"
        ),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rtsp_mosaic=info")),
        )
        .init();

    let plan = match Plan::from_cli(&cli) {
        Ok(plan) => plan,
        Err(e) => {
            tracing::error!("Configuration error: {:#}", e);
            return Ok(());
        }
    };

    let backend = Arc::new(FfmpegBackend::new());
    let cancel = CancellationToken::new();

    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Interrupt received, shutting down");
                cancel.cancel();
            }
        }
    });

    let session_config = SessionConfig::default().transport(if cli.udp {
        Transport::Udp
    } else {
        Transport::Tcp
    });

    let mut orchestrator = Orchestrator::new(plan.orchestrator, cancel.clone());
    for endpoint in plan.streams {
        let mut session =
            SessionManager::with_parent(Arc::clone(&backend), session_config.clone(), &cancel);
        session.configure(endpoint.clone());

        match session.start().await {
            Ok(()) => orchestrator.add_session(session),
            Err(e) => tracing::error!(stream = %endpoint, error = %e, "Failed to start stream"),
        }
    }

    if orchestrator.sessions().is_empty() {
        bail!("no stream could be started");
    }

    if let Some(path) = plan.record_path {
        let first = &orchestrator.sessions()[0];
        let mut recorder = RecorderSession::with_parent(Arc::clone(&backend), &cancel);
        recorder.configure(
            RecorderTarget::new()
                .output_path(path)
                .target_fps(cli.fps)
                .frame_size(first.resolution()),
        );
        recorder.attach(first.slot());

        match recorder.start().await {
            Ok(()) => orchestrator.set_recorder(recorder),
            Err(e) => tracing::warn!(error = %e, "Could not open video writer, continuing without recording"),
        }
    }

    if plan.display {
        tracing::info!("Commands: q/esc quit, r reconnect all, s snapshot (type then Enter)");
        orchestrator.set_display(ConsoleDisplay::stdin(cli.snapshot_dir.clone()));
    }

    let summary = orchestrator.run().await;

    for session in orchestrator.sessions() {
        let stats = session.stats();
        tracing::info!(
            stream = %session.endpoint().map(ToString::to_string).unwrap_or_default(),
            frames = stats.frames_read,
            fps = stats.fps,
            reconnects = stats.reconnects,
            "Stream summary"
        );
    }
    tracing::info!(
        cycles = summary.cycles,
        elapsed_secs = summary.elapsed.as_secs_f64(),
        cycle_rate = summary.cycle_rate,
        "Processing stopped gracefully"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_stream_flags() {
        let cli = Cli::parse_from([
            "rtsp-mosaic",
            "--login",
            "admin",
            "--password",
            "secret",
            "--ip_address",
            "10.0.0.5",
            "--port",
            "554",
            "--source",
            "cam1",
            "--output",
            "out.mp4",
        ]);

        let plan = Plan::from_cli(&cli).unwrap();
        assert_eq!(plan.streams.len(), 1);
        assert_eq!(plan.streams[0].to_string(), "10.0.0.5:554/cam1");
        assert_eq!(plan.record_path, Some(PathBuf::from("out.mp4")));
        assert!(!plan.display);
        assert_eq!(cli.fps, 20);
    }

    #[test]
    fn test_incomplete_flags() {
        let cli = Cli::parse_from(["rtsp-mosaic", "--login", "admin"]);
        assert!(Plan::from_cli(&cli).is_err());
    }

    #[test]
    fn test_config_file_plan() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("streams.json");
        std::fs::write(
            &path,
            r#"{
                "rtsp_streams": {
                    "a": {"network": {"login": "u", "password": "p", "ip_address": "h1", "port": 554, "source": "s"}},
                    "b": {"network": {"login": "u", "password": "p", "ip_address": "h2", "port": 554, "source": "s"}}
                }
            }"#,
        )
        .unwrap();

        let cli = Cli::parse_from(["rtsp-mosaic", "--config", path.to_str().unwrap()]);
        let plan = Plan::from_cli(&cli).unwrap();

        assert_eq!(plan.streams.len(), 2);
        assert!(plan.record_path.is_none());
        assert!(!plan.display);
    }
}
