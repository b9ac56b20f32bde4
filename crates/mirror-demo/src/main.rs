mod config;
mod synth;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio::sync::mpsc;
use tracing::{info, warn};

use mirror_codec_jpeg::JpegCodec;
use mirror_core::connection::{self, BackoffConfig, ConnectionEvent};
use mirror_core::{Frame, FrameReceiver, FrameSender};
use mirror_platform::FrameCodec;
use mirror_transport_ws::WsConnector;

use config::SessionConfig;
use synth::SyntheticSource;

#[derive(Parser, Debug)]
#[command(name = "mirror-demo")]
#[command(about = "Reference sender/receiver pipeline for the delta-streaming mirroring protocol")]
#[command(version)]
struct Cli {
    /// WebSocket URL to stream to. Omit to run the in-process loopback demo.
    #[arg(long, env = "MIRROR_SERVER_URL")]
    server_url: Option<String>,

    /// Path to the persisted session config.
    #[arg(long, env = "MIRROR_CONFIG_PATH")]
    config_path: Option<String>,

    /// Synthetic source width.
    #[arg(long, default_value_t = 256)]
    width: u32,

    /// Synthetic source height.
    #[arg(long, default_value_t = 144)]
    height: u32,

    /// How many frames to push in loopback mode before exiting.
    #[arg(long, default_value_t = 30)]
    ticks: u32,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "MIRROR_LOG_LEVEL")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    info!("mirror-demo v{} starting", env!("CARGO_PKG_VERSION"));

    let config_path = cli
        .config_path
        .map(std::path::PathBuf::from)
        .unwrap_or_else(SessionConfig::default_path);

    let mut session_config = if config_path.exists() {
        info!("loading config from {}", config_path.display());
        SessionConfig::load(&config_path)?
    } else {
        info!("no config found, using defaults");
        SessionConfig::default()
    };

    if let Some(url) = cli.server_url {
        session_config.server_url = url;
    }
    session_config.save(&config_path)?;

    if session_config.server_url.is_empty() {
        run_loopback_demo(&session_config, cli.width, cli.height, cli.ticks).await
    } else {
        run_remote_sender(&session_config, cli.width, cli.height).await
    }
}

/// Runs sender and receiver in the same process over nothing but the wire
/// codec itself — no transport at all, since the point is exercising
/// encode → decode → reconstruct end to end.
async fn run_loopback_demo(config: &SessionConfig, width: u32, height: u32, ticks: u32) -> Result<()> {
    info!("running loopback demo: {}x{}, {} ticks", width, height, ticks);

    let source = SyntheticSource::new(width, height, config.tile_size.min(width.min(height)));
    let jpeg = JpegCodec::new(config.jpeg_quality);
    let jpeg_for_receiver = JpegCodec::new(config.jpeg_quality);

    let mut sender = FrameSender::new(
        source,
        JpegCodec::new(config.jpeg_quality),
        jpeg,
        config.tile_size,
        config.fallback_threshold,
    )
    .await
    .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let (w, h) = sender.geometry();
    let grid = mirror_core::TileGrid::new(w, h, config.tile_size);
    let mut receiver = FrameReceiver::new(grid, JpegCodec::new(config.jpeg_quality));

    for _ in 0..ticks {
        let frame = sender.next_frame().await.map_err(|e| anyhow::anyhow!(e.to_string()))?;
        let wire_bytes = frame.encode();
        let decoded = Frame::decode(&wire_bytes).map_err(|e| anyhow::anyhow!(e.to_string()))?;

        let outcome = receiver
            .apply(&decoded, |bytes| {
                <JpegCodec as FrameCodec>::decode(&jpeg_for_receiver, bytes)
                    .map_err(|e| mirror_core::CoreError::Codec(e.to_string()))
            })
            .map_err(|e| anyhow::anyhow!(e.to_string()))?;

        info!(
            seq = decoded.seq(),
            kind = frame_kind(&decoded),
            applied = outcome.applied,
            resync = outcome.request_resync,
            "tick"
        );

        if outcome.request_resync {
            // Round-trip an actual `Frame::Resync` through the wire codec rather
            // than flipping sender state directly — this is the same control
            // frame a real receiver would send back over the transport.
            let resync = Frame::Resync { seq: decoded.seq(), ts: 0 };
            let resync_bytes = resync.encode();
            match Frame::decode(&resync_bytes) {
                Ok(Frame::Resync { .. }) => sender.force_keyframe(),
                Ok(other) => warn!("expected Resync, decoded {}", frame_kind(&other)),
                Err(e) => warn!("malformed resync frame: {}", e),
            }
        }
    }

    info!("loopback demo finished, canvas ready = {}", receiver.canvas().is_ready());
    Ok(())
}

/// Dials out to a real peer and streams the synthetic source, reconnecting
/// with backoff on failure. There is no receive-side rendering in this
/// mode; it exists to exercise `mirror-transport-ws` against a real socket.
async fn run_remote_sender(config: &SessionConfig, width: u32, height: u32) -> Result<()> {
    info!("connecting to {}", config.server_url);

    let connector: Arc<dyn mirror_platform::Connector> =
        Arc::new(WsConnector::new(config.server_url.clone()));
    let backoff = BackoffConfig {
        base: Duration::from_secs(config.reconnect_base_delay_secs),
        max: Duration::from_secs(config.reconnect_max_delay_secs),
    };

    let (inbound_tx, mut inbound_rx) = mpsc::channel::<Vec<u8>>(64);
    let (event_tx, mut event_rx) = mpsc::channel::<ConnectionEvent>(16);
    let (resync_tx, mut resync_rx) = mpsc::channel::<()>(8);

    let handle = connection::spawn_connection(
        connector,
        backoff,
        Duration::from_secs(config.connect_timeout_secs),
        mirror_core::DEFAULT_OUTBOUND_HIGH_WATER,
        inbound_tx,
        event_tx,
    );

    tokio::spawn(async move {
        while let Some(data) = inbound_rx.recv().await {
            match Frame::decode(&data) {
                Ok(Frame::Resync { seq, .. }) => {
                    info!(seq, "peer requested resync");
                    let _ = resync_tx.send(()).await;
                }
                Ok(frame) => info!(
                    seq = frame.seq(),
                    latency_ms = mirror_core::latency_ms(&frame),
                    "received control frame from peer"
                ),
                Err(e) => warn!("malformed frame from peer: {}", e),
            }
        }
    });

    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            match event {
                ConnectionEvent::Connected => info!("connected"),
                ConnectionEvent::Disconnected { attempt } => warn!("disconnected (attempt {})", attempt),
                ConnectionEvent::Reconnecting { attempt, delay } => {
                    info!("reconnecting in {:.1}s (attempt {})", delay.as_secs_f64(), attempt)
                }
            }
        }
    });

    let source = SyntheticSource::new(width, height, config.tile_size.min(width.min(height)));
    let mut sender = FrameSender::new(
        source,
        JpegCodec::new(config.jpeg_quality),
        JpegCodec::new(config.jpeg_quality),
        config.tile_size,
        config.fallback_threshold,
    )
    .await
    .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let frame_interval = Duration::from_millis(1000 / config.fps.max(1) as u64);
    let mut interval = tokio::time::interval(frame_interval);

    info!("streaming, press Ctrl+C to stop");

    loop {
        tokio::select! {
            _ = interval.tick() => {
                match sender.next_frame().await {
                    Ok(frame) => {
                        if !handle.send_frame(frame) {
                            warn!("outbound queue saturated, frame dropped");
                        }
                    }
                    Err(e) => warn!("capture/encode failed: {}", e),
                }
            }
            Some(()) = resync_rx.recv() => {
                info!("honoring peer resync, next frame will be a keyframe");
                sender.force_keyframe();
            }
            _ = tokio::signal::ctrl_c() => {
                info!("received Ctrl+C, shutting down");
                handle.stop();
                break;
            }
        }
    }

    Ok(())
}

fn frame_kind(frame: &Frame) -> &'static str {
    match frame {
        Frame::Empty { .. } => "empty",
        Frame::Keyframe { .. } => "keyframe",
        Frame::Delta { .. } => "delta",
        Frame::Resync { .. } => "resync",
        Frame::Input { .. } => "input",
    }
}
