use std::net::{IpAddr, SocketAddr};

use anyhow::Result;
use bytes::Bytes;
use clap::Parser;
use tokio::sync::mpsc;
use tracing::info;

mod capture;
mod classifier;
mod config;
mod heartbeat;
mod muxer;
mod output;
mod protocol;
mod reassembly;
mod telemetry;

use config::{Config, OutputMode};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse().normalize();
    config.validate()?;
    telemetry::init(config.debug);

    info!(
        "starting hdip-rx: sender {}, output {:?}, audio {}",
        config.sender_ip, config.output, config.audio
    );

    let (video_tx, video_rx) = mpsc::channel(output::QUEUE_DEPTH);
    let (audio_tx, audio_rx) = mpsc::channel(output::QUEUE_DEPTH);

    // Queues the selected mode never drains are parked here so the capture
    // loop sheds into a full-but-live channel instead of a closed one.
    let mut parked = Vec::new();

    match config.output {
        OutputMode::Mkv => {
            let muxer_config = config.clone();
            output::spawn_fatal("muxer", async move {
                muxer::run(video_rx, audio_rx, &muxer_config).await
            });
        }
        OutputMode::Video => {
            output::spawn_fatal(
                "video writer",
                output::drain(video_rx, tokio::io::stdout(), "video"),
            );
            parked.push(audio_rx);
        }
        OutputMode::Audio => {
            output::spawn_fatal(
                "audio writer",
                output::drain(audio_rx, tokio::io::stdout(), "audio"),
            );
            parked.push(video_rx);
        }
    }

    video_tx
        .send(Bytes::from_static(output::STREAM_PREAMBLE))
        .await?;

    if config.heartbeat {
        let local = SocketAddr::from(([0, 0, 0, 0], heartbeat::HEARTBEAT_PORT));
        let sender = SocketAddr::new(IpAddr::V4(config.sender_ip), heartbeat::HEARTBEAT_PORT);
        output::spawn_fatal(
            "keepalive broadcaster",
            heartbeat::broadcast_keepalives(local, sender, heartbeat::KEEPALIVE_PERIOD),
        );
    }

    // The capture loop blocks on libpcap; give it its own thread and treat
    // its return, which only happens on a fatal condition, as our exit.
    let capture_config = config.clone();
    tokio::task::spawn_blocking(move || capture::run(capture_config, video_tx, audio_tx))
        .await??;

    drop(parked);
    Ok(())
}
