use std::net::Ipv4Addr;

use anyhow::{Context, Result};
use bytes::Bytes;
use pcap::{Active, Capture};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::classifier::{classify, Classified};
use crate::config::Config;
use crate::heartbeat::StatusMonitor;
use crate::output;
use crate::protocol::AUDIO_HEADER_LEN;
use crate::reassembly::Reassembler;

const SNAPLEN: i32 = 1500;
const READ_TIMEOUT_MS: i32 = 500;

/// Open a promiscuous capture on the configured interface, filtered to the
/// sender host.
fn open(interface: &str, sender_ip: Ipv4Addr) -> Result<Capture<Active>> {
    let mut capture = Capture::from_device(interface)
        .with_context(|| format!("unable to open capture device {}", interface))?
        .promisc(true)
        .snaplen(SNAPLEN)
        .timeout(READ_TIMEOUT_MS)
        .open()
        .with_context(|| format!("unable to capture on {}", interface))?;

    capture
        .filter(&format!("host {}", sender_ip), true)
        .context("unable to set up the capture filter")?;

    Ok(capture)
}

/// The capture loop: sole producer for both queues and sole owner of the
/// reassembler and status monitor, so neither needs locking. Blocking — run
/// it on a dedicated thread. Only returns on a fatal condition.
pub fn run(
    config: Config,
    video_tx: mpsc::Sender<Bytes>,
    audio_tx: mpsc::Sender<Bytes>,
) -> Result<()> {
    let mut capture = open(&config.interface, config.sender_ip)?;
    info!(
        "capturing on {} (sender {})",
        config.interface, config.sender_ip
    );

    let mut reassembler = Reassembler::new();
    let mut monitor = StatusMonitor::new();

    loop {
        let frame = match capture.next_packet() {
            Ok(packet) => packet.data,
            // The read timeout keeps the loop live without traffic.
            Err(pcap::Error::TimeoutExpired) => continue,
            Err(e) => return Err(e).context("capture read failed"),
        };

        match classify(frame) {
            Classified::Audio(payload) => {
                if !config.audio {
                    continue;
                }
                let Some(pcm) = payload.get(AUDIO_HEADER_LEN..) else {
                    continue;
                };
                // The prefix is still unexplained; keep it visible.
                debug!("audio header: {}", hex::encode(&payload[..AUDIO_HEADER_LEN]));
                output::offer(&audio_tx, Bytes::copy_from_slice(pcm), "audio")?;
            }
            Classified::Status(payload) => {
                if config.processhb {
                    monitor.observe(payload, reassembler.total_frames())?;
                }
            }
            Classified::Video(payload) => {
                if let Some(jpeg) = reassembler.ingest(payload) {
                    output::offer(&video_tx, output::multipart_frame(&jpeg), "video")?;
                }
            }
            Classified::Ignore => {}
        }
    }
}
