use std::net::SocketAddr;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use thiserror::Error;
use tokio::net::UdpSocket;
use tracing::{debug, info, trace};

use crate::protocol::keepalive::Keepalive;
use crate::protocol::status::StatusRecord;

/// UDP port for both inbound status records and outbound keepalives.
pub const HEARTBEAT_PORT: u16 = 48689;

/// How often the sender expects to hear from us.
pub const KEEPALIVE_PERIOD: Duration = Duration::from_secs(1);

/// The sender switched encoded resolution mid-stream. The muxer cannot
/// renegotiate its input format, so the process exits and the supervisor
/// restarts it against the new stream.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("encoded stream changed from {old_width}x{old_height} to {new_width}x{new_height}")]
pub struct EncodedFormatChanged {
    pub old_width: u16,
    pub old_height: u16,
    pub new_width: u16,
    pub new_height: u16,
}

/// Consumes inbound status records on the capture thread: logs the sender's
/// view of the signal, estimates the encoded framerate from the reassembler's
/// frame counter, and watches for encoded-format changes.
#[derive(Debug, Default)]
pub struct StatusMonitor {
    /// Last observed encoded dimensions; 0 means not yet seen.
    encoded_width: u16,
    encoded_height: u16,
    prev_total_frames: u64,
    prev_sample: Option<Instant>,
}

impl StatusMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume one status payload. `total_frames` is the reassembler's
    /// running frame count, sampled on the same thread.
    pub fn observe(
        &mut self,
        payload: &[u8],
        total_frames: u64,
    ) -> Result<(), EncodedFormatChanged> {
        self.observe_at(payload, total_frames, Instant::now())
            .map(|_| ())
    }

    fn observe_at(
        &mut self,
        payload: &[u8],
        total_frames: u64,
        now: Instant,
    ) -> Result<f64, EncodedFormatChanged> {
        let record = match StatusRecord::parse(payload) {
            Ok(record) => record,
            Err(e) => {
                debug!("ignoring malformed status record: {}", e);
                return Ok(0.0);
            }
        };

        let encoded_fps = match self.prev_sample {
            Some(prev) => {
                let elapsed = now.duration_since(prev).as_secs_f64();
                if elapsed > 0.0 {
                    (total_frames - self.prev_total_frames) as f64 / elapsed
                } else {
                    0.0
                }
            }
            None => 0.0,
        };
        self.prev_sample = Some(now);
        self.prev_total_frames = total_frames;

        info!(
            "[signal present: {}] {}x{}@{:.1} - {}x{}@{:.1}",
            record.has_signal(),
            record.signal_width,
            record.signal_height,
            record.signal_fps(),
            record.encoded_width,
            record.encoded_height,
            encoded_fps
        );
        debug!(
            "sender up {}s, receiver seen: {}",
            record.uptime_seconds,
            record.receiver_present != 0
        );

        if self.encoded_width != 0
            && self.encoded_height != 0
            && (record.encoded_width != self.encoded_width
                || record.encoded_height != self.encoded_height)
        {
            return Err(EncodedFormatChanged {
                old_width: self.encoded_width,
                old_height: self.encoded_height,
                new_width: record.encoded_width,
                new_height: record.encoded_height,
            });
        }
        self.encoded_width = record.encoded_width;
        self.encoded_height = record.encoded_height;

        Ok(encoded_fps)
    }
}

/// Send the fixed keepalive datagram to the sender on a fixed cadence,
/// forever. Any bind or send failure is fatal to the receiver.
pub async fn broadcast_keepalives(
    local: SocketAddr,
    sender: SocketAddr,
    period: Duration,
) -> Result<()> {
    let socket = UdpSocket::bind(local)
        .await
        .with_context(|| format!("unable to bind keepalive socket on {}", local))?;
    socket
        .connect(sender)
        .await
        .with_context(|| format!("unable to address sender at {}", sender))?;

    let packet = Keepalive::default().to_bytes();
    let mut ticker = tokio::time::interval(period);

    loop {
        ticker.tick().await;
        socket
            .send(&packet)
            .await
            .context("unable to keep broadcasting the keepalives")?;
        trace!("heartbeat sent");
    }
}
