use std::future::Future;

use anyhow::{anyhow, Context, Result};
use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, error};

/// Depth of the video and audio hand-off queues.
pub const QUEUE_DEPTH: usize = 100;

/// First bytes pushed into the video queue, before any frame, so raw video
/// mode is a valid multipart HTTP body from the first byte.
pub const STREAM_PREAMBLE: &[u8] = b"--myboundary\nContent-Type: image/jpeg\n\n";

const FRAME_BOUNDARY: &[u8] = b"\n--myboundary\nContent-Type: image/jpeg\n\n";

/// Wrap a completed JPEG in the multipart framing used on the video queue.
pub fn multipart_frame(jpeg: &[u8]) -> Bytes {
    let mut buf = Vec::with_capacity(FRAME_BOUNDARY.len() + jpeg.len());
    buf.extend_from_slice(FRAME_BOUNDARY);
    buf.extend_from_slice(jpeg);
    Bytes::from(buf)
}

/// Non-blocking queue offer. A full queue sheds the buffer — the capture
/// loop must never stall behind a slow consumer. A closed queue means its
/// consumer died, which is fatal.
pub fn offer(tx: &mpsc::Sender<Bytes>, buf: Bytes, label: &str) -> Result<()> {
    match tx.try_send(buf) {
        Ok(()) => Ok(()),
        Err(mpsc::error::TrySendError::Full(_)) => {
            debug!("{} queue full, dropping buffer", label);
            Ok(())
        }
        Err(mpsc::error::TrySendError::Closed(_)) => Err(anyhow!("{} queue closed", label)),
    }
}

/// Drain a queue into a writer, flushing after every buffer. Blocking here
/// is fine: backpressure lands on the bounded queue, which sheds instead of
/// stalling the capture loop. Returns an error when the queue closes or the
/// writer breaks; both are fatal.
pub async fn drain<W>(mut rx: mpsc::Receiver<Bytes>, mut writer: W, label: &'static str) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(buf) = rx.recv().await {
        writer
            .write_all(&buf)
            .await
            .with_context(|| format!("unable to write to the {} output", label))?;
        writer
            .flush()
            .await
            .with_context(|| format!("unable to flush the {} output", label))?;
    }

    Err(anyhow!("{} queue closed", label))
}

/// Spawn a task whose failure tears the whole receiver down; the external
/// supervisor is responsible for restarting the process.
pub fn spawn_fatal<F>(name: &'static str, task: F)
where
    F: Future<Output = Result<()>> + Send + 'static,
{
    tokio::spawn(async move {
        if let Err(e) = task.await {
            error!("{} failed: {:#}", name, e);
            std::process::exit(1);
        }
    });
}
