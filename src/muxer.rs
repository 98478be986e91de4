use std::io;
use std::os::fd::{AsRawFd, OwnedFd};
use std::process::Stdio;

use anyhow::{anyhow, Context, Result};
use bytes::Bytes;
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::info;

use crate::config::Config;
use crate::output;

/// File descriptor the child reads MJPEG from, beyond the standard three.
const VIDEO_FD: i32 = 3;

/// ffmpeg argv for the container mux: MJPEG arrives on inherited fd 3, PCM
/// (when enabled) on stdin, and the Matroska stream leaves on stdout with
/// both streams copied, not re-encoded.
fn mux_args(audio: bool, sample_rate: u32, delay: f64) -> Vec<String> {
    let mut args: Vec<String> = ["-nostdin", "-f", "mjpeg", "-i", "pipe:3"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    if audio {
        args.extend([
            "-f".into(),
            "s32be".into(),
            "-ac".into(),
            "2".into(),
            "-ar".into(),
            sample_rate.to_string(),
            "-itsoffset".into(),
            delay.to_string(),
            "-i".into(),
            "pipe:0".into(),
        ]);
    }

    args.extend([
        "-f".into(),
        "matroska".into(),
        "-codec".into(),
        "copy".into(),
        "pipe:1".into(),
    ]);
    args
}

/// Spawn the external muxer and pump both queues into it, forwarding the
/// container stream to our own stdout. Only returns on a fatal condition.
pub async fn run(
    video_rx: mpsc::Receiver<Bytes>,
    audio_rx: mpsc::Receiver<Bytes>,
    config: &Config,
) -> Result<()> {
    let args = mux_args(config.audio, config.ar, config.delay);

    let (video_read, video_write) =
        io::pipe().context("unable to set up the muxer video pipe")?;
    let video_read_fd = video_read.as_raw_fd();

    let mut command = Command::new("ffmpeg");
    command
        .args(&args)
        .stdin(if config.audio {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit());

    // Surface the video pipe to the child as fd 3; dup2 clears close-on-exec
    // on the duplicate, so it survives the exec.
    unsafe {
        command.pre_exec(move || {
            if libc::dup2(video_read_fd, VIDEO_FD) < 0 {
                return Err(io::Error::last_os_error());
            }
            Ok(())
        });
    }

    let mut child = command.spawn().context("unable to start ffmpeg")?;
    info!("muxer started: ffmpeg {}", args.join(" "));

    // The child owns its copy now; keeping our read end open would hold the
    // muxer alive after the video writer exits.
    drop(video_read);

    let video_pipe = tokio::fs::File::from_std(std::fs::File::from(OwnedFd::from(video_write)));
    output::spawn_fatal("video writer", output::drain(video_rx, video_pipe, "video"));

    if config.audio {
        let audio_pipe = child
            .stdin
            .take()
            .context("unable to set up the muxer audio pipe")?;
        output::spawn_fatal("audio writer", output::drain(audio_rx, audio_pipe, "audio"));
    }

    let mut muxed = child
        .stdout
        .take()
        .context("unable to set up the muxer output pipe")?;
    let mut stdout = tokio::io::stdout();
    tokio::io::copy(&mut muxed, &mut stdout)
        .await
        .context("unable to forward the muxer output")?;

    Err(anyhow!("muxer closed its output stream"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argv_with_audio() {
        let args = mux_args(true, 48_000, 0.5);

        assert_eq!(
            args,
            vec![
                "-nostdin", "-f", "mjpeg", "-i", "pipe:3", "-f", "s32be", "-ac", "2", "-ar",
                "48000", "-itsoffset", "0.5", "-i", "pipe:0", "-f", "matroska", "-codec", "copy",
                "pipe:1",
            ]
        );
    }

    #[test]
    fn argv_without_audio() {
        let args = mux_args(false, 48_000, 0.5);

        assert_eq!(
            args,
            vec!["-nostdin", "-f", "mjpeg", "-i", "pipe:3", "-f", "matroska", "-codec", "copy", "pipe:1"]
        );
    }
}
