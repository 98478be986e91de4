use std::net::Ipv4Addr;

use anyhow::{bail, Result};
use clap::{ArgAction, Parser, ValueEnum};

/// What the receiver writes to standard output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputMode {
    /// Multipart MJPEG stream.
    Video,
    /// Raw stereo PCM.
    Audio,
    /// Matroska container from the external muxer.
    Mkv,
}

/// Receiver configuration, straight from the command line.
#[derive(Debug, Clone, Parser)]
#[command(about = "Receiver for LAN HDMI-over-IP sender units")]
pub struct Config {
    /// What interface the sender unit is attached to.
    #[arg(long, default_value = "eth0")]
    pub interface: String,

    /// Print loads of per-fragment debug info.
    #[arg(long)]
    pub debug: bool,

    /// Type of output.
    #[arg(long, value_enum, default_value_t = OutputMode::Mkv)]
    pub output: OutputMode,

    /// Mux audio into the container as well.
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub audio: bool,

    /// Audio sample rate.
    #[arg(long, default_value_t = 48_000)]
    pub ar: u32,

    /// Video-audio delay in seconds.
    #[arg(long, default_value_t = 0.5)]
    pub delay: f64,

    /// Send the packets needed to start/keep the sender transmitting.
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub heartbeat: bool,

    /// Process status heartbeats from the sender.
    #[arg(long)]
    pub processhb: bool,

    /// IPv4 address of the sender unit.
    #[arg(long = "sender-ip", default_value = "192.168.168.55")]
    pub sender_ip: Ipv4Addr,
}

impl Config {
    /// Reject flag values the wire protocol cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.ar != 44_100 && self.ar != 48_000 {
            bail!(
                "invalid audio sample rate {}, only 44100/48000 allowed",
                self.ar
            );
        }
        Ok(())
    }

    /// The raw output modes pin the audio flag: a bare video stream carries
    /// no audio, and a bare audio stream is nothing but.
    pub fn normalize(mut self) -> Self {
        match self.output {
            OutputMode::Video => self.audio = false,
            OutputMode::Audio => self.audio = true,
            OutputMode::Mkv => {}
        }
        self
    }
}
