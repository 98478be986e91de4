use crate::protocol::{
    AUDIO_PORT, MIN_CAPTURED_LEN, PAYLOAD_OFFSET, PORT_OFFSET, STATUS_PORT, VIDEO_PORT,
};

/// Where a captured frame is routed.
#[derive(Debug, PartialEq, Eq)]
pub enum Classified<'a> {
    Video(&'a [u8]),
    Audio(&'a [u8]),
    Status(&'a [u8]),
    Ignore,
}

/// Route a captured link-layer frame by its inner UDP destination port.
///
/// Stateless and never blocks; the capture loop applies the config gates and
/// performs the queue offers. Undersized frames are discarded silently.
pub fn classify(frame: &[u8]) -> Classified<'_> {
    if frame.len() < MIN_CAPTURED_LEN {
        return Classified::Ignore;
    }

    let port = u16::from_be_bytes([frame[PORT_OFFSET], frame[PORT_OFFSET + 1]]);
    let payload = &frame[PAYLOAD_OFFSET..];

    match port {
        AUDIO_PORT => Classified::Audio(payload),
        STATUS_PORT => Classified::Status(payload),
        VIDEO_PORT => Classified::Video(payload),
        _ => Classified::Ignore,
    }
}
