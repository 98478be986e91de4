use bytes::Buf;
use thiserror::Error;

pub mod keepalive;
pub mod status;

/// Inner UDP destination ports used by the sender unit.
pub const VIDEO_PORT: u16 = 0x0814;
pub const AUDIO_PORT: u16 = 0x0812;
pub const STATUS_PORT: u16 = 0xbe31;

/// Byte offsets inside a captured link-layer frame. The capture filter pins
/// the traffic to the sender host, which only ever emits Ethernet + IPv4
/// without options + UDP, so the inner headers sit at fixed positions.
pub const PORT_OFFSET: usize = 36;
pub const PAYLOAD_OFFSET: usize = 42;
pub const MIN_CAPTURED_LEN: usize = 44;

/// Opaque prefix on every audio fragment payload; meaning unknown.
pub const AUDIO_HEADER_LEN: usize = 16;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("fragment too short for header: {0} bytes")]
    ShortFragment(usize),
    #[error("status record too short: {0} bytes")]
    ShortStatusRecord(usize),
}

/// First four bytes of every video fragment payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FragmentHeader {
    /// Increases by one per whole JPEG frame.
    pub frame_id: u16,
    /// Low 15 bits: in-frame sequence. Bit 15: final chunk of the frame.
    pub chunk_word: u16,
}

impl FragmentHeader {
    pub const SIZE: usize = 4;

    /// Parse the header, returning it together with the JPEG payload bytes.
    pub fn parse(data: &[u8]) -> Result<(Self, &[u8]), ProtocolError> {
        if data.len() < Self::SIZE {
            return Err(ProtocolError::ShortFragment(data.len()));
        }

        let mut buf = data;
        let frame_id = buf.get_u16();
        let chunk_word = buf.get_u16();

        Ok((Self { frame_id, chunk_word }, buf))
    }

    pub fn is_last(&self) -> bool {
        self.chunk_word & 0x8000 != 0
    }

    pub fn seq(&self) -> u16 {
        self.chunk_word & 0x7fff
    }
}
