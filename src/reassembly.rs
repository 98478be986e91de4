use bytes::{Bytes, BytesMut};
use tracing::{debug, warn};

use crate::protocol::FragmentHeader;

/// Rebuilds whole JPEG frames from the sender's in-order video fragments.
///
/// Owned exclusively by the capture loop, so all state is single-threaded.
/// Frames are disposable: anything that looks out of step drops the frame
/// being assembled and starts over, counted but otherwise forgotten.
#[derive(Debug, Default)]
pub struct Reassembler {
    /// 0 means between frames.
    current_frame_id: u16,
    /// Low-15-bit sequence of the most recently accepted fragment; `None`
    /// until the first fragment of a frame lands.
    last_chunk_seq: Option<u16>,
    buffer: BytesMut,
    total_frames: u64,
    dropped_frames: u64,
    desync_frames: u64,
}

impl Reassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one video fragment payload (header plus JPEG bytes).
    ///
    /// Returns the completed JPEG when this fragment carries the final-chunk
    /// marker and is accepted.
    pub fn ingest(&mut self, payload: &[u8]) -> Option<Bytes> {
        let (header, data) = match FragmentHeader::parse(payload) {
            Ok(parsed) => parsed,
            Err(_) => return None,
        };
        let seq = header.seq();

        debug!(
            "fragment {}/{:#06x} (current {}/{:?}) {} bytes",
            header.frame_id,
            header.chunk_word,
            self.current_frame_id,
            self.last_chunk_seq,
            payload.len()
        );

        if self.current_frame_id != 0 && header.frame_id != self.current_frame_id {
            self.dropped_frames += 1;
            if header.frame_id > self.current_frame_id {
                warn!(
                    "frame {} superseded by {} before completion ({} dropped so far)",
                    self.current_frame_id, header.frame_id, self.dropped_frames
                );
                self.reset();
            } else {
                // Stale fragment from a frame already given up on.
                return None;
            }
        }

        if let Some(last) = self.last_chunk_seq {
            if seq != last + 1 {
                if !header.is_last() {
                    self.dropped_frames += 1;
                    self.desync_frames += 1;
                    warn!(
                        "chunk desync on frame {}: expected {}, got {} ({} dropped, {} desync)",
                        header.frame_id,
                        last + 1,
                        seq,
                        self.dropped_frames,
                        self.desync_frames
                    );
                    self.reset();
                    return None;
                }
                // The closing chunk is accepted across a gap; the sender is
                // routinely off by one on the last chunk of a frame.
            }
        }

        self.buffer.extend_from_slice(data);
        self.current_frame_id = header.frame_id;
        self.last_chunk_seq = Some(seq);

        if header.is_last() {
            let frame = self.buffer.split().freeze();
            self.total_frames += 1;
            debug!("frame {} complete: {} bytes", header.frame_id, frame.len());
            self.reset();
            return Some(frame);
        }

        None
    }

    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    fn reset(&mut self) {
        self.current_frame_id = 0;
        self.last_chunk_seq = None;
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragment(frame_id: u16, chunk_word: u16, data: &[u8]) -> Vec<u8> {
        let mut payload = Vec::with_capacity(4 + data.len());
        payload.extend_from_slice(&frame_id.to_be_bytes());
        payload.extend_from_slice(&chunk_word.to_be_bytes());
        payload.extend_from_slice(data);
        payload
    }

    #[test]
    fn single_fragment_frame() {
        let mut reassembler = Reassembler::new();

        let jpeg = reassembler
            .ingest(&fragment(1, 0x8000, &[0xff, 0xd8, 0xff, 0xd9]))
            .expect("frame");

        assert_eq!(&jpeg[..], &[0xff, 0xd8, 0xff, 0xd9]);
        assert_eq!(reassembler.total_frames(), 1);
        assert_eq!(reassembler.current_frame_id, 0);
        assert_eq!(reassembler.last_chunk_seq, None);
        assert!(reassembler.buffer.is_empty());
    }

    #[test]
    fn two_fragment_frame() {
        let mut reassembler = Reassembler::new();

        assert!(reassembler.ingest(&fragment(2, 0, b"A")).is_none());
        let jpeg = reassembler
            .ingest(&fragment(2, 0x0001 | 0x8000, b"B"))
            .expect("frame");

        assert_eq!(&jpeg[..], b"AB");
        assert_eq!(reassembler.total_frames(), 1);
    }

    #[test]
    fn concatenates_many_fragments_in_order() {
        let mut reassembler = Reassembler::new();
        let chunks: &[&[u8]] = &[b"one", b"two", b"three", b"four"];

        for (i, chunk) in chunks.iter().enumerate() {
            let mut word = i as u16;
            if i == chunks.len() - 1 {
                word |= 0x8000;
            }
            let emitted = reassembler.ingest(&fragment(6, word, chunk));
            if i == chunks.len() - 1 {
                assert_eq!(&emitted.expect("frame")[..], b"onetwothreefour");
            } else {
                assert!(emitted.is_none());
            }
        }
    }

    #[test]
    fn desync_drops_frame() {
        let mut reassembler = Reassembler::new();

        assert!(reassembler.ingest(&fragment(3, 0, b"X")).is_none());
        assert!(reassembler.ingest(&fragment(3, 2, b"Z")).is_none());

        assert_eq!(reassembler.total_frames(), 0);
        assert_eq!(reassembler.dropped_frames, 1);
        assert_eq!(reassembler.desync_frames, 1);
        assert_eq!(reassembler.current_frame_id, 0);
        assert!(reassembler.buffer.is_empty());
    }

    #[test]
    fn new_frame_supersedes_incomplete_one() {
        let mut reassembler = Reassembler::new();

        assert!(reassembler.ingest(&fragment(4, 0, b"P")).is_none());
        assert!(reassembler.ingest(&fragment(5, 0, b"Q")).is_none());

        assert_eq!(reassembler.total_frames(), 0);
        assert_eq!(reassembler.dropped_frames, 1);
        assert_eq!(reassembler.current_frame_id, 5);
        assert_eq!(&reassembler.buffer[..], b"Q");
    }

    #[test]
    fn stale_fragment_is_ignored() {
        let mut reassembler = Reassembler::new();

        assert!(reassembler.ingest(&fragment(9, 0, b"live")).is_none());
        assert!(reassembler.ingest(&fragment(8, 0x8000, b"old")).is_none());

        // The frame in flight is untouched and still completes.
        assert_eq!(reassembler.dropped_frames, 1);
        assert_eq!(reassembler.current_frame_id, 9);
        let jpeg = reassembler
            .ingest(&fragment(9, 0x8001, b"on"))
            .expect("frame");
        assert_eq!(&jpeg[..], b"liveon");
    }

    #[test]
    fn accepts_final_chunk_after_gap() {
        // The wire protocol is routinely off by one on the closing chunk;
        // only a final-chunk marker may bridge a gap.
        let mut reassembler = Reassembler::new();

        assert!(reassembler.ingest(&fragment(7, 0, b"head")).is_none());
        let jpeg = reassembler
            .ingest(&fragment(7, 0x0005 | 0x8000, b"tail"))
            .expect("frame");

        assert_eq!(&jpeg[..], b"headtail");
        assert_eq!(reassembler.desync_frames, 0);
        assert_eq!(reassembler.dropped_frames, 0);
    }

    #[test]
    fn emitted_frame_ids_strictly_increase() {
        let mut reassembler = Reassembler::new();
        let mut emitted = 0;

        for id in 1..=5u16 {
            assert!(reassembler.ingest(&fragment(id, 0, b"a")).is_none());
            if reassembler.ingest(&fragment(id, 0x8001, b"b")).is_some() {
                emitted += 1;
                assert_eq!(reassembler.total_frames(), emitted);
            }
        }

        assert_eq!(emitted, 5);
    }

    #[test]
    fn short_fragment_is_discarded_silently() {
        let mut reassembler = Reassembler::new();

        assert!(reassembler.ingest(&[0x00, 0x01, 0x00]).is_none());

        assert_eq!(reassembler.dropped_frames, 0);
        assert_eq!(reassembler.current_frame_id, 0);
    }
}
