use bytes::{Buf, BufMut, BytesMut};

use super::ProtocolError;

/// Telemetry record the sender broadcasts about once per second.
///
/// All fields are big-endian. The byte ranges not listed here are reserved
/// and have been zero in every capture observed so far; they serialize as
/// zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusRecord {
    /// 3 when a live HDMI input is attached.
    pub signal_present: u8,
    pub signal_width: u16,
    pub signal_height: u16,
    /// Source framerate multiplied by ten.
    pub signal_fps_tenths: u16,
    pub encoded_width: u16,
    pub encoded_height: u16,
    pub uptime_seconds: u32,
    /// Non-zero when the sender sees a receiver on the segment.
    pub receiver_present: u8,
}

impl StatusRecord {
    pub const SIZE: usize = 52;

    pub fn parse(data: &[u8]) -> Result<Self, ProtocolError> {
        if data.len() < Self::SIZE {
            return Err(ProtocolError::ShortStatusRecord(data.len()));
        }

        let mut buf = data;
        buf.advance(27);
        let signal_present = buf.get_u8();
        let signal_width = buf.get_u16();
        let signal_height = buf.get_u16();
        let signal_fps_tenths = buf.get_u16();
        let encoded_width = buf.get_u16();
        let encoded_height = buf.get_u16();
        buf.advance(2);
        let uptime_seconds = buf.get_u32();
        buf.advance(6);
        let receiver_present = buf.get_u8();

        Ok(Self {
            signal_present,
            signal_width,
            signal_height,
            signal_fps_tenths,
            encoded_width,
            encoded_height,
            uptime_seconds,
            receiver_present,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(Self::SIZE);
        buf.put_bytes(0, 27);
        buf.put_u8(self.signal_present);
        buf.put_u16(self.signal_width);
        buf.put_u16(self.signal_height);
        buf.put_u16(self.signal_fps_tenths);
        buf.put_u16(self.encoded_width);
        buf.put_u16(self.encoded_height);
        buf.put_bytes(0, 2);
        buf.put_u32(self.uptime_seconds);
        buf.put_bytes(0, 6);
        buf.put_u8(self.receiver_present);
        buf.put_bytes(0, 1);
        buf.to_vec()
    }

    pub fn has_signal(&self) -> bool {
        self.signal_present == 3
    }

    pub fn signal_fps(&self) -> f32 {
        f32::from(self.signal_fps_tenths) / 10.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> StatusRecord {
        StatusRecord {
            signal_present: 3,
            signal_width: 1920,
            signal_height: 1080,
            signal_fps_tenths: 600,
            encoded_width: 1920,
            encoded_height: 1080,
            uptime_seconds: 3600,
            receiver_present: 1,
        }
    }

    #[test]
    fn round_trips_through_bytes() {
        let record = sample();
        let bytes = record.to_bytes();

        assert_eq!(bytes.len(), StatusRecord::SIZE);
        assert_eq!(StatusRecord::parse(&bytes).unwrap(), record);
        assert_eq!(StatusRecord::parse(&bytes).unwrap().to_bytes(), bytes);
    }

    #[test]
    fn fields_land_at_documented_offsets() {
        let bytes = sample().to_bytes();

        assert_eq!(bytes[27], 3);
        assert_eq!(&bytes[28..30], &1920u16.to_be_bytes());
        assert_eq!(&bytes[30..32], &1080u16.to_be_bytes());
        assert_eq!(&bytes[32..34], &600u16.to_be_bytes());
        assert_eq!(&bytes[34..36], &1920u16.to_be_bytes());
        assert_eq!(&bytes[36..38], &1080u16.to_be_bytes());
        assert_eq!(&bytes[40..44], &3600u32.to_be_bytes());
        assert_eq!(bytes[50], 1);
    }

    #[test]
    fn rejects_truncated_record() {
        assert!(StatusRecord::parse(&[0u8; 51]).is_err());
    }

    #[test]
    fn signal_helpers() {
        let record = sample();
        assert!(record.has_signal());
        assert_eq!(record.signal_fps(), 60.0);

        let dark = StatusRecord {
            signal_present: 0,
            ..record
        };
        assert!(!dark.has_signal());
    }
}
