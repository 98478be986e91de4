use bytes::{BufMut, BytesMut};

/// Role tag stamped into our keepalives; the sender stamps its own
/// datagrams with 0x6301.
pub const ROLE_RECEIVER: u16 = 0x6002;

const MAGIC: [u8; 4] = [0x54, 0x46, 0x36, 0x7a];
const MAGIC_SEQUENCE: [u8; 9] = [0x00, 0x03, 0x03, 0x01, 0x00, 0x26, 0x00, 0x00, 0x00];

/// The keepalive datagram that cues the sender to keep transmitting.
#[derive(Debug, Clone, Copy, Default)]
pub struct Keepalive {
    /// Heartbeat counter field. Devices in the field accept a constant
    /// zero, which is what the broadcaster always sends.
    pub counter: u16,
}

impl Keepalive {
    pub const SIZE: usize = 23;

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = BytesMut::with_capacity(Self::SIZE);
        buf.put_slice(&MAGIC);
        buf.put_u16(ROLE_RECEIVER);
        buf.put_u16(0); // padding
        buf.put_u16(self.counter);
        buf.put_slice(&MAGIC_SEQUENCE);
        buf.put_u32(0); // uptime placeholder
        buf.to_vec()
    }
}
