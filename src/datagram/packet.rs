//! 32-byte datagram: id, flags, 14 payload words, CRC-16 trailer.

use crc16::{State, CCITT_FALSE};

pub const PACKET_LEN: usize = 32;
pub const DATA_WORDS: usize = 14;
const CRC_OFFSET: usize = PACKET_LEN - 2;

/// Flag bits
pub mod flags {
    pub const ACKREQ: u8 = 1 << 0;
    pub const ACKTGL: u8 = 1 << 1;
    pub const ACK: u8 = 1 << 2;
    /// Set on every packet the host sends.
    pub const MOSI: u8 = 1 << 3;
}

/// Packet ids
pub mod id {
    pub const INVALID: u8 = 0x00;
    pub const REQ_INFO: u8 = 0x01;
    pub const RES_INFO: u8 = REQ_INFO;
    pub const SET_RC_DATA: u8 = 0x10;

    /// First status / response code; lower non-zero ids are commands.
    pub const STATUS_FIRST: u8 = 200;
    pub const ACK: u8 = 200;
    pub const UNKNOWN_COMMAND: u8 = 201;
    pub const HANDLER_ERROR: u8 = 202;

    pub const fn is_command(id: u8) -> bool {
        id != INVALID && id < STATUS_FIRST
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PacketError {
    /// Direction flag missing: not a host packet (or the bus was idle).
    NoDirection,
    CrcMismatch,
    InvalidLength,
}

#[inline]
pub fn crc(bytes: &[u8]) -> u16 {
    State::<CCITT_FALSE>::calculate(bytes)
}

/// Decoded packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Packet {
    pub id: u8,
    pub flags: u8,
    pub data: [u16; DATA_WORDS],
}

impl Packet {
    pub const IDLE: Packet = Packet {
        id: id::INVALID,
        flags: 0,
        data: [0; DATA_WORDS],
    };

    pub fn has(&self, flag: u8) -> bool {
        self.flags & flag != 0
    }

    /// Toggle bit as a bool.
    pub fn toggle(&self) -> bool {
        self.has(flags::ACKTGL)
    }

    /// Validate and unpack a packet sent by the host.
    pub fn decode(bytes: &[u8]) -> Result<Self, PacketError> {
        Self::check(bytes, true)
    }

    /// Host side: validate and unpack a packet the peripheral sent.
    pub fn decode_reply(bytes: &[u8]) -> Result<Self, PacketError> {
        Self::check(bytes, false)
    }

    fn check(bytes: &[u8], from_host: bool) -> Result<Self, PacketError> {
        let bytes: &[u8; PACKET_LEN] = bytes.try_into().map_err(|_| PacketError::InvalidLength)?;
        if (bytes[1] & flags::MOSI != 0) != from_host {
            return Err(PacketError::NoDirection);
        }
        let stored = u16::from_le_bytes([bytes[CRC_OFFSET], bytes[CRC_OFFSET + 1]]);
        if stored != crc(&bytes[..CRC_OFFSET]) {
            return Err(PacketError::CrcMismatch);
        }
        Ok(Self::unpack(bytes))
    }

    fn unpack(bytes: &[u8; PACKET_LEN]) -> Self {
        let mut data = [0u16; DATA_WORDS];
        for (w, c) in data.iter_mut().zip(bytes[2..CRC_OFFSET].chunks_exact(2)) {
            *w = u16::from_le_bytes([c[0], c[1]]);
        }
        Self {
            id: bytes[0],
            flags: bytes[1],
            data,
        }
    }

    /// Pack with a fresh CRC.
    pub fn encode(&self) -> [u8; PACKET_LEN] {
        let mut out = [0u8; PACKET_LEN];
        out[0] = self.id;
        out[1] = self.flags;
        for (c, w) in out[2..CRC_OFFSET].chunks_exact_mut(2).zip(self.data.iter()) {
            c.copy_from_slice(&w.to_le_bytes());
        }
        let sum = crc(&out[..CRC_OFFSET]);
        out[CRC_OFFSET..].copy_from_slice(&sum.to_le_bytes());
        out
    }
}

/// Queued message, as stored in the ring buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Message {
    pub id: u8,
    pub ackreq: bool,
    /// Id of the response the sender expects, or `id::INVALID`.
    pub rid: u8,
    pub data: [u16; DATA_WORDS],
}

impl Message {
    pub const fn new(id: u8, data: [u16; DATA_WORDS]) -> Self {
        Self {
            id,
            ackreq: false,
            rid: id::INVALID,
            data,
        }
    }

    pub const fn reliable(mut self) -> Self {
        self.ackreq = true;
        self
    }
}

impl From<&Packet> for Message {
    fn from(p: &Packet) -> Self {
        Self {
            id: p.id,
            ackreq: p.has(flags::ACKREQ),
            rid: id::INVALID,
            data: p.data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host_packet() -> [u8; PACKET_LEN] {
        let mut data = [0u16; DATA_WORDS];
        data[0] = 0x1234;
        data[13] = 0xBEEF;
        Packet {
            id: id::SET_RC_DATA,
            flags: flags::MOSI | flags::ACKREQ,
            data,
        }
        .encode()
    }

    #[test]
    fn layout_is_little_endian() {
        let raw = host_packet();
        assert_eq!(raw[0], id::SET_RC_DATA);
        assert_eq!(&raw[2..4], &[0x34, 0x12]);
        assert_eq!(&raw[28..30], &[0xEF, 0xBE]);
        let crc_le = crc(&raw[..30]).to_le_bytes();
        assert_eq!(&raw[30..], &crc_le);
    }

    #[test]
    fn crc_is_ccitt_false() {
        assert_eq!(crc(b"123456789"), 0x29B1);
    }

    #[test]
    fn decode_checks_direction_then_crc() {
        let raw = host_packet();
        let p = Packet::decode(&raw).unwrap();
        assert_eq!(p.data[0], 0x1234);
        assert!(p.has(flags::ACKREQ));

        let mut bad = raw;
        bad[5] ^= 0x10;
        assert_eq!(Packet::decode(&bad), Err(PacketError::CrcMismatch));

        let slave = Packet { flags: 0, ..p }.encode();
        assert_eq!(Packet::decode(&slave), Err(PacketError::NoDirection));
        assert_eq!(Packet::decode_reply(&slave).unwrap().data, p.data);
        assert_eq!(Packet::decode_reply(&raw), Err(PacketError::NoDirection));

        assert_eq!(Packet::decode(&raw[..31]), Err(PacketError::InvalidLength));
    }

    #[test]
    fn status_ids_are_not_commands() {
        assert!(!id::is_command(id::INVALID));
        assert!(id::is_command(1));
        assert!(id::is_command(199));
        assert!(!id::is_command(id::ACK));
        assert!(!id::is_command(255));
    }
}
