//! Built-in datagram commands.

use super::packet::{id, Message, DATA_WORDS};
use super::rc::RC_CHANNELS;
use super::registry::{DatagramArgs, DatagramCommand, DatagramTable};
use crate::config::{DATAGRAM_FEATURES, FW_NAME, FW_VERSION};

pub const PROTOCOL_VERSION: u8 = 1;

const NAME_LEN: usize = 20;

/// Feature bits reported by `ReqInfo`.
pub mod feature {
    pub const GPIO: u32 = 1 << 0;
    pub const ANA_IN: u32 = 1 << 1;
    pub const ANA_OUT: u32 = 1 << 2;
    pub const PWM_IN: u32 = 1 << 3;
    pub const PWM_OUT: u32 = 1 << 4;
    pub const MOTOR: u32 = 1 << 5;
    pub const TTYS: u32 = 1 << 6;
    pub const TOUCHSCREEN: u32 = 1 << 7;
}

/// Info reply: protocol version, firmware version, NUL-terminated name,
/// a reserved byte and the feature word, packed into the payload words.
pub fn info_payload(fw_version: u16, name: &str, features: u32) -> [u16; DATA_WORDS] {
    let mut b = [0u8; DATA_WORDS * 2];
    b[0] = PROTOCOL_VERSION;
    b[1..3].copy_from_slice(&fw_version.to_le_bytes());
    // Keep room for the terminating NUL.
    let n = name.len().min(NAME_LEN - 1);
    b[3..3 + n].copy_from_slice(&name.as_bytes()[..n]);
    b[24..28].copy_from_slice(&features.to_le_bytes());

    let mut words = [0u16; DATA_WORDS];
    for (w, c) in words.iter_mut().zip(b.chunks_exact(2)) {
        *w = u16::from_le_bytes([c[0], c[1]]);
    }
    words
}

pub fn req_info(args: &mut DatagramArgs<'_>) -> Result<(), u8> {
    let data = info_payload(FW_VERSION, FW_NAME, DATAGRAM_FEATURES);
    args.reply = Some(Message::new(id::RES_INFO, data).reliable());
    Ok(())
}

pub fn set_rc_data(args: &mut DatagramArgs<'_>) -> Result<(), u8> {
    args.rc.update(&args.data[..RC_CHANNELS]);
    Ok(())
}

pub static BUILTIN_COMMANDS: [DatagramCommand; 2] = [
    DatagramCommand {
        id: id::REQ_INFO,
        handler: req_info,
    },
    DatagramCommand {
        id: id::SET_RC_DATA,
        handler: set_rc_data,
    },
];

pub static BUILTIN_TABLE: DatagramTable = DatagramTable::new(&BUILTIN_COMMANDS);
