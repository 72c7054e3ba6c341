//! Built-in EC host commands.

use super::registry::{CommandTable, HandlerArgs, HostCommand};
use super::wire::{cmd, ver_mask, Status, REQUEST_HEADER_LEN, RESPONSE_HEADER_LEN};
use crate::config::{SPI_MAX_REQUEST_SIZE, SPI_MAX_RESPONSE_SIZE};

/// `GetCommsStatus` flag: a slow command is still running.
pub const COMMS_STATUS_PROCESSING: u32 = 1 << 0;

/// `GetProtocolInfo` flag: `InProgress` / `ResendResponse` are supported.
pub const PROTOCOL_INFO_IN_PROGRESS_SUPPORTED: u32 = 1 << 0;

/// Capability codes reported by `GetFeatures`. Code `n` lives in bit `n % 32`
/// of word `n / 32`.
pub mod feature {
    pub const LIMITED: u8 = 0;
    pub const FLASH: u8 = 1;
    pub const PWM_FAN: u8 = 2;
    pub const LED: u8 = 5;
    pub const MOTION_SENSE: u8 = 6;
    pub const THERMAL: u8 = 10;
    pub const HOST_EVENTS: u8 = 13;
    pub const GPIO: u8 = 14;
    pub const I2C: u8 = 15;
    pub const BATTERY: u8 = 17;
    pub const RTC: u8 = 27;
}

/// Pack capability codes into the two `GetFeatures` words.
pub const fn feature_words(codes: &[u8]) -> [u32; 2] {
    let mut words = [0u32; 2];
    let mut i = 0;
    while i < codes.len() {
        let code = codes[i];
        words[(code / 32) as usize] |= 1 << (code % 32);
        i += 1;
    }
    words
}

pub fn hello(args: &mut HandlerArgs<'_>) -> Status {
    let Some(d) = args.param_u32(0) else {
        return Status::InvalidParam;
    };
    args.reply(&d.wrapping_add(0x0102_0304).to_le_bytes())
}

pub fn get_cmd_versions(args: &mut HandlerArgs<'_>) -> Status {
    // v0 carries an 8-bit command code, v1 a 16-bit one
    let code = if args.version == 1 {
        args.param_u16(0)
    } else {
        args.param_u8(0).map(u16::from)
    };
    let Some(code) = code else {
        return Status::InvalidParam;
    };
    let Some(found) = args.table.find(code) else {
        return Status::InvalidParam;
    };
    args.reply(&found.version_mask.to_le_bytes())
}

pub fn get_comms_status(args: &mut HandlerArgs<'_>) -> Status {
    let flags = if args.host.command_pending {
        COMMS_STATUS_PROCESSING
    } else {
        0
    };
    args.reply(&flags.to_le_bytes())
}

pub fn get_protocol_info(args: &mut HandlerArgs<'_>) -> Status {
    let mut r = [0u8; 12];
    r[0..4].copy_from_slice(&(1u32 << 3).to_le_bytes());
    r[4..6].copy_from_slice(&(SPI_MAX_REQUEST_SIZE as u16).to_le_bytes());
    r[6..8].copy_from_slice(&(SPI_MAX_RESPONSE_SIZE as u16).to_le_bytes());
    r[8..12].copy_from_slice(&PROTOCOL_INFO_IN_PROGRESS_SUPPORTED.to_le_bytes());
    args.reply(&r)
}

pub fn get_features(args: &mut HandlerArgs<'_>) -> Status {
    let mut r = [0u8; 8];
    r[0..4].copy_from_slice(&args.host.features[0].to_le_bytes());
    r[4..8].copy_from_slice(&args.host.features[1].to_le_bytes());
    args.reply(&r)
}

pub fn reboot(args: &mut HandlerArgs<'_>) -> Status {
    info!("host requested reboot");
    args.platform.stop_outputs();
    args.platform.reboot();
    // Reset should never return; if it does, report an error
    Status::Error
}

pub fn resend_response(args: &mut HandlerArgs<'_>) -> Status {
    let saved = args.host.saved_result;
    args.host.saved_result = Status::Unavailable;
    args.response_size = 0;
    saved
}

/// Built-in commands, sorted by code.
pub static BUILTIN_COMMANDS: [HostCommand; 7] = [
    HostCommand {
        command: cmd::HELLO,
        version_mask: ver_mask(0),
        handler: hello,
    },
    HostCommand {
        command: cmd::GET_CMD_VERSIONS,
        version_mask: ver_mask(0) | ver_mask(1),
        handler: get_cmd_versions,
    },
    HostCommand {
        command: cmd::GET_COMMS_STATUS,
        version_mask: ver_mask(0),
        handler: get_comms_status,
    },
    HostCommand {
        command: cmd::GET_PROTOCOL_INFO,
        version_mask: ver_mask(0),
        handler: get_protocol_info,
    },
    HostCommand {
        command: cmd::GET_FEATURES,
        version_mask: ver_mask(0),
        handler: get_features,
    },
    HostCommand {
        command: cmd::REBOOT,
        version_mask: ver_mask(0),
        handler: reboot,
    },
    HostCommand {
        command: cmd::RESEND_RESPONSE,
        version_mask: ver_mask(0),
        handler: resend_response,
    },
];

pub static BUILTIN_TABLE: CommandTable = CommandTable::new(&BUILTIN_COMMANDS);

// Built-in replies must fit the configured buffers.
const _: () = assert!(RESPONSE_HEADER_LEN + 12 <= SPI_MAX_RESPONSE_SIZE);
const _: () = assert!(REQUEST_HEADER_LEN + 4 <= SPI_MAX_REQUEST_SIZE);
