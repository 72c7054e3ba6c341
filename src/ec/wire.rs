// EC host command wire format: headers, status codes and SPI framing bytes.

/* ───── Header layout ───────────────────────────────────────────────── */
pub const REQUEST_VERSION: u8 = 3;
pub const RESPONSE_VERSION: u8 = 3;

pub const REQUEST_HEADER_LEN: usize = 8;
pub const RESPONSE_HEADER_LEN: usize = 8;

/// Byte offsets within the request header
pub mod req_idx {
    pub const STRUCT_VERSION: usize = 0;
    pub const CHECKSUM: usize = 1;
    pub const COMMAND: usize = 2; // u16 LE
    pub const COMMAND_VERSION: usize = 4;
    pub const RESERVED: usize = 5;
    pub const DATA_LEN: usize = 6; // u16 LE
}

/// Byte offsets within the response header
pub mod resp_idx {
    pub const STRUCT_VERSION: usize = 0;
    pub const CHECKSUM: usize = 1;
    pub const RESULT: usize = 2; // u16 LE
    pub const DATA_LEN: usize = 4; // u16 LE
    pub const RESERVED: usize = 6; // u16 LE
}

/* ───── SPI out-of-band status bytes ────────────────────────────────── */
pub mod spi_status {
    /// Last byte of the preamble; the response header follows it.
    pub const FRAME_START: u8 = 0xEC;
    /// Clocked out after the last response byte.
    pub const PAST_END: u8 = 0xED;
    pub const RX_READY: u8 = 0xF8;
    pub const RECEIVING: u8 = 0xF9;
    pub const PROCESSING: u8 = 0xFA;
    pub const RX_BAD_DATA: u8 = 0xFB;
    pub const NOT_READY: u8 = 0xFC;
    pub const OLD_READY: u8 = 0xFD;
}

/// Bytes clocked out ahead of every response so a free-running host can
/// find the start of the frame.
pub const SPI_PREAMBLE: [u8; 4] = [
    spi_status::PROCESSING,
    spi_status::PROCESSING,
    spi_status::PROCESSING,
    spi_status::FRAME_START,
];
pub const SPI_PAST_END_LEN: usize = 1;

/* ───── Command codes ───────────────────────────────────────────────── */
pub mod cmd {
    pub const HELLO: u16 = 0x0001;
    pub const GET_CMD_VERSIONS: u16 = 0x0008;
    pub const GET_COMMS_STATUS: u16 = 0x0009;
    pub const GET_PROTOCOL_INFO: u16 = 0x000B;
    pub const GET_FEATURES: u16 = 0x000D;
    pub const REBOOT: u16 = 0x00D1;
    pub const RESEND_RESPONSE: u16 = 0x00DB;
}

pub const fn ver_mask(version: u8) -> u32 {
    1 << version
}

/* ───── Result codes ────────────────────────────────────────────────── */
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Status {
    Success = 0,
    InvalidCommand = 1,
    Error = 2,
    InvalidParam = 3,
    AccessDenied = 4,
    InvalidResponse = 5,
    InvalidVersion = 6,
    InvalidChecksum = 7,
    InProgress = 8,
    Unavailable = 9,
    Timeout = 10,
    Overflow = 11,
    InvalidHeader = 12,
    RequestTruncated = 13,
    ResponseTooBig = 14,
    BusError = 15,
    Busy = 16,
}

impl Status {
    pub fn is_success(self) -> bool {
        self == Status::Success
    }

    pub fn from_u16(code: u16) -> Option<Self> {
        use Status::*;
        Some(match code {
            0 => Success,
            1 => InvalidCommand,
            2 => Error,
            3 => InvalidParam,
            4 => AccessDenied,
            5 => InvalidResponse,
            6 => InvalidVersion,
            7 => InvalidChecksum,
            8 => InProgress,
            9 => Unavailable,
            10 => Timeout,
            11 => Overflow,
            12 => InvalidHeader,
            13 => RequestTruncated,
            14 => ResponseTooBig,
            15 => BusError,
            16 => Busy,
            _ => return None,
        })
    }
}

/* ───── Checksum ────────────────────────────────────────────────────── */
/// Unsigned byte sum, mod 256.
#[inline]
pub fn byte_sum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |a, &b| a.wrapping_add(b))
}

/* ───── Headers ─────────────────────────────────────────────────────── */
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RequestHeader {
    pub struct_version: u8,
    pub checksum: u8,
    pub command: u16,
    pub command_version: u8,
    pub reserved: u8,
    pub data_len: u16,
}

impl RequestHeader {
    /// Unpack the first `REQUEST_HEADER_LEN` bytes; `None` if too short.
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        let b = bytes.get(..REQUEST_HEADER_LEN)?;
        Some(Self {
            struct_version: b[req_idx::STRUCT_VERSION],
            checksum: b[req_idx::CHECKSUM],
            command: u16::from_le_bytes([b[req_idx::COMMAND], b[req_idx::COMMAND + 1]]),
            command_version: b[req_idx::COMMAND_VERSION],
            reserved: b[req_idx::RESERVED],
            data_len: u16::from_le_bytes([b[req_idx::DATA_LEN], b[req_idx::DATA_LEN + 1]]),
        })
    }

    pub fn to_bytes(&self) -> [u8; REQUEST_HEADER_LEN] {
        let mut b = [0u8; REQUEST_HEADER_LEN];
        b[req_idx::STRUCT_VERSION] = self.struct_version;
        b[req_idx::CHECKSUM] = self.checksum;
        b[req_idx::COMMAND..req_idx::COMMAND + 2].copy_from_slice(&self.command.to_le_bytes());
        b[req_idx::COMMAND_VERSION] = self.command_version;
        b[req_idx::RESERVED] = self.reserved;
        b[req_idx::DATA_LEN..req_idx::DATA_LEN + 2].copy_from_slice(&self.data_len.to_le_bytes());
        b
    }

    /// Total packet size this header announces, or `None` if the header is
    /// not one we can handle.
    pub fn expected_size(&self) -> Option<usize> {
        if self.struct_version != REQUEST_VERSION || self.reserved != 0 {
            return None;
        }
        Some(REQUEST_HEADER_LEN + self.data_len as usize)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ResponseHeader {
    pub struct_version: u8,
    pub checksum: u8,
    pub result: u16,
    pub data_len: u16,
    pub reserved: u16,
}

impl ResponseHeader {
    pub fn parse(bytes: &[u8]) -> Option<Self> {
        let b = bytes.get(..RESPONSE_HEADER_LEN)?;
        Some(Self {
            struct_version: b[resp_idx::STRUCT_VERSION],
            checksum: b[resp_idx::CHECKSUM],
            result: u16::from_le_bytes([b[resp_idx::RESULT], b[resp_idx::RESULT + 1]]),
            data_len: u16::from_le_bytes([b[resp_idx::DATA_LEN], b[resp_idx::DATA_LEN + 1]]),
            reserved: u16::from_le_bytes([b[resp_idx::RESERVED], b[resp_idx::RESERVED + 1]]),
        })
    }

    pub fn write_into(&self, out: &mut [u8]) {
        out[resp_idx::STRUCT_VERSION] = self.struct_version;
        out[resp_idx::CHECKSUM] = self.checksum;
        out[resp_idx::RESULT..resp_idx::RESULT + 2].copy_from_slice(&self.result.to_le_bytes());
        out[resp_idx::DATA_LEN..resp_idx::DATA_LEN + 2].copy_from_slice(&self.data_len.to_le_bytes());
        out[resp_idx::RESERVED..resp_idx::RESERVED + 2].copy_from_slice(&self.reserved.to_le_bytes());
    }
}

/// Build a sealed request (header + params, checksum filled in) the way a
/// host would. Returns the number of bytes written, or `None` if `out` is
/// too small.
pub fn encode_request(command: u16, version: u8, params: &[u8], out: &mut [u8]) -> Option<usize> {
    let total = REQUEST_HEADER_LEN + params.len();
    if out.len() < total || params.len() > u16::MAX as usize {
        return None;
    }
    let hdr = RequestHeader {
        struct_version: REQUEST_VERSION,
        checksum: 0,
        command,
        command_version: version,
        reserved: 0,
        data_len: params.len() as u16,
    };
    out[..REQUEST_HEADER_LEN].copy_from_slice(&hdr.to_bytes());
    out[REQUEST_HEADER_LEN..total].copy_from_slice(params);
    out[req_idx::CHECKSUM] = byte_sum(&out[..total]).wrapping_neg();
    Some(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_header_layout() {
        let raw = [3, 0xAA, 0x34, 0x12, 1, 0, 0x04, 0x00];
        let hdr = RequestHeader::parse(&raw).unwrap();
        assert_eq!(hdr.command, 0x1234);
        assert_eq!(hdr.command_version, 1);
        assert_eq!(hdr.data_len, 4);
        assert_eq!(hdr.checksum, 0xAA);
        assert_eq!(hdr.to_bytes(), raw);
        assert_eq!(hdr.expected_size(), Some(12));
    }

    #[test]
    fn expected_size_rejects_bad_headers() {
        let mut hdr = RequestHeader::parse(&[3, 0, 1, 0, 0, 0, 0, 0]).unwrap();
        assert_eq!(hdr.expected_size(), Some(REQUEST_HEADER_LEN));
        hdr.reserved = 1;
        assert_eq!(hdr.expected_size(), None);
        hdr.reserved = 0;
        hdr.struct_version = 2;
        assert_eq!(hdr.expected_size(), None);
        assert!(RequestHeader::parse(&[3, 0, 1]).is_none());
    }

    #[test]
    fn encoded_request_sums_to_zero() {
        let mut buf = [0u8; 32];
        let n = encode_request(cmd::HELLO, 0, &[0xde, 0xad, 0xbe, 0xef], &mut buf).unwrap();
        assert_eq!(n, 12);
        assert_eq!(byte_sum(&buf[..n]), 0);
        assert!(encode_request(cmd::HELLO, 0, &[0; 30], &mut buf).is_none());
    }

    #[test]
    fn status_codes_round_trip() {
        for code in 0..=16u16 {
            let s = Status::from_u16(code).unwrap();
            assert_eq!(s as u16, code);
        }
        assert_eq!(Status::from_u16(17), None);
    }
}
