//! Request validation and response framing for EC packets.

use super::wire::{
    byte_sum, RequestHeader, ResponseHeader, Status, REQUEST_HEADER_LEN, REQUEST_VERSION,
    RESPONSE_HEADER_LEN, RESPONSE_VERSION,
};

/// What a link hands over once it has a complete frame.
pub struct Envelope<'a> {
    /// Received bytes; may be longer than the packet (SPI pads).
    pub request: &'a [u8],
    /// If set, header and params are copied here while checksumming and the
    /// handler reads params from the copy.
    pub request_temp: Option<&'a mut [u8]>,
    /// Largest request this interface can take.
    pub request_max: usize,
    /// Error already detected by the driver; skips parsing when not Success.
    pub driver_result: Status,
}

/// A request that passed validation.
#[derive(Debug)]
pub struct Request<'a> {
    pub command: u16,
    pub version: u8,
    pub params: &'a [u8],
}

/// Validate a received packet. Checks run in order and the first failure
/// decides the status.
pub fn receive(env: Envelope<'_>) -> Result<Request<'_>, Status> {
    if env.driver_result != Status::Success {
        return Err(env.driver_result);
    }

    let size = env.request.len();
    if size < REQUEST_HEADER_LEN || size > env.request_max {
        return Err(Status::RequestTruncated);
    }

    // length checked above
    let hdr = RequestHeader::parse(env.request).ok_or(Status::RequestTruncated)?;
    if hdr.struct_version != REQUEST_VERSION {
        return Err(Status::InvalidHeader);
    }

    let total = REQUEST_HEADER_LEN + hdr.data_len as usize;
    if size < total {
        // Longer than declared is fine, shorter is not.
        return Err(Status::RequestTruncated);
    }

    let packet = &env.request[..total];
    let params = match env.request_temp {
        Some(temp) => {
            let temp = temp.get_mut(..total).ok_or(Status::RequestTruncated)?;
            temp.copy_from_slice(packet);
            let temp: &[u8] = temp;
            if byte_sum(temp) != 0 {
                return Err(Status::InvalidChecksum);
            }
            &temp[REQUEST_HEADER_LEN..]
        }
        None => {
            if byte_sum(packet) != 0 {
                return Err(Status::InvalidChecksum);
            }
            &packet[REQUEST_HEADER_LEN..]
        }
    };

    Ok(Request {
        command: hdr.command,
        version: hdr.command_version,
        params,
    })
}

/// Write the response header in front of a payload already sitting at
/// `response[RESPONSE_HEADER_LEN..]` and seal it with the checksum.
///
/// `response` is the whole response buffer the link offers. Returns the
/// final result (which may have become `ResponseTooBig`) and the number of
/// bytes to transmit.
pub fn respond(mut result: Status, mut payload_len: usize, response: &mut [u8]) -> (Status, usize) {
    let capacity = response.len().saturating_sub(RESPONSE_HEADER_LEN);
    if result != Status::Success {
        // Error results don't have data
        payload_len = 0;
    } else if payload_len > capacity {
        result = Status::ResponseTooBig;
        payload_len = 0;
    }

    let hdr = ResponseHeader {
        struct_version: RESPONSE_VERSION,
        checksum: 0,
        result: result as u16,
        data_len: payload_len as u16,
        reserved: 0,
    };
    hdr.write_into(response);

    let total = RESPONSE_HEADER_LEN + payload_len;
    response[1] = byte_sum(&response[..total]).wrapping_neg();
    (result, total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ec::wire::{cmd, encode_request};

    fn env(request: &[u8]) -> Envelope<'_> {
        Envelope {
            request,
            request_temp: None,
            request_max: 64,
            driver_result: Status::Success,
        }
    }

    fn hello_packet() -> ([u8; 64], usize) {
        let mut buf = [0u8; 64];
        let n = encode_request(cmd::HELLO, 0, &[1, 2, 3, 4], &mut buf).unwrap();
        (buf, n)
    }

    #[test]
    fn accepts_valid_request() {
        let (buf, n) = hello_packet();
        let req = receive(env(&buf[..n])).unwrap();
        assert_eq!(req.command, cmd::HELLO);
        assert_eq!(req.version, 0);
        assert_eq!(req.params, &[1, 2, 3, 4]);
    }

    #[test]
    fn driver_error_wins_over_everything() {
        let mut e = env(&[]);
        e.driver_result = Status::Busy;
        assert_eq!(receive(e).unwrap_err(), Status::Busy);
    }

    #[test]
    fn short_and_oversized_requests_are_truncated() {
        let (buf, n) = hello_packet();
        assert_eq!(receive(env(&buf[..7])).unwrap_err(), Status::RequestTruncated);

        let mut e = env(&buf[..n]);
        e.request_max = n - 1;
        assert_eq!(receive(e).unwrap_err(), Status::RequestTruncated);
    }

    #[test]
    fn unsupported_version_is_invalid_header_whatever_the_payload() {
        for payload in [[0u8; 4], [0xFF; 4], [1, 2, 3, 4]] {
            let mut buf = [0u8; 64];
            let n = encode_request(cmd::HELLO, 0, &payload, &mut buf).unwrap();
            buf[0] = 2;
            assert_eq!(receive(env(&buf[..n])).unwrap_err(), Status::InvalidHeader);
        }
    }

    #[test]
    fn fewer_bytes_than_declared_is_truncated() {
        let mut buf = [0u8; 64];
        let n = encode_request(cmd::HELLO, 0, &[0; 16], &mut buf).unwrap();
        for short in REQUEST_HEADER_LEN..n {
            assert_eq!(receive(env(&buf[..short])).unwrap_err(), Status::RequestTruncated);
        }
    }

    #[test]
    fn padding_after_packet_is_tolerated() {
        let (mut buf, n) = hello_packet();
        buf[n..n + 8].fill(0xFF);
        let req = receive(env(&buf[..n + 8])).unwrap();
        assert_eq!(req.params.len(), 4);
    }

    #[test]
    fn corrupted_byte_fails_checksum() {
        let (mut buf, n) = hello_packet();
        buf[n - 1] ^= 0x01;
        assert_eq!(receive(env(&buf[..n])).unwrap_err(), Status::InvalidChecksum);
    }

    #[test]
    fn params_come_from_temp_copy() {
        let (buf, n) = hello_packet();
        let mut temp = [0u8; 64];
        let req = receive(Envelope {
            request: &buf[..n],
            request_temp: Some(&mut temp),
            request_max: 64,
            driver_result: Status::Success,
        })
        .unwrap();
        assert_eq!(req.params, &[1, 2, 3, 4]);
        let params_ptr = req.params.as_ptr();
        assert_eq!(params_ptr, temp[REQUEST_HEADER_LEN..].as_ptr());
    }

    #[test]
    fn response_sums_to_zero() {
        let mut out = [0u8; 32];
        out[RESPONSE_HEADER_LEN..RESPONSE_HEADER_LEN + 5].copy_from_slice(&[9, 200, 37, 255, 1]);
        let (status, len) = respond(Status::Success, 5, &mut out);
        assert_eq!(status, Status::Success);
        assert_eq!(len, RESPONSE_HEADER_LEN + 5);
        assert_eq!(byte_sum(&out[..len]), 0);

        let hdr = ResponseHeader::parse(&out).unwrap();
        assert_eq!(hdr.struct_version, RESPONSE_VERSION);
        assert_eq!(hdr.data_len, 5);
        assert_eq!(hdr.result, 0);
    }

    #[test]
    fn error_response_has_no_payload() {
        let mut out = [0xAAu8; 32];
        let (status, len) = respond(Status::InvalidParam, 12, &mut out);
        assert_eq!(status, Status::InvalidParam);
        assert_eq!(len, RESPONSE_HEADER_LEN);
        assert_eq!(byte_sum(&out[..len]), 0);
        assert_eq!(ResponseHeader::parse(&out).unwrap().data_len, 0);
    }

    #[test]
    fn oversized_payload_becomes_response_too_big() {
        let mut out = [0u8; RESPONSE_HEADER_LEN + 4];
        let (status, len) = respond(Status::Success, 5, &mut out);
        assert_eq!(status, Status::ResponseTooBig);
        assert_eq!(len, RESPONSE_HEADER_LEN);
        let hdr = ResponseHeader::parse(&out).unwrap();
        assert_eq!(hdr.result, Status::ResponseTooBig as u16);
        assert_eq!(byte_sum(&out[..len]), 0);
    }
}
