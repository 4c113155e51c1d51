//! CRC16-CCITT framing used by vendor glucose meters (OneTouch Verio and Verio IQ).
//!
//! Requests are written as:
//!
//! ```text
//! 0x01 | 0x02 len 0x00 0x03 | payload.. | 0x03 | crc_lo crc_hi
//! ```
//!
//! where `len` counts every byte from `0x02` through the checksum
//! (`payload.len() + 7`). The checksum covers every byte before it.
//!
//! Responses arrive as a notification carrying one link-layer header byte
//! followed by the same frame layout. The header byte is excluded from the
//! checksum.

use bytes::{BufMut, BytesMut};

use crate::error::{ParseError, ParseResult};

/// Link-layer prefix of every written packet.
pub const PACKET_PREFIX: u8 = 0x01;
/// Start-of-text marker.
pub const STX: u8 = 0x02;
/// End-of-text marker.
pub const ETX: u8 = 0x03;
/// Link-layer acknowledgement written after each accepted response.
pub const ACK: u8 = 0x81;
/// First payload byte of a successful response.
pub const RESPONSE_OK: u8 = 0x06;

/// Bytes a frame adds around its payload (STX, len, 0x00, 0x03, ETX, CRC).
pub const FRAME_OVERHEAD: usize = 7;

/// Largest payload that still fits the one-byte length field.
pub const MAX_PAYLOAD: usize = u8::MAX as usize - FRAME_OVERHEAD;

/// CRC16-CCITT, polynomial `0x1021`, initial value `0xFFFF`, computed bit by bit.
#[must_use]
pub fn crc16_ccitt(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for &byte in data {
        crc ^= u16::from(byte) << 8;
        for _ in 0..8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ 0x1021
            } else {
                crc << 1
            };
        }
    }
    crc
}

/// Build a request packet around `payload`.
///
/// # Errors
///
/// Returns [`ParseError::InvalidValue`] when the payload does not fit the
/// one-byte length field.
pub fn encode_request(payload: &[u8]) -> ParseResult<Vec<u8>> {
    if payload.len() > MAX_PAYLOAD {
        return Err(ParseError::InvalidValue(format!(
            "payload of {} bytes exceeds frame limit of {}",
            payload.len(),
            MAX_PAYLOAD
        )));
    }

    let mut buf = BytesMut::with_capacity(payload.len() + FRAME_OVERHEAD + 1);
    buf.put_u8(PACKET_PREFIX);
    buf.put_u8(STX);
    buf.put_u8((payload.len() + FRAME_OVERHEAD) as u8);
    buf.put_u8(0x00);
    buf.put_u8(ETX);
    buf.put_slice(payload);
    buf.put_u8(ETX);
    let crc = crc16_ccitt(&buf);
    buf.put_u16_le(crc);
    Ok(buf.to_vec())
}

/// The acknowledgement packet written after a response is accepted.
#[must_use]
pub fn ack_packet() -> [u8; 1] {
    [ACK]
}

/// Validate a response notification and return its payload.
///
/// The first byte is the link-layer header and is skipped. Bytes beyond the
/// declared frame length are ignored.
///
/// # Errors
///
/// - [`ParseError::InsufficientBytes`] when the buffer is shorter than the frame.
/// - [`ParseError::MalformedFrame`] when a marker byte is wrong.
/// - [`ParseError::ChecksumMismatch`] when the CRC does not match.
pub fn decode_response(bytes: &[u8]) -> ParseResult<&[u8]> {
    let minimum = 1 + FRAME_OVERHEAD;
    if bytes.len() < minimum {
        return Err(ParseError::insufficient(minimum, bytes.len()));
    }

    let frame = &bytes[1..];
    if frame[0] != STX {
        return Err(ParseError::malformed(format!(
            "expected STX, found 0x{:02X}",
            frame[0]
        )));
    }

    let length = usize::from(frame[1]);
    if length < FRAME_OVERHEAD {
        return Err(ParseError::malformed(format!(
            "declared length {} is shorter than the frame overhead",
            length
        )));
    }
    if frame.len() < length {
        return Err(ParseError::insufficient(length + 1, bytes.len()));
    }
    let frame = &frame[..length];

    if frame[3] != ETX {
        return Err(ParseError::malformed("missing header terminator"));
    }
    if frame[length - 3] != ETX {
        return Err(ParseError::malformed("missing ETX"));
    }

    let received = u16::from_le_bytes([frame[length - 2], frame[length - 1]]);
    let computed = crc16_ccitt(&frame[..length - 2]);
    if received != computed {
        return Err(ParseError::ChecksumMismatch { received, computed });
    }

    Ok(&frame[4..length - 3])
}

/// Build a response notification around `payload`, as a meter would send it.
///
/// Used by simulators and tests.
///
/// # Errors
///
/// Same as [`encode_request`].
pub fn encode_response(header: u8, payload: &[u8]) -> ParseResult<Vec<u8>> {
    let mut packet = encode_request(payload)?;
    // Swap the request prefix for the header byte and recompute the CRC
    // over the frame alone.
    packet[0] = header;
    let end = packet.len() - 2;
    let crc = crc16_ccitt(&packet[1..end]);
    packet[end..].copy_from_slice(&crc.to_le_bytes());
    Ok(packet)
}
