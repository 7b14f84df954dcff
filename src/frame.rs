//! Frame codec.
//!
//! Command frame:
//! `0x7E | len:u32-LE | opcode:u8 | 0x00 | payload | crc-lo | crc-hi | 0xFF`
//!
//! Response frame:
//! `0x7E | len:u32-LE | opcode:u16-LE | error:u8 | payload | crc-lo | crc-hi | 0xFF`
//!
//! `len` counts everything between the length field and the CRC. The CRC covers
//! the same bytes.

use log::warn;

use crate::crc::crc16;
use crate::error::FrameError;

pub const SOI: u8 = 0x7E;
pub const EOI: u8 = 0xFF;

/// Commands only carry the low opcode byte; the second byte is a fixed protocol field.
pub const RESERVED_OPCODE_BYTE: u8 = 0x00;

const LENGTH_WIDTH: usize = 4;
const CRC_WIDTH: usize = 2;
/// SOI, length, CRC and EOI.
const OVERHEAD: usize = 1 + LENGTH_WIDTH + CRC_WIDTH + 1;

const COMMAND_HEADER: usize = 2;
const RESPONSE_HEADER: usize = 3;

/// What to do when the received CRC does not match the computed one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CrcMode {
    /// Reject the frame with [`FrameError::CrcMismatch`].
    #[default]
    Strict,
    /// Log the mismatch and accept the frame.
    Lenient,
}

/// A decoded host-to-instrument frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFrame {
    pub opcode: u16,
    pub payload: Vec<u8>,
    pub crc: [u8; 2],
}

/// A decoded instrument-to-host frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseFrame {
    pub opcode: u16,
    pub error_code: u8,
    pub payload: Vec<u8>,
    pub crc: [u8; 2],
}

/// Builds the wire bytes of a command frame.
///
/// Only the low byte of `opcode` is transmitted.
pub fn encode_command(opcode: u16, payload: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(COMMAND_HEADER + payload.len());
    body.push(opcode as u8);
    body.push(RESERVED_OPCODE_BYTE);
    body.extend_from_slice(payload);
    wrap(&body)
}

fn wrap(body: &[u8]) -> Vec<u8> {
    let crc = crc16(body);
    let mut out = Vec::with_capacity(OVERHEAD + body.len());
    out.push(SOI);
    out.extend_from_slice(&(body.len() as u32).to_le_bytes());
    out.extend_from_slice(body);
    out.extend_from_slice(&crc);
    out.push(EOI);
    out
}

/// Validates markers and length, returning the body and the received CRC.
fn unwrap_frame(buf: &[u8], header: usize) -> Result<(&[u8], [u8; 2]), FrameError> {
    let (Some(&soi), Some(&eoi)) = (buf.first(), buf.last()) else {
        return Err(FrameError::Empty);
    };
    if soi != SOI || eoi != EOI {
        return Err(FrameError::InvalidMarkers { soi, eoi });
    }
    if buf.len() < OVERHEAD {
        return Err(FrameError::Truncated(buf.len()));
    }

    let declared = u32::from_le_bytes([buf[1], buf[2], buf[3], buf[4]]) as usize;
    let remaining = buf.len() - 1 - LENGTH_WIDTH;
    if declared.checked_add(CRC_WIDTH + 1) != Some(remaining) {
        return Err(FrameError::LengthMismatch {
            declared,
            actual: remaining - CRC_WIDTH - 1,
        });
    }
    if declared < header {
        return Err(FrameError::BodyTooShort {
            declared,
            minimum: header,
        });
    }

    let start = 1 + LENGTH_WIDTH;
    let body = &buf[start..start + declared];
    let crc = [buf[start + declared], buf[start + declared + 1]];
    Ok((body, crc))
}

fn verify_crc(body: &[u8], received: [u8; 2], mode: CrcMode) -> Result<(), FrameError> {
    let computed = crc16(body);
    if computed == received {
        return Ok(());
    }
    match mode {
        CrcMode::Strict => Err(FrameError::CrcMismatch { computed, received }),
        CrcMode::Lenient => {
            warn!(
                "CRC mismatch accepted in lenient mode - computed={:02X?} received={:02X?}",
                computed, received
            );
            Ok(())
        }
    }
}

impl CommandFrame {
    pub fn decode(buf: &[u8], mode: CrcMode) -> Result<Self, FrameError> {
        let (body, crc) = unwrap_frame(buf, COMMAND_HEADER)?;
        verify_crc(body, crc, mode)?;
        Ok(Self {
            opcode: u16::from_le_bytes([body[0], body[1]]),
            payload: body[COMMAND_HEADER..].to_vec(),
            crc,
        })
    }
}

impl ResponseFrame {
    /// Builds the wire bytes of a response frame, as the instrument would send it.
    pub fn encode(opcode: u16, error_code: u8, payload: &[u8]) -> Vec<u8> {
        let mut body = Vec::with_capacity(RESPONSE_HEADER + payload.len());
        body.extend_from_slice(&opcode.to_le_bytes());
        body.push(error_code);
        body.extend_from_slice(payload);
        wrap(&body)
    }

    pub fn decode(buf: &[u8], mode: CrcMode) -> Result<Self, FrameError> {
        let (body, crc) = unwrap_frame(buf, RESPONSE_HEADER)?;
        verify_crc(body, crc, mode)?;
        Ok(Self {
            opcode: u16::from_le_bytes([body[0], body[1]]),
            error_code: body[2],
            payload: body[RESPONSE_HEADER..].to_vec(),
            crc,
        })
    }

    pub fn is_ok(&self) -> bool {
        self.error_code == 0
    }
}
