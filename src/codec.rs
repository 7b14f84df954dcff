//! Little-endian conversions between native values and fixed-width byte fields.

use crate::error::EncodingError;

fn check_len(bytes: &[u8], width: usize) -> Result<(), EncodingError> {
    if bytes.len() != width {
        return Err(EncodingError::LengthMismatch {
            expected: width,
            actual: bytes.len(),
        });
    }
    Ok(())
}

/// Encodes an unsigned integer into `width` bytes (1, 2 or 4).
///
/// Bits that do not fit in `width` are dropped; range checks belong to the caller.
pub fn encode_uint(value: u64, width: usize) -> Result<Vec<u8>, EncodingError> {
    match width {
        1 | 2 | 4 => Ok(value.to_le_bytes()[..width].to_vec()),
        _ => Err(EncodingError::UnsupportedWidth {
            kind: "unsigned integer",
            width,
        }),
    }
}

/// Decodes a 1, 2 or 4 byte little-endian unsigned integer.
pub fn decode_uint(bytes: &[u8], width: usize) -> Result<u64, EncodingError> {
    match width {
        1 | 2 | 4 => {
            check_len(bytes, width)?;
            let mut buf = [0u8; 8];
            buf[..width].copy_from_slice(bytes);
            Ok(u64::from_le_bytes(buf))
        }
        _ => Err(EncodingError::UnsupportedWidth {
            kind: "unsigned integer",
            width,
        }),
    }
}

/// Encodes an IEEE-754 value as single (4) or double (8) precision.
pub fn encode_float(value: f64, width: usize) -> Result<Vec<u8>, EncodingError> {
    match width {
        4 => Ok((value as f32).to_le_bytes().to_vec()),
        8 => Ok(value.to_le_bytes().to_vec()),
        _ => Err(EncodingError::UnsupportedWidth {
            kind: "float",
            width,
        }),
    }
}

/// Decodes a half (2), single (4) or double (8) precision value.
pub fn decode_float(bytes: &[u8], width: usize) -> Result<f64, EncodingError> {
    match width {
        2 => {
            check_len(bytes, width)?;
            Ok(half_to_f64(u16::from_le_bytes([bytes[0], bytes[1]])))
        }
        4 => {
            check_len(bytes, width)?;
            Ok(f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64)
        }
        8 => {
            check_len(bytes, width)?;
            let mut buf = [0u8; 8];
            buf.copy_from_slice(bytes);
            Ok(f64::from_le_bytes(buf))
        }
        _ => Err(EncodingError::UnsupportedWidth {
            kind: "float",
            width,
        }),
    }
}

pub fn encode_bool(value: bool) -> [u8; 1] {
    [value as u8]
}

/// A flag byte is `false` only when it is exactly zero.
pub fn decode_bool(bytes: &[u8]) -> Result<bool, EncodingError> {
    check_len(bytes, 1)?;
    Ok(bytes[0] != 0)
}

fn half_to_f64(bits: u16) -> f64 {
    let sign = if bits & 0x8000 != 0 { -1.0 } else { 1.0 };
    let exponent = ((bits >> 10) & 0x1F) as i32;
    let mantissa = (bits & 0x03FF) as f64;
    let magnitude = match exponent {
        0 => mantissa * 2f64.powi(-24),
        0x1F if mantissa == 0.0 => f64::INFINITY,
        0x1F => f64::NAN,
        _ => (1.0 + mantissa / 1024.0) * 2f64.powi(exponent - 15),
    };
    sign * magnitude
}
