//! Error types shared by every layer of the driver.

use thiserror::Error;

/// Failures of the primitive codec.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    /// The requested field width is not supported for this value type.
    #[error("unsupported width {width} for {kind}")]
    UnsupportedWidth { kind: &'static str, width: usize },
    /// The byte slice does not have the declared width.
    #[error("expected {expected} bytes, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
}

/// Failures while parsing a raw buffer as a frame.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame is empty")]
    Empty,
    /// First byte is not SOI or last byte is not EOI.
    #[error("invalid frame markers (SOI {soi:#04X}, EOI {eoi:#04X})")]
    InvalidMarkers { soi: u8, eoi: u8 },
    /// Buffer is shorter than the fixed framing overhead.
    #[error("frame truncated ({0} bytes)")]
    Truncated(usize),
    /// Declared length field disagrees with the bytes actually present.
    #[error("declared length {declared} does not match {actual} bytes in frame")]
    LengthMismatch { declared: usize, actual: usize },
    /// Declared length cannot even hold the opcode (and error code).
    #[error("declared length {declared} is shorter than the {minimum}-byte header")]
    BodyTooShort { declared: usize, minimum: usize },
    #[error("CRC mismatch (computed {computed:02X?}, received {received:02X?})")]
    CrcMismatch { computed: [u8; 2], received: [u8; 2] },
}

/// Failures of the register model.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegisterError {
    /// Payload length differs from the register set's total width.
    #[error("payload has {actual} bytes, register set expects {expected}")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("unknown register '{0}'")]
    UnknownRegister(String),
    /// Staged value does not match the register's declared type.
    #[error("value type does not match register '{name}'")]
    TypeMismatch { name: &'static str },
    #[error(transparent)]
    Encoding(#[from] EncodingError),
}

/// A staged value falls outside the active range table entry.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RangeError {
    #[error("{quantity} {value} exceeds the selected range nominal {nominal}")]
    ExceedsNominal {
        quantity: &'static str,
        value: f64,
        nominal: f64,
    },
    /// Negative, infinite or NaN.
    #[error("{quantity} {value} is not a valid amplitude")]
    Invalid { quantity: &'static str, value: f64 },
    #[error("unknown {quantity} range code {code}")]
    UnknownCode { quantity: &'static str, code: u8 },
}

/// Crate-level error returned by the transaction engine and the facade.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Encoding(#[from] EncodingError),
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error(transparent)]
    Register(#[from] RegisterError),
    #[error(transparent)]
    Range(#[from] RangeError),
    /// No buffer arrived within the transaction window.
    #[error("no response within {0:?}")]
    Timeout(std::time::Duration),
    /// Another transaction is still waiting for its response.
    #[error("a transaction is already in flight")]
    Busy,
    /// The instrument answered with a non-zero error code.
    #[error("device rejected opcode {opcode:#06X} with error code {code:#04X}")]
    Device { opcode: u16, code: u8 },
    /// The instrument reported a source fault instead of answering.
    #[error("instrument reported a source fault (error code {0:#04X})")]
    SourceFault(u8),
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
