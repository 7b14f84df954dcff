//! # Geny YC99T Test Bench Library
//!
//! This library drives a Geny YC99T power calibration bench over a serial link.
//! It builds and parses the bench's binary frames, maps payloads onto typed
//! register sets and runs one command/response exchange at a time through a
//! background reader.
//!
//! Layers, bottom-up:
//! - [`crc`] and [`codec`]: checksum and little-endian primitives.
//! - [`frame`]: command and response framing.
//! - [`register`] and [`calibration`]: payload layouts and typed views.
//! - [`link`]: the serial transaction engine.
//! - [`bench`]: the [`TestBench`] facade with range checks.

pub mod bench;
pub mod calibration;
pub mod codec;
pub mod command;
pub mod crc;
pub mod error;
pub mod frame;
pub mod link;
pub mod range;
pub mod register;

#[cfg(test)]
mod testing;

pub use bench::{BenchConfig, TestBench};
pub use calibration::{
    ElementSelector, ErrorSample, PhaseSample, PowerFactorUnit, PowerSelector, SamplingData,
    TestConfiguration,
};
pub use command::ReadbackMode;
pub use error::{EncodingError, Error, FrameError, RangeError, RegisterError, Result};
pub use frame::{CommandFrame, CrcMode, ResponseFrame};
pub use link::{Link, LinkConfig};
pub use range::{Family, RangeDescriptor};
