//! Command opcodes understood by the test bench.

pub mod opcode {
    /// Log in (go online).
    pub const LOGIN: u16 = 0x80;
    /// Log out (disconnect online).
    pub const LOGOUT: u16 = 0x81;
    pub const ADJUST_SPEED: u16 = 0x82;
    pub const CLOSE_OPEN_LOOP: u16 = 0x83;
    /// Sent by the instrument when its source reports a fatal error.
    pub const SOURCE_FEEDBACK: u16 = 0x8F;

    pub const TEST_COMMAND: u16 = 0xD0;
    pub const ONLINE_ADJUST: u16 = 0xD1;
    pub const READBACK_SAMPLING: u16 = 0xD2;
    pub const STOP_TEST: u16 = 0xD3;
    /// Default opcode for the error readback. Vendor documentation disagrees
    /// with itself (0xD4 vs 0xD5), so the bench takes it from its config.
    pub const READBACK_ERROR: u16 = 0xD5;
}

/// Control flag carried by readback requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ReadbackMode {
    Stop = 0x00,
    #[default]
    Once = 0x01,
    Continuous = 0x02,
}

impl ReadbackMode {
    /// Payload of a readback request.
    pub fn payload(self) -> [u8; 1] {
        [self as u8]
    }
}
