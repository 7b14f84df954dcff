//! High level control of a YC99T calibration bench.
//!
//! [`TestBench`] stages the test settings, checks them against the selected
//! ranges and turns each operation into one command/response exchange over a
//! [`Link`].

use std::time::Duration;

use log::{debug, info, warn};

use crate::calibration::{
    ElementSelector, ErrorSample, PowerFactorUnit, PowerSelector, SamplingData, TestConfiguration,
};
use crate::command::{opcode, ReadbackMode};
use crate::error::{Error, Result};
use crate::frame::{encode_command, CrcMode, ResponseFrame};
use crate::link::{Link, LinkConfig};
use crate::range::{self, Family, RangeDescriptor};

/// Current range selected after connecting and after a stop (20 A on the 5C).
pub const DEFAULT_CURRENT_RANGE: u8 = 11;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BenchConfig {
    pub family: Family,
    pub crc_mode: CrcMode,
    /// Opcode of the error readback request.
    pub readback_error_opcode: u16,
    /// Response window; `None` uses the link's transaction timeout.
    pub timeout: Option<Duration>,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            family: Family::default(),
            crc_mode: CrcMode::default(),
            readback_error_opcode: opcode::READBACK_ERROR,
            timeout: None,
        }
    }
}

pub struct TestBench {
    link: Link,
    config: BenchConfig,
    settings: TestConfiguration,
    current_range: u8,
}

impl TestBench {
    pub fn new(link: Link, config: BenchConfig) -> Self {
        Self {
            link,
            config,
            settings: TestConfiguration::default(),
            current_range: DEFAULT_CURRENT_RANGE,
        }
    }

    /// Opens a serial port with the default link timing.
    pub fn open(path: &str, baud_rate: u32, config: BenchConfig) -> Result<Self> {
        let link = Link::open(path, baud_rate, LinkConfig::default())?;
        Ok(Self::new(link, config))
    }

    pub fn config(&self) -> &BenchConfig {
        &self.config
    }

    /// Settings the next [`apply`](Self::apply) will send.
    pub fn settings(&self) -> &TestConfiguration {
        &self.settings
    }

    pub fn voltage_range(&self) -> Result<RangeDescriptor> {
        Ok(range::voltage_range(self.config.family, self.settings.voltage_range)?)
    }

    pub fn current_range(&self) -> Result<RangeDescriptor> {
        Ok(range::current_range(self.config.family, self.current_range)?)
    }

    pub fn login(&self) -> Result<()> {
        self.execute(opcode::LOGIN, &[])?;
        info!("Logged in to {}", self.config.family);
        Ok(())
    }

    pub fn logout(&self) -> Result<()> {
        self.execute(opcode::LOGOUT, &[])?;
        info!("Logged out");
        Ok(())
    }

    pub fn set_power_selector(&mut self, selector: PowerSelector) {
        self.settings.power_selector = selector;
    }

    pub fn set_element_selector(&mut self, selector: ElementSelector) {
        self.settings.element_selector = selector;
    }

    /// Selects a voltage range; the staged voltage must fit the new nominal.
    pub fn set_voltage_range(&mut self, code: u8) -> Result<()> {
        let range = range::voltage_range(self.config.family, code)?;
        range::check("voltage", self.settings.voltage, &range)?;
        self.settings.voltage_range = code;
        debug!("Voltage range {}", range.label);
        Ok(())
    }

    /// Selects a current range; the staged current must fit the new nominal.
    pub fn set_current_range(&mut self, code: u8) -> Result<()> {
        let range = range::current_range(self.config.family, code)?;
        range::check("current", self.settings.current, &range)?;
        self.current_range = code;
        debug!("Current range {}", range.label);
        Ok(())
    }

    pub fn set_voltage(&mut self, volts: f64) -> Result<()> {
        range::check("voltage", volts, &self.voltage_range()?)?;
        self.settings.voltage = volts;
        Ok(())
    }

    pub fn set_current(&mut self, amps: f64) -> Result<()> {
        range::check("current", amps, &self.current_range()?)?;
        self.settings.current = amps;
        Ok(())
    }

    pub fn set_frequency(&mut self, hertz: f64) {
        self.settings.frequency = hertz;
    }

    /// Sets the power factor, given directly or as a phase angle in degrees.
    pub fn set_power_factor(&mut self, value: f64, in_degrees: bool) {
        self.settings.power_factor = if in_degrees {
            value.to_radians().cos()
        } else {
            value
        };
    }

    pub fn set_power_factor_unit(&mut self, unit: PowerFactorUnit) {
        self.settings.power_factor_unit = unit;
    }

    pub fn set_calibration_constants(&mut self, meter_constant: f64, cycle: u16) {
        self.settings.meter_constant = meter_constant;
        self.settings.calibration_cycle = cycle;
    }

    /// Starts a test with the staged settings.
    pub fn apply(&self) -> Result<()> {
        let payload = self.settings.payload()?;
        self.execute(opcode::TEST_COMMAND, &payload)?;
        info!(
            "Applied {:.3} V / {:.4} A, PF {:.4} {:?}, {} Hz",
            self.settings.voltage,
            self.settings.current,
            self.settings.power_factor,
            self.settings.power_factor_unit,
            self.settings.frequency
        );
        Ok(())
    }

    /// Changes the running test to the staged settings.
    pub fn online_adjust(&self) -> Result<()> {
        let payload = self.settings.payload()?;
        self.execute(opcode::ONLINE_ADJUST, &payload)?;
        info!("Online adjust sent");
        Ok(())
    }

    /// Stops the test. The staged settings return to their defaults even when
    /// the instrument does not acknowledge the stop.
    pub fn stop(&mut self) -> Result<()> {
        self.settings = TestConfiguration::default();
        self.current_range = DEFAULT_CURRENT_RANGE;
        self.execute(opcode::STOP_TEST, &[])?;
        info!("Test stopped");
        Ok(())
    }

    /// Requests sampling data. `None` when the instrument acknowledges without data.
    pub fn read_sampling(&self, mode: ReadbackMode) -> Result<Option<SamplingData>> {
        let response = self.execute(opcode::READBACK_SAMPLING, &mode.payload())?;
        if response.payload.is_empty() {
            return Ok(None);
        }
        Ok(Some(SamplingData::decode(&response.payload)?))
    }

    /// Requests the meter errors. `None` when the instrument acknowledges without data.
    pub fn read_error(&self, mode: ReadbackMode) -> Result<Option<ErrorSample>> {
        let response = self.execute(self.config.readback_error_opcode, &mode.payload())?;
        if response.payload.is_empty() {
            return Ok(None);
        }
        Ok(Some(ErrorSample::decode(&response.payload)?))
    }

    fn execute(&self, opcode: u16, payload: &[u8]) -> Result<ResponseFrame> {
        let timeout = self
            .config
            .timeout
            .unwrap_or(self.link.config().transaction_timeout);
        let frame = encode_command(opcode, payload);
        let buffer = self
            .link
            .transaction(&frame, timeout)?
            .ok_or(Error::Timeout(timeout))?;
        let response = ResponseFrame::decode(&buffer, self.config.crc_mode)?;

        if response.opcode == opcode::SOURCE_FEEDBACK {
            warn!("Source fault reported (error code {:#04X})", response.error_code);
            return Err(Error::SourceFault(response.error_code));
        }
        if !response.is_ok() {
            return Err(Error::Device {
                opcode,
                code: response.error_code,
            });
        }
        Ok(response)
    }
}
