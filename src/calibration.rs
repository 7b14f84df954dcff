//! Energy error calibration mode: register layouts and their typed views.

use std::fmt;

use crate::error::RegisterError;
use crate::register::{RegisterKind, RegisterSet, Value};

const U8: RegisterKind = RegisterKind::UnsignedInt(1);
const U16: RegisterKind = RegisterKind::UnsignedInt(2);
const F32: RegisterKind = RegisterKind::Float(4);

/// Wiring / measurement mode of the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum PowerSelector {
    #[default]
    ThreePhaseFourWireActive = 0x00,
    ThreePhaseThreeWireActive = 0x01,
    SinglePhaseActive = 0x02,
    ThreePhaseFourWireReactive = 0x03,
    ThreePhaseThreeWireReactive = 0x04,
    TwoElement60Reactive = 0x05,
    TwoElement90Reactive = 0x06,
    ThreeElement90Reactive = 0x07,
}

/// Which elements (phases) are energised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ElementSelector {
    #[default]
    CombineAll = 0x00,
    ElementA = 0x01,
    ElementB = 0x02,
    ElementC = 0x03,
    PhaseAbcOutput = 0x04,
    PhaseAbOutput = 0x05,
    PhaseAOutput = 0x06,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum PowerFactorUnit {
    NoUnit = 0x00,
    /// Inductive (L).
    #[default]
    Inductive = 0x01,
    /// Capacitive (C).
    Capacitive = 0x02,
}

const TEST_CONFIGURATION_LAYOUT: [(&str, RegisterKind); 10] = [
    ("power_selector", U8),
    ("element_selector", U8),
    ("voltage_range", U8),
    ("voltage", F32),
    ("current", F32),
    ("power_factor", F32),
    ("power_factor_unit", U8),
    ("frequency", F32),
    ("meter_constant", F32),
    ("calibration_cycle", U16),
];

const PHASE_REGISTERS: [[&str; 6]; 3] = [
    ["Ua", "Ua_phase", "Ia", "Ia_phase", "Pa", "Qa"],
    ["Ub", "Ub_phase", "Ib", "Ib_phase", "Pb", "Qb"],
    ["Uc", "Uc_phase", "Ic", "Ic_phase", "Pc", "Qc"],
];

const ERROR_LAYOUT: [(&str, RegisterKind); 4] = [
    ("valid", RegisterKind::Bool),
    ("meter1_error", F32),
    ("meter2_error", F32),
    ("meter3_error", F32),
];

/// Outbound set sent with the test command.
pub fn test_configuration_set() -> RegisterSet {
    RegisterSet::new(&TEST_CONFIGURATION_LAYOUT)
}

/// Inbound set of a sampling readback: six values per phase, then total P and Q.
pub fn sampling_set() -> RegisterSet {
    let mut layout: Vec<(&'static str, RegisterKind)> = PHASE_REGISTERS
        .iter()
        .flatten()
        .map(|&name| (name, F32))
        .collect();
    layout.push(("P", F32));
    layout.push(("Q", F32));
    RegisterSet::new(&layout)
}

/// Inbound set of an error readback.
pub fn error_set() -> RegisterSet {
    RegisterSet::new(&ERROR_LAYOUT)
}

fn float(set: &RegisterSet, name: &'static str) -> Result<f64, RegisterError> {
    set.value(name)?
        .as_f64()
        .ok_or(RegisterError::TypeMismatch { name })
}

/// Settings staged for the test command.
#[derive(Debug, Clone, PartialEq)]
pub struct TestConfiguration {
    pub power_selector: PowerSelector,
    pub element_selector: ElementSelector,
    /// Wire code of the voltage range.
    pub voltage_range: u8,
    pub voltage: f64,
    pub current: f64,
    pub power_factor: f64,
    pub power_factor_unit: PowerFactorUnit,
    pub frequency: f64,
    /// Meter pulses per energy unit.
    pub meter_constant: f64,
    /// Number of measurement cycles per error calculation.
    pub calibration_cycle: u16,
}

impl Default for TestConfiguration {
    fn default() -> Self {
        Self {
            power_selector: PowerSelector::default(),
            element_selector: ElementSelector::default(),
            voltage_range: 7,
            voltage: 0.0,
            current: 0.0,
            power_factor: 1.0,
            power_factor_unit: PowerFactorUnit::default(),
            frequency: 50.0,
            meter_constant: 0.0,
            calibration_cycle: 0,
        }
    }
}

impl TestConfiguration {
    pub fn to_register_set(&self) -> Result<RegisterSet, RegisterError> {
        let mut set = test_configuration_set();
        set.set("power_selector", Value::UInt(self.power_selector as u64))?;
        set.set("element_selector", Value::UInt(self.element_selector as u64))?;
        set.set("voltage_range", Value::UInt(self.voltage_range as u64))?;
        set.set("voltage", Value::Float(self.voltage))?;
        set.set("current", Value::Float(self.current))?;
        set.set("power_factor", Value::Float(self.power_factor))?;
        set.set("power_factor_unit", Value::UInt(self.power_factor_unit as u64))?;
        set.set("frequency", Value::Float(self.frequency))?;
        set.set("meter_constant", Value::Float(self.meter_constant))?;
        set.set("calibration_cycle", Value::UInt(self.calibration_cycle as u64))?;
        Ok(set)
    }

    /// Serialized payload of the test command.
    pub fn payload(&self) -> Result<Vec<u8>, RegisterError> {
        self.to_register_set()?.serialize()
    }
}

/// Measurements of one phase.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PhaseSample {
    pub voltage: f64,
    pub voltage_angle: f64,
    pub current: f64,
    pub current_angle: f64,
    pub active_power: f64,
    pub reactive_power: f64,
}

impl PhaseSample {
    pub fn apparent_power(&self) -> f64 {
        self.active_power.hypot(self.reactive_power)
    }
}

/// Decoded sampling readback.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SamplingData {
    pub phases: [PhaseSample; 3],
    pub total_active_power: f64,
    pub total_reactive_power: f64,
}

impl SamplingData {
    pub fn decode(payload: &[u8]) -> Result<Self, RegisterError> {
        let mut set = sampling_set();
        set.deserialize(payload)?;
        Self::from_register_set(&set)
    }

    pub fn from_register_set(set: &RegisterSet) -> Result<Self, RegisterError> {
        let mut phases = [PhaseSample::default(); 3];
        for (phase, names) in phases.iter_mut().zip(PHASE_REGISTERS.iter()) {
            *phase = PhaseSample {
                voltage: float(set, names[0])?,
                voltage_angle: float(set, names[1])?,
                current: float(set, names[2])?,
                current_angle: float(set, names[3])?,
                active_power: float(set, names[4])?,
                reactive_power: float(set, names[5])?,
            };
        }
        Ok(Self {
            phases,
            total_active_power: float(set, "P")?,
            total_reactive_power: float(set, "Q")?,
        })
    }

    pub fn total_apparent_power(&self) -> f64 {
        self.total_active_power.hypot(self.total_reactive_power)
    }
}

impl fmt::Display for SamplingData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (phase, name) in self.phases.iter().zip(["A", "B", "C"]) {
            writeln!(
                f,
                "Phase {}: U {:.3} V @ {:.2} deg, I {:.4} A @ {:.2} deg, P {:.3} W, Q {:.3} var, S {:.3} VA",
                name,
                phase.voltage,
                phase.voltage_angle,
                phase.current,
                phase.current_angle,
                phase.active_power,
                phase.reactive_power,
                phase.apparent_power()
            )?;
        }
        write!(
            f,
            "Total:   P {:.3} W, Q {:.3} var, S {:.3} VA",
            self.total_active_power,
            self.total_reactive_power,
            self.total_apparent_power()
        )
    }
}

/// Decoded error readback for the three meter positions.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ErrorSample {
    pub valid: bool,
    /// Error of each meter in percent.
    pub meter_errors: [f64; 3],
}

impl ErrorSample {
    pub fn decode(payload: &[u8]) -> Result<Self, RegisterError> {
        let mut set = error_set();
        set.deserialize(payload)?;
        Self::from_register_set(&set)
    }

    pub fn from_register_set(set: &RegisterSet) -> Result<Self, RegisterError> {
        let valid = set
            .value("valid")?
            .as_bool()
            .ok_or(RegisterError::TypeMismatch { name: "valid" })?;
        Ok(Self {
            valid,
            meter_errors: [
                float(set, "meter1_error")?,
                float(set, "meter2_error")?,
                float(set, "meter3_error")?,
            ],
        })
    }
}

impl fmt::Display for ErrorSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "valid: {}", self.valid)?;
        for (i, error) in self.meter_errors.iter().enumerate() {
            write!(f, "\nmeter {}: {:.5} %", i + 1, error)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{CrcMode, ResponseFrame};
    use crate::testing::SAMPLING_RESPONSE;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn layout_widths() {
        assert_eq!(test_configuration_set().width(), 26);
        assert_eq!(sampling_set().width(), 80);
        assert_eq!(sampling_set().len(), 20);
        assert_eq!(error_set().width(), 13);
    }

    #[test]
    fn test_command_payload() {
        let config = TestConfiguration {
            voltage_range: 7,
            voltage: 220.0,
            current: 5.0,
            power_factor: 1.0,
            power_factor_unit: PowerFactorUnit::Inductive,
            frequency: 50.0,
            meter_constant: 0.0,
            calibration_cycle: 5,
            ..TestConfiguration::default()
        };
        assert_eq!(
            config.payload().unwrap(),
            vec![
                0x00, 0x00, 0x07, 0x00, 0x00, 0x5C, 0x43, 0x00, 0x00, 0xA0, 0x40, 0x00, 0x00,
                0x80, 0x3F, 0x01, 0x00, 0x00, 0x48, 0x42, 0x00, 0x00, 0x00, 0x00, 0x05, 0x00,
            ]
        );
    }

    #[test]
    fn selectors_use_their_wire_codes() {
        let config = TestConfiguration {
            power_selector: PowerSelector::ThreeElement90Reactive,
            element_selector: ElementSelector::PhaseAOutput,
            power_factor_unit: PowerFactorUnit::Capacitive,
            ..TestConfiguration::default()
        };
        let payload = config.payload().unwrap();
        assert_eq!(&payload[..3], &[0x07, 0x06, 0x07]);
        assert_eq!(payload[15], 0x02);
    }

    #[test]
    fn decodes_captured_sampling_payload() {
        let frame = ResponseFrame::decode(&SAMPLING_RESPONSE, CrcMode::Strict).unwrap();
        let data = SamplingData::decode(&frame.payload).unwrap();

        assert!(close(data.phases[0].voltage, 219.998));
        assert_eq!(data.phases[0].voltage_angle, 0.0);
        assert!(close(data.phases[0].current, 5.0));
        assert!(close(data.phases[0].active_power, 1099.9867));
        assert_eq!(data.phases[1].voltage_angle, 240.0);
        assert_eq!(data.phases[2].voltage_angle, 120.0);
        assert!(close(data.total_active_power, 3300.0244));
        assert!(close(data.total_reactive_power, -0.2666));
        assert!(close(data.total_apparent_power(), 3300.0244));
    }

    #[test]
    fn zero_payload_decodes_to_zero() {
        let data = SamplingData::decode(&[0u8; 80]).unwrap();
        assert_eq!(data, SamplingData::default());
        for phase in &data.phases {
            assert_eq!(phase.voltage, 0.0);
            assert_eq!(phase.reactive_power, 0.0);
        }
    }

    #[test]
    fn sampling_payload_must_be_80_bytes() {
        for len in [0usize, 79, 81, 83] {
            assert_eq!(
                SamplingData::decode(&vec![0u8; len]),
                Err(RegisterError::LengthMismatch { expected: 80, actual: len })
            );
        }
    }

    #[test]
    fn apparent_power_is_the_hypotenuse() {
        let phase = PhaseSample {
            active_power: 3.0,
            reactive_power: -4.0,
            ..PhaseSample::default()
        };
        assert_eq!(phase.apparent_power(), 5.0);
    }

    #[test]
    fn decodes_error_sample() {
        let mut payload = vec![0x01];
        payload.extend_from_slice(&0.125f32.to_le_bytes());
        payload.extend_from_slice(&(-0.5f32).to_le_bytes());
        payload.extend_from_slice(&0.0f32.to_le_bytes());
        let sample = ErrorSample::decode(&payload).unwrap();
        assert!(sample.valid);
        assert_eq!(sample.meter_errors, [0.125, -0.5, 0.0]);
        assert_eq!(
            sample.to_string(),
            "valid: true\nmeter 1: 0.12500 %\nmeter 2: -0.50000 %\nmeter 3: 0.00000 %"
        );
    }

    #[test]
    fn error_sample_length_is_checked() {
        assert_eq!(
            ErrorSample::decode(&[0u8; 12]),
            Err(RegisterError::LengthMismatch { expected: 13, actual: 12 })
        );
    }
}
