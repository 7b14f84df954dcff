//! Voltage and current range tables of the supported instrument families.

use std::fmt;

use crate::error::RangeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Family {
    #[default]
    Yc99t5c,
    Yc99t3c,
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Family::Yc99t5c => write!(f, "YC99T-5C"),
            Family::Yc99t3c => write!(f, "YC99T-3C"),
        }
    }
}

/// One entry of a range table: the wire code and its nominal value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeDescriptor {
    pub code: u8,
    pub nominal: f64,
    pub label: &'static str,
}

const fn range(code: u8, nominal: f64, label: &'static str) -> RangeDescriptor {
    RangeDescriptor {
        code,
        nominal,
        label,
    }
}

const VOLTAGE_5C: [RangeDescriptor; 3] = [
    range(6, 100.0, "100V"),
    range(7, 220.0, "220V"),
    range(8, 380.0, "380V"),
];

const VOLTAGE_3C: [RangeDescriptor; 4] = [
    range(6, 100.0, "100V"),
    range(7, 220.0, "220V"),
    range(8, 380.0, "380V"),
    range(9, 660.0, "660V"),
];

const CURRENT_5C: [RangeDescriptor; 6] = [
    range(7, 0.05, "50mA"),
    range(8, 0.2, "200mA"),
    range(9, 1.0, "1A"),
    range(10, 5.0, "5A"),
    range(11, 20.0, "20A"),
    range(12, 100.0, "100A"),
];

const CURRENT_3C: [RangeDescriptor; 6] = [
    range(7, 0.05, "50mA"),
    range(8, 0.2, "200mA"),
    range(9, 1.0, "1A"),
    range(10, 5.0, "5A"),
    range(11, 16.667, "16.667A"),
    range(12, 100.0, "100A"),
];

pub fn voltage_ranges(family: Family) -> &'static [RangeDescriptor] {
    match family {
        Family::Yc99t5c => &VOLTAGE_5C,
        Family::Yc99t3c => &VOLTAGE_3C,
    }
}

pub fn current_ranges(family: Family) -> &'static [RangeDescriptor] {
    match family {
        Family::Yc99t5c => &CURRENT_5C,
        Family::Yc99t3c => &CURRENT_3C,
    }
}

pub fn voltage_range(family: Family, code: u8) -> Result<RangeDescriptor, RangeError> {
    find(voltage_ranges(family), code).ok_or(RangeError::UnknownCode {
        quantity: "voltage",
        code,
    })
}

pub fn current_range(family: Family, code: u8) -> Result<RangeDescriptor, RangeError> {
    find(current_ranges(family), code).ok_or(RangeError::UnknownCode {
        quantity: "current",
        code,
    })
}

pub fn lookup_voltage_nominal(family: Family, code: u8) -> Option<f64> {
    find(voltage_ranges(family), code).map(|r| r.nominal)
}

pub fn lookup_current_nominal(family: Family, code: u8) -> Option<f64> {
    find(current_ranges(family), code).map(|r| r.nominal)
}

fn find(table: &[RangeDescriptor], code: u8) -> Option<RangeDescriptor> {
    table.iter().copied().find(|r| r.code == code)
}

/// Fails unless `value` is a finite amplitude between zero and the nominal of `range`.
pub fn check(quantity: &'static str, value: f64, range: &RangeDescriptor) -> Result<(), RangeError> {
    if !value.is_finite() || value < 0.0 {
        return Err(RangeError::Invalid { quantity, value });
    }
    if value > range.nominal {
        return Err(RangeError::ExceedsNominal {
            quantity,
            value,
            nominal: range.nominal,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voltage_nominals() {
        assert_eq!(lookup_voltage_nominal(Family::Yc99t5c, 7), Some(220.0));
        assert_eq!(lookup_voltage_nominal(Family::Yc99t5c, 9), None);
        assert_eq!(lookup_voltage_nominal(Family::Yc99t3c, 9), Some(660.0));
    }

    #[test]
    fn current_nominals_differ_by_family() {
        assert_eq!(lookup_current_nominal(Family::Yc99t5c, 11), Some(20.0));
        assert_eq!(lookup_current_nominal(Family::Yc99t3c, 11), Some(16.667));
        assert_eq!(lookup_current_nominal(Family::Yc99t3c, 7), Some(0.05));
        assert_eq!(lookup_current_nominal(Family::Yc99t3c, 13), None);
    }

    #[test]
    fn unknown_code_is_an_error() {
        assert_eq!(
            voltage_range(Family::Yc99t5c, 2),
            Err(RangeError::UnknownCode { quantity: "voltage", code: 2 })
        );
        assert_eq!(current_range(Family::Yc99t5c, 10).unwrap().label, "5A");
    }

    #[test]
    fn check_allows_the_nominal_itself() {
        let range = voltage_range(Family::Yc99t5c, 7).unwrap();
        assert!(check("voltage", 220.0, &range).is_ok());
        assert_eq!(
            check("voltage", 220.5, &range),
            Err(RangeError::ExceedsNominal {
                quantity: "voltage",
                value: 220.5,
                nominal: 220.0
            })
        );
    }

    #[test]
    fn check_rejects_negative_and_non_finite_values() {
        let range = current_range(Family::Yc99t5c, 10).unwrap();
        assert!(check("current", 0.0, &range).is_ok());
        assert_eq!(
            check("current", -5.0, &range),
            Err(RangeError::Invalid { quantity: "current", value: -5.0 })
        );
        assert!(matches!(
            check("current", f64::NAN, &range),
            Err(RangeError::Invalid { quantity: "current", value }) if value.is_nan()
        ));
        assert!(matches!(
            check("current", f64::INFINITY, &range),
            Err(RangeError::Invalid { .. })
        ));
    }
}
