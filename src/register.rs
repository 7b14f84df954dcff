//! Typed, fixed-width registers and the ordered sets that make up a payload.
//!
//! A [`RegisterSet`] is the wire contract of one payload: its registers are
//! serialized in declaration order, each with its declared width, and decoding
//! slices the payload the same way. Reordering a set changes the protocol.

use std::fmt;

use crate::codec;
use crate::error::RegisterError;

/// Declared type and byte width of a register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterKind {
    UnsignedInt(usize),
    Float(usize),
    Bool,
}

impl RegisterKind {
    pub fn width(&self) -> usize {
        match *self {
            RegisterKind::UnsignedInt(width) | RegisterKind::Float(width) => width,
            RegisterKind::Bool => 1,
        }
    }

    fn zero(&self) -> Value {
        match self {
            RegisterKind::UnsignedInt(_) => Value::UInt(0),
            RegisterKind::Float(_) => Value::Float(0.0),
            RegisterKind::Bool => Value::Bool(false),
        }
    }

    fn accepts(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (RegisterKind::UnsignedInt(_), Value::UInt(_))
                | (RegisterKind::Float(_), Value::Float(_))
                | (RegisterKind::Bool, Value::Bool(_))
        )
    }

    fn decode(&self, bytes: &[u8]) -> Result<Value, RegisterError> {
        let width = self.width();
        Ok(match self {
            RegisterKind::UnsignedInt(_) => Value::UInt(codec::decode_uint(bytes, width)?),
            RegisterKind::Float(_) => Value::Float(codec::decode_float(bytes, width)?),
            RegisterKind::Bool => Value::Bool(codec::decode_bool(bytes)?),
        })
    }
}

/// Current value of a register.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    UInt(u64),
    Float(f64),
    Bool(bool),
}

impl Value {
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Value::UInt(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Float(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Value::Bool(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::UInt(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{:.5}", v),
            Value::Bool(v) => write!(f, "{}", v),
        }
    }
}

/// A named slot in a payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Register {
    name: &'static str,
    kind: RegisterKind,
    value: Value,
    // Bytes last written to or read from the wire for this register.
    raw: Vec<u8>,
}

impl Register {
    pub fn new(name: &'static str, kind: RegisterKind) -> Self {
        Self {
            name,
            kind,
            value: kind.zero(),
            raw: Vec::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> RegisterKind {
        self.kind
    }

    pub fn value(&self) -> Value {
        self.value
    }

    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn set(&mut self, value: Value) -> Result<(), RegisterError> {
        if !self.kind.accepts(&value) {
            return Err(RegisterError::TypeMismatch { name: self.name });
        }
        self.value = value;
        Ok(())
    }

    fn encode(&mut self) -> Result<&[u8], RegisterError> {
        let width = self.kind.width();
        self.raw = match (self.kind, self.value) {
            (RegisterKind::UnsignedInt(_), Value::UInt(v)) => codec::encode_uint(v, width)?,
            (RegisterKind::Float(_), Value::Float(v)) => codec::encode_float(v, width)?,
            (RegisterKind::Bool, Value::Bool(v)) => codec::encode_bool(v).to_vec(),
            _ => return Err(RegisterError::TypeMismatch { name: self.name }),
        };
        Ok(&self.raw)
    }
}

/// Ordered registers forming one payload layout.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisterSet {
    registers: Vec<Register>,
}

impl RegisterSet {
    pub fn new(layout: &[(&'static str, RegisterKind)]) -> Self {
        Self {
            registers: layout
                .iter()
                .map(|&(name, kind)| Register::new(name, kind))
                .collect(),
        }
    }

    /// Sum of all register widths, i.e. the payload length.
    pub fn width(&self) -> usize {
        self.registers.iter().map(|r| r.kind.width()).sum()
    }

    pub fn len(&self) -> usize {
        self.registers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Register> {
        self.registers.iter()
    }

    pub fn get(&self, name: &str) -> Option<&Register> {
        self.registers.iter().find(|r| r.name == name)
    }

    pub fn value(&self, name: &str) -> Result<Value, RegisterError> {
        self.get(name)
            .map(Register::value)
            .ok_or_else(|| RegisterError::UnknownRegister(name.to_string()))
    }

    pub fn set(&mut self, name: &str, value: Value) -> Result<(), RegisterError> {
        self.registers
            .iter_mut()
            .find(|r| r.name == name)
            .ok_or_else(|| RegisterError::UnknownRegister(name.to_string()))?
            .set(value)
    }

    /// Encodes every register in declaration order.
    pub fn serialize(&mut self) -> Result<Vec<u8>, RegisterError> {
        let mut out = Vec::with_capacity(self.width());
        for register in &mut self.registers {
            out.extend_from_slice(register.encode()?);
        }
        Ok(out)
    }

    /// Decodes `payload` into the registers; the length must match exactly.
    pub fn deserialize(&mut self, payload: &[u8]) -> Result<(), RegisterError> {
        let expected = self.width();
        if payload.len() != expected {
            return Err(RegisterError::LengthMismatch {
                expected,
                actual: payload.len(),
            });
        }
        // Registers are only assigned once every slice has decoded.
        let mut decoded = Vec::with_capacity(self.registers.len());
        let mut offset = 0;
        for register in &self.registers {
            let width = register.kind.width();
            let raw = &payload[offset..offset + width];
            decoded.push((register.kind.decode(raw)?, raw));
            offset += width;
        }
        for (register, (value, raw)) in self.registers.iter_mut().zip(decoded) {
            register.value = value;
            register.raw = raw.to_vec();
        }
        Ok(())
    }
}

impl fmt::Display for RegisterSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for register in &self.registers {
            writeln!(f, "{} -> {}", register.name, register.value)?;
        }
        Ok(())
    }
}
