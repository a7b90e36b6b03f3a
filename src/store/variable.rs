//! Variable definitions
//!
//! A variable is a named, typed value slot. Its type is committed by the
//! first write and never changes afterwards.

use std::borrow::Cow;

use crate::error::{Result, VarError};
use super::ownership::ConnId;

/// Wire type tags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum VarType {
    Logical = b'1',
    Numeric = b'2',
    String = b'3',
    Array = b'4',
}

impl VarType {
    /// Decode a wire type tag
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            b'1' => Some(VarType::Logical),
            b'2' => Some(VarType::Numeric),
            b'3' => Some(VarType::String),
            b'4' => Some(VarType::Array),
            _ => None,
        }
    }

    /// The wire tag byte
    pub fn tag(self) -> u8 {
        self as u8
    }
}

/// A materialized variable value
///
/// `Integer` and `Float` are the two Numeric sub-types. Array payloads are
/// opaque serialized bytes and never decoded here.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Logical(bool),
    Integer(i64),
    Float(f64),
    String(Vec<u8>),
    Array(Vec<u8>),
}

impl Value {
    /// Type tag of this value
    pub fn var_type(&self) -> VarType {
        match self {
            Value::Logical(_) => VarType::Logical,
            Value::Integer(_) | Value::Float(_) => VarType::Numeric,
            Value::String(_) => VarType::String,
            Value::Array(_) => VarType::Array,
        }
    }

    /// True for the floating Numeric sub-type
    pub fn is_float(&self) -> bool {
        matches!(self, Value::Float(_))
    }

    /// Bytes counted against the byte cap (String/Array length, else 0)
    pub fn payload_len(&self) -> usize {
        match self {
            Value::String(bytes) | Value::Array(bytes) => bytes.len(),
            _ => 0,
        }
    }

    /// Parse decimal text into a Numeric value.
    ///
    /// Text containing a `.` becomes a float, anything else an integer.
    pub fn parse_numeric(text: &[u8]) -> Result<Value> {
        let text = std::str::from_utf8(text)
            .map_err(|_| VarError::malformed("numeric value is not valid text"))?
            .trim();

        if text.contains('.') {
            text.parse::<f64>()
                .map(Value::Float)
                .map_err(|e| VarError::Malformed(format!("bad float {:?}: {}", text, e)))
        } else {
            text.parse::<i64>()
                .map(Value::Integer)
                .map_err(|e| VarError::Malformed(format!("bad integer {:?}: {}", text, e)))
        }
    }

    /// Wire text of the value.
    ///
    /// Logical is `1`/`0`, integers are plain decimal, floats carry six
    /// decimals, String/Array are the raw bytes.
    pub fn text(&self) -> Cow<'_, [u8]> {
        match self {
            Value::Logical(true) => Cow::Borrowed(&b"1"[..]),
            Value::Logical(false) => Cow::Borrowed(&b"0"[..]),
            Value::Integer(n) => Cow::Owned(n.to_string().into_bytes()),
            Value::Float(f) => Cow::Owned(format!("{:.6}", f).into_bytes()),
            Value::String(bytes) | Value::Array(bytes) => Cow::Borrowed(bytes.as_slice()),
        }
    }
}

/// Per-variable flags, decoded from the wire flag byte
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VarFlags {
    pub create_if_missing: bool,
    pub owned: bool,
    pub deny_write: bool,
    pub deny_read: bool,
}

impl VarFlags {
    /// Flag bytes are printable: this base is always set on the wire
    pub const WIRE_BASE: u8 = 0x20;

    const CREATE: u8 = 0x01;
    const OWNED: u8 = 0x02;
    const DENY_WRITE: u8 = 0x04;
    const DENY_READ: u8 = 0x08;

    /// Decode the first flag byte of a SET/INC/DEC request
    pub fn from_wire(byte: u8) -> Result<Self> {
        if byte < Self::WIRE_BASE {
            return Err(VarError::Malformed(format!(
                "flag byte 0x{:02x} below printable range",
                byte
            )));
        }
        Ok(Self {
            create_if_missing: byte & Self::CREATE != 0,
            owned: byte & Self::OWNED != 0,
            deny_write: byte & Self::DENY_WRITE != 0,
            deny_read: byte & Self::DENY_READ != 0,
        })
    }

    /// Encode as a wire flag byte
    pub fn to_wire(self) -> u8 {
        let mut byte = Self::WIRE_BASE;
        if self.create_if_missing {
            byte |= Self::CREATE;
        }
        if self.owned {
            byte |= Self::OWNED;
        }
        if self.deny_write {
            byte |= Self::DENY_WRITE;
        }
        if self.deny_read {
            byte |= Self::DENY_READ;
        }
        byte
    }

    /// Flags permitting creation and nothing else
    pub fn create() -> Self {
        Self {
            create_if_missing: true,
            ..Self::default()
        }
    }
}

/// Store-unique identity of a variable, never reused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VarId(pub(crate) u64);

/// A single named variable
#[derive(Debug)]
pub struct Variable {
    pub(crate) id: VarId,
    pub(crate) name: String,
    pub(crate) flags: VarFlags,
    /// Set iff `flags.owned`
    pub(crate) owner: Option<ConnId>,
    pub(crate) value: Value,
}

impl Variable {
    pub(crate) fn new(id: VarId, name: &str, flags: VarFlags, owner: ConnId, value: Value) -> Self {
        Self {
            id,
            name: name.to_string(),
            flags,
            owner: flags.owned.then_some(owner),
            value,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn flags(&self) -> VarFlags {
        self.flags
    }

    pub fn owner(&self) -> Option<ConnId> {
        self.owner
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Owned, DenyRead and requested by someone else
    pub fn read_denied(&self, conn: ConnId) -> bool {
        self.flags.deny_read && self.foreign(conn)
    }

    /// Owned, DenyWrite and requested by someone else
    pub fn write_denied(&self, conn: ConnId) -> bool {
        self.flags.deny_write && self.foreign(conn)
    }

    fn foreign(&self, conn: ConnId) -> bool {
        matches!(self.owner, Some(owner) if owner != conn)
    }

    /// Replace the value. A String/Array buffer large enough for the new
    /// bytes is reused, so shrinking never releases its allocation.
    pub(crate) fn assign(&mut self, value: Value) {
        match (&mut self.value, value) {
            (Value::String(buf), Value::String(new)) | (Value::Array(buf), Value::Array(new))
                if new.len() <= buf.capacity() =>
            {
                buf.clear();
                buf.extend_from_slice(&new);
            }
            (slot, new) => *slot = new,
        }
    }
}
