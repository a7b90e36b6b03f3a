//! Request definitions
//!
//! Represents decoded requests from clients. Wire flag bytes are decoded
//! into named booleans here and nowhere else.

use crate::store::{Value, VarFlags};

/// Operation tags (first byte of every request)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    Set = b's',
    Get = b'g',
    Increment = b'i',
    Decrement = b'd',
    Delete = b'x',
    List = b'l',
}

impl OpCode {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b's' => Some(OpCode::Set),
            b'g' => Some(OpCode::Get),
            b'i' => Some(OpCode::Increment),
            b'd' => Some(OpCode::Decrement),
            b'x' => Some(OpCode::Delete),
            b'l' => Some(OpCode::List),
            _ => None,
        }
    }
}

/// Second flag byte: ask for the value as it was before the write
pub const RETURN_PREVIOUS: u8 = 0x10;

/// A parsed request
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    /// Write a value, optionally creating the variable
    Set {
        group: String,
        name: String,
        value: Value,
        flags: VarFlags,
        return_previous: bool,
    },

    /// Read a value
    Get { group: String, name: String },

    /// Add one to an integer variable
    Increment {
        group: String,
        name: String,
        flags: VarFlags,
        return_previous: bool,
    },

    /// Subtract one from an integer variable
    Decrement {
        group: String,
        name: String,
        flags: VarFlags,
        return_previous: bool,
    },

    /// Delete a variable, or the whole group when `name` is None
    Delete { group: String, name: Option<String> },

    /// List groups (no group), variable names (no length) or variables with
    /// value previews
    List {
        group: Option<String>,
        max_value_len: Option<u16>,
    },
}

impl Request {
    /// Get the operation tag
    pub fn op_code(&self) -> OpCode {
        match self {
            Request::Set { .. } => OpCode::Set,
            Request::Get { .. } => OpCode::Get,
            Request::Increment { .. } => OpCode::Increment,
            Request::Decrement { .. } => OpCode::Decrement,
            Request::Delete { .. } => OpCode::Delete,
            Request::List { .. } => OpCode::List,
        }
    }
}
