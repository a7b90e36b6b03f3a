//! Response definitions
//!
//! Represents responses to clients.

use crate::store::{ListEntry, Value};

/// Response status codes, each sent as exactly four bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// `++++`
    Ok,
    /// `-001` operation-specific failure
    Failed,
    /// `-002` malformed request
    Malformed,
    /// `-003` not found, or denied by a quota
    NotFound,
    /// `-004` type mismatch
    TypeMismatch,
    /// `-ACC` access denied
    AccessDenied,
}

impl Status {
    /// The four wire bytes
    pub fn code(self) -> &'static [u8; 4] {
        match self {
            Status::Ok => b"++++",
            Status::Failed => b"-001",
            Status::Malformed => b"-002",
            Status::NotFound => b"-003",
            Status::TypeMismatch => b"-004",
            Status::AccessDenied => b"-ACC",
        }
    }

    pub fn from_code(code: &[u8]) -> Option<Self> {
        match code {
            b"++++" => Some(Status::Ok),
            b"-001" => Some(Status::Failed),
            b"-002" => Some(Status::Malformed),
            b"-003" => Some(Status::NotFound),
            b"-004" => Some(Status::TypeMismatch),
            b"-ACC" => Some(Status::AccessDenied),
            _ => None,
        }
    }
}

/// A response to send to a client
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    /// Bare status code
    Status(Status),

    /// Type-tagged value (GET, INC/DEC, SET with ReturnPrevious)
    Value(Value),

    /// SET with ReturnPrevious on a variable the same SET created
    NoPrevious,

    /// Names of all live groups
    Groups(Vec<String>),

    /// Names of all variables in a group
    Names(Vec<String>),

    /// Readable variables of a group with value previews
    Values(Vec<ListEntry>),
}

impl Response {
    /// Create an OK response
    pub fn ok() -> Self {
        Response::Status(Status::Ok)
    }

    /// Status of this response; every non-status response is a success
    pub fn status(&self) -> Status {
        match self {
            Response::Status(status) => *status,
            _ => Status::Ok,
        }
    }
}
