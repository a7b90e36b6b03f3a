//! Protocol Module
//!
//! Defines the wire protocol for client-server communication.
//!
//! ## Request Format
//! ```text
//! ┌────────┬───┬───────┬───┬──────┬───┬────────┬───┬─────────────┐
//! │ Op (1) │ ; │ group │ ; │ name │ ; │ field3 │ ; │ field4 ...  │
//! └────────┴───┴───────┴───┴──────┴───┴────────┴───┴─────────────┘
//! ```
//!
//! ### Operations
//! - `s`: SET  - field3: type + 2 flag bytes, field4: length-prefixed value
//! - `g`: GET
//! - `i`: INC  - field3: `2` + 2 flag bytes
//! - `d`: DEC  - field3: `2` + 2 flag bytes
//! - `x`: DEL  - empty name deletes the group
//! - `l`: LIST - empty group lists groups, field3: max value length
//!
//! ### Type Tags
//! - `1`: Logical, `2`: Numeric, `3`: String, `4`: Array
//!
//! ### Status Codes
//! - `++++`: OK
//! - `-001`: operation failed
//! - `-002`: malformed request
//! - `-003`: not found or quota denied
//! - `-004`: type mismatch
//! - `-ACC`: access denied

mod codec;
mod request;
mod response;

pub use codec::{
    decode_len, decode_request, decode_response, encode_len, encode_request, encode_response,
    read_frame, split_fields, write_frame, Fields, DELIMITER, FRAME_HEADER_SIZE, MAX_FRAME_SIZE,
    MAX_LEN_BYTES,
};
pub use request::{OpCode, Request, RETURN_PREVIOUS};
pub use response::{Response, Status};
