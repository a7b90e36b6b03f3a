//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Transport Frame
//! ```text
//! ┌──────────┬─────────────────────────────┐
//! │ Len (4)  │  Request or response bytes  │
//! └──────────┴─────────────────────────────┘
//! ```
//!
//! ## Request
//! ```text
//! op ';' group ';' name [';' field3 [';' field4 ...]]
//! ```
//! `field4` is the raw remainder and may contain `;` or binary data.
//!
//! - SET:     field3 = type, flags1, flags2; field4 = lenlen, len (LE), value
//! - GET:     no extra fields
//! - INC/DEC: field3 = '2', flags1, flags2
//! - DEL:     empty name deletes the whole group
//! - LIST:    empty group lists groups; field3 = max value length (1-3 digits)
//!
//! ## Response
//! - status:  `++++`, `-001`, `-002`, `-003`, `-004`, `-ACC`
//! - value:   `+` type `;` text
//! - listing: `+` count `;` then `name;` per item, or
//!   `name ';' type ';' lenlen len bytes` per item with values

use std::io::{Read, Write};

use bytes::{BufMut, BytesMut};

use crate::error::{Result, VarError};
use crate::store::{ListEntry, Value, VarFlags, VarType};
use super::request::RETURN_PREVIOUS;
use super::{OpCode, Request, Response, Status};

/// Frame header size: 4 bytes big-endian payload length
pub const FRAME_HEADER_SIZE: usize = 4;

/// Maximum frame payload size (16 MB)
pub const MAX_FRAME_SIZE: u32 = 16 * 1024 * 1024;

/// Length prefixes use at most this many bytes
pub const MAX_LEN_BYTES: usize = 9;

/// Field delimiter
pub const DELIMITER: u8 = b';';

const NO_PREVIOUS: &[u8] = b"+?;";

// =============================================================================
// Length Prefixes
// =============================================================================

/// Encode a length as minimal little-endian bytes (zero encodes as no bytes)
pub fn encode_len(len: usize) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(std::mem::size_of::<usize>());
    let mut rest = len;
    while rest > 0 {
        bytes.push((rest & 0xFF) as u8);
        rest >>= 8;
    }
    bytes
}

/// Decode a little-endian length of up to [`MAX_LEN_BYTES`] bytes
pub fn decode_len(bytes: &[u8]) -> Result<usize> {
    if bytes.len() > MAX_LEN_BYTES {
        return Err(VarError::Malformed(format!(
            "length prefix of {} bytes (max {})",
            bytes.len(),
            MAX_LEN_BYTES
        )));
    }
    let len = bytes
        .iter()
        .rev()
        .fold(0u128, |acc, &byte| (acc << 8) | u128::from(byte));
    usize::try_from(len).map_err(|_| VarError::Malformed(format!("length {} out of range", len)))
}

fn put_len_prefixed(buf: &mut BytesMut, bytes: &[u8]) {
    let len = encode_len(bytes.len());
    buf.put_u8(len.len() as u8);
    buf.put_slice(&len);
    buf.put_slice(bytes);
}

// =============================================================================
// Tokenizer
// =============================================================================

/// Positional fields of a request, after the operation tag
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Fields<'a> {
    pub group: Option<&'a [u8]>,
    pub name: Option<&'a [u8]>,
    pub field3: Option<&'a [u8]>,
    /// Raw remainder of the request
    pub field4: Option<&'a [u8]>,
}

impl Fields<'_> {
    /// Number of fields present
    pub fn count(&self) -> usize {
        [self.group, self.name, self.field3, self.field4]
            .iter()
            .filter(|field| field.is_some())
            .count()
    }
}

/// Split a request body into at most four fields
pub fn split_fields(body: &[u8]) -> Fields<'_> {
    let mut parts = body.splitn(4, |&byte| byte == DELIMITER);
    Fields {
        group: parts.next(),
        name: parts.next(),
        field3: parts.next(),
        field4: parts.next(),
    }
}

// =============================================================================
// Request Encoding/Decoding
// =============================================================================

/// Encode a request to bytes
pub fn encode_request(request: &Request) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(64);
    buf.put_u8(request.op_code() as u8);
    buf.put_u8(DELIMITER);

    match request {
        Request::Set {
            group,
            name,
            value,
            flags,
            return_previous,
        } => {
            put_names(&mut buf, group, name);
            buf.put_u8(DELIMITER);
            put_head(&mut buf, value.var_type(), *flags, *return_previous);
            buf.put_u8(DELIMITER);
            put_len_prefixed(&mut buf, &value.text());
        }
        Request::Get { group, name } => put_names(&mut buf, group, name),
        Request::Increment {
            group,
            name,
            flags,
            return_previous,
        }
        | Request::Decrement {
            group,
            name,
            flags,
            return_previous,
        } => {
            put_names(&mut buf, group, name);
            buf.put_u8(DELIMITER);
            put_head(&mut buf, VarType::Numeric, *flags, *return_previous);
        }
        Request::Delete { group, name } => {
            put_names(&mut buf, group, name.as_deref().unwrap_or(""));
        }
        Request::List {
            group,
            max_value_len,
        } => {
            put_names(&mut buf, group.as_deref().unwrap_or(""), "");
            if let Some(len) = max_value_len {
                buf.put_u8(DELIMITER);
                buf.put_slice(len.to_string().as_bytes());
            }
        }
    }

    buf.to_vec()
}

fn put_names(buf: &mut BytesMut, group: &str, name: &str) {
    buf.put_slice(group.as_bytes());
    buf.put_u8(DELIMITER);
    buf.put_slice(name.as_bytes());
}

fn put_head(buf: &mut BytesMut, var_type: VarType, flags: VarFlags, return_previous: bool) {
    buf.put_u8(var_type.tag());
    buf.put_u8(flags.to_wire());
    buf.put_u8(if return_previous {
        VarFlags::WIRE_BASE | RETURN_PREVIOUS
    } else {
        VarFlags::WIRE_BASE
    });
}

/// Decode a raw request
pub fn decode_request(raw: &[u8]) -> Result<Request> {
    let (&op, rest) = raw
        .split_first()
        .ok_or_else(|| VarError::malformed("empty request"))?;
    let body = rest
        .strip_prefix(&[DELIMITER])
        .ok_or_else(|| VarError::malformed("missing delimiter after operation"))?;

    let fields = split_fields(body);
    let (Some(group), Some(name)) = (fields.group, fields.name) else {
        return Err(VarError::Malformed(format!(
            "expected at least group and name fields, got {}",
            fields.count()
        )));
    };

    let op = OpCode::from_byte(op)
        .ok_or_else(|| VarError::Malformed(format!("unknown operation: 0x{:02x}", op)))?;

    match op {
        OpCode::Set => decode_set(group, name, fields),
        OpCode::Get => Ok(Request::Get {
            group: required_text(group, "group")?,
            name: required_text(name, "variable")?,
        }),
        OpCode::Increment | OpCode::Decrement => decode_step(op, group, name, fields.field3),
        OpCode::Delete => Ok(Request::Delete {
            group: required_text(group, "group")?,
            name: optional_text(name)?,
        }),
        OpCode::List => Ok(Request::List {
            group: optional_text(group)?,
            max_value_len: fields.field3.and_then(parse_max_value_len),
        }),
    }
}

/// Decode SET fields
fn decode_set(group: &[u8], name: &[u8], fields: Fields<'_>) -> Result<Request> {
    let group = required_text(group, "group")?;
    let name = required_text(name, "variable")?;
    let (tag, flags, return_previous) = decode_head(fields.field3)?;
    let var_type = VarType::from_tag(tag)
        .ok_or_else(|| VarError::Malformed(format!("unknown type tag: 0x{:02x}", tag)))?;
    let value = decode_value(var_type, fields.field4)?;

    Ok(Request::Set {
        group,
        name,
        value,
        flags,
        return_previous,
    })
}

/// Decode INC/DEC fields
fn decode_step(op: OpCode, group: &[u8], name: &[u8], head: Option<&[u8]>) -> Result<Request> {
    let group = required_text(group, "group")?;
    let name = required_text(name, "variable")?;
    let (tag, flags, return_previous) = decode_head(head)?;
    if tag != VarType::Numeric.tag() {
        return Err(VarError::Malformed(format!(
            "increment operand must be numeric, got type 0x{:02x}",
            tag
        )));
    }

    Ok(if op == OpCode::Increment {
        Request::Increment {
            group,
            name,
            flags,
            return_previous,
        }
    } else {
        Request::Decrement {
            group,
            name,
            flags,
            return_previous,
        }
    })
}

/// Decode the type byte and the two flag bytes
fn decode_head(head: Option<&[u8]>) -> Result<(u8, VarFlags, bool)> {
    let head = head.ok_or_else(|| VarError::malformed("missing type and flags"))?;
    let &[tag, flags1, flags2] = head else {
        return Err(VarError::Malformed(format!(
            "type/flags field must be 3 bytes, got {}",
            head.len()
        )));
    };
    if tag < VarType::Logical.tag() {
        return Err(VarError::Malformed(format!("type byte 0x{:02x} out of range", tag)));
    }
    let flags = VarFlags::from_wire(flags1)?;
    if flags2 < VarFlags::WIRE_BASE {
        return Err(VarError::Malformed(format!(
            "flag byte 0x{:02x} below printable range",
            flags2
        )));
    }
    Ok((tag, flags, flags2 & RETURN_PREVIOUS != 0))
}

/// Decode the length-prefixed value of a SET
fn decode_value(var_type: VarType, field: Option<&[u8]>) -> Result<Value> {
    let field = field.ok_or_else(|| VarError::malformed("missing value"))?;
    let (&len_len, rest) = field
        .split_first()
        .ok_or_else(|| VarError::malformed("missing value length"))?;
    let len_len = usize::from(len_len);
    if len_len > MAX_LEN_BYTES || rest.len() < len_len {
        return Err(VarError::malformed("missing value length"));
    }

    let (len_bytes, rest) = rest.split_at(len_len);
    let len = decode_len(len_bytes)?;
    if len == 0 {
        return Err(VarError::malformed("zero value length"));
    }
    let bytes = rest.get(..len).ok_or_else(|| {
        VarError::Malformed(format!(
            "value truncated: expected {} bytes, got {}",
            len,
            rest.len()
        ))
    })?;

    Ok(match var_type {
        VarType::Logical => Value::Logical(bytes[0] != b'0'),
        VarType::Numeric => Value::parse_numeric(bytes)?,
        VarType::String => Value::String(bytes.to_vec()),
        VarType::Array => Value::Array(bytes.to_vec()),
    })
}

fn parse_max_value_len(field: &[u8]) -> Option<u16> {
    if field.is_empty() || field.len() > 3 {
        return None;
    }
    std::str::from_utf8(field)
        .ok()?
        .parse::<u16>()
        .ok()
        .filter(|&len| len > 0)
}

fn text(bytes: &[u8]) -> Result<String> {
    String::from_utf8(bytes.to_vec()).map_err(|_| VarError::malformed("name is not valid UTF-8"))
}

fn required_text(bytes: &[u8], what: &str) -> Result<String> {
    if bytes.is_empty() {
        return Err(VarError::Malformed(format!("empty {} name", what)));
    }
    text(bytes)
}

fn optional_text(bytes: &[u8]) -> Result<Option<String>> {
    if bytes.is_empty() {
        Ok(None)
    } else {
        text(bytes).map(Some)
    }
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Encode a response to bytes
pub fn encode_response(response: &Response) -> Vec<u8> {
    let mut buf = BytesMut::new();

    match response {
        Response::Status(status) => buf.put_slice(status.code()),
        Response::Value(value) => {
            buf.put_u8(b'+');
            buf.put_u8(value.var_type().tag());
            buf.put_u8(DELIMITER);
            buf.put_slice(&value.text());
        }
        Response::NoPrevious => buf.put_slice(NO_PREVIOUS),
        Response::Groups(names) | Response::Names(names) => {
            put_count(&mut buf, names.len());
            for name in names {
                buf.put_slice(name.as_bytes());
                buf.put_u8(DELIMITER);
            }
        }
        Response::Values(entries) => {
            put_count(&mut buf, entries.len());
            for entry in entries {
                buf.put_slice(entry.name.as_bytes());
                buf.put_u8(DELIMITER);
                buf.put_u8(entry.var_type.tag());
                buf.put_u8(DELIMITER);
                put_len_prefixed(&mut buf, &entry.preview);
            }
        }
    }

    buf.to_vec()
}

fn put_count(buf: &mut BytesMut, count: usize) {
    buf.put_u8(b'+');
    buf.put_slice(count.to_string().as_bytes());
    buf.put_u8(DELIMITER);
}

/// Decode the response to `request`.
///
/// The request is needed because a listing and a value response share the
/// `+` prefix.
pub fn decode_response(request: &Request, bytes: &[u8]) -> Result<Response> {
    if bytes.len() == Status::Ok.code().len() {
        if let Some(status) = Status::from_code(bytes) {
            return Ok(Response::Status(status));
        }
    }

    let body = bytes
        .strip_prefix(b"+")
        .ok_or_else(|| VarError::Protocol(format!("unknown response: {:?}", String::from_utf8_lossy(bytes))))?;

    match request {
        Request::List { group: None, .. } => decode_names(body).map(Response::Groups),
        Request::List {
            max_value_len: None,
            ..
        } => decode_names(body).map(Response::Names),
        Request::List { .. } => decode_entries(body).map(Response::Values),
        Request::Set { .. } if bytes == NO_PREVIOUS => Ok(Response::NoPrevious),
        _ => decode_value_response(body).map(Response::Value),
    }
}

fn decode_value_response(body: &[u8]) -> Result<Value> {
    let &[tag, DELIMITER, ref text @ ..] = body else {
        return Err(VarError::Protocol("truncated value response".to_string()));
    };
    let var_type = VarType::from_tag(tag)
        .ok_or_else(|| VarError::Protocol(format!("unknown type tag in response: 0x{:02x}", tag)))?;

    Ok(match var_type {
        VarType::Logical => Value::Logical(text.first().is_some_and(|&byte| byte != b'0')),
        VarType::Numeric => Value::parse_numeric(text)
            .map_err(|e| VarError::Protocol(e.to_string()))?,
        VarType::String => Value::String(text.to_vec()),
        VarType::Array => Value::Array(text.to_vec()),
    })
}

/// Split off one `;`-terminated field
fn take_field(bytes: &[u8]) -> Result<(&[u8], &[u8])> {
    let pos = bytes
        .iter()
        .position(|&byte| byte == DELIMITER)
        .ok_or_else(|| VarError::Protocol("unterminated field in listing".to_string()))?;
    Ok((&bytes[..pos], &bytes[pos + 1..]))
}

fn decode_count(body: &[u8]) -> Result<(usize, &[u8])> {
    let (count, rest) = take_field(body)?;
    let count = std::str::from_utf8(count)
        .ok()
        .and_then(|text| text.parse::<usize>().ok())
        .ok_or_else(|| VarError::Protocol("bad listing count".to_string()))?;
    Ok((count, rest))
}

fn decode_names(body: &[u8]) -> Result<Vec<String>> {
    let (count, mut rest) = decode_count(body)?;
    let mut names = Vec::with_capacity(count);
    for _ in 0..count {
        let (name, tail) = take_field(rest)?;
        names.push(String::from_utf8_lossy(name).into_owned());
        rest = tail;
    }
    Ok(names)
}

fn decode_entries(body: &[u8]) -> Result<Vec<ListEntry>> {
    let (count, mut rest) = decode_count(body)?;
    let mut entries = Vec::with_capacity(count);
    for _ in 0..count {
        let (name, tail) = take_field(rest)?;
        let &[tag, DELIMITER, len_len, ref tail @ ..] = tail else {
            return Err(VarError::Protocol("truncated listing entry".to_string()));
        };
        let var_type = VarType::from_tag(tag)
            .ok_or_else(|| VarError::Protocol(format!("unknown type tag in listing: 0x{:02x}", tag)))?;

        let len_len = usize::from(len_len);
        if tail.len() < len_len {
            return Err(VarError::Protocol("truncated listing length".to_string()));
        }
        let (len_bytes, tail) = tail.split_at(len_len);
        let len = decode_len(len_bytes).map_err(|e| VarError::Protocol(e.to_string()))?;
        let preview = tail
            .get(..len)
            .ok_or_else(|| VarError::Protocol("truncated listing value".to_string()))?;

        entries.push(ListEntry {
            name: String::from_utf8_lossy(name).into_owned(),
            var_type,
            preview: preview.to_vec(),
        });
        rest = &tail[len..];
    }
    Ok(entries)
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read one frame payload from a stream
///
/// Blocks until a complete frame is received or an error occurs
pub fn read_frame<R: Read>(reader: &mut R) -> Result<Vec<u8>> {
    let mut header = [0u8; FRAME_HEADER_SIZE];
    reader.read_exact(&mut header)?;

    let payload_len = u32::from_be_bytes(header);
    if payload_len > MAX_FRAME_SIZE {
        return Err(VarError::Protocol(format!(
            "Payload too large: {} bytes (max {})",
            payload_len, MAX_FRAME_SIZE
        )));
    }

    let mut payload = vec![0u8; payload_len as usize];
    if payload_len > 0 {
        reader.read_exact(&mut payload)?;
    }
    Ok(payload)
}

/// Write one frame to a stream
pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> Result<()> {
    let len = u32::try_from(payload.len())
        .ok()
        .filter(|&len| len <= MAX_FRAME_SIZE)
        .ok_or_else(|| {
            VarError::Protocol(format!(
                "Payload too large: {} bytes (max {})",
                payload.len(),
                MAX_FRAME_SIZE
            ))
        })?;
    writer.write_all(&len.to_be_bytes())?;
    writer.write_all(payload)?;
    writer.flush()?;
    Ok(())
}
