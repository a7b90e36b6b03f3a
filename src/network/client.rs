//! Blocking client
//!
//! Sends one request frame and waits for its response frame.

use std::io::{BufReader, BufWriter};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::error::Result;
use crate::protocol::{decode_response, encode_request, read_frame, write_frame, Request, Response};
use crate::store::{Value, VarFlags};

/// A connection to a sharedvars server
pub struct Client {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl Client {
    pub fn connect(addr: impl ToSocketAddrs) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        let read_stream = stream.try_clone()?;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
        })
    }

    /// Fail reads that wait longer than `timeout` (None blocks forever)
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.reader.get_ref().set_read_timeout(timeout)?;
        Ok(())
    }

    /// Send a request and decode its response
    pub fn request(&mut self, request: &Request) -> Result<Response> {
        write_frame(&mut self.writer, &encode_request(request))?;
        let bytes = read_frame(&mut self.reader)?;
        decode_response(request, &bytes)
    }

    pub fn set(&mut self, group: &str, name: &str, value: Value, flags: VarFlags) -> Result<Response> {
        self.request(&Request::Set {
            group: group.to_string(),
            name: name.to_string(),
            value,
            flags,
            return_previous: false,
        })
    }

    pub fn get(&mut self, group: &str, name: &str) -> Result<Response> {
        self.request(&Request::Get {
            group: group.to_string(),
            name: name.to_string(),
        })
    }

    pub fn increment(&mut self, group: &str, name: &str, flags: VarFlags) -> Result<Response> {
        self.request(&Request::Increment {
            group: group.to_string(),
            name: name.to_string(),
            flags,
            return_previous: false,
        })
    }

    pub fn decrement(&mut self, group: &str, name: &str, flags: VarFlags) -> Result<Response> {
        self.request(&Request::Decrement {
            group: group.to_string(),
            name: name.to_string(),
            flags,
            return_previous: false,
        })
    }

    /// Delete a variable, or the whole group when `name` is None
    pub fn delete(&mut self, group: &str, name: Option<&str>) -> Result<Response> {
        self.request(&Request::Delete {
            group: group.to_string(),
            name: name.map(str::to_string),
        })
    }

    pub fn list(&mut self, group: Option<&str>, max_value_len: Option<u16>) -> Result<Response> {
        self.request(&Request::List {
            group: group.map(str::to_string),
            max_value_len,
        })
    }
}
