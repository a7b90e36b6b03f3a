//! Connection Handler
//!
//! Handles individual client connections.

use std::io::{BufReader, BufWriter, ErrorKind};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::WorkerCache;
use crate::dispatcher::Dispatcher;
use crate::error::{Result, VarError};
use crate::protocol::{encode_response, read_frame, write_frame, Response};
use crate::store::{Caller, ConnId};

/// Handles a single client connection
///
/// Owns the connection's owner id. Dropping the handler releases every
/// Owned variable the connection created.
pub struct Connection {
    /// TCP stream reader (buffered for efficiency)
    reader: BufReader<TcpStream>,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,

    /// Dispatcher (and through it the store)
    dispatcher: Arc<Dispatcher>,

    /// Owner id of this connection
    conn: ConnId,

    /// Peer address for logging
    peer_addr: String,
}

impl Connection {
    /// Create a new connection handler
    ///
    /// Sets up buffered I/O and assigns a fresh owner id
    pub fn new(stream: TcpStream, dispatcher: Arc<Dispatcher>) -> Result<Self> {
        let conn = dispatcher.store().open_connection();
        Self::with_id(stream, dispatcher, conn)
    }

    /// Create a handler for an owner id the caller already obtained
    pub fn with_id(stream: TcpStream, dispatcher: Arc<Dispatcher>, conn: ConnId) -> Result<Self> {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        let read_stream = stream.try_clone()?;
        let write_stream = stream;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(write_stream),
            dispatcher,
            conn,
            peer_addr,
        })
    }

    /// Configure connection timeouts
    pub fn set_timeouts(&mut self, read_ms: u64, write_ms: u64) -> Result<()> {
        if read_ms > 0 {
            self.reader
                .get_ref()
                .set_read_timeout(Some(Duration::from_millis(read_ms)))?;
        }
        if write_ms > 0 {
            self.writer
                .get_ref()
                .set_write_timeout(Some(Duration::from_millis(write_ms)))?;
        }
        Ok(())
    }

    /// Handle the connection (blocking until closed)
    ///
    /// Reads request frames in a loop and sends one response frame each.
    /// Returns when the client disconnects or an error occurs.
    pub fn handle(&mut self, cache: &WorkerCache) -> Result<()> {
        tracing::debug!("Connection {} established from {}", self.conn, self.peer_addr);

        loop {
            let request = match read_frame(&mut self.reader) {
                Ok(request) => request,
                Err(VarError::Io(ref e)) if is_disconnect(e.kind()) => {
                    tracing::debug!("Client {} disconnected ({:?})", self.peer_addr, e.kind());
                    return Ok(());
                }
                Err(VarError::Io(ref e))
                    if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
                {
                    tracing::debug!("Read timeout for client {}", self.peer_addr);
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!("Error reading from {}: {}", self.peer_addr, e);
                    if let Err(send_err) = self.send(&encode_response(&Response::Status(e.status()))) {
                        tracing::debug!(
                            "Could not report error to {}: {}",
                            self.peer_addr,
                            send_err
                        );
                    }
                    return Err(e);
                }
            };

            let response = self
                .dispatcher
                .handle_request(Caller::new(self.conn, cache), &request);

            if let Err(e) = self.send(&response) {
                if let VarError::Io(ref io_err) = e {
                    if is_disconnect(io_err.kind()) {
                        tracing::debug!(
                            "Client {} disconnected before response could be sent: {}",
                            self.peer_addr,
                            e
                        );
                        return Ok(());
                    }
                }
                tracing::warn!("Error writing to {}: {}", self.peer_addr, e);
                return Err(e);
            }
        }
    }

    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        write_frame(&mut self.writer, bytes)
    }

    /// Owner id of this connection
    pub fn id(&self) -> ConnId {
        self.conn
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.dispatcher.store().release_connection(self.conn);
        tracing::debug!("Connection {} from {} closed", self.conn, self.peer_addr);
    }
}

fn is_disconnect(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::UnexpectedEof
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
    )
}
