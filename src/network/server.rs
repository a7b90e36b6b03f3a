//! TCP Server
//!
//! Accepts connections and serves each one on its own worker thread, up to
//! `max_connections` at a time. Every worker owns one
//! [`WorkerCache`](crate::cache::WorkerCache). Connections past the limit are
//! closed as soon as they are accepted.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam::sync::WaitGroup;
use parking_lot::Mutex;

use crate::config::Config;
use crate::dispatcher::Dispatcher;
use crate::error::{Result, VarError};
use crate::store::{ConnId, VarStore};
use super::connection::Connection;

/// How long the acceptor sleeps when no connection is pending
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Streams of admitted connections, kept to unblock workers at shutdown
type LiveConnections = Arc<Mutex<HashMap<ConnId, TcpStream>>>;

/// Signals a running server to stop
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_shutdown(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// TCP server for sharedvars
pub struct Server {
    config: Config,
    dispatcher: Arc<Dispatcher>,
    listener: TcpListener,
    shutdown: ShutdownHandle,
    live: LiveConnections,
}

impl Server {
    /// Bind the listen address from `config`
    pub fn bind(config: Config, store: Arc<VarStore>) -> Result<Self> {
        config.validate()?;

        let listener = TcpListener::bind(&config.listen_addr)?;
        listener.set_nonblocking(true)?;
        tracing::info!("Listening on {}", listener.local_addr()?);

        Ok(Self {
            config,
            dispatcher: Arc::new(Dispatcher::new(store)),
            listener,
            shutdown: ShutdownHandle {
                flag: Arc::new(AtomicBool::new(false)),
            },
            live: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    /// The bound address (useful with port 0)
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// A handle that stops [`Server::run`] from another thread
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Signal the server to shutdown gracefully
    pub fn shutdown(&self) {
        self.shutdown.shutdown();
    }

    /// Number of connections currently being served
    pub fn connection_count(&self) -> usize {
        self.live.lock().len()
    }

    /// Start the server (blocking until shutdown)
    ///
    /// On shutdown, open connections are closed and their owned variables
    /// released before this returns.
    pub fn run(&self) -> Result<()> {
        let workers = WaitGroup::new();

        tracing::info!(
            "Server started, serving up to {} connections",
            self.config.max_connections
        );

        while !self.shutdown.is_shutdown() {
            match self.listener.accept() {
                Ok((stream, addr)) => self.admit(stream, addr, &workers),
                Err(e) if e.kind() == ErrorKind::WouldBlock => thread::sleep(ACCEPT_POLL_INTERVAL),
                Err(e) => tracing::warn!("Accept failed: {}", e),
            }
        }

        tracing::info!("Shutting down, closing {} connections", self.connection_count());
        for stream in self.live.lock().values() {
            let _ = stream.shutdown(Shutdown::Both);
        }
        workers.wait();

        tracing::info!("Server stopped");
        Ok(())
    }

    /// Register an accepted stream and start its worker, or close it when
    /// the connection limit is reached
    fn admit(&self, stream: TcpStream, addr: SocketAddr, workers: &WaitGroup) {
        let mut live = self.live.lock();
        if live.len() >= self.config.max_connections {
            tracing::warn!(
                "Rejecting {}: connection limit of {} reached",
                addr,
                self.config.max_connections
            );
            return;
        }

        // Accepted sockets may inherit non-blocking mode from the listener
        if let Err(e) = stream.set_nonblocking(false) {
            tracing::warn!("Rejecting {}: {}", addr, e);
            return;
        }
        let handle = match stream.try_clone() {
            Ok(handle) => handle,
            Err(e) => {
                tracing::warn!("Rejecting {}: {}", addr, e);
                return;
            }
        };

        let conn = self.dispatcher.store().open_connection();
        live.insert(conn, handle);
        drop(live);

        if let Err(e) = self.spawn_worker(conn, stream, workers.clone()) {
            tracing::warn!("Rejecting {}: {}", addr, e);
            self.live.lock().remove(&conn);
            self.dispatcher.store().release_connection(conn);
        }
    }

    /// Serve one connection on a dedicated thread with its own cache
    fn spawn_worker(&self, conn: ConnId, stream: TcpStream, done: WaitGroup) -> Result<()> {
        let dispatcher = Arc::clone(&self.dispatcher);
        let live = Arc::clone(&self.live);
        let read_ms = self.config.read_timeout_ms;
        let write_ms = self.config.write_timeout_ms;

        thread::Builder::new()
            .name(format!("sharedvars-worker-{}", conn.0))
            .spawn(move || {
                let cache = dispatcher.store().register_worker();

                match Connection::with_id(stream, Arc::clone(&dispatcher), conn) {
                    Ok(mut connection) => {
                        let result = connection
                            .set_timeouts(read_ms, write_ms)
                            .and_then(|_| connection.handle(&cache));
                        if let Err(e) = result {
                            tracing::debug!("Connection {} ended with error: {}", conn, e);
                        }
                    }
                    Err(e) => {
                        tracing::warn!("Failed to set up connection {}: {}", conn, e);
                        dispatcher.store().release_connection(conn);
                    }
                }
                live.lock().remove(&conn);
                drop(done);
            })
            .map(|_| ())
            .map_err(VarError::Io)
    }
}
