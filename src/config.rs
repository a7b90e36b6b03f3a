//! Configuration for sharedvars
//!
//! Centralized configuration with sensible defaults.

use crate::error::{Result, VarError};

/// Main configuration for a sharedvars instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Quota Configuration
    // -------------------------------------------------------------------------
    /// Slot cap: maximum allocated variable slots across all groups.
    /// Slots are allocated in chunks, so this bounds capacity, not live count.
    pub max_vars: usize,

    /// Byte cap: maximum summed length of all String/Array values.
    /// A single value may use at most a quarter of it.
    pub max_var_bytes: usize,

    /// Maximum number of owned variables per connection
    pub max_owned_per_connection: usize,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Max concurrent client connections, each served on its own thread
    pub max_connections: usize,

    /// Connection read timeout (milliseconds, 0 = none)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds, 0 = none)
    pub write_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_vars: 1000,
            max_var_bytes: 64 * 1024 * 1024, // 64 MB
            max_owned_per_connection: 50,
            listen_addr: "127.0.0.1:2812".to_string(),
            max_connections: 1024,
            read_timeout_ms: 0,
            write_timeout_ms: 0,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check that the limits describe a usable server
    pub fn validate(&self) -> Result<()> {
        if self.max_vars == 0 {
            return Err(VarError::Config("max_vars must be greater than zero".into()));
        }
        if self.max_var_bytes < 4 {
            return Err(VarError::Config(format!(
                "max_var_bytes too small: {} (min 4)",
                self.max_var_bytes
            )));
        }
        if self.max_connections == 0 {
            return Err(VarError::Config(
                "max_connections must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the slot cap
    pub fn max_vars(mut self, count: usize) -> Self {
        self.config.max_vars = count;
        self
    }

    /// Set the byte cap (in bytes)
    pub fn max_var_bytes(mut self, bytes: usize) -> Self {
        self.config.max_var_bytes = bytes;
        self
    }

    /// Set the per-connection owned-variable cap
    pub fn max_owned_per_connection(mut self, count: usize) -> Self {
        self.config.max_owned_per_connection = count;
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
