//! # sharedvars
//!
//! A shared-variable server: many connected clients publish, read,
//! increment and delete named, typed values organized into groups.
//! - Typed variables (Logical, Numeric, String, Array) in named groups
//! - Owned variables, released automatically when their connection closes
//! - Global quotas on variable slots and payload bytes
//! - One global lock: every operation is a single critical section
//! - Compact binary request/response protocol over TCP
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │        (Acceptor + worker per connection, own cache)         │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                     Dispatcher                               │
//! │          (decode SET/GET/INC/DEC/DEL/LIST → store)           │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                 VarStore (one Mutex)                         │
//! │   Group table · Slot arrays · Quotas · Ownership indices     │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ invalidate on delete
//!                       ▼
//!                ┌─────────────┐
//!                │ WorkerCache │
//!                │ (per worker)│
//!                └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod cache;
pub mod store;
pub mod protocol;
pub mod dispatcher;
pub mod network;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{VarError, Result};
pub use config::Config;
pub use cache::WorkerCache;
pub use dispatcher::Dispatcher;
pub use store::{Caller, ConnId, Value, VarFlags, VarStore, VarType};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of sharedvars
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
