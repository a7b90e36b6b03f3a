//! Dispatcher Module
//!
//! Decodes requests and runs them against the store.
//!
//! ## Responsibilities
//! - Decode one of the six operations (malformed input never reaches the store)
//! - Invoke the matching store operation as one critical section
//! - Map every outcome to exactly one response
//!
//! The store snapshots whatever a response needs (values, names, previews)
//! while it holds its lock; byte encoding happens after release.

use std::sync::Arc;

use crate::error::Result;
use crate::protocol::{decode_request, encode_response, Request, Response};
use crate::store::{Caller, VarStore};

/// Stateless request dispatcher
pub struct Dispatcher {
    store: Arc<VarStore>,
}

impl Dispatcher {
    pub fn new(store: Arc<VarStore>) -> Self {
        Self { store }
    }

    /// The store requests are dispatched to
    pub fn store(&self) -> &Arc<VarStore> {
        &self.store
    }

    /// Handle one raw request and return the response bytes
    pub fn handle_request(&self, caller: Caller<'_>, raw: &[u8]) -> Vec<u8> {
        let response = match decode_request(raw) {
            Ok(request) => self.execute(caller, request),
            Err(e) => {
                tracing::debug!(conn = %caller.conn, "rejected request: {}", e);
                Response::Status(e.status())
            }
        };
        encode_response(&response)
    }

    /// Execute a decoded request
    pub fn execute(&self, caller: Caller<'_>, request: Request) -> Response {
        tracing::trace!(conn = %caller.conn, ?request, "executing request");

        match self.try_execute(caller, request) {
            Ok(response) => response,
            Err(e) => {
                tracing::trace!(conn = %caller.conn, "request failed: {}", e);
                Response::Status(e.status())
            }
        }
    }

    fn try_execute(&self, caller: Caller<'_>, request: Request) -> Result<Response> {
        let store = &self.store;

        match request {
            Request::Set {
                group,
                name,
                value,
                flags,
                return_previous,
            } => {
                let outcome = store.set(caller, &group, &name, value, flags, return_previous)?;
                Ok(match (return_previous, outcome.previous) {
                    (false, _) => Response::ok(),
                    (true, Some(previous)) => Response::Value(previous),
                    (true, None) => Response::NoPrevious,
                })
            }
            Request::Get { group, name } => store.get(caller.conn, &group, &name).map(Response::Value),
            Request::Increment {
                group,
                name,
                flags,
                return_previous,
            } => store
                .increment(caller, &group, &name, flags, return_previous)
                .map(Response::Value),
            Request::Decrement {
                group,
                name,
                flags,
                return_previous,
            } => store
                .decrement(caller, &group, &name, flags, return_previous)
                .map(Response::Value),
            Request::Delete {
                group,
                name: Some(name),
            } => {
                store.delete(&group, &name)?;
                Ok(Response::ok())
            }
            Request::Delete { group, name: None } => {
                store.delete_group(&group)?;
                Ok(Response::ok())
            }
            Request::List { group: None, .. } => Ok(Response::Groups(store.list_groups())),
            Request::List {
                group: Some(group),
                max_value_len: None,
            } => store.list_names(&group).map(Response::Names),
            Request::List {
                group: Some(group),
                max_value_len: Some(len),
            } => store
                .list_values(caller.conn, &group, usize::from(len))
                .map(Response::Values),
        }
    }
}
