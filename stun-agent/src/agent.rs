// Copyright (C) 2020 Matthew Waters <matthew@centricular.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! STUN transaction agent
//!
//! The [`Agent`] tracks in-flight STUN transactions: it maps 96-bit transaction IDs to
//! deadlines and delivers exactly one terminal [`Event`] per started transaction to a
//! user-provided handler, whichever of [`process`](Agent::process),
//! [`stop`](Agent::stop) or [`collect`](Agent::collect) fires first.
//!
//! The agent owns no timers and performs no IO.  An external driver feeds it decoded
//! messages and periodically calls [`collect`](Agent::collect) with a garbage collection
//! deadline to time out stale transactions.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::time::{Duration, Instant};
//! use stun_agent::agent::{Agent, Event};
//! use stun_agent::wire::Message;
//!
//! let delivered = Arc::new(AtomicUsize::new(0));
//! let counter = delivered.clone();
//! let agent = Agent::new(Some(Arc::new(move |event: Event| {
//!     assert!(event.result.is_ok());
//!     counter.fetch_add(1, Ordering::SeqCst);
//! })));
//!
//! let mut msg = Message::new();
//! let id = msg.new_transaction_id();
//! msg.write_header();
//!
//! agent.start(id, Instant::now() + Duration::from_secs(5)).unwrap();
//! agent.process(&msg).unwrap();
//! assert_eq!(delivered.load(Ordering::SeqCst), 1);
//!
//! // a transaction completes exactly once; a late duplicate is ignored
//! agent.process(&msg).unwrap();
//! assert_eq!(delivered.load(Ordering::SeqCst), 1);
//! agent.close().unwrap();
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use tracing::{debug, trace};

use stun_wire::message::{Message, TransactionId};

/// Transactions collected in one typical [`Agent::collect`] tick fit this preallocation;
/// larger batches spill into a normal reallocation.
pub const AGENT_COLLECT_CAP: usize = 100;

/// Errors produced by [`Agent`] operations.  [`AgentError::TransactionStopped`] and
/// [`AgentError::TransactionTimedOut`] also appear as the error payload of an [`Event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AgentError {
    /// The agent has been closed.
    #[error("agent is closed")]
    Closed,
    /// A transaction with this ID has already been started.
    #[error("transaction already exists")]
    TransactionExists,
    /// No transaction with this ID is registered.
    #[error("transaction does not exist")]
    TransactionNotExists,
    /// The transaction was stopped by the caller before completing.
    #[error("transaction was stopped")]
    TransactionStopped,
    /// The transaction passed its deadline before a response arrived.
    #[error("transaction timed out")]
    TransactionTimedOut,
}

/// The terminal outcome of a transaction, delivered once to the handler.
///
/// The message reference of a successful event aliases the message passed to
/// [`Agent::process`] and is only valid for the duration of the handler call; handlers
/// that keep it must clone.
#[derive(Debug, Clone)]
pub struct Event<'a> {
    /// The transaction this event concludes.
    pub transaction_id: TransactionId,
    /// The matched response, or why the transaction ended without one.
    pub result: Result<&'a Message, AgentError>,
}

/// The callback receiving transaction [`Event`]s.
///
/// Handlers are invoked synchronously from whichever operation concluded the transaction,
/// after the agent lock has been released.  A handler must not call back into the same
/// agent from the invoking thread; dispatch to a queue instead.
pub type Handler = Arc<dyn Fn(Event<'_>) + Send + Sync>;

struct Entry {
    deadline: Instant,
    handler: Option<Handler>,
}

struct Inner {
    closed: bool,
    handler: Option<Handler>,
    transactions: HashMap<TransactionId, Entry>,
}

/// A thread-safe registry of in-flight STUN transactions.
///
/// All operations may be called concurrently from any thread; one internal mutex covers
/// the open flag, the handler and the transaction map.  Handler invocations happen
/// outside that lock.
pub struct Agent {
    inner: Mutex<Inner>,
}

impl Agent {
    /// Create a new [`Agent`] delivering events to `handler`.
    ///
    /// With no handler the agent still tracks transactions; completions are simply not
    /// observable.
    pub fn new(handler: Option<Handler>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                closed: false,
                handler,
                transactions: HashMap::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // handlers run outside the lock, so a panicking handler cannot poison it
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register transaction `id` with the given deadline, to be delivered to the agent
    /// handler.
    ///
    /// # Errors
    ///
    /// - [`AgentError::Closed`] after [`close`](Agent::close).
    /// - [`AgentError::TransactionExists`] if the ID is already registered.
    pub fn start(&self, id: TransactionId, deadline: Instant) -> Result<(), AgentError> {
        self.start_with_handler(id, deadline, None)
    }

    /// Register transaction `id` with a per-transaction handler overriding the agent
    /// handler.  Passing no handler inherits the agent handler.
    pub fn start_with_handler(
        &self,
        id: TransactionId,
        deadline: Instant,
        handler: Option<Handler>,
    ) -> Result<(), AgentError> {
        let mut inner = self.lock();
        if inner.closed {
            return Err(AgentError::Closed);
        }
        if inner.transactions.contains_key(&id) {
            return Err(AgentError::TransactionExists);
        }
        trace!("starting transaction {}", id);
        inner.transactions.insert(id, Entry { deadline, handler });
        Ok(())
    }

    /// Complete the transaction matching the message's transaction ID, delivering
    /// `Event { id, Ok(message) }` to its handler.  A message matching no registered
    /// transaction is a stray or late response and is ignored.
    ///
    /// # Errors
    ///
    /// - [`AgentError::Closed`] after [`close`](Agent::close).
    pub fn process(&self, message: &Message) -> Result<(), AgentError> {
        let id = message.transaction_id();
        let handler = {
            let mut inner = self.lock();
            if inner.closed {
                return Err(AgentError::Closed);
            }
            match inner.transactions.remove(&id) {
                Some(entry) => entry.handler.or_else(|| inner.handler.clone()),
                None => {
                    trace!("no transaction {}, dropping", id);
                    return Ok(());
                }
            }
        };
        if let Some(handler) = handler {
            handler(Event {
                transaction_id: id,
                result: Ok(message),
            });
        }
        Ok(())
    }

    /// Remove transaction `id`, delivering `Event { id, Err(TransactionStopped) }` to its
    /// handler.
    ///
    /// # Errors
    ///
    /// - [`AgentError::Closed`] after [`close`](Agent::close).
    /// - [`AgentError::TransactionNotExists`] if no such transaction is registered.
    pub fn stop(&self, id: TransactionId) -> Result<(), AgentError> {
        let handler = {
            let mut inner = self.lock();
            if inner.closed {
                return Err(AgentError::Closed);
            }
            let entry = inner
                .transactions
                .remove(&id)
                .ok_or(AgentError::TransactionNotExists)?;
            entry.handler.or_else(|| inner.handler.clone())
        };
        if let Some(handler) = handler {
            handler(Event {
                transaction_id: id,
                result: Err(AgentError::TransactionStopped),
            });
        }
        Ok(())
    }

    /// Time out every transaction whose deadline is at or before `gc_deadline`,
    /// delivering `Event { id, Err(TransactionTimedOut) }` once per removed transaction
    /// in unspecified order.
    ///
    /// Timed out entries are drained under the lock and dispatched after it is released,
    /// so handlers never run with the agent locked.
    ///
    /// # Errors
    ///
    /// - [`AgentError::Closed`] after [`close`](Agent::close).
    pub fn collect(&self, gc_deadline: Instant) -> Result<(), AgentError> {
        let mut timed_out: Vec<(TransactionId, Option<Handler>)> =
            Vec::with_capacity(AGENT_COLLECT_CAP);
        let default_handler = {
            let mut inner = self.lock();
            if inner.closed {
                return Err(AgentError::Closed);
            }
            inner.transactions.retain(|id, entry| {
                if entry.deadline <= gc_deadline {
                    timed_out.push((*id, entry.handler.take()));
                    false
                } else {
                    true
                }
            });
            inner.handler.clone()
        };
        if !timed_out.is_empty() {
            debug!("collected {} timed out transactions", timed_out.len());
        }
        for (id, handler) in timed_out {
            if let Some(handler) = handler.or_else(|| default_handler.clone()) {
                handler(Event {
                    transaction_id: id,
                    result: Err(AgentError::TransactionTimedOut),
                });
            }
        }
        Ok(())
    }

    /// Replace the agent handler for all subsequently concluded transactions.
    ///
    /// # Errors
    ///
    /// - [`AgentError::Closed`] after [`close`](Agent::close).
    pub fn set_handler(&self, handler: Option<Handler>) -> Result<(), AgentError> {
        let mut inner = self.lock();
        if inner.closed {
            return Err(AgentError::Closed);
        }
        inner.handler = handler;
        Ok(())
    }

    /// Close the agent.  Outstanding transactions are discarded without handler
    /// notification, and every subsequent mutating operation fails with
    /// [`AgentError::Closed`], including a second close.
    pub fn close(&self) -> Result<(), AgentError> {
        let mut inner = self.lock();
        if inner.closed {
            return Err(AgentError::Closed);
        }
        debug!(
            "closing agent with {} outstanding transactions",
            inner.transactions.len()
        );
        inner.transactions.clear();
        inner.handler = None;
        inner.closed = true;
        Ok(())
    }
}

impl Default for Agent {
    fn default() -> Self {
        Self::new(None)
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("Agent")
            .field("closed", &inner.closed)
            .field("transactions", &inner.transactions.len())
            .finish_non_exhaustive()
    }
}
