// Copyright (C) 2020 Matthew Waters <matthew@centricular.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # stun-agent
//!
//! Transaction tracking for STUN requests and responses on top of
//! [`stun_wire`].  The [`Agent`](agent::Agent) matches decoded responses to
//! in-flight requests by transaction ID, times out stale transactions on
//! demand, and delivers exactly one terminal event per transaction to a
//! user-provided handler.  It owns no sockets and no timers; retransmission
//! scheduling belongs to the caller.

pub mod agent;

pub use agent::{Agent, AgentError, Event, Handler};

// reexport stun_wire
pub use stun_wire as wire;
