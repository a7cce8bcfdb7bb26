// Copyright (C) 2020 Matthew Waters <matthew@centricular.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # stun-wire
//!
//! An implementation of parsing and writing STUN messages and attributes with no
//! allocation on the encode hot path: a [`Message`](message::Message) owns one growable
//! buffer, attributes append in place, and decoded attribute values alias that buffer.
//!
//! This is based on the following standards:
//! - [RFC8489]
//! - [RFC5389]
//!
//! [RFC8489]: https://tools.ietf.org/html/rfc8489
//! [RFC5389]: https://tools.ietf.org/html/rfc5389
//!
//! ## Examples
//!
//! See the [`message`] and [`attribute`] module documentation for examples on use.

pub mod attribute;
mod hmac_pool;
pub mod message;

pub use attribute::AttributeType;
pub use message::{Message, MessageClass, MessageType, StunError, TransactionId};

pub mod prelude {
    pub use crate::attribute::{Checker, Getter, Setter};
}
