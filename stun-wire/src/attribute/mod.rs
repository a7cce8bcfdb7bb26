// Copyright (C) 2020 Matthew Waters <matthew@centricular.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! STUN Attributes
//!
//! Typed codecs for the attributes of a STUN [`Message`](crate::message::Message).
//! Every attribute implements some of three capabilities with identical shapes:
//!
//!  - [`Setter`]: serialise the attribute and append it to a message,
//!  - [`Getter`]: locate the first attribute of its type and parse it into `self`,
//!  - [`Checker`]: locate and validate without producing a value.
//!
//! [`Message::build`](crate::message::Message::build),
//! [`Message::parse`](crate::message::Message::parse) and
//! [`Message::check`](crate::message::Message::check) fan a message through slices of
//! these capabilities, so assembling a message is a single declarative call.
//!
//! # Examples
//!
//! ```
//! use stun_wire::message::{Message, MessageClass, MessageType, TransactionId, BINDING};
//! use stun_wire::attribute::{Software, Fingerprint};
//! use stun_wire::prelude::*;
//!
//! let mut msg = Message::new();
//! msg.build(&[
//!     &MessageType::from_class_method(MessageClass::Request, BINDING),
//!     &TransactionId::generate(),
//!     &Software::new("stun-wire").unwrap(),
//!     &Fingerprint,
//! ]).unwrap();
//!
//! let decoded = Message::from_raw(msg.raw()).unwrap();
//! decoded.check(&[&Fingerprint]).unwrap();
//! ```

mod address;
pub use address::{AlternateServer, MappedAddress};
mod change_request;
pub use change_request::ChangeRequest;
mod error;
pub use error::{ErrorCode, UnknownAttributes};
mod fingerprint;
pub use fingerprint::Fingerprint;
mod ice;
pub use ice::{IceControlled, IceControlling, Priority, UseCandidate};
mod integrity;
pub use integrity::{MessageIntegrity, MessageIntegritySha256};
mod nonce;
pub use nonce::Nonce;
mod realm;
pub use realm::Realm;
mod software;
pub use software::Software;
mod user;
pub use user::Username;
mod xor_addr;
pub use xor_addr::XorMappedAddress;

use crate::message::{Message, StunError};

/// The type of an attribute in a STUN [`Message`](crate::message::Message).
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct AttributeType(u16);

impl std::fmt::Display for AttributeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({:#x}: {})", self.0, self.0, self.name())
    }
}

impl AttributeType {
    /// Create a new AttributeType from an existing value
    ///
    /// # Examples
    /// ```
    /// # use stun_wire::attribute::AttributeType;
    /// assert_eq!(AttributeType::new(0x123).value(), 0x123);
    /// ```
    pub const fn new(val: u16) -> Self {
        Self(val)
    }

    /// Return the integer value of this AttributeType
    pub fn value(&self) -> u16 {
        self.0
    }

    /// Returns a human readable name of this `AttributeType` or "unknown"
    ///
    /// # Examples
    /// ```
    /// # use stun_wire::attribute::*;
    /// assert_eq!(XorMappedAddress::TYPE.name(), "XOR-MAPPED-ADDRESS");
    /// ```
    pub fn name(self) -> &'static str {
        match self {
            MappedAddress::TYPE => "MAPPED-ADDRESS",
            ChangeRequest::TYPE => "CHANGE-REQUEST",
            Username::TYPE => "USERNAME",
            MessageIntegrity::TYPE => "MESSAGE-INTEGRITY",
            ErrorCode::TYPE => "ERROR-CODE",
            UnknownAttributes::TYPE => "UNKNOWN-ATTRIBUTES",
            Realm::TYPE => "REALM",
            Nonce::TYPE => "NONCE",
            MessageIntegritySha256::TYPE => "MESSAGE-INTEGRITY-SHA256",
            XorMappedAddress::TYPE => "XOR-MAPPED-ADDRESS",
            Priority::TYPE => "PRIORITY",
            UseCandidate::TYPE => "USE-CANDIDATE",
            Software::TYPE => "SOFTWARE",
            AlternateServer::TYPE => "ALTERNATE-SERVER",
            Fingerprint::TYPE => "FINGERPRINT",
            IceControlled::TYPE => "ICE-CONTROLLED",
            IceControlling::TYPE => "ICE-CONTROLLING",
            _ => "unknown",
        }
    }

    /// Check if comprehension is required for an `AttributeType`.  All integer attribute
    /// values < 0x8000 require comprehension.
    ///
    /// # Examples
    ///
    /// ```
    /// # use stun_wire::attribute::AttributeType;
    /// assert_eq!(AttributeType::new(0x0).comprehension_required(), true);
    /// assert_eq!(AttributeType::new(0x8000).comprehension_required(), false);
    /// ```
    pub fn comprehension_required(self) -> bool {
        self.0 < 0x8000
    }
}

impl From<u16> for AttributeType {
    fn from(f: u16) -> Self {
        Self::new(f)
    }
}

impl From<AttributeType> for u16 {
    fn from(f: AttributeType) -> Self {
        f.0
    }
}

/// Serialise an attribute and append it to a message.
pub trait Setter {
    /// Append this attribute to `msg`, updating the header length field.
    fn add_to(&self, msg: &mut Message) -> Result<(), StunError>;
}

/// Parse an attribute out of a message into `self`.
pub trait Getter {
    /// Find the first attribute of this type in `msg` and parse it into `self`.
    ///
    /// Returns [`StunError::AttributeNotFound`] when the message does not carry the
    /// attribute.
    fn get_from(&mut self, msg: &Message) -> Result<(), StunError>;
}

/// Validate an attribute of a message without producing a value.
pub trait Checker {
    /// Find the first attribute of this type in `msg` and validate it.
    fn check(&self, msg: &Message) -> Result<(), StunError>;
}

/// Append a UTF-8 text attribute, enforcing the per-attribute size limit.
pub(crate) fn add_text(
    msg: &mut Message,
    atype: AttributeType,
    text: &str,
    max: usize,
) -> Result<(), StunError> {
    check_text(atype, text, max)?;
    msg.add(atype, text.as_bytes())
}

/// Check a UTF-8 text value against the per-attribute size limit.
pub(crate) fn check_text(atype: AttributeType, text: &str, max: usize) -> Result<(), StunError> {
    if text.len() > max {
        return Err(StunError::AttributeSizeOverflow {
            attr: atype,
            size: text.len(),
            max,
        });
    }
    Ok(())
}

/// Fetch a UTF-8 text attribute, enforcing the per-attribute size limit.
pub(crate) fn get_text(
    msg: &Message,
    atype: AttributeType,
    max: usize,
) -> Result<String, StunError> {
    let value = msg.get(atype)?;
    if value.len() > max {
        return Err(StunError::AttributeSizeOverflow {
            attr: atype,
            size: value.len(),
            max,
        });
    }
    std::str::from_utf8(value)
        .map(str::to_owned)
        .map_err(|_| StunError::BadFormat("attribute is not valid utf-8"))
}

/// Fetch a fixed-size attribute value.
pub(crate) fn get_sized<'a>(
    msg: &'a Message,
    atype: AttributeType,
    size: usize,
) -> Result<&'a [u8], StunError> {
    let value = msg.get(atype)?;
    if value.len() != size {
        return Err(StunError::AttributeSizeInvalid {
            attr: atype,
            size: value.len(),
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_type() {
        crate::tests::test_init_log();
        let atype = ErrorCode::TYPE;
        let anum: u16 = atype.into();
        assert_eq!(atype, anum.into());
        assert!(Username::TYPE.comprehension_required());
        assert!(!Software::TYPE.comprehension_required());
    }
}
