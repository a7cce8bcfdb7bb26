// Copyright (C) 2020 Matthew Waters <matthew@centricular.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use hmac::digest::{CtOutput, Output};
use hmac::Mac;

use tracing::debug;

use crate::hmac_pool::{
    acquire_sha1, acquire_sha256, put_sha1, put_sha256, HmacSha1, HmacSha256, SHA1_SIZE,
    SHA256_SIZE,
};
use crate::message::{Message, StunError, HEADER_LENGTH};

use super::{AttributeType, Checker, Fingerprint, Setter};

/// Derive the long-term credential key: MD5 of `username ":" realm ":" password`.
fn long_term_key(username: &str, realm: &str, password: &str) -> Vec<u8> {
    use md5::{Digest, Md5};
    let mut digest = Md5::new();
    digest.update(username.as_bytes());
    digest.update(b":");
    digest.update(realm.as_bytes());
    digest.update(b":");
    digest.update(password.as_bytes());
    digest.finalize().to_vec()
}

/// The HMAC covers the message up to the integrity attribute, but with the header length
/// field counting the integrity TLV as well.  The encode path writes that length before
/// appending; the verify path feeds the adjusted length bytes as a separate MAC chunk so
/// the message is never mutated.
fn covered_length(tlv_start: usize, tlv_size: usize) -> [u8; 2] {
    ((tlv_start + tlv_size - HEADER_LENGTH) as u16).to_be_bytes()
}

/// The MESSAGE-INTEGRITY attribute: an HMAC-SHA1 over the message, keyed from the
/// short-term or long-term credential mechanism.
///
/// Adding computes the HMAC over everything already in the message, so it must run after
/// every attribute it is meant to cover; only FINGERPRINT may follow.
///
/// # Examples
///
/// ```
/// use stun_wire::message::{Message, MessageClass, MessageType, TransactionId, BINDING};
/// use stun_wire::attribute::{MessageIntegrity, Software};
/// use stun_wire::prelude::*;
///
/// let integrity = MessageIntegrity::new_short_term("password");
/// let mut msg = Message::new();
/// msg.build(&[
///     &MessageType::from_class_method(MessageClass::Request, BINDING),
///     &TransactionId::generate(),
///     &Software::new("stun-wire").unwrap(),
///     &integrity,
/// ]).unwrap();
///
/// let decoded = Message::from_raw(msg.raw()).unwrap();
/// decoded.check(&[&integrity]).unwrap();
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct MessageIntegrity {
    key: Vec<u8>,
}

impl MessageIntegrity {
    pub const TYPE: AttributeType = AttributeType::new(0x0008);

    /// Create a [`MessageIntegrity`] from a raw HMAC key.
    pub fn new(key: Vec<u8>) -> Self {
        Self { key }
    }

    /// Create a [`MessageIntegrity`] keyed with the short-term credential mechanism:
    /// the key is the password itself.
    pub fn new_short_term(password: &str) -> Self {
        Self {
            key: password.as_bytes().to_vec(),
        }
    }

    /// Create a [`MessageIntegrity`] keyed with the long-term credential mechanism:
    /// the key is MD5 of `username ":" realm ":" password`.
    pub fn new_long_term(username: &str, realm: &str, password: &str) -> Self {
        Self {
            key: long_term_key(username, realm, password),
        }
    }

    /// The HMAC key in use.
    pub fn key(&self) -> &[u8] {
        &self.key
    }
}

// The key is credential material and stays out of logs.
impl std::fmt::Debug for MessageIntegrity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageIntegrity").finish_non_exhaustive()
    }
}

impl Setter for MessageIntegrity {
    fn add_to(&self, msg: &mut Message) -> Result<(), StunError> {
        if msg.contains(Fingerprint::TYPE) {
            return Err(StunError::IntegrityAfterFingerprint);
        }
        msg.write_header();
        let prefix = msg.raw().len();
        // length must count the integrity TLV about to be appended; add() corrects it
        msg.put_length((prefix + 4 + SHA1_SIZE - HEADER_LENGTH) as u16);
        let mut mac = acquire_sha1(&self.key);
        mac.update(&msg.raw()[..prefix]);
        let tag = mac.finalize_reset();
        put_sha1(mac);
        msg.add(Self::TYPE, &tag.into_bytes())
    }
}

impl Checker for MessageIntegrity {
    fn check(&self, msg: &Message) -> Result<(), StunError> {
        let attr = msg
            .attributes()
            .first(Self::TYPE)
            .ok_or(StunError::AttributeNotFound(Self::TYPE))?;
        if attr.length() as usize != SHA1_SIZE {
            return Err(StunError::AttributeSizeInvalid {
                attr: Self::TYPE,
                size: attr.length() as usize,
            });
        }
        let tlv_start = attr.value_offset() - 4;
        let mut mac = acquire_sha1(&self.key);
        mac.update(&msg.raw()[..2]);
        mac.update(&covered_length(tlv_start, 4 + SHA1_SIZE));
        mac.update(&msg.raw()[4..tlv_start]);
        let tag = mac.finalize_reset();
        put_sha1(mac);
        let expected = Output::<HmacSha1>::clone_from_slice(msg.attribute_value(attr));
        if tag != CtOutput::new(expected) {
            debug!("hmac-sha1 integrity check failed");
            return Err(StunError::IntegrityMismatch);
        }
        Ok(())
    }
}

/// The MESSAGE-INTEGRITY-SHA256 attribute of RFC 8489.  Same protocol as
/// [`MessageIntegrity`] with a 32-byte HMAC-SHA256 tag.
#[derive(Clone, PartialEq, Eq)]
pub struct MessageIntegritySha256 {
    key: Vec<u8>,
}

impl MessageIntegritySha256 {
    pub const TYPE: AttributeType = AttributeType::new(0x001C);

    /// Create a [`MessageIntegritySha256`] from a raw HMAC key.
    pub fn new(key: Vec<u8>) -> Self {
        Self { key }
    }

    /// Create a [`MessageIntegritySha256`] keyed with the short-term credential
    /// mechanism.
    pub fn new_short_term(password: &str) -> Self {
        Self {
            key: password.as_bytes().to_vec(),
        }
    }

    /// Create a [`MessageIntegritySha256`] keyed with the long-term credential
    /// mechanism.
    pub fn new_long_term(username: &str, realm: &str, password: &str) -> Self {
        Self {
            key: long_term_key(username, realm, password),
        }
    }

    /// The HMAC key in use.
    pub fn key(&self) -> &[u8] {
        &self.key
    }
}

impl std::fmt::Debug for MessageIntegritySha256 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageIntegritySha256").finish_non_exhaustive()
    }
}

impl Setter for MessageIntegritySha256 {
    fn add_to(&self, msg: &mut Message) -> Result<(), StunError> {
        if msg.contains(Fingerprint::TYPE) {
            return Err(StunError::IntegrityAfterFingerprint);
        }
        msg.write_header();
        let prefix = msg.raw().len();
        msg.put_length((prefix + 4 + SHA256_SIZE - HEADER_LENGTH) as u16);
        let mut mac = acquire_sha256(&self.key);
        mac.update(&msg.raw()[..prefix]);
        let tag = mac.finalize_reset();
        put_sha256(mac);
        msg.add(Self::TYPE, &tag.into_bytes())
    }
}

impl Checker for MessageIntegritySha256 {
    fn check(&self, msg: &Message) -> Result<(), StunError> {
        let attr = msg
            .attributes()
            .first(Self::TYPE)
            .ok_or(StunError::AttributeNotFound(Self::TYPE))?;
        if attr.length() as usize != SHA256_SIZE {
            return Err(StunError::AttributeSizeInvalid {
                attr: Self::TYPE,
                size: attr.length() as usize,
            });
        }
        let tlv_start = attr.value_offset() - 4;
        let mut mac = acquire_sha256(&self.key);
        mac.update(&msg.raw()[..2]);
        mac.update(&covered_length(tlv_start, 4 + SHA256_SIZE));
        mac.update(&msg.raw()[4..tlv_start]);
        let tag = mac.finalize_reset();
        put_sha256(mac);
        let expected = Output::<HmacSha256>::clone_from_slice(msg.attribute_value(attr));
        if tag != CtOutput::new(expected) {
            debug!("hmac-sha256 integrity check failed");
            return Err(StunError::IntegrityMismatch);
        }
        Ok(())
    }
}
