// Copyright (C) 2020 Matthew Waters <matthew@centricular.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crc::{Crc, CRC_32_ISO_HDLC};

use tracing::debug;

use crate::message::{Message, StunError, HEADER_LENGTH};

use super::{AttributeType, Checker, Setter};

const CRC_ALGO: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// The FINGERPRINT attribute: CRC-32 of the message XORed with `0x5354554e` ("STUN"),
/// used to distinguish STUN from other protocols multiplexed on one socket.
///
/// Must be the last attribute of a message; it covers everything before it with the
/// header length field counting the fingerprint TLV itself.
///
/// # Examples
///
/// ```
/// use stun_wire::message::{Message, MessageClass, MessageType, TransactionId, BINDING};
/// use stun_wire::attribute::Fingerprint;
/// use stun_wire::prelude::*;
///
/// let mut msg = Message::new();
/// msg.build(&[
///     &MessageType::from_class_method(MessageClass::Request, BINDING),
///     &TransactionId::generate(),
///     &Fingerprint,
/// ]).unwrap();
///
/// let decoded = Message::from_raw(msg.raw()).unwrap();
/// decoded.check(&[&Fingerprint]).unwrap();
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Fingerprint;

impl Fingerprint {
    pub const TYPE: AttributeType = AttributeType::new(0x8028);

    const XOR_CONSTANT: u32 = 0x5354554e;
    const SIZE: usize = 4;
}

impl Setter for Fingerprint {
    fn add_to(&self, msg: &mut Message) -> Result<(), StunError> {
        msg.write_header();
        let prefix = msg.raw().len();
        // length must count the fingerprint TLV about to be appended; add() corrects it
        msg.put_length((prefix + 4 + Self::SIZE - HEADER_LENGTH) as u16);
        let crc = CRC_ALGO.checksum(&msg.raw()[..prefix]) ^ Self::XOR_CONSTANT;
        msg.add(Self::TYPE, &crc.to_be_bytes())
    }
}

impl Checker for Fingerprint {
    fn check(&self, msg: &Message) -> Result<(), StunError> {
        let attr = msg
            .attributes()
            .first(Self::TYPE)
            .ok_or(StunError::AttributeNotFound(Self::TYPE))?;
        if attr.length() as usize != Self::SIZE {
            return Err(StunError::AttributeSizeInvalid {
                attr: Self::TYPE,
                size: attr.length() as usize,
            });
        }
        let tlv_start = attr.value_offset() - 4;
        let covered = ((tlv_start + 4 + Self::SIZE - HEADER_LENGTH) as u16).to_be_bytes();
        let mut digest = CRC_ALGO.digest();
        digest.update(&msg.raw()[..2]);
        digest.update(&covered);
        digest.update(&msg.raw()[4..tlv_start]);
        let crc = digest.finalize() ^ Self::XOR_CONSTANT;
        if crc.to_be_bytes() != msg.attribute_value(attr) {
            debug!("fingerprint check failed");
            return Err(StunError::FingerprintMismatch);
        }
        Ok(())
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", Self::TYPE)
    }
}
