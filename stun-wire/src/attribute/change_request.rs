// Copyright (C) 2020 Matthew Waters <matthew@centricular.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use byteorder::{BigEndian, ByteOrder};

use crate::message::{Message, StunError};

use super::{get_sized, AttributeType, Getter, Setter};

/// The CHANGE-REQUEST attribute of NAT behaviour discovery (RFC 5780), a 32-bit flag
/// word asking the server to reply from a different IP address and/or port.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeRequest {
    change_ip: bool,
    change_port: bool,
}

impl ChangeRequest {
    pub const TYPE: AttributeType = AttributeType::new(0x0003);

    const CHANGE_IP: u32 = 0x4;
    const CHANGE_PORT: u32 = 0x2;

    /// Create a new ChangeRequest attribute.
    ///
    /// # Examples
    ///
    /// ```
    /// # use stun_wire::attribute::ChangeRequest;
    /// let change = ChangeRequest::new(true, false);
    /// assert!(change.change_ip());
    /// assert!(!change.change_port());
    /// ```
    pub fn new(change_ip: bool, change_port: bool) -> Self {
        Self {
            change_ip,
            change_port,
        }
    }

    /// Whether the server is asked to reply from a different IP address.
    pub fn change_ip(&self) -> bool {
        self.change_ip
    }

    /// Whether the server is asked to reply from a different port.
    pub fn change_port(&self) -> bool {
        self.change_port
    }
}

impl Setter for ChangeRequest {
    fn add_to(&self, msg: &mut Message) -> Result<(), StunError> {
        let mut flags = 0;
        if self.change_ip {
            flags |= Self::CHANGE_IP;
        }
        if self.change_port {
            flags |= Self::CHANGE_PORT;
        }
        let mut buf = [0; 4];
        BigEndian::write_u32(&mut buf, flags);
        msg.add(Self::TYPE, &buf)
    }
}

impl Getter for ChangeRequest {
    fn get_from(&mut self, msg: &Message) -> Result<(), StunError> {
        let flags = BigEndian::read_u32(get_sized(msg, Self::TYPE, 4)?);
        self.change_ip = flags & Self::CHANGE_IP != 0;
        self.change_port = flags & Self::CHANGE_PORT != 0;
        Ok(())
    }
}

impl std::fmt::Display for ChangeRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: ip={} port={}",
            Self::TYPE,
            self.change_ip,
            self.change_port
        )
    }
}
