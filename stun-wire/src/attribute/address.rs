// Copyright (C) 2020 Matthew Waters <matthew@centricular.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use byteorder::{BigEndian, ByteOrder};

use crate::message::{Message, StunError};

use super::{AttributeType, Getter, Setter};

const FAMILY_IPV4: u8 = 0x1;
const FAMILY_IPV6: u8 = 0x2;

/// Encode a socket address into the MAPPED-ADDRESS wire shape: a reserved byte, the
/// address family, the port and the 4 or 16 address bytes.  Returns the buffer and the
/// number of bytes used.
pub(crate) fn encode_addr(addr: SocketAddr) -> ([u8; 20], usize) {
    let mut buf = [0; 20];
    BigEndian::write_u16(&mut buf[2..4], addr.port());
    match addr.ip() {
        IpAddr::V4(ip) => {
            buf[1] = FAMILY_IPV4;
            BigEndian::write_u32(&mut buf[4..8], u32::from(ip));
            (buf, 8)
        }
        IpAddr::V6(ip) => {
            buf[1] = FAMILY_IPV6;
            buf[4..20].copy_from_slice(&ip.octets());
            (buf, 20)
        }
    }
}

/// Decode the MAPPED-ADDRESS wire shape out of the first attribute of `atype`.
pub(crate) fn decode_addr(msg: &Message, atype: AttributeType) -> Result<SocketAddr, StunError> {
    let value = msg.get(atype)?;
    if value.len() < 4 {
        return Err(StunError::AttributeSizeInvalid {
            attr: atype,
            size: value.len(),
        });
    }
    let port = BigEndian::read_u16(&value[2..4]);
    let ip = match value[1] {
        FAMILY_IPV4 => {
            if value.len() != 8 {
                return Err(StunError::AttributeSizeInvalid {
                    attr: atype,
                    size: value.len(),
                });
            }
            IpAddr::V4(Ipv4Addr::from(BigEndian::read_u32(&value[4..8])))
        }
        FAMILY_IPV6 => {
            if value.len() != 20 {
                return Err(StunError::AttributeSizeInvalid {
                    attr: atype,
                    size: value.len(),
                });
            }
            let mut octets = [0; 16];
            octets.copy_from_slice(&value[4..20]);
            IpAddr::V6(Ipv6Addr::from(octets))
        }
        _ => return Err(StunError::BadFormat("unknown address family")),
    };
    Ok(SocketAddr::new(ip, port))
}

pub(crate) fn unspecified_addr() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0)
}

/// The MAPPED-ADDRESS attribute, carrying a reflexive transport address in the clear.
///
/// Kept for compatibility with RFC 3489 era servers; new code should prefer
/// [`XorMappedAddress`](super::XorMappedAddress).
///
/// # Examples
///
/// ```
/// use stun_wire::message::Message;
/// use stun_wire::attribute::MappedAddress;
/// use stun_wire::prelude::*;
///
/// let mut msg = Message::new();
/// msg.write_header();
/// MappedAddress::new("192.0.2.1:32853".parse().unwrap()).add_to(&mut msg).unwrap();
///
/// let mut mapped = MappedAddress::default();
/// mapped.get_from(&msg).unwrap();
/// assert_eq!(mapped.addr(), "192.0.2.1:32853".parse().unwrap());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedAddress {
    addr: SocketAddr,
}

impl MappedAddress {
    pub const TYPE: AttributeType = AttributeType::new(0x0001);

    /// Create a new MappedAddress attribute.
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr }
    }

    /// The transport address carried by this attribute.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// The IP address carried by this attribute.
    pub fn ip(&self) -> IpAddr {
        self.addr.ip()
    }

    /// The port carried by this attribute.
    pub fn port(&self) -> u16 {
        self.addr.port()
    }
}

impl Default for MappedAddress {
    fn default() -> Self {
        Self {
            addr: unspecified_addr(),
        }
    }
}

impl Setter for MappedAddress {
    fn add_to(&self, msg: &mut Message) -> Result<(), StunError> {
        let (buf, len) = encode_addr(self.addr);
        msg.add(Self::TYPE, &buf[..len])
    }
}

impl Getter for MappedAddress {
    fn get_from(&mut self, msg: &Message) -> Result<(), StunError> {
        self.addr = decode_addr(msg, Self::TYPE)?;
        Ok(())
    }
}

impl std::fmt::Display for MappedAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", Self::TYPE, self.addr)
    }
}

/// The ALTERNATE-SERVER attribute, pointing the client at a different server.  Shares
/// the MAPPED-ADDRESS wire shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlternateServer {
    addr: SocketAddr,
}

impl AlternateServer {
    pub const TYPE: AttributeType = AttributeType::new(0x8023);

    /// Create a new AlternateServer attribute.
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr }
    }

    /// The server address carried by this attribute.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

impl Default for AlternateServer {
    fn default() -> Self {
        Self {
            addr: unspecified_addr(),
        }
    }
}

impl Setter for AlternateServer {
    fn add_to(&self, msg: &mut Message) -> Result<(), StunError> {
        let (buf, len) = encode_addr(self.addr);
        msg.add(Self::TYPE, &buf[..len])
    }
}

impl Getter for AlternateServer {
    fn get_from(&mut self, msg: &Message) -> Result<(), StunError> {
        self.addr = decode_addr(msg, Self::TYPE)?;
        Ok(())
    }
}

impl std::fmt::Display for AlternateServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", Self::TYPE, self.addr)
    }
}
