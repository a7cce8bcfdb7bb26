// Copyright (C) 2020 Matthew Waters <matthew@centricular.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use crate::message::{Message, StunError, TransactionId, MAGIC_COOKIE};

use super::address::{decode_addr, encode_addr, unspecified_addr};
use super::{AttributeType, Getter, Setter};

/// The XOR-MAPPED-ADDRESS attribute.
///
/// Same shape as MAPPED-ADDRESS, but the port is XORed with the upper half of the magic
/// cookie and the address with the cookie (IPv4) or the cookie followed by the
/// transaction ID (IPv6), so that NATs rewriting literal addresses in payloads do not
/// corrupt it.  The XOR masking happens against the transaction ID of the message the
/// attribute is added to or fetched from.
///
/// # Examples
///
/// ```
/// use stun_wire::message::{Message, TransactionId};
/// use stun_wire::attribute::XorMappedAddress;
/// use stun_wire::prelude::*;
///
/// let mut msg = Message::new();
/// msg.set_transaction_id(TransactionId::generate());
/// msg.write_header();
/// XorMappedAddress::new("[::1]:1234".parse().unwrap()).add_to(&mut msg).unwrap();
///
/// let mut mapped = XorMappedAddress::default();
/// mapped.get_from(&msg).unwrap();
/// assert_eq!(mapped.addr(), "[::1]:1234".parse().unwrap());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XorMappedAddress {
    addr: SocketAddr,
}

impl XorMappedAddress {
    pub const TYPE: AttributeType = AttributeType::new(0x0020);

    /// Create a new XorMappedAddress attribute from the (unmasked) transport address.
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr }
    }

    /// The (unmasked) transport address carried by this attribute.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// The (unmasked) IP address carried by this attribute.
    pub fn ip(&self) -> IpAddr {
        self.addr.ip()
    }

    /// The (unmasked) port carried by this attribute.
    pub fn port(&self) -> u16 {
        self.addr.port()
    }
}

impl Default for XorMappedAddress {
    fn default() -> Self {
        Self {
            addr: unspecified_addr(),
        }
    }
}

/// XOR a socket address with the magic cookie and transaction ID.  Self-inverse.
fn xor_addr(addr: SocketAddr, transaction: TransactionId) -> SocketAddr {
    let port = addr.port() ^ (MAGIC_COOKIE >> 16) as u16;
    match addr.ip() {
        IpAddr::V4(ip) => {
            let ip = u32::from(ip) ^ MAGIC_COOKIE;
            SocketAddr::new(IpAddr::V4(Ipv4Addr::from(ip)), port)
        }
        IpAddr::V6(ip) => {
            let mut mask = [0; 16];
            mask[..4].copy_from_slice(&MAGIC_COOKIE.to_be_bytes());
            mask[4..].copy_from_slice(transaction.as_bytes());
            let mut octets = ip.octets();
            for (octet, mask) in octets.iter_mut().zip(mask.iter()) {
                *octet ^= mask;
            }
            SocketAddr::new(IpAddr::V6(Ipv6Addr::from(octets)), port)
        }
    }
}

impl Setter for XorMappedAddress {
    fn add_to(&self, msg: &mut Message) -> Result<(), StunError> {
        let (buf, len) = encode_addr(xor_addr(self.addr, msg.transaction_id()));
        msg.add(Self::TYPE, &buf[..len])
    }
}

impl Getter for XorMappedAddress {
    fn get_from(&mut self, msg: &Message) -> Result<(), StunError> {
        let masked = decode_addr(msg, Self::TYPE)?;
        self.addr = xor_addr(masked, msg.transaction_id());
        Ok(())
    }
}

impl std::fmt::Display for XorMappedAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", Self::TYPE, self.addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::{BigEndian, ByteOrder};

    fn init() {
        crate::tests::test_init_log();
    }

    #[test]
    fn xor_mapped_address_roundtrip() {
        init();
        for addr in ["192.168.0.1:40000", "[fd12:3456:789a:1::1]:41000"] {
            let addr: SocketAddr = addr.parse().unwrap();
            let mut msg = Message::new();
            msg.set_transaction_id([7; 12].into());
            msg.write_header();
            XorMappedAddress::new(addr).add_to(&mut msg).unwrap();

            // the wire value is masked
            let value = msg.get(XorMappedAddress::TYPE).unwrap();
            let wire_port = BigEndian::read_u16(&value[2..4]);
            assert_eq!(wire_port, addr.port() ^ (MAGIC_COOKIE >> 16) as u16);

            let mut mapped = XorMappedAddress::default();
            mapped.get_from(&msg).unwrap();
            assert_eq!(mapped.addr(), addr);
        }
    }

    #[test]
    fn xor_is_self_inverse() {
        init();
        let transaction = TransactionId::generate();
        for addr in ["10.0.0.2:9", "[2001:db8::3]:78"] {
            let addr: SocketAddr = addr.parse().unwrap();
            let masked = xor_addr(addr, transaction);
            assert_ne!(masked, addr);
            assert_eq!(xor_addr(masked, transaction), addr);
        }
    }
}
