// Copyright (C) 2020 Matthew Waters <matthew@centricular.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! STUN Messages
//!
//! Provides types for generating, parsing, and manipulating STUN messages as
//! specified in [RFC8489] and [RFC5389].
//!
//! [RFC8489]: https://tools.ietf.org/html/rfc8489
//! [RFC5389]: https://tools.ietf.org/html/rfc5389
//!
//! ## Examples
//!
//! ### Parse a STUN [`Message`]
//!
//! ```
//! use stun_wire::message::{Message, MessageClass, BINDING};
//! use stun_wire::attribute::Software;
//! use stun_wire::prelude::*;
//!
//! let msg_data = [
//!     0x00, 0x01, 0x00, 0x0c, // method, class and length
//!     0x21, 0x12, 0xA4, 0x42, // fixed STUN magic bytes
//!     0x00, 0x00, 0x00, 0x00, // \
//!     0x00, 0x00, 0x00, 0x00, // } transaction ID
//!     0x00, 0x00, 0x73, 0x92, // /
//!     0x80, 0x22, 0x00, 0x08, // SOFTWARE attribute header (type and length)
//!     0x73, 0x6f, 0x66, 0x74, // s o f t
//!     0x77, 0x61, 0x72, 0x65, // w a r e
//! ];
//! let msg = Message::from_raw(&msg_data).unwrap();
//! assert!(msg.has_class(MessageClass::Request));
//! assert!(msg.has_method(BINDING));
//!
//! let mut software = Software::default();
//! software.get_from(&msg).unwrap();
//! assert_eq!(software.software(), "software");
//! ```
//!
//! ### Generating a [`Message`]
//!
//! ```
//! use stun_wire::message::{Message, MessageClass, MessageType, TransactionId, BINDING};
//! use stun_wire::attribute::Software;
//! use stun_wire::prelude::*;
//!
//! let mut msg = Message::new();
//! msg.build(&[
//!     &MessageType::from_class_method(MessageClass::Request, BINDING),
//!     &TransactionId::generate(),
//!     &Software::new("stun-wire").unwrap(),
//! ]).unwrap();
//!
//! let decoded = Message::from_raw(msg.raw()).unwrap();
//! assert_eq!(decoded, msg);
//! ```

use std::io;

use byteorder::{BigEndian, ByteOrder};

use tracing::warn;

use crate::attribute::{AttributeType, Checker, Getter, Setter};

/// The value of the magic cookie (in network byte order) as specified in RFC5389, and RFC8489.
pub const MAGIC_COOKIE: u32 = 0x2112A442;

/// The number of bytes of a STUN message header.
pub const HEADER_LENGTH: usize = 20;

/// The number of bytes of a STUN transaction ID.
pub const TRANSACTION_ID_SIZE: usize = 12;

/// The value of the binding method.  Can be used in a request, an indication, or a response.
pub const BINDING: u16 = 0x0001;
/// The TURN allocate method.
pub const ALLOCATE: u16 = 0x0003;
/// The TURN refresh method.
pub const REFRESH: u16 = 0x0004;
/// The TURN send method.  Only valid in an indication.
pub const SEND: u16 = 0x0006;
/// The TURN data method.  Only valid in an indication.
pub const DATA: u16 = 0x0007;
/// The TURN create permission method.
pub const CREATE_PERMISSION: u16 = 0x0008;
/// The TURN channel bind method.
pub const CHANNEL_BIND: u16 = 0x0009;

/// Errors produced while reading or writing a STUN message or attribute.
#[derive(Debug, thiserror::Error)]
pub enum StunError {
    /// An attribute was not found in the message.
    #[error("missing attribute {0}")]
    AttributeNotFound(AttributeType),
    /// Encoding an attribute would exceed its maximum size.
    #[error("attribute {attr} of {size} bytes exceeds the maximum of {max}")]
    AttributeSizeOverflow {
        /// The attribute being encoded.
        attr: AttributeType,
        /// The size of the provided value.
        size: usize,
        /// The maximum size allowed for this attribute.
        max: usize,
    },
    /// The declared size of an attribute is inconsistent with the surrounding data.
    #[error("attribute {attr} declares {size} bytes which do not fit the message")]
    AttributeSizeInvalid {
        /// The attribute being decoded.
        attr: AttributeType,
        /// The declared size of the value.
        size: usize,
    },
    /// The message or stream ended before a complete frame was available.
    #[error("unexpected end of message")]
    UnexpectedEof,
    /// The data does not follow the STUN wire format.
    #[error("malformed message: {0}")]
    BadFormat(&'static str),
    /// A provided value is outside the range allowed for the attribute.
    #[error("value {value} is outside of the range [{min}, {max}]")]
    OutOfRange {
        /// The value provided.
        value: usize,
        /// The minimum allowed value.
        min: usize,
        /// The maximum allowed value.
        max: usize,
    },
    /// The MESSAGE-INTEGRITY value does not match the computed value.
    #[error("message integrity does not match")]
    IntegrityMismatch,
    /// The FINGERPRINT value does not match the computed value.
    #[error("fingerprint does not match")]
    FingerprintMismatch,
    /// MESSAGE-INTEGRITY must be added before FINGERPRINT.
    #[error("message integrity cannot be added after a fingerprint")]
    IntegrityAfterFingerprint,
    /// An i/o error from the underlying reader or writer.
    #[error("i/o: {0}")]
    Io(io::Error),
}

impl StunError {
    fn from_io(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            StunError::UnexpectedEof
        } else {
            StunError::Io(e)
        }
    }
}

/// The class of a [`Message`].
///
/// There are four classes of [`Message`]s within the STUN protocol:
///
///  - [Request][`MessageClass::Request`] indicates that a request is being made and a
///    response is expected.
///  - An [Indication][`MessageClass::Indication`] is a fire and forget [`Message`] where
///    no response is required or expected.
///  - [Success][`MessageClass::Success`] indicates that a [Request][`MessageClass::Request`]
///    was successfully handled and the
///  - [Error][`MessageClass::Error`] class indicates that an error was produced.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum MessageClass {
    Request,
    Indication,
    Success,
    Error,
}

impl MessageClass {
    /// Returns whether this [`MessageClass`] is of a response type.  i.e. is either
    /// [`MessageClass::Success`] or [`MessageClass::Error`].
    pub fn is_response(self) -> bool {
        matches!(self, MessageClass::Success | MessageClass::Error)
    }

    fn to_bits(self) -> u16 {
        match self {
            MessageClass::Request => 0x000,
            MessageClass::Indication => 0x010,
            MessageClass::Success => 0x100,
            MessageClass::Error => 0x110,
        }
    }
}

/// The type of a [`Message`].  A combination of a [`MessageClass`] and a STUN method.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct MessageType(u16);

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "MessageType(class: {:?}, method: {} ({:#x}))",
            self.class(),
            self.method(),
            self.method()
        )
    }
}

impl MessageType {
    /// Create a new [`MessageType`] from the provided [`MessageClass`] and method
    ///
    /// # Examples
    ///
    /// ```
    /// # use stun_wire::message::{MessageType, MessageClass, BINDING};
    /// let mtype = MessageType::from_class_method(MessageClass::Indication, BINDING);
    /// assert_eq!(mtype.has_class(MessageClass::Indication), true);
    /// assert_eq!(mtype.has_method(BINDING), true);
    /// ```
    pub fn from_class_method(class: MessageClass, method: u16) -> Self {
        let class_bits = MessageClass::to_bits(class);
        let method_bits = method & 0xf | (method & 0x70) << 1 | (method & 0xf80) << 2;
        Self(class_bits | method_bits)
    }

    /// Retrieves the class of a [`MessageType`]
    ///
    /// # Examples
    ///
    /// ```
    /// # use stun_wire::message::{MessageType, MessageClass, BINDING};
    /// let mtype = MessageType::from_class_method(MessageClass::Indication, BINDING);
    /// assert_eq!(mtype.class(), MessageClass::Indication);
    /// ```
    pub fn class(self) -> MessageClass {
        let class = (self.0 & 0x10) >> 4 | (self.0 & 0x100) >> 7;
        match class {
            0x0 => MessageClass::Request,
            0x1 => MessageClass::Indication,
            0x2 => MessageClass::Success,
            0x3 => MessageClass::Error,
            _ => unreachable!(),
        }
    }

    /// Returns whether the class of a [`MessageType`] is equal to the provided [`MessageClass`]
    pub fn has_class(self, cls: MessageClass) -> bool {
        self.class() == cls
    }

    /// Returns whether the class of a [`MessageType`] indicates a response [`Message`]
    pub fn is_response(self) -> bool {
        self.class().is_response()
    }

    /// Returns the method of a [`MessageType`]
    ///
    /// # Examples
    ///
    /// ```
    /// # use stun_wire::message::{MessageType, MessageClass, BINDING};
    /// let mtype = MessageType::from_class_method(MessageClass::Indication, BINDING);
    /// assert_eq!(mtype.method(), BINDING);
    /// ```
    pub fn method(self) -> u16 {
        self.0 & 0xf | (self.0 & 0xe0) >> 1 | (self.0 & 0x3e00) >> 2
    }

    /// Returns whether the method of a [`MessageType`] is equal to the provided value
    pub fn has_method(self, method: u16) -> bool {
        self.method() == method
    }

    /// The 16-bit value of this [`MessageType`] as encoded in the first two bytes of a message.
    pub fn value(self) -> u16 {
        self.0
    }

    /// Convert the first two bytes of a message into a [`MessageType`].
    ///
    /// The two most significant bits of every STUN message are zero; anything else is rejected.
    pub fn from_value(value: u16) -> Result<Self, StunError> {
        if value & 0xc000 != 0x0 {
            return Err(StunError::BadFormat("first two type bits are not zero"));
        }
        Ok(Self(value))
    }
}

impl Setter for MessageType {
    fn add_to(&self, msg: &mut Message) -> Result<(), StunError> {
        msg.set_type(*self);
        Ok(())
    }
}

/// A unique transaction identifier for each message and its (possible) response.
#[derive(Copy, Clone, Debug, Default, Hash, PartialEq, Eq)]
pub struct TransactionId([u8; TRANSACTION_ID_SIZE]);

impl TransactionId {
    /// Generate a new STUN transaction identifier from 96 uniformly random bits.
    pub fn generate() -> TransactionId {
        use rand::{thread_rng, Rng};
        let mut rng = thread_rng();
        Self(rng.gen())
    }

    /// The bytes of this [`TransactionId`] as stored in the message header.
    pub fn as_bytes(&self) -> &[u8; TRANSACTION_ID_SIZE] {
        &self.0
    }
}

impl From<[u8; TRANSACTION_ID_SIZE]> for TransactionId {
    fn from(id: [u8; TRANSACTION_ID_SIZE]) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x")?;
        for val in self.0.iter() {
            write!(f, "{val:02x}")?;
        }
        Ok(())
    }
}

impl Setter for TransactionId {
    fn add_to(&self, msg: &mut Message) -> Result<(), StunError> {
        msg.set_transaction_id(*self);
        Ok(())
    }
}

/// A parsed attribute: its type, the unpadded length of its value, and where the value
/// starts within the message's raw buffer.
///
/// The value itself stays in the buffer of the [`Message`] that produced this entry; use
/// [`Message::attribute_value`] to read it.  The entry is only meaningful until that
/// message is next reset, decoded, or written to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Attr {
    atype: AttributeType,
    length: u16,
    start: usize,
}

impl Attr {
    /// The type of this attribute.
    pub fn get_type(&self) -> AttributeType {
        self.atype
    }

    /// The length of the attribute value, excluding padding.
    pub fn length(&self) -> u16 {
        self.length
    }

    /// Offset of the first value byte within the owning message's raw buffer.
    pub fn value_offset(&self) -> usize {
        self.start
    }
}

/// The ordered list of attributes attached to a [`Message`].
///
/// Order matters on the wire: MESSAGE-INTEGRITY covers everything before it and
/// FINGERPRINT must come last.
#[derive(Clone, Debug, Default)]
pub struct Attributes(Vec<Attr>);

impl Attributes {
    /// Returns the first attribute of the given type, if any.
    pub fn first(&self, atype: AttributeType) -> Option<Attr> {
        self.0.iter().find(|a| a.atype == atype).copied()
    }

    /// Returns whether an attribute of the given type is present.
    pub fn contains(&self, atype: AttributeType) -> bool {
        self.0.iter().any(|a| a.atype == atype)
    }

    /// Iterate over the attributes in wire order.
    pub fn iter(&self) -> impl Iterator<Item = &Attr> {
        self.0.iter()
    }

    /// The number of attributes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn clear(&mut self) {
        self.0.clear();
    }
}

fn padded_len(len: usize) -> usize {
    (len + 3) & !3
}

/// A mutable STUN message owning its raw wire representation.
///
/// Encoding appends attributes in place and keeps the header length field in sync;
/// decoding records `(type, length, offset)` entries that alias the raw buffer so no
/// value bytes are copied.  A `Message` is not internally synchronised: use one value
/// from one thread at a time.
#[derive(Clone, Debug, Default)]
pub struct Message {
    pub(crate) raw: Vec<u8>,
    pub(crate) attributes: Attributes,
    transaction_id: TransactionId,
    mtype: MessageType,
}

impl Message {
    /// Create a new empty [`Message`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new empty [`Message`] with a preallocated raw buffer.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            raw: Vec::with_capacity(capacity),
            ..Self::default()
        }
    }

    /// Truncate the raw buffer and forget all attributes, keeping allocations for reuse.
    pub fn reset(&mut self) {
        self.raw.clear();
        self.attributes.clear();
        self.transaction_id = TransactionId::default();
        self.mtype = MessageType::default();
    }

    /// Retrieve the [`MessageType`] of this [`Message`].
    pub fn get_type(&self) -> MessageType {
        self.mtype
    }

    /// Write the [`MessageType`] into the first two bytes of the raw buffer, reserving a
    /// header if none exists yet.  Everything else in the header is left intact.
    pub fn set_type(&mut self, mtype: MessageType) {
        self.mtype = mtype;
        if self.raw.len() < HEADER_LENGTH {
            self.raw.resize(HEADER_LENGTH, 0);
        }
        BigEndian::write_u16(&mut self.raw[0..2], mtype.value());
    }

    /// Retrieve the [`MessageClass`] of this [`Message`].
    pub fn class(&self) -> MessageClass {
        self.mtype.class()
    }

    /// Returns whether the [`Message`] is of the specified [`MessageClass`].
    pub fn has_class(&self, cls: MessageClass) -> bool {
        self.class() == cls
    }

    /// Retrieves the method of this [`Message`].
    pub fn method(&self) -> u16 {
        self.mtype.method()
    }

    /// Returns whether the [`Message`] is of the specified method.
    pub fn has_method(&self, method: u16) -> bool {
        self.method() == method
    }

    /// Retrieves the 96-bit transaction ID of this [`Message`].
    pub fn transaction_id(&self) -> TransactionId {
        self.transaction_id
    }

    /// Write the provided [`TransactionId`] into the header, reserving a header if none
    /// exists yet.
    pub fn set_transaction_id(&mut self, id: TransactionId) {
        self.transaction_id = id;
        if self.raw.len() < HEADER_LENGTH {
            self.raw.resize(HEADER_LENGTH, 0);
        }
        self.raw[8..HEADER_LENGTH].copy_from_slice(id.as_bytes());
    }

    /// Generate a fresh random [`TransactionId`], write it into the header and return it.
    pub fn new_transaction_id(&mut self) -> TransactionId {
        let id = TransactionId::generate();
        self.set_transaction_id(id);
        id
    }

    /// Write the full 20-byte header: the cached type, the current length, the magic
    /// cookie and the cached transaction ID.  Idempotent.
    pub fn write_header(&mut self) {
        if self.raw.len() < HEADER_LENGTH {
            self.raw.resize(HEADER_LENGTH, 0);
        }
        BigEndian::write_u16(&mut self.raw[0..2], self.mtype.value());
        self.write_length();
        BigEndian::write_u32(&mut self.raw[4..8], MAGIC_COOKIE);
        self.raw[8..HEADER_LENGTH].copy_from_slice(self.transaction_id.as_bytes());
    }

    /// Rewrite only the length field from the current size of the raw buffer.
    pub fn write_length(&mut self) {
        let length = self
            .raw
            .len()
            .saturating_sub(HEADER_LENGTH)
            .min(u16::MAX as usize) as u16;
        self.put_length(length);
    }

    /// Write an arbitrary value into the length field.  Integrity and fingerprint
    /// computations temporarily set a length that covers an attribute which has not been
    /// appended yet.
    pub(crate) fn put_length(&mut self, length: u16) {
        if self.raw.len() < HEADER_LENGTH {
            self.raw.resize(HEADER_LENGTH, 0);
        }
        BigEndian::write_u16(&mut self.raw[2..4], length);
    }

    /// Append a `(type, length, value)` attribute to the raw buffer, padding the value to
    /// a four byte boundary, and update the header length field.
    ///
    /// # Examples
    ///
    /// ```
    /// # use stun_wire::message::Message;
    /// # use stun_wire::attribute::AttributeType;
    /// let mut msg = Message::new();
    /// msg.write_header();
    /// msg.add(AttributeType::new(0x8001), &[1, 2, 3]).unwrap();
    /// assert_eq!(msg.get(AttributeType::new(0x8001)).unwrap(), &[1, 2, 3]);
    /// // value is padded on the wire, and the length field accounts for the padding
    /// assert_eq!(msg.raw().len(), 20 + 4 + 4);
    /// ```
    pub fn add(&mut self, atype: AttributeType, value: &[u8]) -> Result<(), StunError> {
        if value.len() > u16::MAX as usize {
            return Err(StunError::AttributeSizeOverflow {
                attr: atype,
                size: value.len(),
                max: u16::MAX as usize,
            });
        }
        if self.raw.len() < HEADER_LENGTH {
            self.raw.resize(HEADER_LENGTH, 0);
        }
        let length = value.len() as u16;
        let padded = padded_len(value.len());
        self.raw.reserve(4 + padded);
        let mut header = [0; 4];
        BigEndian::write_u16(&mut header[0..2], atype.value());
        BigEndian::write_u16(&mut header[2..4], length);
        self.raw.extend_from_slice(&header);
        let start = self.raw.len();
        self.raw.extend_from_slice(value);
        self.raw.extend_from_slice(&[0, 0, 0][..padded - value.len()]);
        self.attributes.0.push(Attr {
            atype,
            length,
            start,
        });
        self.write_length();
        Ok(())
    }

    /// Return the value bytes of the first attribute of the given type.
    ///
    /// The returned slice aliases the raw buffer and is valid until the message is next
    /// mutated.
    pub fn get(&self, atype: AttributeType) -> Result<&[u8], StunError> {
        self.attributes
            .first(atype)
            .map(|attr| self.attribute_value(attr))
            .ok_or(StunError::AttributeNotFound(atype))
    }

    /// Returns whether this message contains an attribute of the specified type.
    pub fn contains(&self, atype: AttributeType) -> bool {
        self.attributes.contains(atype)
    }

    /// The parsed attribute list, in wire order.
    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// The value bytes of a previously looked up attribute entry.
    pub fn attribute_value(&self, attr: Attr) -> &[u8] {
        &self.raw[attr.start..attr.start + attr.length as usize]
    }

    /// The raw wire representation of this message.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// Mutable access to the raw buffer.
    ///
    /// Growing or shrinking the buffer invalidates the attribute list until the next
    /// [`decode`](Message::decode); in-place byte edits (e.g. for tamper testing) are fine.
    pub fn raw_mut(&mut self) -> &mut Vec<u8> {
        &mut self.raw
    }

    /// Copy the provided framed bytes into a fresh [`Message`] and decode them.
    pub fn from_raw(data: &[u8]) -> Result<Self, StunError> {
        let mut msg = Message::with_capacity(data.len());
        msg.raw.extend_from_slice(data);
        msg.decode()?;
        Ok(msg)
    }

    /// Decode the raw buffer: validate the header, then parse the attribute TLVs.
    ///
    /// Bytes beyond the declared message length are ignored, which permits decoding out
    /// of a larger stream buffer.
    pub fn decode(&mut self) -> Result<(), StunError> {
        if self.raw.len() < HEADER_LENGTH {
            return Err(StunError::UnexpectedEof);
        }
        let mtype = MessageType::from_value(BigEndian::read_u16(&self.raw[0..2]))?;
        let length = BigEndian::read_u16(&self.raw[2..4]) as usize;
        let cookie = BigEndian::read_u32(&self.raw[4..8]);
        if cookie != MAGIC_COOKIE {
            warn!(
                "magic cookie {:#x} does not match the expected {:#x}",
                cookie, MAGIC_COOKIE
            );
            return Err(StunError::BadFormat("magic cookie mismatch"));
        }
        if self.raw.len() < HEADER_LENGTH + length {
            warn!(
                "message of {} bytes declares a length of {}",
                self.raw.len(),
                length
            );
            return Err(StunError::UnexpectedEof);
        }
        self.mtype = mtype;
        let mut id = [0; TRANSACTION_ID_SIZE];
        id.copy_from_slice(&self.raw[8..HEADER_LENGTH]);
        self.transaction_id = id.into();

        self.attributes.clear();
        let end = HEADER_LENGTH + length;
        let mut offset = HEADER_LENGTH;
        while offset < end {
            if end - offset < 4 {
                return Err(StunError::UnexpectedEof);
            }
            let atype = AttributeType::new(BigEndian::read_u16(&self.raw[offset..offset + 2]));
            let alen = BigEndian::read_u16(&self.raw[offset + 2..offset + 4]);
            let start = offset + 4;
            if start + alen as usize > end {
                warn!("attribute {} extends past the end of the message", atype);
                return Err(StunError::AttributeSizeInvalid {
                    attr: atype,
                    size: alen as usize,
                });
            }
            self.attributes.0.push(Attr {
                atype,
                length: alen,
                start,
            });
            offset = start + padded_len(alen as usize);
        }
        Ok(())
    }

    /// Read one framed message from `reader` into the raw buffer and decode it.
    ///
    /// Reads the 20-byte header first, then exactly the declared number of body bytes,
    /// looping over short reads.  Returns the total number of bytes consumed.
    pub fn read_from<R: io::Read>(&mut self, reader: &mut R) -> Result<usize, StunError> {
        self.reset();
        let mut header = [0; HEADER_LENGTH];
        reader.read_exact(&mut header).map_err(StunError::from_io)?;
        let length = BigEndian::read_u16(&header[2..4]) as usize;
        self.raw.extend_from_slice(&header);
        self.raw.resize(HEADER_LENGTH + length, 0);
        reader
            .read_exact(&mut self.raw[HEADER_LENGTH..])
            .map_err(StunError::from_io)?;
        self.decode()?;
        Ok(HEADER_LENGTH + length)
    }

    /// Write the raw representation of this message to `writer`.  Returns the number of
    /// bytes written.
    pub fn write_to<W: io::Write>(&self, writer: &mut W) -> Result<usize, StunError> {
        writer.write_all(&self.raw).map_err(StunError::from_io)?;
        Ok(self.raw.len())
    }

    /// Reset the message, write a fresh header and run each setter in order, stopping at
    /// the first error.
    ///
    /// Setter order is significant: MESSAGE-INTEGRITY must run after every attribute it
    /// covers and FINGERPRINT must run last.
    pub fn build(&mut self, setters: &[&dyn Setter]) -> Result<(), StunError> {
        self.reset();
        self.write_header();
        self.apply(setters)
    }

    /// Run each setter in order against this message without resetting it first.
    pub fn apply(&mut self, setters: &[&dyn Setter]) -> Result<(), StunError> {
        for setter in setters {
            setter.add_to(self)?;
        }
        Ok(())
    }

    /// Run each checker in order against this message, stopping at the first error.
    pub fn check(&self, checkers: &[&dyn Checker]) -> Result<(), StunError> {
        for checker in checkers {
            checker.check(self)?;
        }
        Ok(())
    }

    /// Fill each getter in order from this message, stopping at the first error.
    pub fn parse(&self, getters: &mut [&mut dyn Getter]) -> Result<(), StunError> {
        for getter in getters.iter_mut() {
            getter.get_from(self)?;
        }
        Ok(())
    }
}

/// Messages compare by type, transaction ID and the ordered attribute list.  Raw padding
/// bytes and buffer capacity are not semantic and do not participate.
impl PartialEq for Message {
    fn eq(&self, other: &Self) -> bool {
        self.mtype == other.mtype
            && self.transaction_id == other.transaction_id
            && self.attributes.len() == other.attributes.len()
            && self
                .attributes
                .iter()
                .zip(other.attributes.iter())
                .all(|(a, b)| {
                    a.atype == b.atype && self.attribute_value(*a) == other.attribute_value(*b)
                })
    }
}

impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Message(class: {:?}, method: {} ({:#x}), transaction: {}, attributes: [",
            self.class(),
            self.method(),
            self.method(),
            self.transaction_id()
        )?;
        for (i, attr) in self.attributes.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", attr.get_type())?;
        }
        write!(f, "])")
    }
}

/// Build a fresh [`Message`] from a list of setters, stopping at the first error.
///
/// # Examples
///
/// ```
/// use stun_wire::message::{self, MessageClass, MessageType, TransactionId, BINDING};
/// use stun_wire::attribute::Username;
///
/// let msg = message::build(&[
///     &MessageType::from_class_method(MessageClass::Request, BINDING),
///     &TransactionId::generate(),
///     &Username::new("user").unwrap(),
/// ]).unwrap();
/// assert!(msg.contains(Username::TYPE));
/// ```
pub fn build(setters: &[&dyn Setter]) -> Result<Message, StunError> {
    let mut msg = Message::new();
    msg.build(setters)?;
    Ok(msg)
}

/// Cheap check of whether `data` could be the start of a STUN message: enough bytes for a
/// header, the two fixed zero bits, and the magic cookie.  Useful for demultiplexing STUN
/// from other protocols on the same socket.
///
/// # Examples
///
/// ```
/// # use stun_wire::message::{is_message, Message, MessageClass, MessageType, BINDING};
/// let mut msg = Message::new();
/// msg.set_type(MessageType::from_class_method(MessageClass::Request, BINDING));
/// msg.write_header();
/// assert!(is_message(msg.raw()));
/// assert!(!is_message(&[0x80; 20]));
/// ```
pub fn is_message(data: &[u8]) -> bool {
    data.len() >= HEADER_LENGTH
        && data[0] & 0xc0 == 0x0
        && BigEndian::read_u32(&data[4..8]) == MAGIC_COOKIE
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::{Fingerprint, Nonce, Realm, Software, Username, XorMappedAddress};
    use std::io::Cursor;
    use std::net::{IpAddr, Ipv4Addr};

    fn init() {
        crate::tests::test_init_log();
    }

    #[test]
    fn message_type_roundtrip() {
        init();
        for class in [
            MessageClass::Request,
            MessageClass::Indication,
            MessageClass::Success,
            MessageClass::Error,
        ] {
            for method in [BINDING, ALLOCATE, REFRESH, SEND, DATA, CHANNEL_BIND] {
                let mtype = MessageType::from_class_method(class, method);
                assert_eq!(mtype.class(), class);
                assert_eq!(mtype.method(), method);
                let parsed = MessageType::from_value(mtype.value()).unwrap();
                assert_eq!(parsed, mtype);
            }
        }
    }

    #[test]
    fn message_type_top_bits() {
        init();
        assert!(matches!(
            MessageType::from_value(0xc001),
            Err(StunError::BadFormat(_))
        ));
    }

    #[test]
    fn write_header_is_idempotent() {
        init();
        let mut msg = Message::new();
        msg.set_type(MessageType::from_class_method(MessageClass::Request, BINDING));
        msg.set_transaction_id([3; TRANSACTION_ID_SIZE].into());
        msg.write_header();
        let first = msg.raw().to_vec();
        msg.write_header();
        assert_eq!(msg.raw(), first.as_slice());
    }

    #[test]
    fn length_tracks_additions() {
        init();
        let mut msg = Message::new();
        msg.write_header();
        for (i, len) in [1usize, 4, 7, 32].iter().enumerate() {
            msg.add(AttributeType::new(0x8000 + i as u16), &vec![0xab; *len])
                .unwrap();
            let declared = BigEndian::read_u16(&msg.raw()[2..4]) as usize;
            assert_eq!(declared, msg.raw().len() - HEADER_LENGTH);
            assert_eq!(declared & 0x3, 0);
        }
    }

    #[test]
    fn add_get_roundtrip() {
        init();
        let mut msg = Message::new();
        msg.write_header();
        msg.add(AttributeType::new(0x8001), &[1, 2, 3]).unwrap();
        msg.add(AttributeType::new(0x8001), &[4, 5]).unwrap();
        // first match wins
        assert_eq!(msg.get(AttributeType::new(0x8001)).unwrap(), &[1, 2, 3]);
        assert!(matches!(
            msg.get(AttributeType::new(0x8002)),
            Err(StunError::AttributeNotFound(_))
        ));
    }

    #[test]
    fn add_too_large() {
        init();
        let mut msg = Message::new();
        let value = vec![0; u16::MAX as usize + 1];
        assert!(matches!(
            msg.add(AttributeType::new(0x8001), &value),
            Err(StunError::AttributeSizeOverflow { .. })
        ));
    }

    #[test]
    fn decode_rejects_bad_cookie() {
        init();
        let mut msg = Message::new();
        msg.write_header();
        let mut data = msg.raw().to_vec();
        data[4] = 0x42;
        let mut bad = Message::new();
        bad.raw_mut().extend_from_slice(&data);
        assert!(matches!(
            bad.decode(),
            Err(StunError::BadFormat("magic cookie mismatch"))
        ));
    }

    #[test]
    fn decode_rejects_truncation() {
        init();
        let mut msg = Message::new();
        msg.write_header();
        msg.add(Software::TYPE, b"software").unwrap();
        let data = msg.raw().to_vec();
        // truncated body
        let mut short = Message::new();
        short.raw_mut().extend_from_slice(&data[..data.len() - 4]);
        assert!(matches!(short.decode(), Err(StunError::UnexpectedEof)));
        // truncated header
        let mut short = Message::new();
        short.raw_mut().extend_from_slice(&data[..12]);
        assert!(matches!(short.decode(), Err(StunError::UnexpectedEof)));
    }

    #[test]
    fn decode_rejects_attribute_overrun() {
        init();
        let mut msg = Message::new();
        msg.write_header();
        msg.add(Software::TYPE, b"software").unwrap();
        let mut data = msg.raw().to_vec();
        // attribute declares more bytes than the message holds
        BigEndian::write_u16(&mut data[22..24], 0x100);
        let mut bad = Message::new();
        bad.raw_mut().extend_from_slice(&data);
        assert!(matches!(
            bad.decode(),
            Err(StunError::AttributeSizeInvalid { .. })
        ));
    }

    #[test]
    fn decode_ignores_trailing_bytes() {
        init();
        let mut msg = Message::new();
        msg.write_header();
        msg.add(Software::TYPE, b"software").unwrap();
        let mut data = msg.raw().to_vec();
        data.extend_from_slice(&[0xde, 0xad, 0xbe, 0xef]);
        let decoded = Message::from_raw(&data).unwrap();
        assert_eq!(decoded.attributes().len(), 1);
        assert_eq!(decoded, msg);
    }

    #[test]
    fn binding_request_roundtrip() {
        init();
        let mut msg = Message::new();
        msg.build(&[
            &MessageType::from_class_method(MessageClass::Request, BINDING),
            &TransactionId::generate(),
            &Username::new("user").unwrap(),
            &Nonce::new("nonce").unwrap(),
            &Realm::new("example.org").unwrap(),
            &Fingerprint,
        ])
        .unwrap();

        let decoded = Message::from_raw(msg.raw()).unwrap();
        assert_eq!(decoded, msg);
        decoded.check(&[&Fingerprint]).unwrap();

        let mut username = Username::default();
        let mut nonce = Nonce::default();
        let mut realm = Realm::default();
        decoded
            .parse(&mut [&mut username, &mut nonce, &mut realm])
            .unwrap();
        assert_eq!(username.username(), "user");
        assert_eq!(nonce.nonce(), "nonce");
        assert_eq!(realm.realm(), "example.org");
    }

    #[test]
    fn read_write_stream() {
        init();
        let mut msg = Message::new();
        msg.build(&[
            &MessageType::from_class_method(MessageClass::Success, BINDING),
            &TransactionId::generate(),
            &Software::new("stun-wire").unwrap(),
        ])
        .unwrap();

        let mut buf = Vec::new();
        let written = msg.write_to(&mut buf).unwrap();
        assert_eq!(written, msg.raw().len());

        let mut decoded = Message::new();
        let read = decoded.read_from(&mut Cursor::new(&buf)).unwrap();
        assert_eq!(read, written);
        assert_eq!(decoded, msg);

        // stream ending mid-frame reports eof
        let mut decoded = Message::new();
        assert!(matches!(
            decoded.read_from(&mut Cursor::new(&buf[..buf.len() - 2])),
            Err(StunError::UnexpectedEof)
        ));
    }

    #[test]
    fn reset_keeps_capacity() {
        init();
        let mut msg = Message::new();
        msg.write_header();
        msg.add(Software::TYPE, b"software").unwrap();
        let cap = msg.raw.capacity();
        msg.reset();
        assert!(msg.raw().is_empty());
        assert!(msg.attributes().is_empty());
        assert_eq!(msg.raw.capacity(), cap);
        assert_eq!(msg.transaction_id(), TransactionId::default());
    }

    #[test]
    fn equal_ignores_padding_content() {
        init();
        let mut a = Message::new();
        a.write_header();
        a.add(Software::TYPE, b"abcde").unwrap();
        let mut b = a.clone();
        // five byte value leaves three padding bytes; scribble over them
        let len = b.raw().len();
        b.raw_mut()[len - 3..].copy_from_slice(&[0x20; 3]);
        let b = Message::from_raw(&b.raw().to_vec()).unwrap();
        assert_eq!(a, b);
    }

    struct FailingSetter;

    impl Setter for FailingSetter {
        fn add_to(&self, _msg: &mut Message) -> Result<(), StunError> {
            Err(StunError::BadFormat("always fails"))
        }
    }

    #[test]
    fn build_short_circuits() {
        init();
        let mut msg = Message::new();
        let software = Software::new("stun-wire").unwrap();
        let err = msg
            .build(&[&FailingSetter, &software])
            .unwrap_err();
        assert!(matches!(err, StunError::BadFormat("always fails")));
        // the failing setter ran before software was added
        assert!(!msg.contains(Software::TYPE));
    }

    // RFC 5769 section 2.2 sample IPv4 response.
    const RFC5769_RESPONSE: [u8; 80] = [
        0x01, 0x01, 0x00, 0x3c, 0x21, 0x12, 0xa4, 0x42, 0xb7, 0xe7, 0xa7, 0x01, 0xbc, 0x34, 0xd6,
        0x86, 0xfa, 0x87, 0xdf, 0xae, 0x80, 0x22, 0x00, 0x0b, 0x74, 0x65, 0x73, 0x74, 0x20, 0x76,
        0x65, 0x63, 0x74, 0x6f, 0x72, 0x20, 0x00, 0x20, 0x00, 0x08, 0x00, 0x01, 0xa1, 0x47, 0xe1,
        0x12, 0xa6, 0x43, 0x00, 0x08, 0x00, 0x14, 0x2b, 0x91, 0xf5, 0x99, 0xfd, 0x9e, 0x90, 0xc3,
        0x8c, 0x74, 0x89, 0xf9, 0x2a, 0xf9, 0xba, 0x53, 0xf0, 0x6b, 0xe7, 0xd7, 0x80, 0x28, 0x00,
        0x04, 0xc0, 0x7d, 0x4c, 0x96,
    ];

    #[test]
    fn rfc5769_response_vector() {
        init();
        use crate::attribute::MessageIntegrity;

        let msg = Message::from_raw(&RFC5769_RESPONSE).unwrap();
        assert!(msg.has_class(MessageClass::Success));
        assert!(msg.has_method(BINDING));

        let mut software = Software::default();
        software.get_from(&msg).unwrap();
        assert_eq!(software.software(), "test vector");

        let mut mapped = XorMappedAddress::default();
        mapped.get_from(&msg).unwrap();
        assert_eq!(mapped.ip(), IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)));
        assert_eq!(mapped.port(), 32853);

        let integrity = MessageIntegrity::new_short_term("VOkJxbRl1RmTxUk/WvJxBt");
        msg.check(&[&integrity, &Fingerprint]).unwrap();
    }
}
