// Copyright (C) 2020 Matthew Waters <matthew@centricular.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use byteorder::{BigEndian, ByteOrder};

use crate::message::{Message, StunError};

use super::{AttributeType, Getter, Setter};

/// The ERROR-CODE attribute of an error response.
///
/// On the wire the code is split into a class (hundreds digit, 3 through 6) and a
/// number (0 through 99), followed by a UTF-8 reason phrase.
///
/// # Examples
///
/// ```
/// use stun_wire::message::Message;
/// use stun_wire::attribute::ErrorCode;
/// use stun_wire::prelude::*;
///
/// let mut msg = Message::new();
/// msg.write_header();
/// ErrorCode::new(ErrorCode::UNKNOWN_ATTRIBUTE, "Unknown Attribute")
///     .unwrap()
///     .add_to(&mut msg)
///     .unwrap();
///
/// let mut error = ErrorCode::default();
/// error.get_from(&msg).unwrap();
/// assert_eq!(error.code(), 420);
/// assert_eq!(error.reason(), "Unknown Attribute");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorCode {
    code: u16,
    reason: String,
}

impl ErrorCode {
    pub const TYPE: AttributeType = AttributeType::new(0x0009);

    const REASON_MAX: usize = 763;

    /// Try an alternate server.
    pub const TRY_ALTERNATE: u16 = 300;
    /// The request was malformed and could not be processed.
    pub const BAD_REQUEST: u16 = 400;
    /// The required credentials were not found or did not match.
    pub const UNAUTHORIZED: u16 = 401;
    /// An unknown comprehension required attribute was present.
    pub const UNKNOWN_ATTRIBUTE: u16 = 420;
    /// The nonce is no longer valid.
    pub const STALE_NONCE: u16 = 438;
    /// Requestor must switch ICE roles.
    pub const ROLE_CONFLICT: u16 = 487;
    /// An unspecified server error has occurred.
    pub const SERVER_ERROR: u16 = 500;

    /// Create a new [`ErrorCode`] with the provided reason phrase.
    ///
    /// # Errors
    ///
    /// - When the code value is outside the range [300, 699].
    /// - When the reason phrase exceeds 763 bytes.
    pub fn new(code: u16, reason: &str) -> Result<Self, StunError> {
        if !(300..700).contains(&code) {
            return Err(StunError::OutOfRange {
                value: code as usize,
                min: 300,
                max: 699,
            });
        }
        if reason.len() > Self::REASON_MAX {
            return Err(StunError::AttributeSizeOverflow {
                attr: Self::TYPE,
                size: reason.len(),
                max: Self::REASON_MAX,
            });
        }
        Ok(Self {
            code,
            reason: reason.to_owned(),
        })
    }

    /// Create a new [`ErrorCode`] with the recommended reason phrase for the code.
    ///
    /// # Examples
    ///
    /// ```
    /// # use stun_wire::attribute::ErrorCode;
    /// let error = ErrorCode::with_default_reason(ErrorCode::BAD_REQUEST).unwrap();
    /// assert_eq!(error.reason(), "Bad Request");
    /// ```
    pub fn with_default_reason(code: u16) -> Result<Self, StunError> {
        Self::new(code, Self::default_reason_for_code(code))
    }

    /// The recommended reason phrase for a code, or "Unknown" if there is none.
    pub fn default_reason_for_code(code: u16) -> &'static str {
        match code {
            Self::TRY_ALTERNATE => "Try Alternate",
            Self::BAD_REQUEST => "Bad Request",
            Self::UNAUTHORIZED => "Unauthorized",
            Self::UNKNOWN_ATTRIBUTE => "Unknown Attribute",
            Self::STALE_NONCE => "Stale Nonce",
            Self::ROLE_CONFLICT => "Role Conflict",
            Self::SERVER_ERROR => "Server Error",
            _ => "Unknown",
        }
    }

    /// The numeric error code, class * 100 + number.
    pub fn code(&self) -> u16 {
        self.code
    }

    /// The reason phrase.
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl Setter for ErrorCode {
    fn add_to(&self, msg: &mut Message) -> Result<(), StunError> {
        let mut value = Vec::with_capacity(4 + self.reason.len());
        value.extend_from_slice(&[0, 0, (self.code / 100) as u8, (self.code % 100) as u8]);
        value.extend_from_slice(self.reason.as_bytes());
        msg.add(Self::TYPE, &value)
    }
}

impl Getter for ErrorCode {
    fn get_from(&mut self, msg: &Message) -> Result<(), StunError> {
        let value = msg.get(Self::TYPE)?;
        if value.len() < 4 || value.len() > 4 + Self::REASON_MAX {
            return Err(StunError::AttributeSizeInvalid {
                attr: Self::TYPE,
                size: value.len(),
            });
        }
        let class = (value[2] & 0x7) as u16;
        let number = value[3] as u16;
        if !(3..7).contains(&class) || number > 99 {
            return Err(StunError::BadFormat("error code out of range"));
        }
        self.code = class * 100 + number;
        self.reason = std::str::from_utf8(&value[4..])
            .map_err(|_| StunError::BadFormat("attribute is not valid utf-8"))?
            .to_owned();
        Ok(())
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {} '{}'", Self::TYPE, self.code, self.reason)
    }
}

/// The UNKNOWN-ATTRIBUTES attribute, listing the comprehension-required attribute types
/// of a request that the server did not recognise.  A sequence of 16-bit types.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnknownAttributes {
    attributes: Vec<AttributeType>,
}

impl UnknownAttributes {
    pub const TYPE: AttributeType = AttributeType::new(0x000A);

    /// Create a new [`UnknownAttributes`] from the provided types.
    pub fn new(attrs: &[AttributeType]) -> Self {
        Self {
            attributes: attrs.to_vec(),
        }
    }

    /// Add an attribute type to the list.
    pub fn add_attribute(&mut self, atype: AttributeType) {
        if !self.has_attribute(atype) {
            self.attributes.push(atype);
        }
    }

    /// Whether the specified type is in the list.
    ///
    /// # Examples
    ///
    /// ```
    /// # use stun_wire::attribute::{AttributeType, UnknownAttributes, Username};
    /// let unknown = UnknownAttributes::new(&[Username::TYPE]);
    /// assert!(unknown.has_attribute(Username::TYPE));
    /// assert!(!unknown.has_attribute(AttributeType::new(0x8000)));
    /// ```
    pub fn has_attribute(&self, atype: AttributeType) -> bool {
        self.attributes.contains(&atype)
    }

    /// The listed attribute types.
    pub fn attributes(&self) -> &[AttributeType] {
        &self.attributes
    }
}

impl Setter for UnknownAttributes {
    fn add_to(&self, msg: &mut Message) -> Result<(), StunError> {
        let mut value = vec![0; self.attributes.len() * 2];
        for (chunk, atype) in value.chunks_exact_mut(2).zip(self.attributes.iter()) {
            BigEndian::write_u16(chunk, atype.value());
        }
        msg.add(Self::TYPE, &value)
    }
}

impl Getter for UnknownAttributes {
    fn get_from(&mut self, msg: &Message) -> Result<(), StunError> {
        let value = msg.get(Self::TYPE)?;
        if value.len() % 2 != 0 {
            return Err(StunError::AttributeSizeInvalid {
                attr: Self::TYPE,
                size: value.len(),
            });
        }
        self.attributes.clear();
        for chunk in value.chunks_exact(2) {
            self.attributes
                .push(AttributeType::new(BigEndian::read_u16(chunk)));
        }
        Ok(())
    }
}

impl std::fmt::Display for UnknownAttributes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: [", Self::TYPE)?;
        for (i, atype) in self.attributes.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", atype)?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::Username;

    fn init() {
        crate::tests::test_init_log();
    }

    #[test]
    fn error_code() {
        init();
        let mut msg = Message::new();
        msg.write_header();
        ErrorCode::new(438, "Stale Nonce").unwrap().add_to(&mut msg).unwrap();
        // wire shape: reserved, reserved, class, number
        assert_eq!(&msg.get(ErrorCode::TYPE).unwrap()[..4], &[0, 0, 4, 38]);

        let mut error = ErrorCode::default();
        error.get_from(&msg).unwrap();
        assert_eq!(error.code(), 438);
        assert_eq!(error.reason(), "Stale Nonce");
    }

    #[test]
    fn error_code_out_of_range() {
        init();
        assert!(matches!(
            ErrorCode::new(299, "nope"),
            Err(StunError::OutOfRange { .. })
        ));
        assert!(matches!(
            ErrorCode::new(700, "nope"),
            Err(StunError::OutOfRange { .. })
        ));
    }

    #[test]
    fn error_code_invalid_class() {
        init();
        let mut msg = Message::new();
        msg.write_header();
        msg.add(ErrorCode::TYPE, &[0, 0, 2, 10]).unwrap();
        let mut error = ErrorCode::default();
        assert!(matches!(
            error.get_from(&msg),
            Err(StunError::BadFormat(_))
        ));
    }

    #[test]
    fn unknown_attributes() {
        init();
        let mut msg = Message::new();
        msg.write_header();
        let unknown = UnknownAttributes::new(&[Username::TYPE, AttributeType::new(0x7777)]);
        unknown.add_to(&mut msg).unwrap();
        // two u16 values need no padding on the wire
        assert_eq!(msg.raw().len(), 20 + 4 + 4);

        let mut parsed = UnknownAttributes::default();
        parsed.get_from(&msg).unwrap();
        assert_eq!(parsed, unknown);
        assert!(parsed.has_attribute(Username::TYPE));
    }

    #[test]
    fn unknown_attributes_odd_length() {
        init();
        let mut msg = Message::new();
        msg.write_header();
        msg.add(UnknownAttributes::TYPE, &[0, 6, 0]).unwrap();
        let mut parsed = UnknownAttributes::default();
        assert!(matches!(
            parsed.get_from(&msg),
            Err(StunError::AttributeSizeInvalid { .. })
        ));
    }
}
