// Copyright (C) 2020 Matthew Waters <matthew@centricular.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::message::{Message, StunError};

use super::{add_text, check_text, get_text, AttributeType, Getter, Setter};

/// The USERNAME attribute, identifying the credentials used for message integrity.
///
/// The value must already be normalised by the caller; this codec only enforces the
/// 513 byte limit of RFC 8489.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Username {
    user: String,
}

impl Username {
    pub const TYPE: AttributeType = AttributeType::new(0x0006);

    const MAX: usize = 513;

    /// Create a new [`Username`].
    ///
    /// # Errors
    ///
    /// - When the username is longer than 513 bytes.
    ///
    /// # Examples
    ///
    /// ```
    /// # use stun_wire::attribute::Username;
    /// let username = Username::new("user").unwrap();
    /// assert_eq!(username.username(), "user");
    /// assert!(Username::new(&"a".repeat(600)).is_err());
    /// ```
    pub fn new(user: &str) -> Result<Self, StunError> {
        check_text(Self::TYPE, user, Self::MAX)?;
        Ok(Self {
            user: user.to_owned(),
        })
    }

    /// The username value.
    pub fn username(&self) -> &str {
        &self.user
    }
}

impl Setter for Username {
    fn add_to(&self, msg: &mut Message) -> Result<(), StunError> {
        add_text(msg, Self::TYPE, &self.user, Self::MAX)
    }
}

impl Getter for Username {
    fn get_from(&mut self, msg: &Message) -> Result<(), StunError> {
        self.user = get_text(msg, Self::TYPE, Self::MAX)?;
        Ok(())
    }
}

impl std::fmt::Display for Username {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: '{}'", Self::TYPE, self.user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init() {
        crate::tests::test_init_log();
    }

    #[test]
    fn username() {
        init();
        let mut msg = Message::new();
        msg.write_header();
        Username::new("username").unwrap().add_to(&mut msg).unwrap();

        let mut user = Username::default();
        user.get_from(&msg).unwrap();
        assert_eq!(user.username(), "username");
    }

    #[test]
    fn username_too_long() {
        init();
        let long = "a".repeat(600);
        assert!(matches!(
            Username::new(&long),
            Err(StunError::AttributeSizeOverflow {
                attr: Username::TYPE,
                size: 600,
                max: 513,
            })
        ));
    }

    #[test]
    fn username_not_found() {
        init();
        let mut msg = Message::new();
        msg.write_header();
        let mut user = Username::default();
        assert!(matches!(
            user.get_from(&msg),
            Err(StunError::AttributeNotFound(Username::TYPE))
        ));
    }

    #[test]
    fn username_invalid_utf8() {
        init();
        let mut msg = Message::new();
        msg.write_header();
        msg.add(Username::TYPE, &[0xff, 0xfe, 0xfd]).unwrap();
        let mut user = Username::default();
        assert!(matches!(
            user.get_from(&msg),
            Err(StunError::BadFormat(_))
        ));
    }
}
