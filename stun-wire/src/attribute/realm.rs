// Copyright (C) 2020 Matthew Waters <matthew@centricular.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::message::{Message, StunError};

use super::{add_text, check_text, get_text, AttributeType, Getter, Setter};

/// The REALM attribute of the long-term credential mechanism.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Realm {
    realm: String,
}

impl Realm {
    pub const TYPE: AttributeType = AttributeType::new(0x0014);

    const MAX: usize = 763;

    /// Create a new [`Realm`], enforcing the 763 byte limit.
    ///
    /// # Examples
    ///
    /// ```
    /// # use stun_wire::attribute::Realm;
    /// let realm = Realm::new("example.org").unwrap();
    /// assert_eq!(realm.realm(), "example.org");
    /// ```
    pub fn new(realm: &str) -> Result<Self, StunError> {
        check_text(Self::TYPE, realm, Self::MAX)?;
        Ok(Self {
            realm: realm.to_owned(),
        })
    }

    /// The realm value.
    pub fn realm(&self) -> &str {
        &self.realm
    }
}

impl Setter for Realm {
    fn add_to(&self, msg: &mut Message) -> Result<(), StunError> {
        add_text(msg, Self::TYPE, &self.realm, Self::MAX)
    }
}

impl Getter for Realm {
    fn get_from(&mut self, msg: &Message) -> Result<(), StunError> {
        self.realm = get_text(msg, Self::TYPE, Self::MAX)?;
        Ok(())
    }
}

impl std::fmt::Display for Realm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", Self::TYPE, self.realm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn realm() {
        crate::tests::test_init_log();
        let mut msg = Message::new();
        msg.write_header();
        Realm::new("realm").unwrap().add_to(&mut msg).unwrap();
        let mut realm = Realm::default();
        realm.get_from(&msg).unwrap();
        assert_eq!(realm.realm(), "realm");

        assert!(matches!(
            Realm::new(&"r".repeat(1024)),
            Err(StunError::AttributeSizeOverflow { .. })
        ));
    }
}
