// Copyright (C) 2020 Matthew Waters <matthew@centricular.com>
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::message::{Message, StunError};

use super::{add_text, check_text, get_text, AttributeType, Getter, Setter};

/// The NONCE attribute of the long-term credential mechanism.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Nonce {
    nonce: String,
}

impl Nonce {
    pub const TYPE: AttributeType = AttributeType::new(0x0015);

    const MAX: usize = 763;

    /// Create a new [`Nonce`], enforcing the 763 byte limit.
    ///
    /// # Examples
    ///
    /// ```
    /// # use stun_wire::attribute::Nonce;
    /// let nonce = Nonce::new("nonce").unwrap();
    /// assert_eq!(nonce.nonce(), "nonce");
    /// ```
    pub fn new(nonce: &str) -> Result<Self, StunError> {
        check_text(Self::TYPE, nonce, Self::MAX)?;
        Ok(Self {
            nonce: nonce.to_owned(),
        })
    }

    /// The nonce value.
    pub fn nonce(&self) -> &str {
        &self.nonce
    }
}

impl Setter for Nonce {
    fn add_to(&self, msg: &mut Message) -> Result<(), StunError> {
        add_text(msg, Self::TYPE, &self.nonce, Self::MAX)
    }
}

impl Getter for Nonce {
    fn get_from(&mut self, msg: &Message) -> Result<(), StunError> {
        self.nonce = get_text(msg, Self::TYPE, Self::MAX)?;
        Ok(())
    }
}

impl std::fmt::Display for Nonce {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", Self::TYPE, self.nonce)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nonce() {
        crate::tests::test_init_log();
        let mut msg = Message::new();
        msg.write_header();
        Nonce::new("example.org").unwrap().add_to(&mut msg).unwrap();
        assert_eq!(msg.get(Nonce::TYPE).unwrap(), b"example.org");

        let mut nonce = Nonce::default();
        nonce.get_from(&msg).unwrap();
        assert_eq!(nonce.nonce(), "example.org");

        assert!(matches!(
            Nonce::new(&"n".repeat(1024)),
            Err(StunError::AttributeSizeOverflow { .. })
        ));
    }
}
