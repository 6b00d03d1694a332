//! Target address parsing and matching
//!
//! Peripherals are identified by a 6-octet Bluetooth device address written
//! as `XX:XX:XX:XX:XX:XX`. The target is parsed once, before any transport
//! resource is touched, and discovered addresses are compared against it
//! case-insensitively.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SessionError;

/// Length of the textual address form (`AA:BB:CC:DD:EE:FF`)
pub const ADDRESS_TEXT_LEN: usize = 17;

// ----------------------------------------------------------------------------
// Target Address
// ----------------------------------------------------------------------------

/// Immutable 6-octet peripheral address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TargetAddress([u8; 6]);

impl TargetAddress {
    /// Create an address from raw octets
    pub const fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    /// Parse the 17-character colon-separated form
    pub fn parse(input: &str) -> Result<Self, SessionError> {
        let reject = |reason: &str| SessionError::Argument {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        if input.len() != ADDRESS_TEXT_LEN {
            return Err(reject("expected 17 characters"));
        }

        let mut octets = [0u8; 6];
        let mut groups = input.split(':');
        for octet in octets.iter_mut() {
            let group = groups
                .next()
                .ok_or_else(|| reject("expected 6 colon-separated groups"))?;
            if group.len() != 2 {
                return Err(reject("each group must be 2 hex digits"));
            }
            let mut decoded = [0u8; 1];
            hex::decode_to_slice(group, &mut decoded)
                .map_err(|_| reject("groups must be hexadecimal"))?;
            *octet = decoded[0];
        }
        if groups.next().is_some() {
            return Err(reject("expected 6 colon-separated groups"));
        }

        Ok(Self(octets))
    }

    /// Raw octets, most significant first
    pub fn octets(&self) -> [u8; 6] {
        self.0
    }

    /// Check a discovered address against this target
    pub fn matches(&self, discovered: &str) -> bool {
        AddressMatcher::new(*self).matches(discovered)
    }
}

impl fmt::Display for TargetAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            a, b, c, d, e, g
        )
    }
}

impl FromStr for TargetAddress {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TargetAddress {
    type Error = SessionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TargetAddress> for String {
    fn from(address: TargetAddress) -> Self {
        address.to_string()
    }
}

// ----------------------------------------------------------------------------
// Address Matching
// ----------------------------------------------------------------------------

/// Compares discovered device addresses against a target
#[derive(Debug, Clone, Copy)]
pub struct AddressMatcher {
    target: TargetAddress,
}

impl AddressMatcher {
    pub fn new(target: TargetAddress) -> Self {
        Self { target }
    }

    pub fn target(&self) -> TargetAddress {
        self.target
    }

    /// Exact match after normalization; malformed input never matches
    pub fn matches(&self, discovered: &str) -> bool {
        TargetAddress::parse(discovered.trim())
            .map(|address| address == self.target)
            .unwrap_or(false)
    }
}
