//! Conversions between btleplug types and the session's transport types

use std::collections::BTreeSet;

use blepush_core::{CharProperties, GattTarget, TargetAddress};
use btleplug::api::{BDAddr, CharPropFlags, Characteristic, WriteType};

// ----------------------------------------------------------------------------
// Addresses
// ----------------------------------------------------------------------------

/// Textual form reported in discovery events
pub fn address_text(address: &BDAddr) -> String {
    address.to_string()
}

/// Convert an adapter-reported address into a target address
///
/// Returns `None` for the all-zero address some platforms report when the
/// real address is hidden.
pub fn target_address(address: &BDAddr) -> Option<TargetAddress> {
    if address.into_inner() == [0; 6] {
        return None;
    }
    TargetAddress::parse(&address_text(address)).ok()
}

// ----------------------------------------------------------------------------
// Characteristics
// ----------------------------------------------------------------------------

/// Map btleplug property flags onto GATT property bits
pub fn char_properties(flags: CharPropFlags) -> CharProperties {
    CharProperties::from_bits(flags.bits())
}

/// Locate `target` among a peripheral's discovered characteristics
pub fn find_characteristic(
    characteristics: &BTreeSet<Characteristic>,
    target: &GattTarget,
) -> Option<Characteristic> {
    characteristics
        .iter()
        .find(|c| c.uuid == target.characteristic && c.service_uuid == target.service)
        .cloned()
}

pub fn write_type(with_response: bool) -> WriteType {
    if with_response {
        WriteType::WithResponse
    } else {
        WriteType::WithoutResponse
    }
}
