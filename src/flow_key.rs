//! Flow Key Extractor (spec.md §4.D, §8 invariant 3, scenario S4).

use crate::ie::FieldValue;
use crate::record::Record;
use serde::Serialize;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

/// Canonicalized 5-tuple. Addresses are stored pre-rendered in their
/// standard textual form so equality is well-defined across IPv4 and IPv6
/// without re-deriving canonical forms at compare time (spec.md §4.D).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct FlowKey {
    pub source_address: String,
    pub destination_address: String,
    pub protocol: u8,
    pub source_port: u16,
    pub destination_port: u16,
}

impl fmt::Display for FlowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} -> {}:{} proto={}",
            self.source_address, self.source_port, self.destination_address, self.destination_port, self.protocol
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowKeyError {
    /// A required IE (`sourceTransportPort`, `destinationTransportPort`,
    /// `protocolIdentifier`, or an address for one side) is missing or
    /// mistyped.
    Incomplete(&'static str),
}

impl fmt::Display for FlowKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowKeyError::Incomplete(field) => write!(f, "data record missing required field {field}"),
        }
    }
}

impl std::error::Error for FlowKeyError {}

enum Address {
    V4(Ipv4Addr),
    V6(Ipv6Addr),
}

impl Address {
    fn to_canonical_string(&self) -> String {
        match self {
            // Ipv4Addr's Display is already dotted-decimal.
            Address::V4(addr) => addr.to_string(),
            // Ipv6Addr's Display follows RFC 5952 canonical compression.
            Address::V6(addr) => addr.to_string(),
        }
    }
}

/// Resolve one side's address: prefer IPv4 if present, else IPv6. If only
/// the other family is present on this side while the *other* direction
/// used the opposite family, the mismatch is logged and this side fails
/// (spec.md §7 `MixedAddressFamily`, scenario S4).
fn resolve_side(
    record: &Record,
    v4_name: &str,
    v6_name: &str,
    side: &'static str,
) -> Option<Address> {
    match record.get(v4_name) {
        Some(FieldValue::Ipv4Addr(addr)) => return Some(Address::V4(*addr)),
        Some(_) => return None,
        None => {}
    }
    match record.get(v6_name) {
        Some(FieldValue::Ipv6Addr(addr)) => Some(Address::V6(*addr)),
        Some(_) => None,
        None => {
            log::trace!("no {side} address of either family present in record");
            None
        }
    }
}

/// Derive a canonical 5-tuple from a decoded data record.
pub fn extract_flow_key(record: &Record) -> Result<FlowKey, FlowKeyError> {
    let source_port = record
        .get("sourceTransportPort")
        .and_then(FieldValue::as_u16)
        .ok_or(FlowKeyError::Incomplete("sourceTransportPort"))?;
    let destination_port = record
        .get("destinationTransportPort")
        .and_then(FieldValue::as_u16)
        .ok_or(FlowKeyError::Incomplete("destinationTransportPort"))?;
    let protocol = record
        .get("protocolIdentifier")
        .and_then(FieldValue::as_u8)
        .ok_or(FlowKeyError::Incomplete("protocolIdentifier"))?;

    let source_address = resolve_side(record, "sourceIPv4Address", "sourceIPv6Address", "source");
    let destination_address = resolve_side(
        record,
        "destinationIPv4Address",
        "destinationIPv6Address",
        "destination",
    );

    let (source_address, destination_address) = match (source_address, destination_address) {
        (Some(src @ Address::V4(_)), Some(dst @ Address::V4(_))) => (src, dst),
        (Some(src @ Address::V6(_)), Some(dst @ Address::V6(_))) => (src, dst),
        (Some(Address::V4(_)), Some(Address::V6(_))) => {
            log::warn!("mixed address family: source is IPv4, destination is IPv6; discarding destination IPv6 value");
            return Err(FlowKeyError::Incomplete("destinationIPv4Address"));
        }
        (Some(Address::V6(_)), Some(Address::V4(_))) => {
            log::warn!("mixed address family: source is IPv6, destination is IPv4; discarding source IPv6 value");
            return Err(FlowKeyError::Incomplete("sourceIPv4Address"));
        }
        (None, _) => return Err(FlowKeyError::Incomplete("sourceIPv4Address/sourceIPv6Address")),
        (_, None) => {
            return Err(FlowKeyError::Incomplete(
                "destinationIPv4Address/destinationIPv6Address",
            ));
        }
    };

    Ok(FlowKey {
        source_address: source_address.to_canonical_string(),
        destination_address: destination_address.to_canonical_string(),
        protocol,
        source_port,
        destination_port,
    })
}

/// Convenience accessor used by the Correlation Engine's "source-side" test:
/// a record is source-side iff it carries a non-empty `sourcePodName`.
pub fn is_source_side(record: &Record) -> bool {
    record
        .get("sourcePodName")
        .is_some_and(FieldValue::is_non_empty_string)
}
