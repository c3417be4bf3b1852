//! Information Element model.
//!
//! An [`InformationElement`] is a catalog entry — (name, element-id,
//! enterprise-id, data-type, length) — identified by (element-id,
//! enterprise-id) and immutable once registered. [`FieldValue`] is the
//! concrete decoded value bound to one; its variant always matches the
//! element's [`IeDataType`].

use serde::Serialize;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::time::Duration;

/// Numeric element identifier as carried on the wire (enterprise bit already
/// cleared).
pub type ElementId = u16;

/// Enterprise (PEN) namespace id; `0` means IANA.
pub type EnterpriseId = u32;

/// The decoding strategy for a value bound to an [`InformationElement`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IeDataType {
    UnsignedInt,
    SignedInt,
    Ipv4Addr,
    Ipv6Addr,
    String,
    OctetArray,
    DateTimeSeconds,
}

/// One catalog entry: a typed, named field definition.
///
/// `length` is the *nominal* width a registry advertises for the element;
/// the wire is the final authority — a template field specifier always
/// carries its own `element-length`, which the decoder uses in place of
/// this value (RFC 7011 §3.2).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InformationElement {
    pub name: &'static str,
    pub element_id: ElementId,
    pub enterprise_id: EnterpriseId,
    pub data_type: IeDataType,
    pub length: u16,
}

impl InformationElement {
    pub const fn new(
        name: &'static str,
        element_id: ElementId,
        enterprise_id: EnterpriseId,
        data_type: IeDataType,
        length: u16,
    ) -> Self {
        Self {
            name,
            element_id,
            enterprise_id,
            data_type,
            length,
        }
    }

    /// Same identity, overriding the length with one read off the wire.
    pub fn with_wire_length(&self, length: u16) -> Self {
        Self {
            length,
            ..self.clone()
        }
    }
}

/// A value decoded for one [`InformationElement`]. The variant always
/// matches the element's `data_type`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum FieldValue {
    UnsignedInt(u64),
    SignedInt(i64),
    Ipv4Addr(Ipv4Addr),
    Ipv6Addr(Ipv6Addr),
    String(String),
    OctetArray(Vec<u8>),
    DateTimeSeconds(Duration),
}

impl FieldValue {
    /// Non-empty per the §7 `sourcePodName` / "source-side" definition —
    /// used by the Correlation Engine, not a general string predicate.
    pub fn is_non_empty_string(&self) -> bool {
        matches!(self, FieldValue::String(s) if !s.is_empty())
    }

    pub fn as_u16(&self) -> Option<u16> {
        match self {
            FieldValue::UnsignedInt(v) => u16::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_u8(&self) -> Option<u8> {
        match self {
            FieldValue::UnsignedInt(v) => u8::try_from(*v).ok(),
            _ => None,
        }
    }
}
