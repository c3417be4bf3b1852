//! Error kinds (spec.md §7).
//!
//! Decoding errors (`MalformedMessage` through `FlowKeyIncomplete`) are
//! non-fatal: the Collecting Process logs them and drops the offending
//! message or record and continues. `ConfigInvalid` is the only variant
//! raised at construction time, refusing to build a misconfigured process.
//! `UnsupportedSet` surfaces from the Packet Decoder for Options Template
//! sets and any other set-id below 256 that isn't 2 or 3; the Collecting
//! Process logs it and drops the message like any other decode failure.
//!
//! `MixedAddressFamily` (spec.md §7) is deliberately not a variant here: per
//! the contract it is a warning, logged via [`log::warn!`] at the call site
//! in [`crate::flow_key`], which then surfaces as `FlowKeyIncomplete` once
//! the discarded side leaves the record without a usable address.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CollectorError {
    #[error("malformed IPFIX message: {0}")]
    MalformedMessage(String),

    #[error(
        "no template for observation_domain_id={observation_domain_id} template_id={template_id}"
    )]
    UnknownTemplate {
        observation_domain_id: u32,
        template_id: u16,
    },

    #[error("unresolvable information element id={element_id} enterprise_id={enterprise_id}")]
    UnknownElement { element_id: u16, enterprise_id: u32 },

    #[error("field {field} decoded to an unexpected type, expected {expected}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
    },

    #[error("data record missing required field {0}")]
    FlowKeyIncomplete(String),

    #[error("unsupported set id {set_id}")]
    UnsupportedSet { set_id: u16 },

    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),
}
