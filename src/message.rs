//! Set and Message: the shapes the Packet Decoder produces.

use crate::record::Record;
use serde::Serialize;
use std::net::IpAddr;
use std::time::Duration;

pub const TEMPLATE_SET_ID: u16 = 2;
pub const OPTIONS_TEMPLATE_SET_ID: u16 = 3;
pub const MIN_DATA_SET_ID: u16 = 256;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SetBody {
    Template(Vec<Record>),
    Data(Vec<Record>),
}

/// Header (set-id) plus records. Exactly one `Set` per `Message` in this
/// core (spec.md §3).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Set {
    pub set_id: u16,
    pub body: SetBody,
}

impl Set {
    pub fn is_template(&self) -> bool {
        matches!(self.body, SetBody::Template(_))
    }

    pub fn is_data(&self) -> bool {
        matches!(self.body, SetBody::Data(_))
    }

    pub fn records(&self) -> &[Record] {
        match &self.body {
            SetBody::Template(records) | SetBody::Data(records) => records,
        }
    }

    pub fn records_mut(&mut self) -> &mut [Record] {
        match &mut self.body {
            SetBody::Template(records) | SetBody::Data(records) => records,
        }
    }
}

/// A fully decoded IPFIX message (spec.md §3). `version` must be 10.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub version: u16,
    pub length: u16,
    pub export_time: Duration,
    pub sequence_number: u32,
    pub observation_domain_id: u32,
    pub set: Set,
    #[serde(skip)]
    pub exporter_address: IpAddr,
    pub raw_length: usize,
}
