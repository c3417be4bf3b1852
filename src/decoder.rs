//! Packet Decoder (spec.md §4.A).
//!
//! Parses one IPFIX message from a byte buffer, network byte order
//! throughout. Built over `nom` the way the teacher's
//! `variable_versions::ipfix` module parses Template and Data sets — fixed
//! header fields read with plain combinators, template-driven data fields
//! read positionally against whatever the Template Catalog currently holds.
//! Unlike the teacher, resolution goes through a caller-supplied
//! [`Registries`] rather than a single hard-coded IANA enum, and a message
//! holds exactly one [`Set`] (spec.md §3).

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::Arc;
use std::time::Duration;

use nom::IResult;
use nom::bytes::complete::take;
use nom::number::complete::{be_i16, be_i32, be_i64, be_i8, be_u8, be_u16, be_u32, be_u64, be_u128};

use crate::error::CollectorError;
use crate::ie::{FieldValue, IeDataType, InformationElement};
use crate::message::{Message, Set, SetBody, MIN_DATA_SET_ID, OPTIONS_TEMPLATE_SET_ID, TEMPLATE_SET_ID};
use crate::record::Record;
use crate::registry::Registries;
use crate::template_catalog::TemplateCatalog;

const IPFIX_VERSION: u16 = 10;
const MESSAGE_HEADER_LEN: usize = 16;
const SET_HEADER_LEN: usize = 4;
const ENTERPRISE_BIT: u16 = 0x8000;

struct MessageHeader {
    version: u16,
    length: u16,
    export_time: u32,
    sequence_number: u32,
    observation_domain_id: u32,
}

fn parse_message_header(i: &[u8]) -> IResult<&[u8], MessageHeader> {
    let (i, version) = be_u16(i)?;
    let (i, length) = be_u16(i)?;
    let (i, export_time) = be_u32(i)?;
    let (i, sequence_number) = be_u32(i)?;
    let (i, observation_domain_id) = be_u32(i)?;
    Ok((
        i,
        MessageHeader {
            version,
            length,
            export_time,
            sequence_number,
            observation_domain_id,
        },
    ))
}

struct SetHeader {
    set_id: u16,
    length: u16,
}

fn parse_set_header(i: &[u8]) -> IResult<&[u8], SetHeader> {
    let (i, set_id) = be_u16(i)?;
    let (i, length) = be_u16(i)?;
    Ok((i, SetHeader { set_id, length }))
}

fn malformed<'a, T>(result: IResult<&'a [u8], T>, what: &str) -> Result<(&'a [u8], T), CollectorError> {
    result.map_err(|e| CollectorError::MalformedMessage(format!("{what}: {e}")))
}

/// Decode one IPFIX message. `buf` must be positioned at the first byte of
/// the message; bytes beyond the declared `total-length` are ignored and
/// left untouched by the caller. Newly-arrived Template Records are
/// registered into `catalog` as a side effect, mirroring the teacher's
/// `Set::parse` `PostExec` hook that saves templates as it parses them.
pub fn decode_message(
    buf: &[u8],
    exporter_address: IpAddr,
    catalog: &Arc<TemplateCatalog>,
    registries: &Registries,
) -> Result<Message, CollectorError> {
    if buf.len() < MESSAGE_HEADER_LEN + SET_HEADER_LEN {
        return Err(CollectorError::MalformedMessage(
            "buffer shorter than message + set header".to_string(),
        ));
    }

    let (_, header) = malformed(parse_message_header(buf), "message header")?;

    if header.version != IPFIX_VERSION {
        return Err(CollectorError::MalformedMessage(format!(
            "unsupported version {}, expected {IPFIX_VERSION}",
            header.version
        )));
    }

    let total_len = header.length as usize;
    if total_len > buf.len() {
        return Err(CollectorError::MalformedMessage(format!(
            "declared length {total_len} exceeds buffer of {} bytes",
            buf.len()
        )));
    }
    if total_len < MESSAGE_HEADER_LEN + SET_HEADER_LEN {
        return Err(CollectorError::MalformedMessage(format!(
            "declared length {total_len} too short to hold a set"
        )));
    }

    let after_header = &buf[MESSAGE_HEADER_LEN..total_len];
    let (after_set_header, set_header) = malformed(parse_set_header(after_header), "set header")?;

    let set_body_len = (set_header.length as usize)
        .checked_sub(SET_HEADER_LEN)
        .ok_or_else(|| CollectorError::MalformedMessage("set length underflows its header".into()))?;
    if set_body_len > after_set_header.len() {
        return Err(CollectorError::MalformedMessage(
            "set length exceeds remaining message bytes".to_string(),
        ));
    }
    let set_bytes = &after_set_header[..set_body_len];

    let set = match set_header.set_id {
        TEMPLATE_SET_ID => decode_template_set(set_bytes, registries)?,
        OPTIONS_TEMPLATE_SET_ID => {
            return Err(CollectorError::UnsupportedSet {
                set_id: OPTIONS_TEMPLATE_SET_ID,
            });
        }
        id if id >= MIN_DATA_SET_ID => {
            let fields = catalog
                .get(header.observation_domain_id, id)
                .ok_or(CollectorError::UnknownTemplate {
                    observation_domain_id: header.observation_domain_id,
                    template_id: id,
                })?;
            decode_data_set(set_bytes, id, &fields)?
        }
        other => return Err(CollectorError::UnsupportedSet { set_id: other }),
    };

    if let SetBody::Template(records) = &set.body {
        for record in records {
            let fields = record.iter().map(|v| v.element.clone()).collect();
            catalog.add(header.observation_domain_id, record.template_id, fields);
        }
    }

    Ok(Message {
        version: header.version,
        length: header.length,
        export_time: Duration::from_secs(header.export_time as u64),
        sequence_number: header.sequence_number,
        observation_domain_id: header.observation_domain_id,
        set,
        exporter_address,
        raw_length: total_len,
    })
}

fn decode_template_set(mut bytes: &[u8], registries: &Registries) -> Result<Set, CollectorError> {
    let mut records = Vec::new();

    while !bytes.is_empty() {
        let (rest, template_id) = malformed(be_u16(bytes), "template id")?;
        let (rest, field_count) = malformed(be_u16(rest), "field count")?;

        let mut record = Record::new_template(template_id);
        let mut remaining = rest;

        for _ in 0..field_count {
            let (rest, raw_element_id) = malformed(be_u16(remaining), "field element id")?;
            let (rest, element_length) = malformed(be_u16(rest), "field element length")?;

            let (element_id, enterprise_id, rest) = if raw_element_id & ENTERPRISE_BIT != 0 {
                let (rest, enterprise_id) = malformed(be_u32(rest), "enterprise id")?;
                (raw_element_id & !ENTERPRISE_BIT, enterprise_id, rest)
            } else {
                (raw_element_id, 0u32, rest)
            };

            let element = registries
                .resolve(element_id, enterprise_id)
                .ok_or(CollectorError::UnknownElement {
                    element_id,
                    enterprise_id,
                })?
                .with_wire_length(element_length);

            record.append(element, None);
            remaining = rest;
        }

        records.push(record);
        bytes = remaining;
    }

    Ok(Set {
        set_id: TEMPLATE_SET_ID,
        body: SetBody::Template(records),
    })
}

fn decode_data_set(
    mut bytes: &[u8],
    template_id: u16,
    fields: &[InformationElement],
) -> Result<Set, CollectorError> {
    // A record's wire width is the sum of its fields' declared lengths. A
    // template with no fields, or whose fields all declare zero length,
    // would make every loop iteration below consume zero bytes — a
    // crafted-but-parseable data set could then hang/OOM pushing empty
    // records forever (spec.md §4.A, §7 MalformedMessage policy).
    let record_len: usize = fields.iter().map(|field| field.length as usize).sum();
    if record_len == 0 {
        return Err(CollectorError::MalformedMessage(format!(
            "data set references template {template_id} with zero-width fields"
        )));
    }

    let mut records = Vec::new();

    // Stop once fewer than one record's worth of bytes remain rather than
    // erroring: RFC 7011 §3.3.2 allows padding after the last record in a
    // set, which is shorter than a full record and not itself a record.
    while bytes.len() >= record_len {
        let mut record = Record::new_data(template_id);
        let mut remaining = bytes;

        for field in fields {
            let (rest, value) = decode_field_value(remaining, field)?;
            record.append(field.clone(), Some(value));
            remaining = rest;
        }

        records.push(record);
        bytes = remaining;
    }

    Ok(Set {
        set_id: template_id,
        body: SetBody::Data(records),
    })
}

fn decode_field_value<'a>(
    i: &'a [u8],
    element: &InformationElement,
) -> Result<(&'a [u8], FieldValue), CollectorError> {
    match element.data_type {
        IeDataType::UnsignedInt => {
            let (rest, n) = decode_unsigned(i, element.length)?;
            Ok((rest, FieldValue::UnsignedInt(n)))
        }
        IeDataType::SignedInt => {
            let (rest, n) = decode_signed(i, element.length)?;
            Ok((rest, FieldValue::SignedInt(n)))
        }
        IeDataType::Ipv4Addr => {
            let (rest, v) = malformed(be_u32(i), "ipv4 address")?;
            Ok((rest, FieldValue::Ipv4Addr(Ipv4Addr::from(v))))
        }
        IeDataType::Ipv6Addr => {
            let (rest, v) = malformed(be_u128(i), "ipv6 address")?;
            Ok((rest, FieldValue::Ipv6Addr(Ipv6Addr::from(v))))
        }
        IeDataType::String => {
            let (rest, raw) = malformed(take(element.length)(i), "string")?;
            Ok((rest, FieldValue::String(String::from_utf8_lossy(raw).into_owned())))
        }
        IeDataType::OctetArray => {
            let (rest, raw) = malformed(take(element.length)(i), "octet array")?;
            Ok((rest, FieldValue::OctetArray(raw.to_vec())))
        }
        IeDataType::DateTimeSeconds => {
            let (rest, secs) = malformed(be_u32(i), "seconds timestamp")?;
            Ok((rest, FieldValue::DateTimeSeconds(Duration::from_secs(secs as u64))))
        }
    }
}

fn decode_unsigned(i: &[u8], length: u16) -> Result<(&[u8], u64), CollectorError> {
    match length {
        1 => malformed(be_u8(i), "u8").map(|(r, v)| (r, v as u64)),
        2 => malformed(be_u16(i), "u16").map(|(r, v)| (r, v as u64)),
        4 => malformed(be_u32(i), "u32").map(|(r, v)| (r, v as u64)),
        8 => malformed(be_u64(i), "u64").map(|(r, v)| (r, v)),
        other => Err(CollectorError::TypeMismatch {
            field: format!("{other}-byte unsigned integer"),
            expected: "1, 2, 4 or 8 byte width",
        }),
    }
}

fn decode_signed(i: &[u8], length: u16) -> Result<(&[u8], i64), CollectorError> {
    match length {
        1 => malformed(be_i8(i), "i8").map(|(r, v)| (r, v as i64)),
        2 => malformed(be_i16(i), "i16").map(|(r, v)| (r, v as i64)),
        4 => malformed(be_i32(i), "i32").map(|(r, v)| (r, v as i64)),
        8 => malformed(be_i64(i), "i64").map(|(r, v)| (r, v)),
        other => Err(CollectorError::TypeMismatch {
            field: format!("{other}-byte signed integer"),
            expected: "1, 2, 4 or 8 byte width",
        }),
    }
}
