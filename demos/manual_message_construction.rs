//! Builds a `Message` by hand (no wire bytes involved) and pushes it
//! through the Aggregation Process's per-message handler, the way the
//! teacher's `manual_ipfix_creation` demo constructs packets in-process for
//! exercising downstream consumers without a real exporter.

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use ipfix_collector::aggregation::aggregate_message;
use ipfix_collector::correlation::FlowRecordStore;
use ipfix_collector::ie::{FieldValue, IeDataType, InformationElement};
use ipfix_collector::message::{Message, Set, SetBody};
use ipfix_collector::record::Record;

fn ie(name: &'static str, id: u16, enterprise_id: u32, data_type: IeDataType) -> InformationElement {
    InformationElement::new(name, id, enterprise_id, data_type, 0)
}

fn main() {
    let mut record = Record::new_data(256);
    record.append(
        ie("sourceIPv4Address", 8, 0, IeDataType::Ipv4Addr),
        Some(FieldValue::Ipv4Addr(Ipv4Addr::new(10, 1, 2, 3))),
    );
    record.append(
        ie("destinationIPv4Address", 12, 0, IeDataType::Ipv4Addr),
        Some(FieldValue::Ipv4Addr(Ipv4Addr::new(10, 1, 2, 4))),
    );
    record.append(
        ie("sourceTransportPort", 7, 0, IeDataType::UnsignedInt),
        Some(FieldValue::UnsignedInt(54321)),
    );
    record.append(
        ie("destinationTransportPort", 11, 0, IeDataType::UnsignedInt),
        Some(FieldValue::UnsignedInt(443)),
    );
    record.append(
        ie("protocolIdentifier", 4, 0, IeDataType::UnsignedInt),
        Some(FieldValue::UnsignedInt(6)),
    );
    record.append(
        ie("sourcePodName", 1, 56506, IeDataType::String),
        Some(FieldValue::String("checkout-7f9b".to_string())),
    );

    let message = Message {
        version: 10,
        length: 0,
        export_time: Duration::from_secs(1_700_000_000),
        sequence_number: 1,
        observation_domain_id: 1,
        set: Set {
            set_id: 256,
            body: SetBody::Data(vec![record]),
        },
        exporter_address: IpAddr::V4(Ipv4Addr::new(192, 168, 10, 1)),
        raw_length: 0,
    };

    let store = FlowRecordStore::new();
    let correlate_fields = vec!["destinationPodName".to_string()];
    aggregate_message(message, &store, &correlate_fields).expect("aggregate");

    store
        .for_all_records_do::<std::convert::Infallible>(|key, records| {
            println!("{key}: {records:?}");
            Ok(())
        })
        .unwrap();
}
