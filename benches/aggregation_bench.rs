use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use ipfix_collector::aggregation::aggregate_message;
use ipfix_collector::correlation::FlowRecordStore;
use ipfix_collector::ie::{FieldValue, IeDataType, InformationElement};
use ipfix_collector::message::{Message, Set, SetBody};
use ipfix_collector::record::Record;

fn ie(name: &'static str, id: u16, dt: IeDataType) -> InformationElement {
    InformationElement::new(name, id, 0, dt, 0)
}

fn data_message(port: u16, pod_name: &str) -> Message {
    let mut record = Record::new_data(256);
    record.append(
        ie("sourceIPv4Address", 8, IeDataType::Ipv4Addr),
        Some(FieldValue::Ipv4Addr(Ipv4Addr::new(10, 0, 0, 1))),
    );
    record.append(
        ie("destinationIPv4Address", 12, IeDataType::Ipv4Addr),
        Some(FieldValue::Ipv4Addr(Ipv4Addr::new(10, 0, 0, 2))),
    );
    record.append(
        ie("sourceTransportPort", 7, IeDataType::UnsignedInt),
        Some(FieldValue::UnsignedInt(port as u64)),
    );
    record.append(
        ie("destinationTransportPort", 11, IeDataType::UnsignedInt),
        Some(FieldValue::UnsignedInt(80)),
    );
    record.append(
        ie("protocolIdentifier", 4, IeDataType::UnsignedInt),
        Some(FieldValue::UnsignedInt(6)),
    );
    record.append(
        ie("sourcePodName", 1, IeDataType::String),
        Some(FieldValue::String(pod_name.to_string())),
    );

    Message {
        version: 10,
        length: 0,
        export_time: Duration::from_secs(1),
        sequence_number: 1,
        observation_domain_id: 1,
        set: Set {
            set_id: 256,
            body: SetBody::Data(vec![record]),
        },
        exporter_address: IpAddr::V4(Ipv4Addr::new(192, 168, 1, 1)),
        raw_length: 0,
    }
}

/// One flow key, many distinct source-side records landing on it back to
/// back — the dedup rule keeps only source-side records, so the store
/// never grows past one entry but still does a partition-and-rebuild on
/// every call.
fn aggregate_repeated_source_records(c: &mut Criterion) {
    let store = FlowRecordStore::new();
    let fields = vec!["destinationPodName".to_string()];

    c.bench_function("aggregate repeated source-side records, one flow", |b| {
        b.iter(|| {
            let message = data_message(1234, "pod-a");
            aggregate_message(black_box(message), &store, &fields).unwrap();
        })
    });
}

/// Spread across many distinct flow keys (varying source port), exercising
/// hash map growth in the Flow Record Store rather than single-key churn.
fn aggregate_many_flow_keys(c: &mut Criterion) {
    c.bench_function("aggregate 1000 distinct flow keys", |b| {
        b.iter(|| {
            let store = FlowRecordStore::new();
            let fields = vec!["destinationPodName".to_string()];
            for port in 0u16..1000 {
                let message = data_message(port, "pod-a");
                aggregate_message(message, &store, &fields).unwrap();
            }
            black_box(store.total_records());
        })
    });
}

criterion_group!(
    benches,
    aggregate_repeated_source_records,
    aggregate_many_flow_keys
);
criterion_main!(benches);
