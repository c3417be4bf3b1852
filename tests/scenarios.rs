//! Cross-module integration tests for the scenarios enumerated in spec.md §8.
//!
//! Unlike the unit tests alongside each module, these wire the Packet
//! Decoder, Template Catalog, and Aggregation Process together the way an
//! embedding application would, the way the teacher's own `tests/` crate
//! integration suite exercises `NetflowParser` end to end rather than one
//! parser stage at a time.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use pretty_assertions::assert_eq;

use ipfix_collector::aggregation::aggregate_message;
use ipfix_collector::correlation::FlowRecordStore;
use ipfix_collector::decoder::decode_message;
use ipfix_collector::error::CollectorError;
use ipfix_collector::flow_key::FlowKey;
use ipfix_collector::ie::FieldValue;
use ipfix_collector::registry::{Registries, FLOW_VISIBILITY_ENTERPRISE_ID};
use ipfix_collector::template_catalog::{TemplateCatalog, Transport};

fn be16(v: u16) -> [u8; 2] {
    v.to_be_bytes()
}

fn patch_length(msg: &mut Vec<u8>) {
    let len = msg.len() as u16;
    msg[2..4].copy_from_slice(&be16(len));
}

fn header(seq: u32, obs: u32) -> Vec<u8> {
    let mut h = vec![0, 10, 0, 0];
    h.extend_from_slice(&[0, 0, 0, 1]); // export_time
    h.extend_from_slice(&seq.to_be_bytes());
    h.extend_from_slice(&obs.to_be_bytes());
    h
}

/// Template with {sourceIPv4Address, destinationIPv4Address,
/// protocolIdentifier, sourceTransportPort, destinationTransportPort,
/// sourcePodName (enterprise 56506)}. `pod_name_len` is the fixed wire
/// width for `sourcePodName` this decoder uses positionally — every data
/// record built against this template must carry exactly that many bytes
/// for the field (this core does not support IPFIX variable-length
/// encoding, per spec.md §4.A "read exactly element-length bytes").
fn s1_template_message(obs: u32, template_id: u16, pod_name_len: u16) -> Vec<u8> {
    let mut msg = header(1, obs);
    let mut set = vec![0, 2, 0, 0]; // set header, length patched below
    set.extend_from_slice(&template_id.to_be_bytes());
    set.extend_from_slice(&be16(6)); // field count
    set.extend_from_slice(&[0, 8, 0, 4]); // sourceIPv4Address
    set.extend_from_slice(&[0, 12, 0, 4]); // destinationIPv4Address
    set.extend_from_slice(&[0, 4, 0, 1]); // protocolIdentifier
    set.extend_from_slice(&[0, 7, 0, 2]); // sourceTransportPort
    set.extend_from_slice(&[0, 11, 0, 2]); // destinationTransportPort
    // enterprise field: top bit set on element id 1, enterprise 56506
    set.extend_from_slice(&[0x80, 1]);
    set.extend_from_slice(&be16(pod_name_len));
    set.extend_from_slice(&FLOW_VISIBILITY_ENTERPRISE_ID.to_be_bytes());
    let set_len = set.len() as u16;
    set[2..4].copy_from_slice(&be16(set_len));
    msg.extend_from_slice(&set);
    patch_length(&mut msg);
    msg
}

/// Data record matching `s1_template_message`; `pod_name` must be exactly
/// as many bytes as that template's `pod_name_len`.
fn s1_data_message(obs: u32, template_id: u16, seq: u32, pod_name: &str) -> Vec<u8> {
    let mut msg = header(seq, obs);
    let mut set = template_id.to_be_bytes().to_vec();
    set.extend_from_slice(&[0, 0]); // length placeholder
    set.extend_from_slice(&[10, 0, 0, 1]); // sourceIPv4Address
    set.extend_from_slice(&[10, 0, 0, 2]); // destinationIPv4Address
    set.push(6); // protocolIdentifier = TCP
    set.extend_from_slice(&be16(1234)); // sourceTransportPort
    set.extend_from_slice(&be16(80)); // destinationTransportPort
    set.extend_from_slice(pod_name.as_bytes());
    let set_len = set.len() as u16;
    set[2..4].copy_from_slice(&be16(set_len));
    msg.extend_from_slice(&set);
    patch_length(&mut msg);
    msg
}

#[test]
fn s1_template_then_data_single_flow() {
    let catalog = TemplateCatalog::new(Transport::Tcp, Duration::from_secs(60));
    let registries = Registries::default();
    let exporter = IpAddr::V4(Ipv4Addr::new(192, 168, 1, 1));
    let store = FlowRecordStore::new();
    let correlate_fields = vec!["destinationPodName".to_string()];

    let template = s1_template_message(1, 256, 5);
    let msg = decode_message(&template, exporter, &catalog, &registries).expect("template decodes");
    aggregate_message(msg, &store, &correlate_fields).expect("aggregate template");

    let data = s1_data_message(1, 256, 2, "pod-a");
    let msg = decode_message(&data, exporter, &catalog, &registries).expect("data decodes");
    aggregate_message(msg, &store, &correlate_fields).expect("aggregate data");

    let expected_key = FlowKey {
        source_address: "10.0.0.1".to_string(),
        destination_address: "10.0.0.2".to_string(),
        protocol: 6,
        source_port: 1234,
        destination_port: 80,
    };

    assert_eq!(store.len(), 1);
    store
        .for_all_records_do::<()>(|key, records| {
            assert_eq!(key, &expected_key);
            assert_eq!(records.len(), 1);
            assert_eq!(
                records[0].get("sourcePodName"),
                Some(&FieldValue::String("pod-a".to_string()))
            );
            assert!(records[0].has_element("originalExporterIPv4Address"));
            assert!(records[0].has_element("originalObservationDomainId"));
            Ok(())
        })
        .unwrap();
}

#[test]
fn s2_destination_first_then_source_correlates_and_dedups() {
    let catalog = TemplateCatalog::new(Transport::Tcp, Duration::from_secs(60));
    let registries = Registries::default();
    let exporter = IpAddr::V4(Ipv4Addr::new(192, 168, 1, 1));
    let store = FlowRecordStore::new();
    let correlate_fields = vec!["destinationPodName".to_string()];

    // Destination-side record arrives first, against its own template
    // (sourcePodName fixed at zero width, so it always decodes empty).
    let destination_template = s1_template_message(1, 257, 0);
    let msg = decode_message(&destination_template, exporter, &catalog, &registries).unwrap();
    aggregate_message(msg, &store, &correlate_fields).unwrap();

    let destination_first = s1_data_message(1, 257, 2, "");
    let msg = decode_message(&destination_first, exporter, &catalog, &registries).unwrap();
    aggregate_message(msg, &store, &correlate_fields).unwrap();

    store
        .for_all_records_do::<()>(|_key, records| {
            assert_eq!(records.len(), 1);
            assert!(!records[0]
                .get("sourcePodName")
                .unwrap()
                .is_non_empty_string());
            Ok(())
        })
        .unwrap();

    // Source-side record arrives second, against the 5-byte-pod-name
    // template, for the same flow key.
    let source_template = s1_template_message(1, 256, 5);
    let msg = decode_message(&source_template, exporter, &catalog, &registries).unwrap();
    aggregate_message(msg, &store, &correlate_fields).unwrap();

    let source_second = s1_data_message(1, 256, 3, "pod-a");
    let msg = decode_message(&source_second, exporter, &catalog, &registries).unwrap();
    aggregate_message(msg, &store, &correlate_fields).unwrap();

    store
        .for_all_records_do::<()>(|_key, records| {
            assert_eq!(records.len(), 1);
            assert_eq!(
                records[0].get("sourcePodName"),
                Some(&FieldValue::String("pod-a".to_string()))
            );
            Ok(())
        })
        .unwrap();
}

#[test]
fn s3_udp_template_ttl_expiry_yields_unknown_template() {
    let catalog = TemplateCatalog::new(Transport::Udp, Duration::from_millis(50));
    let registries = Registries::default();
    let exporter = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));

    let template = s1_template_message(1, 256, 5);
    decode_message(&template, exporter, &catalog, &registries).unwrap();
    assert!(catalog.get(1, 256).is_some());

    thread::sleep(Duration::from_millis(200));

    let data = s1_data_message(1, 256, 2, "pod-a");
    let err = decode_message(&data, exporter, &catalog, &registries).unwrap_err();
    assert!(matches!(err, CollectorError::UnknownTemplate { .. }));
}

#[test]
fn s3_readding_template_cancels_prior_ttl() {
    let catalog = TemplateCatalog::new(Transport::Udp, Duration::from_millis(80));
    let registries = Registries::default();
    let exporter = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));

    let template = s1_template_message(1, 256, 5);
    decode_message(&template, exporter, &catalog, &registries).unwrap();

    thread::sleep(Duration::from_millis(40));
    // Re-add before the first TTL fires.
    decode_message(&template, exporter, &catalog, &registries).unwrap();

    thread::sleep(Duration::from_millis(60));
    // First timer (40 + 60 = 100ms > 80ms) would have fired by now, but its
    // generation is stale.
    assert!(catalog.get(1, 256).is_some());
}

#[test]
fn s5_enterprise_element_resolves_through_enterprise_registry() {
    let catalog = TemplateCatalog::new(Transport::Tcp, Duration::from_secs(60));
    let registries = Registries::default();
    let exporter = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1));

    let template = s1_template_message(1, 256, 5);
    let msg = decode_message(&template, exporter, &catalog, &registries).expect("decode ok");
    let record = &msg.set.records()[0];
    assert!(record.has_element("sourcePodName"));

    let fields = catalog.get(1, 256).expect("template registered");
    let pod_ie = fields
        .iter()
        .find(|ie| ie.name == "sourcePodName")
        .expect("sourcePodName resolved");
    assert_eq!(pod_ie.enterprise_id, FLOW_VISIBILITY_ENTERPRISE_ID);
}

/// S6 — 8 workers' worth of concurrent correlation calls against the same
/// `FlowRecordStore` spread across 100 flow keys; afterwards every stored
/// record list is either all source-side or all destination-side
/// (spec.md §8 invariant 1) and the total record count never exceeds what
/// was inserted.
#[test]
fn s6_concurrent_correlation_preserves_side_invariant() {
    use ipfix_collector::flow_key::is_source_side;
    use ipfix_collector::ie::{IeDataType, InformationElement};
    use ipfix_collector::record::Record;

    let store = Arc::new(FlowRecordStore::new());
    let worker_count = 8;
    let records_per_worker = 1_250; // 8 * 1250 = 10,000
    let flow_keys = 100;
    let correlate_fields = vec!["destinationPodName".to_string()];

    let pod_name_ie = InformationElement::new("sourcePodName", 1, FLOW_VISIBILITY_ENTERPRISE_ID, IeDataType::String, 0);

    let handles: Vec<_> = (0..worker_count)
        .map(|worker_id| {
            let store = Arc::clone(&store);
            let correlate_fields = correlate_fields.clone();
            let pod_name_ie = pod_name_ie.clone();
            thread::spawn(move || {
                for i in 0..records_per_worker {
                    let key_index = (worker_id * records_per_worker + i) % flow_keys;
                    let key = FlowKey {
                        source_address: format!("10.0.{key_index}.1"),
                        destination_address: format!("10.0.{key_index}.2"),
                        protocol: 6,
                        source_port: 1234,
                        destination_port: 80,
                    };
                    let mut record = Record::new_data(256);
                    let pod_value = if i % 2 == 0 {
                        "pod-a".to_string()
                    } else {
                        String::new()
                    };
                    record.append(pod_name_ie.clone(), Some(FieldValue::String(pod_value)));
                    store.correlate(key, record, &correlate_fields);
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let mut total = 0usize;
    store
        .for_all_records_do::<()>(|_key, records| {
            total += records.len();
            let all_source = records.iter().all(is_source_side);
            let all_destination = records.iter().all(|r| !is_source_side(r));
            assert!(all_source || all_destination);
            Ok(())
        })
        .unwrap();

    assert!(total <= worker_count * records_per_worker);
    assert!(store.len() <= flow_keys);
}

/// `Message`/`Record`/`FlowKey` all derive `Serialize`; a downstream
/// consumer callback (spec.md §6) commonly hands records to something that
/// wants JSON rather than the in-process struct, e.g. for logging or a
/// debug endpoint.
#[test]
fn decoded_message_serializes_to_json() {
    let catalog = TemplateCatalog::new(Transport::Tcp, Duration::from_secs(60));
    let registries = Registries::default();
    let exporter = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 9));

    let template = s1_template_message(1, 256, 5);
    decode_message(&template, exporter, &catalog, &registries).unwrap();
    let data = s1_data_message(1, 256, 2, "pod-a");
    let message = decode_message(&data, exporter, &catalog, &registries).unwrap();

    let json = serde_json::to_value(&message).expect("message serializes");
    assert_eq!(json["version"], 10);
    assert_eq!(json["observation_domain_id"], 1);

    let record = &message.set.records()[0];
    let key = ipfix_collector::flow_key::extract_flow_key(record).unwrap();
    let key_json = serde_json::to_value(&key).expect("flow key serializes");
    assert_eq!(key_json["source_address"], "10.0.0.1");
}
