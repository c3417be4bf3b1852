#![no_main]

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use libfuzzer_sys::fuzz_target;

use ipfix_collector::aggregation::aggregate_message;
use ipfix_collector::correlation::FlowRecordStore;
use ipfix_collector::registry::Registries;
use ipfix_collector::template_catalog::{TemplateCatalog, Transport};

/// Decodes then immediately aggregates arbitrary bytes against a fresh
/// catalog and store, exercising the full Collecting + Aggregation Process
/// path the wire decoder alone does not cover (flow key extraction,
/// correlation, dedup).
fuzz_target!(|data: &[u8]| {
    let catalog = TemplateCatalog::new(Transport::Tcp, Duration::from_secs(60));
    let registries = Registries::default();
    let exporter = IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0));
    let store = FlowRecordStore::new();
    let correlate_fields = vec!["destinationPodName".to_string()];

    if let Ok(message) = ipfix_collector::decoder::decode_message(data, exporter, &catalog, &registries) {
        let _ = aggregate_message(message, &store, &correlate_fields);
    }
});
