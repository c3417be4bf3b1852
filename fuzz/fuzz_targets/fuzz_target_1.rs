#![no_main]

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use libfuzzer_sys::fuzz_target;

use ipfix_collector::registry::Registries;
use ipfix_collector::template_catalog::{TemplateCatalog, Transport};

fuzz_target!(|data: &[u8]| {
    let catalog = TemplateCatalog::new(Transport::Tcp, Duration::from_secs(60));
    let registries = Registries::default();
    let exporter = IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0));
    let _ = ipfix_collector::decoder::decode_message(data, exporter, &catalog, &registries);
});
