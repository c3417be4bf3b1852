//! Registers a vendor Information Element into an `EnterpriseRegistry` and
//! wires it into a collector, the way the teacher's
//! `custom_enterprise_fields` demo shows registering a field outside the
//! IANA table.

use ipfix_collector::ie::{IeDataType, InformationElement};
use ipfix_collector::registry::EnterpriseRegistry;
use ipfix_collector::IpfixCollector;

const ACME_ENTERPRISE_ID: u32 = 40123;

fn main() {
    let mut registry = EnterpriseRegistry::with_flow_visibility_fields();
    registry.register(InformationElement::new(
        "acmeTenantId",
        10,
        ACME_ENTERPRISE_ID,
        IeDataType::UnsignedInt,
        4,
    ));

    let collector = IpfixCollector::builder()
        .with_address("0.0.0.0:4739".parse().unwrap())
        .with_enterprise_registry(registry)
        .with_correlate_field("destinationPodName")
        .build()
        .expect("failed to build collector");

    println!(
        "collector configured with {} enterprise fields registered",
        ACME_ENTERPRISE_ID
    );
    drop(collector);
}
