//! Starts a full `IpfixCollector` over UDP and prints every flow record as
//! it settles, the way the teacher's own `netflow_udp_listener_*` demos
//! bind a socket and loop on decoded packets.

use std::thread;
use std::time::Duration;

use ipfix_collector::IpfixCollector;

fn main() {
    env_logger::init();

    let mut collector = IpfixCollector::builder()
        .with_address("0.0.0.0:4739".parse().unwrap())
        .with_worker_count(4)
        .with_correlate_field("destinationPodName")
        .with_correlate_field("destinationPodNamespace")
        .build()
        .expect("failed to build collector");

    collector.start().expect("failed to start collector");
    println!("listening for IPFIX over UDP on 0.0.0.0:4739");

    let store = collector.flow_record_store();
    loop {
        thread::sleep(Duration::from_secs(5));
        store
            .for_all_records_do::<std::convert::Infallible>(|key, records| {
                println!("{key}: {} record(s)", records.len());
                Ok(())
            })
            .unwrap();
    }
}
