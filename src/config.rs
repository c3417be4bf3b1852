//! Top-level collector wiring: builder-pattern configuration tying the
//! Collecting Process and Aggregation Process together over one channel.
//!
//! Modeled on [`crate::NetflowParserBuilder`][builder]: consuming `with_*`
//! methods, a fallible `build()`, and a `Default` that matches the values a
//! first-time caller would expect.
//!
//! [builder]: crate::IpfixCollectorBuilder

use std::net::SocketAddr;
use std::time::Duration;

use crossbeam_channel::bounded;

use crate::aggregation::{AggregationConfig, AggregationProcess};
use crate::collecting_process::{CollectingConfig, CollectingProcess};
use crate::correlation::FlowRecordStore;
use crate::error::CollectorError;
use crate::registry::EnterpriseRegistry;
use crate::template_catalog::{TemplateCatalog, Transport, DEFAULT_TEMPLATE_TTL};
use std::sync::Arc;

const DEFAULT_CHANNEL_CAPACITY: usize = 4096;

/// Builder for an [`IpfixCollector`].
///
/// # Examples
///
/// ```rust,no_run
/// use ipfix_collector::IpfixCollector;
///
/// let collector = IpfixCollector::builder()
///     .with_address("0.0.0.0:4739".parse().unwrap())
///     .with_worker_count(4)
///     .with_correlate_field("destinationPodName")
///     .build()
///     .expect("failed to build collector");
/// ```
#[derive(Debug, Clone)]
pub struct IpfixCollectorBuilder {
    address: SocketAddr,
    transport: Transport,
    max_message_size: usize,
    template_ttl: Duration,
    enterprise_registry: EnterpriseRegistry,
    worker_count: usize,
    correlate_fields: Vec<String>,
    channel_capacity: usize,
}

impl Default for IpfixCollectorBuilder {
    fn default() -> Self {
        Self {
            address: SocketAddr::from(([0, 0, 0, 0], 4739)),
            transport: Transport::Udp,
            max_message_size: 65535,
            template_ttl: DEFAULT_TEMPLATE_TTL,
            enterprise_registry: EnterpriseRegistry::with_flow_visibility_fields(),
            worker_count: 4,
            correlate_fields: vec!["destinationPodName".to_string(), "destinationPodNamespace".to_string()],
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl IpfixCollectorBuilder {
    #[must_use = "builder methods consume self and return a new builder; the return value must be used"]
    pub fn with_address(mut self, address: SocketAddr) -> Self {
        self.address = address;
        self
    }

    #[must_use = "builder methods consume self and return a new builder; the return value must be used"]
    pub fn with_transport(mut self, transport: Transport) -> Self {
        self.transport = transport;
        self
    }

    #[must_use = "builder methods consume self and return a new builder; the return value must be used"]
    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    #[must_use = "builder methods consume self and return a new builder; the return value must be used"]
    pub fn with_template_ttl(mut self, ttl: Duration) -> Self {
        self.template_ttl = ttl;
        self
    }

    #[must_use = "builder methods consume self and return a new builder; the return value must be used"]
    pub fn with_enterprise_registry(mut self, registry: EnterpriseRegistry) -> Self {
        self.enterprise_registry = registry;
        self
    }

    #[must_use = "builder methods consume self and return a new builder; the return value must be used"]
    pub fn with_worker_count(mut self, count: usize) -> Self {
        self.worker_count = count;
        self
    }

    #[must_use = "builder methods consume self and return a new builder; the return value must be used"]
    pub fn with_correlate_field(mut self, field: impl Into<String>) -> Self {
        self.correlate_fields.push(field.into());
        self
    }

    #[must_use = "builder methods consume self and return a new builder; the return value must be used"]
    pub fn with_correlate_fields(mut self, fields: impl IntoIterator<Item = String>) -> Self {
        self.correlate_fields = fields.into_iter().collect();
        self
    }

    #[must_use = "builder methods consume self and return a new builder; the return value must be used"]
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    pub fn build(self) -> Result<IpfixCollector, CollectorError> {
        let collecting_config = CollectingConfig::try_new(
            self.address,
            self.transport,
            self.max_message_size,
            self.template_ttl,
            self.enterprise_registry,
        )?;
        let aggregation_config = AggregationConfig::try_new(self.worker_count, self.correlate_fields)?;
        if self.channel_capacity == 0 {
            return Err(CollectorError::ConfigInvalid(
                "channelCapacity must be >= 1".to_string(),
            ));
        }

        Ok(IpfixCollector {
            collecting: CollectingProcess::new(collecting_config),
            aggregation: AggregationProcess::new(aggregation_config),
            channel_capacity: self.channel_capacity,
        })
    }
}

/// Owns both halves of the pipeline (spec.md §2): the Collecting Process
/// decodes wire messages and the Aggregation Process correlates them into
/// the Flow Record Store. `start`/`stop` bring both up and down together
/// over a bounded `crossbeam_channel` — bounded so a stalled Aggregation
/// Process applies backpressure to the Collecting Process rather than
/// growing memory unboundedly.
pub struct IpfixCollector {
    collecting: CollectingProcess,
    aggregation: AggregationProcess,
    channel_capacity: usize,
}

impl IpfixCollector {
    pub fn builder() -> IpfixCollectorBuilder {
        IpfixCollectorBuilder::default()
    }

    pub fn template_catalog(&self) -> Arc<TemplateCatalog> {
        self.collecting.catalog()
    }

    pub fn flow_record_store(&self) -> Arc<FlowRecordStore> {
        self.aggregation.store()
    }

    pub fn start(&mut self) -> Result<(), CollectorError> {
        let (sender, receiver) = bounded(self.channel_capacity);
        self.aggregation.start(receiver);
        self.collecting.start(sender)?;
        Ok(())
    }

    /// Stop both processes. Dropping the collecting process's listening
    /// thread first lets in-flight messages drain through the aggregation
    /// workers before they see the channel close.
    pub fn stop(&mut self) {
        self.collecting.stop();
        self.aggregation.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_workers_is_rejected() {
        let result = IpfixCollector::builder().with_worker_count(0).build();
        assert!(matches!(result, Err(CollectorError::ConfigInvalid(_))));
    }

    #[test]
    fn zero_channel_capacity_is_rejected() {
        let result = IpfixCollector::builder().with_channel_capacity(0).build();
        assert!(matches!(result, Err(CollectorError::ConfigInvalid(_))));
    }

    #[test]
    fn default_builder_builds_successfully() {
        assert!(IpfixCollector::builder().build().is_ok());
    }
}
