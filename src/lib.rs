#![doc = include_str!("../README.md")]

pub mod aggregation;
pub mod collecting_process;
pub mod config;
pub mod correlation;
pub mod decoder;
pub mod error;
pub mod flow_key;
pub mod ie;
pub mod message;
pub mod record;
pub mod registry;
pub mod template_catalog;

pub use aggregation::{AggregationConfig, AggregationProcess};
pub use collecting_process::{CollectingConfig, CollectingProcess};
pub use config::{IpfixCollector, IpfixCollectorBuilder};
pub use correlation::FlowRecordStore;
pub use decoder::decode_message;
pub use error::CollectorError;
pub use flow_key::{extract_flow_key, FlowKey, FlowKeyError};
pub use ie::{ElementId, EnterpriseId, FieldValue, IeDataType, InformationElement};
pub use message::{Message, Set, SetBody};
pub use record::{Record, RecordKind, ValueBoundIe};
pub use registry::{ElementRegistry, EnterpriseRegistry, IanaRegistry, Registries};
pub use template_catalog::{TemplateCatalog, Transport, DEFAULT_TEMPLATE_TTL};
