//! Information Element registry (spec.md §6 collaborator contract).
//!
//! Two registries implement the same [`ElementRegistry`] lookup surface:
//! [`IanaRegistry`], a static table of the standard (enterprise-id 0) IEs
//! this crate's decoder and aggregator need, and [`EnterpriseRegistry`], a
//! runtime-populated map for vendor IEs — modeled on
//! `variable_versions::enterprise_registry::EnterpriseFieldRegistry` in the
//! netflow_parser crate this was built from, generalized from a single
//! "custom field" concept to the full IE shape.

use crate::ie::{ElementId, EnterpriseId, IeDataType, InformationElement};
use std::collections::HashMap;

/// Common lookup surface: by (element-id, enterprise-id), or by name for
/// constructing templates programmatically (tests, manual catalog seeding).
pub trait ElementRegistry {
    fn get_element_from_id(
        &self,
        element_id: ElementId,
        enterprise_id: EnterpriseId,
    ) -> Option<InformationElement>;

    fn get_info_element(
        &self,
        name: &str,
        enterprise_id: EnterpriseId,
    ) -> Option<InformationElement>;
}

macro_rules! iana_table {
    ($(($name:expr, $id:expr, $ty:expr, $len:expr)),* $(,)?) => {
        &[
            $(InformationElement::new($name, $id, 0, $ty, $len)),*
        ]
    };
}

/// The standard (IANA, enterprise-id 0) Information Elements this crate
/// knows about. Not exhaustive against the full IANA IPFIX registry — a
/// representative subset covering the 5-tuple, the annotation fields this
/// core appends itself, and a spread of common counters/timestamps/pod
/// identity fields a flow-visibility exporter would send.
static IANA_ELEMENTS: &[InformationElement] = iana_table![
    ("octetDeltaCount", 1, IeDataType::UnsignedInt, 8),
    ("packetDeltaCount", 2, IeDataType::UnsignedInt, 8),
    ("protocolIdentifier", 4, IeDataType::UnsignedInt, 1),
    ("ipClassOfService", 5, IeDataType::UnsignedInt, 1),
    ("tcpControlBits", 6, IeDataType::UnsignedInt, 1),
    ("sourceTransportPort", 7, IeDataType::UnsignedInt, 2),
    ("sourceIPv4Address", 8, IeDataType::Ipv4Addr, 4),
    ("ingressInterface", 10, IeDataType::UnsignedInt, 4),
    ("destinationTransportPort", 11, IeDataType::UnsignedInt, 2),
    ("destinationIPv4Address", 12, IeDataType::Ipv4Addr, 4),
    ("egressInterface", 14, IeDataType::UnsignedInt, 4),
    ("flowEndSysUpTime", 21, IeDataType::UnsignedInt, 4),
    ("flowStartSysUpTime", 22, IeDataType::UnsignedInt, 4),
    ("sourceIPv6Address", 27, IeDataType::Ipv6Addr, 16),
    ("destinationIPv6Address", 28, IeDataType::Ipv6Addr, 16),
    ("flowEndReason", 136, IeDataType::UnsignedInt, 1),
    ("flowStartSeconds", 150, IeDataType::DateTimeSeconds, 4),
    ("flowEndSeconds", 151, IeDataType::DateTimeSeconds, 4),
    (
        "originalExporterIPv4Address",
        403,
        IeDataType::Ipv4Addr,
        4
    ),
    ("originalObservationDomainId", 405, IeDataType::UnsignedInt, 4),
];

/// Names of the two IEs the Aggregation Process appends to every record
/// (spec.md §4.E step 1, §8 invariant 6). The core requires both to exist
/// in the IANA registry.
pub const ORIGINAL_EXPORTER_IPV4_ADDRESS: &str = "originalExporterIPv4Address";
pub const ORIGINAL_OBSERVATION_DOMAIN_ID: &str = "originalObservationDomainId";

#[derive(Debug, Default, Clone, Copy)]
pub struct IanaRegistry;

impl ElementRegistry for IanaRegistry {
    fn get_element_from_id(
        &self,
        element_id: ElementId,
        enterprise_id: EnterpriseId,
    ) -> Option<InformationElement> {
        if enterprise_id != 0 {
            return None;
        }
        IANA_ELEMENTS
            .iter()
            .find(|ie| ie.element_id == element_id)
            .cloned()
    }

    fn get_info_element(
        &self,
        name: &str,
        enterprise_id: EnterpriseId,
    ) -> Option<InformationElement> {
        if enterprise_id != 0 {
            return None;
        }
        IANA_ELEMENTS.iter().find(|ie| ie.name == name).cloned()
    }
}

/// Runtime registry for vendor (enterprise) IEs, keyed by
/// (enterprise-id, element-id). Enterprise-id 0 is reserved for
/// [`IanaRegistry`] and is never registered here.
#[derive(Debug, Clone, Default)]
pub struct EnterpriseRegistry {
    fields: HashMap<(EnterpriseId, ElementId), InformationElement>,
}

impl EnterpriseRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, element: InformationElement) {
        self.fields
            .insert((element.enterprise_id, element.element_id), element);
    }

    pub fn register_many(&mut self, elements: impl IntoIterator<Item = InformationElement>) {
        for element in elements {
            self.register(element);
        }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl ElementRegistry for EnterpriseRegistry {
    fn get_element_from_id(
        &self,
        element_id: ElementId,
        enterprise_id: EnterpriseId,
    ) -> Option<InformationElement> {
        self.fields.get(&(enterprise_id, element_id)).cloned()
    }

    fn get_info_element(
        &self,
        name: &str,
        enterprise_id: EnterpriseId,
    ) -> Option<InformationElement> {
        self.fields
            .values()
            .find(|ie| ie.enterprise_id == enterprise_id && ie.name == name)
            .cloned()
    }
}

/// The pod-identity enterprise number this crate's default process wires
/// up, used by scenario S5's enterprise-element decode path and by
/// `sourcePodName`/`destinationPodName` — the IEs the Correlation Engine
/// uses to distinguish source-side from destination-side records.
pub const FLOW_VISIBILITY_ENTERPRISE_ID: u32 = 56506;

fn flow_visibility_elements() -> impl Iterator<Item = InformationElement> {
    [
        InformationElement::new(
            "sourcePodName",
            1,
            FLOW_VISIBILITY_ENTERPRISE_ID,
            IeDataType::String,
            0,
        ),
        InformationElement::new(
            "destinationPodName",
            2,
            FLOW_VISIBILITY_ENTERPRISE_ID,
            IeDataType::String,
            0,
        ),
        InformationElement::new(
            "sourcePodNamespace",
            3,
            FLOW_VISIBILITY_ENTERPRISE_ID,
            IeDataType::String,
            0,
        ),
        InformationElement::new(
            "destinationPodNamespace",
            4,
            FLOW_VISIBILITY_ENTERPRISE_ID,
            IeDataType::String,
            0,
        ),
    ]
    .into_iter()
}

impl EnterpriseRegistry {
    /// An `EnterpriseRegistry` pre-populated with the pod-identity fields
    /// used throughout this crate's own tests and the default
    /// [`crate::collecting_process::CollectingProcess`] wiring.
    pub fn with_flow_visibility_fields() -> Self {
        let mut registry = Self::new();
        registry.register_many(flow_visibility_elements());
        registry
    }
}

/// Resolves an element through the IANA registry first, then the
/// enterprise registry — the decoder's single entry point for element
/// resolution (spec.md §4.A: "enterprise-id 0 → IANA; otherwise enterprise
/// registry").
#[derive(Debug, Clone)]
pub struct Registries {
    pub iana: IanaRegistry,
    pub enterprise: EnterpriseRegistry,
}

impl Default for Registries {
    fn default() -> Self {
        Self {
            iana: IanaRegistry,
            enterprise: EnterpriseRegistry::with_flow_visibility_fields(),
        }
    }
}

impl Registries {
    pub fn new(enterprise: EnterpriseRegistry) -> Self {
        Self {
            iana: IanaRegistry,
            enterprise,
        }
    }

    pub fn resolve(
        &self,
        element_id: ElementId,
        enterprise_id: EnterpriseId,
    ) -> Option<InformationElement> {
        if enterprise_id == 0 {
            self.iana.get_element_from_id(element_id, 0)
        } else {
            self.enterprise.get_element_from_id(element_id, enterprise_id)
        }
    }
}
