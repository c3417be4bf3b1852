//! Template Catalog (spec.md §4.B, §5, §9).
//!
//! A flat `RwLock<HashMap<(observation_domain_id, template_id), Entry>>` —
//! the design note's fix for the "cyclic templates / per-exporter map of
//! maps" hazard: one lock covers every exporter's templates instead of a
//! nested per-exporter structure. `get` is the hot read path (every data
//! record); `add`/`delete` are rare writes.
//!
//! Each entry carries a monotonically increasing `generation`. A UDP-backed
//! catalog spawns a one-shot timer thread per `add`; the thread wakes after
//! `templateTTL`, re-acquires the write lock, and deletes the entry only if
//! its generation still matches the one it captured at spawn time. Because
//! `add` on an existing key always installs a fresh generation, a
//! re-`add` implicitly invalidates every timer scheduled for the prior
//! generation — this is the cancellable-timer substitute called for in the
//! design notes (§9), and the explicit fix for Open Question 1: the
//! original's single-ticker `select` loop fires once and never re-arms or
//! cancels; this implementation deliberately does not replicate that.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::thread;
use std::time::Duration;

use crate::ie::InformationElement;

/// Whether a catalog is backed by a reliable (TCP) or unreliable (UDP)
/// transport. Reliable transports never schedule expiry (spec.md §4.B).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Tcp,
    Udp,
}

/// Default template TTL, a process-wide constant per the design note in
/// §9 — treated as a configuration default, not hidden state.
pub const DEFAULT_TEMPLATE_TTL: Duration = Duration::from_secs(2 * 60 * 60);

type CatalogKey = (u32, u16);

struct Entry {
    fields: Vec<InformationElement>,
    generation: u64,
}

pub struct TemplateCatalog {
    transport: Transport,
    ttl: Duration,
    entries: RwLock<HashMap<CatalogKey, Entry>>,
    next_generation: AtomicU64,
}

impl TemplateCatalog {
    pub fn new(transport: Transport, ttl: Duration) -> Arc<Self> {
        Arc::new(Self {
            transport,
            ttl,
            entries: RwLock::new(HashMap::new()),
            next_generation: AtomicU64::new(0),
        })
    }

    pub fn with_default_ttl(transport: Transport) -> Arc<Self> {
        Self::new(transport, DEFAULT_TEMPLATE_TTL)
    }

    /// Insert or atomically replace the field list for (observation_domain_id,
    /// template_id). Replacing an existing key refreshes the UDP TTL by
    /// installing a new generation, which supersedes any timer scheduled by
    /// a prior `add` for the same key.
    pub fn add(self: &Arc<Self>, observation_domain_id: u32, template_id: u16, fields: Vec<InformationElement>) {
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
        let key = (observation_domain_id, template_id);
        {
            let mut entries = self.entries.write().expect("template catalog lock poisoned");
            entries.insert(key, Entry { fields, generation });
        }
        log::debug!(
            "template added obs={observation_domain_id} tid={template_id} generation={generation}"
        );

        if self.transport == Transport::Udp {
            let catalog = Arc::clone(self);
            let ttl = self.ttl;
            thread::spawn(move || {
                thread::sleep(ttl);
                let mut entries = catalog.entries.write().expect("template catalog lock poisoned");
                if let Some(entry) = entries.get(&key) {
                    if entry.generation == generation {
                        entries.remove(&key);
                        log::debug!(
                            "template expired obs={} tid={} generation={generation}",
                            key.0, key.1
                        );
                    }
                }
            });
        }
    }

    pub fn get(&self, observation_domain_id: u32, template_id: u16) -> Option<Vec<InformationElement>> {
        self.entries
            .read()
            .expect("template catalog lock poisoned")
            .get(&(observation_domain_id, template_id))
            .map(|entry| entry.fields.clone())
    }

    pub fn delete(&self, observation_domain_id: u32, template_id: u16) {
        self.entries
            .write()
            .expect("template catalog lock poisoned")
            .remove(&(observation_domain_id, template_id));
    }

    pub fn len(&self) -> usize {
        self.entries.read().expect("template catalog lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
