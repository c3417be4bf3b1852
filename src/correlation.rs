//! Flow Record Store and Correlation Engine (spec.md §4.F, §5, §8 invariant 1).

use std::collections::HashMap;
use std::sync::RwLock;

use crate::flow_key::{is_source_side, FlowKey};
use crate::record::Record;

/// FlowKey -> ordered list of records. Invariant after every correlation
/// step: the list holds either only source-side or only destination-side
/// records (spec.md §3, §8 invariant 1).
#[derive(Default)]
pub struct FlowRecordStore {
    records: RwLock<HashMap<FlowKey, Vec<Record>>>,
}

impl FlowRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `incoming` into the store under `key`, applying the directional
    /// correlation policy and the dedup invariant. Takes the write lock for
    /// the duration of the merge — the only place writes happen on the data
    /// path (spec.md §5).
    ///
    /// Re-applying a record already present under this key (same value,
    /// post-merge) is a no-op: the idempotence law in spec.md §8 requires
    /// applying the same source-side record twice to yield the same store
    /// state as applying it once.
    pub fn correlate(&self, key: FlowKey, incoming: Record, correlate_fields: &[String]) {
        let mut store = self.records.write().expect("flow record store lock poisoned");
        let existing = store.entry(key).or_default();

        let incoming = if is_source_side(&incoming) {
            merge_incoming_source(existing, incoming, correlate_fields)
        } else {
            merge_incoming_destination(existing, incoming, correlate_fields)
        };

        if !existing.contains(&incoming) {
            existing.push(incoming);
        }
        dedup_by_side(existing);
    }

    /// Read-lock the whole map and invoke `callback` for each key. A
    /// callback error aborts the iteration and propagates (spec.md §4.E).
    /// Callbacks MUST NOT mutate the map or acquire the write lock —
    /// doing so deadlocks against this held read lock.
    pub fn for_all_records_do<E>(
        &self,
        mut callback: impl FnMut(&FlowKey, &[Record]) -> Result<(), E>,
    ) -> Result<(), E> {
        let store = self.records.read().expect("flow record store lock poisoned");
        for (key, records) in store.iter() {
            callback(key, records)?;
        }
        Ok(())
    }

    pub fn delete_flow_key(&self, key: &FlowKey) {
        self.records.write().expect("flow record store lock poisoned").remove(key);
    }

    pub fn len(&self) -> usize {
        self.records.read().expect("flow record store lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn total_records(&self) -> usize {
        self.records
            .read()
            .expect("flow record store lock poisoned")
            .values()
            .map(Vec::len)
            .sum()
    }
}

/// Incoming is source-side: for each `correlateField`, copy the value from
/// the *first existing record* that carries it, then stop scanning further
/// existing records once one field has been filled (spec.md §4.F, §9 Open
/// Question 2 — frozen as "first existing record only").
fn merge_incoming_source(existing: &[Record], mut incoming: Record, correlate_fields: &[String]) -> Record {
    for candidate in existing {
        let mut filled = false;
        for field in correlate_fields {
            if incoming.has_element(field) {
                continue;
            }
            if let Some(value) = candidate.get(field) {
                if let Some(element) = candidate.iter().find(|v| v.element.name == field.as_str()) {
                    incoming.append(element.element.clone(), Some(value.clone()));
                    filled = true;
                }
            }
        }
        if filled {
            break;
        }
    }
    incoming
}

/// Incoming is destination-side: for every existing source-side record, for
/// every `correlateField`, copy the incoming value into the existing record
/// (all source-side records enriched, not just the first).
fn merge_incoming_destination(existing: &mut [Record], incoming: Record, correlate_fields: &[String]) -> Record {
    for candidate in existing.iter_mut() {
        if !is_source_side(candidate) {
            continue;
        }
        for field in correlate_fields {
            if let Some(element) = incoming.iter().find(|v| v.element.name == field.as_str()) {
                if let Some(value) = element.value.clone() {
                    let ie = element.element.clone();
                    candidate.upsert(ie, Some(value));
                }
            }
        }
    }
    incoming
}

/// Partition into source-side and destination-side; if the source-side
/// list is non-empty, retain only it, else retain the destination-side
/// list (spec.md §4.F dedup rule, §8 invariant 1).
fn dedup_by_side(records: &mut Vec<Record>) {
    let (source_side, destination_side): (Vec<Record>, Vec<Record>) =
        records.drain(..).partition(|r| is_source_side(r));
    *records = if !source_side.is_empty() {
        source_side
    } else {
        destination_side
    };
}
