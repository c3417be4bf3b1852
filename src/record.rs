//! Record model shared by Template and Data records.
//!
//! Per the design note on polymorphism over records: both kinds share one
//! capability set (append, lookup by name, list in order), represented here
//! as one tagged struct rather than an inheritance hierarchy. `kind` is the
//! tag; a Template record's `values` carry `value: None` placeholders that
//! describe the schema, a Data record's carry `Some`.

use crate::ie::{FieldValue, InformationElement};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RecordKind {
    Template,
    Data,
}

/// One (IE, value) pair. `value` is `None` only inside a Template record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueBoundIe {
    pub element: InformationElement,
    pub value: Option<FieldValue>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    pub kind: RecordKind,
    pub template_id: u16,
    values: Vec<ValueBoundIe>,
}

impl Record {
    pub fn new_template(template_id: u16) -> Self {
        Self {
            kind: RecordKind::Template,
            template_id,
            values: Vec::new(),
        }
    }

    pub fn new_data(template_id: u16) -> Self {
        Self {
            kind: RecordKind::Data,
            template_id,
            values: Vec::new(),
        }
    }

    pub fn is_template(&self) -> bool {
        self.kind == RecordKind::Template
    }

    pub fn is_data(&self) -> bool {
        self.kind == RecordKind::Data
    }

    /// Append a new value-bound IE, preserving arrival order.
    pub fn append(&mut self, element: InformationElement, value: Option<FieldValue>) {
        self.values.push(ValueBoundIe { element, value });
    }

    /// Append a value-bound IE, or overwrite the value of an existing one
    /// with the same name in place (so `get` keeps returning a single,
    /// current value rather than the first of several copies).
    pub fn upsert(&mut self, element: InformationElement, value: Option<FieldValue>) {
        if let Some(existing) = self.values.iter_mut().find(|v| v.element.name == element.name) {
            existing.value = value;
        } else {
            self.values.push(ValueBoundIe { element, value });
        }
    }

    /// Look up a value-bound IE's value by element name.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values
            .iter()
            .find(|v| v.element.name == name)
            .and_then(|v| v.value.as_ref())
    }

    /// True if this record already carries a value-bound IE with this name
    /// (used to make exporter annotation idempotent per pass, §9 Open
    /// Question 3).
    pub fn has_element(&self, name: &str) -> bool {
        self.values.iter().any(|v| v.element.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValueBoundIe> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
