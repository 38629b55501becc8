//! Raw stored field values of one entity
//!
//! A `FieldBundle` is what raw index reads return instead of entities: a
//! multi-map of field name to values, limited to the fields the caller
//! requested. Access enforces the field's declared cardinality.

use std::collections::BTreeMap;

use serde::Serialize;

use super::types::FieldValue;
use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
struct BundleEntry {
    #[serde(skip)]
    repeatable: bool,
    values: Vec<FieldValue>,
}

/// Stored field values of a single entity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldBundle {
    fields: BTreeMap<String, BundleEntry>,
}

impl FieldBundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field's values
    ///
    /// Fails if a non-repeatable field is given more than one value.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        repeatable: bool,
        values: Vec<FieldValue>,
    ) -> EngineResult<()> {
        let name = name.into();
        if !repeatable && values.len() > 1 {
            return Err(EngineError::FieldCardinality {
                field: name,
                count: values.len(),
            });
        }
        self.fields.insert(name, BundleEntry { repeatable, values });
        Ok(())
    }

    /// Whether the bundle was populated with this field
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Names of all fields in the bundle, in order
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// The single value of a non-repeatable field
    pub fn get_value(&self, name: &str) -> EngineResult<&FieldValue> {
        let entry = self.entry(name)?;
        if entry.repeatable {
            return Err(EngineError::Unsupported(format!(
                "field {} is repeatable, read it with get_values",
                name
            )));
        }
        match entry.values.as_slice() {
            [value] => Ok(value),
            values => Err(EngineError::FieldCardinality {
                field: name.to_string(),
                count: values.len(),
            }),
        }
    }

    /// All values of a field
    pub fn get_values(&self, name: &str) -> EngineResult<&[FieldValue]> {
        Ok(&self.entry(name)?.values)
    }

    fn entry(&self, name: &str) -> EngineResult<&BundleEntry> {
        self.fields
            .get(name)
            .ok_or_else(|| EngineError::FieldNotStored(name.to_string()))
    }
}
