//! Index schema: the set of fields an index maintains for one entity type

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use super::bundle::FieldBundle;
use super::errors::{SchemaError, SchemaResult};
use super::field::FieldDef;
use crate::error::{EngineError, EngineResult};

/// A versioned, immutable field schema for entities of type `T`
pub struct Schema<T> {
    name: String,
    version: u32,
    fields: BTreeMap<String, Arc<FieldDef<T>>>,
}

impl<T> Schema<T> {
    /// Start declaring a schema
    pub fn builder(name: impl Into<String>, version: u32) -> SchemaBuilder<T> {
        SchemaBuilder {
            name: name.into(),
            version,
            fields: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Look up a field by name
    pub fn field(&self, name: &str) -> Option<&Arc<FieldDef<T>>> {
        self.fields.get(name)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// All fields in name order
    pub fn fields(&self) -> impl Iterator<Item = &Arc<FieldDef<T>>> {
        self.fields.values()
    }

    /// Names of every stored field
    pub fn stored_fields(&self) -> BTreeSet<String> {
        self.fields
            .values()
            .filter(|f| f.is_stored())
            .map(|f| f.name().to_string())
            .collect()
    }

    /// Extract the requested stored fields of an entity
    ///
    /// Every requested field must exist and be stored.
    pub fn bundle(&self, entity: &T, requested: &BTreeSet<String>) -> EngineResult<FieldBundle> {
        let mut bundle = FieldBundle::new();
        for name in requested {
            let field = self
                .fields
                .get(name)
                .filter(|f| f.is_stored())
                .ok_or_else(|| EngineError::FieldNotStored(name.clone()))?;
            bundle.insert(name.clone(), field.is_repeatable(), field.values(entity))?;
        }
        Ok(bundle)
    }
}

impl<T> fmt::Debug for Schema<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("name", &self.name)
            .field("version", &self.version)
            .field("fields", &self.fields.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Collects field definitions for a [`Schema`]
pub struct SchemaBuilder<T> {
    name: String,
    version: u32,
    fields: Vec<FieldDef<T>>,
}

impl<T> SchemaBuilder<T> {
    pub fn field(mut self, field: FieldDef<T>) -> Self {
        self.fields.push(field);
        self
    }

    /// Validate and freeze the schema
    pub fn build(self) -> SchemaResult<Schema<T>> {
        let mut fields = BTreeMap::new();
        for field in self.fields {
            if field.name().is_empty() {
                return Err(SchemaError::EmptyFieldName { schema: self.name });
            }
            if field.is_unique() && field.is_repeatable() {
                return Err(SchemaError::UniqueRepeatable {
                    schema: self.name,
                    field: field.name().to_string(),
                });
            }
            if fields.contains_key(field.name()) {
                return Err(SchemaError::DuplicateField {
                    schema: self.name,
                    field: field.name().to_string(),
                });
            }
            fields.insert(field.name().to_string(), Arc::new(field));
        }
        Ok(Schema {
            name: self.name,
            version: self.version,
            fields,
        })
    }
}
