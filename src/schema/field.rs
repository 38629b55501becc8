//! Index field definitions

use std::fmt;

use super::types::{FieldType, FieldValue};

/// Extracts a field's values from an entity
///
/// Non-repeatable fields return at most one value; an empty vector means the
/// entity has no value for the field.
pub type FieldGetter<T> = fn(&T) -> Vec<FieldValue>;

/// A named, typed field of an index schema over entities of type `T`
pub struct FieldDef<T> {
    name: String,
    field_type: FieldType,
    stored: bool,
    repeatable: bool,
    unique: bool,
    getter: FieldGetter<T>,
}

impl<T> FieldDef<T> {
    /// Create a field of the given type
    pub fn new(name: impl Into<String>, field_type: FieldType, getter: FieldGetter<T>) -> Self {
        Self {
            name: name.into(),
            field_type,
            stored: false,
            repeatable: false,
            unique: false,
            getter,
        }
    }

    pub fn exact(name: impl Into<String>, getter: FieldGetter<T>) -> Self {
        Self::new(name, FieldType::Exact, getter)
    }

    pub fn prefix(name: impl Into<String>, getter: FieldGetter<T>) -> Self {
        Self::new(name, FieldType::Prefix, getter)
    }

    pub fn integer(name: impl Into<String>, getter: FieldGetter<T>) -> Self {
        Self::new(name, FieldType::Integer, getter)
    }

    pub fn integer_range(name: impl Into<String>, getter: FieldGetter<T>) -> Self {
        Self::new(name, FieldType::IntegerRange, getter)
    }

    pub fn long(name: impl Into<String>, getter: FieldGetter<T>) -> Self {
        Self::new(name, FieldType::Long, getter)
    }

    pub fn timestamp(name: impl Into<String>, getter: FieldGetter<T>) -> Self {
        Self::new(name, FieldType::Timestamp, getter)
    }

    pub fn full_text(name: impl Into<String>, getter: FieldGetter<T>) -> Self {
        Self::new(name, FieldType::FullText, getter)
    }

    /// A retrievable field that cannot be searched; always stored
    pub fn stored_only(name: impl Into<String>, getter: FieldGetter<T>) -> Self {
        Self::new(name, FieldType::StoredOnly, getter).stored()
    }

    /// Mark the field as stored (retrievable through raw reads)
    pub fn stored(mut self) -> Self {
        self.stored = true;
        self
    }

    /// Mark the field as multi-valued
    pub fn repeatable(mut self) -> Self {
        self.repeatable = true;
        self
    }

    /// Mark the field as identifying at most one entity per value
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    pub fn is_stored(&self) -> bool {
        self.stored
    }

    pub fn is_repeatable(&self) -> bool {
        self.repeatable
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    /// Extract this field's values from an entity
    pub fn values(&self, entity: &T) -> Vec<FieldValue> {
        (self.getter)(entity)
    }
}

impl<T> Clone for FieldDef<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            field_type: self.field_type,
            stored: self.stored,
            repeatable: self.repeatable,
            unique: self.unique,
            getter: self.getter,
        }
    }
}

impl<T> fmt::Debug for FieldDef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDef")
            .field("name", &self.name)
            .field("field_type", &self.field_type)
            .field("stored", &self.stored)
            .field("repeatable", &self.repeatable)
            .field("unique", &self.unique)
            .finish()
    }
}

impl<T> PartialEq for FieldDef<T> {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.field_type == other.field_type
    }
}

impl<T> Eq for FieldDef<T> {}

#[cfg(test)]
mod tests {
    use super::*;

    struct Doc {
        tags: Vec<&'static str>,
    }

    fn tags(d: &Doc) -> Vec<FieldValue> {
        d.tags.iter().map(|t| FieldValue::from(*t)).collect()
    }

    #[test]
    fn test_builder_flags() {
        let f = FieldDef::exact("tag", tags as FieldGetter<Doc>).stored().repeatable();
        assert_eq!(f.name(), "tag");
        assert_eq!(f.field_type(), FieldType::Exact);
        assert!(f.is_stored());
        assert!(f.is_repeatable());
        assert!(!f.is_unique());
    }

    #[test]
    fn test_stored_only_is_stored() {
        let f = FieldDef::stored_only("tag", tags as FieldGetter<Doc>);
        assert!(f.is_stored());
    }

    #[test]
    fn test_values_uses_getter() {
        let f = FieldDef::exact("tag", tags as FieldGetter<Doc>).repeatable();
        let doc = Doc { tags: vec!["a", "b"] };
        assert_eq!(f.values(&doc), vec![FieldValue::from("a"), FieldValue::from("b")]);
    }
}
