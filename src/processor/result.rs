//! Result of one query

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use crate::entity::Entity;
use crate::predicate::Predicate;

/// Entities matched by one query, capped to its effective limit
#[derive(Debug, Clone)]
pub struct QueryResult<T: Entity> {
    query: Option<String>,
    predicate: Predicate<T>,
    entities: Vec<T>,
    more: bool,
}

impl<T: Entity> QueryResult<T> {
    /// Build from everything read for the query
    ///
    /// `entities` may hold more than `limit` elements; the surplus is
    /// dropped and recorded as `more`.
    pub fn create(
        query: Option<String>,
        predicate: Predicate<T>,
        limit: usize,
        mut entities: Vec<T>,
    ) -> Self {
        let more = entities.len() > limit;
        if more {
            entities.truncate(limit);
        }
        Self {
            query,
            predicate,
            more: more && !entities.is_empty(),
            entities,
        }
    }

    pub fn empty(query: Option<String>, predicate: Predicate<T>) -> Self {
        Self {
            query,
            predicate,
            entities: Vec::new(),
            more: false,
        }
    }

    /// Query text, when the query was given as text
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// The predicate that was executed
    pub fn predicate(&self) -> &Predicate<T> {
        &self.predicate
    }

    pub fn entities(&self) -> &[T] {
        &self.entities
    }

    pub fn into_entities(self) -> Vec<T> {
        self.entities
    }

    /// Whether more entities matched than were returned
    pub fn more(&self) -> bool {
        self.more
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl<T: Entity + Serialize> Serialize for QueryResult<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("QueryResult", 4)?;
        state.serialize_field("query", &self.query)?;
        state.serialize_field("predicate", &self.predicate.to_string())?;
        state.serialize_field("more", &self.more)?;
        state.serialize_field("results", &self.entities)?;
        state.end()
    }
}
