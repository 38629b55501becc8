//! In-memory index backend
//!
//! Keeps entities in insertion order and answers searches by evaluating the
//! predicate against every entity. Search-after cursors are positions in
//! that order.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard};

use super::{requested_fields, Index};
use crate::entity::Entity;
use crate::error::{EngineError, EngineResult};
use crate::predicate::Predicate;
use crate::processor::QueryOptions;
use crate::schema::{FieldBundle, Schema};
use crate::source::{Page, ResultSet, SearchAfter};

#[derive(Debug, Clone, Copy)]
enum Position {
    /// Skip this many matches
    Offset(usize),
    /// Continue at this entity position
    After(usize),
}

/// Index holding every entity in memory
pub struct MemoryIndex<T: Entity> {
    schema: Arc<Schema<T>>,
    docs: Arc<RwLock<Vec<T>>>,
    max_limit: usize,
    searches: AtomicUsize,
}

impl<T: Entity> MemoryIndex<T> {
    pub fn new(schema: Schema<T>, max_limit: usize) -> Self {
        Self {
            schema: Arc::new(schema),
            docs: Arc::new(RwLock::new(Vec::new())),
            max_limit,
            searches: AtomicUsize::new(0),
        }
    }

    /// Add an entity, replacing any entity with the same id in place
    pub fn insert(&self, entity: T) -> EngineResult<()> {
        let mut docs = self
            .docs
            .write()
            .map_err(|_| EngineError::Storage("index lock poisoned".to_string()))?;
        let id = entity.id();
        match docs.iter().position(|d| d.id() == id) {
            Some(pos) => docs[pos] = entity,
            None => docs.push(entity),
        }
        Ok(())
    }

    pub fn insert_all(&self, entities: impl IntoIterator<Item = T>) -> EngineResult<()> {
        for entity in entities {
            self.insert(entity)?;
        }
        Ok(())
    }

    /// Remove the entity with `id`; returns whether one was present
    pub fn remove(&self, id: &T::Id) -> EngineResult<bool> {
        let mut docs = self
            .docs
            .write()
            .map_err(|_| EngineError::Storage("index lock poisoned".to_string()))?;
        let before = docs.len();
        docs.retain(|d| &d.id() != id);
        Ok(docs.len() != before)
    }

    pub fn len(&self) -> usize {
        self.docs.read().map_or(0, |d| d.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of searches dispatched so far
    pub fn search_count(&self) -> usize {
        self.searches.load(Ordering::SeqCst)
    }

    fn dispatch(&self, pred: &Predicate<T>, opts: &QueryOptions) -> EngineResult<(Position, usize)> {
        if !pred.is_matchable() {
            return Err(EngineError::Unsupported(format!("index cannot answer {}", pred)));
        }
        let position = match opts.search_after() {
            Some(cursor) => Position::After(parse_cursor(cursor)?),
            None => Position::Offset(opts.start()),
        };
        self.searches.fetch_add(1, Ordering::SeqCst);
        Ok((position, opts.page_size().min(self.max_limit)))
    }
}

fn parse_cursor(cursor: &SearchAfter) -> EngineResult<usize> {
    cursor
        .as_str()
        .parse()
        .map_err(|_| EngineError::Storage(format!("invalid search-after cursor '{}'", cursor)))
}

fn read_docs<T>(docs: &RwLock<Vec<T>>) -> EngineResult<RwLockReadGuard<'_, Vec<T>>> {
    docs.read()
        .map_err(|_| EngineError::Storage("index lock poisoned".to_string()))
}

/// Collect up to `page_size` matching entities from `position`
fn scan<T: Entity>(
    docs: &[T],
    pred: &Predicate<T>,
    position: Position,
    page_size: usize,
) -> EngineResult<Page<T>> {
    let (first, mut to_skip) = match position {
        Position::Offset(n) => (0, n),
        Position::After(pos) => (pos, 0),
    };
    let mut page = Vec::new();
    let mut last = None;
    for (pos, doc) in docs.iter().enumerate().skip(first) {
        if page.len() >= page_size {
            break;
        }
        if !pred.matches(doc)? {
            continue;
        }
        if to_skip > 0 {
            to_skip -= 1;
            continue;
        }
        page.push(doc.clone());
        last = Some(pos);
    }
    let cursor = last.map(|pos| SearchAfter::new((pos + 1).to_string()));
    Ok((page, cursor))
}

impl<T: Entity> Index<T> for MemoryIndex<T> {
    fn schema(&self) -> &Schema<T> {
        &self.schema
    }

    fn max_limit(&self) -> usize {
        self.max_limit
    }

    fn search(&self, pred: &Predicate<T>, opts: &QueryOptions) -> EngineResult<ResultSet<T>> {
        let (position, page_size) = self.dispatch(pred, opts)?;
        let docs = Arc::clone(&self.docs);
        let pred = pred.clone();
        Ok(ResultSet::lazy_page(move || {
            let docs = read_docs(&docs)?;
            scan(&docs, &pred, position, page_size)
        }))
    }

    fn search_raw(
        &self,
        pred: &Predicate<T>,
        opts: &QueryOptions,
    ) -> EngineResult<ResultSet<FieldBundle>> {
        let fields = requested_fields(&self.schema, opts);
        if let Some(missing) = fields
            .iter()
            .find(|name| !self.schema.field(name).is_some_and(|f| f.is_stored()))
        {
            return Err(EngineError::FieldNotStored(missing.clone()));
        }

        let (position, page_size) = self.dispatch(pred, opts)?;
        let docs = Arc::clone(&self.docs);
        let schema = Arc::clone(&self.schema);
        let pred = pred.clone();
        Ok(ResultSet::lazy_page(move || {
            let docs = read_docs(&docs)?;
            let (page, cursor) = scan(&docs, &pred, position, page_size)?;
            let bundles = page
                .iter()
                .map(|doc| schema.bundle(doc, &fields))
                .collect::<EngineResult<Vec<_>>>()?;
            Ok((bundles, cursor))
        }))
    }

    fn cardinality(&self, pred: &Predicate<T>) -> u64 {
        let Ok(docs) = read_docs(&self.docs) else {
            return 0;
        };
        if !pred.is_matchable() {
            return docs.len() as u64;
        }
        docs.iter()
            .filter(|d| pred.matches(d).unwrap_or(true))
            .count() as u64
    }
}
