//! Source And Pagination Scenarios
//!
//! Processor-level behavior over a generic in-memory index:
//! - Post-filtered sources restart until the page is full
//! - Offset and search-after restarts agree
//! - Restart loops stop at the configured cap
//! - Pages beyond the index maximum come back full
//! - Disabled processors never touch the index
//! - Unions de-duplicate by entity id

use std::collections::BTreeSet;
use std::sync::Arc;

use querydex::config::{IndexConfig, PaginationType};
use querydex::entity::Entity;
use querydex::index::{Index, MemoryIndex};
use querydex::observability::MetricsRegistry;
use querydex::predicate::{IndexPredicate, MatchablePredicate, Predicate};
use querydex::processor::{ProcessorState, QueryOptions, QueryProcessor, QueryResult};
use querydex::rewrite::IndexRewriter;
use querydex::schema::{FieldDef, FieldValue, Schema};
use querydex::source::{DataSource, IndexedQuery};

#[derive(Debug, Clone)]
struct Doc {
    id: u32,
    title: String,
}

impl Entity for Doc {
    type Id = u32;
    fn id(&self) -> u32 {
        self.id
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn schema() -> Schema<Doc> {
    Schema::builder("docs", 1)
        .field(FieldDef::integer("id", |d: &Doc| vec![FieldValue::Int(d.id as i32)]).stored())
        .field(FieldDef::exact("all", |_: &Doc| vec![FieldValue::from("yes")]))
        .field(FieldDef::exact("parity", |d: &Doc| {
            vec![FieldValue::from(if d.id % 2 == 0 { "even" } else { "odd" })]
        }))
        .field(FieldDef::full_text("title", |d: &Doc| vec![FieldValue::from(d.title.clone())]).stored())
        .build()
        .unwrap()
}

fn index(n: u32) -> Arc<MemoryIndex<Doc>> {
    index_with_max(n, 10_000)
}

fn index_with_max(n: u32, max_limit: usize) -> Arc<MemoryIndex<Doc>> {
    let index = MemoryIndex::new(schema(), max_limit);
    for id in 1..=n {
        let title = match id % 4 {
            0 => "The Quick Brown",
            1 => "A quick red fox",
            2 => "Slow brown bear",
            _ => "Nothing here",
        };
        index.insert(Doc { id, title: title.to_string() }).unwrap();
    }
    Arc::new(index)
}

fn processor(index: &Arc<MemoryIndex<Doc>>, config: IndexConfig) -> QueryProcessor<Doc> {
    let dyn_index: Arc<dyn Index<Doc>> = index.clone();
    let rewriter = Arc::new(IndexRewriter::new(Arc::clone(&dyn_index)));
    QueryProcessor::new(dyn_index, rewriter, Arc::new(config)).with_visibility(visible())
}

fn leaf(index: &MemoryIndex<Doc>, field: &str, value: &str) -> Predicate<Doc> {
    let field = Arc::clone(index.schema().field(field).unwrap());
    Predicate::new(IndexPredicate::new(field, value).unwrap())
}

/// Hides every third document
fn visible() -> Predicate<Doc> {
    Predicate::new(MatchablePredicate::new("visible", "", 10, |d: &Doc, _| d.id % 3 != 0))
}

fn ids(result: &QueryResult<Doc>) -> Vec<u32> {
    result.entities().iter().map(|d| d.id).collect()
}

// =============================================================================
// Restart Compensation
// =============================================================================

/// Of 100 documents every third is invisible; a page of 10 still comes
/// back full.
#[test]
fn test_filtered_page_is_filled() {
    let index = index(100);
    let before = MetricsRegistry::global().snapshot().source_restarts;

    let mut p = processor(&index, IndexConfig::default()).with_user_limit(10);
    let result = p.query(leaf(&index, "all", "yes")).unwrap();

    assert_eq!(ids(&result), vec![1, 2, 4, 5, 7, 8, 10, 11, 13, 14]);
    assert!(result.more());
    assert!(MetricsRegistry::global().snapshot().source_restarts > before);
}

#[test]
fn test_search_after_matches_offset_restarts() {
    let index = index(100);
    let config = IndexConfig {
        pagination_type: PaginationType::SearchAfter,
        ..IndexConfig::default()
    };
    let mut p = processor(&index, config).with_user_limit(10);
    let result = p.query(leaf(&index, "all", "yes")).unwrap();
    assert_eq!(ids(&result), vec![1, 2, 4, 5, 7, 8, 10, 11, 13, 14]);
}

#[test]
fn test_second_page_with_search_after() {
    let index = index(100);
    let config = IndexConfig {
        pagination_type: PaginationType::SearchAfter,
        ..IndexConfig::default()
    };
    let mut p = processor(&index, config).with_user_limit(10).with_start(10);
    let result = p.query(leaf(&index, "all", "yes")).unwrap();
    assert_eq!(ids(&result), vec![16, 17, 19, 20, 22, 23, 25, 26, 28, 29]);
    assert!(result.more());
}

/// With one restart allowed and pages of three, only two pages are read.
#[test]
fn test_restart_cap_returns_partial_page() {
    let index = index(100);
    let config = IndexConfig {
        max_restarts: 1,
        initial_page_size: 2,
        ..IndexConfig::default()
    };
    let mut p = processor(&index, config).with_user_limit(10);
    let result = p.query(leaf(&index, "all", "yes")).unwrap();
    assert_eq!(ids(&result), vec![1, 2, 4, 5]);
    assert!(!result.more());
}

// =============================================================================
// Deep Pages
// =============================================================================

/// The index returns at most 50 documents per read while the page ends at
/// document 56.
#[test]
fn test_deep_page_past_index_maximum() {
    let index = index_with_max(300, 50);
    let mut p = processor(&index, IndexConfig::default())
        .enforce_visibility(false)
        .with_start(45)
        .with_user_limit(10);
    let result = p.query(leaf(&index, "all", "yes")).unwrap();
    assert_eq!(ids(&result), (46..=55).collect::<Vec<_>>());
    assert!(result.more());
}

#[test]
fn test_filtered_deep_page_past_index_maximum() {
    let index = index_with_max(300, 50);
    let mut p = processor(&index, IndexConfig::default())
        .with_start(45)
        .with_user_limit(10);
    let result = p.query(leaf(&index, "all", "yes")).unwrap();
    assert_eq!(ids(&result), vec![68, 70, 71, 73, 74, 76, 77, 79, 80, 82]);
    assert!(result.more());
}

#[test]
fn test_deep_page_with_search_after() {
    let index = index_with_max(300, 50);
    let config = IndexConfig {
        pagination_type: PaginationType::SearchAfter,
        ..IndexConfig::default()
    };
    let mut p = processor(&index, config).with_start(45).with_user_limit(10);
    let result = p.query(leaf(&index, "all", "yes")).unwrap();
    assert_eq!(ids(&result), vec![68, 70, 71, 73, 74, 76, 77, 79, 80, 82]);
    assert!(result.more());
}

/// The last page of a capped index ends exactly at the final document.
#[test]
fn test_last_page_past_index_maximum() {
    let index = index_with_max(60, 50);
    let mut p = processor(&index, IndexConfig::default())
        .enforce_visibility(false)
        .with_start(50)
        .with_user_limit(10);
    let result = p.query(leaf(&index, "all", "yes")).unwrap();
    assert_eq!(ids(&result), (51..=60).collect::<Vec<_>>());
    assert!(!result.more());
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn test_full_text_token_subset() {
    let index = index(8);
    let mut p = processor(&index, IndexConfig::default()).enforce_visibility(false);
    let result = p.query(leaf(&index, "title", "quick brown")).unwrap();
    assert_eq!(ids(&result), vec![4, 8]);

    let mut p = processor(&index, IndexConfig::default()).enforce_visibility(false);
    let result = p.query(leaf(&index, "title", "quick fox")).unwrap();
    assert_eq!(ids(&result), vec![1, 5]);
}

#[test]
fn test_truncation_boundary() {
    let eleven_odd = index(22);
    let mut p = processor(&eleven_odd, IndexConfig::default())
        .enforce_visibility(false)
        .with_user_limit(10);
    let odd = p.query(leaf(&eleven_odd, "parity", "odd")).unwrap();
    assert_eq!(odd.len(), 10);
    assert!(odd.more());

    let ten_even = index(20);
    let mut p = processor(&ten_even, IndexConfig::default())
        .enforce_visibility(false)
        .with_user_limit(10);
    let even = p.query(leaf(&ten_even, "parity", "even")).unwrap();
    assert_eq!(even.len(), 10);
    assert!(!even.more());
}

/// A permitted limit of zero disables the processor: results are empty and
/// the index is never searched.
#[test]
fn test_disabled_processor() {
    let index = index(30);
    let mut p = processor(&index, IndexConfig::default()).with_permitted_limit(0);
    assert!(p.is_disabled());

    for _ in 0..2 {
        let result = p.query(leaf(&index, "all", "yes")).unwrap();
        assert!(result.is_empty());
        assert!(!result.more());
    }
    assert_eq!(p.state(), ProcessorState::Disabled);
    assert_eq!(index.search_count(), 0);
}

/// Entities reached through both branches of an OR are returned once.
#[test]
fn test_union_deduplicates() {
    let index = index(20);
    let below_ten = Predicate::new(MatchablePredicate::new("below", "10", 5, |d: &Doc, _| d.id < 10));
    let pred = Predicate::or(vec![
        leaf(&index, "parity", "odd"),
        Predicate::and(vec![leaf(&index, "all", "yes"), below_ten]),
    ])
    .unwrap();

    let mut p = processor(&index, IndexConfig::default()).enforce_visibility(false);
    let result = p.query(pred).unwrap();
    let got = ids(&result);
    let unique: BTreeSet<u32> = got.iter().copied().collect();

    assert_eq!(got.len(), unique.len());
    let expected: BTreeSet<u32> = (1..=20).filter(|id| id % 2 == 1 || *id < 10).collect();
    assert_eq!(unique, expected);
}

// =============================================================================
// Raw Reads
// =============================================================================

#[test]
fn test_raw_read_returns_requested_fields() {
    let index = index(6);
    let dyn_index: Arc<dyn Index<Doc>> = index.clone();
    let fields: BTreeSet<String> = ["title".to_string()].into_iter().collect();
    let opts = QueryOptions::new(Arc::new(IndexConfig::default()), 0, 10, 10, fields).unwrap();
    let source = IndexedQuery::new(dyn_index, leaf(&index, "parity", "even"), opts);

    let bundles = source.read_raw().unwrap().to_list().unwrap();
    assert_eq!(bundles.len(), 3);
    assert!(bundles.iter().all(|b| b.has_field("title") && !b.has_field("id")));
    assert_eq!(
        bundles[0].get_value("title").unwrap(),
        &FieldValue::from("Slow brown bear")
    );
}
