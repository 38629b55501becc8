//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use querydex::change::{change_rules, change_schema, visible_to, Change, ChangeQueryBuilder, ChangeStatus};
use querydex::config::IndexConfig;
use querydex::index::{Index, MemoryIndex};
use querydex::processor::QueryProcessor;
use querydex::rewrite::{IndexRewriter, Rewriter};

pub const PROJECTS: [&str; 3] = ["core", "docs", "plugins"];
pub const OWNERS: [&str; 3] = ["alice", "bob", "carol"];

/// Deterministic change number `id`
///
/// Status, project and owner cycle at different rates; every seventh change is
/// private; `updated` advances one day per id from 2024-01-01.
pub fn change(id: u32) -> Change {
    let status = ChangeStatus::ALL[(id % 3) as usize];
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    Change {
        id,
        key: format!("I{:08x}", id * 4099),
        project: PROJECTS[(id % 4 % 3) as usize].to_string(),
        branch: if id % 2 == 0 { "main" } else { "stable" }.to_string(),
        status,
        owner: OWNERS[(id % 5 % 3) as usize].to_string(),
        subject: format!("Change number {}", id),
        message: if id % 4 == 0 {
            "Refactor the Query Parser".to_string()
        } else {
            "Update documentation".to_string()
        },
        topic: (id % 5 == 0).then(|| "release".to_string()),
        hashtags: if id % 6 == 0 { vec!["Perf".to_string()] } else { vec![] },
        files: vec![format!("src/file{}.rs", id % 4)],
        insertions: id * 3,
        deletions: id,
        created: base + Duration::days(i64::from(id)) - Duration::hours(1),
        updated: base + Duration::days(i64::from(id)),
        private: id % 7 == 0,
        comments: if id % 9 == 0 {
            vec!["Looks good to me".to_string()]
        } else {
            vec![]
        },
    }
}

pub fn changes(n: u32) -> Vec<Change> {
    (1..=n).map(change).collect()
}

/// A loaded change index and everything needed to query it
pub struct Engine {
    pub index: Arc<MemoryIndex<Change>>,
    pub builder: ChangeQueryBuilder,
    pub config: Arc<IndexConfig>,
}

impl Engine {
    pub fn new(n: u32, config: IndexConfig) -> Self {
        let index = MemoryIndex::new(change_schema().unwrap(), config.max_limit);
        index.insert_all(changes(n)).unwrap();
        let builder = ChangeQueryBuilder::new(Arc::new(change_schema().unwrap()))
            .with_now(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());
        Self {
            index: Arc::new(index),
            builder,
            config: Arc::new(config),
        }
    }

    pub fn with_user(mut self, user: &str) -> Self {
        self.builder = self.builder.with_self_user(user);
        self
    }

    pub fn processor(&self, user: &str) -> QueryProcessor<Change> {
        let index: Arc<dyn Index<Change>> = self.index.clone();
        let rewriter: Arc<dyn Rewriter<Change>> =
            Arc::new(IndexRewriter::new(Arc::clone(&index)).with_rules(change_rules(&self.builder).unwrap()));
        QueryProcessor::new(index, rewriter, Arc::clone(&self.config)).with_visibility(visible_to(user))
    }

    /// Ids of the changes matching `query`, computed by direct evaluation
    pub fn expected(&self, query: &str, user: &str, n: u32) -> Vec<u32> {
        use querydex::query::QueryBuilder;
        let pred = self.builder.parse(query).unwrap();
        let visible = visible_to(user);
        changes(n)
            .into_iter()
            .filter(|c| pred.matches(c).unwrap() && visible.matches(c).unwrap())
            .map(|c| c.id)
            .collect()
    }
}

pub fn ids(changes: &[Change]) -> Vec<u32> {
    changes.iter().map(|c| c.id).collect()
}
