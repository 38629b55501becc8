//! Query operators over changes

use std::sync::{Arc, OnceLock};

use chrono::{DateTime, Utc};
use regex::Regex;

use super::entity::{Change, ChangeStatus};
use super::visibility::visible_to;
use crate::error::{EngineError, EngineResult};
use crate::predicate::{
    parse_age, parse_timestamp, tokenize, IndexPredicate, LimitPredicate, MatchablePredicate,
    Predicate, TimestampRange,
};
use crate::query::{OperatorRegistry, QueryBuilder, QueryParseError, Term};
use crate::schema::{FieldDef, Schema};

const LEGACY_ID_PATTERN: &str = r"^[1-9][0-9]*$";
const CHANGE_KEY_PATTERN: &str = r"^[iI][0-9a-f]{4,}.*$";

/// Cost of scanning review comments in memory
const COMMENT_COST: u64 = 5;

fn legacy_id_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(LEGACY_ID_PATTERN).expect("legacy id pattern is valid"))
}

fn change_key_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(CHANGE_KEY_PATTERN).expect("change key pattern is valid"))
}

/// Compiles change queries against the change schema
///
/// `now` anchors relative ages; `self_user` resolves `owner:self` and
/// `is:owner`.
pub struct ChangeQueryBuilder {
    schema: Arc<Schema<Change>>,
    now: DateTime<Utc>,
    self_user: Option<String>,
}

impl ChangeQueryBuilder {
    pub fn new(schema: Arc<Schema<Change>>) -> Self {
        Self {
            schema,
            now: Utc::now(),
            self_user: None,
        }
    }

    /// Pin the instant relative ages are measured from
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    pub fn with_self_user(mut self, user: impl Into<String>) -> Self {
        self.self_user = Some(user.into());
        self
    }

    pub fn schema(&self) -> &Arc<Schema<Change>> {
        &self.schema
    }

    fn field(&self, name: &str) -> EngineResult<Arc<FieldDef<Change>>> {
        self.schema
            .field(name)
            .cloned()
            .ok_or_else(|| EngineError::Unsupported(format!("field {} is not indexed", name)))
    }

    fn index(&self, field: &str, value: &str) -> EngineResult<Predicate<Change>> {
        Ok(Predicate::new(IndexPredicate::new(self.field(field)?, value)?))
    }

    /// `field` restricted to `range`, shown as `operator:value`
    fn time_range(
        &self,
        field: &str,
        operator: &str,
        value: &str,
        range: TimestampRange,
    ) -> EngineResult<Predicate<Change>> {
        Ok(Predicate::new(IndexPredicate::time_range(
            self.field(field)?,
            operator,
            value,
            range,
        )?))
    }

    fn current_user(&self, operator: &str, value: &str) -> EngineResult<&str> {
        self.self_user.as_deref().ok_or_else(|| {
            QueryParseError::invalid_value(operator, value, "no current user").into()
        })
    }

    fn status_of(&self, status: ChangeStatus) -> EngineResult<Predicate<Change>> {
        self.index("status", status.as_str())
    }
}

fn change(b: &ChangeQueryBuilder, value: &str) -> EngineResult<Predicate<Change>> {
    if legacy_id_regex().is_match(value) {
        let pred = IndexPredicate::new(b.field("legacy_id")?, value)?.with_operator("change");
        return Ok(Predicate::new(pred));
    }
    if change_key_regex().is_match(value) {
        let key = format!("I{}", &value[1..]);
        let pred = IndexPredicate::new(b.field("change_key")?, key)?.with_operator("change");
        return Ok(Predicate::new(pred));
    }
    Err(QueryParseError::invalid_value("change", value, "not a change number or Change-Id").into())
}

fn project(b: &ChangeQueryBuilder, value: &str) -> EngineResult<Predicate<Change>> {
    b.index("project", value)
}

fn projects(b: &ChangeQueryBuilder, value: &str) -> EngineResult<Predicate<Change>> {
    b.index("projects", value)
}

fn branch(b: &ChangeQueryBuilder, value: &str) -> EngineResult<Predicate<Change>> {
    b.index("branch", value.strip_prefix("refs/heads/").unwrap_or(value))
}

fn status(b: &ChangeQueryBuilder, value: &str) -> EngineResult<Predicate<Change>> {
    match value.to_ascii_lowercase().as_str() {
        "open" | "pending" => b.status_of(ChangeStatus::New),
        "closed" => Predicate::or(vec![
            b.status_of(ChangeStatus::Merged)?,
            b.status_of(ChangeStatus::Abandoned)?,
        ]),
        other => match ChangeStatus::parse(other) {
            Some(s) => b.status_of(s),
            None => Err(QueryParseError::invalid_value("status", value, "unrecognized status").into()),
        },
    }
}

fn is(b: &ChangeQueryBuilder, value: &str) -> EngineResult<Predicate<Change>> {
    match value.to_ascii_lowercase().as_str() {
        "private" => b.index("private", "true"),
        "owner" => b.index("owner", b.current_user("is", value)?),
        "open" | "pending" | "closed" | "new" | "merged" | "abandoned" => status(b, value),
        _ => Err(QueryParseError::invalid_value("is", value, "unrecognized value").into()),
    }
}

fn owner(b: &ChangeQueryBuilder, value: &str) -> EngineResult<Predicate<Change>> {
    if value.eq_ignore_ascii_case("self") {
        return b.index("owner", b.current_user("owner", value)?);
    }
    b.index("owner", value)
}

fn topic(b: &ChangeQueryBuilder, value: &str) -> EngineResult<Predicate<Change>> {
    b.index("topic", value)
}

fn prefix_topic(b: &ChangeQueryBuilder, value: &str) -> EngineResult<Predicate<Change>> {
    b.index("prefix_topic", value)
}

fn hashtag(b: &ChangeQueryBuilder, value: &str) -> EngineResult<Predicate<Change>> {
    let tag = value.trim_start_matches('#').to_lowercase();
    if tag.is_empty() {
        return Err(QueryParseError::invalid_value("hashtag", value, "empty hashtag").into());
    }
    b.index("hashtag", &tag)
}

fn file(b: &ChangeQueryBuilder, value: &str) -> EngineResult<Predicate<Change>> {
    b.index("file", value)
}

fn message(b: &ChangeQueryBuilder, value: &str) -> EngineResult<Predicate<Change>> {
    b.index("message", value)
}

fn comment_matches(change: &Change, value: &str) -> bool {
    let wanted = tokenize(value);
    change
        .comments
        .iter()
        .any(|c| wanted.is_subset(&tokenize(c)))
}

fn comment(_: &ChangeQueryBuilder, value: &str) -> EngineResult<Predicate<Change>> {
    if tokenize(value).is_empty() {
        return Err(QueryParseError::invalid_value("comment", value, "no searchable words").into());
    }
    Ok(Predicate::new(MatchablePredicate::new(
        "comment",
        value,
        COMMENT_COST,
        comment_matches,
    )))
}

fn added(b: &ChangeQueryBuilder, value: &str) -> EngineResult<Predicate<Change>> {
    b.index("added", value)
}

fn deleted(b: &ChangeQueryBuilder, value: &str) -> EngineResult<Predicate<Change>> {
    b.index("deleted", value)
}

fn delta(b: &ChangeQueryBuilder, value: &str) -> EngineResult<Predicate<Change>> {
    b.index("delta", value)
}

fn instant(operator: &str, value: &str) -> EngineResult<DateTime<Utc>> {
    parse_timestamp(value)
        .ok_or_else(|| QueryParseError::invalid_value(operator, value, "not a timestamp").into())
}

fn before(b: &ChangeQueryBuilder, value: &str) -> EngineResult<Predicate<Change>> {
    let t = instant("before", value)?;
    b.time_range("updated", "before", value, TimestampRange::at_or_before(t))
}

fn after(b: &ChangeQueryBuilder, value: &str) -> EngineResult<Predicate<Change>> {
    let t = instant("after", value)?;
    b.time_range("updated", "after", value, TimestampRange::at_or_after(t))
}

fn age(b: &ChangeQueryBuilder, value: &str) -> EngineResult<Predicate<Change>> {
    let age = parse_age(value)
        .ok_or_else(|| QueryParseError::invalid_value("age", value, "not a duration"))?;
    let cutoff = b
        .now
        .checked_sub_signed(age)
        .ok_or_else(|| QueryParseError::invalid_value("age", value, "out of range"))?;
    b.time_range("updated", "age", value, TimestampRange::at_or_before(cutoff))
}

fn limit(_: &ChangeQueryBuilder, value: &str) -> EngineResult<Predicate<Change>> {
    Ok(Predicate::new(LimitPredicate::new("limit", value)?))
}

fn visibleto(_: &ChangeQueryBuilder, value: &str) -> EngineResult<Predicate<Change>> {
    Ok(visible_to(value))
}

fn registry() -> &'static OperatorRegistry<ChangeQueryBuilder, Change> {
    static REGISTRY: OnceLock<OperatorRegistry<ChangeQueryBuilder, Change>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        OperatorRegistry::builder()
            .operator("change", change)
            .operator("project", project)
            .alias("p", "project")
            .alias("repo", "project")
            .operator("projects", projects)
            .operator("branch", branch)
            .operator("status", status)
            .operator("is", is)
            .operator("owner", owner)
            .alias("o", "owner")
            .operator("topic", topic)
            .operator("prefixtopic", prefix_topic)
            .operator("hashtag", hashtag)
            .operator("file", file)
            .alias("f", "file")
            .operator("message", message)
            .operator("comment", comment)
            .operator("added", added)
            .operator("deleted", deleted)
            .operator("delta", delta)
            .alias("size", "delta")
            .operator("before", before)
            .alias("until", "before")
            .operator("after", after)
            .alias("since", "after")
            .operator("age", age)
            .validated("limit", "[0-9]+", limit)
            .operator("visibleto", visibleto)
            .build()
    })
}

impl QueryBuilder<Change> for ChangeQueryBuilder {
    fn registry(&self) -> &OperatorRegistry<Self, Change> {
        registry()
    }

    /// A bare term searches every field it could plausibly name
    fn default_field(&self, term: &Term) -> EngineResult<Predicate<Change>> {
        let text = term.text();
        let mut candidates = Vec::new();
        if legacy_id_regex().is_match(text) || change_key_regex().is_match(text) {
            candidates.extend(change(self, text).ok());
        }
        let handlers: [fn(&Self, &str) -> EngineResult<Predicate<Change>>; 5] =
            [project, branch, topic, message, file];
        candidates.extend(handlers.iter().filter_map(|h| h(self, text).ok()));
        if candidates.is_empty() {
            return Err(QueryParseError::UnsupportedQuery(term.to_string()).into());
        }
        Predicate::or(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::change_schema;
    use crate::predicate::NodeKind;
    use chrono::TimeZone;

    fn builder() -> ChangeQueryBuilder {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        ChangeQueryBuilder::new(Arc::new(change_schema().unwrap()))
            .with_now(now)
            .with_self_user("alice")
    }

    fn compile(query: &str) -> String {
        builder().parse(query).unwrap().to_string()
    }

    // =========================================================================
    // Operators
    // =========================================================================

    #[test]
    fn test_aliases_resolve() {
        assert_eq!(compile("p:core"), "project:core");
        assert_eq!(compile("repo:core"), "project:core");
        assert_eq!(compile("f:README"), "file:README");
        assert_eq!(compile("size:>10"), "delta:>10");
    }

    #[test]
    fn test_change_number_and_key() {
        assert_eq!(compile("change:42"), "change:42");
        assert_eq!(compile("change:i1234abcd"), "change:I1234abcd");
        assert!(builder().parse("change:xyz").is_err());
    }

    #[test]
    fn test_status_values() {
        assert_eq!(compile("status:open"), "status:new");
        assert_eq!(compile("status:closed"), "(status:merged OR status:abandoned)");
        assert_eq!(compile("is:merged"), "status:merged");
        assert_eq!(builder().parse("status:lost").unwrap_err().code(), "QDX_INVALID_VALUE");
    }

    #[test]
    fn test_self_user() {
        assert_eq!(compile("owner:self"), "owner:alice");
        assert_eq!(compile("is:owner"), "owner:alice");
        let anonymous = ChangeQueryBuilder::new(Arc::new(change_schema().unwrap()));
        assert!(anonymous.parse("owner:self").is_err());
    }

    #[test]
    fn test_branch_and_hashtag_normalized() {
        assert_eq!(compile("branch:refs/heads/main"), "branch:main");
        assert_eq!(compile("hashtag:#Perf"), "hashtag:perf");
    }

    /// `age` is measured back from the builder's clock.
    #[test]
    fn test_age_bounds_updated() {
        let pred = builder().parse("age:2d").unwrap();
        let range = pred.as_index_predicate().unwrap().time_bounds().unwrap();
        assert_eq!(range.max, Some(Utc.with_ymd_and_hms(2024, 5, 30, 0, 0, 0).unwrap()));
        assert_eq!(pred.to_string(), "age:2d");
    }

    #[test]
    fn test_before_and_after() {
        let pred = builder().parse("after:2024-01-01 before:2024-02-01").unwrap();
        assert_eq!(pred.kind(), NodeKind::And);
        assert!(builder().parse("before:yesterday").is_err());
    }

    #[test]
    fn test_limit_operator() {
        let pred = builder().parse("project:core limit:5").unwrap();
        assert_eq!(pred.find_limit(), Some(5));
        assert!(builder().parse("limit:five").is_err());
    }

    #[test]
    fn test_integer_ranges_validated() {
        assert_eq!(compile("added:>=3"), "added:>=3");
        assert_eq!(compile("delta:-5"), "delta:-5");
        assert!(builder().parse("deleted:lots").is_err());
    }

    // =========================================================================
    // Default field
    // =========================================================================

    #[test]
    fn test_default_field_expands() {
        assert_eq!(
            compile("core"),
            "(project:core OR branch:core OR topic:core OR message:core OR file:core)"
        );
    }

    #[test]
    fn test_default_field_number_includes_change() {
        let pred = builder().parse("42").unwrap();
        assert_eq!(pred.child(0).unwrap().to_string(), "change:42");
        assert_eq!(pred.child_count(), 6);
    }

    #[test]
    fn test_unsupported_operator() {
        assert_eq!(
            builder().parse("reviewer:bob").unwrap_err(),
            QueryParseError::UnsupportedOperator("reviewer".into())
        );
    }
}
