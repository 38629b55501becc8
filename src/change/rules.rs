//! Rewrite rules for change queries

use std::sync::Arc;

use super::builder::ChangeQueryBuilder;
use super::entity::{Change, ChangeStatus};
use crate::error::{EngineError, EngineResult};
use crate::predicate::{IndexPredicate, Predicate, TimestampRange};
use crate::query::QueryBuilder;
use crate::rewrite::{Captures, Rule, RuleRewriter};
use crate::schema::FieldDef;

fn field(builder: &ChangeQueryBuilder, name: &str) -> EngineResult<Arc<FieldDef<Change>>> {
    builder
        .schema()
        .field(name)
        .cloned()
        .ok_or_else(|| EngineError::Unsupported(format!("field {} is not indexed", name)))
}

/// `-status:X` becomes the disjunction of every other status
fn negated_status(builder: &ChangeQueryBuilder) -> EngineResult<Rule<Change>> {
    let pattern = builder.compile_pattern("-S=(status:*)")?;
    let status = field(builder, "status")?;
    Ok(Rule::new("negated_status", pattern, move |c: &Captures<'_, Change>| {
        let excluded = c.value("S")?;
        let others = ChangeStatus::ALL
            .iter()
            .filter(|s| !s.as_str().eq_ignore_ascii_case(excluded))
            .map(|s| -> EngineResult<Predicate<Change>> {
                Ok(Predicate::new(IndexPredicate::new(status.clone(), s.as_str())?))
            })
            .collect::<EngineResult<Vec<_>>>()?;
        Predicate::or(others)
    }))
}

fn bounds(c: &Captures<'_, Change>, variable: &str) -> EngineResult<TimestampRange> {
    c.get(variable)?
        .as_index_predicate()
        .and_then(IndexPredicate::time_bounds)
        .ok_or_else(|| EngineError::InvalidPredicate(format!("{} is not a time range", variable)))
}

/// `after:X before:Y` becomes a single `updated` range
fn merge_updated_range(builder: &ChangeQueryBuilder) -> EngineResult<Rule<Change>> {
    let pattern = builder.compile_pattern("A=(after:*) B=(before:*)")?;
    let updated = field(builder, "updated")?;
    let rule = Rule::new("merge_updated_range", pattern, move |c: &Captures<'_, Change>| {
        let range = bounds(c, "A")?.intersect(&bounds(c, "B")?);
        let pred = IndexPredicate::time_range(updated.clone(), "updated", range.to_string(), range)?;
        Ok(Predicate::new(pred))
    });
    Ok(rule.first_match())
}

/// The rule set applied to every change query before execution
pub fn change_rules(builder: &ChangeQueryBuilder) -> EngineResult<RuleRewriter<Change>> {
    Ok(RuleRewriter::new(vec![
        negated_status(builder)?,
        merge_updated_range(builder)?,
    ]))
}
