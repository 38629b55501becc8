//! Index schema for changes

use super::entity::Change;
use crate::schema::{FieldDef, FieldValue, Schema, SchemaResult};

pub const SCHEMA_NAME: &str = "changes";
pub const SCHEMA_VERSION: u32 = 1;

fn clamp(n: u32) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

fn legacy_id(c: &Change) -> Vec<FieldValue> {
    vec![FieldValue::Long(i64::from(c.id))]
}

fn change_key(c: &Change) -> Vec<FieldValue> {
    vec![FieldValue::from(c.key.as_str())]
}

fn project(c: &Change) -> Vec<FieldValue> {
    vec![FieldValue::from(c.project.as_str())]
}

fn branch(c: &Change) -> Vec<FieldValue> {
    vec![FieldValue::from(c.branch.as_str())]
}

fn status(c: &Change) -> Vec<FieldValue> {
    vec![FieldValue::from(c.status.as_str())]
}

fn owner(c: &Change) -> Vec<FieldValue> {
    vec![FieldValue::from(c.owner.as_str())]
}

fn topic(c: &Change) -> Vec<FieldValue> {
    c.topic.iter().map(|t| FieldValue::from(t.as_str())).collect()
}

fn hashtags(c: &Change) -> Vec<FieldValue> {
    c.hashtags
        .iter()
        .map(|h| FieldValue::from(h.to_lowercase()))
        .collect()
}

fn files(c: &Change) -> Vec<FieldValue> {
    c.files.iter().map(|f| FieldValue::from(f.as_str())).collect()
}

fn message(c: &Change) -> Vec<FieldValue> {
    vec![FieldValue::from(format!("{}\n{}", c.subject, c.message))]
}

fn added(c: &Change) -> Vec<FieldValue> {
    vec![FieldValue::Int(clamp(c.insertions))]
}

fn deleted(c: &Change) -> Vec<FieldValue> {
    vec![FieldValue::Int(clamp(c.deletions))]
}

fn delta(c: &Change) -> Vec<FieldValue> {
    vec![FieldValue::Int(clamp(c.insertions.saturating_add(c.deletions)))]
}

fn created(c: &Change) -> Vec<FieldValue> {
    vec![FieldValue::Timestamp(c.created)]
}

fn updated(c: &Change) -> Vec<FieldValue> {
    vec![FieldValue::Timestamp(c.updated)]
}

fn subject(c: &Change) -> Vec<FieldValue> {
    vec![FieldValue::from(c.subject.as_str())]
}

fn private(c: &Change) -> Vec<FieldValue> {
    vec![FieldValue::from(if c.private { "true" } else { "false" })]
}

/// Fields indexed for every change
pub fn change_schema() -> SchemaResult<Schema<Change>> {
    Schema::builder(SCHEMA_NAME, SCHEMA_VERSION)
        .field(FieldDef::long("legacy_id", legacy_id).unique().stored())
        .field(FieldDef::prefix("change_key", change_key))
        .field(FieldDef::exact("project", project).stored())
        .field(FieldDef::prefix("projects", project))
        .field(FieldDef::exact("branch", branch).stored())
        .field(FieldDef::exact("status", status).stored())
        .field(FieldDef::exact("owner", owner).stored())
        .field(FieldDef::exact("topic", topic))
        .field(FieldDef::prefix("prefix_topic", topic))
        .field(FieldDef::exact("hashtag", hashtags).repeatable())
        .field(FieldDef::exact("file", files).repeatable())
        .field(FieldDef::full_text("message", message))
        .field(FieldDef::integer_range("added", added))
        .field(FieldDef::integer_range("deleted", deleted))
        .field(FieldDef::integer_range("delta", delta))
        .field(FieldDef::timestamp("created", created))
        .field(FieldDef::timestamp("updated", updated).stored())
        .field(FieldDef::stored_only("subject", subject))
        .field(FieldDef::exact("private", private))
        .build()
}
