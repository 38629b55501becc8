//! Page collection shared by the restarting sources

use super::result_set::ResultSet;
use crate::config::PaginationType;
use crate::entity::Entity;
use crate::error::EngineResult;
use crate::observability::{log_event, Event, MetricsRegistry};
use crate::predicate::Predicate;
use crate::processor::QueryOptions;

/// When a paginated source is read again after a full page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RestartPolicy {
    /// Only once post-filtering has dropped at least one entity
    OnSkip,
    /// Whenever fewer than the needed results were collected
    UntilSatisfied,
}

/// Where the first page was read from
pub(crate) struct FirstPage<T> {
    pub results: ResultSet<T>,
    pub start: usize,
    pub page_size: usize,
}

/// Consume `first`, then restart `source` until `needed` entities passing
/// every filter are collected
///
/// A page shorter than the size the source could return means the source
/// is exhausted. A page cut at the source's maximum page size is always
/// followed by a restart; otherwise the policy decides. The configured
/// restart cap bounds the loop.
pub(crate) fn collect<T: Entity>(
    label: &str,
    source: &Predicate<T>,
    first: FirstPage<T>,
    filters: &[Predicate<T>],
    needed: usize,
    policy: RestartPolicy,
    opts: &QueryOptions,
) -> EngineResult<Vec<T>> {
    let config = opts.config();
    let paginated = source.as_data_source().and_then(|ds| ds.as_paginated());

    let mut matched = Vec::with_capacity(needed.min(config.max_limit));
    let mut page = first.results;
    let mut page_size = first.page_size;
    let mut offset = first.start;
    let mut restarts = 0usize;
    let mut skipped = 0usize;

    loop {
        let (entities, cursor) = page.into_page()?;
        let page_count = entities.len();
        offset += page_count;

        for entity in entities {
            if matched.len() >= needed {
                break;
            }
            if accepts(filters, &entity)? {
                matched.push(entity);
            } else {
                skipped += 1;
            }
        }

        if matched.len() >= needed {
            break;
        }
        let Some(paginated) = paginated else {
            break;
        };
        let cap = paginated.max_page_size();
        if page_count < page_size.min(cap) {
            break;
        }
        let truncated = page_size > cap;
        if policy == RestartPolicy::OnSkip && skipped == 0 && !truncated {
            break;
        }
        if config.max_restarts != 0 && restarts >= config.max_restarts {
            let cap = config.max_restarts.to_string();
            let collected = matched.len().to_string();
            log_event(
                Event::RestartCapReached,
                &[
                    ("source", label),
                    ("restarts", cap.as_str()),
                    ("collected", collected.as_str()),
                ],
            );
            break;
        }

        page_size = opts.next_page_size(page_size);
        restarts += 1;
        MetricsRegistry::global().increment_source_restarts();
        let offset_str = offset.to_string();
        let page_size_str = page_size.to_string();
        log_event(
            Event::SourceRestarted,
            &[
                ("source", label),
                ("offset", offset_str.as_str()),
                ("page_size", page_size_str.as_str()),
            ],
        );

        page = match (config.pagination_type, cursor) {
            (PaginationType::SearchAfter, Some(cursor)) => {
                paginated.restart_after(&cursor, page_size)?
            }
            _ => paginated.restart(offset, page_size)?,
        };
    }

    MetricsRegistry::global().add_entities_filtered(skipped as u64);
    Ok(matched)
}

fn accepts<T: Entity>(filters: &[Predicate<T>], entity: &T) -> EngineResult<bool> {
    for filter in filters {
        if !filter.matches(entity)? {
            return Ok(false);
        }
    }
    Ok(true)
}
