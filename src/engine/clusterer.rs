//! Partition one underlying's executions into atomic execution groups.
//!
//! Pipeline per time cluster:
//! 1. fills within the simultaneity window of the cluster's first fill cluster
//!    together;
//! 2. a cluster that validates as a spread (or an assignment) stays intact,
//!    otherwise it is split by order id and each order re-validated;
//! 3. every group is split by expiration proximity;
//! 4. groups not validated as spreads are split by strike.

use super::{assignment, derive_leg_id, spread, GroupingConfig};
use crate::domain::{sort_executions_stable, Decimal, Execution};
use chrono::NaiveDate;

/// Why a group was kept together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKind {
    /// Validated multi-leg order.
    Spread,
    /// Option settling into stock in the same instant.
    Assignment,
    /// Result of splitting; no multi-leg guarantee.
    Split,
}

/// Fills the position tracker processes as one atomic unit.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionGroup<'a> {
    pub kind: GroupKind,
    pub executions: Vec<&'a Execution>,
}

impl<'a> ExecutionGroup<'a> {
    pub fn new(kind: GroupKind, executions: Vec<&'a Execution>) -> Self {
        Self { kind, executions }
    }
}

/// Fills tagged with their position in the time-sorted input.
type Indexed<'a> = Vec<(usize, &'a Execution)>;

fn strip<'a>(group: &Indexed<'a>) -> Vec<&'a Execution> {
    group.iter().map(|(_, e)| *e).collect()
}

/// Group executions for one underlying, in chronological order of each
/// group's first fill.
pub fn cluster_executions<'a>(
    executions: &'a [Execution],
    config: &GroupingConfig,
) -> Vec<ExecutionGroup<'a>> {
    let sorted = sort_executions_stable(executions);
    let indexed: Indexed<'a> = sorted.into_iter().enumerate().collect();

    let mut groups = Vec::new();
    for cluster in time_clusters(indexed, config.simultaneity_window_ms) {
        groups.extend(split_cluster(cluster, config));
    }
    groups
}

/// Split on gaps: a new cluster starts when a fill is more than `window_ms`
/// after the current cluster's first fill.
fn time_clusters(sorted: Indexed<'_>, window_ms: i64) -> Vec<Indexed<'_>> {
    let mut clusters: Vec<Indexed<'_>> = Vec::new();
    for item in sorted {
        let start_new = match clusters.last().and_then(|c| c.first()) {
            Some((_, first)) => item.1.time_ms.since(first.time_ms) > window_ms,
            None => true,
        };
        if start_new {
            clusters.push(vec![item]);
        } else if let Some(current) = clusters.last_mut() {
            current.push(item);
        }
    }
    clusters
}

fn split_cluster<'a>(cluster: Indexed<'a>, config: &GroupingConfig) -> Vec<ExecutionGroup<'a>> {
    let plain = strip(&cluster);

    if spread::is_spread(&plain, config) {
        tracing::debug!(fills = plain.len(), "time cluster validated as spread");
        return finish(vec![(GroupKind::Spread, cluster)], config);
    }
    if assignment::looks_like_assignment(&plain, config) {
        tracing::debug!(fills = plain.len(), "time cluster kept together as assignment");
        return vec![ExecutionGroup::new(GroupKind::Assignment, plain)];
    }

    let by_order = split_by_order_id(cluster)
        .into_iter()
        .map(|group| {
            let kind = if spread::is_spread(&strip(&group), config) {
                GroupKind::Spread
            } else {
                GroupKind::Split
            };
            (kind, group)
        })
        .collect();
    finish(by_order, config)
}

/// Expiration and strike splits, then restore chronological order.
fn finish<'a>(
    groups: Vec<(GroupKind, Indexed<'a>)>,
    config: &GroupingConfig,
) -> Vec<ExecutionGroup<'a>> {
    let mut out: Vec<(GroupKind, Indexed<'a>)> = Vec::new();
    for (kind, group) in groups {
        for part in split_by_expiration(group, config.expiration_proximity_days) {
            if kind == GroupKind::Spread {
                out.push((kind, part));
            } else {
                out.extend(split_by_strike(part).into_iter().map(|g| (kind, g)));
            }
        }
    }
    out.sort_by_key(|(_, g)| g.first().map(|(i, _)| *i).unwrap_or(usize::MAX));
    out.into_iter()
        .filter(|(_, g)| !g.is_empty())
        .map(|(kind, g)| ExecutionGroup::new(kind, strip(&g)))
        .collect()
}

/// Fills sharing a non-zero order id stay together; fills without one form a
/// single subgroup. Subgroups are ordered by first appearance.
fn split_by_order_id(group: Indexed<'_>) -> Vec<Indexed<'_>> {
    let mut buckets: Vec<(Option<u64>, Indexed<'_>)> = Vec::new();
    for item in group {
        let key = item.1.order_id;
        match buckets.iter_mut().find(|(k, _)| *k == key) {
            Some((_, bucket)) => bucket.push(item),
            None => buckets.push((key, vec![item])),
        }
    }
    buckets.into_iter().map(|(_, b)| b).collect()
}

/// Equities form one group. Options are sorted by expiration and cut so every
/// partition spans at most `max_days` from its earliest expiration.
fn split_by_expiration(group: Indexed<'_>, max_days: i64) -> Vec<Indexed<'_>> {
    let (equities, mut options): (Indexed<'_>, Indexed<'_>) =
        group.into_iter().partition(|(_, e)| e.is_equity());

    let expiration = |e: &Execution| -> NaiveDate {
        derive_leg_id(e).expiration().unwrap_or(NaiveDate::MIN)
    };
    options.sort_by_key(|(i, e)| (expiration(*e), *i));

    let mut parts: Vec<Indexed<'_>> = Vec::new();
    let mut start: Option<NaiveDate> = None;
    for item in options {
        let exp = expiration(item.1);
        let fits = start.map(|s| (exp - s).num_days() <= max_days).unwrap_or(false);
        if fits {
            if let Some(part) = parts.last_mut() {
                part.push(item);
            }
        } else {
            start = Some(exp);
            parts.push(vec![item]);
        }
    }
    for part in &mut parts {
        part.sort_by_key(|(i, _)| *i);
    }
    if !equities.is_empty() {
        parts.push(equities);
    }
    parts
}

/// One subgroup per distinct strike, ordered by first appearance. Equities
/// (no strike) share a subgroup.
fn split_by_strike(group: Indexed<'_>) -> Vec<Indexed<'_>> {
    let mut buckets: Vec<(Option<Decimal>, Indexed<'_>)> = Vec::new();
    for item in group {
        let key = item.1.strike().map(|s| s.normalized());
        match buckets.iter_mut().find(|(k, _)| *k == key) {
            Some((_, bucket)) => bucket.push(item),
            None => buckets.push((key, vec![item])),
        }
    }
    buckets.into_iter().map(|(_, b)| b).collect()
}
