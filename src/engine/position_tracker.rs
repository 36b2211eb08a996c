//! Position state machine: routes execution groups into trades.
//!
//! One tracker owns the working state of a single underlying: the shared leg
//! ledger, every trade created so far (indexed by `TradeId`), the registry of
//! trades still open, and the most recent closure for roll detection. Feed it
//! groups in chronological order, then drain it with `into_trades`.

use super::{
    assignment, classify, derive_leg_id, roll, spread, ExecutionGroup, GroupKind,
    GroupingConfig, LegLedger,
};
use crate::domain::{
    Decimal, Execution, LegId, LegQuantity, PositionEffect, RollKind, Symbol, TimeMs,
    TradeGroup, TradeId, TradeStatus, TradeWarning,
};
use std::collections::{BTreeMap, BTreeSet};

type Routed<'a> = (LegId, &'a Execution);

/// Executions are compared by address, not id: broker ids may repeat.
fn contains_exec(execs: &[&Execution], exec: &Execution) -> bool {
    execs.iter().any(|e| std::ptr::eq(*e, exec))
}

/// Mutable state of one trade while the batch is processed.
#[derive(Debug, Clone)]
struct TradeState {
    id: TradeId,
    executions: Vec<Execution>,
    /// Trade-local signed quantity per leg. Keys are every leg ever touched.
    remaining: BTreeMap<LegId, i64>,
    /// Snapshot of the creating executions. Never modified afterwards.
    opening: BTreeMap<LegId, i64>,
    status: TradeStatus,
    opened_at: TimeMs,
    closed_at: Option<TimeMs>,
    roll_kind: RollKind,
    rolled_from: Option<TradeId>,
    rolled_into: Option<TradeId>,
    is_assignment: bool,
    assigned_from: Vec<TradeId>,
    warnings: Vec<TradeWarning>,
}

impl TradeState {
    fn remaining(&self, leg: &LegId) -> i64 {
        self.remaining.get(leg).copied().unwrap_or(0)
    }

    /// Legs with non-zero trade-local quantity.
    fn open_legs(&self) -> BTreeMap<&LegId, i64> {
        self.remaining
            .iter()
            .filter(|(_, q)| **q != 0)
            .map(|(l, q)| (l, *q))
            .collect()
    }

    fn is_flat(&self) -> bool {
        self.remaining.values().all(|q| *q == 0)
    }

    fn has_option_legs(&self) -> bool {
        self.remaining.keys().any(LegId::is_option)
    }

    fn into_trade_group(self, underlying: &Symbol) -> TradeGroup {
        let opening_legs: Vec<LegQuantity> = self
            .opening
            .into_iter()
            .filter(|(_, q)| *q != 0)
            .map(|(leg, quantity)| LegQuantity { leg, quantity })
            .collect();
        let net_cash_flow: Decimal = self.executions.iter().map(|e| -e.signed_cost()).sum();
        let closed = self.status == TradeStatus::Closed;
        TradeGroup {
            id: self.id,
            underlying: underlying.clone(),
            status: self.status,
            strategy: classify(&opening_legs),
            opening_legs,
            legs: self.remaining.into_keys().collect(),
            executions: self.executions,
            opened_at: self.opened_at,
            closed_at: self.closed_at,
            roll_kind: self.roll_kind,
            rolled_from: self.rolled_from,
            rolled_into: self.rolled_into,
            is_assignment: self.is_assignment,
            assigned_from: self.assigned_from,
            net_cash_flow,
            realized_pnl: closed.then_some(net_cash_flow),
            warnings: self.warnings,
        }
    }
}

/// Outcome of matching one closing execution against open trades.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CloseRoute {
    /// Oldest trade that absorbs the close without crossing zero.
    Fifo(TradeId),
    /// No clean fit; trade with the largest opposite remaining quantity.
    Overshoot(TradeId),
    /// Nothing to close.
    Orphan,
}

#[derive(Debug)]
pub struct PositionTracker {
    underlying: Symbol,
    config: GroupingConfig,
    ledger: LegLedger,
    /// All trades, index `n - 1` holds `TradeId(n)`.
    trades: Vec<TradeState>,
    /// Open trade registry; ascending ids are creation (FIFO) order.
    open: BTreeSet<TradeId>,
    last_close: Option<(TradeId, TimeMs)>,
}

impl PositionTracker {
    pub fn new(underlying: Symbol, config: GroupingConfig) -> Self {
        Self {
            underlying,
            config,
            ledger: LegLedger::new(),
            trades: Vec::new(),
            open: BTreeSet::new(),
            last_close: None,
        }
    }

    #[cfg(test)]
    fn ledger(&self) -> &LegLedger {
        &self.ledger
    }

    #[cfg(test)]
    fn open_trade_ids(&self) -> impl Iterator<Item = TradeId> + '_ {
        self.open.iter().copied()
    }

    fn trade(&self, id: TradeId) -> &TradeState {
        &self.trades[(id.0 - 1) as usize]
    }

    fn trade_mut(&mut self, id: TradeId) -> &mut TradeState {
        &mut self.trades[(id.0 - 1) as usize]
    }

    /// Process one execution group atomically.
    pub fn process_group(&mut self, group: &ExecutionGroup<'_>) {
        let (closing, mut opening) = self.partition(&group.executions);

        let mut matched_closing: Vec<&Execution> = Vec::new();
        let mut close_targets: Vec<TradeId> = Vec::new();
        let mut assigned_from: Vec<TradeId> = Vec::new();
        let mut orphans: Vec<&Execution> = Vec::new();

        for (leg, exec) in closing {
            let target = match self.route_close(&leg, exec) {
                CloseRoute::Fifo(id) => id,
                CloseRoute::Overshoot(id) => {
                    tracing::warn!(
                        underlying = %self.underlying,
                        trade_id = %id,
                        execution_id = %exec.id,
                        leg = %leg,
                        "over-close fallback: routed to largest opposite position"
                    );
                    self.trade_mut(id).warnings.push(TradeWarning::OverCloseFallback {
                        execution_id: exec.id.clone(),
                    });
                    id
                }
                CloseRoute::Orphan => {
                    tracing::warn!(
                        underlying = %self.underlying,
                        execution_id = %exec.id,
                        leg = %leg,
                        "orphaned close, treating as opening"
                    );
                    orphans.push(exec);
                    opening.push((leg, exec));
                    continue;
                }
            };
            tracing::debug!(trade_id = %target, execution_id = %exec.id, "close routed");
            if exec.is_option() && exec.price <= self.config.assignment_price_threshold {
                push_unique(&mut assigned_from, target);
            }
            self.apply(target, &leg, exec, &orphans);
            matched_closing.push(exec);
            push_unique(&mut close_targets, target);
        }
        self.finalize_flat(&close_targets);

        if opening.is_empty() {
            return;
        }
        let new_trades =
            self.route_opening(group, &matched_closing, opening, &assigned_from, &orphans);
        self.finalize_flat(&new_trades);
        self.tag_roll(&new_trades, &matched_closing, &close_targets, group);
    }

    /// Split a group into closing and opening executions.
    ///
    /// Explicit hints win. Otherwise a fill that moves its leg's net position
    /// toward zero is closing. Later fills see the effect of earlier ones.
    fn partition<'a>(&self, executions: &[&'a Execution]) -> (Vec<Routed<'a>>, Vec<Routed<'a>>) {
        let mut projected: BTreeMap<LegId, i64> = BTreeMap::new();
        let mut closing = Vec::new();
        let mut opening = Vec::new();
        for exec in executions {
            let leg = derive_leg_id(exec);
            let current = *projected
                .entry(leg.clone())
                .or_insert_with(|| self.ledger.quantity(&leg));
            let delta = exec.signed_quantity();
            let is_closing = match exec.effect {
                Some(PositionEffect::Close) => true,
                Some(PositionEffect::Open) => false,
                None => current != 0 && current.signum() != delta.signum(),
            };
            projected.insert(leg.clone(), current + delta);
            if is_closing {
                closing.push((leg, *exec));
            } else {
                opening.push((leg, *exec));
            }
        }
        (closing, opening)
    }

    fn route_close(&self, leg: &LegId, exec: &Execution) -> CloseRoute {
        let delta = exec.signed_quantity();
        let candidates: Vec<(TradeId, i64)> = self
            .open
            .iter()
            .map(|id| (*id, self.trade(*id).remaining(leg)))
            .filter(|(_, r)| *r != 0 && r.signum() != delta.signum())
            .collect();

        if let Some((id, _)) = candidates.iter().find(|(_, r)| delta.abs() <= r.abs()) {
            return CloseRoute::Fifo(*id);
        }
        let mut best: Option<(TradeId, i64)> = None;
        for (id, r) in candidates {
            if best.map(|(_, b)| r.abs() > b.abs()).unwrap_or(true) {
                best = Some((id, r));
            }
        }
        match best {
            Some((id, _)) => CloseRoute::Overshoot(id),
            None => CloseRoute::Orphan,
        }
    }

    /// Returns ids of trades created for the opening side.
    fn route_opening(
        &mut self,
        group: &ExecutionGroup<'_>,
        closing: &[&Execution],
        mut opening: Vec<Routed<'_>>,
        assigned_from: &[TradeId],
        orphans: &[&Execution],
    ) -> Vec<TradeId> {
        let mut created = Vec::new();

        let opening_execs: Vec<&Execution> = opening.iter().map(|(_, e)| *e).collect();
        if assignment::is_assignment(closing, &opening_execs, &self.config) {
            let (equity, rest): (Vec<Routed<'_>>, Vec<Routed<'_>>) =
                opening.into_iter().partition(|(_, e)| e.is_equity());
            let id = self.create_trade(&equity, orphans);
            let trade = self.trade_mut(id);
            trade.is_assignment = true;
            trade.assigned_from = assigned_from.to_vec();
            tracing::debug!(trade_id = %id, from = ?assigned_from, "assignment detected");
            created.push(id);
            opening = rest;
            if opening.is_empty() {
                return created;
            }
        }

        if let Some(id) = self.find_addition_target(&opening) {
            tracing::debug!(trade_id = %id, fills = opening.len(), "position addition");
            for (leg, exec) in &opening {
                self.apply(id, leg, exec, orphans);
            }
            return created;
        }

        let execs: Vec<&Execution> = opening.iter().map(|(_, e)| *e).collect();
        let distinct_legs: BTreeSet<&LegId> = opening.iter().map(|(l, _)| l).collect();
        let keep_together = spread::is_new_spread_structure(&execs)
            || spread::is_single_order_multi_leg(&execs)
            || (group.kind == GroupKind::Spread && distinct_legs.len() >= 2);
        if keep_together {
            created.push(self.create_trade(&opening, orphans));
            return created;
        }

        for (leg, exec) in opening {
            match self.find_leg_target(&leg, exec) {
                Some(id) => self.apply(id, &leg, exec, orphans),
                None => created.push(self.create_trade(&[(leg, exec)], orphans)),
            }
        }
        created
    }

    /// Existing open trade whose open legs equal, contain, or are contained in
    /// the opening legs, with matching direction on shared legs and
    /// expirations within the proximity window.
    fn find_addition_target(&self, opening: &[Routed<'_>]) -> Option<TradeId> {
        let mut incoming: BTreeMap<&LegId, i64> = BTreeMap::new();
        for (leg, exec) in opening {
            *incoming.entry(leg).or_insert(0) += exec.signed_quantity();
        }
        let incoming_legs: BTreeSet<&LegId> = incoming.keys().copied().collect();

        self.open.iter().copied().find(|id| {
            let existing = self.trade(*id).open_legs();
            if existing.is_empty() {
                return false;
            }
            let existing_legs: BTreeSet<&LegId> = existing.keys().copied().collect();
            let related = incoming_legs == existing_legs
                || incoming_legs.is_subset(&existing_legs)
                || incoming_legs.is_superset(&existing_legs);
            if !related {
                return false;
            }
            let same_direction = incoming.iter().all(|(leg, q)| match existing.get(leg) {
                Some(r) => r.signum() == q.signum(),
                None => true,
            });
            same_direction && self.expirations_compatible(&incoming_legs, &existing_legs)
        })
    }

    fn expirations_compatible(
        &self,
        incoming: &BTreeSet<&LegId>,
        existing: &BTreeSet<&LegId>,
    ) -> bool {
        let existing_exps: Vec<_> = existing.iter().filter_map(|l| l.expiration()).collect();
        if existing_exps.is_empty() {
            return true;
        }
        incoming.iter().filter_map(|l| l.expiration()).all(|exp| {
            existing_exps
                .iter()
                .any(|e| (exp - *e).num_days().abs() <= self.config.expiration_proximity_days)
        })
    }

    /// Oldest open trade holding `leg` in the same direction as `exec`.
    fn find_leg_target(&self, leg: &LegId, exec: &Execution) -> Option<TradeId> {
        let sign = exec.signed_quantity().signum();
        self.open.iter().copied().find(|id| {
            let r = self.trade(*id).remaining(leg);
            r != 0 && r.signum() == sign
        })
    }

    fn create_trade(&mut self, execs: &[Routed<'_>], orphans: &[&Execution]) -> TradeId {
        let id = TradeId(self.trades.len() as u64 + 1);
        let mut opening: BTreeMap<LegId, i64> = BTreeMap::new();
        for (leg, exec) in execs {
            *opening.entry(leg.clone()).or_insert(0) += exec.signed_quantity();
        }
        let opened_at = execs
            .iter()
            .map(|(_, e)| e.time_ms)
            .min()
            .unwrap_or(TimeMs::new(0));
        self.trades.push(TradeState {
            id,
            executions: Vec::new(),
            remaining: BTreeMap::new(),
            opening,
            status: TradeStatus::Open,
            opened_at,
            closed_at: None,
            roll_kind: RollKind::None,
            rolled_from: None,
            rolled_into: None,
            is_assignment: false,
            assigned_from: Vec::new(),
            warnings: Vec::new(),
        });
        self.open.insert(id);
        for (leg, exec) in execs {
            self.apply(id, leg, exec, orphans);
        }
        tracing::debug!(
            underlying = %self.underlying,
            trade_id = %id,
            fills = execs.len(),
            "trade opened"
        );
        id
    }

    /// Record `exec` on trade `id` and on the shared ledger.
    fn apply(
        &mut self,
        id: TradeId,
        leg: &LegId,
        exec: &Execution,
        orphans: &[&Execution],
    ) {
        self.ledger.apply(leg, exec);
        let trade = self.trade_mut(id);
        *trade.remaining.entry(leg.clone()).or_insert(0) += exec.signed_quantity();
        trade.executions.push(exec.clone());
        if contains_exec(orphans, exec) {
            trade.warnings.push(TradeWarning::OrphanedClose {
                execution_id: exec.id.clone(),
            });
        }
    }

    /// Close every listed open trade whose legs are all flat.
    fn finalize_flat(&mut self, ids: &[TradeId]) {
        for id in ids {
            if !self.open.contains(id) || !self.trade(*id).is_flat() {
                continue;
            }
            let closed_at = self
                .trade(*id)
                .executions
                .last()
                .map(|e| e.time_ms)
                .unwrap_or(TimeMs::new(0));
            let trade = self.trade_mut(*id);
            trade.status = TradeStatus::Closed;
            trade.closed_at = Some(closed_at);
            self.open.remove(id);
            if self.last_close.map(|(_, at)| closed_at >= at).unwrap_or(true) {
                self.last_close = Some((*id, closed_at));
            }
            tracing::debug!(underlying = %self.underlying, trade_id = %id, "trade closed");
        }
    }

    /// Link the first new option trade to the trade it rolled from, if any.
    fn tag_roll(
        &mut self,
        new_trades: &[TradeId],
        closing: &[&Execution],
        close_targets: &[TradeId],
        group: &ExecutionGroup<'_>,
    ) {
        let Some(successor) = new_trades.iter().copied().find(|id| {
            let t = self.trade(*id);
            !t.is_assignment && t.has_option_legs()
        }) else {
            return;
        };

        let opening: Vec<&Execution> = group
            .executions
            .iter()
            .copied()
            .filter(|e| !contains_exec(closing, e))
            .collect();
        let same_group = roll::is_roll(closing, &opening)
            .then(|| close_targets.first().copied())
            .flatten()
            .filter(|p| self.trade(*p).rolled_into.is_none());

        let predecessor = same_group.or_else(|| {
            let (pred, closed_at) = self.last_close?;
            let succ = self.trade(successor);
            let prev = self.trade(pred);
            let within = succ.opened_at.since(closed_at) <= self.config.roll_window_ms
                && succ.opened_at >= closed_at;
            let prev_legs: BTreeSet<LegId> = prev.remaining.keys().cloned().collect();
            let next_legs: BTreeSet<LegId> = succ.opening.keys().cloned().collect();
            (pred != successor
                && within
                && prev.rolled_into.is_none()
                && !prev.is_assignment
                && roll::is_roll_continuation(&prev_legs, &next_legs))
            .then_some(pred)
        });

        if let Some(pred) = predecessor {
            tracing::debug!(from = %pred, into = %successor, "roll detected");
            self.trade_mut(pred).rolled_into = Some(successor);
            let succ = self.trade_mut(successor);
            succ.roll_kind = RollKind::Roll;
            succ.rolled_from = Some(pred);
        }
    }

    /// Drain the tracker into trade groups in creation order.
    pub fn into_trades(self) -> Vec<TradeGroup> {
        let underlying = self.underlying;
        self.trades
            .into_iter()
            .map(|t| t.into_trade_group(&underlying))
            .collect()
    }
}

fn push_unique(ids: &mut Vec<TradeId>, id: TradeId) {
    if !ids.contains(&id) {
        ids.push(id);
    }
}
