//! Stable execution ordering for deterministic grouping.

use crate::domain::Execution;

/// Ordering key for executions: time first, then position in the input.
///
/// Two fills with the same timestamp keep the order the caller supplied them
/// in, so a batch always groups the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ExecutionOrderingKey {
    pub time_ms: i64,
    pub seq: usize,
}

impl ExecutionOrderingKey {
    pub fn new(execution: &Execution, seq: usize) -> Self {
        ExecutionOrderingKey {
            time_ms: execution.time_ms.as_i64(),
            seq,
        }
    }
}

/// Borrow `executions` in chronological order, ties broken by input order.
pub fn sort_executions_stable(executions: &[Execution]) -> Vec<&Execution> {
    let mut keyed: Vec<(ExecutionOrderingKey, &Execution)> = executions
        .iter()
        .enumerate()
        .map(|(seq, e)| (ExecutionOrderingKey::new(e, seq), e))
        .collect();
    keyed.sort_by_key(|(key, _)| *key);
    keyed.into_iter().map(|(_, e)| e).collect()
}
