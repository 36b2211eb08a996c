//! In-memory execution source for tests.

use super::{DataSourceError, ExecutionSource};
use crate::domain::{Execution, Symbol};
use async_trait::async_trait;

/// Mock source that returns predefined executions.
#[derive(Debug, Clone, Default)]
pub struct MockExecutionSource {
    executions: Vec<Execution>,
}

impl MockExecutionSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_execution(mut self, execution: Execution) -> Self {
        self.executions.push(execution);
        self
    }

    pub fn with_executions(mut self, executions: Vec<Execution>) -> Self {
        self.executions.extend(executions);
        self
    }
}

#[async_trait]
impl ExecutionSource for MockExecutionSource {
    async fn fetch_executions(
        &self,
        underlying: Option<&Symbol>,
    ) -> Result<Vec<Execution>, DataSourceError> {
        Ok(self
            .executions
            .iter()
            .filter(|e| underlying.map_or(true, |u| &e.underlying == u))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Decimal, ExecutionId, Side, TimeMs};

    fn stock(id: &str, symbol: &str) -> Execution {
        Execution::equity(
            ExecutionId::new(id),
            Symbol::new(symbol),
            Side::Buy,
            1,
            Decimal::from(10i64),
            TimeMs::new(0),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_mock_source_filters() {
        let source = MockExecutionSource::new()
            .with_execution(stock("a", "AAPL"))
            .with_executions(vec![stock("b", "MSFT"), stock("c", "AAPL")]);

        assert_eq!(source.fetch_executions(None).await.unwrap().len(), 3);
        let aapl = source
            .fetch_executions(Some(&Symbol::new("AAPL")))
            .await
            .unwrap();
        let ids: Vec<&str> = aapl.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn test_empty_mock_source() {
        let source = MockExecutionSource::default();
        let fetched = tokio_test::block_on(source.fetch_executions(None)).unwrap();
        assert!(fetched.is_empty());
    }
}
