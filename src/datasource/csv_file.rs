//! Broker execution exports in CSV form.

use super::{DataSourceError, ExecutionSource};
use crate::domain::{Execution, ExecutionId, ExecutionRecord, Symbol};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;

/// Reads executions from a CSV file on every fetch.
#[derive(Debug, Clone)]
pub struct CsvExecutionSource {
    path: PathBuf,
}

impl CsvExecutionSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ExecutionSource for CsvExecutionSource {
    async fn fetch_executions(
        &self,
        underlying: Option<&Symbol>,
    ) -> Result<Vec<Execution>, DataSourceError> {
        let bytes = tokio::fs::read(&self.path).await?;
        let mut executions = parse_csv(&bytes)?;
        if let Some(symbol) = underlying {
            executions.retain(|e| &e.underlying == symbol);
        }
        tracing::debug!(
            path = %self.path.display(),
            count = executions.len(),
            "loaded executions"
        );
        Ok(executions)
    }
}

/// Parse a headed CSV export. Columns are matched by name; unknown columns
/// are ignored and missing optional columns read as blank.
///
/// Row numbers in errors are 1-based data rows (the header is row 0).
///
/// Rows without an id get a content hash. Repeats of an identical row get
/// the hash suffixed with their occurrence number (`#2`, `#3`, ...).
pub fn parse_csv(csv_bytes: &[u8]) -> Result<Vec<Execution>, DataSourceError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(csv_bytes);

    let mut executions = Vec::new();
    let mut generated: HashMap<ExecutionId, u32> = HashMap::new();
    for (idx, record) in reader.deserialize::<ExecutionRecord>().enumerate() {
        let record = record?;
        let has_id = record.id.as_deref().is_some_and(|id| !id.trim().is_empty());
        let mut execution = Execution::try_from(record)
            .map_err(|source| DataSourceError::InvalidRecord { row: idx + 1, source })?;
        if !has_id {
            let seen = generated.entry(execution.id.clone()).or_insert(0);
            *seen += 1;
            if *seen > 1 {
                execution.id = ExecutionId::new(format!("{}#{}", execution.id, seen));
            }
        }
        executions.push(execution);
    }
    Ok(executions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Decimal, ExecutionId, InputError, PositionEffect, Side};
    use std::io::Write;

    const HEADER: &str =
        "id,underlying,security_type,option_type,strike,expiration,side,open_close,quantity,price,multiplier,order_id,time";

    fn csv_of(rows: &[&str]) -> Vec<u8> {
        let mut out = String::from(HEADER);
        for row in rows {
            out.push('\n');
            out.push_str(row);
        }
        out.push('\n');
        out.into_bytes()
    }

    #[test]
    fn test_parse_option_and_equity_rows() {
        let bytes = csv_of(&[
            "E1,aapl,option,call,150,2024-01-19,buy,open,2,1.25,,77,1705000000000",
            "E2,AAPL,stock,,,,sell,,100,185.10,,,2024-01-11T15:30:00Z",
        ]);
        let execs = parse_csv(&bytes).unwrap();
        assert_eq!(execs.len(), 2);

        let opt = &execs[0];
        assert_eq!(opt.id, ExecutionId::new("E1"));
        assert_eq!(opt.underlying, Symbol::new("AAPL"));
        assert!(opt.is_option());
        assert_eq!(opt.strike(), Some(Decimal::from(150i64)));
        assert_eq!(opt.multiplier, 100);
        assert_eq!(opt.order_id, Some(77));
        assert_eq!(opt.effect, Some(PositionEffect::Open));
        assert_eq!(opt.signed_quantity(), 2);

        let stk = &execs[1];
        assert!(stk.is_equity());
        assert_eq!(stk.side, Side::Sell);
        assert_eq!(stk.multiplier, 1);
        assert_eq!(stk.order_id, None);
        assert_eq!(stk.effect, None);
    }

    #[test]
    fn test_missing_id_gets_stable_hash() {
        let row = ",AAPL,stock,,,,buy,,10,100,,,1000";
        let a = parse_csv(&csv_of(&[row])).unwrap();
        let b = parse_csv(&csv_of(&[row])).unwrap();
        assert!(a[0].id.as_str().starts_with("hash:"));
        assert_eq!(a[0].id, b[0].id);
    }

    #[test]
    fn test_identical_rows_without_id_get_distinct_ids() {
        let row = ",AAPL,option,call,150,2024-01-19,buy,,1,1.25,,42,1000";
        let execs = parse_csv(&csv_of(&[row, row, row])).unwrap();
        let first = execs[0].id.as_str().to_string();
        assert!(first.starts_with("hash:"));
        assert_eq!(execs[1].id.as_str(), format!("{}#2", first));
        assert_eq!(execs[2].id.as_str(), format!("{}#3", first));

        let again = parse_csv(&csv_of(&[row, row, row])).unwrap();
        let ids: Vec<_> = again.iter().map(|e| e.id.clone()).collect();
        assert_eq!(ids, execs.iter().map(|e| e.id.clone()).collect::<Vec<_>>());
    }

    #[test]
    fn test_invalid_row_reports_row_number() {
        let bytes = csv_of(&[
            "E1,AAPL,stock,,,,buy,,10,100,,,1000",
            "E2,AAPL,stock,,,,buy,,-5,100,,,2000",
        ]);
        match parse_csv(&bytes) {
            Err(DataSourceError::InvalidRecord { row, source }) => {
                assert_eq!(row, 2);
                assert!(matches!(source, InputError::NonPositiveQuantity(-5)));
            }
            other => panic!("Expected InvalidRecord, got {:?}", other),
        }
    }

    #[test]
    fn test_extra_columns_are_ignored() {
        let bytes = b"underlying,security_type,side,quantity,price,time,account\nAAPL,equity,buy,1,10,5,ACC1\n";
        let execs = parse_csv(bytes).unwrap();
        assert_eq!(execs.len(), 1);
        assert_eq!(execs[0].quantity, 1);
    }

    #[tokio::test]
    async fn test_csv_source_filters_by_underlying() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&csv_of(&[
            "A,AAPL,stock,,,,buy,,10,100,,,1000",
            "M,MSFT,stock,,,,buy,,10,300,,,1000",
        ]))
        .unwrap();

        let source = CsvExecutionSource::new(file.path());
        let all = source.fetch_executions(None).await.unwrap();
        assert_eq!(all.len(), 2);

        let msft = source
            .fetch_executions(Some(&Symbol::new("msft")))
            .await
            .unwrap();
        assert_eq!(msft.len(), 1);
        assert_eq!(msft[0].id, ExecutionId::new("M"));
    }

    #[tokio::test]
    async fn test_csv_source_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = CsvExecutionSource::new(dir.path().join("absent.csv"));
        let err = source.fetch_executions(None).await.unwrap_err();
        assert!(matches!(err, DataSourceError::Io(_)));
    }
}
