//! End-to-end tests: CSV export -> Journal -> trade groups.

use optjournal::datasource::{CsvExecutionSource, DataSourceError, MockExecutionSource};
use optjournal::engine::GroupingConfig;
use optjournal::{
    Decimal, Execution, ExecutionId, Journal, JournalError, Side, Strategy, Symbol, TimeMs,
    TradeStatus,
};
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;

const HEADER: &str = "id,underlying,security_type,option_type,strike,expiration,side,open_close,quantity,price,multiplier,order_id,time";

fn write_csv(rows: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{}", HEADER).unwrap();
    for row in rows {
        writeln!(file, "{}", row).unwrap();
    }
    file.flush().unwrap();
    file
}

fn journal_for(file: &NamedTempFile) -> Journal {
    let source = Arc::new(CsvExecutionSource::new(file.path()));
    Journal::new(source, GroupingConfig::default()).with_concurrency(2)
}

#[tokio::test]
async fn test_csv_journal_end_to_end() {
    let file = write_csv(&[
        // MSFT: bull call spread opened as one order
        "M1,MSFT,option,call,400,2024-02-16,buy,,1,5.00,,900,2024-01-10T15:00:00Z",
        "M2,MSFT,option,call,410,2024-02-16,sell,,1,2.00,,900,2024-01-10T15:00:01Z",
        // AAPL: short put assigned into stock
        "A1,AAPL,option,put,180,2024-01-19,sell,open,1,1.50,,100,2024-01-02T15:00:00Z",
        "A2,AAPL,option,put,180,2024-01-19,buy,close,1,0,,,2024-01-19T21:00:00Z",
        "A3,AAPL,stock,,,,buy,,100,180,,,2024-01-19T21:00:00Z",
    ]);

    let report = journal_for(&file).run(None).await.unwrap();

    let underlyings: Vec<&str> = report
        .summaries
        .iter()
        .map(|s| s.underlying.as_str())
        .collect();
    assert_eq!(underlyings, vec!["AAPL", "MSFT"]);
    assert_eq!(report.trades.len(), 3);

    let aapl: Vec<_> = report.trades_for(&Symbol::new("AAPL")).collect();
    assert_eq!(aapl[0].strategy, Strategy::ShortPut);
    assert_eq!(aapl[0].status, TradeStatus::Closed);
    assert!(aapl[1].is_assignment);
    assert_eq!(aapl[1].assigned_from, vec![aapl[0].id]);
    assert_eq!(report.summaries[0].assignments, 1);

    let msft: Vec<_> = report.trades_for(&Symbol::new("MSFT")).collect();
    assert_eq!(msft.len(), 1);
    assert_eq!(msft[0].strategy, Strategy::BullCallSpread);
    assert_eq!(
        msft[0].net_cash_flow,
        Decimal::from_str_canonical("-300").unwrap()
    );
}

#[tokio::test]
async fn test_csv_journal_rejects_malformed_rows() {
    let file = write_csv(&[
        "A1,AAPL,option,put,180,2024-01-19,sell,,1,1.50,,,1000",
        "A2,AAPL,option,,180,2024-01-19,sell,,1,1.50,,,2000",
    ]);

    let err = journal_for(&file).run(None).await.unwrap_err();
    match err {
        JournalError::DataSource(DataSourceError::InvalidRecord { row, .. }) => {
            assert_eq!(row, 2)
        }
        other => panic!("Expected InvalidRecord, got {:?}", other),
    }
}

#[tokio::test]
async fn test_identical_partial_fills_without_ids_stay_distinct() {
    let row = ",SPY,option,call,450,2024-03-15,buy,,1,3.00,,55,1000";
    let file = write_csv(&[row, row]);
    let report = journal_for(&file).run(None).await.unwrap();

    assert_eq!(report.trades.len(), 1);
    let ids = report.trades[0].execution_ids();
    assert_eq!(ids.len(), 2);
    assert_ne!(ids[0], ids[1]);
    assert_eq!(report.summaries[0].executions, 2);
}

#[tokio::test]
async fn test_json_output_shape() {
    let file = write_csv(&[
        "X1,SPY,option,call,450,2024-03-15,buy,,1,3.00,,,1000",
        "X2,SPY,option,call,450,2024-03-15,sell,,1,4.00,,,7200000",
    ]);
    let report = journal_for(&file).run(None).await.unwrap();

    let json = serde_json::to_value(&report.trades).unwrap();
    let trade = &json[0];
    assert_eq!(trade["strategy"], "Long Call");
    assert_eq!(trade["status"], "closed");
    assert_eq!(trade["roll_kind"], "none");
    assert_eq!(trade["executions"].as_array().unwrap().len(), 2);
    assert!(trade.get("warnings").is_none());
    assert!(trade.get("rolled_from").is_none());
}

#[tokio::test]
async fn test_mock_source_many_underlyings() {
    let symbols = ["QQQ", "AAPL", "IWM", "MSFT", "SPY", "TSLA"];
    let executions: Vec<Execution> = symbols
        .iter()
        .enumerate()
        .flat_map(|(i, sym)| {
            let open = Execution::equity(
                ExecutionId::new(format!("{}-open", sym)),
                Symbol::new(sym),
                Side::Buy,
                10,
                Decimal::from(100i64),
                TimeMs::new(i as i64),
            )
            .unwrap();
            let close = Execution::equity(
                ExecutionId::new(format!("{}-close", sym)),
                Symbol::new(sym),
                Side::Sell,
                10,
                Decimal::from(101i64),
                TimeMs::new(60_000 + i as i64),
            )
            .unwrap();
            [open, close]
        })
        .collect();

    let source = MockExecutionSource::new().with_executions(executions);
    let journal = Journal::new(Arc::new(source), GroupingConfig::default()).with_concurrency(3);
    let report = journal.run(None).await.unwrap();

    let mut expected: Vec<&str> = symbols.to_vec();
    expected.sort_unstable();
    let got: Vec<&str> = report.trades.iter().map(|t| t.underlying.as_str()).collect();
    assert_eq!(got, expected);
    assert!(report.trades.iter().all(|t| t.status == TradeStatus::Closed));
    assert!(report
        .trades
        .iter()
        .all(|t| t.realized_pnl == Some(Decimal::from(10i64))));
}
