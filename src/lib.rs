pub mod compile;
pub mod config;
pub mod datasource;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;
pub mod output;

pub use compile::{CompileOutput, CompileSummary, Compiler};
pub use config::{Config, OutputFormat};
pub use datasource::{CsvExecutionSource, DataSourceError, ExecutionSource, MockExecutionSource};
pub use domain::{
    Decimal, Execution, ExecutionId, ExecutionRecord, InputError, LegId, OptionContract,
    OptionKind, PositionEffect, RollKind, Side, Strategy, Symbol, TimeMs, TradeGroup, TradeId,
    TradeStatus, TradeWarning,
};
pub use engine::GroupingConfig;
pub use error::AppError;
pub use orchestration::{Journal, JournalError, JournalReport};
