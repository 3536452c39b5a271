//! Decodes contract notifications from persisted blocks and writes them, idempotently,
//! to one or more PostgreSQL sinks.
//!
//! Each in-scope notification becomes one row in `events`, plus one row in `offers`,
//! `trades` or `swaps` when its event type has a derived table.

pub mod alert;
pub mod classifier;
pub mod config;
pub mod db;
pub mod decoder;
pub mod engine;
pub mod error;
pub mod ingest;
pub mod models;
pub mod types;
pub mod writer;

pub use classifier::{EventClassifier, SpecializedKind};
pub use config::{Config, FailurePolicy};
pub use db::{EventSink, InsertOutcome, PgSink};
pub use engine::{BlockReport, PersistenceEngine};
pub use error::{DecodeError, EngineError, SinkError};
pub use types::{EventRecord, ExecutionResult, Notification, PayloadValue, RawValue, VmState};
