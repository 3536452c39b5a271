#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use num_bigint::BigInt;

use events_writer::alert::AlertSink;
use events_writer::db::{EventSink, InsertOutcome};
use events_writer::error::{EngineError, SinkError};
use events_writer::models::SpecializedRow;
use events_writer::types::{EventRecord, ExecutionResult, Notification, RawValue, VmState};

pub const CONTRACT: &str = "a32bcf5d7082f740a4d4a7f0ee8a3c9f2b43a1e0";
pub const OTHER_CONTRACT: &str = "0000000000000000000000000000000000000001";

type Key = (String, String, u32);

#[derive(Default)]
struct State {
    events: Vec<EventRecord>,
    event_keys: BTreeSet<Key>,
    specialized: Vec<(EventRecord, SpecializedRow)>,
    specialized_keys: BTreeSet<(&'static str, Key)>,
    calls: usize,
    fail_on_call: Option<usize>,
}

/// In-memory sink enforcing the same unique keys as `init.sql`.
#[derive(Clone)]
pub struct MemorySink {
    name: String,
    state: Arc<Mutex<State>>,
    journal: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    pub fn new(name: &str) -> Self {
        Self::with_journal(name, Arc::new(Mutex::new(Vec::new())))
    }

    /// Sinks sharing a journal record the global order of their inserts.
    pub fn with_journal(name: &str, journal: Arc<Mutex<Vec<String>>>) -> Self {
        Self { name: name.to_string(), state: Arc::new(Mutex::new(State::default())), journal }
    }

    /// Make the n-th insert call (1-based) fail with a connection error.
    pub fn fail_on_call(&self, n: usize) {
        self.state.lock().unwrap().fail_on_call = Some(n);
    }

    pub fn events(&self) -> Vec<EventRecord> {
        self.state.lock().unwrap().events.clone()
    }

    pub fn specialized(&self) -> Vec<SpecializedRow> {
        self.state.lock().unwrap().specialized.iter().map(|(_, row)| row.clone()).collect()
    }

    pub fn calls(&self) -> usize {
        self.state.lock().unwrap().calls
    }

    fn check_failure(&self, state: &mut State) -> Result<(), SinkError> {
        state.calls += 1;
        if state.fail_on_call == Some(state.calls) {
            return Err(SinkError::Connection(format!("{} went away", self.name)));
        }
        Ok(())
    }

    fn key(record: &EventRecord) -> Key {
        (record.transaction_hash.clone(), record.contract_hash.clone(), record.event_index)
    }
}

#[async_trait]
impl EventSink for MemorySink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn insert_event(&self, record: &EventRecord) -> Result<InsertOutcome, SinkError> {
        let mut state = self.state.lock().unwrap();
        self.check_failure(&mut state)?;
        self.journal
            .lock()
            .unwrap()
            .push(format!("{}:events:{}", self.name, record.event_index));

        if !state.event_keys.insert(Self::key(record)) {
            return Ok(InsertOutcome::AlreadyPresent);
        }
        state.events.push(record.clone());
        Ok(InsertOutcome::Inserted)
    }

    async fn insert_specialized(
        &self,
        record: &EventRecord,
        row: &SpecializedRow,
    ) -> Result<InsertOutcome, SinkError> {
        let mut state = self.state.lock().unwrap();
        self.check_failure(&mut state)?;
        let table = row.kind().table().unwrap_or("unknown");
        self.journal
            .lock()
            .unwrap()
            .push(format!("{}:{}:{}", self.name, table, record.event_index));

        if !state.specialized_keys.insert((table, Self::key(record))) {
            return Ok(InsertOutcome::AlreadyPresent);
        }
        state.specialized.push((record.clone(), row.clone()));
        Ok(InsertOutcome::Inserted)
    }
}

#[derive(Clone, Default)]
pub struct RecordingAlerts {
    pub reports: Arc<Mutex<Vec<String>>>,
}

impl RecordingAlerts {
    pub fn kinds(&self) -> Vec<String> {
        self.reports.lock().unwrap().clone()
    }
}

#[async_trait]
impl AlertSink for RecordingAlerts {
    async fn report(&self, error: &EngineError) {
        self.reports.lock().unwrap().push(error.kind().to_string());
    }
}

pub fn bytes(s: &str) -> RawValue {
    RawValue::ByteArray(s.as_bytes().to_vec())
}

pub fn text(s: &str) -> RawValue {
    RawValue::String(s.to_string())
}

pub fn int(n: i64) -> RawValue {
    RawValue::Integer(BigInt::from(n))
}

pub fn offer_created_stack() -> Vec<RawValue> {
    vec![bytes("created"), text("addr1"), text("hash1"), text("assetA"), int(100), text("assetB"), int(50)]
}

pub fn notification(script_hash: &str, state: Vec<RawValue>) -> Notification {
    Notification { script_hash: script_hash.to_string(), state }
}

pub fn execution(tx: &str, vm_state: VmState, notifications: Vec<Notification>) -> ExecutionResult {
    ExecutionResult { transaction_hash: tx.to_string(), vm_state, notifications }
}
