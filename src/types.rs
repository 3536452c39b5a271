use chrono::NaiveDateTime;
use num_bigint::BigInt;
use serde::Serialize;

/// One element of a notification's execution stack, as handed over by the node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawValue {
    Boolean(bool),
    String(String),
    Integer(BigInt),
    ByteArray(Vec<u8>),
    /// Any VM type without a dedicated decoding rule, kept as its raw bytes.
    Other { type_name: String, bytes: Vec<u8> },
}

/// Outcome of the VM for one execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmState {
    Halt,
    Fault,
    Other,
}

impl VmState {
    pub fn is_fault(&self) -> bool {
        matches!(self, VmState::Fault)
    }
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub script_hash: String,
    pub state: Vec<RawValue>,
}

/// Execution result of one transaction inside a persisted block.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub transaction_hash: String,
    pub vm_state: VmState,
    pub notifications: Vec<Notification>,
}

/// A decoded scalar from the notification payload.
///
/// Serialized untagged so the JSON payload column holds plain booleans and strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PayloadValue {
    Bool(bool),
    Text(String),
    /// Decimal representation of an arbitrary-precision integer.
    Integer(String),
    /// Byte-reversed hex of a hash, address or exotic stack item.
    Hex(String),
}

impl PayloadValue {
    pub fn as_text(&self) -> String {
        match self {
            PayloadValue::Bool(b) => b.to_string(),
            PayloadValue::Text(s) | PayloadValue::Integer(s) | PayloadValue::Hex(s) => s.clone(),
        }
    }
}

/// A decoded contract notification, ready to be written to the sinks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRecord {
    pub block_number: u32,
    pub transaction_hash: String,
    pub contract_hash: String,
    pub event_time: NaiveDateTime,
    pub event_type: String,
    pub event_payload: Vec<PayloadValue>,
    pub event_index: u32,
}

impl EventRecord {
    pub fn payload_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.event_payload).unwrap_or_default()
    }
}
