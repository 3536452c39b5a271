use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use num_bigint::BigInt;
use serde::Deserialize;
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::types::{ExecutionResult, Notification, RawValue, VmState};

/// One persisted block as delivered by the node, one per line of input.
#[derive(Debug, Deserialize)]
pub struct BlockBatch {
    pub block_number: u32,
    pub timestamp: u64,
    #[serde(default)]
    pub executions: Vec<ExecutionJson>,
}

#[derive(Debug, Deserialize)]
pub struct ExecutionJson {
    pub transaction_hash: String,
    pub vm_state: String,
    #[serde(default)]
    pub notifications: Vec<NotificationJson>,
}

#[derive(Debug, Deserialize)]
pub struct NotificationJson {
    pub script_hash: String,
    pub state: Vec<StackItemJson>,
}

#[derive(Debug, Deserialize)]
pub struct StackItemJson {
    #[serde(rename = "type")]
    pub item_type: String,
    #[serde(default)]
    pub value: Value,
}

impl BlockBatch {
    pub fn execution_results(&self) -> Result<Vec<ExecutionResult>> {
        self.executions.iter().map(ExecutionJson::to_result).collect()
    }
}

impl ExecutionJson {
    fn to_result(&self) -> Result<ExecutionResult> {
        let notifications = self
            .notifications
            .iter()
            .map(|n| {
                let state = n
                    .state
                    .iter()
                    .map(StackItemJson::to_raw)
                    .collect::<Result<Vec<_>>>()
                    .with_context(|| format!("notification from {} in txn {}", n.script_hash, self.transaction_hash))?;
                Ok(Notification { script_hash: n.script_hash.clone(), state })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(ExecutionResult {
            transaction_hash: self.transaction_hash.clone(),
            vm_state: parse_vm_state(&self.vm_state),
            notifications,
        })
    }
}

pub fn parse_vm_state(state: &str) -> VmState {
    let state = state.trim().to_ascii_uppercase();
    if state == "HALT" {
        VmState::Halt
    } else if state.contains("FAULT") {
        VmState::Fault
    } else {
        VmState::Other
    }
}

impl StackItemJson {
    pub fn to_raw(&self) -> Result<RawValue> {
        match self.item_type.as_str() {
            "Boolean" => match &self.value {
                Value::Bool(b) => Ok(RawValue::Boolean(*b)),
                other => Err(anyhow!("Boolean item with non-boolean value: {}", other)),
            },
            "String" => match &self.value {
                Value::String(s) => Ok(RawValue::String(s.clone())),
                other => Err(anyhow!("String item with non-string value: {}", other)),
            },
            "Integer" => {
                let text = match &self.value {
                    Value::String(s) => s.clone(),
                    Value::Number(n) => n.to_string(),
                    other => return Err(anyhow!("Integer item with invalid value: {}", other)),
                };
                let n = BigInt::from_str(text.trim()).map_err(|e| anyhow!("Invalid integer '{}': {}", text, e))?;
                Ok(RawValue::Integer(n))
            }
            "ByteArray" | "ByteString" | "Buffer" => Ok(RawValue::ByteArray(hex_value(&self.value)?)),
            other => {
                let bytes = match &self.value {
                    Value::Null => Vec::new(),
                    value => hex_value(value)?,
                };
                Ok(RawValue::Other { type_name: other.to_string(), bytes })
            }
        }
    }
}

fn hex_value(value: &Value) -> Result<Vec<u8>> {
    let Value::String(s) = value else {
        return Err(anyhow!("expected hex string, got {}", value));
    };
    let s = s.trim();
    let s = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(s).map_err(|e| anyhow!("Invalid hex '{}': {}", s, e))
}

/// Read the next non-empty line as a block, `None` at end of input.
pub async fn next_block<R>(reader: &mut R) -> Result<Option<BlockBatch>>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            return Ok(None);
        }
        if line.trim().is_empty() {
            continue;
        }
        let block: BlockBatch = serde_json::from_str(line.trim()).context("invalid block line")?;
        return Ok(Some(block));
    }
}
