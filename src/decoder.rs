use num_bigint::{BigInt, Sign};

use crate::error::DecodeError;
use crate::types::{PayloadValue, RawValue};

/// Byte lengths the node uses for script hashes (UInt160) and transaction/block hashes (UInt256).
const ADDRESS_LEN: usize = 20;
const HASH_LEN: usize = 32;

/// Decode a notification stack into its event type and ordered payload.
///
/// Element 0 is the event type, the rest is decoded element by element and never fails.
pub fn decode_stack(stack: &[RawValue]) -> Result<(String, Vec<PayloadValue>), DecodeError> {
    let (head, rest) = stack.split_first().ok_or(DecodeError::MissingEventType)?;
    let event_type = decode_event_type(head)?;
    let payload = rest.iter().map(decode_value).collect();
    Ok((event_type, payload))
}

/// Element 0 read through its byte form, then as UTF-8.
fn decode_event_type(value: &RawValue) -> Result<String, DecodeError> {
    let bytes = match value {
        RawValue::ByteArray(bytes) => bytes.clone(),
        RawValue::String(s) => s.as_bytes().to_vec(),
        RawValue::Other { bytes, .. } => bytes.clone(),
        RawValue::Boolean(true) => vec![1],
        RawValue::Boolean(false) => Vec::new(),
        // the VM encodes zero as an empty byte string
        RawValue::Integer(i) if i.sign() == Sign::NoSign => Vec::new(),
        RawValue::Integer(i) => i.to_signed_bytes_le(),
    };
    Ok(String::from_utf8(bytes)?)
}

pub fn decode_value(value: &RawValue) -> PayloadValue {
    match value {
        RawValue::Boolean(b) => PayloadValue::Bool(*b),
        RawValue::String(s) => PayloadValue::Text(s.clone()),
        RawValue::Integer(i) => PayloadValue::Integer(i.to_string()),
        RawValue::ByteArray(bytes) if bytes.len() == ADDRESS_LEN || bytes.len() == HASH_LEN => {
            PayloadValue::Hex(reversed_hex(bytes))
        }
        RawValue::ByteArray(bytes) => {
            PayloadValue::Integer(BigInt::from_signed_bytes_le(bytes).to_string())
        }
        RawValue::Other { bytes, .. } => PayloadValue::Hex(reversed_hex(bytes)),
    }
}

/// Hashes are little-endian on the stack, displayed big-endian.
fn reversed_hex(bytes: &[u8]) -> String {
    let mut reversed = bytes.to_vec();
    reversed.reverse();
    hex::encode(reversed)
}
