use tracing::{info, warn};

use crate::db::{EventSink, InsertOutcome};
use crate::error::{EngineError, EngineResult, EventLocation, SinkError};
use crate::models::SpecializedRow;
use crate::types::EventRecord;

/// Rows touched by one event on one sink.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteSummary {
    pub inserted: usize,
    pub already_present: usize,
}

impl WriteSummary {
    fn count(&mut self, outcome: InsertOutcome) {
        match outcome {
            InsertOutcome::Inserted => self.inserted += 1,
            InsertOutcome::AlreadyPresent => self.already_present += 1,
        }
    }
}

pub fn location_of(record: &EventRecord) -> EventLocation {
    EventLocation {
        block_number: record.block_number,
        transaction_hash: record.transaction_hash.clone(),
        contract_hash: record.contract_hash.clone(),
        event_index: record.event_index,
    }
}

/// Write the generic row, then the specialized row if any, to one sink.
///
/// The two inserts are independent: an existing specialized row does not undo the generic
/// insert, and an existing generic row does not skip the specialized one. A specialized row
/// with a non-integer amount fails after the generic row is written.
pub async fn write_event(
    sink: &dyn EventSink,
    record: &EventRecord,
    specialized: Option<&SpecializedRow>,
) -> EngineResult<WriteSummary> {
    let mut summary = WriteSummary::default();

    info!(
        "Inserting {} event {}, block height: {}, sink: {}",
        record.event_type,
        record.payload_json(),
        record.block_number,
        sink.name()
    );
    let outcome = sink
        .insert_event(record)
        .await
        .map_err(|source| write_failure(sink, record, source))?;
    if outcome == InsertOutcome::AlreadyPresent {
        warn!(
            "Event {}:{}:{} already inserted in {}, ignoring",
            record.transaction_hash,
            record.contract_hash,
            record.event_index,
            sink.name()
        );
    }
    summary.count(outcome);

    if let Some(row) = specialized {
        row.check_amounts()
            .map_err(|reason| write_failure(sink, record, SinkError::TypeMismatch(reason)))?;

        let table = row.kind().table().unwrap_or("specialized");
        info!("Inserting {} row, block height: {}, sink: {}", table, record.block_number, sink.name());
        let outcome = sink
            .insert_specialized(record, row)
            .await
            .map_err(|source| write_failure(sink, record, source))?;
        if outcome == InsertOutcome::AlreadyPresent {
            warn!(
                "Row in {} for {}:{} already inserted in {}, ignoring",
                table,
                record.transaction_hash,
                record.event_index,
                sink.name()
            );
        }
        summary.count(outcome);
    }

    Ok(summary)
}

fn write_failure(sink: &dyn EventSink, record: &EventRecord, source: SinkError) -> EngineError {
    EngineError::WriteFailure {
        sink: sink.name().to_string(),
        location: location_of(record),
        source,
    }
}
