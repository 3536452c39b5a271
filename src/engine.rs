use chrono::DateTime;
use tracing::{debug, error, info, warn};

use crate::alert::AlertSink;
use crate::classifier::{normalize_hash, EventClassifier};
use crate::config::FailurePolicy;
use crate::db::EventSink;
use crate::decoder::decode_stack;
use crate::error::{error_chain, EngineError, EngineResult, EventLocation};
use crate::models::SpecializedRow;
use crate::types::{EventRecord, ExecutionResult, Notification};
use crate::writer::{location_of, write_event};

/// Counters for one `on_block_persisted` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockReport {
    pub block_number: u32,
    pub executions_skipped: usize,
    pub notifications_out_of_scope: usize,
    pub events_processed: usize,
    pub rows_inserted: usize,
    pub rows_already_present: usize,
    pub failures: usize,
}

/// Decodes contract notifications of each persisted block and writes them to every sink.
///
/// Invocations must not overlap; sinks are shared across blocks without locking.
pub struct PersistenceEngine {
    classifier: EventClassifier,
    sinks: Vec<Box<dyn EventSink>>,
    alerts: Box<dyn AlertSink>,
    policy: FailurePolicy,
}

impl PersistenceEngine {
    pub fn new(
        classifier: EventClassifier,
        sinks: Vec<Box<dyn EventSink>>,
        alerts: Box<dyn AlertSink>,
        policy: FailurePolicy,
    ) -> Self {
        Self { classifier, sinks, alerts, policy }
    }

    pub async fn on_block_persisted(
        &self,
        block_number: u32,
        block_timestamp: u64,
        executions: &[ExecutionResult],
    ) -> EngineResult<BlockReport> {
        let mut report = BlockReport { block_number, ..Default::default() };

        for execution in executions {
            let transaction_hash = normalize_hash(&execution.transaction_hash);
            if execution.vm_state.is_fault() {
                debug!("Skipping faulted execution of txn {}", transaction_hash);
                report.executions_skipped += 1;
                continue;
            }

            info!("Executed txn: {}, block height: {}", transaction_hash, block_number);

            for (index, notification) in execution.notifications.iter().enumerate() {
                if !self.classifier.is_in_scope(&notification.script_hash) {
                    report.notifications_out_of_scope += 1;
                    continue;
                }

                let mut location = EventLocation {
                    block_number,
                    transaction_hash: transaction_hash.clone(),
                    contract_hash: normalize_hash(&notification.script_hash),
                    event_index: u32::MAX,
                };

                let result = match event_index(index) {
                    Ok(event_index) => {
                        location.event_index = event_index;
                        self.process_notification(location, block_timestamp, notification).await
                    }
                    Err(reason) => Err(EngineError::MalformedPayload { location, reason }),
                };

                match result {
                    Ok((inserted, already_present)) => {
                        report.events_processed += 1;
                        report.rows_inserted += inserted;
                        report.rows_already_present += already_present;
                    }
                    Err(e) => {
                        self.handle_failure(&e).await;
                        match self.policy {
                            FailurePolicy::Abort => return Err(e),
                            FailurePolicy::Isolate => report.failures += 1,
                        }
                    }
                }
            }
        }

        info!(
            "Block {} done: {} events, {} rows inserted, {} already present, {} failures",
            block_number,
            report.events_processed,
            report.rows_inserted,
            report.rows_already_present,
            report.failures
        );
        Ok(report)
    }

    async fn process_notification(
        &self,
        location: EventLocation,
        block_timestamp: u64,
        notification: &Notification,
    ) -> EngineResult<(usize, usize)> {
        let record = build_record(location, block_timestamp, notification)?;
        let kind = self.classifier.classify(&record.event_type);
        let specialized = SpecializedRow::project(&record, kind).map_err(|reason| {
            EngineError::MalformedPayload { location: location_of(&record), reason }
        })?;

        let mut inserted = 0;
        let mut already_present = 0;
        for sink in &self.sinks {
            let summary = write_event(sink.as_ref(), &record, specialized.as_ref()).await?;
            inserted += summary.inserted;
            already_present += summary.already_present;
        }
        Ok((inserted, already_present))
    }

    async fn handle_failure(&self, err: &EngineError) {
        for (depth, line) in error_chain(err).iter().enumerate() {
            if depth == 0 {
                error!("{}: {}", err.kind(), line);
            } else {
                error!("  caused by: {}", line);
            }
        }
        if self.policy == FailurePolicy::Isolate {
            warn!("Continuing with next notification after {}", err.kind());
        }
        self.alerts.report(err).await;
    }
}

/// Position of a notification within its execution, as stored in `event_index`.
fn event_index(index: usize) -> Result<u32, String> {
    u32::try_from(index).map_err(|_| format!("notification index {} does not fit in u32", index))
}

/// Decode one in-scope notification into an `EventRecord`.
pub fn build_record(
    location: EventLocation,
    block_timestamp: u64,
    notification: &Notification,
) -> EngineResult<EventRecord> {
    let (event_type, event_payload) = match decode_stack(&notification.state) {
        Ok(decoded) => decoded,
        Err(e) => return Err(EngineError::MalformedPayload { location, reason: e.to_string() }),
    };

    let event_time = i64::try_from(block_timestamp)
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|dt| dt.naive_utc());
    let Some(event_time) = event_time else {
        return Err(EngineError::MalformedPayload {
            location,
            reason: format!("block timestamp {} is out of range", block_timestamp),
        });
    };

    Ok(EventRecord {
        block_number: location.block_number,
        transaction_hash: location.transaction_hash,
        contract_hash: location.contract_hash,
        event_time,
        event_type,
        event_payload,
        event_index: location.event_index,
    })
}
