//! Runs against a live PostgreSQL when EVENTS_WRITER_TEST_DSN is set, otherwise does nothing.

use chrono::DateTime;

use events_writer::classifier::SpecializedKind;
use events_writer::db::{EventSink, InsertOutcome, PgSink};
use events_writer::models::SpecializedRow;
use events_writer::types::{EventRecord, PayloadValue};

fn test_dsn() -> Option<String> {
    std::env::var("EVENTS_WRITER_TEST_DSN").ok().filter(|s| !s.is_empty())
}

fn offer_record(tx: &str) -> EventRecord {
    EventRecord {
        block_number: 100,
        transaction_hash: tx.to_string(),
        contract_hash: "a32bcf5d7082f740a4d4a7f0ee8a3c9f2b43a1e0".to_string(),
        event_time: DateTime::from_timestamp(1_600_000_000, 0).unwrap().naive_utc(),
        event_type: "created".to_string(),
        event_payload: ["addr1", "hash1", "assetA", "100", "assetB", "50"]
            .iter()
            .map(|s| PayloadValue::Text(s.to_string()))
            .collect(),
        event_index: 0,
    }
}

#[tokio::test]
async fn test_pg_insert_is_idempotent() {
    let Some(dsn) = test_dsn() else {
        return;
    };

    let schema = std::fs::read_to_string("init.sql").unwrap();
    let sink = PgSink::connect(&dsn, Some(&schema), "neo").await.unwrap();
    sink.test_connection().await.unwrap();

    let tx = format!("{:064x}", chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default());
    let record = offer_record(&tx);
    let row = SpecializedRow::project(&record, SpecializedKind::Offer).unwrap().unwrap();

    assert_eq!(sink.insert_event(&record).await.unwrap(), InsertOutcome::Inserted);
    assert_eq!(sink.insert_specialized(&record, &row).await.unwrap(), InsertOutcome::Inserted);

    assert_eq!(sink.insert_event(&record).await.unwrap(), InsertOutcome::AlreadyPresent);
    assert_eq!(sink.insert_specialized(&record, &row).await.unwrap(), InsertOutcome::AlreadyPresent);
}
