use async_trait::async_trait;
use tokio_postgres::error::SqlState;
use tokio_postgres::{Client, NoTls};
use tracing::{debug, error, info};

use crate::error::SinkError;
use crate::models::SpecializedRow;
use crate::types::EventRecord;

/// Result of a single insert that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// The row's unique key already exists, written by an earlier run.
    AlreadyPresent,
}

/// A destination database for decoded events.
///
/// Implementations report a unique key violation as `InsertOutcome::AlreadyPresent`,
/// every other failure as `SinkError`.
#[async_trait]
pub trait EventSink: Send + Sync {
    fn name(&self) -> &str;

    async fn insert_event(&self, record: &EventRecord) -> Result<InsertOutcome, SinkError>;

    async fn insert_specialized(
        &self,
        record: &EventRecord,
        row: &SpecializedRow,
    ) -> Result<InsertOutcome, SinkError>;
}

pub struct PgSink {
    name: String,
    client: Client,
    blockchain: String,
}

impl PgSink {
    pub fn new(name: String, client: Client, blockchain: &str) -> Self {
        Self { name, client, blockchain: blockchain.to_string() }
    }

    pub async fn connect(dsn: &str, schema: Option<&str>, blockchain: &str) -> Result<Self, SinkError> {
        let client = connect_pg(dsn, schema).await?;
        Ok(Self::new(describe_dsn(dsn), client, blockchain))
    }

    pub async fn test_connection(&self) -> Result<(), SinkError> {
        self.client.execute("SELECT 1", &[]).await?;
        debug!("Sink {} connection test successful", self.name);
        Ok(())
    }

    async fn execute_insert(
        &self,
        query: &str,
        params: &[&(dyn postgres_types::ToSql + Sync)],
    ) -> Result<InsertOutcome, SinkError> {
        match self.client.execute(query, params).await {
            Ok(rows) => {
                debug!("Rows inserted={}", rows);
                Ok(InsertOutcome::Inserted)
            }
            Err(e) if e.code() == Some(&SqlState::UNIQUE_VIOLATION) => Ok(InsertOutcome::AlreadyPresent),
            Err(e) => Err(SinkError::Postgres(e)),
        }
    }
}

#[async_trait]
impl EventSink for PgSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn insert_event(&self, record: &EventRecord) -> Result<InsertOutcome, SinkError> {
        let query = r#"
            INSERT INTO events (
                block_number,
                transaction_hash,
                contract_hash,
                event_type,
                event_payload,
                event_time,
                event_index,
                blockchain,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5::jsonb, $6, $7, $8, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP)
        "#;

        let block_number = i64::from(record.block_number);
        let event_index = i64::from(record.event_index);
        let event_payload = record.payload_json();

        self.execute_insert(
            query,
            &[
                &block_number,
                &record.transaction_hash,
                &record.contract_hash,
                &record.event_type,
                &event_payload,
                &record.event_time,
                &event_index,
                &self.blockchain,
            ],
        )
        .await
    }

    async fn insert_specialized(
        &self,
        record: &EventRecord,
        row: &SpecializedRow,
    ) -> Result<InsertOutcome, SinkError> {
        let block_number = i64::from(record.block_number);
        let event_index = i64::from(record.event_index);

        match row {
            SpecializedRow::Offer(offer) => {
                let query = r#"
                    INSERT INTO offers (
                        block_number, transaction_hash, contract_hash, event_index, event_time, blockchain,
                        address, available_amount, offer_hash, offer_asset_id, offer_amount,
                        want_asset_id, want_amount, created_at, updated_at
                    ) VALUES (
                        $1, $2, $3, $4, $5, $6,
                        $7, $8::text::numeric, $9, $10, $11::text::numeric,
                        $12, $13::text::numeric, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP
                    )
                "#;
                self.execute_insert(
                    query,
                    &[
                        &block_number,
                        &record.transaction_hash,
                        &record.contract_hash,
                        &event_index,
                        &record.event_time,
                        &self.blockchain,
                        &offer.address,
                        &offer.available_amount,
                        &offer.offer_hash,
                        &offer.offer_asset_id,
                        &offer.offer_amount,
                        &offer.want_asset_id,
                        &offer.want_amount,
                    ],
                )
                .await
            }
            SpecializedRow::Trade(trade) => {
                let query = r#"
                    INSERT INTO trades (
                        block_number, transaction_hash, contract_hash, event_index, event_time, blockchain,
                        address, offer_hash, filled_amount, offer_asset_id, offer_amount,
                        want_asset_id, want_amount, created_at, updated_at
                    ) VALUES (
                        $1, $2, $3, $4, $5, $6,
                        $7, $8, $9::text::numeric, $10, $11::text::numeric,
                        $12, $13::text::numeric, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP
                    )
                "#;
                self.execute_insert(
                    query,
                    &[
                        &block_number,
                        &record.transaction_hash,
                        &record.contract_hash,
                        &event_index,
                        &record.event_time,
                        &self.blockchain,
                        &trade.address,
                        &trade.offer_hash,
                        &trade.filled_amount,
                        &trade.offer_asset_id,
                        &trade.offer_amount,
                        &trade.want_asset_id,
                        &trade.want_amount,
                    ],
                )
                .await
            }
            SpecializedRow::Swap(swap) => {
                let query = r#"
                    INSERT INTO swaps (
                        block_number, transaction_hash, contract_hash, event_index, event_time, blockchain,
                        maker_address, taker_address, asset_id, amount, hashed_secret,
                        expiry_time, fee_asset_id, fee_amount, created_at, updated_at
                    ) VALUES (
                        $1, $2, $3, $4, $5, $6,
                        $7, $8, $9, $10::text::numeric, $11,
                        $12::text::numeric, $13, $14::text::numeric, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP
                    )
                "#;
                self.execute_insert(
                    query,
                    &[
                        &block_number,
                        &record.transaction_hash,
                        &record.contract_hash,
                        &event_index,
                        &record.event_time,
                        &self.blockchain,
                        &swap.maker_address,
                        &swap.taker_address,
                        &swap.asset_id,
                        &swap.amount,
                        &swap.hashed_secret,
                        &swap.expiry_time,
                        &swap.fee_asset_id,
                        &swap.fee_amount,
                    ],
                )
                .await
            }
        }
    }
}

pub async fn connect_pg(dsn: &str, schema: Option<&str>) -> Result<Client, SinkError> {
    let (client, connection) = tokio_postgres::connect(dsn, NoTls).await?;
    let name = describe_dsn(dsn);
    tokio::spawn(async move {
        if let Err(e) = connection.await {
            error!("Postgres connection error on {}: {:?}", name, e);
        }
    });

    // Create tables if not exist
    if let Some(schema) = schema {
        client.batch_execute(schema).await?;
    }

    info!("PostgreSQL sink {} ready", describe_dsn(dsn));

    Ok(client)
}

/// Printable sink name without credentials.
pub fn describe_dsn(dsn: &str) -> String {
    let Ok(config) = dsn.parse::<tokio_postgres::Config>() else {
        return "postgres".to_string();
    };

    let host = config
        .get_hosts()
        .first()
        .map(|h| match h {
            tokio_postgres::config::Host::Tcp(host) => host.clone(),
            #[allow(unreachable_patterns)]
            _ => "local".to_string(),
        })
        .unwrap_or_else(|| "localhost".to_string());
    let port = config.get_ports().first().copied().unwrap_or(5432);
    let dbname = config.get_dbname().unwrap_or("postgres");

    format!("{}:{}/{}", host, port, dbname)
}
