use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{error_chain, EngineError};

/// Receives reports about failures that abort or skip event processing.
///
/// Reporting is best-effort: implementations never fail the caller.
#[async_trait]
pub trait AlertSink: Send + Sync {
    async fn report(&self, error: &EngineError);
}

pub struct NoopAlertSink;

#[async_trait]
impl AlertSink for NoopAlertSink {
    async fn report(&self, error: &EngineError) {
        debug!("No alert endpoint configured, dropping report: {}", error);
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AlertReport {
    pub level: &'static str,
    pub kind: &'static str,
    pub message: String,
    pub causes: Vec<String>,
    pub block_number: u32,
    pub transaction_hash: String,
    pub contract_hash: String,
    pub event_index: u32,
    pub timestamp: String,
}

impl AlertReport {
    pub fn from_error(error: &EngineError) -> Self {
        let location = error.location();
        let mut chain = error_chain(error);
        let message = chain.remove(0);
        Self {
            level: "error",
            kind: error.kind(),
            message,
            causes: chain,
            block_number: location.block_number,
            transaction_hash: location.transaction_hash.clone(),
            contract_hash: location.contract_hash.clone(),
            event_index: location.event_index,
            timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        }
    }
}

/// Posts JSON error reports to an HTTP collector.
pub struct HttpAlertSink {
    client: Client,
    url: String,
    token: Option<String>,
}

impl HttpAlertSink {
    pub fn new(url: &str, token: Option<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url: url.to_string(), token })
    }

    async fn send(&self, report: &AlertReport) -> anyhow::Result<()> {
        let mut request = self.client.post(&self.url).json(report);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            anyhow::bail!("alert endpoint responded with status: {}", response.status());
        }
        Ok(())
    }
}

#[async_trait]
impl AlertSink for HttpAlertSink {
    async fn report(&self, error: &EngineError) {
        let report = AlertReport::from_error(error);
        match self.send(&report).await {
            Ok(()) => debug!("Reported {} to alert endpoint", report.kind),
            Err(e) => warn!("Failed to report error to alert endpoint (ignored): {:?}", e),
        }
    }
}
