use thiserror::Error;

/// Failures while reading a notification stack.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("notification stack is empty, no event type present")]
    MissingEventType,
    #[error("event type is not valid UTF-8: {0}")]
    NotUtf8(#[from] std::string::FromUtf8Error),
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),
    #[error("Sink connection error: {0}")]
    Connection(String),
    #[error("Column type mismatch: {0}")]
    TypeMismatch(String),
}

/// Where in the block a failing notification sits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventLocation {
    pub block_number: u32,
    pub transaction_hash: String,
    pub contract_hash: String,
    pub event_index: u32,
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Malformed payload at {location:?}: {reason}")]
    MalformedPayload { location: EventLocation, reason: String },

    #[error("Write to sink '{sink}' failed at {location:?}: {source}")]
    WriteFailure {
        sink: String,
        location: EventLocation,
        #[source]
        source: SinkError,
    },
}

impl EngineError {
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::MalformedPayload { .. } => "MalformedPayload",
            EngineError::WriteFailure { .. } => "WriteFailure",
        }
    }

    pub fn location(&self) -> &EventLocation {
        match self {
            EngineError::MalformedPayload { location, .. } => location,
            EngineError::WriteFailure { location, .. } => location,
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Walks the error and its sources, one line per level.
pub fn error_chain(err: &dyn std::error::Error) -> Vec<String> {
    let mut chain = vec![err.to_string()];
    let mut source = err.source();
    while let Some(inner) = source {
        chain.push(inner.to_string());
        source = inner.source();
    }
    chain
}
