//! Command transport boundary.
//!
//! # Responsibilities
//! - Define the `Transport` seam the client dispatches through
//! - Describe transport-level faults and map them into `AppError`
//!
//! # Design Decisions
//! - A transport returns the raw wire shape; normalization is the client's job
//! - `Network` faults are transient, `Opaque` ones are not

pub mod http;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::protocol::{AppError, RawResponse};

pub use http::HttpTransport;

/// A command-invocation primitive: name + argument bag in, raw result out.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn invoke(&self, command: &str, args: Value) -> Result<RawResponse, TransportFault>;
}

/// Failure raised by the transport itself rather than by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportFault {
    /// Connection, I/O or protocol failure.
    #[error("{message}")]
    Network {
        message: String,
        details: Option<String>,
    },

    /// The transport produced something that is not an error value.
    #[error("{0}")]
    Opaque(String),
}

impl TransportFault {
    pub fn network(message: impl Into<String>) -> Self {
        TransportFault::Network {
            message: message.into(),
            details: None,
        }
    }

    /// Network faults may succeed on a later attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, TransportFault::Network { .. })
    }
}

impl From<TransportFault> for AppError {
    fn from(fault: TransportFault) -> Self {
        match fault {
            TransportFault::Network { message, details } => AppError::network(message, details),
            TransportFault::Opaque(value) => AppError::unknown(value, None),
        }
    }
}
