//! Errors produced by the pending-request correlation table.

use thiserror::Error;

use crate::protocol::RequestId;

pub type CorrelationResult<T> = Result<T, CorrelationError>;

#[derive(Debug, Clone, Error)]
pub enum CorrelationError {
    #[error("request {id} timed out after {duration:?}")]
    Timeout {
        id: RequestId,
        duration: std::time::Duration,
    },

    #[error("no pending request for id {id}")]
    RequestNotFound { id: RequestId },

    #[error("request {id} already completed")]
    AlreadyCompleted { id: RequestId },

    #[error("response channel for {id} closed: {details}")]
    ChannelClosed { id: RequestId, details: String },

    #[error("internal correlation error: {message}")]
    Internal { message: String },

    #[error("request {id} was cancelled")]
    Cancelled { id: RequestId },
}
