//! Supporting types for the correlation table: pending-slot bookkeeping and
//! request id generation.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, TimeDelta, Utc};
use serde_json::Value;
use tokio::sync::oneshot;

use crate::protocol::RequestId;

use super::error::CorrelationResult;

/// One outstanding request's bookkeeping: the one-shot sender the dispatch
/// loop delivers a matching response through, plus enough state to decide
/// expiry without a second source of truth.
pub struct PendingRequest {
    pub sender: oneshot::Sender<CorrelationResult<Value>>,
    pub created_at: DateTime<Utc>,
    pub timeout: TimeDelta,
    pub request_data: Value,
}

impl PendingRequest {
    pub fn new(
        sender: oneshot::Sender<CorrelationResult<Value>>,
        timeout: TimeDelta,
        request_data: Value,
    ) -> Self {
        Self {
            sender,
            created_at: Utc::now(),
            timeout,
            request_data,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now - self.created_at >= self.timeout
    }

    pub fn time_remaining(&self) -> TimeDelta {
        self.timeout - (Utc::now() - self.created_at)
    }
}

/// Monotonic numeric request id generator.
///
/// A string id would work just as well on the wire; a counter keeps ids
/// small and makes correlation-table logs easy to read during debugging.
#[derive(Debug, Default)]
pub struct RequestIdGenerator {
    counter: AtomicU64,
}

impl RequestIdGenerator {
    pub fn new() -> Self {
        Self {
            counter: AtomicU64::new(1),
        }
    }

    pub fn next_id(&self) -> RequestId {
        let value = self.counter.fetch_add(1, Ordering::SeqCst);
        RequestId::new_number(value as i64)
    }

    pub fn current_count(&self) -> u64 {
        self.counter.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_generator_produces_distinct_increasing_ids() {
        let gen = RequestIdGenerator::new();
        let a = gen.next_id();
        let b = gen.next_id();
        assert_ne!(a, b);
    }

    #[test]
    fn pending_request_not_expired_immediately() {
        let (tx, _rx) = oneshot::channel();
        let pending = PendingRequest::new(tx, TimeDelta::seconds(30), Value::Null);
        assert!(!pending.is_expired());
    }

    #[test]
    fn pending_request_expired_when_timeout_is_zero() {
        let (tx, _rx) = oneshot::channel();
        let pending = PendingRequest::new(tx, TimeDelta::zero(), Value::Null);
        assert!(pending.is_expired());
    }
}
