//! Observability for run state transitions.
//!
//! Every transition the orchestrator performs is recorded as a structured
//! [`TransitionEvent`]. The default sink is an in-memory hash-chained log so
//! a post-incident review can verify nobody rewrote the record of what a
//! simulation actually did.

use crate::error::LogError;
use crate::types::{DefinitionId, RunId, RunState, Timestamp};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionEvent {
    pub run_id: RunId,
    pub definition_id: DefinitionId,
    pub from: RunState,
    pub to: RunState,
    pub timestamp: Timestamp,
}

/// External collaborator notified of every transition.
pub trait ObservabilitySink: Send + Sync {
    fn record(&self, event: &TransitionEvent);
}

/// Sink that forwards transitions to `tracing`.
#[derive(Debug, Default)]
pub struct TracingSink;

impl ObservabilitySink for TracingSink {
    fn record(&self, event: &TransitionEvent) {
        tracing::info!(
            run_id = %event.run_id,
            definition_id = %event.definition_id,
            from = ?event.from,
            to = ?event.to,
            timestamp = event.timestamp,
            "run state transition"
        );
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainedEvent {
    pub event: TransitionEvent,
    pub prev_hash: [u8; 32],
    pub hash: [u8; 32],
}

/// Append-only transition log with a tamper-evident hash chain.
#[derive(Debug, Default)]
pub struct TransitionLog {
    inner: Mutex<Vec<ChainedEvent>>,
}

impl TransitionLog {
    pub fn append(&self, event: TransitionEvent) {
        let mut guard = self.inner.lock();
        let prev_hash = guard.last().map(|e| e.hash).unwrap_or([0u8; 32]);
        let hash = compute_hash(&event, &prev_hash);
        guard.push(ChainedEvent {
            event,
            prev_hash,
            hash,
        });
    }

    pub fn events(&self) -> Vec<ChainedEvent> {
        self.inner.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn verify_integrity(&self) -> Result<(), LogError> {
        let guard = self.inner.lock();
        let mut prev = [0u8; 32];
        for e in guard.iter() {
            if e.prev_hash != prev {
                return Err(LogError::IntegrityViolation);
            }
            if e.hash != compute_hash(&e.event, &e.prev_hash) {
                return Err(LogError::IntegrityViolation);
            }
            prev = e.hash;
        }
        Ok(())
    }
}

impl ObservabilitySink for TransitionLog {
    fn record(&self, event: &TransitionEvent) {
        self.append(event.clone());
    }
}

fn compute_hash(event: &TransitionEvent, prev_hash: &[u8; 32]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(event.run_id.0.as_bytes());
    hasher.update(event.definition_id.0.as_bytes());
    hasher.update([0]);
    hasher.update(format!("{:?}", event.from).as_bytes());
    hasher.update([0]);
    hasher.update(format!("{:?}", event.to).as_bytes());
    hasher.update([0]);
    hasher.update(event.timestamp.to_le_bytes());
    hasher.update(prev_hash);
    let out = hasher.finalize();
    out.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(to: RunState) -> TransitionEvent {
        TransitionEvent {
            run_id: RunId::new(),
            definition_id: "latency".into(),
            from: RunState::Pending,
            to,
            timestamp: 1_000,
        }
    }

    #[test]
    fn test_chain_links_and_verifies() {
        let log = TransitionLog::default();
        log.append(event(RunState::Running));
        log.append(event(RunState::Cancelled));

        let events = log.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].prev_hash, [0u8; 32]);
        assert_eq!(events[1].prev_hash, events[0].hash);
        assert!(log.verify_integrity().is_ok());
    }

    #[test]
    fn test_tampering_is_detected() {
        let log = TransitionLog::default();
        log.append(event(RunState::Running));
        log.append(event(RunState::Cancelled));

        {
            let mut guard = log.inner.lock();
            guard[0].event.timestamp = 9_999;
        }
        assert_eq!(log.verify_integrity(), Err(LogError::IntegrityViolation));
    }
}
