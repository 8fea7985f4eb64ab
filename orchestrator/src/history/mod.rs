//! Append-only store of terminal runs.
//!
//! `append` is the only mutator and is called exactly once per run, on its
//! terminal transition. Retention is count-based and configurable; it bounds
//! memory, it is not a correctness property.

use crate::types::{DefinitionId, Run, RunId, RunState, Timestamp};
use parking_lot::Mutex;

#[derive(Debug, Clone)]
pub struct HistoryFilter {
    pub definition_id: Option<DefinitionId>,
    pub status: Option<RunState>,
    pub since: Option<Timestamp>,
    pub limit: usize,
}

impl Default for HistoryFilter {
    fn default() -> Self {
        Self {
            definition_id: None,
            status: None,
            since: None,
            limit: 10,
        }
    }
}

#[derive(Debug)]
pub struct HistoryStore {
    inner: Mutex<Vec<Run>>,
    max_entries: usize,
}

impl HistoryStore {
    pub fn new(max_entries: usize) -> Self {
        Self {
            inner: Mutex::new(Vec::new()),
            max_entries,
        }
    }

    pub fn append(&self, run: Run) {
        debug_assert!(run.is_terminal(), "only terminal runs enter history");
        let mut guard = self.inner.lock();
        guard.push(run);
        if guard.len() > self.max_entries {
            let excess = guard.len() - self.max_entries;
            guard.drain(..excess);
        }
    }

    /// Matching runs, most recent first.
    pub fn query(&self, filter: &HistoryFilter) -> Vec<Run> {
        let guard = self.inner.lock();
        guard
            .iter()
            .rev()
            .filter(|run| {
                if let Some(definition_id) = &filter.definition_id {
                    if &run.definition_id != definition_id {
                        return false;
                    }
                }
                if let Some(status) = filter.status {
                    if run.state != status {
                        return false;
                    }
                }
                if let Some(since) = filter.since {
                    if run.started_at < since {
                        return false;
                    }
                }
                true
            })
            .take(filter.limit)
            .cloned()
            .collect()
    }

    pub fn find(&self, run_id: RunId) -> Option<Run> {
        self.inner
            .lock()
            .iter()
            .rev()
            .find(|run| run.run_id == run_id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(1_000)
    }
}
