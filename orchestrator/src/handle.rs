use crate::api::{CatalogAccess, HistoryAccess, RunControl, StartRequest};
use crate::catalog::{Catalog, Definition};
use crate::clock::{Clock, SystemClock};
use crate::error::{IllegalTransition, OrchestratorError};
use crate::executor::{ExecutorRegistry, NoopExecutor, StepContext, StepExecutor};
use crate::history::{HistoryFilter, HistoryStore};
use crate::logging::{ObservabilitySink, TransitionEvent, TransitionLog};
use crate::state_machine;
use crate::types::{
    DefinitionId, Run, RunId, RunMetrics, RunState, StepFailure, StepRecord, StepStatus,
};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Orchestrator configuration
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Chaos definitions are rejected with `ChaosDisabled` while this is off.
    /// Recovery scenarios are never gated.
    pub chaos_enabled: bool,
    /// Per-run deadline; expiry finalizes the run as `TimedOut`.
    pub max_run_duration: Option<Duration>,
    /// History retention, in entries.
    pub history_retention: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            chaos_enabled: false,
            max_run_duration: Some(Duration::from_secs(30 * 60)),
            history_retention: 1_000,
        }
    }
}

struct ActiveEntry {
    run: Arc<RwLock<Run>>,
    cancel: Arc<AtomicBool>,
    done: watch::Receiver<bool>,
    sequence: u64,
}

/// ActiveRunSet plus the per-definition exclusivity map. Both live under one
/// lock so check-and-insert cannot race.
#[derive(Default)]
struct ActiveState {
    runs: HashMap<RunId, ActiveEntry>,
    by_definition: HashMap<DefinitionId, RunId>,
    next_sequence: u64,
}

struct Inner {
    config: OrchestratorConfig,
    catalog: Catalog,
    registry: ExecutorRegistry,
    clock: Arc<dyn Clock>,
    transition_log: TransitionLog,
    sink: Option<Arc<dyn ObservabilitySink>>,
    history: HistoryStore,
    active: RwLock<ActiveState>,
}

/// Main orchestrator handle implementing all operational traits.
///
/// Cheap to clone; clones share all state. Each accepted run is driven by a
/// spawned task that owns the run exclusively until its terminal transition
/// hands it to the history store.
#[derive(Clone)]
pub struct OrchestratorHandle {
    inner: Arc<Inner>,
}

impl OrchestratorHandle {
    pub fn new() -> Self {
        Self::with_config(OrchestratorConfig::default())
    }

    pub fn with_config(config: OrchestratorConfig) -> Self {
        Self::with_executors(config, ExecutorRegistry::default())
    }

    pub fn with_executors(config: OrchestratorConfig, registry: ExecutorRegistry) -> Self {
        Self::with_collaborators(config, registry, Arc::new(SystemClock), None)
    }

    /// Full constructor: injectable clock and an optional extra sink beside
    /// the built-in transition log.
    pub fn with_collaborators(
        config: OrchestratorConfig,
        registry: ExecutorRegistry,
        clock: Arc<dyn Clock>,
        sink: Option<Arc<dyn ObservabilitySink>>,
    ) -> Self {
        let history = HistoryStore::new(config.history_retention);
        Self {
            inner: Arc::new(Inner {
                config,
                catalog: Catalog::builtin(),
                registry,
                clock,
                transition_log: TransitionLog::default(),
                sink,
                history,
                active: RwLock::new(ActiveState::default()),
            }),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    /// The built-in hash-chained record of every state transition.
    pub fn transition_log(&self) -> &TransitionLog {
        &self.inner.transition_log
    }
}

impl Default for OrchestratorHandle {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl RunControl for OrchestratorHandle {
    fn start_run(&self, request: StartRequest) -> Result<Run, OrchestratorError> {
        let inner = &self.inner;
        let definition = inner
            .catalog
            .get(&request.definition_id)
            .ok_or_else(|| OrchestratorError::UnknownDefinition(request.definition_id.clone()))?;

        if definition.is_chaos() {
            if !inner.config.chaos_enabled {
                return Err(OrchestratorError::ChaosDisabled);
            }
            if !definition.safe_to_run() && !request.override_safety {
                return Err(OrchestratorError::SafetyBlocked(definition.id.clone()));
            }
        }

        let effective_parameters = definition.resolve_parameters(&request.parameters)?;

        let run_id = RunId::new();
        let run = Run {
            run_id,
            definition_id: definition.id.clone(),
            effective_parameters,
            state: RunState::Pending,
            dry_run: request.dry_run,
            started_at: inner.clock.now(),
            completed_at: None,
            steps_completed: Vec::new(),
            steps_remaining: definition.steps.clone(),
            failure: None,
            metrics: RunMetrics::default(),
        };
        let snapshot = run.clone();

        let run = Arc::new(RwLock::new(run));
        let cancel = Arc::new(AtomicBool::new(false));
        let (done_tx, done_rx) = watch::channel(false);

        {
            let mut active = inner.active.write();
            if active.by_definition.contains_key(&definition.id) {
                return Err(OrchestratorError::Conflict(definition.id.clone()));
            }
            let sequence = active.next_sequence;
            active.next_sequence += 1;
            active.by_definition.insert(definition.id.clone(), run_id);
            active.runs.insert(
                run_id,
                ActiveEntry {
                    run: run.clone(),
                    cancel: cancel.clone(),
                    done: done_rx,
                    sequence,
                },
            );
        }

        tracing::info!(
            run_id = %run_id,
            definition_id = %definition.id,
            dry_run = request.dry_run,
            "run accepted"
        );

        let inner = self.inner.clone();
        tokio::spawn(async move {
            drive(inner, run, cancel, done_tx).await;
        });

        Ok(snapshot)
    }

    fn stop_run(&self, run_id: RunId) -> Result<Run, OrchestratorError> {
        {
            let active = self.inner.active.read();
            if let Some(entry) = active.runs.get(&run_id) {
                entry.cancel.store(true, Ordering::SeqCst);
                tracing::info!(run_id = %run_id, "cancellation requested");
                return Ok(entry.run.read().clone());
            }
        }
        // Terminal runs are returned unchanged.
        self.inner
            .history
            .find(run_id)
            .ok_or(OrchestratorError::UnknownRun(run_id))
    }

    fn get_status(&self, run_id: RunId) -> Result<Run, OrchestratorError> {
        {
            let active = self.inner.active.read();
            if let Some(entry) = active.runs.get(&run_id) {
                return Ok(entry.run.read().clone());
            }
        }
        self.inner
            .history
            .find(run_id)
            .ok_or(OrchestratorError::UnknownRun(run_id))
    }

    fn list_active(&self) -> Vec<Run> {
        let active = self.inner.active.read();
        let mut entries: Vec<_> = active.runs.values().collect();
        entries.sort_by_key(|e| e.sequence);
        entries.iter().map(|e| e.run.read().clone()).collect()
    }

    async fn wait_for_completion(
        &self,
        run_id: RunId,
        timeout: Duration,
    ) -> Result<Run, OrchestratorError> {
        let rx = {
            let active = self.inner.active.read();
            active.runs.get(&run_id).map(|e| e.done.clone())
        };

        let Some(mut rx) = rx else {
            return self
                .inner
                .history
                .find(run_id)
                .ok_or(OrchestratorError::UnknownRun(run_id));
        };

        let wait = async {
            while !*rx.borrow_and_update() {
                if rx.changed().await.is_err() {
                    break;
                }
            }
        };
        tokio::time::timeout(timeout, wait)
            .await
            .map_err(|_| OrchestratorError::WaitTimeout(run_id, timeout))?;

        self.inner
            .history
            .find(run_id)
            .ok_or(OrchestratorError::UnknownRun(run_id))
    }
}

impl CatalogAccess for OrchestratorHandle {
    fn definition(&self, id: &DefinitionId) -> Option<Definition> {
        self.inner.catalog.get(id).cloned()
    }

    fn list_definitions(&self) -> Vec<Definition> {
        self.inner.catalog.list().to_vec()
    }
}

impl HistoryAccess for OrchestratorHandle {
    fn query_history(&self, filter: &HistoryFilter) -> Vec<Run> {
        self.inner.history.query(filter)
    }
}

/// Per-run drive loop. Steps dispatch strictly in catalog order; the
/// cancellation flag is observed before each dispatch and never preempts a
/// step already in flight.
async fn drive(
    inner: Arc<Inner>,
    run: Arc<RwLock<Run>>,
    cancel: Arc<AtomicBool>,
    done_tx: watch::Sender<bool>,
) {
    let (run_id, definition_id, dry_run, parameters, started_at) = {
        let guard = run.read();
        (
            guard.run_id,
            guard.definition_id.clone(),
            guard.dry_run,
            guard.effective_parameters.clone(),
            guard.started_at,
        )
    };
    let ctx = StepContext {
        run_id,
        definition_id,
        parameters,
        dry_run,
    };
    let deadline = inner
        .config
        .max_run_duration
        .map(|d| started_at + d.as_millis() as u64);
    let noop: Arc<dyn StepExecutor> = Arc::new(NoopExecutor);

    let terminal = loop {
        if cancel.load(Ordering::SeqCst) {
            break RunState::Cancelled;
        }

        {
            let mut guard = run.write();
            if guard.state == RunState::Pending {
                if transition(&inner, &mut guard, RunState::Running).is_err() {
                    return;
                }
            }
        }

        if let Some(deadline) = deadline {
            if inner.clock.now() >= deadline {
                break RunState::TimedOut;
            }
        }

        let next = { run.read().steps_remaining.first().cloned() };
        let Some(step_id) = next else {
            break RunState::Completed;
        };

        let executor = if dry_run {
            noop.clone()
        } else {
            inner.registry.resolve(&step_id)
        };
        let dispatched_at = inner.clock.now();
        let outcome = executor.execute(&step_id, &ctx).await;
        let finished_at = inner.clock.now();

        if outcome.succeeded() {
            let mut guard = run.write();
            let step_id = guard.steps_remaining.remove(0);
            guard.steps_completed.push(StepRecord {
                step_id,
                status: StepStatus::Success,
                duration_ms: outcome.duration_ms,
                detail: outcome.detail,
                started_at: dispatched_at,
                finished_at,
            });
        } else {
            // The failing step stays at the head of steps_remaining; its
            // outcome lives in `failure`. Everything behind it is skipped.
            let mut guard = run.write();
            guard.failure = Some(StepFailure {
                step_id,
                detail: outcome.detail,
                at: finished_at,
            });
            break RunState::Failed;
        }
    };

    finalize(&inner, &run, terminal);
    let _ = done_tx.send(true);
}

fn transition(inner: &Inner, run: &mut Run, to: RunState) -> Result<(), IllegalTransition> {
    let from = run.state;
    if let Err(e) = state_machine::validate_transition(from, to) {
        tracing::error!(run_id = %run.run_id, error = %e, "state machine rejected transition");
        return Err(e);
    }
    run.state = to;

    let event = TransitionEvent {
        run_id: run.run_id,
        definition_id: run.definition_id.clone(),
        from,
        to,
        timestamp: inner.clock.now(),
    };
    inner.transition_log.append(event.clone());
    if let Some(sink) = &inner.sink {
        sink.record(&event);
    }
    Ok(())
}

/// Terminal hand-off: the run leaves the active set and enters history as
/// one logical operation, so it is never in neither place.
fn finalize(inner: &Inner, run: &Arc<RwLock<Run>>, terminal: RunState) {
    let completed = {
        let mut guard = run.write();
        if transition(inner, &mut guard, terminal).is_err() {
            return;
        }
        let now = inner.clock.now();
        guard.completed_at = Some(now);
        if terminal == RunState::Completed {
            guard.metrics = RunMetrics {
                detection_time_ms: guard.steps_completed.first().map(|s| s.duration_ms),
                failover_time_ms: Some(guard.steps_completed.iter().map(|s| s.duration_ms).sum()),
                recovery_time_ms: Some(now.saturating_sub(guard.started_at)),
            };
        }
        guard.clone()
    };

    inner.history.append(completed.clone());
    {
        let mut active = inner.active.write();
        active.runs.remove(&completed.run_id);
        active.by_definition.remove(&completed.definition_id);
    }

    tracing::info!(
        run_id = %completed.run_id,
        definition_id = %completed.definition_id,
        state = ?completed.state,
        "run finalized"
    );
}
