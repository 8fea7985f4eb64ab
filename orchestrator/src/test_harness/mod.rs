//! Randomized orchestrator harness.
//!
//! Drives the orchestrator through batches of concurrent runs with a seeded
//! RNG choosing definitions, dry-run mode, cancellations, and injected step
//! failures, then checks the run invariants after every terminal state.

use crate::api::{HistoryAccess, RunControl, StartRequest};
use crate::catalog::Definition;
use crate::error::OrchestratorError;
use crate::executor::{ExecutorRegistry, StepContext, StepExecutor, StepOutcome};
use crate::handle::{OrchestratorConfig, OrchestratorHandle};
use crate::history::HistoryFilter;
use crate::types::{RunState, StepId};
use parking_lot::Mutex;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Seed for the driver RNG and the flaky executor.
    pub seed: u64,
    pub total_runs: u64,
    pub max_concurrent: usize,
    pub dry_run_rate: f64,
    pub cancel_rate: f64,
    /// Probability that any single step execution fails.
    pub failure_rate: f64,
    pub step_delay_ms: u64,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            total_runs: 100,
            max_concurrent: 8,
            dry_run_rate: 0.3,
            cancel_rate: 0.1,
            failure_rate: 0.15,
            step_delay_ms: 2,
        }
    }
}

#[derive(Debug, Default)]
pub struct HarnessReport {
    pub started: u64,
    pub completed: u64,
    pub failed: u64,
    pub cancelled: u64,
    pub timed_out: u64,
    pub conflicts: u64,
    pub safety_blocked: u64,
    pub violations: Vec<String>,
}

impl HarnessReport {
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn generate_text(&self) -> String {
        let mut out = String::new();
        out.push_str("Harness Report\n");
        out.push_str("==============\n");
        out.push_str(&format!("Runs started:   {}\n", self.started));
        out.push_str(&format!("  completed:    {}\n", self.completed));
        out.push_str(&format!("  failed:       {}\n", self.failed));
        out.push_str(&format!("  cancelled:    {}\n", self.cancelled));
        out.push_str(&format!("  timed out:    {}\n", self.timed_out));
        out.push_str(&format!("Conflicts:      {}\n", self.conflicts));
        out.push_str(&format!("Safety blocks:  {}\n", self.safety_blocked));
        out.push_str(&format!("Violations:     {}\n", self.violations.len()));
        for v in &self.violations {
            out.push_str(&format!("  - {v}\n"));
        }
        out.push_str(if self.passed() { "PASS\n" } else { "FAIL\n" });
        out
    }
}

/// Executor that fails a configurable fraction of step executions.
struct FlakyExecutor {
    delay: Duration,
    failure_rate: f64,
    rng: Mutex<StdRng>,
}

#[async_trait::async_trait]
impl StepExecutor for FlakyExecutor {
    async fn execute(&self, step_id: &StepId, _ctx: &StepContext) -> StepOutcome {
        tokio::time::sleep(self.delay).await;
        let fail = self.rng.lock().gen_bool(self.failure_rate);
        let duration_ms = self.delay.as_millis() as u64;
        if fail {
            StepOutcome::failure(duration_ms, format!("harness-injected failure at {step_id}"))
        } else {
            StepOutcome::success(duration_ms)
        }
    }
}

pub async fn run_harness(config: HarnessConfig) -> HarnessReport {
    let registry = ExecutorRegistry::new(Arc::new(FlakyExecutor {
        delay: Duration::from_millis(config.step_delay_ms),
        failure_rate: config.failure_rate.clamp(0.0, 1.0),
        rng: Mutex::new(StdRng::seed_from_u64(config.seed.wrapping_add(1))),
    }));
    let handle = OrchestratorHandle::with_executors(
        OrchestratorConfig {
            chaos_enabled: true,
            max_run_duration: Some(Duration::from_secs(60)),
            history_retention: (config.total_runs as usize).max(16) * 2,
        },
        registry,
    );

    let mut rng = StdRng::seed_from_u64(config.seed);
    let definitions = handle.catalog().list().to_vec();
    let mut report = HarnessReport::default();

    let mut remaining = config.total_runs;
    while remaining > 0 {
        let batch_size = (config.max_concurrent as u64).min(remaining) as usize;
        remaining -= batch_size as u64;
        let mut in_flight = Vec::new();

        for _ in 0..batch_size {
            let definition = &definitions[rng.gen_range(0..definitions.len())];
            let withhold_override = !definition.safe_to_run() && rng.gen_bool(0.5);
            let request = build_request(definition, &mut rng, withhold_override);

            match handle.start_run(request) {
                Ok(run) => {
                    report.started += 1;
                    if rng.gen_bool(config.cancel_rate) {
                        let _ = handle.stop_run(run.run_id);
                    }
                    in_flight.push((run.run_id, definition.clone()));
                }
                Err(OrchestratorError::Conflict(_)) => {
                    report.conflicts += 1;
                }
                Err(OrchestratorError::SafetyBlocked(_)) => {
                    report.safety_blocked += 1;
                    if !withhold_override {
                        report.violations.push(format!(
                            "safety block for {} despite override",
                            definition.id
                        ));
                    }
                }
                Err(e) => {
                    report
                        .violations
                        .push(format!("unexpected start error for {}: {e}", definition.id));
                }
            }
        }

        for (run_id, definition) in in_flight {
            match handle
                .wait_for_completion(run_id, Duration::from_secs(30))
                .await
            {
                Ok(run) => check_terminal_run(&handle, &run, &definition, &mut report),
                Err(e) => report
                    .violations
                    .push(format!("run {run_id} never finalized: {e}")),
            }
        }
    }

    if handle.transition_log().verify_integrity().is_err() {
        report
            .violations
            .push("transition log failed integrity verification".to_string());
    }

    report
}

fn build_request(
    definition: &Definition,
    rng: &mut StdRng,
    withhold_override: bool,
) -> StartRequest {
    let mut request = StartRequest::new(definition.id.0.as_str());
    if !withhold_override {
        request = request.override_safety();
    }
    if rng.gen_bool(0.3) {
        request = request.dry_run();
    }
    // Parameters without defaults need a value for the start to be accepted.
    for spec in &definition.parameters {
        if spec.default.is_none() {
            if let Some(options) = &spec.options {
                if let Some(first) = options.first() {
                    request = request
                        .parameter(&spec.name, serde_json::Value::String(first.clone()));
                }
            }
        }
    }
    request
}

fn check_terminal_run(
    handle: &OrchestratorHandle,
    run: &crate::types::Run,
    definition: &Definition,
    report: &mut HarnessReport,
) {
    match run.state {
        RunState::Completed => report.completed += 1,
        RunState::Failed => report.failed += 1,
        RunState::Cancelled => report.cancelled += 1,
        RunState::TimedOut => report.timed_out += 1,
        other => {
            report
                .violations
                .push(format!("run {} finalized in state {other:?}", run.run_id));
            return;
        }
    }

    if run.completed_at.is_none() {
        report
            .violations
            .push(format!("terminal run {} has no completed_at", run.run_id));
    }

    let accounted = run.steps_completed.len() + run.steps_remaining.len();
    if accounted != definition.steps.len() {
        report.violations.push(format!(
            "run {} accounts for {accounted} of {} steps",
            run.run_id,
            definition.steps.len()
        ));
    }

    match run.state {
        RunState::Completed => {
            if !run.steps_remaining.is_empty() {
                report.violations.push(format!(
                    "completed run {} left {} steps remaining",
                    run.run_id,
                    run.steps_remaining.len()
                ));
            }
            if run.metrics.recovery_time_ms.is_none() {
                report
                    .violations
                    .push(format!("completed run {} has no recovery time", run.run_id));
            }
        }
        RunState::Failed => {
            if run.failure.is_none() {
                report
                    .violations
                    .push(format!("failed run {} has no failure record", run.run_id));
            }
        }
        _ => {}
    }

    let matches = handle.query_history(&HistoryFilter {
        definition_id: Some(run.definition_id.clone()),
        limit: usize::MAX,
        ..Default::default()
    });
    let occurrences = matches.iter().filter(|r| r.run_id == run.run_id).count();
    if occurrences != 1 {
        report.violations.push(format!(
            "run {} appears {occurrences} times in history",
            run.run_id
        ));
    }
}
