use clap::{value_parser, Arg, ArgAction, Command};
use gameday::api::{RunControl, StartRequest};
use gameday::catalog::{Catalog, DefinitionKind};
use gameday::clock::SystemClock;
use gameday::error::ApiError;
use gameday::executor::{ExecutorRegistry, SimExecutor};
use gameday::handle::{OrchestratorConfig, OrchestratorHandle};
use gameday::logging::TracingSink;
use gameday::test_harness::{run_harness, HarnessConfig};
use gameday::types::RunState;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Command::new("gameday")
        .version("0.1.0")
        .about("Disaster-recovery simulation & chaos-experiment orchestrator")
        .arg_required_else_help(true)
        .subcommand(Command::new("catalog").about("List scenario and experiment definitions"))
        .subcommand(
            Command::new("run")
                .about("Run one scenario or experiment to completion")
                .arg(
                    Arg::new("definition")
                        .required(true)
                        .help("Definition id, e.g. database_failover"),
                )
                .arg(
                    Arg::new("param")
                        .long("param")
                        .action(ArgAction::Append)
                        .value_name("NAME=VALUE")
                        .help("Override a declared parameter"),
                )
                .arg(
                    Arg::new("dry-run")
                        .long("dry-run")
                        .action(ArgAction::SetTrue)
                        .help("Acknowledge steps without executing anything"),
                )
                .arg(
                    Arg::new("override-safety")
                        .long("override-safety")
                        .action(ArgAction::SetTrue)
                        .help("Allow experiments marked unsafe"),
                )
                .arg(
                    Arg::new("enable-chaos")
                        .long("enable-chaos")
                        .action(ArgAction::SetTrue)
                        .help("Enable chaos experiments (CHAOS_ENABLED=true does the same)"),
                )
                .arg(
                    Arg::new("step-delay-ms")
                        .long("step-delay-ms")
                        .default_value("150")
                        .value_parser(value_parser!(u64))
                        .help("Simulated duration of each step"),
                )
                .arg(
                    Arg::new("timeout-secs")
                        .long("timeout-secs")
                        .default_value("300")
                        .value_parser(value_parser!(u64))
                        .help("Per-run deadline"),
                ),
        )
        .subcommand(
            Command::new("simulate")
                .about("Run the randomized invariant harness")
                .arg(
                    Arg::new("runs")
                        .long("runs")
                        .default_value("100")
                        .value_parser(value_parser!(u64))
                        .help("Number of runs to drive"),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .default_value("42")
                        .value_parser(value_parser!(u64))
                        .help("Random seed"),
                )
                .arg(
                    Arg::new("failure-rate")
                        .long("failure-rate")
                        .default_value("0.15")
                        .value_parser(value_parser!(f64))
                        .help("Per-step injected failure probability"),
                ),
        );

    match cli.get_matches().subcommand() {
        Some(("catalog", _)) => {
            for def in Catalog::builtin().list() {
                let kind = match def.kind {
                    DefinitionKind::Recovery { automated: true } => "recovery, automated",
                    DefinitionKind::Recovery { automated: false } => "recovery, manual",
                    DefinitionKind::Chaos { safe_to_run: true } => "chaos, safe",
                    DefinitionKind::Chaos { safe_to_run: false } => "chaos, unsafe",
                };
                println!(
                    "{:<20} {:<28} {:<8} {:>2} steps  [{kind}]",
                    def.id.to_string(),
                    def.name,
                    format!("{:?}", def.severity),
                    def.steps.len(),
                );
            }
        }
        Some(("run", args)) => {
            let definition_id = args.get_one::<String>("definition").unwrap();
            let chaos_enabled = args.get_flag("enable-chaos")
                || std::env::var("CHAOS_ENABLED").map(|v| v == "true").unwrap_or(false);
            let step_delay = *args.get_one::<u64>("step-delay-ms").unwrap();
            let timeout = Duration::from_secs(*args.get_one::<u64>("timeout-secs").unwrap());

            let registry = ExecutorRegistry::new(Arc::new(SimExecutor::new(
                Duration::from_millis(step_delay),
            )));
            let handle = OrchestratorHandle::with_collaborators(
                OrchestratorConfig {
                    chaos_enabled,
                    max_run_duration: Some(timeout),
                    ..Default::default()
                },
                registry,
                Arc::new(SystemClock),
                Some(Arc::new(TracingSink)),
            );

            let mut request = StartRequest::new(definition_id.as_str());
            if args.get_flag("dry-run") {
                request = request.dry_run();
            }
            if args.get_flag("override-safety") {
                request = request.override_safety();
            }
            for raw in args.get_many::<String>("param").unwrap_or_default() {
                let (name, value) = raw
                    .split_once('=')
                    .ok_or_else(|| anyhow::anyhow!("--param expects NAME=VALUE, got `{raw}`"))?;
                let value = serde_json::from_str(value)
                    .unwrap_or_else(|_| serde_json::Value::String(value.to_string()));
                request = request.parameter(name, value);
            }

            let run = match handle.start_run(request) {
                Ok(run) => run,
                Err(e) => {
                    let api = ApiError::from(e);
                    eprintln!("start rejected: {api}");
                    std::process::exit(1);
                }
            };
            println!("run {} started for `{}`", run.run_id, run.definition_id);

            let finished = handle
                .wait_for_completion(run.run_id, timeout + Duration::from_secs(5))
                .await?;

            println!("state: {:?}", finished.state);
            for step in &finished.steps_completed {
                println!("  {:<32} {:>6} ms", step.step_id.to_string(), step.duration_ms);
            }
            if let Some(failure) = &finished.failure {
                println!(
                    "  {:<32} FAILED{}",
                    failure.step_id.to_string(),
                    failure
                        .detail
                        .as_deref()
                        .map(|d| format!(": {d}"))
                        .unwrap_or_default()
                );
            }
            for step in finished.skipped_steps() {
                println!("  {:<32} skipped", step.to_string());
            }
            if let Some(recovery) = finished.metrics.recovery_time_ms {
                println!(
                    "metrics: detection {:?} ms, failover {:?} ms, recovery {recovery} ms",
                    finished.metrics.detection_time_ms,
                    finished.metrics.failover_time_ms,
                );
            }

            std::process::exit(if finished.state == RunState::Completed { 0 } else { 1 });
        }
        Some(("simulate", args)) => {
            let config = HarnessConfig {
                seed: *args.get_one::<u64>("seed").unwrap(),
                total_runs: *args.get_one::<u64>("runs").unwrap(),
                failure_rate: *args.get_one::<f64>("failure-rate").unwrap(),
                ..Default::default()
            };

            println!("Running orchestrator harness...");
            println!("Runs: {}", config.total_runs);
            println!("Seed: {}", config.seed);
            println!();

            let report = run_harness(config).await;
            println!("{}", report.generate_text());

            std::process::exit(if report.passed() { 0 } else { 1 });
        }
        _ => {}
    }

    Ok(())
}
