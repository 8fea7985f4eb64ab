use gameday::test_harness::{run_harness, HarnessConfig};

#[tokio::test]
async fn test_harness_holds_invariants_under_load() {
    let config = HarnessConfig {
        seed: 7,
        total_runs: 48,
        step_delay_ms: 1,
        ..Default::default()
    };

    let report = run_harness(config).await;
    assert!(report.passed(), "{}", report.generate_text());

    let finalized = report.completed + report.failed + report.cancelled + report.timed_out;
    assert_eq!(finalized, report.started);
    assert!(report.completed > 0);
}

#[tokio::test]
async fn test_harness_with_heavy_failure_injection() {
    let config = HarnessConfig {
        seed: 1234,
        total_runs: 32,
        failure_rate: 0.6,
        step_delay_ms: 1,
        ..Default::default()
    };

    let report = run_harness(config).await;
    assert!(report.passed(), "{}", report.generate_text());
    assert!(report.failed > 0);
}
