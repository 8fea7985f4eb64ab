use gameday::history::{HistoryFilter, HistoryStore};
use gameday::types::{Run, RunId, RunMetrics, RunState};
use std::collections::BTreeMap;

fn terminal_run(definition_id: &str, state: RunState, started_at: u64) -> Run {
    Run {
        run_id: RunId::new(),
        definition_id: definition_id.into(),
        effective_parameters: BTreeMap::new(),
        state,
        dry_run: false,
        started_at,
        completed_at: Some(started_at + 100),
        steps_completed: Vec::new(),
        steps_remaining: Vec::new(),
        failure: None,
        metrics: RunMetrics::default(),
    }
}

#[test]
fn test_query_is_most_recent_first() {
    let store = HistoryStore::new(100);
    let a = terminal_run("latency", RunState::Completed, 1_000);
    let b = terminal_run("latency", RunState::Completed, 2_000);
    store.append(a.clone());
    store.append(b.clone());

    let runs = store.query(&HistoryFilter::default());
    assert_eq!(runs.len(), 2);
    assert_eq!(runs[0].run_id, b.run_id);
    assert_eq!(runs[1].run_id, a.run_id);
}

#[test]
fn test_filters_compose() {
    let store = HistoryStore::new(100);
    store.append(terminal_run("latency", RunState::Completed, 1_000));
    store.append(terminal_run("latency", RunState::Failed, 2_000));
    store.append(terminal_run("cpu_stress", RunState::Completed, 3_000));

    let by_definition = store.query(&HistoryFilter {
        definition_id: Some("latency".into()),
        ..Default::default()
    });
    assert_eq!(by_definition.len(), 2);

    let failed_latency = store.query(&HistoryFilter {
        definition_id: Some("latency".into()),
        status: Some(RunState::Failed),
        ..Default::default()
    });
    assert_eq!(failed_latency.len(), 1);

    let recent = store.query(&HistoryFilter {
        since: Some(2_500),
        ..Default::default()
    });
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].definition_id, "cpu_stress".into());
}

#[test]
fn test_limit_truncates() {
    let store = HistoryStore::new(100);
    for i in 0..10 {
        store.append(terminal_run("latency", RunState::Completed, i * 100));
    }

    let limited = store.query(&HistoryFilter {
        limit: 3,
        ..Default::default()
    });
    assert_eq!(limited.len(), 3);
    // The three most recent
    assert_eq!(limited[0].started_at, 900);
    assert_eq!(limited[2].started_at, 700);
}

#[test]
fn test_retention_evicts_oldest() {
    let store = HistoryStore::new(3);
    let mut ids = Vec::new();
    for i in 0..5 {
        let run = terminal_run("latency", RunState::Completed, i * 100);
        ids.push(run.run_id);
        store.append(run);
    }

    assert_eq!(store.len(), 3);
    assert!(store.find(ids[0]).is_none());
    assert!(store.find(ids[1]).is_none());
    assert!(store.find(ids[4]).is_some());
}

#[test]
fn test_find_by_run_id() {
    let store = HistoryStore::new(100);
    let run = terminal_run("dns_failure", RunState::Cancelled, 1_000);
    store.append(run.clone());

    let found = store.find(run.run_id).unwrap();
    assert_eq!(found.state, RunState::Cancelled);
    assert!(store.find(RunId::new()).is_none());
}
