use gameday::api::{RunControl, StartRequest};
use gameday::error::{ApiError, ErrorKind, OrchestratorError};
use gameday::handle::{OrchestratorConfig, OrchestratorHandle};

fn chaos_handle() -> OrchestratorHandle {
    OrchestratorHandle::with_config(OrchestratorConfig {
        chaos_enabled: true,
        ..Default::default()
    })
}

#[tokio::test]
async fn test_unknown_definition_creates_nothing() {
    let handle = OrchestratorHandle::new();

    let result = handle.start_run(StartRequest::new("solar_flare"));
    assert!(matches!(
        &result,
        Err(OrchestratorError::UnknownDefinition(_))
    ));
    assert_eq!(result.unwrap_err().kind(), ErrorKind::NotFound);
    assert!(handle.list_active().is_empty());
}

#[tokio::test]
async fn test_parameter_above_max_is_rejected() {
    let handle = chaos_handle();

    let result = handle.start_run(
        StartRequest::new("latency")
            .dry_run()
            .parameter("delay_ms", serde_json::json!(5001)),
    );
    assert!(matches!(
        &result,
        Err(OrchestratorError::InvalidParameter { .. })
    ));
    assert!(handle.list_active().is_empty());
}

#[tokio::test]
async fn test_parameter_at_max_is_accepted() {
    let handle = chaos_handle();

    let result = handle.start_run(
        StartRequest::new("latency")
            .dry_run()
            .parameter("delay_ms", serde_json::json!(5000)),
    );
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_parameter_type_mismatch_is_rejected() {
    let handle = chaos_handle();

    let result = handle.start_run(
        StartRequest::new("latency")
            .dry_run()
            .parameter("delay_ms", serde_json::json!("fast")),
    );
    match result {
        Err(OrchestratorError::InvalidParameter { name, .. }) => assert_eq!(name, "delay_ms"),
        other => panic!("expected InvalidParameter, got {other:?}"),
    }
}

#[tokio::test]
async fn test_undeclared_parameter_is_rejected() {
    let handle = chaos_handle();

    let result = handle.start_run(
        StartRequest::new("latency")
            .dry_run()
            .parameter("blast_radius", serde_json::json!(3)),
    );
    assert!(matches!(
        result,
        Err(OrchestratorError::InvalidParameter { .. })
    ));
}

#[tokio::test]
async fn test_missing_required_parameter_is_rejected() {
    let handle = chaos_handle();

    // target_service declares options but no default
    let result = handle.start_run(
        StartRequest::new("service_partition")
            .dry_run()
            .override_safety(),
    );
    match result {
        Err(OrchestratorError::InvalidParameter { name, .. }) => {
            assert_eq!(name, "target_service");
        }
        other => panic!("expected InvalidParameter, got {other:?}"),
    }
}

#[tokio::test]
async fn test_option_outside_declared_set_is_rejected() {
    let handle = chaos_handle();

    let result = handle.start_run(
        StartRequest::new("service_partition")
            .dry_run()
            .override_safety()
            .parameter("target_service", serde_json::json!("message_queue")),
    );
    assert!(matches!(
        result,
        Err(OrchestratorError::InvalidParameter { .. })
    ));

    let accepted = handle.start_run(
        StartRequest::new("service_partition")
            .dry_run()
            .override_safety()
            .parameter("target_service", serde_json::json!("cache")),
    );
    assert!(accepted.is_ok());
}

#[test]
fn test_errors_map_to_wire_kinds() {
    let cases = [
        (
            OrchestratorError::UnknownDefinition("x".into()),
            ErrorKind::NotFound,
        ),
        (
            OrchestratorError::InvalidParameter {
                name: "delay_ms".to_string(),
                reason: "too big".to_string(),
            },
            ErrorKind::InvalidParameter,
        ),
        (
            OrchestratorError::SafetyBlocked("cpu_stress".into()),
            ErrorKind::SafetyBlocked,
        ),
        (OrchestratorError::ChaosDisabled, ErrorKind::ChaosDisabled),
        (
            OrchestratorError::Conflict("latency".into()),
            ErrorKind::Conflict,
        ),
    ];

    for (error, kind) in cases {
        let api = ApiError::from(error);
        assert_eq!(api.kind, kind);
        assert!(!api.message.is_empty());
    }
}
