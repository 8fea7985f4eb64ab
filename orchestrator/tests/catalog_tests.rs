use gameday::catalog::{Catalog, DefinitionKind, ParamType};
use gameday::error::OrchestratorError;
use gameday::types::ParamValue;
use std::collections::HashSet;

#[test]
fn test_builtin_catalog_shape() {
    let catalog = Catalog::builtin();
    assert_eq!(catalog.len(), 16);

    let ids: HashSet<_> = catalog.list().iter().map(|d| d.id.clone()).collect();
    assert_eq!(ids.len(), catalog.len(), "definition ids must be unique");

    for def in catalog.list() {
        assert!(!def.steps.is_empty(), "{} has no steps", def.id);
        assert!(!def.name.is_empty());
    }

    // Recovery scenarios first, in a stable order
    assert_eq!(catalog.list()[0].id, "database_failover".into());
    assert!(catalog.get(&"region_failover".into()).is_some());
    assert!(catalog.get(&"warp_core_breach".into()).is_none());
}

#[test]
fn test_kind_flags_carry_over() {
    let catalog = Catalog::builtin();

    let db = catalog.get(&"database_failover".into()).unwrap();
    assert!(matches!(db.kind, DefinitionKind::Recovery { automated: true }));
    assert!(!db.is_chaos());
    assert!(db.safe_to_run());

    let region = catalog.get(&"region_failover".into()).unwrap();
    assert!(matches!(
        region.kind,
        DefinitionKind::Recovery { automated: false }
    ));

    let latency = catalog.get(&"latency".into()).unwrap();
    assert!(latency.is_chaos());
    assert!(latency.safe_to_run());

    let cpu = catalog.get(&"cpu_stress".into()).unwrap();
    assert!(cpu.is_chaos());
    assert!(!cpu.safe_to_run());
}

#[test]
fn test_instance_failure_has_four_steps() {
    let catalog = Catalog::builtin();
    let def = catalog.get(&"instance_failure".into()).unwrap();
    assert_eq!(def.steps.len(), 4);
}

#[test]
fn test_defaults_apply_when_nothing_supplied() {
    let catalog = Catalog::builtin();
    let latency = catalog.get(&"latency".into()).unwrap();

    let resolved = latency.resolve_parameters(&serde_json::Map::new()).unwrap();
    assert_eq!(resolved.get("delay_ms"), Some(&ParamValue::Integer(200)));
    assert_eq!(resolved.get("probability"), Some(&ParamValue::Float(0.1)));
}

#[test]
fn test_max_bound_is_inclusive() {
    let catalog = Catalog::builtin();
    let latency = catalog.get(&"latency".into()).unwrap();

    let mut at_max = serde_json::Map::new();
    at_max.insert("delay_ms".to_string(), serde_json::json!(5000));
    assert!(latency.resolve_parameters(&at_max).is_ok());

    let mut over = serde_json::Map::new();
    over.insert("delay_ms".to_string(), serde_json::json!(5001));
    assert!(matches!(
        latency.resolve_parameters(&over),
        Err(OrchestratorError::InvalidParameter { .. })
    ));
}

#[test]
fn test_float_parameter_accepts_integer_literal() {
    let catalog = Catalog::builtin();
    let latency = catalog.get(&"latency".into()).unwrap();

    let mut user = serde_json::Map::new();
    user.insert("probability".to_string(), serde_json::json!(1));
    let resolved = latency.resolve_parameters(&user).unwrap();
    assert_eq!(resolved.get("probability"), Some(&ParamValue::Float(1.0)));
}

#[test]
fn test_integer_parameter_rejects_float_literal() {
    let catalog = Catalog::builtin();
    let latency = catalog.get(&"latency".into()).unwrap();

    let mut user = serde_json::Map::new();
    user.insert("delay_ms".to_string(), serde_json::json!(200.5));
    assert!(latency.resolve_parameters(&user).is_err());
}

#[test]
fn test_parameter_constraint_declarations() {
    let catalog = Catalog::builtin();

    let partition = catalog.get(&"service_partition".into()).unwrap();
    let target = partition
        .parameters
        .iter()
        .find(|p| p.name == "target_service")
        .unwrap();
    assert_eq!(target.kind, ParamType::Text);
    assert!(target.default.is_none());
    assert_eq!(
        target.options.as_deref(),
        Some(&["database".to_string(), "cache".to_string(), "external_api".to_string()][..])
    );

    let error_injection = catalog.get(&"error_injection".into()).unwrap();
    let code = error_injection
        .parameters
        .iter()
        .find(|p| p.name == "error_code")
        .unwrap();
    assert!(code.max.is_none(), "error_code carries no upper bound");
}
