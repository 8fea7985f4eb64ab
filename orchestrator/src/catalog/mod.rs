//! Immutable catalog of DR scenarios and chaos experiments.
//!
//! Definitions are loaded once at process start and never mutated by running
//! instances. Each definition declares typed parameters with defaults and
//! constraints, and an ordered list of abstract step identifiers that the
//! executor registry knows how to dispatch.

use crate::error::OrchestratorError;
use crate::types::{Category, DefinitionId, ParamValue, Severity, StepId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamType {
    Integer,
    Float,
    Text,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    pub kind: ParamType,
    pub default: Option<ParamValue>,
    /// Inclusive numeric upper bound.
    pub max: Option<f64>,
    /// Closed value set for `Text` parameters.
    pub options: Option<Vec<String>>,
}

impl ParameterSpec {
    pub fn integer(name: &str, default: i64) -> Self {
        Self {
            name: name.to_string(),
            kind: ParamType::Integer,
            default: Some(ParamValue::Integer(default)),
            max: None,
            options: None,
        }
    }

    pub fn float(name: &str, default: f64) -> Self {
        Self {
            name: name.to_string(),
            kind: ParamType::Float,
            default: Some(ParamValue::Float(default)),
            max: None,
            options: None,
        }
    }

    /// Text parameter restricted to a closed option set, with no default.
    pub fn text_options(name: &str, options: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            kind: ParamType::Text,
            default: None,
            max: None,
            options: Some(options.iter().map(|s| s.to_string()).collect()),
        }
    }

    pub fn with_max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }
}

/// What kind of definition this is, with the kind-specific flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DefinitionKind {
    /// A DR failure-mode scenario.
    Recovery { automated: bool },
    /// A chaos-engineering perturbation.
    Chaos { safe_to_run: bool },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Definition {
    pub id: DefinitionId,
    pub name: String,
    pub description: String,
    pub category: Category,
    pub severity: Severity,
    pub impact: String,
    pub parameters: Vec<ParameterSpec>,
    pub steps: Vec<StepId>,
    pub kind: DefinitionKind,
}

impl Definition {
    pub fn is_chaos(&self) -> bool {
        matches!(self.kind, DefinitionKind::Chaos { .. })
    }

    /// Recovery scenarios are always safe; chaos experiments carry a flag.
    pub fn safe_to_run(&self) -> bool {
        match self.kind {
            DefinitionKind::Recovery { .. } => true,
            DefinitionKind::Chaos { safe_to_run } => safe_to_run,
        }
    }

    /// Merge user-supplied values over the declared defaults.
    ///
    /// A supplied value wins iff its type matches and it satisfies the
    /// declared `max`/`options` constraint; anything else is rejected. A
    /// parameter with neither a supplied value nor a default is rejected,
    /// as is a supplied name the definition does not declare.
    pub fn resolve_parameters(
        &self,
        user: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<BTreeMap<String, ParamValue>, OrchestratorError> {
        for name in user.keys() {
            if !self.parameters.iter().any(|p| &p.name == name) {
                return Err(OrchestratorError::InvalidParameter {
                    name: name.clone(),
                    reason: format!("not declared by `{}`", self.id),
                });
            }
        }

        let mut resolved = BTreeMap::new();
        for spec in &self.parameters {
            let value = match user.get(&spec.name) {
                Some(raw) => coerce_and_check(spec, raw)?,
                None => spec.default.clone().ok_or_else(|| {
                    OrchestratorError::InvalidParameter {
                        name: spec.name.clone(),
                        reason: "required, no default declared".to_string(),
                    }
                })?,
            };
            resolved.insert(spec.name.clone(), value);
        }
        Ok(resolved)
    }
}

fn coerce_and_check(
    spec: &ParameterSpec,
    raw: &serde_json::Value,
) -> Result<ParamValue, OrchestratorError> {
    let invalid = |reason: String| OrchestratorError::InvalidParameter {
        name: spec.name.clone(),
        reason,
    };

    let value = match spec.kind {
        ParamType::Integer => ParamValue::Integer(
            raw.as_i64()
                .ok_or_else(|| invalid(format!("expected integer, got {raw}")))?,
        ),
        ParamType::Float => ParamValue::Float(
            raw.as_f64()
                .ok_or_else(|| invalid(format!("expected number, got {raw}")))?,
        ),
        ParamType::Text => ParamValue::Text(
            raw.as_str()
                .ok_or_else(|| invalid(format!("expected string, got {raw}")))?
                .to_string(),
        ),
    };

    if let Some(max) = spec.max {
        let numeric = match value {
            ParamValue::Integer(v) => v as f64,
            ParamValue::Float(v) => v,
            ParamValue::Text(_) => f64::NAN,
        };
        if !(numeric <= max) {
            return Err(invalid(format!("{numeric} exceeds max {max}")));
        }
    }

    if let Some(options) = &spec.options {
        if let ParamValue::Text(ref v) = value {
            if !options.iter().any(|o| o == v) {
                return Err(invalid(format!("must be one of {options:?}")));
            }
        }
    }

    Ok(value)
}

/// Read-only definition registry, ordered by insertion.
#[derive(Debug, Clone)]
pub struct Catalog {
    entries: Vec<Definition>,
    index: HashMap<DefinitionId, usize>,
}

impl Catalog {
    pub fn new(entries: Vec<Definition>) -> Self {
        let mut index = HashMap::new();
        for (i, def) in entries.iter().enumerate() {
            let prev = index.insert(def.id.clone(), i);
            debug_assert!(prev.is_none(), "duplicate definition id {}", def.id);
        }
        Self { entries, index }
    }

    pub fn get(&self, id: &DefinitionId) -> Option<&Definition> {
        self.index.get(id).map(|&i| &self.entries[i])
    }

    pub fn list(&self) -> &[Definition] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The built-in scenario and experiment set.
    pub fn builtin() -> Self {
        Self::new(builtin_definitions())
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn recovery(
    id: &str,
    name: &str,
    description: &str,
    category: Category,
    severity: Severity,
    impact: &str,
    automated: bool,
    parameters: Vec<ParameterSpec>,
    steps: &[&str],
) -> Definition {
    Definition {
        id: id.into(),
        name: name.to_string(),
        description: description.to_string(),
        category,
        severity,
        impact: impact.to_string(),
        parameters,
        steps: steps.iter().map(|&s| s.into()).collect(),
        kind: DefinitionKind::Recovery { automated },
    }
}

fn chaos(
    id: &str,
    name: &str,
    description: &str,
    category: Category,
    severity: Severity,
    impact: &str,
    safe_to_run: bool,
    parameters: Vec<ParameterSpec>,
    steps: &[&str],
) -> Definition {
    Definition {
        id: id.into(),
        name: name.to_string(),
        description: description.to_string(),
        category,
        severity,
        impact: impact.to_string(),
        parameters,
        steps: steps.iter().map(|&s| s.into()).collect(),
        kind: DefinitionKind::Chaos { safe_to_run },
    }
}

fn builtin_definitions() -> Vec<Definition> {
    vec![
        // Disaster-recovery scenarios
        recovery(
            "database_failover",
            "Database Failover",
            "Simulate primary database failure and promote the read replica",
            Category::Database,
            Severity::High,
            "Database connections will be briefly interrupted",
            true,
            vec![],
            &[
                "stop-primary-db",
                "promote-read-replica",
                "update-connection-strings",
                "verify-data-integrity",
                "resume-operations",
            ],
        ),
        recovery(
            "region_failover",
            "Full Region Failover",
            "Simulate complete region outage and failover to the DR region",
            Category::Region,
            Severity::Critical,
            "Brief service interruption during DNS propagation",
            false,
            vec![],
            &[
                "detect-region-failure",
                "activate-dr-infrastructure",
                "promote-database-replica",
                "update-health-checks",
                "shift-traffic",
                "verify-services",
                "notify-stakeholders",
            ],
        ),
        recovery(
            "instance_failure",
            "Compute Instance Failure",
            "Simulate single compute instance termination",
            Category::Compute,
            Severity::Medium,
            "Reduced capacity during replacement",
            true,
            vec![],
            &[
                "terminate-target-instance",
                "launch-replacement",
                "validate-health-check",
                "rebalance-traffic",
            ],
        ),
        recovery(
            "cache_failure",
            "Cache Layer Failure",
            "Simulate cache cluster failure",
            Category::Cache,
            Severity::Medium,
            "Increased database load and slower response times",
            true,
            vec![],
            &[
                "terminate-cache-nodes",
                "fall-back-to-database",
                "provision-cache-nodes",
                "warm-cache",
            ],
        ),
        recovery(
            "network_partition",
            "Network Partition",
            "Simulate network isolation between services",
            Category::Network,
            Severity::High,
            "Service-to-service communication disrupted",
            false,
            vec![],
            &[
                "inject-network-latency",
                "block-interservice-traffic",
                "monitor-circuit-breakers",
                "verify-degradation",
                "restore-connectivity",
                "validate-recovery",
            ],
        ),
        recovery(
            "data_corruption",
            "Data Corruption Recovery",
            "Simulate data corruption and point-in-time recovery",
            Category::Data,
            Severity::Critical,
            "Service downtime during recovery",
            false,
            vec![],
            &[
                "detect-corruption",
                "stop-application-writes",
                "identify-corruption-timestamp",
                "start-point-in-time-recovery",
                "verify-data-integrity",
                "resume-application",
            ],
        ),
        recovery(
            "dns_failure",
            "DNS Resolution Failure",
            "Simulate DNS resolution issues",
            Category::Dns,
            Severity::High,
            "Users unable to reach the application",
            true,
            vec![],
            &[
                "simulate-dns-failure",
                "detect-via-health-checks",
                "fail-over-to-backup-dns",
                "verify-resolution",
            ],
        ),
        recovery(
            "load_spike",
            "Traffic Spike",
            "Simulate a sudden traffic increase",
            Category::Traffic,
            Severity::Medium,
            "Potential latency increase during scale-out",
            true,
            vec![ParameterSpec::integer("traffic_multiplier", 10).with_max(20.0)],
            &[
                "generate-synthetic-load",
                "monitor-autoscaling",
                "verify-capacity-increase",
                "check-response-times",
                "reduce-load",
                "verify-scale-in",
            ],
        ),
        // Chaos experiments
        chaos(
            "latency",
            "Latency Injection",
            "Add artificial latency to responses",
            Category::Network,
            Severity::Low,
            "Increased response times",
            true,
            vec![
                ParameterSpec::integer("delay_ms", 200).with_max(5000.0),
                ParameterSpec::float("probability", 0.1).with_max(1.0),
            ],
            &["inject-latency", "observe-response-times", "remove-latency"],
        ),
        chaos(
            "error_injection",
            "Error Injection",
            "Randomly return server errors",
            Category::Application,
            Severity::Medium,
            "Some requests will fail",
            true,
            vec![
                ParameterSpec::float("error_rate", 0.05).with_max(0.5),
                ParameterSpec::integer("error_code", 500),
            ],
            &[
                "enable-error-injection",
                "observe-error-rates",
                "disable-error-injection",
            ],
        ),
        chaos(
            "cpu_stress",
            "CPU Stress",
            "Consume CPU resources",
            Category::Resource,
            Severity::High,
            "Reduced processing capacity",
            false,
            vec![
                ParameterSpec::integer("load_percent", 80).with_max(95.0),
                ParameterSpec::integer("duration_seconds", 60).with_max(300.0),
            ],
            &["apply-cpu-stress", "monitor-capacity", "release-cpu-stress"],
        ),
        chaos(
            "memory_pressure",
            "Memory Pressure",
            "Allocate large amounts of memory",
            Category::Resource,
            Severity::High,
            "Potential out-of-memory conditions",
            false,
            vec![
                ParameterSpec::integer("memory_mb", 256).with_max(1024.0),
                ParameterSpec::integer("duration_seconds", 60).with_max(300.0),
            ],
            &["allocate-memory", "monitor-oom-risk", "release-memory"],
        ),
        chaos(
            "database_slow",
            "Database Slowdown",
            "Simulate slow database queries",
            Category::Dependency,
            Severity::Medium,
            "Slower page loads",
            true,
            vec![
                ParameterSpec::integer("delay_ms", 1000).with_max(10000.0),
                ParameterSpec::float("probability", 0.2).with_max(1.0),
            ],
            &[
                "inject-query-delay",
                "observe-query-latency",
                "remove-query-delay",
            ],
        ),
        chaos(
            "cache_miss",
            "Cache Miss",
            "Force cache misses",
            Category::Dependency,
            Severity::Low,
            "Increased database load",
            true,
            vec![ParameterSpec::float("miss_rate", 0.5).with_max(1.0)],
            &[
                "force-cache-misses",
                "observe-database-load",
                "restore-cache-hits",
            ],
        ),
        chaos(
            "service_partition",
            "Service Partition",
            "Block traffic to a specific dependency",
            Category::Network,
            Severity::High,
            "Service connectivity issues",
            false,
            vec![
                ParameterSpec::text_options(
                    "target_service",
                    &["database", "cache", "external_api"],
                ),
                ParameterSpec::integer("duration_seconds", 30).with_max(120.0),
            ],
            &[
                "block-service-traffic",
                "observe-fallback-behavior",
                "restore-service-traffic",
            ],
        ),
        chaos(
            "disk_full",
            "Disk Full",
            "Simulate disk space exhaustion",
            Category::Resource,
            Severity::Critical,
            "Write operations will fail",
            false,
            vec![ParameterSpec::integer("fill_percent", 95).with_max(99.0)],
            &["fill-disk", "observe-write-failures", "reclaim-disk"],
        ),
    ]
}
