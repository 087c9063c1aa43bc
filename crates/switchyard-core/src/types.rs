//! Domain types shared by every switchyard crate.
//!
//! `ContainerSpec` is the user-declared desired state of one container.
//! `DeploymentRecord` is what the orchestrator remembers about it between
//! runs. Both are JSON-serializable so the state store can persist them.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ── Desired state ──────────────────────────────────────────────────

/// Which compute backend serves a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendType {
    /// Managed function-execution service.
    Function,
    /// Managed container-orchestration service.
    Orchestrated,
}

impl BackendType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendType::Function => "function",
            BackendType::Orchestrated => "orchestrated",
        }
    }

    /// The other backend.
    pub fn opposite(&self) -> Self {
        match self {
            BackendType::Function => BackendType::Orchestrated,
            BackendType::Orchestrated => BackendType::Function,
        }
    }
}

impl fmt::Display for BackendType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User-declared specification of one container. Immutable for a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContainerSpec {
    /// Container name, the key of its `[containers.<name>]` block.
    #[serde(default)]
    pub name: String,
    /// Source directory, relative to the project root.
    pub src: String,
    pub compute: ComputeConfig,
    pub routing: RoutingConfig,
    /// Environment variables handed to the backend.
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
    /// Custom access policy document for the container's role.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_policy: Option<serde_json::Value>,
}

/// Compute settings for a container.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ComputeConfig {
    #[serde(rename = "type")]
    pub backend: BackendType,
    /// CPU units (orchestrated backend).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<u32>,
    /// Memory in MiB.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<u32>,
    /// Invocation timeout in seconds (function backend).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u32>,
    /// Attach the backend to the project's private network.
    #[serde(default)]
    pub network_attached: bool,
    /// Scaling declarations (orchestrated backend).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scale: Vec<ScalingPolicySpec>,
}

/// Load-balancer routing settings for a container.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoutingConfig {
    /// URL path pattern, e.g. `/api/*`.
    pub path_pattern: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_check_path: Option<String>,
    /// Custom domain matched as a host header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

impl RoutingConfig {
    /// The configured health-check path, or one inferred from the path
    /// pattern. The boolean is true when the path was inferred.
    pub fn resolved_health_check_path(&self) -> (String, bool) {
        if let Some(path) = &self.health_check_path {
            return (path.clone(), false);
        }
        let prefix = self
            .path_pattern
            .split(['*', '?', '{', '}'])
            .next()
            .unwrap_or_default();
        let path = match prefix {
            "" | "/" => "/".to_string(),
            p => p.strip_suffix('/').unwrap_or(p).to_string(),
        };
        (path, true)
    }
}

/// Metric tracked by a target-tracking policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetMetric {
    Cpu,
    Memory,
    /// Load-balancer request count per target.
    LbRequestsPerTarget,
}

impl TargetMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetMetric::Cpu => "cpu",
            TargetMetric::Memory => "memory",
            TargetMetric::LbRequestsPerTarget => "lb-requests-per-target",
        }
    }
}

/// One step of a step-scaling policy.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepAdjustment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lower_bound: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upper_bound: Option<f64>,
    pub adjustment: i32,
}

/// A scaling declaration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScalingPolicySpec {
    Min {
        min: u32,
    },
    Max {
        max: u32,
    },
    Desired {
        desired: u32,
    },
    Target {
        target: TargetMetric,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        value: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        scale_in_cooldown: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        scale_out_cooldown: Option<u32>,
        /// `Some(false)` disables scale-in.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        scale_in: Option<bool>,
    },
    Step {
        metric: String,
        namespace: String,
        threshold: f64,
        comparison_operator: String,
        steps: Vec<StepAdjustment>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        adjustment_type: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cooldown: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        aggregation: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        period: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        evaluation_periods: Option<u32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        unit: Option<String>,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        dimensions: BTreeMap<String, String>,
    },
}

// ── Persisted state ────────────────────────────────────────────────

/// Built artifacts for both backends.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ArtifactRefs {
    pub repository: Option<String>,
    /// Image for the orchestrated backend.
    pub orchestrated_image: Option<String>,
    /// Image variant for the function backend.
    pub function_image: Option<String>,
    /// Source hash the images above were built from.
    pub built_from_hash: Option<String>,
}

impl ArtifactRefs {
    pub fn complete(&self) -> bool {
        self.orchestrated_image.is_some() && self.function_image.is_some()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FunctionResources {
    pub function: Option<String>,
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OrchestratedResources {
    pub task_template: Option<String>,
    pub service: Option<String>,
    pub log_destination: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RoleRefs {
    pub execution_role: Option<String>,
    pub task_role: Option<String>,
}

/// Priority tier of a routing rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityTier {
    /// Ranked below the active rule; exists without receiving traffic.
    Deprioritized,
    Production,
}

/// A load-balancer rule forwarding a path/host match to a target group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListenerRoutingRule {
    pub rule: Option<String>,
    pub listener: String,
    pub target_group: String,
    pub path_pattern: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host_header: Option<String>,
    pub tier: PriorityTier,
    /// Value of the forwarded-auth header the rule matches on.
    pub forward_token: String,
}

/// Routing-side resources for a container.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RoutingState {
    pub listener: Option<String>,
    pub function_target_group: Option<String>,
    pub orchestrated_target_group: Option<String>,
    pub rules: Vec<ListenerRoutingRule>,
    pub path_pattern: Option<String>,
    pub health_check_path: Option<String>,
    pub custom_domain: Option<String>,
}

impl RoutingState {
    pub fn target_group(&self, backend: BackendType) -> Option<&String> {
        match backend {
            BackendType::Function => self.function_target_group.as_ref(),
            BackendType::Orchestrated => self.orchestrated_target_group.as_ref(),
        }
    }

    pub fn set_target_group(&mut self, backend: BackendType, target_group: String) {
        match backend {
            BackendType::Function => self.function_target_group = Some(target_group),
            BackendType::Orchestrated => self.orchestrated_target_group = Some(target_group),
        }
    }

    /// The rule currently receiving production traffic.
    pub fn production_rule(&self) -> Option<&ListenerRoutingRule> {
        self.rules.iter().find(|r| r.tier == PriorityTier::Production)
    }

    /// Insert or replace the rule for `rule.target_group`. A production rule
    /// replaces any earlier production rule; there is only ever one.
    pub fn upsert_rule(&mut self, rule: ListenerRoutingRule) {
        if rule.tier == PriorityTier::Production {
            self.rules.retain(|r| r.tier != PriorityTier::Production);
        }
        self.rules.retain(|r| r.target_group != rule.target_group);
        self.rules.push(rule);
    }
}

/// What the orchestrator remembers about one container.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DeploymentRecord {
    /// Source hash of the last completed deployment.
    pub source_hash: Option<String>,
    /// Backend serving production traffic after the last completed deployment.
    pub backend: Option<BackendType>,
    pub artifacts: ArtifactRefs,
    pub function: FunctionResources,
    pub orchestrated: OrchestratedResources,
    pub roles: RoleRefs,
    pub routing: RoutingState,
    /// Unix timestamp (seconds) of the last completed deployment.
    pub time_last_deployed: Option<u64>,
    pub deployed_on_last_deployment: bool,
}

/// The persisted unit: the spec applied by the last completed deployment
/// (environment redacted) plus the record as of the latest checkpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContainerSnapshot {
    pub name: String,
    pub spec: Option<ContainerSpec>,
    pub record: DeploymentRecord,
}

// ── Derived ────────────────────────────────────────────────────────

/// What changed since the last deployment. Recomputed every run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
    pub code_changed: bool,
    pub backend_type_changed: bool,
    pub compute_config_changed: bool,
    pub routing_changed: bool,
    pub images_missing: bool,
}

impl ChangeSet {
    pub fn any(&self) -> bool {
        self.code_changed
            || self.backend_type_changed
            || self.compute_config_changed
            || self.routing_changed
            || self.images_missing
    }

    /// Whether a deployment must run, given the force flag.
    pub fn should_deploy(&self, force: bool) -> bool {
        force || self.any()
    }
}
