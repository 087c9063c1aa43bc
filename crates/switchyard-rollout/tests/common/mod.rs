//! Recording fake cloud shared by the integration tests.
//!
//! Every collaborator call is appended to an ordered log as
//! `"<service>.<operation> <subject>"`, so tests can assert both what was
//! called and in which order.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use switchyard_core::provider::{
    ArtifactBuilder, AutoscalingClient, DeploymentStatus, ExitedTask, FunctionClient, FunctionSpec,
    ImageVariant, ListenerSpec, LoadBalancerClient, LogEvent, OrchestrationClient, PolicyDocument,
    ProviderResult, RemotePolicy, RoleProvisioner, RoutingRuleSpec, ScalableTarget, ServiceDeployment,
    ServiceEvent, ServiceRef, ServiceSpec, ServiceStatus, StepAlarm, TargetGroupSpec, TaskTemplate,
    TaskTemplateSpec, TelemetryClient,
};
use switchyard_core::{PriorityTier, ProjectConfig, ProviderError};
use switchyard_health::{PollPolicy, PollSettings};
use switchyard_rollout::{Deployer, Providers};
use switchyard_state::StateStore;

/// Operations that only read provider state.
const READS: &[&str] = &[
    "artifacts.size",
    "function.endpoint",
    "orchestration.get_service",
    "orchestration.get_deployment",
    "orchestration.describe_deployment",
    "orchestration.events",
    "orchestration.exited",
    "autoscaling.list",
    "telemetry.logs",
];

/// How the orchestrated rollout of one service plays out.
#[derive(Debug, Clone, PartialEq)]
pub enum Rollout {
    Succeed,
    /// Stays in progress and reports this service event.
    Event(String),
    /// Stays in progress with no events.
    Hang,
    /// The triggered deployment never shows up.
    NeverLocated,
}

#[derive(Default)]
pub struct FakeCloud {
    calls: Mutex<Vec<String>>,
    /// Rollout script per service name; `Succeed` when absent.
    rollouts: Mutex<BTreeMap<String, Rollout>>,
    /// Desired count per existing service.
    services: Mutex<BTreeMap<String, u32>>,
    policies: Mutex<BTreeSet<String>>,
    /// Active rule per path pattern: target group and tier.
    rules: Mutex<BTreeMap<String, (String, PriorityTier)>>,
    /// Calls starting with this prefix fail.
    fail_on: Mutex<Option<String>>,
}

impl FakeCloud {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn script(&self, service: &str, rollout: Rollout) {
        self.rollouts.lock().unwrap().insert(service.to_string(), rollout);
    }

    pub fn fail_on(&self, prefix: &str) {
        *self.fail_on.lock().unwrap() = Some(prefix.to_string());
    }

    pub fn seed_policies(&self, names: &[&str]) {
        let mut policies = self.policies.lock().unwrap();
        policies.extend(names.iter().map(|n| n.to_string()));
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn mutations(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| !READS.iter().any(|r| c.starts_with(r)))
            .collect()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    /// Index of the first call starting with `prefix`.
    pub fn position(&self, prefix: &str) -> Option<usize> {
        self.calls().iter().position(|c| c.starts_with(prefix))
    }

    pub fn policies(&self) -> BTreeSet<String> {
        self.policies.lock().unwrap().clone()
    }

    pub fn production_target_group(&self, path: &str) -> Option<String> {
        self.rules
            .lock()
            .unwrap()
            .get(path)
            .filter(|(_, tier)| *tier == PriorityTier::Production)
            .map(|(tg, _)| tg.clone())
    }

    pub fn desired_count(&self, service: &str) -> Option<u32> {
        self.services.lock().unwrap().get(service).copied()
    }

    fn record(&self, call: String) -> ProviderResult<()> {
        let fail = self
            .fail_on
            .lock()
            .unwrap()
            .as_deref()
            .is_some_and(|prefix| call.starts_with(prefix));
        self.calls.lock().unwrap().push(call.clone());
        if fail {
            return Err(ProviderError::request("fake", "call", format!("injected failure: {call}")));
        }
        Ok(())
    }

    fn rollout(&self, service: &str) -> Rollout {
        self.rollouts
            .lock()
            .unwrap()
            .get(service)
            .cloned()
            .unwrap_or(Rollout::Succeed)
    }
}

fn service_of(deployment: &str) -> &str {
    deployment.split_once('/').map_or(deployment, |(service, _)| service)
}

#[async_trait]
impl ArtifactBuilder for FakeCloud {
    async fn repository(&self, name: &str) -> ProviderResult<String> {
        self.record(format!("artifacts.repository {name}"))?;
        Ok(format!("registry.example.com/{name}"))
    }

    async fn build(&self, _: &Path, image: &str, _: ImageVariant) -> ProviderResult<()> {
        self.record(format!("artifacts.build {image}"))
    }

    async fn push(&self, image: &str) -> ProviderResult<()> {
        self.record(format!("artifacts.push {image}"))
    }

    async fn size_mb(&self, image: &str) -> ProviderResult<u64> {
        self.record(format!("artifacts.size {image}"))?;
        Ok(42)
    }
}

#[async_trait]
impl FunctionClient for FakeCloud {
    async fn create_or_update(&self, spec: &FunctionSpec) -> ProviderResult<String> {
        self.record(format!("function.create_or_update {}", spec.name))?;
        Ok(format!("function:{}", spec.name))
    }

    async fn invocation_endpoint(&self, function: &str) -> ProviderResult<Option<String>> {
        self.record(format!("function.endpoint {function}"))?;
        Ok(Some(format!("https://{function}.functions.example.com")))
    }
}

#[async_trait]
impl OrchestrationClient for FakeCloud {
    async fn register_task_template(&self, spec: &TaskTemplateSpec) -> ProviderResult<TaskTemplate> {
        self.record(format!("orchestration.register_template {}", spec.family))?;
        Ok(TaskTemplate {
            template: format!("{}:1", spec.family),
            log_destination: Some(format!("/logs/{}", spec.family)),
        })
    }

    async fn create_or_update_service(&self, spec: &ServiceSpec) -> ProviderResult<String> {
        self.record(format!(
            "orchestration.update_service {} desired={}",
            spec.service.name, spec.desired_count
        ))?;
        self.services
            .lock()
            .unwrap()
            .insert(spec.service.name.clone(), spec.desired_count);
        Ok(spec.service.name.clone())
    }

    async fn get_service(&self, service: &ServiceRef) -> ProviderResult<Option<ServiceStatus>> {
        self.record(format!("orchestration.get_service {}", service.name))?;
        Ok(self.desired_count(&service.name).map(|count| ServiceStatus {
            service: service.name.clone(),
            running_count: count,
            desired_count: count,
            pending_count: 0,
        }))
    }

    async fn get_deployment(
        &self,
        service: &ServiceRef,
        _: &[DeploymentStatus],
    ) -> ProviderResult<Option<ServiceDeployment>> {
        self.record(format!("orchestration.get_deployment {}", service.name))?;
        if self.rollout(&service.name) == Rollout::NeverLocated {
            return Ok(None);
        }
        Ok(Some(ServiceDeployment {
            id: format!("{}/deployment", service.name),
            status: DeploymentStatus::InProgress,
            created_at_ms: 1_000,
            running_count: 0,
            pending_count: 1,
            failure_count: 0,
        }))
    }

    async fn describe_deployment(&self, deployment: &str) -> ProviderResult<ServiceDeployment> {
        self.record(format!("orchestration.describe_deployment {deployment}"))?;
        let service = service_of(deployment);
        let desired = self.desired_count(service).unwrap_or(1);
        let (status, running) = match self.rollout(service) {
            Rollout::Succeed => (DeploymentStatus::Successful, desired),
            _ => (DeploymentStatus::InProgress, 0),
        };
        Ok(ServiceDeployment {
            id: deployment.to_string(),
            status,
            created_at_ms: 1_000,
            running_count: running,
            pending_count: desired - running,
            failure_count: 0,
        })
    }

    async fn get_service_events(&self, service: &ServiceRef) -> ProviderResult<Vec<ServiceEvent>> {
        self.record(format!("orchestration.events {}", service.name))?;
        Ok(match self.rollout(&service.name) {
            Rollout::Event(message) => vec![
                ServiceEvent {
                    created_at_ms: 500,
                    message: "(service old) has reached a steady state.".to_string(),
                },
                ServiceEvent {
                    created_at_ms: 2_000,
                    message,
                },
            ],
            _ => Vec::new(),
        })
    }

    async fn get_exited_tasks(&self, service: &ServiceRef) -> ProviderResult<Vec<ExitedTask>> {
        self.record(format!("orchestration.exited {}", service.name))?;
        Ok(Vec::new())
    }

    async fn stop_service(&self, service: &ServiceRef) -> ProviderResult<()> {
        self.record(format!("orchestration.stop {}", service.name))?;
        self.services.lock().unwrap().insert(service.name.clone(), 0);
        Ok(())
    }
}

#[async_trait]
impl LoadBalancerClient for FakeCloud {
    async fn get_or_create_target_group(&self, spec: &TargetGroupSpec) -> ProviderResult<String> {
        self.record(format!("lb.target_group {}", spec.name))?;
        Ok(spec.name.clone())
    }

    async fn get_or_create_listener(&self, spec: &ListenerSpec) -> ProviderResult<String> {
        self.record(format!("lb.listener {}", spec.port))?;
        Ok(format!("{}/listener/{}", spec.load_balancer, spec.port))
    }

    /// A rule for the target group already in production stays there, as
    /// the real wrapper modifies that rule in place.
    async fn create_or_update_routing_rule(
        &self,
        spec: &RoutingRuleSpec,
        tier: PriorityTier,
    ) -> ProviderResult<String> {
        let label = match tier {
            PriorityTier::Production => "production",
            PriorityTier::Deprioritized => "deprioritized",
        };
        self.record(format!("lb.rule {} {label}", spec.target_group))?;
        let mut rules = self.rules.lock().unwrap();
        let keep_production = rules
            .get(&spec.path_pattern)
            .is_some_and(|(tg, t)| *t == PriorityTier::Production && *tg == spec.target_group);
        let is_production = tier == PriorityTier::Production || keep_production;
        if is_production || !rules.contains_key(&spec.path_pattern) {
            let tier = if is_production { PriorityTier::Production } else { tier };
            rules.insert(spec.path_pattern.clone(), (spec.target_group.clone(), tier));
        }
        Ok(format!("rule/{}", spec.target_group))
    }
}

#[async_trait]
impl AutoscalingClient for FakeCloud {
    async fn register_scalable_target(&self, target: &ScalableTarget) -> ProviderResult<()> {
        self.record(format!(
            "autoscaling.register {} min={} max={}",
            target.resource_id, target.min_capacity, target.max_capacity
        ))
    }

    async fn list_policies(&self, resource_id: &str) -> ProviderResult<Vec<RemotePolicy>> {
        self.record(format!("autoscaling.list {resource_id}"))?;
        Ok(self
            .policies()
            .into_iter()
            .map(|name| RemotePolicy { name })
            .collect())
    }

    async fn put_policy(&self, policy: &PolicyDocument) -> ProviderResult<String> {
        self.record(format!("autoscaling.put {}", policy.name))?;
        self.policies.lock().unwrap().insert(policy.name.clone());
        Ok(format!("policy/{}", policy.name))
    }

    async fn delete_policy(&self, _: &str, name: &str) -> ProviderResult<()> {
        self.record(format!("autoscaling.delete {name}"))?;
        self.policies.lock().unwrap().remove(name);
        Ok(())
    }
}

#[async_trait]
impl TelemetryClient for FakeCloud {
    async fn recent_logs(&self, destination: &str, _: u64, limit: usize) -> ProviderResult<Vec<LogEvent>> {
        self.record(format!("telemetry.logs {destination} limit={limit}"))?;
        Ok(vec![LogEvent {
            timestamp_ms: 2_000,
            message: "Error: listen EADDRINUSE".to_string(),
        }])
    }

    async fn put_alarm(&self, policy: &str, _: &StepAlarm) -> ProviderResult<()> {
        self.record(format!("telemetry.alarm {policy}"))
    }
}

#[async_trait]
impl RoleProvisioner for FakeCloud {
    async fn create_or_update_role(&self, name: &str, _: Option<&serde_json::Value>) -> ProviderResult<String> {
        self.record(format!("roles.put {name}"))?;
        Ok(format!("role/{name}"))
    }
}

// ── Project fixtures ───────────────────────────────────────────────

pub fn providers(cloud: &Arc<FakeCloud>) -> Providers {
    Providers {
        artifacts: cloud.clone(),
        functions: cloud.clone(),
        orchestration: cloud.clone(),
        load_balancer: cloud.clone(),
        autoscaling: cloud.clone(),
        telemetry: cloud.clone(),
        roles: cloud.clone(),
    }
}

/// Zero-length sleeps; short ceilings.
pub fn fast_polling() -> PollSettings {
    PollSettings {
        locate: PollPolicy::new(3, Duration::ZERO),
        rollout: PollPolicy::new(5, Duration::ZERO),
    }
}

/// A project directory holding one source tree per container name.
pub struct Project {
    pub dir: tempfile::TempDir,
}

impl Project {
    pub fn new(containers: &[&str]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        for name in containers {
            let src = dir.path().join(name);
            std::fs::create_dir_all(&src).unwrap();
            std::fs::write(src.join("server.js"), format!("// {name}\n")).unwrap();
        }
        Self { dir }
    }

    pub fn edit(&self, container: &str, content: &str) {
        std::fs::write(self.dir.path().join(container).join("server.js"), content).unwrap();
    }

    pub fn deployer(&self, cloud: &Arc<FakeCloud>, config: &str, state: &StateStore) -> Deployer {
        let config = ProjectConfig::from_toml_str(config).unwrap();
        Deployer::new(config, self.dir.path(), providers(cloud), state.clone())
            .with_poll_settings(fast_polling())
    }
}

const HEADER: &str = r#"
[project]
name = "shop"
stage = "dev"

[deployment]
load_balancer = "shop-lb"
cluster = "shop-cluster"
execution_role = "role/shop-execution"
"#;

/// Config with one `[containers.<name>]` block per `(name, backend, path)`.
pub fn config(containers: &[(&str, &str, &str)]) -> String {
    let mut out = HEADER.to_string();
    for (name, backend, path) in containers {
        out.push_str(&format!(
            r#"
[containers.{name}]
src = "{name}"

[containers.{name}.compute]
type = "{backend}"

[containers.{name}.routing]
path_pattern = "{path}"
health_check_path = "/health"
"#
        ));
    }
    out
}
