//! Router: the two-step "stage, then promote" routing primitive.
//!
//! ```text
//! stage:    listener ─► target group (destination backend) ─► rule @ deprioritized
//! promote:  rule @ production  (the traffic switch)
//! ```
//!
//! Every call runs under the load-balancer lock of the
//! [`ConcurrencyCoordinator`]; the client methods are list-then-create
//! sequences without optimistic locking.

use std::sync::Arc;

use switchyard_core::provider::{
    ListenerSpec, LoadBalancerClient, RoutingRuleSpec, TargetGroupSpec, TargetKind,
};
use switchyard_core::{BackendType, DeploymentRecord, ListenerRoutingRule, PriorityTier};
use tracing::{debug, info};

use crate::concurrency::ConcurrencyCoordinator;
use crate::context::DeployContext;
use crate::error::DeployError;

pub struct Router {
    client: Arc<dyn LoadBalancerClient>,
    coordinator: Arc<ConcurrencyCoordinator>,
    forward_token: String,
}

impl Router {
    pub fn new(
        client: Arc<dyn LoadBalancerClient>,
        coordinator: Arc<ConcurrencyCoordinator>,
        forward_token: String,
    ) -> Self {
        Self {
            client,
            coordinator,
            forward_token,
        }
    }

    /// Ensure the destination target group exists and a rule forwards to it
    /// without taking traffic. Returns the target group reference.
    ///
    /// A rule for a target group that already serves production stays at
    /// the production tier.
    pub async fn stage(
        &self,
        ctx: &DeployContext<'_>,
        record: &mut DeploymentRecord,
    ) -> Result<String, DeployError> {
        let _lock = self.coordinator.load_balancer().await;
        let deployment = &ctx.project.deployment;
        let backend = ctx.spec.compute.backend;

        let listener = self
            .client
            .get_or_create_listener(&ListenerSpec {
                load_balancer: deployment.load_balancer.clone(),
                port: deployment.listener_port,
            })
            .await?;
        record.routing.listener = Some(listener.clone());

        let target_group = self
            .client
            .get_or_create_target_group(&TargetGroupSpec {
                name: target_group_name(&ctx.resource_name(), backend),
                kind: match backend {
                    BackendType::Function => TargetKind::Function,
                    BackendType::Orchestrated => TargetKind::Ip,
                },
                health_check_path: ctx.health_check_path.clone(),
                port: ctx.container_port(),
            })
            .await?;
        record.routing.set_target_group(backend, target_group.clone());
        debug!(container = %ctx.spec.name, %backend, %target_group, "target group ready");

        let spec = self.rule_spec(ctx, &listener, &target_group);
        let rule = self
            .client
            .create_or_update_routing_rule(&spec, PriorityTier::Deprioritized)
            .await?;

        let tier = match record.routing.production_rule() {
            Some(current) if current.target_group == target_group => PriorityTier::Production,
            _ => PriorityTier::Deprioritized,
        };
        record.routing.upsert_rule(to_record(spec, rule, tier));
        info!(container = %ctx.spec.name, %target_group, ?tier, "routing staged");
        Ok(target_group)
    }

    /// Move production traffic to `target_group`.
    pub async fn promote(
        &self,
        ctx: &DeployContext<'_>,
        target_group: &str,
        record: &mut DeploymentRecord,
    ) -> Result<(), DeployError> {
        let _lock = self.coordinator.load_balancer().await;
        let listener = record.routing.listener.clone().unwrap_or_default();

        let spec = self.rule_spec(ctx, &listener, target_group);
        let rule = self
            .client
            .create_or_update_routing_rule(&spec, PriorityTier::Production)
            .await?;
        record
            .routing
            .upsert_rule(to_record(spec, rule, PriorityTier::Production));

        let routing = &ctx.spec.routing;
        record.routing.path_pattern = Some(routing.path_pattern.clone());
        record.routing.health_check_path = Some(ctx.health_check_path.clone());
        record.routing.custom_domain = routing.domain.clone();
        info!(container = %ctx.spec.name, %target_group, "production traffic switched");
        Ok(())
    }

    fn rule_spec(&self, ctx: &DeployContext<'_>, listener: &str, target_group: &str) -> RoutingRuleSpec {
        RoutingRuleSpec {
            listener: listener.to_string(),
            target_group: target_group.to_string(),
            path_pattern: ctx.spec.routing.path_pattern.clone(),
            host_header: ctx.spec.routing.domain.clone(),
            forward_token: self.forward_token.clone(),
        }
    }
}

/// `<resource>-fn` or `<resource>-svc`.
pub fn target_group_name(resource: &str, backend: BackendType) -> String {
    match backend {
        BackendType::Function => format!("{resource}-fn"),
        BackendType::Orchestrated => format!("{resource}-svc"),
    }
}

fn to_record(spec: RoutingRuleSpec, rule: String, tier: PriorityTier) -> ListenerRoutingRule {
    ListenerRoutingRule {
        rule: Some(rule),
        listener: spec.listener,
        target_group: spec.target_group,
        path_pattern: spec.path_pattern,
        host_header: spec.host_header,
        tier,
        forward_token: spec.forward_token,
    }
}
