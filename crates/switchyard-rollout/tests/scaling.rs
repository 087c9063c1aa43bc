//! Desired counts and autoscaling policies of orchestrated services.

mod common;

use std::collections::BTreeSet;

use common::{FakeCloud, Project};
use switchyard_rollout::DeployOptions;
use switchyard_state::StateStore;

const MEMORY_POLICY: &str = "shop-dev-api-memory-target-tracking-scaling-policy";
const STEP_POLICY: &str = "shop-dev-api-RequestCount-step-scaling-policy";

fn scaled_config(scale: &str) -> String {
    format!(
        r#"
[project]
name = "shop"
stage = "dev"

[deployment]
load_balancer = "shop-lb"
cluster = "shop-cluster"
execution_role = "role/shop-execution"

[containers.api]
src = "api"

[containers.api.compute]
type = "orchestrated"
scale = {scale}

[containers.api.routing]
path_pattern = "/*"
"#
    )
}

#[tokio::test]
async fn stale_policies_are_pruned() {
    let cloud = FakeCloud::new();
    cloud.seed_policies(&["stale-a", MEMORY_POLICY, "stale-c"]);
    let project = Project::new(&["api"]);
    let state = StateStore::open_in_memory().unwrap();
    let config = scaled_config(
        r#"[
  { type = "target", target = "memory", value = 60.0 },
  { type = "step", metric = "RequestCount", namespace = "LoadBalancer", threshold = 100.0, comparison_operator = "GreaterThanThreshold", steps = [{ lower_bound = 0.0, adjustment = 1 }] },
]"#,
    );

    let reports = project
        .deployer(&cloud, &config, &state)
        .deploy_project(&DeployOptions::default())
        .await
        .unwrap();
    assert!(reports[0].outcome.is_ok(), "{:?}", reports[0].outcome);

    let expected: BTreeSet<String> = [MEMORY_POLICY, STEP_POLICY].iter().map(|s| s.to_string()).collect();
    assert_eq!(cloud.policies(), expected);
    assert!(cloud.position(&format!("telemetry.alarm policy/{STEP_POLICY}")).is_some());
    assert!(cloud.position("autoscaling.delete stale-a").is_some());
    assert!(cloud.position("autoscaling.delete stale-c").is_some());
}

#[tokio::test]
async fn bounds_drive_desired_count() {
    let cloud = FakeCloud::new();
    let project = Project::new(&["api"]);
    let state = StateStore::open_in_memory().unwrap();
    let config = scaled_config(
        r#"[{ type = "min", min = 2 }, { type = "max", max = 4 }, { type = "target", target = "cpu" }]"#,
    );
    let deployer = project.deployer(&cloud, &config, &state);

    deployer.deploy_project(&DeployOptions::default()).await.unwrap();
    assert!(cloud.position("orchestration.update_service shop-dev-api desired=2").is_some());
    assert!(
        cloud
            .position("autoscaling.register service/shop-cluster/shop-dev-api min=2 max=4")
            .is_some()
    );

    // The running count survives a redeploy.
    project.edit("api", "console.log('v2')\n");
    cloud.clear();
    deployer.deploy_project(&DeployOptions::default()).await.unwrap();
    assert!(cloud.position("orchestration.update_service shop-dev-api desired=2").is_some());
    let observed = cloud.position("orchestration.get_service shop-dev-api").unwrap();
    let registered = cloud.position("orchestration.register_template shop-dev-api").unwrap();
    assert!(observed < registered, "calls out of order: {:?}", cloud.calls());
}

#[tokio::test]
async fn explicit_desired_without_policies_is_used_verbatim() {
    let cloud = FakeCloud::new();
    let project = Project::new(&["api"]);
    let state = StateStore::open_in_memory().unwrap();
    let config = scaled_config(r#"[{ type = "desired", desired = 3 }]"#);

    project
        .deployer(&cloud, &config, &state)
        .deploy_project(&DeployOptions::default())
        .await
        .unwrap();
    assert_eq!(cloud.desired_count("shop-dev-api"), Some(3));
}

#[tokio::test]
async fn invalid_bounds_are_rejected_before_any_call() {
    let cloud = FakeCloud::new();
    let project = Project::new(&["api"]);
    let state = StateStore::open_in_memory().unwrap();
    let config = scaled_config(r#"[{ type = "min", min = 5 }, { type = "max", max = 2 }]"#);

    let reports = project
        .deployer(&cloud, &config, &state)
        .deploy_project(&DeployOptions::default())
        .await
        .unwrap();
    let err = reports[0].outcome.as_ref().unwrap_err();
    assert_eq!(err.code(), "CONFIG_INVALID_SCALING_BOUNDS");
    assert!(cloud.calls().is_empty());
}

#[tokio::test]
async fn duplicate_target_metric_is_rejected_before_any_call() {
    let cloud = FakeCloud::new();
    let project = Project::new(&["api"]);
    let state = StateStore::open_in_memory().unwrap();
    let config = scaled_config(
        r#"[{ type = "target", target = "cpu" }, { type = "target", target = "cpu", value = 50.0 }]"#,
    );

    let reports = project
        .deployer(&cloud, &config, &state)
        .deploy_project(&DeployOptions::default())
        .await
        .unwrap();
    assert_eq!(
        reports[0].outcome.as_ref().unwrap_err().code(),
        "CONFIG_DUPLICATE_TARGET_POLICY"
    );
    assert!(cloud.calls().is_empty());
}
