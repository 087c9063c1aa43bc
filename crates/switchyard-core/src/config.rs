//! switchyard.toml configuration parser.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use thiserror::Error;

use crate::types::ContainerSpec;

/// Name given to the container of a single-`[container]` project.
pub const SINGLE_CONTAINER_NAME: &str = "service";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse switchyard.toml: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("no containers declared: add a [container] or [containers.<name>] block")]
    NoContainers,
    #[error("declare either [container] or [containers], not both")]
    AmbiguousContainers,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub project: ProjectSection,
    #[serde(default)]
    pub deployment: DeploymentSection,
    /// Single-container shorthand.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<ContainerSpec>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub containers: BTreeMap<String, ContainerSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectSection {
    pub name: String,
    #[serde(default = "default_stage")]
    pub stage: String,
}

/// Shared infrastructure the containers deploy into.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentSection {
    /// Load balancer the routing rules attach to.
    #[serde(default)]
    pub load_balancer: String,
    /// Container-orchestration cluster.
    #[serde(default)]
    pub cluster: String,
    /// Execution role used by orchestrated tasks.
    #[serde(default)]
    pub execution_role: String,
    #[serde(default = "default_listener_port")]
    pub listener_port: u16,
    #[serde(default = "default_container_port")]
    pub container_port: u16,
    #[serde(default)]
    pub subnets: Vec<String>,
    #[serde(default)]
    pub security_groups: Vec<String>,
    #[serde(default)]
    pub polling: PollingSection,
}

impl Default for DeploymentSection {
    fn default() -> Self {
        Self {
            load_balancer: String::new(),
            cluster: String::new(),
            execution_role: String::new(),
            listener_port: default_listener_port(),
            container_port: default_container_port(),
            subnets: Vec::new(),
            security_groups: Vec::new(),
            polling: PollingSection::default(),
        }
    }
}

/// Overrides for the orchestrated rollout polling cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingSection {
    #[serde(default = "default_locate_attempts")]
    pub locate_attempts: u32,
    #[serde(default = "default_locate_interval")]
    pub locate_interval_secs: u64,
    #[serde(default = "default_poll_attempts")]
    pub poll_attempts: u32,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

impl Default for PollingSection {
    fn default() -> Self {
        Self {
            locate_attempts: default_locate_attempts(),
            locate_interval_secs: default_locate_interval(),
            poll_attempts: default_poll_attempts(),
            poll_interval_secs: default_poll_interval(),
        }
    }
}

impl PollingSection {
    pub fn locate_interval(&self) -> Duration {
        Duration::from_secs(self.locate_interval_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

fn default_stage() -> String {
    "dev".to_string()
}

fn default_listener_port() -> u16 {
    80
}

fn default_container_port() -> u16 {
    8080
}

fn default_locate_attempts() -> u32 {
    20
}

fn default_locate_interval() -> u64 {
    3
}

fn default_poll_attempts() -> u32 {
    90
}

fn default_poll_interval() -> u64 {
    10
}

impl ProjectConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: ProjectConfig = toml::from_str(content)?;
        Ok(config)
    }

    /// Base for provider resource names: `<project>-<stage>`.
    pub fn resource_name_base(&self) -> String {
        format!("{}-{}", self.project.name, self.project.stage)
    }

    /// All declared containers with their `name` filled in, ordered by name.
    ///
    /// A lone `[container]` block is named `service`.
    pub fn container_specs(&self) -> Result<Vec<ContainerSpec>, ConfigError> {
        match (&self.container, self.containers.is_empty()) {
            (Some(_), false) => Err(ConfigError::AmbiguousContainers),
            (None, true) => Err(ConfigError::NoContainers),
            (Some(single), true) => {
                let mut spec = single.clone();
                spec.name = SINGLE_CONTAINER_NAME.to_string();
                Ok(vec![spec])
            }
            (None, false) => Ok(self
                .containers
                .iter()
                .map(|(name, spec)| {
                    let mut spec = spec.clone();
                    spec.name = name.clone();
                    spec
                })
                .collect()),
        }
    }
}
