//! Cluster-facing seam for task placement.

use async_trait::async_trait;
use thiserror::Error;

use layer0_core::types::ContainerOverride;

/// Resource footprint of a deploy's container spec.
///
/// Captured when a task parks so the scaler can account for it without
/// another round-trip to the cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployFootprint {
    pub deploy_id: String,
    /// Memory one copy requires, in bytes.
    pub memory: u64,
    /// Host ports one copy binds.
    pub ports: Vec<u16>,
}

/// Errors from the cluster API.
#[derive(Debug, Error)]
pub enum ClusterError {
    /// No container instance has room for the task. Not a failure of the
    /// task itself — the caller parks it and grows the fleet.
    #[error("no container instances with spare capacity in the cluster")]
    CapacityExhausted,

    #[error("deploy not found: {0}")]
    DeployNotFound(String),

    #[error("cluster api error: {0}")]
    Api(#[from] anyhow::Error),
}

/// Places tasks onto an environment's cluster.
///
/// The production implementation talks to the container platform; tests
/// use in-memory ones.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Resolve the resource footprint of a deploy.
    async fn describe_deploy(&self, deploy_id: &str) -> Result<DeployFootprint, ClusterError>;

    /// Start `copies` copies of the deploy on the environment's cluster.
    async fn run_task(
        &self,
        environment_id: &str,
        task_id: &str,
        deploy_id: &str,
        copies: u32,
        overrides: &[ContainerOverride],
    ) -> Result<(), ClusterError>;
}
