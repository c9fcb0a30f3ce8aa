//! Domain types for the Layer0 capacity core.
//!
//! These are the reporting and request/response shapes exchanged with
//! collaborators (API controllers, printers, the job queue). Resource
//! snapshots are deep copies taken at well-defined points of a scaling
//! pass; mutating core state never retroactively changes a record.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Unique identifier for an environment (the unit of scaling).
pub type EnvironmentId = String;

/// Unique identifier for a task.
pub type TaskId = String;

/// Unique identifier for a deploy (a versioned container spec).
pub type DeployId = String;

// ── Resource reporting ─────────────────────────────────────────────

/// Snapshot of one unit of workload demand considered by a scaling pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceConsumerModel {
    /// Task id, or `"<service>/N"` for the Nth unsatisfied replica.
    pub id: String,
    /// Memory the consumer requires, in bytes.
    pub memory: u64,
    /// TCP ports the consumer needs bound on its host.
    pub ports: Vec<u16>,
}

/// Snapshot of one container host after a scaling pass packed it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceProviderModel {
    pub id: String,
    /// True iff the host held or received at least one consumer.
    pub in_use: bool,
    /// Memory still free after packing, in bytes.
    pub available_memory: u64,
    /// Ports bound on the host after packing.
    pub used_ports: Vec<u16>,
}

/// Observable outcome of a single scaling pass.
///
/// Returned by every `scale` call and logged by dispatcher-driven runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScalerRunInfo {
    pub environment_id: EnvironmentId,
    /// The demand the pass considered, in input order.
    pub pending_resources: Vec<ResourceConsumerModel>,
    /// The host fleet after packing, including hosts the pass added.
    pub resource_providers: Vec<ResourceProviderModel>,
    /// Host count when the pass started.
    pub scale_before_run: u32,
    /// Host count the pass asked the platform for.
    pub desired_scale_after_run: u32,
    /// Host count the platform settled on (may be clamped).
    pub actual_scale_after_run: u32,
    /// Hosts that ended the pass idle and were offered for teardown.
    pub unused_resource_providers: u32,
}

// ── Tasks ──────────────────────────────────────────────────────────

/// Request to create and place a task.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateTaskRequest {
    pub environment_id: EnvironmentId,
    pub deploy_id: DeployId,
    pub task_name: String,
    /// How many copies of the task to run. Zero is treated as one.
    pub copies: u32,
    #[serde(default)]
    pub container_overrides: Vec<ContainerOverride>,
}

/// Per-container environment overrides applied when a task runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerOverride {
    pub container_name: String,
    pub environment_overrides: HashMap<String, String>,
}

/// A task as reported by the control plane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub task_id: TaskId,
    pub task_name: String,
    pub environment_id: EnvironmentId,
    pub deploy_id: DeployId,
    pub copies: u32,
    pub status: TaskStatus,
}

/// Placement state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// The cluster accepted the task.
    Running,
    /// The cluster was out of capacity; the task is parked until a scaler
    /// pass grows the fleet.
    Pending,
}
