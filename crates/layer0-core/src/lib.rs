//! layer0-core — shared domain types and configuration.
//!
//! Model types here are the stable reporting surface of the control plane:
//! the `ScalerRunInfo` record emitted by every scaling pass, the resource
//! snapshots it embeds, and the task request/response shapes. Field names
//! are part of the contract with collaborators and printers.
//!
//! The config module parses `layer0.toml` and supplies defaults for every
//! knob the capacity core reads.

pub mod config;
pub mod types;

pub use config::Layer0Config;
pub use types::{
    ContainerOverride, CreateTaskRequest, DeployId, EnvironmentId, ResourceConsumerModel,
    ResourceProviderModel, ScalerRunInfo, Task, TaskId, TaskStatus,
};
