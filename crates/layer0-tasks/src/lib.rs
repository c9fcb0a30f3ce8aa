//! layer0-tasks — task placement glue between the cluster and the scaler.
//!
//! The `TaskManager` routes run-task attempts through the cluster API.
//! When the cluster is out of capacity the task parks on the
//! `DemandStore`, a scaler run is scheduled, and a later replay places it
//! once the fleet has grown:
//!
//! ```text
//! create_task ── run_task ──► cluster
//!      │ capacity miss
//!      ├──► DemandStore (pending tasks + service demand)
//!      │         ▲ read by ConsumerGetter during scaler passes
//!      └──► ScheduleDispatcher::schedule_run
//! ```
//!
//! The capacity miss is a one-way notification: the task path never calls
//! the scaler directly, so the scaler stays single-writer.

pub mod cluster;
pub mod error;
pub mod manager;
pub mod pending;

pub use cluster::{ClusterClient, ClusterError, DeployFootprint};
pub use error::{TaskError, TaskResult};
pub use manager::TaskManager;
pub use pending::{DemandStore, PendingTask, ServiceDemand};
