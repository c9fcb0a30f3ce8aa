//! In-memory demand registry read by the capacity scaler.
//!
//! Tasks that could not be placed wait here until a scaler pass grows the
//! cluster; service logic registers unsatisfied replica counts the same
//! way. Parked tasks stay visible through `list`/`get` so operators can
//! see what is waiting for capacity.

use async_trait::async_trait;
use tokio::sync::RwLock;

use layer0_core::types::{ContainerOverride, DeployId, EnvironmentId, TaskId};
use layer0_resource::ResourceConsumer;
use layer0_scaler::ConsumerGetter;

/// A task parked until the cluster has room for it.
#[derive(Debug, Clone)]
pub struct PendingTask {
    pub task_id: TaskId,
    pub task_name: String,
    pub environment_id: EnvironmentId,
    pub deploy_id: DeployId,
    pub copies: u32,
    /// Memory one copy requires, in bytes.
    pub memory: u64,
    /// Host ports one copy binds.
    pub ports: Vec<u16>,
    pub container_overrides: Vec<ContainerOverride>,
}

/// Unsatisfied replica count for a service.
#[derive(Debug, Clone)]
pub struct ServiceDemand {
    pub environment_id: EnvironmentId,
    pub service_id: String,
    pub missing_replicas: u32,
    /// Memory one replica requires, in bytes.
    pub memory: u64,
    /// Host ports one replica binds.
    pub ports: Vec<u16>,
}

#[derive(Default)]
struct DemandState {
    tasks: Vec<PendingTask>,
    services: Vec<ServiceDemand>,
}

/// Shared registry of everything waiting for cluster capacity.
#[derive(Default)]
pub struct DemandStore {
    inner: RwLock<DemandState>,
}

impl DemandStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Park a task until the next replay.
    pub async fn add_task(&self, task: PendingTask) {
        let mut state = self.inner.write().await;
        state.tasks.push(task);
    }

    /// Parked tasks for one environment, in arrival order.
    pub async fn list_tasks(&self, environment_id: &str) -> Vec<PendingTask> {
        let state = self.inner.read().await;
        state
            .tasks
            .iter()
            .filter(|t| t.environment_id == environment_id)
            .cloned()
            .collect()
    }

    pub async fn get_task(&self, task_id: &str) -> Option<PendingTask> {
        let state = self.inner.read().await;
        state.tasks.iter().find(|t| t.task_id == task_id).cloned()
    }

    pub async fn remove_task(&self, task_id: &str) -> Option<PendingTask> {
        let mut state = self.inner.write().await;
        let index = state.tasks.iter().position(|t| t.task_id == task_id)?;
        Some(state.tasks.remove(index))
    }

    /// Remove and return every parked task for the environment, for a
    /// placement replay. Tasks that still do not fit are parked again by
    /// the caller.
    pub async fn take_tasks(&self, environment_id: &str) -> Vec<PendingTask> {
        let mut state = self.inner.write().await;
        let (taken, kept) = state
            .tasks
            .drain(..)
            .partition(|t| t.environment_id == environment_id);
        state.tasks = kept;
        taken
    }

    /// Record (or update) a service's unsatisfied replica count. A count
    /// of zero clears the entry.
    pub async fn set_service_demand(&self, demand: ServiceDemand) {
        let mut state = self.inner.write().await;
        state.services.retain(|s| {
            s.environment_id != demand.environment_id || s.service_id != demand.service_id
        });
        if demand.missing_replicas > 0 {
            state.services.push(demand);
        }
    }

    pub async fn clear_service_demand(&self, environment_id: &str, service_id: &str) {
        let mut state = self.inner.write().await;
        state
            .services
            .retain(|s| s.environment_id != environment_id || s.service_id != service_id);
    }
}

#[async_trait]
impl ConsumerGetter for DemandStore {
    /// Expand parked tasks and service demand into per-copy consumers.
    ///
    /// A task with one copy keeps its task id; multi-copy tasks and
    /// service replicas are numbered `"<id>/N"` from one.
    async fn get_consumers(&self, environment_id: &str) -> anyhow::Result<Vec<ResourceConsumer>> {
        let state = self.inner.read().await;
        let mut consumers = Vec::new();

        for task in state
            .tasks
            .iter()
            .filter(|t| t.environment_id == environment_id)
        {
            let copies = task.copies.max(1);
            for n in 1..=copies {
                let id = if copies == 1 {
                    task.task_id.clone()
                } else {
                    format!("{}/{n}", task.task_id)
                };
                consumers.push(ResourceConsumer::new(id, task.memory, task.ports.clone())?);
            }
        }

        for service in state
            .services
            .iter()
            .filter(|s| s.environment_id == environment_id)
        {
            for n in 1..=service.missing_replicas {
                consumers.push(ResourceConsumer::new(
                    format!("{}/{n}", service.service_id),
                    service.memory,
                    service.ports.clone(),
                )?);
            }
        }

        Ok(consumers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(task_id: &str, environment_id: &str, copies: u32) -> PendingTask {
        PendingTask {
            task_id: task_id.to_string(),
            task_name: "job".to_string(),
            environment_id: environment_id.to_string(),
            deploy_id: "dpl-1".to_string(),
            copies,
            memory: 256,
            ports: vec![8080],
            container_overrides: Vec::new(),
        }
    }

    #[tokio::test]
    async fn tasks_are_listed_per_environment() {
        let store = DemandStore::new();
        store.add_task(task("t1", "a", 1)).await;
        store.add_task(task("t2", "b", 1)).await;
        store.add_task(task("t3", "a", 1)).await;

        let tasks = store.list_tasks("a").await;
        let ids: Vec<&str> = tasks.iter().map(|t| t.task_id.as_str()).collect();
        assert_eq!(ids, vec!["t1", "t3"]);
    }

    #[tokio::test]
    async fn get_and_remove_by_task_id() {
        let store = DemandStore::new();
        store.add_task(task("t1", "a", 1)).await;

        assert!(store.get_task("t1").await.is_some());
        assert!(store.get_task("t2").await.is_none());

        let removed = store.remove_task("t1").await.unwrap();
        assert_eq!(removed.task_id, "t1");
        assert!(store.get_task("t1").await.is_none());
        assert!(store.remove_task("t1").await.is_none());
    }

    #[tokio::test]
    async fn take_tasks_drains_only_the_environment() {
        let store = DemandStore::new();
        store.add_task(task("t1", "a", 1)).await;
        store.add_task(task("t2", "b", 1)).await;

        let taken = store.take_tasks("a").await;
        assert_eq!(taken.len(), 1);
        assert!(store.list_tasks("a").await.is_empty());
        assert_eq!(store.list_tasks("b").await.len(), 1);
    }

    #[tokio::test]
    async fn single_copy_task_keeps_its_id() {
        let store = DemandStore::new();
        store.add_task(task("t1", "a", 1)).await;

        let consumers = store.get_consumers("a").await.unwrap();
        assert_eq!(consumers.len(), 1);
        assert_eq!(consumers[0].id(), "t1");
        assert_eq!(consumers[0].memory(), 256);
        assert_eq!(consumers[0].ports(), &[8080]);
    }

    #[tokio::test]
    async fn copies_expand_into_numbered_consumers() {
        let store = DemandStore::new();
        store.add_task(task("t1", "a", 3)).await;

        let consumers = store.get_consumers("a").await.unwrap();
        let ids: Vec<&str> = consumers.iter().map(|c| c.id()).collect();
        assert_eq!(ids, vec!["t1/1", "t1/2", "t1/3"]);
    }

    #[tokio::test]
    async fn service_demand_expands_into_replicas() {
        let store = DemandStore::new();
        store
            .set_service_demand(ServiceDemand {
                environment_id: "a".to_string(),
                service_id: "svc-api".to_string(),
                missing_replicas: 2,
                memory: 512,
                ports: vec![443],
            })
            .await;

        let consumers = store.get_consumers("a").await.unwrap();
        let ids: Vec<&str> = consumers.iter().map(|c| c.id()).collect();
        assert_eq!(ids, vec!["svc-api/1", "svc-api/2"]);
    }

    #[tokio::test]
    async fn zero_missing_replicas_clears_the_demand() {
        let store = DemandStore::new();
        store
            .set_service_demand(ServiceDemand {
                environment_id: "a".to_string(),
                service_id: "svc-api".to_string(),
                missing_replicas: 2,
                memory: 512,
                ports: Vec::new(),
            })
            .await;
        store
            .set_service_demand(ServiceDemand {
                environment_id: "a".to_string(),
                service_id: "svc-api".to_string(),
                missing_replicas: 0,
                memory: 512,
                ports: Vec::new(),
            })
            .await;

        assert!(store.get_consumers("a").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn consumers_are_scoped_to_the_environment() {
        let store = DemandStore::new();
        store.add_task(task("t1", "a", 1)).await;
        store.add_task(task("t2", "b", 1)).await;

        let consumers = store.get_consumers("b").await.unwrap();
        assert_eq!(consumers.len(), 1);
        assert_eq!(consumers[0].id(), "t2");
    }
}
