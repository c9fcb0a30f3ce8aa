//! Task placement through the cluster API, with capacity-miss fallback.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info};
use uuid::Uuid;

use layer0_core::config::{DEFAULT_CAPACITY_MISS_DELAY, Layer0Config};
use layer0_core::types::{CreateTaskRequest, Task, TaskStatus};
use layer0_scaler::ScheduleDispatcher;

use crate::cluster::{ClusterClient, ClusterError};
use crate::error::{TaskError, TaskResult};
use crate::pending::{DemandStore, PendingTask};

/// Routes run-task attempts through the cluster and parks the ones the
/// cluster has no room for.
///
/// Parked tasks are replayed by `run_pending`, which collaborators call
/// once a scaler pass has grown the fleet (the job queue drives this on a
/// timer in production).
pub struct TaskManager {
    cluster: Arc<dyn ClusterClient>,
    demand: Arc<DemandStore>,
    dispatcher: Arc<ScheduleDispatcher>,
    capacity_miss_delay: Duration,
}

impl TaskManager {
    pub fn new(
        cluster: Arc<dyn ClusterClient>,
        demand: Arc<DemandStore>,
        dispatcher: Arc<ScheduleDispatcher>,
    ) -> Self {
        Self {
            cluster,
            demand,
            dispatcher,
            capacity_miss_delay: DEFAULT_CAPACITY_MISS_DELAY,
        }
    }

    /// Override the delay of the scaler run scheduled after a capacity miss.
    pub fn with_capacity_miss_delay(mut self, delay: Duration) -> Self {
        self.capacity_miss_delay = delay;
        self
    }

    /// Pick up delays from a `layer0.toml` config.
    pub fn with_config(self, config: &Layer0Config) -> Self {
        self.with_capacity_miss_delay(config.capacity_miss_delay())
    }

    /// Create and place a task.
    ///
    /// A capacity miss is not an error: the task parks on the demand store
    /// with `TaskStatus::Pending` and a scaler run is scheduled to grow
    /// the cluster. Validation failures and other cluster errors surface
    /// to the caller.
    pub async fn create_task(&self, request: CreateTaskRequest) -> TaskResult<Task> {
        if request.environment_id.is_empty() {
            return Err(TaskError::MissingParameter("environment_id"));
        }
        if request.deploy_id.is_empty() {
            return Err(TaskError::MissingParameter("deploy_id"));
        }
        if request.task_name.is_empty() {
            return Err(TaskError::MissingParameter("task_name"));
        }

        let copies = request.copies.max(1);
        let task_id = format!("tsk-{}", Uuid::new_v4());
        let footprint = self.cluster.describe_deploy(&request.deploy_id).await?;

        let attempt = self
            .cluster
            .run_task(
                &request.environment_id,
                &task_id,
                &request.deploy_id,
                copies,
                &request.container_overrides,
            )
            .await;

        let status = match attempt {
            Ok(()) => {
                debug!(%task_id, environment_id = %request.environment_id, "task placed");
                TaskStatus::Running
            }
            Err(ClusterError::CapacityExhausted) => {
                info!(
                    %task_id,
                    environment_id = %request.environment_id,
                    "cluster at capacity, parking task for the scaler"
                );
                self.demand
                    .add_task(PendingTask {
                        task_id: task_id.clone(),
                        task_name: request.task_name.clone(),
                        environment_id: request.environment_id.clone(),
                        deploy_id: request.deploy_id.clone(),
                        copies,
                        memory: footprint.memory,
                        ports: footprint.ports,
                        container_overrides: request.container_overrides.clone(),
                    })
                    .await;
                self.dispatcher
                    .schedule_run(&request.environment_id, self.capacity_miss_delay)
                    .await;
                TaskStatus::Pending
            }
            Err(err) => return Err(err.into()),
        };

        Ok(Task {
            task_id,
            task_name: request.task_name,
            environment_id: request.environment_id,
            deploy_id: request.deploy_id,
            copies,
            status,
        })
    }

    /// Replay parked tasks for an environment after its fleet has grown.
    ///
    /// Tasks that place successfully leave the demand store; the rest are
    /// parked again and another scaler run is scheduled. Returns how many
    /// tasks were placed.
    pub async fn run_pending(&self, environment_id: &str) -> TaskResult<u32> {
        let parked = self.demand.take_tasks(environment_id).await;
        if parked.is_empty() {
            return Ok(0);
        }

        let mut placed = 0;
        let mut still_pending = false;

        for task in parked {
            let attempt = self
                .cluster
                .run_task(
                    environment_id,
                    &task.task_id,
                    &task.deploy_id,
                    task.copies,
                    &task.container_overrides,
                )
                .await;

            match attempt {
                Ok(()) => {
                    debug!(task_id = %task.task_id, %environment_id, "parked task placed");
                    placed += 1;
                }
                Err(ClusterError::CapacityExhausted) => {
                    self.demand.add_task(task).await;
                    still_pending = true;
                }
                Err(err) => {
                    error!(
                        task_id = %task.task_id,
                        %environment_id,
                        error = %err,
                        "replay failed, task stays parked"
                    );
                    self.demand.add_task(task).await;
                }
            }
        }

        if still_pending {
            self.dispatcher
                .schedule_run(environment_id, self.capacity_miss_delay)
                .await;
        }

        Ok(placed)
    }

    /// Parked tasks for an environment.
    pub async fn pending_tasks(&self, environment_id: &str) -> Vec<PendingTask> {
        self.demand.list_tasks(environment_id).await
    }

    /// Drop a parked task so it is never replayed.
    pub async fn cancel_pending(&self, task_id: &str) -> TaskResult<()> {
        match self.demand.remove_task(task_id).await {
            Some(task) => {
                info!(%task_id, environment_id = %task.environment_id, "parked task cancelled");
                Ok(())
            }
            None => Err(TaskError::NotFound(task_id.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;

    use async_trait::async_trait;

    use layer0_core::types::ContainerOverride;
    use layer0_resource::ResourceProvider;
    use layer0_scaler::{ConsumerGetter, EnvironmentScaler, ProviderManager};

    use crate::cluster::DeployFootprint;

    const MB: u64 = 1 << 20;

    /// Cluster with a fixed number of free task slots.
    struct SlotCluster {
        free_slots: Mutex<u32>,
        run_calls: Mutex<Vec<(String, String, u32)>>,
    }

    impl SlotCluster {
        fn new(free_slots: u32) -> Self {
            Self {
                free_slots: Mutex::new(free_slots),
                run_calls: Mutex::new(Vec::new()),
            }
        }

        fn grant_slots(&self, slots: u32) {
            *self.free_slots.lock().unwrap() += slots;
        }

        fn run_calls(&self) -> Vec<(String, String, u32)> {
            self.run_calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ClusterClient for SlotCluster {
        async fn describe_deploy(&self, deploy_id: &str) -> Result<DeployFootprint, ClusterError> {
            if deploy_id == "dpl-missing" {
                return Err(ClusterError::DeployNotFound(deploy_id.to_string()));
            }
            Ok(DeployFootprint {
                deploy_id: deploy_id.to_string(),
                memory: 256 * MB,
                ports: vec![8080],
            })
        }

        async fn run_task(
            &self,
            environment_id: &str,
            task_id: &str,
            _: &str,
            copies: u32,
            _: &[ContainerOverride],
        ) -> Result<(), ClusterError> {
            let mut free = self.free_slots.lock().unwrap();
            if *free < copies {
                return Err(ClusterError::CapacityExhausted);
            }
            *free -= copies;
            self.run_calls.lock().unwrap().push((
                environment_id.to_string(),
                task_id.to_string(),
                copies,
            ));
            Ok(())
        }
    }

    /// Provider manager that never has hosts; enough for dispatcher wiring.
    struct NoProviders;

    #[async_trait]
    impl ProviderManager for NoProviders {
        async fn get_providers(&self, _: &str) -> anyhow::Result<Vec<ResourceProvider>> {
            Ok(Vec::new())
        }

        async fn calculate_new_provider(&self, _: &str) -> anyhow::Result<ResourceProvider> {
            Ok(ResourceProvider::new("i-new", false, 1 << 30, []))
        }

        async fn scale_to(
            &self,
            _: &str,
            desired: u32,
            _: &[ResourceProvider],
        ) -> anyhow::Result<u32> {
            Ok(desired)
        }
    }

    fn manager(free_slots: u32) -> (TaskManager, Arc<SlotCluster>, Arc<ScheduleDispatcher>) {
        let cluster = Arc::new(SlotCluster::new(free_slots));
        let demand = Arc::new(DemandStore::new());
        let scaler = Arc::new(EnvironmentScaler::new(
            Arc::clone(&demand) as Arc<dyn ConsumerGetter>,
            Arc::new(NoProviders),
        ));
        let dispatcher = Arc::new(ScheduleDispatcher::new(scaler));
        let manager = TaskManager::new(
            Arc::clone(&cluster) as Arc<dyn ClusterClient>,
            demand,
            Arc::clone(&dispatcher),
        );
        (manager, cluster, dispatcher)
    }

    fn request(environment_id: &str, copies: u32) -> CreateTaskRequest {
        CreateTaskRequest {
            environment_id: environment_id.to_string(),
            deploy_id: "dpl-1".to_string(),
            task_name: "job".to_string(),
            copies,
            container_overrides: Vec::new(),
        }
    }

    #[tokio::test]
    async fn rejects_missing_parameters() {
        let (manager, _, _) = manager(1);

        let mut req = request("env", 1);
        req.environment_id = String::new();
        assert!(matches!(
            manager.create_task(req).await,
            Err(TaskError::MissingParameter("environment_id"))
        ));

        let mut req = request("env", 1);
        req.deploy_id = String::new();
        assert!(matches!(
            manager.create_task(req).await,
            Err(TaskError::MissingParameter("deploy_id"))
        ));

        let mut req = request("env", 1);
        req.task_name = String::new();
        assert!(matches!(
            manager.create_task(req).await,
            Err(TaskError::MissingParameter("task_name"))
        ));
    }

    #[tokio::test]
    async fn places_a_task_when_the_cluster_has_room() {
        let (manager, cluster, dispatcher) = manager(1);

        let task = manager.create_task(request("env", 1)).await.unwrap();

        assert_eq!(task.status, TaskStatus::Running);
        assert!(task.task_id.starts_with("tsk-"));
        assert_eq!(cluster.run_calls().len(), 1);
        assert!(manager.pending_tasks("env").await.is_empty());
        assert!(!dispatcher.is_armed("env").await);
    }

    #[tokio::test]
    async fn zero_copies_is_treated_as_one() {
        let (manager, cluster, _) = manager(1);

        let task = manager.create_task(request("env", 0)).await.unwrap();

        assert_eq!(task.copies, 1);
        assert_eq!(cluster.run_calls()[0].2, 1);
    }

    #[tokio::test]
    async fn capacity_miss_parks_the_task_and_arms_the_dispatcher() {
        let (manager, cluster, dispatcher) = manager(0);

        let task = manager.create_task(request("env", 1)).await.unwrap();

        assert_eq!(task.status, TaskStatus::Pending);
        assert!(cluster.run_calls().is_empty());

        let parked = manager.pending_tasks("env").await;
        assert_eq!(parked.len(), 1);
        assert_eq!(parked[0].task_id, task.task_id);
        assert_eq!(parked[0].memory, 256 * MB);
        assert_eq!(parked[0].ports, vec![8080]);

        assert!(dispatcher.is_armed("env").await);
    }

    #[tokio::test]
    async fn deploy_lookup_failure_surfaces() {
        let (manager, _, _) = manager(1);

        let mut req = request("env", 1);
        req.deploy_id = "dpl-missing".to_string();

        assert!(matches!(
            manager.create_task(req).await,
            Err(TaskError::Cluster(ClusterError::DeployNotFound(_)))
        ));
    }

    #[tokio::test]
    async fn run_pending_places_parked_tasks() {
        let (manager, cluster, _) = manager(0);
        manager.create_task(request("env", 1)).await.unwrap();
        manager.create_task(request("env", 1)).await.unwrap();

        cluster.grant_slots(2);
        let placed = manager.run_pending("env").await.unwrap();

        assert_eq!(placed, 2);
        assert!(manager.pending_tasks("env").await.is_empty());
        assert_eq!(cluster.run_calls().len(), 2);
    }

    #[tokio::test]
    async fn run_pending_reparks_what_still_does_not_fit() {
        let (manager, cluster, dispatcher) = manager(0);
        manager.create_task(request("env", 1)).await.unwrap();
        manager.create_task(request("env", 1)).await.unwrap();

        cluster.grant_slots(1);
        let placed = manager.run_pending("env").await.unwrap();

        assert_eq!(placed, 1);
        assert_eq!(manager.pending_tasks("env").await.len(), 1);
        assert!(dispatcher.is_armed("env").await);
    }

    #[tokio::test]
    async fn run_pending_with_nothing_parked_is_a_noop() {
        let (manager, cluster, _) = manager(1);
        assert_eq!(manager.run_pending("env").await.unwrap(), 0);
        assert!(cluster.run_calls().is_empty());
    }

    #[tokio::test]
    async fn config_sets_the_capacity_miss_delay() {
        let config = Layer0Config {
            scaler: Some(layer0_core::config::ScalerConfig {
                run_delay: None,
                capacity_miss_delay: Some("250ms".to_string()),
            }),
            cluster: None,
        };

        let (manager, _, _) = manager(0);
        let manager = manager.with_config(&config);

        assert_eq!(manager.capacity_miss_delay, Duration::from_millis(250));
    }

    #[tokio::test]
    async fn cancel_pending_removes_the_task() {
        let (manager, _, _) = manager(0);
        let task = manager.create_task(request("env", 1)).await.unwrap();

        manager.cancel_pending(&task.task_id).await.unwrap();
        assert!(manager.pending_tasks("env").await.is_empty());

        assert!(matches!(
            manager.cancel_pending(&task.task_id).await,
            Err(TaskError::NotFound(_))
        ));
    }
}
