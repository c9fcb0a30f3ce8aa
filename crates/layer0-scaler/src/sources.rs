//! Capability seams through which the scaler reaches the platform.
//!
//! Production implementations query the cloud APIs; tests use in-memory
//! ones. The scaler holds no locks across any of these calls.

use async_trait::async_trait;
use layer0_resource::{ResourceConsumer, ResourceProvider};

/// Enumerates an environment's demand: pending tasks plus unsatisfied
/// service replicas.
#[async_trait]
pub trait ConsumerGetter: Send + Sync {
    async fn get_consumers(&self, environment_id: &str) -> anyhow::Result<Vec<ResourceConsumer>>;
}

/// Enumerates and resizes an environment's container host fleet.
#[async_trait]
pub trait ProviderManager: Send + Sync {
    /// Current hosts with their remaining memory and bound ports.
    async fn get_providers(&self, environment_id: &str) -> anyhow::Result<Vec<ResourceProvider>>;

    /// Prototype of a fresh, empty host sized for this environment's
    /// configured instance type.
    async fn calculate_new_provider(&self, environment_id: &str)
    -> anyhow::Result<ResourceProvider>;

    /// Resize the fleet to `desired` hosts. `unused` lists the hosts that
    /// ended the pass idle and are safe to terminate. Returns the count the
    /// platform actually settled on, which may be clamped.
    async fn scale_to(
        &self,
        environment_id: &str,
        desired: u32,
        unused: &[ResourceProvider],
    ) -> anyhow::Result<u32>;
}
