//! Environment capacity scaler — first-fit packing with in-use preference.
//!
//! One `scale` pass snapshots the environment's hosts and demand, packs
//! every consumer into the tightest host that can hold it, sizes a fresh
//! host when nothing fits, then asks the provider manager to realize the
//! resulting count. Hosts that end the pass idle are offered for teardown.

use std::sync::Arc;

use tracing::{debug, warn};

use layer0_core::types::ScalerRunInfo;
use layer0_resource::{ResourceConsumer, ResourceProvider, pack_order};

use crate::error::{ScalerError, ScalerResult};
use crate::sources::{ConsumerGetter, ProviderManager};

/// Everything a completed pass produced: the reporting record plus any
/// non-fatal errors collected along the way.
#[derive(Debug)]
pub struct ScaleOutcome {
    pub info: ScalerRunInfo,
    /// Unfittable consumers and scale-apply failures, in occurrence order.
    pub errors: Vec<ScalerError>,
}

impl ScaleOutcome {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Per-environment bin-packing scaler.
///
/// A pass owns its provider and consumer snapshots outright; the only
/// shared state is behind the capability traits.
pub struct EnvironmentScaler {
    consumer_getter: Arc<dyn ConsumerGetter>,
    provider_manager: Arc<dyn ProviderManager>,
}

impl EnvironmentScaler {
    pub fn new(
        consumer_getter: Arc<dyn ConsumerGetter>,
        provider_manager: Arc<dyn ProviderManager>,
    ) -> Self {
        Self {
            consumer_getter,
            provider_manager,
        }
    }

    /// Run one packing pass for the environment.
    ///
    /// Fetch failures abort immediately. A consumer too large for even a
    /// fresh host is recorded and skipped; a `scale_to` failure is recorded
    /// after the plan has already been described in the returned info.
    pub async fn scale(&self, environment_id: &str) -> ScalerResult<ScaleOutcome> {
        let providers = self
            .provider_manager
            .get_providers(environment_id)
            .await
            .map_err(|source| ScalerError::ProviderFetch {
                environment_id: environment_id.to_string(),
                source,
            })?;

        let consumers = self
            .consumer_getter
            .get_consumers(environment_id)
            .await
            .map_err(|source| ScalerError::ConsumerFetch {
                environment_id: environment_id.to_string(),
                source,
            })?;

        self.run_pass(environment_id, providers, consumers).await
    }

    async fn run_pass(
        &self,
        environment_id: &str,
        mut providers: Vec<ResourceProvider>,
        consumers: Vec<ResourceConsumer>,
    ) -> ScalerResult<ScaleOutcome> {
        let scale_before_run = providers.len() as u32;
        let mut errors = Vec::new();

        debug!(
            %environment_id,
            providers = providers.len(),
            consumers = consumers.len(),
            "starting scaling pass"
        );

        for consumer in &consumers {
            // Tightest host first; on equal memory a host already in use
            // wins, so idle hosts drift to the back of the scan and remain
            // candidates for teardown.
            providers.sort_by(pack_order);

            let mut placed = false;
            for provider in providers.iter_mut() {
                if provider.has_resources_for(consumer)
                    && provider.subtract_resources_for(consumer).is_ok()
                {
                    debug!(consumer = %consumer.id(), provider = %provider.id(), "placed consumer");
                    placed = true;
                    break;
                }
            }

            if placed {
                continue;
            }

            let mut fresh = self
                .provider_manager
                .calculate_new_provider(environment_id)
                .await
                .map_err(|source| ScalerError::NewProvider {
                    environment_id: environment_id.to_string(),
                    source,
                })?;

            if !fresh.has_resources_for(consumer) {
                warn!(consumer = %consumer.id(), "consumer does not fit an empty provider");
                errors.push(ScalerError::UnfittableConsumer {
                    consumer_id: consumer.id().to_string(),
                });
                continue;
            }

            if fresh.subtract_resources_for(consumer).is_ok() {
                debug!(consumer = %consumer.id(), provider = %fresh.id(), "added provider for consumer");
                providers.push(fresh);
            }
        }

        let unused: Vec<ResourceProvider> = providers
            .iter()
            .filter(|p| !p.is_in_use())
            .cloned()
            .collect();
        let desired = (providers.len() - unused.len()) as u32;

        debug!(%environment_id, desired, unused = unused.len(), "applying scale decision");
        let actual = match self
            .provider_manager
            .scale_to(environment_id, desired, &unused)
            .await
        {
            Ok(actual) => actual,
            Err(source) => {
                errors.push(ScalerError::ScaleApply {
                    environment_id: environment_id.to_string(),
                    desired,
                    source,
                });
                // The fleet stays where it was.
                scale_before_run
            }
        };

        let info = ScalerRunInfo {
            environment_id: environment_id.to_string(),
            pending_resources: consumers.iter().map(ResourceConsumer::to_model).collect(),
            resource_providers: providers.iter().map(ResourceProvider::to_model).collect(),
            scale_before_run,
            desired_scale_after_run: desired,
            actual_scale_after_run: actual,
            unused_resource_providers: unused.len() as u32,
        };

        Ok(ScaleOutcome { info, errors })
    }
}
