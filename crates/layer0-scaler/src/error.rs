//! Scaler error types.

use thiserror::Error;

/// Errors from a scaling pass.
///
/// The fetch variants abort a pass; `UnfittableConsumer` and `ScaleApply`
/// are collected into the pass outcome so the reporting record is still
/// produced.
#[derive(Debug, Error)]
pub enum ScalerError {
    #[error("failed to list resource providers for environment '{environment_id}': {source}")]
    ProviderFetch {
        environment_id: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to list resource consumers for environment '{environment_id}': {source}")]
    ConsumerFetch {
        environment_id: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to size a fresh provider for environment '{environment_id}': {source}")]
    NewProvider {
        environment_id: String,
        #[source]
        source: anyhow::Error,
    },

    #[error(
        "resource '{consumer_id}' cannot fit into an empty provider; \
         increase the instance size for your environment"
    )]
    UnfittableConsumer { consumer_id: String },

    #[error("failed to scale environment '{environment_id}' to {desired} providers: {source}")]
    ScaleApply {
        environment_id: String,
        desired: u32,
        #[source]
        source: anyhow::Error,
    },
}

pub type ScalerResult<T> = Result<T, ScalerError>;
