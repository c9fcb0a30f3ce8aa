//! Task manager error types.

use thiserror::Error;

use crate::cluster::ClusterError;

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("required parameter '{0}' is missing")]
    MissingParameter(&'static str),

    #[error("task not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Cluster(#[from] ClusterError),
}

pub type TaskResult<T> = Result<T, TaskError>;
