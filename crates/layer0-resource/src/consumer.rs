//! One unit of workload demand.

use layer0_core::types::ResourceConsumerModel;

use crate::error::{ResourceError, ResourceResult};

/// Memory and ports required by one task copy or service replica.
///
/// Immutable once built. Service replicas carry ids of the form
/// `"<service>/N"`; tasks carry their task id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceConsumer {
    id: String,
    memory: u64,
    ports: Vec<u16>,
}

impl ResourceConsumer {
    /// Build a consumer. Asking for the same port twice is illegal.
    pub fn new(id: impl Into<String>, memory: u64, ports: Vec<u16>) -> ResourceResult<Self> {
        let mut seen = std::collections::BTreeSet::new();
        for &port in &ports {
            if !seen.insert(port) {
                return Err(ResourceError::DuplicatePort(port));
            }
        }

        Ok(Self {
            id: id.into(),
            memory,
            ports,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn memory(&self) -> u64 {
        self.memory
    }

    pub fn ports(&self) -> &[u16] {
        &self.ports
    }

    /// Reporting snapshot.
    pub fn to_model(&self) -> ResourceConsumerModel {
        ResourceConsumerModel {
            id: self.id.clone(),
            memory: self.memory,
            ports: self.ports.clone(),
        }
    }
}
