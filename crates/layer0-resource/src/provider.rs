//! Remaining capacity of one container host.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use layer0_core::types::ResourceProviderModel;

use crate::consumer::ResourceConsumer;
use crate::error::{ResourceError, ResourceResult};

/// Free memory and bound ports of one container host.
///
/// A provider is owned by the single scaling pass that built it; `in_use`
/// tracks whether it has held or received any consumer since construction.
/// Hosts that arrive already running workloads start with `in_use = true`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceProvider {
    id: String,
    available_memory: u64,
    used_ports: BTreeSet<u16>,
    in_use: bool,
}

impl ResourceProvider {
    pub fn new(
        id: impl Into<String>,
        in_use: bool,
        available_memory: u64,
        used_ports: impl IntoIterator<Item = u16>,
    ) -> Self {
        Self {
            id: id.into(),
            available_memory,
            used_ports: used_ports.into_iter().collect(),
            in_use,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn available_memory(&self) -> u64 {
        self.available_memory
    }

    pub fn is_in_use(&self) -> bool {
        self.in_use
    }

    /// True iff the consumer's memory fits and none of its ports collide.
    ///
    /// A consumer with zero memory and no ports always fits.
    pub fn has_resources_for(&self, consumer: &ResourceConsumer) -> bool {
        consumer.memory() <= self.available_memory
            && consumer.ports().iter().all(|p| !self.used_ports.contains(p))
    }

    /// Assign the consumer to this host, claiming its memory and ports.
    ///
    /// Fails without touching state when the consumer does not fit.
    pub fn subtract_resources_for(&mut self, consumer: &ResourceConsumer) -> ResourceResult<()> {
        if consumer.memory() > self.available_memory {
            return Err(ResourceError::InsufficientMemory {
                needed: consumer.memory(),
                available: self.available_memory,
            });
        }

        if let Some(&port) = consumer.ports().iter().find(|p| self.used_ports.contains(*p)) {
            return Err(ResourceError::PortConflict(port));
        }

        self.available_memory -= consumer.memory();
        self.used_ports.extend(consumer.ports().iter().copied());
        self.in_use = true;
        Ok(())
    }

    /// Reporting snapshot.
    pub fn to_model(&self) -> ResourceProviderModel {
        ResourceProviderModel {
            id: self.id.clone(),
            in_use: self.in_use,
            available_memory: self.available_memory,
            used_ports: self.used_ports.iter().copied().collect(),
        }
    }
}

/// Packing order for a provider scan: tightest free memory first, and on
/// equal memory a host already in use beats an idle one, so new demand
/// concentrates and idle hosts stay eligible for teardown.
pub fn pack_order(a: &ResourceProvider, b: &ResourceProvider) -> Ordering {
    a.available_memory
        .cmp(&b.available_memory)
        .then_with(|| b.in_use.cmp(&a.in_use))
}
