//! layer0-resource — capacity accounting for hosts and workloads.
//!
//! A `ResourceProvider` is the remaining capacity of one container host
//! (free memory plus the set of bound ports); a `ResourceConsumer` is one
//! unit of demand (a task copy or a service replica). The scaler packs
//! consumers into providers through two operations:
//!
//! - `has_resources_for` — can this host take this workload?
//! - `subtract_resources_for` — claim the workload's memory and ports
//!
//! Both types are plain values owned by the scaling pass that built them,
//! so there is no locking anywhere in this crate.

pub mod consumer;
pub mod error;
pub mod provider;

pub use consumer::ResourceConsumer;
pub use error::{ResourceError, ResourceResult};
pub use provider::{ResourceProvider, pack_order};
