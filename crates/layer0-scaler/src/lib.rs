//! layer0-scaler — environment capacity scaling.
//!
//! Decides how many container hosts an environment needs by bin-packing
//! its demand (pending tasks plus unsatisfied service replicas) into its
//! current hosts, and coalesces bursts of run requests into debounced
//! passes:
//!
//! ```text
//! ScheduleDispatcher
//!   └── per-environment timer task (re-armable delay)
//!         └── EnvironmentScaler::scale
//!               ├── ConsumerGetter   (demand snapshot)
//!               ├── ProviderManager  (host snapshot, fresh-host sizing)
//!               └── ProviderManager::scale_to (realize the new count)
//! ```
//!
//! A pass owns its snapshots outright, so the packing algorithm itself is
//! single-threaded and lock-free; only the dispatcher registry is shared.

pub mod dispatcher;
pub mod error;
pub mod scaler;
pub mod sources;

pub use dispatcher::ScheduleDispatcher;
pub use error::{ScalerError, ScalerResult};
pub use scaler::{EnvironmentScaler, ScaleOutcome};
pub use sources::{ConsumerGetter, ProviderManager};
