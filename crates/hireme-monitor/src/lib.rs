//! The deadline-monitoring engine.
//!
//! A [`ScanScheduler`] fires one scan per period over the subscribers held in
//! a [`Registry`]. Each scan snapshots the registry, evaluates every reachable
//! record against the reminder window, deduplicates with a fresh
//! [`hireme_core::dedup::DedupTracker`] and hands survivors to the
//! [`Dispatcher`].
//!
//! ```rust,ignore
//! let registry  = Registry::new(graph);
//! let scheduler = ScanScheduler::new(registry.clone(), Arc::new(transport), &config, Arc::new(SystemClock));
//! scheduler.start();
//! // ...
//! scheduler.stop().await;
//! ```

pub mod clock;
pub mod config;
pub mod dispatcher;
pub mod registry;
pub mod scan;
pub mod scheduler;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::MonitorConfig;
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use registry::Registry;
pub use scan::{ScanContext, ScanReport, run_scan};
pub use scheduler::ScanScheduler;

#[cfg(test)]
mod tests;
