//! upkeep-engine — the monitoring core of upkeep.
//!
//! Probes a configured set of targets, debounces transient failures
//! through a retry tolerance, and emits notifications on confirmed
//! status edges.
//!
//! # Architecture
//!
//! ```text
//! Engine (Arc, composition root)
//!   ├── supervisor task        discover store rows → adopt + spawn probe
//!   ├── probe task (per id)    http_probe / heartbeat::evaluate
//!   │     └── apply_outcome    debounce table + edge emissions
//!   ├── live map (RwLock)      MonitorState per observed monitor
//!   ├── active flag (atomic)   passive ⇒ idle probes, no alerts
//!   ├── LogRing                newest-first, bounded user-visible log
//!   └── AlertDispatcher        fire-and-forget provider sends
//! ```
//!
//! The live map is never held across network I/O; emission decisions are
//! made under the same lock as the state mutation, so for one monitor a
//! DOWN alert always precedes its RECOVERY.

pub mod engine;
pub mod heartbeat;
pub mod live;
pub mod log;
pub mod probe;
pub mod supervisor;
pub mod transition;

pub use engine::Engine;
pub use live::MonitorState;
pub use log::LogRing;
pub use probe::{CertInfo, ProbeOutcome};
