//! upkeep-cluster — warm-standby failover for upkeep.
//!
//! Two replicas, no consensus: the leader always runs active, the
//! follower probes the leader's `/api/health` endpoint and flips the
//! engine-wide active flag after sustained unreachability.
//!
//! ```text
//! Coordinator (follower)
//!   └── probe loop (5s period, 2s timeout)
//!         └── FailoverTracker (3 consecutive misses → ToActive,
//!                              first healthy probe → ToPassive)
//! ```

pub mod coordinator;
pub mod tracker;

pub use coordinator::{ClusterConfig, ClusterMode, Coordinator};
pub use tracker::{FailoverTracker, Flip, FAILOVER_THRESHOLD};
