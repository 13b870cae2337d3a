//! Failover decision state.
//!
//! Tracks consecutive leader health-probe failures for a follower and
//! decides when to flip the engine between passive and active.

/// Consecutive failed probes before a follower takes over.
///
/// Two misses can be a single GC pause or a transient partition; three
/// means at least ten seconds of sustained unreachability at the default
/// five-second period.
pub const FAILOVER_THRESHOLD: u32 = 3;

/// A mode change decided by the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flip {
    /// Leader unreachable long enough; take over probing and alerting.
    ToActive,
    /// Leader is back; yield.
    ToPassive,
}

/// Tracks consecutive probe results against the leader.
///
/// Starts passive (the follower defers to the leader until proven
/// otherwise).
#[derive(Debug)]
pub struct FailoverTracker {
    consecutive_failures: u32,
    threshold: u32,
    active: bool,
}

impl FailoverTracker {
    pub fn new(threshold: u32) -> Self {
        Self {
            consecutive_failures: 0,
            threshold,
            active: false,
        }
    }

    /// Record one probe result and return the flip to apply, if any.
    pub fn record(&mut self, leader_healthy: bool) -> Option<Flip> {
        if leader_healthy {
            self.consecutive_failures = 0;
            if self.active {
                self.active = false;
                return Some(Flip::ToPassive);
            }
            None
        } else {
            self.consecutive_failures += 1;
            if self.consecutive_failures >= self.threshold && !self.active {
                self.active = true;
                return Some(Flip::ToActive);
            }
            None
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }
}

impl Default for FailoverTracker {
    fn default() -> Self {
        Self::new(FAILOVER_THRESHOLD)
    }
}
