//! Transient status of a user-initiated flow.

use serde::{Deserialize, Serialize};

/// Status shown next to a purchase or resale control
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FlowStatus {
    /// Nothing in flight
    #[default]
    Idle,
    /// Transaction submitted, waiting for confirmation
    Processing,
    /// Last action succeeded
    Success(String),
    /// Last action failed
    Error(String),
}

impl FlowStatus {
    /// Returns `true` while a transaction is in flight
    #[must_use]
    pub const fn is_processing(&self) -> bool {
        matches!(self, Self::Processing)
    }

    /// Returns `true` when idle
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Message of a success or error status
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Success(message) | Self::Error(message) => Some(message),
            Self::Idle | Self::Processing => None,
        }
    }
}

/// A [`FlowStatus`] with a generation counter
///
/// Each status change bumps the epoch. A cooldown captures the epoch it was
/// scheduled for and resets only if nothing changed since, so the cooldown
/// of an earlier action cannot clear the status of a later one.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StatusTracker {
    status: FlowStatus,
    epoch: u64,
}

impl StatusTracker {
    /// Current status
    #[must_use]
    pub const fn status(&self) -> &FlowStatus {
        &self.status
    }

    /// Current epoch
    #[must_use]
    pub const fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Replace the status, returning the new epoch
    pub fn set(&mut self, status: FlowStatus) -> u64 {
        self.status = status;
        self.epoch += 1;
        self.epoch
    }

    /// Return to idle if `epoch` is still current
    pub fn reset_if_current(&mut self, epoch: u64) -> bool {
        if epoch == self.epoch {
            self.status = FlowStatus::Idle;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_reset_is_ignored() {
        let mut tracker = StatusTracker::default();
        let first = tracker.set(FlowStatus::Error("Sold out".into()));
        let second = tracker.set(FlowStatus::Processing);

        assert!(!tracker.reset_if_current(first));
        assert!(tracker.status().is_processing());

        assert!(tracker.reset_if_current(second));
        assert!(tracker.status().is_idle());
    }

    #[test]
    fn message_only_for_outcomes() {
        assert_eq!(FlowStatus::Success("done".into()).message(), Some("done"));
        assert_eq!(FlowStatus::Processing.message(), None);
    }
}
