//! One-shot expiry timer for image stories
//!
//! The timer only records a deadline; the driver task turns it into a
//! `sleep_until` and reports back through `StoryPlayback::fire_timer`.

use std::time::Duration;
use story_common::time::secs_to_duration;
use tokio::time::Instant;

/// Roughly 30 years; stands in for intervals an `Instant` cannot represent
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ExpiryTimer {
    deadline: Option<Instant>,
}

impl ExpiryTimer {
    /// Arm the timer `after_secs` from `now`, replacing any pending deadline
    pub fn arm(&mut self, now: Instant, after_secs: f64) {
        self.deadline = now
            .checked_add(secs_to_duration(after_secs))
            .or_else(|| now.checked_add(FAR_FUTURE));
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Disarm and return true if the deadline has passed at `now`
    pub fn take_expired(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}
