use std::sync::atomic::{AtomicBool, Ordering};

use crate::channel_volume::DuckingInterface;

/// Runtime switch deciding whether channels may be ducked.
///
/// When ducking is not allowed the channel keeps playing at its unducked
/// volume while another source has focus.
pub struct DuckingPolicy {
    may_duck: AtomicBool,
}

impl DuckingPolicy {
    pub fn new(may_duck: bool) -> Self {
        Self {
            may_duck: AtomicBool::new(may_duck),
        }
    }

    pub fn set_ducking_allowed(&self, allowed: bool) {
        let previous = self.may_duck.swap(allowed, Ordering::SeqCst);
        if previous != allowed {
            log::info!("Ducking {}", if allowed { "enabled" } else { "disabled" });
        }
    }
}

impl DuckingInterface for DuckingPolicy {
    fn is_ducking_allowed(&self) -> bool {
        self.may_duck.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle() {
        let policy = DuckingPolicy::new(true);
        assert!(policy.is_ducking_allowed());
        policy.set_ducking_allowed(false);
        assert!(!policy.is_ducking_allowed());
        policy.set_ducking_allowed(true);
        assert!(policy.is_ducking_allowed());
    }
}
