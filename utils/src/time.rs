//! Utilities for working with time.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Extension trait for [SystemTime].
pub trait SystemTimeExt {
    /// Returns the duration elapsed since the Unix epoch.
    ///
    /// Panics if the time is before the Unix epoch (i.e. the system clock is
    /// badly misconfigured).
    fn epoch(&self) -> Duration;

    /// Returns the number of milliseconds elapsed since the Unix epoch,
    /// saturating at `u64::MAX`.
    fn epoch_millis(&self) -> u64;
}

impl SystemTimeExt for SystemTime {
    fn epoch(&self) -> Duration {
        self.duration_since(UNIX_EPOCH)
            .expect("time is before the Unix epoch")
    }

    fn epoch_millis(&self) -> u64 {
        u64::try_from(self.epoch().as_millis()).unwrap_or(u64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch_millis() {
        let time = UNIX_EPOCH + Duration::from_millis(1_234);
        assert_eq!(time.epoch(), Duration::from_millis(1_234));
        assert_eq!(time.epoch_millis(), 1_234);
    }
}
