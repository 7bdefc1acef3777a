//! `clock_time_get`/`clock_res_get` (§4.E).

use crate::error::{Errno, Result, WasiError};
use crate::types::ClockId;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Clock access is abstracted so tests can fake `Realtime`/`Monotonic`
/// without depending on wall-clock time (§1.1 ambient test tooling).
pub trait Clock: Send + Sync {
    fn now(&self, id: ClockId) -> Result<u64>;
    fn resolution(&self, id: ClockId) -> Result<u64>;
}

/// The real system clock, backed by `std::time`.
pub struct SystemClock {
    monotonic_origin: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        SystemClock {
            monotonic_origin: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self, id: ClockId) -> Result<u64> {
        match id {
            ClockId::Realtime => {
                let dur = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map_err(|_| WasiError::new(Errno::Io))?;
                Ok(dur.as_nanos() as u64)
            }
            ClockId::Monotonic => Ok(self.monotonic_origin.elapsed().as_nanos() as u64),
            ClockId::ProcessCputimeId | ClockId::ThreadCputimeId => Err(WasiError::new(Errno::Notsup)),
        }
    }

    fn resolution(&self, id: ClockId) -> Result<u64> {
        match id {
            // A conservative ~1ms: `std::time` doesn't expose the host's
            // actual timer resolution, and claiming nanosecond precision
            // would overstate what either clock can actually guarantee.
            ClockId::Realtime | ClockId::Monotonic => Ok(1_000_000),
            ClockId::ProcessCputimeId | ClockId::ThreadCputimeId => Err(WasiError::new(Errno::Notsup)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monotonic_advances() {
        let clock = SystemClock::new();
        let a = clock.now(ClockId::Monotonic).unwrap();
        let b = clock.now(ClockId::Monotonic).unwrap();
        assert!(b >= a);
    }

    #[test]
    fn cputime_clocks_are_not_supported() {
        let clock = SystemClock::new();
        assert_eq!(
            clock.now(ClockId::ProcessCputimeId).unwrap_err().errno,
            Errno::Notsup
        );
    }
}
