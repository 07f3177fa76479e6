//! Small time helpers shared by the scan queue (leases, backoff) and the event envelope
//! (RFC3339 timestamps, §6.2/§6.3).

use chrono::{DateTime, Utc};

pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// The scan-queue backoff schedule fixed by §4.3/§6.2: attempt `n` (1-indexed) uses entry `n-1`.
/// Attempts beyond the table length saturate on the last entry; callers are expected to dead-letter
/// before that happens (5 attempts, per §4.3).
pub const BACKOFF_SCHEDULE_SECS: [u64; 5] = [30, 120, 600, 3600, 21600];

pub fn backoff_for_attempt(attempt: u32) -> std::time::Duration {
    let idx = attempt.saturating_sub(1) as usize;
    let secs = BACKOFF_SCHEDULE_SECS
        .get(idx)
        .copied()
        .unwrap_or(*BACKOFF_SCHEDULE_SECS.last().unwrap());
    std::time::Duration::from_secs(secs)
}

pub const MAX_SCAN_ATTEMPTS: u32 = 5;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_matches_fixed_schedule() {
        assert_eq!(backoff_for_attempt(1).as_secs(), 30);
        assert_eq!(backoff_for_attempt(2).as_secs(), 120);
        assert_eq!(backoff_for_attempt(3).as_secs(), 600);
        assert_eq!(backoff_for_attempt(4).as_secs(), 3600);
        assert_eq!(backoff_for_attempt(5).as_secs(), 21600);
    }

    #[test]
    fn backoff_saturates_past_schedule() {
        assert_eq!(backoff_for_attempt(99).as_secs(), 21600);
    }
}
