//! Resilience defaults for external service calls
//!
//! Timeout defaults and the jitter-free bounded backoff policy used by the
//! renewal state machine and session setup.

pub mod timeout {
    //! Timeout configuration for external service calls

    use std::time::Duration;

    /// Default timeout for signing and stream-source requests.
    pub const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

    /// Default timeout for progress reports (best-effort, kept short).
    pub const PROGRESS_REPORT_TIMEOUT: Duration = Duration::from_secs(5);
}

pub mod retry {
    //! Bounded exponential backoff
    //!
    //! Deliberately jitter-free: each session renews on its own schedule
    //! keyed to its own credential, so there is no thundering herd to
    //! spread, and deterministic delays keep the state machine trivially
    //! testable under a virtual clock.

    use std::time::Duration;

    /// Bounded exponential backoff policy.
    #[derive(Debug, Clone, Copy)]
    pub struct BackoffPolicy {
        /// Delay before the second attempt. Attempt n waits `base * 2^n`.
        pub base: Duration,
        /// Hard cap on the computed delay.
        pub cap: Duration,
        /// Total number of attempts (initial call included).
        pub max_attempts: u32,
    }

    impl Default for BackoffPolicy {
        fn default() -> Self {
            Self {
                base: Duration::from_secs(2),
                cap: Duration::from_secs(30),
                max_attempts: 5,
            }
        }
    }

    impl BackoffPolicy {
        #[must_use]
        pub const fn new(base: Duration, cap: Duration, max_attempts: u32) -> Self {
            Self {
                base,
                cap,
                max_attempts,
            }
        }

        /// Delay to wait after a failed attempt (0-indexed).
        ///
        /// The shift is checked so misconfigured attempt counts saturate at
        /// the cap instead of overflowing.
        #[must_use]
        pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
            let multiplier = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
            self.base
                .checked_mul(multiplier)
                .unwrap_or(self.cap)
                .min(self.cap)
        }
    }
}
