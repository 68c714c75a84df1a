/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::time::Duration;

const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(100);
const DEFAULT_MAX_ATTEMPTS: u32 = 7;

/// Retry policy for individual part transfers.
///
/// A part that fails is retried after `base_delay * 2^attempts`, where `attempts` is the number
/// of attempts made so far. Once a part has failed `max_attempts` times the whole upload fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    base_delay: Duration,
    max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: DEFAULT_BASE_DELAY,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl RetryPolicy {
    /// Create a new policy. `max_attempts` is raised to at least 1.
    pub fn new(base_delay: Duration, max_attempts: u32) -> Self {
        Self {
            base_delay,
            max_attempts: max_attempts.max(1),
        }
    }

    /// The delay the backoff doubles from
    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// Total attempts (first try included) a part gets before the upload fails
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before the next attempt of a part that has failed `attempts` times, or `None` if
    /// the part has used up its budget.
    pub(crate) fn backoff(&self, attempts: u32) -> Option<Duration> {
        if attempts >= self.max_attempts {
            return None;
        }
        let factor = 1u32.checked_shl(attempts).unwrap_or(u32::MAX);
        Some(self.base_delay.saturating_mul(factor))
    }
}
