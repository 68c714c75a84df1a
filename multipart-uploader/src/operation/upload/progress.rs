/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::collections::HashMap;

use crate::transport::ProgressEvent;
use crate::types::UploadProgress;

/// Highest percentage reported before the session is committed
const MAX_UNSETTLED_PERCENTAGE: u8 = 99;

#[derive(Debug, Clone, Copy)]
struct InFlight {
    dispatch_id: u64,
    bytes_sent: u64,
}

/// Aggregates byte counts of completed and in-flight parts.
///
/// Counters are keyed by part number and tagged with the dispatch id of the attempt that owns
/// them, so reports from a cancelled or superseded attempt are dropped.
#[derive(Debug)]
pub(super) struct ProgressTracker {
    total: u64,
    confirmed: u64,
    in_flight: HashMap<u64, InFlight>,
    last_reported: Option<UploadProgress>,
}

impl ProgressTracker {
    pub(super) fn new(total: u64) -> Self {
        Self {
            total,
            confirmed: 0,
            in_flight: HashMap::new(),
            last_reported: None,
        }
    }

    /// A new attempt of `part_number` started; its counter starts from zero.
    pub(super) fn start(&mut self, part_number: u64, dispatch_id: u64) {
        self.in_flight.insert(
            part_number,
            InFlight {
                dispatch_id,
                bytes_sent: 0,
            },
        );
    }

    pub(super) fn update(&mut self, event: ProgressEvent) {
        if let Some(entry) = self.in_flight.get_mut(&event.part_number) {
            if entry.dispatch_id == event.dispatch_id {
                entry.bytes_sent = event.bytes_sent;
            }
        }
    }

    /// The attempt finished successfully, `len` bytes are now confirmed.
    pub(super) fn complete(&mut self, part_number: u64, dispatch_id: u64, len: u64) {
        self.discard(part_number, dispatch_id);
        self.confirmed += len;
    }

    /// The attempt failed, forget whatever it reported.
    pub(super) fn discard(&mut self, part_number: u64, dispatch_id: u64) {
        if let Some(entry) = self.in_flight.get(&part_number) {
            if entry.dispatch_id == dispatch_id {
                self.in_flight.remove(&part_number);
            }
        }
    }

    /// Current progress. The percentage stays below 100 until [`settled`](Self::settled).
    pub(super) fn snapshot(&self) -> UploadProgress {
        let in_flight: u64 = self.in_flight.values().map(|e| e.bytes_sent).sum();
        let sent = self.confirmed.saturating_add(in_flight).min(self.total);
        UploadProgress {
            sent,
            total: self.total,
            percentage: percentage(sent, self.total).min(MAX_UNSETTLED_PERCENTAGE),
        }
    }

    /// Progress once the session has been committed
    pub(super) fn settled(&self) -> UploadProgress {
        UploadProgress {
            sent: self.confirmed.min(self.total),
            total: self.total,
            percentage: 100,
        }
    }

    /// Returns the current snapshot if it differs from the last one returned.
    pub(super) fn changed(&mut self) -> Option<UploadProgress> {
        let snapshot = self.snapshot();
        if self.last_reported == Some(snapshot) {
            return None;
        }
        self.last_reported = Some(snapshot);
        Some(snapshot)
    }
}

fn percentage(sent: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    ((sent as f64 / total as f64) * 100.0).round() as u8
}

#[cfg(test)]
mod test {
    use super::ProgressTracker;
    use crate::transport::ProgressEvent;

    fn event(part_number: u64, dispatch_id: u64, bytes_sent: u64) -> ProgressEvent {
        ProgressEvent {
            part_number,
            dispatch_id,
            bytes_sent,
        }
    }

    #[test]
    fn test_sent_is_confirmed_plus_in_flight() {
        let mut tracker = ProgressTracker::new(1000);
        tracker.start(1, 1);
        tracker.start(2, 2);
        tracker.update(event(1, 1, 100));
        tracker.update(event(2, 2, 150));
        assert_eq!(250, tracker.snapshot().sent());
        assert_eq!(25, tracker.snapshot().percentage());

        tracker.complete(1, 1, 400);
        assert_eq!(550, tracker.snapshot().sent());
    }

    #[test]
    fn test_retry_resets_in_flight_counter() {
        let mut tracker = ProgressTracker::new(1000);
        tracker.start(1, 1);
        tracker.update(event(1, 1, 300));
        assert_eq!(300, tracker.snapshot().sent());

        tracker.discard(1, 1);
        tracker.start(1, 2);
        // late report from the failed attempt is ignored
        tracker.update(event(1, 1, 350));
        assert_eq!(0, tracker.snapshot().sent());
        tracker.update(event(1, 2, 10));
        assert_eq!(10, tracker.snapshot().sent());
    }

    #[test]
    fn test_clamped_and_capped_until_settled() {
        let mut tracker = ProgressTracker::new(100);
        tracker.start(1, 1);
        tracker.update(event(1, 1, 150));
        let snapshot = tracker.snapshot();
        assert_eq!(100, snapshot.sent());
        assert_eq!(99, snapshot.percentage());

        tracker.complete(1, 1, 150);
        assert_eq!(100, tracker.settled().percentage());
        assert_eq!(100, tracker.settled().sent());
    }

    #[test]
    fn test_changed_only_reports_differences() {
        let mut tracker = ProgressTracker::new(10);
        assert!(tracker.changed().is_some());
        assert!(tracker.changed().is_none());
        tracker.start(1, 1);
        assert!(tracker.changed().is_none());
        tracker.update(event(1, 1, 5));
        assert_eq!(50, tracker.changed().unwrap().percentage());
    }

    #[test]
    fn test_empty_total() {
        let tracker = ProgressTracker::new(0);
        assert_eq!(0, tracker.snapshot().percentage());
        assert_eq!(100, tracker.settled().percentage());
    }
}
