//! Transfer progress reporting
//!
//! Progress is a finite, non-restartable sequence of integer percentages
//! (0-100) computed from transferred byte counts. The consumer holds the
//! receiving half; dropping it stops reporting without affecting the
//! transfer itself.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;

/// Sentinel for "nothing reported yet".
const UNREPORTED: u8 = u8::MAX;

/// Create a progress channel. Hand the [`ProgressSender`] to an upload or
/// download call; consume percentages from [`ProgressEvents`].
pub fn progress_channel() -> (ProgressSender, ProgressEvents) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        ProgressSender { tx, last: Arc::new(AtomicU8::new(UNREPORTED)) },
        ProgressEvents { rx },
    )
}

/// Producing half of a progress channel. Emitted percentages are
/// deduplicated and strictly non-decreasing; a completed transfer always
/// ends on 100.
#[derive(Clone)]
pub struct ProgressSender {
    tx: mpsc::UnboundedSender<u8>,
    last: Arc<AtomicU8>,
}

impl ProgressSender {
    /// Report `transferred` of `total` bytes. Out-of-order or repeated
    /// values are dropped so consumers only ever see forward movement.
    pub(crate) fn report(&self, transferred: u64, total: u64) {
        self.emit(percent(transferred, total));
    }

    /// Mark the transfer complete. Emits the final 100 if it has not been
    /// reached through byte counts already.
    pub(crate) fn finish(&self) {
        self.emit(100);
    }

    fn emit(&self, pct: u8) {
        let last = self.last.load(Ordering::Relaxed);
        if last != UNREPORTED && pct <= last {
            return;
        }
        self.last.store(pct, Ordering::Relaxed);
        // Receiver may be gone; the transfer goes on regardless.
        let _ = self.tx.send(pct);
    }
}

/// Consuming half of a progress channel.
pub struct ProgressEvents {
    rx: mpsc::UnboundedReceiver<u8>,
}

impl ProgressEvents {
    /// Next percentage, or `None` once the transfer's sender is gone.
    pub async fn next(&mut self) -> Option<u8> {
        self.rx.recv().await
    }

    /// Drain the remaining sequence. Only returns once the sender side has
    /// been dropped.
    pub async fn collect(mut self) -> Vec<u8> {
        let mut out = Vec::new();
        while let Some(pct) = self.rx.recv().await {
            out.push(pct);
        }
        out
    }
}

fn percent(transferred: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    ((transferred.min(total).saturating_mul(100)) / total) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_bounds() {
        assert_eq!(percent(0, 200), 0);
        assert_eq!(percent(50, 200), 25);
        assert_eq!(percent(200, 200), 100);
        // Overshoot (e.g. unknown content-length) clamps at 100.
        assert_eq!(percent(300, 200), 100);
        assert_eq!(percent(0, 0), 100);
    }

    #[tokio::test]
    async fn test_progress_is_monotonic_and_deduplicated() {
        let (tx, events) = progress_channel();
        tx.report(0, 100);
        tx.report(30, 100);
        tx.report(30, 100); // duplicate
        tx.report(20, 100); // regression, dropped
        tx.report(75, 100);
        tx.finish();
        tx.finish(); // idempotent
        drop(tx);

        let seen = events.collect().await;
        assert_eq!(seen, vec![0, 30, 75, 100]);
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
    }

    #[tokio::test]
    async fn test_finish_alone_yields_single_100() {
        let (tx, events) = progress_channel();
        tx.finish();
        drop(tx);
        assert_eq!(events.collect().await, vec![100]);
    }

    #[tokio::test]
    async fn test_dropped_receiver_does_not_panic_sender() {
        let (tx, events) = progress_channel();
        drop(events);
        tx.report(10, 100);
        tx.finish();
    }
}
