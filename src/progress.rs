//! Shared run counters and the optional terminal spinner that displays them.

use crate::types::SyncSummary;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Counters shared between the lister and all workers.
pub struct SyncProgress {
    listed: AtomicU64,
    downloaded: AtomicU64,
    failed: AtomicU64,
    bytes: AtomicU64,
    bar: ProgressBar,
}

impl SyncProgress {
    /// Creates counters with a spinner drawn on stderr.
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg} | {elapsed_precise} elapsed")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.enable_steady_tick(Duration::from_millis(100));
        Self::with_bar(bar)
    }

    /// Creates counters without any terminal output.
    pub fn hidden() -> Self {
        Self::with_bar(ProgressBar::hidden())
    }

    fn with_bar(bar: ProgressBar) -> Self {
        Self {
            listed: AtomicU64::new(0),
            downloaded: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            bytes: AtomicU64::new(0),
            bar,
        }
    }

    /// Adds a page's object count; returns the new total.
    pub fn record_listed(&self, count: u64) -> u64 {
        let total = self.listed.fetch_add(count, Ordering::Relaxed) + count;
        self.refresh();
        total
    }

    /// Records one completed download; returns the new downloaded total.
    pub fn record_download(&self, bytes: u64) -> u64 {
        self.bytes.fetch_add(bytes, Ordering::Relaxed);
        let total = self.downloaded.fetch_add(1, Ordering::Relaxed) + 1;
        self.refresh();
        total
    }

    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        self.refresh();
    }

    pub fn listed(&self) -> u64 {
        self.listed.load(Ordering::Relaxed)
    }

    pub fn downloaded(&self) -> u64 {
        self.downloaded.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn bytes(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }

    fn refresh(&self) {
        if self.bar.is_hidden() {
            return;
        }
        let failed = self.failed();
        let mut msg = format!(
            "Downloaded {}/{} objects ({})",
            self.downloaded(),
            self.listed(),
            indicatif::HumanBytes(self.bytes())
        );
        if failed > 0 {
            msg.push_str(&format!(", {} failed", failed));
        }
        self.bar.set_message(msg);
    }

    /// Stops the spinner and snapshots the counters.
    pub fn finish(&self, retired_workers: usize) -> SyncSummary {
        self.bar.finish_and_clear();
        SyncSummary {
            listed: self.listed(),
            downloaded: self.downloaded(),
            failed: self.failed(),
            bytes: self.bytes(),
            retired_workers,
        }
    }
}

impl Default for SyncProgress {
    fn default() -> Self {
        Self::hidden()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_counters_accumulate() {
        let progress = SyncProgress::hidden();
        assert_eq!(progress.record_listed(3), 3);
        assert_eq!(progress.record_listed(2), 5);
        assert_eq!(progress.record_download(100), 1);
        assert_eq!(progress.record_download(50), 2);
        progress.record_failure();

        let summary = progress.finish(1);
        assert_eq!(
            summary,
            SyncSummary {
                listed: 5,
                downloaded: 2,
                failed: 1,
                bytes: 150,
                retired_workers: 1,
            }
        );
    }

    #[test]
    fn test_concurrent_increments_are_not_lost() {
        let progress = Arc::new(SyncProgress::hidden());
        let handles: Vec<_> = (0..10)
            .map(|_| {
                let progress = Arc::clone(&progress);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        progress.record_download(2);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(progress.downloaded(), 10_000);
        assert_eq!(progress.bytes(), 20_000);
    }
}
