use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::report::Outcome;

/// Live progress bar for a conversion run
///
/// Fed only by the aggregator thread; the counters are atomics so the
/// reporter can be shared by reference across the worker scope.
pub struct ConversionProgress {
    bar: ProgressBar,
    converted: AtomicUsize,
    failed: AtomicUsize,
    update_frequency: usize,
}

impl ConversionProgress {
    /// Progress bar on stderr (drawn only when stderr is a terminal)
    pub fn new(total: usize) -> Self {
        let style = ProgressStyle::with_template(
            "⚡ [{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} files {spinner} {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ");

        let bar = ProgressBar::new(total as u64);
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(100));

        Self::with_bar(bar)
    }

    /// Reporter that draws nothing
    pub fn hidden() -> Self {
        Self::with_bar(ProgressBar::hidden())
    }

    fn with_bar(bar: ProgressBar) -> Self {
        Self {
            bar,
            converted: AtomicUsize::new(0),
            failed: AtomicUsize::new(0),
            update_frequency: 25,
        }
    }

    pub fn record(&self, outcome: &Outcome) {
        if outcome.success {
            self.converted.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }

        self.bar.inc(1);

        let (converted, failed) = self.counts();
        let done = converted + failed;
        let total = self.bar.length().unwrap_or(0) as usize;
        if done % self.update_frequency == 0 || done == total || !outcome.success {
            self.bar
                .set_message(format!("converted: {converted} | failed: {failed}"));
        }
    }

    /// (converted, failed) so far
    pub fn counts(&self) -> (usize, usize) {
        (
            self.converted.load(Ordering::Relaxed),
            self.failed.load(Ordering::Relaxed),
        )
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::ConversionError;
    use crate::discovery::WorkItem;
    use crate::error::ItemError;
    use std::path::PathBuf;

    #[test]
    fn test_counts_track_outcomes() {
        let progress = ConversionProgress::hidden();
        let item = WorkItem::new("in/a.json", "out/a.yaml");

        progress.record(&Outcome::converted(item.clone(), 0, 3));
        progress.record(&Outcome::failed(
            item,
            Some(1),
            ItemError::Transform {
                path: PathBuf::from("in/a.json"),
                source: ConversionError::Other("nope".to_string()),
            },
        ));
        progress.finish();

        assert_eq!(progress.counts(), (1, 1));
    }

    #[test]
    fn test_visible_reporter_lifecycle() {
        let progress = ConversionProgress::new(2);
        progress.record(&Outcome::converted(WorkItem::new("a", "b"), 0, 1));
        progress.finish();
    }
}
