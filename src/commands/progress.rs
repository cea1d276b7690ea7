//! Progress bars on stderr.

use indicatif::{ProgressBar, ProgressStyle};

/// A counting bar, or a hidden one when progress output is off.
pub(crate) fn counting_bar(enabled: bool, total: usize, label: &str) -> ProgressBar {
    if !enabled {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(total as u64);
    bar.set_style(
        ProgressStyle::with_template("{prefix:>10} [{bar:30}] {pos}/{len} {wide_msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );
    bar.set_prefix(label.to_string());
    bar
}
