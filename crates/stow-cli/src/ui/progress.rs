//! Progress Indicators and Spinners
//!
//! Formats a single progress line: a bar when the total size is known, a
//! spinner otherwise.

use std::time::Instant;

const SPINNER_FRAMES: [&str; 4] = ["|", "/", "-", "\\"];
const BAR_WIDTH: usize = 24;

/// Spinner state. Frames advance with wall-clock time, not with redraws.
#[derive(Debug, Clone)]
pub struct ProgressIndicator {
    start_time: Instant,
}

impl ProgressIndicator {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
        }
    }

    /// Current animation frame number (100ms per frame).
    pub fn frame(&self) -> usize {
        self.start_time.elapsed().as_millis() as usize / 100
    }

    pub fn current_icon(&self) -> &'static str {
        SPINNER_FRAMES[self.frame() % SPINNER_FRAMES.len()]
    }

    /// Render the progress part of a download line.
    pub fn render(&self, current: u64, total: Option<u64>) -> String {
        match total.filter(|&t| t > 0) {
            Some(total) => format_bar(current, total),
            None => format!("{} {}", self.current_icon(), format_bytes(current)),
        }
    }
}

impl Default for ProgressIndicator {
    fn default() -> Self {
        Self::new()
    }
}

/// `[#######-----------------]  30% 1.5 MiB/5.0 MiB`
pub fn format_bar(current: u64, total: u64) -> String {
    let current = current.min(total);
    let ratio = current as f64 / total as f64;
    let filled = (ratio * BAR_WIDTH as f64).round() as usize;
    format!(
        "[{}{}] {:>3}% {}/{}",
        "#".repeat(filled),
        "-".repeat(BAR_WIDTH - filled),
        (ratio * 100.0).floor() as u64,
        format_bytes(current),
        format_bytes(total),
    )
}

/// Human-readable byte count using binary units.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bar_with_known_total() {
        let bar = format_bar(512, 1024);
        assert!(bar.starts_with(&format!("[{}{}]", "#".repeat(12), "-".repeat(12))));
        assert!(bar.contains(" 50%"));
        assert!(bar.ends_with("512 B/1.0 KiB"));
    }

    #[test]
    fn test_bar_clamps_overshoot() {
        let bar = format_bar(4096, 1024);
        assert!(bar.contains("100%"));
        assert!(!bar.contains('-'));
    }

    #[test]
    fn test_spinner_without_total() {
        let progress = ProgressIndicator::new();
        let line = progress.render(2048, None);
        assert!(SPINNER_FRAMES.iter().any(|f| line.starts_with(f)));
        assert!(line.ends_with("2.0 KiB"));

        // A zero length header is treated as unknown.
        assert!(!progress.render(10, Some(0)).starts_with('['));
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1536), "1.5 KiB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MiB");
    }
}
