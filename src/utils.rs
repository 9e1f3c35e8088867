//! # Utilities Module
//!
//! ## Purpose
//! Common helpers shared by the index build, evaluation harness and report
//! rendering: phase timing and text previews for logs and tables.

use std::time::Instant;

/// Performance timer for measuring operation duration
pub struct Timer {
    start: Instant,
    name: String,
}

impl Timer {
    /// Start a new timer with a name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            name: name.into(),
        }
    }

    /// Get elapsed time in milliseconds
    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    /// Stop timer and log duration
    pub fn stop(self) -> u64 {
        let elapsed = self.elapsed_ms();
        tracing::debug!("Timer '{}' completed in {}ms", self.name, elapsed);
        elapsed
    }
}

/// Bounded text preview for log lines and table cells. Char-boundary safe;
/// appends an ellipsis when the text was shortened.
pub fn preview(text: &str, max_chars: usize) -> String {
    let char_count = text.chars().count();
    if char_count <= max_chars {
        text.to_string()
    } else {
        let head: String = text.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_short_text_unchanged() {
        assert_eq!(preview("guilty", 20), "guilty");
    }

    #[test]
    fn test_preview_long_text_shortened() {
        assert_eq!(preview("a very long ruling text", 10), "a very ...");
    }

    #[test]
    fn test_preview_is_char_boundary_safe() {
        let text = "négligence grave et répétée";
        let shortened = preview(text, 12);
        assert!(shortened.ends_with("..."));
        assert_eq!(shortened.chars().count(), 12);
    }

    #[test]
    fn test_timer_reports_elapsed() {
        let timer = Timer::new("test-phase");
        assert!(timer.elapsed_ms() < 1_000);
    }
}
