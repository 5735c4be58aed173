//! Transcript accumulation and plain-text output.

use std::io;
use std::path::Path;

/// One emitted transcript line
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptSegment {
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
    /// Trimmed, non-empty text
    pub text: String,
}

impl TranscriptSegment {
    /// Render as an output line, optionally with a `[start -> end] ` prefix
    pub fn to_line(&self, timestamps: bool) -> String {
        if timestamps {
            format!(
                "[{} -> {}] {}",
                format_timestamp(self.start),
                format_timestamp(self.end),
                self.text
            )
        } else {
            self.text.clone()
        }
    }
}

/// Ordered, non-empty segment texts
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    segments: Vec<TranscriptSegment>,
    timestamps: bool,
}

impl Transcript {
    pub fn new(timestamps: bool) -> Self {
        Self {
            segments: Vec::new(),
            timestamps,
        }
    }

    /// Add a segment, ignoring text that is empty after trimming.
    ///
    /// Returns the added segment.
    pub fn push(&mut self, start: f64, end: f64, text: &str) -> Option<&TranscriptSegment> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        self.segments.push(TranscriptSegment {
            start,
            end,
            text: text.to_string(),
        });
        self.segments.last()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Lines joined by newline with exactly one trailing newline
    pub fn to_text(&self) -> String {
        let joined = self
            .segments
            .iter()
            .map(|s| s.to_line(self.timestamps))
            .collect::<Vec<_>>()
            .join("\n");

        let mut output = joined.trim_end().to_string();
        output.push('\n');
        output
    }

    /// Write the text to `path`, replacing any existing file
    pub fn save_to_file(&self, path: &Path) -> io::Result<()> {
        std::fs::write(path, self.to_text())
    }
}

/// Format seconds as `H:MM:SS.mmm` (milliseconds truncated)
pub fn format_timestamp(seconds: f64) -> String {
    let total_ms = (seconds * 1000.0) as u64;
    let ms = total_ms % 1000;
    let total_secs = total_ms / 1000;
    let secs = total_secs % 60;
    let mins = (total_secs / 60) % 60;
    let hours = total_secs / 3600;

    format!("{}:{:02}:{:02}.{:03}", hours, mins, secs, ms)
}
