//! Terminal progress for the segment loop.

use indicatif::{ProgressBar, ProgressStyle};

use crate::transcription::format_timestamp;

/// Spinner that counts emitted segments and shows where the model is
pub struct SegmentProgress {
    pb: ProgressBar,
    duration_secs: Option<f64>,
    segments: u64,
}

impl SegmentProgress {
    /// Spinner on stderr; indicatif hides it when stderr is not a terminal
    pub fn new(duration_secs: Option<f64>) -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template("{prefix}: {spinner:.green} {pos} segments [{elapsed_precise}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_prefix("Transcribing");
        Self::with_bar(pb, duration_secs)
    }

    pub fn hidden(duration_secs: Option<f64>) -> Self {
        Self::with_bar(ProgressBar::hidden(), duration_secs)
    }

    fn with_bar(pb: ProgressBar, duration_secs: Option<f64>) -> Self {
        Self {
            pb,
            duration_secs,
            segments: 0,
        }
    }

    /// Record one emitted segment ending at `end`
    pub fn segment(&mut self, start: f64, end: f64) {
        self.segments += 1;
        self.pb
            .set_message(status_message(self.duration_secs, start, end, self.segments));
        self.pb.inc(1);
    }

    pub fn finish(&self) {
        self.pb.finish();
    }
}

/// Percentage of the audio covered once `end` is reached, capped at 100
pub fn percent_complete(end: f64, duration_secs: f64) -> Option<f64> {
    if duration_secs > 0.0 {
        Some((end / duration_secs * 100.0).clamp(0.0, 100.0))
    } else {
        None
    }
}

fn status_message(duration_secs: Option<f64>, start: f64, end: f64, segments: u64) -> String {
    let current = format!("{}-{}", format_timestamp(start), format_timestamp(end));
    match duration_secs.and_then(|d| percent_complete(end, d)) {
        Some(progress) => format!(
            "Progress: {:.1}%, Current: {}, Segments: {}",
            progress, current, segments
        ),
        None => format!("Current: {}, Segments: {}", current, segments),
    }
}
