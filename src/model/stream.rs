//! Segment delivery from a background inference thread.

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use super::{ModelError, Segment};

/// Handed to the worker so it can emit segments as they are decoded
#[derive(Clone)]
pub struct SegmentSender {
    tx: Sender<Result<Segment, ModelError>>,
}

impl SegmentSender {
    /// Emit one segment. Returns false once the consumer has gone away.
    pub fn send(&self, segment: Segment) -> bool {
        self.tx.send(Ok(segment)).is_ok()
    }
}

/// Run `work` on its own thread and yield the segments it sends, in order.
///
/// An `Err` returned by `work` becomes the final item of the stream.
pub fn spawn_segment_stream<F>(work: F) -> Result<ChannelSegments, ModelError>
where
    F: FnOnce(SegmentSender) -> Result<(), ModelError> + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    let sender = SegmentSender { tx: tx.clone() };

    let worker = thread::Builder::new()
        .name("whisper-inference".to_string())
        .spawn(move || {
            if let Err(e) = work(sender) {
                let _ = tx.send(Err(e));
            }
        })
        .map_err(|e| ModelError::Transcription(format!("Failed to start inference thread: {}", e)))?;

    Ok(ChannelSegments {
        rx,
        worker: Some(worker),
    })
}

/// Iterator over segments arriving from the inference thread
pub struct ChannelSegments {
    rx: Receiver<Result<Segment, ModelError>>,
    worker: Option<JoinHandle<()>>,
}

impl Iterator for ChannelSegments {
    type Item = Result<Segment, ModelError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Ok(item) = self.rx.recv() {
            return Some(item);
        }

        // Channel closed: the worker is done, surface a panic once
        let worker = self.worker.take()?;
        match worker.join() {
            Ok(()) => None,
            Err(_) => Some(Err(ModelError::Transcription(
                "Inference thread panicked".to_string(),
            ))),
        }
    }
}
