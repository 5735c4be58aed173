//! Runs one file through the model and writes the transcript.

use std::path::PathBuf;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{info, warn};

use super::transcript::Transcript;
use crate::audio::{format_duration, DurationProbe};
use crate::config::Config;
use crate::model::{ModelError, ModelLoader, ModelSpec, SpeechModel, TranscribeRequest};
use crate::progress::SegmentProgress;

#[derive(Error, Debug)]
pub enum TranscribeError {
    #[error("Input audio not found: {}", .0.display())]
    InputNotFound(PathBuf),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("Failed to write transcript to {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// What a finished run produced
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub output_path: PathBuf,
    /// Number of transcript lines written
    pub lines: usize,
    /// Duration reported by the probe, if it worked
    pub audio_duration_secs: Option<f64>,
    pub elapsed: Duration,
}

/// Transcribe `config.input_path` into `config.output_path`
pub fn transcribe<L, P>(config: &Config, loader: &L, probe: &P) -> Result<RunSummary, TranscribeError>
where
    L: ModelLoader,
    P: DurationProbe + ?Sized,
{
    if !config.input_path.exists() {
        return Err(TranscribeError::InputNotFound(config.input_path.clone()));
    }

    let start_time = Instant::now();

    info!(
        "Loading model '{}' (device={}, compute_type={})...",
        config.model_size, config.device, config.compute_type
    );
    let mut model = loader.load(&ModelSpec {
        size: config.model_size,
        device: config.device,
        compute_type: config.compute_type,
        models_dir: config.models_dir.clone(),
        n_threads: config.n_threads,
        vad: config.vad_filter,
    })?;

    info!("Transcribing... This may take a while depending on your CPU/GPU and model size.");

    // Probe failure only costs us the percentage display
    let audio_duration_secs = match probe.duration_secs(&config.input_path) {
        Ok(secs) => {
            info!("Audio duration: {}", format_duration(secs));
            Some(secs)
        }
        Err(e) => {
            warn!("Could not determine audio duration for progress tracking: {}", e);
            None
        }
    };

    let request = TranscribeRequest {
        language: config.language.clone(),
        vad_filter: config.vad_filter,
    };
    let stream = model.transcribe(&config.input_path, &request)?;
    info!(
        "Model processed {} of audio (language: {})",
        format_duration(stream.info.duration_secs),
        stream.info.language
    );

    let mut transcript = Transcript::new(config.print_timestamps);
    let mut progress = SegmentProgress::new(audio_duration_secs);

    for segment in stream.segments {
        let segment = segment?;
        if let Some(added) = transcript.push(segment.start, segment.end, &segment.text) {
            progress.segment(added.start, added.end);
        }
    }
    progress.finish();

    if transcript.is_empty() {
        warn!("No speech recognized in {}", config.input_path.display());
    }

    transcript
        .save_to_file(&config.output_path)
        .map_err(|source| TranscribeError::Write {
            path: config.output_path.clone(),
            source,
        })?;

    let elapsed = start_time.elapsed();
    info!(
        "Transcribed {} segments in {:.1}s",
        transcript.len(),
        elapsed.as_secs_f32()
    );

    Ok(RunSummary {
        output_path: config.output_path.clone(),
        lines: transcript.len(),
        audio_duration_secs,
        elapsed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::probe::ProbeError;
    use crate::config::{ComputeType, Device, ModelSize};
    use crate::model::{Segment, SegmentStream, TranscriptionInfo};
    use std::cell::Cell;
    use std::path::Path;

    struct FakeModel {
        segments: Vec<Segment>,
        fail_at: Option<usize>,
    }

    impl SpeechModel for FakeModel {
        fn transcribe(
            &mut self,
            _audio: &Path,
            request: &TranscribeRequest,
        ) -> Result<SegmentStream<'_>, ModelError> {
            let fail_at = self.fail_at;
            let segments = self.segments.iter().enumerate().map(move |(i, s)| {
                if Some(i) == fail_at {
                    Err(ModelError::Transcription("decoder blew up".to_string()))
                } else {
                    Ok(s.clone())
                }
            });
            Ok(SegmentStream {
                info: TranscriptionInfo {
                    language: request.language.clone(),
                    duration_secs: 10.0,
                },
                segments: Box::new(segments),
            })
        }
    }

    struct FakeLoader {
        segments: Vec<Segment>,
        fail_at: Option<usize>,
        loads: Cell<usize>,
    }

    impl FakeLoader {
        fn new(segments: Vec<Segment>) -> Self {
            Self {
                segments,
                fail_at: None,
                loads: Cell::new(0),
            }
        }
    }

    impl ModelLoader for FakeLoader {
        type Model = FakeModel;

        fn load(&self, spec: &ModelSpec) -> Result<FakeModel, ModelError> {
            assert_eq!(spec.size, ModelSize::Tiny);
            self.loads.set(self.loads.get() + 1);
            Ok(FakeModel {
                segments: self.segments.clone(),
                fail_at: self.fail_at,
            })
        }
    }

    struct FixedProbe(f64);

    impl DurationProbe for FixedProbe {
        fn duration_secs(&self, _path: &Path) -> Result<f64, ProbeError> {
            Ok(self.0)
        }
    }

    struct BrokenProbe;

    impl DurationProbe for BrokenProbe {
        fn duration_secs(&self, _path: &Path) -> Result<f64, ProbeError> {
            Err(ProbeError::Parse("N/A".to_string()))
        }
    }

    fn seg(start: f64, end: f64, text: &str) -> Segment {
        Segment {
            start,
            end,
            text: text.to_string(),
        }
    }

    fn sample_segments() -> Vec<Segment> {
        vec![
            seg(0.0, 2.5, " Guten Tag."),
            seg(2.5, 3.0, "   "),
            seg(3.0, 5.25, " Willkommen zum Interview."),
            seg(5.25, 6.0, ""),
            seg(6.0, 9.5, " Danke. "),
        ]
    }

    fn config_in(dir: &Path, timestamps: bool) -> Config {
        let input_path = dir.join("interview.mp3");
        std::fs::write(&input_path, b"not really audio").unwrap();
        Config {
            input_path,
            output_path: dir.join("interview.txt"),
            model_size: ModelSize::Tiny,
            device: Device::Cpu,
            compute_type: ComputeType::Int8,
            language: "de".to_string(),
            vad_filter: true,
            print_timestamps: timestamps,
            models_dir: dir.join("models"),
            n_threads: 1,
        }
    }

    #[test]
    fn test_writes_plain_transcript() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path(), false);
        let loader = FakeLoader::new(sample_segments());

        let summary = transcribe(&config, &loader, &FixedProbe(10.0)).unwrap();

        let text = std::fs::read_to_string(&config.output_path).unwrap();
        assert_eq!(text, "Guten Tag.\nWillkommen zum Interview.\nDanke.\n");
        assert!(!text.ends_with("\n\n"));
        assert!(text.lines().all(|l| !l.starts_with('[')));
        assert_eq!(summary.lines, 3);
        assert_eq!(summary.audio_duration_secs, Some(10.0));
        assert_eq!(loader.loads.get(), 1);
    }

    #[test]
    fn test_writes_timestamped_transcript_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path(), true);
        let loader = FakeLoader::new(sample_segments());

        transcribe(&config, &loader, &FixedProbe(10.0)).unwrap();

        let text = std::fs::read_to_string(&config.output_path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "[0:00:00.000 -> 0:00:02.500] Guten Tag.",
                "[0:00:03.000 -> 0:00:05.250] Willkommen zum Interview.",
                "[0:00:06.000 -> 0:00:09.500] Danke.",
            ]
        );
    }

    #[test]
    fn test_missing_input_does_not_load_or_write() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_in(dir.path(), false);
        config.input_path = dir.path().join("missing.mp3");
        std::fs::write(&config.output_path, "previous run\n").unwrap();
        let loader = FakeLoader::new(sample_segments());

        let err = transcribe(&config, &loader, &FixedProbe(10.0)).unwrap_err();

        assert!(matches!(err, TranscribeError::InputNotFound(_)));
        assert!(err.to_string().contains("missing.mp3"));
        assert_eq!(loader.loads.get(), 0);
        assert_eq!(
            std::fs::read_to_string(&config.output_path).unwrap(),
            "previous run\n"
        );
    }

    #[test]
    fn test_probe_failure_still_transcribes() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path(), false);
        let loader = FakeLoader::new(sample_segments());

        let summary = transcribe(&config, &loader, &BrokenProbe).unwrap();

        assert_eq!(summary.audio_duration_secs, None);
        assert_eq!(summary.lines, 3);
        assert!(config.output_path.exists());
    }

    #[test]
    fn test_no_segments_writes_single_newline() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path(), true);
        let loader = FakeLoader::new(vec![seg(0.0, 1.0, "  ")]);

        let summary = transcribe(&config, &loader, &FixedProbe(1.0)).unwrap();

        assert_eq!(summary.lines, 0);
        assert_eq!(std::fs::read_to_string(&config.output_path).unwrap(), "\n");
    }

    #[test]
    fn test_model_error_aborts_without_output() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path(), false);
        let mut loader = FakeLoader::new(sample_segments());
        loader.fail_at = Some(2);

        let err = transcribe(&config, &loader, &FixedProbe(10.0)).unwrap_err();

        assert!(matches!(err, TranscribeError::Model(ModelError::Transcription(_))));
        assert!(!config.output_path.exists());
    }

    #[test]
    fn test_unwritable_output_is_write_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config_in(dir.path(), false);
        config.output_path = dir.path().join("no-such-dir").join("out.txt");
        let loader = FakeLoader::new(sample_segments());

        let err = transcribe(&config, &loader, &FixedProbe(10.0)).unwrap_err();

        assert!(matches!(err, TranscribeError::Write { .. }));
    }
}
