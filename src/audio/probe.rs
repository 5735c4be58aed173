use std::path::Path;
use std::process::{Command, Stdio};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },
    #[error("{program} exited with {status}")]
    Failed { program: String, status: std::process::ExitStatus },
    #[error("Unexpected duration output: {0:?}")]
    Parse(String),
}

/// Something that can tell how long a media file plays
pub trait DurationProbe {
    /// Duration of the media at `path` in seconds
    fn duration_secs(&self, path: &Path) -> Result<f64, ProbeError>;
}

/// Reads the container duration with `ffprobe`
#[derive(Debug, Clone)]
pub struct FfprobeProbe {
    program: String,
}

impl Default for FfprobeProbe {
    fn default() -> Self {
        Self {
            program: "ffprobe".to_string(),
        }
    }
}

impl FfprobeProbe {
    /// Use a different ffprobe binary (name on PATH or absolute path)
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Honour `FFPROBE` when set, otherwise look up `ffprobe` on PATH
    pub fn from_env() -> Self {
        Self::from_override(std::env::var("FFPROBE").ok().as_deref())
    }

    fn from_override(program: Option<&str>) -> Self {
        match program.map(str::trim) {
            Some(program) if !program.is_empty() => Self::with_program(program),
            _ => Self::default(),
        }
    }
}

impl DurationProbe for FfprobeProbe {
    fn duration_secs(&self, path: &Path) -> Result<f64, ProbeError> {
        debug!("Probing duration of {:?} with {}", path, self.program);

        let output = Command::new(&self.program)
            .args(["-v", "quiet", "-show_entries", "format=duration", "-of", "csv=p=0"])
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| ProbeError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(ProbeError::Failed {
                program: self.program.clone(),
                status: output.status,
            });
        }

        parse_duration(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Parse the single number ffprobe prints for `format=duration`
fn parse_duration(stdout: &str) -> Result<f64, ProbeError> {
    let trimmed = stdout.trim();
    match trimmed.parse::<f64>() {
        Ok(secs) if secs.is_finite() && secs >= 0.0 => Ok(secs),
        _ => Err(ProbeError::Parse(trimmed.to_string())),
    }
}

/// Format whole seconds as `H:MM:SS`
pub fn format_duration(seconds: f64) -> String {
    let total_secs = seconds.max(0.0) as u64;
    let secs = total_secs % 60;
    let mins = (total_secs / 60) % 60;
    let hours = total_secs / 3600;

    format!("{}:{:02}:{:02}", hours, mins, secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("123.456000\n").unwrap(), 123.456);
        assert_eq!(parse_duration("0").unwrap(), 0.0);
        assert!(parse_duration("N/A\n").is_err());
        assert!(parse_duration("").is_err());
        assert!(parse_duration("-4.0").is_err());
        assert!(parse_duration("inf").is_err());
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0.0), "0:00:00");
        assert_eq!(format_duration(59.9), "0:00:59");
        assert_eq!(format_duration(3725.0), "1:02:05");
        assert_eq!(format_duration(36000.0), "10:00:00");
    }

    #[test]
    fn test_env_override_selects_binary() {
        assert_eq!(FfprobeProbe::from_override(None).program, "ffprobe");
        assert_eq!(FfprobeProbe::from_override(Some("   ")).program, "ffprobe");
        assert_eq!(
            FfprobeProbe::from_override(Some(" /opt/ffmpeg/bin/ffprobe\n")).program,
            "/opt/ffmpeg/bin/ffprobe"
        );
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let probe = FfprobeProbe::with_program("ffprobe-that-does-not-exist");
        let err = probe.duration_secs(Path::new("audio.mp3")).unwrap_err();
        assert!(matches!(err, ProbeError::Spawn { .. }));
        assert!(err.to_string().contains("ffprobe-that-does-not-exist"));
    }
}
