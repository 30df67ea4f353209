//! MP3 decode/encode through an external ffmpeg binary.
//!
//! Inputs and outputs go through files in the caller's scratch directory
//! rather than pipes, so large episodes never stall on a full pipe buffer.

use super::Pcm;
use crate::error::AudioError;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::fs;
use tokio::process::Command;
use tracing::{debug, instrument};

#[derive(Debug, Clone)]
pub struct Ffmpeg {
    binary: PathBuf,
    sample_rate: u32,
}

impl Ffmpeg {
    pub fn new(binary: impl Into<PathBuf>, sample_rate: u32) -> Self {
        Self {
            binary: binary.into(),
            sample_rate,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Decode encoded audio bytes to mono PCM at the configured rate.
    #[instrument(level = "debug", skip_all, fields(bytes = encoded.len(), tag = tag))]
    pub async fn decode(&self, encoded: &[u8], scratch: &Path, tag: usize) -> Result<Pcm, AudioError> {
        let input = scratch.join(format!("clip_{tag:04}.mp3"));
        let output = scratch.join(format!("clip_{tag:04}.f32"));
        fs::write(&input, encoded).await?;

        let rate = self.sample_rate.to_string();
        self.run(&[
            OsStr::new("-i"),
            input.as_os_str(),
            OsStr::new("-f"),
            OsStr::new("f32le"),
            OsStr::new("-ac"),
            OsStr::new("1"),
            OsStr::new("-ar"),
            OsStr::new(&rate),
            output.as_os_str(),
        ])
        .await?;

        let raw = fs::read(&output).await?;
        let _ = fs::remove_file(&input).await;
        let _ = fs::remove_file(&output).await;

        let samples = f32_from_le_bytes(&raw);
        if samples.is_empty() {
            return Err(AudioError::EmptyClip);
        }
        debug!(samples = samples.len(), "Decoded clip");
        Ok(Pcm::new(samples, self.sample_rate))
    }

    /// Encode `pcm` as MP3 at `bitrate` to `output`.
    ///
    /// ffmpeg writes into `scratch`; `output` only appears once the encode
    /// has succeeded.
    #[instrument(level = "info", skip_all, fields(output = %output.display(), bitrate = %bitrate))]
    pub async fn encode(
        &self,
        pcm: &Pcm,
        scratch: &Path,
        output: &Path,
        bitrate: &str,
    ) -> Result<(), AudioError> {
        let input = scratch.join("episode.f32");
        let staged = scratch.join("episode.mp3");
        fs::write(&input, f32_to_le_bytes(&pcm.samples)).await?;

        let in_rate = pcm.sample_rate.to_string();
        let out_rate = self.sample_rate.to_string();
        let encoded = self.run(&[
            OsStr::new("-f"),
            OsStr::new("f32le"),
            OsStr::new("-ar"),
            OsStr::new(&in_rate),
            OsStr::new("-ac"),
            OsStr::new("1"),
            OsStr::new("-i"),
            input.as_os_str(),
            OsStr::new("-codec:a"),
            OsStr::new("libmp3lame"),
            OsStr::new("-b:a"),
            OsStr::new(&bitrate),
            OsStr::new("-ar"),
            OsStr::new(&out_rate),
            staged.as_os_str(),
        ])
        .await;
        let _ = fs::remove_file(&input).await;
        encoded?;

        if fs::rename(&staged, output).await.is_err() {
            // Scratch space may sit on another filesystem.
            fs::copy(&staged, output).await?;
            let _ = fs::remove_file(&staged).await;
        }
        debug!(output = %output.display(), "Moved encoded episode into place");
        Ok(())
    }

    async fn run(&self, args: &[&OsStr]) -> Result<(), AudioError> {
        let out = Command::new(&self.binary)
            .args(["-hide_banner", "-loglevel", "error", "-nostdin", "-y"])
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await?;
        if !out.status.success() {
            return Err(AudioError::Ffmpeg {
                status: out.status.to_string(),
                stderr: String::from_utf8_lossy(&out.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

fn f32_from_le_bytes(raw: &[u8]) -> Vec<f32> {
    raw.chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

fn f32_to_le_bytes(samples: &[f32]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_byte_layout() {
        let samples = vec![0.0f32, 0.5, -1.0];
        let bytes = f32_to_le_bytes(&samples);
        assert_eq!(bytes.len(), 12);
        assert_eq!(&bytes[4..8], &0.5f32.to_le_bytes());
        assert_eq!(f32_from_le_bytes(&bytes), samples);
        // Trailing partial sample is dropped.
        assert_eq!(f32_from_le_bytes(&bytes[..10]).len(), 2);
    }

    #[tokio::test]
    async fn test_missing_binary_is_io_error() {
        let scratch = tempfile::tempdir().unwrap();
        let ffmpeg = Ffmpeg::new("/nonexistent/ffmpeg-binary", 44_100);
        let err = ffmpeg
            .decode(&[0xff, 0xfb], scratch.path(), 0)
            .await
            .unwrap_err();
        assert!(matches!(err, AudioError::Io(_)));
    }

    /// Stand-in ffmpeg that writes `contents` to its last argument and exits
    /// with `status`.
    #[cfg(unix)]
    fn fake_ffmpeg(dir: &Path, contents: &str, status: i32) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("fake-ffmpeg");
        let script = format!(
            "#!/bin/sh\nfor arg in \"$@\"; do last=\"$arg\"; done\nprintf '{contents}' > \"$last\"\nexit {status}\n"
        );
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_encode_leaves_no_output() {
        let tools = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let out_dir = tempfile::tempdir().unwrap();
        let output = out_dir.path().join("oil_news_20261017.mp3");

        let ffmpeg = Ffmpeg::new(fake_ffmpeg(tools.path(), "partial", 1), 8_000);
        let pcm = Pcm::new(vec![0.1; 16], 8_000);
        let err = ffmpeg
            .encode(&pcm, scratch.path(), &output, "192k")
            .await
            .unwrap_err();

        assert!(matches!(err, AudioError::Ffmpeg { .. }));
        assert!(!output.exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_successful_encode_moves_output_into_place() {
        let tools = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let out_dir = tempfile::tempdir().unwrap();
        let output = out_dir.path().join("oil_news_20261017.mp3");

        let ffmpeg = Ffmpeg::new(fake_ffmpeg(tools.path(), "mp3data", 0), 8_000);
        let pcm = Pcm::new(vec![0.1; 16], 8_000);
        ffmpeg
            .encode(&pcm, scratch.path(), &output, "192k")
            .await
            .unwrap();

        assert_eq!(std::fs::read_to_string(&output).unwrap(), "mp3data");
        assert!(!scratch.path().join("episode.mp3").exists());
        assert!(!scratch.path().join("episode.f32").exists());
    }
}
