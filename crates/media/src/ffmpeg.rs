//! FFmpeg command-line backend

use crate::probe::parse_ffprobe_json;
use crate::{AudioConfig, MediaBackend};
use async_trait::async_trait;
use emotion_common::{ProcessingError, Result, VideoInfo};
use image::{DynamicImage, ImageFormat};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Output;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Locations of the FFmpeg tools and audio extraction settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
    pub audio: AudioConfig,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
            audio: AudioConfig::default(),
        }
    }
}

/// [`MediaBackend`] that runs `ffprobe` and `ffmpeg` as child processes
///
/// Children are killed when the awaiting future is dropped, so cancelling a
/// pipeline never leaves an orphaned decoder behind.
#[derive(Debug, Clone, Default)]
pub struct FfmpegBackend {
    config: MediaConfig,
}

impl FfmpegBackend {
    #[must_use]
    pub fn new(config: MediaConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &MediaConfig {
        &self.config
    }

    async fn run(program: &Path, args: Vec<OsString>) -> Result<Output> {
        Command::new(program)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                ProcessingError::FFmpegError(format!(
                    "Failed to execute {}: {e}",
                    program.display()
                ))
            })
    }
}

/// Arguments for `ffprobe` emitting container and stream metadata as JSON
pub(crate) fn probe_args(video: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"]
        .iter()
        .map(OsString::from)
        .collect();
    args.push(video.as_os_str().to_owned());
    args
}

/// Arguments for extracting the audio track to a PCM WAV file
pub(crate) fn audio_args(video: &Path, output: &Path, config: &AudioConfig) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec!["-i".into(), video.as_os_str().to_owned()];
    args.extend(
        [
            "-vn".to_string(),
            "-acodec".to_string(),
            "pcm_s16le".to_string(),
            "-ar".to_string(),
            config.sample_rate.to_string(),
            "-ac".to_string(),
            config.channels.to_string(),
        ]
        .into_iter()
        .map(OsString::from),
    );
    if config.normalize {
        args.push("-af".into());
        args.push("loudnorm=I=-23:LRA=7:TP=-2".into());
    }
    args.push("-y".into());
    args.push(output.as_os_str().to_owned());
    args
}

/// Arguments for decoding the given frames (sorted, unique) in one pass,
/// as a stream of PNG images on stdout
pub(crate) fn frame_args(video: &Path, indices: &[u64]) -> Vec<OsString> {
    let select = indices
        .iter()
        .map(|index| format!("eq(n\\,{index})"))
        .collect::<Vec<_>>()
        .join("+");
    let mut args: Vec<OsString> = vec![
        "-v".into(),
        "error".into(),
        "-i".into(),
        video.as_os_str().to_owned(),
    ];
    args.extend(
        [
            "-vf".to_string(),
            format!("select={select}"),
            "-vsync".to_string(),
            "0".to_string(),
            // Stop decoding once the last selected frame is out
            "-frames:v".to_string(),
            indices.len().to_string(),
            "-f".to_string(),
            "image2pipe".to_string(),
            "-vcodec".to_string(),
            "png".to_string(),
            "-".to_string(),
        ]
        .into_iter()
        .map(OsString::from),
    );
    args
}

const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Split concatenated PNG files into one slice per image
///
/// Stops at the first truncated or malformed image.
pub(crate) fn split_png_stream(mut data: &[u8]) -> Vec<&[u8]> {
    let mut images = Vec::new();
    while data.starts_with(&PNG_SIGNATURE) {
        let mut offset = PNG_SIGNATURE.len();
        let mut end = None;
        // Chunk layout: length (4) | type (4) | data (length) | crc (4)
        while offset + 8 <= data.len() {
            let length = u32::from_be_bytes([
                data[offset],
                data[offset + 1],
                data[offset + 2],
                data[offset + 3],
            ]) as usize;
            let is_end = &data[offset + 4..offset + 8] == b"IEND";
            offset = offset.saturating_add(12).saturating_add(length);
            if is_end {
                end = Some(offset);
                break;
            }
        }
        match end {
            Some(end) if end <= data.len() => {
                images.push(&data[..end]);
                data = &data[end..];
            }
            _ => break,
        }
    }
    images
}

#[async_trait]
impl MediaBackend for FfmpegBackend {
    fn name(&self) -> &str {
        "ffmpeg-cli"
    }

    async fn probe(&self, video: &Path) -> Result<VideoInfo> {
        if !tokio::fs::try_exists(video).await.unwrap_or(false) {
            return Err(ProcessingError::CorruptedFile(format!(
                "File not found: {}",
                video.display()
            )));
        }

        let output = Self::run(&self.config.ffprobe, probe_args(video)).await?;
        if !output.status.success() {
            return Err(ProcessingError::CorruptedFile(format!(
                "ffprobe could not read {}",
                video.display()
            )));
        }

        let info = parse_ffprobe_json(&output.stdout)?.video_info()?;
        info!(
            "Probed {}: {} frames at {:.2} fps, {:.2}s, audio={}",
            video.display(),
            info.frame_count,
            info.fps,
            info.duration,
            info.has_audio
        );
        Ok(info)
    }

    async fn extract_audio(&self, video: &Path, output: &Path) -> Result<PathBuf> {
        let output = output.with_extension("wav");
        let result = Self::run(
            &self.config.ffmpeg,
            audio_args(video, &output, &self.config.audio),
        )
        .await?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            if stderr.contains("does not contain any stream")
                || stderr.contains("Output file #0 does not contain any stream")
            {
                return Err(ProcessingError::NoAudioStream);
            }
            return Err(ProcessingError::FFmpegError(format!(
                "FFmpeg failed: {stderr}"
            )));
        }

        // Verify output file exists
        if !tokio::fs::try_exists(&output).await.unwrap_or(false) {
            return Err(ProcessingError::FFmpegError(
                "Output file was not created".to_string(),
            ));
        }

        debug!("Extracted audio to {}", output.display());
        Ok(output)
    }

    async fn read_frame(&self, video: &Path, index: u64) -> Result<DynamicImage> {
        self.read_frames(video, &[index])
            .await?
            .pop()
            .unwrap_or_else(|| {
                Err(ProcessingError::FrameUnavailable {
                    index,
                    reason: "no frame at this index".to_string(),
                })
            })
    }

    async fn read_frames(
        &self,
        video: &Path,
        indices: &[u64],
    ) -> Result<Vec<Result<DynamicImage>>> {
        if indices.is_empty() {
            return Ok(Vec::new());
        }

        let mut unique = indices.to_vec();
        unique.sort_unstable();
        unique.dedup();

        let output = Self::run(&self.config.ffmpeg, frame_args(video, &unique)).await?;
        let images = split_png_stream(&output.stdout);
        let missing_reason = if output.status.success() {
            "no frame at this index".to_string()
        } else {
            String::from_utf8_lossy(&output.stderr).trim().to_string()
        };
        if images.len() < unique.len() {
            warn!(
                "Decoded {} of {} requested frames from {}: {}",
                images.len(),
                unique.len(),
                video.display(),
                missing_reason
            );
        }

        // Selected frames come out in stream order, matching the sorted indices
        let decoded: HashMap<u64, std::result::Result<DynamicImage, String>> = unique
            .iter()
            .zip(images)
            .map(|(&index, png)| {
                let image = image::load_from_memory_with_format(png, ImageFormat::Png)
                    .map_err(|e| e.to_string());
                (index, image)
            })
            .collect();

        Ok(indices
            .iter()
            .map(|&index| {
                let frame = match decoded.get(&index) {
                    Some(Ok(image)) => Ok(image.clone()),
                    Some(Err(reason)) => Err(reason.clone()),
                    None => Err(missing_reason.clone()),
                };
                frame.map_err(|reason| ProcessingError::FrameUnavailable { index, reason })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(args: &[OsString]) -> Vec<String> {
        args.iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_default_config_uses_path_binaries() {
        let config = MediaConfig::default();
        assert_eq!(config.ffmpeg, PathBuf::from("ffmpeg"));
        assert_eq!(config.ffprobe, PathBuf::from("ffprobe"));
        assert!(!config.audio.normalize);
    }

    #[test]
    fn test_audio_args_with_normalization() {
        let args = strings(&audio_args(
            Path::new("in.mp4"),
            Path::new("/tmp/out.wav"),
            &AudioConfig::for_speech(),
        ));
        assert_eq!(&args[..2], ["-i", "in.mp4"]);
        assert!(args.contains(&"-vn".to_string()));
        assert!(args.windows(2).any(|w| w == ["-ar", "16000"]));
        assert!(args.windows(2).any(|w| w == ["-ac", "1"]));
        assert!(args
            .windows(2)
            .any(|w| w == ["-af", "loudnorm=I=-23:LRA=7:TP=-2"]));
        assert_eq!(args.last().unwrap(), "/tmp/out.wav");
    }

    #[test]
    fn test_audio_args_without_normalization() {
        let args = strings(&audio_args(
            Path::new("in.mp4"),
            Path::new("out.wav"),
            &AudioConfig::default(),
        ));
        assert!(!args.contains(&"-af".to_string()));
    }

    #[test]
    fn test_frame_args_select_index() {
        let args = strings(&frame_args(Path::new("clip.mov"), &[42]));
        assert!(args.contains(&"select=eq(n\\,42)".to_string()));
        assert!(args.windows(2).any(|w| w == ["-frames:v", "1"]));
        assert_eq!(args.last().unwrap(), "-");
    }

    #[test]
    fn test_frame_args_select_all_indices_in_one_filter() {
        let args = strings(&frame_args(Path::new("clip.mov"), &[0, 50, 100]));
        assert!(args.contains(&"select=eq(n\\,0)+eq(n\\,50)+eq(n\\,100)".to_string()));
        assert!(args.windows(2).any(|w| w == ["-frames:v", "3"]));
        assert_eq!(args.iter().filter(|a| *a == "-i").count(), 1);
    }

    fn png(value: u8) -> Vec<u8> {
        let mut bytes = Vec::new();
        DynamicImage::ImageLuma8(image::GrayImage::from_pixel(2, 2, image::Luma([value])))
            .write_to(&mut std::io::Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        bytes
    }

    #[test]
    fn test_split_png_stream() {
        let first = png(10);
        let second = png(200);
        let stream = [first.clone(), second.clone()].concat();

        let images = split_png_stream(&stream);
        assert_eq!(images, vec![first.as_slice(), second.as_slice()]);
        let decoded = image::load_from_memory_with_format(images[1], ImageFormat::Png).unwrap();
        assert_eq!(decoded.to_luma8().get_pixel(0, 0).0[0], 200);
    }

    #[test]
    fn test_split_png_stream_drops_truncated_tail() {
        let first = png(10);
        let second = png(200);
        let mut stream = [first.clone(), second].concat();
        stream.truncate(stream.len() - 5);

        assert_eq!(split_png_stream(&stream), vec![first.as_slice()]);
        assert!(split_png_stream(b"garbage").is_empty());
        assert!(split_png_stream(&[]).is_empty());
    }

    #[test]
    fn test_probe_args_end_with_input() {
        let args = strings(&probe_args(Path::new("clip.mov")));
        assert!(args.contains(&"-show_streams".to_string()));
        assert_eq!(args.last().unwrap(), "clip.mov");
    }

    #[tokio::test]
    async fn test_probe_missing_file_is_input_error() {
        let backend = FfmpegBackend::default();
        let err = backend
            .probe(Path::new("/definitely/not/here.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessingError::CorruptedFile(_)));
    }
}
