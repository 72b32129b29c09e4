//! Container metadata parsed from `ffprobe -print_format json` output

use emotion_common::{ProcessingError, Result, VideoInfo};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Stream type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamType {
    Video,
    Audio,
    Subtitle,
}

/// Information about a media stream
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamInfo {
    pub stream_type: StreamType,
    pub codec: String,

    // Video-specific fields
    pub fps: Option<f64>,
    pub frame_count: Option<u64>,
    pub duration: Option<f64>,

    // Audio-specific fields
    pub sample_rate: Option<u32>,
    pub channels: Option<u8>,
}

/// Complete media file information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaInfo {
    pub format: String,
    pub duration: f64,
    pub streams: Vec<StreamInfo>,
    pub metadata: HashMap<String, String>,
}

impl MediaInfo {
    /// Find the first video stream
    #[must_use]
    pub fn video_stream(&self) -> Option<&StreamInfo> {
        self.streams
            .iter()
            .find(|s| s.stream_type == StreamType::Video)
    }

    /// Find the first audio stream
    #[must_use]
    pub fn audio_stream(&self) -> Option<&StreamInfo> {
        self.streams
            .iter()
            .find(|s| s.stream_type == StreamType::Audio)
    }

    /// Check if the file has audio
    #[must_use]
    pub fn has_audio(&self) -> bool {
        self.audio_stream().is_some()
    }

    /// Reduce to the metadata the pipeline reports
    ///
    /// The frame count comes from the stream header when present, otherwise it
    /// is estimated from duration and frame rate.
    pub fn video_info(&self) -> Result<VideoInfo> {
        let video = self.video_stream().ok_or(ProcessingError::NoVideoStream)?;
        let fps = video.fps.unwrap_or(0.0);
        let duration = video.duration.unwrap_or(self.duration);

        let frame_count = match video.frame_count {
            Some(count) if count > 0 => count,
            _ if fps > 0.0 && duration > 0.0 => (duration * fps).round() as u64,
            _ => 0,
        };

        Ok(VideoInfo {
            duration: if duration > 0.0 {
                duration
            } else {
                VideoInfo::from_frames(frame_count, fps, false).duration
            },
            frame_count,
            fps,
            has_audio: self.has_audio(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
    nb_frames: Option<String>,
    duration: Option<String>,
    sample_rate: Option<String>,
    channels: Option<u8>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    format_name: Option<String>,
    duration: Option<String>,
    #[serde(default)]
    tags: HashMap<String, String>,
}

/// Parse the JSON document printed by ffprobe
pub fn parse_ffprobe_json(json: &[u8]) -> Result<MediaInfo> {
    let output: ProbeOutput = serde_json::from_slice(json)
        .map_err(|e| ProcessingError::CorruptedFile(format!("Unreadable ffprobe output: {e}")))?;

    let mut streams = Vec::with_capacity(output.streams.len());
    for stream in output.streams {
        let stream_type = match stream.codec_type.as_deref() {
            Some("video") => StreamType::Video,
            Some("audio") => StreamType::Audio,
            Some("subtitle") => StreamType::Subtitle,
            _ => continue, // Skip data/attachment streams
        };

        let fps = stream
            .avg_frame_rate
            .as_deref()
            .and_then(parse_rate)
            .or_else(|| stream.r_frame_rate.as_deref().and_then(parse_rate));

        streams.push(StreamInfo {
            stream_type,
            codec: stream.codec_name.unwrap_or_else(|| "unknown".to_string()),
            fps: if stream_type == StreamType::Video { fps } else { None },
            frame_count: stream.nb_frames.as_deref().and_then(|n| n.parse().ok()),
            duration: stream.duration.as_deref().and_then(|d| d.parse().ok()),
            sample_rate: stream.sample_rate.as_deref().and_then(|s| s.parse().ok()),
            channels: stream.channels,
        });
    }

    let (format, duration, metadata) = match output.format {
        Some(format) => (
            format
                .format_name
                .as_deref()
                .and_then(|name| name.split(',').next())
                .unwrap_or("unknown")
                .to_string(),
            format
                .duration
                .as_deref()
                .and_then(|d| d.parse().ok())
                .unwrap_or(0.0),
            format.tags,
        ),
        None => ("unknown".to_string(), 0.0, HashMap::new()),
    };

    debug!(
        "Parsed probe output: format={}, duration={:.2}s, streams={}",
        format,
        duration,
        streams.len()
    );

    Ok(MediaInfo {
        format,
        duration,
        streams,
        metadata,
    })
}

/// Parse an ffprobe rational such as `30000/1001`; `0/0` yields `None`
fn parse_rate(rate: &str) -> Option<f64> {
    let (num, den) = match rate.split_once('/') {
        Some((num, den)) => (num.parse::<f64>().ok()?, den.parse::<f64>().ok()?),
        None => (rate.parse::<f64>().ok()?, 1.0),
    };
    if den > 0.0 && num > 0.0 {
        Some(num / den)
    } else {
        None
    }
}
