//! Media kinds, backend selection, and output format tables.
//!
//! [`MediaKind`] is the closed set of input categories a caller may declare.
//! Every kind maps to exactly one [`Backend`] through [`MediaKind::backend`],
//! an exhaustive match, so adding a kind without choosing a backend does not
//! compile.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

// ---------------------------------------------------------------------------
// Format tables
// ---------------------------------------------------------------------------

/// Output formats offered for video sources.
pub const VIDEO_FORMATS: &[&str] = &[
    "mp4", "webm", "flv", "avi", "mov", "wmv", "3gp", "mkv", "m4v", "mpg", "mpeg", "vob", "ts",
    "asf", "f4v", "h264", "hevc", "m2ts", "m2v", "mts", "ogv", "rm", "swf",
];

/// Output formats offered for audio sources.
pub const AUDIO_FORMATS: &[&str] = &[
    "mp3", "wav", "ogg", "m4a", "flac", "wma", "aac", "amr", "aiff", "au", "mka", "ac3", "ape",
    "mpc", "opus",
];

/// Output formats offered for image sources.
pub const IMAGE_FORMATS: &[&str] = &["jpg", "png", "bmp", "gif", "tiff", "webp", "ico", "jpeg"];

// ---------------------------------------------------------------------------
// MediaKind
// ---------------------------------------------------------------------------

/// Caller-declared category of an input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Audio,
    Image,
}

impl MediaKind {
    /// All media kinds, in display order.
    pub const ALL: [MediaKind; 3] = [MediaKind::Video, MediaKind::Audio, MediaKind::Image];

    /// The backend that serves this kind.
    pub fn backend(self) -> Backend {
        match self {
            Self::Video | Self::Audio => Backend::Transcode,
            Self::Image => Backend::Image,
        }
    }

    /// Output formats offered for this kind.
    pub fn formats(self) -> &'static [&'static str] {
        match self {
            Self::Video => VIDEO_FORMATS,
            Self::Audio => AUDIO_FORMATS,
            Self::Image => IMAGE_FORMATS,
        }
    }

    /// Whether `format` is in this kind's format table (case-insensitive).
    pub fn supports_format(self, format: &str) -> bool {
        self.formats()
            .iter()
            .any(|f| f.eq_ignore_ascii_case(format))
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Video => write!(f, "video"),
            Self::Audio => write!(f, "audio"),
            Self::Image => write!(f, "image"),
        }
    }
}

impl FromStr for MediaKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "video" => Ok(Self::Video),
            "audio" => Ok(Self::Audio),
            "image" => Ok(Self::Image),
            _ => Err(Error::UnsupportedMediaKind(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Backend
// ---------------------------------------------------------------------------

/// Category of conversion engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    /// Process-based transcoder (ffmpeg) for video and audio.
    Transcode,
    /// In-process image decode/encode.
    Image,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transcode => write!(f, "transcode"),
            Self::Image => write!(f, "image"),
        }
    }
}
