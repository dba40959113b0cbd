// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Smokelabel Contributors. All Rights Reserved.

/// Comprehensive error type for smokelabel operations.
///
/// Geometry never produces an error: out-of-range input is clamped instead.
/// The variants below cover media loading and frame capture, configuration
/// and the serialization of batches and label payloads.
#[derive(Debug)]
pub enum Error {
    /// An I/O error occurred during file operations.
    IoError(std::io::Error),
    /// Configuration parsing or loading error.
    ConfigError(config::ConfigError),
    /// JSON serialization or deserialization error.
    JsonError(serde_json::Error),
    /// Image decoding or encoding error.
    ImageError(image::ImageError),
    /// URL parsing error.
    UrlParseError(url::ParseError),
    /// The media resource failed to load or decode; the whole capture fails.
    MediaLoad(String),
    /// A single seek or draw failed. Recovered locally with a blank frame.
    FrameCapture { index: usize, reason: String },
    /// The capture was superseded by a newer request for the same viewer.
    CaptureAborted,
    /// Invalid parameters provided to an operation.
    InvalidParameters(String),
}

impl Error {
    /// Returns true when the error only signals that a newer capture won.
    ///
    /// Hosts should not surface these to the user.
    pub fn is_aborted(&self) -> bool {
        matches!(self, Error::CaptureAborted)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err)
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::ConfigError(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::JsonError(err)
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::ImageError(err)
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::UrlParseError(err)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::IoError(e) => write!(f, "I/O error: {}", e),
            Error::ConfigError(e) => write!(f, "Configuration error: {}", e),
            Error::JsonError(e) => write!(f, "JSON error: {}", e),
            Error::ImageError(e) => write!(f, "Image error: {}", e),
            Error::UrlParseError(e) => write!(f, "URL parse error: {}", e),
            Error::MediaLoad(s) => write!(f, "Media failed to load: {}", s),
            Error::FrameCapture { index, reason } => {
                write!(f, "Frame {} capture failed: {}", index, reason)
            }
            Error::CaptureAborted => write!(f, "Capture superseded by a newer request"),
            Error::InvalidParameters(s) => write!(f, "Invalid parameters: {}", s),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(e) => Some(e),
            Error::ConfigError(e) => Some(e),
            Error::JsonError(e) => Some(e),
            Error::ImageError(e) => Some(e),
            Error::UrlParseError(e) => Some(e),
            _ => None,
        }
    }
}
