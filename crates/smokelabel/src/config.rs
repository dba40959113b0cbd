// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Smokelabel Contributors. All Rights Reserved.

//! Layered settings: built-in defaults, an optional file, then environment
//! variables prefixed with `SMOKELABEL_`.
//!
//! Sections are separated by a double underscore, so
//! `SMOKELABEL_SAMPLER__TOTAL_FRAMES=24` overrides `sampler.total_frames`.

use crate::{
    Error,
    editor::{EditorConfig, MIN_HEIGHT, MIN_WIDTH},
    overlay::{DEFAULT_BORDER, DEFAULT_HANDLE_SIZE, HandleSet, OverlayConfig},
    playback::PlaybackConfig,
    sampler::SamplerConfig,
};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};

/// Prefix of every environment override.
pub const ENV_PREFIX: &str = "SMOKELABEL";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub overlay: OverlaySettings,
    pub sampler: SamplerSettings,
    pub playback: PlaybackSettings,
    pub media: MediaSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlaySettings {
    pub border: f64,
    pub min_width: f64,
    pub min_height: f64,
    pub handles: HandleSet,
    pub drag_enabled: bool,
    pub read_only: bool,
    pub handle_size: f64,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            border: DEFAULT_BORDER,
            min_width: MIN_WIDTH,
            min_height: MIN_HEIGHT,
            handles: HandleSet::All,
            drag_enabled: true,
            read_only: false,
            handle_size: DEFAULT_HANDLE_SIZE,
        }
    }
}

impl From<&OverlaySettings> for OverlayConfig {
    fn from(s: &OverlaySettings) -> Self {
        OverlayConfig {
            editor: EditorConfig {
                border: s.border,
                min_width: s.min_width,
                min_height: s.min_height,
            },
            handles: s.handles,
            drag_enabled: s.drag_enabled,
            read_only: s.read_only,
            handle_size: s.handle_size,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerSettings {
    pub total_frames: usize,
    pub settle_delay_ms: u64,
    pub yield_interval: usize,
    pub seek_timeout_ms: u64,
}

impl Default for SamplerSettings {
    fn default() -> Self {
        let defaults = SamplerConfig::default();
        Self {
            total_frames: defaults.total_frames,
            settle_delay_ms: defaults.settle_delay.as_millis() as u64,
            yield_interval: defaults.yield_interval,
            seek_timeout_ms: defaults.seek_timeout.as_millis() as u64,
        }
    }
}

impl From<&SamplerSettings> for SamplerConfig {
    fn from(s: &SamplerSettings) -> Self {
        SamplerConfig {
            total_frames: s.total_frames,
            settle_delay: Duration::from_millis(s.settle_delay_ms),
            yield_interval: s.yield_interval,
            seek_timeout: Duration::from_millis(s.seek_timeout_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    pub fps: f64,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            fps: PlaybackConfig::default().fps,
        }
    }
}

impl From<&PlaybackSettings> for PlaybackConfig {
    fn from(s: &PlaybackSettings) -> Self {
        PlaybackConfig { fps: s.fps }
    }
}

/// Where media lives and how local sources are played back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaSettings {
    /// Camera directory names indexed by a batch item's `camera_id`.
    pub camera_names: Vec<String>,
    /// Frame rate assumed for image-sequence sources.
    pub sequence_fps: f64,
}

impl Default for MediaSettings {
    fn default() -> Self {
        Self {
            camera_names: vec![
                "hoogovens".to_owned(),
                "kooksfabriek_1".to_owned(),
                "kooksfabriek_2".to_owned(),
            ],
            sequence_fps: 12.0,
        }
    }
}

impl MediaSettings {
    pub fn camera_name(&self, camera_id: usize) -> Option<&str> {
        self.camera_names.get(camera_id).map(String::as_str)
    }
}

impl Settings {
    /// Load settings from defaults, `path` (when given) and the process
    /// environment.
    ///
    /// The file format is inferred from the extension.
    pub fn load(path: Option<&Path>) -> Result<Self, Error> {
        Self::load_with_env(path, Self::environment())
    }

    fn environment() -> Environment {
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
    }

    fn load_with_env(path: Option<&Path>, env: Environment) -> Result<Self, Error> {
        let mut builder = Config::builder().add_source(Config::try_from(&Settings::default())?);
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        let settings: Settings = builder.add_source(env).build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject values no component can run with.
    pub fn validate(&self) -> Result<(), Error> {
        if self.overlay.border.is_nan() || self.overlay.border < 0.0 {
            return Err(Error::InvalidParameters(format!(
                "overlay.border must be non-negative, got {}",
                self.overlay.border
            )));
        }
        if !is_positive(self.overlay.min_width) || !is_positive(self.overlay.min_height) {
            return Err(Error::InvalidParameters(format!(
                "overlay minimum size must be positive, got {}x{}",
                self.overlay.min_width, self.overlay.min_height
            )));
        }
        if !(self.overlay.handle_size.is_finite() && self.overlay.handle_size >= 0.0) {
            return Err(Error::InvalidParameters(format!(
                "overlay.handle_size must be non-negative, got {}",
                self.overlay.handle_size
            )));
        }
        if self.sampler.total_frames == 0 {
            return Err(Error::InvalidParameters(
                "sampler.total_frames must be at least 1".to_owned(),
            ));
        }
        if self.sampler.seek_timeout_ms == 0 {
            return Err(Error::InvalidParameters(
                "sampler.seek_timeout_ms must be at least 1".to_owned(),
            ));
        }
        if !is_positive(self.playback.fps) || !is_positive(self.media.sequence_fps) {
            return Err(Error::InvalidParameters(
                "frame rates must be positive".to_owned(),
            ));
        }
        Ok(())
    }

    pub fn overlay_config(&self) -> OverlayConfig {
        (&self.overlay).into()
    }

    pub fn sampler_config(&self) -> SamplerConfig {
        (&self.sampler).into()
    }

    pub fn playback_config(&self) -> PlaybackConfig {
        (&self.playback).into()
    }
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn env(vars: &[(&str, &str)]) -> Environment {
        let mut map = config::Map::new();
        for (key, value) in vars {
            map.insert((*key).to_owned(), (*value).to_owned());
        }
        Settings::environment().source(Some(map))
    }

    #[test]
    fn test_defaults() -> Result<(), Error> {
        let settings = Settings::load_with_env(None, env(&[]))?;
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.sampler.total_frames, 36);
        assert_eq!(settings.playback.fps, 30.0);
        assert_eq!(settings.media.camera_name(1), Some("kooksfabriek_1"));
        assert_eq!(settings.overlay_config(), OverlayConfig::default());
        Ok(())
    }

    #[test]
    fn test_file_then_env_override() -> Result<(), Error> {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile()?;
        writeln!(
            file,
            "[overlay]\nborder = 0\nhandles = \"diagonal\"\n\n[sampler]\ntotal_frames = 12\nsettle_delay_ms = 0"
        )?;

        let settings = Settings::load_with_env(
            Some(file.path()),
            env(&[("SMOKELABEL_SAMPLER__TOTAL_FRAMES", "24")]),
        )?;
        assert_eq!(settings.overlay.border, 0.0);
        assert_eq!(settings.overlay.handles, HandleSet::Diagonal);
        assert_eq!(settings.sampler.total_frames, 24);
        assert_eq!(settings.sampler_config().settle_delay, Duration::ZERO);
        // Untouched sections keep their defaults
        assert_eq!(settings.media, MediaSettings::default());
        Ok(())
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = Settings::load_with_env(None, env(&[("SMOKELABEL_SAMPLER__TOTAL_FRAMES", "0")]))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParameters(_)), "{}", err);

        for (key, value) in [
            ("SMOKELABEL_OVERLAY__MIN_WIDTH", "0"),
            ("SMOKELABEL_OVERLAY__MIN_HEIGHT", "-5"),
            ("SMOKELABEL_OVERLAY__HANDLE_SIZE", "-1"),
            ("SMOKELABEL_SAMPLER__SEEK_TIMEOUT_MS", "0"),
        ] {
            let err = Settings::load_with_env(None, env(&[(key, value)])).unwrap_err();
            assert!(matches!(err, Error::InvalidParameters(_)), "{}: {}", key, err);
        }

        let mut settings = Settings::default();
        settings.overlay.min_height = f64::NAN;
        assert!(settings.validate().is_err());

        let err = Settings::load_with_env(Some(Path::new("/nonexistent/smokelabel.toml")), env(&[]))
            .unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)), "{}", err);
    }
}
