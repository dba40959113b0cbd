// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Smokelabel Contributors. All Rights Reserved.

use super::{MediaElement, MediaInfo, MediaLoader};
use crate::Error;
use image::RgbaImage;
use log::debug;
use std::path::{Path, PathBuf};
use url::Url;
use walkdir::WalkDir;

/// File extensions recognized as frames.
pub const FRAME_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Plays a directory of still images as a video at a fixed frame rate.
///
/// Frames are ordered by file name. The source may be a plain path or a
/// `file://` URL.
#[derive(Debug, Clone)]
pub struct ImageSequenceLoader {
    fps: f64,
}

impl ImageSequenceLoader {
    pub fn new(fps: f64) -> Self {
        Self { fps }
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }
}

impl MediaLoader for ImageSequenceLoader {
    type Element = ImageSequence;

    async fn open(&self, url: &str) -> Result<ImageSequence, Error> {
        if !(self.fps.is_finite() && self.fps > 0.0) {
            return Err(Error::MediaLoad(format!("invalid frame rate {}", self.fps)));
        }

        let dir = source_path(url)?;
        if !dir.is_dir() {
            return Err(Error::MediaLoad(format!(
                "{} is not a directory",
                dir.display()
            )));
        }

        let mut frames: Vec<PathBuf> = WalkDir::new(&dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter(|e| is_frame(e.path()))
            .map(|e| e.path().to_path_buf())
            .collect();

        if frames.is_empty() {
            return Err(Error::MediaLoad(format!(
                "no frames found in {}",
                dir.display()
            )));
        }
        frames.sort();

        debug!("Opened {} frames from {}", frames.len(), dir.display());
        Ok(ImageSequence {
            frames,
            fps: self.fps,
            position: 0,
        })
    }
}

/// An opened image sequence.
#[derive(Debug)]
pub struct ImageSequence {
    frames: Vec<PathBuf>,
    fps: f64,
    position: usize,
}

impl ImageSequence {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Index of the frame the next draw returns.
    pub fn position(&self) -> usize {
        self.position
    }
}

impl MediaElement for ImageSequence {
    async fn wait_metadata(&mut self) -> Result<MediaInfo, Error> {
        let first = self
            .frames
            .first()
            .ok_or_else(|| Error::MediaLoad("media was unloaded".to_owned()))?;
        let (width, height) = image::image_dimensions(first)
            .map_err(|e| Error::MediaLoad(format!("{}: {}", first.display(), e)))?;

        Ok(MediaInfo {
            duration: self.frames.len() as f64 / self.fps,
            width,
            height,
        })
    }

    async fn wait_can_play_through(&mut self) -> Result<(), Error> {
        Ok(())
    }

    async fn seek(&mut self, time: f64) -> Result<(), Error> {
        if self.frames.is_empty() {
            return Err(Error::MediaLoad("media was unloaded".to_owned()));
        }
        // Tolerate float error just below a frame boundary
        let index = (time.max(0.0) * self.fps + 1e-6).floor() as usize;
        self.position = index.min(self.frames.len() - 1);
        Ok(())
    }

    fn draw(&mut self) -> Result<RgbaImage, Error> {
        let path = self
            .frames
            .get(self.position)
            .ok_or_else(|| Error::MediaLoad("media was unloaded".to_owned()))?;
        Ok(image::open(path)?.to_rgba8())
    }

    fn unload(&mut self) {
        if !self.frames.is_empty() {
            debug!("Unloading {} frames", self.frames.len());
        }
        self.frames.clear();
        self.position = 0;
    }
}

fn source_path(url: &str) -> Result<PathBuf, Error> {
    if url.starts_with("file:") {
        let url = Url::parse(url)?;
        url.to_file_path()
            .map_err(|_| Error::MediaLoad(format!("{} is not a local path", url)))
    } else {
        Ok(PathBuf::from(url))
    }
}

fn is_frame(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| FRAME_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}
