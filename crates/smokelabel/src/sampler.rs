// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Smokelabel Contributors. All Rights Reserved.

//! Frame extraction from a media source.
//!
//! [`FrameSampler::capture_frames`] seeks through the media in
//! `total_frames` equal steps and draws each position into a fresh bitmap.
//! Frames are captured one at a time in increasing time order.
//!
//! ## Cancellation
//!
//! A sampler belongs to one viewer. Starting a capture cancels the capture
//! that is still running for the same sampler, and the older call resolves
//! to [`Error::CaptureAborted`]. Every suspension point (loading, seeking,
//! the settle delay and the periodic yield) races against the cancellation
//! token, so an aborted capture never draws another frame. The newer capture
//! waits until the older one has unloaded its media before loading its own.

use crate::{
    Error,
    media::{MediaElement, MediaGuard, MediaInfo, MediaLoader},
};
use image::RgbaImage;
use log::{debug, warn};
use std::{
    future::Future,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};
use tokio::sync::mpsc::Sender;
use tokio_util::sync::CancellationToken;

/// Default number of frames sampled from one source.
pub const DEFAULT_TOTAL_FRAMES: usize = 36;

/// Progress information for a running capture.
///
/// Sent once per captured frame through the optional channel passed to
/// [`FrameSampler::capture_frames`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Number of frames captured so far.
    pub current: usize,
    /// Number of frames the capture produces.
    pub total: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerConfig {
    pub total_frames: usize,
    /// Pause after each completed seek before drawing.
    pub settle_delay: Duration,
    /// Yield to the runtime every this many frames. Zero disables yielding.
    pub yield_interval: usize,
    /// A seek that takes longer fails that frame.
    pub seek_timeout: Duration,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            total_frames: DEFAULT_TOTAL_FRAMES,
            settle_delay: Duration::from_millis(10),
            yield_interval: 10,
            seek_timeout: Duration::from_secs(2),
        }
    }
}

/// The frames of one source.
#[derive(Debug, Clone)]
pub struct FrameSet {
    pub frames: Vec<RgbaImage>,
    /// The frame to display for annotation, always a valid index.
    pub target_frame_index: usize,
    /// Indices whose capture failed and hold a blank frame instead.
    pub blank_indices: Vec<usize>,
    pub info: MediaInfo,
}

impl FrameSet {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn target_frame(&self) -> Option<&RgbaImage> {
        self.frames.get(self.target_frame_index)
    }

    pub fn is_complete(&self) -> bool {
        self.blank_indices.is_empty()
    }
}

/// Clamp a requested target frame into `[0, total_frames - 1]`.
pub fn clamp_target(target_frame: usize, total_frames: usize) -> usize {
    target_frame.min(total_frames.saturating_sub(1))
}

/// Captures frames for one viewer.
///
/// Cloning yields another handle to the same viewer; a capture started on
/// any clone supersedes the running one.
pub struct FrameSampler<L> {
    loader: Arc<L>,
    config: SamplerConfig,
    current: Arc<Mutex<Option<CancellationToken>>>,
    media_slot: Arc<tokio::sync::Mutex<()>>,
}

impl<L> Clone for FrameSampler<L> {
    fn clone(&self) -> Self {
        Self {
            loader: self.loader.clone(),
            config: self.config,
            current: self.current.clone(),
            media_slot: self.media_slot.clone(),
        }
    }
}

impl<L: MediaLoader> FrameSampler<L> {
    pub fn new(loader: L, config: SamplerConfig) -> Self {
        Self {
            loader: Arc::new(loader),
            config,
            current: Arc::new(Mutex::new(None)),
            media_slot: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    /// Capture the configured number of frames from `url`.
    pub async fn capture(
        &self,
        url: &str,
        target_frame: usize,
        progress: Option<Sender<Progress>>,
    ) -> Result<FrameSet, Error> {
        self.capture_frames(url, target_frame, self.config.total_frames, progress)
            .await
    }

    /// Capture `total_frames` evenly spaced frames from `url`.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidParameters`] when `total_frames` is zero.
    /// - [`Error::MediaLoad`] when the media cannot be opened, never becomes
    ///   playable or reports an unusable duration.
    /// - [`Error::CaptureAborted`] when a newer capture or
    ///   [`FrameSampler::release`] superseded this one.
    ///
    /// A frame whose seek or draw fails is replaced by a blank bitmap and
    /// listed in [`FrameSet::blank_indices`].
    pub async fn capture_frames(
        &self,
        url: &str,
        target_frame: usize,
        total_frames: usize,
        progress: Option<Sender<Progress>>,
    ) -> Result<FrameSet, Error> {
        if total_frames == 0 {
            return Err(Error::InvalidParameters(
                "total_frames must be at least 1".to_owned(),
            ));
        }

        let token = self.supersede();
        let _slot = aborted_by(&token, self.media_slot.lock()).await?;

        debug!("Loading {}", url);
        let element = aborted_by(&token, self.loader.open(url))
            .await?
            .map_err(into_media_load)?;
        let mut media = MediaGuard::new(element);

        let info = aborted_by(&token, media.wait_metadata())
            .await?
            .map_err(into_media_load)?;
        aborted_by(&token, media.wait_can_play_through())
            .await?
            .map_err(into_media_load)?;

        if !(info.duration.is_finite() && info.duration > 0.0) {
            return Err(Error::MediaLoad(format!(
                "{} reports unusable duration {}",
                url, info.duration
            )));
        }

        let time_step = info.duration / total_frames as f64;
        let target_frame_index = clamp_target(target_frame, total_frames);
        let mut frames = Vec::with_capacity(total_frames);
        let mut blank_indices = Vec::new();

        for index in 0..total_frames {
            let time = index as f64 * time_step;
            match self.capture_one(&token, &mut media, index, time).await {
                Ok(frame) => frames.push(frame),
                Err(Error::CaptureAborted) => {
                    debug!("Capture of {} aborted at frame {}", url, index);
                    return Err(Error::CaptureAborted);
                }
                Err(err) => {
                    warn!("{}: using a blank frame", err);
                    frames.push(RgbaImage::new(info.width, info.height));
                    blank_indices.push(index);
                }
            }

            if let Some(progress) = &progress {
                let update = Progress {
                    current: index + 1,
                    total: total_frames,
                };
                let _ = aborted_by(&token, progress.send(update)).await?;
            }

            if self.config.yield_interval > 0 && index % self.config.yield_interval == 0 {
                aborted_by(&token, tokio::task::yield_now()).await?;
            }
        }

        drop(media);
        debug!(
            "Captured {} frames from {} ({} blank)",
            frames.len(),
            url,
            blank_indices.len()
        );

        Ok(FrameSet {
            frames,
            target_frame_index,
            blank_indices,
            info,
        })
    }

    /// Cancel the running capture, if any. Used when the viewer goes away.
    pub fn release(&self) {
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(token) = current.take() {
            debug!("Releasing sampler");
            token.cancel();
        }
    }

    fn supersede(&self) -> CancellationToken {
        let token = CancellationToken::new();
        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = current.replace(token.clone()) {
            previous.cancel();
        }
        token
    }

    async fn capture_one(
        &self,
        token: &CancellationToken,
        media: &mut L::Element,
        index: usize,
        time: f64,
    ) -> Result<RgbaImage, Error> {
        let frame_error = |reason: String| Error::FrameCapture { index, reason };

        match aborted_by(
            token,
            tokio::time::timeout(self.config.seek_timeout, media.seek(time)),
        )
        .await?
        {
            Ok(Ok(())) => {}
            Ok(Err(err)) => return Err(frame_error(err.to_string())),
            Err(_) => {
                return Err(frame_error(format!(
                    "seek to {:.3}s timed out after {:?}",
                    time, self.config.seek_timeout
                )));
            }
        }

        if !self.config.settle_delay.is_zero() {
            aborted_by(token, tokio::time::sleep(self.config.settle_delay)).await?;
        }

        media.draw().map_err(|err| frame_error(err.to_string()))
    }
}

/// Run `future` unless `token` is cancelled first.
async fn aborted_by<T>(
    token: &CancellationToken,
    future: impl Future<Output = T>,
) -> Result<T, Error> {
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(Error::CaptureAborted),
        value = future => Ok(value),
    }
}

fn into_media_load(err: Error) -> Error {
    match err {
        Error::MediaLoad(_) | Error::CaptureAborted => err,
        other => Error::MediaLoad(other.to_string()),
    }
}
