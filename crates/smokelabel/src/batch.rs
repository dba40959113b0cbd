// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Smokelabel Contributors. All Rights Reserved.

//! Label batches: the boxes a user reviews in one page of work.
//!
//! Each [`BatchItem`] carries one proposed box plus the video it was detected
//! in. The host attaches one [`AnnotationOverlay`] and one
//! [`FrameSampler`] per item, loads every viewer with [`load_frames`], and
//! submits [`collect_labels`] when the user is done.

use crate::{
    Error,
    config::MediaSettings,
    geometry::{BoxMetadata, Container},
    label::LabelEntry,
    media::MediaLoader,
    overlay::{AnnotationOverlay, OverlayConfig},
    sampler::{FrameSampler, FrameSet},
};
use futures::future::join_all;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader, path::Path};
use url::Url;

/// The video a box was detected in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoDescriptor {
    /// Index into [`MediaSettings::camera_names`].
    pub camera_id: usize,
    pub url_part: String,
    pub file_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchItem {
    #[serde(flatten)]
    pub meta: BoxMetadata,
    /// Frame showing the box, 1-based.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_number: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url_root: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<VideoDescriptor>,
}

impl BatchItem {
    /// 0-based index of the frame to annotate.
    pub fn target_frame(&self) -> usize {
        self.frame_number.unwrap_or(0).saturating_sub(1)
    }

    /// Build the media URL: `{url_root}{camera_name}/{url_part}/{file_name}.mp4`.
    pub fn video_url(&self, media: &MediaSettings) -> Result<Url, Error> {
        let id = self.meta.id;
        let video = self.video.as_ref().ok_or_else(|| {
            Error::InvalidParameters(format!("box {} has no video descriptor", id))
        })?;
        let root = self
            .url_root
            .as_deref()
            .ok_or_else(|| Error::InvalidParameters(format!("box {} has no url_root", id)))?;
        let camera = media.camera_name(video.camera_id).ok_or_else(|| {
            Error::InvalidParameters(format!(
                "box {} references unknown camera {}",
                id, video.camera_id
            ))
        })?;

        Ok(Url::parse(&format!(
            "{}{}/{}/{}.mp4",
            root, camera, video.url_part, video.file_name
        ))?)
    }
}

/// A batch as delivered by the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelBatch {
    pub data: Vec<BatchItem>,
}

impl LabelBatch {
    pub fn from_json(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, Error> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Attach one overlay per item, all in containers of the same size.
    pub fn attach(&self, container: Container, config: OverlayConfig) -> Vec<AnnotationOverlay> {
        self.data
            .iter()
            .map(|item| AnnotationOverlay::attach(item.meta.clone(), container, config))
            .collect()
    }
}

/// Outcome of loading every viewer of a batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchLoadReport {
    pub loaded: usize,
    /// Box ids whose media failed, with the reason.
    pub failed: Vec<(i64, String)>,
    /// Viewers superseded by a newer batch.
    pub aborted: usize,
}

impl BatchLoadReport {
    /// True when the host should tell the user some media failed to load.
    pub fn some_media_failed(&self) -> bool {
        !self.failed.is_empty()
    }
}

/// Per-item frame sets plus the aggregated report.
#[derive(Debug)]
pub struct BatchLoad {
    pub frames: Vec<Result<FrameSet, Error>>,
    pub report: BatchLoadReport,
}

/// Capture the frames of every item concurrently, one sampler per viewer.
///
/// A failing viewer never blocks the others; its error is kept in its slot
/// and counted in the report.
pub async fn load_frames<L: MediaLoader>(
    samplers: &[FrameSampler<L>],
    items: &[BatchItem],
    media: &MediaSettings,
) -> Result<BatchLoad, Error> {
    if samplers.len() != items.len() {
        return Err(Error::InvalidParameters(format!(
            "{} samplers for {} batch items",
            samplers.len(),
            items.len()
        )));
    }

    let tasks = samplers.iter().zip(items).map(|(sampler, item)| async move {
        let url = item.video_url(media)?;
        sampler.capture(url.as_str(), item.target_frame(), None).await
    });
    let frames = join_all(tasks).await;

    let mut report = BatchLoadReport::default();
    for (result, item) in frames.iter().zip(items) {
        match result {
            Ok(_) => report.loaded += 1,
            Err(err) if err.is_aborted() => report.aborted += 1,
            Err(err) => {
                warn!("Media for box {} failed to load: {}", item.meta.id, err);
                report.failed.push((item.meta.id, err.to_string()));
            }
        }
    }
    debug!("Batch load finished: {:?}", report);

    Ok(BatchLoad { frames, report })
}

/// The label submission for a batch. Empty when the labels are ignored.
pub fn collect_labels(overlays: &[AnnotationOverlay], ignore_labels: bool) -> Vec<LabelEntry> {
    if ignore_labels {
        return Vec::new();
    }
    overlays.iter().map(AnnotationOverlay::label).collect()
}
