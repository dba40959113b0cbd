// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Smokelabel Contributors. All Rights Reserved.

//! # Smokelabel
//!
//! The annotation engine behind a citizen-science smoke labeling tool. Users
//! view frames sampled from industrial webcam videos and confirm, adjust or
//! remove the bounding boxes a model proposed around smoke emissions.
//!
//! ## Features
//!
//! - **Coordinate mapping**: convert boxes between source-media pixels and
//!   overlay pixels inside a bordered container
//! - **Box editing**: drag and corner-resize a box under boundary and
//!   minimum-size constraints
//! - **Responsive layout**: keep boxes in place when their container is
//!   resized
//! - **Frame sampling**: extract a fixed number of frames from a media source
//!   with cancellation when a newer source is requested
//! - **Playback**: cycle through sampled frames and come to rest on the frame
//!   being annotated
//! - **Label payloads**: turn the user's edits into the server's label format
//!
//! ## Quick Start
//!
//! ```rust
//! use smokelabel::{
//!     AnnotationOverlay, Container, LabelBatch, OverlayConfig, Point, RelativeBoxes,
//!     collect_labels,
//! };
//!
//! let batch = LabelBatch::from_json(
//!     r#"{"data": [{"id": 1, "w_image": 900, "h_image": 900,
//!          "x_bbox": 366, "y_bbox": 96, "w_bbox": 75, "h_bbox": 123}]}"#,
//! )?;
//! let mut overlays = batch.attach(Container::new(420.0, 420.0), OverlayConfig::default());
//!
//! // Drag the first box to the right
//! overlays[0].press(Point::new(200.0, 90.0));
//! overlays[0].pointer_move(Point::new(242.0, 90.0));
//! overlays[0].pointer_up();
//!
//! let labels = collect_labels(&overlays, false);
//! assert!(matches!(labels[0].relative_boxes, RelativeBoxes::Edited(b) if b.x == 456));
//! # Ok::<(), smokelabel::Error>(())
//! ```

mod batch;
mod config;
mod editor;
mod error;
mod geometry;
mod label;
pub mod media;
mod overlay;
mod playback;
mod resize;
mod sampler;

pub use crate::{
    batch::{
        BatchItem, BatchLoad, BatchLoadReport, LabelBatch, VideoDescriptor, collect_labels,
        load_frames,
    },
    config::{
        ENV_PREFIX, MediaSettings, OverlaySettings, PlaybackSettings, SamplerSettings, Settings,
    },
    editor::{
        BoxGeometryEngine, EditorConfig, EngineState, Gesture, Handle, InteractionState,
        MIN_HEIGHT, MIN_WIDTH,
    },
    error::Error,
    geometry::{
        BoxMetadata, Classification, Container, OverlayBox, Point, Size, SourceBox, to_overlay,
        to_source,
    },
    label::{LabelEntry, RelativeBoxes},
    media::{ImageSequenceLoader, MediaElement, MediaInfo, MediaLoader},
    overlay::{
        AnnotationOverlay, DEFAULT_BORDER, DEFAULT_HANDLE_SIZE, HandleSet, HitTarget,
        OverlayConfig,
    },
    playback::{DEFAULT_FPS, FramePlaybackController, PlaybackConfig, PlaybackState},
    resize::ContainerResizeAdapter,
    sampler::{
        DEFAULT_TOTAL_FRAMES, FrameSampler, FrameSet, Progress, SamplerConfig, clamp_target,
    },
};
