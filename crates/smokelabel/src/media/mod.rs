// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Smokelabel Contributors. All Rights Reserved.

//! The media seam driven by [`FrameSampler`](crate::FrameSampler).
//!
//! A [`MediaLoader`] opens a source URL into a [`MediaElement`], the
//! equivalent of an offscreen video element: it reports its metadata, seeks
//! and draws the frame at the current position. The sampler never issues two
//! seeks against one element at a time.

mod sequence;

pub use sequence::{ImageSequence, ImageSequenceLoader};

use crate::Error;
use image::RgbaImage;
use std::{
    future::Future,
    ops::{Deref, DerefMut},
};

/// Properties known once the media metadata has loaded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaInfo {
    /// Duration in seconds.
    pub duration: f64,
    pub width: u32,
    pub height: u32,
}

/// Opens media sources.
pub trait MediaLoader {
    type Element: MediaElement;

    fn open(&self, url: &str) -> impl Future<Output = Result<Self::Element, Error>>;
}

/// One loaded media resource.
pub trait MediaElement {
    /// Resolves once duration and dimensions are known.
    fn wait_metadata(&mut self) -> impl Future<Output = Result<MediaInfo, Error>>;

    /// Resolves once the whole resource can be played without stalling.
    fn wait_can_play_through(&mut self) -> impl Future<Output = Result<(), Error>>;

    /// Move to `time` seconds. Resolves when the seek completed.
    fn seek(&mut self, time: f64) -> impl Future<Output = Result<(), Error>>;

    /// Draw the frame at the current position into a fresh bitmap.
    fn draw(&mut self) -> Result<RgbaImage, Error>;

    /// Release every resource held by the element.
    fn unload(&mut self);
}

/// Unloads the wrapped element when dropped.
///
/// The sampler keeps media behind this guard so success, failure, and an
/// aborted or dropped capture all release it.
pub(crate) struct MediaGuard<E: MediaElement>(E);

impl<E: MediaElement> MediaGuard<E> {
    pub(crate) fn new(element: E) -> Self {
        Self(element)
    }
}

impl<E: MediaElement> Deref for MediaGuard<E> {
    type Target = E;

    fn deref(&self) -> &E {
        &self.0
    }
}

impl<E: MediaElement> DerefMut for MediaGuard<E> {
    fn deref_mut(&mut self) -> &mut E {
        &mut self.0
    }
}

impl<E: MediaElement> Drop for MediaGuard<E> {
    fn drop(&mut self) {
        self.0.unload();
    }
}
