// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Smokelabel Contributors. All Rights Reserved.

//! Keeps an overlay box's relative placement stable while its container
//! reflows, independent of any drag or resize gesture.

use crate::geometry::{OverlayBox, Size};
use log::trace;

/// Rescales an overlay box whenever its container reports a new size.
///
/// The first observation only records the size; there is nothing to compare
/// it against yet.
#[derive(Debug, Clone, Default)]
pub struct ContainerResizeAdapter {
    border: f64,
    previous: Option<Size>,
}

impl ContainerResizeAdapter {
    pub fn new(border: f64) -> Self {
        Self {
            border,
            previous: None,
        }
    }

    /// Adapter that already knows the container's current size.
    pub fn with_initial(border: f64, size: Size) -> Self {
        Self {
            border,
            previous: Some(size),
        }
    }

    /// The last observed container size.
    pub fn last_size(&self) -> Option<Size> {
        self.previous
    }

    /// Record `size` and return `bbox` rescaled from the previous size.
    ///
    /// Returns `None` on the first observation, when the size is unchanged,
    /// or when either size leaves no room beyond the border. A collapsed
    /// size is not recorded, so the next usable size rescales from the last
    /// usable one.
    pub fn observe(&mut self, size: Size, bbox: &OverlayBox) -> Option<OverlayBox> {
        let border = self.border;
        if size.width - border <= 0.0 || size.height - border <= 0.0 {
            trace!("Ignoring collapsed container size {:?}", size);
            return None;
        }

        let previous = self.previous.replace(size)?;
        if previous == size {
            return None;
        }

        let old_width = previous.width - border;
        let old_height = previous.height - border;
        if old_width <= 0.0 || old_height <= 0.0 {
            trace!("Skipping rescale from degenerate size {:?}", previous);
            return None;
        }

        let width_scale = (size.width - border) / old_width;
        let height_scale = (size.height - border) / old_height;

        Some(OverlayBox {
            left: (bbox.left - border) * width_scale + border,
            top: (bbox.top - border) * height_scale + border,
            width: (bbox.width - border) * width_scale + border,
            height: (bbox.height - border) * height_scale + border,
        })
    }
}
