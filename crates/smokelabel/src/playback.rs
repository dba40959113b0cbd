// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Smokelabel Contributors. All Rights Reserved.

//! Frame playback for a sampled [`FrameSet`](crate::FrameSet).
//!
//! Playback always starts at frame 0 and, whether it runs off the end or is
//! stopped, always comes to rest on the target frame the user annotates.

use crate::Error;
use log::debug;
use std::time::Duration;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;

/// Default playback rate in frames per second.
pub const DEFAULT_FPS: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackConfig {
    pub fps: f64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self { fps: DEFAULT_FPS }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Paused(usize),
    Playing(usize),
}

impl PlaybackState {
    /// The frame shown in this state.
    pub fn frame(&self) -> usize {
        match self {
            PlaybackState::Paused(index) | PlaybackState::Playing(index) => *index,
        }
    }

    pub fn is_playing(&self) -> bool {
        matches!(self, PlaybackState::Playing(_))
    }
}

/// Decides which sampled frame the host draws.
#[derive(Debug, Clone)]
pub struct FramePlaybackController {
    total_frames: usize,
    target_frame: usize,
    state: PlaybackState,
    frame_interval: Duration,
}

impl FramePlaybackController {
    /// Controller paused on `target_frame`, clamped into range.
    pub fn new(
        total_frames: usize,
        target_frame: usize,
        config: PlaybackConfig,
    ) -> Result<Self, Error> {
        if total_frames == 0 {
            return Err(Error::InvalidParameters(
                "playback needs at least one frame".to_owned(),
            ));
        }
        if !(config.fps.is_finite() && config.fps > 0.0) {
            return Err(Error::InvalidParameters(format!(
                "invalid playback rate {}",
                config.fps
            )));
        }

        let target_frame = target_frame.min(total_frames - 1);
        Ok(Self {
            total_frames,
            target_frame,
            state: PlaybackState::Paused(target_frame),
            frame_interval: Duration::from_secs_f64(1.0 / config.fps),
        })
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn current_frame(&self) -> usize {
        self.state.frame()
    }

    pub fn target_frame(&self) -> usize {
        self.target_frame
    }

    pub fn total_frames(&self) -> usize {
        self.total_frames
    }

    pub fn is_playing(&self) -> bool {
        self.state.is_playing()
    }

    pub fn frame_interval(&self) -> Duration {
        self.frame_interval
    }

    /// Counter text shown next to the slider, e.g. `12/35`.
    pub fn counter_label(&self) -> String {
        format!("{}/{}", self.current_frame(), self.total_frames - 1)
    }

    /// Start from frame 0, or stop and return to the target frame.
    pub fn play_pause(&mut self) -> PlaybackState {
        self.state = match self.state {
            PlaybackState::Paused(_) => PlaybackState::Playing(0),
            PlaybackState::Playing(_) => PlaybackState::Paused(self.target_frame),
        };
        debug!("Playback {:?}", self.state);
        self.state
    }

    /// Stop playing. Does nothing while paused.
    pub fn pause(&mut self) -> PlaybackState {
        if self.state.is_playing() {
            self.state = PlaybackState::Paused(self.target_frame);
        }
        self.state
    }

    /// Advance one frame while playing. Running past the last frame pauses
    /// on the target frame.
    pub fn tick(&mut self) -> PlaybackState {
        if let PlaybackState::Playing(index) = self.state {
            let next = index + 1;
            self.state = if next >= self.total_frames {
                PlaybackState::Paused(self.target_frame)
            } else {
                PlaybackState::Playing(next)
            };
        }
        self.state
    }

    /// Slider input: pause on `index`, clamped to the last frame.
    pub fn seek(&mut self, index: usize) -> PlaybackState {
        self.state = PlaybackState::Paused(index.min(self.total_frames - 1));
        self.state
    }

    /// Make the displayed frame the target frame.
    pub fn mark_target(&mut self) -> usize {
        self.target_frame = self.current_frame();
        self.target_frame
    }

    /// Drive playback on a timer until it pauses.
    ///
    /// `on_frame` receives every frame shown after the current one, ending
    /// with the target frame. Cancelling `stop` pauses playback at the next
    /// tick boundary. Returns immediately when not playing.
    pub async fn run_until_paused<F>(
        &mut self,
        stop: &CancellationToken,
        mut on_frame: F,
    ) -> PlaybackState
    where
        F: FnMut(usize),
    {
        let mut ticker = interval(self.frame_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        while self.state.is_playing() {
            let state = tokio::select! {
                biased;
                _ = stop.cancelled() => self.pause(),
                _ = ticker.tick() => self.tick(),
            };
            on_frame(state.frame());
        }
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller(total: usize, target: usize) -> FramePlaybackController {
        FramePlaybackController::new(total, target, PlaybackConfig::default()).unwrap()
    }

    #[test]
    fn test_initial_state_is_target() {
        let c = controller(36, 50);
        assert_eq!(c.state(), PlaybackState::Paused(35));
        assert_eq!(c.counter_label(), "35/35");
        assert!(FramePlaybackController::new(0, 0, PlaybackConfig::default()).is_err());
        assert!(FramePlaybackController::new(3, 0, PlaybackConfig { fps: 0.0 }).is_err());
    }

    #[test]
    fn test_play_runs_to_end_then_rests_on_target() {
        let mut c = controller(4, 2);
        assert_eq!(c.play_pause(), PlaybackState::Playing(0));
        assert_eq!(c.tick(), PlaybackState::Playing(1));
        assert_eq!(c.tick(), PlaybackState::Playing(2));
        assert_eq!(c.tick(), PlaybackState::Playing(3));
        assert_eq!(c.tick(), PlaybackState::Paused(2));
        // Ticks while paused do nothing
        assert_eq!(c.tick(), PlaybackState::Paused(2));
    }

    #[test]
    fn test_play_pause_toggles_back_to_target() {
        let mut c = controller(36, 7);
        c.play_pause();
        c.tick();
        c.tick();
        assert_eq!(c.play_pause(), PlaybackState::Paused(7));
        assert_eq!(c.pause(), PlaybackState::Paused(7));
    }

    #[test]
    fn test_slider_and_mark_target() {
        let mut c = controller(36, 7);
        assert_eq!(c.seek(100), PlaybackState::Paused(35));
        assert_eq!(c.seek(12), PlaybackState::Paused(12));
        assert_eq!(c.target_frame(), 7);
        assert_eq!(c.current_frame(), 12);
        assert_eq!(c.mark_target(), 12);

        c.play_pause();
        assert_eq!(c.play_pause(), PlaybackState::Paused(12));

        // Slider input during playback pauses on the chosen frame
        c.play_pause();
        assert_eq!(c.seek(3), PlaybackState::Paused(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_until_paused_visits_every_frame() {
        let mut c = controller(5, 3);
        c.play_pause();
        let start = tokio::time::Instant::now();

        let mut shown = Vec::new();
        let stop = CancellationToken::new();
        let end = c.run_until_paused(&stop, |frame| shown.push(frame)).await;

        assert_eq!(end, PlaybackState::Paused(3));
        assert_eq!(shown, vec![1, 2, 3, 4, 3]);
        // Five ticks at 30 fps
        assert!(start.elapsed() >= c.frame_interval() * 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_until_paused_stops_on_cancel() {
        let mut c = controller(36, 9);
        c.play_pause();
        let stop = CancellationToken::new();
        stop.cancel();

        let mut shown = Vec::new();
        let end = c.run_until_paused(&stop, |frame| shown.push(frame)).await;
        assert_eq!(end, PlaybackState::Paused(9));
        assert_eq!(shown, vec![9]);

        // Not playing: returns at once
        let end = c.run_until_paused(&stop, |_| unreachable!()).await;
        assert_eq!(end, PlaybackState::Paused(9));
    }
}
