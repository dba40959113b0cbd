// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Smokelabel Contributors. All Rights Reserved.

//! Frame sampler behaviour against a scripted in-memory media backend.

use image::{Rgba, RgbaImage};
use smokelabel::{
    BatchItem, Error, FrameSampler, LabelBatch, MediaElement, MediaInfo, MediaLoader,
    MediaSettings, Progress, SamplerConfig, load_frames,
};
use std::{
    collections::HashSet,
    sync::{Arc, Mutex},
    time::Duration,
};
use tokio::time::sleep;

// =============================================================================
// Scripted backend
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Event {
    Open(String),
    Seek(String, f64),
    Draw(String),
    Unload(String),
}

#[derive(Debug, Clone)]
struct Script {
    duration: f64,
    seek_delay: Duration,
    /// Urls containing this text fail to open.
    broken: Option<String>,
    fail_metadata: bool,
    /// Seek numbers that never complete.
    hanging_seeks: HashSet<usize>,
    /// Frame positions that fail to draw.
    failing_draws: HashSet<usize>,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            duration: 7.2,
            seek_delay: Duration::ZERO,
            broken: None,
            fail_metadata: false,
            hanging_seeks: HashSet::new(),
            failing_draws: HashSet::new(),
        }
    }
}

#[derive(Clone, Default)]
struct ScriptedLoader {
    script: Script,
    events: Arc<Mutex<Vec<Event>>>,
}

impl ScriptedLoader {
    fn new(script: Script) -> Self {
        Self {
            script,
            events: Arc::default(),
        }
    }

    fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    fn log(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }
}

impl MediaLoader for ScriptedLoader {
    type Element = ScriptedMedia;

    async fn open(&self, url: &str) -> Result<ScriptedMedia, Error> {
        self.log(Event::Open(url.to_owned()));
        if self
            .script
            .broken
            .as_ref()
            .is_some_and(|broken| url.contains(broken.as_str()))
        {
            return Err(Error::MediaLoad(format!("404 for {}", url)));
        }
        Ok(ScriptedMedia {
            url: url.to_owned(),
            loader: self.clone(),
            seeks: 0,
            position: 0,
        })
    }
}

struct ScriptedMedia {
    url: String,
    loader: ScriptedLoader,
    seeks: usize,
    position: usize,
}

impl MediaElement for ScriptedMedia {
    async fn wait_metadata(&mut self) -> Result<MediaInfo, Error> {
        if self.loader.script.fail_metadata {
            return Err(Error::InvalidParameters("corrupt header".to_owned()));
        }
        Ok(MediaInfo {
            duration: self.loader.script.duration,
            width: 2,
            height: 2,
        })
    }

    async fn wait_can_play_through(&mut self) -> Result<(), Error> {
        Ok(())
    }

    async fn seek(&mut self, time: f64) -> Result<(), Error> {
        let n = self.seeks;
        self.seeks += 1;
        self.loader.log(Event::Seek(self.url.clone(), time));
        if self.loader.script.hanging_seeks.contains(&n) {
            std::future::pending::<()>().await;
        }
        if !self.loader.script.seek_delay.is_zero() {
            sleep(self.loader.script.seek_delay).await;
        }
        self.position = n;
        Ok(())
    }

    fn draw(&mut self) -> Result<RgbaImage, Error> {
        self.loader.log(Event::Draw(self.url.clone()));
        if self.loader.script.failing_draws.contains(&self.position) {
            return Err(Error::InvalidParameters("tainted canvas".to_owned()));
        }
        Ok(RgbaImage::from_pixel(
            2,
            2,
            Rgba([self.position as u8, 0, 0, 255]),
        ))
    }

    fn unload(&mut self) {
        self.loader.log(Event::Unload(self.url.clone()));
    }
}

fn scripted(script: Script) -> (FrameSampler<ScriptedLoader>, ScriptedLoader) {
    let loader = ScriptedLoader::new(script);
    (
        FrameSampler::new(loader.clone(), SamplerConfig::default()),
        loader,
    )
}

fn count(events: &[Event], pred: impl Fn(&Event) -> bool) -> usize {
    events.iter().filter(|e| pred(e)).count()
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_captures_fixed_count_in_time_order() -> Result<(), Error> {
    let (sampler, loader) = scripted(Script::default());
    let frames = sampler.capture_frames("mem://a", 50, 36, None).await?;

    assert_eq!(frames.len(), 36);
    assert_eq!(frames.target_frame_index, 35);
    assert!(frames.is_complete());
    for (i, frame) in frames.frames.iter().enumerate() {
        assert_eq!(frame.get_pixel(0, 0)[0], i as u8);
    }

    let events = loader.events();
    let seeks: Vec<f64> = events
        .iter()
        .filter_map(|e| match e {
            Event::Seek(_, t) => Some(*t),
            _ => None,
        })
        .collect();
    assert_eq!(seeks.len(), 36);
    assert!(seeks.windows(2).all(|w| w[0] < w[1]));
    assert!((seeks[1] - 0.2).abs() < 1e-9);
    assert_eq!(events.last(), Some(&Event::Unload("mem://a".to_owned())));
    assert_eq!(count(&events, |e| matches!(e, Event::Unload(_))), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_frame_count_independent_of_duration() -> Result<(), Error> {
    for duration in [0.5, 3.0, 120.0] {
        let (sampler, _) = scripted(Script {
            duration,
            ..Default::default()
        });
        let frames = sampler.capture("mem://d", 0, None).await?;
        assert_eq!(frames.len(), 36);
    }
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_failed_draw_uses_blank_frame() -> Result<(), Error> {
    let (sampler, _) = scripted(Script {
        failing_draws: HashSet::from([3, 17]),
        ..Default::default()
    });
    let frames = sampler.capture_frames("mem://b", 0, 36, None).await?;

    assert_eq!(frames.len(), 36);
    assert_eq!(frames.blank_indices, vec![3, 17]);
    let blank = &frames.frames[3];
    assert_eq!(blank.dimensions(), (2, 2));
    assert!(blank.pixels().all(|p| p == &Rgba([0, 0, 0, 0])));
    assert_eq!(frames.frames[4].get_pixel(0, 0)[0], 4);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_seek_timeout_uses_blank_frame() -> Result<(), Error> {
    let (sampler, _) = scripted(Script {
        hanging_seeks: HashSet::from([5]),
        ..Default::default()
    });
    let frames = sampler.capture_frames("mem://c", 0, 12, None).await?;
    assert_eq!(frames.len(), 12);
    assert_eq!(frames.blank_indices, vec![5]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_media_load_errors() {
    let (sampler, loader) = scripted(Script {
        broken: Some("missing".to_owned()),
        ..Default::default()
    });
    let err = sampler
        .capture_frames("mem://missing", 0, 36, None)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::MediaLoad(_)), "{}", err);
    assert!(!err.is_aborted());
    assert_eq!(loader.events(), vec![Event::Open("mem://missing".to_owned())]);

    let (sampler, loader) = scripted(Script {
        fail_metadata: true,
        ..Default::default()
    });
    let err = sampler.capture("mem://e", 0, None).await.unwrap_err();
    assert!(matches!(err, Error::MediaLoad(ref s) if s.contains("corrupt header")));
    // Opened media is still released
    assert_eq!(
        loader.events().last(),
        Some(&Event::Unload("mem://e".to_owned()))
    );
}

#[tokio::test(start_paused = true)]
async fn test_unusable_duration() {
    for duration in [0.0, f64::NAN, f64::INFINITY] {
        let (sampler, _) = scripted(Script {
            duration,
            ..Default::default()
        });
        let err = sampler.capture("mem://f", 0, None).await.unwrap_err();
        assert!(matches!(err, Error::MediaLoad(_)), "{}", err);
    }

    let (sampler, _) = scripted(Script::default());
    let err = sampler.capture_frames("mem://g", 0, 0, None).await;
    assert!(matches!(err, Err(Error::InvalidParameters(_))));
}

#[tokio::test(start_paused = true)]
async fn test_newer_capture_supersedes_older() {
    let (first, loader) = scripted(Script {
        seek_delay: Duration::from_millis(5),
        ..Default::default()
    });
    let second = first.clone();

    let (old, new) = tokio::join!(first.capture("mem://old", 0, None), async {
        sleep(Duration::from_millis(50)).await;
        second.capture("mem://new", 0, None).await
    });

    assert!(old.unwrap_err().is_aborted());
    assert_eq!(new.unwrap().len(), 36);

    let events = loader.events();
    let old_unload = events
        .iter()
        .position(|e| e == &Event::Unload("mem://old".to_owned()))
        .unwrap();
    let new_open = events
        .iter()
        .position(|e| e == &Event::Open("mem://new".to_owned()))
        .unwrap();
    assert!(old_unload < new_open);

    // Nothing from the superseded capture after the newer one started
    assert!(events[new_open..].iter().all(|e| match e {
        Event::Seek(url, _) | Event::Draw(url) | Event::Unload(url) | Event::Open(url) =>
            url == "mem://new",
    }));
    let old_draws = count(&events, |e| e == &Event::Draw("mem://old".to_owned()));
    assert!(old_draws < 36);
}

#[tokio::test(start_paused = true)]
async fn test_release_aborts_and_unloads() {
    let (sampler, loader) = scripted(Script {
        seek_delay: Duration::from_millis(5),
        ..Default::default()
    });

    let (result, _) = tokio::join!(sampler.capture("mem://r", 0, None), async {
        sleep(Duration::from_millis(30)).await;
        sampler.release();
    });

    assert!(result.unwrap_err().is_aborted());
    assert_eq!(
        loader.events().last(),
        Some(&Event::Unload("mem://r".to_owned()))
    );
}

#[tokio::test(start_paused = true)]
async fn test_dropped_capture_unloads() {
    let (sampler, loader) = scripted(Script {
        seek_delay: Duration::from_millis(5),
        ..Default::default()
    });

    let result = tokio::time::timeout(
        Duration::from_millis(30),
        sampler.capture("mem://t", 0, None),
    )
    .await;
    assert!(result.is_err());
    assert_eq!(
        loader.events().last(),
        Some(&Event::Unload("mem://t".to_owned()))
    );
}

#[tokio::test(start_paused = true)]
async fn test_progress_reports_every_frame() -> Result<(), Error> {
    let (sampler, _) = scripted(Script::default());
    let (tx, mut rx) = tokio::sync::mpsc::channel(64);

    let frames = sampler.capture_frames("mem://p", 0, 36, Some(tx)).await?;
    assert_eq!(frames.len(), 36);

    let mut updates = Vec::new();
    while let Some(progress) = rx.recv().await {
        updates.push(progress);
    }
    assert_eq!(updates.len(), 36);
    assert_eq!(
        updates.last(),
        Some(&Progress {
            current: 36,
            total: 36
        })
    );
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_batch_load_reports_failed_media() -> Result<(), Error> {
    let batch = LabelBatch::from_json(
        r#"{"data": [
            {"id": 1, "w_image": 900, "h_image": 900, "x_bbox": 0, "y_bbox": 0,
             "w_bbox": 10, "h_bbox": 10, "frame_number": 40, "url_root": "https://cams.example/",
             "video": {"camera_id": 1, "url_part": "abc", "file_name": "abc-0"}},
            {"id": 2, "w_image": 900, "h_image": 900, "x_bbox": 0, "y_bbox": 0,
             "w_bbox": 10, "h_bbox": 10, "frame_number": 3, "url_root": "https://cams.example/",
             "video": {"camera_id": 2, "url_part": "broken", "file_name": "broken-0"}}
        ]}"#,
    )?;

    let loader = ScriptedLoader::new(Script {
        broken: Some("broken".to_owned()),
        ..Default::default()
    });
    let samplers: Vec<_> = batch
        .data
        .iter()
        .map(|_| FrameSampler::new(loader.clone(), SamplerConfig::default()))
        .collect();

    let load = load_frames(&samplers, &batch.data, &MediaSettings::default()).await?;
    assert_eq!(load.report.loaded, 1);
    assert!(load.report.some_media_failed());
    assert_eq!(load.report.failed[0].0, 2);

    let first = load.frames[0].as_ref().unwrap();
    assert_eq!(first.target_frame_index, 35);
    assert!(load.frames[1].is_err());

    assert!(loader.events().contains(&Event::Open(
        "https://cams.example/kooksfabriek_1/abc/abc-0.mp4".to_owned()
    )));

    let mismatched: &[BatchItem] = &batch.data[..1];
    assert!(load_frames(&samplers, mismatched, &MediaSettings::default())
        .await
        .is_err());
    Ok(())
}
