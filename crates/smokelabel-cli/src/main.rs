// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Smokelabel Contributors. All Rights Reserved.

use clap::{Parser, Subcommand};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use smokelabel::{
    AnnotationOverlay, Classification, Container, Error, FramePlaybackController, FrameSampler,
    ImageSequenceLoader, LabelBatch, OverlayBox, Progress, Settings, collect_labels,
};
use std::{collections::BTreeMap, fs::File, io::BufReader, path::PathBuf};
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Settings file (TOML, JSON or YAML), applied before SMOKELABEL_*
    /// environment overrides
    #[clap(long, env = "SMOKELABEL_CONFIG")]
    config: Option<PathBuf>,

    /// Command
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, PartialEq, Clone, Debug)]
enum Command {
    /// Print the overlay geometry of every box in a label batch for a
    /// container of the given size.
    Overlay {
        /// Label batch JSON file
        batch: PathBuf,

        /// Container width in pixels
        #[clap(long)]
        width: f64,

        /// Container height in pixels
        #[clap(long)]
        height: f64,

        /// Border between the container edge and the image
        #[clap(long)]
        border: Option<f64>,
    },
    /// Apply recorded edits to a label batch and print the label payload.
    Label {
        /// Label batch JSON file
        batch: PathBuf,

        /// Container width in pixels
        #[clap(long)]
        width: f64,

        /// Container height in pixels
        #[clap(long)]
        height: f64,

        /// Recorded edits: a JSON object mapping box ids to an overlay box
        /// or to "hidden"
        #[clap(long)]
        edits: Option<PathBuf>,

        /// Discard the labels and submit nothing
        #[clap(long)]
        ignore: bool,
    },
    /// Sample frames from an image-sequence directory and write them as PNG
    /// files.
    Sample {
        /// Directory of frames or a file:// URL
        source: String,

        /// Output directory
        #[clap(long)]
        output: PathBuf,

        /// Frame to annotate (0-based)
        #[clap(long, default_value_t = 0)]
        target: usize,

        /// Number of frames to sample
        #[clap(long)]
        total: Option<usize>,

        /// Frame rate of the source sequence
        #[clap(long)]
        fps: Option<f64>,
    },
    /// Simulate playback and print each frame shown until it comes to rest.
    Play {
        /// Number of sampled frames
        #[clap(long)]
        total: Option<usize>,

        /// Frame to annotate (0-based)
        #[clap(long, default_value_t = 0)]
        target: usize,

        /// Playback rate
        #[clap(long)]
        fps: Option<f64>,
    },
}

#[derive(Serialize)]
struct OverlayRow {
    id: i64,
    #[serde(flatten)]
    bbox: OverlayBox,
    #[serde(skip_serializing_if = "Option::is_none")]
    classification: Option<Classification>,
}

/// A recorded edit for one box.
#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum Edit {
    Box(OverlayBox),
    Keyword(String),
}

fn handle_overlay(
    settings: &Settings,
    batch: PathBuf,
    container: Container,
    border: Option<f64>,
) -> Result<(), Error> {
    let mut config = settings.overlay_config();
    if let Some(border) = border {
        config.editor.border = border;
    }

    let batch = LabelBatch::from_path(&batch)?;
    let rows: Vec<OverlayRow> = batch
        .attach(container, config)
        .iter()
        .map(|overlay| OverlayRow {
            id: overlay.id(),
            bbox: overlay.current_box(),
            classification: overlay.classification(),
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&rows)?);
    Ok(())
}

fn apply_edits(
    overlays: &mut [AnnotationOverlay],
    edits: BTreeMap<i64, Edit>,
) -> Result<(), Error> {
    for (id, edit) in edits {
        let Some(overlay) = overlays.iter_mut().find(|o| o.id() == id) else {
            warn!("Ignoring edit for unknown box {}", id);
            continue;
        };

        match edit {
            Edit::Box(bbox) => overlay.apply_edit(bbox),
            Edit::Keyword(keyword) if keyword == "hidden" => overlay.set_visible(false),
            Edit::Keyword(keyword) => {
                return Err(Error::InvalidParameters(format!(
                    "unknown edit {:?} for box {}",
                    keyword, id
                )));
            }
        }
    }
    Ok(())
}

fn handle_label(
    settings: &Settings,
    batch: PathBuf,
    container: Container,
    edits: Option<PathBuf>,
    ignore: bool,
) -> Result<(), Error> {
    let batch = LabelBatch::from_path(&batch)?;
    let mut overlays = batch.attach(container, settings.overlay_config());

    if let Some(edits) = edits {
        let reader = BufReader::new(File::open(edits)?);
        let edits: BTreeMap<i64, Edit> = serde_json::from_reader(reader)?;
        apply_edits(&mut overlays, edits)?;
    }

    let labels = collect_labels(&overlays, ignore);
    println!("{}", serde_json::to_string_pretty(&labels)?);
    Ok(())
}

/// Report a progress task that did not finish cleanly. Returns true when it
/// did.
fn progress_finished(result: Result<(), tokio::task::JoinError>) -> bool {
    match result {
        Ok(()) => true,
        Err(err) => {
            warn!("Progress reporting failed: {}", err);
            false
        }
    }
}

async fn handle_sample(
    settings: &Settings,
    source: String,
    output: PathBuf,
    target: usize,
    total: Option<usize>,
    fps: Option<f64>,
) -> Result<(), Error> {
    use indicatif::{ProgressBar, ProgressStyle};
    use tokio::sync::mpsc;

    let total = total.unwrap_or(settings.sampler.total_frames);
    let fps = fps.unwrap_or(settings.media.sequence_fps);
    let sampler = FrameSampler::new(ImageSequenceLoader::new(fps), settings.sampler_config());

    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template(
            "[{elapsed_precise} ETA: {eta}] {msg}: {wide_bar:.yellow} {human_pos}/{human_len}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▇▆▅▄▃▂▁  "),
    );
    bar.set_message("Sampling");

    let (tx, mut rx) = mpsc::channel::<Progress>(1);

    let progress_bar = bar.clone();
    let progress = tokio::spawn(async move {
        while let Some(progress) = rx.recv().await {
            if progress.total > 0 {
                progress_bar.set_length(progress.total as u64);
                progress_bar.set_position(progress.current as u64);
            }
        }
    });

    let frames = sampler.capture_frames(&source, target, total, Some(tx)).await;
    progress_finished(progress.await);
    bar.finish_and_clear();
    let frames = frames?;

    if !frames.is_complete() {
        warn!(
            "{} of {} frames could not be captured: {:?}",
            frames.blank_indices.len(),
            frames.len(),
            frames.blank_indices
        );
    }

    std::fs::create_dir_all(&output)?;
    for (index, frame) in frames.frames.iter().enumerate() {
        frame.save(output.join(format!("frame_{:03}.png", index)))?;
    }
    info!("Wrote {} frames to {}", frames.len(), output.display());

    println!("target frame: {}", frames.target_frame_index);
    Ok(())
}

async fn handle_play(
    settings: &Settings,
    total: Option<usize>,
    target: usize,
    fps: Option<f64>,
) -> Result<(), Error> {
    let total = total.unwrap_or(settings.sampler.total_frames);
    let mut config = settings.playback_config();
    if let Some(fps) = fps {
        config.fps = fps;
    }

    let mut playback = FramePlaybackController::new(total, target, config)?;
    let stop = CancellationToken::new();

    playback.play_pause();
    println!("{}", playback.counter_label());
    let last = total.saturating_sub(1);
    let end = playback
        .run_until_paused(&stop, |frame| println!("{}/{}", frame, last))
        .await;
    info!("Paused on frame {}", end.frame());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let settings = Settings::load(args.config.as_deref())?;

    match args.cmd {
        Command::Overlay {
            batch,
            width,
            height,
            border,
        } => handle_overlay(&settings, batch, Container::new(width, height), border),
        Command::Label {
            batch,
            width,
            height,
            edits,
            ignore,
        } => handle_label(
            &settings,
            batch,
            Container::new(width, height),
            edits,
            ignore,
        ),
        Command::Sample {
            source,
            output,
            target,
            total,
            fps,
        } => handle_sample(&settings, source, output, target, total, fps).await,
        Command::Play { total, target, fps } => handle_play(&settings, total, target, fps).await,
    }
}
