//! Video to diff map driver.
//!
//! Pulls frames from a [`VideoSource`] in order, reduces them (inline or
//! in chunks on a worker pool), exports previews and feeds the
//! [`DiffAccumulator`]. Cancellation is checked between frames; whatever
//! was accumulated before it stays valid.

use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;

use crate::capture::{RawFrame, SourceError, VideoSource};
use crate::compile::CompileError;
use crate::config::{ConfigError, TargetProfile};
use crate::diff::{DiffAccumulator, DiffError, DiffMap, QuantizedFrame};
use crate::preview::{PreviewError, PreviewExporter};
use crate::quantize::{FrameReducer, ParallelReducer, QuantizeError, ThreadingConfig};

/// Any error that can end a run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Quantize(#[from] QuantizeError),
    #[error(transparent)]
    Diff(#[from] DiffError),
    #[error(transparent)]
    Preview(#[from] PreviewError),
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Receives the number of frames processed so far.
pub trait ProgressSink {
    fn update(&mut self, step: u64);
}

impl ProgressSink for () {
    fn update(&mut self, _step: u64) {}
}

impl ProgressSink for indicatif::ProgressBar {
    fn update(&mut self, step: u64) {
        self.set_position(step);
    }
}

/// Result of a pipeline run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub diffs: DiffMap,
    pub frames_processed: u64,
    /// True if the run stopped early on request.
    pub cancelled: bool,
}

impl RunSummary {
    /// Frames whose transition changed at least one cell.
    pub fn frames_changed(&self) -> usize {
        self.diffs.len()
    }

    pub fn total_changes(&self) -> usize {
        self.diffs.total_changes()
    }
}

/// Reduces and diffs a whole video.
pub struct Pipeline {
    reducer: FrameReducer,
    parallel: Option<ParallelReducer>,
    preview: Option<PreviewExporter>,
}

impl Pipeline {
    pub fn new(profile: &TargetProfile) -> Self {
        Self {
            reducer: FrameReducer::new(profile),
            parallel: None,
            preview: None,
        }
    }

    /// Enables chunked parallel reduction when `config.parallel` is set.
    pub fn with_threading(mut self, config: &ThreadingConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        self.parallel = if config.parallel {
            Some(ParallelReducer::new(self.reducer.clone(), config)?)
        } else {
            None
        };
        Ok(self)
    }

    /// Exports a preview for every processed frame.
    pub fn with_preview(mut self, exporter: PreviewExporter) -> Self {
        self.preview = Some(exporter);
        self
    }

    /// Previews dropped by a skip failure policy.
    pub fn previews_skipped(&self) -> u64 {
        self.preview.as_ref().map_or(0, PreviewExporter::skipped)
    }

    /// Runs `source` to exhaustion or until `cancel` is set.
    ///
    /// The source is opened if needed and always closed afterwards.
    pub fn run<S, P>(
        &mut self,
        source: &mut S,
        progress: &mut P,
        cancel: &AtomicBool,
    ) -> Result<RunSummary, PipelineError>
    where
        S: VideoSource,
        P: ProgressSink,
    {
        if !source.is_open() {
            source.open()?;
        }
        let (width, height) = self.reducer.dimensions();
        let mut acc = DiffAccumulator::new(width, height);

        let preview = &mut self.preview;
        let result = match self.parallel.as_ref() {
            Some(parallel) => run_chunked(parallel, preview, source, &mut acc, progress, cancel),
            None => run_sequential(&self.reducer, preview, source, &mut acc, progress, cancel),
        };
        source.close();
        let cancelled = result?;

        let summary = RunSummary {
            frames_processed: acc.frames_processed(),
            diffs: acc.finish(),
            cancelled,
        };
        tracing::info!(
            frames = summary.frames_processed,
            changed = summary.frames_changed(),
            writes = summary.total_changes(),
            cancelled,
            "Diff accumulation finished"
        );
        Ok(summary)
    }
}

/// Returns `true` if the run was cancelled.
fn run_sequential<S: VideoSource, P: ProgressSink>(
    reducer: &FrameReducer,
    preview: &mut Option<PreviewExporter>,
    source: &mut S,
    acc: &mut DiffAccumulator,
    progress: &mut P,
    cancel: &AtomicBool,
) -> Result<bool, PipelineError> {
    let mut frames = source.frames();
    loop {
        if cancel.load(Ordering::Relaxed) {
            return Ok(true);
        }
        let Some(frame) = frames.next().transpose()? else {
            return Ok(false);
        };
        let quantized = reducer.reduce(&frame)?;
        accept(preview, acc, quantized)?;
        progress.update(acc.frames_processed());
    }
}

fn run_chunked<S: VideoSource, P: ProgressSink>(
    reducer: &ParallelReducer,
    preview: &mut Option<PreviewExporter>,
    source: &mut S,
    acc: &mut DiffAccumulator,
    progress: &mut P,
    cancel: &AtomicBool,
) -> Result<bool, PipelineError> {
    let mut frames = source.frames();
    loop {
        if cancel.load(Ordering::Relaxed) {
            return Ok(true);
        }
        let chunk = frames
            .by_ref()
            .take(reducer.chunk_size())
            .collect::<Result<Vec<RawFrame>, SourceError>>()?;
        if chunk.is_empty() {
            return Ok(false);
        }

        tracing::debug!(frames = chunk.len(), "Reducing chunk");
        for quantized in reducer.reduce_chunk(&chunk)? {
            accept(preview, acc, quantized)?;
        }
        progress.update(acc.frames_processed());
    }
}

fn accept(
    preview: &mut Option<PreviewExporter>,
    acc: &mut DiffAccumulator,
    frame: QuantizedFrame,
) -> Result<(), PipelineError> {
    if let Some(exporter) = preview.as_mut() {
        exporter.export(acc.frames_processed(), acc.previous(), &frame)?;
    }
    acc.push(frame)?;
    Ok(())
}
