use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::render::canvas::Canvas;

/// Writes every `every`-th frame as `frame_000123.png`.
pub struct SnapshotWriter {
    dir: PathBuf,
    every: u64,
    written: u64,
}

impl SnapshotWriter {
    pub fn new(dir: &Path, every: u32) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create frames dir: {}", dir.display()))?;
        Ok(Self {
            dir: dir.to_path_buf(),
            every: u64::from(every.max(1)),
            written: 0,
        })
    }

    pub fn path_for(&self, frame_idx: u64) -> PathBuf {
        self.dir.join(format!("frame_{:06}.png", frame_idx))
    }

    /// Save `canvas` if `frame_idx` falls on the snapshot interval.
    pub fn maybe_write(&mut self, frame_idx: u64, canvas: &Canvas) -> Result<bool> {
        if frame_idx % self.every != 0 {
            return Ok(false);
        }
        let path = self.path_for(frame_idx);
        let frame = canvas.to_image().context("Canvas buffer does not match its size")?;
        frame
            .save(&path)
            .with_context(|| format!("Failed to write snapshot {}", path.display()))?;
        self.written += 1;
        Ok(true)
    }

    pub fn written(&self) -> u64 {
        self.written
    }
}
