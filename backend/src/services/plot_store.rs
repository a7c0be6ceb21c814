//! On-disk storage for rendered plots.
//!
//! Files are written to a temporary sibling first and renamed into place, so
//! a reader sees either the previous file or the complete new one.

use image::{ImageFormat, RgbImage};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use uuid::Uuid;

use crate::config::{ArtifactNaming, PlotSettings};

/// File stem used when every request shares one slot.
pub const SHARED_PLOT_KEY: &str = "latest_plot";

/// Errors while rendering or persisting a plot.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("plot I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode plot: {0}")]
    Encode(#[from] image::ImageError),

    #[error("plot canvas {width}x{height} is too small")]
    InvalidCanvas { width: u32, height: u32 },

    #[error("plot columns differ in length (time {time}, flux {flux}, mask {mask})")]
    LengthMismatch { time: usize, flux: usize, mask: usize },
}

/// A persisted plot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlotArtifact {
    pub key: String,
    pub path: PathBuf,
    /// Root-relative URL the presentation layer serves the file under
    pub url: String,
}

/// Plot directory plus naming and retention policy.
#[derive(Debug, Clone)]
pub struct PlotStore {
    dir: PathBuf,
    url_prefix: String,
    naming: ArtifactNaming,
    max_retained: usize,
    write_lock: Arc<Mutex<()>>,
}

impl PlotStore {
    pub fn new(
        dir: impl Into<PathBuf>,
        url_prefix: impl Into<String>,
        naming: ArtifactNaming,
    ) -> Self {
        Self {
            dir: dir.into(),
            url_prefix: url_prefix.into(),
            naming,
            max_retained: 0,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn from_settings(settings: &PlotSettings) -> Self {
        Self::new(&settings.dir, &settings.url_prefix, settings.naming)
            .with_max_retained(settings.max_retained)
    }

    /// Keep at most `max` per-request plots; `0` keeps everything.
    pub fn with_max_retained(mut self, max: usize) -> Self {
        self.max_retained = max;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn naming(&self) -> ArtifactNaming {
        self.naming
    }

    /// File stem for a request's plot.
    ///
    /// Per-request keys hash the request id together with the inputs, so two
    /// concurrent submissions never share a file.
    pub fn key_for(&self, request_id: Uuid, star_id: &str, threshold: f64) -> String {
        match self.naming {
            ArtifactNaming::Shared => SHARED_PLOT_KEY.to_string(),
            ArtifactNaming::PerRequest => {
                let mut hasher = Sha256::new();
                hasher.update(request_id.as_bytes());
                hasher.update(star_id.as_bytes());
                hasher.update(threshold.to_le_bytes());
                let digest = hex::encode(hasher.finalize());
                digest[..20].to_string()
            }
        }
    }

    pub fn url_for(&self, key: &str) -> String {
        format!("{}/{}.png", self.url_prefix.trim_end_matches('/'), key)
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.png", key))
    }

    /// Encode `image` as PNG and atomically move it to `<dir>/<key>.png`.
    pub fn persist(&self, key: &str, image: &RgbImage) -> Result<PlotArtifact, RenderError> {
        let mut encoded = Cursor::new(Vec::new());
        image.write_to(&mut encoded, ImageFormat::Png)?;

        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);

        let _guard = self.write_lock.lock();
        let mut staged = tempfile::Builder::new()
            .prefix(".plot-")
            .suffix(".tmp")
            .tempfile_in(&self.dir)?;
        staged.write_all(encoded.get_ref())?;
        staged.flush()?;
        staged.persist(&path).map_err(|e| RenderError::Io(e.error))?;

        if self.naming == ArtifactNaming::PerRequest {
            if let Err(e) = self.prune(&path) {
                tracing::warn!(error = %e, dir = %self.dir.display(), "failed to prune old plots");
            }
        }

        tracing::debug!(path = %path.display(), bytes = encoded.get_ref().len(), "plot written");
        Ok(PlotArtifact {
            key: key.to_string(),
            url: self.url_for(key),
            path,
        })
    }

    /// Delete the oldest per-request plots beyond the retention limit.
    fn prune(&self, keep: &Path) -> std::io::Result<usize> {
        if self.max_retained == 0 {
            return Ok(0);
        }

        let mut plots: Vec<(SystemTime, PathBuf)> = fs::read_dir(&self.dir)?
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                path.extension().is_some_and(|ext| ext == "png")
                    && path.file_stem().is_some_and(|stem| stem != SHARED_PLOT_KEY)
            })
            .filter_map(|path| {
                let modified = fs::metadata(&path).and_then(|m| m.modified()).ok()?;
                Some((modified, path))
            })
            .collect();

        if plots.len() <= self.max_retained {
            return Ok(0);
        }

        // newest first
        plots.sort_by(|a, b| b.0.cmp(&a.0));
        let mut removed = 0;
        for (_, path) in plots.into_iter().skip(self.max_retained) {
            if path == keep {
                continue;
            }
            fs::remove_file(&path)?;
            removed += 1;
        }
        Ok(removed)
    }
}
