use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

/// A track description as served alongside the player:
/// `{ "fileUrl": .., "coverUrl": .., "lyric": [..], "title": .. }`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackManifest {
    pub file_url: String,
    #[serde(default)]
    pub cover_url: Option<String>,
    #[serde(default)]
    pub lyric: Vec<String>,
    #[serde(default)]
    pub title: Option<String>,
}

/// Local files for one track, ready to load.
#[derive(Debug, Clone)]
pub struct ResolvedTrack {
    pub audio: PathBuf,
    pub cover: Option<PathBuf>,
    pub lyric: Vec<String>,
    pub title: Option<String>,
}

impl TrackManifest {
    pub fn parse(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Invalid track manifest")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read track manifest: {}", path.display()))?;
        Self::parse(&json).with_context(|| format!("In {}", path.display()))
    }

    /// Resolve every asset to a local path, downloading remote ones. Relative
    /// paths are taken from `base_dir`.
    pub fn resolve(self, base_dir: &Path) -> Result<ResolvedTrack> {
        let audio = resolve_asset(&self.file_url, base_dir)?;
        let cover = match self.cover_url.as_deref().filter(|u| !u.is_empty()) {
            Some(url) => match resolve_asset(url, base_dir) {
                Ok(path) => Some(path),
                Err(err) => {
                    log::warn!("Cover unavailable, continuing without it: {:#}", err);
                    None
                }
            },
            None => None,
        };
        Ok(ResolvedTrack {
            audio,
            cover,
            lyric: self.lyric,
            title: self.title,
        })
    }
}

fn is_remote(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

/// Map a manifest location to a local file path.
pub fn resolve_asset(location: &str, base_dir: &Path) -> Result<PathBuf> {
    if is_remote(location) {
        return fetch_cached(location);
    }
    let path = Path::new(location);
    Ok(if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    })
}

/// Stable cache file name for `url`, keeping its extension so decoders can
/// detect the format from it.
fn cache_file_name(url: &str) -> String {
    let mut hasher = DefaultHasher::new();
    url.hash(&mut hasher);
    let stem = url.split(['?', '#']).next().unwrap_or(url);
    let ext = Path::new(stem)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| e.len() <= 5 && e.chars().all(|c| c.is_ascii_alphanumeric()));
    match ext {
        Some(ext) => format!("{:016x}.{}", hasher.finish(), ext.to_ascii_lowercase()),
        None => format!("{:016x}", hasher.finish()),
    }
}

fn asset_cache_dir() -> Result<PathBuf> {
    let base = dirs::cache_dir()
        .or_else(dirs::home_dir)
        .context("Cannot determine cache directory")?;
    let dir = base.join("lyricwave").join("assets");
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create asset cache dir: {}", dir.display()))?;
    Ok(dir)
}

fn fetch_cached(url: &str) -> Result<PathBuf> {
    let dest = asset_cache_dir()?.join(cache_file_name(url));
    if dest.exists() {
        log::info!("Using cached asset {} for {}", dest.display(), url);
        return Ok(dest);
    }

    log::info!("Downloading {}", url);
    let response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .with_context(|| format!("Failed to download {}", url))?;
    let bytes = response
        .bytes()
        .with_context(|| format!("Failed to read response body from {}", url))?;

    // only complete downloads land at `dest`
    let partial = dest.with_extension("part");
    std::fs::write(&partial, &bytes)
        .with_context(|| format!("Failed to write {}", partial.display()))?;
    std::fs::rename(&partial, &dest)
        .with_context(|| format!("Failed to move download into {}", dest.display()))?;
    log::info!("Saved {} bytes to {}", bytes.len(), dest.display());
    Ok(dest)
}
