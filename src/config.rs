use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::audio::analyser::{
    AnalyserSettings, DEFAULT_FFT_SIZE, DEFAULT_MAX_DECIBELS, DEFAULT_MIN_DECIBELS, DEFAULT_SMOOTHING,
};
use crate::visual::theme::{ThemeColor, Tunables};
use crate::visual::Algorithm;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub theme: ThemeConfig,
    #[serde(default)]
    pub visual: Tunables,
    /// Media script entries, same syntax as `--event`
    #[serde(default)]
    pub events: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_fps")]
    pub fps: u32,
    #[serde(default = "default_crf")]
    pub crf: u32,
    #[serde(default = "default_codec")]
    pub codec: String,
    #[serde(default)]
    pub font: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
pub struct AudioConfig {
    #[serde(default = "default_fft_size")]
    pub fft_size: usize,
    #[serde(default = "default_smoothing")]
    pub smoothing: f32,
    #[serde(default = "default_min_decibels")]
    pub min_decibels: f32,
    #[serde(default = "default_max_decibels")]
    pub max_decibels: f32,
}

#[derive(Debug, Default, Deserialize)]
pub struct ThemeConfig {
    #[serde(default)]
    pub color: ThemeColor,
    #[serde(default)]
    pub algorithm: Algorithm,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            fps: default_fps(),
            crf: default_crf(),
            codec: default_codec(),
            font: None,
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            fft_size: default_fft_size(),
            smoothing: default_smoothing(),
            min_decibels: default_min_decibels(),
            max_decibels: default_max_decibels(),
        }
    }
}

impl AudioConfig {
    pub fn analyser_settings(&self) -> AnalyserSettings {
        AnalyserSettings {
            fft_size: self.fft_size,
            smoothing: self.smoothing,
            min_decibels: self.min_decibels,
            max_decibels: self.max_decibels,
        }
    }
}

fn default_width() -> u32 { 1920 }
fn default_height() -> u32 { 1080 }
fn default_fps() -> u32 { 30 }
fn default_crf() -> u32 { 18 }
fn default_codec() -> String { "libx264".into() }
fn default_fft_size() -> usize { DEFAULT_FFT_SIZE }
fn default_smoothing() -> f32 { DEFAULT_SMOOTHING }
fn default_min_decibels() -> f32 { DEFAULT_MIN_DECIBELS }
fn default_max_decibels() -> f32 { DEFAULT_MAX_DECIBELS }

/// `./lyricwave.toml`, then `~/.config/lyricwave/config.toml`, then the
/// platform config dir.
pub fn find_config() -> Option<PathBuf> {
    let local = PathBuf::from("lyricwave.toml");
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("lyricwave").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("lyricwave").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}

pub fn parse_config(content: &str) -> Result<Config, toml::de::Error> {
    toml::from_str(content)
}

pub fn load_config(path: &Path) -> Option<Config> {
    let content = std::fs::read_to_string(path).ok()?;
    match parse_config(&content) {
        Ok(config) => Some(config),
        Err(err) => {
            log::warn!("Invalid config {}: {}", path.display(), err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.output.width, 1920);
        assert_eq!(config.output.codec, "libx264");
        assert_eq!(config.audio.analyser_settings(), AnalyserSettings::default());
        assert_eq!(config.theme.color, ThemeColor::default());
        assert_eq!(config.theme.algorithm, Algorithm::Arc);
        assert_eq!(config.visual, Tunables::default());
        assert!(config.events.is_empty());
    }

    #[test]
    fn sections_override_their_fields_only() {
        let config = parse_config(
            r##"
            events = ["10:pause", "12:play"]

            [output]
            fps = 60
            font = "/fonts/a.ttf"

            [audio]
            fft_size = 1024

            [theme]
            color = "#33aaff"
            algorithm = "arc-line-dotted"

            [visual]
            radius = 400.0
            dotted_ghost = true
            reference_hz = 60.0
            "##,
        )
        .unwrap();
        assert_eq!(config.output.fps, 60);
        assert_eq!(config.output.height, 1080);
        assert_eq!(config.output.font, Some(PathBuf::from("/fonts/a.ttf")));
        assert_eq!(config.audio.fft_size, 1024);
        assert_eq!(config.audio.smoothing, DEFAULT_SMOOTHING);
        assert_eq!(config.theme.color, ThemeColor::new(0x33, 0xaa, 0xff));
        assert_eq!(config.theme.algorithm, Algorithm::ArcLineDotted);
        assert_eq!(config.visual.radius, 400.0);
        assert!(config.visual.dotted_ghost);
        assert_eq!(config.visual.reference_hz, Some(60.0));
        assert_eq!(config.visual.bar_width, Tunables::default().bar_width);
        assert_eq!(config.events.len(), 2);
    }

    #[test]
    fn rejects_bad_theme_values() {
        assert!(parse_config("[theme]\ncolor = \"nope\"").is_err());
        assert!(parse_config("[theme]\nalgorithm = \"spiral\"").is_err());
    }
}
