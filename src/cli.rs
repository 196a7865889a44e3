use clap::Parser;
use std::path::PathBuf;

use crate::media::script::ScriptEvent;
use crate::visual::theme::ThemeColor;
use crate::visual::Algorithm;

#[derive(Parser, Debug)]
#[command(name = "lyricwave", about = "Audio-reactive visualizer with synchronized lyrics, rendered to video")]
pub struct Cli {
    /// Input audio file (WAV, MP3, FLAC, OGG) or a JSON track manifest
    pub input: Option<PathBuf>,

    /// Output video file
    #[arg(short, long, default_value = "output.mp4")]
    pub output: PathBuf,

    /// Visualization algorithm: arc, arc-line, arc-line-dotted, bar
    #[arg(short, long, default_value = "arc")]
    pub algorithm: Algorithm,

    /// Theme color (#rrggbb or r,g,b)
    #[arg(long, default_value = "#ec9446")]
    pub color: ThemeColor,

    /// Lyric file with one `[mm:ss]text` line per line
    #[arg(long)]
    pub lyrics: Option<PathBuf>,

    /// Cover image (PNG or JPEG)
    #[arg(long)]
    pub cover: Option<PathBuf>,

    /// Font for lyrics (TTF/OTF). Defaults to a common system font.
    #[arg(long)]
    pub font: Option<PathBuf>,

    /// Video width in pixels
    #[arg(long, default_value_t = 1920)]
    pub width: u32,

    /// Video height in pixels
    #[arg(long, default_value_t = 1080)]
    pub height: u32,

    /// Frames per second (also the simulated display refresh rate)
    #[arg(long, default_value_t = 30)]
    pub fps: u32,

    /// Analyser FFT window size (power of two)
    #[arg(long, default_value_t = 512)]
    pub fft_size: usize,

    /// Analyser smoothing time constant (0.0-1.0)
    #[arg(long, default_value_t = 0.8)]
    pub smoothing: f32,

    /// Timed media event `<seconds>:<action>`; action is pause, play,
    /// seek=<seconds>, color=<color> or algorithm=<name>. Repeatable.
    #[arg(long = "event")]
    pub events: Vec<ScriptEvent>,

    /// Stop after this many seconds of output
    #[arg(long)]
    pub max_seconds: Option<f64>,

    /// Also write PNG snapshots into this directory
    #[arg(long)]
    pub frames_dir: Option<PathBuf>,

    /// Write a snapshot every N frames
    #[arg(long, default_value_t = 1)]
    pub snapshot_every: u32,

    /// Skip video encoding (useful with --frames-dir)
    #[arg(long)]
    pub no_encode: bool,

    /// H.264 CRF quality (0-51, lower = better). Ignored when --bitrate is set.
    #[arg(long, default_value_t = 18)]
    pub crf: u32,

    /// Video bitrate (e.g. 2400k, 5M). When set, uses -b:v instead of -crf.
    #[arg(short, long)]
    pub bitrate: Option<String>,

    /// FFmpeg video codec
    #[arg(long, default_value = "libx264")]
    pub codec: String,

    /// FFmpeg pixel format
    #[arg(long, default_value = "yuv420p")]
    pub pix_fmt: String,

    /// Config file (defaults to lyricwave.toml or the user config dir)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// List available algorithms and exit
    #[arg(long)]
    pub list_algorithms: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_typed_flags() {
        let cli = Cli::try_parse_from([
            "lyricwave",
            "song.mp3",
            "-a",
            "bar",
            "--color",
            "10,20,30",
            "--event",
            "5:pause",
            "--event",
            "7:algorithm=arc-line",
        ])
        .unwrap();
        assert_eq!(cli.algorithm, Algorithm::Bar);
        assert_eq!(cli.color, ThemeColor::new(10, 20, 30));
        assert_eq!(cli.events.len(), 2);
        assert_eq!(cli.fft_size, 512);
    }

    #[test]
    fn rejects_unknown_algorithm() {
        assert!(Cli::try_parse_from(["lyricwave", "-a", "spiral"]).is_err());
    }
}
