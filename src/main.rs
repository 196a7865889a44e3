mod audio;
mod cli;
mod config;
mod driver;
mod encode;
mod error;
mod host;
mod lyric;
mod media;
mod render;
mod session;
mod track;
mod visual;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Arc;

use audio::analyser::AnalyserSettings;
use cli::Cli;
use encode::ffmpeg::{EncoderSettings, FfmpegEncoder};
use encode::snapshot::SnapshotWriter;
use host::{FrameLoop, Step};
use media::playback::OfflinePlayback;
use media::script::{MediaScript, ScriptEvent};
use media::MediaId;
use render::bitmap::Bitmap;
use render::text::{find_system_font, TextOverlay};
use session::VisualizationSession;
use track::{ResolvedTrack, TrackManifest};
use visual::theme::{ThemeColor, ThemeState, Tunables};
use visual::Algorithm;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let mut cli = Cli::parse();

    if cli.list_algorithms {
        println!("Available algorithms:");
        for algorithm in Algorithm::ALL {
            println!("  {}", algorithm);
        }
        return Ok(());
    }

    // Load config: explicit --config path, or auto-detect lyricwave.toml / global config
    let mut analyser = AnalyserSettings::default();
    let mut tunables = Tunables::default();
    let config_path = cli.config.clone().or_else(config::find_config);
    if let Some(ref path) = config_path {
        if let Some(cfg) = config::load_config(path) {
            log::info!("Loaded config from {}", path.display());
            // Merge: config values apply only when CLI is at its default
            if cli.width == 1920 { cli.width = cfg.output.width; }
            if cli.height == 1080 { cli.height = cfg.output.height; }
            if cli.fps == 30 { cli.fps = cfg.output.fps; }
            if cli.crf == 18 { cli.crf = cfg.output.crf; }
            if cli.codec == "libx264" { cli.codec = cfg.output.codec; }
            if cli.font.is_none() { cli.font = cfg.output.font; }
            if cli.algorithm == Algorithm::Arc { cli.algorithm = cfg.theme.algorithm; }
            if cli.color == ThemeColor::default() { cli.color = cfg.theme.color; }
            if cli.fft_size == 512 { cli.fft_size = cfg.audio.fft_size; }
            if cli.smoothing == 0.8 { cli.smoothing = cfg.audio.smoothing; }
            analyser = cfg.audio.analyser_settings();
            tunables = cfg.visual;
            if cli.events.is_empty() {
                cli.events = cfg
                    .events
                    .iter()
                    .map(|e| e.parse::<ScriptEvent>())
                    .collect::<Result<_, _>>()
                    .with_context(|| format!("Invalid event in {}", path.display()))?;
            }
        } else {
            log::warn!("Failed to load config from {}", path.display());
        }
    }
    analyser.fft_size = cli.fft_size;
    analyser.smoothing = cli.smoothing;
    analyser.validate().context("Invalid [audio] settings")?;
    tunables.validate().context("Invalid [visual] settings")?;

    let input = cli.input.as_ref().context("Input audio file or track manifest is required")?;
    if !input.exists() {
        anyhow::bail!("Input file not found: {}", input.display());
    }

    // 1. Resolve the track
    let mut track = if input.extension().is_some_and(|e| e.eq_ignore_ascii_case("json")) {
        let base_dir = input.parent().unwrap_or(Path::new("."));
        TrackManifest::load(input)?.resolve(base_dir)?
    } else {
        ResolvedTrack {
            audio: input.clone(),
            cover: None,
            lyric: Vec::new(),
            title: None,
        }
    };
    if cli.cover.is_some() {
        track.cover = cli.cover.clone();
    }
    if let Some(ref path) = cli.lyrics {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read lyrics: {}", path.display()))?;
        track.lyric = text.lines().map(str::to_string).collect();
    }

    log::info!("lyricwave - audio visualizer");
    if let Some(ref title) = track.title {
        log::info!("Track: {}", title);
    }
    log::info!("Input: {}", track.audio.display());
    log::info!("Output: {}", cli.output.display());
    log::info!("Algorithm: {}, color {}", cli.algorithm, cli.color);
    log::info!("Resolution: {}x{} @ {}fps", cli.width, cli.height, cli.fps);

    // 2. Decode audio
    log::info!("Decoding audio...");
    let audio = Arc::new(audio::decode::decode_audio(&track.audio)?);
    log::info!("Duration: {:.1}s at {} Hz", audio.duration(), audio.sample_rate);

    // 3. Session and its assets
    let theme = ThemeState::new(cli.color, tunables);
    let mut session = VisualizationSession::new(
        analyser,
        cli.algorithm,
        theme,
        cli.width as usize,
        cli.height as usize,
    )?;

    if let Some(ref path) = track.cover {
        match Bitmap::load(path) {
            Ok(cover) => session.set_cover(Some(cover)),
            Err(err) => log::warn!("Continuing without cover: {:#}", err),
        }
    }

    if !track.lyric.is_empty() {
        session.load_lyrics(&track.lyric);
        match cli.font.clone().or_else(find_system_font) {
            Some(path) => match TextOverlay::load(&path) {
                Ok(overlay) => session.set_glyphs(Box::new(overlay)),
                Err(err) => log::warn!("Lyrics disabled: {:#}", err),
            },
            None => log::warn!("Lyrics disabled: no font found (pass --font)"),
        }
    }

    let script = MediaScript::new(std::mem::take(&mut cli.events));
    if script.len() > 0 {
        log::info!("Media script: {} events", script.len());
    }

    // 4. Outputs
    let mut encoder = if cli.no_encode {
        None
    } else {
        log::info!("Starting FFmpeg encoder...");
        let settings = EncoderSettings {
            width: cli.width,
            height: cli.height,
            fps: cli.fps,
            codec: &cli.codec,
            pix_fmt: &cli.pix_fmt,
            crf: cli.crf,
            bitrate: cli.bitrate.as_deref(),
        };
        Some(FfmpegEncoder::new(&cli.output, Some(&track.audio), &settings)?)
    };
    let mut snapshots = cli
        .frames_dir
        .as_deref()
        .map(|dir| SnapshotWriter::new(dir, cli.snapshot_every))
        .transpose()?;
    if encoder.is_none() && snapshots.is_none() {
        log::warn!("--no-encode without --frames-dir: frames are rendered but not saved");
    }

    // 5. Frame loop
    let fps = f64::from(cli.fps.max(1));
    let blank = vec![0u8; cli.width as usize * cli.height as usize * 4];
    let planned_seconds = cli.max_seconds.unwrap_or_else(|| audio.duration());
    let pb = ProgressBar::new((planned_seconds * fps).ceil() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} frames ({eta} remaining)")
            .context("Invalid progress bar template")?
            .progress_chars("=>-"),
    );

    let player = OfflinePlayback::new(MediaId(1), Arc::clone(&audio));
    let mut frames = FrameLoop::new(player, fps, script, cli.max_seconds);
    frames.start();
    loop {
        let step = frames.step(&mut session);
        if step == Step::Done {
            break;
        }
        let frame_idx = frames.frames() - 1;

        let pixels = session.canvas().map_or(blank.as_slice(), |c| c.pixels());
        if let Some(ref mut encoder) = encoder {
            encoder.write_frame(pixels)?;
        }
        if let (Some(writer), Some(canvas)) = (snapshots.as_mut(), session.canvas()) {
            writer.maybe_write(frame_idx, canvas)?;
        }

        if frames.frames() > pb.length().unwrap_or(0) {
            pb.set_length(frames.frames());
        }
        pb.set_position(frames.frames());
        if step == Step::Last {
            break;
        }
    }

    pb.finish_with_message("Rendering complete");
    log::info!(
        "Rendered {} frames ({} animated)",
        frames.frames(),
        session.frames_run()
    );
    if let Some(writer) = snapshots {
        log::info!("Wrote {} snapshots", writer.written());
    }

    // 6. Finish encoding
    if let Some(encoder) = encoder {
        log::info!("Finishing encoding...");
        encoder.finish()?;
        log::info!("Done! Output: {}", cli.output.display());
    }
    Ok(())
}
