use crate::audio::analyser::AnalyserSettings;
use crate::audio::source::FrequencyBufferSource;
use crate::driver::{AnimationDriver, FrameRequestId, FrameScheduler, LoopToken};
use crate::error::VizError;
use crate::lyric::sync::LyricSync;
use crate::media::{MediaElement, MediaEvent};
use crate::render::bitmap::Bitmap;
use crate::render::canvas::{Canvas, DrawContext};
use crate::render::text::GlyphRasterizer;
use crate::visual::renderer::{FrameKind, VisualizationRenderer};
use crate::visual::theme::{ThemeColor, ThemeState, Tunables};
use crate::visual::Algorithm;

/// Output raster; a zero-sized surface has no drawing context.
pub struct Surface {
    canvas: Option<Canvas>,
}

impl Surface {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            canvas: Canvas::new(width, height),
        }
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        let same = self
            .canvas
            .as_ref()
            .is_some_and(|c| c.width() == width && c.height() == height);
        if !same {
            *self = Self::new(width, height);
        }
    }

    pub fn canvas(&self) -> Option<&Canvas> {
        self.canvas.as_ref()
    }

    pub fn context(&mut self) -> Result<DrawContext<'_>, VizError> {
        self.canvas
            .as_mut()
            .map(DrawContext::new)
            .ok_or(VizError::MissingDrawContext)
    }
}

/// Everything one player needs to visualize what it is playing.
pub struct VisualizationSession {
    source: FrequencyBufferSource,
    renderer: VisualizationRenderer,
    lyrics: LyricSync,
    theme: ThemeState,
    surface: Surface,
    cover: Option<Bitmap>,
    driver: AnimationDriver,
    loop_token: Option<LoopToken>,
    idle: Vec<u8>,
    last_vsync: Option<f64>,
    needs_still: bool,
    context_warned: bool,
}

impl VisualizationSession {
    pub fn new(
        analyser: AnalyserSettings,
        algorithm: Algorithm,
        theme: ThemeState,
        width: usize,
        height: usize,
    ) -> Result<Self, VizError> {
        theme.tunables().validate()?;
        let source = FrequencyBufferSource::new(analyser)?;
        let idle = vec![0; source.bin_count()];
        Ok(Self {
            source,
            renderer: VisualizationRenderer::new(algorithm),
            lyrics: LyricSync::new(),
            theme,
            surface: Surface::new(width, height),
            cover: None,
            driver: AnimationDriver::new(),
            loop_token: None,
            idle,
            last_vsync: None,
            needs_still: false,
            context_warned: false,
        })
    }

    pub fn handle_event(
        &mut self,
        event: MediaEvent,
        media: &dyn MediaElement,
        scheduler: &mut dyn FrameScheduler,
    ) {
        log::trace!("Media event {:?} at {:.3}s", event, media.current_time());
        match event {
            MediaEvent::LoadedMetadata => {
                match self.source.attach(media) {
                    Ok(()) => {}
                    Err(err @ VizError::AlreadyAttached { .. }) => log::warn!("{}", err),
                    Err(err) => log::error!("Failed to attach media: {}", err),
                }
                self.needs_still = true;
            }
            MediaEvent::Play => self.start_loop(scheduler),
            MediaEvent::Pause | MediaEvent::Ended => self.stop_loop(scheduler),
            MediaEvent::Seeking { to } => log::debug!("Seeking to {:.2}s", to),
            MediaEvent::Seeked { at } => log::debug!("Seeked to {:.2}s", at),
        }
    }

    fn start_loop(&mut self, scheduler: &mut dyn FrameScheduler) {
        if self.driver.is_running() {
            return;
        }
        self.last_vsync = None;
        self.loop_token = Some(self.driver.start(scheduler));
    }

    fn stop_loop(&mut self, scheduler: &mut dyn FrameScheduler) {
        if let Some(token) = self.loop_token.take() {
            self.driver.stop(token, scheduler);
        }
        self.last_vsync = None;
    }

    /// Vsync callback: runs the frame body for the pending request, if it is
    /// among `due`, and schedules the next one.
    pub fn on_vsync(
        &mut self,
        timestamp: f64,
        due: &[FrameRequestId],
        media: &dyn MediaElement,
        scheduler: &mut dyn FrameScheduler,
    ) {
        for &id in due {
            if !self.driver.begin_frame(id) {
                continue;
            }
            let elapsed = match self.last_vsync {
                Some(last) => (timestamp - last) as f32,
                None => self.theme.tunables().reference_hz.map_or(0.0, |hz| 1.0 / hz),
            };
            self.last_vsync = Some(timestamp);
            self.paint(media.current_time(), FrameKind::Animated { elapsed });
            self.needs_still = false;
            self.driver.end_frame(scheduler);
        }
    }

    /// Repaint without advancing animation state when something visible
    /// changed and no loop is running to pick it up. Returns whether a frame
    /// was painted.
    pub fn render_pending_still(&mut self, media: &dyn MediaElement) -> bool {
        if !self.needs_still || self.driver.is_running() {
            return false;
        }
        self.needs_still = false;
        self.paint(media.current_time(), FrameKind::Still);
        true
    }

    fn paint(&mut self, time: f64, kind: FrameKind) {
        let spectrum: &[u8] = match kind {
            FrameKind::Animated { .. } => match self.source.refresh(time) {
                Ok(buffer) => buffer.as_slice(),
                Err(err) => {
                    log::trace!("{}; drawing idle spectrum", err);
                    &self.idle
                }
            },
            FrameKind::Still if self.source.attached().is_some() => self.source.buffer().as_slice(),
            FrameKind::Still => &self.idle,
        };

        let mut ctx = match self.surface.context() {
            Ok(ctx) => {
                self.context_warned = false;
                ctx
            }
            Err(err) => {
                if !self.context_warned {
                    log::warn!("Skipping draw: {}", err);
                    self.context_warned = true;
                }
                return;
            }
        };

        self.renderer
            .draw(&mut ctx, spectrum, self.cover.as_ref(), &self.theme, kind);
        if let Err(err) = self.lyrics.draw(time, &mut ctx, &self.theme) {
            log::trace!("Lyrics skipped: {}", err);
        }
    }

    pub fn algorithm(&self) -> Algorithm {
        self.renderer.algorithm()
    }

    pub fn select_algorithm(&mut self, algorithm: Algorithm) {
        if self.renderer.select(algorithm) {
            self.needs_still = true;
        }
    }

    pub fn theme(&self) -> &ThemeState {
        &self.theme
    }

    pub fn set_color(&mut self, color: ThemeColor) {
        self.theme.set_color(color);
        self.needs_still = true;
    }

    /// Invalid tunables are rejected and the current ones kept.
    pub fn set_tunables(&mut self, tunables: Tunables) -> Result<(), VizError> {
        tunables.validate()?;
        self.theme.set_tunables(tunables);
        self.needs_still = true;
        Ok(())
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        log::debug!("Surface resized to {}x{}", width, height);
        self.surface.resize(width, height);
        self.needs_still = true;
    }

    pub fn set_cover(&mut self, cover: Option<Bitmap>) {
        self.cover = cover;
        self.needs_still = true;
    }

    pub fn set_glyphs(&mut self, glyphs: Box<dyn GlyphRasterizer>) {
        self.lyrics.set_glyphs(glyphs);
    }

    pub fn load_lyrics<S: AsRef<str>>(&mut self, raw: &[S]) {
        self.lyrics.load(raw);
    }

    pub fn renderer(&self) -> &VisualizationRenderer {
        &self.renderer
    }

    pub fn source(&self) -> &FrequencyBufferSource {
        &self.source
    }

    pub fn is_animating(&self) -> bool {
        self.driver.is_running()
    }

    pub fn frames_run(&self) -> u64 {
        self.driver.frames_run()
    }

    pub fn canvas(&self) -> Option<&Canvas> {
        self.surface.canvas()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::decode::AudioData;
    use crate::driver::VsyncClock;
    use crate::media::playback::OfflinePlayback;
    use crate::media::MediaId;
    use crate::render::text::testing::BlockGlyphs;
    use std::sync::Arc;

    const FPS: f64 = 30.0;

    struct Rig {
        session: VisualizationSession,
        player: OfflinePlayback,
        clock: VsyncClock,
    }

    impl Rig {
        fn new(algorithm: Algorithm, width: usize, height: usize) -> Self {
            let rate = 8000;
            let samples = (0..rate * 4)
                .map(|i| (i as f32 * 2.0 * std::f32::consts::PI * 440.0 / rate as f32).sin() * 0.5)
                .collect();
            let audio = Arc::new(AudioData::new(samples, rate as u32));
            // bars wide enough to fully cover whole pixels on small canvases
            let tunables = Tunables {
                bar_width: 400.0,
                min_height: 200.0,
                ..Tunables::default()
            };
            let session = VisualizationSession::new(
                AnalyserSettings::default(),
                algorithm,
                ThemeState::new(ThemeColor::default(), tunables),
                width,
                height,
            )
            .unwrap();
            Self {
                session,
                player: OfflinePlayback::new(MediaId(1), audio),
                clock: VsyncClock::new(FPS),
            }
        }

        fn pump(&mut self) {
            while let Some(event) = self.player.poll_event() {
                self.session.handle_event(event, &self.player, &mut self.clock);
            }
        }

        /// One host iteration: events, still redraw, vsync, clock advance.
        fn step(&mut self) {
            self.pump();
            self.session.render_pending_still(&self.player);
            let (timestamp, due) = self.clock.tick();
            self.session
                .on_vsync(timestamp, &due, &self.player, &mut self.clock);
            self.player.advance(1.0 / FPS);
        }

        fn rotation(&self) -> f32 {
            self.session.renderer().state().rotation_angle
        }
    }

    fn cover() -> Bitmap {
        Bitmap::from_rgba(2, 2, vec![90; 16]).unwrap()
    }

    #[test]
    fn load_attaches_and_autoplays() {
        let mut rig = Rig::new(Algorithm::Arc, 64, 64);
        rig.player.load();
        rig.step();
        assert_eq!(rig.session.source().attached(), Some(MediaId(1)));
        assert!(rig.session.is_animating());
        assert_eq!(rig.session.frames_run(), 1);
    }

    #[test]
    fn pause_freezes_render_state_until_play() {
        let mut rig = Rig::new(Algorithm::Arc, 64, 64);
        rig.session.set_cover(Some(cover()));
        rig.player.load();
        for _ in 0..5 {
            rig.step();
        }
        let before = rig.rotation();
        assert!((before - 0.05).abs() < 1e-5);

        rig.player.pause();
        for _ in 0..5 {
            rig.step();
        }
        assert_eq!(rig.rotation(), before);
        assert_eq!(rig.session.frames_run(), 5);

        rig.player.play();
        rig.step();
        assert!(rig.rotation() > before);
    }

    #[test]
    fn still_redraw_after_color_change_keeps_state() {
        let mut rig = Rig::new(Algorithm::Arc, 64, 64);
        rig.session.set_cover(Some(cover()));
        rig.player.load();
        rig.step();
        rig.player.pause();
        rig.step();
        let rotation = rig.rotation();

        rig.session.set_color(ThemeColor::new(1, 2, 3));
        assert!(rig.session.render_pending_still(&rig.player));
        assert!(!rig.session.render_pending_still(&rig.player));
        assert_eq!(rig.rotation(), rotation);
        assert_eq!(rig.session.frames_run(), 1);

        // the bar at the left end of the ring carries the new color
        let canvas = rig.session.canvas().unwrap();
        let p = canvas.pixel(15, 32);
        assert_eq!((p.r, p.g, p.b), (1, 2, 3));
    }

    #[test]
    fn algorithm_switch_resets_peaks() {
        let mut rig = Rig::new(Algorithm::Bar, 640, 360);
        rig.player.load();
        for _ in 0..3 {
            rig.step();
        }
        assert!(rig.session.renderer().state().peak_hold.len() > 0);

        rig.session.select_algorithm(Algorithm::ArcLine);
        assert_eq!(rig.session.renderer().state().peak_hold.len(), 0);
        rig.step();
        assert_eq!(rig.session.renderer().state().trail_ring.len(), 1);

        rig.session.select_algorithm(Algorithm::Bar);
        assert!(rig.session.renderer().state().trail_ring.is_empty());
        assert_eq!(rig.session.algorithm(), Algorithm::Bar);
    }

    #[test]
    fn zero_sized_surface_keeps_the_loop_alive() {
        let mut rig = Rig::new(Algorithm::Arc, 0, 0);
        rig.player.load();
        for _ in 0..3 {
            rig.step();
        }
        assert!(rig.session.canvas().is_none());
        assert_eq!(rig.session.frames_run(), 3);

        rig.session.resize(64, 64);
        rig.step();
        let canvas = rig.session.canvas().unwrap();
        assert!(canvas.pixels().iter().any(|&b| b != 0));
    }

    #[test]
    fn play_before_attach_draws_the_idle_spectrum() {
        let mut rig = Rig::new(Algorithm::Arc, 64, 64);
        rig.session
            .handle_event(MediaEvent::Play, &rig.player, &mut rig.clock);
        let (timestamp, due) = rig.clock.tick();
        rig.session
            .on_vsync(timestamp, &due, &rig.player, &mut rig.clock);
        assert!(rig.session.source().attached().is_none());
        // minimum-height bars still ring the cover area
        let canvas = rig.session.canvas().unwrap();
        assert!(canvas.pixels().iter().any(|&b| b != 0));
    }

    #[test]
    fn lyrics_follow_the_media_clock() {
        let mut rig = Rig::new(Algorithm::Bar, 216, 216);
        rig.session.set_glyphs(Box::new(BlockGlyphs));
        rig.session.load_lyrics(&["[00:00]AAAA"]);
        rig.player.load();
        rig.step();
        // final line drawn white, centered, bottom edge at y = 15
        let canvas = rig.session.canvas().unwrap();
        assert_eq!(canvas.pixel(104, 10), crate::render::canvas::Rgba::WHITE);
    }

    #[test]
    fn unusable_tunables_are_refused() {
        let bad = Tunables {
            meter_width: 0.0,
            meter_gap: 0.0,
            ..Tunables::default()
        };
        let built = VisualizationSession::new(
            AnalyserSettings::default(),
            Algorithm::Bar,
            ThemeState::new(ThemeColor::default(), bad),
            64,
            64,
        );
        assert!(matches!(built, Err(VizError::InvalidTunable(_))));

        let mut rig = Rig::new(Algorithm::Bar, 64, 64);
        let before = *rig.session.theme().tunables();
        assert!(rig.session.set_tunables(bad).is_err());
        assert_eq!(*rig.session.theme().tunables(), before);
    }
}
