use crate::driver::VsyncClock;
use crate::media::playback::OfflinePlayback;
use crate::media::script::{MediaScript, ScriptAction};
use crate::media::MediaElement;
use crate::session::VisualizationSession;

/// What the caller should do with the canvas after [`FrameLoop::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Write the current canvas and keep going.
    Frame,
    /// Write the current canvas, then stop.
    Last,
    /// Stop without writing.
    Done,
}

/// Offline host: drives the player, the media script and the vsync clock one
/// output frame at a time.
pub struct FrameLoop {
    player: OfflinePlayback,
    clock: VsyncClock,
    script: MediaScript,
    dt: f64,
    max_seconds: Option<f64>,
    frame_idx: u64,
}

impl FrameLoop {
    pub fn new(player: OfflinePlayback, fps: f64, script: MediaScript, max_seconds: Option<f64>) -> Self {
        let fps = fps.max(1.0);
        Self {
            player,
            clock: VsyncClock::new(fps),
            script,
            dt: 1.0 / fps,
            max_seconds,
            frame_idx: 0,
        }
    }

    /// Output frames produced so far.
    pub fn frames(&self) -> u64 {
        self.frame_idx
    }

    pub fn now(&self) -> f64 {
        self.frame_idx as f64 * self.dt
    }

    pub fn player(&self) -> &OfflinePlayback {
        &self.player
    }

    pub fn start(&mut self) {
        self.player.load();
    }

    pub fn step(&mut self, session: &mut VisualizationSession) -> Step {
        let now = self.now();
        if self.max_seconds.is_some_and(|max| now >= max) {
            return Step::Done;
        }

        for action in self.script.due(now) {
            log::info!("{:.2}s: {:?}", now, action);
            match action {
                ScriptAction::Play => self.player.play(),
                ScriptAction::Pause => self.player.pause(),
                ScriptAction::Seek(to) => self.player.seek(to),
                ScriptAction::Color(color) => session.set_color(color),
                ScriptAction::Algorithm(algorithm) => session.select_algorithm(algorithm),
            }
        }
        while let Some(event) = self.player.poll_event() {
            session.handle_event(event, &self.player, &mut self.clock);
        }

        // a change made while paused still reaches the output
        let still = session.render_pending_still(&self.player);
        if self.script.remaining() == 0 && self.player.paused() {
            if self.player.ended() {
                log::info!("Playback ended at {:.2}s", now);
            } else {
                log::info!("Paused at {:.2}s with no further events; stopping", now);
            }
            if !still {
                return Step::Done;
            }
            self.frame_idx += 1;
            return Step::Last;
        }

        let (timestamp, due) = self.clock.tick();
        session.on_vsync(timestamp, &due, &self.player, &mut self.clock);
        self.player.advance(self.dt);
        self.frame_idx += 1;
        Step::Frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::analyser::AnalyserSettings;
    use crate::audio::decode::AudioData;
    use crate::media::script::ScriptEvent;
    use crate::media::MediaId;
    use crate::visual::theme::{ThemeColor, ThemeState, Tunables};
    use crate::visual::Algorithm;
    use std::sync::Arc;

    fn session() -> VisualizationSession {
        let tunables = Tunables {
            bar_width: 400.0,
            min_height: 200.0,
            ..Tunables::default()
        };
        VisualizationSession::new(
            AnalyserSettings::default(),
            Algorithm::Arc,
            ThemeState::new(ThemeColor::default(), tunables),
            64,
            64,
        )
        .unwrap()
    }

    const RATE: u32 = 8000;

    fn frame_loop(samples: usize, events: &[&str]) -> FrameLoop {
        let audio = Arc::new(AudioData::new(vec![0.1; samples], RATE));
        let script = MediaScript::new(
            events
                .iter()
                .map(|e| e.parse::<ScriptEvent>().unwrap())
                .collect(),
        );
        FrameLoop::new(OfflinePlayback::new(MediaId(1), audio), 10.0, script, None)
    }

    fn run(host: &mut FrameLoop, session: &mut VisualizationSession) -> Vec<Step> {
        host.start();
        let mut steps = Vec::new();
        loop {
            let step = host.step(session);
            steps.push(step);
            if step != Step::Frame {
                return steps;
            }
        }
    }

    #[test]
    fn color_change_after_final_pause_is_written() {
        let mut session = session();
        let mut host = frame_loop(RATE as usize * 10, &["2:pause", "3:color=#ff0000"]);
        let steps = run(&mut host, &mut session);

        assert_eq!(steps.last(), Some(&Step::Last));
        assert!((host.now() - 3.1).abs() < 1e-9);
        // the bar at the left end of the ring carries the new color
        let p = session.canvas().unwrap().pixel(15, 32);
        assert_eq!((p.r, p.g, p.b), (255, 0, 0));
        assert!(!session.is_animating());
    }

    #[test]
    fn playback_to_the_end_stops_without_an_extra_frame() {
        let mut session = session();
        // 0.95 s: the tenth frame runs past the end
        let mut host = frame_loop(7600, &[]);
        let steps = run(&mut host, &mut session);

        assert_eq!(steps.last(), Some(&Step::Done));
        assert!(host.player().ended());
        assert_eq!(host.frames(), 10);
    }

    #[test]
    fn max_seconds_caps_the_output() {
        let mut session = session();
        let audio = Arc::new(AudioData::new(vec![0.1; RATE as usize * 5], RATE));
        let mut host = FrameLoop::new(
            OfflinePlayback::new(MediaId(1), audio),
            10.0,
            MediaScript::default(),
            Some(0.5),
        );
        let steps = run(&mut host, &mut session);
        assert_eq!(steps.len(), 6);
        assert_eq!(host.frames(), 5);
    }
}
