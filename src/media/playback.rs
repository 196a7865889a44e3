use std::collections::VecDeque;
use std::sync::Arc;

use super::{MediaElement, MediaEvent, MediaId};
use crate::audio::decode::AudioData;

/// A media element whose clock is advanced explicitly by the host, one video
/// frame at a time.
pub struct OfflinePlayback {
    id: MediaId,
    audio: Arc<AudioData>,
    position: f64,
    paused: bool,
    loaded: bool,
    autoplay: bool,
    events: VecDeque<MediaEvent>,
}

impl OfflinePlayback {
    pub fn new(id: MediaId, audio: Arc<AudioData>) -> Self {
        Self {
            id,
            audio,
            position: 0.0,
            paused: true,
            loaded: false,
            autoplay: true,
            events: VecDeque::new(),
        }
    }

    pub fn with_autoplay(mut self, autoplay: bool) -> Self {
        self.autoplay = autoplay;
        self
    }

    pub fn duration(&self) -> f64 {
        self.audio.duration()
    }

    pub fn ended(&self) -> bool {
        self.loaded && self.position >= self.duration()
    }

    /// Finish loading: announces metadata and starts playback when autoplay is on.
    pub fn load(&mut self) {
        if self.loaded {
            return;
        }
        self.loaded = true;
        self.events.push_back(MediaEvent::LoadedMetadata);
        if self.autoplay {
            self.play();
        }
    }

    pub fn play(&mut self) {
        if !self.loaded {
            log::warn!("play() ignored: media {:?} has not loaded", self.id);
            return;
        }
        if !self.paused {
            return;
        }
        if self.ended() {
            self.position = 0.0;
        }
        self.paused = false;
        self.events.push_back(MediaEvent::Play);
    }

    pub fn pause(&mut self) {
        if self.paused {
            return;
        }
        self.paused = true;
        self.events.push_back(MediaEvent::Pause);
    }

    pub fn seek(&mut self, to: f64) {
        let target = to.clamp(0.0, self.duration());
        self.events.push_back(MediaEvent::Seeking { to: target });
        self.position = target;
        self.events.push_back(MediaEvent::Seeked { at: target });
    }

    /// Move the playback clock forward by `dt` seconds while playing.
    pub fn advance(&mut self, dt: f64) {
        if self.paused || !self.loaded {
            return;
        }
        self.position += dt;
        if self.position >= self.duration() {
            self.position = self.duration();
            self.paused = true;
            self.events.push_back(MediaEvent::Pause);
            self.events.push_back(MediaEvent::Ended);
        }
    }

    pub fn poll_event(&mut self) -> Option<MediaEvent> {
        self.events.pop_front()
    }
}

impl MediaElement for OfflinePlayback {
    fn id(&self) -> MediaId {
        self.id
    }

    fn current_time(&self) -> f64 {
        self.position
    }

    fn paused(&self) -> bool {
        self.paused
    }

    fn audio(&self) -> Arc<AudioData> {
        Arc::clone(&self.audio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(seconds: usize) -> OfflinePlayback {
        let audio = Arc::new(AudioData::new(vec![0.0; seconds * 100], 100));
        OfflinePlayback::new(MediaId(1), audio)
    }

    fn drain(p: &mut OfflinePlayback) -> Vec<MediaEvent> {
        std::iter::from_fn(|| p.poll_event()).collect()
    }

    #[test]
    fn load_autoplays() {
        let mut p = player(2);
        p.load();
        assert_eq!(drain(&mut p), vec![MediaEvent::LoadedMetadata, MediaEvent::Play]);
        assert!(!p.paused());
    }

    #[test]
    fn play_before_load_is_ignored() {
        let mut p = player(2).with_autoplay(false);
        p.play();
        assert!(p.paused());
        assert!(drain(&mut p).is_empty());
    }

    #[test]
    fn paused_clock_does_not_move() {
        let mut p = player(2);
        p.load();
        p.advance(0.5);
        p.pause();
        p.advance(0.5);
        assert!((p.current_time() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn reaching_the_end_pauses_and_ends() {
        let mut p = player(1);
        p.load();
        drain(&mut p);
        p.advance(0.6);
        p.advance(0.6);
        assert_eq!(drain(&mut p), vec![MediaEvent::Pause, MediaEvent::Ended]);
        assert!(p.ended());
        assert_eq!(p.current_time(), 1.0);

        // replay restarts from the top
        p.play();
        assert_eq!(p.current_time(), 0.0);
    }

    #[test]
    fn seek_clamps_and_reports() {
        let mut p = player(1);
        p.load();
        drain(&mut p);
        p.seek(5.0);
        assert_eq!(
            drain(&mut p),
            vec![MediaEvent::Seeking { to: 1.0 }, MediaEvent::Seeked { at: 1.0 }]
        );
    }
}
