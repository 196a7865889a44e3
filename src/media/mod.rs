pub mod playback;
pub mod script;

use std::sync::Arc;

use crate::audio::decode::AudioData;

/// Identity of a playable element, stable for its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MediaId(pub u64);

/// Lifecycle notifications emitted by a media element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MediaEvent {
    LoadedMetadata,
    Play,
    Pause,
    Seeking { to: f64 },
    Seeked { at: f64 },
    Ended,
}

/// A playable element as seen by the visualization core.
pub trait MediaElement {
    fn id(&self) -> MediaId;
    /// Playback position in seconds.
    fn current_time(&self) -> f64;
    fn paused(&self) -> bool;
    /// The decoded stream feeding the output, tapped by the analyser.
    fn audio(&self) -> Arc<AudioData>;
}
