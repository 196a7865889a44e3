use std::collections::VecDeque;

pub const TRAIL_CAPACITY: usize = 7;

/// Recent frames' arc-line samples, newest first.
#[derive(Debug, Clone, Default)]
pub struct TrailRing {
    frames: VecDeque<Vec<u8>>,
}

impl TrailRing {
    pub fn push(&mut self, samples: Vec<u8>) {
        self.frames.push_front(samples);
        self.frames.truncate(TRAIL_CAPACITY);
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Vec<u8>> {
        self.frames.iter()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

/// Bar-meter peak caps: instant attack, linear release.
#[derive(Debug, Clone, Default)]
pub struct PeakHold {
    peaks: Vec<f32>,
}

impl PeakHold {
    /// Apply one frame of live column values. A column count change (first
    /// frame, resize, reset) re-seeds every slot from the live values.
    pub fn update(&mut self, live: &[f32], decay: f32) {
        if self.peaks.len() != live.len() {
            self.peaks = live.to_vec();
            return;
        }
        for (peak, &value) in self.peaks.iter_mut().zip(live) {
            *peak = value.max(*peak - decay);
        }
    }

    pub fn peaks(&self) -> &[f32] {
        &self.peaks
    }

    pub fn len(&self) -> usize {
        self.peaks.len()
    }

    pub fn clear(&mut self) {
        self.peaks.clear();
    }
}

/// Animation state carried from frame to frame by the renderer.
#[derive(Debug, Clone, Default)]
pub struct RenderState {
    pub rotation_angle: f32,
    pub peak_hold: PeakHold,
    pub trail_ring: TrailRing,
}

impl RenderState {
    /// Transition action for every algorithm switch.
    pub fn on_algorithm_change(&mut self) {
        self.peak_hold.clear();
        self.trail_ring.clear();
    }
}
