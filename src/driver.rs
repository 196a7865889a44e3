//! Frame-paced loop control against a vsync-style scheduler.

/// Handle for one pending frame callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameRequestId(pub u64);

/// Something that calls back once per display refresh.
pub trait FrameScheduler {
    fn request_frame(&mut self) -> FrameRequestId;
    fn cancel_frame(&mut self, id: FrameRequestId);
}

/// Proof that a loop was started; handing it to [`AnimationDriver::stop`]
/// ends that loop.
#[must_use = "dropping the token leaves the loop running with no way to stop it"]
#[derive(Debug, PartialEq, Eq)]
pub struct LoopToken {
    generation: u64,
}

/// Keeps at most one frame request in flight while playback is active.
#[derive(Debug, Default)]
pub struct AnimationDriver {
    generation: u64,
    running: bool,
    pending: Option<FrameRequestId>,
    frames_run: u64,
}

impl AnimationDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn frames_run(&self) -> u64 {
        self.frames_run
    }

    /// Start a fresh loop, superseding any running one.
    pub fn start(&mut self, scheduler: &mut dyn FrameScheduler) -> LoopToken {
        if let Some(id) = self.pending.take() {
            scheduler.cancel_frame(id);
        }
        self.generation += 1;
        self.running = true;
        self.pending = Some(scheduler.request_frame());
        log::debug!("Frame loop {} started", self.generation);
        LoopToken {
            generation: self.generation,
        }
    }

    /// Stop the loop `token` belongs to and cancel its pending request. A
    /// token from a superseded loop does nothing.
    pub fn stop(&mut self, token: LoopToken, scheduler: &mut dyn FrameScheduler) {
        if token.generation != self.generation || !self.running {
            log::trace!("Ignoring stale loop token {}", token.generation);
            return;
        }
        self.running = false;
        if let Some(id) = self.pending.take() {
            scheduler.cancel_frame(id);
        }
        log::debug!("Frame loop {} stopped after {} frames", self.generation, self.frames_run);
    }

    /// Claim the callback for `id`. Returns false for stale or cancelled ids,
    /// in which case the caller must do no frame work.
    pub fn begin_frame(&mut self, id: FrameRequestId) -> bool {
        if self.running && self.pending == Some(id) {
            self.pending = None;
            true
        } else {
            false
        }
    }

    /// Finish the claimed frame and request the next one.
    pub fn end_frame(&mut self, scheduler: &mut dyn FrameScheduler) {
        self.frames_run += 1;
        if self.running && self.pending.is_none() {
            self.pending = Some(scheduler.request_frame());
        }
    }
}

/// Deterministic vsync source ticking at a fixed refresh rate.
#[derive(Debug)]
pub struct VsyncClock {
    interval: f64,
    now: f64,
    next_id: u64,
    requested: Vec<FrameRequestId>,
}

impl VsyncClock {
    pub fn new(refresh_hz: f64) -> Self {
        Self {
            interval: 1.0 / refresh_hz.max(1.0),
            now: 0.0,
            next_id: 1,
            requested: Vec::new(),
        }
    }

    pub fn interval(&self) -> f64 {
        self.interval
    }

    pub fn pending(&self) -> usize {
        self.requested.len()
    }

    /// Advance one refresh; returns its timestamp and the callbacks due.
    pub fn tick(&mut self) -> (f64, Vec<FrameRequestId>) {
        self.now += self.interval;
        (self.now, std::mem::take(&mut self.requested))
    }
}

impl FrameScheduler for VsyncClock {
    fn request_frame(&mut self) -> FrameRequestId {
        let id = FrameRequestId(self.next_id);
        self.next_id += 1;
        self.requested.push(id);
        id
    }

    fn cancel_frame(&mut self, id: FrameRequestId) {
        self.requested.retain(|r| *r != id);
    }
}
