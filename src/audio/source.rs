use std::sync::Arc;

use super::analyser::{AnalyserNode, AnalyserSettings};
use super::decode::AudioData;
use crate::error::VizError;
use crate::media::{MediaElement, MediaId};

/// Fixed-length byte spectrum, refreshed in place.
#[derive(Debug, Clone)]
pub struct FrequencyBuffer {
    bins: Vec<u8>,
}

impl FrequencyBuffer {
    fn new(len: usize) -> Self {
        Self { bins: vec![0; len] }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bins
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }
}

struct SourceLeg {
    media: MediaId,
    audio: Arc<AudioData>,
}

/// source → analyser → output. Built on the first attach and kept for the
/// session; later attaches only swap `source`.
struct AudioGraph {
    source: Option<SourceLeg>,
    analyser: AnalyserNode,
}

/// Sole owner and writer of the session's frequency buffer.
pub struct FrequencyBufferSource {
    settings: AnalyserSettings,
    graph: Option<AudioGraph>,
    buffer: FrequencyBuffer,
    graphs_built: u32,
}

impl FrequencyBufferSource {
    pub fn new(settings: AnalyserSettings) -> Result<Self, VizError> {
        settings.validate()?;
        Ok(Self {
            settings,
            graph: None,
            buffer: FrequencyBuffer::new(settings.frequency_bin_count()),
            graphs_built: 0,
        })
    }

    pub fn bin_count(&self) -> usize {
        self.buffer.len()
    }

    pub fn attached(&self) -> Option<MediaId> {
        self.graph
            .as_ref()
            .and_then(|g| g.source.as_ref())
            .map(|leg| leg.media)
    }

    pub fn attach(&mut self, media: &dyn MediaElement) -> Result<(), VizError> {
        let requested = media.id();
        if let Some(current) = self.attached() {
            if current == requested {
                log::debug!("Media {:?} already attached; nothing to do", requested);
                return Ok(());
            }
            return Err(VizError::AlreadyAttached {
                attached: current.0,
                requested: requested.0,
            });
        }

        if self.graph.is_none() {
            let analyser = AnalyserNode::new(self.settings)?;
            self.graphs_built += 1;
            log::info!(
                "Audio graph created: fft size {}, {} bins",
                self.settings.fft_size,
                self.settings.frequency_bin_count()
            );
            self.graph = Some(AudioGraph {
                source: None,
                analyser,
            });
        }
        if let Some(graph) = self.graph.as_mut() {
            graph.source = Some(SourceLeg {
                media: requested,
                audio: media.audio(),
            });
        }
        log::debug!("Media {:?} attached to analyser", requested);
        Ok(())
    }

    /// Drop the source leg, keeping the graph for the next attach.
    pub fn detach(&mut self) {
        if let Some(leg) = self.graph.as_mut().and_then(|g| g.source.take()) {
            log::debug!("Media {:?} detached from analyser", leg.media);
        }
    }

    /// Write the spectrum at playback `position` into the buffer.
    pub fn refresh(&mut self, position: f64) -> Result<&FrequencyBuffer, VizError> {
        let graph = self.graph.as_mut().ok_or(VizError::NotReady("frequency refresh"))?;
        let leg = graph.source.as_ref().ok_or(VizError::NotReady("frequency refresh"))?;
        graph
            .analyser
            .byte_frequency_data(&leg.audio, position, &mut self.buffer.bins);
        Ok(&self.buffer)
    }

    /// Last refreshed contents, without touching the analyser.
    pub fn buffer(&self) -> &FrequencyBuffer {
        &self.buffer
    }
}
