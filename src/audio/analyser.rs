use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

use super::decode::AudioData;
use crate::error::VizError;

pub const DEFAULT_FFT_SIZE: usize = 512;
pub const DEFAULT_SMOOTHING: f32 = 0.8;
pub const DEFAULT_MIN_DECIBELS: f32 = -100.0;
pub const DEFAULT_MAX_DECIBELS: f32 = -30.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalyserSettings {
    pub fft_size: usize,
    /// Smoothing time constant (0.0-1.0)
    pub smoothing: f32,
    pub min_decibels: f32,
    pub max_decibels: f32,
}

impl Default for AnalyserSettings {
    fn default() -> Self {
        Self {
            fft_size: DEFAULT_FFT_SIZE,
            smoothing: DEFAULT_SMOOTHING,
            min_decibels: DEFAULT_MIN_DECIBELS,
            max_decibels: DEFAULT_MAX_DECIBELS,
        }
    }
}

impl AnalyserSettings {
    pub fn validate(&self) -> Result<(), VizError> {
        if !self.fft_size.is_power_of_two() || !(32..=32768).contains(&self.fft_size) {
            return Err(VizError::InvalidAnalyser(format!(
                "fft size {} must be a power of two in 32..=32768",
                self.fft_size
            )));
        }
        if !(0.0..=1.0).contains(&self.smoothing) {
            return Err(VizError::InvalidAnalyser(format!(
                "smoothing {} must be within 0.0-1.0",
                self.smoothing
            )));
        }
        if self.min_decibels >= self.max_decibels {
            return Err(VizError::InvalidAnalyser(format!(
                "min decibels {} must be below max decibels {}",
                self.min_decibels, self.max_decibels
            )));
        }
        Ok(())
    }

    pub fn frequency_bin_count(&self) -> usize {
        self.fft_size / 2
    }
}

/// Magnitude-spectrum analysis node.
///
/// Each call to [`AnalyserNode::byte_frequency_data`] windows the most recent
/// `fft_size` samples, runs a forward FFT and blends the normalized magnitudes
/// into the node's smoothing memory before mapping them onto 0-255 through the
/// configured decibel range.
pub struct AnalyserNode {
    settings: AnalyserSettings,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    time_domain: Vec<f32>,
    scratch: Vec<Complex<f32>>,
    smoothed: Vec<f32>,
}

impl AnalyserNode {
    pub fn new(settings: AnalyserSettings) -> Result<Self, VizError> {
        settings.validate()?;
        let n = settings.fft_size;
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(n);
        Ok(Self {
            settings,
            fft,
            window: blackman_window(n),
            time_domain: vec![0.0; n],
            scratch: vec![Complex::new(0.0, 0.0); n],
            smoothed: vec![0.0; n / 2],
        })
    }

    pub fn settings(&self) -> &AnalyserSettings {
        &self.settings
    }

    pub fn frequency_bin_count(&self) -> usize {
        self.settings.frequency_bin_count()
    }

    /// Analyze the window of `audio` ending at `time` and write one byte per bin.
    /// `out` shorter than the bin count receives only the lowest bins.
    pub fn byte_frequency_data(&mut self, audio: &AudioData, time: f64, out: &mut [u8]) {
        let n = self.settings.fft_size;
        audio.window_ending_at(time, &mut self.time_domain);

        for (i, slot) in self.scratch.iter_mut().enumerate() {
            *slot = Complex::new(self.time_domain[i] * self.window[i], 0.0);
        }
        self.fft.process(&mut self.scratch);

        let tau = self.settings.smoothing;
        let scale = 1.0 / n as f32;
        for (k, prev) in self.smoothed.iter_mut().enumerate() {
            let magnitude = self.scratch[k].norm() * scale;
            let blended = tau * *prev + (1.0 - tau) * magnitude;
            *prev = if blended.is_finite() { blended } else { 0.0 };
        }

        let min_db = self.settings.min_decibels;
        let range = self.settings.max_decibels - min_db;
        for (byte, &magnitude) in out.iter_mut().zip(self.smoothed.iter()) {
            *byte = if magnitude <= 0.0 {
                0
            } else {
                let db = 20.0 * magnitude.log10();
                (255.0 / range * (db - min_db)).floor().clamp(0.0, 255.0) as u8
            };
        }
    }
}

fn blackman_window(size: usize) -> Vec<f32> {
    let (a0, a1, a2) = (0.42f32, 0.5f32, 0.08f32);
    (0..size)
        .map(|i| {
            let phase = 2.0 * std::f32::consts::PI * i as f32 / size as f32;
            a0 - a1 * phase.cos() + a2 * (2.0 * phase).cos()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, sample_rate: u32, seconds: f32) -> AudioData {
        let len = (sample_rate as f32 * seconds) as usize;
        let samples = (0..len)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin())
            .collect();
        AudioData::new(samples, sample_rate)
    }

    #[test]
    fn rejects_bad_settings() {
        let bad_size = AnalyserSettings {
            fft_size: 500,
            ..Default::default()
        };
        assert!(matches!(bad_size.validate(), Err(VizError::InvalidAnalyser(_))));

        let bad_range = AnalyserSettings {
            min_decibels: -30.0,
            max_decibels: -100.0,
            ..Default::default()
        };
        assert!(AnalyserNode::new(bad_range).is_err());
        assert!(AnalyserSettings::default().validate().is_ok());
    }

    #[test]
    fn silence_is_all_zero() {
        let mut node = AnalyserNode::new(AnalyserSettings::default()).unwrap();
        let audio = AudioData::new(vec![0.0; 4096], 44100);
        let mut out = vec![7u8; node.frequency_bin_count()];
        node.byte_frequency_data(&audio, 0.05, &mut out);
        assert!(out.iter().all(|&b| b == 0));
    }

    #[test]
    fn sine_peaks_at_its_bin() {
        let settings = AnalyserSettings {
            smoothing: 0.0,
            max_decibels: 0.0,
            ..Default::default()
        };
        let mut node = AnalyserNode::new(settings).unwrap();
        // bin 32 of a 512-point FFT at 51200 Hz is exactly 3200 Hz
        let audio = sine(3200.0, 51200, 0.5);
        let mut out = vec![0u8; node.frequency_bin_count()];
        node.byte_frequency_data(&audio, 0.25, &mut out);

        let (peak_bin, &peak) = out.iter().enumerate().max_by_key(|(_, &v)| v).unwrap();
        assert_eq!(peak_bin, 32);
        assert!(peak > 200);
        assert!(out[100] < peak / 2);
    }

    #[test]
    fn smoothing_carries_energy_into_silence() {
        let settings = AnalyserSettings {
            max_decibels: 0.0,
            ..Default::default()
        };
        let mut node = AnalyserNode::new(settings).unwrap();
        let mut samples = sine(3200.0, 51200, 0.5).samples;
        samples.extend(std::iter::repeat(0.0).take(51200));
        let audio = AudioData::new(samples, 51200);
        let mut out = vec![0u8; node.frequency_bin_count()];

        node.byte_frequency_data(&audio, 0.25, &mut out);
        let loud = out[32];
        // first refresh inside the silent tail still shows the decaying tone
        node.byte_frequency_data(&audio, 0.75, &mut out);
        assert!(out[32] > 0);
        assert!(out[32] < loud);
    }
}
