use ndarray::Array2;
use rustfft::{num_complex::Complex, FftPlanner};

pub const DEFAULT_N_FFT: usize = 2048;
pub const DEFAULT_HOP_LENGTH: usize = 512;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StftConfig {
    pub n_fft: usize,
    pub hop_length: usize,
}

impl Default for StftConfig {
    fn default() -> Self {
        Self {
            n_fft: DEFAULT_N_FFT,
            hop_length: DEFAULT_HOP_LENGTH,
        }
    }
}

/// Magnitude spectrogram, `(bin, frame)`, with `n_fft / 2 + 1` bins.
pub struct Spectrogram {
    pub magnitudes: Array2<f64>,
    pub sample_rate: u32,
    pub n_fft: usize,
}

impl Spectrogram {
    /// Centered STFT: the signal is zero-padded by `n_fft / 2` on both sides,
    /// giving `1 + len / hop_length` frames.
    pub fn compute(samples: &[f32], sample_rate: u32, config: StftConfig) -> Self {
        let StftConfig { n_fft, hop_length } = config;
        let pad = n_fft / 2;
        let mut padded = vec![0.0f64; samples.len() + 2 * pad];
        for (dst, &s) in padded[pad..].iter_mut().zip(samples) {
            *dst = s as f64;
        }

        let n_frames = Self::frame_count(samples.len(), config);
        let n_bins = n_fft / 2 + 1;
        let window = hann_window(n_fft);

        let mut planner = FftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(n_fft);
        let mut buffer = vec![Complex::new(0.0, 0.0); n_fft];
        let mut magnitudes = Array2::<f64>::zeros((n_bins, n_frames));

        for frame in 0..n_frames {
            let start = frame * hop_length;
            for (i, slot) in buffer.iter_mut().enumerate() {
                *slot = Complex::new(padded[start + i] * window[i], 0.0);
            }
            fft.process(&mut buffer);
            for bin in 0..n_bins {
                magnitudes[[bin, frame]] = buffer[bin].norm();
            }
        }

        Self {
            magnitudes,
            sample_rate,
            n_fft,
        }
    }

    /// Frames a centered STFT of `len` samples produces, without computing it.
    pub fn frame_count(len: usize, config: StftConfig) -> usize {
        let pad = config.n_fft / 2;
        1 + (len + 2 * pad).saturating_sub(config.n_fft) / config.hop_length
    }

    pub fn bins(&self) -> usize {
        self.magnitudes.nrows()
    }

    pub fn frames(&self) -> usize {
        self.magnitudes.ncols()
    }

    /// Center frequency of every bin in Hz.
    pub fn bin_frequencies(&self) -> Vec<f64> {
        let resolution = self.sample_rate as f64 / self.n_fft as f64;
        (0..self.bins()).map(|b| b as f64 * resolution).collect()
    }

    pub fn power(&self) -> Array2<f64> {
        self.magnitudes.mapv(|m| m * m)
    }
}

/// Periodic Hann window.
fn hann_window(size: usize) -> Vec<f64> {
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * std::f64::consts::PI * i as f64 / size as f64).cos()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_count_follows_centered_framing() {
        let samples = vec![0.0f32; 22050];
        let spec = Spectrogram::compute(&samples, 22050, StftConfig::default());
        assert_eq!(spec.frames(), 1 + 22050 / 512);
        let predicted = Spectrogram::frame_count(samples.len(), StftConfig::default());
        assert_eq!(predicted, spec.frames());
        assert_eq!(spec.bins(), 1025);
    }

    #[test]
    fn sine_peaks_at_its_bin() {
        let sr = 22050;
        let freq = 1000.0f32;
        let samples: Vec<f32> = (0..sr)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sr as f32).sin())
            .collect();
        let spec = Spectrogram::compute(&samples, sr as u32, StftConfig::default());
        let frame = spec.frames() / 2;
        let column = spec.magnitudes.column(frame);
        let peak = column
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        let expected = (freq as f64 / (sr as f64 / 2048.0)).round() as usize;
        assert!(peak.abs_diff(expected) <= 1, "peak bin {peak}, expected {expected}");
    }
}
