//! Per-frame descriptors computed from a magnitude spectrogram.
//!
//! Output matrices are dimension-major `(dimension, frame)` and share the
//! spectrogram's frame count.

use ndarray::{Array1, Array2, Axis};

use super::spectrum::{Spectrogram, StftConfig};
use crate::error::{Error, Result};
use crate::features::{FeatureGroup, FeatureMatrix, RawFeatureSet, ShapeSpec, DEFAULT_N_MFCC};

pub const DEFAULT_SAMPLE_RATE: u32 = 22050;
pub const DEFAULT_N_MELS: usize = 128;
pub const ROLLOFF_PERCENT: f64 = 0.85;

const AMIN: f64 = 1e-10;
const TOP_DB: f64 = 80.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExtractionConfig {
    pub sample_rate: u32,
    pub n_mfcc: usize,
    pub n_mels: usize,
    pub stft: StftConfig,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            n_mfcc: DEFAULT_N_MFCC,
            n_mels: DEFAULT_N_MELS,
            stft: StftConfig::default(),
        }
    }
}

/// Extract all five feature groups from mono samples at `config.sample_rate`.
/// Tracks longer than `max_frames` are rejected before any spectrum is built.
pub fn extract_features(
    samples: &[f32],
    config: &ExtractionConfig,
    max_frames: usize,
) -> Result<RawFeatureSet> {
    let frames = Spectrogram::frame_count(samples.len(), config.stft);
    if frames > max_frames {
        return Err(Error::DimensionLimit {
            group: FeatureGroup::Mfcc,
            frames,
            limit: max_frames,
        });
    }

    let spec = Spectrogram::compute(samples, config.sample_rate, config.stft);
    let power = spec.power();
    log::debug!("Extracting features over {} frames", spec.frames());

    let row =
        |values: Array1<f64>| FeatureMatrix::from_dimension_major(values.insert_axis(Axis(0)));

    RawFeatureSet::new(
        FeatureMatrix::from_dimension_major(mfcc(&power, &spec, config.n_mels, config.n_mfcc)),
        row(spectral_flatness(&power)),
        row(spectral_centroid(&spec)),
        row(spectral_rolloff(&spec, ROLLOFF_PERCENT)),
        FeatureMatrix::from_dimension_major(tonnetz(&power, &spec)),
        ShapeSpec {
            n_mfcc: config.n_mfcc,
            max_frames,
        },
    )
}

/// Magnitude-weighted mean frequency per frame; `0` for silent frames.
pub fn spectral_centroid(spec: &Spectrogram) -> Array1<f64> {
    let freqs = Array1::from(spec.bin_frequencies());
    spec.magnitudes.map_axis(Axis(0), |frame| {
        let total = frame.sum();
        if total <= AMIN {
            0.0
        } else {
            frame.dot(&freqs) / total
        }
    })
}

/// Lowest bin frequency below which `percent` of the frame's magnitude lies.
pub fn spectral_rolloff(spec: &Spectrogram, percent: f64) -> Array1<f64> {
    let freqs = spec.bin_frequencies();
    spec.magnitudes.map_axis(Axis(0), |frame| {
        let threshold = percent * frame.sum();
        let mut cumulative = 0.0;
        for (bin, &m) in frame.iter().enumerate() {
            cumulative += m;
            if cumulative >= threshold {
                return freqs[bin];
            }
        }
        freqs[freqs.len() - 1]
    })
}

/// Geometric over arithmetic mean of the power spectrum.
pub fn spectral_flatness(power: &Array2<f64>) -> Array1<f64> {
    power.map_axis(Axis(0), |frame| {
        let n = frame.len() as f64;
        let log_mean = frame.iter().map(|p| p.max(AMIN).ln()).sum::<f64>() / n;
        let mean = frame.iter().map(|p| p.max(AMIN)).sum::<f64>() / n;
        log_mean.exp() / mean
    })
}

pub fn mfcc(power: &Array2<f64>, spec: &Spectrogram, n_mels: usize, n_mfcc: usize) -> Array2<f64> {
    let filters = mel_filterbank(spec.sample_rate, spec.n_fft, n_mels);
    let mel = filters.dot(power);
    let db = power_to_db(&mel);
    dct_ortho(n_mfcc, n_mels).dot(&db)
}

fn hz_to_mel(hz: f64) -> f64 {
    const F_SP: f64 = 200.0 / 3.0;
    const MIN_LOG_HZ: f64 = 1000.0;
    let min_log_mel = MIN_LOG_HZ / F_SP;
    let logstep = 6.4f64.ln() / 27.0;
    if hz >= MIN_LOG_HZ {
        min_log_mel + (hz / MIN_LOG_HZ).ln() / logstep
    } else {
        hz / F_SP
    }
}

fn mel_to_hz(mel: f64) -> f64 {
    const F_SP: f64 = 200.0 / 3.0;
    const MIN_LOG_HZ: f64 = 1000.0;
    let min_log_mel = MIN_LOG_HZ / F_SP;
    let logstep = 6.4f64.ln() / 27.0;
    if mel >= min_log_mel {
        MIN_LOG_HZ * (logstep * (mel - min_log_mel)).exp()
    } else {
        mel * F_SP
    }
}

/// Slaney-style triangular filters, area-normalized, `(n_mels, n_fft / 2 + 1)`.
pub fn mel_filterbank(sample_rate: u32, n_fft: usize, n_mels: usize) -> Array2<f64> {
    let n_bins = n_fft / 2 + 1;
    let fft_freqs: Vec<f64> = (0..n_bins)
        .map(|b| b as f64 * sample_rate as f64 / n_fft as f64)
        .collect();
    let max_mel = hz_to_mel(sample_rate as f64 / 2.0);
    let mel_freqs: Vec<f64> = (0..n_mels + 2)
        .map(|i| mel_to_hz(max_mel * i as f64 / (n_mels + 1) as f64))
        .collect();

    let mut weights = Array2::<f64>::zeros((n_mels, n_bins));
    for m in 0..n_mels {
        let (left, center, right) = (mel_freqs[m], mel_freqs[m + 1], mel_freqs[m + 2]);
        let enorm = 2.0 / (right - left);
        for (b, &f) in fft_freqs.iter().enumerate() {
            let lower = (f - left) / (center - left);
            let upper = (right - f) / (right - center);
            weights[[m, b]] = lower.min(upper).max(0.0) * enorm;
        }
    }
    weights
}

fn power_to_db(power: &Array2<f64>) -> Array2<f64> {
    let db = power.mapv(|p| 10.0 * p.max(AMIN).log10());
    let peak = db.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    db.mapv(|v| v.max(peak - TOP_DB))
}

/// Orthonormal DCT-II basis, `(n_out, n_in)`.
fn dct_ortho(n_out: usize, n_in: usize) -> Array2<f64> {
    let n = n_in as f64;
    Array2::from_shape_fn((n_out, n_in), |(k, i)| {
        let scale = if k == 0 { (1.0 / n).sqrt() } else { (2.0 / n).sqrt() };
        scale * (std::f64::consts::PI * k as f64 * (2 * i + 1) as f64 / (2.0 * n)).cos()
    })
}

/// 12-bin chroma: each bin's power goes to its nearest pitch class (C = 0),
/// then every frame is L1-normalized.
pub fn chroma(power: &Array2<f64>, spec: &Spectrogram) -> Array2<f64> {
    let freqs = spec.bin_frequencies();
    let mut chroma = Array2::<f64>::zeros((12, spec.frames()));
    for (bin, &f) in freqs.iter().enumerate().skip(1) {
        let midi = 69.0 + 12.0 * (f / 440.0).log2();
        let pitch_class = (midi.round() as i64).rem_euclid(12) as usize;
        let mut target = chroma.row_mut(pitch_class);
        target += &power.row(bin);
    }
    for mut frame in chroma.axis_iter_mut(Axis(1)) {
        let total = frame.sum();
        if total > AMIN {
            frame.mapv_inplace(|v| v / total);
        }
    }
    chroma
}

/// Tonal centroid projection `(6, 12)`: fifths, minor thirds, major thirds.
pub fn tonnetz_basis() -> Array2<f64> {
    const SCALE: [f64; 6] = [7.0 / 6.0, 7.0 / 6.0, 3.0 / 2.0, 3.0 / 2.0, 2.0 / 3.0, 2.0 / 3.0];
    const RADIUS: [f64; 6] = [1.0, 1.0, 1.0, 1.0, 0.5, 0.5];
    Array2::from_shape_fn((6, 12), |(d, k)| {
        let phase = SCALE[d] * k as f64 - if d % 2 == 0 { 0.5 } else { 0.0 };
        RADIUS[d] * (std::f64::consts::PI * phase).cos()
    })
}

pub fn tonnetz(power: &Array2<f64>, spec: &Spectrogram) -> Array2<f64> {
    tonnetz_basis().dot(&chroma(power, spec))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, seconds: f32) -> Vec<f32> {
        let sr = DEFAULT_SAMPLE_RATE as f32;
        (0..(sr * seconds) as usize)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sr).sin())
            .collect()
    }

    #[test]
    fn shapes_match_feature_groups() {
        let raw =
            extract_features(&sine(440.0, 1.0), &ExtractionConfig::default(), 10_000).unwrap();
        let frames = 1 + 22050 / 512;
        assert_eq!(raw.frames(), frames);
        assert_eq!(raw.get(FeatureGroup::Mfcc).dims(), 13);
        assert_eq!(raw.get(FeatureGroup::SpectralCentroid).dims(), 1);
        assert_eq!(raw.get(FeatureGroup::Tonnetz).dims(), 6);
    }

    #[test]
    fn long_tracks_fail_before_the_spectrum() {
        // 10 minutes at 22050 Hz would be ~25k frames of 1025 bins.
        let samples = vec![0.0f32; 22050 * 600];
        let err = extract_features(&samples, &ExtractionConfig::default(), 1000).unwrap_err();
        assert_eq!(
            err,
            Error::DimensionLimit {
                group: FeatureGroup::Mfcc,
                frames: 1 + 22050 * 600 / 512,
                limit: 1000,
            }
        );
    }

    #[test]
    fn sine_descriptors_sit_near_the_tone() {
        let samples = sine(1000.0, 1.0);
        let spec = Spectrogram::compute(&samples, DEFAULT_SAMPLE_RATE, StftConfig::default());
        let mid = spec.frames() / 2;
        let centroid = spectral_centroid(&spec)[mid];
        let rolloff = spectral_rolloff(&spec, ROLLOFF_PERCENT)[mid];
        let flatness = spectral_flatness(&spec.power())[mid];
        assert!((centroid - 1000.0).abs() < 50.0, "centroid {centroid}");
        assert!((rolloff - 1000.0).abs() < 50.0, "rolloff {rolloff}");
        assert!(flatness < 0.01, "flatness {flatness}");
    }

    #[test]
    fn a4_tonnetz_points_at_pitch_class_a() {
        let samples = sine(440.0, 1.0);
        let spec = Spectrogram::compute(&samples, DEFAULT_SAMPLE_RATE, StftConfig::default());
        let t = tonnetz(&spec.power(), &spec);
        let mid = spec.frames() / 2;
        let expected = tonnetz_basis().column(9).to_owned();
        for d in 0..6 {
            assert!((t[[d, mid]] - expected[d]).abs() < 0.05, "dim {d}");
        }
    }

    #[test]
    fn silence_stays_finite() {
        let raw = extract_features(&vec![0.0; 4096], &ExtractionConfig::default(), 10_000).unwrap();
        for group in FeatureGroup::ALL {
            assert!(raw.get(group).dimension_major().iter().all(|v| v.is_finite()), "{group}");
        }
        let centroid = raw.get(FeatureGroup::SpectralCentroid).dimension_major();
        assert!(centroid.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn mel_filters_cover_the_spectrum() {
        let filters = mel_filterbank(22050, 2048, 128);
        assert_eq!(filters.dim(), (128, 1025));
        for row in filters.axis_iter(Axis(0)) {
            assert!(row.iter().any(|&w| w > 0.0));
            assert!(row.iter().all(|&w| w >= 0.0));
        }
    }
}
