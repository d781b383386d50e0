//! Wave spectrum of a measurement series by Lomb-Scargle periodogram.
//!
//! The radar does not sample on a perfect clock and the filters punch
//! holes in the series, so an FFT is out. Lomb-Scargle fits a sinusoid at
//! every trial frequency directly against the irregular samples.

use crate::stats;
use std::f64::consts::PI;

/// The trial frequencies, in Hz.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrequencyGrid {
    /// `n` evenly spaced frequencies from `min` to `max`.
    Linear {
        /// Lowest frequency.
        min: f64,
        /// Highest frequency, before Nyquist clipping.
        max: f64,
        /// Number of frequencies.
        n: usize,
    },
    /// `n` frequencies evenly spaced in log10 from `min` to `max`.
    Logarithmic {
        /// Lowest frequency, must be positive.
        min: f64,
        /// Highest frequency, before Nyquist clipping.
        max: f64,
        /// Number of frequencies.
        n: usize,
    },
}

impl FrequencyGrid {
    /// The frequencies, with the top clipped to `nyquist` when one is known.
    /// Grids that are empty or inverted after clipping produce nothing.
    pub fn frequencies(&self, nyquist: Option<f64>) -> Vec<f64> {
        let clip = |max: f64| nyquist.map_or(max, |ny| max.min(ny));
        match *self {
            FrequencyGrid::Linear { min, max, n } => linspace(min, clip(max), n),
            FrequencyGrid::Logarithmic { min, max, n } => {
                if !(min > 0.0) {
                    return Vec::new();
                }
                linspace(min.log10(), clip(max).log10(), n)
                    .into_iter()
                    .map(|e| 10f64.powf(e))
                    .collect()
            }
        }
    }
}

fn linspace(lo: f64, hi: f64, n: usize) -> Vec<f64> {
    if !(lo.is_finite() && hi.is_finite()) || lo > hi {
        return Vec::new();
    }
    match n {
        0 => Vec::new(),
        1 => vec![lo],
        _ => (0..n)
            .map(|i| lo + (hi - lo) * i as f64 / (n - 1) as f64)
            .collect(),
    }
}

/// Half the sampling rate implied by the median spacing of `times`.
pub fn nyquist(times: &[f64]) -> Option<f64> {
    let dt: Vec<f64> = times.windows(2).map(|w| w[1] - w[0]).collect();
    let median = stats::median(&dt)?;
    (median > 0.0).then(|| 1.0 / (2.0 * median))
}

/// A spectral peak.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak {
    /// Index into the periodogram.
    pub index: usize,
    /// Frequency, in Hz.
    pub frequency: f64,
    /// Period, in seconds.
    pub period: f64,
    /// Amplitude of the fitted sinusoid, in meters.
    pub amplitude: f64,
}

/// Power and amplitude at each trial frequency.
#[derive(Debug, Clone, PartialEq)]
pub struct Periodogram {
    frequencies: Vec<f64>,
    power: Vec<f64>,
    amplitude: Vec<f64>,
}

#[allow(missing_docs)]
impl Periodogram {
    /// Compute the periodogram of `heights` sampled at `times` (seconds).
    /// The mean is removed first. `None` with fewer than two samples, with
    /// mismatched inputs, or when the grid is empty.
    pub fn compute(times: &[f64], heights: &[f64], grid: FrequencyGrid) -> Option<Self> {
        if times.len() != heights.len() || times.len() < 2 {
            return None;
        }
        let frequencies: Vec<f64> = grid
            .frequencies(nyquist(times))
            .into_iter()
            .filter(|&f| f > 0.0)
            .collect();
        if frequencies.is_empty() {
            return None;
        }

        let mean = stats::mean(heights)?;
        let centered: Vec<f64> = heights.iter().map(|h| h - mean).collect();
        let n = times.len() as f64;

        let power: Vec<f64> = frequencies
            .iter()
            .map(|&f| lomb_scargle(times, &centered, 2.0 * PI * f))
            .collect();
        let amplitude = power.iter().map(|p| (4.0 * p / n).sqrt()).collect();

        Some(Self {
            frequencies,
            power,
            amplitude,
        })
    }

    pub fn frequencies(&self) -> &[f64] {
        &self.frequencies
    }

    pub fn power(&self) -> &[f64] {
        &self.power
    }

    /// Amplitude, `sqrt(4 * power / N)`.
    pub fn amplitude(&self) -> &[f64] {
        &self.amplitude
    }

    /// The strongest local maxima, largest first. A maximum must reach
    /// `min_height_fraction` of the largest amplitude, and no two chosen
    /// peaks are closer than `min_distance` grid steps.
    pub fn dominant_peaks(
        &self,
        min_height_fraction: f64,
        min_distance: usize,
        limit: usize,
    ) -> Vec<Peak> {
        let a = &self.amplitude;
        let Some(top) = a.iter().copied().reduce(f64::max) else {
            return Vec::new();
        };
        let floor = top * min_height_fraction;

        let mut candidates: Vec<usize> = (1..a.len().saturating_sub(1))
            .filter(|&i| a[i] > a[i - 1] && a[i] >= a[i + 1] && a[i] >= floor)
            .collect();
        candidates.sort_by(|&i, &j| a[j].total_cmp(&a[i]));

        let mut chosen: Vec<usize> = Vec::new();
        for i in candidates {
            if chosen.len() == limit {
                break;
            }
            if chosen.iter().all(|&j| i.abs_diff(j) >= min_distance) {
                chosen.push(i);
            }
        }

        chosen
            .into_iter()
            .map(|index| Peak {
                index,
                frequency: self.frequencies[index],
                period: 1.0 / self.frequencies[index],
                amplitude: a[index],
            })
            .collect()
    }
}

fn lomb_scargle(t: &[f64], y: &[f64], w: f64) -> f64 {
    let (s2, c2) = t.iter().fold((0.0, 0.0), |(s, c), &ti| {
        (s + (2.0 * w * ti).sin(), c + (2.0 * w * ti).cos())
    });
    let tau = s2.atan2(c2) / (2.0 * w);

    let (mut yc, mut ys, mut cc, mut ss) = (0.0, 0.0, 0.0, 0.0);
    for (&ti, &yi) in t.iter().zip(y) {
        let (s, c) = (w * (ti - tau)).sin_cos();
        yc += yi * c;
        ys += yi * s;
        cc += c * c;
        ss += s * s;
    }

    let cos_term = if cc > 0.0 { yc * yc / cc } else { 0.0 };
    let sin_term = if ss > 0.0 { ys * ys / ss } else { 0.0 };
    0.5 * (cos_term + sin_term)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn swell(components: &[(f64, f64)], n: usize, rate: f64) -> (Vec<f64>, Vec<f64>) {
        let times: Vec<f64> = (0..n).map(|i| i as f64 / rate).collect();
        let heights = times
            .iter()
            .map(|&t| {
                3.0 + components
                    .iter()
                    .map(|&(amp, period)| amp * (2.0 * PI * t / period).sin())
                    .sum::<f64>()
            })
            .collect();
        (times, heights)
    }

    #[test]
    fn finds_a_single_swell() {
        let (t, h) = swell(&[(0.15, 8.0)], 1200, 10.0);
        let grid = FrequencyGrid::Linear {
            min: 0.01,
            max: 1.0,
            n: 991,
        };

        let pgram = Periodogram::compute(&t, &h, grid).unwrap();
        let peaks = pgram.dominant_peaks(0.3, 20, 5);

        assert_eq!(peaks.len(), 1);
        assert!((peaks[0].frequency - 0.125).abs() < 0.002);
        assert!((peaks[0].period - 8.0).abs() < 0.15);
        assert!((peaks[0].amplitude - 0.15).abs() < 0.01);
    }

    #[test]
    fn strongest_peak_comes_first() {
        let (t, h) = swell(&[(0.05, 4.0), (0.2, 10.0)], 2000, 5.0);
        let grid = FrequencyGrid::Logarithmic {
            min: 0.01,
            max: 2.0,
            n: 1500,
        };

        let pgram = Periodogram::compute(&t, &h, grid).unwrap();
        let peaks = pgram.dominant_peaks(0.15, 20, 5);

        assert_eq!(peaks.len(), 2);
        assert!((peaks[0].period - 10.0).abs() < 0.3);
        assert!((peaks[1].period - 4.0).abs() < 0.1);
        assert!(peaks[0].amplitude > peaks[1].amplitude);
    }

    #[test]
    fn grid_is_clipped_at_nyquist() {
        let times: Vec<f64> = (0..50).map(|i| i as f64 * 0.1).collect();
        let ny = nyquist(&times).unwrap();
        assert!((ny - 5.0).abs() < 1e-9);

        let grid = FrequencyGrid::Logarithmic {
            min: 0.1,
            max: 50.0,
            n: 20,
        };
        let freqs = grid.frequencies(Some(ny));
        assert_eq!(freqs.len(), 20);
        assert!((freqs[19] - 5.0).abs() < 1e-9);
        assert!((freqs[0] - 0.1).abs() < 1e-12);
    }

    #[test]
    fn degenerate_inputs_give_nothing() {
        let grid = FrequencyGrid::Linear {
            min: 0.1,
            max: 1.0,
            n: 10,
        };
        assert_eq!(Periodogram::compute(&[0.0], &[1.0], grid), None);
        assert_eq!(Periodogram::compute(&[0.0, 1.0], &[1.0], grid), None);

        let bad = FrequencyGrid::Logarithmic {
            min: 0.0,
            max: 1.0,
            n: 10,
        };
        assert!(bad.frequencies(None).is_empty());
    }

    #[test]
    fn flat_series_has_no_peaks() {
        let times: Vec<f64> = (0..100).map(|i| i as f64).collect();
        let heights = vec![2.5; 100];
        let grid = FrequencyGrid::Linear {
            min: 0.01,
            max: 0.5,
            n: 50,
        };

        let pgram = Periodogram::compute(&times, &heights, grid).unwrap();
        assert!(pgram.power().iter().all(|&p| p == 0.0));
        assert!(pgram.dominant_peaks(0.1, 1, 5).is_empty());
    }
}
