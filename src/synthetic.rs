//! Generates fake wave logs in the radar's format, for tests and for trying
//! the tooling without a day at the harbour. A sine swell with some noise,
//! plus the kinds of damage real logs have: low-quality readings, spikes
//! where the radar locked onto something else, and half-written lines.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::{
    f64::consts::PI,
    fs::File,
    io::{self, BufWriter, Write},
    path::Path,
};

/// A recipe for a synthetic log. The same recipe (and seed) always renders
/// the same text.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticLog {
    samples: usize,
    rate_hz: f64,
    start: NaiveDateTime,
    mean_distance_m: f64,
    wave_amplitude_m: f64,
    wave_period_s: f64,
    noise_m: f64,
    low_quality_fraction: f64,
    spike_fraction: f64,
    corrupt_fraction: f64,
    header: bool,
    seed: u64,
}

/// Builder for [`SyntheticLog`].
#[derive(Debug, Clone)]
pub struct SyntheticLogBuilder {
    log: SyntheticLog,
}

impl Default for SyntheticLogBuilder {
    fn default() -> Self {
        let start = NaiveDate::from_ymd_opt(2024, 11, 15)
            .and_then(|d| d.and_hms_opt(2, 39, 0))
            .unwrap_or_default();
        Self {
            log: SyntheticLog {
                samples: 600,
                rate_hz: 10.0,
                start,
                mean_distance_m: 3.0,
                wave_amplitude_m: 0.15,
                wave_period_s: 8.0,
                noise_m: 0.005,
                low_quality_fraction: 0.0,
                spike_fraction: 0.0,
                corrupt_fraction: 0.0,
                header: false,
                seed: 0,
            },
        }
    }
}

#[allow(missing_docs)]
impl SyntheticLogBuilder {
    pub fn samples(mut self, samples: usize) -> Self {
        self.log.samples = samples;
        self
    }

    /// Readings per second. Non-positive rates are ignored.
    pub fn rate_hz(mut self, rate_hz: f64) -> Self {
        if rate_hz > 0.0 {
            self.log.rate_hz = rate_hz;
        }
        self
    }

    pub fn start(mut self, start: NaiveDateTime) -> Self {
        self.log.start = start;
        self
    }

    pub fn mean_distance_m(mut self, mean_distance_m: f64) -> Self {
        self.log.mean_distance_m = mean_distance_m;
        self
    }

    /// Amplitude and period of the swell.
    pub fn wave(mut self, amplitude_m: f64, period_s: f64) -> Self {
        self.log.wave_amplitude_m = amplitude_m;
        if period_s > 0.0 {
            self.log.wave_period_s = period_s;
        }
        self
    }

    /// Half-width of the uniform measurement noise.
    pub fn noise_m(mut self, noise_m: f64) -> Self {
        self.log.noise_m = noise_m.abs();
        self
    }

    /// Share of readings reported with a very negative quality.
    pub fn low_quality_fraction(mut self, fraction: f64) -> Self {
        self.log.low_quality_fraction = fraction.clamp(0.0, 1.0);
        self
    }

    /// Share of readings thrown one to two meters off the swell.
    pub fn spike_fraction(mut self, fraction: f64) -> Self {
        self.log.spike_fraction = fraction.clamp(0.0, 1.0);
        self
    }

    /// Share of lines cut short as if the write was interrupted.
    pub fn corrupt_fraction(mut self, fraction: f64) -> Self {
        self.log.corrupt_fraction = fraction.clamp(0.0, 1.0);
        self
    }

    pub fn header(mut self, header: bool) -> Self {
        self.log.header = header;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.log.seed = seed;
        self
    }

    pub fn build(self) -> SyntheticLog {
        self.log
    }
}

impl SyntheticLog {
    /// Start a recipe from the defaults: one minute at 10 Hz of a clean 8 s
    /// swell three meters below the radar.
    pub fn builder() -> SyntheticLogBuilder {
        SyntheticLogBuilder::default()
    }

    /// Render the whole log as text.
    pub fn render(&self) -> String {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut out = String::new();

        if self.header {
            out.push_str(&format!(
                "First Data File Since Power On: True\n\
                 Start Time: {}\n\
                 Start of range: 0.50 m\n\
                 End of range: 7.00 m\n\
                 Update rate: {:.1} Hz\n\
                 ---\n",
                self.start.format("[%y/%m/%d %H:%M:%S%.3f]"),
                self.rate_hz
            ));
        }

        for i in 0..self.samples {
            let t = i as f64 / self.rate_hz;
            let timestamp = self.start + Duration::milliseconds((t * 1000.0).round() as i64);

            let mut height =
                self.mean_distance_m - self.wave_amplitude_m * (2.0 * PI * t / self.wave_period_s).sin();
            if self.noise_m > 0.0 {
                height += rng.gen_range(-self.noise_m..self.noise_m);
            }
            if rng.gen_bool(self.spike_fraction) {
                let jump = rng.gen_range(1.0..2.0);
                height += if rng.gen_bool(0.5) { jump } else { -jump };
            }
            let height = height.max(0.0);

            let quality: f64 = if rng.gen_bool(self.low_quality_fraction) {
                rng.gen_range(-250.0..-110.0)
            } else {
                rng.gen_range(5.0..25.0)
            };

            let line = format!(
                "{} {:.3} m, {:.1}",
                timestamp.format("[%y/%m/%d %H:%M:%S%.3f]"),
                height,
                quality
            );

            if rng.gen_bool(self.corrupt_fraction) {
                // Cutting anywhere before the unit leaves a line the parser must refuse
                let unit = line.find(" m,").unwrap_or(line.len());
                let cut = rng.gen_range(1..unit.max(2));
                out.push_str(&line[..cut]);
            } else {
                out.push_str(&line);
            }
            out.push('\n');
        }

        out
    }

    /// Write the rendered log to the [Write]able object provided.
    pub fn write_to(&self, writer: &mut impl Write) -> io::Result<()> {
        writer.write_all(self.render().as_bytes())
    }

    /// Write the rendered log to the path provided.
    pub fn to_path(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_to(&mut writer)?;
        writer.flush()
    }
}
