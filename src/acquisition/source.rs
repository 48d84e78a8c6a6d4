use std::collections::VecDeque;
use std::f64::consts::PI;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use crate::acquisition::error::SourceError;

/// Single accepted measurement: seconds since run start plus one value per
/// configured channel.
#[derive(Clone, Debug, PartialEq)]
pub struct Sample {
    pub elapsed_secs: f64,
    pub values: Vec<f64>,
}

impl Sample {
    pub fn new(elapsed_secs: f64, values: Vec<f64>) -> Self {
        Self {
            elapsed_secs,
            values,
        }
    }

    /// A reading with any NaN/infinite value never enters the data model.
    pub fn is_finite(&self) -> bool {
        self.elapsed_secs.is_finite() && self.values.iter().all(|v| v.is_finite())
    }
}

/// Trait representing something that can yield one multi-channel reading per
/// tick on demand.
pub trait SampleSource {
    fn channel_count(&self) -> usize;

    /// Produce the channel values for the tick at `elapsed_secs` seconds
    /// since run start. Timestamping is the caller's job.
    fn next_reading(&mut self, elapsed_secs: f64) -> Result<Vec<f64>, SourceError>;
}

impl SampleSource for Box<dyn SampleSource> {
    fn channel_count(&self) -> usize {
        (**self).channel_count()
    }

    fn next_reading(&mut self, elapsed_secs: f64) -> Result<Vec<f64>, SourceError> {
        (**self).next_reading(elapsed_secs)
    }
}

/// One sinusoidal component of a synthetic channel.
#[derive(Clone, Copy, Debug)]
pub struct Tone {
    pub amplitude: f64,
    pub frequency_hz: f64,
    pub phase: f64,
}

/// Synthetic waveform for one channel: a base offset, superposed tones, and
/// Gaussian noise.
#[derive(Clone, Debug)]
pub struct ChannelModel {
    pub base: f64,
    pub tones: Vec<Tone>,
    pub noise_sigma: f64,
}

impl ChannelModel {
    fn value_at(&self, t: f64, rng: &mut StdRng) -> f64 {
        let mut value = self.base;
        for tone in &self.tones {
            value += tone.amplitude * (2.0 * PI * tone.frequency_hz * t + tone.phase).sin();
        }
        if self.noise_sigma > 0.0 {
            let noise: f64 = rng.sample(StandardNormal);
            value += self.noise_sigma * noise;
        }
        value
    }
}

/// Signal generator standing in for the physical rig; never fails.
pub struct SyntheticSource {
    channels: Vec<ChannelModel>,
    rng: StdRng,
}

impl SyntheticSource {
    pub fn new(channels: Vec<ChannelModel>, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { channels, rng }
    }

    /// Default two-channel test-rig model: a 10 kN-scale load trace and a
    /// two-tone deflection trace, both with mild Gaussian noise.
    pub fn load_deflection(seed: Option<u64>) -> Self {
        let load = ChannelModel {
            base: 10.0,
            tones: vec![Tone {
                amplitude: 1.0,
                frequency_hz: 0.5,
                phase: 0.0,
            }],
            noise_sigma: 0.1,
        };
        let deflection = ChannelModel {
            base: 0.0,
            tones: vec![
                Tone {
                    amplitude: 2.0,
                    frequency_hz: 0.5,
                    phase: PI / 4.0,
                },
                Tone {
                    amplitude: 0.5,
                    frequency_hz: 2.0,
                    phase: 0.0,
                },
            ],
            noise_sigma: 0.05,
        };
        Self::new(vec![load, deflection], seed)
    }
}

impl SampleSource for SyntheticSource {
    fn channel_count(&self) -> usize {
        self.channels.len()
    }

    fn next_reading(&mut self, elapsed_secs: f64) -> Result<Vec<f64>, SourceError> {
        let rng = &mut self.rng;
        Ok(self
            .channels
            .iter()
            .map(|model| model.value_at(elapsed_secs, rng))
            .collect())
    }
}

/// In-memory source useful for tests and deterministic playback.
pub struct ManualSource {
    channel_count: usize,
    queue: VecDeque<Result<Vec<f64>, SourceError>>,
}

impl ManualSource {
    pub fn new(
        channel_count: usize,
        outcomes: impl IntoIterator<Item = Result<Vec<f64>, SourceError>>,
    ) -> Self {
        Self {
            channel_count,
            queue: outcomes.into_iter().collect(),
        }
    }

    /// Convenience for an all-accepted script of single-channel values.
    pub fn from_values(values: impl IntoIterator<Item = f64>) -> Self {
        Self::new(1, values.into_iter().map(|v| Ok(vec![v])))
    }
}

impl SampleSource for ManualSource {
    fn channel_count(&self) -> usize {
        self.channel_count
    }

    fn next_reading(&mut self, _elapsed_secs: f64) -> Result<Vec<f64>, SourceError> {
        self.queue
            .pop_front()
            .unwrap_or(Err(SourceError::Unavailable("script exhausted".into())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_is_deterministic_with_a_seed() {
        let mut a = SyntheticSource::load_deflection(Some(7));
        let mut b = SyntheticSource::load_deflection(Some(7));
        for tick in 0..20 {
            let t = tick as f64 * 0.1;
            assert_eq!(a.next_reading(t).unwrap(), b.next_reading(t).unwrap());
        }
    }

    #[test]
    fn synthetic_without_noise_matches_the_model() {
        let mut source = SyntheticSource::new(
            vec![ChannelModel {
                base: 10.0,
                tones: vec![Tone {
                    amplitude: 1.0,
                    frequency_hz: 0.5,
                    phase: 0.0,
                }],
                noise_sigma: 0.0,
            }],
            Some(0),
        );
        // sin(2*pi*0.5*0.5) = sin(pi/2) = 1
        let values = source.next_reading(0.5).unwrap();
        assert!((values[0] - 11.0).abs() < 1e-9);
        // sin(0) = 0
        let values = source.next_reading(0.0).unwrap();
        assert!((values[0] - 10.0).abs() < 1e-9);
    }

    #[test]
    fn manual_source_replays_its_script_then_goes_unavailable() {
        let mut source = ManualSource::new(
            1,
            vec![Ok(vec![1.0]), Err(SourceError::Empty), Ok(vec![2.0])],
        );
        assert_eq!(source.next_reading(0.0).unwrap(), vec![1.0]);
        assert!(matches!(source.next_reading(0.1), Err(SourceError::Empty)));
        assert_eq!(source.next_reading(0.2).unwrap(), vec![2.0]);
        assert!(source.next_reading(0.3).unwrap_err().is_fatal());
    }

    #[test]
    fn non_finite_samples_are_flagged() {
        assert!(Sample::new(0.0, vec![1.0, 2.0]).is_finite());
        assert!(!Sample::new(0.0, vec![f64::NAN]).is_finite());
        assert!(!Sample::new(f64::INFINITY, vec![1.0]).is_finite());
    }
}
