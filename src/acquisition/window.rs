use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::acquisition::source::Sample;
use crate::config::ConfigError;

/// Point-in-time clone of the window contents, safe to hand to a consumer on
/// another cadence.
#[derive(Clone, Debug, Default)]
pub struct WindowFrame {
    pub times: Vec<f64>,
    pub channels: Vec<Vec<f64>>,
}

impl WindowFrame {
    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Latest accepted sample, if any.
    pub fn latest(&self) -> Option<(f64, Vec<f64>)> {
        let t = *self.times.last()?;
        let values = self
            .channels
            .iter()
            .filter_map(|channel| channel.last().copied())
            .collect();
        Some((t, values))
    }
}

/// Rolling display window: parallel time/channel sequences with a fixed
/// capacity, oldest evicted first.
pub struct BoundedWindow {
    times: VecDeque<f64>,
    channels: Vec<VecDeque<f64>>,
    capacity: usize,
}

impl BoundedWindow {
    pub fn new(channel_count: usize, capacity: usize) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::ZeroWindowCapacity);
        }
        if channel_count == 0 {
            return Err(ConfigError::NoChannels);
        }
        Ok(Self {
            times: VecDeque::with_capacity(capacity),
            channels: (0..channel_count)
                .map(|_| VecDeque::with_capacity(capacity))
                .collect(),
            capacity,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    /// Append one sample, evicting the single oldest entry when full. Always
    /// succeeds; the sample must carry one value per channel.
    pub fn push(&mut self, sample: &Sample) {
        if self.times.len() == self.capacity {
            self.times.pop_front();
            for channel in &mut self.channels {
                channel.pop_front();
            }
        }
        self.times.push_back(sample.elapsed_secs);
        for (channel, value) in self.channels.iter_mut().zip(&sample.values) {
            channel.push_back(*value);
        }
    }

    /// Current contents, oldest first. Does not mutate state.
    pub fn snapshot(&self) -> WindowFrame {
        WindowFrame {
            times: self.times.iter().copied().collect(),
            channels: self
                .channels
                .iter()
                .map(|channel| channel.iter().copied().collect())
                .collect(),
        }
    }
}

/// Shared read path for the rendering consumer: the acquisition side
/// publishes whole frames, readers only ever clone them, so a reader never
/// observes a half-applied push.
#[derive(Clone, Default)]
pub struct FrameHandle {
    inner: Arc<Mutex<WindowFrame>>,
}

impl FrameHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, frame: WindowFrame) {
        let mut guard = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = frame;
    }

    pub fn read_snapshot(&self) -> WindowFrame {
        match self.inner.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}
