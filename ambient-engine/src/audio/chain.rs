//! Sample-level stages of the output chain
//!
//! The low-pass stage is a biquad with RBJ cookbook coefficients at
//! Butterworth Q; the gain stage is a plain multiplier. Both parameters are
//! driven by [`Automation`]: the graph schedules ramps into it from the
//! controller, and the audio thread reads the current values once per block
//! of [`BLOCK_FRAMES`] frames.

use super::backend::GraphParam;
use crate::eq::NEUTRAL_FILTER_HZ;
use ambient_common::Ramp;
use std::f32::consts::{FRAC_1_SQRT_2, PI};
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Frames rendered between two automation reads
pub const BLOCK_FRAMES: usize = 64;

/// Lowest cutoff the filter accepts
const MIN_CUTOFF_HZ: f32 = 10.0;

#[derive(Debug, Clone, Copy)]
struct ScheduledRamp {
    ramp: Ramp,
    started: Instant,
}

impl ScheduledRamp {
    fn hold(value: f32, now: Instant) -> Self {
        Self {
            ramp: Ramp::hold(value),
            started: now,
        }
    }

    fn value_at(&self, now: Instant) -> f32 {
        self.ramp
            .value_at(now.saturating_duration_since(self.started))
    }
}

/// Ramps currently applied to the gain and filter parameters
#[derive(Debug, Clone)]
pub struct Automation {
    gain: ScheduledRamp,
    filter: ScheduledRamp,
}

/// Automation shared between the backend and the audio thread
pub type SharedAutomation = Arc<Mutex<Automation>>;

impl Automation {
    /// Silent, with the filter wide open
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            gain: ScheduledRamp::hold(0.0, now),
            filter: ScheduledRamp::hold(NEUTRAL_FILTER_HZ, now),
        }
    }

    pub fn shared() -> SharedAutomation {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Replace the ramp on `param`, starting at `now`
    pub fn schedule(&mut self, param: GraphParam, ramp: Ramp, now: Instant) {
        let scheduled = ScheduledRamp { ramp, started: now };
        match param {
            GraphParam::Gain => self.gain = scheduled,
            GraphParam::FilterFrequency => self.filter = scheduled,
        }
    }

    /// `(gain, cutoff_hz)` at `now`
    pub fn values_at(&self, now: Instant) -> (f32, f32) {
        (self.gain.value_at(now), self.filter.value_at(now))
    }
}

impl Default for Automation {
    fn default() -> Self {
        Self::new()
    }
}

/// Normalized biquad coefficients (a0 = 1)
#[derive(Debug, Clone, Copy, PartialEq)]
struct Coefficients {
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,
}

impl Coefficients {
    fn low_pass(cutoff_hz: f32, sample_rate: u32) -> Self {
        let sample_rate = sample_rate.max(1) as f32;
        let nyquist = sample_rate / 2.0;
        let cutoff = cutoff_hz.clamp(MIN_CUTOFF_HZ.min(nyquist * 0.5), nyquist * 0.99);

        let w0 = 2.0 * PI * cutoff / sample_rate;
        let (sin_w0, cos_w0) = w0.sin_cos();
        let alpha = sin_w0 / (2.0 * FRAC_1_SQRT_2);
        let a0 = 1.0 + alpha;

        let b1 = (1.0 - cos_w0) / a0;
        Self {
            b0: b1 / 2.0,
            b1,
            b2: b1 / 2.0,
            a1: -2.0 * cos_w0 / a0,
            a2: (1.0 - alpha) / a0,
        }
    }
}

/// Direct form I history of one channel
#[derive(Debug, Clone, Copy, Default)]
struct History {
    x1: f32,
    x2: f32,
    y1: f32,
    y2: f32,
}

/// Second-order low-pass over interleaved channels
#[derive(Debug, Clone)]
pub struct LowPass {
    coefficients: Coefficients,
    cutoff_hz: f32,
    sample_rate: u32,
    history: Vec<History>,
}

impl LowPass {
    pub fn new(cutoff_hz: f32, sample_rate: u32, channels: u16) -> Self {
        Self {
            coefficients: Coefficients::low_pass(cutoff_hz, sample_rate),
            cutoff_hz,
            sample_rate,
            history: vec![History::default(); channels.max(1) as usize],
        }
    }

    #[cfg(test)]
    pub fn cutoff_hz(&self) -> f32 {
        self.cutoff_hz
    }

    /// Move the cutoff; the channel history is kept so there is no click
    pub fn set_cutoff(&mut self, cutoff_hz: f32) {
        if (cutoff_hz - self.cutoff_hz).abs() < 0.5 {
            return;
        }
        self.cutoff_hz = cutoff_hz;
        self.coefficients = Coefficients::low_pass(cutoff_hz, self.sample_rate);
    }

    /// Adapt to a new stream layout, clearing the history
    pub fn reconfigure(&mut self, sample_rate: u32, channels: u16) {
        let channels = channels.max(1) as usize;
        if sample_rate == self.sample_rate && channels == self.history.len() {
            return;
        }
        self.sample_rate = sample_rate;
        self.coefficients = Coefficients::low_pass(self.cutoff_hz, sample_rate);
        self.history = vec![History::default(); channels];
    }

    pub fn process(&mut self, channel: usize, x: f32) -> f32 {
        let c = self.coefficients;
        let len = self.history.len();
        let h = &mut self.history[channel % len];
        let y = c.b0 * x + c.b1 * h.x1 + c.b2 * h.x2 - c.a1 * h.y1 - c.a2 * h.y2;
        h.x2 = h.x1;
        h.x1 = x;
        h.y2 = h.y1;
        h.y1 = y;
        y
    }
}

/// Filter then gain, for one interleaved source
pub struct ChainStage {
    automation: SharedAutomation,
    filter: LowPass,
    gain: f32,
    channels: usize,
    /// Sample index within the current block
    position: usize,
}

impl ChainStage {
    pub fn new(automation: SharedAutomation, sample_rate: u32, channels: u16) -> Self {
        let (gain, cutoff) = read(&automation, Instant::now());
        Self {
            automation,
            filter: LowPass::new(cutoff, sample_rate, channels),
            gain,
            channels: channels.max(1) as usize,
            position: 0,
        }
    }

    /// True when the next sample starts a block
    pub fn at_block_start(&self) -> bool {
        self.position == 0
    }

    pub fn reconfigure(&mut self, sample_rate: u32, channels: u16) {
        self.filter.reconfigure(sample_rate, channels);
        self.channels = channels.max(1) as usize;
    }

    pub fn process(&mut self, sample: f32) -> f32 {
        if self.position == 0 {
            self.refresh(Instant::now());
        }
        let channel = self.position % self.channels;
        let out = self.filter.process(channel, sample) * self.gain;
        self.position = (self.position + 1) % (self.channels * BLOCK_FRAMES);
        out
    }

    #[cfg(test)]
    pub fn gain(&self) -> f32 {
        self.gain
    }

    #[cfg(test)]
    pub fn cutoff_hz(&self) -> f32 {
        self.filter.cutoff_hz()
    }

    fn refresh(&mut self, now: Instant) {
        let (gain, cutoff) = read(&self.automation, now);
        self.gain = gain;
        self.filter.set_cutoff(cutoff);
    }
}

fn read(automation: &SharedAutomation, now: Instant) -> (f32, f32) {
    automation
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .values_at(now)
}
