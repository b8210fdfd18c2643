use super::*;

use crate::fixedmath::{pow, saturate};

const MAX: i32 = i16::MAX as i32;

/// The envelope magnitude at the top of the attack phase.  Magnitudes carry 4
/// extra fractional bits over a [Sample] so slow rates still make progress.
pub const ENV_PEAK: i32 = MAX << 4;

/// Magnitudes below this are flushed to zero during release
const RELEASE_FLOOR: i32 = 16;

/// Parameters for an [Env]
///
/// Rates are per-sample increments of the internal magnitude, i.e. in Q15
/// with 4 additional fractional bits.  [Context::env_rate_from_ms] converts a
/// duration into a rate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EnvParams {
    /// Magnitude added per sample during attack
    pub attack: i32,
    /// Nominal decay rate.  Decay is exponential; this sets its time scale.
    pub decay: i32,
    /// Sustain level.  A negative sustain inverts the polarity of the whole
    /// envelope output.
    pub sustain: Sample,
    /// Nominal release rate.  Release is exponential; this sets its time
    /// scale.
    pub release: i32,
}

/// The packed envelope state: a 31 bit magnitude and a mode bit that is set
/// once the attack phase has reached [ENV_PEAK]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EnvState(u32);

impl EnvState {
    const MODE_BIT: u32 = 0x8000_0000;
    const LEVEL_MASK: u32 = 0x7FFF_FFFF;

    const fn new(level: i32, peaked: bool) -> Self {
        let bits = level as u32 & Self::LEVEL_MASK;
        Self(if peaked { bits | Self::MODE_BIT } else { bits })
    }
    /// The current magnitude, in `[0, ENV_PEAK]`
    pub const fn level(self) -> i32 {
        (self.0 & Self::LEVEL_MASK) as i32
    }
    /// True once the attack phase has completed
    pub const fn peaked(self) -> bool {
        self.0 & Self::MODE_BIT != 0
    }
    /// The raw packed word
    pub const fn bits(self) -> u32 {
        self.0
    }
}

/// An ADSR envelope generator with linear attack and exponential decay and
/// release.
///
/// The output is the square of the magnitude, which gives a more natural
/// sounding curve.  The direction of travel (the block rate) is only
/// re-evaluated every [Context::env_block_size] samples, or immediately after
/// the attack completes or the gate is released.
#[derive(Clone, Debug)]
pub struct Env {
    params: EnvParams,
    decay_coeff: Sample,
    release_coeff: Sample,
    block_rate: i32,
    block_counter: u8,
    state: EnvState,
}

impl Env {
    /// The smallest ratio an exponential segment will target, about 1e-4
    pub const MIN_RATIO: Sample = Sample::from_bits(((MAX + 5000) / 10000) as i16);
    /// The largest ratio an exponential segment will target, about 0.9999
    pub const MAX_RATIO: Sample = Sample::from_bits(((MAX * 9999 + 5000) / 10000) as i16);

    /// Create a new envelope, precomputing the decay and release coefficients
    /// for the sample rate in `context`
    pub fn new(context: &Context, params: &EnvParams) -> Self {
        let sus_level = Self::sustain_level(params.sustain);
        let decay_span = if ENV_PEAK > sus_level {
            ENV_PEAK - sus_level
        } else {
            1
        };
        let decay_samples = Self::segment_samples(decay_span, params.decay);
        let target = saturate(WideSample::from_bits(
            (((sus_level as i64) << 15) / ENV_PEAK as i64) as i32,
        ));
        let release_samples =
            Self::segment_samples(ENV_PEAK, params.release).max(context.fast_release_samples());
        Self {
            params: *params,
            decay_coeff: Self::exp_coeff(decay_samples, target),
            release_coeff: Self::exp_coeff(release_samples, Self::MIN_RATIO),
            block_rate: 0,
            block_counter: 0,
            state: EnvState::default(),
        }
    }
    /// Find the per-sample multiplier that takes a value to `ratio` of itself
    /// after `samples` samples.  Segments shorter than 10 samples just halve
    /// every sample.  The ratio is clamped to `[MIN_RATIO, MAX_RATIO]`.
    pub fn exp_coeff(samples: u32, ratio: Sample) -> Sample {
        if samples < 10 {
            return Sample::from_bits((MAX >> 1) as i16);
        }
        let ratio = ratio.clamp(Self::MIN_RATIO, Self::MAX_RATIO);
        let mut low = 0i32;
        let mut high = MAX;
        while low + 1 < high {
            let mid = (low + high) >> 1;
            if pow(Sample::from_bits(mid as i16), samples) > ratio {
                high = mid;
            } else {
                low = mid;
            }
        }
        let target = ratio.to_bits() as i32;
        let pow_low = pow(Sample::from_bits(low as i16), samples).to_bits() as i32;
        let pow_high = pow(Sample::from_bits(high as i16), samples).to_bits() as i32;
        if (target - pow_low).abs() <= (pow_high - target).abs() {
            Sample::from_bits(low as i16)
        } else {
            Sample::from_bits(high as i16)
        }
    }
    // ceil(span / rate), or a single sample for non-positive rates
    fn segment_samples(span: i32, rate: i32) -> u32 {
        if rate > 0 {
            (span as u32).div_ceil(rate as u32)
        } else {
            1
        }
    }
    // |sustain| << 4, saturated to the peak
    fn sustain_level(sustain: Sample) -> i32 {
        (sustain.to_bits() as i32).abs().min(MAX) << 4
    }
    /// The parameters this envelope was built from
    pub fn params(&self) -> &EnvParams {
        &self.params
    }
    /// Per-sample multiplier applied to the distance above sustain while
    /// decaying
    pub fn decay_coeff(&self) -> Sample {
        self.decay_coeff
    }
    /// Per-sample multiplier applied to the magnitude while releasing
    pub fn release_coeff(&self) -> Sample {
        self.release_coeff
    }
    /// The rate chosen at the last block boundary: `+attack`, `-decay` or
    /// `-release`.  Only the attack phase consumes it; decay and release are
    /// driven by their coefficients.
    pub fn block_rate(&self) -> i32 {
        self.block_rate
    }
    /// Samples left until the block rate is re-evaluated
    pub fn block_counter(&self) -> u8 {
        self.block_counter
    }
    /// The packed state word
    pub fn state(&self) -> EnvState {
        self.state
    }
    /// The current magnitude, in `[0, ENV_PEAK]`
    pub fn level(&self) -> i32 {
        self.state.level()
    }
}

impl Device for Env {
    fn output(&self, _bus: &Bus, _noise: &mut Noise) -> WideSample {
        let m = self.state.level() >> 4;
        let shaped = (m * m) >> 15;
        WideSample::from_bits(if self.params.sustain < Sample::ZERO {
            -shaped
        } else {
            shaped
        })
    }
    fn advance(&mut self, context: &Context, bus: &Bus, _out: Sample) {
        if self.block_counter == 0 {
            self.block_counter = context.env_block_size();
            self.block_rate = if !bus.gate() {
                self.params.release.saturating_neg()
            } else if self.state.peaked() {
                self.params.decay.saturating_neg()
            } else {
                self.params.attack
            };
        }
        self.block_counter = self.block_counter.saturating_sub(1);

        let mut val = self.state.level();
        if !bus.gate() {
            val = ((val as i64 * self.release_coeff.to_bits() as i64) >> 15) as i32;
            if val < RELEASE_FLOOR {
                val = 0;
            }
            self.state = EnvState::new(val, false);
        } else if self.state.peaked() {
            let sus_level = Self::sustain_level(self.params.sustain);
            let delta = (val - sus_level) as i64;
            val = sus_level + ((delta * self.decay_coeff.to_bits() as i64) >> 15) as i32;
            self.state = EnvState::new(val.max(sus_level), true);
        } else {
            val = val.saturating_add(self.block_rate).max(0);
            if val >= ENV_PEAK {
                self.block_counter = 0;
                self.state = EnvState::new(ENV_PEAK, true);
            } else {
                self.state = EnvState::new(val, false);
            }
        }
    }
    fn reset(&mut self) {
        self.state = EnvState::default();
        self.block_counter = 0;
        self.block_rate = 0;
    }
    fn release(&mut self) {
        self.block_counter = 0;
    }
    fn inputs(&self) -> Inputs {
        Inputs::new()
    }
}
