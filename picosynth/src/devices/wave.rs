use rand::{RngCore, SeedableRng};

use crate::fixedmath::{saturate, Sample, WideSample};

const MAX: i32 = i16::MAX as i32;

/// The seed a [Noise] generator starts from unless told otherwise
pub const DEFAULT_NOISE_SEED: u32 = 0x1234_5678;

/// The waveform an oscillator feeds its phase through
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Waveform {
    /// Sine wave
    #[default]
    Sine,
    /// Rising sawtooth
    Saw,
    /// Square wave (50% duty)
    Square,
    /// Triangle wave
    Triangle,
    /// Falling ramp (inverted sawtooth)
    Falling,
    /// Exponential decay from full scale to zero across the cycle
    Exp,
    /// White noise.  The phase is ignored.
    Noise,
}

impl Waveform {
    /// Map a phase to a sample.  Only [Waveform::Noise] touches the noise
    /// generator.
    pub fn generate(self, phase: Sample, noise: &mut Noise) -> Sample {
        match self {
            Self::Sine => sine(phase),
            Self::Saw => saw(phase),
            Self::Square => square(phase),
            Self::Triangle => triangle(phase),
            Self::Falling => falling(phase),
            Self::Exp => exp(phase),
            Self::Noise => noise.sample(),
        }
    }
}

/// Sine wave, one cycle over the phase range
pub fn sine(phase: Sample) -> Sample {
    crate::fixedmath::sine(phase)
}

/// Rising sawtooth: `2 * phase - max`
pub fn saw(phase: Sample) -> Sample {
    saturate(WideSample::from_bits(2 * phase.to_bits() as i32 - MAX))
}

/// Square wave: max for the first half of the cycle, min for the second
pub fn square(phase: Sample) -> Sample {
    if (phase.to_bits() as i32) < MAX / 2 {
        Sample::MAX
    } else {
        Sample::MIN
    }
}

/// Triangle wave: the phase is doubled and mirrored at the midpoint
pub fn triangle(phase: Sample) -> Sample {
    let mut r = (phase.to_bits() as i32) << 1;
    if r > MAX {
        r = MAX - (r - MAX);
    }
    saturate(WideSample::from_bits(r * 2 - MAX))
}

/// Falling ramp: `max - 2 * phase`
pub fn falling(phase: Sample) -> Sample {
    saturate(WideSample::from_bits(MAX - 2 * phase.to_bits() as i32))
}

/// Exponential-ish decay: `(max - phase)^4`, rescaled into range.  Starts at
/// full scale and falls off steeply towards zero.
pub fn exp(phase: Sample) -> Sample {
    let mut p = (MAX - phase.to_bits() as i32) as i64;
    p = (p * p) >> 15;
    p = (p * p) >> 15;
    saturate(WideSample::from_bits(p.min(i32::MAX as i64) as i32))
}

/// A 32 bit xorshift generator (shifts 13, 17, 5) used for white noise.
///
/// Each synthesizer owns its own generator, so two instances seeded the same
/// way produce identical noise and never share state across threads.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Noise {
    state: u32,
}

impl Noise {
    /// Create a generator.  Xorshift gets stuck at zero, so a zero seed is
    /// replaced with [DEFAULT_NOISE_SEED].
    pub const fn new(seed: u32) -> Self {
        Self {
            state: if seed == 0 { DEFAULT_NOISE_SEED } else { seed },
        }
    }
    /// Advance the generator and return the upper 16 bits as a sample
    pub fn sample(&mut self) -> Sample {
        Sample::from_bits((self.next_u32() >> 16) as u16 as i16)
    }
}

impl Default for Noise {
    fn default() -> Self {
        Self::new(DEFAULT_NOISE_SEED)
    }
}

impl RngCore for Noise {
    fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }
    fn next_u64(&mut self) -> u64 {
        let hi = self.next_u32() as u64;
        (hi << 32) | self.next_u32() as u64
    }
    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let bytes = self.next_u32().to_le_bytes();
            chunk.copy_from_slice(&bytes[..chunk.len()]);
        }
    }
    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl SeedableRng for Noise {
    type Seed = [u8; 4];
    fn from_seed(seed: [u8; 4]) -> Self {
        Self::new(u32::from_le_bytes(seed))
    }
}
