//! This module provides objects to reason about the processing context:
//! the audio sample rate and the envelope control-rate block size, plus the
//! conversions (milliseconds, Hertz, MIDI notes) that depend on them.

use crate::fixedmath::{saturate, sine, Sample, WideSample};

/// The sample rate used when none is provided, in Hz
pub const DEFAULT_SAMPLE_RATE: u32 = 11025;
/// The number of samples between envelope rate recomputations when none is
/// provided
pub const DEFAULT_ENV_BLOCK_SIZE: u8 = 32;
/// The highest sample rate a [Context] will accept, in Hz
pub const MAX_SAMPLE_RATE: u32 = 192_000;

/// Frequencies of octave 8 (C8 through B8), in whole Hz.  Lower octaves are
/// derived by shifting right, higher octaves by a saturating shift left.
const OCTAVE8_HZ: [u32; 12] = [
    4186, // C
    4434, // C#
    4698, // D
    4978, // D#
    5274, // E
    5587, // F
    5919, // F#
    6271, // G
    6644, // G#
    7040, // A
    7458, // A#
    7902, // B
];
const BASE_OCTAVE: i32 = 8;
const NOTES_PER_OCTAVE: u8 = 12;
/// Notes above this are clamped (B9)
const HIGHEST_NOTE: u8 = 119;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "RawContext"),
)]
/// A fixed-point processing context.  Every conversion from wall-clock or
/// musical units into per-sample increments goes through one of these, so
/// the engine itself never needs to know the sample rate.
pub struct Context {
    sample_rate: u32,
    env_block_size: u8,
}

/// Unvalidated deserialized form of a [Context]
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct RawContext {
    sample_rate: u32,
    env_block_size: u8,
}

#[cfg(feature = "serde")]
impl TryFrom<RawContext> for Context {
    type Error = &'static str;
    fn try_from(raw: RawContext) -> Result<Self, Self::Error> {
        Self::maybe_create(raw.sample_rate)
            .map(|ctx| ctx.with_env_block_size(raw.env_block_size))
            .ok_or("unsupported sample rate")
    }
}

impl Context {
    /// Create a new context running at [DEFAULT_SAMPLE_RATE]
    pub const fn new_11025() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            env_block_size: DEFAULT_ENV_BLOCK_SIZE,
        }
    }
    /// Create a processing context if the sample rate provided is supported
    /// (non-zero and no higher than [MAX_SAMPLE_RATE]), or return `None`
    /// otherwise.
    pub fn maybe_create(sample_rate: u32) -> Option<Self> {
        if sample_rate == 0 || sample_rate > MAX_SAMPLE_RATE {
            log::warn!("Unsupported sample rate: {}", sample_rate);
            return None;
        }
        Some(Self {
            sample_rate,
            env_block_size: DEFAULT_ENV_BLOCK_SIZE,
        })
    }
    /// Replace the envelope block size.  A block size of zero is treated as
    /// one (recompute every sample).
    pub const fn with_env_block_size(mut self, block_size: u8) -> Self {
        self.env_block_size = if block_size == 0 { 1 } else { block_size };
        self
    }
    /// The sample rate, in Hz
    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
    /// Number of samples between envelope rate recomputations
    pub const fn env_block_size(&self) -> u8 {
        self.env_block_size
    }
    /// Convert a duration in milliseconds into a number of samples
    /// (truncating, and saturating at `u32::MAX`)
    pub const fn ms_to_samples(&self, ms: u32) -> u32 {
        let samples = ms as u64 * self.sample_rate as u64 / 1000;
        if samples > u32::MAX as u64 {
            u32::MAX
        } else {
            samples as u32
        }
    }
    /// The shortest release an envelope is allowed to have, about 10ms.
    /// Anything shorter clicks when a voice is retriggered.
    pub const fn fast_release_samples(&self) -> u32 {
        self.sample_rate / 100
    }
    /// Convert a duration into an envelope rate: the per-sample increment
    /// (in the envelope's internal Q15 << 4 scale) that traverses the full
    /// range in `ms` milliseconds.
    pub const fn env_rate_from_ms(&self, ms: u16) -> i32 {
        const FULL_SCALE: i64 = (i16::MAX as i64) << 4;
        let samples = self.ms_to_samples(ms as u32);
        if samples > 0 {
            (FULL_SCALE / samples as i64) as i32
        } else {
            FULL_SCALE as i32
        }
    }
    /// Convert a frequency in Hz into an oscillator phase increment
    pub fn hz_to_freq(&self, hz: u32) -> Sample {
        let scaled = hz as u64 * i16::MAX as u64;
        let Some(inc) = scaled.checked_div(self.sample_rate as u64) else {
            return Sample::ZERO;
        };
        saturate(WideSample::from_bits(inc.min(i32::MAX as u64) as i32))
    }
    /// Convert a MIDI note number to an oscillator phase increment.  Octave 8
    /// is tabulated, lower octaves are shifted down, and octave 9 is shifted
    /// up with saturation.  Notes above 119 are treated as 119.
    pub fn midi_note_to_frequency(&self, note: u8) -> Sample {
        let note = note.min(HIGHEST_NOTE);
        let octave = (note / NOTES_PER_OCTAVE) as i32;
        let base = self.hz_to_freq(OCTAVE8_HZ[(note % NOTES_PER_OCTAVE) as usize]);
        let shift = BASE_OCTAVE - octave;
        if shift >= 0 {
            Sample::from_bits(base.to_bits() >> shift)
        } else {
            saturate(WideSample::from_bits((base.to_bits() as i32) << -shift))
        }
    }
    /// Frequency coefficient for a state-variable filter with a cutoff of
    /// `hz`, i.e. `2 * sin(pi * hz / sample_rate)`.  Saturates for cutoffs
    /// above about a sixth of the sample rate.
    pub fn svf_freq(&self, hz: u32) -> Sample {
        let half_turn = Sample::from_bits(self.hz_to_freq(hz).to_bits() >> 1);
        saturate(WideSample::from_num(sine(half_turn)) * 2)
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new_11025()
    }
}

/// Convert a MIDI note number to an oscillator phase increment at
/// [DEFAULT_SAMPLE_RATE].  This is a pure function; use
/// [Context::midi_note_to_frequency] for other sample rates.
pub fn midi_note_to_frequency(note: u8) -> Sample {
    Context::new_11025().midi_note_to_frequency(note)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unsupported_rates() {
        assert!(Context::maybe_create(0).is_none());
        assert!(Context::maybe_create(MAX_SAMPLE_RATE + 1).is_none());
        let ctx = Context::maybe_create(48000).unwrap();
        assert_eq!(ctx.sample_rate(), 48000);
        assert_eq!(ctx.env_block_size(), DEFAULT_ENV_BLOCK_SIZE);
        assert_eq!(ctx.with_env_block_size(0).env_block_size(), 1);
        let zero = Context {
            sample_rate: 0,
            env_block_size: DEFAULT_ENV_BLOCK_SIZE,
        };
        assert_eq!(zero.hz_to_freq(440), Sample::ZERO);
        assert_eq!(zero.midi_note_to_frequency(60), Sample::ZERO);
    }

    #[test]
    fn millisecond_conversions() {
        let ctx = Context::default();
        assert_eq!(ctx.ms_to_samples(1000), DEFAULT_SAMPLE_RATE);
        assert_eq!(ctx.ms_to_samples(10), 110);
        assert_eq!(ctx.fast_release_samples(), 110);
        assert_eq!(ctx.env_rate_from_ms(0), (i16::MAX as i32) << 4);
        assert_eq!(ctx.env_rate_from_ms(1000), ((i16::MAX as i32) << 4) / 11025);
        let fast = Context::maybe_create(MAX_SAMPLE_RATE).unwrap();
        assert_eq!(fast.ms_to_samples(u32::MAX), u32::MAX);
        assert_eq!(fast.ms_to_samples(1000), MAX_SAMPLE_RATE);
    }

    #[test]
    fn midi_table_values() {
        // 4186 * 32767 / 11025
        assert_eq!(midi_note_to_frequency(96).to_bits(), 12441);
        assert_eq!(midi_note_to_frequency(60).to_bits(), 12441 >> 3);
        assert_eq!(midi_note_to_frequency(119), midi_note_to_frequency(127));
        assert_eq!(midi_note_to_frequency(119), Sample::MAX);
    }

    #[test]
    fn midi_octaves_double() {
        for note in 0..(HIGHEST_NOTE - 12) {
            let low = midi_note_to_frequency(note).to_bits() as i32;
            let high = midi_note_to_frequency(note + 12).to_bits() as i32;
            if high == i16::MAX as i32 {
                continue;
            }
            assert!(high == 2 * low || high == 2 * low + 1, "note {}", note);
        }
    }

    #[test]
    fn midi_is_monotonic() {
        let mut last = Sample::ZERO;
        for note in 0..=127u8 {
            let freq = midi_note_to_frequency(note);
            assert!(freq >= last);
            last = freq;
        }
    }

    #[test]
    fn svf_freq_tracks_cutoff() {
        let ctx = Context::default();
        let low = ctx.svf_freq(200);
        let high = ctx.svf_freq(1500);
        assert!(low > Sample::ZERO);
        assert!(high > low);
        // 2 * sin(pi * 1500 / 11025) ~= 0.8291
        assert!((high.to_bits() as i32 - 27166).abs() < 200);
    }
}
