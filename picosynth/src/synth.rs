//! The top level synthesizer: a fixed set of voices mixed down to a single
//! output sample.

use alloc::vec::Vec;
use core::fmt;

use crate::context::Context;
use crate::devices::{Noise, DEFAULT_NOISE_SEED};
use crate::fixedmath::{scale_wide, soft_clip, widen, Sample, WideSample};
use crate::voice::Voice;
use crate::MAX_NODES;

/// The number of voices whose activity is tracked.  Voices past this index
/// are processed on every sample, even when they are not playing.
pub const MAX_TRACKED_VOICES: usize = u16::BITS as usize;

/// The reason a [Synth] could not be created
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CreateError {
    /// More nodes per voice were requested than a voice can hold
    TooManyNodes {
        /// The number of nodes requested
        requested: usize,
    },
    /// Storage for the voices could not be allocated
    Alloc,
}

impl fmt::Display for CreateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooManyNodes { requested } => write!(
                f,
                "{} nodes per voice requested, at most {} supported",
                requested, MAX_NODES
            ),
            Self::Alloc => write!(f, "unable to allocate voice storage"),
        }
    }
}

/// A polyphonic synthesizer
///
/// The number of voices and the number of nodes per voice are fixed at
/// creation; patches are built by configuring the nodes of each voice in
/// place (see [Synth::voice_mut]).  Voices are triggered independently with
/// [Synth::note_on] and [Synth::note_off] and rendered one sample at a time
/// with [Synth::process].
#[derive(Clone, Debug)]
pub struct Synth {
    voices: Vec<Voice>,
    active: u16,
    context: Context,
    noise: Noise,
}

impl Synth {
    /// Create a synthesizer running at the default sample rate
    pub fn new(voices: usize, nodes: usize) -> Result<Self, CreateError> {
        Self::with_context(Context::default(), voices, nodes)
    }
    /// Create a synthesizer using the given processing context
    pub fn with_context(
        context: Context,
        voices: usize,
        nodes: usize,
    ) -> Result<Self, CreateError> {
        Self::with_seed(context, voices, nodes, DEFAULT_NOISE_SEED)
    }
    /// Create a synthesizer with an explicit noise seed.  A seed of zero
    /// selects the default seed.
    pub fn with_seed(
        context: Context,
        voices: usize,
        nodes: usize,
        seed: u32,
    ) -> Result<Self, CreateError> {
        if nodes > MAX_NODES {
            log::warn!("Rejecting synth with {} nodes per voice", nodes);
            return Err(CreateError::TooManyNodes { requested: nodes });
        }
        let mut storage = Vec::new();
        if storage.try_reserve_exact(voices).is_err() {
            log::warn!("Unable to allocate {} voices", voices);
            return Err(CreateError::Alloc);
        }
        storage.extend((0..voices).map(|_| Voice::new(nodes)));
        log::debug!(
            "Created synth: {} voices x {} nodes at {} Hz",
            voices,
            nodes,
            context.sample_rate()
        );
        Ok(Self {
            voices: storage,
            active: 0,
            context,
            noise: Noise::new(seed),
        })
    }
    /// The processing context
    pub fn context(&self) -> &Context {
        &self.context
    }
    /// The number of voices
    pub fn num_voices(&self) -> usize {
        self.voices.len()
    }
    /// Get a voice, or `None` if `idx` is out of range
    pub fn voice(&self, idx: usize) -> Option<&Voice> {
        self.voices.get(idx)
    }
    /// Get a voice for configuration, or `None` if `idx` is out of range
    pub fn voice_mut(&mut self, idx: usize) -> Option<&mut Voice> {
        self.voices.get_mut(idx)
    }
    /// The noise generator shared by every voice of this synthesizer
    pub fn noise_mut(&mut self) -> &mut Noise {
        &mut self.noise
    }
    /// Bitmask of the first [MAX_TRACKED_VOICES] voices that are currently
    /// sounding
    pub fn active_voices(&self) -> u16 {
        self.active
    }
    /// Start a note on a voice, resetting the transient state of all of its
    /// nodes.  Returns false if the voice does not exist.
    pub fn note_on(&mut self, voice: usize, note: u8) -> bool {
        let Some(v) = self.voices.get_mut(voice) else {
            log::warn!("Note on for nonexistent voice {}", voice);
            return false;
        };
        v.note_on(&self.context, note);
        if voice < MAX_TRACKED_VOICES {
            self.active |= 1 << voice;
        }
        true
    }
    /// Release the note on a voice.  The voice keeps sounding until its
    /// envelopes have decayed.  Returns false if the voice does not exist.
    pub fn note_off(&mut self, voice: usize) -> bool {
        let Some(v) = self.voices.get_mut(voice) else {
            log::warn!("Note off for nonexistent voice {}", voice);
            return false;
        };
        v.note_off();
        true
    }
    /// Render a single sample.
    ///
    /// Each active voice is evaluated and the results are summed.  With more
    /// than one voice the sum is scaled by the reciprocal of the voice count,
    /// and finally it goes through [soft_clip].  Released voices are
    /// deactivated once all of their envelopes are silent.
    pub fn process(&mut self) -> Sample {
        let Self {
            voices,
            active,
            context,
            noise,
        } = self;
        let mut mix = WideSample::ZERO;
        for (idx, voice) in voices.iter_mut().enumerate() {
            let tracked = idx < MAX_TRACKED_VOICES;
            if tracked && *active & (1 << idx) == 0 {
                continue;
            }
            mix = mix.saturating_add(widen(voice.process(context, noise)));
            if tracked && voice.is_silent() {
                *active &= !(1 << idx);
            }
        }
        if voices.len() > 1 {
            let gain = i16::MAX as usize / voices.len();
            mix = scale_wide(mix, Sample::from_bits(gain as i16));
        }
        soft_clip(mix)
    }
    /// Fill `out` with consecutive samples
    pub fn render(&mut self, out: &mut [Sample]) {
        for sample in out.iter_mut() {
            *sample = self.process();
        }
    }
}
