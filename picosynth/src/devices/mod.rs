//! This module contains definitions of the DSP primitives that can occupy a
//! node within a voice.

mod env;
mod filt;
mod mixer;
mod osc;
mod svf;
mod wave;

use arrayvec::ArrayVec;

use crate::context::Context;
use crate::fixedmath::{Sample, WideSample};
use crate::MAX_NODES;

/// The largest number of signal inputs (not counting gain) any device reads
pub const MAX_DEVICE_INPUTS: usize = 3;

/// The signal inputs of a device, as reported by [Device::inputs]
pub type Inputs = ArrayVec<Source, MAX_DEVICE_INPUTS>;

/// A reference to a signal that a node can read from.
///
/// Node inputs are stored as `Option<Source>`, where `None` means the input
/// is not connected.  Signals can only come from nodes inside the same voice,
/// so a wiring mistake can never reach into another voice's state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Source {
    /// The output of the node at this index within the same voice.  Indices
    /// past the end of the voice read as disconnected.
    Node(usize),
    /// The phase increment of the note currently assigned to the voice
    VoiceFreq,
    /// A constant value owned by the patch (e.g. a fixed detune offset)
    Const(Sample),
}

/// A snapshot of every signal visible inside a voice for one sample.
///
/// Devices only ever read their inputs through a `Bus`, which is what lets
/// the voice compute every node against the same set of outputs before any
/// of them are committed.
#[derive(Clone, Debug)]
pub struct Bus {
    outs: [Sample; MAX_NODES],
    len: usize,
    freq: Sample,
    gate: bool,
}

impl Bus {
    pub(crate) fn new(freq: Sample, gate: bool) -> Self {
        Self {
            outs: [Sample::ZERO; MAX_NODES],
            len: 0,
            freq,
            gate,
        }
    }
    pub(crate) fn publish(&mut self, idx: usize, value: Sample) {
        if let Some(slot) = self.outs.get_mut(idx) {
            *slot = value;
            self.len = self.len.max(idx + 1);
        }
    }
    /// Read a signal.  Returns `None` if the input is not connected, or if it
    /// refers to a node that does not exist.
    pub fn read(&self, src: Option<Source>) -> Option<Sample> {
        match src? {
            Source::Node(idx) if idx < self.len => Some(self.outs[idx]),
            Source::Node(_) => None,
            Source::VoiceFreq => Some(self.freq),
            Source::Const(value) => Some(value),
        }
    }
    /// Read a signal, treating a disconnected input as silence
    pub fn read_or_zero(&self, src: Option<Source>) -> Sample {
        self.read(src).unwrap_or(Sample::ZERO)
    }
    /// True while the voice's note is held
    pub fn gate(&self) -> bool {
        self.gate
    }
}

/// A DSP Device
///
/// A device is the payload of a node: it owns some internal state, reads its
/// input signals from a [Bus], and produces one output per sample.  Every
/// sample is split into two phases.  First [Device::output] computes the
/// output from the *current* state without modifying it, then, once every
/// node in the voice has been computed and committed, [Device::advance]
/// moves the internal state forward to the next sample.  Keeping the phases
/// separate means no device ever observes a peer that has already stepped
/// ahead within the same sample.
pub trait Device {
    /// Compute this sample's output from the current state.  The result is
    /// left wide; the caller applies gain and saturates it.
    fn output(&self, bus: &Bus, noise: &mut Noise) -> WideSample;
    /// Advance the internal state by one sample.  `out` is the value that was
    /// just committed as this device's visible output.
    fn advance(&mut self, context: &Context, bus: &Bus, out: Sample);
    /// Clear transient state when a new note starts
    fn reset(&mut self);
    /// Called when the voice's gate is released
    fn release(&mut self) {}
    /// The signals this device reads (not counting gain)
    fn inputs(&self) -> Inputs;
}

pub(crate) fn collect_inputs(sources: &[Option<Source>]) -> Inputs {
    sources.iter().flatten().copied().collect()
}

pub use env::{Env, EnvParams, EnvState, ENV_PEAK};
pub use filt::{Filt, HighPass, LowPass};
pub use mixer::{Mixer, MIXER_INPUTS};
pub use osc::Osc;
pub use svf::{Svf, SvfHighPass, SvfLowPass};
pub use wave::{Noise, Waveform, DEFAULT_NOISE_SEED};

/// Pure waveform generators, mapping a phase in `[0, Sample::MAX]` to a
/// sample
pub mod waves {
    pub use super::wave::{exp, falling, saw, sine, square, triangle};
}
