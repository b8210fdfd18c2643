//! A node is one configurable slot in a voice.  It holds one DSP device (or
//! nothing), an optional gain input, and the output it committed on the last
//! sample.

use arrayvec::ArrayVec;

use crate::context::Context;
use crate::devices::*;
use crate::fixedmath::{saturate, scale_wide, Sample};

/// The payload of a [Node]
#[derive(Clone, Debug, Default)]
pub enum NodeKind {
    /// An unconfigured node.  Outputs silence and is skipped during
    /// processing.
    #[default]
    None,
    /// An oscillator
    Osc(Osc),
    /// An ADSR envelope
    Env(Env),
    /// A single pole low-pass filter
    LowPass(LowPass),
    /// A single pole high-pass filter
    HighPass(HighPass),
    /// A state-variable filter, low-pass output
    SvfLowPass(SvfLowPass),
    /// A state-variable filter, high-pass output
    SvfHighPass(SvfHighPass),
    /// A three input mixer
    Mixer(Mixer),
}

impl NodeKind {
    fn device(&self) -> Option<&dyn Device> {
        let device: &dyn Device = match self {
            Self::None => return None,
            Self::Osc(d) => d,
            Self::Env(d) => d,
            Self::LowPass(d) => d,
            Self::HighPass(d) => d,
            Self::SvfLowPass(d) => d,
            Self::SvfHighPass(d) => d,
            Self::Mixer(d) => d,
        };
        Some(device)
    }
    fn device_mut(&mut self) -> Option<&mut dyn Device> {
        let device: &mut dyn Device = match self {
            Self::None => return None,
            Self::Osc(d) => d,
            Self::Env(d) => d,
            Self::LowPass(d) => d,
            Self::HighPass(d) => d,
            Self::SvfLowPass(d) => d,
            Self::SvfHighPass(d) => d,
            Self::Mixer(d) => d,
        };
        Some(device)
    }
}

/// Every signal a node reads, its gain included
pub(crate) type NodeSources = ArrayVec<Source, { MAX_DEVICE_INPUTS + 1 }>;

/// A single node within a [Voice](crate::Voice)
#[derive(Clone, Debug, Default)]
pub struct Node {
    kind: NodeKind,
    gain: Option<Source>,
    out: Sample,
}

impl Node {
    fn configure(&mut self, gain: Option<Source>, kind: NodeKind) {
        *self = Self {
            kind,
            gain,
            out: Sample::ZERO,
        };
    }
    /// Turn this node into an oscillator.  `freq` is usually
    /// [Source::VoiceFreq].
    pub fn init_osc(&mut self, gain: Option<Source>, freq: Option<Source>, wave: Waveform) {
        self.configure(gain, NodeKind::Osc(Osc::new(freq, wave)));
    }
    /// Connect the detune/FM input of an oscillator.  Returns false (and does
    /// nothing) if this node is not an oscillator.
    pub fn set_detune(&mut self, detune: Option<Source>) -> bool {
        match &mut self.kind {
            NodeKind::Osc(osc) => {
                osc.set_detune(detune);
                true
            }
            _ => false,
        }
    }
    /// Turn this node into an envelope with rates given directly
    pub fn init_env(&mut self, context: &Context, gain: Option<Source>, params: &EnvParams) {
        self.configure(gain, NodeKind::Env(Env::new(context, params)));
    }
    /// Turn this node into an envelope with times in milliseconds and the
    /// sustain level as a percentage (clamped to 100) of full scale
    pub fn init_env_ms(
        &mut self,
        context: &Context,
        gain: Option<Source>,
        attack_ms: u16,
        decay_ms: u16,
        sustain_pct: u8,
        release_ms: u16,
    ) {
        let sustain = sustain_pct.min(100) as i32 * i16::MAX as i32 / 100;
        let params = EnvParams {
            attack: context.env_rate_from_ms(attack_ms),
            decay: context.env_rate_from_ms(decay_ms),
            sustain: Sample::from_bits(sustain as i16),
            release: context.env_rate_from_ms(release_ms),
        };
        self.init_env(context, gain, &params);
    }
    /// Turn this node into a single pole low-pass filter
    pub fn init_lowpass(&mut self, gain: Option<Source>, input: Option<Source>, coeff: Sample) {
        self.configure(gain, NodeKind::LowPass(LowPass::new(input, coeff)));
    }
    /// Turn this node into a single pole high-pass filter
    pub fn init_highpass(&mut self, gain: Option<Source>, input: Option<Source>, coeff: Sample) {
        self.configure(gain, NodeKind::HighPass(HighPass::new(input, coeff)));
    }
    /// Turn this node into a state-variable low-pass filter.  See
    /// [Context::svf_freq] for computing `freq`.
    pub fn init_svf_lowpass(
        &mut self,
        gain: Option<Source>,
        input: Option<Source>,
        freq: Sample,
        damping: Sample,
    ) {
        self.configure(
            gain,
            NodeKind::SvfLowPass(SvfLowPass::new(input, freq, damping)),
        );
    }
    /// Turn this node into a state-variable high-pass filter
    pub fn init_svf_highpass(
        &mut self,
        gain: Option<Source>,
        input: Option<Source>,
        freq: Sample,
        damping: Sample,
    ) {
        self.configure(
            gain,
            NodeKind::SvfHighPass(SvfHighPass::new(input, freq, damping)),
        );
    }
    /// Turn this node into a mixer
    pub fn init_mixer(&mut self, gain: Option<Source>, inputs: [Option<Source>; MIXER_INPUTS]) {
        self.configure(gain, NodeKind::Mixer(Mixer::new(inputs)));
    }
    /// Return this node to the unconfigured state
    pub fn clear(&mut self) {
        self.configure(None, NodeKind::None);
    }
    /// Set the target cutoff coefficient of a filter node.  The filter glides
    /// to the new value.  Returns false if this node is not a filter.
    pub fn set_filter_coeff(&mut self, coeff: Sample) -> bool {
        match &mut self.kind {
            NodeKind::LowPass(f) => f.set_coeff(coeff),
            NodeKind::HighPass(f) => f.set_coeff(coeff),
            NodeKind::SvfLowPass(f) => f.set_freq(coeff),
            NodeKind::SvfHighPass(f) => f.set_freq(coeff),
            _ => return false,
        }
        true
    }
    /// Change the gain (amplitude modulation) input
    pub fn set_gain(&mut self, gain: Option<Source>) {
        self.gain = gain;
    }
    /// The output committed on the last processed sample
    pub fn out(&self) -> Sample {
        self.out
    }
    /// The gain input
    pub fn gain(&self) -> Option<Source> {
        self.gain
    }
    /// The device held by this node
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }
    /// Mutable access to the device held by this node
    pub fn kind_mut(&mut self) -> &mut NodeKind {
        &mut self.kind
    }
    /// The envelope held by this node, if it is one
    pub fn as_env(&self) -> Option<&Env> {
        match &self.kind {
            NodeKind::Env(env) => Some(env),
            _ => None,
        }
    }
    /// True if this node holds a device
    pub fn is_configured(&self) -> bool {
        !matches!(self.kind, NodeKind::None)
    }

    pub(crate) fn compute(&self, bus: &Bus, noise: &mut Noise) -> Sample {
        let Some(device) = self.kind.device() else {
            return Sample::ZERO;
        };
        let raw = device.output(bus, noise);
        match bus.read(self.gain) {
            Some(gain) => saturate(scale_wide(raw, gain)),
            None => saturate(raw),
        }
    }
    pub(crate) fn commit(&mut self, value: Sample) {
        self.out = value;
    }
    pub(crate) fn advance(&mut self, context: &Context, bus: &Bus) {
        let out = self.out;
        if let Some(device) = self.kind.device_mut() {
            device.advance(context, bus, out);
        }
    }
    pub(crate) fn reset(&mut self) {
        self.out = Sample::ZERO;
        if let Some(device) = self.kind.device_mut() {
            device.reset();
        }
    }
    pub(crate) fn release(&mut self) {
        if let Some(device) = self.kind.device_mut() {
            device.release();
        }
    }
    pub(crate) fn sources(&self) -> NodeSources {
        let mut sources = NodeSources::new();
        if let Some(gain) = self.gain {
            sources.push(gain);
        }
        if let Some(device) = self.kind.device() {
            sources.extend(device.inputs());
        }
        sources
    }
    // an envelope that has not yet decayed to zero
    pub(crate) fn sounding_env(&self) -> bool {
        self.as_env().is_some_and(|env| env.level() != 0)
    }
}
