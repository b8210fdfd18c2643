//! This module contains the [Voice]: a fixed set of nodes wired together
//! and triggered as one unit by note on/off events.

use arrayvec::ArrayVec;

use crate::context::Context;
use crate::devices::{Bus, Noise, Source};
use crate::fixedmath::Sample;
use crate::node::Node;
use crate::MAX_NODES;

pub mod usage;

use usage::UsageMask;

/// A single voice: an arena of up to [MAX_NODES] nodes, the note it is
/// playing, and the index of the node whose output is the voice's output.
///
/// Nodes refer to each other by index (see [Source::Node]).  Only nodes that
/// the output node depends on are evaluated; see [usage].
#[derive(Clone, Debug)]
pub struct Voice {
    nodes: ArrayVec<Node, MAX_NODES>,
    note: u8,
    gate: bool,
    freq: Sample,
    out_idx: usize,
    usage: UsageMask,
    usage_stale: bool,
}

impl Voice {
    /// Create a voice with `nodes` unconfigured nodes (at most [MAX_NODES])
    pub(crate) fn new(nodes: usize) -> Self {
        let mut voice = Self {
            nodes: (0..nodes.min(MAX_NODES)).map(|_| Node::default()).collect(),
            note: 0,
            gate: false,
            freq: Sample::ZERO,
            out_idx: 0,
            usage: UsageMask::All,
            usage_stale: true,
        };
        voice.refresh_usage();
        voice
    }
    /// The number of nodes in this voice
    pub fn len(&self) -> usize {
        self.nodes.len()
    }
    /// True if this voice has no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
    /// Get a node, or `None` if `idx` is out of range
    pub fn node(&self, idx: usize) -> Option<&Node> {
        self.nodes.get(idx)
    }
    /// Get a node for reconfiguration, or `None` if `idx` is out of range.
    /// The usage mask is recomputed before the next sample is processed.
    pub fn node_mut(&mut self, idx: usize) -> Option<&mut Node> {
        let node = self.nodes.get_mut(idx);
        if node.is_some() {
            self.usage_stale = true;
        }
        node
    }
    /// All nodes of this voice
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }
    /// Select the node whose output is the voice's output.  Returns false,
    /// leaving the voice untouched, if `idx` is out of range.
    pub fn set_output_node(&mut self, idx: usize) -> bool {
        if idx >= self.nodes.len() {
            log::warn!(
                "Output node {} out of range ({} nodes)",
                idx,
                self.nodes.len()
            );
            return false;
        }
        self.out_idx = idx;
        self.refresh_usage();
        log::debug!("Voice output set to node {}, usage {:?}", idx, self.usage);
        true
    }
    /// The index of the output node
    pub fn output_node(&self) -> usize {
        self.out_idx
    }
    /// The source oscillators should use to follow the pitch of this voice
    pub fn freq_source(&self) -> Source {
        Source::VoiceFreq
    }
    /// The phase increment of the current note
    pub fn freq(&self) -> Sample {
        self.freq
    }
    /// The current (or last) note number
    pub fn note(&self) -> u8 {
        self.note
    }
    /// True while the note is held
    pub fn gate(&self) -> bool {
        self.gate
    }
    /// The set of nodes that will be evaluated on the next sample
    pub fn usage_mask(&self) -> UsageMask {
        if self.usage_stale {
            usage::compute(&self.nodes, self.out_idx)
        } else {
            self.usage
        }
    }
    /// True once the gate is released and every envelope has reached zero
    pub fn is_silent(&self) -> bool {
        !self.gate && !self.nodes.iter().any(Node::sounding_env)
    }

    fn refresh_usage(&mut self) {
        self.usage = usage::compute(&self.nodes, self.out_idx);
        self.usage_stale = false;
    }
    pub(crate) fn note_on(&mut self, context: &Context, note: u8) {
        self.note = note;
        self.gate = true;
        self.freq = context.midi_note_to_frequency(note);
        for node in self.nodes.iter_mut() {
            node.reset();
        }
    }
    pub(crate) fn note_off(&mut self) {
        self.gate = false;
        for node in self.nodes.iter_mut() {
            node.release();
        }
    }
    /// Render one sample.  Every used node is first computed against the
    /// outputs committed on the previous sample; then all of them commit, and
    /// only then does any node advance its internal state.
    pub(crate) fn process(&mut self, context: &Context, noise: &mut Noise) -> Sample {
        if self.usage_stale {
            self.refresh_usage();
        }
        let usage = self.usage;
        let mut bus = Bus::new(self.freq, self.gate);
        for (idx, node) in self.nodes.iter().enumerate() {
            bus.publish(idx, node.out());
        }
        let mut staged = [Sample::ZERO; MAX_NODES];
        for (idx, node) in self.nodes.iter().enumerate() {
            if usage.contains(idx) && node.is_configured() {
                staged[idx] = node.compute(&bus, noise);
            }
        }
        for (idx, node) in self.nodes.iter_mut().enumerate() {
            if usage.contains(idx) && node.is_configured() {
                node.commit(staged[idx]);
                bus.publish(idx, staged[idx]);
            }
        }
        for (idx, node) in self.nodes.iter_mut().enumerate() {
            if usage.contains(idx) {
                node.advance(context, &bus);
            }
        }
        self.nodes
            .get(self.out_idx)
            .map_or(Sample::ZERO, Node::out)
    }
}
