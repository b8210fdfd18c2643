//! This crate contains all of the DSP logic for picosynth, a small node-based
//! polyphonic synthesizer designed for targets without a floating point unit.
//! It is `no_std` (it only needs `alloc`, once, to hold the voices) and all
//! run-time arithmetic is 16/32 bit fixed point.
//!
//! A [Synth] owns a fixed number of [Voice]s, and each voice owns a fixed
//! number of [Node]s.  A node holds one device from the [devices] module
//! (oscillator, envelope, filter or mixer) and reads its inputs from other
//! nodes of the same voice by index.  Patches are built by configuring nodes
//! in place and choosing an output node; only the nodes the output actually
//! depends on are evaluated (see [voice::usage]).
//!
//! ```
//! use picosynth::{Sample, Source, Synth, Waveform};
//!
//! let mut synth = Synth::new(2, 3).unwrap();
//! let ctx = *synth.context();
//! let voice = synth.voice_mut(0).unwrap();
//! voice.node_mut(0).unwrap().init_env_ms(&ctx, None, 10, 100, 80, 50);
//! voice
//!     .node_mut(1)
//!     .unwrap()
//!     .init_osc(Some(Source::Node(0)), Some(Source::VoiceFreq), Waveform::Saw);
//! voice
//!     .node_mut(2)
//!     .unwrap()
//!     .init_lowpass(None, Some(Source::Node(1)), Sample::from_bits(5000));
//! voice.set_output_node(2);
//!
//! synth.note_on(0, 60);
//! let mut buf = [Sample::ZERO; 64];
//! synth.render(&mut buf);
//! synth.note_off(0);
//! ```

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

extern crate alloc;

pub mod context;
pub mod devices;
pub mod fixedmath;
pub mod node;
pub mod synth;
pub mod voice;

mod midi;

/// The maximum number of nodes in a single voice
pub const MAX_NODES: usize = 8;

pub use context::{midi_note_to_frequency, Context};
pub use devices::{EnvParams, Source, Waveform};
pub use fixedmath::{Sample, WideSample};
pub use node::{Node, NodeKind};
pub use synth::{CreateError, Synth, MAX_TRACKED_VOICES};
pub use voice::usage::UsageMask;
pub use voice::Voice;
