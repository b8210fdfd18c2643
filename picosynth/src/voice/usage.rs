//! Signal dependency analysis: which nodes of a voice can influence its
//! output.

use arrayvec::ArrayVec;

use crate::devices::{Source, MAX_DEVICE_INPUTS};
use crate::node::Node;
use crate::MAX_NODES;

/// The number of nodes a [UsageMask::Only] can describe
pub const MASK_WIDTH: usize = u8::BITS as usize;

// Each node is visited at most once and pushes at most its gain plus its
// inputs, plus the initial push of the output node.
const STACK_CAPACITY: usize = MAX_NODES * (MAX_DEVICE_INPUTS + 1) + 1;

/// The set of nodes that need to be evaluated to produce a voice's output
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UsageMask {
    /// Every node is evaluated.  Used whenever the analysis cannot produce an
    /// exact answer.
    All,
    /// Only the nodes whose bit is set are evaluated
    Only(u8),
}

impl UsageMask {
    /// True if the node at `idx` is evaluated
    pub fn contains(self, idx: usize) -> bool {
        match self {
            Self::All => true,
            Self::Only(bits) => idx < MASK_WIDTH && bits & (1 << idx) != 0,
        }
    }
    /// The raw bitmask, or `None` for [UsageMask::All]
    pub fn bits(self) -> Option<u8> {
        match self {
            Self::All => None,
            Self::Only(bits) => Some(bits),
        }
    }
}

/// Compute the transitive closure of the output node's sources
pub(crate) fn compute(nodes: &[Node], out_idx: usize) -> UsageMask {
    trace(nodes, out_idx, MASK_WIDTH)
}

fn trace(nodes: &[Node], out_idx: usize, width: usize) -> UsageMask {
    if out_idx >= nodes.len() {
        return UsageMask::All;
    }
    let mut stack = ArrayVec::<usize, STACK_CAPACITY>::new();
    stack.push(out_idx);
    let mut mask = 0u8;
    while let Some(idx) = stack.pop() {
        if idx >= width {
            return UsageMask::All;
        }
        if mask & (1 << idx) != 0 {
            continue;
        }
        mask |= 1 << idx;
        for src in nodes[idx].sources() {
            let Source::Node(dep) = src else {
                continue;
            };
            if dep >= nodes.len() || (dep < width && mask & (1 << dep) != 0) {
                continue;
            }
            if stack.try_push(dep).is_err() {
                return UsageMask::All;
            }
        }
    }
    UsageMask::Only(mask)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::Waveform;
    use crate::fixedmath::Sample;

    fn chain() -> [Node; 4] {
        let mut nodes: [Node; 4] = Default::default();
        nodes[0].init_osc(None, Some(Source::VoiceFreq), Waveform::Saw);
        nodes[1].init_lowpass(None, Some(Source::Node(0)), Sample::from_bits(5000));
        nodes[2].init_highpass(None, Some(Source::Node(1)), Sample::from_bits(500));
        nodes[3].init_osc(None, Some(Source::VoiceFreq), Waveform::Sine);
        nodes
    }

    #[test]
    fn closure_of_output() {
        let nodes = chain();
        let mask = compute(&nodes, 2);
        assert_eq!(mask, UsageMask::Only(0b0111));
        assert!(!mask.contains(3));
        assert_eq!(compute(&nodes, 0), UsageMask::Only(0b0001));
        assert_eq!(compute(&nodes, 3), UsageMask::Only(0b1000));
    }

    #[test]
    fn gain_is_a_dependency() {
        let mut nodes = chain();
        nodes[0].set_gain(Some(Source::Node(3)));
        assert_eq!(compute(&nodes, 2), UsageMask::Only(0b1111));
    }

    #[test]
    fn cycles_terminate() {
        let mut nodes: [Node; 3] = Default::default();
        nodes[0].init_mixer(None, [Some(Source::Node(1)), None, None]);
        nodes[1].init_mixer(
            Some(Source::Node(0)),
            [Some(Source::Node(0)), Some(Source::Node(1)), None],
        );
        assert_eq!(compute(&nodes, 1), UsageMask::Only(0b011));
    }

    #[test]
    fn external_sources_are_not_traced() {
        let mut nodes: [Node; 2] = Default::default();
        nodes[0].init_mixer(
            None,
            [
                Some(Source::Node(7)),
                Some(Source::Const(Sample::MAX)),
                Some(Source::VoiceFreq),
            ],
        );
        assert_eq!(compute(&nodes, 0), UsageMask::Only(0b01));
    }

    #[test]
    fn degrades_to_all() {
        let nodes = chain();
        assert_eq!(compute(&nodes, 4), UsageMask::All);
        assert_eq!(trace(&nodes, 2, 2), UsageMask::All);
        assert_eq!(trace(&nodes, 1, 2), UsageMask::Only(0b11));
        assert!(UsageMask::All.contains(MASK_WIDTH + 3));
        assert_eq!(UsageMask::All.bits(), None);
    }
}
