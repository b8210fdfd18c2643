use super::*;

use crate::fixedmath::widen;

/// Number of inputs a [Mixer] sums
pub const MIXER_INPUTS: usize = 3;

/// A signal mixer.  Sums up to [MIXER_INPUTS] signals; unconnected inputs
/// count as silence.
///
/// The sum is kept wide so it can exceed the sample range until the node's
/// gain has been applied.  Saturation happens once, on the final value.
#[derive(Clone, Debug, Default)]
pub struct Mixer {
    inputs: [Option<Source>; MIXER_INPUTS],
}

impl Mixer {
    /// Create a mixer with the given inputs
    pub fn new(inputs: [Option<Source>; MIXER_INPUTS]) -> Self {
        Self { inputs }
    }
    /// Rewire a single input.  Returns false if `slot` is out of range.
    pub fn set_input(&mut self, slot: usize, input: Option<Source>) -> bool {
        match self.inputs.get_mut(slot) {
            Some(dst) => {
                *dst = input;
                true
            }
            None => false,
        }
    }
}

impl Device for Mixer {
    fn output(&self, bus: &Bus, _noise: &mut Noise) -> WideSample {
        self.inputs.iter().fold(WideSample::ZERO, |acc, src| {
            acc + widen(bus.read_or_zero(*src))
        })
    }
    fn advance(&mut self, _context: &Context, _bus: &Bus, _out: Sample) {}
    fn reset(&mut self) {}
    fn inputs(&self) -> Inputs {
        collect_inputs(&self.inputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sums_connected_inputs() {
        let mut bus = Bus::new(Sample::from_bits(1000), true);
        bus.publish(0, Sample::from_bits(20_000));
        let mut noise = Noise::default();
        let mixer = Mixer::new([
            Some(Source::Node(0)),
            Some(Source::VoiceFreq),
            Some(Source::Const(Sample::from_bits(20_000))),
        ]);
        assert_eq!(mixer.output(&bus, &mut noise).to_bits(), 41_000);
        assert_eq!(mixer.inputs().len(), 3);
    }

    #[test]
    fn missing_inputs_are_silent() {
        let bus = Bus::new(Sample::MAX, true);
        let mut noise = Noise::default();
        let mut mixer = Mixer::default();
        assert_eq!(mixer.output(&bus, &mut noise), WideSample::ZERO);
        assert!(mixer.inputs().is_empty());
        // a node index past the end of the voice reads as disconnected
        assert!(mixer.set_input(1, Some(Source::Node(5))));
        assert!(!mixer.set_input(MIXER_INPUTS, None));
        assert_eq!(mixer.output(&bus, &mut noise), WideSample::ZERO);
    }
}
