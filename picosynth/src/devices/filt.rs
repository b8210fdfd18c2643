use super::*;

use crate::fixedmath::{saturate, widen};

/// A smoothed coefficient.  Writes only set the target; the current value
/// moves towards it by 1/256 of the remaining distance every sample (at least
/// one step) so cutoff changes do not produce zipper noise.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Cutoff {
    current: Sample,
    target: Sample,
}

impl Cutoff {
    pub(crate) fn new(coeff: Sample) -> Self {
        Self {
            current: coeff,
            target: coeff,
        }
    }
    pub(crate) fn current(&self) -> Sample {
        self.current
    }
    pub(crate) fn target(&self) -> Sample {
        self.target
    }
    pub(crate) fn set_target(&mut self, coeff: Sample) {
        self.target = coeff;
    }
    pub(crate) fn snap(&mut self) {
        self.current = self.target;
    }
    pub(crate) fn step(&mut self) {
        let delta = self.target.to_bits() as i32 - self.current.to_bits() as i32;
        if delta == 0 {
            return;
        }
        let step = match delta >> 8 {
            0 if delta > 0 => 1,
            0 => -1,
            step => step,
        };
        let next = self.current.to_bits() as i32 + step;
        self.current = saturate(WideSample::from_bits(next));
    }
}

/// A single pole filter built around a leaky accumulator.
///
/// The low-pass output is `accum * coeff`, and every sample the accumulator
/// integrates the difference between the input and the committed output
/// (for the high-pass flavour, the ungained low-pass estimate).
/// The high-pass flavour (`HIGH == true`) outputs the input minus that
/// low-pass estimate.  Larger coefficients give a higher cutoff.  See the
/// [LowPass] and [HighPass] aliases.
#[derive(Clone, Debug)]
pub struct Filt<const HIGH: bool> {
    input: Option<Source>,
    accum: WideSample,
    cutoff: Cutoff,
}

/// A single pole low-pass filter
pub type LowPass = Filt<false>;
/// A single pole high-pass filter
pub type HighPass = Filt<true>;

impl<const HIGH: bool> Filt<HIGH> {
    /// Create a filter reading from `input` with cutoff coefficient `coeff`
    pub fn new(input: Option<Source>, coeff: Sample) -> Self {
        Self {
            input,
            accum: WideSample::ZERO,
            cutoff: Cutoff::new(coeff),
        }
    }
    /// Set a new target coefficient.  The filter glides towards it over the
    /// following samples.
    pub fn set_coeff(&mut self, coeff: Sample) {
        self.cutoff.set_target(coeff);
    }
    /// The coefficient currently in effect
    pub fn coeff(&self) -> Sample {
        self.cutoff.current()
    }
    /// The coefficient the filter is gliding towards
    pub fn target_coeff(&self) -> Sample {
        self.cutoff.target()
    }
    /// The raw accumulator
    pub fn accum(&self) -> WideSample {
        self.accum
    }
    /// The input source
    pub fn input(&self) -> Option<Source> {
        self.input
    }
    fn lowpass(&self) -> WideSample {
        let prod = (self.accum.to_bits() as i64 * self.cutoff.current().to_bits() as i64) >> 15;
        WideSample::from_bits(prod.clamp(i32::MIN as i64, i32::MAX as i64) as i32)
    }
}

impl<const HIGH: bool> Device for Filt<HIGH> {
    fn output(&self, bus: &Bus, _noise: &mut Noise) -> WideSample {
        if HIGH {
            match bus.read(self.input) {
                Some(input) => widen(input).saturating_sub(self.lowpass()),
                None => WideSample::ZERO,
            }
        } else {
            self.lowpass()
        }
    }
    fn advance(&mut self, _context: &Context, bus: &Bus, out: Sample) {
        // high-pass feeds back its ungained low-pass estimate
        let feedback = if HIGH { self.lowpass() } else { widen(out) };
        self.cutoff.step();
        let delta = widen(bus.read_or_zero(self.input)).saturating_sub(feedback);
        self.accum = self.accum.saturating_add(delta);
    }
    fn reset(&mut self) {
        self.accum = WideSample::ZERO;
        self.cutoff.snap();
    }
    fn inputs(&self) -> Inputs {
        collect_inputs(&[self.input])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tick<const HIGH: bool>(filt: &mut Filt<HIGH>, bus: &Bus, noise: &mut Noise) -> Sample {
        let out = saturate(filt.output(bus, noise));
        filt.advance(&Context::default(), bus, out);
        out
    }

    #[test]
    fn cutoff_glides_towards_target() {
        let mut cutoff = Cutoff::new(Sample::ZERO);
        cutoff.set_target(Sample::from_bits(0x1000));
        cutoff.step();
        assert_eq!(cutoff.current().to_bits(), 0x10);
        for _ in 0..10_000 {
            cutoff.step();
        }
        assert_eq!(cutoff.current(), cutoff.target());
        // small distances still move one step per sample
        cutoff.set_target(Sample::from_bits(0x1000 - 3));
        cutoff.step();
        assert_eq!(cutoff.current().to_bits(), 0x1000 - 1);
        cutoff.step();
        cutoff.step();
        assert_eq!(cutoff.current(), cutoff.target());
    }

    #[test]
    fn lowpass_settles_on_dc() {
        let dc = Sample::from_bits(10_000);
        let bus = Bus::new(Sample::ZERO, true);
        let mut noise = Noise::default();
        let mut filt = LowPass::new(Some(Source::Const(dc)), Sample::from_bits(0x0800));
        let mut last = Sample::ZERO;
        for _ in 0..2000 {
            last = tick(&mut filt, &bus, &mut noise);
        }
        assert!(
            (last.to_bits() as i32 - 10_000).abs() < 20,
            "{}",
            last.to_bits()
        );
    }

    #[test]
    fn highpass_blocks_dc() {
        let dc = Sample::from_bits(10_000);
        let bus = Bus::new(Sample::ZERO, true);
        let mut noise = Noise::default();
        let mut filt = HighPass::new(Some(Source::Const(dc)), Sample::from_bits(0x0800));
        assert_eq!(tick(&mut filt, &bus, &mut noise).to_bits(), 10_000);
        let mut last = Sample::MAX;
        for _ in 0..4000 {
            last = tick(&mut filt, &bus, &mut noise);
        }
        assert!(last.to_bits().abs() < 100, "{}", last.to_bits());
    }

    #[test]
    fn disconnected_highpass_is_silent() {
        let bus = Bus::new(Sample::ZERO, true);
        let mut noise = Noise::default();
        let mut filt = HighPass::new(None, Sample::MAX);
        for _ in 0..10 {
            assert_eq!(tick(&mut filt, &bus, &mut noise), Sample::ZERO);
        }
        assert!(filt.inputs().is_empty());
    }

    #[test]
    fn reset_snaps_coefficient() {
        let mut filt = LowPass::new(None, Sample::from_bits(100));
        filt.set_coeff(Sample::from_bits(2000));
        assert_eq!(filt.coeff().to_bits(), 100);
        filt.reset();
        assert_eq!(filt.coeff().to_bits(), 2000);
        assert_eq!(filt.accum(), WideSample::ZERO);
    }
}
