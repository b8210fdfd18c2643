use super::*;

use super::filt::Cutoff;
use crate::fixedmath::{multiply, saturate, widen};

/// A Chamberlin state-variable filter
///
/// Per sample:
///
/// ```text
/// low  += f * band
/// high  = in - low - q * band
/// band += f * high
/// ```
///
/// where `f` is the frequency coefficient (see [Context::svf_freq]) and `q`
/// the damping.  Every intermediate saturates to the sample range.  Like the
/// single pole filters the frequency coefficient glides towards its target.
/// The output is the low state for [SvfLowPass] and the high state for
/// [SvfHighPass].
#[derive(Clone, Debug)]
pub struct Svf<const HIGH: bool> {
    input: Option<Source>,
    low: Sample,
    band: Sample,
    high: Sample,
    freq: Cutoff,
    damping: Sample,
}

/// A state-variable filter producing its low-pass output
pub type SvfLowPass = Svf<false>;
/// A state-variable filter producing its high-pass output
pub type SvfHighPass = Svf<true>;

impl<const HIGH: bool> Svf<HIGH> {
    /// Create a filter.  Lower damping gives more resonance.
    pub fn new(input: Option<Source>, freq: Sample, damping: Sample) -> Self {
        Self {
            input,
            low: Sample::ZERO,
            band: Sample::ZERO,
            high: Sample::ZERO,
            freq: Cutoff::new(freq),
            damping,
        }
    }
    /// Set a new target frequency coefficient
    pub fn set_freq(&mut self, freq: Sample) {
        self.freq.set_target(freq);
    }
    /// Change the damping.  Takes effect immediately.
    pub fn set_damping(&mut self, damping: Sample) {
        self.damping = damping;
    }
    /// The frequency coefficient currently in effect
    pub fn freq(&self) -> Sample {
        self.freq.current()
    }
    /// The damping coefficient
    pub fn damping(&self) -> Sample {
        self.damping
    }
    /// The input source
    pub fn input(&self) -> Option<Source> {
        self.input
    }
    /// The `(low, band, high)` state
    pub fn state(&self) -> (Sample, Sample, Sample) {
        (self.low, self.band, self.high)
    }
}

impl<const HIGH: bool> Device for Svf<HIGH> {
    fn output(&self, _bus: &Bus, _noise: &mut Noise) -> WideSample {
        widen(if HIGH { self.high } else { self.low })
    }
    fn advance(&mut self, _context: &Context, bus: &Bus, _out: Sample) {
        self.freq.step();
        let f = self.freq.current();
        let input = widen(bus.read_or_zero(self.input));
        self.low = self.low.saturating_add(multiply(f, self.band));
        self.high = saturate(
            input - widen(self.low) - widen(multiply(self.damping, self.band)),
        );
        self.band = self.band.saturating_add(multiply(f, self.high));
    }
    fn reset(&mut self) {
        self.low = Sample::ZERO;
        self.band = Sample::ZERO;
        self.high = Sample::ZERO;
        self.freq.snap();
    }
    fn inputs(&self) -> Inputs {
        collect_inputs(&[self.input])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settle<const HIGH: bool>(svf: &mut Svf<HIGH>, bus: &Bus, samples: usize) -> Sample {
        let mut noise = Noise::default();
        let mut out = Sample::ZERO;
        for _ in 0..samples {
            out = saturate(svf.output(bus, &mut noise));
            svf.advance(&Context::default(), bus, out);
        }
        out
    }

    fn coeffs() -> (Sample, Sample) {
        (Context::default().svf_freq(500), Sample::from_bits(22938))
    }

    #[test]
    fn lowpass_passes_dc() {
        let (f, q) = coeffs();
        let bus = Bus::new(Sample::ZERO, true);
        let mut svf = SvfLowPass::new(Some(Source::Const(Sample::from_bits(8000))), f, q);
        let out = settle(&mut svf, &bus, 5000);
        assert!(
            (out.to_bits() as i32 - 8000).abs() < 50,
            "{}",
            out.to_bits()
        );
    }

    #[test]
    fn highpass_blocks_dc() {
        let (f, q) = coeffs();
        let bus = Bus::new(Sample::ZERO, true);
        let mut svf = SvfHighPass::new(Some(Source::Const(Sample::from_bits(8000))), f, q);
        let out = settle(&mut svf, &bus, 5000);
        assert!(out.to_bits().abs() < 50, "{}", out.to_bits());
    }

    #[test]
    fn full_scale_input_stays_bounded() {
        let bus = Bus::new(Sample::ZERO, true);
        let mut svf = SvfLowPass::new(Some(Source::Const(Sample::MIN)), Sample::MAX, Sample::ZERO);
        settle(&mut svf, &bus, 1000);
        svf.reset();
        assert_eq!(svf.state(), (Sample::ZERO, Sample::ZERO, Sample::ZERO));
    }
}
