use super::*;

use crate::fixedmath::widen;

const PHASE_MASK: i32 = 0x7FFF;

/// A phase-accumulating oscillator
///
/// The phase is a 15 bit unsigned quantity stored in a [Sample] and wraps
/// modulo `0x8000`.  Each sample it advances by the value of the frequency
/// source plus the optional detune source, so feeding another node into
/// `detune` gives (linear) frequency modulation.  Usually the frequency source
/// is [Source::VoiceFreq] so the oscillator tracks the note being played.
#[derive(Clone, Debug)]
pub struct Osc {
    phase: Sample,
    freq: Option<Source>,
    detune: Option<Source>,
    wave: Waveform,
}

impl Osc {
    /// Create an oscillator with no detune, starting at phase zero
    pub fn new(freq: Option<Source>, wave: Waveform) -> Self {
        Self {
            phase: Sample::ZERO,
            freq,
            detune: None,
            wave,
        }
    }
    /// Connect (or disconnect with `None`) the detune/FM input
    pub fn set_detune(&mut self, detune: Option<Source>) {
        self.detune = detune;
    }
    /// The current phase, in `[0, 0x7FFF]`
    pub fn phase(&self) -> Sample {
        self.phase
    }
    /// The selected waveform
    pub fn waveform(&self) -> Waveform {
        self.wave
    }
    /// The frequency source
    pub fn freq(&self) -> Option<Source> {
        self.freq
    }
    /// The detune source
    pub fn detune(&self) -> Option<Source> {
        self.detune
    }
}

impl Device for Osc {
    fn output(&self, _bus: &Bus, noise: &mut Noise) -> WideSample {
        widen(self.wave.generate(self.phase, noise))
    }
    fn advance(&mut self, _context: &Context, bus: &Bus, _out: Sample) {
        let inc = bus.read_or_zero(self.freq).to_bits() as i32
            + bus.read_or_zero(self.detune).to_bits() as i32;
        let next = (self.phase.to_bits() as i32 + inc) & PHASE_MASK;
        self.phase = Sample::from_bits(next as i16);
    }
    fn reset(&mut self) {
        self.phase = Sample::ZERO;
    }
    fn inputs(&self) -> Inputs {
        collect_inputs(&[self.freq, self.detune])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn step(osc: &mut Osc, bus: &Bus) {
        osc.advance(&Context::default(), bus, Sample::ZERO);
    }

    #[test]
    fn phase_wraps_modulo_range() {
        let bus = Bus::new(Sample::from_bits(0x3000), true);
        let mut osc = Osc::new(Some(Source::VoiceFreq), Waveform::Saw);
        step(&mut osc, &bus);
        assert_eq!(osc.phase().to_bits(), 0x3000);
        step(&mut osc, &bus);
        assert_eq!(osc.phase().to_bits(), 0x6000);
        step(&mut osc, &bus);
        assert_eq!(osc.phase().to_bits(), 0x1000);
    }

    #[test]
    fn detune_adds_to_increment() {
        let bus = Bus::new(Sample::from_bits(100), true);
        let mut osc = Osc::new(Some(Source::VoiceFreq), Waveform::Sine);
        osc.set_detune(Some(Source::Const(Sample::from_bits(-30))));
        for _ in 0..10 {
            step(&mut osc, &bus);
        }
        assert_eq!(osc.phase().to_bits(), 700);
        // negative detune larger than the increment wraps backwards
        osc.set_detune(Some(Source::Const(Sample::from_bits(-1000))));
        step(&mut osc, &bus);
        assert_eq!(osc.phase().to_bits(), (700 - 900) & 0x7FFF);
    }

    #[test]
    fn unconnected_frequency_holds_phase() {
        let bus = Bus::new(Sample::from_bits(100), true);
        let mut osc = Osc::new(None, Waveform::Square);
        step(&mut osc, &bus);
        assert_eq!(osc.phase(), Sample::ZERO);
        assert!(osc.inputs().is_empty());
    }

    #[test]
    fn output_reads_current_phase() {
        let bus = Bus::new(Sample::from_bits(0x2000), true);
        let mut noise = Noise::default();
        let mut osc = Osc::new(Some(Source::VoiceFreq), Waveform::Sine);
        assert_eq!(osc.output(&bus, &mut noise), WideSample::ZERO);
        step(&mut osc, &bus);
        assert!(osc.output(&bus, &mut noise).to_bits() > 32700);
        osc.reset();
        assert_eq!(osc.phase(), Sample::ZERO);
    }
}
