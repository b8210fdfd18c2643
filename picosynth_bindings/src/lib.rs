use picosynth::devices::waves;
use picosynth::{
    midi_note_to_frequency, Context, EnvParams, Node, NodeKind, Sample, Source, Synth, Waveform,
};

const SRC_NONE_VAL: i32 = -1;
const SRC_VOICE_FREQ_VAL: i32 = -2;

#[no_mangle]
pub static PICOSYNTH_SRC_NONE: i32 = SRC_NONE_VAL;
#[no_mangle]
pub static PICOSYNTH_SRC_VOICE_FREQ: i32 = SRC_VOICE_FREQ_VAL;

const WAVE_SINE_VAL: u8 = 0;
const WAVE_SAW_VAL: u8 = 1;
const WAVE_SQUARE_VAL: u8 = 2;
const WAVE_TRIANGLE_VAL: u8 = 3;
const WAVE_FALLING_VAL: u8 = 4;
const WAVE_EXP_VAL: u8 = 5;
const WAVE_NOISE_VAL: u8 = 6;

#[no_mangle]
pub static PICOSYNTH_WAVE_SINE: u8 = WAVE_SINE_VAL;
#[no_mangle]
pub static PICOSYNTH_WAVE_SAW: u8 = WAVE_SAW_VAL;
#[no_mangle]
pub static PICOSYNTH_WAVE_SQUARE: u8 = WAVE_SQUARE_VAL;
#[no_mangle]
pub static PICOSYNTH_WAVE_TRIANGLE: u8 = WAVE_TRIANGLE_VAL;
#[no_mangle]
pub static PICOSYNTH_WAVE_FALLING: u8 = WAVE_FALLING_VAL;
#[no_mangle]
pub static PICOSYNTH_WAVE_EXP: u8 = WAVE_EXP_VAL;
#[no_mangle]
pub static PICOSYNTH_WAVE_NOISE: u8 = WAVE_NOISE_VAL;

// Outer None: invalid encoding.  Inner None: not connected.
fn source_from_i32(src: i32) -> Option<Option<Source>> {
    match src {
        SRC_NONE_VAL => Some(None),
        SRC_VOICE_FREQ_VAL => Some(Some(Source::VoiceFreq)),
        idx if idx >= 0 => Some(Some(Source::Node(idx as usize))),
        _ => None,
    }
}

fn waveform_from_u8(wave: u8) -> Option<Waveform> {
    match wave {
        WAVE_SINE_VAL => Some(Waveform::Sine),
        WAVE_SAW_VAL => Some(Waveform::Saw),
        WAVE_SQUARE_VAL => Some(Waveform::Square),
        WAVE_TRIANGLE_VAL => Some(Waveform::Triangle),
        WAVE_FALLING_VAL => Some(Waveform::Falling),
        WAVE_EXP_VAL => Some(Waveform::Exp),
        WAVE_NOISE_VAL => Some(Waveform::Noise),
        _ => None,
    }
}

unsafe fn node_at<'a>(s: *mut Synth, voice: u8, node: u8) -> Option<&'a mut Node> {
    s.as_mut()?
        .voice_mut(voice as usize)?
        .node_mut(node as usize)
}

fn status(ok: bool) -> i32 {
    if ok {
        0
    } else {
        -1
    }
}

#[no_mangle]
pub extern "C" fn picosynth_create(voices: u8, nodes: u8) -> *mut Synth {
    match Synth::new(voices as usize, nodes as usize) {
        Ok(synth) => Box::into_raw(Box::new(synth)),
        Err(_) => core::ptr::null_mut(),
    }
}

#[no_mangle]
pub unsafe extern "C" fn picosynth_destroy(s: *mut Synth) {
    if !s.is_null() {
        let _ = Box::from_raw(s);
    }
}

#[no_mangle]
pub unsafe extern "C" fn picosynth_note_on(s: *mut Synth, voice: u8, note: u8) -> i32 {
    match s.as_mut() {
        Some(synth) => status(synth.note_on(voice as usize, note)),
        None => -1,
    }
}

#[no_mangle]
pub unsafe extern "C" fn picosynth_note_off(s: *mut Synth, voice: u8) -> i32 {
    match s.as_mut() {
        Some(synth) => status(synth.note_off(voice as usize)),
        None => -1,
    }
}

#[no_mangle]
pub unsafe extern "C" fn picosynth_process(s: *mut Synth) -> i16 {
    match s.as_mut() {
        Some(synth) => synth.process().to_bits(),
        None => 0,
    }
}

#[no_mangle]
pub unsafe extern "C" fn picosynth_render(s: *mut Synth, out: *mut i16, len: u32) -> i32 {
    if s.is_null() || out.is_null() {
        return -1;
    }
    let out = core::slice::from_raw_parts_mut(out.cast::<Sample>(), len as usize);
    (*s).render(out);
    0
}

#[no_mangle]
pub extern "C" fn picosynth_midi_to_freq(note: u8) -> i16 {
    midi_note_to_frequency(note).to_bits()
}

#[no_mangle]
pub unsafe extern "C" fn picosynth_voice_set_out(s: *mut Synth, voice: u8, node: u8) -> i32 {
    match s.as_mut().and_then(|synth| synth.voice_mut(voice as usize)) {
        Some(v) => status(v.set_output_node(node as usize)),
        None => -1,
    }
}

#[no_mangle]
pub unsafe extern "C" fn picosynth_init_osc(
    s: *mut Synth,
    voice: u8,
    node: u8,
    gain: i32,
    freq: i32,
    wave: u8,
) -> i32 {
    let (Some(gain), Some(freq), Some(wave)) = (
        source_from_i32(gain),
        source_from_i32(freq),
        waveform_from_u8(wave),
    ) else {
        return -1;
    };
    match node_at(s, voice, node) {
        Some(n) => {
            n.init_osc(gain, freq, wave);
            0
        }
        None => -1,
    }
}

#[no_mangle]
pub unsafe extern "C" fn picosynth_osc_set_detune(
    s: *mut Synth,
    voice: u8,
    node: u8,
    detune: i32,
) -> i32 {
    let Some(detune) = source_from_i32(detune) else {
        return -1;
    };
    match node_at(s, voice, node) {
        Some(n) => status(n.set_detune(detune)),
        None => -1,
    }
}

#[no_mangle]
pub unsafe extern "C" fn picosynth_init_env(
    s: *mut Synth,
    voice: u8,
    node: u8,
    gain: i32,
    attack: i32,
    decay: i32,
    sustain: i16,
    release: i32,
) -> i32 {
    let Some(gain) = source_from_i32(gain) else {
        return -1;
    };
    let Some(synth) = s.as_mut() else {
        return -1;
    };
    let context = *synth.context();
    let params = EnvParams {
        attack,
        decay,
        sustain: Sample::from_bits(sustain),
        release,
    };
    match node_at(synth, voice, node) {
        Some(n) => {
            n.init_env(&context, gain, &params);
            0
        }
        None => -1,
    }
}

#[no_mangle]
pub unsafe extern "C" fn picosynth_init_env_ms(
    s: *mut Synth,
    voice: u8,
    node: u8,
    gain: i32,
    attack_ms: u16,
    decay_ms: u16,
    sustain_pct: u8,
    release_ms: u16,
) -> i32 {
    let Some(gain) = source_from_i32(gain) else {
        return -1;
    };
    let Some(synth) = s.as_mut() else {
        return -1;
    };
    let context = *synth.context();
    match node_at(synth, voice, node) {
        Some(n) => {
            n.init_env_ms(&context, gain, attack_ms, decay_ms, sustain_pct, release_ms);
            0
        }
        None => -1,
    }
}

#[no_mangle]
pub unsafe extern "C" fn picosynth_init_lp(
    s: *mut Synth,
    voice: u8,
    node: u8,
    gain: i32,
    input: i32,
    coeff: i16,
) -> i32 {
    let (Some(gain), Some(input)) = (source_from_i32(gain), source_from_i32(input)) else {
        return -1;
    };
    match node_at(s, voice, node) {
        Some(n) => {
            n.init_lowpass(gain, input, Sample::from_bits(coeff));
            0
        }
        None => -1,
    }
}

#[no_mangle]
pub unsafe extern "C" fn picosynth_init_hp(
    s: *mut Synth,
    voice: u8,
    node: u8,
    gain: i32,
    input: i32,
    coeff: i16,
) -> i32 {
    let (Some(gain), Some(input)) = (source_from_i32(gain), source_from_i32(input)) else {
        return -1;
    };
    match node_at(s, voice, node) {
        Some(n) => {
            n.init_highpass(gain, input, Sample::from_bits(coeff));
            0
        }
        None => -1,
    }
}

#[no_mangle]
pub unsafe extern "C" fn picosynth_init_svf_lp(
    s: *mut Synth,
    voice: u8,
    node: u8,
    gain: i32,
    input: i32,
    freq: i16,
    damping: i16,
) -> i32 {
    let (Some(gain), Some(input)) = (source_from_i32(gain), source_from_i32(input)) else {
        return -1;
    };
    match node_at(s, voice, node) {
        Some(n) => {
            n.init_svf_lowpass(
                gain,
                input,
                Sample::from_bits(freq),
                Sample::from_bits(damping),
            );
            0
        }
        None => -1,
    }
}

#[no_mangle]
pub unsafe extern "C" fn picosynth_init_svf_hp(
    s: *mut Synth,
    voice: u8,
    node: u8,
    gain: i32,
    input: i32,
    freq: i16,
    damping: i16,
) -> i32 {
    let (Some(gain), Some(input)) = (source_from_i32(gain), source_from_i32(input)) else {
        return -1;
    };
    match node_at(s, voice, node) {
        Some(n) => {
            n.init_svf_highpass(
                gain,
                input,
                Sample::from_bits(freq),
                Sample::from_bits(damping),
            );
            0
        }
        None => -1,
    }
}

/// SVF frequency coefficient for a cutoff in Hz at the default sample rate
#[no_mangle]
pub extern "C" fn picosynth_svf_freq(hz: u16) -> i16 {
    Context::default().svf_freq(hz as u32).to_bits()
}

#[no_mangle]
pub unsafe extern "C" fn picosynth_svf_set_freq(
    s: *mut Synth,
    voice: u8,
    node: u8,
    freq: i16,
) -> i32 {
    match node_at(s, voice, node) {
        Some(n) if matches!(n.kind(), NodeKind::SvfLowPass(_) | NodeKind::SvfHighPass(_)) => {
            status(n.set_filter_coeff(Sample::from_bits(freq)))
        }
        _ => -1,
    }
}

#[no_mangle]
pub unsafe extern "C" fn picosynth_init_mix(
    s: *mut Synth,
    voice: u8,
    node: u8,
    gain: i32,
    in1: i32,
    in2: i32,
    in3: i32,
) -> i32 {
    let (Some(gain), Some(in1), Some(in2), Some(in3)) = (
        source_from_i32(gain),
        source_from_i32(in1),
        source_from_i32(in2),
        source_from_i32(in3),
    ) else {
        return -1;
    };
    match node_at(s, voice, node) {
        Some(n) => {
            n.init_mixer(gain, [in1, in2, in3]);
            0
        }
        None => -1,
    }
}

#[no_mangle]
pub unsafe extern "C" fn picosynth_filter_set_coeff(
    s: *mut Synth,
    voice: u8,
    node: u8,
    coeff: i16,
) -> i32 {
    match node_at(s, voice, node) {
        Some(n) => status(n.set_filter_coeff(Sample::from_bits(coeff))),
        None => -1,
    }
}

#[no_mangle]
pub extern "C" fn picosynth_wave_sine(phase: i16) -> i16 {
    waves::sine(Sample::from_bits(phase)).to_bits()
}

#[no_mangle]
pub extern "C" fn picosynth_wave_saw(phase: i16) -> i16 {
    waves::saw(Sample::from_bits(phase)).to_bits()
}

#[no_mangle]
pub extern "C" fn picosynth_wave_square(phase: i16) -> i16 {
    waves::square(Sample::from_bits(phase)).to_bits()
}

#[no_mangle]
pub extern "C" fn picosynth_wave_triangle(phase: i16) -> i16 {
    waves::triangle(Sample::from_bits(phase)).to_bits()
}

#[no_mangle]
pub extern "C" fn picosynth_wave_falling(phase: i16) -> i16 {
    waves::falling(Sample::from_bits(phase)).to_bits()
}

#[no_mangle]
pub extern "C" fn picosynth_wave_exp(phase: i16) -> i16 {
    waves::exp(Sample::from_bits(phase)).to_bits()
}

/// Noise is stateful, so it draws from the synth's own generator
#[no_mangle]
pub unsafe extern "C" fn picosynth_wave_noise(s: *mut Synth) -> i16 {
    match s.as_mut() {
        Some(synth) => synth.noise_mut().sample().to_bits(),
        None => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_encoding() {
        assert_eq!(source_from_i32(PICOSYNTH_SRC_NONE), Some(None));
        assert_eq!(
            source_from_i32(PICOSYNTH_SRC_VOICE_FREQ),
            Some(Some(Source::VoiceFreq))
        );
        assert_eq!(source_from_i32(3), Some(Some(Source::Node(3))));
        assert_eq!(source_from_i32(-3), None);
        assert_eq!(
            waveform_from_u8(PICOSYNTH_WAVE_NOISE),
            Some(Waveform::Noise)
        );
        assert_eq!(waveform_from_u8(7), None);
    }

    #[test]
    fn simple_patch_through_c_api() {
        unsafe {
            let s = picosynth_create(1, 3);
            assert!(!s.is_null());
            assert_eq!(picosynth_init_env_ms(s, 0, 0, -1, 10, 100, 80, 50), 0);
            assert_eq!(picosynth_init_osc(s, 0, 1, 0, -2, PICOSYNTH_WAVE_SAW), 0);
            assert_eq!(picosynth_init_lp(s, 0, 2, -1, 1, 5000), 0);
            assert_eq!(picosynth_voice_set_out(s, 0, 2), 0);
            assert_eq!(picosynth_init_osc(s, 0, 1, -7, -2, 0), -1);
            assert_eq!(picosynth_init_osc(s, 0, 1, 0, -2, 99), -1);
            assert_eq!(picosynth_voice_set_out(s, 0, 3), -1);
            assert_eq!(picosynth_filter_set_coeff(s, 0, 1, 100), -1);
            assert_eq!(picosynth_filter_set_coeff(s, 0, 2, 6000), 0);
            assert_eq!(picosynth_note_on(s, 0, 60), 0);
            assert_eq!(picosynth_note_on(s, 1, 60), -1);
            let mut buf = [0i16; 256];
            assert_eq!(picosynth_render(s, buf.as_mut_ptr(), buf.len() as u32), 0);
            assert!(buf.iter().any(|x| *x != 0));
            assert_eq!(picosynth_note_off(s, 0), 0);
            picosynth_destroy(s);
        }
        assert!(picosynth_create(1, 9).is_null());
        unsafe {
            assert_eq!(picosynth_process(core::ptr::null_mut()), 0);
            assert_eq!(
                picosynth_render(core::ptr::null_mut(), core::ptr::null_mut(), 0),
                -1
            );
        }
    }

    #[test]
    fn svf_patch_through_c_api() {
        let cutoff = picosynth_svf_freq(1200);
        assert_eq!(cutoff, Context::default().svf_freq(1200).to_bits());
        assert!(picosynth_svf_freq(200) < cutoff);
        unsafe {
            let s = picosynth_create(1, 4);
            assert_eq!(picosynth_init_osc(s, 0, 0, -1, -2, PICOSYNTH_WAVE_SAW), 0);
            let highpass = picosynth_svf_freq(200);
            assert_eq!(picosynth_init_svf_hp(s, 0, 1, -1, 0, highpass, 23000), 0);
            assert_eq!(picosynth_init_svf_lp(s, 0, 2, -1, 1, cutoff, 23000), 0);
            assert_eq!(picosynth_init_svf_lp(s, 0, 2, -9, 1, cutoff, 23000), -1);
            assert_eq!(picosynth_init_lp(s, 0, 3, -1, 2, 5000), 0);
            assert_eq!(picosynth_voice_set_out(s, 0, 2), 0);
            let lower = picosynth_svf_freq(800);
            assert_eq!(picosynth_svf_set_freq(s, 0, 2, lower), 0);
            // only state-variable filters take an SVF frequency
            assert_eq!(picosynth_svf_set_freq(s, 0, 3, cutoff), -1);
            assert_eq!(picosynth_svf_set_freq(s, 0, 0, cutoff), -1);
            assert_eq!(picosynth_svf_set_freq(s, 0, 4, cutoff), -1);
            assert_eq!(picosynth_note_on(s, 0, 48), 0);
            let mut buf = [0i16; 512];
            assert_eq!(picosynth_render(s, buf.as_mut_ptr(), buf.len() as u32), 0);
            assert!(buf.iter().any(|x| *x != 0));
            picosynth_destroy(s);
        }
    }
}
