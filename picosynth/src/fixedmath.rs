//! Fixed-Point math functions used internally by the synthesizer.
//!
//! Everything here works on Q15 values (16 bit signed, 15 fractional bits)
//! and their 32 bit widened counterparts.  Nothing in this module uses
//! floating point at run time; the sine table is generated during constant
//! evaluation.

pub use fixed::types::*;

/// A fixed point number representing a sample, or any other signal carried on
/// a wire between two nodes.  These are 16 bit signed fixed point numbers with
/// 15 fractional bits, covering `[-1, 1)`.  Note that the largest
/// representable value is slightly less than 1.0.
pub type Sample = I1F15;
/// A 32 bit signed fixed point number with the same number of fractional bits
/// as a [Sample].  Used as the intermediate type for sums and products before
/// they are saturated back down to a [Sample].
pub type WideSample = I17F15;
/// A signed value in the range `[-1, 1)` interpreted as a fraction of pi when
/// passed to [sin_pi]
pub type IScalar = I1F15;

// The functions below are helpers because the one's in std are not const
// evaluable on stable... when that gets out of nightly these can be removed

// Calculate x!
const fn factorial(mut x: u64) -> u64 {
    let mut ret = 1;
    while x > 1 {
        ret *= x;
        x -= 1;
    }
    ret
}

// Calculate x^n
const fn float_powi(x: f32, mut n: u64) -> f32 {
    let mut ret = 1f32;
    while n > 0 {
        ret *= x;
        n -= 1;
    }
    ret
}

const fn f_abs(x: f32) -> f32 {
    if x < 0f32 {
        -x
    } else {
        x
    }
}

/// Saturate a widened intermediate back down to a [Sample].  Values above
/// [Sample::MAX] map to exactly [Sample::MAX] and values below [Sample::MIN]
/// map to exactly [Sample::MIN].
#[inline]
pub fn saturate(x: WideSample) -> Sample {
    Sample::saturating_from_num(x)
}

/// Widen a [Sample] into a [WideSample].  This is lossless.
#[inline]
pub fn widen(x: Sample) -> WideSample {
    WideSample::from_num(x)
}

/// Multiply two Q15 numbers.  The product is truncated (rounded towards
/// negative infinity, i.e. an arithmetic shift right by 15) and saturated,
/// so `-1 * -1` yields [Sample::MAX] rather than wrapping.
#[inline]
pub fn multiply(a: Sample, b: Sample) -> Sample {
    Sample::saturating_from_num(a.wide_mul(b))
}

/// Multiply a widened intermediate by a Q15 gain, keeping the result wide.
/// Used to apply amplitude modulation before the final saturation.
#[inline]
pub fn scale_wide(x: WideSample, gain: Sample) -> WideSample {
    WideSample::saturating_from_num(x.wide_mul(widen(gain)))
}

/// Raise a Q15 number to an integer power using repeated squaring.  The
/// accumulator starts at [Sample::MAX] (our closest approximation of 1.0),
/// so `pow(x, 0) == Sample::MAX`.
pub fn pow(base: Sample, mut exp: u32) -> Sample {
    let mut result = Sample::MAX;
    let mut b = base;
    while exp != 0 {
        if exp & 1 != 0 {
            result = multiply(result, b);
        }
        exp >>= 1;
        if exp != 0 {
            b = multiply(b, b);
        }
    }
    result
}

/// Calculate sin(x*pi)
pub fn sin_pi(x: IScalar) -> IScalar {
    const fn calc(theta: IScalar) -> IScalar {
        const DELTA: f32 = 1f32 / (1 << 17) as f32;
        const CONV_FACTOR: f32 = (1u32 << 15) as f32;
        let theta_float = core::f32::consts::PI * (theta.to_bits() as f32) / CONV_FACTOR;
        let mut n = 1u64;
        let mut term = theta_float;
        let mut acc = theta_float;
        while f_abs(term) > DELTA {
            let sign = if n % 2 != 0 { -1f32 } else { 1f32 };
            let exp = 2 * n + 1;
            term = sign * float_powi(theta_float, exp) / factorial(exp) as f32;
            acc += term;
            n += 1;
        }
        IScalar::from_bits((acc * CONV_FACTOR) as i16)
    }
    const fn generate() -> [IScalar; 257] {
        let mut table = [IScalar::ZERO; 257];
        let mut i = i8::MIN as isize;
        while i <= i8::MAX as isize {
            let value = IScalar::from_bits((i as i16) << 8);
            table[(i - (i8::MIN as isize)) as usize] = calc(value);
            i += 1;
        }
        table
    }
    const LOOKUP_TABLE: [IScalar; 257] = generate();
    let x_bits = (x.to_bits() as i32).wrapping_add(1 << 15) as u16;
    let idx = (x_bits >> 8) as usize;
    let frac = U0F16::from_bits((x_bits & 0xFF) << 8);
    LOOKUP_TABLE[idx]
        + IScalar::from_num((LOOKUP_TABLE[idx + 1] - LOOKUP_TABLE[idx]).wide_mul_unsigned(frac))
}

/// One full sine cycle over the phase range `[0, Sample::MAX]`.
pub fn sine(phase: Sample) -> Sample {
    // [0, 0.5) of a cycle maps onto [0, 1) * pi, [0.5, 1) wraps to [-1, 0) * pi
    let x = (phase.to_bits() as u16).wrapping_shl(1) as i16;
    sin_pi(IScalar::from_bits(x))
}

/// A smooth limiter for the master bus.  The magnitude is divided by 8 and
/// mapped through the first quarter of a sine cycle, so the output approaches
/// full scale asymptotically instead of hard clipping.
pub fn soft_clip(x: WideSample) -> Sample {
    const KNEE: i64 = (i16::MAX / 4) as i64;
    let bits = x.to_bits() as i64;
    let a = (bits.abs() >> 3).min(KNEE);
    let shaped = sine(Sample::from_bits(a as i16));
    if bits < 0 {
        shaped.saturating_neg()
    } else {
        shaped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saturate_passes_in_range_values() {
        for bits in [i16::MIN as i32, -12345, -1, 0, 1, 20000, i16::MAX as i32] {
            let sat = saturate(WideSample::from_bits(bits));
            assert_eq!(sat.to_bits() as i32, bits);
        }
    }

    #[test]
    fn saturate_clamps_to_exact_bounds() {
        for bits in [i16::MAX as i32 + 1, 100_000, i32::MAX] {
            assert_eq!(saturate(WideSample::from_bits(bits)), Sample::MAX);
        }
        for bits in [i16::MIN as i32 - 1, -100_000, i32::MIN] {
            assert_eq!(saturate(WideSample::from_bits(bits)), Sample::MIN);
        }
    }

    #[test]
    fn multiply_truncates_and_saturates() {
        let half = Sample::from_bits(0x4000);
        assert_eq!(multiply(half, half), Sample::from_bits(0x2000));
        // -1 * -1 cannot be represented
        assert_eq!(multiply(Sample::MIN, Sample::MIN), Sample::MAX);
        // truncation rounds towards negative infinity
        let tiny = Sample::from_bits(-1);
        assert_eq!(multiply(tiny, half), Sample::from_bits(-1));
        assert_eq!(multiply(Sample::from_bits(1), half), Sample::ZERO);
    }

    #[test]
    fn scale_wide_keeps_headroom() {
        let loud = WideSample::from_bits(3 * i16::MAX as i32);
        let half = Sample::from_bits(0x4000);
        assert_eq!(scale_wide(loud, half).to_bits(), (3 * i16::MAX as i32) >> 1);
    }

    #[test]
    fn pow_matches_repeated_multiplication() {
        let base = Sample::from_bits(30000);
        let mut expected = Sample::MAX;
        for n in 0..20u32 {
            let got = pow(base, n);
            let diff = (got.to_bits() as i32 - expected.to_bits() as i32).abs();
            assert!(diff <= 16, "n = {}: {} vs {}", n, got, expected);
            expected = multiply(expected, base);
        }
        assert_eq!(pow(base, 0), Sample::MAX);
    }

    #[test]
    fn sine_quarter_points() {
        assert_eq!(sine(Sample::ZERO), Sample::ZERO);
        assert!(sine(Sample::from_bits(0x2000)).to_bits() > 32700);
        assert!(sine(Sample::from_bits(0x4000)).to_bits().abs() < 16);
        assert!(sine(Sample::from_bits(0x6000)).to_bits() < -32700);
    }

    #[test]
    fn soft_clip_is_odd_and_bounded() {
        assert_eq!(soft_clip(WideSample::ZERO), Sample::ZERO);
        for bits in [1i32, 100, 5000, 40_000, 1 << 20, i32::MAX] {
            let pos = soft_clip(WideSample::from_bits(bits));
            let neg = soft_clip(WideSample::from_bits(-bits));
            assert_eq!(pos.to_bits(), -neg.to_bits());
            assert!(pos >= Sample::ZERO);
        }
        assert!(soft_clip(WideSample::from_bits(i32::MIN)) > Sample::MIN);
    }

    #[test]
    fn soft_clip_is_monotonic() {
        let mut last = Sample::ZERO;
        for bits in (0..70_000).step_by(37) {
            let cur = soft_clip(WideSample::from_bits(bits));
            assert!(cur >= last);
            last = cur;
        }
    }
}
