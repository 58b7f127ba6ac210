//! Engine internals: digit generation in three modes over two tiers.
//!
//! The fast tier ([fast]) works on 64-bit approximations and may refuse; the
//! exact tier ([exact]) works on bignum fractions and always answers. Both
//! fill the same [DigitBuffer] contract: significant digits plus a decimal
//! point position, sign and notation left to the caller.

mod bignum;
mod digits;
mod diyfp;
mod exact;
mod fast;

pub use digits::DigitBuffer;

/// Digit generation mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Fewest digits that parse back to the exact value.
    Shortest,
    /// A fixed count of digits after the decimal point.
    Fixed(usize),
    /// A fixed count of significant digits.
    Precision(usize),
}

/// Tie-breaking policy for values exactly between two candidate outputs.
/// Only the shortest mode can meet such ties; counted digits always round
/// half away from zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rounding {
    HalfEven,
    HalfAwayFromZero,
}

pub enum FloatType {
    Finite,
    PosInf,
    NegInf,
    Nan,
}

pub fn classify(num: f64) -> FloatType {
    if num.is_nan() {
        FloatType::Nan
    } else if num.is_infinite() {
        if num > 0.0 { FloatType::PosInf } else { FloatType::NegInf }
    } else {
        FloatType::Finite
    }
}

/// Digits and decimal point for a non-negative finite value: fast tier
/// first, exact tier when it refuses. Fixed mode goes straight to the exact
/// tier, since the 64-bit approximation can prove nothing useful about
/// digits at an absolute position.
pub fn generate(value: f64, mode: Mode, rounding: Rounding) -> DigitBuffer {
    debug_assert!(value.is_finite());
    debug_assert!(value >= 0.0);

    if value == 0.0 {
        let mut digits = DigitBuffer::new();
        digits.push(b'0');
        digits.decimal_point = 1;
        return digits;
    }

    match mode {
        Mode::Shortest => {
            fast::shortest(value).unwrap_or_else(|| exact::generate(value, mode, rounding))
        }
        Mode::Precision(count) => {
            fast::counted(value, count).unwrap_or_else(|| exact::generate(value, mode, rounding))
        }
        Mode::Fixed(_) => exact::generate(value, mode, rounding),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn digits_of(b: &DigitBuffer) -> String {
        String::from_utf8(b.digits[..b.len].to_vec()).unwrap()
    }

    #[test]
    fn zero_is_a_single_digit() {
        for mode in [Mode::Shortest, Mode::Fixed(5), Mode::Precision(5)] {
            let b = generate(0.0, mode, Rounding::HalfEven);
            assert_eq!(digits_of(&b), "0");
            assert_eq!(b.decimal_point, 1);
            assert!(!b.sign);
        }
    }

    proptest! {
        // Sign and non-finite assumes reject about half the random bit
        // patterns; the reject budget has to scale with the case count.
        #![proptest_config(ProptestConfig {
            cases: 20_000,
            max_global_rejects: 80_000,
            ..ProptestConfig::default()
        })]

        #[test]
        fn proptest_precision_always_yields_count(bits: u64, n in 1usize..=25) {
            let v = f64::from_bits(bits);
            prop_assume!(v.is_finite() && v > 0.0);
            let b = generate(v, Mode::Precision(n), Rounding::HalfEven);
            prop_assert_eq!(b.len, n);
        }

        #[test]
        fn proptest_shortest_has_no_trailing_zero(bits: u64) {
            let v = f64::from_bits(bits);
            prop_assume!(v.is_finite() && v > 0.0);
            let b = generate(v, Mode::Shortest, Rounding::HalfEven);
            prop_assert!(b.len >= 1);
            prop_assert_ne!(b.digits[b.len - 1], b'0');
            prop_assert_ne!(b.digits[0], b'0');
        }
    }
}
