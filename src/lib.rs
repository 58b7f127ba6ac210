//! Correct and fast conversion of IEEE-754 double precision numbers to
//! decimal strings.
//!
//! Four formatting modes: shortest round-tripping form, fixed fraction
//! digits, significant-digit precision, and exponential notation. Digit
//! generation runs on a fast 64-bit path that refuses whenever it cannot
//! prove its digits correct, backed by an exact arbitrary-precision path, so
//! every result is exactly what infinite-precision arithmetic would give.
//!
//! The interface mimics that of [Ryu](https://docs.rs/ryu/): a reusable
//! [Buffer] owning the bytes, format methods returning `&str` into it.

#![cfg_attr(not(test), no_std)]

mod fpconv;

use fpconv::{FloatType, Mode, Rounding};

/// Maximum number of digits after the decimal point for [Buffer::format_fixed].
pub const MAX_FIXED_DIGITS: usize = 100;
/// Maximum number of significant digits for [Buffer::format_precision].
pub const MAX_PRECISION_DIGITS: usize = 120;
/// Maximum number of fraction digits for [Buffer::format_exponential].
pub const MAX_EXPONENTIAL_DIGITS: usize = 100;

/// Worst output: sign, up to 21 integral digits, point, 100 fraction digits
/// (123 bytes); rounded up.
const BUFFER_LEN: usize = 160;

/// Safe API for formatting floating point numbers to text.
///
/// ## Example
///
/// ```
/// let mut buffer = fpconv::Buffer::new();
/// let printed = buffer.format_shortest(0.1);
/// assert_eq!(printed, "0.1");
/// let printed = buffer.format_fixed(0.1, 3);
/// assert_eq!(printed, "0.100");
/// ```
#[derive(Clone, Copy)]
pub struct Buffer {
    bytes: [u8; BUFFER_LEN],
}

impl Buffer {
    /// This is a cheap operation; you don't need to worry about reusing
    /// buffers for efficiency.
    pub fn new() -> Self {
        Buffer { bytes: [0; BUFFER_LEN] }
    }

    /// Print `num` with the fewest digits that parse back to exactly `num`,
    /// into this buffer, and return a reference to its string representation
    /// within the buffer. Decimal notation for values from 10^-6 up to
    /// 10^21, exponential notation (`d.ddde±X`) outside that range.
    ///
    /// Both zeros print as `"0"`. NaN prints as `"NaN"`, the infinities as
    /// `"inf"` and `"-inf"`, to match [core::fmt].
    pub fn format_shortest(&mut self, num: f64) -> &str {
        match fpconv::classify(num) {
            FloatType::Finite => self.shortest_finite(num),
            FloatType::PosInf => "inf",
            FloatType::NegInf => "-inf",
            FloatType::Nan => "NaN",
        }
    }

    /// Print `num` with exactly `fraction_digits` digits after the decimal
    /// point, rounding half away from zero, and return a reference to its
    /// string representation within the buffer.
    ///
    /// Values of magnitude 10^21 and above fall back to the shortest form
    /// (fixed notation would need placeholder digits the value does not
    /// carry). Negative zero prints like positive zero.
    ///
    /// # Panics
    ///
    /// If `fraction_digits > MAX_FIXED_DIGITS`.
    pub fn format_fixed(&mut self, num: f64, fraction_digits: usize) -> &str {
        assert!(fraction_digits <= MAX_FIXED_DIGITS);
        match fpconv::classify(num) {
            FloatType::Finite => {
                if num.abs() >= 1e21 {
                    return self.shortest_finite(num);
                }
                let mut digits =
                    fpconv::generate(num.abs(), Mode::Fixed(fraction_digits), Rounding::HalfEven);
                digits.sign = num.is_sign_negative() && num != 0.0;
                let len = digits.write_fixed(fraction_digits, &mut self.bytes);
                self.emit(len)
            }
            FloatType::PosInf => "inf",
            FloatType::NegInf => "-inf",
            FloatType::Nan => "NaN",
        }
    }

    /// Print `num` with exactly `significant_digits` significant digits,
    /// rounding half away from zero, and return a reference to its string
    /// representation within the buffer. Decimal notation when the digits
    /// can carry the magnitude, exponential otherwise.
    ///
    /// # Panics
    ///
    /// If `significant_digits` is not in `1..=MAX_PRECISION_DIGITS`.
    pub fn format_precision(&mut self, num: f64, significant_digits: usize) -> &str {
        assert!((1..=MAX_PRECISION_DIGITS).contains(&significant_digits));
        match fpconv::classify(num) {
            FloatType::Finite => {
                let mut digits = fpconv::generate(
                    num.abs(),
                    Mode::Precision(significant_digits),
                    Rounding::HalfEven,
                );
                digits.sign = num.is_sign_negative() && num != 0.0;
                let len = digits.write_precision(significant_digits, &mut self.bytes);
                self.emit(len)
            }
            FloatType::PosInf => "inf",
            FloatType::NegInf => "-inf",
            FloatType::Nan => "NaN",
        }
    }

    /// Print `num` in exponential notation, and return a reference to its
    /// string representation within the buffer. `Some(n)` requests exactly
    /// `n` digits after the point (rounding half away from zero); `None`
    /// prints the fewest digits that round-trip. The exponent sign is always
    /// explicit.
    ///
    /// `unique_zero` makes negative zero print without its sign.
    ///
    /// # Panics
    ///
    /// If `fraction_digits` exceeds `MAX_EXPONENTIAL_DIGITS`.
    pub fn format_exponential(
        &mut self,
        num: f64,
        fraction_digits: Option<usize>,
        unique_zero: bool,
    ) -> &str {
        if let Some(n) = fraction_digits {
            assert!(n <= MAX_EXPONENTIAL_DIGITS);
        }
        match fpconv::classify(num) {
            FloatType::Finite => {
                let mode = match fraction_digits {
                    None => Mode::Shortest,
                    Some(n) => Mode::Precision(n + 1),
                };
                let mut digits = fpconv::generate(num.abs(), mode, Rounding::HalfEven);
                digits.sign = num.is_sign_negative() && !(unique_zero && num == 0.0);
                let len = digits.write_exponential(fraction_digits.map(|n| n + 1), &mut self.bytes);
                self.emit(len)
            }
            FloatType::PosInf => "inf",
            FloatType::NegInf => "-inf",
            FloatType::Nan => "NaN",
        }
    }

    fn shortest_finite(&mut self, num: f64) -> &str {
        let mut digits = fpconv::generate(num.abs(), Mode::Shortest, Rounding::HalfEven);
        digits.sign = num.is_sign_negative() && num != 0.0;
        let len = digits.write_shortest(&mut self.bytes);
        self.emit(len)
    }

    fn emit(&mut self, len: usize) -> &str {
        debug_assert!(len <= BUFFER_LEN);
        // SAFETY: the renderers write only ASCII ('0'..='9', '-', '.', 'e',
        // '+') into bytes[..len].
        unsafe { core::str::from_utf8_unchecked(&self.bytes[..len]) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn shortest(num: f64) -> String {
        Buffer::new().format_shortest(num).to_owned()
    }

    fn fixed(num: f64, n: usize) -> String {
        Buffer::new().format_fixed(num, n).to_owned()
    }

    fn precision(num: f64, n: usize) -> String {
        Buffer::new().format_precision(num, n).to_owned()
    }

    fn exponential(num: f64, n: Option<usize>) -> String {
        Buffer::new().format_exponential(num, n, true).to_owned()
    }

    #[test]
    fn shortest_concrete() {
        assert_eq!(shortest(0.0), "0");
        assert_eq!(shortest(-0.0), "0");
        assert_eq!(shortest(1.0), "1");
        assert_eq!(shortest(-1.0), "-1");
        assert_eq!(shortest(0.1), "0.1");
        assert_eq!(shortest(-3.5), "-3.5");
        assert_eq!(shortest(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(shortest(0.000001), "0.000001");
        assert_eq!(shortest(0.0000001), "1e-7");
        assert_eq!(shortest(1e20), "100000000000000000000");
        assert_eq!(shortest(1e21), "1e+21");
        assert_eq!(shortest(123456789e10), "1234567890000000000");
        assert_eq!(shortest(5e-324), "5e-324");
        assert_eq!(shortest(f64::MAX), "1.7976931348623157e+308");
        assert_eq!(shortest(f64::MIN), "-1.7976931348623157e+308");
    }

    #[test]
    fn shortest_specials() {
        assert_eq!(shortest(f64::NAN), "NaN");
        assert_eq!(shortest(f64::INFINITY), "inf");
        assert_eq!(shortest(f64::NEG_INFINITY), "-inf");
        assert_eq!(fixed(f64::NAN, 3), "NaN");
        assert_eq!(precision(f64::INFINITY, 3), "inf");
        assert_eq!(exponential(f64::NEG_INFINITY, Some(3)), "-inf");
    }

    #[test]
    fn fixed_concrete() {
        assert_eq!(fixed(0.0, 2), "0.00");
        assert_eq!(fixed(-0.0, 2), "0.00");
        assert_eq!(fixed(123.456, 2), "123.46");
        assert_eq!(fixed(123.456, 0), "123");
        assert_eq!(fixed(2.5, 0), "3");
        assert_eq!(fixed(-2.5, 0), "-3");
        // Stored just below the literal: must not round up.
        assert_eq!(fixed(1.005, 2), "1.00");
        assert_eq!(fixed(-0.004, 2), "-0.00");
        assert_eq!(fixed(1e-10, 2), "0.00");
        assert_eq!(fixed(0.96, 1), "1.0");
        assert_eq!(fixed(1.0, 30), "1.000000000000000000000000000000");
        // At 10^21 fixed notation gives way to the shortest form.
        assert_eq!(fixed(1e21, 2), "1e+21");
        assert_eq!(fixed(-1e21, 2), "-1e+21");
    }

    #[test]
    fn precision_concrete() {
        assert_eq!(precision(123.456, 4), "123.5");
        assert_eq!(precision(123.456, 2), "1.2e+2");
        assert_eq!(precision(123456.0, 2), "1.2e+5");
        assert_eq!(precision(0.000123, 2), "0.00012");
        assert_eq!(precision(0.0, 4), "0.000");
        assert_eq!(precision(-0.0, 4), "0.000");
        assert_eq!(precision(2.0, 5), "2.0000");
        assert_eq!(precision(0.999999, 2), "1.0");
        assert_eq!(precision(0.1, 25), "0.1000000000000000055511151");
    }

    #[test]
    fn exponential_concrete() {
        assert_eq!(exponential(1234.5, Some(2)), "1.23e+3");
        assert_eq!(exponential(1234.5, None), "1.2345e+3");
        assert_eq!(exponential(1.0, None), "1e+0");
        assert_eq!(exponential(1.0, Some(2)), "1.00e+0");
        assert_eq!(exponential(-1.0, Some(0)), "-1e+0");
        assert_eq!(exponential(0.0, Some(2)), "0.00e+0");
        assert_eq!(exponential(123456.0, None), "1.23456e+5");
        assert_eq!(exponential(5e-324, None), "5e-324");
        assert_eq!(exponential(f64::MAX, None), "1.7976931348623157e+308");
    }

    #[test]
    fn negative_zero_sign_control() {
        let mut buffer = Buffer::new();
        assert_eq!(buffer.format_exponential(-0.0, None, true), "0e+0");
        assert_eq!(buffer.format_exponential(-0.0, None, false), "-0e+0");
        assert_eq!(buffer.format_exponential(-0.0, Some(1), false), "-0.0e+0");
    }

    /// Significant digits in ryu's (shortest) output, as a minimality
    /// oracle. Ryu prints "5.0" where this crate prints "5"; trailing and
    /// leading zeros around the point are presentation, not digits.
    fn ryu_digit_count(v: f64) -> usize {
        let mut ryu = ryu::Buffer::new();
        let s = ryu.format_finite(v);
        let mantissa = s.split('e').next().unwrap();
        let digits: Vec<u8> = mantissa.bytes().filter(u8::is_ascii_digit).collect();
        let first = digits.iter().position(|&d| d != b'0').unwrap_or(digits.len() - 1);
        let last = digits.iter().rposition(|&d| d != b'0').unwrap_or(first);
        last.max(first) - first + 1
    }

    proptest! {
        // Sign and non-finite assumes reject about half the random bit
        // patterns; the reject budget has to scale with the case count.
        #![proptest_config(ProptestConfig {
            cases: 200_000,
            max_global_rejects: 800_000,
            ..ProptestConfig::default()
        })]

        #[test]
        fn proptest_shortest_roundtrips(bits: u64) {
            let num = f64::from_bits(bits);
            prop_assume!(num.is_finite() && num != 0.0);
            let mut buffer = Buffer::new();
            let printed = buffer.format_shortest(num);
            prop_assert_eq!(printed.parse::<f64>().unwrap(), num);
        }

        #[test]
        fn proptest_shortest_is_minimal(bits: u64) {
            let num = f64::from_bits(bits);
            prop_assume!(num.is_finite() && num != 0.0);
            let digits = fpconv::generate(num.abs(), Mode::Shortest, Rounding::HalfEven);
            prop_assert_eq!(digits.len, ryu_digit_count(num.abs()));
        }

        #[test]
        fn proptest_fixed_digit_count(num in -1e20f64..1e20, n in 0usize..=20) {
            let mut buffer = Buffer::new();
            let printed = buffer.format_fixed(num, n);
            match printed.split_once('.') {
                Some((_, frac)) => prop_assert_eq!(frac.len(), n),
                None => prop_assert_eq!(n, 0),
            }
        }

        #[test]
        fn proptest_precision_digit_count(bits: u64, n in 1usize..=30) {
            let num = f64::from_bits(bits);
            prop_assume!(num.is_finite() && num != 0.0);
            let mut buffer = Buffer::new();
            let printed = buffer.format_precision(num, n).to_owned();
            let mantissa = printed.split('e').next().unwrap();
            let digits: Vec<u8> = mantissa.bytes().filter(u8::is_ascii_digit).collect();
            let leading_zeros = digits.iter().take_while(|&&d| d == b'0').count();
            prop_assert_eq!(digits.len() - leading_zeros, n, "{}", printed);
        }

        #[test]
        fn proptest_exponential_shape(bits: u64, n in 0usize..=17) {
            let num = f64::from_bits(bits);
            prop_assume!(num.is_finite());
            let mut buffer = Buffer::new();
            let printed = buffer.format_exponential(num, Some(n), true).to_owned();
            let (mantissa, exponent) = printed.split_once('e').unwrap();
            prop_assert!(exponent.starts_with('+') || exponent.starts_with('-'));
            prop_assert!(exponent[1..].parse::<u32>().is_ok());
            let mantissa = mantissa.strip_prefix('-').unwrap_or(mantissa);
            match mantissa.split_once('.') {
                Some((whole, frac)) => {
                    prop_assert_eq!(whole.len(), 1);
                    prop_assert_eq!(frac.len(), n);
                }
                None => prop_assert_eq!(n, 0),
            }
        }

        #[test]
        fn proptest_carry_consistent_across_counts(bits: u64, n in 1usize..=16) {
            // One more significant digit never moves the n-digit prefix by
            // more than one unit in the last place.
            let num = f64::from_bits(bits);
            prop_assume!(num.is_finite() && num != 0.0);
            let a = fpconv::generate(num.abs(), Mode::Precision(n), Rounding::HalfEven);
            let b = fpconv::generate(num.abs(), Mode::Precision(n + 1), Rounding::HalfEven);
            let prefix_value = |d: &fpconv::DigitBuffer| -> u64 {
                d.digits[..n].iter().fold(0u64, |x, &c| x * 10 + (c - b'0') as u64)
            };
            if a.decimal_point == b.decimal_point {
                prop_assert!(prefix_value(&a).abs_diff(prefix_value(&b)) <= 1);
            }
        }
    }
}
