//! Decimal digit accumulator and the notation renderers.
//!
//! The generators only produce a digit string and a decimal point position;
//! everything about notation (fixed vs exponential, zero padding, the sign)
//! lives here.

/// Room for the longest digit string any mode can request: 120 significant
/// digits for precision mode, or up to 21 integral plus 100 fraction digits
/// worth of significant digits for fixed mode, both under 128.
pub const DIGITS_CAPACITY: usize = 128;

/// Decimal notation switches to exponential below 10^-6 and at 10^21
/// (ECMAScript Number::toString thresholds).
const EXPONENTIAL_LOW: i32 = -5;
const EXPONENTIAL_HIGH: i32 = 21;

/// A generated digit string: ASCII digits with no leading zero (except the
/// single digit of the value zero), a decimal point position counted in
/// digits from the left (may be negative or beyond the end), and a sign.
#[derive(Clone, Copy)]
pub struct DigitBuffer {
    pub digits: [u8; DIGITS_CAPACITY],
    pub len: usize,
    pub decimal_point: i32,
    pub sign: bool,
}

impl DigitBuffer {
    pub fn new() -> Self {
        DigitBuffer { digits: [0; DIGITS_CAPACITY], len: 0, decimal_point: 0, sign: false }
    }

    pub fn push(&mut self, ascii: u8) {
        debug_assert!(ascii.is_ascii_digit());
        debug_assert!(self.len < DIGITS_CAPACITY);
        self.digits[self.len] = ascii;
        self.len += 1;
    }

    fn as_bytes(&self) -> &[u8] {
        &self.digits[..self.len]
    }

    /// Shortest form: plain decimal notation inside the ECMAScript window,
    /// exponential outside it.
    pub fn write_shortest(&self, out: &mut [u8]) -> usize {
        if self.decimal_point < EXPONENTIAL_LOW || self.decimal_point > EXPONENTIAL_HIGH {
            return self.write_exponential(None, out);
        }
        let fraction_digits = (self.len as i32 - self.decimal_point).max(0) as usize;
        self.write_decimal(fraction_digits, out)
    }

    /// Fixed notation with exactly `fraction_digits` digits after the point.
    pub fn write_fixed(&self, fraction_digits: usize, out: &mut [u8]) -> usize {
        self.write_decimal(fraction_digits, out)
    }

    /// Precision form: decimal notation padded to `significant_digits` when
    /// the point is inside (or just beyond) the digits, exponential when the
    /// value is tiny or the integral part would need filler zeros.
    pub fn write_precision(&self, significant_digits: usize, out: &mut [u8]) -> usize {
        debug_assert!(self.len <= significant_digits);
        if self.decimal_point < EXPONENTIAL_LOW || self.decimal_point > significant_digits as i32 {
            return self.write_exponential(Some(significant_digits), out);
        }
        let fraction_digits = (significant_digits as i32 - self.decimal_point).max(0) as usize;
        self.write_decimal(fraction_digits, out)
    }

    /// Exponential notation `d.dddde±X`. `significant_digits` pads the
    /// mantissa with zeros when given (counted modes); `None` prints exactly
    /// the digits present (shortest mode). The exponent sign is always
    /// explicit.
    pub fn write_exponential(&self, significant_digits: Option<usize>, out: &mut [u8]) -> usize {
        debug_assert!(self.len >= 1);
        let count = significant_digits.unwrap_or(self.len);
        debug_assert!(count >= self.len);

        let mut w = Writer::new(out);
        if self.sign {
            w.byte(b'-');
        }
        w.byte(self.digits[0]);
        if count > 1 {
            w.byte(b'.');
            w.bytes(&self.digits[1..self.len]);
            w.zeros(count - self.len);
        }
        w.byte(b'e');

        let exponent = self.decimal_point - 1;
        w.byte(if exponent < 0 { b'-' } else { b'+' });
        let e = exponent.unsigned_abs();
        // Binary64 exponents stay under 1000.
        debug_assert!(e < 1000);
        if e >= 100 {
            w.byte(b'0' + (e / 100) as u8);
            w.byte(b'0' + (e / 10 % 10) as u8);
            w.byte(b'0' + (e % 10) as u8);
        } else if e >= 10 {
            w.byte(b'0' + (e / 10) as u8);
            w.byte(b'0' + (e % 10) as u8);
        } else {
            w.byte(b'0' + e as u8);
        }
        w.pos
    }

    /// Plain decimal notation with `fraction_digits` digits after the point
    /// (no point at all when zero). An empty digit string is a zero rounded
    /// away by fixed mode and renders as plain zeros.
    fn write_decimal(&self, fraction_digits: usize, out: &mut [u8]) -> usize {
        let mut w = Writer::new(out);
        if self.sign {
            w.byte(b'-');
        }
        if self.decimal_point <= 0 {
            // Pure fraction: "0.00ddd0".
            w.byte(b'0');
            if fraction_digits > 0 {
                w.byte(b'.');
                let leading_zeros = ((-self.decimal_point) as usize).min(fraction_digits);
                w.zeros(leading_zeros);
                let digit_count = self.len.min(fraction_digits - leading_zeros);
                w.bytes(&self.digits[..digit_count]);
                w.zeros(fraction_digits - leading_zeros - digit_count);
            }
        } else if self.decimal_point as usize >= self.len {
            // Integral with trailing zeros: "dd00" or "dd00.000".
            w.bytes(self.as_bytes());
            w.zeros(self.decimal_point as usize - self.len);
            if fraction_digits > 0 {
                w.byte(b'.');
                w.zeros(fraction_digits);
            }
        } else {
            // The point splits the digit string.
            let point = self.decimal_point as usize;
            w.bytes(&self.digits[..point]);
            w.byte(b'.');
            w.bytes(&self.digits[point..self.len]);
            w.zeros(fraction_digits - (self.len - point));
        }
        w.pos
    }
}

/// Cursor over the output slice. The facade's buffer is sized for the worst
/// case of every mode, so the indexing below cannot go out of bounds for any
/// legal request.
struct Writer<'a> {
    out: &'a mut [u8],
    pos: usize,
}

impl<'a> Writer<'a> {
    fn new(out: &'a mut [u8]) -> Self {
        Writer { out, pos: 0 }
    }

    fn byte(&mut self, b: u8) {
        self.out[self.pos] = b;
        self.pos += 1;
    }

    fn bytes(&mut self, s: &[u8]) {
        self.out[self.pos..self.pos + s.len()].copy_from_slice(s);
        self.pos += s.len();
    }

    fn zeros(&mut self, n: usize) {
        for _ in 0..n {
            self.byte(b'0');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(digits: &str, decimal_point: i32, sign: bool) -> DigitBuffer {
        let mut b = DigitBuffer::new();
        for &d in digits.as_bytes() {
            b.push(d);
        }
        b.decimal_point = decimal_point;
        b.sign = sign;
        b
    }

    fn render(f: impl Fn(&mut [u8]) -> usize) -> String {
        let mut out = [0u8; 160];
        let len = f(&mut out);
        String::from_utf8(out[..len].to_vec()).unwrap()
    }

    #[test]
    fn shortest_notation_switch() {
        let cases: &[(&str, i32, &str)] = &[
            ("1", 1, "1"),
            ("1", 0, "0.1"),
            ("123", 3, "123"),
            ("123", 1, "1.23"),
            ("123", 5, "12300"),
            ("123", -4, "0.0000123"),
            // point == -5 is still decimal, -6 flips to exponential.
            ("1", -5, "0.000001"),
            ("1", -6, "1e-7"),
            ("1", 21, "100000000000000000000"),
            ("1", 22, "1e+21"),
            ("123", 22, "1.23e+21"),
        ];
        for &(digits, point, expected) in cases {
            let b = buffer(digits, point, false);
            assert_eq!(render(|out| b.write_shortest(out)), expected, "digits={digits} point={point}");
        }
        let b = buffer("15", 1, true);
        assert_eq!(render(|out| b.write_shortest(out)), "-1.5");
    }

    #[test]
    fn fixed_layouts() {
        let cases: &[(&str, i32, usize, &str)] = &[
            ("456", 1, 4, "4.5600"),
            ("456", 3, 0, "456"),
            ("456", 3, 2, "456.00"),
            ("456", 5, 2, "45600.00"),
            ("456", 0, 4, "0.4560"),
            ("456", -2, 6, "0.004560"),
            // Fraction window shorter than the digits' reach.
            ("456", -2, 3, "0.004"),
            // Empty digits: value rounded away entirely.
            ("", -2, 2, "0.00"),
            ("", 0, 0, "0"),
        ];
        for &(digits, point, frac, expected) in cases {
            let b = buffer(digits, point, false);
            assert_eq!(render(|out| b.write_fixed(frac, out)), expected, "digits={digits} point={point} frac={frac}");
        }
        // Sign applies even when every digit was rounded away.
        let b = buffer("", -2, true);
        assert_eq!(render(|out| b.write_fixed(2, out)), "-0.00");
    }

    #[test]
    fn precision_layouts() {
        let cases: &[(&str, i32, usize, &str)] = &[
            ("1235", 3, 4, "123.5"),
            ("1", 1, 4, "1.000"),
            ("123", -1, 5, "0.012300"),
            // Point beyond the significant count forces exponential.
            ("1", 6, 5, "1.0000e+5"),
            ("1", 5, 5, "10000"),
        ];
        for &(digits, point, p, expected) in cases {
            let b = buffer(digits, point, false);
            assert_eq!(render(|out| b.write_precision(p, out)), expected, "digits={digits} point={point} p={p}");
        }
    }

    #[test]
    fn exponential_layouts() {
        let cases: &[(&str, i32, Option<usize>, &str)] = &[
            ("123", 4, Some(3), "1.23e+3"),
            ("123", 4, None, "1.23e+3"),
            ("1", 1, None, "1e+0"),
            ("1", 1, Some(3), "1.00e+0"),
            ("5", -323, None, "5e-324"),
            ("17976931348623157", 309, None, "1.7976931348623157e+308"),
            ("0", 1, Some(3), "0.00e+0"),
        ];
        for &(digits, point, requested, expected) in cases {
            let b = buffer(digits, point, false);
            assert_eq!(
                render(|out| b.write_exponential(requested, out)),
                expected,
                "digits={digits} point={point} requested={requested:?}"
            );
        }
        let b = buffer("123", 4, true);
        assert_eq!(render(|out| b.write_exponential(None, out)), "-1.23e+3");
    }
}
