//! Fast digit generation on 64-bit DiyFp arithmetic (Grisu-style).
//!
//! Both generators are allowed to give up: they track the accumulated
//! rounding error of the scaled value and return `None` whenever 64 bits of
//! precision cannot prove the produced digits correct. The caller falls back
//! to the exact path; failure here is an expected outcome, not an error.

use super::digits::DigitBuffer;
use super::diyfp::{DiyFp, Double};

/// Target window for the scaled value's binary exponent. The upper bound
/// keeps the integral part of the scaled value inside 32 bits; the lower
/// bound keeps a full power of ten of headroom below the 64th bit.
const MINIMAL_TARGET_EXPONENT: i32 = -60;
const MAXIMAL_TARGET_EXPONENT: i32 = -32;

struct CachedPower {
    significand: u64,
    binary_exponent: i16,
    decimal_exponent: i16,
}

const fn pow(significand: u64, binary_exponent: i16, decimal_exponent: i16) -> CachedPower {
    CachedPower { significand, binary_exponent, decimal_exponent }
}

/// Normalized significands of powers of ten, eight decimal exponents apart,
/// covering (with the window above) every finite binary64.
#[rustfmt::skip]
const CACHED_POWERS: [CachedPower; 81] = [
    pow(0xe61acf033d1a45df, -1087, -308),
    pow(0xab70fe17c79ac6ca, -1060, -300),
    pow(0xff77b1fcbebcdc4f, -1034, -292),
    pow(0xbe5691ef416bd60c, -1007, -284),
    pow(0x8dd01fad907ffc3c, -980, -276),
    pow(0xd3515c2831559a83, -954, -268),
    pow(0x9d71ac8fada6c9b5, -927, -260),
    pow(0xea9c227723ee8bcb, -901, -252),
    pow(0xaecc49914078536d, -874, -244),
    pow(0x823c12795db6ce57, -847, -236),
    pow(0xc21094364dfb5637, -821, -228),
    pow(0x9096ea6f3848984f, -794, -220),
    pow(0xd77485cb25823ac7, -768, -212),
    pow(0xa086cfcd97bf97f4, -741, -204),
    pow(0xef340a98172aace5, -715, -196),
    pow(0xb23867fb2a35b28e, -688, -188),
    pow(0x84c8d4dfd2c63f3b, -661, -180),
    pow(0xc5dd44271ad3cdba, -635, -172),
    pow(0x936b9fcebb25c996, -608, -164),
    pow(0xdbac6c247d62a584, -582, -156),
    pow(0xa3ab66580d5fdaf6, -555, -148),
    pow(0xf3e2f893dec3f126, -529, -140),
    pow(0xb5b5ada8aaff80b8, -502, -132),
    pow(0x87625f056c7c4a8b, -475, -124),
    pow(0xc9bcff6034c13053, -449, -116),
    pow(0x964e858c91ba2655, -422, -108),
    pow(0xdff9772470297ebd, -396, -100),
    pow(0xa6dfbd9fb8e5b88f, -369, -92),
    pow(0xf8a95fcf88747d94, -343, -84),
    pow(0xb94470938fa89bcf, -316, -76),
    pow(0x8a08f0f8bf0f156b, -289, -68),
    pow(0xcdb02555653131b6, -263, -60),
    pow(0x993fe2c6d07b7fac, -236, -52),
    pow(0xe45c10c42a2b3b06, -210, -44),
    pow(0xaa242499697392d3, -183, -36),
    pow(0xfd87b5f28300ca0e, -157, -28),
    pow(0xbce5086492111aeb, -130, -20),
    pow(0x8cbccc096f5088cc, -103, -12),
    pow(0xd1b71758e219652c, -77, -4),
    pow(0x9c40000000000000, -50, 4),
    pow(0xe8d4a51000000000, -24, 12),
    pow(0xad78ebc5ac620000, 3, 20),
    pow(0x813f3978f8940984, 30, 28),
    pow(0xc097ce7bc90715b3, 56, 36),
    pow(0x8f7e32ce7bea5c70, 83, 44),
    pow(0xd5d238a4abe98068, 109, 52),
    pow(0x9f4f2726179a2245, 136, 60),
    pow(0xed63a231d4c4fb27, 162, 68),
    pow(0xb0de65388cc8ada8, 189, 76),
    pow(0x83c7088e1aab65db, 216, 84),
    pow(0xc45d1df942711d9a, 242, 92),
    pow(0x924d692ca61be758, 269, 100),
    pow(0xda01ee641a708dea, 295, 108),
    pow(0xa26da3999aef774a, 322, 116),
    pow(0xf209787bb47d6b85, 348, 124),
    pow(0xb454e4a179dd1877, 375, 132),
    pow(0x865b86925b9bc5c2, 402, 140),
    pow(0xc83553c5c8965d3d, 428, 148),
    pow(0x952ab45cfa97a0b3, 455, 156),
    pow(0xde469fbd99a05fe3, 481, 164),
    pow(0xa59bc234db398c25, 508, 172),
    pow(0xf6c69a72a3989f5c, 534, 180),
    pow(0xb7dcbf5354e9bece, 561, 188),
    pow(0x88fcf317f22241e2, 588, 196),
    pow(0xcc20ce9bd35c78a5, 614, 204),
    pow(0x98165af37b2153df, 641, 212),
    pow(0xe2a0b5dc971f303a, 667, 220),
    pow(0xa8d9d1535ce3b396, 694, 228),
    pow(0xfb9b7cd9a4a7443c, 720, 236),
    pow(0xbb764c4ca7a44410, 747, 244),
    pow(0x8bab8eefb6409c1a, 774, 252),
    pow(0xd01fef10a657842c, 800, 260),
    pow(0x9b10a4e5e9913129, 827, 268),
    pow(0xe7109bfba19c0c9d, 853, 276),
    pow(0xac2820d9623bf429, 880, 284),
    pow(0x80444b5e7aa7cf85, 907, 292),
    pow(0xbf21e44003acdd2d, 933, 300),
    pow(0x8e679c2f5e44ff8f, 960, 308),
    pow(0xd433179d9c8cb841, 986, 316),
    pow(0x9e19db92b4e31ba9, 1013, 324),
    pow(0xeb96bf6ebadf77d9, 1039, 332),
];

const CACHED_POWERS_FIRST_E: i32 = -1087;
const CACHED_POWERS_LAST_E: i32 = 1039;

/// Picks the cached power of ten that brings a significand with binary
/// exponent `binary_exponent` into the target window. Selection is a linear
/// interpolation over the (evenly spaced) table; the assert double-checks
/// the window.
fn cached_power_for_binary_exponent(binary_exponent: i32) -> (DiyFp, i32) {
    let gamma_wanted = MAXIMAL_TARGET_EXPONENT - binary_exponent - DiyFp::SIGNIFICAND_SIZE;
    let range = CACHED_POWERS.len() as i32 - 1;
    let domain = CACHED_POWERS_LAST_E - CACHED_POWERS_FIRST_E;
    let index = (gamma_wanted - CACHED_POWERS_FIRST_E) * range / domain;
    let cached = &CACHED_POWERS[index as usize];
    debug_assert!(
        MINIMAL_TARGET_EXPONENT - binary_exponent - DiyFp::SIGNIFICAND_SIZE
            <= cached.binary_exponent as i32
            && cached.binary_exponent as i32 <= gamma_wanted
    );
    (
        DiyFp::new(cached.significand, cached.binary_exponent as i32),
        cached.decimal_exponent as i32,
    )
}

const SMALL_POWERS_OF_TEN: [u32; 11] =
    [0, 1, 10, 100, 1_000, 10_000, 100_000, 1_000_000, 10_000_000, 100_000_000, 1_000_000_000];

/// Largest power of ten not above `number`, as `(power, exponent + 1)`.
/// `number_bits` is an upper bound on the bit width; `number` must use at
/// least `number_bits - 2` bits for the one-step correction to suffice,
/// which holds for the integral parts the digit loops feed in.
fn biggest_power_ten(number: u32, number_bits: i32) -> (u32, i32) {
    // 1233/4096 ≈ log10(2).
    let mut guess = ((number_bits + 1) * 1233 >> 12) + 1;
    if number < SMALL_POWERS_OF_TEN[guess as usize] {
        guess -= 1;
    }
    (SMALL_POWERS_OF_TEN[guess as usize], guess)
}

/// Shortest digits for a positive finite `v`, or `None` when 64 bits of
/// precision cannot certify uniqueness. When this answers, the digits
/// round-trip and no shorter representation does.
pub fn shortest(v: f64) -> Option<DigitBuffer> {
    let d = Double::new(v);
    let w = d.as_normalized_diy_fp();

    // Scale w and its boundaries into the target window with one cached
    // power of ten. The multiplication is off by at most 1 ulp (in units of
    // the scaled significand); the boundaries are additionally off by the
    // half-up rounding, tracked as `unit` inside digit_gen.
    let (boundary_minus, boundary_plus) = d.normalized_boundaries();
    debug_assert!(boundary_plus.e == w.e);
    let (ten_mk, mk) = cached_power_for_binary_exponent(w.e);
    let scaled_w = w.times(ten_mk);
    debug_assert!(
        MINIMAL_TARGET_EXPONENT <= scaled_w.e && scaled_w.e <= MAXIMAL_TARGET_EXPONENT
    );
    let scaled_boundary_minus = boundary_minus.times(ten_mk);
    let scaled_boundary_plus = boundary_plus.times(ten_mk);

    let mut digits = DigitBuffer::new();
    let kappa = digit_gen(scaled_boundary_minus, scaled_w, scaled_boundary_plus, &mut digits)?;
    digits.decimal_point = digits.len as i32 + (kappa - mk);
    Some(digits)
}

/// Exactly `requested_digits` digits for a positive finite `v`, or `None`
/// when the trailing digit cannot be certified (including the common case of
/// a fraction running out of nonzero bits before the count is reached).
pub fn counted(v: f64, requested_digits: usize) -> Option<DigitBuffer> {
    let w = Double::new(v).as_normalized_diy_fp();
    let (ten_mk, mk) = cached_power_for_binary_exponent(w.e);
    let scaled_w = w.times(ten_mk);

    let mut digits = DigitBuffer::new();
    let kappa = digit_gen_counted(scaled_w, requested_digits, &mut digits)?;
    digits.decimal_point = digits.len as i32 + (kappa - mk);
    Some(digits)
}

/// Generates digits of `high` (the scaled upper boundary), stopping as soon
/// as the remainder falls inside the unsafe interval; round_weed then nudges
/// the last digit toward `w`. Returns the final kappa (position of the last
/// emitted digit relative to the scaled decimal point).
fn digit_gen(low: DiyFp, w: DiyFp, high: DiyFp, digits: &mut DigitBuffer) -> Option<i32> {
    debug_assert!(low.e == w.e && w.e == high.e);
    debug_assert!(low.f + 1 <= high.f - 1);
    debug_assert!(MINIMAL_TARGET_EXPONENT <= w.e && w.e <= MAXIMAL_TARGET_EXPONENT);

    // low and high are off by at most one unit (the scaling rounded them);
    // widen to the interval that certainly contains every value rounding to
    // v. Digits may be generated anywhere inside it, as long as round_weed
    // can later steer the result back into the safe interval.
    let unit: u64 = 1;
    let too_low = DiyFp::new(low.f - unit, low.e);
    let too_high = DiyFp::new(high.f + unit, high.e);
    let mut unsafe_interval = too_high.minus(too_low);

    // Split too_high at the decimal point: one == 1 at the scaled exponent.
    let one = DiyFp::new(1u64 << -w.e, w.e);
    let mut integrals = (too_high.f >> -one.e) as u32;
    let mut fractionals = too_high.f & (one.f - 1);

    let (mut divisor, divisor_exponent_plus_one) =
        biggest_power_ten(integrals, DiyFp::SIGNIFICAND_SIZE - (-one.e));
    let mut kappa = divisor_exponent_plus_one;

    // Integral digits.
    while kappa > 0 {
        let digit = integrals / divisor;
        debug_assert!(digit <= 9);
        digits.push(b'0' + digit as u8);
        integrals %= divisor;
        kappa -= 1;
        let rest = ((integrals as u64) << -one.e) + fractionals;
        if rest < unsafe_interval.f {
            return round_weed(
                digits,
                too_high.minus(w).f,
                unsafe_interval.f,
                rest,
                (divisor as u64) << -one.e,
                unit,
            )
            .then_some(kappa);
        }
        divisor /= 10;
    }

    // Fractional digits: shift everything (remainder, error unit, interval)
    // up by a factor of ten per digit instead of dividing the remainder.
    debug_assert!(one.e >= MINIMAL_TARGET_EXPONENT);
    debug_assert!(fractionals < one.f);
    debug_assert!(u64::MAX / 10 >= one.f);
    let mut unit = unit;
    loop {
        fractionals *= 10;
        unit *= 10;
        unsafe_interval = DiyFp::new(unsafe_interval.f * 10, unsafe_interval.e);
        let digit = (fractionals >> -one.e) as u32;
        debug_assert!(digit <= 9);
        digits.push(b'0' + digit as u8);
        fractionals &= one.f - 1;
        kappa -= 1;
        if fractionals < unsafe_interval.f {
            return round_weed(
                digits,
                too_high.minus(w).f * unit,
                unsafe_interval.f,
                fractionals,
                one.f,
                unit,
            )
            .then_some(kappa);
        }
    }
}

/// Adjusts the last digit of the generated (too_high-based) number towards
/// w, then verifies that the result is strictly inside the safe interval and
/// that no neighboring candidate is. All quantities are in units of the last
/// digit (ten_kappa) scaled by the error `unit`.
fn round_weed(
    digits: &mut DigitBuffer,
    distance_too_high_w: u64,
    unsafe_interval: u64,
    mut rest: u64,
    ten_kappa: u64,
    unit: u64,
) -> bool {
    let small_distance = distance_too_high_w - unit;
    let big_distance = distance_too_high_w + unit;
    debug_assert!(rest <= unsafe_interval);

    // Move towards w as long as the candidate one digit lower is certainly
    // closer to it (and still inside the unsafe interval).
    while rest < small_distance
        && unsafe_interval - rest >= ten_kappa
        && (rest + ten_kappa < small_distance
            || small_distance - rest >= rest + ten_kappa - small_distance)
    {
        digits.digits[digits.len - 1] -= 1;
        rest += ten_kappa;
    }

    // If the same step would also be justified under the other reading of
    // the imprecise w, the digit is ambiguous.
    if rest < big_distance
        && unsafe_interval - rest >= ten_kappa
        && (rest + ten_kappa < big_distance || big_distance - rest > rest + ten_kappa - big_distance)
    {
        return false;
    }

    // The result must sit 2 units clear of the unsafe interval's ends, so it
    // lies inside the safe interval under any resolution of the error.
    // unsafe_interval starts around 2^32 units and both grow by the same
    // factor, so the subtraction cannot underflow.
    2 * unit <= rest && rest <= unsafe_interval - 4 * unit
}

/// Generates exactly `requested_digits` digits of the scaled w, then asks
/// round_weed_counted to certify (and possibly round up) the last one.
fn digit_gen_counted(
    w: DiyFp,
    mut requested_digits: usize,
    digits: &mut DigitBuffer,
) -> Option<i32> {
    debug_assert!(MINIMAL_TARGET_EXPONENT <= w.e && w.e <= MAXIMAL_TARGET_EXPONENT);
    debug_assert!(requested_digits > 0);

    // w is off by at most one unit from the exact scaled value.
    let mut w_error: u64 = 1;

    let one = DiyFp::new(1u64 << -w.e, w.e);
    let mut integrals = (w.f >> -one.e) as u32;
    let mut fractionals = w.f & (one.f - 1);

    let (mut divisor, divisor_exponent_plus_one) =
        biggest_power_ten(integrals, DiyFp::SIGNIFICAND_SIZE - (-one.e));
    let mut kappa = divisor_exponent_plus_one;

    while kappa > 0 {
        let digit = integrals / divisor;
        debug_assert!(digit <= 9);
        digits.push(b'0' + digit as u8);
        requested_digits -= 1;
        integrals %= divisor;
        kappa -= 1;
        if requested_digits == 0 {
            let rest = ((integrals as u64) << -one.e) + fractionals;
            return round_weed_counted(
                digits,
                rest,
                (divisor as u64) << -one.e,
                w_error,
                &mut kappa,
            )
            .then_some(kappa);
        }
        divisor /= 10;
    }

    debug_assert!(one.e >= MINIMAL_TARGET_EXPONENT);
    debug_assert!(fractionals < one.f);
    debug_assert!(u64::MAX / 10 >= one.f);
    while requested_digits > 0 && fractionals > w_error {
        fractionals *= 10;
        w_error *= 10;
        let digit = (fractionals >> -one.e) as u32;
        debug_assert!(digit <= 9);
        digits.push(b'0' + digit as u8);
        requested_digits -= 1;
        fractionals &= one.f - 1;
        kappa -= 1;
    }
    if requested_digits != 0 {
        // Ran out of meaningful bits before the count was reached.
        return None;
    }
    round_weed_counted(digits, fractionals, one.f, w_error, &mut kappa).then_some(kappa)
}

/// Certifies the last counted digit given the remainder and the accumulated
/// error, rounding up (with carry, possibly lengthening the number into a
/// higher kappa) when the remainder provably sits in the upper half.
fn round_weed_counted(
    digits: &mut DigitBuffer,
    rest: u64,
    ten_kappa: u64,
    unit: u64,
    kappa: &mut i32,
) -> bool {
    debug_assert!(rest < ten_kappa);

    // The error spans more than a digit, or straddles the midpoint however
    // the remainder falls: nothing can be certified.
    if unit >= ten_kappa {
        return false;
    }
    if ten_kappa - unit <= unit {
        return false;
    }
    // Clearly in the lower half: digits stand as generated.
    if ten_kappa - rest > rest && ten_kappa - 2 * rest >= 2 * unit {
        return true;
    }
    // Clearly in the upper half: round up, carrying through nines.
    if rest > unit && ten_kappa - (rest - unit) <= rest - unit {
        digits.digits[digits.len - 1] += 1;
        for i in (1..digits.len).rev() {
            if digits.digits[i] != b'0' + 10 {
                break;
            }
            digits.digits[i] = b'0';
            digits.digits[i - 1] += 1;
        }
        if digits.digits[0] == b'0' + 10 {
            digits.digits[0] = b'1';
            *kappa += 1;
        }
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn digits_of(b: &DigitBuffer) -> String {
        String::from_utf8(b.digits[..b.len].to_vec()).unwrap()
    }

    #[test]
    fn cached_power_window_covers_all_doubles() {
        // Extreme binary exponents of normalized doubles.
        let min_e = Double::new(5e-324).as_normalized_diy_fp().e;
        let max_e = Double::new(f64::MAX).as_normalized_diy_fp().e;
        for e in min_e..=max_e {
            let (ten_mk, _) = cached_power_for_binary_exponent(e);
            let scaled_e = e + ten_mk.e + DiyFp::SIGNIFICAND_SIZE;
            assert!(
                (MINIMAL_TARGET_EXPONENT..=MAXIMAL_TARGET_EXPONENT).contains(&scaled_e),
                "e={e} scaled_e={scaled_e}"
            );
        }
    }

    #[test]
    fn biggest_power_ten_exact() {
        assert_eq!(biggest_power_ten(1, 1), (1, 1));
        assert_eq!(biggest_power_ten(9, 4), (1, 1));
        assert_eq!(biggest_power_ten(10, 4), (10, 2));
        assert_eq!(biggest_power_ten(3_000_000_000, 32), (1_000_000_000, 10));
    }

    #[test]
    fn shortest_samples() {
        let b = shortest(1.0).unwrap();
        assert_eq!(digits_of(&b), "1");
        assert_eq!(b.decimal_point, 1);

        let b = shortest(0.1).unwrap();
        assert_eq!(digits_of(&b), "1");
        assert_eq!(b.decimal_point, 0);

        let b = shortest(1.5).unwrap();
        assert_eq!(digits_of(&b), "15");
        assert_eq!(b.decimal_point, 1);

        let b = shortest(5e-324).unwrap();
        assert_eq!(digits_of(&b), "5");
        assert_eq!(b.decimal_point, -323);

        let b = shortest(f64::MAX).unwrap();
        assert_eq!(digits_of(&b), "17976931348623157");
        assert_eq!(b.decimal_point, 309);
    }

    #[test]
    fn counted_samples() {
        let b = counted(core::f64::consts::PI, 5).unwrap();
        assert_eq!(digits_of(&b), "31416");
        assert_eq!(b.decimal_point, 1);

        let b = counted(123.456, 6).unwrap();
        assert_eq!(digits_of(&b), "123456");
        assert_eq!(b.decimal_point, 3);

        // An exact value runs out of bits before 10 digits; the fast path
        // must refuse rather than invent zeros.
        assert!(counted(1.0, 10).is_none());
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
            let v = f64::from_bits(bits);
            prop_assume!(v.is_finite() && v > 0.0);
            if let Some(b) = shortest(v) {
                let mut s = String::from_utf8(b.digits[..b.len].to_vec()).unwrap();
                s.push_str(&format!("e{}", b.decimal_point - b.len as i32));
                prop_assert_eq!(s.parse::<f64>().unwrap(), v);
            }
        }

        #[test]
        fn proptest_counted_digit_count(bits: u64, n in 1usize..=17) {
            let v = f64::from_bits(bits);
            prop_assume!(v.is_finite() && v > 0.0);
            if let Some(b) = counted(v, n) {
                prop_assert_eq!(b.len, n);
                prop_assert!(b.digits[..b.len].iter().all(u8::is_ascii_digit));
            }
        }
    }
}
