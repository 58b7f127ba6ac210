//! Exact digit generation on bignum fractions.
//!
//! The value is represented as `numerator / denominator`, kept exact
//! throughout; digits fall out of a short division per step. Slower than the
//! fast path by a couple orders of magnitude, but never wrong and never
//! gives up.

use super::bignum::Bignum;
use super::digits::DigitBuffer;
use super::diyfp::{Double, HIDDEN_BIT, PHYSICAL_SIGNIFICAND_SIZE};
use super::{Mode, Rounding};

/// Generates digits and decimal point for a positive finite `v` in the given
/// mode. Infallible counterpart of the fast path, with the identical
/// digits/decimal-point contract.
pub fn generate(v: f64, mode: Mode, rounding: Rounding) -> DigitBuffer {
    let d = Double::new(v);
    let significand = d.significand();
    let exponent = d.exponent();
    debug_assert!(significand != 0);

    // An even significand widens the rounding interval to inclusive bounds:
    // values exactly on the boundary round to v, so v's digits may stop
    // there.
    let is_even = significand & 1 == 0;
    let estimated_power = estimate_power(normalized_exponent(significand, exponent));

    let mut digits = DigitBuffer::new();

    // Fixed mode with the first significant digit far below the requested
    // fraction window: skip the bignum machinery, everything renders as
    // zeros. (estimated_power may be off by one, hence the - 1 slack.)
    if let Mode::Fixed(requested_digits) = mode {
        if -estimated_power - 1 > requested_digits as i32 {
            digits.decimal_point = -(requested_digits as i32);
            return digits;
        }
    }

    let mut numerator = Bignum::new();
    let mut denominator = Bignum::new();
    let mut delta_minus = Bignum::new();
    let mut delta_plus = Bignum::new();
    let need_boundary_deltas = matches!(mode, Mode::Shortest);
    initial_scaled_start_values(
        significand,
        exponent,
        d.lower_boundary_is_closer(),
        estimated_power,
        need_boundary_deltas,
        &mut numerator,
        &mut denominator,
        &mut delta_minus,
        &mut delta_plus,
    );
    let mut decimal_point = fixup_multiply10(
        estimated_power,
        is_even,
        &mut numerator,
        &mut denominator,
        &mut delta_minus,
        &mut delta_plus,
    );

    match mode {
        Mode::Shortest => generate_shortest_digits(
            &mut numerator,
            &mut denominator,
            &mut delta_minus,
            &mut delta_plus,
            is_even,
            rounding,
            &mut digits,
        ),
        Mode::Fixed(requested_digits) => bignum_to_fixed(
            requested_digits,
            &mut decimal_point,
            &mut numerator,
            &mut denominator,
            &mut digits,
        ),
        Mode::Precision(count) => generate_counted_digits(
            count,
            &mut decimal_point,
            &mut numerator,
            &mut denominator,
            &mut digits,
        ),
    }
    digits.decimal_point = decimal_point;
    digits
}

/// Binary exponent of `v` as if the significand were shifted up to the
/// hidden bit (only denormals need shifting).
fn normalized_exponent(mut significand: u64, mut exponent: i32) -> i32 {
    debug_assert!(significand != 0);
    while significand & HIDDEN_BIT == 0 {
        significand <<= 1;
        exponent -= 1;
    }
    exponent
}

/// ⌈log10 v⌉ estimated from the normalized binary exponent, may be too low
/// by 1 (never too high): ⌈(e + 52) · log10 2⌉ as ⌊·⌋ + 1, exact because
/// the product is never an integer for a nonzero argument.
/// 1292913987 / 2^32 ≈ log10 2.
fn estimate_power(normalized_exponent: i32) -> i32 {
    let x = normalized_exponent + PHYSICAL_SIGNIFICAND_SIZE;
    if x == 0 { 0 } else { ((1292913987i64 * x as i64) >> 32) as i32 + 1 }
}

/// Builds `numerator / denominator = v · 10^-estimated_power` (so the
/// quotient starts within (0.1, 10)), plus the half-ULP deltas at the same
/// scale when shortest mode needs them. Everything stays integral: whichever
/// of 2^±exponent / 10^±estimated_power would be fractional multiplies the
/// other side instead. Three cases by the signs involved.
#[allow(clippy::too_many_arguments)]
fn initial_scaled_start_values(
    significand: u64,
    exponent: i32,
    lower_boundary_is_closer: bool,
    estimated_power: i32,
    need_boundary_deltas: bool,
    numerator: &mut Bignum,
    denominator: &mut Bignum,
    delta_minus: &mut Bignum,
    delta_plus: &mut Bignum,
) {
    if exponent >= 0 {
        // v = significand · 2^exponent, an integer.
        numerator.assign_u64(significand);
        numerator.shift_left(exponent as usize);
        denominator.assign_power_u16(10, estimated_power as usize);
        if need_boundary_deltas {
            // Scale everything by two so the half-ULP deltas stay integral.
            denominator.shift_left(1);
            numerator.shift_left(1);
            // delta = 1 ULP · scale / 2 = 2^exponent.
            delta_plus.assign_u16(1);
            delta_plus.shift_left(exponent as usize);
            delta_minus.assign_u16(1);
            delta_minus.shift_left(exponent as usize);
        }
    } else if estimated_power >= 0 {
        // v = significand / 2^-exponent; fold the power of two into the
        // denominator.
        numerator.assign_u64(significand);
        denominator.assign_power_u16(10, estimated_power as usize);
        denominator.shift_left(-exponent as usize);
        if need_boundary_deltas {
            denominator.shift_left(1);
            numerator.shift_left(1);
            delta_plus.assign_u16(1);
            delta_minus.assign_u16(1);
        }
    } else {
        // Negative estimated power: multiply the numerator (and the deltas)
        // by 10^-estimated_power instead of dividing the denominator.
        numerator.assign_power_u16(10, (-estimated_power) as usize);
        if need_boundary_deltas {
            *delta_plus = numerator.clone();
            *delta_minus = numerator.clone();
        }
        numerator.multiply_by_u64(significand);
        denominator.assign_u16(1);
        denominator.shift_left(-exponent as usize);
        if need_boundary_deltas {
            numerator.shift_left(1);
            denominator.shift_left(1);
        }
    }

    // At a binade boundary the interval above v is twice the one below;
    // halve the lower delta by doubling everything else.
    if need_boundary_deltas && lower_boundary_is_closer {
        denominator.shift_left(1);
        numerator.shift_left(1);
        delta_plus.shift_left(1);
    }
}

/// The power estimate may be one too low. Decide using the upper boundary
/// (numerator + delta_plus, inclusive iff the significand is even) and bring
/// the fraction into [1, 10); returns the definitive decimal point.
fn fixup_multiply10(
    estimated_power: i32,
    is_even: bool,
    numerator: &mut Bignum,
    denominator: &mut Bignum,
    delta_minus: &mut Bignum,
    delta_plus: &mut Bignum,
) -> i32 {
    let cmp = Bignum::plus_compare(numerator, delta_plus, denominator);
    let in_range = if is_even { cmp.is_ge() } else { cmp.is_gt() };
    if in_range {
        // The first digit is already in numerator/denominator.
        estimated_power + 1
    } else {
        numerator.times10();
        delta_minus.times10();
        delta_plus.times10();
        estimated_power
    }
}

/// Emits digits until the remainder proves every shorter prefix wrong and
/// the appended digit right: stop once the remainder is within delta_minus
/// of zero (rounding down reaches v) or within delta_plus of the denominator
/// (rounding up reaches v). Boundary inclusivity follows `is_even`; an exact
/// tie between the two final candidates follows `rounding`.
fn generate_shortest_digits(
    numerator: &mut Bignum,
    denominator: &mut Bignum,
    delta_minus: &mut Bignum,
    delta_plus: &mut Bignum,
    is_even: bool,
    rounding: Rounding,
    digits: &mut DigitBuffer,
) {
    loop {
        let digit = numerator.divide_modulo_int_bignum(denominator);
        debug_assert!(digit <= 9);
        digits.push(b'0' + digit as u8);

        let in_delta_room_minus = if is_even {
            *numerator <= *delta_minus
        } else {
            *numerator < *delta_minus
        };
        let plus_cmp = Bignum::plus_compare(numerator, delta_plus, denominator);
        let in_delta_room_plus = if is_even { plus_cmp.is_ge() } else { plus_cmp.is_gt() };

        if !in_delta_room_minus && !in_delta_room_plus {
            numerator.times10();
            delta_minus.times10();
            delta_plus.times10();
            continue;
        }
        if in_delta_room_minus && in_delta_room_plus {
            // Both rounding directions of the last digit land on v; pick by
            // comparing the remainder against half the denominator.
            match Bignum::plus_compare(numerator, numerator, denominator) {
                core::cmp::Ordering::Less => {}
                core::cmp::Ordering::Greater => round_up_last(digits),
                core::cmp::Ordering::Equal => {
                    let round_up = match rounding {
                        Rounding::HalfEven => (digits.digits[digits.len - 1] - b'0') % 2 != 0,
                        Rounding::HalfAwayFromZero => true,
                    };
                    if round_up {
                        round_up_last(digits);
                    }
                }
            }
        } else if in_delta_room_plus {
            // Rounding up is the only way back to v.
            round_up_last(digits);
        }
        return;
    }
}

fn round_up_last(digits: &mut DigitBuffer) {
    // The loop above never stops on a '9' that would need to carry: a carry
    // out of the last digit would mean the shorter prefix was already inside
    // a delta room.
    debug_assert!(digits.digits[digits.len - 1] != b'9');
    digits.digits[digits.len - 1] += 1;
}

/// Emits exactly `count` digits, rounding the last one half away from zero
/// on the remainder, with the carry running back through nines (bumping the
/// decimal point if it falls off the front).
fn generate_counted_digits(
    count: usize,
    decimal_point: &mut i32,
    numerator: &mut Bignum,
    denominator: &mut Bignum,
    digits: &mut DigitBuffer,
) {
    debug_assert!(count >= 1);
    for _ in 0..count - 1 {
        let digit = numerator.divide_modulo_int_bignum(denominator);
        debug_assert!(digit <= 9);
        digits.push(b'0' + digit as u8);
        numerator.times10();
    }
    // Round the last digit half away from zero on the remainder.
    let digit = numerator.divide_modulo_int_bignum(denominator);
    let round_up = Bignum::plus_compare(numerator, numerator, denominator).is_ge();
    debug_assert!(digit <= 9);
    if !round_up {
        digits.push(b'0' + digit as u8);
        return;
    }
    if digit < 9 {
        digits.push(b'0' + digit as u8 + 1);
        return;
    }
    // A nine rounded up: carry back through the trailing nines; if the
    // carry falls off the front, the digits are all zeros with a fresh
    // leading one and the decimal point moves.
    digits.push(b'0');
    let mut i = digits.len - 1;
    while i > 0 {
        i -= 1;
        if digits.digits[i] != b'9' {
            digits.digits[i] += 1;
            return;
        }
        digits.digits[i] = b'0';
    }
    digits.digits[0] = b'1';
    *decimal_point += 1;
}

/// Fixed mode on top of the counted generator: `decimal_point + requested`
/// digits, with the two all-zero edge cases (value far below the window, and
/// value that may round up into the window's last place) handled first.
fn bignum_to_fixed(
    requested_digits: usize,
    decimal_point: &mut i32,
    numerator: &mut Bignum,
    denominator: &mut Bignum,
    digits: &mut DigitBuffer,
) {
    if -*decimal_point > requested_digits as i32 {
        // Even rounded up, the value contributes nothing within the
        // requested fraction digits.
        *decimal_point = -(requested_digits as i32);
        return;
    }
    if -*decimal_point == requested_digits as i32 {
        // The first significant digit sits just past the window: the result
        // is either "1" in the last place or nothing. The fraction is in
        // [1, 10); compare against 10 · 1/2.
        denominator.times10();
        if Bignum::plus_compare(numerator, numerator, denominator).is_ge() {
            digits.push(b'1');
            *decimal_point += 1;
        }
        return;
    }
    let needed_digits = (*decimal_point + requested_digits as i32) as usize;
    generate_counted_digits(needed_digits, decimal_point, numerator, denominator, digits);
}
