//! Fixed-capacity arbitrary-precision unsigned integer, sized for the exact
//! digit generator.
//!
//! Values are stored as base-2^28 "bigits" (least significant first) plus an
//! exponent counting implicit trailing zero bigits, i.e.
//! `value = bigits × 2^(exponent · 28)`. The capacity can represent any
//! number with up to [MAX_SIGNIFICANT_BITS] significant bits, which covers
//! every intermediate the digit generator produces for a finite `f64`;
//! exceeding it is a caller bug, not a runtime condition.

use core::cmp::Ordering;

/// 3584 = 128 · 28. Enough to represent 2^3584 > 10^1000 exactly.
pub const MAX_SIGNIFICANT_BITS: usize = 3584;

/// With 28-bit bigits a product of two bigits plus a carry fits comfortably
/// in a u64, and column-wise (Comba) squaring cannot overflow its
/// accumulator.
const BIGIT_SIZE: u32 = 28;
const BIGIT_MASK: u32 = (1 << BIGIT_SIZE) - 1;
const CAPACITY: usize = MAX_SIGNIFICANT_BITS / BIGIT_SIZE as usize;

#[derive(Clone, Debug)]
pub struct Bignum {
    used: usize,
    /// Number of implicit trailing zero bigits. Never negative.
    exponent: usize,
    bigits: [u32; CAPACITY],
}

impl Bignum {
    pub fn new() -> Self {
        Bignum { used: 0, exponent: 0, bigits: [0; CAPACITY] }
    }

    fn zero(&mut self) {
        self.used = 0;
        self.exponent = 0;
    }

    /// The capacity is part of the correctness argument: it guarantees no
    /// intermediate step can overflow for any legal input, so blowing it is
    /// fatal.
    fn ensure_capacity(size: usize) {
        assert!(size <= CAPACITY, "bignum capacity exceeded");
    }

    /// Length in bigits, including the "hidden" ones encoded in the exponent.
    fn bigit_length(&self) -> usize {
        self.used + self.exponent
    }

    fn bigit_or_zero(&self, index: usize) -> u32 {
        if index >= self.bigit_length() || index < self.exponent {
            0
        } else {
            self.bigits[index - self.exponent]
        }
    }

    /// Drops most-significant zero bigits; a zero value also resets the
    /// exponent.
    fn clamp(&mut self) {
        while self.used > 0 && self.bigits[self.used - 1] == 0 {
            self.used -= 1;
        }
        if self.used == 0 {
            self.exponent = 0;
        }
    }

    fn is_clamped(&self) -> bool {
        self.used == 0 || self.bigits[self.used - 1] != 0
    }

    /// Guaranteed to lie in one bigit.
    pub fn assign_u16(&mut self, value: u16) {
        const { assert!(BIGIT_SIZE >= 16) };
        self.zero();
        if value > 0 {
            self.bigits[0] = value as u32;
            self.used = 1;
        }
    }

    pub fn assign_u64(&mut self, mut value: u64) {
        self.zero();
        while value > 0 {
            self.bigits[self.used] = (value as u32) & BIGIT_MASK;
            value >>= BIGIT_SIZE;
            self.used += 1;
        }
    }

    #[allow(dead_code)]
    pub fn assign_decimal_string(&mut self, s: &str) {
        // 2^64 = 18446744073709551616 > 10^19
        const MAX_U64_DECIMAL_DIGITS: usize = 19;
        self.zero();
        let mut rest = s.as_bytes();
        while rest.len() >= MAX_U64_DECIMAL_DIGITS {
            let (chunk, tail) = rest.split_at(MAX_U64_DECIMAL_DIGITS);
            self.multiply_by_power_of_ten(MAX_U64_DECIMAL_DIGITS);
            self.add_u64(read_u64(chunk));
            rest = tail;
        }
        self.multiply_by_power_of_ten(rest.len());
        self.add_u64(read_u64(rest));
        self.clamp();
    }

    /// Not performance critical; exists for tests and debugging.
    #[allow(dead_code)]
    pub fn assign_hex_string(&mut self, s: &str) {
        self.zero();
        Self::ensure_capacity((s.len() * 4).div_ceil(BIGIT_SIZE as usize));
        // Accumulates hex digits until at least one full bigit is ready;
        // works for bigit sizes that are not a multiple of four.
        let mut tmp: u64 = 0;
        let mut cnt: u32 = 0;
        for &c in s.as_bytes().iter().rev() {
            tmp |= (hex_char_value(c) as u64) << cnt;
            cnt += 4;
            if cnt >= BIGIT_SIZE {
                self.bigits[self.used] = (tmp as u32) & BIGIT_MASK;
                self.used += 1;
                cnt -= BIGIT_SIZE;
                tmp >>= BIGIT_SIZE;
            }
        }
        if tmp != 0 {
            self.bigits[self.used] = (tmp as u32) & BIGIT_MASK;
            self.used += 1;
        }
        self.clamp();
    }

    #[allow(dead_code)]
    pub fn add_u64(&mut self, operand: u64) {
        if operand == 0 {
            return;
        }
        let mut other = Bignum::new();
        other.assign_u64(operand);
        self.add_bignum(&other);
    }

    #[allow(dead_code)]
    pub fn add_bignum(&mut self, other: &Bignum) {
        debug_assert!(self.is_clamped());
        debug_assert!(other.is_clamped());

        // After this call self.exponent <= other.exponent.
        self.align(other);

        Self::ensure_capacity(
            1 + self.bigit_length().max(other.bigit_length()) - self.exponent,
        );
        let mut carry: u32 = 0;
        let mut pos = other.exponent - self.exponent;
        for i in self.used..pos {
            self.bigits[i] = 0;
        }
        for i in 0..other.used {
            let my = if pos < self.used { self.bigits[pos] } else { 0 };
            let sum = my + other.bigits[i] + carry;
            self.bigits[pos] = sum & BIGIT_MASK;
            carry = sum >> BIGIT_SIZE;
            pos += 1;
        }
        while carry != 0 {
            let my = if pos < self.used { self.bigits[pos] } else { 0 };
            let sum = my + carry;
            self.bigits[pos] = sum & BIGIT_MASK;
            carry = sum >> BIGIT_SIZE;
            pos += 1;
        }
        self.used = self.used.max(pos);
        debug_assert!(self.is_clamped());
    }

    /// Precondition: `self >= other`.
    pub fn subtract_bignum(&mut self, other: &Bignum) {
        debug_assert!(self.is_clamped());
        debug_assert!(other.is_clamped());
        debug_assert!(*other <= *self);

        self.align(other);

        let offset = other.exponent - self.exponent;
        let mut borrow: i64 = 0;
        for i in 0..other.used {
            let difference =
                self.bigits[i + offset] as i64 - other.bigits[i] as i64 - borrow;
            if difference < 0 {
                self.bigits[i + offset] = (difference + (1 << BIGIT_SIZE)) as u32;
                borrow = 1;
            } else {
                self.bigits[i + offset] = difference as u32;
                borrow = 0;
            }
        }
        let mut i = other.used;
        while borrow != 0 {
            let difference = self.bigits[i + offset] as i64 - borrow;
            if difference < 0 {
                self.bigits[i + offset] = (difference + (1 << BIGIT_SIZE)) as u32;
                borrow = 1;
            } else {
                self.bigits[i + offset] = difference as u32;
                borrow = 0;
            }
            i += 1;
        }
        self.clamp();
    }

    pub fn shift_left(&mut self, shift_amount: usize) {
        if self.used == 0 {
            return;
        }
        self.exponent += shift_amount / BIGIT_SIZE as usize;
        let local_shift = (shift_amount % BIGIT_SIZE as usize) as u32;
        Self::ensure_capacity(self.used + 1);
        self.bigits_shift_left(local_shift);
    }

    pub fn times10(&mut self) {
        self.multiply_by_u32(10);
    }

    pub fn multiply_by_u32(&mut self, factor: u32) {
        if factor == 1 {
            return;
        }
        if factor == 0 {
            self.zero();
            return;
        }
        if self.used == 0 {
            return;
        }
        // A bigit times the factor is at most BIGIT_SIZE + 32 bits; the
        // carry adds one more, which still fits a u64.
        let mut carry: u64 = 0;
        for i in 0..self.used {
            let product = factor as u64 * self.bigits[i] as u64 + carry;
            self.bigits[i] = (product as u32) & BIGIT_MASK;
            carry = product >> BIGIT_SIZE;
        }
        while carry != 0 {
            Self::ensure_capacity(self.used + 1);
            self.bigits[self.used] = (carry as u32) & BIGIT_MASK;
            self.used += 1;
            carry >>= BIGIT_SIZE;
        }
    }

    pub fn multiply_by_u64(&mut self, factor: u64) {
        if factor == 1 {
            return;
        }
        if factor == 0 {
            self.zero();
            return;
        }
        if self.used == 0 {
            return;
        }
        const { assert!(BIGIT_SIZE < 32) };
        let low = factor & 0xFFFF_FFFF;
        let high = factor >> 32;
        let mut carry: u64 = 0;
        for i in 0..self.used {
            let product_low = low * self.bigits[i] as u64;
            let product_high = high * self.bigits[i] as u64;
            let tmp = (carry & BIGIT_MASK as u64) + product_low;
            self.bigits[i] = (tmp as u32) & BIGIT_MASK;
            carry = (carry >> BIGIT_SIZE)
                + (tmp >> BIGIT_SIZE)
                + (product_high << (32 - BIGIT_SIZE));
        }
        while carry != 0 {
            Self::ensure_capacity(self.used + 1);
            self.bigits[self.used] = (carry as u32) & BIGIT_MASK;
            self.used += 1;
            carry >>= BIGIT_SIZE;
        }
    }

    /// Multiplies by 10^exponent, decomposed into powers of five chained
    /// through machine words (5^27 is the largest power of five fitting a
    /// u64) followed by one left shift for the powers of two.
    #[allow(dead_code)]
    pub fn multiply_by_power_of_ten(&mut self, exponent: usize) {
        const FIVE_27: u64 = 0x6765_C793_FA10_079D;
        const FIVE_1: u32 = 5;
        const FIVE_2: u32 = FIVE_1 * 5;
        const FIVE_3: u32 = FIVE_2 * 5;
        const FIVE_4: u32 = FIVE_3 * 5;
        const FIVE_5: u32 = FIVE_4 * 5;
        const FIVE_6: u32 = FIVE_5 * 5;
        const FIVE_7: u32 = FIVE_6 * 5;
        const FIVE_8: u32 = FIVE_7 * 5;
        const FIVE_9: u32 = FIVE_8 * 5;
        const FIVE_10: u32 = FIVE_9 * 5;
        const FIVE_11: u32 = FIVE_10 * 5;
        const FIVE_12: u32 = FIVE_11 * 5;
        const FIVE_13: u32 = FIVE_12 * 5;
        const FIVE_1_TO_12: [u32; 12] = [
            FIVE_1, FIVE_2, FIVE_3, FIVE_4, FIVE_5, FIVE_6, FIVE_7, FIVE_8,
            FIVE_9, FIVE_10, FIVE_11, FIVE_12,
        ];

        if exponent == 0 {
            return;
        }
        if self.used == 0 {
            return;
        }

        // The shift by `exponent` happens at the end, just before returning.
        let mut remaining = exponent;
        while remaining >= 27 {
            self.multiply_by_u64(FIVE_27);
            remaining -= 27;
        }
        while remaining >= 13 {
            self.multiply_by_u32(FIVE_13);
            remaining -= 13;
        }
        if remaining > 0 {
            self.multiply_by_u32(FIVE_1_TO_12[remaining - 1]);
        }
        self.shift_left(exponent);
    }

    /// Squares in place, computing each result column separately
    /// (Comba multiplication).
    pub fn square(&mut self) {
        debug_assert!(self.is_clamped());
        let product_length = 2 * self.used;
        Self::ensure_capacity(product_length);

        // The accumulator sums up to `used` products of two 28-bit bigits,
        // i.e. at most CAPACITY · 2^56 < 2^64.
        const { assert!((CAPACITY as u64) < 1 << (2 * (32 - BIGIT_SIZE))) };

        let mut accumulator: u64 = 0;
        // Shift the digits up first so the columns below don't overwrite
        // their own inputs.
        let copy_offset = self.used;
        for i in 0..self.used {
            self.bigits[copy_offset + i] = self.bigits[i];
        }
        // Two loops to avoid bounds branches inside the column sums. The sum
        // of both indices equals the column index throughout.
        for i in 0..self.used {
            let mut index1 = i as isize;
            let mut index2 = 0usize;
            while index1 >= 0 {
                let int1 = self.bigits[copy_offset + index1 as usize] as u64;
                let int2 = self.bigits[copy_offset + index2] as u64;
                accumulator += int1 * int2;
                index1 -= 1;
                index2 += 1;
            }
            self.bigits[i] = (accumulator as u32) & BIGIT_MASK;
            accumulator >>= BIGIT_SIZE;
        }
        for i in self.used..product_length {
            let mut index1 = self.used - 1;
            let mut index2 = i - index1;
            // The inner loop runs zero times on the last iteration, draining
            // the accumulator. The overwritten bigits[i] is never read again
            // because both indices stay above i - used.
            while index2 < self.used {
                let int1 = self.bigits[copy_offset + index1] as u64;
                let int2 = self.bigits[copy_offset + index2] as u64;
                accumulator += int1 * int2;
                index1 = index1.wrapping_sub(1);
                index2 += 1;
            }
            self.bigits[i] = (accumulator as u32) & BIGIT_MASK;
            accumulator >>= BIGIT_SIZE;
        }
        debug_assert_eq!(accumulator, 0);

        self.used = product_length;
        self.exponent *= 2;
        self.clamp();
    }

    /// Assigns `base^power` via left-to-right binary exponentiation,
    /// staying in machine words until the running value would overflow
    /// 32 bits.
    pub fn assign_power_u16(&mut self, base: u16, power_exponent: usize) {
        debug_assert!(base != 0);
        if power_exponent == 0 {
            self.assign_u16(1);
            return;
        }
        self.zero();

        // Factor out powers of two; they are reapplied as one shift at the
        // end. Base is expected to be in range 2-32, most often 10.
        let mut base = base as u32;
        let mut shifts = 0usize;
        while base & 1 == 0 {
            base >>= 1;
            shifts += 1;
        }
        let bit_size = 32 - base.leading_zeros();
        let final_size = bit_size as usize * power_exponent;
        // 1 extra bigit for the shifting, and one for the rounded size.
        Self::ensure_capacity(final_size / BIGIT_SIZE as usize + 2);

        // Find the bit above the most significant 1-bit of the exponent,
        // then discard the first 1-bit.
        let mut mask: usize = 1;
        while power_exponent >= mask {
            mask <<= 1;
        }
        mask >>= 2;

        let mut this_value = base as u64;
        let mut delayed_multiplication = false;
        while mask != 0 && this_value <= u32::MAX as u64 {
            this_value *= this_value;
            if power_exponent & mask != 0 {
                // Only multiply if the top bit_size bits are free, otherwise
                // remember the multiplication for the bignum phase.
                let base_bits_mask = !((1u64 << (64 - bit_size)) - 1);
                if this_value & base_bits_mask == 0 {
                    this_value *= base as u64;
                } else {
                    delayed_multiplication = true;
                }
            }
            mask >>= 1;
        }
        self.assign_u64(this_value);
        if delayed_multiplication {
            self.multiply_by_u32(base);
        }

        // Continue the exponentiation as a bignum.
        while mask != 0 {
            self.square();
            if power_exponent & mask != 0 {
                self.multiply_by_u32(base);
            }
            mask >>= 1;
        }

        self.shift_left(shifts * power_exponent);
    }

    /// Divides self by other, returning the quotient and leaving the
    /// remainder in self. Precondition: `self / other` fits in 16 bits.
    ///
    /// The subtraction-based approach would be hopeless for big quotients;
    /// this is only ever used for digit extraction where the quotient is
    /// below 10.
    pub fn divide_modulo_int_bignum(&mut self, other: &Bignum) -> u16 {
        debug_assert!(self.is_clamped());
        debug_assert!(other.is_clamped());
        debug_assert!(other.used > 0);

        // Fewer digits than the divisor means the quotient is 0. This also
        // handles self == 0.
        if self.bigit_length() < other.bigit_length() {
            return 0;
        }

        self.align(other);

        let mut result: u16 = 0;

        // Remove multiples of other until both numbers have the same number
        // of digits.
        while self.bigit_length() > other.bigit_length() {
            debug_assert!(other.bigits[other.used - 1] >= (1 << BIGIT_SIZE) / 16);
            debug_assert!(self.bigits[self.used - 1] < 0x10000);
            // The top bigit of self is a lower bound for how many times
            // other fits; remove that many multiples at once.
            let top = self.bigits[self.used - 1];
            result += top as u16;
            self.subtract_times(other, top);
        }

        debug_assert_eq!(self.bigit_length(), other.bigit_length());

        // Both operands have the same length now; other.used > 0, so the
        // top-bigit accesses are in bounds.
        let this_bigit = self.bigits[self.used - 1];
        let other_bigit = other.bigits[other.used - 1];

        if other.used == 1 {
            // Shortcut for the easy (and common) case.
            let quotient = this_bigit / other_bigit;
            self.bigits[self.used - 1] = this_bigit - other_bigit * quotient;
            debug_assert!(quotient < 0x10000);
            result += quotient as u16;
            self.clamp();
            return result;
        }

        let division_estimate = this_bigit / (other_bigit + 1);
        debug_assert!(division_estimate < 0x10000);
        result += division_estimate as u16;
        self.subtract_times(other, division_estimate);

        if other_bigit as u64 * (division_estimate as u64 + 1) > this_bigit as u64 {
            // Even if other's remaining digits were all zero, another
            // subtraction would be too much.
            return result;
        }

        while *other <= *self {
            self.subtract_bignum(other);
            result += 1;
        }
        result
    }

    /// Compares `a + b` against `c` without materializing the sum.
    pub fn plus_compare(a: &Bignum, b: &Bignum, c: &Bignum) -> Ordering {
        debug_assert!(a.is_clamped());
        debug_assert!(b.is_clamped());
        debug_assert!(c.is_clamped());
        if a.bigit_length() < b.bigit_length() {
            return Self::plus_compare(b, a, c);
        }
        if a.bigit_length() + 1 < c.bigit_length() {
            return Ordering::Less;
        }
        if a.bigit_length() > c.bigit_length() {
            return Ordering::Greater;
        }
        // The exponent encodes zero bigits, so if a has more hidden zeros
        // than b has digits then a + b has the same bigit length as a.
        if a.exponent >= b.bigit_length() && a.bigit_length() < c.bigit_length() {
            return Ordering::Less;
        }

        let mut borrow: u64 = 0;
        // Below min_exponent all digits are zero; no need to compare them.
        let min_exponent = a.exponent.min(b.exponent).min(c.exponent);
        for i in (min_exponent..c.bigit_length()).rev() {
            let chunk_a = a.bigit_or_zero(i) as u64;
            let chunk_b = b.bigit_or_zero(i) as u64;
            let chunk_c = c.bigit_or_zero(i) as u64;
            let sum = chunk_a + chunk_b;
            if sum > chunk_c + borrow {
                return Ordering::Greater;
            }
            borrow = chunk_c + borrow - sum;
            if borrow > 1 {
                return Ordering::Less;
            }
            borrow <<= BIGIT_SIZE;
        }
        if borrow == 0 { Ordering::Equal } else { Ordering::Less }
    }

    /// Appends zero bigits so that `self.exponent <= other.exponent`,
    /// keeping the value unchanged.
    fn align(&mut self, other: &Bignum) {
        if self.exponent > other.exponent {
            let zero_bigits = self.exponent - other.exponent;
            Self::ensure_capacity(self.used + zero_bigits);
            for i in (0..self.used).rev() {
                self.bigits[i + zero_bigits] = self.bigits[i];
            }
            for i in 0..zero_bigits {
                self.bigits[i] = 0;
            }
            self.used += zero_bigits;
            self.exponent -= zero_bigits;
        }
    }

    fn bigits_shift_left(&mut self, shift_amount: u32) {
        debug_assert!(shift_amount < BIGIT_SIZE);
        let mut carry: u32 = 0;
        for i in 0..self.used {
            let new_carry = self.bigits[i] >> (BIGIT_SIZE - shift_amount);
            self.bigits[i] = ((self.bigits[i] << shift_amount) + carry) & BIGIT_MASK;
            carry = new_carry;
        }
        if carry != 0 {
            self.bigits[self.used] = carry;
            self.used += 1;
        }
    }

    /// Subtracts `other * factor` from self. Precondition: the result is
    /// non-negative.
    fn subtract_times(&mut self, other: &Bignum, factor: u32) {
        debug_assert!(self.exponent <= other.exponent);
        if factor < 3 {
            for _ in 0..factor {
                self.subtract_bignum(other);
            }
            return;
        }
        let mut borrow: u64 = 0;
        let exponent_diff = other.exponent - self.exponent;
        for i in 0..other.used {
            let product = factor as u64 * other.bigits[i] as u64;
            let remove = borrow + product;
            let difference =
                self.bigits[i + exponent_diff] as i64 - (remove & BIGIT_MASK as u64) as i64;
            if difference < 0 {
                self.bigits[i + exponent_diff] = (difference + (1 << BIGIT_SIZE)) as u32;
                borrow = (remove >> BIGIT_SIZE) + 1;
            } else {
                self.bigits[i + exponent_diff] = difference as u32;
                borrow = remove >> BIGIT_SIZE;
            }
        }
        for i in other.used + exponent_diff..self.used {
            if borrow == 0 {
                return;
            }
            let difference = self.bigits[i] as i64 - borrow as i64;
            if difference < 0 {
                self.bigits[i] = (difference + (1 << BIGIT_SIZE)) as u32;
                borrow = 1;
            } else {
                self.bigits[i] = difference as u32;
                borrow = 0;
            }
        }
        self.clamp();
    }

    #[cfg(test)]
    pub fn to_hex_string(&self) -> std::string::String {
        debug_assert!(self.is_clamped());
        const { assert!(BIGIT_SIZE % 4 == 0) };
        const HEX_CHARS_PER_BIGIT: usize = BIGIT_SIZE as usize / 4;

        if self.used == 0 {
            return "0".into();
        }

        let mut out = std::string::String::new();
        out.extend(
            core::iter::successors(Some(self.bigits[self.used - 1]), |b| {
                (b >> 4 != 0).then_some(b >> 4)
            })
            .collect::<std::vec::Vec<_>>()
            .iter()
            .rev()
            .map(|b| char::from_digit(b & 0xF, 16).unwrap().to_ascii_uppercase()),
        );
        for i in (0..self.used - 1).rev() {
            for j in (0..HEX_CHARS_PER_BIGIT).rev() {
                let nibble = (self.bigits[i] >> (4 * j)) & 0xF;
                out.push(char::from_digit(nibble, 16).unwrap().to_ascii_uppercase());
            }
        }
        for _ in 0..self.exponent {
            for _ in 0..HEX_CHARS_PER_BIGIT {
                out.push('0');
            }
        }
        out
    }
}

impl PartialEq for Bignum {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Bignum {}

impl PartialOrd for Bignum {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Bignum {
    fn cmp(&self, other: &Self) -> Ordering {
        debug_assert!(self.is_clamped());
        debug_assert!(other.is_clamped());
        let length_a = self.bigit_length();
        let length_b = other.bigit_length();
        if length_a != length_b {
            return length_a.cmp(&length_b);
        }
        let min_exponent = self.exponent.min(other.exponent);
        for i in (min_exponent..length_a).rev() {
            let bigit_a = self.bigit_or_zero(i);
            let bigit_b = other.bigit_or_zero(i);
            if bigit_a != bigit_b {
                return bigit_a.cmp(&bigit_b);
            }
        }
        Ordering::Equal
    }
}

fn read_u64(digits: &[u8]) -> u64 {
    let mut result = 0u64;
    for &c in digits {
        debug_assert!(c.is_ascii_digit());
        result = result * 10 + (c - b'0') as u64;
    }
    result
}

fn hex_char_value(c: u8) -> u32 {
    match c {
        b'0'..=b'9' => (c - b'0') as u32,
        b'a'..=b'f' => (c - b'a') as u32 + 10,
        b'A'..=b'F' => (c - b'A') as u32 + 10,
        _ => unreachable!(),
    }
}
