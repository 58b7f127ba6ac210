//! "Do-it-yourself" floating point: a u64 significand times a power of two,
//! with the invariants tracked by the caller instead of the type. The fast
//! path runs entirely on these.

/// Binary64 exponent bias, adjusted so that `significand · 2^exponent`
/// reproduces the value with the significand read as an integer.
const EXPONENT_BIAS: i32 = 0x3FF + PHYSICAL_SIGNIFICAND_SIZE;
const DENORMAL_EXPONENT: i32 = -EXPONENT_BIAS + 1;
const EXPONENT_MASK: u64 = 0x7FF0_0000_0000_0000;
const SIGNIFICAND_MASK: u64 = 0x000F_FFFF_FFFF_FFFF;
pub const HIDDEN_BIT: u64 = 0x0010_0000_0000_0000;

pub const PHYSICAL_SIGNIFICAND_SIZE: i32 = 52;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DiyFp {
    pub f: u64,
    pub e: i32,
}

impl DiyFp {
    pub const SIGNIFICAND_SIZE: i32 = 64;

    pub const fn new(f: u64, e: i32) -> Self {
        DiyFp { f, e }
    }

    /// Exact subtraction. The operands must share an exponent and the result
    /// must not be negative; both hold wherever this is used and are not
    /// re-checked in release builds.
    pub fn minus(self, other: DiyFp) -> DiyFp {
        debug_assert!(self.e == other.e);
        debug_assert!(self.f >= other.f);
        DiyFp::new(self.f - other.f, self.e)
    }

    /// Rounding multiplication: the exact 128-bit product, rounded half-up
    /// at the dropped bit. Loses the bottom 64 bits of precision, which is
    /// what the error bookkeeping in the fast path accounts for.
    pub fn times(self, other: DiyFp) -> DiyFp {
        let product = self.f as u128 * other.f as u128;
        let rounded = ((product + (1u128 << 63)) >> 64) as u64;
        DiyFp::new(rounded, self.e + other.e + Self::SIGNIFICAND_SIZE)
    }

    pub fn normalize(self) -> DiyFp {
        debug_assert!(self.f != 0);
        let mut f = self.f;
        let mut e = self.e;

        // Most significands already carry the hidden bit plus some, so move
        // in 10-bit strides before single bits.
        const TEN_MS_BITS: u64 = 0xFFC0_0000_0000_0000;
        while f & TEN_MS_BITS == 0 {
            f <<= 10;
            e -= 10;
        }
        while f & (1 << 63) == 0 {
            f <<= 1;
            e -= 1;
        }
        DiyFp::new(f, e)
    }
}

/// Bit-level view over a finite `f64`.
#[derive(Clone, Copy)]
pub struct Double(u64);

impl Double {
    pub fn new(value: f64) -> Self {
        Double(value.to_bits())
    }

    /// Integer significand, hidden bit included for normal numbers.
    pub fn significand(self) -> u64 {
        let significand = self.0 & SIGNIFICAND_MASK;
        if self.is_denormal() { significand } else { significand + HIDDEN_BIT }
    }

    /// Unbiased exponent such that `value = significand() · 2^exponent()`.
    pub fn exponent(self) -> i32 {
        if self.is_denormal() {
            return DENORMAL_EXPONENT;
        }
        let biased = ((self.0 & EXPONENT_MASK) >> PHYSICAL_SIGNIFICAND_SIZE) as i32;
        biased - EXPONENT_BIAS
    }

    fn is_denormal(self) -> bool {
        self.0 & EXPONENT_MASK == 0
    }

    /// The value as an unnormalized DiyFp. Requires a value greater than
    /// zero (the DiyFp carries no sign and normalize rejects zero).
    pub fn as_diy_fp(self) -> DiyFp {
        debug_assert!(f64::from_bits(self.0) > 0.0);
        DiyFp::new(self.significand(), self.exponent())
    }

    pub fn as_normalized_diy_fp(self) -> DiyFp {
        self.as_diy_fp().normalize()
    }

    /// The distance to the next-lower representable value is halved when the
    /// significand field is all zeros, since the predecessor sits in the
    /// binade below. The smallest normal still has a regular lower boundary
    /// because its predecessor is the largest denormal, at the same scale.
    pub fn lower_boundary_is_closer(self) -> bool {
        let significand_is_zero = self.0 & SIGNIFICAND_MASK == 0;
        significand_is_zero && self.exponent() != DENORMAL_EXPONENT
    }

    /// The two boundaries of the value's rounding interval (half-ULP below,
    /// half-ULP above), normalized and brought to a common exponent:
    /// `plus` is normalized and `minus.e == plus.e`.
    pub fn normalized_boundaries(self) -> (DiyFp, DiyFp) {
        let v = self.as_diy_fp();
        let plus = DiyFp::new((v.f << 1) + 1, v.e - 1).normalize();
        let minus = if self.lower_boundary_is_closer() {
            DiyFp::new((v.f << 2) - 1, v.e - 2)
        } else {
            DiyFp::new((v.f << 1) - 1, v.e - 1)
        };
        let minus = DiyFp::new(minus.f << (minus.e - plus.e), plus.e);
        (minus, plus)
    }
}
