#![allow(clippy::unreadable_literal)]
//! Decoder-stage boundary: fixed-width codes, immutable code tables and decode results.
//!
//! # Bit Ordering Convention
//!
//! Codes use row-major bit ordering over a `dimension x dimension` data grid:
//! bit `row * dimension + col` is the cell at `(row, col)`. [`rotate90`] turns
//! the grid a quarter turn clockwise.
//!
//! A [`CodeFamily`] is read-only after construction and meant to be shared by
//! reference (`Arc<CodeFamily>`) across every decoder that uses it.

use crate::error::DetectionError;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

/// A fixed-width bit pattern.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Code {
    bits: u64,
    width: u32,
}

impl Code {
    /// Create a code of `width` bits. Bits above `width` are masked off.
    ///
    /// # Errors
    /// Returns [`DetectionError::InvalidCodeWidth`] unless `1 <= width <= 64`.
    pub fn new(bits: u64, width: u32) -> Result<Self, DetectionError> {
        if width == 0 || width > 64 {
            return Err(DetectionError::InvalidCodeWidth(width));
        }
        Ok(Self {
            bits: bits & mask(width),
            width,
        })
    }

    /// Raw bits.
    #[must_use]
    pub fn bits(&self) -> u64 {
        self.bits
    }

    /// Number of significant bits.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Number of disagreeing bits.
    #[must_use]
    pub fn hamming(&self, other: &Code) -> u32 {
        (self.bits ^ other.bits).count_ones()
    }
}

fn mask(width: u32) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

/// Output of the decoder stage for one candidate quad.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecodedCode {
    /// Index of the matched code in its family.
    pub id: u32,
    /// Whether the match is within the family's error-recovery budget.
    pub good: bool,
    /// Bits sampled from the image.
    pub observed_code: Code,
    /// Nearest valid code, rotated into the observed orientation.
    pub matched_code: Code,
    /// `observed_code.hamming(&matched_code)`.
    pub hamming_distance: u32,
    /// Clockwise quarter turns taking the stored code to the observed orientation.
    pub num_rotations: u8,
}

impl DecodedCode {
    /// A perfect match of `code` with the given `id` and orientation.
    #[must_use]
    pub fn exact(id: u32, code: Code, num_rotations: u8) -> Self {
        Self {
            id,
            good: true,
            observed_code: code,
            matched_code: code,
            hamming_distance: 0,
            num_rotations,
        }
    }
}

/// Rotates a square bit pattern 90 degrees clockwise.
#[must_use]
pub fn rotate90(bits: u64, dim: usize) -> u64 {
    let mut res = 0u64;
    for y in 0..dim {
        for x in 0..dim {
            if (bits >> (y * dim + x)) & 1 != 0 {
                let nx = dim - 1 - y;
                let ny = x;
                res |= 1 << (ny * dim + nx);
            }
        }
    }
    res
}

/// An immutable table of valid codes.
#[derive(Clone, Debug)]
pub struct CodeFamily {
    name: Cow<'static, str>,
    dimension: usize,
    min_hamming: u32,
    error_recovery_bits: u32,
    codes: Cow<'static, [u64]>,
    /// Exact-match lookup: rotated bits to (ID, rotation_count).
    code_to_id: HashMap<u64, (u16, u8)>,
    /// All 4 rotations of every code as (bits, ID, rotation_count).
    rotated_codes: Vec<(u64, u16, u8)>,
}

impl CodeFamily {
    /// Build a family from a code table.
    ///
    /// The error-recovery budget defaults to one bit, clamped to what
    /// `min_hamming` can actually correct.
    ///
    /// # Errors
    /// Returns [`DetectionError::InvalidCodeWidth`] if `dimension²` is not in `1..=64`.
    pub fn new(
        name: impl Into<Cow<'static, str>>,
        dimension: usize,
        min_hamming: u32,
        codes: impl Into<Cow<'static, [u64]>>,
    ) -> Result<Self, DetectionError> {
        let width = u32::try_from(dimension * dimension).unwrap_or(u32::MAX);
        if width == 0 || width > 64 {
            return Err(DetectionError::InvalidCodeWidth(width));
        }
        let codes = codes.into();
        let m = mask(width);

        let mut code_to_id = HashMap::with_capacity(codes.len() * 4);
        let mut rotated_codes = Vec::with_capacity(codes.len() * 4);
        for (id, &code) in codes.iter().enumerate() {
            #[allow(clippy::cast_possible_truncation)]
            let id = id as u16;
            let mut r = code & m;
            for rot in 0u8..4 {
                code_to_id.entry(r).or_insert((id, rot));
                rotated_codes.push((r, id, rot));
                r = rotate90(r, dimension);
            }
        }

        Ok(Self {
            name: name.into(),
            dimension,
            min_hamming,
            error_recovery_bits: 1.min(min_hamming.saturating_sub(1) / 2),
            codes,
            code_to_id,
            rotated_codes,
        })
    }

    /// Override the number of bit errors accepted as a `good` decode.
    #[must_use]
    pub fn with_error_recovery_bits(mut self, bits: u32) -> Self {
        self.error_recovery_bits = bits;
        self
    }

    /// The AprilTag 16h5 reference family, shared.
    #[must_use]
    pub fn tag16h5() -> Arc<CodeFamily> {
        Arc::clone(&TAG16H5)
    }

    /// Family name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Grid dimension (e.g., 4 for 16h5).
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Bits per code.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn width(&self) -> u32 {
        (self.dimension * self.dimension) as u32
    }

    /// Minimum hamming distance between any two codes, rotations included.
    #[must_use]
    pub fn min_hamming(&self) -> u32 {
        self.min_hamming
    }

    /// Number of bit errors accepted as a `good` decode.
    #[must_use]
    pub fn error_recovery_bits(&self) -> u32 {
        self.error_recovery_bits
    }

    /// Number of codes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    /// Whether the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Code for `id` in its canonical orientation.
    #[must_use]
    pub fn code(&self, id: u32) -> Option<Code> {
        let bits = *self.codes.get(id as usize)?;
        Code::new(bits, self.width()).ok()
    }

    /// Match `observed` against every rotation of every code.
    ///
    /// Always reports the nearest code; `good` tells whether it is within the
    /// recovery budget. Returns `None` for an empty table or a width mismatch.
    #[must_use]
    pub fn decode(&self, observed: Code) -> Option<DecodedCode> {
        if observed.width() != self.width() {
            return None;
        }
        let bits = observed.bits();

        let (matched, id, rot) = if let Some(&(id, rot)) = self.code_to_id.get(&bits) {
            (bits, id, rot)
        } else {
            self.rotated_codes
                .iter()
                .copied()
                .min_by_key(|&(code, _, _)| (bits ^ code).count_ones())?
        };

        let matched_code = Code::new(matched, self.width()).ok()?;
        let hamming_distance = observed.hamming(&matched_code);
        Some(DecodedCode {
            id: u32::from(id),
            good: hamming_distance <= self.error_recovery_bits,
            observed_code: observed,
            matched_code,
            hamming_distance,
            num_rotations: rot,
        })
    }
}

// ============================================================================
// AprilTag 16h5 (30 codes)
// ============================================================================

/// AprilTag 16h5 code table (30 entries, row-major bit ordering).
#[rustfmt::skip]
pub static TAG16H5_CODES: [u64; 30] = [
    0xe960, 0x91ce, 0x1d29, 0x707c, 0x2d9e, 0xbd7b, 0xe721, 0xb3d1,
    0xd773, 0x34e9, 0x0d62, 0x0f7c, 0x3086, 0xf898, 0x5a0b, 0xf302,
    0x60aa, 0xe68c, 0x3b40, 0x98f4, 0x6bd8, 0xf4d4, 0xbe13, 0x54e2,
    0x63b7, 0xa5fc, 0x7be3, 0x7618, 0xb825, 0xbbaa,
];

static TAG16H5: LazyLock<Arc<CodeFamily>> = LazyLock::new(|| {
    let family = match CodeFamily::new("16h5", 4, 5, &TAG16H5_CODES[..]) {
        Ok(family) => family,
        Err(_) => unreachable!("4x4 grid fits in 64 bits"),
    };
    Arc::new(family)
});

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_rotation_invariants(bits in 0..u64::MAX) {
            let dim = 6;
            let r1 = rotate90(bits, dim);
            let r2 = rotate90(r1, dim);
            let r3 = rotate90(r2, dim);
            let r4 = rotate90(r3, dim);

            let mask = (1u64 << (dim * dim)) - 1;
            prop_assert_eq!(bits & mask, r4 & mask);
        }

        #[test]
        fn test_single_bit_error_recovered(
            id in 0u32..30,
            rotation in 0u8..4,
            flip in 0usize..16,
        ) {
            let family = CodeFamily::tag16h5();
            let mut bits = family.code(id).unwrap().bits();
            for _ in 0..rotation {
                bits = rotate90(bits, 4);
            }
            bits ^= 1 << flip;

            let decoded = family.decode(Code::new(bits, 16).unwrap()).unwrap();
            prop_assert_eq!(decoded.id, id);
            prop_assert_eq!(decoded.num_rotations, rotation);
            prop_assert_eq!(decoded.hamming_distance, 1);
            prop_assert!(decoded.good);
        }
    }

    #[test]
    fn test_all_codes_decode_in_every_rotation() {
        let family = CodeFamily::tag16h5();
        assert_eq!(family.len(), 30);
        for id in 0..30u32 {
            let mut bits = family.code(id).unwrap().bits();
            for rot in 0u8..4 {
                let decoded = family.decode(Code::new(bits, 16).unwrap()).unwrap();
                assert_eq!(decoded.id, id, "ID {id} rotation {rot}");
                assert_eq!(decoded.num_rotations, rot);
                assert_eq!(decoded.hamming_distance, 0);
                assert_eq!(decoded.observed_code, decoded.matched_code);
                bits = rotate90(bits, 4);
            }
        }
    }

    #[test]
    fn test_two_bit_error_is_not_good() {
        let family = CodeFamily::tag16h5();
        let bits = family.code(7).unwrap().bits() ^ 0b101;
        let decoded = family.decode(Code::new(bits, 16).unwrap()).unwrap();
        assert_eq!(decoded.id, 7);
        assert_eq!(decoded.hamming_distance, 2);
        assert!(!decoded.good);
    }

    #[test]
    fn test_width_mismatch_is_rejected() {
        let family = CodeFamily::tag16h5();
        assert!(family.decode(Code::new(0, 36).unwrap()).is_none());
    }

    #[test]
    fn test_code_width_bounds() {
        assert!(Code::new(0, 0).is_err());
        assert!(Code::new(0, 65).is_err());
        assert_eq!(Code::new(u64::MAX, 16).unwrap().bits(), 0xffff);
        assert_eq!(Code::new(u64::MAX, 64).unwrap().bits(), u64::MAX);
    }

    #[test]
    fn test_custom_family_recovery_budget() {
        let family = CodeFamily::new("custom", 3, 3, vec![0b000_000_000, 0b111_111_111])
            .unwrap()
            .with_error_recovery_bits(0);
        assert_eq!(family.error_recovery_bits(), 0);
        let decoded = family.decode(Code::new(0b000_000_001, 9).unwrap()).unwrap();
        assert_eq!(decoded.id, 0);
        assert!(!decoded.good);
    }
}
