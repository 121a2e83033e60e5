// src/sort_order/key.rs
//! Fixed-width unsigned integer used as a hierarchical draw-order key.
//!
//! - Stored as 32-bit words, most significant word first, so the derived `Ord`
//!   compares keys from the high word down.
//! - `+` / `-` propagate carry/borrow across words and **saturate** (all ones / all
//!   zeros) with a warning instead of wrapping.
//! - `<<` discards bits pushed past the top word and warns when any of them was set.

use std::fmt;
use std::ops::{Add, AddAssign, Shl, ShlAssign, Sub, SubAssign};

/// Number of 32-bit words in the default (128-bit) key.
pub const DEFAULT_WORDS: usize = 4;

/// An `WORDS * 32` bit unsigned integer.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OrderKey<const WORDS: usize = DEFAULT_WORDS> {
    words: [u32; WORDS],
}

/// The 128-bit key used by the renderer.
pub type RenderSortOrder = OrderKey<DEFAULT_WORDS>;

impl<const WORDS: usize> OrderKey<WORDS> {
    /// Total width in bits.
    pub const BITS: u32 = (WORDS * 32) as u32;
    /// Bits reserved for one hierarchy level.
    pub const OFFSET_BITS: u32 = 4;
    /// Number of distinct offsets one level can hold.
    pub const MAX_OFFSET: i32 = 1 << Self::OFFSET_BITS;
    /// Number of hierarchy levels that fit in the key.
    pub const MAX_DEPTH: u32 = Self::BITS / Self::OFFSET_BITS;
    /// Shift that places an offset in the top group (root level).
    pub const ROOT_SHIFT: u32 = Self::BITS - Self::OFFSET_BITS;

    pub const ZERO: Self = Self { words: [0; WORDS] };
    pub const MAX: Self = Self { words: [u32::MAX; WORDS] };

    /// Builds a key from raw words, most significant first.
    #[inline]
    pub const fn from_words(words: [u32; WORDS]) -> Self {
        Self { words }
    }

    /// Zero-extends `value` into the low-order words.
    ///
    /// Keys narrower than 64 bits keep only the low bits and warn.
    pub fn from_u64(value: u64) -> Self {
        let mut words = [0u32; WORDS];
        words[WORDS - 1] = value as u32;
        let high = (value >> 32) as u32;
        match WORDS.checked_sub(2) {
            Some(index) => words[index] = high,
            None if high != 0 => log::warn!(
                "Render sort order truncated {:#x} to {} bits.",
                value,
                Self::BITS
            ),
            None => {}
        }
        Self { words }
    }

    #[inline]
    pub fn words(&self) -> &[u32; WORDS] {
        &self.words
    }

    #[inline]
    pub fn is_zero(&self) -> bool {
        self.words.iter().all(|&w| w == 0)
    }

    /// Number of leading zero bits across the whole key.
    pub fn leading_zeros(&self) -> u32 {
        let mut zeros = 0;
        for &word in &self.words {
            if word != 0 {
                return zeros + word.leading_zeros();
            }
            zeros += 32;
        }
        zeros
    }

    /// Word-wise add. Returns the wrapped sum and whether a carry left the top word.
    pub fn overflowing_add(self, rhs: Self) -> (Self, bool) {
        let mut out = [0u32; WORDS];
        let mut carry = false;
        for i in (0..WORDS).rev() {
            let (partial, c1) = self.words[i].overflowing_add(rhs.words[i]);
            let (sum, c2) = partial.overflowing_add(carry as u32);
            out[i] = sum;
            carry = c1 || c2;
        }
        (Self { words: out }, carry)
    }

    /// Word-wise subtract. Returns the wrapped difference and whether a borrow left the top word.
    pub fn overflowing_sub(self, rhs: Self) -> (Self, bool) {
        let mut out = [0u32; WORDS];
        let mut borrow = false;
        for i in (0..WORDS).rev() {
            let (partial, b1) = self.words[i].overflowing_sub(rhs.words[i]);
            let (diff, b2) = partial.overflowing_sub(borrow as u32);
            out[i] = diff;
            borrow = b1 || b2;
        }
        (Self { words: out }, borrow)
    }

    /// Left shift that discards bits past the top word. Returns whether any set bit was lost.
    pub fn overflowing_shl(self, shift: u32) -> (Self, bool) {
        if shift == 0 {
            return (self, false);
        }
        let lost = !self.is_zero() && shift > self.leading_zeros();
        if shift >= Self::BITS {
            return (Self::ZERO, lost);
        }

        let word_shift = (shift / 32) as usize;
        let bit_shift = shift % 32;
        let source = |index: usize| -> u32 {
            if index < WORDS {
                self.words[index]
            } else {
                0
            }
        };

        let mut out = [0u32; WORDS];
        for (i, word) in out.iter_mut().enumerate() {
            let high = source(i + word_shift);
            *word = if bit_shift == 0 {
                high
            } else {
                (high << bit_shift) | (source(i + word_shift + 1) >> (32 - bit_shift))
            };
        }
        (Self { words: out }, lost)
    }

    /// `0x` followed by one `%08X` group per word, most significant first.
    pub fn to_hex_string(&self) -> String {
        let mut out = String::with_capacity(2 + WORDS * 8);
        out.push_str("0x");
        for word in &self.words {
            out.push_str(&format!("{:08X}", word));
        }
        out
    }
}

impl<const WORDS: usize> Default for OrderKey<WORDS> {
    #[inline]
    fn default() -> Self {
        Self::ZERO
    }
}

impl<const WORDS: usize> From<u64> for OrderKey<WORDS> {
    #[inline]
    fn from(value: u64) -> Self {
        Self::from_u64(value)
    }
}

impl<const WORDS: usize> Add for OrderKey<WORDS> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        let (sum, overflow) = self.overflowing_add(rhs);
        if overflow {
            log::warn!("Render sort order addition overflow.");
            return Self::MAX;
        }
        sum
    }
}

impl<const WORDS: usize> Sub for OrderKey<WORDS> {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        let (diff, underflow) = self.overflowing_sub(rhs);
        if underflow {
            log::warn!("Render sort order subtraction underflow.");
            return Self::ZERO;
        }
        diff
    }
}

impl<const WORDS: usize> Shl<u32> for OrderKey<WORDS> {
    type Output = Self;

    fn shl(self, shift: u32) -> Self {
        let (shifted, lost) = self.overflowing_shl(shift);
        if lost {
            log::warn!("Render sort order shift by {} discarded set bits.", shift);
        }
        shifted
    }
}

impl<const WORDS: usize> AddAssign for OrderKey<WORDS> {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl<const WORDS: usize> SubAssign for OrderKey<WORDS> {
    #[inline]
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl<const WORDS: usize> ShlAssign<u32> for OrderKey<WORDS> {
    #[inline]
    fn shl_assign(&mut self, shift: u32) {
        *self = *self << shift;
    }
}

impl<const WORDS: usize> fmt::Display for OrderKey<WORDS> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex_string())
    }
}

impl<const WORDS: usize> fmt::Debug for OrderKey<WORDS> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OrderKey({})", self.to_hex_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cmp::Ordering;

    type Key64 = OrderKey<2>;

    #[test]
    fn test_constants() {
        assert_eq!(RenderSortOrder::BITS, 128);
        assert_eq!(RenderSortOrder::MAX_OFFSET, 16);
        assert_eq!(RenderSortOrder::MAX_DEPTH, 32);
        assert_eq!(RenderSortOrder::ROOT_SHIFT, 124);
    }

    #[test]
    fn test_from_u64_fills_low_words() {
        let key = RenderSortOrder::from(0x1234_5678_9ABC_DEF0);
        assert_eq!(key.words(), &[0, 0, 0x1234_5678, 0x9ABC_DEF0]);
        assert_eq!(key.to_hex_string(), "0x0000000000000000123456789ABCDEF0");
    }

    #[test]
    fn test_narrow_key_truncates() {
        let key = OrderKey::<1>::from_u64(0x1_0000_0002);
        assert_eq!(key.words(), &[2]);
    }

    #[test]
    fn test_add_carries_across_words() {
        let a = Key64::from(u32::MAX as u64);
        let sum = a + Key64::from(1);
        assert_eq!(sum.words(), &[1, 0]);
    }

    #[test]
    fn test_add_saturates_on_overflow() {
        let sum = Key64::MAX + Key64::from(1);
        assert_eq!(sum, Key64::MAX);
        let big = Key64::from_words([0x8000_0000, 0]);
        assert_eq!(big + big, Key64::MAX);
    }

    #[test]
    fn test_sub_borrows_and_saturates() {
        let diff = Key64::from_words([1, 0]) - Key64::from(1);
        assert_eq!(diff.words(), &[0, u32::MAX]);
        assert_eq!(Key64::from(1) - Key64::from(2), Key64::ZERO);
    }

    #[test]
    fn test_add_then_sub_round_trips() {
        let a = RenderSortOrder::from(0xDEAD_BEEF) << 64;
        let b = RenderSortOrder::from(0x0F0F_0F0F_0F0F_0F0F);
        assert_eq!(a + b - b, a);
    }

    #[test]
    fn test_shift_across_words() {
        let key = RenderSortOrder::from(1) << 124;
        assert_eq!(key.to_hex_string(), "0x10000000000000000000000000000000");
        let key = RenderSortOrder::from(0xABCD) << 40;
        assert_eq!(key.words(), &[0, 0, 0x00AB_CD00, 0]);
        let key = RenderSortOrder::from(0xABCD) << 20;
        assert_eq!(key.words(), &[0, 0, 0xA, 0xBCD0_0000]);
        let key = RenderSortOrder::from(0xFF) << 32;
        assert_eq!(key.words(), &[0, 0, 0xFF, 0]);
    }

    #[test]
    fn test_shift_discards_high_bits() {
        let (shifted, lost) = Key64::from_words([0xF000_0000, 1]).overflowing_shl(4);
        assert!(lost);
        assert_eq!(shifted.words(), &[0, 0x10]);

        let (shifted, lost) = Key64::from(1).overflowing_shl(63);
        assert!(!lost);
        assert_eq!(shifted.words(), &[0x8000_0000, 0]);

        let (shifted, lost) = Key64::from(1).overflowing_shl(64);
        assert!(lost);
        assert_eq!(shifted, Key64::ZERO);
    }

    #[test]
    fn test_ordering_uses_first_difference() {
        let high = Key64::from_words([1, 0]);
        let low = Key64::from_words([0, u32::MAX]);
        assert!(high > low);
        assert!(low < high);
        assert!(low <= low);
        assert!(high >= high);
        assert_eq!(Key64::from(7), Key64::from(7));
    }

    #[test]
    fn test_ordering_is_total() {
        let samples = [
            Key64::ZERO,
            Key64::from(1),
            Key64::from(u32::MAX as u64),
            Key64::from_words([1, 0]),
            Key64::MAX,
        ];
        for a in &samples {
            for b in &samples {
                let relations = [a < b, a == b, a > b];
                assert_eq!(relations.iter().filter(|&&r| r).count(), 1);
                assert_eq!(a.cmp(b) == Ordering::Equal, a == b);
            }
        }
    }

    #[test]
    fn test_assign_operators() {
        let mut key = RenderSortOrder::from(1);
        key <<= 4;
        key += RenderSortOrder::from(2);
        key -= RenderSortOrder::from(1);
        assert_eq!(key, RenderSortOrder::from(0x11));
    }
}
