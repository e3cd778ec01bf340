//! Bit-width arithmetic and fixed control-code patterns.

/// Widest padding, field or instruction, in bits, that a restored map may
/// describe.
pub const MAX_WIDTH: u32 = 65_535;

/// Returns the number of bits needed to represent `value` as an unsigned number.
///
/// Zero still occupies one bit.
#[must_use]
pub const fn required_bits(value: u32) -> u32 {
    if value == 0 {
        1
    } else {
        u32::BITS - value.leading_zeros()
    }
}

/// End of a shared field at which fixed codes are aligned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Alignment {
    /// Codes start at the most significant end of the field.
    #[default]
    Left,
    /// Codes start at the least significant end of the field.
    Right,
}

impl Alignment {
    /// Persisted spelling of the alignment.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }

    /// Parses the persisted spelling.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            _ => None,
        }
    }
}

/// A fixed control code: an encoding value padded with literal zero bits.
///
/// The pattern is the value written in `required_bits(value) + extra_bits`
/// bits, so the extra bits are leading zeros.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Encoding {
    value: u32,
    extra_bits: u32,
}

impl Encoding {
    /// Creates a code from its value and number of zero padding bits.
    #[must_use]
    pub const fn new(value: u32, extra_bits: u32) -> Self {
        Self { value, extra_bits }
    }

    /// The encoding value.
    #[must_use]
    pub const fn value(self) -> u32 {
        self.value
    }

    /// Number of literal zero bits above the value.
    #[must_use]
    pub const fn extra_bits(self) -> u32 {
        self.extra_bits
    }

    /// Bits needed for the value alone.
    #[must_use]
    pub const fn value_width(self) -> u32 {
        required_bits(self.value)
    }

    /// Total pattern width including padding.
    #[must_use]
    pub const fn width(self) -> u32 {
        self.value_width().saturating_add(self.extra_bits)
    }

    /// Returns `true` when the fixed bits of `self` and `other` cannot be told
    /// apart once both are aligned at `alignment`.
    ///
    /// Only the `min(width)` bits at the aligned end are fixed in both codes;
    /// if they all agree the shorter pattern is a prefix of the longer one.
    #[must_use]
    pub fn is_ambiguous_with(self, other: Self, alignment: Alignment) -> bool {
        let common = self.width().min(other.width());
        if common == 0 {
            return true;
        }
        match alignment {
            Alignment::Left => {
                self.leading_bits(common) == other.leading_bits(common)
            }
            Alignment::Right => {
                trailing_bits(self.value, common) == trailing_bits(other.value, common)
            }
        }
    }

    /// The `count` most significant bits of the padded pattern.
    fn leading_bits(self, count: u32) -> u64 {
        let drop = self.width() - count;
        u64::from(self.value).checked_shr(drop).unwrap_or(0)
    }

    /// Renders the padded pattern as a string of `0`/`1`.
    #[must_use]
    pub fn to_binary(self) -> String {
        to_binary(self.value, self.width())
    }
}

fn trailing_bits(value: u32, count: u32) -> u64 {
    let value = u64::from(value);
    if count >= u64::BITS {
        value
    } else {
        value & ((1u64 << count) - 1)
    }
}

/// Renders `value` as a `width`-bit binary string, zero-extended on the left.
#[must_use]
pub fn to_binary(value: u32, width: u32) -> String {
    (0..width)
        .rev()
        .map(|bit| {
            if u64::from(value).checked_shr(bit).unwrap_or(0) & 1 == 1 {
                '1'
            } else {
                '0'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{required_bits, to_binary, Alignment, Encoding};

    #[test]
    fn required_bits_counts_significant_bits() {
        assert_eq!(required_bits(0), 1);
        assert_eq!(required_bits(1), 1);
        assert_eq!(required_bits(2), 2);
        assert_eq!(required_bits(7), 3);
        assert_eq!(required_bits(8), 4);
        assert_eq!(required_bits(u32::MAX), 32);
    }

    #[test]
    fn padded_pattern_width_and_rendering() {
        let code = Encoding::new(5, 2);
        assert_eq!(code.value_width(), 3);
        assert_eq!(code.width(), 5);
        assert_eq!(code.to_binary(), "00101");
        assert_eq!(to_binary(0, 0), "");
    }

    #[test]
    fn distinct_one_bit_codes_are_not_ambiguous() {
        let zero = Encoding::new(0, 0);
        let one = Encoding::new(1, 0);
        assert!(!zero.is_ambiguous_with(one, Alignment::Left));
        assert!(!zero.is_ambiguous_with(one, Alignment::Right));
        assert!(zero.is_ambiguous_with(zero, Alignment::Left));
    }

    #[test]
    fn left_alignment_detects_prefixes() {
        // "0" is a prefix of "01".
        assert!(Encoding::new(0, 0).is_ambiguous_with(Encoding::new(1, 1), Alignment::Left));
        // "1" is a prefix of "10" and "11".
        assert!(Encoding::new(1, 0).is_ambiguous_with(Encoding::new(2, 0), Alignment::Left));
        assert!(Encoding::new(1, 0).is_ambiguous_with(Encoding::new(3, 0), Alignment::Left));
        // "1" vs "01" differ in the first bit.
        assert!(!Encoding::new(1, 0).is_ambiguous_with(Encoding::new(1, 1), Alignment::Left));
    }

    #[test]
    fn right_alignment_detects_suffixes() {
        // "1" is a suffix of "01".
        assert!(Encoding::new(1, 0).is_ambiguous_with(Encoding::new(1, 1), Alignment::Right));
        // "1" vs "10" differ in the last bit.
        assert!(!Encoding::new(1, 0).is_ambiguous_with(Encoding::new(2, 0), Alignment::Right));
    }

    #[test]
    fn wide_padding_does_not_overflow() {
        let wide = Encoding::new(1, 90);
        assert_eq!(wide.width(), 91);
        assert!(wide.is_ambiguous_with(Encoding::new(0, 0), Alignment::Left));
        assert!(!wide.is_ambiguous_with(Encoding::new(1, 0), Alignment::Left));
        assert!(wide.is_ambiguous_with(Encoding::new(1, 0), Alignment::Right));
    }

    #[test]
    fn alignment_spelling_roundtrips() {
        for alignment in [Alignment::Left, Alignment::Right] {
            assert_eq!(Alignment::parse(alignment.as_str()), Some(alignment));
        }
        assert_eq!(Alignment::parse("middle"), None);
    }
}
