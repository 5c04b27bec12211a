//! Bit-field codec for 16-bit register words.
//!
//! Every register layout in the driver is described as a table of
//! (offset, width) pairs and packed through these two functions. The caller
//! guarantees `offset + width <= 16`; this is checked in debug builds only.

/// Writes `value`, truncated to `width` bits, into `word` at bit `offset`.
///
/// Bits of `word` outside the field are left untouched.
///
/// ```
/// use switch_regs::set_field;
///
/// assert_eq!(set_field(0xffff, 0, 4, 4), 0xff0f);
/// assert_eq!(set_field(0x0000, 0x1ff, 8, 4), 0x0f00);
/// ```
pub const fn set_field(word: u16, value: u16, offset: u8, width: u8) -> u16 {
    debug_assert!(width >= 1 && offset as u32 + width as u32 <= 16);
    let mask = field_mask(width) << offset;
    (word & !mask) | ((value << offset) & mask)
}

/// Extracts the `width`-bit field at bit `offset` of `word`, shifted down to
/// bit 0.
///
/// ```
/// use switch_regs::get_field;
///
/// assert_eq!(get_field(0xabcd, 4, 8), 0xbc);
/// ```
pub const fn get_field(word: u16, offset: u8, width: u8) -> u16 {
    debug_assert!(width >= 1 && offset as u32 + width as u32 <= 16);
    (word >> offset) & field_mask(width)
}

const fn field_mask(width: u8) -> u16 {
    if width >= 16 {
        u16::MAX
    } else {
        (1u16 << width) - 1
    }
}

/// A named (offset, width) location inside a 16-bit word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BitField {
    /// Least significant bit of the field.
    pub offset: u8,
    /// Field width in bits.
    pub width: u8,
}

impl BitField {
    /// Creates a field descriptor.
    pub const fn new(offset: u8, width: u8) -> Self {
        Self { offset, width }
    }

    /// Largest value the field can hold.
    pub const fn max_value(&self) -> u16 {
        field_mask(self.width)
    }

    /// Returns true if `value` fits the field without truncation.
    pub const fn fits(&self, value: u16) -> bool {
        value <= self.max_value()
    }

    /// Reads the field out of `word`.
    pub const fn get(&self, word: u16) -> u16 {
        get_field(word, self.offset, self.width)
    }

    /// Returns `word` with the field replaced by `value`.
    pub const fn set(&self, word: u16, value: u16) -> u16 {
        set_field(word, value, self.offset, self.width)
    }

    /// Reads a single-bit field as a flag.
    pub const fn get_flag(&self, word: u16) -> bool {
        self.get(word) != 0
    }

    /// Writes a single-bit field from a flag.
    pub const fn set_flag(&self, word: u16, flag: bool) -> u16 {
        self.set(word, flag as u16)
    }
}
