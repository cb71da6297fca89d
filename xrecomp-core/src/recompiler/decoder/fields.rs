//! Operand Field Accessors
//!
//! Every operand is extracted on demand from the raw word with explicit shift/mask
//! arithmetic. Fields that share bit positions across formats (RD/RS/TO/BO/FRD/VD,
//! RA/BI/FRA/VA, ...) are exposed under each architectural name so that call sites
//! read the way the instruction manual does.

use super::Instruction;

impl Instruction {
    /// Bits 21-25: RD / RS / FRD / FRS / VD / BO / TO.
    #[inline]
    pub const fn rd(&self) -> u8 {
        ((self.raw >> 21) & 0x1F) as u8
    }

    #[inline]
    pub const fn rs(&self) -> u8 {
        self.rd()
    }

    /// Bits 16-20: RA / FRA / VA / BI.
    #[inline]
    pub const fn ra(&self) -> u8 {
        ((self.raw >> 16) & 0x1F) as u8
    }

    /// Bits 11-15: RB / FRB / VB.
    #[inline]
    pub const fn rb(&self) -> u8 {
        ((self.raw >> 11) & 0x1F) as u8
    }

    /// Bits 6-10: FRC / VC / ME (M-form) / SH (XS split low part).
    #[inline]
    pub const fn rc_field(&self) -> u8 {
        ((self.raw >> 6) & 0x1F) as u8
    }

    #[inline]
    pub const fn bo(&self) -> u8 {
        self.rd()
    }

    #[inline]
    pub const fn bi(&self) -> u8 {
        self.ra()
    }

    #[inline]
    pub const fn to(&self) -> u8 {
        self.rd()
    }

    /// Condition register destination field (bits 23-25).
    #[inline]
    pub const fn crfd(&self) -> u8 {
        ((self.raw >> 23) & 0x7) as u8
    }

    /// Condition register source field (bits 18-20).
    #[inline]
    pub const fn crfs(&self) -> u8 {
        ((self.raw >> 18) & 0x7) as u8
    }

    /// L bit of the compare instructions (64-bit compare when set).
    #[inline]
    pub const fn cmp_l(&self) -> bool {
        (self.raw >> 21) & 1 != 0
    }

    /// Signed 16-bit immediate.
    #[inline]
    pub const fn simm(&self) -> i32 {
        (self.raw & 0xFFFF) as u16 as i16 as i32
    }

    /// Unsigned 16-bit immediate.
    #[inline]
    pub const fn uimm(&self) -> u32 {
        self.raw & 0xFFFF
    }

    /// DS-form displacement (low two bits are the extended opcode).
    #[inline]
    pub const fn ds(&self) -> i32 {
        (self.raw & 0xFFFC) as u16 as i16 as i32
    }

    /// 5-bit shift amount (M and X forms).
    #[inline]
    pub const fn sh(&self) -> u8 {
        self.rb()
    }

    /// 6-bit shift amount of the MD/XS forms (`sh[5]` lives in bit 1).
    #[inline]
    pub const fn sh64(&self) -> u8 {
        (((self.raw >> 11) & 0x1F) | ((self.raw & 0x2) << 4)) as u8
    }

    /// M-form mask begin.
    #[inline]
    pub const fn mb(&self) -> u8 {
        self.rc_field()
    }

    /// M-form mask end.
    #[inline]
    pub const fn me(&self) -> u8 {
        ((self.raw >> 1) & 0x1F) as u8
    }

    /// MD/MDS-form 6-bit mask field (`mb[5]` is the low bit of the 6-bit field).
    #[inline]
    pub const fn mb64(&self) -> u8 {
        let field: u32 = (self.raw >> 5) & 0x3F;
        (((field & 0x1) << 5) | (field >> 1)) as u8
    }

    /// Special-purpose register number (halves swapped in the encoding).
    #[inline]
    pub const fn spr(&self) -> u16 {
        (((self.raw >> 16) & 0x1F) | (((self.raw >> 11) & 0x1F) << 5)) as u16
    }

    /// Field mask of `mtcrf`.
    #[inline]
    pub const fn crm(&self) -> u8 {
        ((self.raw >> 12) & 0xFF) as u8
    }

    /// Field mask of `mtfsf`.
    #[inline]
    pub const fn fm(&self) -> u8 {
        ((self.raw >> 17) & 0xFF) as u8
    }

    /// Bit 0 of the word.
    #[inline]
    pub const fn rc(&self) -> bool {
        self.raw & 1 != 0
    }

    /// Overflow-enable bit of the XO form.
    #[inline]
    pub const fn oe(&self) -> bool {
        (self.raw >> 10) & 1 != 0
    }

    /// Link bit of the I/B/XL branch forms.
    #[inline]
    pub const fn lk(&self) -> bool {
        self.raw & 1 != 0
    }

    /// Absolute-address bit of the I/B branch forms.
    #[inline]
    pub const fn aa(&self) -> bool {
        (self.raw >> 1) & 1 != 0
    }

    /// AltiVec VA-form shift (`vsldoi`).
    #[inline]
    pub const fn vsh(&self) -> u8 {
        ((self.raw >> 6) & 0xF) as u8
    }

    /// Signed 5-bit splat immediate (`vspltis*`).
    #[inline]
    pub const fn vsimm(&self) -> i8 {
        let field: u8 = ((self.raw >> 16) & 0x1F) as u8;
        ((field << 3) as i8) >> 3
    }

    /// Unsigned 5-bit immediate (`vsplt*`, `vcfux`, `vctsxs`, ...).
    #[inline]
    pub const fn vuimm(&self) -> u8 {
        self.ra()
    }

    /// Whether the VXR/VX128_R record bit is set.
    #[inline]
    pub const fn vrc(&self) -> bool {
        match self.format {
            super::Format::VXR => self.raw & 0x400 != 0,
            super::Format::VX128_R => self.raw & 0x40 != 0,
            _ => false,
        }
    }

    /// VMX128 destination register (7 bits).
    #[inline]
    pub const fn vd128(&self) -> u8 {
        (((self.raw >> 21) & 0x1F) | (((self.raw >> 2) & 0x3) << 5)) as u8
    }

    /// VMX128 first source register (7 bits).
    #[inline]
    pub const fn va128(&self) -> u8 {
        (((self.raw >> 16) & 0x1F) | (self.raw & 0x20) | ((self.raw >> 4) & 0x40)) as u8
    }

    /// VMX128 second source register (7 bits).
    #[inline]
    pub const fn vb128(&self) -> u8 {
        (((self.raw >> 11) & 0x1F) | ((self.raw & 0x3) << 5)) as u8
    }

    /// VMX128 third source register of `vperm128` (3 bits).
    #[inline]
    pub const fn vc128(&self) -> u8 {
        ((self.raw >> 6) & 0x7) as u8
    }

    /// VMX128 immediate in the VA slot (`vspltw128`, `vrlimi128`, `vcfpsxws128`, ...).
    #[inline]
    pub const fn vimm128(&self) -> u8 {
        ((self.raw >> 16) & 0x1F) as u8
    }

    /// `vsldoi128` shift.
    #[inline]
    pub const fn vsh128(&self) -> u8 {
        ((self.raw >> 6) & 0xF) as u8
    }

    /// `vrlimi128` / `vpkd3d128` rotate count.
    #[inline]
    pub const fn vz128(&self) -> u8 {
        ((self.raw >> 6) & 0x3) as u8
    }

    /// `vpermwi128` permute control (8 bits, split across two fields).
    #[inline]
    pub const fn vperm128(&self) -> u8 {
        (((self.raw >> 16) & 0x1F) | ((self.raw >> 1) & 0xE0)) as u8
    }
}

/// Build the 32-bit rotate mask covering bits `mb..=me` (big-endian numbering).
///
/// # Algorithm
/// If MB <= ME: set bits MB through ME (inclusive)
/// If MB > ME: wraparound case, set bits 0 through ME and MB through 31
#[inline] // Called for every rotate emitted
pub fn rotate_mask32(mb: u8, me: u8) -> u32 {
    let begin: u32 = u32::MAX >> (mb & 31);
    let end: u32 = u32::MAX << (31 - (me & 31));
    if mb <= me {
        begin & end
    } else {
        begin | end
    }
}

/// 64-bit counterpart of [`rotate_mask32`].
#[inline]
pub fn rotate_mask64(mb: u8, me: u8) -> u64 {
    let begin: u64 = u64::MAX >> (mb & 63);
    let end: u64 = u64::MAX << (63 - (me & 63));
    if mb <= me {
        begin & end
    } else {
        begin | end
    }
}
