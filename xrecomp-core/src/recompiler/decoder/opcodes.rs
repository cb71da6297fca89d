//! Opcode Table
//!
//! Static descriptors for every encoding the decoder recognises, plus the one-time
//! built lookup table keyed by `(primary opcode, extended-field kind, extended value)`.
//!
//! # Table Layout
//! Each primary opcode lists the extended-field kinds that may apply to it, in the
//! order they must be tried. For primary 31 the 9-bit XO field is probed before the
//! 10-bit X field (no XO value collides with an X value, with or without OE), and for
//! the VMX128 primaries (4, 5, 6) the masks are probed from most to least specific.
//!
//! The table is built exactly once through [`OnceLock`] and never mutated afterwards,
//! so concurrent decoding needs no locking.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::OnceLock;

macro_rules! opcodes {
    ($($variant:ident => $mnemonic:literal,)*) => {
        /// Decoded opcode identity.
        ///
        /// Includes the simplified mnemonics produced by the post-decode rewrites
        /// (`Blr`, `Nop`, `Li`, `Mflr`, ...) and the [`Opcode::Unknown`] sentinel.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
        pub enum Opcode {
            $($variant,)*
        }

        impl Opcode {
            /// Assembler mnemonic (without record/overflow suffixes).
            pub const fn mnemonic(self) -> &'static str {
                match self {
                    $(Opcode::$variant => $mnemonic,)*
                }
            }
        }
    };
}

opcodes! {
    Unknown => "unknown",
    // Branch and system
    B => "b", Bl => "bl", Bc => "bc", Bcl => "bcl", Bclr => "bclr", Blr => "blr", Blrl => "blrl",
    Bcctr => "bcctr", Bctr => "bctr", Bctrl => "bctrl", Sc => "sc", Rfid => "rfid",
    Tw => "tw", Twi => "twi", Td => "td", Tdi => "tdi",
    Sync => "sync", Isync => "isync", Eieio => "eieio",
    Mfmsr => "mfmsr", Mtmsr => "mtmsr", Mtmsrd => "mtmsrd",
    // Condition register
    Mcrf => "mcrf", Crand => "crand", Crandc => "crandc", Creqv => "creqv", Crnand => "crnand",
    Crnor => "crnor", Cror => "cror", Crorc => "crorc", Crxor => "crxor",
    Mfcr => "mfcr", Mtcrf => "mtcrf",
    // Special purpose registers
    Mfspr => "mfspr", Mtspr => "mtspr", Mftb => "mftb",
    Mflr => "mflr", Mtlr => "mtlr", Mfctr => "mfctr", Mtctr => "mtctr",
    // Integer arithmetic
    Addi => "addi", Addis => "addis", Li => "li", Lis => "lis", Addic => "addic", AddicRc => "addic.",
    Subfic => "subfic", Mulli => "mulli",
    Add => "add", Addc => "addc", Adde => "adde", Addme => "addme", Addze => "addze",
    Subf => "subf", Subfc => "subfc", Subfe => "subfe", Subfme => "subfme", Subfze => "subfze",
    Neg => "neg", Mullw => "mullw", Mulhw => "mulhw", Mulhwu => "mulhwu", Mulld => "mulld",
    Mulhd => "mulhd", Mulhdu => "mulhdu", Divw => "divw", Divwu => "divwu", Divd => "divd", Divdu => "divdu",
    // Integer logical
    Ori => "ori", Oris => "oris", Xori => "xori", Xoris => "xoris", AndiRc => "andi.", AndisRc => "andis.",
    Nop => "nop", And => "and", Andc => "andc", Or => "or", Orc => "orc", Mr => "mr", Xor => "xor",
    Nand => "nand", Nor => "nor", Eqv => "eqv", Extsb => "extsb", Extsh => "extsh", Extsw => "extsw",
    Cntlzw => "cntlzw", Cntlzd => "cntlzd",
    // Compare
    Cmp => "cmp", Cmpl => "cmpl", Cmpi => "cmpi", Cmpli => "cmpli",
    // Rotate and shift
    Rlwimi => "rlwimi", Rlwinm => "rlwinm", Rlwnm => "rlwnm",
    Rldicl => "rldicl", Rldicr => "rldicr", Rldic => "rldic", Rldimi => "rldimi", Rldcl => "rldcl", Rldcr => "rldcr",
    Slw => "slw", Srw => "srw", Sraw => "sraw", Srawi => "srawi",
    Sld => "sld", Srd => "srd", Srad => "srad", Sradi => "sradi",
    // Integer loads
    Lbz => "lbz", Lbzu => "lbzu", Lbzx => "lbzx", Lbzux => "lbzux",
    Lhz => "lhz", Lhzu => "lhzu", Lhzx => "lhzx", Lhzux => "lhzux",
    Lha => "lha", Lhau => "lhau", Lhax => "lhax", Lhaux => "lhaux",
    Lwz => "lwz", Lwzu => "lwzu", Lwzx => "lwzx", Lwzux => "lwzux",
    Lwa => "lwa", Lwax => "lwax", Lwaux => "lwaux",
    Ld => "ld", Ldu => "ldu", Ldx => "ldx",
    Lhbrx => "lhbrx", Lwbrx => "lwbrx", Lwarx => "lwarx", Ldarx => "ldarx", Lmw => "lmw",
    // Integer stores
    Stb => "stb", Stbu => "stbu", Stbx => "stbx", Stbux => "stbux",
    Sth => "sth", Sthu => "sthu", Sthx => "sthx", Sthux => "sthux",
    Stw => "stw", Stwu => "stwu", Stwx => "stwx", Stwux => "stwux",
    Std => "std", Stdu => "stdu", Stdx => "stdx", Stdux => "stdux",
    Sthbrx => "sthbrx", Stwbrx => "stwbrx", StwcxRc => "stwcx.", StdcxRc => "stdcx.", Stmw => "stmw",
    // Cache control
    Dcbf => "dcbf", Dcbst => "dcbst", Dcbt => "dcbt", Dcbtst => "dcbtst", Dcbz => "dcbz", Dcbi => "dcbi", Icbi => "icbi",
    // Floating-point loads and stores
    Lfs => "lfs", Lfsu => "lfsu", Lfsx => "lfsx", Lfsux => "lfsux",
    Lfd => "lfd", Lfdu => "lfdu", Lfdx => "lfdx", Lfdux => "lfdux",
    Stfs => "stfs", Stfsu => "stfsu", Stfsx => "stfsx", Stfsux => "stfsux",
    Stfd => "stfd", Stfdu => "stfdu", Stfdx => "stfdx", Stfdux => "stfdux", Stfiwx => "stfiwx",
    // Floating-point arithmetic
    Fadd => "fadd", Fadds => "fadds", Fsub => "fsub", Fsubs => "fsubs", Fmul => "fmul", Fmuls => "fmuls",
    Fdiv => "fdiv", Fdivs => "fdivs", Fsqrt => "fsqrt", Fsqrts => "fsqrts", Fres => "fres", Frsqrte => "frsqrte",
    Fsel => "fsel", Fmadd => "fmadd", Fmadds => "fmadds", Fmsub => "fmsub", Fmsubs => "fmsubs",
    Fnmadd => "fnmadd", Fnmadds => "fnmadds", Fnmsub => "fnmsub", Fnmsubs => "fnmsubs",
    Fmr => "fmr", Fneg => "fneg", Fabs => "fabs", Fnabs => "fnabs", Frsp => "frsp",
    Fctiw => "fctiw", Fctiwz => "fctiwz", Fctid => "fctid", Fctidz => "fctidz", Fcfid => "fcfid",
    Fcmpu => "fcmpu", Fcmpo => "fcmpo",
    Mffs => "mffs", Mtfsf => "mtfsf", Mtfsfi => "mtfsfi", Mtfsb0 => "mtfsb0", Mtfsb1 => "mtfsb1", Mcrfs => "mcrfs",
    // AltiVec loads and stores
    Lvx => "lvx", Lvxl => "lvxl", Lvebx => "lvebx", Lvehx => "lvehx", Lvewx => "lvewx",
    Lvsl => "lvsl", Lvsr => "lvsr", Lvlx => "lvlx", Lvrx => "lvrx", Lvlxl => "lvlxl", Lvrxl => "lvrxl",
    Stvx => "stvx", Stvxl => "stvxl", Stvebx => "stvebx", Stvehx => "stvehx", Stvewx => "stvewx",
    Stvlx => "stvlx", Stvrx => "stvrx", Stvlxl => "stvlxl", Stvrxl => "stvrxl",
    // AltiVec VX
    Vaddubm => "vaddubm", Vadduhm => "vadduhm", Vadduwm => "vadduwm", Vaddcuw => "vaddcuw",
    Vaddubs => "vaddubs", Vadduhs => "vadduhs", Vadduws => "vadduws",
    Vaddsbs => "vaddsbs", Vaddshs => "vaddshs", Vaddsws => "vaddsws",
    Vsububm => "vsububm", Vsubuhm => "vsubuhm", Vsubuwm => "vsubuwm", Vsubcuw => "vsubcuw",
    Vsububs => "vsububs", Vsubuhs => "vsubuhs", Vsubuws => "vsubuws",
    Vsubsbs => "vsubsbs", Vsubshs => "vsubshs", Vsubsws => "vsubsws",
    Vmaxub => "vmaxub", Vmaxuh => "vmaxuh", Vmaxuw => "vmaxuw", Vmaxsb => "vmaxsb", Vmaxsh => "vmaxsh", Vmaxsw => "vmaxsw",
    Vminub => "vminub", Vminuh => "vminuh", Vminuw => "vminuw", Vminsb => "vminsb", Vminsh => "vminsh", Vminsw => "vminsw",
    Vavgub => "vavgub", Vavguh => "vavguh", Vavguw => "vavguw", Vavgsb => "vavgsb", Vavgsh => "vavgsh", Vavgsw => "vavgsw",
    Vrlb => "vrlb", Vrlh => "vrlh", Vrlw => "vrlw", Vslb => "vslb", Vslh => "vslh", Vslw => "vslw",
    Vsrb => "vsrb", Vsrh => "vsrh", Vsrw => "vsrw", Vsrab => "vsrab", Vsrah => "vsrah", Vsraw => "vsraw",
    Vsl => "vsl", Vsr => "vsr", Vslo => "vslo", Vsro => "vsro",
    Vand => "vand", Vandc => "vandc", Vor => "vor", Vxor => "vxor", Vnor => "vnor",
    Vmrghb => "vmrghb", Vmrghh => "vmrghh", Vmrghw => "vmrghw", Vmrglb => "vmrglb", Vmrglh => "vmrglh", Vmrglw => "vmrglw",
    Vpkuhum => "vpkuhum", Vpkuwum => "vpkuwum", Vpkuhus => "vpkuhus", Vpkuwus => "vpkuwus",
    Vpkshus => "vpkshus", Vpkswus => "vpkswus", Vpkshss => "vpkshss", Vpkswss => "vpkswss", Vpkpx => "vpkpx",
    Vupkhsb => "vupkhsb", Vupkhsh => "vupkhsh", Vupklsb => "vupklsb", Vupklsh => "vupklsh",
    Vupkhpx => "vupkhpx", Vupklpx => "vupklpx",
    Vspltb => "vspltb", Vsplth => "vsplth", Vspltw => "vspltw",
    Vspltisb => "vspltisb", Vspltish => "vspltish", Vspltisw => "vspltisw",
    Vmuloub => "vmuloub",
    Vsum4ubs => "vsum4ubs", Vsum4sbs => "vsum4sbs", Vsum4shs => "vsum4shs", Vsum2sws => "vsum2sws", Vsumsws => "vsumsws",
    Vaddfp => "vaddfp", Vsubfp => "vsubfp", Vmaxfp => "vmaxfp", Vminfp => "vminfp",
    Vrefp => "vrefp", Vrsqrtefp => "vrsqrtefp", Vexptefp => "vexptefp", Vlogefp => "vlogefp",
    Vrfin => "vrfin", Vrfiz => "vrfiz", Vrfip => "vrfip", Vrfim => "vrfim",
    Vcfux => "vcfux", Vcfsx => "vcfsx", Vctuxs => "vctuxs", Vctsxs => "vctsxs",
    Mfvscr => "mfvscr", Mtvscr => "mtvscr",
    // AltiVec VXR
    Vcmpequb => "vcmpequb", Vcmpequh => "vcmpequh", Vcmpequw => "vcmpequw", Vcmpeqfp => "vcmpeqfp",
    Vcmpgefp => "vcmpgefp", Vcmpgtfp => "vcmpgtfp", Vcmpbfp => "vcmpbfp",
    Vcmpgtub => "vcmpgtub", Vcmpgtuh => "vcmpgtuh", Vcmpgtuw => "vcmpgtuw",
    Vcmpgtsb => "vcmpgtsb", Vcmpgtsh => "vcmpgtsh", Vcmpgtsw => "vcmpgtsw",
    // AltiVec VA
    Vmhaddshs => "vmhaddshs", Vmhraddshs => "vmhraddshs", Vmladduhm => "vmladduhm",
    Vmsumubm => "vmsumubm", Vmsummbm => "vmsummbm", Vmsumuhm => "vmsumuhm", Vmsumuhs => "vmsumuhs",
    Vmsumshm => "vmsumshm", Vmsumshs => "vmsumshs",
    Vsel => "vsel", Vperm => "vperm", Vsldoi => "vsldoi", Vmaddfp => "vmaddfp", Vnmsubfp => "vnmsubfp",
    // VMX128
    Lvsl128 => "lvsl128", Lvsr128 => "lvsr128", Lvewx128 => "lvewx128", Lvx128 => "lvx128", Lvxl128 => "lvxl128",
    Lvlx128 => "lvlx128", Lvrx128 => "lvrx128", Lvlxl128 => "lvlxl128", Lvrxl128 => "lvrxl128",
    Stvewx128 => "stvewx128", Stvx128 => "stvx128", Stvxl128 => "stvxl128",
    Stvlx128 => "stvlx128", Stvrx128 => "stvrx128", Stvlxl128 => "stvlxl128", Stvrxl128 => "stvrxl128",
    Vsldoi128 => "vsldoi128", Vperm128 => "vperm128",
    Vaddfp128 => "vaddfp128", Vsubfp128 => "vsubfp128", Vmulfp128 => "vmulfp128",
    Vmaddfp128 => "vmaddfp128", Vmaddcfp128 => "vmaddcfp128", Vnmsubfp128 => "vnmsubfp128",
    Vmsum3fp128 => "vmsum3fp128", Vmsum4fp128 => "vmsum4fp128",
    Vpkshss128 => "vpkshss128", Vpkshus128 => "vpkshus128", Vpkswss128 => "vpkswss128", Vpkswus128 => "vpkswus128",
    Vpkuhum128 => "vpkuhum128", Vpkuhus128 => "vpkuhus128", Vpkuwum128 => "vpkuwum128", Vpkuwus128 => "vpkuwus128",
    Vand128 => "vand128", Vandc128 => "vandc128", Vnor128 => "vnor128", Vor128 => "vor128", Vxor128 => "vxor128",
    Vsel128 => "vsel128", Vslo128 => "vslo128", Vsro128 => "vsro128",
    Vpermwi128 => "vpermwi128", Vcfpsxws128 => "vcfpsxws128", Vcfpuxws128 => "vcfpuxws128",
    Vcsxwfp128 => "vcsxwfp128", Vcuxwfp128 => "vcuxwfp128",
    Vrfim128 => "vrfim128", Vrfin128 => "vrfin128", Vrfip128 => "vrfip128", Vrfiz128 => "vrfiz128",
    Vpkd3d128 => "vpkd3d128", Vrefp128 => "vrefp128", Vrsqrtefp128 => "vrsqrtefp128",
    Vexptefp128 => "vexptefp128", Vlogefp128 => "vlogefp128", Vrlimi128 => "vrlimi128",
    Vspltw128 => "vspltw128", Vspltisw128 => "vspltisw128", Vupkd3d128 => "vupkd3d128",
    Vcmpeqfp128 => "vcmpeqfp128", Vcmpgefp128 => "vcmpgefp128", Vcmpgtfp128 => "vcmpgtfp128",
    Vcmpbfp128 => "vcmpbfp128", Vcmpequw128 => "vcmpequw128",
    Vrlw128 => "vrlw128", Vslw128 => "vslw128", Vsraw128 => "vsraw128", Vsrw128 => "vsrw128",
    Vmaxfp128 => "vmaxfp128", Vminfp128 => "vminfp128", Vmrghw128 => "vmrghw128", Vmrglw128 => "vmrglw128",
    Vupkhsb128 => "vupkhsb128", Vupklsb128 => "vupklsb128",
}

/// Instruction encoding format.
///
/// Determines where operand fields live in the word and, for primaries that have
/// one, where the extended opcode is found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
#[allow(non_camel_case_types)]
pub enum Format {
    I,
    B,
    SC,
    D,
    DS,
    X,
    XL,
    XFX,
    XFL,
    XS,
    XO,
    A,
    M,
    MD,
    MDS,
    VA,
    VX,
    VXR,
    VX128,
    VX128_1,
    VX128_2,
    VX128_3,
    VX128_4,
    VX128_5,
    VX128_P,
    VX128_R,
    Unknown,
}

/// Position of the extended opcode field for a format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtendedField {
    /// Bits 1-10 (X, XL, XFX, XFL).
    Xo10,
    /// Bits 1-9 (XO, OE excluded).
    Xo9,
    /// Bits 2-10 (XS).
    Xs9,
    /// Bits 1-5 (A).
    Xo5,
    /// Bits 0-1 (DS).
    Ds2,
    /// Bits 2-4 (MD).
    Md3,
    /// Bits 1-4 (MDS).
    Mds4,
    /// Bits 0-10 (VX).
    Vx11,
    /// Bits 0-9 (VXR, Rc in bit 10).
    Vxr10,
    /// Bits 0-5 (VA).
    Va6,
    /// Masked VMX128 extended field.
    Masked(u16),
}

impl ExtendedField {
    /// Extract the extended opcode value from a raw word.
    #[inline]
    pub const fn extract(self, raw: u32) -> u16 {
        match self {
            ExtendedField::Xo10 => ((raw >> 1) & 0x3FF) as u16,
            ExtendedField::Xo9 => ((raw >> 1) & 0x1FF) as u16,
            ExtendedField::Xs9 => ((raw >> 2) & 0x1FF) as u16,
            ExtendedField::Xo5 => ((raw >> 1) & 0x1F) as u16,
            ExtendedField::Ds2 => (raw & 0x3) as u16,
            ExtendedField::Md3 => ((raw >> 2) & 0x7) as u16,
            ExtendedField::Mds4 => ((raw >> 1) & 0xF) as u16,
            ExtendedField::Vx11 => (raw & 0x7FF) as u16,
            ExtendedField::Vxr10 => (raw & 0x3FF) as u16,
            ExtendedField::Va6 => (raw & 0x3F) as u16,
            ExtendedField::Masked(mask) => (raw & mask as u32) as u16,
        }
    }
}

impl Format {
    /// Extended opcode field dictated by this format, if any.
    pub const fn extended_field(self) -> Option<ExtendedField> {
        match self {
            Format::X | Format::XL | Format::XFX | Format::XFL => Some(ExtendedField::Xo10),
            Format::XO => Some(ExtendedField::Xo9),
            Format::XS => Some(ExtendedField::Xs9),
            Format::A => Some(ExtendedField::Xo5),
            Format::DS => Some(ExtendedField::Ds2),
            Format::MD => Some(ExtendedField::Md3),
            Format::MDS => Some(ExtendedField::Mds4),
            Format::VX => Some(ExtendedField::Vx11),
            Format::VXR => Some(ExtendedField::Vxr10),
            Format::VA => Some(ExtendedField::Va6),
            Format::VX128 => Some(ExtendedField::Masked(0x3D0)),
            Format::VX128_1 => Some(ExtendedField::Masked(0x7F3)),
            Format::VX128_2 => Some(ExtendedField::Masked(0x210)),
            Format::VX128_3 => Some(ExtendedField::Masked(0x7F0)),
            Format::VX128_4 => Some(ExtendedField::Masked(0x730)),
            Format::VX128_5 => Some(ExtendedField::Masked(0x010)),
            Format::VX128_P => Some(ExtendedField::Masked(0x630)),
            Format::VX128_R => Some(ExtendedField::Masked(0x390)),
            Format::I | Format::B | Format::SC | Format::D | Format::M | Format::Unknown => None,
        }
    }

    /// Whether bit 0 of the word is the record (Rc) bit for this format.
    pub const fn has_record_bit(self) -> bool {
        matches!(
            self,
            Format::X | Format::XO | Format::XS | Format::A | Format::M | Format::MD | Format::MDS | Format::XFL
        )
    }
}

/// Coarse classification of an opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum OpcodeGroup {
    Branch,
    System,
    Trap,
    ConditionRegister,
    SpecialRegister,
    IntArithmetic,
    IntLogical,
    IntCompare,
    IntRotate,
    IntShift,
    IntLoad,
    IntStore,
    Cache,
    FloatLoad,
    FloatStore,
    FloatArithmetic,
    FloatMove,
    FloatCompare,
    FloatControl,
    VectorLoad,
    VectorStore,
    VectorInteger,
    VectorFloat,
    VectorPermute,
    VectorControl,
    Unknown,
}

/// Static opcode descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OpcodeInfo {
    pub opcode: Opcode,
    pub format: Format,
    pub group: OpcodeGroup,
    pub mnemonic: &'static str,
    pub primary: u8,
    pub extended: u16,
    pub has_extended: bool,
}

/// Descriptor returned for every word the table does not recognise.
pub const UNKNOWN_INFO: OpcodeInfo = OpcodeInfo {
    opcode: Opcode::Unknown,
    format: Format::Unknown,
    group: OpcodeGroup::Unknown,
    mnemonic: "unknown",
    primary: 0,
    extended: 0,
    has_extended: false,
};

const fn op(opcode: Opcode, format: Format, group: OpcodeGroup, primary: u8) -> OpcodeInfo {
    OpcodeInfo {
        opcode,
        format,
        group,
        mnemonic: opcode.mnemonic(),
        primary,
        extended: 0,
        has_extended: false,
    }
}

const fn ext(opcode: Opcode, format: Format, group: OpcodeGroup, primary: u8, extended: u16) -> OpcodeInfo {
    OpcodeInfo {
        opcode,
        format,
        group,
        mnemonic: opcode.mnemonic(),
        primary,
        extended,
        has_extended: true,
    }
}

use Format as F;
use Opcode as O;
use OpcodeGroup as G;

/// Every recognised encoding.
pub static OPCODE_INFOS: &[OpcodeInfo] = &[
    // Primary-only encodings
    op(O::Tdi, F::D, G::Trap, 2),
    op(O::Twi, F::D, G::Trap, 3),
    op(O::Mulli, F::D, G::IntArithmetic, 7),
    op(O::Subfic, F::D, G::IntArithmetic, 8),
    op(O::Cmpli, F::D, G::IntCompare, 10),
    op(O::Cmpi, F::D, G::IntCompare, 11),
    op(O::Addic, F::D, G::IntArithmetic, 12),
    op(O::AddicRc, F::D, G::IntArithmetic, 13),
    op(O::Addi, F::D, G::IntArithmetic, 14),
    op(O::Addis, F::D, G::IntArithmetic, 15),
    op(O::Bc, F::B, G::Branch, 16),
    op(O::Sc, F::SC, G::System, 17),
    op(O::B, F::I, G::Branch, 18),
    op(O::Rlwimi, F::M, G::IntRotate, 20),
    op(O::Rlwinm, F::M, G::IntRotate, 21),
    op(O::Rlwnm, F::M, G::IntRotate, 23),
    op(O::Ori, F::D, G::IntLogical, 24),
    op(O::Oris, F::D, G::IntLogical, 25),
    op(O::Xori, F::D, G::IntLogical, 26),
    op(O::Xoris, F::D, G::IntLogical, 27),
    op(O::AndiRc, F::D, G::IntLogical, 28),
    op(O::AndisRc, F::D, G::IntLogical, 29),
    op(O::Lwz, F::D, G::IntLoad, 32),
    op(O::Lwzu, F::D, G::IntLoad, 33),
    op(O::Lbz, F::D, G::IntLoad, 34),
    op(O::Lbzu, F::D, G::IntLoad, 35),
    op(O::Stw, F::D, G::IntStore, 36),
    op(O::Stwu, F::D, G::IntStore, 37),
    op(O::Stb, F::D, G::IntStore, 38),
    op(O::Stbu, F::D, G::IntStore, 39),
    op(O::Lhz, F::D, G::IntLoad, 40),
    op(O::Lhzu, F::D, G::IntLoad, 41),
    op(O::Lha, F::D, G::IntLoad, 42),
    op(O::Lhau, F::D, G::IntLoad, 43),
    op(O::Sth, F::D, G::IntStore, 44),
    op(O::Sthu, F::D, G::IntStore, 45),
    op(O::Lmw, F::D, G::IntLoad, 46),
    op(O::Stmw, F::D, G::IntStore, 47),
    op(O::Lfs, F::D, G::FloatLoad, 48),
    op(O::Lfsu, F::D, G::FloatLoad, 49),
    op(O::Lfd, F::D, G::FloatLoad, 50),
    op(O::Lfdu, F::D, G::FloatLoad, 51),
    op(O::Stfs, F::D, G::FloatStore, 52),
    op(O::Stfsu, F::D, G::FloatStore, 53),
    op(O::Stfd, F::D, G::FloatStore, 54),
    op(O::Stfdu, F::D, G::FloatStore, 55),
    // DS-form
    ext(O::Ld, F::DS, G::IntLoad, 58, 0),
    ext(O::Ldu, F::DS, G::IntLoad, 58, 1),
    ext(O::Lwa, F::DS, G::IntLoad, 58, 2),
    ext(O::Std, F::DS, G::IntStore, 62, 0),
    ext(O::Stdu, F::DS, G::IntStore, 62, 1),
    // Primary 19 (XL)
    ext(O::Mcrf, F::XL, G::ConditionRegister, 19, 0),
    ext(O::Bclr, F::XL, G::Branch, 19, 16),
    ext(O::Rfid, F::XL, G::System, 19, 18),
    ext(O::Crnor, F::XL, G::ConditionRegister, 19, 33),
    ext(O::Crandc, F::XL, G::ConditionRegister, 19, 129),
    ext(O::Isync, F::XL, G::System, 19, 150),
    ext(O::Crxor, F::XL, G::ConditionRegister, 19, 193),
    ext(O::Crnand, F::XL, G::ConditionRegister, 19, 225),
    ext(O::Crand, F::XL, G::ConditionRegister, 19, 257),
    ext(O::Creqv, F::XL, G::ConditionRegister, 19, 289),
    ext(O::Crorc, F::XL, G::ConditionRegister, 19, 417),
    ext(O::Cror, F::XL, G::ConditionRegister, 19, 449),
    ext(O::Bcctr, F::XL, G::Branch, 19, 528),
    // Primary 30 (MD/MDS)
    ext(O::Rldicl, F::MD, G::IntRotate, 30, 0),
    ext(O::Rldicr, F::MD, G::IntRotate, 30, 1),
    ext(O::Rldic, F::MD, G::IntRotate, 30, 2),
    ext(O::Rldimi, F::MD, G::IntRotate, 30, 3),
    ext(O::Rldcl, F::MDS, G::IntRotate, 30, 8),
    ext(O::Rldcr, F::MDS, G::IntRotate, 30, 9),
    // Primary 31 (XO)
    ext(O::Subfc, F::XO, G::IntArithmetic, 31, 8),
    ext(O::Mulhdu, F::XO, G::IntArithmetic, 31, 9),
    ext(O::Addc, F::XO, G::IntArithmetic, 31, 10),
    ext(O::Mulhwu, F::XO, G::IntArithmetic, 31, 11),
    ext(O::Subf, F::XO, G::IntArithmetic, 31, 40),
    ext(O::Mulhd, F::XO, G::IntArithmetic, 31, 73),
    ext(O::Mulhw, F::XO, G::IntArithmetic, 31, 75),
    ext(O::Neg, F::XO, G::IntArithmetic, 31, 104),
    ext(O::Subfe, F::XO, G::IntArithmetic, 31, 136),
    ext(O::Adde, F::XO, G::IntArithmetic, 31, 138),
    ext(O::Subfze, F::XO, G::IntArithmetic, 31, 200),
    ext(O::Addze, F::XO, G::IntArithmetic, 31, 202),
    ext(O::Subfme, F::XO, G::IntArithmetic, 31, 232),
    ext(O::Mulld, F::XO, G::IntArithmetic, 31, 233),
    ext(O::Addme, F::XO, G::IntArithmetic, 31, 234),
    ext(O::Mullw, F::XO, G::IntArithmetic, 31, 235),
    ext(O::Add, F::XO, G::IntArithmetic, 31, 266),
    ext(O::Divdu, F::XO, G::IntArithmetic, 31, 457),
    ext(O::Divwu, F::XO, G::IntArithmetic, 31, 459),
    ext(O::Divd, F::XO, G::IntArithmetic, 31, 489),
    ext(O::Divw, F::XO, G::IntArithmetic, 31, 491),
    // Primary 31 (XS)
    ext(O::Sradi, F::XS, G::IntShift, 31, 413),
    // Primary 31 (X / XFX)
    ext(O::Cmp, F::X, G::IntCompare, 31, 0),
    ext(O::Tw, F::X, G::Trap, 31, 4),
    ext(O::Lvsl, F::X, G::VectorLoad, 31, 6),
    ext(O::Lvebx, F::X, G::VectorLoad, 31, 7),
    ext(O::Mfcr, F::XFX, G::ConditionRegister, 31, 19),
    ext(O::Lwarx, F::X, G::IntLoad, 31, 20),
    ext(O::Ldx, F::X, G::IntLoad, 31, 21),
    ext(O::Lwzx, F::X, G::IntLoad, 31, 23),
    ext(O::Slw, F::X, G::IntShift, 31, 24),
    ext(O::Cntlzw, F::X, G::IntLogical, 31, 26),
    ext(O::Sld, F::X, G::IntShift, 31, 27),
    ext(O::And, F::X, G::IntLogical, 31, 28),
    ext(O::Cmpl, F::X, G::IntCompare, 31, 32),
    ext(O::Lvsr, F::X, G::VectorLoad, 31, 38),
    ext(O::Lvehx, F::X, G::VectorLoad, 31, 39),
    ext(O::Dcbst, F::X, G::Cache, 31, 54),
    ext(O::Lwzux, F::X, G::IntLoad, 31, 55),
    ext(O::Cntlzd, F::X, G::IntLogical, 31, 58),
    ext(O::Andc, F::X, G::IntLogical, 31, 60),
    ext(O::Td, F::X, G::Trap, 31, 68),
    ext(O::Lvewx, F::X, G::VectorLoad, 31, 71),
    ext(O::Mfmsr, F::X, G::System, 31, 83),
    ext(O::Ldarx, F::X, G::IntLoad, 31, 84),
    ext(O::Dcbf, F::X, G::Cache, 31, 86),
    ext(O::Lbzx, F::X, G::IntLoad, 31, 87),
    ext(O::Lvx, F::X, G::VectorLoad, 31, 103),
    ext(O::Lbzux, F::X, G::IntLoad, 31, 119),
    ext(O::Nor, F::X, G::IntLogical, 31, 124),
    ext(O::Stvebx, F::X, G::VectorStore, 31, 135),
    ext(O::Mtcrf, F::XFX, G::ConditionRegister, 31, 144),
    ext(O::Mtmsr, F::X, G::System, 31, 146),
    ext(O::Stdx, F::X, G::IntStore, 31, 149),
    ext(O::StwcxRc, F::X, G::IntStore, 31, 150),
    ext(O::Stwx, F::X, G::IntStore, 31, 151),
    ext(O::Stvehx, F::X, G::VectorStore, 31, 167),
    ext(O::Mtmsrd, F::X, G::System, 31, 178),
    ext(O::Stdux, F::X, G::IntStore, 31, 181),
    ext(O::Stwux, F::X, G::IntStore, 31, 183),
    ext(O::Stvewx, F::X, G::VectorStore, 31, 199),
    ext(O::StdcxRc, F::X, G::IntStore, 31, 214),
    ext(O::Stbx, F::X, G::IntStore, 31, 215),
    ext(O::Stvx, F::X, G::VectorStore, 31, 231),
    ext(O::Dcbtst, F::X, G::Cache, 31, 246),
    ext(O::Stbux, F::X, G::IntStore, 31, 247),
    ext(O::Dcbt, F::X, G::Cache, 31, 278),
    ext(O::Lhzx, F::X, G::IntLoad, 31, 279),
    ext(O::Eqv, F::X, G::IntLogical, 31, 284),
    ext(O::Lhzux, F::X, G::IntLoad, 31, 311),
    ext(O::Xor, F::X, G::IntLogical, 31, 316),
    ext(O::Mfspr, F::XFX, G::SpecialRegister, 31, 339),
    ext(O::Lwax, F::X, G::IntLoad, 31, 341),
    ext(O::Lhax, F::X, G::IntLoad, 31, 343),
    ext(O::Lvxl, F::X, G::VectorLoad, 31, 359),
    ext(O::Mftb, F::XFX, G::SpecialRegister, 31, 371),
    ext(O::Lwaux, F::X, G::IntLoad, 31, 373),
    ext(O::Lhaux, F::X, G::IntLoad, 31, 375),
    ext(O::Sthx, F::X, G::IntStore, 31, 407),
    ext(O::Orc, F::X, G::IntLogical, 31, 412),
    ext(O::Sthux, F::X, G::IntStore, 31, 439),
    ext(O::Or, F::X, G::IntLogical, 31, 444),
    ext(O::Mtspr, F::XFX, G::SpecialRegister, 31, 467),
    ext(O::Dcbi, F::X, G::Cache, 31, 470),
    ext(O::Nand, F::X, G::IntLogical, 31, 476),
    ext(O::Stvxl, F::X, G::VectorStore, 31, 487),
    ext(O::Lvlx, F::X, G::VectorLoad, 31, 519),
    ext(O::Lwbrx, F::X, G::IntLoad, 31, 534),
    ext(O::Lfsx, F::X, G::FloatLoad, 31, 535),
    ext(O::Srw, F::X, G::IntShift, 31, 536),
    ext(O::Srd, F::X, G::IntShift, 31, 539),
    ext(O::Lvrx, F::X, G::VectorLoad, 31, 551),
    ext(O::Lfsux, F::X, G::FloatLoad, 31, 567),
    ext(O::Sync, F::X, G::System, 31, 598),
    ext(O::Lfdx, F::X, G::FloatLoad, 31, 599),
    ext(O::Lfdux, F::X, G::FloatLoad, 31, 631),
    ext(O::Stvlx, F::X, G::VectorStore, 31, 647),
    ext(O::Stwbrx, F::X, G::IntStore, 31, 662),
    ext(O::Stfsx, F::X, G::FloatStore, 31, 663),
    ext(O::Stvrx, F::X, G::VectorStore, 31, 679),
    ext(O::Stfsux, F::X, G::FloatStore, 31, 695),
    ext(O::Stfdx, F::X, G::FloatStore, 31, 727),
    ext(O::Stfdux, F::X, G::FloatStore, 31, 759),
    ext(O::Lvlxl, F::X, G::VectorLoad, 31, 775),
    ext(O::Lhbrx, F::X, G::IntLoad, 31, 790),
    ext(O::Sraw, F::X, G::IntShift, 31, 792),
    ext(O::Srad, F::X, G::IntShift, 31, 794),
    ext(O::Lvrxl, F::X, G::VectorLoad, 31, 807),
    ext(O::Srawi, F::X, G::IntShift, 31, 824),
    ext(O::Eieio, F::X, G::System, 31, 854),
    ext(O::Stvlxl, F::X, G::VectorStore, 31, 903),
    ext(O::Sthbrx, F::X, G::IntStore, 31, 918),
    ext(O::Extsh, F::X, G::IntLogical, 31, 922),
    ext(O::Stvrxl, F::X, G::VectorStore, 31, 935),
    ext(O::Extsb, F::X, G::IntLogical, 31, 954),
    ext(O::Icbi, F::X, G::Cache, 31, 982),
    ext(O::Stfiwx, F::X, G::FloatStore, 31, 983),
    ext(O::Extsw, F::X, G::IntLogical, 31, 986),
    ext(O::Dcbz, F::X, G::Cache, 31, 1014),
    // Primary 59 (single-precision A-form)
    ext(O::Fdivs, F::A, G::FloatArithmetic, 59, 18),
    ext(O::Fsubs, F::A, G::FloatArithmetic, 59, 20),
    ext(O::Fadds, F::A, G::FloatArithmetic, 59, 21),
    ext(O::Fsqrts, F::A, G::FloatArithmetic, 59, 22),
    ext(O::Fres, F::A, G::FloatArithmetic, 59, 24),
    ext(O::Fmuls, F::A, G::FloatArithmetic, 59, 25),
    ext(O::Fmsubs, F::A, G::FloatArithmetic, 59, 28),
    ext(O::Fmadds, F::A, G::FloatArithmetic, 59, 29),
    ext(O::Fnmsubs, F::A, G::FloatArithmetic, 59, 30),
    ext(O::Fnmadds, F::A, G::FloatArithmetic, 59, 31),
    // Primary 63 (A-form)
    ext(O::Fdiv, F::A, G::FloatArithmetic, 63, 18),
    ext(O::Fsub, F::A, G::FloatArithmetic, 63, 20),
    ext(O::Fadd, F::A, G::FloatArithmetic, 63, 21),
    ext(O::Fsqrt, F::A, G::FloatArithmetic, 63, 22),
    ext(O::Fsel, F::A, G::FloatArithmetic, 63, 23),
    ext(O::Fmul, F::A, G::FloatArithmetic, 63, 25),
    ext(O::Frsqrte, F::A, G::FloatArithmetic, 63, 26),
    ext(O::Fmsub, F::A, G::FloatArithmetic, 63, 28),
    ext(O::Fmadd, F::A, G::FloatArithmetic, 63, 29),
    ext(O::Fnmsub, F::A, G::FloatArithmetic, 63, 30),
    ext(O::Fnmadd, F::A, G::FloatArithmetic, 63, 31),
    // Primary 63 (X / XFL)
    ext(O::Fcmpu, F::X, G::FloatCompare, 63, 0),
    ext(O::Frsp, F::X, G::FloatArithmetic, 63, 12),
    ext(O::Fctiw, F::X, G::FloatArithmetic, 63, 14),
    ext(O::Fctiwz, F::X, G::FloatArithmetic, 63, 15),
    ext(O::Fcmpo, F::X, G::FloatCompare, 63, 32),
    ext(O::Mtfsb1, F::X, G::FloatControl, 63, 38),
    ext(O::Fneg, F::X, G::FloatMove, 63, 40),
    ext(O::Mcrfs, F::X, G::FloatControl, 63, 64),
    ext(O::Mtfsb0, F::X, G::FloatControl, 63, 70),
    ext(O::Fmr, F::X, G::FloatMove, 63, 72),
    ext(O::Mtfsfi, F::X, G::FloatControl, 63, 134),
    ext(O::Fnabs, F::X, G::FloatMove, 63, 136),
    ext(O::Fabs, F::X, G::FloatMove, 63, 264),
    ext(O::Mffs, F::X, G::FloatControl, 63, 583),
    ext(O::Mtfsf, F::XFL, G::FloatControl, 63, 711),
    ext(O::Fctid, F::X, G::FloatArithmetic, 63, 814),
    ext(O::Fctidz, F::X, G::FloatArithmetic, 63, 815),
    ext(O::Fcfid, F::X, G::FloatArithmetic, 63, 846),
    // Primary 4 (VX)
    ext(O::Vaddubm, F::VX, G::VectorInteger, 4, 0),
    ext(O::Vmaxub, F::VX, G::VectorInteger, 4, 2),
    ext(O::Vrlb, F::VX, G::VectorInteger, 4, 4),
    ext(O::Vmuloub, F::VX, G::VectorInteger, 4, 8),
    ext(O::Vaddfp, F::VX, G::VectorFloat, 4, 10),
    ext(O::Vmrghb, F::VX, G::VectorPermute, 4, 12),
    ext(O::Vpkuhum, F::VX, G::VectorPermute, 4, 14),
    ext(O::Vadduhm, F::VX, G::VectorInteger, 4, 64),
    ext(O::Vmaxuh, F::VX, G::VectorInteger, 4, 66),
    ext(O::Vrlh, F::VX, G::VectorInteger, 4, 68),
    ext(O::Vsubfp, F::VX, G::VectorFloat, 4, 74),
    ext(O::Vmrghh, F::VX, G::VectorPermute, 4, 76),
    ext(O::Vpkuwum, F::VX, G::VectorPermute, 4, 78),
    ext(O::Vadduwm, F::VX, G::VectorInteger, 4, 128),
    ext(O::Vmaxuw, F::VX, G::VectorInteger, 4, 130),
    ext(O::Vrlw, F::VX, G::VectorInteger, 4, 132),
    ext(O::Vmrghw, F::VX, G::VectorPermute, 4, 140),
    ext(O::Vpkuhus, F::VX, G::VectorPermute, 4, 142),
    ext(O::Vpkuwus, F::VX, G::VectorPermute, 4, 206),
    ext(O::Vmaxsb, F::VX, G::VectorInteger, 4, 258),
    ext(O::Vslb, F::VX, G::VectorInteger, 4, 260),
    ext(O::Vrefp, F::VX, G::VectorFloat, 4, 266),
    ext(O::Vmrglb, F::VX, G::VectorPermute, 4, 268),
    ext(O::Vpkshus, F::VX, G::VectorPermute, 4, 270),
    ext(O::Vmaxsh, F::VX, G::VectorInteger, 4, 322),
    ext(O::Vslh, F::VX, G::VectorInteger, 4, 324),
    ext(O::Vrsqrtefp, F::VX, G::VectorFloat, 4, 330),
    ext(O::Vmrglh, F::VX, G::VectorPermute, 4, 332),
    ext(O::Vpkswus, F::VX, G::VectorPermute, 4, 334),
    ext(O::Vaddcuw, F::VX, G::VectorInteger, 4, 384),
    ext(O::Vmaxsw, F::VX, G::VectorInteger, 4, 386),
    ext(O::Vslw, F::VX, G::VectorInteger, 4, 388),
    ext(O::Vexptefp, F::VX, G::VectorFloat, 4, 394),
    ext(O::Vmrglw, F::VX, G::VectorPermute, 4, 396),
    ext(O::Vpkshss, F::VX, G::VectorPermute, 4, 398),
    ext(O::Vsl, F::VX, G::VectorPermute, 4, 452),
    ext(O::Vlogefp, F::VX, G::VectorFloat, 4, 458),
    ext(O::Vpkswss, F::VX, G::VectorPermute, 4, 462),
    ext(O::Vaddubs, F::VX, G::VectorInteger, 4, 512),
    ext(O::Vminub, F::VX, G::VectorInteger, 4, 514),
    ext(O::Vsrb, F::VX, G::VectorInteger, 4, 516),
    ext(O::Vrfin, F::VX, G::VectorFloat, 4, 522),
    ext(O::Vspltb, F::VX, G::VectorPermute, 4, 524),
    ext(O::Vupkhsb, F::VX, G::VectorPermute, 4, 526),
    ext(O::Vadduhs, F::VX, G::VectorInteger, 4, 576),
    ext(O::Vminuh, F::VX, G::VectorInteger, 4, 578),
    ext(O::Vsrh, F::VX, G::VectorInteger, 4, 580),
    ext(O::Vrfiz, F::VX, G::VectorFloat, 4, 586),
    ext(O::Vsplth, F::VX, G::VectorPermute, 4, 588),
    ext(O::Vupkhsh, F::VX, G::VectorPermute, 4, 590),
    ext(O::Vadduws, F::VX, G::VectorInteger, 4, 640),
    ext(O::Vminuw, F::VX, G::VectorInteger, 4, 642),
    ext(O::Vsrw, F::VX, G::VectorInteger, 4, 644),
    ext(O::Vrfip, F::VX, G::VectorFloat, 4, 650),
    ext(O::Vspltw, F::VX, G::VectorPermute, 4, 652),
    ext(O::Vupklsb, F::VX, G::VectorPermute, 4, 654),
    ext(O::Vsr, F::VX, G::VectorPermute, 4, 708),
    ext(O::Vrfim, F::VX, G::VectorFloat, 4, 714),
    ext(O::Vupklsh, F::VX, G::VectorPermute, 4, 718),
    ext(O::Vaddsbs, F::VX, G::VectorInteger, 4, 768),
    ext(O::Vminsb, F::VX, G::VectorInteger, 4, 770),
    ext(O::Vsrab, F::VX, G::VectorInteger, 4, 772),
    ext(O::Vcfux, F::VX, G::VectorFloat, 4, 778),
    ext(O::Vspltisb, F::VX, G::VectorPermute, 4, 780),
    ext(O::Vpkpx, F::VX, G::VectorPermute, 4, 782),
    ext(O::Vaddshs, F::VX, G::VectorInteger, 4, 832),
    ext(O::Vminsh, F::VX, G::VectorInteger, 4, 834),
    ext(O::Vsrah, F::VX, G::VectorInteger, 4, 836),
    ext(O::Vcfsx, F::VX, G::VectorFloat, 4, 842),
    ext(O::Vspltish, F::VX, G::VectorPermute, 4, 844),
    ext(O::Vupkhpx, F::VX, G::VectorPermute, 4, 846),
    ext(O::Vaddsws, F::VX, G::VectorInteger, 4, 896),
    ext(O::Vminsw, F::VX, G::VectorInteger, 4, 898),
    ext(O::Vsraw, F::VX, G::VectorInteger, 4, 900),
    ext(O::Vctuxs, F::VX, G::VectorFloat, 4, 906),
    ext(O::Vspltisw, F::VX, G::VectorPermute, 4, 908),
    ext(O::Vctsxs, F::VX, G::VectorFloat, 4, 970),
    ext(O::Vupklpx, F::VX, G::VectorPermute, 4, 974),
    ext(O::Vsububm, F::VX, G::VectorInteger, 4, 1024),
    ext(O::Vavgub, F::VX, G::VectorInteger, 4, 1026),
    ext(O::Vand, F::VX, G::VectorInteger, 4, 1028),
    ext(O::Vmaxfp, F::VX, G::VectorFloat, 4, 1034),
    ext(O::Vslo, F::VX, G::VectorPermute, 4, 1036),
    ext(O::Vsubuhm, F::VX, G::VectorInteger, 4, 1088),
    ext(O::Vavguh, F::VX, G::VectorInteger, 4, 1090),
    ext(O::Vandc, F::VX, G::VectorInteger, 4, 1092),
    ext(O::Vminfp, F::VX, G::VectorFloat, 4, 1098),
    ext(O::Vsro, F::VX, G::VectorPermute, 4, 1100),
    ext(O::Vsubuwm, F::VX, G::VectorInteger, 4, 1152),
    ext(O::Vavguw, F::VX, G::VectorInteger, 4, 1154),
    ext(O::Vor, F::VX, G::VectorInteger, 4, 1156),
    ext(O::Vxor, F::VX, G::VectorInteger, 4, 1220),
    ext(O::Vavgsb, F::VX, G::VectorInteger, 4, 1282),
    ext(O::Vnor, F::VX, G::VectorInteger, 4, 1284),
    ext(O::Vavgsh, F::VX, G::VectorInteger, 4, 1346),
    ext(O::Vsubcuw, F::VX, G::VectorInteger, 4, 1408),
    ext(O::Vavgsw, F::VX, G::VectorInteger, 4, 1410),
    ext(O::Vsububs, F::VX, G::VectorInteger, 4, 1536),
    ext(O::Mfvscr, F::VX, G::VectorControl, 4, 1540),
    ext(O::Vsum4ubs, F::VX, G::VectorInteger, 4, 1544),
    ext(O::Vsubuhs, F::VX, G::VectorInteger, 4, 1600),
    ext(O::Mtvscr, F::VX, G::VectorControl, 4, 1604),
    ext(O::Vsum4shs, F::VX, G::VectorInteger, 4, 1608),
    ext(O::Vsubuws, F::VX, G::VectorInteger, 4, 1664),
    ext(O::Vsum2sws, F::VX, G::VectorInteger, 4, 1672),
    ext(O::Vsubsbs, F::VX, G::VectorInteger, 4, 1792),
    ext(O::Vsum4sbs, F::VX, G::VectorInteger, 4, 1800),
    ext(O::Vsubshs, F::VX, G::VectorInteger, 4, 1856),
    ext(O::Vsubsws, F::VX, G::VectorInteger, 4, 1920),
    ext(O::Vsumsws, F::VX, G::VectorInteger, 4, 1928),
    // Primary 4 (VXR)
    ext(O::Vcmpequb, F::VXR, G::VectorInteger, 4, 6),
    ext(O::Vcmpequh, F::VXR, G::VectorInteger, 4, 70),
    ext(O::Vcmpequw, F::VXR, G::VectorInteger, 4, 134),
    ext(O::Vcmpeqfp, F::VXR, G::VectorFloat, 4, 198),
    ext(O::Vcmpgefp, F::VXR, G::VectorFloat, 4, 454),
    ext(O::Vcmpgtub, F::VXR, G::VectorInteger, 4, 518),
    ext(O::Vcmpgtuh, F::VXR, G::VectorInteger, 4, 582),
    ext(O::Vcmpgtuw, F::VXR, G::VectorInteger, 4, 646),
    ext(O::Vcmpgtfp, F::VXR, G::VectorFloat, 4, 710),
    ext(O::Vcmpgtsb, F::VXR, G::VectorInteger, 4, 774),
    ext(O::Vcmpgtsh, F::VXR, G::VectorInteger, 4, 838),
    ext(O::Vcmpgtsw, F::VXR, G::VectorInteger, 4, 902),
    ext(O::Vcmpbfp, F::VXR, G::VectorFloat, 4, 966),
    // Primary 4 (VA)
    ext(O::Vmhaddshs, F::VA, G::VectorInteger, 4, 32),
    ext(O::Vmhraddshs, F::VA, G::VectorInteger, 4, 33),
    ext(O::Vmladduhm, F::VA, G::VectorInteger, 4, 34),
    ext(O::Vmsumubm, F::VA, G::VectorInteger, 4, 36),
    ext(O::Vmsummbm, F::VA, G::VectorInteger, 4, 37),
    ext(O::Vmsumuhm, F::VA, G::VectorInteger, 4, 38),
    ext(O::Vmsumuhs, F::VA, G::VectorInteger, 4, 39),
    ext(O::Vmsumshm, F::VA, G::VectorInteger, 4, 40),
    ext(O::Vmsumshs, F::VA, G::VectorInteger, 4, 41),
    ext(O::Vsel, F::VA, G::VectorInteger, 4, 42),
    ext(O::Vperm, F::VA, G::VectorPermute, 4, 43),
    ext(O::Vsldoi, F::VA, G::VectorPermute, 4, 44),
    ext(O::Vmaddfp, F::VA, G::VectorFloat, 4, 46),
    ext(O::Vnmsubfp, F::VA, G::VectorFloat, 4, 47),
    // Primary 4 (VMX128 loads/stores and vsldoi128)
    ext(O::Lvsl128, F::VX128_1, G::VectorLoad, 4, 3),
    ext(O::Lvsr128, F::VX128_1, G::VectorLoad, 4, 67),
    ext(O::Lvewx128, F::VX128_1, G::VectorLoad, 4, 131),
    ext(O::Lvx128, F::VX128_1, G::VectorLoad, 4, 195),
    ext(O::Stvewx128, F::VX128_1, G::VectorStore, 4, 387),
    ext(O::Stvx128, F::VX128_1, G::VectorStore, 4, 451),
    ext(O::Lvxl128, F::VX128_1, G::VectorLoad, 4, 707),
    ext(O::Stvxl128, F::VX128_1, G::VectorStore, 4, 963),
    ext(O::Lvlx128, F::VX128_1, G::VectorLoad, 4, 1027),
    ext(O::Lvrx128, F::VX128_1, G::VectorLoad, 4, 1091),
    ext(O::Stvlx128, F::VX128_1, G::VectorStore, 4, 1283),
    ext(O::Stvrx128, F::VX128_1, G::VectorStore, 4, 1347),
    ext(O::Lvlxl128, F::VX128_1, G::VectorLoad, 4, 1539),
    ext(O::Lvrxl128, F::VX128_1, G::VectorLoad, 4, 1603),
    ext(O::Stvlxl128, F::VX128_1, G::VectorStore, 4, 1795),
    ext(O::Stvrxl128, F::VX128_1, G::VectorStore, 4, 1859),
    ext(O::Vsldoi128, F::VX128_5, G::VectorPermute, 4, 16),
    // Primary 5 (VMX128)
    ext(O::Vperm128, F::VX128_2, G::VectorPermute, 5, 0),
    ext(O::Vaddfp128, F::VX128, G::VectorFloat, 5, 16),
    ext(O::Vsubfp128, F::VX128, G::VectorFloat, 5, 80),
    ext(O::Vmulfp128, F::VX128, G::VectorFloat, 5, 144),
    ext(O::Vmaddfp128, F::VX128, G::VectorFloat, 5, 208),
    ext(O::Vmaddcfp128, F::VX128, G::VectorFloat, 5, 272),
    ext(O::Vnmsubfp128, F::VX128, G::VectorFloat, 5, 336),
    ext(O::Vmsum3fp128, F::VX128, G::VectorFloat, 5, 400),
    ext(O::Vmsum4fp128, F::VX128, G::VectorFloat, 5, 464),
    ext(O::Vpkshss128, F::VX128, G::VectorPermute, 5, 512),
    ext(O::Vand128, F::VX128, G::VectorInteger, 5, 528),
    ext(O::Vpkshus128, F::VX128, G::VectorPermute, 5, 576),
    ext(O::Vandc128, F::VX128, G::VectorInteger, 5, 592),
    ext(O::Vpkswss128, F::VX128, G::VectorPermute, 5, 640),
    ext(O::Vnor128, F::VX128, G::VectorInteger, 5, 656),
    ext(O::Vpkswus128, F::VX128, G::VectorPermute, 5, 704),
    ext(O::Vor128, F::VX128, G::VectorInteger, 5, 720),
    ext(O::Vpkuhum128, F::VX128, G::VectorPermute, 5, 768),
    ext(O::Vxor128, F::VX128, G::VectorInteger, 5, 784),
    ext(O::Vpkuhus128, F::VX128, G::VectorPermute, 5, 832),
    ext(O::Vsel128, F::VX128, G::VectorInteger, 5, 848),
    ext(O::Vpkuwum128, F::VX128, G::VectorPermute, 5, 896),
    ext(O::Vslo128, F::VX128, G::VectorPermute, 5, 912),
    ext(O::Vpkuwus128, F::VX128, G::VectorPermute, 5, 960),
    ext(O::Vsro128, F::VX128, G::VectorPermute, 5, 976),
    // Primary 6 (VMX128)
    ext(O::Vpermwi128, F::VX128_P, G::VectorPermute, 6, 528),
    ext(O::Vcfpsxws128, F::VX128_3, G::VectorFloat, 6, 560),
    ext(O::Vcfpuxws128, F::VX128_3, G::VectorFloat, 6, 624),
    ext(O::Vcsxwfp128, F::VX128_3, G::VectorFloat, 6, 688),
    ext(O::Vcuxwfp128, F::VX128_3, G::VectorFloat, 6, 752),
    ext(O::Vrfim128, F::VX128_3, G::VectorFloat, 6, 816),
    ext(O::Vrfin128, F::VX128_3, G::VectorFloat, 6, 880),
    ext(O::Vrfip128, F::VX128_3, G::VectorFloat, 6, 944),
    ext(O::Vrfiz128, F::VX128_3, G::VectorFloat, 6, 1008),
    ext(O::Vpkd3d128, F::VX128_4, G::VectorPermute, 6, 1552),
    ext(O::Vrefp128, F::VX128_3, G::VectorFloat, 6, 1584),
    ext(O::Vrsqrtefp128, F::VX128_3, G::VectorFloat, 6, 1648),
    ext(O::Vexptefp128, F::VX128_3, G::VectorFloat, 6, 1712),
    ext(O::Vlogefp128, F::VX128_3, G::VectorFloat, 6, 1776),
    ext(O::Vrlimi128, F::VX128_4, G::VectorPermute, 6, 1808),
    ext(O::Vspltw128, F::VX128_3, G::VectorPermute, 6, 1840),
    ext(O::Vspltisw128, F::VX128_3, G::VectorPermute, 6, 1904),
    ext(O::Vupkd3d128, F::VX128_3, G::VectorPermute, 6, 2032),
    ext(O::Vcmpeqfp128, F::VX128_R, G::VectorFloat, 6, 0),
    ext(O::Vcmpgefp128, F::VX128_R, G::VectorFloat, 6, 128),
    ext(O::Vcmpgtfp128, F::VX128_R, G::VectorFloat, 6, 256),
    ext(O::Vcmpbfp128, F::VX128_R, G::VectorFloat, 6, 384),
    ext(O::Vcmpequw128, F::VX128_R, G::VectorInteger, 6, 512),
    ext(O::Vrlw128, F::VX128, G::VectorInteger, 6, 80),
    ext(O::Vslw128, F::VX128, G::VectorInteger, 6, 208),
    ext(O::Vsraw128, F::VX128, G::VectorInteger, 6, 336),
    ext(O::Vsrw128, F::VX128, G::VectorInteger, 6, 464),
    ext(O::Vmaxfp128, F::VX128, G::VectorFloat, 6, 640),
    ext(O::Vminfp128, F::VX128, G::VectorFloat, 6, 704),
    ext(O::Vmrghw128, F::VX128, G::VectorPermute, 6, 768),
    ext(O::Vmrglw128, F::VX128, G::VectorPermute, 6, 832),
    ext(O::Vupkhsb128, F::VX128, G::VectorPermute, 6, 896),
    ext(O::Vupklsb128, F::VX128, G::VectorPermute, 6, 960),
];

/// Static descriptors for the simplified mnemonics produced after decoding.
static SIMPLIFIED_INFOS: &[OpcodeInfo] = &[
    op(O::Bl, F::I, G::Branch, 18),
    op(O::Bcl, F::B, G::Branch, 16),
    ext(O::Blr, F::XL, G::Branch, 19, 16),
    ext(O::Blrl, F::XL, G::Branch, 19, 16),
    ext(O::Bctr, F::XL, G::Branch, 19, 528),
    ext(O::Bctrl, F::XL, G::Branch, 19, 528),
    op(O::Nop, F::D, G::IntLogical, 24),
    op(O::Li, F::D, G::IntArithmetic, 14),
    op(O::Lis, F::D, G::IntArithmetic, 15),
    ext(O::Mr, F::X, G::IntLogical, 31, 444),
    ext(O::Mflr, F::XFX, G::SpecialRegister, 31, 339),
    ext(O::Mfctr, F::XFX, G::SpecialRegister, 31, 339),
    ext(O::Mtlr, F::XFX, G::SpecialRegister, 31, 467),
    ext(O::Mtctr, F::XFX, G::SpecialRegister, 31, 467),
];

/// Process-wide lookup table.
pub struct OpcodeTable {
    primary_only: [Option<&'static OpcodeInfo>; 64],
    extended: HashMap<(u8, ExtendedField, u16), &'static OpcodeInfo>,
    candidates: [Vec<ExtendedField>; 64],
    by_opcode: HashMap<Opcode, &'static OpcodeInfo>,
}

impl OpcodeTable {
    fn build() -> Self {
        let mut table = Self {
            primary_only: [None; 64],
            extended: HashMap::with_capacity(OPCODE_INFOS.len()),
            candidates: std::array::from_fn(|_| Vec::new()),
            by_opcode: HashMap::with_capacity(OPCODE_INFOS.len() + SIMPLIFIED_INFOS.len()),
        };

        for primary in 0u8..64 {
            table.candidates[primary as usize] = probe_order(primary);
        }

        for info in OPCODE_INFOS.iter() {
            match info.format.extended_field() {
                Some(field) if info.has_extended => {
                    let previous = table.extended.insert((info.primary, field, info.extended), info);
                    debug_assert!(previous.is_none(), "duplicate opcode entry for {}", info.mnemonic);
                }
                _ => table.primary_only[info.primary as usize] = Some(info),
            }
            table.by_opcode.insert(info.opcode, info);
        }
        for info in SIMPLIFIED_INFOS.iter() {
            table.by_opcode.insert(info.opcode, info);
        }

        log::debug!(
            "Opcode table built: {} extended entries, {} total descriptors",
            table.extended.len(),
            table.by_opcode.len()
        );
        table
    }

    /// Look up the descriptor for a raw word.
    pub fn lookup(&self, raw: u32) -> &'static OpcodeInfo {
        let primary: u8 = ((raw >> 26) & 0x3F) as u8;
        if let Some(info) = self.primary_only[primary as usize] {
            return info;
        }
        for &field in self.candidates[primary as usize].iter() {
            let xo: u16 = field.extract(raw);
            if let Some(info) = self.extended.get(&(primary, field, xo)) {
                return info;
            }
        }
        &UNKNOWN_INFO
    }

    /// Descriptor for an opcode identity (including simplified mnemonics).
    pub fn info(&self, opcode: Opcode) -> &'static OpcodeInfo {
        self.by_opcode.get(&opcode).copied().unwrap_or(&UNKNOWN_INFO)
    }

    /// Number of encodings reachable through [`OpcodeTable::lookup`].
    pub fn len(&self) -> usize {
        self.extended.len() + self.primary_only.iter().filter(|entry| entry.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Extended-field kinds probed for a primary opcode, most specific first.
fn probe_order(primary: u8) -> Vec<ExtendedField> {
    let forms: &[Format] = match primary {
        4 => &[F::VX, F::VXR, F::VA, F::VX128_1, F::VX128_5],
        5 => &[F::VX128, F::VX128_2],
        6 => &[F::VX128_3, F::VX128_4, F::VX128_P, F::VX128_R, F::VX128],
        19 => &[F::XL],
        30 => &[F::MDS, F::MD],
        31 => &[F::XO, F::X, F::XS],
        58 | 62 => &[F::DS],
        59 => &[F::A],
        63 => &[F::A, F::X],
        _ => &[],
    };
    let mut fields: Vec<ExtendedField> = Vec::with_capacity(forms.len());
    for form in forms {
        if let Some(field) = form.extended_field() {
            if !fields.contains(&field) {
                fields.push(field);
            }
        }
    }
    fields
}

static OPCODE_TABLE: OnceLock<OpcodeTable> = OnceLock::new();

/// The process-wide opcode table, built on first use.
#[inline]
pub fn opcode_table() -> &'static OpcodeTable {
    OPCODE_TABLE.get_or_init(OpcodeTable::build)
}

/// Look up the static descriptor for a raw instruction word.
///
/// Deterministic: an unrecognised word always yields [`UNKNOWN_INFO`].
#[inline]
pub fn lookup_opcode(raw: u32) -> &'static OpcodeInfo {
    opcode_table().lookup(raw)
}
