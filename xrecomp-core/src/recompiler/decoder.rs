//! PowerPC / VMX128 Instruction Decoder
//!
//! This module maps a raw 32-bit big-endian word to a structured [`Instruction`].
//! Decoding is total: words that match no known encoding decode to
//! [`Opcode::Unknown`] with [`Format::Unknown`] instead of failing, and downstream
//! passes treat that sentinel as a data boundary.
//!
//! # Decoding Algorithm
//! 1. Extract primary opcode (bits 26-31)
//! 2. For primaries with an extended opcode, try each candidate format of that
//!    primary in a fixed order, extracting the extended field at the format's bit
//!    position and probing the one-time built opcode table
//! 3. Compute the absolute branch target for I/B-form branches
//! 4. Apply the simplified-mnemonic rewrites (`blr`, `nop`, `li`, `mflr`, ...)
//!
//! # Memory Layout
//! An [`Instruction`] is a small `Copy` record: the raw word plus the resolved
//! opcode identity. Operand fields are never stored; the accessors in
//! [`fields`](self) extract them with shift/mask arithmetic on demand, so one
//! canonical record serves every format.

mod fields;
pub mod opcodes;
mod semantics;

pub use fields::{rotate_mask32, rotate_mask64};
pub use opcodes::{lookup_opcode, opcode_table, Format, Opcode, OpcodeGroup, OpcodeInfo};
pub use semantics::{BranchKind, Semantics};

use serde::Serialize;
use smallvec::SmallVec;
use std::fmt;

/// SPR number of the link register.
pub const SPR_LR: u16 = 8;
/// SPR number of the count register.
pub const SPR_CTR: u16 = 9;
/// SPR number of the fixed-point exception register.
pub const SPR_XER: u16 = 1;
/// BO encoding meaning "branch always".
pub const BO_ALWAYS: u8 = 0x14;

/// Decoded PowerPC instruction.
///
/// Created once per [`decode`] call and never mutated afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Instruction {
    /// Address this word was fetched from.
    pub address: u32,
    /// Raw 32-bit instruction word.
    pub raw: u32,
    pub opcode: Opcode,
    pub format: Format,
    /// Resolved absolute target of a direct (I/B-form) branch.
    pub target: Option<u32>,
    group: OpcodeGroup,
}

/// Operand view used for disassembly text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Operand {
    Gpr(u8),
    Fpr(u8),
    Vr(u8),
    CrField(u8),
    CrBit(u8),
    Spr(u16),
    Simm(i32),
    Uimm(u32),
    /// `offset(rA)` addressing; `base == 0` means the literal zero.
    Displacement { offset: i32, base: u8 },
    Target(u32),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Operand::Gpr(reg) => write!(f, "r{}", reg),
            Operand::Fpr(reg) => write!(f, "f{}", reg),
            Operand::Vr(reg) => write!(f, "v{}", reg),
            Operand::CrField(field) => write!(f, "cr{}", field),
            Operand::CrBit(bit) => write!(f, "{}", bit),
            Operand::Spr(spr) => write!(f, "{}", spr),
            Operand::Simm(value) if value < 0 => write!(f, "-0x{:X}", value.unsigned_abs()),
            Operand::Simm(value) => write!(f, "0x{:X}", value),
            Operand::Uimm(value) => write!(f, "0x{:X}", value),
            Operand::Displacement { offset, base } if offset < 0 => {
                write!(f, "-0x{:X}(r{})", offset.unsigned_abs(), base)
            }
            Operand::Displacement { offset, base } => write!(f, "0x{:X}(r{})", offset, base),
            Operand::Target(address) => write!(f, "0x{:08X}", address),
        }
    }
}

/// Decode one instruction word.
///
/// # Arguments
/// * `address` - Address the word was fetched from (used for relative branch targets)
/// * `raw` - 32-bit instruction word (already converted from big-endian)
///
/// # Returns
/// `Instruction` - Always succeeds; unrecognised words carry [`Opcode::Unknown`]
#[inline] // Hot path: called for every word discovery touches
pub fn decode(address: u32, raw: u32) -> Instruction {
    let info: &'static OpcodeInfo = lookup_opcode(raw);
    let mut insn: Instruction = Instruction {
        address,
        raw,
        opcode: info.opcode,
        format: info.format,
        target: None,
        group: info.group,
    };
    insn.target = branch_target(address, raw, info.format);
    simplify(&mut insn);
    insn
}

/// Heuristic check for words that are more likely data than code.
///
/// Zero padding, all-ones fill and words with no known encoding all qualify.
pub fn is_likely_data(raw: u32) -> bool {
    if raw == 0 || raw == 0xFFFF_FFFF {
        return true;
    }
    lookup_opcode(raw).opcode == Opcode::Unknown
}

/// Compute the absolute target of an I-form or B-form branch.
///
/// # Algorithm
/// The LI (24-bit) or BD (14-bit) field is sign-extended by XOR-then-subtract
/// against its sign bit and scaled by 4. Relative branches add the instruction
/// address; absolute branches (AA set) use the value masked to the field's range.
#[inline]
fn branch_target(address: u32, raw: u32, format: Format) -> Option<u32> {
    let (field, sign, range): (u32, u32, u32) = match format {
        Format::I => ((raw >> 2) & 0x00FF_FFFF, 0x0080_0000, 0x03FF_FFFC),
        Format::B => ((raw >> 2) & 0x3FFF, 0x2000, 0xFFFC),
        _ => return None,
    };
    let offset: i32 = ((field ^ sign).wrapping_sub(sign) as i32).wrapping_mul(4);
    if (raw >> 1) & 1 != 0 {
        Some((offset as u32) & range)
    } else {
        Some(address.wrapping_add(offset as u32))
    }
}

/// Apply the simplified-mnemonic rewrites.
fn simplify(insn: &mut Instruction) {
    let rewritten: Option<Opcode> = match insn.opcode {
        Opcode::B if insn.lk() => Some(Opcode::Bl),
        Opcode::Bc if insn.lk() => Some(Opcode::Bcl),
        Opcode::Bclr if insn.bo() & BO_ALWAYS == BO_ALWAYS => {
            Some(if insn.lk() { Opcode::Blrl } else { Opcode::Blr })
        }
        Opcode::Bcctr if insn.bo() & BO_ALWAYS == BO_ALWAYS => {
            Some(if insn.lk() { Opcode::Bctrl } else { Opcode::Bctr })
        }
        Opcode::Ori if insn.raw & 0x03FF_FFFF == 0 => Some(Opcode::Nop),
        Opcode::Addi if insn.ra() == 0 => Some(Opcode::Li),
        Opcode::Addis if insn.ra() == 0 => Some(Opcode::Lis),
        Opcode::Or if insn.rs() == insn.rb() => Some(Opcode::Mr),
        Opcode::Mfspr => match insn.spr() {
            SPR_LR => Some(Opcode::Mflr),
            SPR_CTR => Some(Opcode::Mfctr),
            _ => None,
        },
        Opcode::Mtspr => match insn.spr() {
            SPR_LR => Some(Opcode::Mtlr),
            SPR_CTR => Some(Opcode::Mtctr),
            _ => None,
        },
        _ => None,
    };
    if let Some(opcode) = rewritten {
        insn.opcode = opcode;
    }
}

impl Instruction {
    /// Decode a word; same as [`decode`].
    #[inline]
    pub fn decode(address: u32, raw: u32) -> Self {
        decode(address, raw)
    }

    /// Classification group of the (possibly simplified) opcode.
    #[inline]
    pub const fn group(&self) -> OpcodeGroup {
        self.group
    }

    /// Static descriptor of the opcode.
    pub fn info(&self) -> &'static OpcodeInfo {
        opcode_table().info(self.opcode)
    }

    #[inline]
    pub const fn primary(&self) -> u8 {
        ((self.raw >> 26) & 0x3F) as u8
    }

    #[inline]
    pub fn is_unknown(&self) -> bool {
        self.opcode == Opcode::Unknown
    }

    #[inline]
    pub fn is_return(&self) -> bool {
        self.opcode == Opcode::Blr
    }

    /// Linked branch of any kind.
    pub fn is_call(&self) -> bool {
        match self.opcode {
            Opcode::Bl | Opcode::Bcl | Opcode::Blrl | Opcode::Bctrl => true,
            Opcode::Bclr | Opcode::Bcctr => self.lk(),
            _ => false,
        }
    }

    #[inline]
    pub fn is_branch(&self) -> bool {
        self.group == OpcodeGroup::Branch
    }

    /// Conditional branch whose BO field does not encode "always".
    pub fn is_conditional(&self) -> bool {
        matches!(self.opcode, Opcode::Bc | Opcode::Bcl | Opcode::Bclr | Opcode::Bcctr)
            && self.bo() & BO_ALWAYS != BO_ALWAYS
    }

    /// Trap whose TO field traps on every comparison outcome.
    pub fn is_unconditional_trap(&self) -> bool {
        self.group == OpcodeGroup::Trap && self.to() == 31
    }

    /// Whether the word's record bit updates a condition register field.
    pub fn records(&self) -> bool {
        (self.format.has_record_bit() && self.rc()) || self.vrc()
    }

    /// Mnemonic including record, overflow, link and absolute suffixes.
    pub fn full_mnemonic(&self) -> String {
        let mut text: String = self.opcode.mnemonic().to_string();
        if self.format == Format::XO && self.oe() {
            text.push('o');
        }
        if matches!(self.opcode, Opcode::Bclr | Opcode::Bcctr) && self.lk() {
            text.push('l');
        }
        if matches!(self.format, Format::I | Format::B) && self.aa() {
            text.push('a');
        }
        if self.records() && !text.ends_with('.') && self.group != OpcodeGroup::IntStore {
            text.push('.');
        }
        text
    }

    /// Operand view of the instruction, in assembler order.
    pub fn operands(&self) -> SmallVec<[Operand; 4]> {
        use Operand::*;
        let mut ops: SmallVec<[Operand; 4]> = SmallVec::new();
        let (rd, ra, rb) = (self.rd(), self.ra(), self.rb());
        let target: u32 = self.target.unwrap_or(0);

        match self.opcode {
            Opcode::Unknown
            | Opcode::Nop
            | Opcode::Blr
            | Opcode::Blrl
            | Opcode::Bctr
            | Opcode::Bctrl
            | Opcode::Sc
            | Opcode::Rfid
            | Opcode::Sync
            | Opcode::Isync
            | Opcode::Eieio => {}
            Opcode::B | Opcode::Bl => ops.push(Target(target)),
            Opcode::Bc | Opcode::Bcl => {
                ops.extend([Uimm(self.bo() as u32), CrBit(self.bi()), Target(target)]);
            }
            Opcode::Bclr | Opcode::Bcctr => ops.extend([Uimm(self.bo() as u32), CrBit(self.bi())]),
            Opcode::Tw | Opcode::Td => ops.extend([Uimm(self.to() as u32), Gpr(ra), Gpr(rb)]),
            Opcode::Twi | Opcode::Tdi => ops.extend([Uimm(self.to() as u32), Gpr(ra), Simm(self.simm())]),
            Opcode::Mfmsr | Opcode::Mfcr | Opcode::Mflr | Opcode::Mfctr | Opcode::Mftb => ops.push(Gpr(rd)),
            Opcode::Mtmsr | Opcode::Mtmsrd | Opcode::Mtlr | Opcode::Mtctr => ops.push(Gpr(rd)),
            Opcode::Mfspr => ops.extend([Gpr(rd), Spr(self.spr())]),
            Opcode::Mtspr => ops.extend([Spr(self.spr()), Gpr(rd)]),
            Opcode::Mtcrf => ops.extend([Uimm(self.crm() as u32), Gpr(rd)]),
            Opcode::Mcrf | Opcode::Mcrfs => ops.extend([CrField(self.crfd()), CrField(self.crfs())]),
            Opcode::Li => ops.extend([Gpr(rd), Simm(self.simm())]),
            Opcode::Lis => ops.extend([Gpr(rd), Uimm(self.uimm())]),
            Opcode::Mr => ops.extend([Gpr(ra), Gpr(rd)]),
            Opcode::Cmp | Opcode::Cmpl => ops.extend([CrField(self.crfd()), Gpr(ra), Gpr(rb)]),
            Opcode::Cmpi => ops.extend([CrField(self.crfd()), Gpr(ra), Simm(self.simm())]),
            Opcode::Cmpli => ops.extend([CrField(self.crfd()), Gpr(ra), Uimm(self.uimm())]),
            Opcode::Fcmpu | Opcode::Fcmpo => ops.extend([CrField(self.crfd()), Fpr(ra), Fpr(rb)]),
            Opcode::Ori | Opcode::Oris | Opcode::Xori | Opcode::Xoris | Opcode::AndiRc | Opcode::AndisRc => {
                ops.extend([Gpr(ra), Gpr(rd), Uimm(self.uimm())]);
            }
            Opcode::Rlwinm | Opcode::Rlwimi => {
                ops.extend([Gpr(ra), Gpr(rd), Uimm(self.sh() as u32), Uimm(self.mb() as u32), Uimm(self.me() as u32)]);
            }
            Opcode::Rlwnm => {
                ops.extend([Gpr(ra), Gpr(rd), Gpr(rb), Uimm(self.mb() as u32), Uimm(self.me() as u32)]);
            }
            Opcode::Rldicl | Opcode::Rldicr | Opcode::Rldic | Opcode::Rldimi => {
                ops.extend([Gpr(ra), Gpr(rd), Uimm(self.sh64() as u32), Uimm(self.mb64() as u32)]);
            }
            Opcode::Rldcl | Opcode::Rldcr => {
                ops.extend([Gpr(ra), Gpr(rd), Gpr(rb), Uimm(self.mb64() as u32)]);
            }
            Opcode::Srawi => ops.extend([Gpr(ra), Gpr(rd), Uimm(self.sh() as u32)]),
            Opcode::Sradi => ops.extend([Gpr(ra), Gpr(rd), Uimm(self.sh64() as u32)]),
            Opcode::Extsb | Opcode::Extsh | Opcode::Extsw | Opcode::Cntlzw | Opcode::Cntlzd => {
                ops.extend([Gpr(ra), Gpr(rd)]);
            }
            Opcode::Neg | Opcode::Addme | Opcode::Addze | Opcode::Subfme | Opcode::Subfze => {
                ops.extend([Gpr(rd), Gpr(ra)]);
            }
            Opcode::Mffs => ops.push(Fpr(rd)),
            Opcode::Mtfsf => ops.extend([Uimm(self.fm() as u32), Fpr(rb)]),
            Opcode::Mtfsfi => ops.extend([CrField(self.crfd()), Uimm(((self.raw >> 12) & 0xF) as u32)]),
            Opcode::Mtfsb0 | Opcode::Mtfsb1 => ops.push(CrBit(rd)),
            Opcode::Mfvscr => ops.push(Vr(rd)),
            Opcode::Mtvscr => ops.push(Vr(rb)),
            _ => self.group_operands(&mut ops),
        }
        ops
    }

    fn group_operands(&self, ops: &mut SmallVec<[Operand; 4]>) {
        use Operand::*;
        let (rd, ra, rb) = (self.rd(), self.ra(), self.rb());
        let indexed: bool = matches!(self.format, Format::X);
        match self.group {
            OpcodeGroup::IntLoad | OpcodeGroup::IntStore if indexed => ops.extend([Gpr(rd), Gpr(ra), Gpr(rb)]),
            OpcodeGroup::FloatLoad | OpcodeGroup::FloatStore if indexed => ops.extend([Fpr(rd), Gpr(ra), Gpr(rb)]),
            OpcodeGroup::IntLoad | OpcodeGroup::IntStore => {
                let offset: i32 = if self.format == Format::DS { self.ds() } else { self.simm() };
                ops.extend([Gpr(rd), Displacement { offset, base: ra }]);
            }
            OpcodeGroup::FloatLoad | OpcodeGroup::FloatStore => {
                ops.extend([Fpr(rd), Displacement { offset: self.simm(), base: ra }]);
            }
            OpcodeGroup::Cache => ops.extend([Gpr(ra), Gpr(rb)]),
            OpcodeGroup::VectorLoad | OpcodeGroup::VectorStore => {
                let vd: u8 = if self.format == Format::VX128_1 { self.vd128() } else { rd };
                ops.extend([Vr(vd), Gpr(ra), Gpr(rb)]);
            }
            OpcodeGroup::IntArithmetic if self.format == Format::D => ops.extend([Gpr(rd), Gpr(ra), Simm(self.simm())]),
            OpcodeGroup::IntArithmetic => ops.extend([Gpr(rd), Gpr(ra), Gpr(rb)]),
            OpcodeGroup::IntLogical | OpcodeGroup::IntShift => ops.extend([Gpr(ra), Gpr(rd), Gpr(rb)]),
            OpcodeGroup::ConditionRegister => ops.extend([CrBit(rd), CrBit(ra), CrBit(rb)]),
            OpcodeGroup::FloatArithmetic | OpcodeGroup::FloatMove => match self.opcode {
                Opcode::Fmul | Opcode::Fmuls => ops.extend([Fpr(rd), Fpr(ra), Fpr(self.rc_field())]),
                Opcode::Fadd | Opcode::Fadds | Opcode::Fsub | Opcode::Fsubs | Opcode::Fdiv | Opcode::Fdivs => {
                    ops.extend([Fpr(rd), Fpr(ra), Fpr(rb)]);
                }
                _ if self.format == Format::A && !matches!(
                    self.opcode,
                    Opcode::Fsqrt | Opcode::Fsqrts | Opcode::Fres | Opcode::Frsqrte
                ) =>
                {
                    ops.extend([Fpr(rd), Fpr(ra), Fpr(self.rc_field()), Fpr(rb)]);
                }
                _ => ops.extend([Fpr(rd), Fpr(rb)]),
            },
            OpcodeGroup::VectorInteger
            | OpcodeGroup::VectorFloat
            | OpcodeGroup::VectorPermute
            | OpcodeGroup::VectorControl => self.vector_operands(ops),
            _ => {}
        }
    }

    fn vector_operands(&self, ops: &mut SmallVec<[Operand; 4]>) {
        use Operand::*;
        let (vd, va, vb) = (self.rd(), self.ra(), self.rb());
        match self.format {
            Format::VA if self.opcode == Opcode::Vsldoi => {
                ops.extend([Vr(vd), Vr(va), Vr(vb), Uimm(self.vsh() as u32)]);
            }
            Format::VA => ops.extend([Vr(vd), Vr(va), Vr(vb), Vr(self.rc_field())]),
            Format::VX | Format::VXR => match self.opcode {
                Opcode::Vspltisb | Opcode::Vspltish | Opcode::Vspltisw => {
                    ops.extend([Vr(vd), Simm(self.vsimm() as i32)]);
                }
                Opcode::Vspltb
                | Opcode::Vsplth
                | Opcode::Vspltw
                | Opcode::Vcfux
                | Opcode::Vcfsx
                | Opcode::Vctuxs
                | Opcode::Vctsxs => ops.extend([Vr(vd), Vr(vb), Uimm(self.vuimm() as u32)]),
                Opcode::Vrefp
                | Opcode::Vrsqrtefp
                | Opcode::Vexptefp
                | Opcode::Vlogefp
                | Opcode::Vrfin
                | Opcode::Vrfiz
                | Opcode::Vrfip
                | Opcode::Vrfim
                | Opcode::Vupkhsb
                | Opcode::Vupkhsh
                | Opcode::Vupklsb
                | Opcode::Vupklsh
                | Opcode::Vupkhpx
                | Opcode::Vupklpx => ops.extend([Vr(vd), Vr(vb)]),
                _ => ops.extend([Vr(vd), Vr(va), Vr(vb)]),
            },
            Format::VX128 | Format::VX128_R => {
                ops.extend([Vr(self.vd128()), Vr(self.va128()), Vr(self.vb128())]);
            }
            Format::VX128_2 => {
                ops.extend([Vr(self.vd128()), Vr(self.va128()), Vr(self.vb128()), Vr(self.vc128())]);
            }
            Format::VX128_3 if self.opcode == Opcode::Vspltisw128 => {
                ops.extend([Vr(self.vd128()), Simm(self.vsimm() as i32)]);
            }
            Format::VX128_3 => match self.opcode {
                Opcode::Vspltw128
                | Opcode::Vcfpsxws128
                | Opcode::Vcfpuxws128
                | Opcode::Vcsxwfp128
                | Opcode::Vcuxwfp128
                | Opcode::Vupkd3d128 => {
                    ops.extend([Vr(self.vd128()), Vr(self.vb128()), Uimm(self.vimm128() as u32)]);
                }
                _ => ops.extend([Vr(self.vd128()), Vr(self.vb128())]),
            },
            Format::VX128_4 => ops.extend([
                Vr(self.vd128()),
                Vr(self.vb128()),
                Uimm(self.vimm128() as u32),
                Uimm(self.vz128() as u32),
            ]),
            Format::VX128_5 => ops.extend([
                Vr(self.vd128()),
                Vr(self.va128()),
                Vr(self.vb128()),
                Uimm(self.vsh128() as u32),
            ]),
            Format::VX128_P => ops.extend([Vr(self.vd128()), Vr(self.vb128()), Uimm(self.vperm128() as u32)]),
            _ => {}
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let operands: SmallVec<[Operand; 4]> = self.operands();
        write!(f, "{}", self.full_mnemonic())?;
        for (index, operand) in operands.iter().enumerate() {
            let separator: &str = if index == 0 { " " } else { ", " };
            write!(f, "{}{}", separator, operand)?;
        }
        Ok(())
    }
}
