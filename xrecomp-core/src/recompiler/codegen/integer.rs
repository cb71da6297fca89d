//! Integer Code Generation
//!
//! Arithmetic, logical, compare, rotate and shift instructions. GPRs are `u64`
//! values; word-sized operations act on the low 32 bits and sign-extend their
//! result where the architecture does.
//!
//! Carry-producing forms update `xer.ca` before writing the destination so
//! that `rD == rA` reads the original operand. Record forms compare the
//! low word of the result against zero into cr0.

use super::builder::BuilderContext;
use crate::recompiler::decoder::{rotate_mask64, Instruction, Opcode, OpcodeGroup};

#[inline]
fn hex64(value: u64) -> String {
    format!("0x{:X}u64", value)
}

/// Sign-extended 16-bit immediate as a `u64` literal.
#[inline]
fn simm64(insn: &Instruction) -> String {
    hex64(insn.simm() as i64 as u64)
}

/// Shifted 16-bit immediate of `addis`/`lis`.
#[inline]
fn shifted_simm64(insn: &Instruction) -> String {
    hex64(((insn.simm() as i64) << 16) as u64)
}

/// Translate an integer instruction.
///
/// # Returns
/// `bool` - `false` if no builder exists for the opcode
pub fn build(builder: &mut BuilderContext<'_>) -> bool {
    match builder.insn.group() {
        OpcodeGroup::IntArithmetic => build_arithmetic(builder),
        OpcodeGroup::IntLogical => build_logical(builder),
        OpcodeGroup::IntCompare => build_compare(builder),
        OpcodeGroup::IntRotate => build_rotate(builder),
        OpcodeGroup::IntShift => build_shift(builder),
        _ => false,
    }
}

fn build_arithmetic(builder: &mut BuilderContext<'_>) -> bool {
    let insn: Instruction = builder.insn;
    // Overflow-enable forms would need XER[OV] tracking.
    if insn.format == crate::recompiler::decoder::Format::XO && insn.oe() {
        return false;
    }
    let rd: String = builder.r(insn.rd());
    let ra: String = builder.r(insn.ra());
    let rb: String = builder.r(insn.rb());
    let xer: String = builder.xer();

    match insn.opcode {
        Opcode::Li => builder.line(format!("{} = {};", rd, simm64(&insn))),
        Opcode::Lis => builder.line(format!("{} = {};", rd, shifted_simm64(&insn))),
        Opcode::Addi => builder.line(format!("{} = {}.wrapping_add({});", rd, ra, simm64(&insn))),
        Opcode::Addis => {
            builder.line(format!("{} = {}.wrapping_add({});", rd, ra, shifted_simm64(&insn)))
        }
        Opcode::Addic | Opcode::AddicRc => {
            let imm: String = simm64(&insn);
            builder.line(format!(
                "{}.ca = ({} as u32).overflowing_add({} as u32).1;",
                xer, ra, imm
            ));
            builder.line(format!("{} = {}.wrapping_add({});", rd, ra, imm));
            if insn.opcode == Opcode::AddicRc {
                builder.record_cr0(&rd);
            }
            return true;
        }
        Opcode::Subfic => {
            let imm: String = simm64(&insn);
            builder.line(format!("{}.ca = ({} as u32) <= ({} as u32);", xer, ra, imm));
            builder.line(format!("{} = {}.wrapping_sub({});", rd, imm, ra));
        }
        Opcode::Mulli => builder.line(format!(
            "{} = ({} as i64).wrapping_mul({}) as u64;",
            rd,
            ra,
            insn.simm()
        )),
        Opcode::Add => builder.line(format!("{} = {}.wrapping_add({});", rd, ra, rb)),
        Opcode::Addc => builder.line(format!("{} = ppc_addc(&mut {}, {}, {});", rd, xer, ra, rb)),
        Opcode::Adde => builder.line(format!("{} = ppc_adde(&mut {}, {}, {});", rd, xer, ra, rb)),
        Opcode::Addme => builder.line(format!("{} = ppc_adde(&mut {}, {}, u64::MAX);", rd, xer, ra)),
        Opcode::Addze => builder.line(format!("{} = ppc_adde(&mut {}, {}, 0);", rd, xer, ra)),
        Opcode::Subf => builder.line(format!("{} = {}.wrapping_sub({});", rd, rb, ra)),
        Opcode::Subfc => {
            builder.line(format!("{}.ca = true;", xer));
            builder.line(format!("{} = ppc_adde(&mut {}, !{}, {});", rd, xer, ra, rb));
        }
        Opcode::Subfe => builder.line(format!("{} = ppc_adde(&mut {}, !{}, {});", rd, xer, ra, rb)),
        Opcode::Subfme => builder.line(format!("{} = ppc_adde(&mut {}, !{}, u64::MAX);", rd, xer, ra)),
        Opcode::Subfze => builder.line(format!("{} = ppc_adde(&mut {}, !{}, 0);", rd, xer, ra)),
        Opcode::Neg => builder.line(format!("{} = ({} as i64).wrapping_neg() as u64;", rd, ra)),
        Opcode::Mullw => builder.line(format!(
            "{} = ({} as i32 as i64).wrapping_mul({} as i32 as i64) as u64;",
            rd, ra, rb
        )),
        Opcode::Mulhw => builder.line(format!(
            "{} = ((({} as i32 as i64) * ({} as i32 as i64)) >> 32) as u64;",
            rd, ra, rb
        )),
        Opcode::Mulhwu => builder.line(format!(
            "{} = (({} as u32 as u64) * ({} as u32 as u64)) >> 32;",
            rd, ra, rb
        )),
        Opcode::Mulld => builder.line(format!("{} = {}.wrapping_mul({});", rd, ra, rb)),
        Opcode::Mulhd => builder.line(format!(
            "{} = ((({} as i64 as i128) * ({} as i64 as i128)) >> 64) as u64;",
            rd, ra, rb
        )),
        Opcode::Mulhdu => builder.line(format!(
            "{} = ((({} as u128) * ({} as u128)) >> 64) as u64;",
            rd, ra, rb
        )),
        // Division by zero is undefined on the guest; the host must not trap.
        Opcode::Divw => builder.line(format!(
            "{} = if {} as i32 == 0 {{ 0 }} else {{ ({} as i32).wrapping_div({} as i32) as u32 as u64 }};",
            rd, rb, ra, rb
        )),
        Opcode::Divwu => builder.line(format!(
            "{} = ({} as u32).checked_div({} as u32).unwrap_or(0) as u64;",
            rd, ra, rb
        )),
        Opcode::Divd => builder.line(format!(
            "{} = if {} == 0 {{ 0 }} else {{ ({} as i64).wrapping_div({} as i64) as u64 }};",
            rd, rb, ra, rb
        )),
        Opcode::Divdu => builder.line(format!("{} = {}.checked_div({}).unwrap_or(0);", rd, ra, rb)),
        _ => return false,
    }
    if insn.records() {
        builder.record_cr0(&rd);
    }
    true
}

fn build_logical(builder: &mut BuilderContext<'_>) -> bool {
    let insn: Instruction = builder.insn;
    if insn.opcode == Opcode::Nop {
        return true;
    }
    let ra: String = builder.r(insn.ra());
    let rs: String = builder.r(insn.rs());
    let rb: String = builder.r(insn.rb());
    let uimm: u64 = insn.uimm() as u64;

    let value: String = match insn.opcode {
        Opcode::Ori => format!("{} | {}", rs, hex64(uimm)),
        Opcode::Oris => format!("{} | {}", rs, hex64(uimm << 16)),
        Opcode::Xori => format!("{} ^ {}", rs, hex64(uimm)),
        Opcode::Xoris => format!("{} ^ {}", rs, hex64(uimm << 16)),
        Opcode::AndiRc => format!("{} & {}", rs, hex64(uimm)),
        Opcode::AndisRc => format!("{} & {}", rs, hex64(uimm << 16)),
        Opcode::And => format!("{} & {}", rs, rb),
        Opcode::Andc => format!("{} & !{}", rs, rb),
        Opcode::Or => format!("{} | {}", rs, rb),
        Opcode::Orc => format!("{} | !{}", rs, rb),
        Opcode::Mr => rs.clone(),
        Opcode::Xor => format!("{} ^ {}", rs, rb),
        Opcode::Nand => format!("!({} & {})", rs, rb),
        Opcode::Nor => format!("!({} | {})", rs, rb),
        Opcode::Eqv => format!("!({} ^ {})", rs, rb),
        Opcode::Extsb => format!("{} as i8 as i64 as u64", rs),
        Opcode::Extsh => format!("{} as i16 as i64 as u64", rs),
        Opcode::Extsw => format!("{} as i32 as i64 as u64", rs),
        Opcode::Cntlzw => format!("({} as u32).leading_zeros() as u64", rs),
        Opcode::Cntlzd => format!("{}.leading_zeros() as u64", rs),
        _ => return false,
    };
    builder.line(format!("{} = {};", ra, value));
    if insn.records() || matches!(insn.opcode, Opcode::AndiRc | Opcode::AndisRc) {
        builder.record_cr0(&ra);
    }
    true
}

fn build_compare(builder: &mut BuilderContext<'_>) -> bool {
    let insn: Instruction = builder.insn;
    let field: String = builder.cr(insn.crfd());
    let ra: String = builder.r(insn.ra());
    let rb: String = builder.r(insn.rb());
    let xer: String = builder.xer();
    let wide: bool = insn.cmp_l();

    let (kind, lhs, rhs): (&str, String, String) = match (insn.opcode, wide) {
        (Opcode::Cmp, false) => ("i32", format!("{} as i32", ra), format!("{} as i32", rb)),
        (Opcode::Cmp, true) => ("i64", format!("{} as i64", ra), format!("{} as i64", rb)),
        (Opcode::Cmpl, false) => ("u32", format!("{} as u32", ra), format!("{} as u32", rb)),
        (Opcode::Cmpl, true) => ("u64", ra.clone(), rb.clone()),
        (Opcode::Cmpi, false) => ("i32", format!("{} as i32", ra), insn.simm().to_string()),
        (Opcode::Cmpi, true) => ("i64", format!("{} as i64", ra), insn.simm().to_string()),
        (Opcode::Cmpli, false) => ("u32", format!("{} as u32", ra), format!("0x{:X}", insn.uimm())),
        (Opcode::Cmpli, true) => ("u64", ra.clone(), format!("0x{:X}", insn.uimm())),
        _ => return false,
    };
    builder.line(format!("{}.compare_{}({}, {}, &{});", field, kind, lhs, rhs, xer));
    true
}

/// Rotate source of the word rotates: the low word replicated into both halves.
fn doubled_word(rs: &str) -> String {
    format!("(({0} & 0xFFFF_FFFF) | ({0} << 32))", rs)
}

fn build_rotate(builder: &mut BuilderContext<'_>) -> bool {
    let insn: Instruction = builder.insn;
    let ra: String = builder.r(insn.ra());
    let rs: String = builder.r(insn.rs());
    let rb: String = builder.r(insn.rb());
    let word_mask: u64 = rotate_mask64(insn.mb() + 32, insn.me() + 32);
    let sh64: u8 = insn.sh64();
    let mb64: u8 = insn.mb64();

    match insn.opcode {
        Opcode::Rlwinm => builder.line(format!(
            "{} = {}.rotate_left({}) & {};",
            ra,
            doubled_word(&rs),
            insn.sh(),
            hex64(word_mask)
        )),
        Opcode::Rlwnm => builder.line(format!(
            "{} = {}.rotate_left(({} & 0x1F) as u32) & {};",
            ra,
            doubled_word(&rs),
            rb,
            hex64(word_mask)
        )),
        Opcode::Rlwimi => builder.line(format!(
            "{} = ({}.rotate_left({}) & {}) | ({} & {});",
            ra,
            doubled_word(&rs),
            insn.sh(),
            hex64(word_mask),
            ra,
            hex64(!word_mask)
        )),
        Opcode::Rldicl => builder.line(format!(
            "{} = {}.rotate_left({}) & {};",
            ra,
            rs,
            sh64,
            hex64(rotate_mask64(mb64, 63))
        )),
        Opcode::Rldicr => builder.line(format!(
            "{} = {}.rotate_left({}) & {};",
            ra,
            rs,
            sh64,
            hex64(rotate_mask64(0, mb64))
        )),
        Opcode::Rldic => builder.line(format!(
            "{} = {}.rotate_left({}) & {};",
            ra,
            rs,
            sh64,
            hex64(rotate_mask64(mb64, 63 - sh64))
        )),
        Opcode::Rldimi => {
            let mask: u64 = rotate_mask64(mb64, 63 - sh64);
            builder.line(format!(
                "{} = ({}.rotate_left({}) & {}) | ({} & {});",
                ra,
                rs,
                sh64,
                hex64(mask),
                ra,
                hex64(!mask)
            ));
        }
        Opcode::Rldcl => builder.line(format!(
            "{} = {}.rotate_left(({} & 0x3F) as u32) & {};",
            ra,
            rs,
            rb,
            hex64(rotate_mask64(mb64, 63))
        )),
        Opcode::Rldcr => builder.line(format!(
            "{} = {}.rotate_left(({} & 0x3F) as u32) & {};",
            ra,
            rs,
            rb,
            hex64(rotate_mask64(0, mb64))
        )),
        _ => return false,
    }
    if insn.records() {
        builder.record_cr0(&ra);
    }
    true
}

fn build_shift(builder: &mut BuilderContext<'_>) -> bool {
    let insn: Instruction = builder.insn;
    let ra: String = builder.r(insn.ra());
    let rs: String = builder.r(insn.rs());
    let rb: String = builder.r(insn.rb());
    let xer: String = builder.xer();

    match insn.opcode {
        Opcode::Slw => builder.line(format!(
            "{} = if {} & 0x20 != 0 {{ 0 }} else {{ (({} as u32) << ({} & 0x1F)) as u64 }};",
            ra, rb, rs, rb
        )),
        Opcode::Srw => builder.line(format!(
            "{} = if {} & 0x20 != 0 {{ 0 }} else {{ (({} as u32) >> ({} & 0x1F)) as u64 }};",
            ra, rb, rs, rb
        )),
        Opcode::Sld => builder.line(format!(
            "{} = if {} & 0x40 != 0 {{ 0 }} else {{ {} << ({} & 0x3F) }};",
            ra, rb, rs, rb
        )),
        Opcode::Srd => builder.line(format!(
            "{} = if {} & 0x40 != 0 {{ 0 }} else {{ {} >> ({} & 0x3F) }};",
            ra, rb, rs, rb
        )),
        Opcode::Sraw => builder.line(format!("{} = ppc_sraw(&mut {}, {}, {} & 0x3F);", ra, xer, rs, rb)),
        Opcode::Srad => builder.line(format!("{} = ppc_srad(&mut {}, {}, {} & 0x7F);", ra, xer, rs, rb)),
        Opcode::Srawi => {
            let sh: u8 = insn.sh();
            let lost: u32 = (1u32 << sh).wrapping_sub(1);
            builder.line(format!(
                "{}.ca = ({} as i32) < 0 && ({} as u32) & 0x{:X} != 0;",
                xer, rs, rs, lost
            ));
            builder.line(format!("{} = (({} as i32) >> {}) as i64 as u64;", ra, rs, sh));
        }
        Opcode::Sradi => {
            let sh: u8 = insn.sh64();
            let lost: u64 = if sh == 0 { 0 } else { u64::MAX >> (64 - sh as u32) };
            builder.line(format!(
                "{}.ca = ({} as i64) < 0 && {} & {} != 0;",
                xer,
                rs,
                rs,
                hex64(lost)
            ));
            builder.line(format!("{} = (({} as i64) >> {}) as u64;", ra, rs, sh));
        }
        _ => return false,
    }
    if insn.records() {
        builder.record_cr0(&ra);
    }
    true
}
