//! Floating-Point Code Generation
//!
//! FPRs are `f64`. Single-precision forms round their result through `f32`.
//! Arithmetic establishes the scalar flush mode first; moves and compares do
//! not depend on it.

use super::builder::{BuilderContext, CsrState};
use crate::recompiler::decoder::{Instruction, Opcode, OpcodeGroup};

/// Translate a floating-point instruction.
///
/// # Returns
/// `bool` - `false` if no builder exists for the opcode
pub fn build(builder: &mut BuilderContext<'_>) -> bool {
    let built: bool = match builder.insn.group() {
        OpcodeGroup::FloatArithmetic => build_arithmetic(builder),
        OpcodeGroup::FloatMove => build_move(builder),
        OpcodeGroup::FloatCompare => build_compare(builder),
        OpcodeGroup::FloatControl => build_control(builder),
        _ => false,
    };
    if built && builder.insn.records() {
        // Record forms copy the FPSCR exception summary into cr1.
        let cr1: String = builder.cr(1);
        builder.line(format!("{}.set_bits(ctx.fpscr.field(0));", cr1));
    }
    built
}

fn single(expression: String) -> String {
    format!("({}) as f32 as f64", expression)
}

fn build_arithmetic(builder: &mut BuilderContext<'_>) -> bool {
    let insn: Instruction = builder.insn;
    let fa: String = builder.f(insn.ra());
    let fb: String = builder.f(insn.rb());
    let fc: String = builder.f(insn.rc_field());

    let value: String = match insn.opcode {
        Opcode::Fadd => format!("{} + {}", fa, fb),
        Opcode::Fadds => single(format!("{} + {}", fa, fb)),
        Opcode::Fsub => format!("{} - {}", fa, fb),
        Opcode::Fsubs => single(format!("{} - {}", fa, fb)),
        Opcode::Fmul => format!("{} * {}", fa, fc),
        Opcode::Fmuls => single(format!("{} * {}", fa, fc)),
        Opcode::Fdiv => format!("{} / {}", fa, fb),
        Opcode::Fdivs => single(format!("{} / {}", fa, fb)),
        Opcode::Fsqrt => format!("{}.sqrt()", fb),
        Opcode::Fsqrts => single(format!("{}.sqrt()", fb)),
        Opcode::Fres => single(format!("1.0 / {}", fb)),
        Opcode::Frsqrte => format!("1.0 / {}.sqrt()", fb),
        Opcode::Fsel => format!("if {} >= 0.0 {{ {} }} else {{ {} }}", fa, fc, fb),
        Opcode::Fmadd => format!("{}.mul_add({}, {})", fa, fc, fb),
        Opcode::Fmadds => single(format!("{}.mul_add({}, {})", fa, fc, fb)),
        Opcode::Fmsub => format!("{}.mul_add({}, -{})", fa, fc, fb),
        Opcode::Fmsubs => single(format!("{}.mul_add({}, -{})", fa, fc, fb)),
        Opcode::Fnmadd => format!("-{}.mul_add({}, {})", fa, fc, fb),
        Opcode::Fnmadds => single(format!("-{}.mul_add({}, {})", fa, fc, fb)),
        Opcode::Fnmsub => format!("-{}.mul_add({}, -{})", fa, fc, fb),
        Opcode::Fnmsubs => single(format!("-{}.mul_add({}, -{})", fa, fc, fb)),
        Opcode::Frsp => format!("{} as f32 as f64", fb),
        // Integer conversions follow the guest's saturation and NaN rules.
        Opcode::Fctiw => format!("f64::from_bits(ppc_fctiw(&ctx.fpscr, {}) as u64)", fb),
        Opcode::Fctiwz => format!("f64::from_bits(ppc_fctiwz({}) as u64)", fb),
        Opcode::Fctid => format!("f64::from_bits(ppc_fctid(&ctx.fpscr, {}) as u64)", fb),
        Opcode::Fctidz => format!("f64::from_bits(ppc_fctidz({}) as u64)", fb),
        Opcode::Fcfid => format!("{}.to_bits() as i64 as f64", fb),
        _ => return false,
    };
    builder.require_csr(CsrState::ScalarFloat);
    let fd: String = builder.f(insn.rd());
    builder.line(format!("{} = {};", fd, value));
    true
}

fn build_move(builder: &mut BuilderContext<'_>) -> bool {
    let insn: Instruction = builder.insn;
    let fb: String = builder.f(insn.rb());
    let value: String = match insn.opcode {
        Opcode::Fmr => fb,
        Opcode::Fneg => format!("-{}", fb),
        Opcode::Fabs => format!("{}.abs()", fb),
        Opcode::Fnabs => format!("-{}.abs()", fb),
        _ => return false,
    };
    let fd: String = builder.f(insn.rd());
    builder.line(format!("{} = {};", fd, value));
    true
}

fn build_compare(builder: &mut BuilderContext<'_>) -> bool {
    let insn: Instruction = builder.insn;
    if !matches!(insn.opcode, Opcode::Fcmpu | Opcode::Fcmpo) {
        return false;
    }
    let field: String = builder.cr(insn.crfd());
    let fa: String = builder.f(insn.ra());
    let fb: String = builder.f(insn.rb());
    builder.line(format!("{}.compare_f64({}, {});", field, fa, fb));
    true
}

fn build_control(builder: &mut BuilderContext<'_>) -> bool {
    let insn: Instruction = builder.insn;
    match insn.opcode {
        Opcode::Mffs => {
            let fd: String = builder.f(insn.rd());
            builder.line(format!("{} = f64::from_bits(ctx.fpscr.load() as u64);", fd));
            return true;
        }
        Opcode::Mcrfs => {
            let field: String = builder.cr(insn.crfd());
            builder.line(format!("{}.set_bits(ctx.fpscr.field({}));", field, insn.crfs()));
            return true;
        }
        Opcode::Mtfsf => {
            let fb: String = builder.f(insn.rb());
            builder.line(format!(
                "ctx.fpscr.store_masked({}.to_bits() as u32, 0x{:02X});",
                fb,
                insn.fm()
            ));
        }
        Opcode::Mtfsfi => {
            let imm: u32 = (insn.raw >> 12) & 0xF;
            builder.line(format!("ctx.fpscr.set_field({}, 0x{:X});", insn.crfd(), imm));
        }
        Opcode::Mtfsb0 => builder.line(format!("ctx.fpscr.set_bit({}, false);", insn.rd())),
        Opcode::Mtfsb1 => builder.line(format!("ctx.fpscr.set_bit({}, true);", insn.rd())),
        _ => return false,
    }
    // The guest rewrote FPSCR; the flush mode is no longer known.
    builder.csr.reset();
    true
}
