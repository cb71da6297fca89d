//! Vector Code Generation
//!
//! AltiVec and VMX128 arithmetic, logical, permute and compare instructions.
//! Vector registers are `Vector128` values and every operation becomes a call
//! to the `Vector128` method named after the base mnemonic (`vaddfp128` and
//! `vaddfp` both emit `.vaddfp(..)`).
//!
//! # Operand Shapes
//! - classic VX/VA/VXR forms read `vD`, `vA`, `vB`, `vC` from the 5-bit fields
//! - VMX128 forms read the 7-bit split fields; their multiply-add and select
//!   forms use `vD` as the third source
//!
//! Vector float operations establish the flush-to-zero mode first.

use super::builder::{BuilderContext, CsrState};
use crate::recompiler::decoder::{Format, Instruction, Opcode, OpcodeGroup};

/// Register operands of a vector instruction.
#[derive(Debug, Clone, Copy)]
struct VectorOperands {
    vd: u8,
    va: u8,
    vb: u8,
    vc: u8,
}

impl VectorOperands {
    fn of(insn: &Instruction) -> Self {
        match insn.format {
            Format::VX128
            | Format::VX128_2
            | Format::VX128_3
            | Format::VX128_4
            | Format::VX128_5
            | Format::VX128_P
            | Format::VX128_R => Self {
                vd: insn.vd128(),
                va: insn.va128(),
                vb: insn.vb128(),
                vc: insn.vc128(),
            },
            _ => Self {
                vd: insn.rd(),
                va: insn.ra(),
                vb: insn.rb(),
                vc: insn.rc_field(),
            },
        }
    }
}

/// `Vector128` method implementing an opcode.
fn method_name(opcode: Opcode) -> &'static str {
    match opcode {
        Opcode::Vcfpsxws128 => "vctsxs",
        Opcode::Vcfpuxws128 => "vctuxs",
        Opcode::Vcsxwfp128 => "vcfsx",
        Opcode::Vcuxwfp128 => "vcfux",
        Opcode::Vspltisw128 => "vspltisw",
        _ => {
            let mnemonic: &'static str = opcode.mnemonic();
            mnemonic.strip_suffix("128").unwrap_or(mnemonic)
        }
    }
}

/// Translate a vector instruction.
///
/// # Returns
/// `bool` - `false` if no builder exists for the opcode
pub fn build(builder: &mut BuilderContext<'_>) -> bool {
    let insn: Instruction = builder.insn;
    match insn.group() {
        OpcodeGroup::VectorControl => return build_control(builder),
        OpcodeGroup::VectorFloat => builder.require_csr(CsrState::VectorFloat),
        OpcodeGroup::VectorInteger | OpcodeGroup::VectorPermute => {}
        _ => return false,
    }

    let ops: VectorOperands = VectorOperands::of(&insn);
    let method: &str = method_name(insn.opcode);
    let vd: String = builder.v(ops.vd);

    let value: String = match insn.opcode {
        // Splat immediates
        Opcode::Vspltisb | Opcode::Vspltish | Opcode::Vspltisw | Opcode::Vspltisw128 => {
            format!("Vector128::{}({})", method, insn.vsimm())
        }
        // Element index or scale immediates
        Opcode::Vspltb
        | Opcode::Vsplth
        | Opcode::Vspltw
        | Opcode::Vcfux
        | Opcode::Vcfsx
        | Opcode::Vctuxs
        | Opcode::Vctsxs => {
            let vb: String = builder.v(ops.vb);
            format!("{}.{}({})", vb, method, insn.vuimm())
        }
        Opcode::Vspltw128
        | Opcode::Vcfpsxws128
        | Opcode::Vcfpuxws128
        | Opcode::Vcsxwfp128
        | Opcode::Vcuxwfp128
        | Opcode::Vupkd3d128 => {
            let vb: String = builder.v(ops.vb);
            format!("{}.{}({})", vb, method, insn.vimm128())
        }
        Opcode::Vpermwi128 => {
            let vb: String = builder.v(ops.vb);
            format!("{}.vpermwi(0x{:02X})", vb, insn.vperm128())
        }
        // Insert forms merge into the destination
        Opcode::Vrlimi128 | Opcode::Vpkd3d128 => {
            let vb: String = builder.v(ops.vb);
            format!(
                "{}.{}({}, {}, {})",
                vd,
                method,
                vb,
                insn.vimm128(),
                insn.vz128()
            )
        }
        // Unary
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
        | Opcode::Vupklpx
        | Opcode::Vrefp128
        | Opcode::Vrsqrtefp128
        | Opcode::Vexptefp128
        | Opcode::Vlogefp128
        | Opcode::Vrfin128
        | Opcode::Vrfiz128
        | Opcode::Vrfip128
        | Opcode::Vrfim128
        | Opcode::Vupkhsb128
        | Opcode::Vupklsb128 => {
            let vb: String = builder.v(ops.vb);
            format!("{}.{}()", vb, method)
        }
        // Shift by immediate
        Opcode::Vsldoi => {
            let (va, vb) = (builder.v(ops.va), builder.v(ops.vb));
            format!("{}.vsldoi({}, {})", va, vb, insn.vsh())
        }
        Opcode::Vsldoi128 => {
            let (va, vb) = (builder.v(ops.va), builder.v(ops.vb));
            format!("{}.vsldoi({}, {})", va, vb, insn.vsh128())
        }
        // Three sources
        Opcode::Vmhaddshs
        | Opcode::Vmhraddshs
        | Opcode::Vmladduhm
        | Opcode::Vmsumubm
        | Opcode::Vmsummbm
        | Opcode::Vmsumuhm
        | Opcode::Vmsumuhs
        | Opcode::Vmsumshm
        | Opcode::Vmsumshs
        | Opcode::Vsel
        | Opcode::Vperm
        | Opcode::Vperm128 => {
            let (va, vb, vc) = (builder.v(ops.va), builder.v(ops.vb), builder.v(ops.vc));
            format!("{}.{}({}, {})", va, method, vb, vc)
        }
        // vD = vA * vC + vB
        Opcode::Vmaddfp | Opcode::Vnmsubfp => {
            let (va, vb, vc) = (builder.v(ops.va), builder.v(ops.vb), builder.v(ops.vc));
            format!("{}.{}({}, {})", va, method, vc, vb)
        }
        // VMX128 forms with vD as an accumulator
        Opcode::Vmaddfp128 | Opcode::Vnmsubfp128 => {
            let (va, vb) = (builder.v(ops.va), builder.v(ops.vb));
            format!("{}.{}({}, {})", va, method, vb, vd)
        }
        Opcode::Vmaddcfp128 => {
            let (va, vb) = (builder.v(ops.va), builder.v(ops.vb));
            format!("{}.vmaddfp({}, {})", va, vd, vb)
        }
        Opcode::Vsel128 => {
            let (va, vb) = (builder.v(ops.va), builder.v(ops.vb));
            format!("{}.vsel({}, {})", va, vb, vd)
        }
        // Everything else is binary
        _ => {
            let (va, vb) = (builder.v(ops.va), builder.v(ops.vb));
            format!("{}.{}({})", va, method, vb)
        }
    };
    builder.line(format!("{} = {};", vd, value));

    if insn.records() {
        let cr6: String = builder.cr(6);
        let helper: &str = if matches!(insn.opcode, Opcode::Vcmpbfp | Opcode::Vcmpbfp128) {
            "compare_vector_bounds"
        } else {
            "compare_vector"
        };
        builder.line(format!("{}.{}(&{});", cr6, helper, vd));
    }
    true
}

fn build_control(builder: &mut BuilderContext<'_>) -> bool {
    let insn: Instruction = builder.insn;
    match insn.opcode {
        Opcode::Mfvscr => {
            let vd: String = builder.v(insn.rd());
            builder.line(format!("{} = Vector128::from_u32(0, 0, 0, ctx.vscr);", vd));
        }
        Opcode::Mtvscr => {
            let vb: String = builder.v(insn.rb());
            builder.line(format!("ctx.vscr = {}.u32_lane(3);", vb));
            builder.csr.reset();
        }
        _ => return false,
    }
    true
}
