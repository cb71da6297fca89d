//! Memory Access Code Generation
//!
//! Loads, stores, reservations and cache operations. Every access is classified
//! as ordinary or memory-mapped I/O before its accessor is chosen:
//! - the base register holds a tracked `lis` I/O page constant, or
//! - the next instruction is `eieio`
//!
//! I/O accesses go through the `mem.mmio_*` accessors.

use super::builder::BuilderContext;
use crate::recompiler::decoder::{Format, Instruction, Opcode, OpcodeGroup};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Width {
    U8,
    U16,
    U32,
    U64,
}

impl Width {
    fn unsigned(self) -> &'static str {
        match self {
            Width::U8 => "u8",
            Width::U16 => "u16",
            Width::U32 => "u32",
            Width::U64 => "u64",
        }
    }

    fn signed(self) -> &'static str {
        match self {
            Width::U8 => "i8",
            Width::U16 => "i16",
            Width::U32 => "i32",
            Width::U64 => "i64",
        }
    }
}

/// How a loaded value is widened into a GPR.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Extend {
    Zero,
    Sign,
    ByteReverse,
}

/// Shape of an integer load or store.
#[derive(Debug, Clone, Copy)]
struct Access {
    width: Width,
    extend: Extend,
    update: bool,
}

fn integer_load(opcode: Opcode) -> Option<Access> {
    use self::Extend::*;
    use Width::*;
    let (width, extend, update) = match opcode {
        Opcode::Lbz | Opcode::Lbzx => (U8, Zero, false),
        Opcode::Lbzu | Opcode::Lbzux => (U8, Zero, true),
        Opcode::Lhz | Opcode::Lhzx => (U16, Zero, false),
        Opcode::Lhzu | Opcode::Lhzux => (U16, Zero, true),
        Opcode::Lha | Opcode::Lhax => (U16, Sign, false),
        Opcode::Lhau | Opcode::Lhaux => (U16, Sign, true),
        Opcode::Lwz | Opcode::Lwzx => (U32, Zero, false),
        Opcode::Lwzu | Opcode::Lwzux => (U32, Zero, true),
        Opcode::Lwa | Opcode::Lwax => (U32, Sign, false),
        Opcode::Lwaux => (U32, Sign, true),
        Opcode::Ld | Opcode::Ldx => (U64, Zero, false),
        Opcode::Ldu => (U64, Zero, true),
        Opcode::Lhbrx => (U16, ByteReverse, false),
        Opcode::Lwbrx => (U32, ByteReverse, false),
        _ => return None,
    };
    Some(Access { width, extend, update })
}

fn integer_store(opcode: Opcode) -> Option<Access> {
    use self::Extend::*;
    use Width::*;
    let (width, extend, update) = match opcode {
        Opcode::Stb | Opcode::Stbx => (U8, Zero, false),
        Opcode::Stbu | Opcode::Stbux => (U8, Zero, true),
        Opcode::Sth | Opcode::Sthx => (U16, Zero, false),
        Opcode::Sthu | Opcode::Sthux => (U16, Zero, true),
        Opcode::Stw | Opcode::Stwx => (U32, Zero, false),
        Opcode::Stwu | Opcode::Stwux => (U32, Zero, true),
        Opcode::Std | Opcode::Stdx => (U64, Zero, false),
        Opcode::Stdu | Opcode::Stdux => (U64, Zero, true),
        Opcode::Sthbrx => (U16, ByteReverse, false),
        Opcode::Stwbrx => (U32, ByteReverse, false),
        _ => return None,
    };
    Some(Access { width, extend, update })
}

/// Whether the access made by `insn` must go through the I/O path.
pub fn is_mmio(builder: &BuilderContext<'_>, insn: &Instruction) -> bool {
    let base: u8 = insn.ra();
    if base != 0 && builder.io_base(base).is_some() {
        return true;
    }
    builder
        .next
        .map(|next| next.opcode == Opcode::Eieio)
        .unwrap_or(false)
}

fn accessor(mmio: bool, operation: &str, suffix: &str) -> String {
    if mmio {
        format!("mem.mmio_{}_{}", operation, suffix)
    } else {
        format!("mem.{}_{}", operation, suffix)
    }
}

/// Emit `let ea: u32 = ...;` for the current instruction.
fn emit_effective_address(builder: &mut BuilderContext<'_>) {
    let insn: Instruction = builder.insn;
    let (ra, rb) = (insn.ra(), insn.rb());
    let indexed: bool = matches!(insn.format, Format::X | Format::VX128_1);
    let expression: String = if indexed {
        let index: String = builder.r(rb);
        if ra == 0 {
            format!("{} as u32", index)
        } else {
            let base: String = builder.r(ra);
            format!("({} as u32).wrapping_add({} as u32)", base, index)
        }
    } else {
        let displacement: i32 = if insn.format == Format::DS { insn.ds() } else { insn.simm() };
        if ra == 0 {
            format!("0x{:08X}u32", displacement as u32)
        } else {
            let base: String = builder.r(ra);
            format!("({} as u32).wrapping_add(0x{:X})", base, displacement as u32)
        }
    };
    builder.line(format!("let ea: u32 = {};", expression));
}

fn emit_update(builder: &mut BuilderContext<'_>) {
    let ra: String = builder.r(builder.insn.ra());
    builder.line(format!("{} = ea as u64;", ra));
}

/// Translate a load, store or cache instruction.
///
/// # Returns
/// `bool` - `false` if no builder exists for the opcode
pub fn build(builder: &mut BuilderContext<'_>) -> bool {
    let insn: Instruction = builder.insn;
    match insn.group() {
        OpcodeGroup::IntLoad => build_integer_load(builder),
        OpcodeGroup::IntStore => build_integer_store(builder),
        OpcodeGroup::FloatLoad => build_float_load(builder),
        OpcodeGroup::FloatStore => build_float_store(builder),
        OpcodeGroup::VectorLoad => build_vector_load(builder),
        OpcodeGroup::VectorStore => build_vector_store(builder),
        OpcodeGroup::Cache => build_cache(builder),
        _ => false,
    }
}

fn build_integer_load(builder: &mut BuilderContext<'_>) -> bool {
    let insn: Instruction = builder.insn;
    let mmio: bool = is_mmio(builder, &insn);

    match insn.opcode {
        Opcode::Lwarx | Opcode::Ldarx => {
            let suffix: &str = if insn.opcode == Opcode::Lwarx { "u32" } else { "u64" };
            emit_effective_address(builder);
            let reserved: String = builder.reserved();
            let rd: String = builder.r(insn.rd());
            builder.line(format!("{} = {}(ea) as u64;", reserved, accessor(mmio, "load", suffix)));
            builder.line(format!("{} = {};", rd, reserved));
            return true;
        }
        Opcode::Lmw => {
            emit_effective_address(builder);
            for (offset, reg) in (insn.rd()..32).enumerate() {
                let target: String = builder.r(reg);
                builder.line(format!(
                    "{} = {}(ea.wrapping_add({})) as u64;",
                    target,
                    accessor(mmio, "load", "u32"),
                    offset * 4
                ));
            }
            return true;
        }
        _ => {}
    }

    let Some(access) = integer_load(insn.opcode) else {
        return false;
    };
    emit_effective_address(builder);
    let load: String = format!("{}(ea)", accessor(mmio, "load", access.width.unsigned()));
    let value: String = match access.extend {
        Extend::Zero => format!("{} as u64", load),
        Extend::Sign => format!("{} as {} as i64 as u64", load, access.width.signed()),
        Extend::ByteReverse => format!("{}.swap_bytes() as u64", load),
    };
    let rd: String = builder.r(insn.rd());
    builder.line(format!("{} = {};", rd, value));
    if access.update {
        emit_update(builder);
    }
    true
}

fn build_integer_store(builder: &mut BuilderContext<'_>) -> bool {
    let insn: Instruction = builder.insn;
    let mmio: bool = is_mmio(builder, &insn);

    match insn.opcode {
        Opcode::StwcxRc | Opcode::StdcxRc => {
            let suffix: &str = if insn.opcode == Opcode::StwcxRc { "u32" } else { "u64" };
            emit_effective_address(builder);
            let cr0: String = builder.cr(0);
            let reserved: String = builder.reserved();
            let rs: String = builder.r(insn.rs());
            let xer: String = builder.xer();
            builder.line(format!(
                "{}.store_conditional(mem.compare_exchange_{}(ea, {} as {}, {} as {}), &{});",
                cr0, suffix, reserved, suffix, rs, suffix, xer
            ));
            return true;
        }
        Opcode::Stmw => {
            emit_effective_address(builder);
            for (offset, reg) in (insn.rs()..32).enumerate() {
                let source: String = builder.r(reg);
                builder.line(format!(
                    "{}(ea.wrapping_add({}), {} as u32);",
                    accessor(mmio, "store", "u32"),
                    offset * 4,
                    source
                ));
            }
            return true;
        }
        _ => {}
    }

    let Some(access) = integer_store(insn.opcode) else {
        return false;
    };
    emit_effective_address(builder);
    let rs: String = builder.r(insn.rs());
    let width: &str = access.width.unsigned();
    let value: String = match access.extend {
        Extend::ByteReverse => format!("({} as {}).swap_bytes()", rs, width),
        _ => format!("{} as {}", rs, width),
    };
    builder.line(format!("{}(ea, {});", accessor(mmio, "store", width), value));
    if access.update {
        emit_update(builder);
    }
    true
}

fn build_float_load(builder: &mut BuilderContext<'_>) -> bool {
    let insn: Instruction = builder.insn;
    let mmio: bool = is_mmio(builder, &insn);
    let (single, update): (bool, bool) = match insn.opcode {
        Opcode::Lfs | Opcode::Lfsx => (true, false),
        Opcode::Lfsu | Opcode::Lfsux => (true, true),
        Opcode::Lfd | Opcode::Lfdx => (false, false),
        Opcode::Lfdu | Opcode::Lfdux => (false, true),
        _ => return false,
    };
    emit_effective_address(builder);
    let fd: String = builder.f(insn.rd());
    if single {
        builder.line(format!(
            "{} = f32::from_bits({}(ea)) as f64;",
            fd,
            accessor(mmio, "load", "u32")
        ));
    } else {
        builder.line(format!("{} = f64::from_bits({}(ea));", fd, accessor(mmio, "load", "u64")));
    }
    if update {
        emit_update(builder);
    }
    true
}

fn build_float_store(builder: &mut BuilderContext<'_>) -> bool {
    let insn: Instruction = builder.insn;
    let mmio: bool = is_mmio(builder, &insn);
    let (kind, update): (u8, bool) = match insn.opcode {
        Opcode::Stfs | Opcode::Stfsx => (0, false),
        Opcode::Stfsu | Opcode::Stfsux => (0, true),
        Opcode::Stfd | Opcode::Stfdx => (1, false),
        Opcode::Stfdu | Opcode::Stfdux => (1, true),
        Opcode::Stfiwx => (2, false),
        _ => return false,
    };
    emit_effective_address(builder);
    let fs: String = builder.f(insn.rs());
    let statement: String = match kind {
        0 => format!("{}(ea, ({} as f32).to_bits());", accessor(mmio, "store", "u32"), fs),
        1 => format!("{}(ea, {}.to_bits());", accessor(mmio, "store", "u64"), fs),
        _ => format!("{}(ea, {}.to_bits() as u32);", accessor(mmio, "store", "u32"), fs),
    };
    builder.line(statement);
    if update {
        emit_update(builder);
    }
    true
}

/// Vector register operand of a vector load/store.
fn vector_register(insn: &Instruction) -> u8 {
    if insn.format == Format::VX128_1 {
        insn.vd128()
    } else {
        insn.rd()
    }
}

fn build_vector_load(builder: &mut BuilderContext<'_>) -> bool {
    let insn: Instruction = builder.insn;
    let mmio: bool = is_mmio(builder, &insn);
    let value: String = match insn.opcode {
        Opcode::Lvx | Opcode::Lvxl | Opcode::Lvx128 | Opcode::Lvxl128 => {
            format!("{}(ea & !0xF)", accessor(mmio, "load", "v128"))
        }
        // Element loads fill the addressed lane; the rest is undefined.
        Opcode::Lvebx | Opcode::Lvehx | Opcode::Lvewx | Opcode::Lvewx128 => {
            format!("{}(ea & !0xF)", accessor(mmio, "load", "v128"))
        }
        Opcode::Lvsl | Opcode::Lvsl128 => "Vector128::lvsl(ea)".to_string(),
        Opcode::Lvsr | Opcode::Lvsr128 => "Vector128::lvsr(ea)".to_string(),
        Opcode::Lvlx | Opcode::Lvlxl | Opcode::Lvlx128 | Opcode::Lvlxl128 => {
            format!("{}(ea)", accessor(mmio, "load", "v128_left"))
        }
        Opcode::Lvrx | Opcode::Lvrxl | Opcode::Lvrx128 | Opcode::Lvrxl128 => {
            format!("{}(ea)", accessor(mmio, "load", "v128_right"))
        }
        _ => return false,
    };
    emit_effective_address(builder);
    let vd: String = builder.v(vector_register(&insn));
    builder.line(format!("{} = {};", vd, value));
    true
}

fn build_vector_store(builder: &mut BuilderContext<'_>) -> bool {
    let insn: Instruction = builder.insn;
    let (suffix, address, element): (&str, &str, Option<&str>) = match insn.opcode {
        Opcode::Stvx | Opcode::Stvxl | Opcode::Stvx128 | Opcode::Stvxl128 => ("v128", "ea & !0xF", None),
        Opcode::Stvebx => ("u8", "ea", Some("u8_at(ea)")),
        Opcode::Stvehx => ("u16", "ea & !1", Some("u16_at(ea)")),
        Opcode::Stvewx | Opcode::Stvewx128 => ("u32", "ea & !3", Some("u32_at(ea)")),
        Opcode::Stvlx | Opcode::Stvlxl | Opcode::Stvlx128 | Opcode::Stvlxl128 => ("v128_left", "ea", None),
        Opcode::Stvrx | Opcode::Stvrxl | Opcode::Stvrx128 | Opcode::Stvrxl128 => ("v128_right", "ea", None),
        _ => return false,
    };
    let mmio: bool = is_mmio(builder, &insn);
    let vs: String = builder.v(vector_register(&insn));
    let value: String = match element {
        Some(element) => format!("{}.{}", vs, element),
        None => vs,
    };
    emit_effective_address(builder);
    builder.line(format!("{}({}, {});", accessor(mmio, "store", suffix), address, value));
    true
}

fn build_cache(builder: &mut BuilderContext<'_>) -> bool {
    match builder.insn.opcode {
        Opcode::Dcbz => {
            emit_effective_address(builder);
            builder.line("mem.zero_block(ea & !31, 32);");
            true
        }
        // Cache hints have no effect on translated code.
        Opcode::Dcbf | Opcode::Dcbst | Opcode::Dcbt | Opcode::Dcbtst | Opcode::Dcbi | Opcode::Icbi => true,
        _ => false,
    }
}
