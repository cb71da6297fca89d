//! Control Flow Code Generation
//!
//! Branches, traps, system instructions, condition register logic and
//! special-purpose register moves.
//!
//! # Control Transfers
//! - target has a label in the current function: `pc = target; continue;`
//! - target is an emitted function: direct call by name
//! - anything else: `ppc_call`, the runtime's address dispatcher
//!
//! Unlinked branches that leave the function are tail calls (`call; return;`).
//! Calls reset the CSR tracker; the callee may have switched modes.

use super::builder::{cr_bit_name, BuilderContext};
use super::function_symbol;
use crate::recompiler::analysis::ControlFlowGraph;
use crate::recompiler::config::RecompilerConfig;
use crate::recompiler::decoder::{Instruction, Opcode, OpcodeGroup, SPR_XER};
use crate::recompiler::graph::{FunctionGraph, FunctionNode};

/// SPR number of VRSAVE.
const SPR_VRSAVE: u16 = 256;

/// Function-level view the branch builders resolve targets against.
pub struct FlowContext<'a> {
    pub graph: &'a FunctionGraph,
    pub node: &'a FunctionNode,
    pub cfg: &'a ControlFlowGraph,
    pub config: &'a RecompilerConfig,
}

impl<'a> FlowContext<'a> {
    /// Whether `target` is a dispatch arm of the current function.
    #[inline]
    pub fn is_local(&self, target: u32) -> bool {
        self.cfg.is_label(target)
    }

    /// Call expression for a transfer to `target`.
    pub fn call_expression(&self, target: u32) -> String {
        let callable: bool = self
            .graph
            .function(target)
            .map(|callee| match callee.parent.and_then(|parent| self.graph.function(parent)) {
                // Chunks inside their parent are labels there, not functions.
                Some(parent) => !parent.contains(callee.address),
                None => true,
            })
            .unwrap_or(false);
        if callable {
            format!("{}(ctx, mem)", function_symbol(&self.graph.name_of(target)))
        } else {
            format!("ppc_call(ctx, mem, 0x{:08X})", target)
        }
    }

    /// Resolved target of the transfer at `insn`, preferring the recorded call edge.
    fn target_of(&self, insn: &Instruction) -> Option<u32> {
        self.node
            .call_at(insn.address)
            .and_then(|call| call.target)
            .or(insn.target)
    }
}

/// Translate a control-flow, system, CR or SPR instruction.
///
/// # Returns
/// `bool` - `false` if no builder exists for the opcode
pub fn build(builder: &mut BuilderContext<'_>, flow: &FlowContext<'_>) -> bool {
    match builder.insn.group() {
        OpcodeGroup::Branch => build_branch(builder, flow),
        OpcodeGroup::Trap => build_trap(builder),
        OpcodeGroup::System => build_system(builder, flow.config),
        OpcodeGroup::ConditionRegister => build_condition_register(builder),
        OpcodeGroup::SpecialRegister => build_special_register(builder, flow.config),
        _ => false,
    }
}

/// Branch condition for `BO`/`BI`, emitting the CTR decrement when requested.
///
/// # Returns
/// `Option<String>` - `None` when the branch is taken unconditionally
fn branch_condition(builder: &mut BuilderContext<'_>, bo: u8, bi: u8) -> Option<String> {
    let mut terms: Vec<String> = Vec::new();
    if bo & 0x04 == 0 {
        let ctr: String = builder.ctr();
        builder.line(format!("{} = {}.wrapping_sub(1);", ctr, ctr));
        let test: &str = if bo & 0x02 != 0 { "==" } else { "!=" };
        terms.push(format!("{} {} 0", ctr, test));
    }
    if bo & 0x10 == 0 {
        let field: String = builder.cr(bi / 4);
        let negate: &str = if bo & 0x08 != 0 { "" } else { "!" };
        terms.push(format!("{}{}.{}", negate, field, cr_bit_name(bi)));
    }
    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" && "))
    }
}

/// Emit `body` under `condition`, or unconditionally.
fn guarded(builder: &mut BuilderContext<'_>, condition: Option<String>, body: &[String]) {
    match condition {
        Some(condition) => {
            builder.line(format!("if {} {{", condition));
            builder.push_indent();
            for line in body {
                builder.line(line);
            }
            builder.pop_indent();
            builder.line("}");
        }
        None => {
            for line in body {
                builder.line(line);
            }
        }
    }
}

fn set_lr(config: &RecompilerConfig, insn: &Instruction) -> Option<String> {
    if config.skip_lr {
        None
    } else {
        Some(format!("ctx.lr = 0x{:08X};", insn.address.wrapping_add(4)))
    }
}

/// Statements of a direct call to `target`, with setjmp/longjmp special-cased.
fn call_statements(flow: &FlowContext<'_>, insn: &Instruction, target: u32) -> Vec<String> {
    let mut body: Vec<String> = Vec::new();
    body.extend(set_lr(flow.config, insn));
    if flow.config.setjmp_address == Some(target) {
        body.push("ctx.r[3] = ppc_setjmp(ctx, mem);".to_string());
    } else if flow.config.longjmp_address == Some(target) {
        body.push("ppc_longjmp(ctx, mem);".to_string());
    } else {
        body.push(format!("{};", flow.call_expression(target)));
    }
    body
}

/// Statements of a transfer to `target` without linking.
pub(super) fn jump_statements(flow: &FlowContext<'_>, target: u32) -> Vec<String> {
    if flow.is_local(target) {
        vec![format!("pc = 0x{:08X};", target), "continue;".to_string()]
    } else {
        vec![format!("{};", flow.call_expression(target)), "return;".to_string()]
    }
}

fn build_branch(builder: &mut BuilderContext<'_>, flow: &FlowContext<'_>) -> bool {
    let insn: Instruction = builder.insn;
    let next: u32 = insn.address.wrapping_add(4);

    match insn.opcode {
        Opcode::B => {
            let Some(target) = flow.target_of(&insn) else {
                return false;
            };
            for line in jump_statements(flow, target) {
                builder.line(line);
            }
        }
        Opcode::Bl => {
            let Some(target) = flow.target_of(&insn) else {
                return false;
            };
            for line in call_statements(flow, &insn, target) {
                builder.line(line);
            }
            builder.csr.reset();
        }
        Opcode::Bc => {
            let Some(target) = insn.target else {
                return false;
            };
            let condition: Option<String> = branch_condition(builder, insn.bo(), insn.bi());
            guarded(builder, condition, &jump_statements(flow, target));
        }
        Opcode::Bcl => {
            let Some(target) = insn.target else {
                return false;
            };
            let condition: Option<String> = branch_condition(builder, insn.bo(), insn.bi());
            if target == next {
                // Address-materialisation idiom: only LR changes.
                let body: Vec<String> = set_lr(flow.config, &insn).into_iter().collect();
                guarded(builder, condition, &body);
            } else {
                guarded(builder, condition, &call_statements(flow, &insn, target));
                builder.csr.reset();
            }
        }
        Opcode::Blr => builder.line("return;"),
        Opcode::Bclr if !insn.lk() => {
            let condition: Option<String> = branch_condition(builder, insn.bo(), insn.bi());
            guarded(builder, condition, &["return;".to_string()]);
        }
        Opcode::Blrl | Opcode::Bclr => {
            let condition: Option<String> = branch_condition(builder, insn.bo(), insn.bi());
            let mut body: Vec<String> = vec!["let target: u32 = ctx.lr as u32;".to_string()];
            body.extend(set_lr(flow.config, &insn));
            body.push("ppc_call(ctx, mem, target);".to_string());
            guarded(builder, condition, &body);
            builder.csr.reset();
        }
        Opcode::Bctr => build_indirect_jump(builder, flow, None),
        Opcode::Bcctr if !insn.lk() => {
            let condition: Option<String> = branch_condition(builder, insn.bo(), insn.bi());
            build_indirect_jump(builder, flow, condition);
        }
        Opcode::Bctrl | Opcode::Bcctr => {
            let condition: Option<String> = branch_condition(builder, insn.bo(), insn.bi());
            let ctr: String = builder.ctr();
            let mut body: Vec<String> = set_lr(flow.config, &insn).into_iter().collect();
            body.push(format!("ppc_call(ctx, mem, {} as u32);", ctr));
            guarded(builder, condition, &body);
            builder.csr.reset();
        }
        _ => return false,
    }
    true
}

/// `bctr`: switch over a known jump table, or an indirect tail call.
fn build_indirect_jump(builder: &mut BuilderContext<'_>, flow: &FlowContext<'_>, condition: Option<String>) {
    let ctr: String = builder.ctr();
    let Some(table) = builder.jump_table else {
        let body: Vec<String> = vec![
            format!("ppc_call(ctx, mem, {} as u32);", ctr),
            "return;".to_string(),
        ];
        guarded(builder, condition, &body);
        return;
    };

    let index: String = builder.r(table.index_register);
    let mut body: Vec<String> = vec![format!("match {} as u32 {{", index)];
    for (case, &target) in table.targets.iter().enumerate() {
        let arm: String = jump_statements(flow, target).join(" ");
        body.push(format!("    {} => {{ {} }}", case, arm));
    }
    body.push(format!("    _ => {{ pc = {} as u32; continue; }}", ctr));
    body.push("}".to_string());
    guarded(builder, condition, &body);
}

fn build_trap(builder: &mut BuilderContext<'_>) -> bool {
    let insn: Instruction = builder.insn;
    let trap: String = format!("ppc_trap(ctx, mem, 0x{:08X});", insn.address);
    if insn.is_unconditional_trap() {
        builder.line(trap);
        return true;
    }

    let wide: bool = matches!(insn.opcode, Opcode::Td | Opcode::Tdi);
    let (signed, unsigned): (&str, &str) = if wide { ("i64", "u64") } else { ("i32", "u32") };
    let ra: String = builder.r(insn.ra());
    let rhs: String = match insn.opcode {
        Opcode::Tw | Opcode::Td => builder.r(insn.rb()),
        Opcode::Twi | Opcode::Tdi => format!("0x{:X}u64", insn.simm() as i64 as u64),
        _ => return false,
    };

    let to: u8 = insn.to();
    let mut terms: Vec<String> = Vec::new();
    let checks: [(u8, &str, &str); 5] = [
        (0x10, signed, "<"),
        (0x08, signed, ">"),
        (0x04, unsigned, "=="),
        (0x02, unsigned, "<"),
        (0x01, unsigned, ">"),
    ];
    for (bit, kind, op) in checks {
        if to & bit != 0 {
            terms.push(format!("({} as {}) {} ({} as {})", ra, kind, op, rhs, kind));
        }
    }
    if terms.is_empty() {
        // TO = 0 never traps.
        return true;
    }
    guarded(builder, Some(terms.join(" || ")), &[trap]);
    true
}

fn build_system(builder: &mut BuilderContext<'_>, config: &RecompilerConfig) -> bool {
    let insn: Instruction = builder.insn;
    match insn.opcode {
        Opcode::Sc => {
            builder.line(format!("ppc_syscall(ctx, mem, 0x{:08X});", insn.address));
            builder.csr.reset();
        }
        Opcode::Sync => builder.line("std::sync::atomic::fence(std::sync::atomic::Ordering::SeqCst);"),
        Opcode::Isync | Opcode::Eieio => {}
        Opcode::Mfmsr => {
            if !config.skip_msr {
                let rd: String = builder.r(insn.rd());
                builder.line(format!("{} = ctx.msr;", rd));
            }
        }
        Opcode::Mtmsr | Opcode::Mtmsrd => {
            if !config.skip_msr {
                let rs: String = builder.r(insn.rs());
                builder.line(format!("ctx.msr = {};", rs));
            }
        }
        _ => return false,
    }
    true
}

fn build_condition_register(builder: &mut BuilderContext<'_>) -> bool {
    let insn: Instruction = builder.insn;
    match insn.opcode {
        Opcode::Mcrf => {
            let (destination, source) = (builder.cr(insn.crfd()), builder.cr(insn.crfs()));
            builder.line(format!("{} = {};", destination, source));
        }
        Opcode::Mfcr => {
            let mut fields: Vec<String> = Vec::with_capacity(8);
            for field in 0..8u8 {
                let name: String = builder.cr(field);
                fields.push(format!("((({}.to_bits()) as u64) << {})", name, 28 - field * 4));
            }
            let rd: String = builder.r(insn.rd());
            builder.line(format!("{} = {};", rd, fields.join(" | ")));
        }
        Opcode::Mtcrf => {
            let rs: String = builder.r(insn.rs());
            let crm: u8 = insn.crm();
            for field in 0..8u8 {
                if crm & (0x80 >> field) != 0 {
                    let name: String = builder.cr(field);
                    builder.line(format!(
                        "{}.set_bits((({} >> {}) & 0xF) as u32);",
                        name,
                        rs,
                        28 - field * 4
                    ));
                }
            }
        }
        _ => {
            let bit = |builder: &mut BuilderContext<'_>, index: u8| -> String {
                format!("{}.{}", builder.cr(index / 4), cr_bit_name(index))
            };
            let a: String = bit(builder, insn.ra());
            let b: String = bit(builder, insn.rb());
            let value: String = match insn.opcode {
                Opcode::Crand => format!("{} & {}", a, b),
                Opcode::Crandc => format!("{} & !{}", a, b),
                Opcode::Creqv => format!("!({} ^ {})", a, b),
                Opcode::Crnand => format!("!({} & {})", a, b),
                Opcode::Crnor => format!("!({} | {})", a, b),
                Opcode::Cror => format!("{} | {}", a, b),
                Opcode::Crorc => format!("{} | !{}", a, b),
                Opcode::Crxor => format!("{} ^ {}", a, b),
                _ => return false,
            };
            let d: String = bit(builder, insn.rd());
            builder.line(format!("{} = {};", d, value));
        }
    }
    true
}

fn build_special_register(builder: &mut BuilderContext<'_>, config: &RecompilerConfig) -> bool {
    let insn: Instruction = builder.insn;
    match insn.opcode {
        Opcode::Mflr => {
            if !config.skip_lr {
                let rd: String = builder.r(insn.rd());
                builder.line(format!("{} = ctx.lr;", rd));
            }
        }
        Opcode::Mtlr => {
            if !config.skip_lr {
                let rs: String = builder.r(insn.rs());
                builder.line(format!("ctx.lr = {};", rs));
            }
        }
        Opcode::Mfctr => {
            let (rd, ctr) = (builder.r(insn.rd()), builder.ctr());
            builder.line(format!("{} = {};", rd, ctr));
        }
        Opcode::Mtctr => {
            let (ctr, rs) = (builder.ctr(), builder.r(insn.rs()));
            builder.line(format!("{} = {};", ctr, rs));
        }
        Opcode::Mftb => {
            let rd: String = builder.r(insn.rd());
            builder.line(format!("{} = ppc_time_base();", rd));
        }
        Opcode::Mfspr => {
            let rd: String = builder.r(insn.rd());
            let value: String = match insn.spr() {
                SPR_XER => format!("{}.to_bits() as u64", builder.xer()),
                SPR_VRSAVE => "ctx.vrsave as u64".to_string(),
                _ => return false,
            };
            builder.line(format!("{} = {};", rd, value));
        }
        Opcode::Mtspr => {
            let rs: String = builder.r(insn.rs());
            match insn.spr() {
                SPR_XER => {
                    let xer: String = builder.xer();
                    builder.line(format!("{}.set_bits({} as u32);", xer, rs));
                }
                SPR_VRSAVE => builder.line(format!("ctx.vrsave = {} as u32;", rs)),
                _ => return false,
            }
        }
        _ => return false,
    }
    true
}
