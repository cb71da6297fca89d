//! Code Emitter
//!
//! Turns one discovered function into Rust source text. Each function becomes a
//! block dispatch loop: a `match pc` with one arm per label, where local
//! branches assign `pc` and `continue`.
//!
//! ```text
//! pub fn sub_82001000(ctx: &mut PpcContext, mem: &mut Memory) {
//!     let mut r31: u64 = ctx.r[31];
//!     let mut pc: u32 = 0x82001000;
//!     loop {
//!         match pc {
//!             0x82001000 => { ... }
//!             _ => { ppc_unreachable(ctx, pc); return; }
//!         }
//!     }
//! }
//! ```
//!
//! # Emission Algorithm
//! 1. Merge the blocks of chunk functions nested in the range
//! 2. Lay out labelled blocks ([`ControlFlowAnalyzer::build_cfg`])
//! 3. Translate every instruction with the group builder, wrapping mid-asm hooks
//!    around it; opcodes without a builder are recorded and emission continues
//! 4. Close each block with its fallthrough transfer
//! 5. Prepend the declarations of every promoted local
//!
//! The emitter only reads the graph and the configuration, so functions are
//! emitted in parallel with `rayon`.

pub mod branch;
pub mod builder;
pub mod float;
pub mod integer;
pub mod memory;
pub mod register;
pub mod simd;

use crate::recompiler::analysis::{BasicBlock, ControlFlowAnalyzer, ControlFlowGraph};
use crate::recompiler::config::{HookRegister, MidAsmHook, RecompilerConfig};
use crate::recompiler::decoder::{decode, Instruction, Opcode, OpcodeGroup};
use crate::recompiler::error::RecompilerResult;
use crate::recompiler::graph::{FunctionGraph, FunctionNode};
use crate::recompiler::image::BinaryImage;
use branch::FlowContext;
use builder::BuilderContext;
use rayon::prelude::*;
use register::LocalPolicy;
use serde::Serialize;
use std::collections::HashMap;
use std::ops::Range;

/// Source text of one translated function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmittedFunction {
    pub address: u32,
    /// Rust identifier of the emitted function.
    pub name: String,
    pub code: String,
    /// Instructions that had no builder, by address.
    pub unimplemented_opcodes: Vec<(u32, Opcode)>,
    /// Set when any instruction was left unimplemented.
    pub partial: bool,
}

/// Rust identifier for a function name.
pub fn function_symbol(name: &str) -> String {
    let mut symbol: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if symbol.is_empty() || symbol.starts_with(|c: char| c.is_ascii_digit()) {
        symbol.insert(0, '_');
    }
    symbol
}

/// Emitter over an immutable function graph.
pub struct CodeEmitter<'a> {
    graph: &'a FunctionGraph,
    config: &'a RecompilerConfig,
    image: &'a BinaryImage,
    hooks: HashMap<u32, Vec<&'a MidAsmHook>>,
}

impl<'a> CodeEmitter<'a> {
    pub fn new(graph: &'a FunctionGraph, config: &'a RecompilerConfig, image: &'a BinaryImage) -> Self {
        Self {
            graph,
            config,
            image,
            hooks: config.hook_index(),
        }
    }

    /// Whether `node` is emitted as its own function.
    ///
    /// Chunks that lie inside their parent's range are emitted as labels of the
    /// parent instead.
    pub fn is_emitted(&self, node: &FunctionNode) -> bool {
        match node.parent.and_then(|parent| self.graph.function(parent)) {
            Some(parent) => !parent.contains(node.address),
            None => true,
        }
    }

    /// Decode every word of `node`'s range.
    ///
    /// # Errors
    /// Returns `UnmappedAddress` if part of the range is not backed by the image.
    pub fn decode_function(&self, node: &FunctionNode) -> RecompilerResult<Vec<Instruction>> {
        let mut instructions: Vec<Instruction> = Vec::with_capacity((node.size / 4) as usize);
        let mut address: u32 = node.address;
        while address < node.end() {
            let raw: u32 = self.image.read_u32(address)?;
            instructions.push(decode(address, raw));
            address += 4;
        }
        Ok(instructions)
    }

    /// Decode and emit one function.
    pub fn emit_function(&self, node: &FunctionNode) -> RecompilerResult<EmittedFunction> {
        let instructions: Vec<Instruction> = self.decode_function(node)?;
        Ok(self.emit(node, &instructions))
    }

    /// Emit every function that is not a nested chunk, in address order.
    ///
    /// Functions whose range cannot be decoded are logged and skipped.
    pub fn emit_all(&self) -> Vec<EmittedFunction> {
        let nodes: Vec<&FunctionNode> = self
            .graph
            .functions()
            .values()
            .filter(|node| self.is_emitted(node))
            .collect();
        nodes
            .par_iter()
            .filter_map(|node| match self.emit_function(node) {
                Ok(function) => Some(function),
                Err(e) => {
                    log::warn!("Skipping {}: {}", node.display_name(), e);
                    None
                }
            })
            .collect()
    }

    /// Translate `node` given its decoded instructions (in address order).
    pub fn emit(&self, node: &FunctionNode, instructions: &[Instruction]) -> EmittedFunction {
        let layout: FunctionNode = self.with_nested_chunks(node);
        let cfg: ControlFlowGraph = ControlFlowAnalyzer::build_cfg(self.graph, &layout, instructions, self.config);
        let flow: FlowContext<'_> = FlowContext {
            graph: self.graph,
            node: &layout,
            cfg: &cfg,
            config: self.config,
        };

        let mut builder: BuilderContext<'_> = BuilderContext::new(self.policy_for(&layout));
        for _ in 0..3 {
            builder.push_indent();
        }
        for block in cfg.nodes.iter() {
            self.emit_block(&mut builder, &flow, block, instructions);
        }
        let body: String = builder.take_code();

        let symbol: String = function_symbol(&node.display_name());
        let mut code: String = String::new();
        code.push_str(&format!(
            "pub fn {}(ctx: &mut PpcContext, mem: &mut Memory) {{\n",
            symbol
        ));
        for declaration in builder.registers.declarations() {
            code.push_str("    ");
            code.push_str(&declaration);
            code.push('\n');
        }
        code.push_str(&format!("    let mut pc: u32 = 0x{:08X};\n", node.address));
        code.push_str("    loop {\n");
        code.push_str("        match pc {\n");
        code.push_str(&body);
        code.push_str("            _ => {\n");
        code.push_str("                ppc_unreachable(ctx, pc);\n");
        code.push_str("                return;\n");
        code.push_str("            }\n");
        code.push_str("        }\n");
        code.push_str("    }\n");
        code.push_str("}\n");

        let unimplemented_opcodes: Vec<(u32, Opcode)> = builder.unimplemented_opcodes().to_vec();
        if !unimplemented_opcodes.is_empty() {
            log::debug!(
                "{}: {} instructions without a builder",
                symbol,
                unimplemented_opcodes.len()
            );
        }
        EmittedFunction {
            address: node.address,
            name: symbol,
            code,
            partial: !unimplemented_opcodes.is_empty(),
            unimplemented_opcodes,
        }
    }

    /// Register policy: functions that call `setjmp` and exception handlers keep
    /// everything in the context.
    fn policy_for(&self, node: &FunctionNode) -> LocalPolicy {
        let calls_setjmp: bool = self
            .config
            .setjmp_address
            .map(|setjmp| node.calls.iter().any(|call| call.target == Some(setjmp)))
            .unwrap_or(false);
        if calls_setjmp || self.config.is_exception_handler(node.address) {
            log::debug!("{}: registers kept in context", node.display_name());
            LocalPolicy::context_only()
        } else {
            LocalPolicy::from_config(self.config)
        }
    }

    /// Copy of `node` with the blocks, calls and tables of nested chunks merged in.
    fn with_nested_chunks(&self, node: &FunctionNode) -> FunctionNode {
        let mut merged: FunctionNode = node.clone();
        for chunk in self.graph.chunks_of(node.address) {
            if !node.contains(chunk.address) {
                continue;
            }
            if !merged.blocks.is_empty() {
                if chunk.blocks.is_empty() {
                    merged.blocks.push(chunk.address..chunk.end().min(node.end()));
                } else {
                    merged.blocks.extend(chunk.blocks.iter().cloned());
                }
            }
            merged.calls.extend(chunk.calls.iter().copied());
            merged
                .jump_tables
                .extend(chunk.jump_tables.iter().map(|(site, table)| (*site, table.clone())));
        }
        merged.blocks = merge_overlapping(std::mem::take(&mut merged.blocks));
        merged
    }

    fn emit_block<'f>(
        &self,
        builder: &mut BuilderContext<'f>,
        flow: &FlowContext<'f>,
        block: &BasicBlock,
        instructions: &[Instruction],
    ) {
        builder.line(format!("0x{:08X} => {{", block.start_address));
        builder.push_indent();
        builder.enter_label();

        for insn in block.instructions.iter() {
            builder.insn = *insn;
            // Next in address order, even across a label.
            builder.next = instructions
                .binary_search_by_key(&insn.address.wrapping_add(4), |next| next.address)
                .ok()
                .and_then(|index| instructions.get(index))
                .copied();
            builder.jump_table = flow.node.jump_tables.get(&insn.address);
            builder.line(format!("// 0x{:08X}: {}", insn.address, insn));

            let hooks: &[&MidAsmHook] = self.hooks.get(&insn.address).map(|hooks| hooks.as_slice()).unwrap_or(&[]);
            for hook in hooks.iter().filter(|hook| !hook.after_instruction) {
                self.emit_hook(builder, flow, hook);
            }
            if !translate(builder, flow) {
                builder.unimplemented();
            }
            for reg in insn.semantics().writes_gpr {
                builder.track_write(reg);
            }
            for hook in hooks.iter().filter(|hook| hook.after_instruction) {
                self.emit_hook(builder, flow, hook);
            }
        }
        self.emit_block_exit(builder, flow, block);

        builder.pop_indent();
        builder.line("}");
    }

    /// Close a block whose last instruction does not transfer control itself.
    fn emit_block_exit(&self, builder: &mut BuilderContext<'_>, flow: &FlowContext<'_>, block: &BasicBlock) {
        let Some(last) = block.last() else {
            return;
        };
        if transfers_unconditionally(last) {
            return;
        }
        if last.is_unconditional_trap() || last.is_unknown() || last.opcode == Opcode::Rfid {
            builder.line("return;");
            return;
        }
        let next: u32 = block.end_address;
        if flow.is_local(next) {
            builder.line(format!("pc = 0x{:08X};", next));
            builder.line("continue;");
        } else {
            // Falls off the end of the range into whatever follows.
            builder.line(format!("{};", flow.call_expression(next)));
            builder.line("return;");
        }
    }

    /// Call to a mid-asm hook with its captured registers passed by `&mut`.
    fn emit_hook(&self, builder: &mut BuilderContext<'_>, flow: &FlowContext<'_>, hook: &MidAsmHook) {
        let mut captures: Vec<(String, String)> = Vec::with_capacity(hook.registers.len());
        for (index, name) in hook.registers.iter().enumerate() {
            let Some(register) = HookRegister::parse(name) else {
                log::warn!("Hook {} at 0x{:08X}: unknown register '{}'", hook.name, hook.address, name);
                continue;
            };
            let place: String = match register {
                HookRegister::Gpr(reg) => builder.r(reg),
                HookRegister::Fpr(reg) => builder.f(reg),
                HookRegister::Vr(reg) => builder.v(reg),
                HookRegister::Cr(field) => builder.cr(field),
                HookRegister::Ctr => builder.ctr(),
                HookRegister::Xer => builder.xer(),
                HookRegister::Reserved => builder.reserved(),
                HookRegister::Fpscr => "ctx.fpscr".to_string(),
            };
            captures.push((format!("hook_{}", index), place));
        }

        builder.line("{");
        builder.push_indent();
        for (temp, place) in captures.iter() {
            builder.line(format!("let mut {} = {};", temp, place));
        }
        let arguments: Vec<String> = captures.iter().map(|(temp, _)| format!("&mut {}", temp)).collect();
        let call: String = format!("{}({})", hook.name, arguments.join(", "));
        if hook.is_conditional() {
            builder.line(format!("let taken: bool = {};", call));
        } else {
            builder.line(format!("{};", call));
        }
        for (temp, place) in captures.iter() {
            builder.line(format!("{} = {};", place, temp));
        }

        if hook.ret {
            builder.line("return;");
        }
        if let Some(target) = hook.jump_address {
            for line in branch::jump_statements(flow, target) {
                builder.line(line);
            }
        }
        if hook.return_on_true {
            builder.line("if taken { return; }");
        }
        if hook.return_on_false {
            builder.line("if !taken { return; }");
        }
        if let Some(target) = hook.jump_address_on_true {
            builder.line(format!("if taken {{ {} }}", branch::jump_statements(flow, target).join(" ")));
        }
        if let Some(target) = hook.jump_address_on_false {
            builder.line(format!("if !taken {{ {} }}", branch::jump_statements(flow, target).join(" ")));
        }
        builder.pop_indent();
        builder.line("}");
        // Host code may have changed the rounding or flush mode.
        builder.csr.reset();
    }
}

/// Dispatch the current instruction to its group builder.
fn translate(builder: &mut BuilderContext<'_>, flow: &FlowContext<'_>) -> bool {
    match builder.insn.group() {
        OpcodeGroup::Branch
        | OpcodeGroup::Trap
        | OpcodeGroup::System
        | OpcodeGroup::ConditionRegister
        | OpcodeGroup::SpecialRegister => branch::build(builder, flow),
        OpcodeGroup::IntArithmetic
        | OpcodeGroup::IntLogical
        | OpcodeGroup::IntCompare
        | OpcodeGroup::IntRotate
        | OpcodeGroup::IntShift => integer::build(builder),
        OpcodeGroup::IntLoad
        | OpcodeGroup::IntStore
        | OpcodeGroup::FloatLoad
        | OpcodeGroup::FloatStore
        | OpcodeGroup::VectorLoad
        | OpcodeGroup::VectorStore
        | OpcodeGroup::Cache => memory::build(builder),
        OpcodeGroup::FloatArithmetic
        | OpcodeGroup::FloatMove
        | OpcodeGroup::FloatCompare
        | OpcodeGroup::FloatControl => float::build(builder),
        OpcodeGroup::VectorInteger
        | OpcodeGroup::VectorFloat
        | OpcodeGroup::VectorPermute
        | OpcodeGroup::VectorControl => simd::build(builder),
        OpcodeGroup::Unknown => false,
    }
}

/// Whether the translation of `insn` always leaves the block itself.
fn transfers_unconditionally(insn: &Instruction) -> bool {
    match insn.opcode {
        Opcode::B | Opcode::Blr | Opcode::Bctr => true,
        Opcode::Bc | Opcode::Bclr | Opcode::Bcctr => !insn.lk() && !insn.is_conditional() && insn.bo() & 0x04 != 0,
        _ => false,
    }
}

/// Sort ranges and merge the ones that overlap; touching ranges stay separate.
fn merge_overlapping(mut ranges: Vec<Range<u32>>) -> Vec<Range<u32>> {
    ranges.sort_by_key(|range| range.start);
    let mut merged: Vec<Range<u32>> = Vec::with_capacity(ranges.len());
    for range in ranges {
        match merged.last_mut() {
            Some(last) if range.start < last.end => last.end = last.end.max(range.end),
            _ => merged.push(range),
        }
    }
    merged
}
