//! Builder Context
//!
//! Per-function emission state: the instruction being translated, the CSR
//! flush-mode tracker, the register allocator, tracked I/O base constants and the
//! open jump table. Created fresh for every function and dropped afterwards.

use super::register::{LocalPolicy, RegisterAllocator};
use crate::recompiler::decoder::{Instruction, Opcode};
use crate::recompiler::graph::JumpTable;

/// Lowest `lis` immediate that marks a register as an I/O base.
pub const IO_BASE_MIN: u32 = 0x7FC8;
/// Highest `lis` immediate that marks a register as an I/O base.
pub const IO_BASE_MAX: u32 = 0x7FFF;

/// Denormal flush mode the emitted code last established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CsrState {
    /// Not known at this point (function entry, after a call, at a label).
    Unknown,
    /// Scalar FPU mode: denormals preserved.
    ScalarFloat,
    /// VMX mode: denormals flushed.
    VectorFloat,
}

/// Three-state tracker that elides redundant mode switches.
#[derive(Debug, Clone, Copy)]
pub struct CsrTracker {
    state: CsrState,
}

impl Default for CsrTracker {
    fn default() -> Self {
        Self {
            state: CsrState::Unknown,
        }
    }
}

impl CsrTracker {
    #[inline]
    pub fn state(&self) -> CsrState {
        self.state
    }

    /// Forget the current mode.
    #[inline]
    pub fn reset(&mut self) {
        self.state = CsrState::Unknown;
    }

    /// Move to `wanted`, returning the statement that establishes it.
    ///
    /// From `Unknown` the checked switch is emitted; from the other concrete
    /// state the switch is unconditional; in the same state nothing is emitted.
    pub fn transition(&mut self, wanted: CsrState) -> Option<&'static str> {
        let previous: CsrState = self.state;
        self.state = wanted;
        match (previous, wanted) {
            (_, CsrState::Unknown) => None,
            (from, to) if from == to => None,
            (CsrState::Unknown, CsrState::VectorFloat) => Some("ctx.fpscr.enable_flush_mode();"),
            (CsrState::Unknown, CsrState::ScalarFloat) => Some("ctx.fpscr.disable_flush_mode();"),
            (_, CsrState::VectorFloat) => Some("ctx.fpscr.enable_flush_mode_unconditional();"),
            (_, CsrState::ScalarFloat) => Some("ctx.fpscr.disable_flush_mode_unconditional();"),
        }
    }
}

/// Emission state for one function.
pub struct BuilderContext<'a> {
    /// Instruction being translated.
    pub insn: Instruction,
    /// Instruction at the following address within the function, if any.
    pub next: Option<Instruction>,
    pub csr: CsrTracker,
    pub registers: RegisterAllocator,
    /// Jump table dispatched by the current `bctr`.
    pub jump_table: Option<&'a JumpTable>,
    /// GPRs currently holding a `lis` I/O page constant.
    io_bases: [Option<u32>; 32],
    code: String,
    indent_level: usize,
    unimplemented: Vec<(u32, Opcode)>,
}

impl<'a> BuilderContext<'a> {
    pub fn new(policy: LocalPolicy) -> Self {
        Self {
            insn: Instruction::decode(0, 0),
            next: None,
            csr: CsrTracker::default(),
            registers: RegisterAllocator::new(policy),
            jump_table: None,
            io_bases: [None; 32],
            code: String::new(),
            indent_level: 0,
            unimplemented: Vec::new(),
        }
    }

    #[inline]
    pub fn indent(&self) -> String {
        "    ".repeat(self.indent_level)
    }

    #[inline]
    pub fn push_indent(&mut self) {
        self.indent_level += 1;
    }

    #[inline]
    pub fn pop_indent(&mut self) {
        self.indent_level = self.indent_level.saturating_sub(1);
    }

    /// Append one indented line.
    pub fn line(&mut self, text: impl AsRef<str>) {
        let indent: String = self.indent();
        self.code.push_str(&indent);
        self.code.push_str(text.as_ref());
        self.code.push('\n');
    }

    /// Take the code emitted so far.
    pub fn take_code(&mut self) -> String {
        std::mem::take(&mut self.code)
    }

    /// Record an instruction with no builder.
    pub fn unimplemented(&mut self) {
        let (address, opcode) = (self.insn.address, self.insn.opcode);
        self.line(format!(
            "ppc_unimplemented(ctx, 0x{:08X}, \"{}\");",
            address,
            opcode.mnemonic()
        ));
        self.unimplemented.push((address, opcode));
    }

    pub fn unimplemented_opcodes(&self) -> &[(u32, Opcode)] {
        &self.unimplemented
    }

    /// Switch the CSR mode if needed.
    pub fn require_csr(&mut self, wanted: CsrState) {
        if let Some(statement) = self.csr.transition(wanted) {
            self.line(statement);
        }
    }

    /// Forget block-local facts at a label.
    pub fn enter_label(&mut self) {
        self.csr.reset();
        self.io_bases = [None; 32];
    }

    /// I/O page constant held by `reg`, if tracked.
    #[inline]
    pub fn io_base(&self, reg: u8) -> Option<u32> {
        self.io_bases.get(reg as usize).copied().flatten()
    }

    /// Update the I/O base tracking after the current instruction wrote `reg`.
    pub fn track_write(&mut self, reg: u8) {
        let Some(slot) = self.io_bases.get_mut(reg as usize) else {
            return;
        };
        *slot = None;
        if self.insn.opcode == Opcode::Lis && self.insn.rd() == reg {
            let page: u32 = self.insn.uimm();
            if (IO_BASE_MIN..=IO_BASE_MAX).contains(&page) {
                *slot = Some(page << 16);
            }
        }
    }

    // Register expression shorthands.

    #[inline]
    pub fn r(&mut self, reg: u8) -> String {
        self.registers.gpr(reg)
    }

    #[inline]
    pub fn f(&mut self, reg: u8) -> String {
        self.registers.fpr(reg)
    }

    #[inline]
    pub fn v(&mut self, reg: u8) -> String {
        self.registers.vr(reg)
    }

    #[inline]
    pub fn cr(&mut self, field: u8) -> String {
        self.registers.cr(field)
    }

    #[inline]
    pub fn ctr(&mut self) -> String {
        self.registers.ctr()
    }

    #[inline]
    pub fn xer(&mut self) -> String {
        self.registers.xer()
    }

    #[inline]
    pub fn reserved(&mut self) -> String {
        self.registers.reserved()
    }

    /// `rA` as an address operand, `0` when `rA` is r0.
    pub fn base_or_zero(&mut self, reg: u8) -> String {
        if reg == 0 {
            "0u64".to_string()
        } else {
            self.r(reg)
        }
    }

    /// Record-form update of cr0 from a 32-bit signed result.
    pub fn record_cr0(&mut self, result: &str) {
        let cr0: String = self.cr(0);
        let xer: String = self.xer();
        self.line(format!("{}.compare_i32({} as i32, 0, &{});", cr0, result, xer));
    }
}

/// Name of a condition register bit within its field.
pub fn cr_bit_name(bit: u8) -> &'static str {
    match bit & 3 {
        0 => "lt",
        1 => "gt",
        2 => "eq",
        _ => "so",
    }
}
