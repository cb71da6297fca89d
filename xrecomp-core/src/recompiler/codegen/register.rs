//! Register Allocation
//!
//! Chooses, per register, between a function-local variable (`r14`) and the
//! persistent context slot (`ctx.r[14]`), and records which locals a function
//! touched so the emitter can declare them.
//!
//! # Memory Optimizations
//! - Usage is tracked with `BitVec`s (1 bit per register)
//!
//! # Allocation Strategy
//! A register may only live in a local when its value is not observed outside
//! the function:
//! - GPR: r0, r2, r11, r12 (`non_argument_as_local`), r14-r31 (`non_volatile_as_local`)
//! - FPR: f0 (`non_argument_as_local`), f14-f31 (`non_volatile_as_local`)
//! - VR: v32-v63 (`non_argument_as_local`), v14-v31 and v64-v127 (`non_volatile_as_local`)
//! - CR fields, CTR, XER and the reservation under their own flags
//!
//! Functions that call `setjmp`, and configured exception handlers, keep every
//! register in the context.

use crate::recompiler::config::RecompilerConfig;
use bitvec::prelude::*;

/// Register classes with a local/context choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegisterClass {
    Gpr,
    Fpr,
    Vr,
    Cr,
    Ctr,
    Xer,
    Reserved,
}

/// Which registers may be promoted to locals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LocalPolicy {
    pub non_argument: bool,
    pub non_volatile: bool,
    pub cr: bool,
    pub ctr: bool,
    pub xer: bool,
    pub reserved: bool,
}

impl LocalPolicy {
    /// Policy from the configuration flags.
    pub fn from_config(config: &RecompilerConfig) -> Self {
        Self {
            non_argument: config.non_argument_as_local,
            non_volatile: config.non_volatile_as_local,
            cr: config.cr_as_local,
            ctr: config.ctr_as_local,
            xer: config.xer_as_local,
            reserved: config.reserved_as_local,
        }
    }

    /// Everything stays in the context.
    pub fn context_only() -> Self {
        Self::default()
    }

    pub fn gpr_is_local(&self, reg: u8) -> bool {
        match reg {
            0 | 2 | 11 | 12 => self.non_argument,
            14..=31 => self.non_volatile,
            _ => false,
        }
    }

    pub fn fpr_is_local(&self, reg: u8) -> bool {
        match reg {
            0 => self.non_argument,
            14..=31 => self.non_volatile,
            _ => false,
        }
    }

    pub fn vr_is_local(&self, reg: u8) -> bool {
        match reg {
            32..=63 => self.non_argument,
            14..=31 | 64..=127 => self.non_volatile,
            _ => false,
        }
    }
}

/// Register allocator for one function.
pub struct RegisterAllocator {
    policy: LocalPolicy,
    gpr_used: BitVec<u32>,
    fpr_used: BitVec<u32>,
    vr_used: BitVec<u32>,
    cr_used: BitVec<u32>,
    ctr_used: bool,
    xer_used: bool,
    reserved_used: bool,
}

impl RegisterAllocator {
    #[inline]
    pub fn new(policy: LocalPolicy) -> Self {
        Self {
            policy,
            gpr_used: bitvec![u32, Lsb0; 0; 32],
            fpr_used: bitvec![u32, Lsb0; 0; 32],
            vr_used: bitvec![u32, Lsb0; 0; 128],
            cr_used: bitvec![u32, Lsb0; 0; 8],
            ctr_used: false,
            xer_used: false,
            reserved_used: false,
        }
    }

    #[inline]
    pub fn policy(&self) -> LocalPolicy {
        self.policy
    }

    /// Expression naming a general-purpose register (`u64`).
    pub fn gpr(&mut self, reg: u8) -> String {
        if self.policy.gpr_is_local(reg) {
            self.gpr_used.set(reg as usize, true);
            format!("r{}", reg)
        } else {
            format!("ctx.r[{}]", reg)
        }
    }

    /// Expression naming a floating-point register (`f64`).
    pub fn fpr(&mut self, reg: u8) -> String {
        if self.policy.fpr_is_local(reg) {
            self.fpr_used.set(reg as usize, true);
            format!("f{}", reg)
        } else {
            format!("ctx.f[{}]", reg)
        }
    }

    /// Expression naming a vector register (`Vector128`).
    pub fn vr(&mut self, reg: u8) -> String {
        if self.policy.vr_is_local(reg) {
            self.vr_used.set(reg as usize, true);
            format!("v{}", reg)
        } else {
            format!("ctx.v[{}]", reg)
        }
    }

    /// Expression naming a condition register field (`CrField`).
    pub fn cr(&mut self, field: u8) -> String {
        if self.policy.cr {
            self.cr_used.set(field as usize, true);
            format!("cr{}", field)
        } else {
            format!("ctx.cr[{}]", field)
        }
    }

    pub fn ctr(&mut self) -> String {
        if self.policy.ctr {
            self.ctr_used = true;
            "ctr".to_string()
        } else {
            "ctx.ctr".to_string()
        }
    }

    pub fn xer(&mut self) -> String {
        if self.policy.xer {
            self.xer_used = true;
            "xer".to_string()
        } else {
            "ctx.xer".to_string()
        }
    }

    pub fn reserved(&mut self) -> String {
        if self.policy.reserved {
            self.reserved_used = true;
            "reserved".to_string()
        } else {
            "ctx.reserved".to_string()
        }
    }

    /// Whether any local of `class` was handed out.
    pub fn uses_locals(&self, class: RegisterClass) -> bool {
        match class {
            RegisterClass::Gpr => self.gpr_used.any(),
            RegisterClass::Fpr => self.fpr_used.any(),
            RegisterClass::Vr => self.vr_used.any(),
            RegisterClass::Cr => self.cr_used.any(),
            RegisterClass::Ctr => self.ctr_used,
            RegisterClass::Xer => self.xer_used,
            RegisterClass::Reserved => self.reserved_used,
        }
    }

    /// Declarations for every local handed out, loaded from the context.
    pub fn declarations(&self) -> Vec<String> {
        let mut lines: Vec<String> = Vec::new();
        for reg in self.gpr_used.iter_ones() {
            lines.push(format!("let mut r{0}: u64 = ctx.r[{0}];", reg));
        }
        for reg in self.fpr_used.iter_ones() {
            lines.push(format!("let mut f{0}: f64 = ctx.f[{0}];", reg));
        }
        for reg in self.vr_used.iter_ones() {
            lines.push(format!("let mut v{0}: Vector128 = ctx.v[{0}];", reg));
        }
        for field in self.cr_used.iter_ones() {
            lines.push(format!("let mut cr{0}: CrField = ctx.cr[{0}];", field));
        }
        if self.ctr_used {
            lines.push("let mut ctr: u64 = ctx.ctr;".to_string());
        }
        if self.xer_used {
            lines.push("let mut xer: Xer = ctx.xer;".to_string());
        }
        if self.reserved_used {
            lines.push("let mut reserved: u64 = ctx.reserved;".to_string());
        }
        lines
    }
}
