// Unit tests for the PowerPC decoder
mod common;

use common::*;
use xrecomp_core::recompiler::decoder::{
    decode, is_likely_data, lookup_opcode, opcode_table, BranchKind, Format, Instruction, Opcode, OpcodeGroup,
};

const ADDR: u32 = 0x8200_1000;

#[test]
fn test_decode_blr_is_return() {
    let insn: Instruction = decode(ADDR, 0x4E80_0020);
    assert_eq!(insn.opcode, Opcode::Blr);
    assert!(insn.is_return());
    assert!(!insn.is_call());
    assert_eq!(insn.semantics().branch, BranchKind::Return);
}

#[test]
fn test_decode_nop() {
    let insn: Instruction = decode(ADDR, 0x6000_0000);
    assert_eq!(insn.opcode, Opcode::Nop);
    assert_eq!(insn.to_string(), "nop");
}

#[test]
fn test_decode_li() {
    // addi r3, r0, 5
    let insn: Instruction = decode(ADDR, li(3, 5));
    assert_eq!(insn.opcode, Opcode::Li);
    assert_eq!(insn.rd(), 3);
    assert_eq!(insn.simm(), 5);
    assert_eq!(insn.to_string(), "li r3, 0x5");
}

#[test]
fn test_decode_addi_keeps_base() {
    let insn: Instruction = decode(ADDR, addi(3, 4, -8));
    assert_eq!(insn.opcode, Opcode::Addi);
    assert_eq!(insn.ra(), 4);
    assert_eq!(insn.simm(), -8);
}

#[test]
fn test_decode_is_pure() {
    let words: [u32; 5] = [li(3, 5), BLR, stw(3, 8, 1), add(3, 4, 5), 0];
    for word in words {
        assert_eq!(decode(ADDR, word), decode(ADDR, word));
        assert_eq!(decode(ADDR, word).semantics(), decode(ADDR, word).semantics());
    }
}

#[test]
fn test_lookup_unknown_is_sentinel() {
    for _ in 0..3 {
        let info = lookup_opcode(0);
        assert_eq!(info.opcode, Opcode::Unknown);
        assert_eq!(info.format, Format::Unknown);
    }
    let insn: Instruction = decode(ADDR, 0);
    assert!(insn.is_unknown());
    assert_eq!(insn.group(), OpcodeGroup::Unknown);
    assert!(is_likely_data(0));
    assert!(!is_likely_data(BLR));
}

#[test]
fn test_opcode_table_is_shared() {
    let first = opcode_table() as *const _;
    let second = opcode_table() as *const _;
    assert_eq!(first, second);
    assert!(!opcode_table().is_empty());
}

#[test]
fn test_branch_target_relative() {
    // b +0x40
    let insn: Instruction = decode(ADDR, b(ADDR, ADDR + 0x40));
    assert_eq!(insn.opcode, Opcode::B);
    assert_eq!(insn.target, Some(ADDR + 0x40));

    // b -0x100
    let insn: Instruction = decode(ADDR, b(ADDR, ADDR - 0x100));
    assert_eq!(insn.target, Some(ADDR - 0x100));
}

#[test]
fn test_branch_target_law() {
    for offset in [-0x0200_0000i32, -4, 4, 0x1234, 0x01FF_FFFC] {
        let field: u32 = (offset as u32) & 0x03FF_FFFC;
        let insn: Instruction = decode(ADDR, (18 << 26) | field);
        assert_eq!(insn.target, Some(ADDR.wrapping_add(offset as u32)), "offset {}", offset);
    }
}

#[test]
fn test_branch_target_absolute() {
    // ba 0x1000
    let insn: Instruction = decode(ADDR, (18 << 26) | 0x1000 | 2);
    assert_eq!(insn.target, Some(0x1000));
    // bca with a negative field masks to the 16-bit range
    let insn: Instruction = decode(ADDR, (16 << 26) | (20 << 21) | 0xFFFC | 2);
    assert_eq!(insn.target, Some(0xFFFC));
}

#[test]
fn test_conditional_branch() {
    let insn: Instruction = decode(ADDR, beq(6, ADDR, ADDR + 0x10));
    assert_eq!(insn.opcode, Opcode::Bc);
    assert!(insn.is_conditional());
    assert_eq!(insn.target, Some(ADDR + 0x10));
    let semantics = insn.semantics();
    assert_eq!(semantics.branch, BranchKind::Conditional);
    assert!(semantics.reads_cr.contains(&6));
}

#[test]
fn test_bl_is_call() {
    let insn: Instruction = decode(ADDR, bl(ADDR, ADDR + 0x200));
    assert_eq!(insn.opcode, Opcode::Bl);
    assert!(insn.is_call());
    assert_eq!(insn.semantics().branch, BranchKind::Call);
    assert!(insn.semantics().writes_lr);
}

#[test]
fn test_stw_semantics() {
    // stw r3, 8(r1)
    let semantics = decode(ADDR, stw(3, 8, 1)).semantics();
    assert!(semantics.writes_memory);
    assert!(!semantics.reads_memory);
    assert!(semantics.reads_gpr.contains(&1));
    assert!(semantics.reads_gpr.contains(&3));
    assert!(semantics.writes_gpr.is_empty());
}

#[test]
fn test_lwz_semantics() {
    let semantics = decode(ADDR, lwz(4, 0x10, 31)).semantics();
    assert!(semantics.reads_memory);
    assert!(!semantics.writes_memory);
    assert!(semantics.reads_gpr.contains(&31));
    assert!(semantics.writes_gpr.contains(&4));
}

#[test]
fn test_simplified_spr_moves() {
    assert_eq!(decode(ADDR, MFLR_R0).opcode, Opcode::Mflr);
    assert_eq!(decode(ADDR, MTLR_R0).opcode, Opcode::Mtlr);
    assert_eq!(decode(ADDR, mtctr(11)).opcode, Opcode::Mtctr);
    assert_eq!(decode(ADDR, BCTR).opcode, Opcode::Bctr);
}

#[test]
fn test_lis_and_mr() {
    let insn: Instruction = decode(ADDR, lis(11, 0x8201));
    assert_eq!(insn.opcode, Opcode::Lis);
    assert_eq!(insn.uimm(), 0x8201);
    // or r3, r4, r4
    let insn: Instruction = decode(ADDR, (31 << 26) | (4 << 21) | (3 << 16) | (4 << 11) | (444 << 1));
    assert_eq!(insn.opcode, Opcode::Mr);
}

#[test]
fn test_overflow_form_decodes_as_base_opcode() {
    let insn: Instruction = decode(ADDR, addo(3, 4, 5));
    assert_eq!(insn.opcode, Opcode::Add);
    assert!(insn.oe());
    assert_eq!(insn.full_mnemonic(), "addo");
}

#[test]
fn test_float_and_vector_groups() {
    let insn: Instruction = decode(ADDR, fadd(1, 2, 3));
    assert_eq!(insn.opcode, Opcode::Fadd);
    assert_eq!(insn.group(), OpcodeGroup::FloatArithmetic);

    let insn: Instruction = decode(ADDR, vaddfp(1, 2, 3));
    assert_eq!(insn.opcode, Opcode::Vaddfp);
    assert_eq!(insn.group(), OpcodeGroup::VectorFloat);
}

#[test]
fn test_unconditional_trap() {
    let insn: Instruction = decode(ADDR, TRAP);
    assert_eq!(insn.opcode, Opcode::Tw);
    assert!(insn.is_unconditional_trap());
}
