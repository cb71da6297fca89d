//! Switch Table Recognition
//!
//! Best-effort recovery of `bctr` jump tables from the instructions leading up to
//! the branch. Only the absolute-address table idiom is recognised:
//!
//! ```text
//! cmplwi  crN, rIdx, N
//! bgt     crN, default          ; or bge, which drops the last entry
//! lis     rBase, table@ha
//! addi    rBase, rBase, table@l ; or ori with table@h / table@l
//! rlwinm  rOff, rIdx, 2, 0, 29  ; slwi rOff, rIdx, 2
//! lwzx    rX, rBase, rOff
//! mtctr   rX
//! bctr
//! ```
//!
//! Anything else yields `None`, and a manual table in the configuration always
//! takes precedence over a recognised one.

use crate::recompiler::decoder::{Instruction, Opcode};
use crate::recompiler::graph::{JumpTable, JumpTableSource};
use crate::recompiler::image::BinaryImage;

/// How many instructions before the `bctr` are searched.
pub const SEARCH_WINDOW: usize = 32;

/// Upper bound on the number of cases read from a table.
const MAX_CASES: u32 = 4096;

/// Try to recognise the jump table dispatched by the last instruction of `window`.
///
/// # Arguments
/// * `image` - Binary view the table words are read from
/// * `window` - Consecutive instructions, in address order, ending with the `bctr`
///
/// # Returns
/// `Option<JumpTable>` - Table with every target aligned and executable, or `None`
pub fn recognize(image: &BinaryImage, window: &[Instruction]) -> Option<JumpTable> {
    let (bctr, body) = window.split_last()?;
    if bctr.opcode != Opcode::Bctr {
        return None;
    }

    let (mtctr_at, mtctr) = find_writer_of_ctr(body)?;
    let target_reg: u8 = mtctr.rd();

    let (load_at, load) = last_gpr_writer(&body[..mtctr_at], target_reg)?;
    if load.opcode != Opcode::Lwzx || load.ra() == 0 {
        return None;
    }

    // Either operand of the indexed load may carry the scaled index.
    let (scale_at, index_reg, base_reg) = [(load.rb(), load.ra()), (load.ra(), load.rb())]
        .into_iter()
        .find_map(|(offset_reg, base_reg)| {
            let (at, insn) = last_gpr_writer(&body[..load_at], offset_reg)?;
            is_word_scale(insn).then(|| (at, insn.rs(), base_reg))
        })?;

    let table_base: u32 = resolve_constant(&body[..load_at], base_reg)?;
    let count: u32 = case_count(&body[..scale_at], index_reg)?;
    if count == 0 || count > MAX_CASES {
        return None;
    }

    let mut targets: Vec<u32> = Vec::with_capacity(count as usize);
    for case in 0..count {
        let word: u32 = image.read_u32(table_base.checked_add(case * 4)?).ok()?;
        targets.push(word);
    }

    let table: JumpTable = JumpTable {
        address: bctr.address,
        table_base: Some(table_base),
        index_register: index_reg,
        targets,
        source: JumpTableSource::Recognized,
    };
    match table.validate(|address| image.is_executable(address)) {
        Ok(()) => {
            log::debug!(
                "Recognised jump table at 0x{:08X}: {} cases from 0x{:08X}",
                bctr.address,
                count,
                table_base
            );
            Some(table)
        }
        Err(err) => {
            log::debug!("Rejected jump table candidate: {}", err);
            None
        }
    }
}

/// Nearest `mtctr` before the branch.
fn find_writer_of_ctr(body: &[Instruction]) -> Option<(usize, &Instruction)> {
    let (at, insn) = body
        .iter()
        .enumerate()
        .rev()
        .find(|(_, insn)| insn.semantics().writes_ctr || insn.is_branch())?;
    (insn.opcode == Opcode::Mtctr).then_some((at, insn))
}

/// Nearest instruction writing `reg`, stopping at any intervening branch.
fn last_gpr_writer(body: &[Instruction], reg: u8) -> Option<(usize, &Instruction)> {
    for (at, insn) in body.iter().enumerate().rev() {
        if insn.semantics().writes_gpr.contains(&reg) {
            return Some((at, insn));
        }
        if insn.is_branch() && !insn.is_conditional() {
            return None;
        }
    }
    None
}

/// `rlwinm rA, rS, 2, 0, 29`, the `slwi rA, rS, 2` form.
#[inline]
fn is_word_scale(insn: &Instruction) -> bool {
    insn.opcode == Opcode::Rlwinm && insn.sh() == 2 && insn.mb() == 0 && insn.me() == 29
}

/// Value of `reg` built by `lis` plus an optional `addi`/`ori` low half.
fn resolve_constant(body: &[Instruction], reg: u8) -> Option<u32> {
    let (at, insn) = last_gpr_writer(body, reg)?;
    match insn.opcode {
        Opcode::Lis => Some(insn.uimm() << 16),
        Opcode::Addi if insn.ra() == reg => {
            let high: u32 = resolve_constant(&body[..at], reg)?;
            Some(high.wrapping_add(insn.simm() as u32))
        }
        Opcode::Ori if insn.rs() == reg && insn.ra() == reg => {
            let high: u32 = resolve_constant(&body[..at], reg)?;
            Some(high | insn.uimm())
        }
        _ => None,
    }
}

/// Number of table entries implied by the bounds check on `index_reg`.
fn case_count(body: &[Instruction], index_reg: u8) -> Option<u32> {
    let (at, compare) = body.iter().enumerate().rev().find(|(_, insn)| {
        insn.opcode == Opcode::Cmpli && !insn.cmp_l() && insn.ra() == index_reg
    })?;
    if body[at + 1..]
        .iter()
        .any(|insn| insn.semantics().writes_gpr.contains(&index_reg))
    {
        return None;
    }

    let bound: u32 = compare.uimm();
    let field: u8 = compare.crfd();
    // `bge` (branch if not LT) excludes the bound itself, `bgt` includes it.
    let excludes_bound: bool = body[at + 1..].iter().any(|insn| {
        insn.opcode == Opcode::Bc
            && insn.bi() >> 2 == field
            && insn.bi() & 3 == 0
            && insn.bo() & 0x08 == 0
    });
    Some(if excludes_bound { bound } else { bound + 1 })
}
