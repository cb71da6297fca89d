//! Control Flow Layout
//!
//! Splits a discovered function into the labelled blocks the emitter lays out as
//! arms of its dispatch loop, and connects them with typed edges.
//!
//! # Memory Optimizations
//! - `EdgeType` uses `#[repr(u8)]`
//! - `BasicBlock.successors` and `predecessors` use `SmallVec<[u32; 2]>` (most blocks have ≤2)
//! - Block IDs use `u32`
//!
//! # Construction Algorithm
//! 1. **Collect labels**: discovered block starts, local branch and jump-table
//!    targets, mid-asm hook jump targets and chunk entries
//! 2. **Build basic blocks**: split each discovered block at every label inside it
//! 3. **Identify edges**: from each block's last instruction (or fallthrough)

use crate::recompiler::config::RecompilerConfig;
use crate::recompiler::decoder::{BranchKind, Instruction, Semantics};
use crate::recompiler::graph::{FunctionGraph, FunctionNode};
use smallvec::SmallVec;
use std::collections::{BTreeSet, HashMap};

/// Labelled blocks of one function.
#[derive(Debug, Clone)]
pub struct ControlFlowGraph {
    pub nodes: Vec<BasicBlock>,
    pub edges: Vec<Edge>,
    /// Block holding the function entry.
    pub entry_block: u32,
}

/// Straight-line run of instructions starting at a label.
#[derive(Debug, Clone)]
pub struct BasicBlock {
    pub id: u32,
    pub start_address: u32,
    /// One past the last instruction.
    pub end_address: u32,
    pub instructions: Vec<Instruction>,
    pub successors: SmallVec<[u32; 2]>,
    pub predecessors: SmallVec<[u32; 2]>,
}

impl BasicBlock {
    #[inline]
    pub fn last(&self) -> Option<&Instruction> {
        self.instructions.last()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Edge {
    pub from: u32,
    pub to: u32,
    pub edge_type: EdgeType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EdgeType {
    Unconditional = 0,
    ConditionalTrue = 1,
    ConditionalFalse = 2,
    /// Straight-line flow into the next label.
    Fallthrough = 3,
    /// One case of a jump table.
    Switch = 4,
}

impl ControlFlowGraph {
    /// Block that starts at `address`.
    pub fn block_at(&self, address: u32) -> Option<&BasicBlock> {
        self.nodes
            .binary_search_by_key(&address, |block| block.start_address)
            .ok()
            .map(|index| &self.nodes[index])
    }

    /// Whether `address` has a label (a dispatch arm).
    #[inline]
    pub fn is_label(&self, address: u32) -> bool {
        self.block_at(address).is_some()
    }

    pub fn labels(&self) -> impl Iterator<Item = u32> + '_ {
        self.nodes.iter().map(|block| block.start_address)
    }
}

pub struct ControlFlowAnalyzer;

impl ControlFlowAnalyzer {
    /// Build the block layout of `node`.
    ///
    /// # Arguments
    /// * `graph` - Function graph (for chunk entries inside the function)
    /// * `node` - Function to lay out
    /// * `instructions` - Decoded instructions of the function's range, in address order
    /// * `config` - Overrides (mid-asm hook targets become labels)
    ///
    /// # Returns
    /// `ControlFlowGraph` - Blocks sorted by start address
    pub fn build_cfg(
        graph: &FunctionGraph,
        node: &FunctionNode,
        instructions: &[Instruction],
        config: &RecompilerConfig,
    ) -> ControlFlowGraph {
        let by_address: HashMap<u32, usize> = instructions
            .iter()
            .enumerate()
            .map(|(index, insn)| (insn.address, index))
            .collect();

        let mut labels: BTreeSet<u32> = node.blocks.iter().map(|block| block.start).collect();
        labels.insert(node.address);
        for insn in instructions.iter() {
            if let Some(target) = insn.target {
                if !insn.is_call() && node.contains(target) {
                    labels.insert(target);
                }
            }
            for hook in config.hooks_at(insn.address) {
                labels.extend(
                    [hook.jump_address, hook.jump_address_on_true, hook.jump_address_on_false]
                        .into_iter()
                        .flatten()
                        .filter(|&target| node.contains(target)),
                );
            }
        }
        for table in node.jump_tables.values() {
            labels.extend(table.targets.iter().copied().filter(|&target| node.contains(target)));
        }
        for chunk in graph.chunks_of(node.address) {
            if node.contains(chunk.address) {
                labels.insert(chunk.address);
            }
        }

        // Blocks come from discovery; a function without blocks is one straight run.
        let ranges: Vec<std::ops::Range<u32>> = if node.blocks.is_empty() {
            vec![node.address..node.end()]
        } else {
            node.blocks.clone()
        };

        let mut nodes: Vec<BasicBlock> = Vec::new();
        for range in ranges.iter() {
            let mut current: Option<BasicBlock> = None;
            let mut address: u32 = range.start;
            while address < range.end {
                let Some(&index) = by_address.get(&address) else {
                    break;
                };
                if labels.contains(&address) || current.is_none() {
                    if let Some(block) = current.take() {
                        nodes.push(block);
                    }
                    current = Some(BasicBlock {
                        id: 0,
                        start_address: address,
                        end_address: address,
                        instructions: Vec::new(),
                        successors: SmallVec::new(),
                        predecessors: SmallVec::new(),
                    });
                }
                if let Some(block) = current.as_mut() {
                    block.instructions.push(instructions[index]);
                    block.end_address = address + 4;
                }
                address += 4;
            }
            if let Some(block) = current {
                nodes.push(block);
            }
        }
        nodes.sort_by_key(|block| block.start_address);
        nodes.dedup_by_key(|block| block.start_address);
        for (id, block) in nodes.iter_mut().enumerate() {
            block.id = id as u32;
        }

        let edges: Vec<Edge> = Self::connect(&mut nodes, node);
        let entry_block: u32 = nodes
            .iter()
            .position(|block| block.start_address == node.address)
            .unwrap_or(0) as u32;

        ControlFlowGraph {
            nodes,
            edges,
            entry_block,
        }
    }

    fn connect(nodes: &mut [BasicBlock], node: &FunctionNode) -> Vec<Edge> {
        let index_of: HashMap<u32, u32> = nodes
            .iter()
            .map(|block| (block.start_address, block.id))
            .collect();
        let mut edges: Vec<Edge> = Vec::new();

        for block in nodes.iter() {
            let Some(last) = block.last() else {
                continue;
            };
            let semantics: Semantics = last.semantics();
            let mut push = |to: Option<&u32>, edge_type: EdgeType| {
                if let Some(&to) = to {
                    edges.push(Edge {
                        from: block.id,
                        to,
                        edge_type,
                    });
                }
            };
            match semantics.branch {
                BranchKind::Jump | BranchKind::Conditional => {
                    let taken: EdgeType = if semantics.conditional {
                        EdgeType::ConditionalTrue
                    } else {
                        EdgeType::Unconditional
                    };
                    push(last.target.as_ref().and_then(|target| index_of.get(target)), taken);
                    if semantics.conditional {
                        push(index_of.get(&block.end_address), EdgeType::ConditionalFalse);
                    }
                }
                BranchKind::IndirectJump => {
                    if let Some(table) = node.jump_tables.get(&last.address) {
                        for target in table.targets.iter() {
                            push(index_of.get(target), EdgeType::Switch);
                        }
                    }
                    if semantics.conditional {
                        push(index_of.get(&block.end_address), EdgeType::ConditionalFalse);
                    }
                }
                BranchKind::Return => {
                    if semantics.conditional {
                        push(index_of.get(&block.end_address), EdgeType::ConditionalFalse);
                    }
                }
                BranchKind::None | BranchKind::Call | BranchKind::IndirectCall => {
                    if !last.is_unconditional_trap() {
                        push(index_of.get(&block.end_address), EdgeType::Fallthrough);
                    }
                }
            }
        }

        for edge in edges.iter() {
            if let Some(block) = nodes.get_mut(edge.from as usize) {
                if !block.successors.contains(&edge.to) {
                    block.successors.push(edge.to);
                }
            }
            if let Some(block) = nodes.get_mut(edge.to as usize) {
                if !block.predecessors.contains(&edge.from) {
                    block.predecessors.push(edge.from);
                }
            }
        }
        edges
    }
}
