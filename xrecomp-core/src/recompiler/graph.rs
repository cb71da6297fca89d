//! Function Graph
//!
//! The single owner of every [`FunctionNode`] discovered or configured for a
//! module. Discovery is the only writer; once emission starts the graph is shared
//! immutably (`&FunctionGraph`) across emission tasks.
//!
//! # Invariants
//! - Function addresses are unique (nodes are keyed by address)
//! - [`FunctionGraph::add_function`] is idempotent
//! - Mutators touch only the node they name

use crate::recompiler::error::{RecompilerError, RecompilerResult};
use serde::Serialize;
use std::collections::BTreeMap;
use std::ops::Range;

/// Who decided a function's boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Authority {
    Discovered,
    Configured,
}

/// Call edge leaving a function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct CallTarget {
    /// Address of the branch instruction.
    pub site: u32,
    /// Callee entry; `None` for indirect calls that could not be resolved.
    pub target: Option<u32>,
    /// Set for branches that leave the function without linking.
    pub is_tail_call: bool,
}

impl CallTarget {
    pub fn direct(site: u32, target: u32) -> Self {
        Self {
            site,
            target: Some(target),
            is_tail_call: false,
        }
    }

    pub fn tail(site: u32, target: u32) -> Self {
        Self {
            site,
            target: Some(target),
            is_tail_call: true,
        }
    }

    pub fn unresolved(site: u32, is_tail_call: bool) -> Self {
        Self {
            site,
            target: None,
            is_tail_call,
        }
    }

    #[inline]
    pub fn is_resolved(&self) -> bool {
        self.target.is_some()
    }
}

/// Where a jump table came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum JumpTableSource {
    Configured,
    Recognized,
}

/// Target list of a `bctr` dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JumpTable {
    /// Address of the `bctr`.
    pub address: u32,
    /// Address of the table data, when known.
    pub table_base: Option<u32>,
    /// Register holding the (unscaled) case index.
    pub index_register: u8,
    /// Case targets in table order.
    pub targets: Vec<u32>,
    pub source: JumpTableSource,
}

impl JumpTable {
    /// Check that every target is word aligned and executable.
    pub fn validate(&self, is_executable: impl Fn(u32) -> bool) -> RecompilerResult<()> {
        for &target in self.targets.iter() {
            if target & 3 != 0 {
                return Err(RecompilerError::invalid_jump_table(
                    self.address,
                    format!("target 0x{:08X} is not 4-byte aligned", target),
                ));
            }
            if !is_executable(target) {
                return Err(RecompilerError::invalid_jump_table(
                    self.address,
                    format!("target 0x{:08X} is not executable", target),
                ));
            }
        }
        Ok(())
    }
}

/// One function (or chunk) of the module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionNode {
    pub address: u32,
    pub size: u32,
    pub authority: Authority,
    /// Basic-block ranges sorted by start address, never overlapping.
    pub blocks: Vec<Range<u32>>,
    pub calls: Vec<CallTarget>,
    pub jump_tables: BTreeMap<u32, JumpTable>,
    /// `bctr` sites that could not be classified.
    pub unresolved_jumps: Vec<u32>,
    pub name: Option<String>,
    /// Parent function for chunks nested in another function's range.
    pub parent: Option<u32>,
}

impl FunctionNode {
    fn new(address: u32, size: u32, authority: Authority) -> Self {
        Self {
            address,
            size,
            authority,
            blocks: Vec::new(),
            calls: Vec::new(),
            jump_tables: BTreeMap::new(),
            unresolved_jumps: Vec::new(),
            name: None,
            parent: None,
        }
    }

    /// One past the last byte of the function.
    #[inline]
    pub fn end(&self) -> u32 {
        self.address.wrapping_add(self.size)
    }

    #[inline]
    pub fn contains(&self, address: u32) -> bool {
        address >= self.address && address < self.end()
    }

    #[inline]
    pub fn is_chunk(&self) -> bool {
        self.parent.is_some()
    }

    /// Configured name, or the synthesized `sub_XXXXXXXX`.
    pub fn display_name(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("sub_{:08X}", self.address),
        }
    }

    /// Block whose range contains `address`.
    pub fn block_containing(&self, address: u32) -> Option<&Range<u32>> {
        let index: usize = self.blocks.partition_point(|block| block.start <= address);
        index
            .checked_sub(1)
            .map(|i| &self.blocks[i])
            .filter(|block| block.contains(&address))
    }

    /// Whether `address` starts one of this function's blocks.
    pub fn is_block_start(&self, address: u32) -> bool {
        self.blocks
            .binary_search_by_key(&address, |block| block.start)
            .is_ok()
    }

    /// Precomputed call edge recorded at `site`.
    pub fn call_at(&self, site: u32) -> Option<&CallTarget> {
        self.calls.iter().find(|call| call.site == site)
    }

    /// Insert a block, splitting an existing block when the new one starts inside it.
    fn insert_block(&mut self, block: Range<u32>) {
        if block.start >= block.end {
            return;
        }
        let index: usize = self.blocks.partition_point(|existing| existing.start < block.start);
        if self.blocks.get(index).map(|existing| existing.start) == Some(block.start) {
            let limit: u32 = self.next_block_start(index + 1);
            let end: u32 = self.blocks[index].end.max(block.end).min(limit);
            self.blocks[index].end = end;
            return;
        }

        let mut end: u32 = block.end;
        if index > 0 && self.blocks[index - 1].end > block.start {
            end = end.max(self.blocks[index - 1].end);
            self.blocks[index - 1].end = block.start;
        }
        let end: u32 = end.min(self.next_block_start(index));
        self.blocks.insert(index, block.start..end);
    }

    fn next_block_start(&self, index: usize) -> u32 {
        self.blocks.get(index).map(|next| next.start).unwrap_or(u32::MAX)
    }
}

/// Owned model of all functions of one module.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FunctionGraph {
    functions: BTreeMap<u32, FunctionNode>,
}

impl FunctionGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a function, or return the existing node at `address`.
    ///
    /// Idempotent: re-adding an address never creates a second node. A
    /// `Configured` re-add takes over the size and authority of a `Discovered`
    /// node, since configuration boundaries win over discovered ones.
    pub fn add_function(&mut self, address: u32, size: u32, authority: Authority) -> &mut FunctionNode {
        let node: &mut FunctionNode = self
            .functions
            .entry(address)
            .or_insert_with(|| FunctionNode::new(address, size, authority));
        if authority == Authority::Configured && node.authority == Authority::Discovered {
            node.authority = Authority::Configured;
            node.size = size;
        }
        node
    }

    fn node_mut(&mut self, address: u32) -> RecompilerResult<&mut FunctionNode> {
        self.functions
            .get_mut(&address)
            .ok_or_else(|| RecompilerError::unknown_function(address))
    }

    /// Record a basic block. Discovered functions grow to cover the block.
    pub fn add_block_to_function(&mut self, address: u32, block: Range<u32>) -> RecompilerResult<()> {
        let node: &mut FunctionNode = self.node_mut(address)?;
        if node.authority == Authority::Discovered && block.end > node.end() {
            node.size = block.end - node.address;
        }
        node.insert_block(block);
        Ok(())
    }

    pub fn set_function_name(&mut self, address: u32, name: impl Into<String>) -> RecompilerResult<()> {
        self.node_mut(address)?.name = Some(name.into());
        Ok(())
    }

    pub fn set_function_size(&mut self, address: u32, size: u32) -> RecompilerResult<()> {
        self.node_mut(address)?.size = size;
        Ok(())
    }

    pub fn set_function_parent(&mut self, address: u32, parent: u32) -> RecompilerResult<()> {
        self.node_mut(address)?.parent = Some(parent);
        Ok(())
    }

    pub fn add_unresolved_jump_to_function(&mut self, address: u32, site: u32) -> RecompilerResult<()> {
        let node: &mut FunctionNode = self.node_mut(address)?;
        if !node.unresolved_jumps.contains(&site) {
            node.unresolved_jumps.push(site);
        }
        Ok(())
    }

    pub fn add_call_to_function(&mut self, address: u32, call: CallTarget) -> RecompilerResult<()> {
        let node: &mut FunctionNode = self.node_mut(address)?;
        if !node.calls.contains(&call) {
            node.calls.push(call);
        }
        Ok(())
    }

    pub fn add_jump_table_to_function(&mut self, address: u32, table: JumpTable) -> RecompilerResult<()> {
        let node: &mut FunctionNode = self.node_mut(address)?;
        node.jump_tables.insert(table.address, table);
        Ok(())
    }

    /// Read view keyed by address.
    #[inline]
    pub fn functions(&self) -> &BTreeMap<u32, FunctionNode> {
        &self.functions
    }

    /// Number of unique function addresses.
    #[inline]
    pub fn function_count(&self) -> usize {
        self.functions.len()
    }

    pub fn function(&self, address: u32) -> Option<&FunctionNode> {
        self.functions.get(&address)
    }

    pub fn function_by_name(&self, name: &str) -> Option<&FunctionNode> {
        self.functions
            .values()
            .find(|node| node.name.as_deref() == Some(name))
    }

    /// Innermost function whose range contains `address`.
    pub fn function_containing(&self, address: u32) -> Option<&FunctionNode> {
        self.functions
            .range(..=address)
            .rev()
            .map(|(_, node)| node)
            .find(|node| node.contains(address))
    }

    /// Name used when emitting a call to `address`.
    pub fn name_of(&self, address: u32) -> String {
        match self.functions.get(&address) {
            Some(node) => node.display_name(),
            None => format!("sub_{:08X}", address),
        }
    }

    /// Functions with a direct call or tail call to `target`.
    pub fn callers_of(&self, target: u32) -> Vec<u32> {
        self.functions
            .values()
            .filter(|node| node.calls.iter().any(|call| call.target == Some(target)))
            .map(|node| node.address)
            .collect()
    }

    /// Chunk functions attached to `parent`.
    pub fn chunks_of(&self, parent: u32) -> Vec<&FunctionNode> {
        self.functions
            .values()
            .filter(|node| node.parent == Some(parent))
            .collect()
    }

    /// Pairs of non-chunk functions whose ranges overlap.
    pub fn overlapping_functions(&self) -> Vec<(u32, u32)> {
        let mut overlaps: Vec<(u32, u32)> = Vec::new();
        // Earlier functions still open at the current start.
        let mut open: Vec<&FunctionNode> = Vec::new();
        for node in self.functions.values().filter(|node| !node.is_chunk()) {
            open.retain(|prev| prev.end() > node.address);
            overlaps.extend(open.iter().map(|prev| (prev.address, node.address)));
            open.push(node);
        }
        overlaps
    }

    /// Serialise the graph for external tooling.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
