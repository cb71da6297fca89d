//! Function Discovery
//!
//! Populates a [`FunctionGraph`] from entry-point hints and the executable
//! sections of a [`BinaryImage`].
//!
//! # Algorithm
//! 1. Seed the entry set: image entry point, function symbols, configured
//!    functions, exception-handler hints and any extra hints (vtable slots)
//! 2. Pass: scan every entry with a worklist traversal bounded by its limit
//!    (next non-chunk known start, section end or configured end). Direct call
//!    and tail-call targets become new entries; repeat until the entry set is stable
//! 3. Gap sweep: walk the executable bytes no function covers, skip padding and
//!    data runs, and add the first plausible instruction of each run as an entry
//! 4. Repeat 2-3 until the sweep finds nothing, then build the graph
//!
//! Scans are cached by `(entry, limit)`, so a pass only re-scans functions whose
//! limit moved because a new entry appeared inside them.
//!
//! # Block Termination
//! - `b`, `bc`, `blr`, `bctr`, unconditional traps and `rfid` end a block
//! - `sc` and conditional traps end a block and continue at the fallthrough
//! - Calls never end a block; the callee is discovered on its own
//! - Unknown words and configured invalid-instruction patterns end the block as a
//!   data boundary

use crate::recompiler::analysis::switch_table::{self, SEARCH_WINDOW};
use crate::recompiler::config::{AnalysisOptions, FunctionOverride, RecompilerConfig};
use crate::recompiler::decoder::{self, BranchKind, Instruction, Opcode, OpcodeGroup, Semantics};
use crate::recompiler::error::RecompilerResult;
use crate::recompiler::graph::{Authority, CallTarget, FunctionGraph, JumpTable, JumpTableSource};
use crate::recompiler::image::{BinaryImage, Section};
use crate::recompiler::vtable::VTableInfo;
use bitvec::prelude::*;
use std::collections::{BTreeSet, HashMap};
use std::ops::Range;

/// Result of scanning one entry against one limit.
#[derive(Debug, Clone, Default)]
struct FunctionScan {
    limit: u32,
    blocks: Vec<Range<u32>>,
    calls: Vec<CallTarget>,
    jump_tables: Vec<JumpTable>,
    unresolved_jumps: Vec<u32>,
    /// Call and tail-call targets found while scanning.
    new_entries: Vec<u32>,
}

impl FunctionScan {
    /// One past the highest byte covered by a block.
    fn extent(&self, entry: u32) -> u32 {
        self.blocks.iter().map(|block| block.end).max().unwrap_or(entry)
    }
}

/// Worklist-driven function discovery over one image.
pub struct FunctionDiscovery<'a> {
    image: &'a BinaryImage,
    config: &'a RecompilerConfig,
    /// Every known function start, chunks included.
    entries: BTreeSet<u32>,
    /// Starts that bound other functions (chunks excluded).
    boundaries: BTreeSet<u32>,
    names: HashMap<u32, String>,
    scans: HashMap<u32, FunctionScan>,
}

impl<'a> FunctionDiscovery<'a> {
    /// Create a discovery run seeded from the image and configuration.
    ///
    /// The configuration is expected to have passed validation.
    pub fn new(image: &'a BinaryImage, config: &'a RecompilerConfig) -> Self {
        let mut discovery: FunctionDiscovery<'a> = Self {
            image,
            config,
            entries: BTreeSet::new(),
            boundaries: BTreeSet::new(),
            names: HashMap::new(),
            scans: HashMap::new(),
        };
        discovery.seed();
        discovery
    }

    fn seed(&mut self) {
        for entry in self.config.functions.iter() {
            if !self.image.is_executable(entry.address) {
                log::warn!(
                    "Configured function {} (0x{:08X}) is not in an executable section",
                    entry.key,
                    entry.address
                );
                continue;
            }
            self.entries.insert(entry.address);
            if !entry.is_chunk() {
                self.boundaries.insert(entry.address);
            }
            if let Some(name) = &entry.name {
                self.names.insert(entry.address, name.clone());
            }
        }

        self.add_entry(self.image.entry_point());
        let symbols: Vec<(u32, String)> = self
            .image
            .symbols()
            .iter()
            .map(|symbol| (symbol.address, symbol.name.clone()))
            .collect();
        for (address, name) in symbols {
            if self.add_entry(address) && !name.is_empty() {
                self.names.entry(address).or_insert(name);
            }
        }
        let handlers: Vec<u32> = self.config.analysis.exception_handler_funcs.clone();
        for address in handlers {
            self.add_entry(address);
        }

        log::debug!("Discovery seeded with {} entries", self.entries.len());
    }

    /// Add a function entry hint.
    ///
    /// # Returns
    /// `bool` - Whether the address is a usable entry (aligned, executable, not
    /// strictly inside a configured function)
    pub fn add_entry(&mut self, address: u32) -> bool {
        if address & 3 != 0 || !self.image.is_executable(address) {
            return false;
        }
        if let Some(owner) = self.configured_owner(address) {
            if owner.address != address {
                log::debug!(
                    "Ignoring entry 0x{:08X} inside configured function 0x{:08X}",
                    address,
                    owner.address
                );
                return false;
            }
        }
        self.entries.insert(address);
        let is_chunk: bool = self
            .config
            .function_override(address)
            .map(FunctionOverride::is_chunk)
            .unwrap_or(false);
        if !is_chunk {
            self.boundaries.insert(address);
        }
        true
    }

    /// Add every slot of the recovered vtables as an entry.
    pub fn add_vtable_hints(&mut self, tables: &[VTableInfo]) {
        let before: usize = self.entries.len();
        for table in tables.iter() {
            for &slot in table.slots.iter() {
                self.add_entry(slot);
            }
        }
        log::debug!(
            "VTable hints added {} new entries",
            self.entries.len() - before
        );
    }

    /// Run discovery to a fixed point and build the graph.
    pub fn run(mut self) -> RecompilerResult<FunctionGraph> {
        let mut round: usize = 0;
        loop {
            round += 1;
            self.run_passes();
            let swept: usize = self.sweep_gaps();
            log::debug!(
                "Discovery round {}: {} entries, {} found by gap sweep",
                round,
                self.entries.len(),
                swept
            );
            if swept == 0 {
                break;
            }
        }
        let graph: FunctionGraph = self.build_graph()?;
        log::info!(
            "Discovered {} functions in {} round(s)",
            graph.function_count(),
            round
        );
        Ok(graph)
    }

    /// Scan all entries until no new entry appears.
    fn run_passes(&mut self) {
        loop {
            let mut found: Vec<u32> = Vec::new();
            let entries: Vec<u32> = self.entries.iter().copied().collect();
            for entry in entries {
                let limit: u32 = self.limit_of(entry);
                let cached: bool = self
                    .scans
                    .get(&entry)
                    .map(|scan| scan.limit == limit)
                    .unwrap_or(false);
                if !cached {
                    let scan: FunctionScan = self.scan_function(entry, limit);
                    self.scans.insert(entry, scan);
                }
                if let Some(scan) = self.scans.get(&entry) {
                    found.extend(scan.new_entries.iter().copied());
                }
            }

            let before: usize = self.entries.len();
            for address in found {
                self.add_entry(address);
            }
            if self.entries.len() == before {
                break;
            }
        }
        self.scans.retain(|entry, _| self.entries.contains(entry));
    }

    fn configured_owner(&self, address: u32) -> Option<&'a FunctionOverride> {
        let config: &'a RecompilerConfig = self.config;
        config.functions.iter().find(|entry| {
            !entry.is_chunk()
                && entry
                    .extent()
                    .map(|size| address >= entry.address && address < entry.address.wrapping_add(size))
                    .unwrap_or(false)
        })
    }

    /// Exclusive scan limit for `entry`.
    fn limit_of(&self, entry: u32) -> u32 {
        let section_end: u32 = self
            .image
            .section_containing(entry)
            .map(Section::end)
            .unwrap_or(entry);
        let mut limit: u32 = section_end;
        if let Some(&next) = self.boundaries.range(entry.wrapping_add(1)..).next() {
            limit = limit.min(next);
        }
        if let Some(size) = self.config.function_override(entry).and_then(FunctionOverride::extent) {
            limit = entry.saturating_add(size).min(section_end);
        }
        limit
    }

    /// Worklist traversal of one function.
    fn scan_function(&self, entry: u32, limit: u32) -> FunctionScan {
        let mut scan: FunctionScan = FunctionScan {
            limit,
            ..FunctionScan::default()
        };
        if limit <= entry {
            return scan;
        }

        let analysis: &AnalysisOptions = &self.config.analysis;
        let word_count: usize = (limit - entry).div_ceil(4) as usize;
        let mut visited: BitVec<u32> = bitvec![u32, Lsb0; 0; word_count];
        let mut pending: BTreeSet<u32> = BTreeSet::new();
        let mut splits: BTreeSet<u32> = BTreeSet::new();
        pending.insert(entry);
        let mut extent: u32 = entry;

        while let Some(start) = pending.pop_first() {
            if start < entry || start >= limit || start & 3 != 0 {
                continue;
            }
            if visited[((start - entry) / 4) as usize] {
                // Branch into the middle of a scanned block.
                splits.insert(start);
                continue;
            }

            let mut address: u32 = start;
            let mut successors: Vec<u32> = Vec::new();
            loop {
                if address >= limit || visited[((address - entry) / 4) as usize] {
                    break;
                }
                let Ok(raw) = self.image.read_u32(address) else {
                    break;
                };
                if let Some(hint) = self.config.invalid_instruction(raw) {
                    log::debug!(
                        "0x{:08X}: invalid-instruction pattern 0x{:08X} ({} bytes), data boundary",
                        address,
                        raw,
                        hint.size
                    );
                    break;
                }
                let insn: Instruction = decoder::decode(address, raw);
                if insn.is_unknown() {
                    log::debug!("0x{:08X}: undecodable word 0x{:08X}, data boundary", address, raw);
                    break;
                }
                visited.set(((address - entry) / 4) as usize, true);
                let next: u32 = address + 4;
                for hook in self.config.hooks_at(address) {
                    successors.extend(
                        [hook.jump_address, hook.jump_address_on_true, hook.jump_address_on_false]
                            .into_iter()
                            .flatten(),
                    );
                }

                if insn.group() == OpcodeGroup::Trap {
                    if !insn.is_unconditional_trap() {
                        successors.push(next);
                    }
                    address = next;
                    break;
                }
                if insn.opcode == Opcode::Sc {
                    successors.push(next);
                    address = next;
                    break;
                }
                if insn.opcode == Opcode::Rfid {
                    address = next;
                    break;
                }

                let semantics: Semantics = insn.semantics();
                match semantics.branch {
                    BranchKind::None => {}
                    BranchKind::Call => {
                        if let Some(target) = insn.target {
                            // `bcl 20, 31, $+4` reads the program counter into LR.
                            if target != next {
                                self.record_call(&mut scan, CallTarget::direct(address, target));
                            }
                        }
                    }
                    BranchKind::IndirectCall => {
                        scan.calls.push(CallTarget::unresolved(address, false));
                        if semantics.conditional {
                            log::debug!("0x{:08X}: conditional indirect call", address);
                        }
                    }
                    BranchKind::Jump | BranchKind::Conditional => {
                        if let Some(target) = insn.target {
                            let function_size: u32 = extent.max(next) - entry;
                            let local: bool = target >= entry
                                && target < limit
                                && (target <= extent.max(next).saturating_add(analysis.max_jump_extension)
                                    || function_size < analysis.large_function_threshold);
                            if local {
                                successors.push(target);
                            } else {
                                self.record_call(&mut scan, CallTarget::tail(address, target));
                            }
                        }
                        if semantics.conditional {
                            successors.push(next);
                        }
                        address = next;
                        break;
                    }
                    BranchKind::Return => {
                        if semantics.conditional {
                            successors.push(next);
                        }
                        address = next;
                        break;
                    }
                    BranchKind::IndirectJump => {
                        successors.extend(self.resolve_indirect_jump(&mut scan, entry, limit, &insn));
                        if semantics.conditional {
                            successors.push(next);
                        }
                        address = next;
                        break;
                    }
                }
                address = next;
            }

            if address > start {
                scan.blocks.push(start..address);
                extent = extent.max(address);
            }
            for target in successors {
                if target >= entry && target < limit {
                    pending.insert(target);
                }
            }
        }

        scan.blocks = split_blocks(std::mem::take(&mut scan.blocks), &splits);
        log::debug!(
            "Scanned 0x{:08X}: {} blocks, extent 0x{:08X}, limit 0x{:08X}",
            entry,
            scan.blocks.len(),
            scan.extent(entry),
            limit
        );
        scan
    }

    fn record_call(&self, scan: &mut FunctionScan, call: CallTarget) {
        if let Some(target) = call.target {
            if target & 3 == 0 && self.image.is_executable(target) {
                scan.new_entries.push(target);
            } else {
                log::debug!(
                    "0x{:08X}: branch target 0x{:08X} is not executable",
                    call.site,
                    target
                );
            }
        }
        if !scan.calls.contains(&call) {
            scan.calls.push(call);
        }
    }

    /// Classify a `bctr`; returns local successors.
    ///
    /// # Algorithm
    /// Configured switch table, then configured indirect-call hint, then
    /// automatic recognition, otherwise unresolved.
    fn resolve_indirect_jump(
        &self,
        scan: &mut FunctionScan,
        entry: u32,
        limit: u32,
        insn: &Instruction,
    ) -> Vec<u32> {
        let site: u32 = insn.address;

        if let Some(manual) = self.config.switch_table_at(site) {
            let table: JumpTable = JumpTable {
                address: site,
                table_base: None,
                index_register: manual.register,
                targets: manual.labels.clone(),
                source: JumpTableSource::Configured,
            };
            match table.validate(|address| self.image.is_executable(address)) {
                Ok(()) => return self.accept_jump_table(scan, entry, limit, table),
                Err(err) => log::warn!("Ignoring configured switch table: {}", err),
            }
        }

        if self.config.is_indirect_call(site) {
            scan.calls.push(CallTarget::unresolved(site, true));
            return Vec::new();
        }

        if insn.opcode == Opcode::Bctr {
            let window: Vec<Instruction> = self.decode_window(entry, site);
            if let Some(table) = switch_table::recognize(self.image, &window) {
                return self.accept_jump_table(scan, entry, limit, table);
            }
        }

        log::debug!("0x{:08X}: unresolved indirect jump", site);
        scan.unresolved_jumps.push(site);
        Vec::new()
    }

    fn accept_jump_table(&self, scan: &mut FunctionScan, entry: u32, limit: u32, table: JumpTable) -> Vec<u32> {
        let mut locals: Vec<u32> = Vec::with_capacity(table.targets.len());
        for &target in table.targets.iter() {
            if target >= entry && target < limit {
                locals.push(target);
            } else {
                log::warn!(
                    "Jump table at 0x{:08X}: case 0x{:08X} leaves function 0x{:08X}",
                    table.address,
                    target,
                    entry
                );
            }
        }
        scan.jump_tables.push(table);
        locals
    }

    /// Up to [`SEARCH_WINDOW`] instructions before `site`, plus `site` itself.
    fn decode_window(&self, entry: u32, site: u32) -> Vec<Instruction> {
        let start: u32 = site
            .saturating_sub((SEARCH_WINDOW as u32) * 4)
            .max(entry);
        (start..=site)
            .step_by(4)
            .filter_map(|address| {
                self.image
                    .read_u32(address)
                    .ok()
                    .map(|raw| decoder::decode(address, raw))
            })
            .collect()
    }

    /// Linear sweep of executable bytes no function covers.
    fn sweep_gaps(&mut self) -> usize {
        let threshold_words: u32 = (self.config.analysis.data_region_threshold / 4).max(1);
        let mut found: Vec<u32> = Vec::new();
        let image: &'a BinaryImage = self.image;

        for section in image.executable_sections() {
            let word_count: usize = (section.size / 4) as usize;
            let mut covered: BitVec<u32> = bitvec![u32, Lsb0; 0; word_count];
            let mark = |range: Range<u32>, covered: &mut BitVec<u32>| {
                let start: u32 = range.start.max(section.address);
                let end: u32 = range.end.min(section.end());
                let mut address: u32 = start;
                while address < end {
                    covered.set(((address - section.address) / 4) as usize, true);
                    address += 4;
                }
            };
            for (&entry, scan) in self.scans.iter() {
                for block in scan.blocks.iter() {
                    mark(block.clone(), &mut covered);
                }
                for table in scan.jump_tables.iter() {
                    if let Some(base) = table.table_base {
                        mark(base..base + (table.targets.len() as u32) * 4, &mut covered);
                    }
                }
                if let Some(size) = self.config.function_override(entry).and_then(FunctionOverride::extent) {
                    mark(entry..entry.saturating_add(size), &mut covered);
                }
            }

            let mut index: usize = 0;
            while index < word_count {
                if covered[index] {
                    index += 1;
                    continue;
                }
                let address: u32 = section.address + (index as u32) * 4;
                let Some(raw) = section.read_u32(address) else {
                    break;
                };
                if raw == 0 || decoder::decode(address, raw).opcode == Opcode::Nop {
                    index += 1;
                    continue;
                }
                if let Some(hint) = self.config.invalid_instruction(raw) {
                    index += (hint.size / 4).max(1) as usize;
                    continue;
                }

                // Zero or undecodable words form a run; long runs are data regions.
                let is_data = |i: usize| -> bool {
                    !covered[i]
                        && section
                            .read_u32(section.address + (i as u32) * 4)
                            .map(|word| decoder::is_likely_data(word) || self.config.invalid_instruction(word).is_some())
                            .unwrap_or(true)
                };
                if is_data(index) {
                    let run: usize = (index..word_count).take_while(|&i| is_data(i)).count();
                    if run >= threshold_words as usize {
                        log::debug!(
                            "Gap sweep: data region 0x{:08X}..0x{:08X}",
                            address,
                            address + (run as u32) * 4
                        );
                    }
                    index += run;
                    continue;
                }

                if self.entries.contains(&address) || !self.add_entry(address) {
                    index += 1;
                    continue;
                }
                found.push(address);
                let limit: u32 = self.limit_of(address);
                let scan: FunctionScan = self.scan_function(address, limit);
                let extent: u32 = scan.extent(address);
                mark(address..extent.max(address + 4), &mut covered);
                self.scans.insert(address, scan);
                index = ((extent.max(address + 4) - section.address) / 4) as usize;
            }
        }

        if !found.is_empty() {
            log::debug!("Gap sweep found {} function(s)", found.len());
        }
        found.len()
    }

    /// Materialise the cached scans into a graph.
    fn build_graph(&self) -> RecompilerResult<FunctionGraph> {
        let mut graph: FunctionGraph = FunctionGraph::new();

        for entry in self.config.functions.iter() {
            if !self.entries.contains(&entry.address) {
                continue;
            }
            let size: u32 = entry.extent().unwrap_or(0);
            let authority: Authority = if entry.extent().is_some() {
                Authority::Configured
            } else {
                Authority::Discovered
            };
            graph.add_function(entry.address, size, authority);
        }

        for (&entry, scan) in self.scans.iter() {
            let configured: bool = graph.function(entry).is_some();
            if scan.blocks.is_empty() && !configured {
                log::debug!("Dropping entry 0x{:08X}: no decodable code", entry);
                continue;
            }
            graph.add_function(entry, 0, Authority::Discovered);
            for block in scan.blocks.iter() {
                graph.add_block_to_function(entry, block.clone())?;
            }
            for call in scan.calls.iter() {
                graph.add_call_to_function(entry, *call)?;
            }
            for table in scan.jump_tables.iter() {
                graph.add_jump_table_to_function(entry, table.clone())?;
            }
            for &site in scan.unresolved_jumps.iter() {
                graph.add_unresolved_jump_to_function(entry, site)?;
            }
        }

        for entry in self.config.functions.iter() {
            if graph.function(entry.address).is_none() {
                continue;
            }
            if let Some(parent) = entry.parent {
                if graph.function(parent).is_some() {
                    graph.set_function_parent(entry.address, parent)?;
                } else {
                    log::warn!(
                        "Chunk 0x{:08X} names parent 0x{:08X}, which was not discovered",
                        entry.address,
                        parent
                    );
                }
            }
        }

        for (&address, name) in self.names.iter() {
            if graph.function(address).is_some() {
                graph.set_function_name(address, name.clone())?;
            }
        }

        Ok(graph)
    }
}

/// Sort blocks and split them at branch targets that land inside them.
fn split_blocks(mut blocks: Vec<Range<u32>>, splits: &BTreeSet<u32>) -> Vec<Range<u32>> {
    blocks.sort_by_key(|block| block.start);
    let mut result: Vec<Range<u32>> = Vec::with_capacity(blocks.len() + splits.len());
    for block in blocks {
        let mut start: u32 = block.start;
        for &split in splits.range(block.start.wrapping_add(1)..block.end) {
            result.push(start..split);
            start = split;
        }
        result.push(start..block.end);
    }
    result
}

/// Discover functions with default hints.
///
/// # Arguments
/// * `image` - Binary to analyse
/// * `config` - Validated overrides
/// * `vtables` - Recovered vtables whose slots are used as extra entries
pub fn discover_functions(
    image: &BinaryImage,
    config: &RecompilerConfig,
    vtables: &[VTableInfo],
) -> RecompilerResult<FunctionGraph> {
    let mut discovery: FunctionDiscovery<'_> = FunctionDiscovery::new(image, config);
    discovery.add_vtable_hints(vtables);
    discovery.run()
}
