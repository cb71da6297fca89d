//! Complete Recompilation Pipeline
//!
//! This module orchestrates the batch transformation from executable image to
//! Rust sources. It is the only part of the core that touches the filesystem.
//!
//! # Pipeline Stages
//! 1. **Load**: Read the override document and parse the binary image
//! 2. **Validate**: Check the overrides; errors stop the run unless forced
//! 3. **VTable Scan**: Collect virtual function tables from data sections
//! 4. **Discovery**: Build the function graph
//! 5. **Emission**: Translate every function in parallel
//! 6. **Output**: Write `<project>_recomp.<n>.rs` chunks and `<project>_mapping.rs`
//!
//! # Memory Optimizations
//! - Output chunks are built in one pre-sized `String` each
//! - Emitted functions are moved into the context, never cloned

use crate::recompiler::analysis::FunctionDiscovery;
use crate::recompiler::codegen::{CodeEmitter, EmittedFunction};
use crate::recompiler::config::{validate, RecompilerConfig, ValidationReport};
use crate::recompiler::graph::FunctionGraph;
use crate::recompiler::image::BinaryImage;
use crate::recompiler::vtable::{self, VTableInfo};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Approximate size at which an output source file is closed.
pub const SOURCE_CHUNK_BYTES: usize = 256 * 1024;

const SOURCE_HEADER: &str = "// Generated by xrecomp. Do not edit.\n\
#![allow(non_snake_case, unused_mut, unused_variables, unused_assignments, unreachable_code)]\n\
use super::*;\n\n";

/// Recompilation pipeline orchestrator.
pub struct RecompilationPipeline;

/// Mutable context that carries state through pipeline stages.
pub struct PipelineContext {
    pub config: RecompilerConfig,
    pub image: Option<BinaryImage>,
    pub vtables: Vec<VTableInfo>,
    pub graph: Option<FunctionGraph>,
    pub functions: Vec<EmittedFunction>,
    pub stats: PipelineStats,
}

/// Statistics collected during pipeline execution.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct PipelineStats {
    pub total_functions: usize,
    pub emitted_functions: usize,
    pub partial_functions: usize,
    pub unimplemented_instructions: usize,
    pub vtables: usize,
    pub config_warnings: usize,
}

impl PipelineContext {
    pub fn new(config: RecompilerConfig) -> Self {
        Self {
            config,
            image: None,
            vtables: Vec::new(),
            graph: None,
            functions: Vec::new(),
            stats: PipelineStats::default(),
        }
    }

    /// Context with an image that is already in memory.
    pub fn with_image(config: RecompilerConfig, image: BinaryImage) -> Self {
        let mut ctx: PipelineContext = Self::new(config);
        ctx.image = Some(image);
        ctx
    }
}

impl RecompilationPipeline {
    /// Run every stage for the project described by `config_path`.
    ///
    /// `file_path` and `out_directory_path` in the document are resolved
    /// relative to the document's directory.
    ///
    /// # Errors
    /// Returns error if the document or image cannot be read, if validation
    /// fails without `force`, or if the output cannot be written.
    pub fn run(config_path: &Path, force: bool) -> Result<PipelineContext> {
        let config: RecompilerConfig = load_config_file(config_path)?;
        let base: PathBuf = config_path.parent().map(Path::to_path_buf).unwrap_or_default();
        let image_path: PathBuf = base.join(
            config
                .file_path
                .as_deref()
                .context("Config does not name an input image (file_path)")?,
        );
        let output_dir: PathBuf = base.join(config.out_directory_path.as_deref().unwrap_or("out"));

        let mut ctx: PipelineContext = PipelineContext::new(config);
        Self::stage_load_image(&mut ctx, &image_path)?;
        Self::recompile(&mut ctx, &output_dir, force)?;
        Ok(ctx)
    }

    /// Run validation through output on a context that already holds an image.
    pub fn recompile(ctx: &mut PipelineContext, output_dir: &Path, force: bool) -> Result<Vec<PathBuf>> {
        log::info!("Starting recompilation of '{}'...", ctx.config.project_name);
        Self::stage_validate(ctx, force)?;
        Self::stage_scan_vtables(ctx)?;
        Self::stage_discover(ctx)?;
        Self::stage_emit(ctx)?;
        let written: Vec<PathBuf> = Self::stage_write(ctx, output_dir)?;
        log::info!(
            "Recompilation complete: {} functions ({} partial), {} files",
            ctx.stats.emitted_functions,
            ctx.stats.partial_functions,
            written.len()
        );
        Ok(written)
    }

    // --- Discrete stages ---

    /// Stage: Read and parse the binary image.
    pub fn stage_load_image(ctx: &mut PipelineContext, path: &Path) -> Result<()> {
        log::info!("Stage: Loading image: {}", path.display());
        let data: Vec<u8> = std::fs::read(path).with_context(|| format!("Failed to read image {}", path.display()))?;
        let image: BinaryImage =
            BinaryImage::parse(&data).with_context(|| format!("Failed to parse image {}", path.display()))?;
        log::info!(
            "Loaded {} image: {} sections, entry 0x{:08X}",
            image.kind(),
            image.sections().len(),
            image.entry_point()
        );
        ctx.image = Some(image);
        Ok(())
    }

    /// Stage: Validate the overrides.
    ///
    /// Warnings are logged. Errors abort the run unless `force` is set.
    pub fn stage_validate(ctx: &mut PipelineContext, force: bool) -> Result<()> {
        log::info!("Stage: Validating configuration...");
        let report: ValidationReport = validate(&ctx.config);
        for warning in report.warnings.iter() {
            log::warn!("Config: {}", warning);
        }
        ctx.stats.config_warnings = report.warnings.len();
        if report.valid {
            return Ok(());
        }
        for error in report.errors.iter() {
            log::error!("Config: {}", error);
        }
        if force {
            log::warn!("Continuing with {} config errors (forced)", report.errors.len());
            return Ok(());
        }
        report
            .into_result()
            .map(|_| ())
            .context("Configuration is invalid; fix the errors or run with force")
    }

    /// Stage: Scan data sections for virtual function tables.
    pub fn stage_scan_vtables(ctx: &mut PipelineContext) -> Result<()> {
        log::info!("Stage: Scanning vtables...");
        let image: &BinaryImage = ctx.image.as_ref().context("No image loaded")?;
        ctx.vtables = vtable::scan_image(image);
        ctx.stats.vtables = ctx.vtables.len();
        log::info!("Found {} vtables", ctx.vtables.len());
        Ok(())
    }

    /// Stage: Discover functions and build the graph.
    pub fn stage_discover(ctx: &mut PipelineContext) -> Result<()> {
        log::info!("Stage: Discovering functions...");
        let image: &BinaryImage = ctx.image.as_ref().context("No image loaded")?;
        let mut discovery: FunctionDiscovery<'_> = FunctionDiscovery::new(image, &ctx.config);
        discovery.add_vtable_hints(&ctx.vtables);
        let graph: FunctionGraph = discovery.run().context("Function discovery failed")?;
        for (first, second) in graph.overlapping_functions() {
            log::warn!("Functions 0x{:08X} and 0x{:08X} overlap", first, second);
        }
        ctx.stats.total_functions = graph.function_count();
        log::info!("Discovered {} functions", graph.function_count());
        ctx.graph = Some(graph);
        Ok(())
    }

    /// Stage: Emit every function.
    pub fn stage_emit(ctx: &mut PipelineContext) -> Result<()> {
        log::info!("Stage: Emitting functions...");
        let image: &BinaryImage = ctx.image.as_ref().context("No image loaded")?;
        let graph: &FunctionGraph = ctx.graph.as_ref().context("No function graph built")?;
        let emitter: CodeEmitter<'_> = CodeEmitter::new(graph, &ctx.config, image);
        let functions: Vec<EmittedFunction> = emitter.emit_all();

        ctx.stats.emitted_functions = functions.len();
        ctx.stats.partial_functions = functions.iter().filter(|function| function.partial).count();
        ctx.stats.unimplemented_instructions = functions
            .iter()
            .map(|function| function.unimplemented_opcodes.len())
            .sum();
        ctx.functions = functions;
        Ok(())
    }

    /// Stage: Write the generated sources.
    pub fn stage_write(ctx: &mut PipelineContext, output_dir: &Path) -> Result<Vec<PathBuf>> {
        log::info!("Stage: Writing output to {}...", output_dir.display());
        write_sources(output_dir, &ctx.config.project_name, &ctx.functions)
    }
}

/// Read and parse an override document.
pub fn load_config_file(path: &Path) -> Result<RecompilerConfig> {
    let document: String =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read config {}", path.display()))?;
    RecompilerConfig::load(&document).with_context(|| format!("Failed to parse config {}", path.display()))
}

/// Write emitted functions as `<project>_recomp.<n>.rs` chunks plus
/// `<project>_mapping.rs`.
///
/// # Returns
/// `Result<Vec<PathBuf>>` - Paths written, chunks first and the mapping last
pub fn write_sources(output_dir: &Path, project: &str, functions: &[EmittedFunction]) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory {}", output_dir.display()))?;
    let mut written: Vec<PathBuf> = Vec::new();

    for (index, chunk) in split_sources(functions).into_iter().enumerate() {
        let path: PathBuf = output_dir.join(format!("{}_recomp.{}.rs", project, index));
        std::fs::write(&path, chunk).with_context(|| format!("Failed to write {}", path.display()))?;
        written.push(path);
    }

    let path: PathBuf = output_dir.join(format!("{}_mapping.rs", project));
    std::fs::write(&path, mapping_source(functions)).with_context(|| format!("Failed to write {}", path.display()))?;
    written.push(path);
    Ok(written)
}

/// Group function sources into files of roughly [`SOURCE_CHUNK_BYTES`].
pub fn split_sources(functions: &[EmittedFunction]) -> Vec<String> {
    let mut chunks: Vec<String> = Vec::new();
    let mut current: String = String::with_capacity(SOURCE_CHUNK_BYTES + SOURCE_HEADER.len());
    current.push_str(SOURCE_HEADER);
    let mut empty: bool = true;

    for function in functions.iter() {
        if !empty && current.len() + function.code.len() > SOURCE_CHUNK_BYTES {
            chunks.push(std::mem::replace(
                &mut current,
                String::with_capacity(SOURCE_CHUNK_BYTES + SOURCE_HEADER.len()),
            ));
            current.push_str(SOURCE_HEADER);
        }
        current.push_str(&function.code);
        current.push('\n');
        empty = false;
    }
    if !empty {
        chunks.push(current);
    }
    chunks
}

/// Source of the address to function table, sorted for binary search.
pub fn mapping_source(functions: &[EmittedFunction]) -> String {
    let mut entries: Vec<(u32, &str)> = functions
        .iter()
        .map(|function| (function.address, function.name.as_str()))
        .collect();
    entries.sort_unstable_by_key(|(address, _)| *address);

    let mut source: String = String::with_capacity(64 + entries.len() * 48);
    source.push_str(SOURCE_HEADER);
    source.push_str("pub static PPC_FUNCTION_MAPPINGS: &[(u32, PpcFunction)] = &[\n");
    for (address, name) in entries {
        source.push_str(&format!("    (0x{:08X}, {}),\n", address, name));
    }
    source.push_str("];\n\n");
    source.push_str("/// Recompiled function at `address`.\n");
    source.push_str("pub fn lookup_function(address: u32) -> Option<PpcFunction> {\n");
    source.push_str("    PPC_FUNCTION_MAPPINGS\n");
    source.push_str("        .binary_search_by_key(&address, |(entry, _)| *entry)\n");
    source.push_str("        .ok()\n");
    source.push_str("        .map(|index| PPC_FUNCTION_MAPPINGS[index].1)\n");
    source.push_str("}\n");
    source
}
