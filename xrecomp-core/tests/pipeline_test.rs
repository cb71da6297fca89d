// Integration tests for the recompilation pipeline
mod common;

use common::*;
use std::path::{Path, PathBuf};
use xrecomp_core::recompiler::codegen::EmittedFunction;
use xrecomp_core::recompiler::config::RecompilerConfig;
use xrecomp_core::recompiler::image::BinaryImage;
use xrecomp_core::recompiler::pipeline::{
    load_config_file, mapping_source, split_sources, write_sources, PipelineContext, RecompilationPipeline,
    SOURCE_CHUNK_BYTES,
};

const A: u32 = CODE_BASE;

fn sample_code() -> Vec<u32> {
    vec![
        MFLR_R0,             // 0x00
        bl(A + 4, A + 0x10), // 0x04
        MTLR_R0,             // 0x08
        BLR,                 // 0x0C
        li(3, 5),            // 0x10
        BLR,                 // 0x14
    ]
}

fn function(address: u32, name: &str, body_len: usize) -> EmittedFunction {
    EmittedFunction {
        address,
        name: name.to_string(),
        code: format!("pub fn {}() {{}}\n{}", name, "/".repeat(body_len)),
        unimplemented_opcodes: Vec::new(),
        partial: false,
    }
}

fn file_names(paths: &[PathBuf]) -> Vec<String> {
    paths
        .iter()
        .filter_map(|path| path.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .collect()
}

#[test]
fn test_mapping_is_sorted() {
    let functions: Vec<EmittedFunction> = vec![
        function(0x8200_0100, "sub_82000100", 0),
        function(0x8200_0000, "start", 0),
    ];
    let source: String = mapping_source(&functions);

    assert!(source.starts_with("// Generated by xrecomp. Do not edit.\n"));
    assert!(source.contains("pub static PPC_FUNCTION_MAPPINGS: &[(u32, PpcFunction)] = &["));
    let first: usize = source.find("(0x82000000, start),").unwrap();
    let second: usize = source.find("(0x82000100, sub_82000100),").unwrap();
    assert!(first < second);
    assert!(source.contains("pub fn lookup_function(address: u32) -> Option<PpcFunction> {"));
}

#[test]
fn test_split_sources() {
    assert!(split_sources(&[]).is_empty());

    let small: Vec<EmittedFunction> = vec![function(A, "a", 16), function(A + 4, "b", 16)];
    let chunks: Vec<String> = split_sources(&small);
    assert_eq!(chunks.len(), 1);
    assert!(chunks[0].contains("use super::*;"));
    assert!(chunks[0].contains("pub fn a()") && chunks[0].contains("pub fn b()"));

    let large: Vec<EmittedFunction> = vec![
        function(A, "a", SOURCE_CHUNK_BYTES / 2 + 1),
        function(A + 4, "b", SOURCE_CHUNK_BYTES / 2 + 1),
        function(A + 8, "c", 16),
    ];
    let chunks: Vec<String> = split_sources(&large);
    assert_eq!(chunks.len(), 2);
    assert!(chunks[0].contains("pub fn a()"));
    assert!(chunks[1].contains("pub fn b()") && chunks[1].contains("pub fn c()"));
    assert!(chunks.iter().all(|chunk| chunk.starts_with("// Generated by xrecomp.")));

    // A single oversized function still gets a file of its own.
    let huge: Vec<EmittedFunction> = vec![function(A, "a", SOURCE_CHUNK_BYTES * 2)];
    assert_eq!(split_sources(&huge).len(), 1);
}

#[test]
fn test_write_sources() {
    let dir = tempfile::tempdir().unwrap();
    let output: PathBuf = dir.path().join("nested").join("out");
    let functions: Vec<EmittedFunction> = vec![function(A, "a", 16)];

    let written: Vec<PathBuf> = write_sources(&output, "game", &functions).unwrap();
    assert_eq!(file_names(&written), vec!["game_recomp.0.rs", "game_mapping.rs"]);
    assert!(written.iter().all(|path| path.exists()));
}

#[test]
fn test_recompile_in_memory_image() {
    common::init_logging();
    let dir = tempfile::tempdir().unwrap();
    let config: RecompilerConfig = RecompilerConfig::load("project_name = \"sample\"").unwrap();
    let image: BinaryImage = code_image(&sample_code());
    let mut ctx: PipelineContext = PipelineContext::with_image(config, image);

    let written: Vec<PathBuf> = RecompilationPipeline::recompile(&mut ctx, dir.path(), false).unwrap();
    assert_eq!(file_names(&written), vec!["sample_recomp.0.rs", "sample_mapping.rs"]);
    assert_eq!(ctx.stats.total_functions, 2);
    assert_eq!(ctx.stats.emitted_functions, 2);
    assert_eq!(ctx.stats.partial_functions, 0);
    assert!(ctx.graph.is_some());

    let source: String = std::fs::read_to_string(&written[0]).unwrap();
    assert!(source.contains("pub fn sub_82000000(ctx: &mut PpcContext, mem: &mut Memory) {"));
    assert!(source.contains("sub_82000010(ctx, mem);"));
    let mapping: String = std::fs::read_to_string(&written[1]).unwrap();
    assert!(mapping.contains("(0x82000010, sub_82000010),"));
}

#[test]
fn test_invalid_config_is_refused_unless_forced() {
    let dir = tempfile::tempdir().unwrap();
    let document: &str = r#"
        [functions]
        "0x82000000" = { size = 0x10, end = 0x82000010 }
    "#;

    let config: RecompilerConfig = RecompilerConfig::load(document).unwrap();
    let mut ctx: PipelineContext = PipelineContext::with_image(config, code_image(&sample_code()));
    assert!(RecompilationPipeline::recompile(&mut ctx, dir.path(), false).is_err());
    assert!(ctx.graph.is_none());
    assert!(ctx.functions.is_empty());

    let config: RecompilerConfig = RecompilerConfig::load(document).unwrap();
    let mut ctx: PipelineContext = PipelineContext::with_image(config, code_image(&sample_code()));
    assert!(RecompilationPipeline::recompile(&mut ctx, dir.path(), true).is_ok());
    assert!(!ctx.functions.is_empty());
}

#[test]
fn test_missing_image_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut ctx: PipelineContext = PipelineContext::new(RecompilerConfig::default());
    assert!(RecompilationPipeline::recompile(&mut ctx, dir.path(), false).is_err());
}

#[test]
fn test_load_config_file_errors() {
    let dir = tempfile::tempdir().unwrap();
    assert!(load_config_file(&dir.path().join("missing.toml")).is_err());

    let path: PathBuf = dir.path().join("broken.toml");
    std::fs::write(&path, "project_name = ").unwrap();
    assert!(load_config_file(&path).is_err());
}

fn write_project(dir: &Path, document: &str) -> PathBuf {
    std::fs::write(dir.join("game.dol"), dol_file(&sample_code(), &[])).unwrap();
    let config_path: PathBuf = dir.join("game.toml");
    std::fs::write(&config_path, document).unwrap();
    config_path
}

#[test]
fn test_run_from_config_file() {
    common::init_logging();
    let dir = tempfile::tempdir().unwrap();
    let config_path: PathBuf = write_project(
        dir.path(),
        r#"
        project_name = "game"
        file_path = "game.dol"
        out_directory_path = "generated"

        [functions]
        "0x82000010" = { size = 0x8, name = "get_five" }
        "#,
    );

    let ctx: PipelineContext = RecompilationPipeline::run(&config_path, false).unwrap();
    assert_eq!(ctx.stats.emitted_functions, 2);
    let output: PathBuf = dir.path().join("generated");
    assert!(output.join("game_recomp.0.rs").exists());
    let source: String = std::fs::read_to_string(output.join("game_recomp.0.rs")).unwrap();
    assert!(source.contains("pub fn get_five("));
    assert!(source.contains("get_five(ctx, mem);"));
}

#[test]
fn test_run_needs_input_image() {
    let dir = tempfile::tempdir().unwrap();
    let config_path: PathBuf = write_project(dir.path(), "project_name = \"game\"");
    assert!(RecompilationPipeline::run(&config_path, false).is_err());

    let config_path: PathBuf = write_project(dir.path(), "file_path = \"absent.dol\"");
    assert!(RecompilationPipeline::run(&config_path, false).is_err());
}
