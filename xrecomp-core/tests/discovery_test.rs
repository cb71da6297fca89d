// Unit tests for function discovery
mod common;

use common::*;
use xrecomp_core::recompiler::analysis::{discover_functions, FunctionDiscovery};
use xrecomp_core::recompiler::config::RecompilerConfig;
use xrecomp_core::recompiler::graph::{Authority, FunctionGraph, FunctionNode, JumpTableSource};
use xrecomp_core::recompiler::image::BinaryImage;
use xrecomp_core::recompiler::vtable::VTableInfo;

const A: u32 = CODE_BASE;

fn discover(image: &BinaryImage, config: &RecompilerConfig) -> FunctionGraph {
    common::init_logging();
    discover_functions(image, config, &[]).expect("discovery should succeed")
}

fn config(document: &str) -> RecompilerConfig {
    RecompilerConfig::load(document).expect("config should parse")
}

#[test]
fn test_call_target_becomes_function() {
    let image: BinaryImage = code_image(&[
        MFLR_R0,            // 0x00
        bl(A + 4, A + 0x10), // 0x04
        MTLR_R0,            // 0x08
        BLR,                // 0x0C
        li(3, 5),           // 0x10
        BLR,                // 0x14
    ]);
    let graph: FunctionGraph = discover(&image, &RecompilerConfig::default());

    assert_eq!(graph.function_count(), 2);
    let caller: &FunctionNode = graph.function(A).unwrap();
    assert_eq!(caller.size, 0x10);
    assert_eq!(caller.authority, Authority::Discovered);
    let call = caller.call_at(A + 4).unwrap();
    assert_eq!(call.target, Some(A + 0x10));
    assert!(!call.is_tail_call);

    let callee: &FunctionNode = graph.function(A + 0x10).unwrap();
    assert_eq!(callee.size, 8);
    assert_eq!(graph.callers_of(A + 0x10), vec![A]);
}

#[test]
fn test_conditional_branch_stays_local() {
    let image: BinaryImage = code_image(&[
        cmpwi(0, 3, 0),          // 0x00
        beq(0, A + 4, A + 0x10), // 0x04
        li(3, 1),                // 0x08
        BLR,                     // 0x0C
        li(3, 0),                // 0x10
        BLR,                     // 0x14
    ]);
    let graph: FunctionGraph = discover(&image, &RecompilerConfig::default());

    assert_eq!(graph.function_count(), 1);
    let node: &FunctionNode = graph.function(A).unwrap();
    assert_eq!(node.size, 0x18);
    assert_eq!(node.blocks, vec![A..A + 8, A + 8..A + 0x10, A + 0x10..A + 0x18]);
    assert!(node.calls.is_empty());
}

#[test]
fn test_branch_to_known_function_is_tail_call() {
    let mut words: Vec<u32> = vec![li(3, 1), b(A + 4, A + 0x20)];
    words.resize(8, NOP);
    words.extend([li(3, 2), BLR]);
    let image: BinaryImage = code_image_with_symbols(&words, &[(A + 0x20, "target")]);
    let graph: FunctionGraph = discover(&image, &RecompilerConfig::default());

    assert_eq!(graph.function_count(), 2);
    let node: &FunctionNode = graph.function(A).unwrap();
    assert_eq!(node.size, 8);
    let call = node.call_at(A + 4).unwrap();
    assert!(call.is_tail_call);
    assert_eq!(call.target, Some(A + 0x20));
    assert_eq!(graph.function(A + 0x20).unwrap().display_name(), "target");
}

#[test]
fn test_unknown_word_is_data_boundary() {
    let image: BinaryImage = code_image(&[li(3, 1), 0, li(3, 2), BLR]);
    let graph: FunctionGraph = discover(&image, &RecompilerConfig::default());

    let node: &FunctionNode = graph.function(A).unwrap();
    assert_eq!(node.blocks, vec![A..A + 4]);
    // The code after the zero word is picked up by the gap sweep.
    assert!(graph.function(A + 8).is_some());
}

#[test]
fn test_invalid_instruction_hint() {
    let image: BinaryImage = code_image(&[li(4, 2), li(3, 1), BLR]);
    let config: RecompilerConfig = config(&format!(
        "[[invalid_instructions]]\ndata = 0x{:08X}\nsize = 4\n",
        li(3, 1)
    ));
    let graph: FunctionGraph = discover(&image, &config);

    let node: &FunctionNode = graph.function(A).unwrap();
    assert_eq!(node.size, 4);
    assert!(graph.function(A + 4).is_none());
    assert!(graph.function(A + 8).is_some());
}

#[test]
fn test_configured_boundaries_win() {
    let image: BinaryImage = code_image(&[li(3, 1), li(4, 2), li(5, 3), BLR, li(6, 4), BLR]);
    let config: RecompilerConfig = config(
        r#"
        [functions]
        "0x82000000" = { size = 0x10, name = "first" }
        "0x82000010" = { size = 0x8 }
        "#,
    );
    let graph: FunctionGraph = discover(&image, &config);

    assert_eq!(graph.function_count(), 2);
    let first: &FunctionNode = graph.function(A).unwrap();
    assert_eq!(first.authority, Authority::Configured);
    assert_eq!(first.size, 0x10);
    assert_eq!(first.display_name(), "first");
    assert_eq!(graph.function(A + 0x10).unwrap().size, 8);
}

#[test]
fn test_entries_inside_configured_function_are_rejected() {
    let image: BinaryImage = code_image(&[li(3, 1), li(4, 2), li(5, 3), BLR]);
    let config: RecompilerConfig = config(
        r#"
        [functions]
        "0x82000000" = { size = 0x10 }
        "#,
    );
    let mut discovery: FunctionDiscovery<'_> = FunctionDiscovery::new(&image, &config);
    assert!(!discovery.add_entry(A + 8));
    assert!(!discovery.add_entry(A + 2));
    assert!(discovery.add_entry(A));
    let graph: FunctionGraph = discovery.run().unwrap();
    assert_eq!(graph.function_count(), 1);
}

#[test]
fn test_chunk_is_attached_to_parent() {
    let image: BinaryImage = code_image(&[
        cmpwi(0, 3, 0),          // 0x00
        beq(0, A + 4, A + 0x10), // 0x04
        li(3, 1),                // 0x08
        BLR,                     // 0x0C
        li(3, 0),                // 0x10
        BLR,                     // 0x14
    ]);
    let config: RecompilerConfig = config(
        r#"
        [functions]
        "0x82000000" = { size = 0x18 }
        "0x82000010" = { size = 0x8, parent = "0x82000000" }
        "#,
    );
    let graph: FunctionGraph = discover(&image, &config);

    assert_eq!(graph.function_count(), 2);
    let chunk: &FunctionNode = graph.function(A + 0x10).unwrap();
    assert!(chunk.is_chunk());
    assert_eq!(chunk.parent, Some(A));
    assert_eq!(graph.chunks_of(A).len(), 1);
    // The chunk does not bound the parent.
    assert_eq!(graph.function(A).unwrap().size, 0x18);
    assert!(graph.function(A).unwrap().is_block_start(A + 0x10));
}

#[test]
fn test_manual_switch_table() {
    let image: BinaryImage = code_image(&[
        mtctr(11),  // 0x00
        BCTR,       // 0x04
        li(3, 0),   // 0x08
        BLR,        // 0x0C
        li(3, 1),   // 0x10
        BLR,        // 0x14
    ]);
    let config: RecompilerConfig = config(
        r#"
        [[switch_tables]]
        address = 0x82000004
        register = 3
        labels = [0x82000008, 0x82000010]
        "#,
    );
    let graph: FunctionGraph = discover(&image, &config);

    assert_eq!(graph.function_count(), 1);
    let node: &FunctionNode = graph.function(A).unwrap();
    let table = node.jump_tables.get(&(A + 4)).unwrap();
    assert_eq!(table.source, JumpTableSource::Configured);
    assert_eq!(table.index_register, 3);
    assert_eq!(table.targets, vec![A + 8, A + 0x10]);
    assert!(node.is_block_start(A + 8));
    assert!(node.is_block_start(A + 0x10));
    assert!(node.unresolved_jumps.is_empty());
}

#[test]
fn test_recognised_switch_table() {
    let image: BinaryImage = image_with_data(
        &[
            cmplwi(6, 3, 2),            // 0x00
            bgt(6, A + 4, A + 0x38),    // 0x04
            lis(11, 0x8201),            // 0x08
            addi(11, 11, 0),            // 0x0C
            rlwinm(0, 3, 2, 0, 29),     // 0x10
            lwzx(0, 11, 0),             // 0x14
            mtctr(0),                   // 0x18
            BCTR,                       // 0x1C
            li(3, 10),                  // 0x20
            BLR,                        // 0x24
            li(3, 11),                  // 0x28
            BLR,                        // 0x2C
            li(3, 12),                  // 0x30
            BLR,                        // 0x34
            li(3, -1),                  // 0x38
            BLR,                        // 0x3C
        ],
        to_bytes(&[A + 0x20, A + 0x28, A + 0x30]),
    );
    let graph: FunctionGraph = discover(&image, &RecompilerConfig::default());

    assert_eq!(graph.function_count(), 1);
    let node: &FunctionNode = graph.function(A).unwrap();
    assert_eq!(node.size, 0x40);
    let table = node.jump_tables.get(&(A + 0x1C)).unwrap();
    assert_eq!(table.source, JumpTableSource::Recognized);
    assert_eq!(table.table_base, Some(DATA_BASE));
    assert_eq!(table.index_register, 3);
    assert_eq!(table.targets, vec![A + 0x20, A + 0x28, A + 0x30]);
}

#[test]
fn test_unresolved_indirect_jump_does_not_abort() {
    let image: BinaryImage = code_image(&[mtctr(11), BCTR, li(3, 1), BLR]);
    let graph: FunctionGraph = discover(&image, &RecompilerConfig::default());

    let node: &FunctionNode = graph.function(A).unwrap();
    assert_eq!(node.unresolved_jumps, vec![A + 4]);
    // Code after the bctr is still found.
    assert!(graph.function(A + 8).is_some());
}

#[test]
fn test_indirect_call_hint() {
    let image: BinaryImage = code_image(&[mtctr(11), BCTR]);
    let config: RecompilerConfig = config("indirect_calls = [0x82000004]");
    let graph: FunctionGraph = discover(&image, &config);

    let node: &FunctionNode = graph.function(A).unwrap();
    assert!(node.unresolved_jumps.is_empty());
    let call = node.call_at(A + 4).unwrap();
    assert!(call.is_tail_call);
    assert!(!call.is_resolved());
}

#[test]
fn test_vtable_slots_become_entries() {
    let image: BinaryImage = code_image(&[li(3, 1), BLR, li(3, 2), BLR]);
    let config: RecompilerConfig = RecompilerConfig::default();
    let table: VTableInfo = VTableInfo {
        address: DATA_BASE,
        locator: DATA_BASE - 4,
        class_name: "Foo".to_string(),
        slots: vec![A + 8],
    };
    common::init_logging();
    let mut discovery: FunctionDiscovery<'_> = FunctionDiscovery::new(&image, &config);
    discovery.add_vtable_hints(std::slice::from_ref(&table));
    let graph: FunctionGraph = discovery.run().unwrap();

    assert_eq!(graph.function_count(), 2);
    assert_eq!(graph.function(A).unwrap().size, 8);
    assert_eq!(graph.function(A + 8).unwrap().size, 8);
}

#[test]
fn test_gap_sweep_skips_padding() {
    let mut words: Vec<u32> = vec![li(3, 1), BLR];
    words.extend([0, 0, NOP, NOP]);
    words.extend([li(3, 2), BLR]);
    let image: BinaryImage = code_image(&words);
    let graph: FunctionGraph = discover(&image, &RecompilerConfig::default());

    assert_eq!(graph.function_count(), 2);
    assert!(graph.function(A + 0x18).is_some());
    assert_eq!(graph.overlapping_functions(), Vec::<(u32, u32)>::new());
}

#[test]
fn test_gap_sweep_keeps_code_before_stray_data_word() {
    let image: BinaryImage = code_image(&[
        li(3, 1),    // 0x00
        BLR,         // 0x04
        li(3, 2),    // 0x08
        li(3, 3),    // 0x0C
        BLR,         // 0x10
        0xFFFF_FFFF, // 0x14
        li(3, 4),    // 0x18
        BLR,         // 0x1C
    ]);
    let graph: FunctionGraph = discover(&image, &RecompilerConfig::default());

    assert_eq!(graph.function_count(), 3);
    assert_eq!(graph.function(A + 8).unwrap().size, 0xC);
    assert!(graph.function(A + 0x14).is_none());
    assert_eq!(graph.function(A + 0x18).unwrap().size, 8);
}

#[test]
fn test_gap_sweep_skips_data_region() {
    let mut words: Vec<u32> = vec![li(3, 1), BLR];
    words.extend([0xFFFF_FFFF; 8]);
    words.extend([li(3, 2), BLR]);
    let image: BinaryImage = code_image(&words);
    let graph: FunctionGraph = discover(&image, &RecompilerConfig::default());

    assert_eq!(graph.function_count(), 2);
    assert!((A + 8..A + 0x28)
        .step_by(4)
        .all(|address| graph.function_containing(address).is_none()));
    assert_eq!(graph.function(A + 0x28).unwrap().size, 8);
}
