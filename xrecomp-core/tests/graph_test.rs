// Unit tests for the function graph
use xrecomp_core::recompiler::graph::{Authority, CallTarget, FunctionGraph, JumpTable, JumpTableSource};

#[test]
fn test_add_function_is_idempotent() {
    let mut graph: FunctionGraph = FunctionGraph::new();
    graph.add_function(0x8200_0000, 0x20, Authority::Discovered);
    assert_eq!(graph.function_count(), 1);
    graph.add_function(0x8200_0000, 0x20, Authority::Discovered);
    graph.add_function(0x8200_0000, 0x40, Authority::Discovered);
    assert_eq!(graph.function_count(), 1);
    // A discovered re-add never changes the size.
    assert_eq!(graph.function(0x8200_0000).map(|node| node.size), Some(0x20));
}

#[test]
fn test_configured_size_wins() {
    let mut graph: FunctionGraph = FunctionGraph::new();
    graph.add_function(0x8200_0000, 0x10, Authority::Discovered);
    let node = graph.add_function(0x8200_0000, 0x80, Authority::Configured);
    assert_eq!(node.size, 0x80);
    assert_eq!(node.authority, Authority::Configured);
}

#[test]
fn test_blocks_grow_discovered_functions() {
    let mut graph: FunctionGraph = FunctionGraph::new();
    graph.add_function(0x8200_0000, 0, Authority::Discovered);
    graph.add_block_to_function(0x8200_0000, 0x8200_0000..0x8200_0010).unwrap();
    graph.add_block_to_function(0x8200_0000, 0x8200_0010..0x8200_0020).unwrap();
    let node = graph.function(0x8200_0000).unwrap();
    assert_eq!(node.size, 0x20);
    assert_eq!(node.blocks.len(), 2);
    assert!(node.is_block_start(0x8200_0010));
    assert_eq!(node.block_containing(0x8200_0014), Some(&(0x8200_0010..0x8200_0020)));
}

#[test]
fn test_block_insertion_splits() {
    let mut graph: FunctionGraph = FunctionGraph::new();
    graph.add_function(0x8200_0000, 0, Authority::Discovered);
    graph.add_block_to_function(0x8200_0000, 0x8200_0000..0x8200_0020).unwrap();
    graph.add_block_to_function(0x8200_0000, 0x8200_0010..0x8200_0018).unwrap();
    let node = graph.function(0x8200_0000).unwrap();
    assert_eq!(
        node.blocks,
        vec![0x8200_0000..0x8200_0010, 0x8200_0010..0x8200_0020]
    );
}

#[test]
fn test_mutating_unknown_function_fails() {
    let mut graph: FunctionGraph = FunctionGraph::new();
    assert!(graph.set_function_name(0x8200_0000, "missing").is_err());
    assert!(graph.add_unresolved_jump_to_function(0x8200_0000, 0x8200_0004).is_err());
    assert!(graph.add_block_to_function(0x8200_0000, 0x8200_0000..0x8200_0004).is_err());
}

#[test]
fn test_mutation_is_scoped_to_one_node() {
    let mut graph: FunctionGraph = FunctionGraph::new();
    graph.add_function(0x8200_0000, 0x10, Authority::Discovered);
    graph.add_function(0x8200_0010, 0x10, Authority::Discovered);
    graph.set_function_name(0x8200_0010, "second").unwrap();
    graph.add_unresolved_jump_to_function(0x8200_0010, 0x8200_0018).unwrap();
    graph.add_unresolved_jump_to_function(0x8200_0010, 0x8200_0018).unwrap();

    let first = graph.function(0x8200_0000).unwrap();
    assert!(first.name.is_none());
    assert!(first.unresolved_jumps.is_empty());
    let second = graph.function(0x8200_0010).unwrap();
    assert_eq!(second.display_name(), "second");
    assert_eq!(second.unresolved_jumps, vec![0x8200_0018]);
    assert_eq!(graph.function_by_name("second").map(|node| node.address), Some(0x8200_0010));
    assert_eq!(graph.name_of(0x8200_0000), "sub_82000000");
}

#[test]
fn test_call_edges_and_callers() {
    let mut graph: FunctionGraph = FunctionGraph::new();
    graph.add_function(0x8200_0000, 0x10, Authority::Discovered);
    graph.add_function(0x8200_0100, 0x10, Authority::Discovered);
    graph
        .add_call_to_function(0x8200_0000, CallTarget::direct(0x8200_0004, 0x8200_0100))
        .unwrap();
    graph
        .add_call_to_function(0x8200_0000, CallTarget::direct(0x8200_0004, 0x8200_0100))
        .unwrap();
    graph
        .add_call_to_function(0x8200_0000, CallTarget::unresolved(0x8200_0008, false))
        .unwrap();

    let node = graph.function(0x8200_0000).unwrap();
    assert_eq!(node.calls.len(), 2);
    assert!(node.call_at(0x8200_0004).unwrap().is_resolved());
    assert!(!node.call_at(0x8200_0008).unwrap().is_resolved());
    assert_eq!(graph.callers_of(0x8200_0100), vec![0x8200_0000]);
}

#[test]
fn test_function_containing_and_chunks() {
    let mut graph: FunctionGraph = FunctionGraph::new();
    graph.add_function(0x8200_0000, 0x100, Authority::Configured);
    graph.add_function(0x8200_0080, 0x20, Authority::Configured);
    graph.set_function_parent(0x8200_0080, 0x8200_0000).unwrap();

    assert_eq!(graph.function_containing(0x8200_0084).map(|node| node.address), Some(0x8200_0080));
    assert_eq!(graph.function_containing(0x8200_00F0).map(|node| node.address), Some(0x8200_0000));
    assert!(graph.function_containing(0x8200_0200).is_none());
    assert_eq!(graph.chunks_of(0x8200_0000).len(), 1);
    // Chunks never count as overlapping.
    assert!(graph.overlapping_functions().is_empty());
}

#[test]
fn test_overlapping_functions() {
    let mut graph: FunctionGraph = FunctionGraph::new();
    graph.add_function(0x8200_0000, 0x40, Authority::Configured);
    graph.add_function(0x8200_0020, 0x40, Authority::Configured);
    assert_eq!(graph.overlapping_functions(), vec![(0x8200_0000, 0x8200_0020)]);
}

#[test]
fn test_overlap_past_the_next_function() {
    let mut graph: FunctionGraph = FunctionGraph::new();
    graph.add_function(0x8200_0000, 0x100, Authority::Configured);
    graph.add_function(0x8200_0010, 0x10, Authority::Configured);
    graph.add_function(0x8200_0080, 0x10, Authority::Configured);
    graph.add_function(0x8200_0200, 0x10, Authority::Configured);
    assert_eq!(
        graph.overlapping_functions(),
        vec![(0x8200_0000, 0x8200_0010), (0x8200_0000, 0x8200_0080)]
    );
}

#[test]
fn test_jump_table_validation() {
    let table: JumpTable = JumpTable {
        address: 0x8200_0010,
        table_base: None,
        index_register: 3,
        targets: vec![0x8200_0020, 0x8200_0022],
        source: JumpTableSource::Configured,
    };
    assert!(table.validate(|_| true).is_err());

    let table: JumpTable = JumpTable {
        targets: vec![0x8200_0020, 0x8200_0024],
        ..table
    };
    assert!(table.validate(|_| true).is_ok());
    assert!(table.validate(|address| address < 0x8200_0024).is_err());
}

#[test]
fn test_graph_serialises() {
    let mut graph: FunctionGraph = FunctionGraph::new();
    graph.add_function(0x8200_0000, 0x10, Authority::Discovered);
    let json: String = graph.to_json().unwrap();
    assert!(json.contains("\"functions\""));
}
