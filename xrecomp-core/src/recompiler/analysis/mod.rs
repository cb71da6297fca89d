//! Analysis Module
//!
//! Function discovery over a binary image, best-effort jump table recognition,
//! and the per-function block layout used by the code emitter.

pub mod control_flow;
pub mod discovery;
pub mod switch_table;

// Re-export commonly used types
pub use control_flow::{BasicBlock, ControlFlowAnalyzer, ControlFlowGraph, Edge, EdgeType};
pub use discovery::{discover_functions, FunctionDiscovery};
