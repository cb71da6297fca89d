pub mod error;
pub mod decoder;
pub mod image;
pub mod graph;
pub mod config;
pub mod vtable;
pub mod analysis;
pub mod codegen;
pub mod pipeline;
