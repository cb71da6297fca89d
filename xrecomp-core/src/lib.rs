//! Static recompilation core for Xbox 360 PowerPC executables.
//!
//! The [`recompiler`] module decodes guest machine code, discovers function
//! boundaries, recovers virtual function tables and emits Rust source for every
//! function against a runtime the host project provides.

pub mod recompiler;
