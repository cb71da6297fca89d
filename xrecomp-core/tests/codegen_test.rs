// Unit tests for the code emitter
mod common;

use common::*;
use xrecomp_core::recompiler::analysis::discover_functions;
use xrecomp_core::recompiler::codegen::{function_symbol, CodeEmitter, EmittedFunction};
use xrecomp_core::recompiler::config::RecompilerConfig;
use xrecomp_core::recompiler::decoder::Opcode;
use xrecomp_core::recompiler::graph::FunctionGraph;
use xrecomp_core::recompiler::image::BinaryImage;

const A: u32 = CODE_BASE;

fn config(document: &str) -> RecompilerConfig {
    RecompilerConfig::load(document).expect("config should parse")
}

/// Discover `image` and emit the function at `address`.
fn emit_at(image: &BinaryImage, config: &RecompilerConfig, address: u32) -> EmittedFunction {
    common::init_logging();
    let graph: FunctionGraph = discover_functions(image, config, &[]).expect("discovery should succeed");
    let node = graph.function(address).expect("function should be discovered");
    CodeEmitter::new(&graph, config, image)
        .emit_function(node)
        .expect("function should emit")
}

fn position(code: &str, needle: &str) -> usize {
    code.find(needle)
        .unwrap_or_else(|| panic!("`{}` not found in:\n{}", needle, code))
}

#[test]
fn test_emit_dispatch_loop() {
    let image: BinaryImage = code_image(&[
        cmpwi(0, 3, 0),          // 0x00
        beq(0, A + 4, A + 0x10), // 0x04
        li(3, 1),                // 0x08
        BLR,                     // 0x0C
        li(3, 0),                // 0x10
        BLR,                     // 0x14
    ]);
    let function: EmittedFunction = emit_at(&image, &RecompilerConfig::default(), A);
    let code: &str = &function.code;

    assert_eq!(function.name, "sub_82000000");
    assert!(!function.partial);
    assert!(code.starts_with("pub fn sub_82000000(ctx: &mut PpcContext, mem: &mut Memory) {\n"));
    assert!(code.contains("let mut pc: u32 = 0x82000000;"));
    assert!(code.contains("0x82000000 => {"));
    assert!(code.contains("0x82000008 => {"));
    assert!(code.contains("0x82000010 => {"));
    assert!(code.contains("// 0x82000004: "));

    // Taken branch jumps to its label, the not-taken path falls through to the next one.
    assert!(code.contains("if ctx.cr[0].eq {"));
    assert!(code.contains("pc = 0x82000010;"));
    assert!(code.contains("pc = 0x82000008;"));
    assert!(code.contains("ctx.r[3] = 0x1u64;"));
    assert!(code.contains("ppc_unreachable(ctx, pc);"));
    assert!(position(code, "0x82000008 => {") < position(code, "0x82000010 => {"));
}

#[test]
fn test_emit_direct_call() {
    let image: BinaryImage = code_image(&[
        MFLR_R0,             // 0x00
        bl(A + 4, A + 0x10), // 0x04
        MTLR_R0,             // 0x08
        BLR,                 // 0x0C
        li(3, 5),            // 0x10
        BLR,                 // 0x14
    ]);
    let code: String = emit_at(&image, &RecompilerConfig::default(), A).code;
    assert!(code.contains("ctx.r[0] = ctx.lr;"));
    assert!(position(&code, "ctx.lr = 0x82000008;") < position(&code, "sub_82000010(ctx, mem);"));

    let skip: RecompilerConfig = config("skip_lr = true");
    let code: String = emit_at(&image, &skip, A).code;
    assert!(code.contains("sub_82000010(ctx, mem);"));
    assert!(!code.contains("ctx.lr"));
}

#[test]
fn test_emit_tail_call_by_name() {
    let mut words: Vec<u32> = vec![li(3, 1), b(A + 4, A + 0x20)];
    words.resize(8, NOP);
    words.extend([li(3, 2), BLR]);
    let image: BinaryImage = code_image_with_symbols(&words, &[(A + 0x20, "target")]);
    let code: String = emit_at(&image, &RecompilerConfig::default(), A).code;

    assert!(position(&code, "target(ctx, mem);") < code.rfind("return;").unwrap());
}

#[test]
fn test_call_without_function_uses_dispatcher() {
    let image: BinaryImage = code_image(&[bl(A, A + 0x0010_0000), BLR]);
    let code: String = emit_at(&image, &RecompilerConfig::default(), A).code;
    assert!(code.contains("ppc_call(ctx, mem, 0x82100000);"));
}

#[test]
fn test_fallthrough_off_the_end() {
    // The zero word ends discovery after the first instruction.
    let image: BinaryImage = code_image(&[li(3, 1), 0, li(3, 2), BLR]);
    let code: String = emit_at(&image, &RecompilerConfig::default(), A).code;
    assert!(code.contains("ppc_call(ctx, mem, 0x82000004);"));
}

#[test]
fn test_mmio_via_io_base() {
    let image: BinaryImage = code_image(&[lis(11, 0x7FC8), lwz(3, 0x10, 11), lwz(4, 0x10, 1), BLR]);
    let code: String = emit_at(&image, &RecompilerConfig::default(), A).code;

    assert!(code.contains("ctx.r[11] = 0x7FC80000u64;"));
    assert!(code.contains("let ea: u32 = (ctx.r[11] as u32).wrapping_add(0x10);"));
    assert!(code.contains("ctx.r[3] = mem.mmio_load_u32(ea) as u64;"));
    // An ordinary stack load right after stays on the normal path.
    assert!(code.contains("ctx.r[4] = mem.load_u32(ea) as u64;"));
}

#[test]
fn test_ordinary_lis_is_not_io_base() {
    let image: BinaryImage = code_image(&[lis(11, 0x8201), lwz(3, 0x10, 11), BLR]);
    let code: String = emit_at(&image, &RecompilerConfig::default(), A).code;
    assert!(code.contains("mem.load_u32(ea)"));
    assert!(!code.contains("mmio"));
}

#[test]
fn test_mmio_via_eieio() {
    let image: BinaryImage = code_image(&[stw(3, 0, 4), EIEIO, BLR]);
    let code: String = emit_at(&image, &RecompilerConfig::default(), A).code;
    assert!(code.contains("mem.mmio_store_u32(ea, ctx.r[3] as u32);"));
}

#[test]
fn test_mmio_via_eieio_after_label() {
    let image: BinaryImage = code_image(&[
        cmpwi(0, 3, 0),          // 0x00
        beq(0, A + 4, A + 0xC),  // 0x04
        stw(3, 0, 4),            // 0x08
        EIEIO,                   // 0x0C
        BLR,                     // 0x10
    ]);
    let code: String = emit_at(&image, &RecompilerConfig::default(), A).code;
    assert!(code.contains("0x8200000C => {"));
    assert!(code.contains("mem.mmio_store_u32(ea, ctx.r[3] as u32);"));
}

#[test]
fn test_vector_store_locals() {
    let image: BinaryImage = code_image(&[stvx(20, 4, 5), stvewx(21, 4, 5), BLR]);
    let local: RecompilerConfig = config("non_volatile_as_local = true");
    let code: String = emit_at(&image, &local, A).code;

    assert!(code.contains("let mut v20: Vector128 = ctx.v[20];"));
    assert!(code.contains("let mut v21: Vector128 = ctx.v[21];"));
    assert!(code.contains("mem.store_v128(ea & !0xF, v20);"));
    assert!(code.contains("mem.store_u32(ea & !3, v21.u32_at(ea));"));
    assert!(!code.contains("let mut v4:") && !code.contains("let mut v5:"));
}

#[test]
fn test_csr_mode_switches() {
    let image: BinaryImage = code_image(&[
        fadd(1, 2, 3),
        fadd(4, 5, 6),
        vaddfp(1, 2, 3),
        vaddfp(4, 5, 6),
        fadd(7, 8, 9),
        BLR,
    ]);
    let code: String = emit_at(&image, &RecompilerConfig::default(), A).code;

    let scalar: usize = position(&code, "ctx.fpscr.disable_flush_mode();");
    let vector: usize = position(&code, "ctx.fpscr.enable_flush_mode_unconditional();");
    let back: usize = position(&code, "ctx.fpscr.disable_flush_mode_unconditional();");
    assert!(scalar < vector && vector < back);
    // Repeated instructions in the same mode emit nothing.
    assert_eq!(code.matches("ctx.fpscr.disable_flush_mode();").count(), 1);
    assert_eq!(code.matches("ctx.fpscr.enable_flush_mode_unconditional();").count(), 1);
    assert!(!code.contains("ctx.fpscr.enable_flush_mode();"));
}

#[test]
fn test_csr_mode_is_forgotten_after_call() {
    let image: BinaryImage = code_image(&[
        fadd(1, 2, 3),       // 0x00
        bl(A + 4, A + 0x10), // 0x04
        fadd(1, 2, 3),       // 0x08
        BLR,                 // 0x0C
        li(3, 0),            // 0x10
        BLR,                 // 0x14
    ]);
    let code: String = emit_at(&image, &RecompilerConfig::default(), A).code;
    assert_eq!(code.matches("ctx.fpscr.disable_flush_mode();").count(), 2);
}

#[test]
fn test_non_volatile_locals() {
    let image: BinaryImage = code_image(&[li(31, 7), stw(31, 8, 1), BLR]);

    let code: String = emit_at(&image, &RecompilerConfig::default(), A).code;
    assert!(code.contains("ctx.r[31] = 0x7u64;"));
    assert!(!code.contains("let mut r31"));

    let local: RecompilerConfig = config("non_volatile_as_local = true");
    let code: String = emit_at(&image, &local, A).code;
    assert!(position(&code, "    let mut r31: u64 = ctx.r[31];") < position(&code, "let mut pc: u32"));
    assert!(code.contains("r31 = 0x7u64;"));
    assert!(code.contains("mem.store_u32(ea, r31 as u32);"));
    // Argument registers never become locals.
    assert!(!code.contains("let mut r1:"));
}

#[test]
fn test_exception_handler_keeps_context() {
    let image: BinaryImage = code_image(&[li(31, 7), BLR]);
    let handler: RecompilerConfig = config(
        r#"
        non_volatile_as_local = true
        [analysis]
        exception_handler_funcs = [0x82000000]
        "#,
    );
    let code: String = emit_at(&image, &handler, A).code;
    assert!(code.contains("ctx.r[31] = 0x7u64;"));
    assert!(!code.contains("let mut r31"));
}

#[test]
fn test_setjmp_caller_keeps_context() {
    let image: BinaryImage = code_image(&[
        li(31, 7),           // 0x00
        bl(A + 4, A + 0x10), // 0x04
        stw(31, 8, 1),       // 0x08
        BLR,                 // 0x0C
        li(3, 0),            // 0x10
        BLR,                 // 0x14
    ]);
    let setjmp: RecompilerConfig = config(
        r#"
        non_volatile_as_local = true
        setjmp_address = 0x82000010
        "#,
    );
    let code: String = emit_at(&image, &setjmp, A).code;
    assert!(code.contains("ctx.r[3] = ppc_setjmp(ctx, mem);"));
    assert!(code.contains("ctx.r[31] = 0x7u64;"));
    assert!(!code.contains("let mut r31"));
}

#[test]
fn test_conditional_hook() {
    let image: BinaryImage = code_image(&[li(3, 1), li(4, 2), BLR]);
    let hooked: RecompilerConfig = config(
        r#"
        [[midasm_hook]]
        address = 0x82000004
        name = "OnValue"
        registers = ["r3"]
        return_on_true = true
        "#,
    );
    let code: String = emit_at(&image, &hooked, A).code;

    let call: usize = position(&code, "let taken: bool = OnValue(&mut hook_0);");
    assert!(position(&code, "let mut hook_0 = ctx.r[3];") < call);
    assert!(call < position(&code, "ctx.r[3] = hook_0;"));
    assert!(call < position(&code, "if taken { return; }"));
    // The hook runs before the instruction at its address.
    assert!(call < position(&code, "ctx.r[4] = 0x2u64;"));
}

#[test]
fn test_unconditional_hook_after_instruction() {
    let image: BinaryImage = code_image(&[li(3, 1), li(4, 2), BLR]);
    let hooked: RecompilerConfig = config(
        r#"
        [[midasm_hook]]
        address = 0x82000004
        name = "OnExit"
        after_instruction = true
        return = true
        "#,
    );
    let code: String = emit_at(&image, &hooked, A).code;
    let call: usize = position(&code, "OnExit();");
    assert!(position(&code, "ctx.r[4] = 0x2u64;") < call);
    assert!(!code.contains("taken"));
}

#[test]
fn test_unimplemented_instruction_marks_partial() {
    let image: BinaryImage = code_image(&[li(4, 1), addo(3, 4, 5), BLR]);
    let function: EmittedFunction = emit_at(&image, &RecompilerConfig::default(), A);

    assert!(function.partial);
    assert_eq!(function.unimplemented_opcodes, vec![(A + 4, Opcode::Add)]);
    assert!(function.code.contains("ppc_unimplemented(ctx, 0x82000004, \"add\");"));
    // Emission continues past the gap.
    assert!(function.code.contains("return;"));
}

#[test]
fn test_jump_table_dispatch() {
    let image: BinaryImage = image_with_data(
        &[
            cmplwi(6, 3, 2),         // 0x00
            bgt(6, A + 4, A + 0x38), // 0x04
            lis(11, 0x8201),         // 0x08
            addi(11, 11, 0),         // 0x0C
            rlwinm(0, 3, 2, 0, 29),  // 0x10
            lwzx(0, 11, 0),          // 0x14
            mtctr(0),                // 0x18
            BCTR,                    // 0x1C
            li(3, 10),               // 0x20
            BLR,                     // 0x24
            li(3, 11),               // 0x28
            BLR,                     // 0x2C
            li(3, 12),               // 0x30
            BLR,                     // 0x34
            li(3, -1),               // 0x38
            BLR,                     // 0x3C
        ],
        to_bytes(&[A + 0x20, A + 0x28, A + 0x30]),
    );
    let code: String = emit_at(&image, &RecompilerConfig::default(), A).code;

    assert!(code.contains("match ctx.r[3] as u32 {"));
    assert!(code.contains("0 => { pc = 0x82000020; continue; }"));
    assert!(code.contains("1 => { pc = 0x82000028; continue; }"));
    assert!(code.contains("2 => { pc = 0x82000030; continue; }"));
    assert!(code.contains("_ => { pc = ctx.ctr as u32; continue; }"));
    assert!(code.contains("0x82000028 => {"));
}

#[test]
fn test_unknown_indirect_jump_is_tail_call() {
    let image: BinaryImage = code_image(&[mtctr(11), BCTR]);
    let code: String = emit_at(&image, &RecompilerConfig::default(), A).code;
    assert!(code.contains("ctx.ctr = ctx.r[11];"));
    assert!(code.contains("ppc_call(ctx, mem, ctx.ctr as u32);"));
}

#[test]
fn test_unconditional_trap_returns() {
    let image: BinaryImage = code_image(&[li(3, 1), TRAP]);
    let code: String = emit_at(&image, &RecompilerConfig::default(), A).code;
    assert!(position(&code, "ppc_trap(ctx, mem, 0x82000004);") < code.rfind("return;").unwrap());
}

#[test]
fn test_configured_name_and_chunks() {
    let image: BinaryImage = code_image(&[
        cmpwi(0, 3, 0),          // 0x00
        beq(0, A + 4, A + 0x10), // 0x04
        li(3, 1),                // 0x08
        BLR,                     // 0x0C
        li(3, 0),                // 0x10
        BLR,                     // 0x14
    ]);
    let named: RecompilerConfig = config(
        r#"
        [functions]
        "0x82000000" = { size = 0x18, name = "compare_zero" }
        "0x82000010" = { size = 0x8, parent = "0x82000000" }
        "#,
    );
    common::init_logging();
    let graph: FunctionGraph = discover_functions(&image, &named, &[]).unwrap();
    let emitter: CodeEmitter<'_> = CodeEmitter::new(&graph, &named, &image);
    let functions: Vec<EmittedFunction> = emitter.emit_all();

    // The chunk lies inside its parent and is only a label there.
    assert_eq!(functions.len(), 1);
    assert_eq!(functions[0].name, "compare_zero");
    assert!(functions[0].code.starts_with("pub fn compare_zero("));
    assert!(functions[0].code.contains("0x82000010 => {"));
}

#[test]
fn test_emit_all_is_address_ordered() {
    let image: BinaryImage = code_image(&[
        MFLR_R0,             // 0x00
        bl(A + 4, A + 0x10), // 0x04
        MTLR_R0,             // 0x08
        BLR,                 // 0x0C
        li(3, 5),            // 0x10
        BLR,                 // 0x14
    ]);
    let config: RecompilerConfig = RecompilerConfig::default();
    let graph: FunctionGraph = discover_functions(&image, &config, &[]).unwrap();
    let functions: Vec<EmittedFunction> = CodeEmitter::new(&graph, &config, &image).emit_all();
    let addresses: Vec<u32> = functions.iter().map(|function| function.address).collect();
    assert_eq!(addresses, vec![A, A + 0x10]);
}

#[test]
fn test_function_symbol() {
    assert_eq!(function_symbol("sub_82000000"), "sub_82000000");
    assert_eq!(function_symbol("Game::Update"), "Game__Update");
    assert_eq!(function_symbol("3dMath"), "_3dMath");
    assert_eq!(function_symbol(""), "_");
}
