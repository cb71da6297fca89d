// Unit tests for the configuration override layer
use xrecomp_core::recompiler::config::{parse_address, validate, HookRegister, RecompilerConfig, ValidationReport};

fn load(document: &str) -> RecompilerConfig {
    RecompilerConfig::load(document).expect("config should parse")
}

#[test]
fn test_load_full_document() {
    let config: RecompilerConfig = load(
        r#"
        project_name = "game"
        file_path = "default.xex"
        out_directory_path = "out"
        skip_lr = true
        non_volatile_as_local = true
        setjmp_address = 0x82631A40
        longjmp_address = "0x82631B00"
        indirect_calls = [0x82001230, "0x82001240"]

        [functions]
        "0x82001000" = { size = 0x40, name = "init" }
        "0x82001020" = { end = 0x82001030, parent = "0x82001000" }

        [[invalid_instructions]]
        data = 0x00485645
        size = 8

        [[switch_tables]]
        address = 0x82001234
        register = 11
        labels = [0x82001240, "0x82001250"]

        [[midasm_hook]]
        address = 0x82001010
        name = "OnInit"
        registers = ["r3", "f1", "ctr"]
        return_on_true = true

        [analysis]
        max_jump_extension = 0x80
        exception_handler_funcs = [0x82002000]
        "#,
    );

    assert_eq!(config.project_name, "game");
    assert_eq!(config.file_path.as_deref(), Some("default.xex"));
    assert!(config.skip_lr);
    assert!(!config.skip_msr);
    assert!(config.non_volatile_as_local);
    assert_eq!(config.setjmp_address, Some(0x8263_1A40));
    assert_eq!(config.longjmp_address, Some(0x8263_1B00));
    assert_eq!(config.indirect_calls, vec![0x8200_1230, 0x8200_1240]);

    assert_eq!(config.functions.len(), 2);
    let init = config.function_override(0x8200_1000).unwrap();
    assert_eq!(init.name.as_deref(), Some("init"));
    assert_eq!(init.extent(), Some(0x40));
    let chunk = config.function_override(0x8200_1020).unwrap();
    assert!(chunk.is_chunk());
    assert_eq!(chunk.extent(), Some(0x10));

    assert_eq!(config.invalid_instruction(0x0048_5645).map(|hint| hint.size), Some(8));
    assert_eq!(config.switch_table_at(0x8200_1234).unwrap().labels, vec![0x8200_1240, 0x8200_1250]);
    assert!(config.is_indirect_call(0x8200_1230));
    assert!(config.is_exception_handler(0x8200_2000));

    let hook = &config.midasm_hook[0];
    assert!(hook.is_conditional());
    assert_eq!(hook.behaviour_count(), 1);
    assert_eq!(config.hooks_at(0x8200_1010).count(), 1);

    assert_eq!(config.analysis.max_jump_extension, 0x80);
    // Unset thresholds keep their defaults.
    assert_eq!(config.analysis.data_region_threshold, 0x20);
    assert_eq!(config.analysis.large_function_threshold, 0x10000);

    let report: ValidationReport = validate(&config);
    assert!(report.valid, "unexpected errors: {:?}", report.errors);
}

#[test]
fn test_load_rejects_bad_documents() {
    assert!(RecompilerConfig::load("project_name = ").is_err());
    assert!(RecompilerConfig::load("[functions]\n\"main\" = { size = 4 }").is_err());
    assert!(RecompilerConfig::load("setjmp_address = \"0xZZ\"").is_err());
}

#[test]
fn test_empty_document_uses_defaults() {
    let config: RecompilerConfig = load("");
    assert!(config.functions.is_empty());
    assert_eq!(config.analysis.max_jump_extension, 0x40);
    assert!(validate(&config).valid);
}

#[test]
fn test_size_and_end_is_one_error() {
    let config: RecompilerConfig = load(
        r#"
        [functions]
        "0x82000000" = { size = 0x20, end = 0x82000020 }
        "#,
    );
    let report: ValidationReport = validate(&config);
    assert!(!report.valid);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].contains("both size and end"));
}

#[test]
fn test_overlapping_functions_are_rejected() {
    let config: RecompilerConfig = load(
        r#"
        [functions]
        "0x82000000" = { size = 0x40 }
        "0x82000020" = { size = 0x20 }
        "#,
    );
    let report: ValidationReport = validate(&config);
    assert!(!report.valid);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].contains("overlaps"));
}

#[test]
fn test_chunks_may_overlap_their_parent() {
    let config: RecompilerConfig = load(
        r#"
        [functions]
        "0x82000000" = { size = 0x40 }
        "0x82000020" = { size = 0x10, parent = "0x82000000" }
        "0x82000040" = { end = 0x82000080 }
        "#,
    );
    let report: ValidationReport = validate(&config);
    assert!(report.valid, "unexpected errors: {:?}", report.errors);
    assert!(report.errors.is_empty());
}

#[test]
fn test_alignment_and_end_checks() {
    let config: RecompilerConfig = load(
        r#"
        [functions]
        "0x82000002" = { size = 0x10 }
        "0x82000100" = { end = 0x82000100 }
        "#,
    );
    let report: ValidationReport = validate(&config);
    assert!(!report.valid);
    assert_eq!(report.errors.len(), 2);
    assert!(report.errors.iter().any(|error| error.contains("not 4-byte aligned")));
    assert!(report.errors.iter().any(|error| error.contains("not greater")));
}

#[test]
fn test_duplicate_declarations() {
    // 2181038080 == 0x82000000
    let same: RecompilerConfig = load(
        r#"
        [functions]
        "0x82000000" = { size = 0x20 }
        "2181038080" = { size = 0x20 }
        "#,
    );
    let report: ValidationReport = validate(&same);
    assert!(report.valid);
    assert_eq!(report.warnings.len(), 1);

    let differing: RecompilerConfig = load(
        r#"
        [functions]
        "0x82000000" = { size = 0x20 }
        "2181038080" = { size = 0x40 }
        "#,
    );
    let report: ValidationReport = validate(&differing);
    assert!(!report.valid);
    assert!(report.errors.iter().any(|error| error.contains("Conflicting")));
}

#[test]
fn test_hook_checks() {
    let config: RecompilerConfig = load(
        r#"
        [[midasm_hook]]
        address = 0x82001000
        name = "Both"
        return = true
        jump_address = 0x82001100

        [[midasm_hook]]
        address = 0x82001004
        name = "BadRegister"
        registers = ["r40"]
        "#,
    );
    let report: ValidationReport = validate(&config);
    assert!(!report.valid);
    assert_eq!(report.errors.len(), 2);
}

#[test]
fn test_switch_table_needs_labels() {
    let config: RecompilerConfig = load(
        r#"
        [[switch_tables]]
        address = 0x82001000
        register = 3
        "#,
    );
    let report: ValidationReport = validate(&config);
    assert!(!report.valid);
    assert!(report.errors[0].contains("no labels"));
    assert!(report.clone().into_result().is_err());
}

#[test]
fn test_validation_is_pure() {
    let config: RecompilerConfig = load(
        r#"
        [functions]
        "0x82000000" = { size = 0x20, end = 0x82000020 }
        "#,
    );
    let before: RecompilerConfig = config.clone();
    let first: ValidationReport = validate(&config);
    let second: ValidationReport = validate(&config);
    assert_eq!(first, second);
    assert_eq!(config, before);
}

#[test]
fn test_parse_address() {
    assert_eq!(parse_address("0x8200_1000"), Some(0x8200_1000));
    assert_eq!(parse_address("0X10"), Some(0x10));
    assert_eq!(parse_address("4096"), Some(4096));
    assert_eq!(parse_address("main"), None);
}

#[test]
fn test_hook_register_names() {
    assert_eq!(HookRegister::parse("r31"), Some(HookRegister::Gpr(31)));
    assert_eq!(HookRegister::parse("F1"), Some(HookRegister::Fpr(1)));
    assert_eq!(HookRegister::parse("v127"), Some(HookRegister::Vr(127)));
    assert_eq!(HookRegister::parse("cr6"), Some(HookRegister::Cr(6)));
    assert_eq!(HookRegister::parse("ctr"), Some(HookRegister::Ctr));
    assert_eq!(HookRegister::parse("r32"), None);
    assert_eq!(HookRegister::parse("cr8"), None);
    assert_eq!(HookRegister::parse("lr"), None);
}
