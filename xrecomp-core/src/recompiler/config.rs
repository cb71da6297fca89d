//! Configuration Override Layer
//!
//! User-supplied overrides that augment or replace discovery decisions, loaded
//! from a TOML document with `serde`, and a pure validation pass over them.
//!
//! # Document Layout
//! ```toml
//! project_name = "game"
//! skip_lr = true
//! setjmp_address = 0x8263_1A40
//!
//! [functions]
//! "0x82001000" = { size = 0x40, name = "init" }
//! "0x82001100" = { end = 0x82001180, parent = "0x82001000" }
//!
//! [[switch_tables]]
//! address = 0x82001234
//! register = 11
//! labels = [0x82001240, 0x82001250]
//!
//! [analysis]
//! max_jump_extension = 0x40
//! ```
//!
//! Addresses may be written as TOML integers or as `"0x..."` strings.

use crate::recompiler::error::{RecompilerError, RecompilerResult};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Boundary override for one function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionOverride {
    pub address: u32,
    /// Key exactly as written in the document.
    pub key: String,
    pub size: Option<u32>,
    pub end: Option<u32>,
    pub name: Option<String>,
    pub parent: Option<u32>,
}

impl FunctionOverride {
    /// Byte size implied by `size` or `end`, when exactly one is given.
    pub fn extent(&self) -> Option<u32> {
        match (self.size, self.end) {
            (Some(size), None) => Some(size),
            (None, Some(end)) if end > self.address => Some(end - self.address),
            _ => None,
        }
    }

    #[inline]
    pub fn is_chunk(&self) -> bool {
        self.parent.is_some()
    }
}

/// Word pattern marking data that would otherwise decode as code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct InvalidInstruction {
    #[serde(deserialize_with = "de_address")]
    pub data: u32,
    /// Bytes to skip once the pattern is seen.
    #[serde(default = "default_invalid_size", deserialize_with = "de_address")]
    pub size: u32,
}

fn default_invalid_size() -> u32 {
    4
}

/// Manually defined `bctr` jump table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SwitchTableOverride {
    #[serde(deserialize_with = "de_address")]
    pub address: u32,
    #[serde(default)]
    pub register: u8,
    #[serde(default, deserialize_with = "de_address_vec")]
    pub labels: Vec<u32>,
}

/// Call to host code injected before or after a guest instruction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct MidAsmHook {
    #[serde(deserialize_with = "de_address")]
    pub address: u32,
    pub name: String,
    #[serde(default)]
    pub registers: Vec<String>,
    #[serde(default, rename = "return")]
    pub ret: bool,
    #[serde(default)]
    pub return_on_true: bool,
    #[serde(default)]
    pub return_on_false: bool,
    #[serde(default, deserialize_with = "de_opt_address")]
    pub jump_address: Option<u32>,
    #[serde(default, deserialize_with = "de_opt_address")]
    pub jump_address_on_true: Option<u32>,
    #[serde(default, deserialize_with = "de_opt_address")]
    pub jump_address_on_false: Option<u32>,
    #[serde(default)]
    pub after_instruction: bool,
}

impl MidAsmHook {
    /// Number of control-flow behaviours the hook declares.
    pub fn behaviour_count(&self) -> usize {
        [
            self.ret,
            self.return_on_true,
            self.return_on_false,
            self.jump_address.is_some(),
            self.jump_address_on_true.is_some(),
            self.jump_address_on_false.is_some(),
        ]
        .iter()
        .filter(|flag| **flag)
        .count()
    }

    /// Whether the hook returns a `bool` that selects a behaviour.
    pub fn is_conditional(&self) -> bool {
        self.return_on_true
            || self.return_on_false
            || self.jump_address_on_true.is_some()
            || self.jump_address_on_false.is_some()
    }
}

/// Register named in a mid-asm hook's capture list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookRegister {
    Gpr(u8),
    Fpr(u8),
    Vr(u8),
    Cr(u8),
    Ctr,
    Xer,
    Reserved,
    Fpscr,
}

impl HookRegister {
    /// Parse `r3`, `f1`, `v127`, `cr6`, `ctr`, `xer`, `reserved` or `fpscr`.
    pub fn parse(name: &str) -> Option<Self> {
        let lower: String = name.trim().to_ascii_lowercase();
        match lower.as_str() {
            "ctr" => return Some(HookRegister::Ctr),
            "xer" => return Some(HookRegister::Xer),
            "reserved" => return Some(HookRegister::Reserved),
            "fpscr" => return Some(HookRegister::Fpscr),
            _ => {}
        }
        let (prefix, limit): (&str, u8) = if lower.starts_with("cr") {
            ("cr", 8)
        } else if lower.starts_with('r') {
            ("r", 32)
        } else if lower.starts_with('f') {
            ("f", 32)
        } else if lower.starts_with('v') {
            ("v", 128)
        } else {
            return None;
        };
        let index: u8 = lower[prefix.len()..].parse().ok()?;
        if index >= limit {
            return None;
        }
        Some(match prefix {
            "cr" => HookRegister::Cr(index),
            "r" => HookRegister::Gpr(index),
            "f" => HookRegister::Fpr(index),
            _ => HookRegister::Vr(index),
        })
    }
}

/// Discovery heuristics.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct AnalysisOptions {
    /// Forward distance past a function's current extent a jump may reach and still be local.
    #[serde(deserialize_with = "de_address")]
    pub max_jump_extension: u32,
    /// Minimum run of undecodable bytes treated as an embedded data region.
    #[serde(deserialize_with = "de_address")]
    pub data_region_threshold: u32,
    /// Size beyond which far forward jumps are treated as tail calls.
    #[serde(deserialize_with = "de_address")]
    pub large_function_threshold: u32,
    #[serde(deserialize_with = "de_address_vec")]
    pub exception_handler_funcs: Vec<u32>,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            max_jump_extension: 0x40,
            data_region_threshold: 0x20,
            large_function_threshold: 0x10000,
            exception_handler_funcs: Vec::new(),
        }
    }
}

/// Validated override set for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RecompilerConfig {
    pub project_name: String,
    pub file_path: Option<String>,
    pub out_directory_path: Option<String>,

    pub skip_lr: bool,
    pub skip_msr: bool,
    pub ctr_as_local: bool,
    pub xer_as_local: bool,
    pub reserved_as_local: bool,
    pub cr_as_local: bool,
    pub non_argument_as_local: bool,
    pub non_volatile_as_local: bool,

    #[serde(deserialize_with = "de_opt_address")]
    pub longjmp_address: Option<u32>,
    #[serde(deserialize_with = "de_opt_address")]
    pub setjmp_address: Option<u32>,

    #[serde(deserialize_with = "de_functions", skip_serializing)]
    pub functions: Vec<FunctionOverride>,
    pub invalid_instructions: Vec<InvalidInstruction>,
    #[serde(deserialize_with = "de_address_vec")]
    pub indirect_calls: Vec<u32>,
    pub switch_tables: Vec<SwitchTableOverride>,
    pub midasm_hook: Vec<MidAsmHook>,
    pub analysis: AnalysisOptions,
}

impl RecompilerConfig {
    /// Parse a TOML override document.
    ///
    /// # Errors
    /// Returns `ConfigError` for malformed TOML, unknown value types, or function
    /// keys that are not addresses. Semantic checks are left to [`validate`].
    pub fn load(document: &str) -> RecompilerResult<Self> {
        let config: RecompilerConfig = toml::from_str(document)?;
        log::debug!(
            "Loaded config '{}': {} functions, {} switch tables, {} hooks",
            config.project_name,
            config.functions.len(),
            config.switch_tables.len(),
            config.midasm_hook.len()
        );
        Ok(config)
    }

    /// First override declared at `address`.
    pub fn function_override(&self, address: u32) -> Option<&FunctionOverride> {
        self.functions.iter().find(|entry| entry.address == address)
    }

    pub fn switch_table_at(&self, address: u32) -> Option<&SwitchTableOverride> {
        self.switch_tables.iter().find(|table| table.address == address)
    }

    pub fn is_indirect_call(&self, address: u32) -> bool {
        self.indirect_calls.contains(&address)
    }

    pub fn is_exception_handler(&self, address: u32) -> bool {
        self.analysis.exception_handler_funcs.contains(&address)
    }

    /// Invalid-instruction hint matching `word`.
    pub fn invalid_instruction(&self, word: u32) -> Option<&InvalidInstruction> {
        self.invalid_instructions.iter().find(|hint| hint.data == word)
    }

    /// Hooks attached to `address`, indexed for emission.
    pub fn hooks_at(&self, address: u32) -> impl Iterator<Item = &MidAsmHook> {
        self.midasm_hook.iter().filter(move |hook| hook.address == address)
    }

    /// Hooks grouped by address.
    pub fn hook_index(&self) -> HashMap<u32, Vec<&MidAsmHook>> {
        let mut index: HashMap<u32, Vec<&MidAsmHook>> = HashMap::new();
        for hook in self.midasm_hook.iter() {
            index.entry(hook.address).or_default().push(hook);
        }
        index
    }
}

/// Outcome of [`validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    /// Convert into an error when validation failed.
    pub fn into_result(self) -> RecompilerResult<Vec<String>> {
        if self.valid {
            Ok(self.warnings)
        } else {
            Err(RecompilerError::ValidationFailed { errors: self.errors })
        }
    }
}

#[inline]
fn check_aligned(errors: &mut Vec<String>, what: &str, address: u32) {
    if address & 3 != 0 {
        errors.push(format!("{} 0x{:08X} is not 4-byte aligned", what, address));
    }
}

/// Validate a configuration.
///
/// Pure: never mutates the configuration. Callers decide whether to proceed
/// when the report carries errors.
///
/// # Rules
/// - Every configured address must be 4-byte aligned
/// - A function may declare `size` or `end`, not both
/// - `end` must be strictly greater than the function address
/// - Duplicate declarations at one address: differing sizes are an error,
///   identical sizes a warning
/// - Non-chunk function ranges must not overlap
/// - Hooks may declare at most one return/jump behaviour
/// - Switch tables need at least one label
pub fn validate(config: &RecompilerConfig) -> ValidationReport {
    let mut errors: Vec<String> = Vec::new();
    let mut warnings: Vec<String> = Vec::new();

    let mut by_address: BTreeMap<u32, &FunctionOverride> = BTreeMap::new();
    for entry in config.functions.iter() {
        check_aligned(&mut errors, "Function", entry.address);

        if entry.size.is_some() && entry.end.is_some() {
            errors.push(format!("Function {} declares both size and end", entry.key));
        } else if let Some(end) = entry.end {
            if end <= entry.address {
                errors.push(format!(
                    "Function {} has end 0x{:08X} not greater than its address",
                    entry.key, end
                ));
            }
        } else if let Some(size) = entry.size {
            if size == 0 {
                warnings.push(format!("Function {} has zero size", entry.key));
            } else if size % 4 != 0 {
                warnings.push(format!(
                    "Function {} size 0x{:X} is not a multiple of 4",
                    entry.key, size
                ));
            }
        }

        if let Some(parent) = entry.parent {
            check_aligned(&mut errors, "Parent", parent);
            if !config.functions.iter().any(|other| other.address == parent) {
                warnings.push(format!(
                    "Function {} names parent 0x{:08X} which is not configured",
                    entry.key, parent
                ));
            }
        }

        match by_address.get(&entry.address) {
            Some(previous) if previous.extent() != entry.extent() => errors.push(format!(
                "Conflicting declarations for function 0x{:08X} ({} and {})",
                entry.address, previous.key, entry.key
            )),
            Some(previous) => warnings.push(format!(
                "Duplicate declaration for function 0x{:08X} ({} and {})",
                entry.address, previous.key, entry.key
            )),
            None => {
                by_address.insert(entry.address, entry);
            }
        }
    }

    let mut previous: Option<(u32, &str)> = None;
    for entry in by_address.values().filter(|entry| !entry.is_chunk()) {
        let Some(extent) = entry.extent() else {
            continue;
        };
        let end: u32 = entry.address.saturating_add(extent);
        if let Some((previous_end, previous_key)) = previous {
            if previous_end > entry.address {
                errors.push(format!(
                    "Function {} overlaps function {}",
                    entry.key, previous_key
                ));
            }
        }
        if previous.map(|(previous_end, _)| end > previous_end).unwrap_or(true) {
            previous = Some((end, entry.key.as_str()));
        }
    }

    for &address in config.indirect_calls.iter() {
        check_aligned(&mut errors, "Indirect call", address);
    }
    for &address in config.analysis.exception_handler_funcs.iter() {
        check_aligned(&mut errors, "Exception handler", address);
    }
    for (what, address) in [("setjmp", config.setjmp_address), ("longjmp", config.longjmp_address)] {
        if let Some(address) = address {
            check_aligned(&mut errors, what, address);
        }
    }

    for table in config.switch_tables.iter() {
        check_aligned(&mut errors, "Switch table", table.address);
        if table.labels.is_empty() {
            errors.push(format!("Switch table 0x{:08X} has no labels", table.address));
        }
        if table.register > 31 {
            errors.push(format!(
                "Switch table 0x{:08X} names register r{}",
                table.address, table.register
            ));
        }
        for &label in table.labels.iter() {
            check_aligned(&mut errors, "Switch label", label);
        }
    }

    for hook in config.midasm_hook.iter() {
        check_aligned(&mut errors, "Mid-asm hook", hook.address);
        if hook.behaviour_count() > 1 {
            errors.push(format!(
                "Mid-asm hook '{}' at 0x{:08X} declares more than one return/jump behaviour",
                hook.name, hook.address
            ));
        }
        for target in [hook.jump_address, hook.jump_address_on_true, hook.jump_address_on_false]
            .into_iter()
            .flatten()
        {
            check_aligned(&mut errors, "Hook jump target", target);
        }
        for register in hook.registers.iter() {
            if HookRegister::parse(register).is_none() {
                errors.push(format!(
                    "Mid-asm hook '{}' captures unknown register '{}'",
                    hook.name, register
                ));
            }
        }
    }

    for hint in config.invalid_instructions.iter() {
        if hint.size == 0 || hint.size % 4 != 0 {
            warnings.push(format!(
                "Invalid-instruction hint 0x{:08X} has size 0x{:X}",
                hint.data, hint.size
            ));
        }
    }

    ValidationReport {
        valid: errors.is_empty(),
        errors,
        warnings,
    }
}

/// Parse `0x`-prefixed hex or plain decimal.
pub fn parse_address(text: &str) -> Option<u32> {
    let trimmed: String = text.trim().replace('_', "");
    match trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => trimmed.parse::<u32>().ok(),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AddressValue {
    Int(i64),
    Text(String),
}

impl AddressValue {
    fn resolve<E: de::Error>(self) -> Result<u32, E> {
        match self {
            AddressValue::Int(value) => u32::try_from(value)
                .map_err(|_| E::custom(format_args!("address {} out of range", value))),
            AddressValue::Text(text) => {
                parse_address(&text).ok_or_else(|| E::custom(format_args!("invalid address '{}'", text)))
            }
        }
    }
}

fn de_address<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    AddressValue::deserialize(deserializer)?.resolve()
}

fn de_opt_address<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u32>, D::Error> {
    Option::<AddressValue>::deserialize(deserializer)?
        .map(AddressValue::resolve)
        .transpose()
}

fn de_address_vec<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u32>, D::Error> {
    Vec::<AddressValue>::deserialize(deserializer)?
        .into_iter()
        .map(AddressValue::resolve)
        .collect()
}

#[derive(Deserialize)]
struct RawFunction {
    #[serde(default, deserialize_with = "de_opt_address")]
    size: Option<u32>,
    #[serde(default, deserialize_with = "de_opt_address")]
    end: Option<u32>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default, deserialize_with = "de_opt_address")]
    parent: Option<u32>,
}

fn de_functions<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<FunctionOverride>, D::Error> {
    let raw: BTreeMap<String, RawFunction> = BTreeMap::deserialize(deserializer)?;
    let mut functions: Vec<FunctionOverride> = Vec::with_capacity(raw.len());
    for (key, entry) in raw {
        let address: u32 = parse_address(&key).ok_or_else(|| {
            de::Error::custom(format_args!("function key '{}' is not an address", key))
        })?;
        functions.push(FunctionOverride {
            address,
            key,
            size: entry.size,
            end: entry.end,
            name: entry.name,
            parent: entry.parent,
        });
    }
    functions.sort_by_key(|entry| entry.address);
    Ok(functions)
}
