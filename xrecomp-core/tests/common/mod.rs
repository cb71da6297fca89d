//! Test Utilities
//!
//! A small PowerPC assembler for building instruction words by hand, plus
//! helpers that wrap assembled code in an in-memory image.

#![allow(dead_code)]

use xrecomp_core::recompiler::image::{BinaryImage, FlatImage, Section, Symbol};

/// Default load address of test code.
pub const CODE_BASE: u32 = 0x8200_0000;
/// Default load address of test data.
pub const DATA_BASE: u32 = 0x8201_0000;

/// Install `env_logger` once, in test mode.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// --- Instruction encoders ---

pub const NOP: u32 = 0x6000_0000;
pub const BLR: u32 = 0x4E80_0020;
pub const BCTR: u32 = 0x4E80_0420;
pub const EIEIO: u32 = 0x7C00_06AC;
pub const TRAP: u32 = 0x7FE0_0008;
pub const MFLR_R0: u32 = 0x7C08_02A6;
pub const MTLR_R0: u32 = 0x7C08_03A6;

fn d_form(primary: u32, rt: u8, ra: u8, imm: u16) -> u32 {
    (primary << 26) | ((rt as u32) << 21) | ((ra as u32) << 16) | imm as u32
}

fn x_form(rt: u8, ra: u8, rb: u8, xo: u32) -> u32 {
    (31 << 26) | ((rt as u32) << 21) | ((ra as u32) << 16) | ((rb as u32) << 11) | (xo << 1)
}

pub fn addi(rd: u8, ra: u8, simm: i16) -> u32 {
    d_form(14, rd, ra, simm as u16)
}

pub fn li(rd: u8, simm: i16) -> u32 {
    addi(rd, 0, simm)
}

pub fn lis(rd: u8, imm: u16) -> u32 {
    d_form(15, rd, 0, imm)
}

pub fn ori(ra: u8, rs: u8, uimm: u16) -> u32 {
    d_form(24, rs, ra, uimm)
}

pub fn add(rd: u8, ra: u8, rb: u8) -> u32 {
    x_form(rd, ra, rb, 266)
}

/// `addo`: `add` with the overflow-enable bit set.
pub fn addo(rd: u8, ra: u8, rb: u8) -> u32 {
    add(rd, ra, rb) | (1 << 10)
}

pub fn cmpwi(field: u8, ra: u8, simm: i16) -> u32 {
    (11 << 26) | ((field as u32) << 23) | ((ra as u32) << 16) | (simm as u16 as u32)
}

pub fn cmplwi(field: u8, ra: u8, uimm: u16) -> u32 {
    (10 << 26) | ((field as u32) << 23) | ((ra as u32) << 16) | uimm as u32
}

pub fn lwz(rd: u8, offset: i16, ra: u8) -> u32 {
    d_form(32, rd, ra, offset as u16)
}

pub fn stw(rs: u8, offset: i16, ra: u8) -> u32 {
    d_form(36, rs, ra, offset as u16)
}

pub fn lwzx(rd: u8, ra: u8, rb: u8) -> u32 {
    x_form(rd, ra, rb, 23)
}

/// `rlwinm rA, rS, sh, mb, me`
pub fn rlwinm(ra: u8, rs: u8, sh: u8, mb: u8, me: u8) -> u32 {
    (21 << 26)
        | ((rs as u32) << 21)
        | ((ra as u32) << 16)
        | ((sh as u32) << 11)
        | ((mb as u32) << 6)
        | ((me as u32) << 1)
}

pub fn mtctr(rs: u8) -> u32 {
    0x7C09_03A6 | ((rs as u32) << 21)
}

/// `b target`, assembled at `from`.
pub fn b(from: u32, target: u32) -> u32 {
    (18 << 26) | (target.wrapping_sub(from) & 0x03FF_FFFC)
}

/// `bl target`, assembled at `from`.
pub fn bl(from: u32, target: u32) -> u32 {
    b(from, target) | 1
}

/// `bc bo, bi, target`, assembled at `from`.
pub fn bc(bo: u8, bi: u8, from: u32, target: u32) -> u32 {
    (16 << 26) | ((bo as u32) << 21) | ((bi as u32) << 16) | (target.wrapping_sub(from) & 0xFFFC)
}

/// `beq crN, target`
pub fn beq(field: u8, from: u32, target: u32) -> u32 {
    bc(12, field * 4 + 2, from, target)
}

/// `bgt crN, target`
pub fn bgt(field: u8, from: u32, target: u32) -> u32 {
    bc(12, field * 4 + 1, from, target)
}

pub fn fadd(fd: u8, fa: u8, fb: u8) -> u32 {
    (63 << 26) | ((fd as u32) << 21) | ((fa as u32) << 16) | ((fb as u32) << 11) | (21 << 1)
}

pub fn vaddfp(vd: u8, va: u8, vb: u8) -> u32 {
    (4 << 26) | ((vd as u32) << 21) | ((va as u32) << 16) | ((vb as u32) << 11) | 10
}

pub fn stvx(vs: u8, ra: u8, rb: u8) -> u32 {
    x_form(vs, ra, rb, 231)
}

pub fn stvewx(vs: u8, ra: u8, rb: u8) -> u32 {
    x_form(vs, ra, rb, 199)
}

// --- Image builders ---

/// Big-endian bytes of a word list.
pub fn to_bytes(words: &[u32]) -> Vec<u8> {
    words.iter().flat_map(|word| word.to_be_bytes()).collect()
}

pub fn code_section(address: u32, words: &[u32]) -> Section {
    let data: Vec<u8> = to_bytes(words);
    Section {
        name: ".text".to_string(),
        address,
        size: data.len() as u32,
        data,
        executable: true,
    }
}

pub fn data_section(address: u32, data: Vec<u8>) -> Section {
    Section {
        name: ".rdata".to_string(),
        address,
        size: data.len() as u32,
        data,
        executable: false,
    }
}

/// Image with a single code section at [`CODE_BASE`], entry at its start.
pub fn code_image(words: &[u32]) -> BinaryImage {
    BinaryImage::from(FlatImage::from_code(CODE_BASE, to_bytes(words)))
}

/// Image with one code and one data section.
pub fn image_with_data(words: &[u32], data: Vec<u8>) -> BinaryImage {
    BinaryImage::from(FlatImage::new(
        CODE_BASE,
        vec![code_section(CODE_BASE, words), data_section(DATA_BASE, data)],
    ))
}

/// Code image whose symbol table names the given addresses.
pub fn code_image_with_symbols(words: &[u32], symbols: &[(u32, &str)]) -> BinaryImage {
    let symbols: Vec<Symbol> = symbols
        .iter()
        .map(|&(address, name)| Symbol {
            name: name.to_string(),
            address,
            size: 0,
        })
        .collect();
    BinaryImage::from(FlatImage::from_code(CODE_BASE, to_bytes(words)).with_symbols(symbols))
}

/// DOL file with `code` in text slot 0 at [`CODE_BASE`] and `data` in data
/// slot 0 at [`DATA_BASE`], entry at the start of the code.
pub fn dol_file(code: &[u32], data: &[u8]) -> Vec<u8> {
    const HEADER: usize = 0x100;
    let code: Vec<u8> = to_bytes(code);
    let mut file: Vec<u8> = vec![0u8; HEADER];
    let put = |file: &mut Vec<u8>, offset: usize, value: u32| {
        file[offset..offset + 4].copy_from_slice(&value.to_be_bytes());
    };

    // Columns: offsets at 0x00, addresses at 0x48, sizes at 0x90 (7 text slots, then 11 data slots).
    put(&mut file, 0x00, HEADER as u32);
    put(&mut file, 0x48, CODE_BASE);
    put(&mut file, 0x90, code.len() as u32);
    if !data.is_empty() {
        put(&mut file, 0x1C, (HEADER + code.len()) as u32);
        put(&mut file, 0x48 + 0x1C, DATA_BASE);
        put(&mut file, 0x90 + 0x1C, data.len() as u32);
    }
    put(&mut file, 0xE0, CODE_BASE);

    file.extend_from_slice(&code);
    file.extend_from_slice(data);
    file
}
