// Unit tests for the binary image view
mod common;

use common::*;
use xrecomp_core::recompiler::error::RecompilerError;
use xrecomp_core::recompiler::image::{BinaryImage, Section};

#[test]
fn test_parse_dol() {
    common::init_logging();
    let file: Vec<u8> = dol_file(&[li(3, 1), BLR], &to_bytes(&[0xDEAD_BEEF]));
    let image: BinaryImage = BinaryImage::parse(&file).unwrap();

    assert_eq!(image.kind(), "dol");
    assert_eq!(image.entry_point(), CODE_BASE);
    assert_eq!(image.sections().len(), 2);
    assert_eq!(image.base_address(), CODE_BASE);
    assert_eq!(image.image_size(), DATA_BASE + 4 - CODE_BASE);

    let text: &Section = image.executable_sections().next().unwrap();
    assert_eq!(text.name, ".text0");
    assert_eq!(text.size, 8);
    let data: &Section = image.data_sections().next().unwrap();
    assert_eq!(data.name, ".data0");

    assert_eq!(image.read_u32(CODE_BASE + 4).unwrap(), BLR);
    assert_eq!(image.read_u32(DATA_BASE).unwrap(), 0xDEAD_BEEF);
    assert!(image.is_executable(CODE_BASE));
    assert!(!image.is_executable(DATA_BASE));
    assert!(image.symbols().is_empty());
}

#[test]
fn test_parse_rejects_truncated_dol() {
    assert!(matches!(
        BinaryImage::parse(&[0u8; 0x40]),
        Err(RecompilerError::ImageParseError { .. })
    ));

    // Section runs past the end of the file.
    let mut file: Vec<u8> = dol_file(&[li(3, 1), BLR], &[]);
    file.truncate(0x104);
    assert!(BinaryImage::parse(&file).is_err());
}

#[test]
fn test_unmapped_read() {
    let image: BinaryImage = code_image(&[li(3, 1), BLR]);
    assert!(matches!(
        image.read_u32(CODE_BASE + 8),
        Err(RecompilerError::UnmappedAddress { address, .. }) if address == CODE_BASE + 8
    ));
    // Straddling the end of the section is unmapped too.
    assert!(image.read_u32(CODE_BASE + 6).is_err());
    assert!(image.section_containing(CODE_BASE - 4).is_none());
}

#[test]
fn test_section_words() {
    let section: Section = code_section(CODE_BASE, &[NOP, BLR]);
    let words: Vec<(u32, u32)> = section.words().collect();
    assert_eq!(words, vec![(CODE_BASE, NOP), (CODE_BASE + 4, BLR)]);
    assert_eq!(section.end(), CODE_BASE + 8);
    assert!(section.bytes(CODE_BASE + 4, 8).is_none());
}
