// Unit tests for the vtable scanner
mod common;

use common::*;
use xrecomp_core::recompiler::image::BinaryImage;
use xrecomp_core::recompiler::vtable::{demangle_class_name, scan, scan_image, VTableInfo};

const LOCATOR: u32 = DATA_BASE + 0x14;

/// Type descriptor, locator, back-pointer and slots laid out in one section.
///
/// ```text
/// +0x00  type descriptor: vfptr, spare, ".?AV<name>@@\0" (12 bytes)
/// +0x14  locator: signature 0, offset, cd offset, type descriptor, class hierarchy
/// +0x28  back-pointer to the locator
/// +0x2C  slots...
/// ```
fn rtti_section(mangled: &[u8; 12], slots: &[u32]) -> Vec<u8> {
    let mut data: Vec<u8> = Vec::new();
    data.extend(to_bytes(&[0x1111_1111, 0x2222_2222]));
    data.extend_from_slice(mangled);
    data.extend(to_bytes(&[0, 0, 0, DATA_BASE, 0]));
    data.extend(to_bytes(&[LOCATOR]));
    data.extend(to_bytes(slots));
    data
}

fn code() -> Vec<u32> {
    vec![li(3, 1), BLR, li(3, 2), BLR]
}

#[test]
fn test_scan_recovers_vtable() {
    common::init_logging();
    let data: Vec<u8> = rtti_section(b".?AVFoo@@\0\0\0", &[CODE_BASE, CODE_BASE + 4, CODE_BASE + 8, 0]);
    let image: BinaryImage = image_with_data(&code(), data);

    let tables: Vec<VTableInfo> = scan_image(&image);
    assert_eq!(tables.len(), 1);
    let table: &VTableInfo = &tables[0];
    assert_eq!(table.class_name, "Foo");
    assert_eq!(table.locator, LOCATOR);
    assert_eq!(table.address, DATA_BASE + 0x2C);
    assert_eq!(table.slots, vec![CODE_BASE, CODE_BASE + 4, CODE_BASE + 8]);
}

#[test]
fn test_scan_stops_at_non_executable_slot() {
    let data: Vec<u8> = rtti_section(b".?AUBar@@\0\0\0", &[CODE_BASE, DATA_BASE, CODE_BASE + 4]);
    let image: BinaryImage = image_with_data(&code(), data);

    let section = image.data_sections().next().unwrap();
    let tables: Vec<VTableInfo> = scan(&image, section);
    assert_eq!(tables.len(), 1);
    assert_eq!(tables[0].class_name, "Bar");
    assert_eq!(tables[0].slots, vec![CODE_BASE]);
}

#[test]
fn test_scan_stops_at_unaligned_slot() {
    let data: Vec<u8> = rtti_section(b".?AVFoo@@\0\0\0", &[CODE_BASE + 4, CODE_BASE + 6]);
    let image: BinaryImage = image_with_data(&code(), data);
    let tables: Vec<VTableInfo> = scan_image(&image);
    assert_eq!(tables[0].slots, vec![CODE_BASE + 4]);
}

#[test]
fn test_locator_without_vtable_is_skipped() {
    // Slots that are all invalid leave the locator without a table.
    let data: Vec<u8> = rtti_section(b".?AVFoo@@\0\0\0", &[0, 0]);
    let image: BinaryImage = image_with_data(&code(), data);
    assert!(scan_image(&image).is_empty());
}

#[test]
fn test_unrecognised_prefix_is_ignored() {
    let data: Vec<u8> = rtti_section(b"Foo@@\0\0\0\0\0\0\0", &[CODE_BASE, 0]);
    let image: BinaryImage = image_with_data(&code(), data);
    assert!(scan_image(&image).is_empty());
}

#[test]
fn test_demangle_class_name() {
    assert_eq!(demangle_class_name(b".?AVCPlayer@@").as_deref(), Some("CPlayer"));
    assert_eq!(demangle_class_name(b".?AUVertex@@").as_deref(), Some("Vertex"));
    assert_eq!(demangle_class_name(b".?AVInner@Outer@@").as_deref(), Some("Inner@Outer"));
    assert_eq!(demangle_class_name(b".?AVNoTerminator").as_deref(), Some("NoTerminator"));
    assert_eq!(demangle_class_name(b".?AV@@"), None);
    assert_eq!(demangle_class_name(b"?AVFoo@@"), None);
}
