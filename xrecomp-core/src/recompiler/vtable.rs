//! VTable Scanner
//!
//! Recovers virtual-dispatch tables and class names from MSVC run-time type
//! information in read-only data. Independent of decoding and discovery; the
//! recovered slot targets feed discovery as extra function entries.
//!
//! # Algorithm
//! 1. Find Complete Object Locators: 20-byte records with a zero signature whose
//!    type-descriptor pointer leads to a name starting with `.?AV` or `.?AU`
//! 2. For each locator, find a word in the same section equal to its address;
//!    the vtable starts right after that back-pointer
//! 3. Read slots until a null, non-executable or unaligned value
//! 4. Demangle the class name: strip the prefix, cut at the first `@@`

use crate::recompiler::image::{BinaryImage, Section};
use serde::Serialize;

/// Size of a Complete Object Locator record.
pub const LOCATOR_SIZE: u32 = 20;
/// Offset of the mangled name inside a type descriptor (after vfptr and spare).
const TYPE_NAME_OFFSET: u32 = 8;
const CLASS_PREFIX: &[u8] = b".?AV";
const STRUCT_PREFIX: &[u8] = b".?AU";
const MAX_NAME_LENGTH: usize = 512;

/// One recovered virtual table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VTableInfo {
    /// Address of the first slot.
    pub address: u32,
    /// Address of the Complete Object Locator.
    pub locator: u32,
    pub class_name: String,
    /// Slot targets in table order.
    pub slots: Vec<u32>,
}

/// Scan one data section for vtables.
pub fn scan(image: &BinaryImage, section: &Section) -> Vec<VTableInfo> {
    let locators: Vec<(u32, String)> = find_locators(image, section);
    log::debug!(
        "{}: {} object locator candidate(s)",
        section.name,
        locators.len()
    );

    let mut tables: Vec<VTableInfo> = Vec::new();
    for (locator, class_name) in locators {
        let Some(address) = find_vtable_start(image, section, locator) else {
            log::debug!("No vtable references locator 0x{:08X} ({})", locator, class_name);
            continue;
        };
        let slots: Vec<u32> = read_slots(image, section, address);
        if slots.is_empty() {
            continue;
        }
        tables.push(VTableInfo {
            address,
            locator,
            class_name,
            slots,
        });
    }
    tables
}

/// Scan every non-executable section of the image.
pub fn scan_image(image: &BinaryImage) -> Vec<VTableInfo> {
    let tables: Vec<VTableInfo> = image
        .data_sections()
        .flat_map(|section| scan(image, section))
        .collect();
    log::info!("Recovered {} vtable(s)", tables.len());
    tables
}

/// Demangle an MSVC type-descriptor name (`.?AVFoo@@` -> `Foo`).
pub fn demangle_class_name(mangled: &[u8]) -> Option<String> {
    let body: &[u8] = mangled
        .strip_prefix(CLASS_PREFIX)
        .or_else(|| mangled.strip_prefix(STRUCT_PREFIX))?;
    let end: usize = body
        .windows(2)
        .position(|pair| pair == b"@@")
        .unwrap_or(body.len());
    let name: &str = std::str::from_utf8(&body[..end]).ok()?;
    if name.is_empty() {
        return None;
    }
    Some(name.to_string())
}

fn find_locators(image: &BinaryImage, section: &Section) -> Vec<(u32, String)> {
    let mut found: Vec<(u32, String)> = Vec::new();
    let mut address: u32 = section.address;
    while address.saturating_add(LOCATOR_SIZE) <= section.end() {
        if section.read_u32(address) == Some(0) {
            let descriptor: Option<u32> = section.read_u32(address + 12);
            if let Some(name) = descriptor.and_then(|ptr| read_type_name(image, ptr)) {
                found.push((address, name));
            }
        }
        address += 4;
    }
    found
}

fn read_type_name(image: &BinaryImage, descriptor: u32) -> Option<String> {
    let name_address: u32 = descriptor.checked_add(TYPE_NAME_OFFSET)?;
    let section: &Section = image.section_containing(name_address)?;
    let start: usize = (name_address - section.address) as usize;
    let tail: &[u8] = section.data.get(start..)?;
    if !tail.starts_with(CLASS_PREFIX) && !tail.starts_with(STRUCT_PREFIX) {
        return None;
    }
    let length: usize = tail
        .iter()
        .take(MAX_NAME_LENGTH)
        .position(|&byte| byte == 0)
        .unwrap_or(tail.len().min(MAX_NAME_LENGTH));
    demangle_class_name(&tail[..length])
}

fn find_vtable_start(image: &BinaryImage, section: &Section, locator: u32) -> Option<u32> {
    section
        .words()
        .filter(|&(_, word)| word == locator)
        .map(|(address, _)| address + 4)
        .find(|&start| {
            section
                .read_u32(start)
                .map(|slot| is_slot(image, slot))
                .unwrap_or(false)
        })
}

#[inline]
fn is_slot(image: &BinaryImage, value: u32) -> bool {
    value != 0 && value & 3 == 0 && image.is_executable(value)
}

fn read_slots(image: &BinaryImage, section: &Section, start: u32) -> Vec<u32> {
    let mut slots: Vec<u32> = Vec::new();
    let mut address: u32 = start;
    while let Some(value) = section.read_u32(address) {
        if !is_slot(image, value) {
            break;
        }
        slots.push(value);
        address += 4;
    }
    slots
}
