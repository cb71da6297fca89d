//! DOL Container
//!
//! # DOL File Format
//! - **Text sections**: up to 7 executable sections
//! - **Data sections**: up to 11 data sections
//! - **BSS**: address and size at 0xD8
//! - **Entry point**: at 0xE0
//!
//! Header tables are stored column-wise: all text offsets, then all data offsets,
//! then the text and data load addresses, then the text and data sizes.

use super::Section;
use crate::recompiler::error::{RecompilerError, RecompilerResult};
use std::io::{Cursor, Read};

const NUM_TEXT_SECTIONS: usize = 7;
const NUM_DATA_SECTIONS: usize = 11;
const NUM_SECTIONS: usize = NUM_TEXT_SECTIONS + NUM_DATA_SECTIONS;
const BSS_OFFSET: u64 = 0xD8;
const ENTRY_POINT_OFFSET: u64 = 0xE0;
const MIN_DOL_SIZE: usize = 0x100;

/// Parsed DOL executable.
#[derive(Debug, Clone)]
pub struct DolImage {
    /// Text sections first, then data sections.
    pub sections: Vec<Section>,
    pub bss_address: u32,
    pub bss_size: u32,
    pub entry_point: u32,
}

impl DolImage {
    /// Parse a DOL file from byte data.
    ///
    /// # Algorithm
    /// 1. Read the offset, address and size columns for all 18 section slots
    /// 2. Read BSS address/size and the entry point
    /// 3. Copy the bytes of every non-empty slot out of the file
    ///
    /// # Errors
    /// Returns `ImageParseError` if the header is truncated or a section extends
    /// beyond the end of the file.
    #[inline(never)] // Large function - don't inline
    pub fn parse(data: &[u8]) -> RecompilerResult<Self> {
        if data.len() < MIN_DOL_SIZE {
            return Err(RecompilerError::image_parse(format!(
                "DOL file too small: {} bytes (minimum {} bytes)",
                data.len(),
                MIN_DOL_SIZE
            )));
        }

        let mut cursor: Cursor<&[u8]> = Cursor::new(data);
        let offsets: [u32; NUM_SECTIONS] = read_column(&mut cursor)?;
        let addresses: [u32; NUM_SECTIONS] = read_column(&mut cursor)?;
        let sizes: [u32; NUM_SECTIONS] = read_column(&mut cursor)?;

        cursor.set_position(BSS_OFFSET);
        let bss_address: u32 = read_u32_be(&mut cursor)?;
        let bss_size: u32 = read_u32_be(&mut cursor)?;

        cursor.set_position(ENTRY_POINT_OFFSET);
        let entry_point: u32 = read_u32_be(&mut cursor)?;

        let mut sections: Vec<Section> = Vec::with_capacity(NUM_SECTIONS);
        for slot in 0..NUM_SECTIONS {
            if offsets[slot] == 0 || sizes[slot] == 0 {
                continue;
            }
            let executable: bool = slot < NUM_TEXT_SECTIONS;
            let start: usize = offsets[slot] as usize;
            let end: usize = start.saturating_add(sizes[slot] as usize);
            let bytes: &[u8] = data.get(start..end).ok_or_else(|| {
                RecompilerError::image_parse(format!(
                    "{} section {} extends beyond file: offset 0x{:X}, size 0x{:X}",
                    if executable { "Text" } else { "Data" },
                    slot,
                    start,
                    sizes[slot]
                ))
            })?;
            let name: String = if executable {
                format!(".text{}", slot)
            } else {
                format!(".data{}", slot - NUM_TEXT_SECTIONS)
            };
            sections.push(Section {
                name,
                address: addresses[slot],
                size: sizes[slot],
                data: bytes.to_vec(),
                executable,
            });
        }

        log::debug!(
            "DOL: {} sections, entry 0x{:08X}, bss 0x{:08X}+0x{:X}",
            sections.len(),
            entry_point,
            bss_address,
            bss_size
        );

        Ok(Self {
            sections,
            bss_address,
            bss_size,
            entry_point,
        })
    }
}

fn read_column(cursor: &mut Cursor<&[u8]>) -> RecompilerResult<[u32; NUM_SECTIONS]> {
    let mut column: [u32; NUM_SECTIONS] = [0u32; NUM_SECTIONS];
    for value in column.iter_mut() {
        *value = read_u32_be(cursor)?;
    }
    Ok(column)
}

#[inline]
fn read_u32_be(cursor: &mut Cursor<&[u8]>) -> RecompilerResult<u32> {
    let mut buf: [u8; 4] = [0u8; 4];
    cursor
        .read_exact(&mut buf)
        .map_err(|err| RecompilerError::image_parse(format!("Failed to read DOL header: {}", err)))?;
    Ok(u32::from_be_bytes(buf))
}
