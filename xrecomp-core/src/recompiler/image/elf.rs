//! ELF Container
//!
//! Loads every allocated section that has file contents and collects
//! `STT_FUNC` symbols as discovery seeds.

use super::{Section, Symbol};
use crate::recompiler::error::{RecompilerError, RecompilerResult};
use goblin::elf::section_header::{SHF_ALLOC, SHF_EXECINSTR, SHT_NOBITS};
use goblin::elf::sym::STT_FUNC;
use goblin::elf::Elf;

/// Parsed ELF executable.
#[derive(Debug, Clone)]
pub struct ElfImage {
    pub sections: Vec<Section>,
    pub symbols: Vec<Symbol>,
    pub entry_point: u32,
}

impl ElfImage {
    pub fn parse(data: &[u8]) -> RecompilerResult<Self> {
        let elf: Elf = Elf::parse(data)?;
        if elf.little_endian {
            log::warn!("ELF image is little-endian; PowerPC words will still be read big-endian");
        }

        let mut sections: Vec<Section> = Vec::new();
        for header in elf.section_headers.iter() {
            if header.sh_flags & SHF_ALLOC as u64 == 0 || header.sh_type == SHT_NOBITS || header.sh_size == 0 {
                continue;
            }
            let start: usize = header.sh_offset as usize;
            let end: usize = start.saturating_add(header.sh_size as usize);
            let bytes: &[u8] = data.get(start..end).ok_or_else(|| {
                RecompilerError::image_parse(format!(
                    "ELF section at 0x{:X} extends beyond file (offset 0x{:X}, size 0x{:X})",
                    header.sh_addr, header.sh_offset, header.sh_size
                ))
            })?;
            let name: String = elf
                .shdr_strtab
                .get_at(header.sh_name)
                .unwrap_or("")
                .to_string();
            sections.push(Section {
                name,
                address: header.sh_addr as u32,
                size: header.sh_size as u32,
                data: bytes.to_vec(),
                executable: header.sh_flags & SHF_EXECINSTR as u64 != 0,
            });
        }

        let mut symbols: Vec<Symbol> = elf
            .syms
            .iter()
            .filter(|sym| sym.st_type() == STT_FUNC && sym.st_value != 0)
            .map(|sym| Symbol {
                name: elf.strtab.get_at(sym.st_name).unwrap_or("").to_string(),
                address: sym.st_value as u32,
                size: sym.st_size as u32,
            })
            .collect();
        symbols.sort_by_key(|symbol| symbol.address);
        symbols.dedup_by_key(|symbol| symbol.address);

        log::debug!(
            "ELF: {} sections, {} function symbols, entry 0x{:08X}",
            sections.len(),
            symbols.len(),
            elf.entry
        );

        Ok(Self {
            sections,
            symbols,
            entry_point: elf.entry as u32,
        })
    }
}
