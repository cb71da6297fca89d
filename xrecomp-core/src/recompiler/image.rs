//! Binary Image
//!
//! A closed set of supported executable containers, each exposing the same
//! read-only view the recompiler consumes: base address, entry point, image size,
//! sections, symbols, an "is executable" predicate and big-endian word reads.
//!
//! # Supported Containers
//! - **DOL**: fixed-header container with up to 7 text and 11 data sections
//! - **ELF**: parsed with `goblin`; allocated sections and `STT_FUNC` symbols
//! - **Flat**: sections supplied by a host loader (for example an unpacked XEX)

mod dol;
mod elf;

pub use dol::DolImage;
pub use elf::ElfImage;

use crate::recompiler::error::{RecompilerError, RecompilerResult};
use serde::Serialize;

/// One loaded section.
#[derive(Debug, Clone, Serialize)]
pub struct Section {
    pub name: String,
    /// Load address in the guest address space.
    pub address: u32,
    pub size: u32,
    #[serde(skip)]
    pub data: Vec<u8>,
    pub executable: bool,
}

impl Section {
    /// One past the last mapped address.
    #[inline]
    pub fn end(&self) -> u32 {
        self.address.wrapping_add(self.size)
    }

    #[inline]
    pub fn contains(&self, address: u32) -> bool {
        address >= self.address && address < self.end()
    }

    /// Bytes backing `[address, address + len)`, if fully inside the section.
    ///
    /// Zero-initialised tails (size larger than the file data) read as absent.
    pub fn bytes(&self, address: u32, len: usize) -> Option<&[u8]> {
        if !self.contains(address) {
            return None;
        }
        let start: usize = (address - self.address) as usize;
        self.data.get(start..start.checked_add(len)?)
    }

    /// Read a big-endian word.
    #[inline]
    pub fn read_u32(&self, address: u32) -> Option<u32> {
        let bytes: &[u8] = self.bytes(address, 4)?;
        Some(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Iterate `(address, word)` pairs over the word-aligned contents.
    pub fn words(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        let base: u32 = self.address;
        self.data
            .chunks_exact(4)
            .enumerate()
            .map(move |(index, chunk)| {
                let word: u32 = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
                (base.wrapping_add((index as u32) * 4), word)
            })
    }
}

/// Named address from the container's symbol table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Symbol {
    pub name: String,
    pub address: u32,
    pub size: u32,
}

/// Sections supplied directly by a host loader.
#[derive(Debug, Clone, Default)]
pub struct FlatImage {
    pub entry_point: u32,
    pub sections: Vec<Section>,
    pub symbols: Vec<Symbol>,
}

impl FlatImage {
    pub fn new(entry_point: u32, sections: Vec<Section>) -> Self {
        Self {
            entry_point,
            sections,
            symbols: Vec::new(),
        }
    }

    /// Single executable section covering `code`, loaded at `address`.
    pub fn from_code(address: u32, code: Vec<u8>) -> Self {
        let section: Section = Section {
            name: ".text".to_string(),
            address,
            size: code.len() as u32,
            data: code,
            executable: true,
        };
        Self::new(address, vec![section])
    }

    pub fn with_symbols(mut self, symbols: Vec<Symbol>) -> Self {
        self.symbols = symbols;
        self
    }
}

/// Supported executable containers.
#[derive(Debug, Clone)]
pub enum BinaryImage {
    Dol(DolImage),
    Elf(ElfImage),
    Flat(FlatImage),
}

impl BinaryImage {
    /// Parse a container, detecting the format from its header.
    ///
    /// # Arguments
    /// * `data` - Raw file contents
    ///
    /// # Returns
    /// `RecompilerResult<BinaryImage>` - ELF when the ELF magic is present, DOL otherwise
    pub fn parse(data: &[u8]) -> RecompilerResult<Self> {
        if data.starts_with(b"\x7FELF") {
            log::info!("Detected ELF container ({} bytes)", data.len());
            Ok(BinaryImage::Elf(ElfImage::parse(data)?))
        } else {
            log::info!("Assuming DOL container ({} bytes)", data.len());
            Ok(BinaryImage::Dol(DolImage::parse(data)?))
        }
    }

    pub fn sections(&self) -> &[Section] {
        match self {
            BinaryImage::Dol(dol) => &dol.sections,
            BinaryImage::Elf(elf) => &elf.sections,
            BinaryImage::Flat(flat) => &flat.sections,
        }
    }

    pub fn symbols(&self) -> &[Symbol] {
        match self {
            BinaryImage::Dol(_) => &[],
            BinaryImage::Elf(elf) => &elf.symbols,
            BinaryImage::Flat(flat) => &flat.symbols,
        }
    }

    pub fn entry_point(&self) -> u32 {
        match self {
            BinaryImage::Dol(dol) => dol.entry_point,
            BinaryImage::Elf(elf) => elf.entry_point,
            BinaryImage::Flat(flat) => flat.entry_point,
        }
    }

    /// Lowest mapped address.
    pub fn base_address(&self) -> u32 {
        self.sections().iter().map(|section| section.address).min().unwrap_or(0)
    }

    /// Span from the base address to the end of the highest section.
    pub fn image_size(&self) -> u32 {
        let end: u32 = self.sections().iter().map(Section::end).max().unwrap_or(0);
        end.saturating_sub(self.base_address())
    }

    pub fn section_containing(&self, address: u32) -> Option<&Section> {
        self.sections().iter().find(|section| section.contains(address))
    }

    /// Whether `address` lies inside an executable section.
    #[inline]
    pub fn is_executable(&self, address: u32) -> bool {
        self.section_containing(address)
            .map(|section| section.executable)
            .unwrap_or(false)
    }

    /// Read a big-endian word from any mapped section.
    pub fn read_u32(&self, address: u32) -> RecompilerResult<u32> {
        self.section_containing(address)
            .and_then(|section| section.read_u32(address))
            .ok_or_else(|| RecompilerError::unmapped(address))
    }

    pub fn executable_sections(&self) -> impl Iterator<Item = &Section> {
        self.sections().iter().filter(|section| section.executable)
    }

    pub fn data_sections(&self) -> impl Iterator<Item = &Section> {
        self.sections().iter().filter(|section| !section.executable)
    }

    /// Short container name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            BinaryImage::Dol(_) => "dol",
            BinaryImage::Elf(_) => "elf",
            BinaryImage::Flat(_) => "flat",
        }
    }
}

impl From<FlatImage> for BinaryImage {
    fn from(flat: FlatImage) -> Self {
        BinaryImage::Flat(flat)
    }
}
