//! ELF image view.
//!
//! A thin, immutable wrapper around `object::read::elf` exposing the section,
//! symbol and note access the pipeline reader needs. Everything returned
//! borrows from the caller's image buffer.

use object::elf::{FileHeader64, SectionHeader64, Sym64};
use object::read::elf::{FileHeader, NoteIterator, SectionHeader, Sym};
use object::read::{SectionIndex, StringTable, SymbolIndex};
use object::Endianness;

use crate::symbol::{ElfSymbol, SymbolEntry};

// AMDGPU values not mapped by object crate
pub const ELFOSABI_AMDGPU_PAL: u8 = 65;
pub const EM_AMDGPU: u16 = 224;

pub type Elf = FileHeader64<Endianness>;
pub type ElfSectionHeader = SectionHeader64<Endianness>;
pub type ElfSym = Sym64<Endianness>;

/// Read-only view over an ELF64 image.
#[derive(Debug, Clone, Copy)]
pub struct ElfReader<'data> {
    data: &'data [u8],
    endian: Endianness,
    header: &'data Elf,
    sections: &'data [ElfSectionHeader],
    section_names: StringTable<'data>,
}

impl<'data> ElfReader<'data> {
    pub fn parse(data: &'data [u8]) -> object::read::Result<Self> {
        let header = Elf::parse(data)?;
        let endian = header.endian()?;
        let sections = header.section_headers(endian, data)?;
        let section_names = header.section_strings(endian, data, sections)?;
        Ok(Self {
            data,
            endian,
            header,
            sections,
            section_names,
        })
    }

    /// The whole image.
    pub fn data(&self) -> &'data [u8] {
        self.data
    }

    pub fn endian(&self) -> Endianness {
        self.endian
    }

    pub fn header(&self) -> &'data Elf {
        self.header
    }

    pub fn os_abi(&self) -> u8 {
        self.header.e_ident().os_abi
    }

    pub fn machine(&self) -> u16 {
        self.header.e_machine(self.endian)
    }

    pub fn flags(&self) -> u32 {
        self.header.e_flags(self.endian)
    }

    /// Whether the image targets the AMDGPU PAL OS ABI.
    pub fn is_pal_image(&self) -> bool {
        self.os_abi() == ELFOSABI_AMDGPU_PAL
    }

    /// Number of section headers, including the null section.
    pub fn num_sections(&self) -> usize {
        self.sections.len()
    }

    pub fn sections(&self) -> impl Iterator<Item = (SectionIndex, &'data ElfSectionHeader)> {
        self.sections
            .iter()
            .enumerate()
            .map(|(index, section)| (SectionIndex(index), section))
    }

    pub fn section(&self, index: SectionIndex) -> Option<&'data ElfSectionHeader> {
        self.sections.get(index.0)
    }

    /// Section name, or `None` if the index or name offset is invalid.
    pub fn section_name(&self, index: SectionIndex) -> Option<&'data str> {
        let name = self.section(index)?.name(self.endian, self.section_names).ok()?;
        std::str::from_utf8(name).ok()
    }

    /// `sh_type` of the section.
    pub fn section_type(&self, index: SectionIndex) -> Option<u32> {
        Some(self.section(index)?.sh_type(self.endian))
    }

    /// `sh_link` of the section.
    pub fn section_link(&self, index: SectionIndex) -> Option<SectionIndex> {
        let link = self.section(index)?.sh_link(self.endian);
        Some(SectionIndex(link as usize))
    }

    /// Raw payload of the section. Empty for `SHT_NOBITS`.
    pub fn section_data(&self, section: &ElfSectionHeader) -> object::read::Result<&'data [u8]> {
        section.data(self.endian, self.data)
    }

    /// The symbol table stored in a section.
    ///
    /// Returns `Ok(None)` if the section is not `SHT_SYMTAB`/`SHT_DYNSYM` or
    /// its `sh_link` does not name a string table.
    pub fn symbol_table(&self, index: SectionIndex) -> object::read::Result<Option<SymbolTable<'data>>> {
        let Some(section) = self.section(index) else {
            return Ok(None);
        };
        let sh_type = section.sh_type(self.endian);
        if sh_type != object::elf::SHT_SYMTAB && sh_type != object::elf::SHT_DYNSYM {
            return Ok(None);
        }
        let Some(link) = self.section_link(index).and_then(|link| self.section(link)) else {
            return Ok(None);
        };
        let Some(strings) = link.strings(self.endian, self.data)? else {
            return Ok(None);
        };
        let symbols = section.data_as_array::<ElfSym, _>(self.endian, self.data)?;
        Ok(Some(SymbolTable {
            section: index,
            endian: self.endian,
            symbols,
            strings,
        }))
    }

    /// Resolves a locator into a full symbol view.
    pub fn symbol(&self, entry: SymbolEntry) -> Option<ElfSymbol<'data>> {
        self.symbol_table(entry.symbol_table).ok()??.symbol(entry.index)
    }

    /// Sections that may carry notes: any `SHT_NOTE` section, or one named `.note`.
    pub fn note_sections(&self) -> impl Iterator<Item = (SectionIndex, &'data ElfSectionHeader)> + '_ {
        self.sections().filter(move |(index, section)| {
            section.sh_type(self.endian) == object::elf::SHT_NOTE
                || self.section_name(*index) == Some(".note")
        })
    }

    /// Iterates the notes stored in a section, regardless of its type.
    pub fn notes(&self, section: &ElfSectionHeader) -> object::read::Result<NoteIterator<'data, Elf>> {
        let data = self.section_data(section)?;
        NoteIterator::new(self.endian, section.sh_addralign(self.endian), data)
    }
}

/// A symbol table section paired with its linked string table.
#[derive(Debug, Clone, Copy)]
pub struct SymbolTable<'data> {
    section: SectionIndex,
    endian: Endianness,
    symbols: &'data [ElfSym],
    strings: StringTable<'data>,
}

impl<'data> SymbolTable<'data> {
    pub fn section(&self) -> SectionIndex {
        self.section
    }

    /// Number of entries, including the null symbol at index 0.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn raw(&self, index: SymbolIndex) -> Option<&'data ElfSym> {
        self.symbols.get(index.0)
    }

    /// Raw name bytes of a symbol. Fails if the name offset is outside the string table.
    pub fn name(&self, index: SymbolIndex) -> Option<object::read::Result<&'data [u8]>> {
        let sym = self.raw(index)?;
        Some(sym.name(self.endian, self.strings))
    }

    pub fn symbol(&self, index: SymbolIndex) -> Option<ElfSymbol<'data>> {
        let sym = self.raw(index)?;
        let name = sym.name(self.endian, self.strings).ok()?;
        Some(ElfSymbol {
            entry: SymbolEntry::new(self.section, index),
            name: std::str::from_utf8(name).ok()?,
            value: sym.st_value(self.endian),
            size: sym.st_size(self.endian),
            section_index: sym.st_shndx(self.endian),
            kind: sym.st_type(),
            binding: sym.st_bind(),
        })
    }
}
