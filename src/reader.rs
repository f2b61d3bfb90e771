//! Pipeline ABI reader.
//!
//! `PipelineAbiReader` indexes the symbols of a pipeline ELF image in a single
//! pass at construction:
//! 1. Structure check: `.text` and a note section.
//! 2. Classification: every named symbol is matched against the pipeline roles.
//! 3. Indexing: role matches land in a fixed array, everything else in a
//!    name-keyed map.
//!
//! Lookups afterwards are read-only and resolve locators lazily through the
//! [`ElfReader`].

use std::collections::HashMap;

use object::read::elf::SectionHeader;
use object::read::SymbolIndex;
use tracing::{debug, trace, warn};

use crate::elf::ElfReader;
use crate::error::{AbiError, MetadataError};
use crate::metadata::{CodeObjectMetadata, MetadataDecoder, MsgPackDecoder, AMDGPU_NOTE_NAME, NT_AMDGPU_METADATA};
use crate::symbol::{ElfSymbol, PipelineSymbolType, SymbolEntry};

/// How strictly the image structure is checked at construction.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Validation {
    /// Missing `.text` or note sections are logged and tolerated.
    #[default]
    Tolerant,
    /// Missing `.text` or note sections are errors.
    Strict,
}

type PipelineSymbols = [Option<SymbolEntry>; PipelineSymbolType::COUNT];

/// Symbol and metadata access for an ELF image following the pipeline ABI.
///
/// Names in the generic index borrow the image's string table, so the reader
/// cannot outlive the image buffer.
#[derive(Debug)]
pub struct PipelineAbiReader<'data> {
    elf: ElfReader<'data>,
    pipeline_symbols: PipelineSymbols,
    generic_symbols: HashMap<&'data str, SymbolEntry>,
}

impl<'data> PipelineAbiReader<'data> {
    /// Parses and indexes `data`, tolerating missing `.text` and note sections.
    pub fn new(data: &'data [u8]) -> Result<Self, AbiError> {
        Self::with_validation(data, Validation::Tolerant)
    }

    pub fn with_validation(data: &'data [u8], validation: Validation) -> Result<Self, AbiError> {
        let elf = ElfReader::parse(data)?;
        check_structure(&elf, validation)?;

        let mut reader = Self {
            elf,
            pipeline_symbols: [None; PipelineSymbolType::COUNT],
            generic_symbols: HashMap::new(),
        };
        reader.index_symbols()?;
        Ok(reader)
    }

    fn index_symbols(&mut self) -> Result<(), AbiError> {
        let elf = self.elf;
        let endian = elf.endian();
        let mut symbol_tables = 0;

        for (section_index, section) in elf.sections() {
            if section.sh_type(endian) != object::elf::SHT_SYMTAB || section.sh_link(endian) == 0 {
                continue;
            }
            let table = elf
                .symbol_table(section_index)?
                .ok_or(AbiError::InvalidStringTable {
                    section: section_index.0,
                    link: section.sh_link(endian) as usize,
                })?;
            symbol_tables += 1;

            self.generic_symbols.try_reserve(table.len().saturating_sub(1))?;

            // Entry 0 is the reserved null symbol.
            for index in (1..table.len()).map(SymbolIndex) {
                let malformed = AbiError::MalformedSymbol {
                    section: section_index.0,
                    index: index.0,
                };
                let name = match table.name(index) {
                    Some(Ok(name)) => std::str::from_utf8(name).map_err(|_| malformed)?,
                    _ => return Err(malformed),
                };
                if name.is_empty() {
                    continue;
                }
                self.insert_symbol(name, SymbolEntry::new(section_index, index));
            }
        }

        if symbol_tables == 0 {
            return Err(AbiError::NoSymbolTable);
        }

        debug!(
            "Indexed {} symbol tables: {} pipeline symbols, {} generic symbols",
            symbol_tables,
            self.pipeline_symbols.iter().flatten().count(),
            self.generic_symbols.len()
        );
        Ok(())
    }

    /// First occurrence wins, both for roles and for generic names.
    fn insert_symbol(&mut self, name: &'data str, entry: SymbolEntry) {
        match PipelineSymbolType::from_name(name) {
            Some(role) => {
                let slot = &mut self.pipeline_symbols[role.index()];
                if slot.is_some() {
                    debug!("Discarding duplicate pipeline symbol {} at {:?}", name, entry);
                } else {
                    trace!("Pipeline symbol {:?} -> {:?}", role, entry);
                    *slot = Some(entry);
                }
            }
            None => {
                if self.generic_symbols.contains_key(name) {
                    debug!("Discarding duplicate symbol {} at {:?}", name, entry);
                } else {
                    self.generic_symbols.insert(name, entry);
                }
            }
        }
    }

    /// The underlying ELF view, for raw section access.
    pub fn elf_reader(&self) -> &ElfReader<'data> {
        &self.elf
    }

    /// Resolves any locator produced by this reader.
    pub fn resolve(&self, entry: SymbolEntry) -> Option<ElfSymbol<'data>> {
        self.elf.symbol(entry)
    }

    pub fn pipeline_symbol_entry(&self, role: PipelineSymbolType) -> Option<SymbolEntry> {
        self.pipeline_symbols[role.index()]
    }

    /// Returns the symbol playing `role`, if the image has one.
    pub fn pipeline_symbol(&self, role: PipelineSymbolType) -> Option<ElfSymbol<'data>> {
        self.resolve(self.pipeline_symbol_entry(role)?)
    }

    /// All roles present in the image, in role order.
    pub fn pipeline_symbols(&self) -> impl Iterator<Item = (PipelineSymbolType, SymbolEntry)> + '_ {
        PipelineSymbolType::ALL
            .into_iter()
            .filter_map(|role| Some((role, self.pipeline_symbol_entry(role)?)))
    }

    pub fn generic_symbol_entry(&self, name: &str) -> Option<SymbolEntry> {
        self.generic_symbols.get(name).copied()
    }

    /// Returns the symbol named exactly `name`, if it is not a pipeline role symbol.
    pub fn generic_symbol(&self, name: &str) -> Option<ElfSymbol<'data>> {
        self.resolve(self.generic_symbol_entry(name)?)
    }

    /// All generic symbols, in no particular order.
    pub fn generic_symbols(&self) -> impl Iterator<Item = (&'data str, SymbolEntry)> + '_ {
        self.generic_symbols.iter().map(|(name, entry)| (*name, *entry))
    }

    /// Payload of the first `AMDGPU` metadata note.
    ///
    /// Note sections that fail to parse are skipped; scanning continues with
    /// the next one.
    pub fn metadata_payload(&self) -> Result<&'data [u8], MetadataError> {
        let endian = self.elf.endian();
        for (index, section) in self.elf.note_sections() {
            let mut notes = match self.elf.notes(section) {
                Ok(notes) => notes,
                Err(err) => {
                    debug!("Skipping note section {}: {}", index.0, err);
                    continue;
                }
            };
            loop {
                let note = match notes.next() {
                    Ok(Some(note)) => note,
                    Ok(None) => break,
                    Err(err) => {
                        debug!("Skipping rest of note section {}: {}", index.0, err);
                        break;
                    }
                };
                if note.name() == AMDGPU_NOTE_NAME && note.n_type(endian) == NT_AMDGPU_METADATA {
                    trace!("Metadata note in section {} ({} bytes)", index.0, note.desc().len());
                    return Ok(note.desc());
                }
            }
        }
        Err(MetadataError::Missing)
    }

    /// Decodes the metadata note with `decoder`.
    pub fn metadata<D: MetadataDecoder>(&self, decoder: &D) -> Result<D::Output, MetadataError> {
        decoder.decode(self.metadata_payload()?)
    }

    /// Decodes the metadata note as PAL code object metadata.
    pub fn code_object_metadata(&self) -> Result<CodeObjectMetadata, MetadataError> {
        self.metadata(&MsgPackDecoder)
    }
}

fn check_structure(elf: &ElfReader<'_>, validation: Validation) -> Result<(), AbiError> {
    let endian = elf.endian();
    let mut has_text = false;
    let mut has_note = false;

    for (index, section) in elf.sections() {
        match elf.section_name(index) {
            Some(".text") => has_text = true,
            Some(".note") => has_note = true,
            _ => {}
        }
        if section.sh_type(endian) == object::elf::SHT_NOTE {
            has_note = true;
        }
    }

    for (present, name) in [(has_text, ".text"), (has_note, ".note")] {
        if present {
            continue;
        }
        match validation {
            Validation::Tolerant => warn!("Missing {} section", name),
            Validation::Strict => return Err(AbiError::MissingSection(name)),
        }
    }
    Ok(())
}
