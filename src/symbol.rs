//! Pipeline symbol management.
//!
//! Defines the locators stored by the reader's indexes, the closed set of
//! pipeline roles a symbol can play, and the resolved symbol view handed back
//! to callers.

use object::read::{SectionIndex, SymbolIndex};

/// A reference to an entry in one of the image's symbol tables.
///
/// Only indices are stored. Name, value and size are read from the image
/// when the entry is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SymbolEntry {
    /// Index of the symbol table section holding the symbol.
    pub symbol_table: SectionIndex,
    /// Index of the symbol within that table.
    pub index: SymbolIndex,
}

impl SymbolEntry {
    pub fn new(symbol_table: SectionIndex, index: SymbolIndex) -> Self {
        Self { symbol_table, index }
    }
}

/// A symbol resolved from a [`SymbolEntry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElfSymbol<'data> {
    /// The locator this symbol was resolved from.
    pub entry: SymbolEntry,
    /// Symbol name, borrowed from the image's string table.
    pub name: &'data str,
    /// `st_value`: offset or address of the symbol.
    pub value: u64,
    /// `st_size`: size of the symbol in bytes.
    pub size: u64,
    /// `st_shndx`: section the symbol is defined in (0 if undefined).
    pub section_index: u16,
    /// `STT_*` symbol type.
    pub kind: u8,
    /// `STB_*` symbol binding.
    pub binding: u8,
}

impl ElfSymbol<'_> {
    pub fn is_defined(&self) -> bool {
        self.section_index != object::elf::SHN_UNDEF
    }

    pub fn is_function(&self) -> bool {
        self.kind == object::elf::STT_FUNC
    }
}

/// A hardware shader stage of the pipeline ABI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HardwareStage {
    Ls,
    Hs,
    Es,
    Gs,
    Vs,
    Ps,
    Cs,
}

impl HardwareStage {
    pub const ALL: [HardwareStage; 7] = [
        HardwareStage::Ls,
        HardwareStage::Hs,
        HardwareStage::Es,
        HardwareStage::Gs,
        HardwareStage::Vs,
        HardwareStage::Ps,
        HardwareStage::Cs,
    ];

    /// Key of this stage in the metadata `.hardware_stages` map.
    pub fn metadata_key(self) -> &'static str {
        match self {
            HardwareStage::Ls => ".ls",
            HardwareStage::Hs => ".hs",
            HardwareStage::Es => ".es",
            HardwareStage::Gs => ".gs",
            HardwareStage::Vs => ".vs",
            HardwareStage::Ps => ".ps",
            HardwareStage::Cs => ".cs",
        }
    }

    /// The symbol role of this stage's main entry point.
    pub fn entry_point(self) -> PipelineSymbolType {
        match self {
            HardwareStage::Ls => PipelineSymbolType::LsMainEntry,
            HardwareStage::Hs => PipelineSymbolType::HsMainEntry,
            HardwareStage::Es => PipelineSymbolType::EsMainEntry,
            HardwareStage::Gs => PipelineSymbolType::GsMainEntry,
            HardwareStage::Vs => PipelineSymbolType::VsMainEntry,
            HardwareStage::Ps => PipelineSymbolType::PsMainEntry,
            HardwareStage::Cs => PipelineSymbolType::CsMainEntry,
        }
    }
}

/// Well-known roles a pipeline symbol can play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u32)]
pub enum PipelineSymbolType {
    LsMainEntry,
    HsMainEntry,
    EsMainEntry,
    GsMainEntry,
    VsMainEntry,
    PsMainEntry,
    CsMainEntry,
    LsShdrIntrlTblPtr,
    HsShdrIntrlTblPtr,
    EsShdrIntrlTblPtr,
    GsShdrIntrlTblPtr,
    VsShdrIntrlTblPtr,
    PsShdrIntrlTblPtr,
    CsShdrIntrlTblPtr,
    LsDisassembly,
    HsDisassembly,
    EsDisassembly,
    GsDisassembly,
    VsDisassembly,
    PsDisassembly,
    CsDisassembly,
    LsShdrIntrlData,
    HsShdrIntrlData,
    EsShdrIntrlData,
    GsShdrIntrlData,
    VsShdrIntrlData,
    PsShdrIntrlData,
    CsShdrIntrlData,
    PipelineIntrlData,
}

/// Symbol names, indexed by `PipelineSymbolType` discriminant.
const PIPELINE_SYMBOL_NAMES: [&str; PipelineSymbolType::COUNT] = [
    "_amdgpu_ls_main",
    "_amdgpu_hs_main",
    "_amdgpu_es_main",
    "_amdgpu_gs_main",
    "_amdgpu_vs_main",
    "_amdgpu_ps_main",
    "_amdgpu_cs_main",
    "_amdgpu_ls_shdr_intrl_tbl",
    "_amdgpu_hs_shdr_intrl_tbl",
    "_amdgpu_es_shdr_intrl_tbl",
    "_amdgpu_gs_shdr_intrl_tbl",
    "_amdgpu_vs_shdr_intrl_tbl",
    "_amdgpu_ps_shdr_intrl_tbl",
    "_amdgpu_cs_shdr_intrl_tbl",
    "_amdgpu_ls_disasm",
    "_amdgpu_hs_disasm",
    "_amdgpu_es_disasm",
    "_amdgpu_gs_disasm",
    "_amdgpu_vs_disasm",
    "_amdgpu_ps_disasm",
    "_amdgpu_cs_disasm",
    "_amdgpu_ls_shdr_intrl_data",
    "_amdgpu_hs_shdr_intrl_data",
    "_amdgpu_es_shdr_intrl_data",
    "_amdgpu_gs_shdr_intrl_data",
    "_amdgpu_vs_shdr_intrl_data",
    "_amdgpu_ps_shdr_intrl_data",
    "_amdgpu_cs_shdr_intrl_data",
    "_amdgpu_pipeline_intrl_data",
];

impl PipelineSymbolType {
    pub const COUNT: usize = 29;

    pub const ALL: [PipelineSymbolType; Self::COUNT] = [
        PipelineSymbolType::LsMainEntry,
        PipelineSymbolType::HsMainEntry,
        PipelineSymbolType::EsMainEntry,
        PipelineSymbolType::GsMainEntry,
        PipelineSymbolType::VsMainEntry,
        PipelineSymbolType::PsMainEntry,
        PipelineSymbolType::CsMainEntry,
        PipelineSymbolType::LsShdrIntrlTblPtr,
        PipelineSymbolType::HsShdrIntrlTblPtr,
        PipelineSymbolType::EsShdrIntrlTblPtr,
        PipelineSymbolType::GsShdrIntrlTblPtr,
        PipelineSymbolType::VsShdrIntrlTblPtr,
        PipelineSymbolType::PsShdrIntrlTblPtr,
        PipelineSymbolType::CsShdrIntrlTblPtr,
        PipelineSymbolType::LsDisassembly,
        PipelineSymbolType::HsDisassembly,
        PipelineSymbolType::EsDisassembly,
        PipelineSymbolType::GsDisassembly,
        PipelineSymbolType::VsDisassembly,
        PipelineSymbolType::PsDisassembly,
        PipelineSymbolType::CsDisassembly,
        PipelineSymbolType::LsShdrIntrlData,
        PipelineSymbolType::HsShdrIntrlData,
        PipelineSymbolType::EsShdrIntrlData,
        PipelineSymbolType::GsShdrIntrlData,
        PipelineSymbolType::VsShdrIntrlData,
        PipelineSymbolType::PsShdrIntrlData,
        PipelineSymbolType::CsShdrIntrlData,
        PipelineSymbolType::PipelineIntrlData,
    ];

    /// Position of this role in the reader's fixed symbol array.
    pub fn index(self) -> usize {
        self as usize
    }

    /// The ELF symbol name that identifies this role.
    pub fn name(self) -> &'static str {
        PIPELINE_SYMBOL_NAMES[self.index()]
    }

    /// Classifies a symbol name. Matching is exact and case-sensitive.
    pub fn from_name(name: &str) -> Option<Self> {
        PIPELINE_SYMBOL_NAMES
            .iter()
            .position(|candidate| *candidate == name)
            .map(|index| Self::ALL[index])
    }
}
