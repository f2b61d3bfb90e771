//! Shared helpers for building synthetic pipeline ELF images.

#![allow(dead_code)]

use object::endian::{U16, U32, U64};
use object::pod::bytes_of;
use object::Endianness;

use pabi::elf::{ELFOSABI_AMDGPU_PAL, EM_AMDGPU};
use pabi::metadata::{
    CodeObjectMetadata, HardwareStageMetadata, MetadataVersion, PipelineMetadata, ShaderMetadata, AMDGPU_NOTE_NAME,
    NT_AMDGPU_METADATA,
};

const HEADER_SIZE: usize = 64;
const SECTION_HEADER_SIZE: usize = 64;

fn u16(endian: Endianness, v: u16) -> U16<Endianness> {
    U16::new(endian, v)
}
fn u32(endian: Endianness, v: u32) -> U32<Endianness> {
    U32::new(endian, v)
}
fn u64(endian: Endianness, v: u64) -> U64<Endianness> {
    U64::new(endian, v)
}

fn align_up(value: usize, align: usize) -> usize {
    (value + align - 1) & !(align - 1)
}

/// A symbol to place in a symbol table.
#[derive(Clone, Copy)]
pub struct TestSymbol<'a> {
    pub name: &'a [u8],
    pub shndx: u16,
    pub value: u64,
    pub size: u64,
}

pub fn func<'a>(name: &'a str, shndx: u16, value: u64, size: u64) -> TestSymbol<'a> {
    raw_func(name.as_bytes(), shndx, value, size)
}

/// A function symbol whose name is stored as given, valid UTF-8 or not.
pub fn raw_func<'a>(name: &'a [u8], shndx: u16, value: u64, size: u64) -> TestSymbol<'a> {
    TestSymbol { name, shndx, value, size }
}

struct SectionSpec {
    name: String,
    sh_type: u32,
    flags: u64,
    link: u32,
    info: u32,
    align: u64,
    entsize: u64,
    data: Vec<u8>,
}

/// Assembles an ELF64 image section by section.
///
/// Section 0 is the null section; `.shstrtab` is appended last by `build`.
pub struct ImageBuilder {
    endian: Endianness,
    sections: Vec<SectionSpec>,
}

impl ImageBuilder {
    /// A little-endian image.
    pub fn new() -> Self {
        Self::with_endian(Endianness::Little)
    }

    pub fn with_endian(endian: Endianness) -> Self {
        Self {
            endian,
            sections: Vec::new(),
        }
    }

    /// Adds a raw section and returns its index.
    pub fn section(&mut self, name: &str, sh_type: u32, flags: u64, data: Vec<u8>) -> u16 {
        self.sections.push(SectionSpec {
            name: name.to_string(),
            sh_type,
            flags,
            link: 0,
            info: 0,
            align: 8,
            entsize: 0,
            data,
        });
        self.sections.len() as u16
    }

    pub fn text(&mut self, code: &[u8]) -> u16 {
        self.section(
            ".text",
            object::elf::SHT_PROGBITS,
            (object::elf::SHF_ALLOC | object::elf::SHF_EXECINSTR) as u64,
            code.to_vec(),
        )
    }

    /// Adds a string table and a symbol table linked to it. Returns the symbol table index.
    pub fn symtab(&mut self, name: &str, symbols: &[TestSymbol<'_>]) -> u16 {
        let mut strings = vec![0u8];
        let mut entries = bytes_of(&null_symbol(self.endian)).to_vec();
        for symbol in symbols {
            let st_name = strings.len() as u32;
            strings.extend_from_slice(symbol.name);
            strings.push(0);
            entries.extend_from_slice(bytes_of(&sym(self.endian, st_name, symbol)));
        }
        let strtab = self.section(&format!("{name}.strtab"), object::elf::SHT_STRTAB, 0, strings);
        self.linked_symtab(name, strtab as u32, entries, symbols.len())
    }

    /// Adds a symbol table whose first real symbol has a name offset past the end of its string table.
    pub fn symtab_with_bad_name(&mut self, name: &str) -> u16 {
        let strtab = self.section(&format!("{name}.strtab"), object::elf::SHT_STRTAB, 0, b"\0ok\0".to_vec());
        let mut entries = bytes_of(&null_symbol(self.endian)).to_vec();
        entries.extend_from_slice(bytes_of(&sym(self.endian, 0x1000, &func("", 1, 0, 0))));
        self.linked_symtab(name, strtab as u32, entries, 1)
    }

    /// Adds a symbol table whose `sh_link` is `link`, without creating a string table.
    pub fn symtab_with_link(&mut self, name: &str, link: u32, symbols: &[TestSymbol<'_>]) -> u16 {
        let mut entries = bytes_of(&null_symbol(self.endian)).to_vec();
        for symbol in symbols {
            entries.extend_from_slice(bytes_of(&sym(self.endian, 1, symbol)));
        }
        self.linked_symtab(name, link, entries, symbols.len())
    }

    fn linked_symtab(&mut self, name: &str, link: u32, entries: Vec<u8>, count: usize) -> u16 {
        let index = self.section(name, object::elf::SHT_SYMTAB, 0, entries);
        let spec = self.sections.last_mut().unwrap();
        spec.link = link;
        spec.info = count as u32 + 1;
        spec.entsize = 24;
        index
    }

    /// Adds a note section holding `(name, type, desc)` notes.
    pub fn notes(&mut self, name: &str, sh_type: u32, notes: &[(&[u8], u32, &[u8])]) -> u16 {
        let endian = self.endian;
        let mut data = Vec::new();
        for (note_name, n_type, desc) in notes {
            data.extend_from_slice(bytes_of(&u32(endian, note_name.len() as u32 + 1)));
            data.extend_from_slice(bytes_of(&u32(endian, desc.len() as u32)));
            data.extend_from_slice(bytes_of(&u32(endian, *n_type)));
            data.extend_from_slice(note_name);
            data.push(0);
            data.resize(align_up(data.len(), 4), 0);
            data.extend_from_slice(desc);
            data.resize(align_up(data.len(), 4), 0);
        }
        let index = self.section(name, sh_type, 0, data);
        self.sections.last_mut().unwrap().align = 4;
        index
    }

    /// Adds a `.note` section with the metadata note encoding `metadata`.
    pub fn metadata(&mut self, metadata: &CodeObjectMetadata) -> u16 {
        let payload = rmp_serde::to_vec_named(metadata).unwrap();
        self.metadata_payload(&payload)
    }

    pub fn metadata_payload(&mut self, payload: &[u8]) -> u16 {
        self.notes(".note", object::elf::SHT_NOTE, &[(AMDGPU_NOTE_NAME, NT_AMDGPU_METADATA, payload)])
    }

    pub fn build(self) -> Vec<u8> {
        let endian = self.endian;
        let mut shstrtab = vec![0u8];
        let mut name_offsets = Vec::new();
        for spec in &self.sections {
            name_offsets.push(shstrtab.len() as u32);
            shstrtab.extend_from_slice(spec.name.as_bytes());
            shstrtab.push(0);
        }
        let shstrtab_name = shstrtab.len() as u32;
        shstrtab.extend_from_slice(b".shstrtab\0");

        let mut buffer = vec![0u8; HEADER_SIZE];
        let mut offsets = Vec::new();
        for spec in &self.sections {
            buffer.resize(align_up(buffer.len(), 8), 0);
            offsets.push(buffer.len() as u64);
            buffer.extend_from_slice(&spec.data);
        }
        let shstrtab_offset = buffer.len() as u64;
        buffer.extend_from_slice(&shstrtab);

        buffer.resize(align_up(buffer.len(), 8), 0);
        let shoff = buffer.len();
        let num_sections = self.sections.len() + 2;

        buffer.extend_from_slice(bytes_of(&section_header(endian, 0, object::elf::SHT_NULL, 0, 0, 0, 0)));
        for (i, spec) in self.sections.iter().enumerate() {
            let mut header = section_header(
                endian,
                name_offsets[i],
                spec.sh_type,
                spec.flags,
                offsets[i],
                spec.data.len() as u64,
                spec.align,
            );
            header.sh_link = u32(endian, spec.link);
            header.sh_info = u32(endian, spec.info);
            header.sh_entsize = u64(endian, spec.entsize);
            buffer.extend_from_slice(bytes_of(&header));
        }
        buffer.extend_from_slice(bytes_of(&section_header(
            endian,
            shstrtab_name,
            object::elf::SHT_STRTAB,
            0,
            shstrtab_offset,
            shstrtab.len() as u64,
            1,
        )));
        assert_eq!(buffer.len(), shoff + num_sections * SECTION_HEADER_SIZE);

        let file_header = object::elf::FileHeader64::<Endianness> {
            e_ident: object::elf::Ident {
                magic: object::elf::ELFMAG,
                class: object::elf::ELFCLASS64,
                data: match endian {
                    Endianness::Little => object::elf::ELFDATA2LSB,
                    Endianness::Big => object::elf::ELFDATA2MSB,
                },
                version: object::elf::EV_CURRENT,
                os_abi: ELFOSABI_AMDGPU_PAL,
                abi_version: 0,
                padding: [0; 7],
            },
            e_type: u16(endian, object::elf::ET_REL),
            e_machine: u16(endian, EM_AMDGPU),
            e_version: u32(endian, object::elf::EV_CURRENT as u32),
            e_entry: u64(endian, 0),
            e_phoff: u64(endian, 0),
            e_shoff: u64(endian, shoff as u64),
            e_flags: u32(endian, 0),
            e_ehsize: u16(endian, HEADER_SIZE as u16),
            e_phentsize: u16(endian, 56),
            e_phnum: u16(endian, 0),
            e_shentsize: u16(endian, SECTION_HEADER_SIZE as u16),
            e_shnum: u16(endian, num_sections as u16),
            e_shstrndx: u16(endian, num_sections as u16 - 1),
        };
        buffer[..HEADER_SIZE].copy_from_slice(bytes_of(&file_header));
        buffer
    }
}

fn section_header(
    endian: Endianness,
    name: u32,
    sh_type: u32,
    flags: u64,
    offset: u64,
    size: u64,
    align: u64,
) -> object::elf::SectionHeader64<Endianness> {
    object::elf::SectionHeader64::<Endianness> {
        sh_name: u32(endian, name),
        sh_type: u32(endian, sh_type),
        sh_flags: u64(endian, flags),
        sh_addr: u64(endian, 0),
        sh_offset: u64(endian, offset),
        sh_size: u64(endian, size),
        sh_link: u32(endian, 0),
        sh_info: u32(endian, 0),
        sh_addralign: u64(endian, align),
        sh_entsize: u64(endian, 0),
    }
}

fn null_symbol(endian: Endianness) -> object::elf::Sym64<Endianness> {
    object::elf::Sym64::<Endianness> {
        st_name: u32(endian, 0),
        st_info: 0,
        st_other: 0,
        st_shndx: u16(endian, 0),
        st_value: u64(endian, 0),
        st_size: u64(endian, 0),
    }
}

fn sym(endian: Endianness, st_name: u32, symbol: &TestSymbol<'_>) -> object::elf::Sym64<Endianness> {
    object::elf::Sym64::<Endianness> {
        st_name: u32(endian, st_name),
        st_info: (object::elf::STB_GLOBAL << 4) | object::elf::STT_FUNC,
        st_other: 0,
        st_shndx: u16(endian, symbol.shndx),
        st_value: u64(endian, symbol.value),
        st_size: u64(endian, symbol.size),
    }
}

/// A typical compute pipeline image: `.text`, one symbol table and a metadata note.
pub fn compute_pipeline_image() -> Vec<u8> {
    compute_pipeline_image_with_endian(Endianness::Little)
}

pub fn compute_pipeline_image_with_endian(endian: Endianness) -> Vec<u8> {
    let mut builder = ImageBuilder::with_endian(endian);
    let text = builder.text(&[0u8; 0x200]);
    builder.symtab(
        ".symtab",
        &[
            func("_amdgpu_cs_main", text, 0x0, 0x100),
            func("_amdgpu_cs_shdr_intrl_data", text, 0x100, 0x40),
            func("helper", text, 0x140, 0x20),
            func("_amdgpu_cs_disasm", text, 0x160, 0xa0),
        ],
    );
    builder.metadata(&sample_metadata());
    builder.build()
}

pub fn sample_metadata() -> CodeObjectMetadata {
    let cs = HardwareStageMetadata {
        entry_point: Some("_amdgpu_cs_main".to_string()),
        scratch_memory_size: Some(0),
        lds_size: Some(4096),
        vgpr_count: Some(24),
        sgpr_count: Some(16),
        vgpr_limit: Some(256),
        sgpr_limit: Some(104),
        threadgroup_dimensions: Some([64, 1, 1]),
        wavefront_size: Some(64),
        user_sgprs: Some(4),
        uses_uavs: Some(true),
    };
    let shader = ShaderMetadata {
        api_shader_hash: Some([0x0123_4567_89ab_cdef, 0xfedc_ba98_7654_3210]),
        hardware_mapping: vec![".cs".to_string()],
    };
    let pipeline = PipelineMetadata {
        name: "compute_blur".to_string(),
        pipeline_type: Some("Cs".to_string()),
        api: Some("Vulkan".to_string()),
        internal_pipeline_hash: Some([u64::MAX, 7]),
        shaders: [(".compute".to_string(), shader)].into_iter().collect(),
        hardware_stages: [(".cs".to_string(), cs)].into_iter().collect(),
        registers: [(0x2e07, 0x40), (0x2e12, 0x002c_0041), (0x2e13, 0x98)].into_iter().collect(),
        user_data_limit: Some(16),
        spill_threshold: Some(u32::MAX),
    };
    CodeObjectMetadata {
        version: MetadataVersion { major: 2, minor: 6 },
        pipelines: vec![pipeline],
    }
}
