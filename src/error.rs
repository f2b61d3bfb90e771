//! Error types.
//!
//! `AbiError` covers everything that can go wrong while building a
//! [`PipelineAbiReader`](crate::reader::PipelineAbiReader); `MetadataError`
//! covers locating and decoding the metadata note afterwards.

use std::collections::TryReserveError;

use thiserror::Error;

/// Errors returned while parsing and indexing a pipeline image.
#[derive(Error, Debug)]
pub enum AbiError {
    #[error("failed to parse ELF image: {0}")]
    Elf(#[from] object::read::Error),
    #[error("missing required {0} section")]
    MissingSection(&'static str),
    #[error("no symbol table section found")]
    NoSymbolTable,
    #[error("symbol {index} in section {section} has an invalid name")]
    MalformedSymbol { section: usize, index: usize },
    #[error("symbol table section {section} links to invalid string table {link}")]
    InvalidStringTable { section: usize, link: usize },
    #[error("failed to grow generic symbol index: {0}")]
    Allocation(#[from] TryReserveError),
}

/// Errors returned while locating or decoding pipeline metadata.
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("no metadata note found")]
    Missing,
    #[error("metadata payload is truncated")]
    Truncated,
    #[error("metadata does not match schema: {0}")]
    Schema(String),
    #[error("metadata has no version marker")]
    MissingVersion,
    #[error("metadata version {major}.{minor} is not supported")]
    UnsupportedVersion { major: u32, minor: u32 },
}
