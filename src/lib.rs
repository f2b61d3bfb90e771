//! Pipeline ABI Reader Library.
//!
//! This library indexes ELF images that carry compiled GPU pipelines.
//! It is organized into several modules:
//! - `elf`: Read-only view over the ELF image.
//! - `symbol`: Symbol locators, pipeline roles and the role classifier.
//! - `reader`: The `PipelineAbiReader` and its symbol indexes.
//! - `metadata`: Typed pipeline metadata and its MessagePack decoder.
//! - `error`: Error types.
//! - `config`: CLI configuration.

pub mod config;
pub mod elf;
pub mod error;
pub mod metadata;
pub mod reader;
pub mod symbol;

pub use error::{AbiError, MetadataError};
pub use reader::{PipelineAbiReader, Validation};
pub use symbol::{ElfSymbol, HardwareStage, PipelineSymbolType, SymbolEntry};
