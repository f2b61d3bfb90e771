//! Entry point for the pabi inspector.
//!
//! This file handles high-level application flow:
//! 1. Parse command-line arguments using `clap`.
//! 2. Map the input image into memory.
//! 3. Build the pipeline reader (parses and indexes symbols).
//! 4. Print pipeline symbols, requested generic symbols and, optionally, metadata.
//!
//! Error handling is done via `anyhow`.

use anyhow::{Context, Result};
use clap::Parser;
use memmap2::Mmap;
use std::fs::File;
use tracing_subscriber::EnvFilter;

use pabi::config::Config;
use pabi::{ElfSymbol, PipelineAbiReader, Validation};

fn main() -> Result<()> {
    let config = Config::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let path = &config.input;
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mmap = unsafe { Mmap::map(&file)? };

    let validation = if config.strict { Validation::Strict } else { Validation::Tolerant };
    let reader = PipelineAbiReader::with_validation(&mmap, validation)
        .with_context(|| format!("failed to read pipeline image {}", path.display()))?;

    let elf = reader.elf_reader();
    println!(
        "{}: machine {} os_abi {}{} flags 0x{:x}, {} sections",
        path.display(),
        elf.machine(),
        elf.os_abi(),
        if elf.is_pal_image() { " (PAL)" } else { "" },
        elf.flags(),
        elf.num_sections()
    );

    println!("Pipeline symbols:");
    for (role, entry) in reader.pipeline_symbols() {
        match reader.resolve(entry) {
            Some(symbol) => print_symbol(&symbol),
            None => println!("  {:<32} {:?} (unresolvable)", role.name(), entry),
        }
    }

    let mut missing = 0;
    if !config.symbols.is_empty() {
        println!("Symbols:");
    }
    for name in &config.symbols {
        match reader.generic_symbol(name) {
            Some(symbol) => print_symbol(&symbol),
            None => {
                missing += 1;
                println!("  {:<32} not found", name);
            }
        }
    }

    if config.metadata {
        let metadata = reader.code_object_metadata().context("failed to decode pipeline metadata")?;
        if config.json {
            println!("{}", serde_json::to_string_pretty(&metadata)?);
        } else {
            println!("{:#?}", metadata);
        }
    }

    if missing > 0 {
        anyhow::bail!("{} requested symbol(s) not found", missing);
    }
    Ok(())
}

fn print_symbol(symbol: &ElfSymbol<'_>) {
    println!(
        "  {:<32} value 0x{:08x} size {:>6} shndx {:>3} (symtab {}, index {})",
        symbol.name,
        symbol.value,
        symbol.size,
        symbol.section_index,
        symbol.entry.symbol_table.0,
        symbol.entry.index.0
    );
}
