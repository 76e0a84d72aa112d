//! Symbols command

use std::path::{Path, PathBuf};

use aarmerge_core::SymbolWriter;
use aarmerge_core::schema::{PackageName, SymbolTable};
use anyhow::{Context, Result};
use crossterm::style::Stylize;

/// Write one `R.java` for `package` from a library `R.txt`, taking values
/// from the project's `base` table. Nothing is compiled.
///
/// With `r_txt`, the rebased table is also written there in `R.txt` form.
pub fn symbols(
    symbols: &Path,
    base: &Path,
    package: &str,
    out: &Path,
    r_txt: Option<&Path>,
) -> Result<PathBuf> {
    let package = PackageName::validated(package)?;
    let table = SymbolTable::load(symbols)
        .with_context(|| format!("Failed to load {}", symbols.display()))?;
    let base_table =
        SymbolTable::load(base).with_context(|| format!("Failed to load {}", base.display()))?;

    let mut writer = SymbolWriter::new(out, package, &base_table);
    writer.add_symbols(&table);
    let path = writer
        .write()
        .with_context(|| format!("Failed to write {}", writer.source_path().display()))?;

    println!("{} {}", "Wrote".green().bold(), path.display());

    if let Some(r_txt) = r_txt {
        writer
            .write_text_symbols(r_txt)
            .with_context(|| format!("Failed to write {}", r_txt.display()))?;
        println!("{} {}", "Wrote".green().bold(), r_txt.display());
    }
    Ok(path)
}
