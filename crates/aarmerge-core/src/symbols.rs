//! `R.java` generation for one package.

use std::fs;
use std::path::{Path, PathBuf};

use aarmerge_schema::{PackageName, SymbolTable};
use tracing::debug;

/// Accumulates the symbol tables of every archive sharing a package and
/// writes one `R.java` whose values come from the project's final table.
#[derive(Debug)]
pub struct SymbolWriter<'a> {
    out_dir: PathBuf,
    package: PackageName,
    base: &'a SymbolTable,
    symbols: SymbolTable,
}

impl<'a> SymbolWriter<'a> {
    /// Writer for `package` under the source root `out_dir`, taking values
    /// from `base`.
    pub fn new(out_dir: impl Into<PathBuf>, package: PackageName, base: &'a SymbolTable) -> Self {
        Self {
            out_dir: out_dir.into(),
            package,
            base,
            symbols: SymbolTable::new(),
        }
    }

    /// Add a library's symbol table to the set of symbols to emit.
    pub fn add_symbols(&mut self, table: &SymbolTable) {
        self.symbols.merge(table);
    }

    /// Where [`write`](Self::write) puts the source file.
    pub fn source_path(&self) -> PathBuf {
        self.out_dir.join(self.package.to_source_dir()).join("R.java")
    }

    /// The accumulated symbols with values from the project table.
    pub fn rebased(&self) -> SymbolTable {
        let rebased = self.symbols.rebase(self.base);
        let dropped = self.symbols.len() - rebased.len();
        if dropped > 0 {
            debug!(
                package = %self.package,
                dropped,
                "symbols missing from the project table were skipped"
            );
        }
        rebased
    }

    /// Render the source without touching the filesystem.
    pub fn render(&self) -> String {
        self.rebased().to_java_source(&self.package)
    }

    /// Write the rebased symbols as an `R.txt` to `path`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be written.
    pub fn write_text_symbols(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.rebased().to_r_txt())
    }

    /// Write `R.java`, replacing any previous one. Returns its path.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the package directory or file cannot be
    /// written.
    pub fn write(&self) -> std::io::Result<PathBuf> {
        let path = self.source_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, self.render())?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_values_come_from_base() {
        let base = SymbolTable::parse(
            "int string greeting 0x7f030005\nint string unused 0x7f030006\n",
        )
        .unwrap();
        let lib = SymbolTable::parse("int string greeting 0x7f010001\n").unwrap();

        let mut writer = SymbolWriter::new("gen", PackageName::new("com.example.lib"), &base);
        writer.add_symbols(&lib);
        let source = writer.render();

        assert!(source.contains("public static final int greeting = 0x7f030005;"));
        assert!(!source.contains("0x7f010001"));
        assert!(!source.contains("unused"));
    }

    #[test]
    fn test_unknown_symbols_are_dropped() {
        let base = SymbolTable::parse("int id root 0x7f050001\n").unwrap();
        let lib = SymbolTable::parse("int id root 0x7f010001\nint id gone 0x7f010002\n").unwrap();

        let mut writer = SymbolWriter::new("gen", PackageName::new("com.example.lib"), &base);
        writer.add_symbols(&lib);
        let source = writer.render();

        assert!(source.contains("root"));
        assert!(!source.contains("gone"));
    }

    #[test]
    fn test_text_symbols_are_rebased() {
        let dir = tempdir().unwrap();
        let base = SymbolTable::parse("int string a 0x7f030001\n").unwrap();
        let mut writer = SymbolWriter::new(dir.path(), PackageName::new("com.example.lib"), &base);
        writer.add_symbols(&SymbolTable::parse("int string a 0x1\nint string b 0x2\n").unwrap());

        let path = dir.path().join("out/R.txt");
        writer.write_text_symbols(&path).unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "int string a 0x7f030001\n");
    }

    #[test]
    fn test_write_replaces_existing_file() {
        let dir = tempdir().unwrap();
        let base = SymbolTable::parse("int string a 0x7f030001\nint string b 0x7f030002\n").unwrap();
        let package = PackageName::new("com.example.lib");

        let mut first = SymbolWriter::new(dir.path(), package.clone(), &base);
        first.add_symbols(&SymbolTable::parse("int string a 0x1\n").unwrap());
        let path = first.write().unwrap();
        assert_eq!(path, dir.path().join("com/example/lib/R.java"));

        let mut second = SymbolWriter::new(dir.path(), package, &base);
        second.add_symbols(&SymbolTable::parse("int string b 0x2\n").unwrap());
        second.write().unwrap();

        let source = fs::read_to_string(&path).unwrap();
        assert!(source.contains(" b = 0x7f030002;"));
        assert!(!source.contains(" a = "));
    }
}
