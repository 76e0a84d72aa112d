//! Resource-ID symbol tables (`R.txt`).
//!
//! A symbol table maps `(resource type, resource name)` to a numeric ID, or
//! to a list of IDs for `styleable` arrays. Two line forms are accepted:
//!
//! ```text
//! int string greeting 0x7f030005
//! int[] styleable Toolbar { 0x7f010000, 0x7f010001 }
//! string greeting 0x7f030005
//! ```
//!
//! The last (three-token) form is implicitly `int`.
//!
//! Tables compiled independently by each library disagree on numbering, so
//! the generated classes always take their values from one authoritative
//! table (see [`SymbolTable::rebase`]).

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use crate::types::PackageName;

/// Errors raised while loading a symbol table.
#[derive(thiserror::Error, Debug)]
pub enum SymbolError {
    /// The file could not be read.
    #[error("Failed to read symbol table {}", path.display())]
    Io {
        /// Path of the table.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A line could not be parsed.
    #[error("Malformed symbol table at line {line}: {reason}")]
    Parse {
        /// 1-based line number.
        line: usize,
        /// What was wrong with it.
        reason: String,
    },
}

/// Java type of a generated constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JavaType {
    /// `int`
    Int,
    /// `int[]`
    IntArray,
}

impl JavaType {
    /// The Java spelling of the type.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::IntArray => "int[]",
        }
    }
}

impl std::fmt::Display for JavaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value of one symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SymbolValue {
    /// A single resource ID (or styleable index).
    Int(u32),
    /// A `styleable` attribute ID array.
    IntArray(Vec<u32>),
}

impl SymbolValue {
    /// The Java type this value is emitted as.
    pub fn java_type(&self) -> JavaType {
        match self {
            Self::Int(_) => JavaType::Int,
            Self::IntArray(_) => JavaType::IntArray,
        }
    }
}

impl std::fmt::Display for SymbolValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(id) => write!(f, "0x{id:08x}"),
            Self::IntArray(ids) if ids.is_empty() => f.write_str("{ }"),
            Self::IntArray(ids) => {
                f.write_str("{ ")?;
                for (i, id) in ids.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "0x{id:08x}")?;
                }
                f.write_str(" }")
            }
        }
    }
}

/// One `(type, name) -> value` row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SymbolEntry {
    /// Resource type (`string`, `attr`, `styleable`, ...).
    pub res_type: String,
    /// Resource name.
    pub name: String,
    /// Numeric value(s).
    pub value: SymbolValue,
}

/// A resource symbol table, ordered by `(type, name)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolTable {
    entries: BTreeMap<(String, String), SymbolEntry>,
}

impl SymbolTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a table from `R.txt` text. Blank lines are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`SymbolError::Parse`] for the first malformed line.
    pub fn parse(text: &str) -> Result<Self, SymbolError> {
        let mut table = Self::new();
        for (idx, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let entry = parse_line(line).map_err(|reason| SymbolError::Parse {
                line: idx + 1,
                reason,
            })?;
            table.insert(entry);
        }
        Ok(table)
    }

    /// Read and parse a table from disk.
    ///
    /// # Errors
    ///
    /// Returns [`SymbolError::Io`] if the file cannot be read and
    /// [`SymbolError::Parse`] if it is malformed.
    pub fn load(path: &Path) -> Result<Self, SymbolError> {
        let text = std::fs::read_to_string(path).map_err(|source| SymbolError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Insert (or replace) an entry.
    pub fn insert(&mut self, entry: SymbolEntry) {
        self.entries
            .insert((entry.res_type.clone(), entry.name.clone()), entry);
    }

    /// Look up one symbol.
    pub fn get(&self, res_type: &str, name: &str) -> Option<&SymbolEntry> {
        self.entries.get(&(res_type.to_string(), name.to_string()))
    }

    /// Number of symbols.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries in `(type, name)` order.
    pub fn iter(&self) -> impl Iterator<Item = &SymbolEntry> {
        self.entries.values()
    }

    /// Union `other` into this table. Entries of `other` replace same-keyed
    /// entries already present.
    pub fn merge(&mut self, other: &SymbolTable) {
        for entry in other.iter() {
            self.insert(entry.clone());
        }
    }

    /// Rebase this table onto `base`.
    ///
    /// Every symbol also present in `base` takes `base`'s value; symbols
    /// unknown to `base` are dropped, since the final binary has no ID for
    /// them.
    pub fn rebase(&self, base: &SymbolTable) -> SymbolTable {
        let entries = self
            .entries
            .keys()
            .filter_map(|key| base.entries.get(key).map(|e| (key.clone(), e.clone())))
            .collect();
        SymbolTable { entries }
    }

    /// Serialize back to the canonical four-token `R.txt` form.
    pub fn to_r_txt(&self) -> String {
        let mut out = String::new();
        for entry in self.iter() {
            let _ = writeln!(
                out,
                "{} {} {} {}",
                entry.value.java_type(),
                entry.res_type,
                entry.name,
                entry.value
            );
        }
        out
    }

    /// Render the table as a Java `R` class for `package`.
    pub fn to_java_source(&self, package: &PackageName) -> String {
        let mut out = String::new();
        out.push_str("/* AUTO-GENERATED FILE.  DO NOT MODIFY.\n");
        out.push_str(" *\n");
        out.push_str(" * This class was generated by aarmerge from the resource symbol\n");
        out.push_str(" * tables of the merged library archives. It should not be\n");
        out.push_str(" * modified by hand.\n");
        out.push_str(" */\n\n");
        let _ = writeln!(out, "package {package};\n");
        out.push_str("public final class R {\n");

        let mut current: Option<&str> = None;
        for entry in self.iter() {
            if current != Some(entry.res_type.as_str()) {
                if current.is_some() {
                    out.push_str("    }\n");
                }
                let _ = writeln!(out, "    public static final class {} {{", entry.res_type);
                current = Some(entry.res_type.as_str());
            }
            let _ = writeln!(
                out,
                "        public static final {} {} = {};",
                entry.value.java_type(),
                entry.name,
                entry.value
            );
        }
        if current.is_some() {
            out.push_str("    }\n");
        }

        out.push_str("}\n");
        out
    }
}

fn parse_line(line: &str) -> Result<SymbolEntry, String> {
    let tokens: Vec<&str> = line.split_whitespace().collect();

    let (declared, rest) = match tokens.first() {
        Some(&"int") => (Some(JavaType::Int), &tokens[1..]),
        Some(&"int[]") => (Some(JavaType::IntArray), &tokens[1..]),
        _ => (None, &tokens[..]),
    };

    let [res_type, name, value @ ..] = rest else {
        return Err(format!("expected 'type name id', got '{line}'"));
    };
    if value.is_empty() {
        return Err(format!("missing id for {res_type}/{name}"));
    }

    let value = if value[0].starts_with('{') {
        SymbolValue::IntArray(parse_array(&value.join(" "))?)
    } else if let [single] = value {
        SymbolValue::Int(parse_id(single)?)
    } else {
        return Err(format!("unexpected trailing tokens for {res_type}/{name}"));
    };

    if let Some(declared) = declared.filter(|d| *d != value.java_type()) {
        return Err(format!(
            "{res_type}/{name} declared as {declared} but has a {} value",
            value.java_type()
        ));
    }

    Ok(SymbolEntry {
        res_type: (*res_type).to_string(),
        name: (*name).to_string(),
        value,
    })
}

fn parse_array(raw: &str) -> Result<Vec<u32>, String> {
    let inner = raw
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .ok_or_else(|| format!("unterminated id array '{raw}'"))?;

    inner
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(parse_id)
        .collect()
}

fn parse_id(raw: &str) -> Result<u32, String> {
    let parsed = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => raw.parse::<u32>(),
    };
    parsed.map_err(|e| format!("invalid id '{raw}': {e}"))
}
