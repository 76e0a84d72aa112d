//! Fixtures shared by the engine integration tests.
#![allow(dead_code)]

use std::cell::RefCell;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use aarmerge_core::{BatchCompiler, CompileRequest};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Write a library archive containing a manifest for `package` plus `entries`.
pub fn write_aar(path: &Path, package: &str, entries: &[(&str, &str)]) -> PathBuf {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let mut zip = ZipWriter::new(File::create(path).unwrap());
    let options = SimpleFileOptions::default();

    zip.start_file("AndroidManifest.xml", options).unwrap();
    write!(
        zip,
        r#"<?xml version="1.0" encoding="utf-8"?>
<manifest xmlns:android="http://schemas.android.com/apk/res/android" package="{package}">
    <uses-sdk android:minSdkVersion="9"/>
</manifest>"#
    )
    .unwrap();

    for (name, data) in entries {
        zip.start_file(*name, options).unwrap();
        zip.write_all(data.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
    path.to_path_buf()
}

/// Write `contents` to `root/rel`, creating parents.
pub fn write_file(root: &Path, rel: &str, contents: &str) -> PathBuf {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, contents).unwrap();
    path
}

/// A compiler that records every request and answers with a fixed outcome.
pub struct FakeCompiler {
    /// Outcome reported for every call.
    pub succeed: bool,
    /// Requests seen so far.
    pub calls: RefCell<Vec<CompileRequest>>,
}

impl FakeCompiler {
    /// A compiler that always reports `succeed`.
    pub fn new(succeed: bool) -> Self {
        Self {
            succeed,
            calls: RefCell::new(Vec::new()),
        }
    }
}

impl BatchCompiler for FakeCompiler {
    fn compile(&self, request: &CompileRequest) -> anyhow::Result<bool> {
        self.calls.borrow_mut().push(request.clone());
        Ok(self.succeed)
    }
}
