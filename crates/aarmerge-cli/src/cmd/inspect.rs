//! Inspect command

use std::path::Path;

use aarmerge_core::ArchiveView;
use aarmerge_core::paths::unpack_tempdir;
use aarmerge_core::schema::ContentKind;
use anyhow::{Context, Result};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use crossterm::style::Stylize;

/// Print an archive's package and classified contents.
///
/// With `dry_run`, only the package name is read and printed.
pub fn inspect(archive: &Path, dry_run: bool) -> Result<()> {
    if dry_run {
        let package = ArchiveView::peek_package_name(archive)?;
        println!("{package}");
        return Ok(());
    }

    let scratch = unpack_tempdir().context("Failed to create scratch directory")?;
    let view = ArchiveView::unpack(archive, scratch.path())?;

    println!();
    println!(
        "  {} {}",
        view.package_name().as_str().white().bold(),
        archive.display().to_string().dark_grey()
    );
    println!();
    println!("{}", contents_table(&view));

    let classified = ContentKind::ALL
        .iter()
        .map(|kind| view.files_of(*kind).len())
        .sum::<usize>();
    println!();
    println!(
        "  {classified} classified file(s), res/ {}",
        if view.res_directory().is_some() {
            "present".green()
        } else {
            "absent".dark_grey()
        }
    );
    Ok(())
}

fn contents_table(view: &ArchiveView) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_NO_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![Cell::new("Kind"), Cell::new("Path")]);

    for kind in ContentKind::ALL {
        for file in view.files_of(kind) {
            let relative = file.strip_prefix(view.directory()).unwrap_or(file);
            table.add_row(vec![
                Cell::new(kind.label()).fg(Color::Cyan),
                Cell::new(relative.display()),
            ]);
        }
    }
    table
}
