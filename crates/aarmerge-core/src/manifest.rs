//! Package name extraction from `AndroidManifest.xml`.
//!
//! Library archives ship their manifest as plain-text XML. Only the
//! un-namespaced `package` attribute of the root `<manifest>` element is
//! read; `android:package` or any other namespaced variant does not count.

use aarmerge_schema::{PackageName, PackageNameError};
use quick_xml::NsReader;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;

/// Why a manifest did not yield a package name.
#[derive(thiserror::Error, Debug)]
pub enum ManifestError {
    /// The archive has no manifest entry.
    #[error("Archive has no AndroidManifest.xml")]
    Missing,

    /// The manifest could not be parsed.
    #[error("Manifest is not valid XML")]
    Xml(#[from] quick_xml::Error),

    /// The document has no root element at all.
    #[error("Manifest has no root element")]
    Empty,

    /// The document ends before its elements are closed.
    #[error("Manifest ends inside an open element")]
    Unterminated,

    /// The root element is something other than `<manifest>`.
    #[error("Manifest root element is <{0}>, expected <manifest>")]
    UnexpectedRoot(String),

    /// The root element carries no `package` attribute.
    #[error("Manifest does not declare a package attribute")]
    MissingPackage,

    /// The `package` attribute is not a valid package name.
    #[error("Manifest package is invalid")]
    InvalidPackage(#[from] PackageNameError),
}

/// Extract the package name from raw manifest bytes.
///
/// The whole document is read so that a truncated or ill-formed manifest is
/// rejected even when the root element itself parses.
///
/// # Errors
///
/// Returns a [`ManifestError`] if the XML is malformed, the root element is
/// not `<manifest>`, or the `package` attribute is missing or invalid.
pub fn package_name(xml: &[u8]) -> Result<PackageName, ManifestError> {
    let mut reader = NsReader::from_reader(xml);
    let mut buf = Vec::new();
    let mut package = None;
    let mut depth = 0usize;

    loop {
        let event = reader.read_event_into(&mut buf)?;
        match &event {
            Event::Start(element) | Event::Empty(element) => {
                if package.is_none() {
                    package = Some(root_package(&reader, element)?);
                }
                if matches!(event, Event::Start(_)) {
                    depth += 1;
                }
            }
            Event::End(_) => depth = depth.saturating_sub(1),
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if depth > 0 {
        return Err(ManifestError::Unterminated);
    }
    package.ok_or(ManifestError::Empty)
}

fn root_package<R>(
    reader: &NsReader<R>,
    root: &BytesStart<'_>,
) -> Result<PackageName, ManifestError> {
    let (_, local) = reader.resolve_element(root.name());
    if local.as_ref() != b"manifest" {
        return Err(ManifestError::UnexpectedRoot(
            String::from_utf8_lossy(local.as_ref()).into_owned(),
        ));
    }

    for attr in root.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let (ns, local) = reader.resolve_attribute(attr.key);
        if matches!(ns, ResolveResult::Unbound) && local.as_ref() == b"package" {
            let value = attr.decode_and_unescape_value(reader.decoder())?;
            return Ok(PackageName::validated(&value)?);
        }
    }
    Err(ManifestError::MissingPackage)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_from_library_manifest() {
        let xml = br#"<?xml version="1.0" encoding="utf-8"?>
<manifest xmlns:android="http://schemas.android.com/apk/res/android"
    package="com.example.widget"
    android:versionCode="1">
    <uses-sdk android:minSdkVersion="14" />
</manifest>"#;
        assert_eq!(package_name(xml).unwrap(), "com.example.widget");
    }

    #[test]
    fn test_self_closing_manifest() {
        let xml = br#"<manifest package="com.example.tiny"/>"#;
        assert_eq!(package_name(xml).unwrap(), "com.example.tiny");
    }

    #[test]
    fn test_namespaced_package_is_ignored() {
        let xml = br#"<manifest xmlns:android="http://schemas.android.com/apk/res/android"
            android:package="com.example.wrong"/>"#;
        assert!(matches!(
            package_name(xml),
            Err(ManifestError::MissingPackage)
        ));
    }

    #[test]
    fn test_wrong_root() {
        let xml = br#"<application package="com.example"/>"#;
        assert!(matches!(
            package_name(xml),
            Err(ManifestError::UnexpectedRoot(root)) if root == "application"
        ));
    }

    #[test]
    fn test_empty_and_invalid() {
        assert!(matches!(package_name(b""), Err(ManifestError::Empty)));
        assert!(matches!(
            package_name(br#"<manifest package="com..x"/>"#),
            Err(ManifestError::InvalidPackage(_))
        ));
        assert!(package_name(b"<manifest package=\"com.x\"></application>").is_err());
        assert!(matches!(
            package_name(b"<manifest package=\"com.x\"><application>"),
            Err(ManifestError::Unterminated)
        ));
        assert!(package_name(b"<manifest package=com.x/>").is_err());
    }
}
