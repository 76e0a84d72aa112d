//! Parsing of `res/values*/*.xml` into individual value items.

use std::fs;
use std::path::{Path, PathBuf};

use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};

use super::MergeError;

/// One value resource (`<string name="x">`, `<style name="y">`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueItem {
    /// Values folder including qualifiers.
    pub folder: String,
    /// Resource type (`string`, `array`, `styleable`, ...).
    pub res_type: String,
    /// Resource name.
    pub name: String,
    /// The element as it appeared in the source, children included.
    pub xml: String,
    /// File the item was read from.
    pub source: PathBuf,
    /// Name of the resource set it came from.
    pub set: String,
}

#[derive(Debug, Default)]
pub(crate) struct ParsedValues {
    pub(crate) namespaces: Vec<(String, String)>,
    pub(crate) items: Vec<ValueItem>,
}

/// The resource type an element declares, or `None` if it is not a resource.
fn item_type(tag: &str, type_attr: Option<String>) -> Option<String> {
    match tag {
        "eat-comment" | "skip" => None,
        "item" => type_attr,
        "string-array" | "integer-array" => Some("array".to_string()),
        "declare-styleable" => Some("styleable".to_string()),
        other => Some(other.to_string()),
    }
}

struct Parser<'a> {
    path: &'a Path,
    folder: &'a str,
    set: &'a str,
}

impl Parser<'_> {
    fn xml(&self, source: quick_xml::Error) -> MergeError {
        MergeError::Xml {
            path: self.path.to_path_buf(),
            source,
        }
    }

    fn invalid(&self, reason: impl Into<String>) -> MergeError {
        MergeError::InvalidValues {
            path: self.path.to_path_buf(),
            reason: reason.into(),
        }
    }

    fn attribute(
        &self,
        element: &BytesStart<'_>,
        key: &str,
    ) -> Result<Option<String>, MergeError> {
        let Some(attr) = element
            .try_get_attribute(key)
            .map_err(|e| self.xml(e.into()))?
        else {
            return Ok(None);
        };
        let value = attr.unescape_value().map_err(|e| self.xml(e))?;
        Ok(Some(value.into_owned()))
    }

    fn document(&self, reader: &mut Reader<&[u8]>) -> Result<ParsedValues, MergeError> {
        let mut parsed = ParsedValues::default();
        let mut seen_root = false;

        loop {
            let event = reader.read_event().map_err(|e| self.xml(e))?;
            match event {
                Event::Start(ref root) | Event::Empty(ref root) => {
                    if seen_root {
                        return Err(self.invalid("more than one root element"));
                    }
                    seen_root = true;
                    self.check_root(root, &mut parsed)?;
                    if matches!(event, Event::Start(_)) {
                        self.items(reader, &mut parsed)?;
                    }
                }
                Event::Text(ref text) if !text.iter().all(u8::is_ascii_whitespace) => {
                    return Err(self.invalid("text outside the root element"));
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !seen_root {
            return Err(self.invalid("no <resources> element"));
        }
        Ok(parsed)
    }

    fn check_root(
        &self,
        root: &BytesStart<'_>,
        parsed: &mut ParsedValues,
    ) -> Result<(), MergeError> {
        if root.name().as_ref() != b"resources" {
            return Err(self.invalid(format!(
                "root element is <{}>, expected <resources>",
                String::from_utf8_lossy(root.name().as_ref())
            )));
        }
        for attr in root.attributes() {
            let attr = attr.map_err(|e| self.xml(e.into()))?;
            if attr.key.as_ref().starts_with(b"xmlns") {
                parsed.namespaces.push((
                    String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
                    String::from_utf8_lossy(&attr.value).into_owned(),
                ));
            }
        }
        Ok(())
    }

    /// Read children of `<resources>` up to and including its end tag.
    fn items(
        &self,
        reader: &mut Reader<&[u8]>,
        parsed: &mut ParsedValues,
    ) -> Result<(), MergeError> {
        loop {
            match reader.read_event().map_err(|e| self.xml(e))? {
                Event::Start(start) => {
                    let start = start.into_owned();
                    let element = self.capture(reader, start.clone())?;
                    self.push_item(&start, element, parsed)?;
                }
                Event::Empty(start) => {
                    let start = start.into_owned();
                    let element = vec![Event::Empty(start.clone())];
                    self.push_item(&start, element, parsed)?;
                }
                Event::End(_) => return Ok(()),
                Event::Eof => return Err(self.invalid("unterminated <resources> element")),
                _ => {}
            }
        }
    }

    /// Collect the events of one element, from its start tag to its end tag.
    fn capture(
        &self,
        reader: &mut Reader<&[u8]>,
        start: BytesStart<'static>,
    ) -> Result<Vec<Event<'static>>, MergeError> {
        let mut events = vec![Event::Start(start)];
        let mut depth = 1usize;
        while depth > 0 {
            let event = reader.read_event().map_err(|e| self.xml(e))?.into_owned();
            match event {
                Event::Start(_) => depth += 1,
                Event::End(_) => depth -= 1,
                Event::Eof => return Err(self.invalid("unterminated resource element")),
                _ => {}
            }
            events.push(event);
        }
        Ok(events)
    }

    fn push_item(
        &self,
        start: &BytesStart<'_>,
        events: Vec<Event<'static>>,
        parsed: &mut ParsedValues,
    ) -> Result<(), MergeError> {
        let tag = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let type_attr = self.attribute(start, "type")?;
        if tag == "item" && type_attr.is_none() {
            return Err(self.invalid("<item> without a type attribute"));
        }
        let Some(res_type) = item_type(&tag, type_attr) else {
            return Ok(());
        };
        let Some(name) = self.attribute(start, "name")? else {
            tracing::debug!(path = %self.path.display(), tag, "skipping unnamed element");
            return Ok(());
        };

        let mut writer = Writer::new(Vec::new());
        for event in events {
            writer
                .write_event(event)
                .map_err(|e| MergeError::io(self.path, e))?;
        }
        let xml = String::from_utf8_lossy(&writer.into_inner()).into_owned();

        parsed.items.push(ValueItem {
            folder: self.folder.to_string(),
            res_type,
            name,
            xml,
            source: self.path.to_path_buf(),
            set: self.set.to_string(),
        });
        Ok(())
    }
}

/// Parse one values file.
pub(crate) fn parse(path: &Path, folder: &str, set: &str) -> Result<ParsedValues, MergeError> {
    let bytes = fs::read(path).map_err(|e| MergeError::io(path, e))?;
    let mut reader = Reader::from_reader(bytes.as_slice());
    Parser { path, folder, set }.document(&mut reader)
}
