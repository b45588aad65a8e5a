//! Ordering seed file: the XML default layout used on first boot, for reset, and for backups.
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <apps>
//!   <app package="org.example.clock" appid="org.example.clock" ordering="0"/>
//! </apps>
//! ```

use std::{io::Cursor, path::Path};

use log::warn;
use quick_xml::{
    events::{BytesDecl, BytesEnd, BytesStart, Event},
    Reader, Writer,
};
use serde::{Deserialize, Serialize};

const ROOT_TAG: &str = "apps";
const ENTRY_TAG: &str = "app";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// One `{package_id, app_id, ordering}` triple from the seed file.
pub struct SeedEntry {
    /// Owning package identifier.
    pub package_id: String,
    /// Application identifier.
    pub app_id: String,
    /// Default grid ordering.
    pub ordering: u32,
}

impl SeedEntry {
    /// Creates an entry.
    pub fn new(package_id: impl Into<String>, app_id: impl Into<String>, ordering: u32) -> Self {
        Self {
            package_id: package_id.into(),
            app_id: app_id.into(),
            ordering,
        }
    }
}

/// Parses seed XML, degrading to an empty list (with a warning) on any parse failure.
pub fn parse_seed_xml(xml: &str) -> Vec<SeedEntry> {
    match try_parse_seed_xml(xml) {
        Ok(entries) => entries,
        Err(err) => {
            warn!("ordering seed parse failed, using empty layout: {err}");
            Vec::new()
        }
    }
}

/// Parses seed XML into entries sorted by ordering.
///
/// # Errors
///
/// Returns an error for malformed XML or an `app` element missing a required attribute.
pub fn try_parse_seed_xml(xml: &str) -> Result<Vec<SeedEntry>, String> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut entries = Vec::new();
    let mut in_root = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"apps" => in_root = true,
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"app" if in_root => {
                    let entry = parse_entry(e)
                        .map_err(|err| format!("at byte {}: {err}", reader.buffer_position()))?;
                    entries.push(entry);
                }
                _ => {}
            },
            Ok(Event::End(ref e)) if e.name().as_ref() == b"apps" => in_root = false,
            Ok(Event::Eof) => break,
            Err(err) => {
                return Err(format!(
                    "XML parse error at byte {}: {err}",
                    reader.buffer_position()
                ));
            }
            _ => {}
        }
        buf.clear();
    }

    entries.sort_by_key(|entry| entry.ordering);
    Ok(entries)
}

fn parse_entry(e: &BytesStart<'_>) -> Result<SeedEntry, String> {
    let mut package_id = None;
    let mut app_id = None;
    let mut ordering = None;

    for attr in e.attributes() {
        let attr = attr.map_err(|err| format!("attribute error: {err}"))?;
        let value = attr
            .unescape_value()
            .map_err(|err| format!("attribute value error: {err}"))?
            .into_owned();
        match attr.key.as_ref() {
            b"package" => package_id = Some(value),
            b"appid" => app_id = Some(value),
            b"ordering" => {
                ordering = Some(
                    value
                        .trim()
                        .parse::<u32>()
                        .map_err(|_| format!("invalid ordering `{value}`"))?,
                );
            }
            _ => {}
        }
    }

    match (package_id, app_id, ordering) {
        (Some(package_id), Some(app_id), Some(ordering)) => Ok(SeedEntry {
            package_id,
            app_id,
            ordering,
        }),
        _ => Err("app entry missing package, appid, or ordering".to_string()),
    }
}

/// Serializes entries as seed XML (the backup path).
///
/// # Errors
///
/// Returns an error when the XML writer fails.
pub fn write_seed_xml(entries: &[SeedEntry]) -> Result<String, String> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(|e| e.to_string())?;
    writer
        .write_event(Event::Start(BytesStart::new(ROOT_TAG)))
        .map_err(|e| e.to_string())?;
    for entry in entries {
        let ordering = entry.ordering.to_string();
        let mut element = BytesStart::new(ENTRY_TAG);
        element.push_attribute(("package", entry.package_id.as_str()));
        element.push_attribute(("appid", entry.app_id.as_str()));
        element.push_attribute(("ordering", ordering.as_str()));
        writer
            .write_event(Event::Empty(element))
            .map_err(|e| e.to_string())?;
    }
    writer
        .write_event(Event::End(BytesEnd::new(ROOT_TAG)))
        .map_err(|e| e.to_string())?;

    String::from_utf8(writer.into_inner().into_inner()).map_err(|e| e.to_string())
}

/// Reads and parses a seed file. A missing or unreadable file degrades to an empty list.
pub fn load_seed_file(path: &Path) -> Vec<SeedEntry> {
    match std::fs::read_to_string(path) {
        Ok(xml) => parse_seed_xml(&xml),
        Err(err) => {
            warn!("ordering seed `{}` unreadable: {err}", path.display());
            Vec::new()
        }
    }
}

/// Writes entries to a seed file.
///
/// # Errors
///
/// Returns an error when serialization or the file write fails.
pub fn save_seed_file(path: &Path, entries: &[SeedEntry]) -> Result<(), String> {
    let xml = write_seed_xml(entries)?;
    std::fs::write(path, xml).map_err(|e| e.to_string())
}
