//! Viewer session descriptors.
//!
//! A session descriptor is an XML document owned by the viewer. Only three
//! things in it matter here: the `genome` attribute of the root `Session`
//! element, `path` attributes (resources, the session itself) and `id`
//! attributes of `Track` elements, which hold file paths for file-backed
//! tracks. Everything else is copied through untouched.

use std::io::Cursor;

use log::debug;
use quick_xml::events::{
    BytesDecl,
    BytesEnd,
    BytesStart,
    Event,
};
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;

use super::catalog::normalize_separators;
use crate::error::{
    Result,
    StoreError,
};

const SESSION_TAG: &str = "Session";
const TRACK_TAG: &str = "Track";
const GENOME_ATTR: &str = "genome";
const PATH_ATTR: &str = "path";
const ID_ATTR: &str = "id";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub genome: Option<String>,
    /// Path-valued attributes, in document order.
    pub paths:  Vec<String>,
}

/// Path rewriting rules applied to a session descriptor on import.
#[derive(Debug, Clone, Default)]
pub struct RerootRules {
    /// Home directory of the exporting installation.
    pub old_home: String,
    /// Home directory of this installation.
    pub new_home: String,
    /// Prefix replacements for paths outside the old home.
    pub external: Vec<(String, String)>,
    /// Genome id replacing the descriptor's genome, if any.
    pub genome:   Option<String>,
}

fn with_trailing_slash(dir: &str) -> String {
    let dir = normalize_separators(dir);
    if dir.ends_with('/') { dir } else { format!("{dir}/") }
}

impl RerootRules {
    /// Rewritten form of `value`, or `None` when no rule applies.
    ///
    /// Paths under the old home move to the new home. Other paths take the
    /// replacement of the longest matching external prefix, with the rest of
    /// the path appended.
    pub fn map_path(
        &self,
        value: &str,
    ) -> Option<String> {
        let normalized = normalize_separators(value);
        if !self.old_home.is_empty() {
            let old_home = with_trailing_slash(&self.old_home);
            if let Some(rest) = normalized.strip_prefix(&old_home) {
                return Some(format!("{}{}", with_trailing_slash(&self.new_home), rest));
            }
        }
        self.external
            .iter()
            .filter(|(from, _)| !from.is_empty() && normalized.starts_with(&normalize_separators(from)))
            .max_by_key(|(from, _)| from.len())
            .map(|(from, to)| {
                format!("{}{}", normalize_separators(to), &normalized[normalize_separators(from).len()..])
            })
    }

    /// Whether `value` lies under the old home directory.
    pub fn is_under_old_home(
        &self,
        value: &str,
    ) -> bool {
        !self.old_home.is_empty()
            && normalize_separators(value).starts_with(&with_trailing_slash(&self.old_home))
    }
}

fn looks_like_path(value: &str) -> bool {
    value.contains('/') || value.contains('\\')
}

fn is_path_attr(
    element: &str,
    attr: &str,
) -> bool {
    attr == PATH_ATTR || (element == TRACK_TAG && attr == ID_ATTR)
}

fn element_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.name().as_ref()).into_owned()
}

fn attributes(e: &BytesStart) -> Result<Vec<(String, String)>> {
    e.attributes()
        .map(|attr| {
            let attr = attr.map_err(|err| StoreError::session(err.to_string()))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|err| StoreError::session(err.to_string()))?
                .into_owned();
            Ok((key, value))
        })
        .collect()
}

/// Reads the genome id and path attributes of a descriptor.
pub fn summarize(xml: &str) -> Result<SessionSummary> {
    let mut reader = Reader::from_str(xml);
    let mut summary = SessionSummary::default();
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) => {
                let element = element_name(&e);
                for (key, value) in attributes(&e)? {
                    if element == SESSION_TAG && key == GENOME_ATTR {
                        summary.genome = Some(value);
                    }
                    else if is_path_attr(&element, &key) && looks_like_path(&value) {
                        summary.paths.push(value);
                    }
                }
            },
            Event::Eof => break,
            _ => {},
        }
    }
    Ok(summary)
}

fn rewrite_element(
    e: &BytesStart,
    rules: &RerootRules,
) -> Result<BytesStart<'static>> {
    let element = element_name(e);
    let mut out = BytesStart::new(element.clone());
    for (key, value) in attributes(e)? {
        let new_value = if element == SESSION_TAG && key == GENOME_ATTR {
            rules.genome.clone().unwrap_or(value)
        }
        else if is_path_attr(&element, &key) {
            match rules.map_path(&value) {
                Some(mapped) => {
                    debug!("Session path {value} -> {mapped}");
                    mapped
                },
                None => value,
            }
        }
        else {
            value
        };
        out.push_attribute((key.as_str(), new_value.as_str()));
    }
    Ok(out)
}

/// Applies `rules` to every path and genome attribute of `xml`.
pub fn reroot(
    xml: &str,
    rules: &RerootRules,
) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    loop {
        match reader.read_event()? {
            Event::Start(e) => writer.write_event(Event::Start(rewrite_element(&e, rules)?))?,
            Event::Empty(e) => writer.write_event(Event::Empty(rewrite_element(&e, rules)?))?,
            Event::Eof => break,
            other => writer.write_event(other)?,
        }
    }
    String::from_utf8(writer.into_inner().into_inner())
        .map_err(|e| StoreError::session(e.to_string()))
}

/// Renders a minimal descriptor: a `Session` root with one `Track` per
/// `(path, name)` pair.
pub fn new_descriptor(
    genome: Option<&str>,
    session_path: &str,
    tracks: &[(String, String)],
) -> Result<String> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 4);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("no"))))?;

    let mut root = BytesStart::new(SESSION_TAG);
    if let Some(genome) = genome {
        root.push_attribute((GENOME_ATTR, genome));
    }
    root.push_attribute((PATH_ATTR, normalize_separators(session_path).as_str()));
    root.push_attribute(("version", "8"));
    writer.write_event(Event::Start(root))?;

    writer.write_event(Event::Start(BytesStart::new("Panel").with_attributes([("name", "DataPanel")])))?;
    for (path, name) in tracks {
        let path = normalize_separators(path);
        let track = BytesStart::new(TRACK_TAG)
            .with_attributes([(ID_ATTR, path.as_str()), ("name", name.as_str())]);
        writer.write_event(Event::Empty(track))?;
    }
    writer.write_event(Event::End(BytesEnd::new("Panel")))?;
    writer.write_event(Event::End(BytesEnd::new(SESSION_TAG)))?;

    String::from_utf8(writer.into_inner().into_inner())
        .map_err(|e| StoreError::session(e.to_string()))
}

fn is_track_for(
    e: &BytesStart,
    path: &str,
) -> Result<bool> {
    if element_name(e) != TRACK_TAG {
        return Ok(false);
    }
    let path = normalize_separators(path);
    Ok(attributes(e)?
        .iter()
        .any(|(key, value)| key == ID_ATTR && normalize_separators(value) == path))
}

fn track_element(
    path: &str,
    name: &str,
) -> BytesStart<'static> {
    let path = normalize_separators(path);
    BytesStart::new(TRACK_TAG).with_attributes([(ID_ATTR, path.as_str()), ("name", name)])
}

/// Appends a file-backed `Track` to the first `Panel` of `xml`. A descriptor
/// without panels gets a new `DataPanel` holding the track.
pub fn add_track(
    xml: &str,
    path: &str,
    name: &str,
) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    let mut added = false;
    loop {
        match reader.read_event()? {
            Event::End(e) if !added && e.name().as_ref() == b"Panel" => {
                writer.write_event(Event::Empty(track_element(path, name)))?;
                writer.write_event(Event::End(e))?;
                added = true;
            },
            Event::End(e) if !added && e.name().as_ref() == SESSION_TAG.as_bytes() => {
                let panel = BytesStart::new("Panel").with_attributes([("name", "DataPanel")]);
                writer.write_event(Event::Start(panel))?;
                writer.write_event(Event::Empty(track_element(path, name)))?;
                writer.write_event(Event::End(BytesEnd::new("Panel")))?;
                writer.write_event(Event::End(e))?;
                added = true;
            },
            Event::Eof => break,
            other => writer.write_event(other)?,
        }
    }
    if !added {
        return Err(StoreError::session(format!(
            "no {SESSION_TAG} element to add track {name} to"
        )));
    }
    String::from_utf8(writer.into_inner().into_inner())
        .map_err(|e| StoreError::session(e.to_string()))
}

/// Drops every `Track` whose id is `path`, including any children.
pub fn remove_track(
    xml: &str,
    path: &str,
) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    let mut skip_depth = 0usize;
    loop {
        let event = reader.read_event()?;
        if skip_depth > 0 {
            match event {
                Event::Start(_) => skip_depth += 1,
                Event::End(_) => skip_depth -= 1,
                Event::Eof => break,
                _ => {},
            }
            continue;
        }
        match event {
            Event::Empty(e) if is_track_for(&e, path)? => {},
            Event::Start(e) if is_track_for(&e, path)? => skip_depth = 1,
            Event::Eof => break,
            other => writer.write_event(other)?,
        }
    }
    String::from_utf8(writer.into_inner().into_inner())
        .map_err(|e| StoreError::session(e.to_string()))
}
