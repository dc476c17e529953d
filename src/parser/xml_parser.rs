use super::flatten::{flatten_element, XmlElement};
use crate::config::ResolvedConfig;
use crate::constants::{ALT_KEY_SUFFIX, GROUP_ID_ATTR, GROUP_ID_KEY_SUFFIX};
use crate::errors::{AppError, AppResult};
use crate::models::{FlatRecord, MissingIdPolicy};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::debug;

/// What the event loop decided to do with one XML event, with all borrowed
/// event data copied out so the read buffer can be reused.
enum Step {
    /// A record tag opened; its subtree still has to be consumed.
    Subtree(XmlElement),
    /// A self-closing record tag, complete as-is.
    Leaf(XmlElement),
    /// A grouping tag with its optional identifier.
    Group(Option<String>),
    Ignore,
    Eof,
}

/// Lazy, finite, non-restartable stream of flattened records.
///
/// Walks the XML input event-by-event. A grouping tag carrying an `id`
/// attribute resets the working record to the identifier field; each record
/// tag's subtree is materialized, flattened, merged into the working record
/// (collisions land under `_alt` keys) and emitted as one row. Only the
/// subtree of the record currently being flattened is ever held in memory.
///
/// Malformed XML ends the stream with a `ParseError`; nothing can be pulled
/// after that.
pub struct RecordStream<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    /// Grouping identifier plus fields accumulated from earlier records in
    /// the same group. Emissions are snapshot copies of this map.
    context: FlatRecord,
    group_tag: String,
    record_tag: String,
    group_id_key: String,
    missing_id: MissingIdPolicy,
    /// Set while inside an id-less group under the skip-group policy.
    suppressed: bool,
    finished: bool,
}

impl RecordStream<BufReader<File>> {
    /// Opens an XML file as a record stream.
    pub fn from_path(path: &Path, config: &ResolvedConfig) -> AppResult<Self> {
        let file = File::open(path)
            .map_err(|e| AppError::ReadError(format!("Failed to open XML file {path:?}: {e}")))?;
        Ok(Self::from_reader(BufReader::new(file), config))
    }
}

impl<R: BufRead> RecordStream<R> {
    /// Wraps an already-open XML source.
    pub fn from_reader(source: R, config: &ResolvedConfig) -> Self {
        let mut reader = Reader::from_reader(source);
        reader.config_mut().trim_text(true);

        Self {
            reader,
            buf: Vec::with_capacity(8192),
            context: FlatRecord::new(),
            group_id_key: format!("{}{GROUP_ID_KEY_SUFFIX}", config.group_tag),
            group_tag: config.group_tag.clone(),
            record_tag: config.record_tag.clone(),
            missing_id: MissingIdPolicy::from(config.missing_group_id.as_str()),
            suppressed: false,
            finished: false,
        }
    }

    /// Folds a flattened record subtree into the working record. Keys already
    /// present keep their first-seen value; the new value moves to `key_alt`.
    /// Returns the emitted snapshot.
    fn merge_into_context(&mut self, fields: BTreeMap<String, String>) -> FlatRecord {
        for (key, value) in fields {
            if self.context.contains_key(&key) {
                self.context.insert(format!("{key}{ALT_KEY_SUFFIX}"), value);
            } else {
                self.context.insert(key, value);
            }
        }
        self.context.clone()
    }

    fn begin_group(&mut self, id: Option<String>) {
        match id {
            Some(id) => {
                debug!(group_id = %id, "Entering grouping element");
                self.context = FlatRecord::from([(self.group_id_key.clone(), id)]);
                self.suppressed = false;
            }
            None => match self.missing_id {
                MissingIdPolicy::CarryForward => {
                    debug!("Grouping element without id, carrying previous context forward");
                }
                MissingIdPolicy::SkipGroup => {
                    debug!("Grouping element without id, suppressing its records");
                    self.suppressed = true;
                }
            },
        }
    }
}

impl<R: BufRead> Iterator for RecordStream<R> {
    type Item = AppResult<FlatRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            self.buf.clear();
            // Classification reads individual fields only: the event borrows
            // the read buffer, so `self` as a whole is off limits here.
            let step = match self.reader.read_event_into(&mut self.buf) {
                Ok(Event::Start(e)) => {
                    let tag = local_name_of(&e);
                    if tag == self.record_tag {
                        Step::Subtree(element_from_start(&e))
                    } else if tag == self.group_tag {
                        Step::Group(attribute_value(&e, GROUP_ID_ATTR))
                    } else {
                        Step::Ignore
                    }
                }
                Ok(Event::Empty(e)) => {
                    let tag = local_name_of(&e);
                    if tag == self.record_tag {
                        Step::Leaf(element_from_start(&e))
                    } else if tag == self.group_tag {
                        Step::Group(attribute_value(&e, GROUP_ID_ATTR))
                    } else {
                        Step::Ignore
                    }
                }
                Ok(Event::Eof) => Step::Eof,
                Ok(_) => Step::Ignore,
                Err(e) => {
                    self.finished = true;
                    return Some(Err(AppError::from(e)));
                }
            };

            match step {
                Step::Subtree(root) => {
                    let element = match read_subtree(&mut self.reader, &mut self.buf, root) {
                        Ok(element) => element,
                        Err(e) => {
                            self.finished = true;
                            return Some(Err(e));
                        }
                    };
                    if self.suppressed {
                        continue;
                    }
                    let flat = flatten_element(&element, "");
                    return Some(Ok(self.merge_into_context(flat)));
                }
                Step::Leaf(element) => {
                    if self.suppressed {
                        continue;
                    }
                    let flat = flatten_element(&element, "");
                    return Some(Ok(self.merge_into_context(flat)));
                }
                Step::Group(id) => self.begin_group(id),
                Step::Ignore => {}
                Step::Eof => {
                    self.finished = true;
                    return None;
                }
            }
        }
    }
}

/// Consumes events up to the matching end tag of `root`, building the subtree.
fn read_subtree<R: BufRead>(
    reader: &mut Reader<R>,
    buf: &mut Vec<u8>,
    root: XmlElement,
) -> AppResult<XmlElement> {
    let mut stack = vec![root];

    loop {
        buf.clear();
        match reader.read_event_into(buf)? {
            Event::Start(e) => stack.push(element_from_start(&e)),
            Event::Empty(e) => {
                let child = element_from_start(&e);
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(child);
                }
            }
            Event::Text(e) => {
                let text = e.decode().map_err(|err| {
                    AppError::ParseError(format!("Failed to decode XML text: {err}"))
                })?;
                if let Some(top) = stack.last_mut() {
                    top.push_text(&text);
                }
            }
            Event::CData(e) => {
                let text = String::from_utf8_lossy(&e.into_inner()).into_owned();
                if let Some(top) = stack.last_mut() {
                    top.push_text(&text);
                }
            }
            Event::End(_) => {
                if let Some(done) = stack.pop() {
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(done),
                        None => return Ok(done),
                    }
                }
            }
            Event::Eof => {
                return Err(AppError::ParseError(
                    "Unexpected end of document inside record element".to_string(),
                ))
            }
            _ => {}
        }
    }
}

/// Copies a start tag into an owned element: namespace-stripped tag name and
/// attribute names, attribute values as-is.
fn element_from_start(e: &BytesStart) -> XmlElement {
    let mut element = XmlElement::new(local_name_of(e));
    for attr in e.attributes().filter_map(|a| a.ok()) {
        let name = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = String::from_utf8_lossy(&attr.value).into_owned();
        element.attributes.push((name, value));
    }
    element
}

fn local_name_of(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.name().local_name().as_ref()).into_owned()
}

fn attribute_value(e: &BytesStart, name: &str) -> Option<String> {
    e.attributes()
        .filter_map(|a| a.ok())
        .find(|a| a.key.local_name().as_ref() == name.as_bytes())
        .map(|a| String::from_utf8_lossy(&a.value).into_owned())
}
