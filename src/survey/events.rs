//! Element-start event stream
//!
//! Wraps a quick-xml reader into a finite, non-restartable iterator of element
//! starts. Parser failures, unclosed elements, documents without exactly one
//! root element and stray text outside the root all surface as
//! `SynthError::ParseError`, after which the iterator is exhausted.

use crate::error::SynthError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::io::BufRead;

/// An opening (or self-closing) element with its unescaped attributes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementStart {
    pub name: String,
    pub attributes: Vec<(String, String)>,
}

impl ElementStart {
    fn from_bytes_start(start: &BytesStart<'_>) -> Result<Self, SynthError> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();

        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| {
                SynthError::ParseError(format!("malformed attribute on <{}>: {}", name, e))
            })?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|e| {
                    SynthError::ParseError(format!(
                        "bad value for {}=\"...\" on <{}>: {}",
                        key, name, e
                    ))
                })?
                .into_owned();
            attributes.push((key, value));
        }

        Ok(Self { name, attributes })
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Lazy sequence of element-start events over an XML byte stream
pub struct ElementStarts<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    depth: usize,
    seen_root: bool,
    finished: bool,
}

/// Start streaming element-start events from `source`
pub fn element_starts<R: BufRead>(source: R) -> ElementStarts<R> {
    let mut reader = Reader::from_reader(source);
    reader.trim_text(true);
    reader.check_end_names(true);

    ElementStarts {
        reader,
        buf: Vec::with_capacity(8 * 1024),
        depth: 0,
        seen_root: false,
        finished: false,
    }
}

/// Records the root on the first depth-0 element; any later one is a second root.
fn enter_element(
    start: &BytesStart<'_>,
    depth: usize,
    seen_root: &mut bool,
    position: usize,
) -> Result<(), SynthError> {
    if depth == 0 {
        if *seen_root {
            return Err(SynthError::ParseError(format!(
                "second root element <{}> at byte {}",
                String::from_utf8_lossy(start.name().as_ref()),
                position
            )));
        }
        *seen_root = true;
    }
    Ok(())
}

enum Step {
    Emit(Result<ElementStart, SynthError>),
    Skip,
    Finish(Option<SynthError>),
}

impl<R: BufRead> Iterator for ElementStarts<R> {
    type Item = Result<ElementStart, SynthError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            self.buf.clear();

            let step = match self.reader.read_event_into(&mut self.buf) {
                Ok(Event::Start(start)) => match enter_element(
                    &start,
                    self.depth,
                    &mut self.seen_root,
                    self.reader.buffer_position(),
                ) {
                    Ok(()) => {
                        self.depth += 1;
                        Step::Emit(ElementStart::from_bytes_start(&start))
                    }
                    Err(e) => Step::Finish(Some(e)),
                },
                Ok(Event::Empty(start)) => match enter_element(
                    &start,
                    self.depth,
                    &mut self.seen_root,
                    self.reader.buffer_position(),
                ) {
                    Ok(()) => Step::Emit(ElementStart::from_bytes_start(&start)),
                    Err(e) => Step::Finish(Some(e)),
                },
                Ok(Event::Text(text)) if self.depth == 0 => {
                    if text.iter().all(u8::is_ascii_whitespace) {
                        Step::Skip
                    } else {
                        Step::Finish(Some(SynthError::ParseError(format!(
                            "text outside the root element at byte {}",
                            self.reader.buffer_position()
                        ))))
                    }
                }
                Ok(Event::CData(_)) if self.depth == 0 => {
                    Step::Finish(Some(SynthError::ParseError(format!(
                        "CDATA outside the root element at byte {}",
                        self.reader.buffer_position()
                    ))))
                }
                Ok(Event::End(_)) => {
                    self.depth = self.depth.saturating_sub(1);
                    Step::Skip
                }
                Ok(Event::Eof) => {
                    if self.depth > 0 {
                        Step::Finish(Some(SynthError::ParseError(format!(
                            "unexpected end of document with {} unclosed element(s)",
                            self.depth
                        ))))
                    } else if !self.seen_root {
                        Step::Finish(Some(SynthError::ParseError(
                            "document has no root element".to_string(),
                        )))
                    } else {
                        Step::Finish(None)
                    }
                }
                Ok(_) => Step::Skip,
                Err(e) => Step::Finish(Some(SynthError::ParseError(format!(
                    "at byte {}: {}",
                    self.reader.buffer_position(),
                    e
                )))),
            };

            match step {
                Step::Emit(Ok(element)) => return Some(Ok(element)),
                Step::Emit(Err(e)) | Step::Finish(Some(e)) => {
                    self.finished = true;
                    return Some(Err(e));
                }
                Step::Finish(None) => {
                    self.finished = true;
                    return None;
                }
                Step::Skip => continue,
            }
        }
    }
}
