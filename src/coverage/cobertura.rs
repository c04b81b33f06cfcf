//! Cobertura XML format parser

use std::num::IntErrorKind;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

/// A report that is not well-formed XML
#[derive(Debug, Error)]
pub enum CoverageParseError {
    #[error("Error parsing Cobertura XML at byte {position}: {source}")]
    Xml {
        position: usize,
        #[source]
        source: quick_xml::Error,
    },
    #[error("Error parsing Cobertura XML at byte {position}: {message}")]
    Malformed { position: usize, message: String },
}

/// Hit count for one line of one file, as reported by a single document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRecord {
    pub line_number: u64,
    pub hits: u64,
}

/// Parse Cobertura XML content into `(filename, line)` records.
///
/// Lines are read from each `<class>`'s own `<lines>` list. Classes without a
/// filename are skipped, lines without a usable number are skipped, and a
/// missing or non-numeric hit count is read as zero. Only a document that is
/// not well-formed XML is an error. Document-level rates are ignored.
pub fn parse_cobertura_string(
    content: &str,
) -> Result<Vec<(String, LineRecord)>, CoverageParseError> {
    let mut reader = Reader::from_str(content);
    reader.trim_text(true);

    let mut parser = ReportParser::default();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                parser.open(e, false, reader.buffer_position())?;
            }
            Ok(Event::Empty(ref e)) => {
                parser.open(e, true, reader.buffer_position())?;
            }
            Ok(Event::End(ref e)) => {
                parser.close(e.name().as_ref());
            }
            Ok(Event::Text(_)) | Ok(Event::CData(_)) if parser.path.is_empty() => {
                return Err(malformed(
                    reader.buffer_position(),
                    "text outside the root element",
                ));
            }
            Ok(Event::Text(ref e)) => {
                e.unescape().map_err(|source| CoverageParseError::Xml {
                    position: reader.buffer_position(),
                    source,
                })?;
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(CoverageParseError::Xml {
                    position: reader.buffer_position(),
                    source: e,
                })
            }
            _ => {}
        }
        buf.clear();
    }

    parser.finish(reader.buffer_position())
}

/// Element-tracking state for one document
#[derive(Default)]
struct ReportParser {
    records: Vec<(String, LineRecord)>,
    /// Open element names, outermost first
    path: Vec<Vec<u8>>,
    /// One entry per open `<class>`: its filename, if it has one
    classes: Vec<Option<String>>,
    seen_root: bool,
}

impl ReportParser {
    fn open(
        &mut self,
        element: &BytesStart,
        is_empty: bool,
        position: usize,
    ) -> Result<(), CoverageParseError> {
        if self.path.is_empty() {
            if self.seen_root {
                return Err(malformed(position, "multiple root elements"));
            }
            self.seen_root = true;
        }

        if !is_xml_name(element.name().as_ref()) {
            return Err(malformed(
                position,
                &format!(
                    "invalid element name <{}>",
                    String::from_utf8_lossy(element.name().as_ref())
                ),
            ));
        }

        let attributes = decode_attributes(element, position)?;

        match element.name().as_ref() {
            b"class" if !is_empty => {
                let filename = attribute(&attributes, b"filename")
                    .filter(|name| !name.is_empty())
                    .map(str::to_string);
                self.classes.push(filename);
            }
            b"line" if in_class_lines(&self.path) => {
                if let Some(Some(filename)) = self.classes.last() {
                    if let Some(record) = line_record(&attributes) {
                        self.records.push((filename.clone(), record));
                    }
                }
            }
            _ => {}
        }

        if !is_empty {
            self.path.push(element.name().as_ref().to_vec());
        }

        Ok(())
    }

    fn close(&mut self, name: &[u8]) {
        if name == b"class" {
            self.classes.pop();
        }
        self.path.pop();
    }

    fn finish(self, position: usize) -> Result<Vec<(String, LineRecord)>, CoverageParseError> {
        if let Some(open) = self.path.last() {
            return Err(malformed(
                position,
                &format!(
                    "unexpected end of document inside <{}>",
                    String::from_utf8_lossy(open)
                ),
            ));
        }

        if !self.seen_root {
            return Err(malformed(position, "no root element"));
        }

        Ok(self.records)
    }
}

fn malformed(position: usize, message: &str) -> CoverageParseError {
    CoverageParseError::Malformed {
        position,
        message: message.to_string(),
    }
}

/// True when the enclosing elements are `... <class> <lines>`.
fn in_class_lines(path: &[Vec<u8>]) -> bool {
    matches!(
        path,
        [.., class, lines] if class.as_slice() == b"class" && lines.as_slice() == b"lines"
    )
}

/// Decode and unescape every attribute of an element.
///
/// All attributes are decoded, not only the ones the parser reads, so that
/// duplicated attributes, bad names, a raw `<` or bad entities fail the
/// whole document.
fn decode_attributes(
    element: &BytesStart,
    position: usize,
) -> Result<Vec<(Vec<u8>, String)>, CoverageParseError> {
    let xml_error = |source: quick_xml::Error| CoverageParseError::Xml { position, source };
    let mut attributes = Vec::new();

    for attr in element.attributes() {
        let attr = attr.map_err(|e| xml_error(e.into()))?;
        let key = attr.key.as_ref();

        if !is_xml_name(key) {
            return Err(malformed(
                position,
                &format!("invalid attribute name '{}'", String::from_utf8_lossy(key)),
            ));
        }

        // `&lt;` is fine, a literal `<` is not
        if attr.value.contains(&b'<') {
            return Err(malformed(
                position,
                &format!(
                    "'<' in value of attribute '{}'",
                    String::from_utf8_lossy(key)
                ),
            ));
        }

        let value = attr.unescape_value().map_err(xml_error)?.into_owned();
        attributes.push((key.to_vec(), value));
    }

    Ok(attributes)
}

/// XML `Name` production, with every non-ASCII character accepted.
fn is_xml_name(name: &[u8]) -> bool {
    let Ok(name) = std::str::from_utf8(name) else {
        return false;
    };
    let mut chars = name.chars();

    let starts_well = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || matches!(c, '_' | ':') || !c.is_ascii());

    starts_well
        && chars.all(|c| {
            c.is_ascii_alphanumeric() || matches!(c, '_' | ':' | '-' | '.') || !c.is_ascii()
        })
}

fn attribute<'a>(attributes: &'a [(Vec<u8>, String)], name: &[u8]) -> Option<&'a str> {
    attributes
        .iter()
        .find(|(key, _)| key.as_slice() == name)
        .map(|(_, value)| value.as_str())
}

fn line_record(attributes: &[(Vec<u8>, String)]) -> Option<LineRecord> {
    let line_number = attribute(attributes, b"number")
        .and_then(|value| value.trim().parse::<u64>().ok())
        .filter(|number| *number > 0)?;

    let hits = attribute(attributes, b"hits")
        .and_then(parse_hits)
        .unwrap_or(0);

    Some(LineRecord { line_number, hits })
}

/// Hit counts too large for `u64` are still hits, so they saturate.
fn parse_hits(value: &str) -> Option<u64> {
    match value.trim().parse::<u64>() {
        Ok(hits) => Some(hits),
        Err(e) if *e.kind() == IntErrorKind::PosOverflow => Some(u64::MAX),
        Err(_) => None,
    }
}
