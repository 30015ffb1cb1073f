//! Paragraph text extraction for word-processor packages.
//!
//! A `.docx` upload is a zip archive whose main part, `word/document.xml`,
//! holds paragraphs (`w:p`) made of runs (`w:r`) made of text elements
//! (`w:t`). This module returns one line per paragraph: text elements inside
//! a run are concatenated as-is, separate runs are joined with one space.
//!
//! The transform is lossy. Tabs, table cell boundaries, indentation and
//! styling do not survive; only the paragraph text that the report parser
//! needs comes out.

use std::io::Read;

use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::{debug, warn};

/// Zip entry holding the document body.
pub const DOCUMENT_PART: &str = "word/document.xml";

/// Maximum decompressed bytes to read from the document part (zip-bomb protection).
const MAX_XML_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

/// Extraction error. Malformed XML is not an error: whatever was read before
/// the fault is returned.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("upload is not a zip container: {0}")]
    NotAnArchive(String),
    #[error("word/document.xml not found in package")]
    MissingPart,
    #[error("zip entry {name} exceeds size limit ({limit} bytes)")]
    EntryTooLarge { name: String, limit: u64 },
    #[error("reading zip entry {name}: {reason}")]
    Io { name: String, reason: String },
}

/// Extracts the paragraph lines of a word-processor package, in document order.
pub fn extract_lines(bytes: &[u8]) -> Result<Vec<String>, ExtractError> {
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes))
        .map_err(|e| ExtractError::NotAnArchive(e.to_string()))?;
    let xml = read_zip_entry_bounded(&mut archive, DOCUMENT_PART, MAX_XML_ENTRY_BYTES)?;
    let lines = paragraph_lines(&xml);
    debug!(bytes = bytes.len(), lines = lines.len(), "extracted package text");
    Ok(lines)
}

fn read_zip_entry_bounded(
    archive: &mut zip::ZipArchive<std::io::Cursor<&[u8]>>,
    name: &str,
    max_bytes: u64,
) -> Result<Vec<u8>, ExtractError> {
    let entry = match archive.by_name(name) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => return Err(ExtractError::MissingPart),
        Err(e) => {
            return Err(ExtractError::Io {
                name: name.to_string(),
                reason: e.to_string(),
            })
        }
    };
    let mut out = Vec::new();
    entry
        .take(max_bytes)
        .read_to_end(&mut out)
        .map_err(|e| ExtractError::Io {
            name: name.to_string(),
            reason: e.to_string(),
        })?;
    if out.len() as u64 >= max_bytes {
        return Err(ExtractError::EntryTooLarge {
            name: name.to_string(),
            limit: max_bytes,
        });
    }
    Ok(out)
}

/// Paragraph being assembled. `runs` holds one string per run that had at
/// least one text element.
#[derive(Default)]
struct Paragraph {
    runs: Vec<String>,
}

impl Paragraph {
    fn into_line(self) -> String {
        self.runs.join(" ")
    }
}

/// Walk the document XML and rebuild one line per outermost paragraph.
///
/// Nested paragraphs (text boxes) are folded into the paragraph that
/// contains them. Text outside a run, or outside a paragraph, is ignored.
fn paragraph_lines(xml: &[u8]) -> Vec<String> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut lines = Vec::new();

    let mut paragraph: Option<Paragraph> = None;
    let mut paragraph_depth = 0usize;
    let mut run: Option<String> = None;
    let mut run_depth = 0usize;
    let mut text_depth = 0usize;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"p" => {
                    paragraph_depth += 1;
                    if paragraph_depth == 1 {
                        paragraph = Some(Paragraph::default());
                    }
                }
                b"r" if paragraph.is_some() => {
                    run_depth += 1;
                    if run_depth == 1 {
                        run = None;
                    }
                }
                b"t" if run_depth > 0 => {
                    text_depth += 1;
                    // A text element marks the run as present even when empty.
                    run.get_or_insert_with(String::new);
                }
                _ => {}
            },
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"p" if paragraph_depth > 0 => {
                    paragraph_depth -= 1;
                    if paragraph_depth == 0 {
                        if let Some(p) = paragraph.take() {
                            lines.push(p.into_line());
                        }
                    }
                }
                b"r" if run_depth > 0 => {
                    run_depth -= 1;
                    if run_depth == 0 {
                        if let (Some(text), Some(p)) = (run.take(), paragraph.as_mut()) {
                            p.runs.push(text);
                        }
                    }
                }
                b"t" if text_depth > 0 => text_depth -= 1,
                _ => {}
            },
            Ok(Event::Empty(e)) => {
                // <w:p/> is a blank paragraph
                if e.local_name().as_ref() == b"p" && paragraph_depth == 0 {
                    lines.push(String::new());
                }
            }
            Ok(Event::Text(te)) if text_depth > 0 => {
                if let Some(text) = run.as_mut() {
                    match te.unescape() {
                        Ok(s) => text.push_str(&s),
                        Err(_) => text.push_str(&String::from_utf8_lossy(&te)),
                    }
                }
            }
            Ok(Event::CData(cd)) if text_depth > 0 => {
                if let Some(text) = run.as_mut() {
                    text.push_str(&String::from_utf8_lossy(&cd));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                warn!(
                    position = reader.buffer_position(),
                    error = %e,
                    "malformed document xml, keeping text read so far"
                );
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn body(paragraphs: &str) -> String {
        format!(
            "<?xml version=\"1.0\"?><w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\"><w:body>{}</w:body></w:document>",
            paragraphs
        )
    }

    fn package(entry: &str, xml: &str) -> Vec<u8> {
        let mut buf = Vec::new();
        {
            let mut zip = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
            zip.start_file(entry, zip::write::SimpleFileOptions::default())
                .unwrap();
            zip.write_all(xml.as_bytes()).unwrap();
            zip.finish().unwrap();
        }
        buf
    }

    #[test]
    fn runs_are_joined_with_single_space() {
        let xml = body(
            "<w:p><w:r><w:t>Tribe 0987,</w:t></w:r><w:r><w:rPr><w:b/></w:rPr><w:t>Current</w:t><w:t xml:space=\"preserve\"> Hex</w:t></w:r></w:p>",
        );
        let lines = paragraph_lines(xml.as_bytes());
        assert_eq!(lines, vec!["Tribe 0987, Current Hex".to_string()]);
    }

    #[test]
    fn paragraph_without_text_is_blank_line() {
        let xml = body(
            "<w:p><w:r><w:t>one</w:t></w:r></w:p><w:p><w:pPr/></w:p><w:p/><w:p><w:r><w:t>two</w:t></w:r></w:p>",
        );
        let lines = paragraph_lines(xml.as_bytes());
        assert_eq!(lines, vec!["one", "", "", "two"]);
    }

    #[test]
    fn tabs_and_tables_are_flattened() {
        let xml = body(
            "<w:tbl><w:tr><w:tc><w:p><w:r><w:t>A</w:t><w:tab/><w:t>B</w:t></w:r></w:p></w:tc></w:tr></w:tbl>",
        );
        assert_eq!(paragraph_lines(xml.as_bytes()), vec!["AB"]);
    }

    #[test]
    fn entities_are_unescaped() {
        let xml = body("<w:p><w:r><w:t>Scout 1:Scout N-PR &amp; more</w:t></w:r></w:p>");
        assert_eq!(
            paragraph_lines(xml.as_bytes()),
            vec!["Scout 1:Scout N-PR & more"]
        );
    }

    #[test]
    fn malformed_xml_keeps_earlier_paragraphs() {
        let xml = "<w:body><w:p><w:r><w:t>kept</w:t></w:r></w:p><w:p><w:r><w:t>lost</w:r></w:body>";
        assert_eq!(paragraph_lines(xml.as_bytes()), vec!["kept"]);
    }

    #[test]
    fn extract_from_package() {
        let bytes = package(
            DOCUMENT_PART,
            &body("<w:p><w:r><w:t>Current Turn 900-03</w:t></w:r></w:p>"),
        );
        let lines = extract_lines(&bytes).unwrap();
        assert_eq!(lines, vec!["Current Turn 900-03"]);
    }

    #[test]
    fn invalid_zip_returns_error() {
        let err = extract_lines(b"not a zip").unwrap_err();
        assert!(matches!(err, ExtractError::NotAnArchive(_)));
    }

    #[test]
    fn missing_document_part_returns_error() {
        let bytes = package("word/styles.xml", "<w:styles/>");
        let err = extract_lines(&bytes).unwrap_err();
        assert!(matches!(err, ExtractError::MissingPart));
    }
}
