use std::io::{Cursor, Read};

use quick_xml::Reader;
use quick_xml::events::Event;

use super::ExtractionError;

const DOCUMENT_PART: &str = "word/document.xml";

/// Join the text of every paragraph with a newline, in document order.
pub(super) fn extract(bytes: &[u8]) -> Result<String, ExtractionError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .map_err(|error| ExtractionError::Docx(format!("not a Word container: {error}")))?;
    let mut xml = String::new();
    archive
        .by_name(DOCUMENT_PART)
        .map_err(|error| ExtractionError::Docx(format!("missing {DOCUMENT_PART}: {error}")))?
        .read_to_string(&mut xml)
        .map_err(|error| ExtractionError::Docx(format!("unreadable {DOCUMENT_PART}: {error}")))?;

    let paragraphs = read_paragraphs(&xml)?;
    tracing::debug!(paragraphs = paragraphs.len(), "Extracted DOCX paragraphs");
    Ok(paragraphs.join("\n"))
}

fn read_paragraphs(xml: &str) -> Result<Vec<String>, ExtractionError> {
    let mut reader = Reader::from_str(xml);
    let mut paragraphs = Vec::new();
    let mut current: Option<String> = None;
    let mut in_text_run = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(element)) => match element.name().as_ref() {
                b"w:p" => current = Some(String::new()),
                b"w:t" => in_text_run = true,
                _ => {}
            },
            Ok(Event::Empty(element)) => match element.name().as_ref() {
                b"w:p" => paragraphs.push(String::new()),
                b"w:tab" => push_char(&mut current, '\t'),
                b"w:br" | b"w:cr" => push_char(&mut current, '\n'),
                _ => {}
            },
            Ok(Event::Text(text)) if in_text_run => {
                let text = text
                    .unescape()
                    .map_err(|error| ExtractionError::Docx(error.to_string()))?;
                if let Some(paragraph) = current.as_mut() {
                    paragraph.push_str(&text);
                }
            }
            Ok(Event::End(element)) => match element.name().as_ref() {
                b"w:t" => in_text_run = false,
                b"w:p" => {
                    if let Some(paragraph) = current.take() {
                        paragraphs.push(paragraph);
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(error) => {
                return Err(ExtractionError::Docx(format!(
                    "malformed XML at byte {}: {error}",
                    reader.buffer_position()
                )));
            }
            Ok(_) => {}
        }
    }

    Ok(paragraphs)
}

fn push_char(current: &mut Option<String>, ch: char) {
    if let Some(paragraph) = current.as_mut() {
        paragraph.push(ch);
    }
}
