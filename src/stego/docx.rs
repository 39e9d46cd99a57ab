//! DOCX carrier: the frame is stored as a paragraph whose single run is
//! hidden (`<w:vanish/>`) and tagged with the [`PAYLOAD_STYLE`] run style, so
//! Word does not render it and later embeds can find and replace it.
//!
//! Hidden text the author wrote is left alone and never read as a frame.
//! Only `word/document.xml` is rewritten; every other package entry is
//! copied without recompression.

use std::io::{Cursor, Read, Write};
use std::ops::Range;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::{Carrier, TextSlot};
use crate::error::StegoError;
use crate::kind::CarrierKind;

/// Package part holding the main document body.
pub const DOCUMENT_PART: &str = "word/document.xml";

/// Run style marking the payload run.
pub const PAYLOAD_STYLE: &str = "CovertlyPayload";

/// DOCX carrier over the raw package and its main document part.
pub struct DocxCarrier {
    package: Vec<u8>,
    document: String,
}

impl DocxCarrier {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StegoError> {
        let invalid = |e: &dyn std::fmt::Display| {
            StegoError::NormalizationFailure(format!("invalid DOCX: {e}"))
        };

        let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(|e| invalid(&e))?;
        let mut document = String::new();
        archive
            .by_name(DOCUMENT_PART)
            .map_err(|e| invalid(&e))?
            .read_to_string(&mut document)
            .map_err(|e| invalid(&e))?;

        Ok(Self {
            package: bytes.to_vec(),
            document,
        })
    }

    /// The current main document XML.
    pub fn document_xml(&self) -> &str {
        &self.document
    }
}

/// `<w:p>` with one hidden, style-tagged run holding `text`.
fn payload_paragraph(text: &str) -> String {
    format!(
        "<w:p><w:r><w:rPr><w:rStyle w:val=\"{PAYLOAD_STYLE}\"/><w:vanish/></w:rPr>\
         <w:t xml:space=\"preserve\">{}</w:t></w:r></w:p>",
        quick_xml::escape::escape(text)
    )
}

/// Byte offset where a new body-level paragraph belongs: before the
/// body's own `<w:sectPr>` when it has one, else before `</w:body>`.
fn insertion_point(xml: &str) -> Option<usize> {
    let body_end = xml.rfind("</w:body>")?;
    match xml[..body_end].rfind("<w:sectPr") {
        // a paragraph-level sectPr is followed by the closing tags of its paragraph
        Some(start) if !xml[start..body_end].contains("</w:p>") => Some(start),
        _ => Some(body_end),
    }
}

fn is_payload_style(element: &BytesStart) -> bool {
    matches!(
        element.try_get_attribute("w:val"),
        Ok(Some(attr)) if attr.value.as_ref() == PAYLOAD_STYLE.as_bytes()
    )
}

/// Payload paragraphs found in a document.
#[derive(Debug, Default)]
struct PayloadScan {
    /// Byte ranges of the paragraphs holding payload runs, in document order.
    paragraphs: Vec<Range<usize>>,
    /// Text of the payload runs, `None` when there are none.
    text: Option<String>,
}

fn scan(xml: &str) -> Result<PayloadScan, StegoError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut found = PayloadScan::default();
    // start offset of each open paragraph and whether it holds a payload run
    let mut open: Vec<(usize, bool)> = Vec::new();
    let mut run_text = String::new();
    let mut in_run = false;
    let mut in_text = false;
    let mut marked = false;

    loop {
        let start = reader.buffer_position() as usize;
        let event = reader
            .read_event()
            .map_err(|e| StegoError::NormalizationFailure(format!("document.xml: {e}")))?;
        let end = reader.buffer_position() as usize;

        match event {
            Event::Start(e) => match e.name().as_ref() {
                b"w:p" => open.push((start, false)),
                b"w:r" => {
                    in_run = true;
                    marked = false;
                    run_text.clear();
                }
                b"w:t" if in_run => in_text = true,
                b"w:rStyle" if in_run => marked = is_payload_style(&e),
                _ => {}
            },
            Event::Empty(e) => {
                if in_run && e.name().as_ref() == b"w:rStyle" {
                    marked = is_payload_style(&e);
                }
            }
            Event::Text(t) if in_text => {
                let text = t
                    .unescape()
                    .map_err(|e| StegoError::NormalizationFailure(e.to_string()))?;
                run_text.push_str(&text);
            }
            Event::End(e) => match e.name().as_ref() {
                b"w:t" => in_text = false,
                b"w:r" => {
                    if marked {
                        found
                            .text
                            .get_or_insert_with(String::new)
                            .push_str(&run_text);
                        if let Some(paragraph) = open.last_mut() {
                            paragraph.1 = true;
                        }
                    }
                    in_run = false;
                    marked = false;
                }
                b"w:p" => {
                    if let Some((p_start, true)) = open.pop() {
                        found.paragraphs.push(p_start..end);
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    // inner paragraphs close first; keep only the outermost ranges
    found.paragraphs.sort_by_key(|range| range.start);
    let mut outermost: Vec<Range<usize>> = Vec::new();
    for range in found.paragraphs {
        match outermost.last() {
            Some(last) if range.start < last.end => {}
            _ => outermost.push(range),
        }
    }
    found.paragraphs = outermost;

    Ok(found)
}

impl TextSlot for DocxCarrier {
    fn embed_text(&mut self, frame: &str) -> Result<(), StegoError> {
        let previous = scan(&self.document)?;
        for range in previous.paragraphs.into_iter().rev() {
            self.document.replace_range(range, "");
        }

        let at = insertion_point(&self.document)
            .ok_or_else(|| StegoError::Carrier("document.xml has no <w:body>".to_string()))?;
        self.document.insert_str(at, &payload_paragraph(frame));
        Ok(())
    }

    fn extract_text(&self) -> Result<Option<String>, StegoError> {
        Ok(scan(&self.document)?.text.filter(|text| !text.is_empty()))
    }
}

impl Carrier for DocxCarrier {
    fn kind(&self) -> CarrierKind {
        CarrierKind::Docx
    }

    fn to_bytes(&self) -> Result<Vec<u8>, StegoError> {
        let zip_err = |e: zip::result::ZipError| StegoError::Carrier(e.to_string());

        let mut archive = ZipArchive::new(Cursor::new(self.package.as_slice())).map_err(zip_err)?;
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for index in 0..archive.len() {
            let entry = archive.by_index(index).map_err(zip_err)?;
            if entry.name() == DOCUMENT_PART {
                drop(entry);
                writer.start_file(DOCUMENT_PART, options).map_err(zip_err)?;
                writer.write_all(self.document.as_bytes())?;
            } else {
                writer.raw_copy_file(entry).map_err(zip_err)?;
            }
        }

        Ok(writer.finish().map_err(zip_err)?.into_inner())
    }
}

/// Builds a minimal DOCX package around `body` (inner XML of `<w:body>`).
#[cfg(test)]
pub(crate) fn create_test_docx(body: &str) -> Vec<u8> {
    let document = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
         <w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">\
         <w:body>{body}</w:body></w:document>"
    );
    let content_types = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
        <Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\"/>";

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    writer.start_file("[Content_Types].xml", options).unwrap();
    writer.write_all(content_types.as_bytes()).unwrap();
    writer.start_file(DOCUMENT_PART, options).unwrap();
    writer.write_all(document.as_bytes()).unwrap();
    writer.finish().unwrap().into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECT_PR: &str = "<w:sectPr><w:pgSz w:w=\"12240\" w:h=\"15840\"/></w:sectPr>";

    #[test]
    fn test_plain_document_has_no_message() {
        let bytes = create_test_docx("<w:p><w:r><w:t>Visible</w:t></w:r></w:p>");
        let carrier = DocxCarrier::from_bytes(&bytes).unwrap();
        assert_eq!(carrier.extract_text().unwrap(), None);
    }

    #[test]
    fn test_embed_and_reload() {
        let body = format!("<w:p><w:r><w:t>Visible</w:t></w:r></w:p>{SECT_PR}");
        let mut carrier = DocxCarrier::from_bytes(&create_test_docx(&body)).unwrap();
        carrier.embed_text("pw:<b>&\"quoted\"</b>").unwrap();

        let reloaded = DocxCarrier::from_bytes(&carrier.to_bytes().unwrap()).unwrap();
        assert_eq!(
            reloaded.extract_text().unwrap().as_deref(),
            Some("pw:<b>&\"quoted\"</b>")
        );

        // payload paragraph sits before the body-level sectPr
        let xml = reloaded.document_xml();
        assert!(xml.find("<w:vanish/>").unwrap() < xml.find("<w:sectPr").unwrap());
        assert!(xml.contains("<w:t>Visible</w:t>"));
    }

    #[test]
    fn test_reembed_replaces_paragraph() {
        let body = format!("<w:p><w:r><w:t>Visible</w:t></w:r></w:p>{SECT_PR}");
        let mut carrier = DocxCarrier::from_bytes(&create_test_docx(&body)).unwrap();
        carrier.embed_text("a:first").unwrap();

        let mut reloaded = DocxCarrier::from_bytes(&carrier.to_bytes().unwrap()).unwrap();
        reloaded.embed_text("b:second").unwrap();

        assert_eq!(reloaded.extract_text().unwrap().as_deref(), Some("b:second"));
        assert_eq!(reloaded.document_xml().matches(PAYLOAD_STYLE).count(), 1);
        assert!(reloaded.document_xml().contains("<w:t>Visible</w:t>"));
        assert!(reloaded.document_xml().contains(SECT_PR));
    }

    #[test]
    fn test_author_hidden_text_ignored() {
        let body = "<w:p><w:r><w:rPr><w:vanish/></w:rPr><w:t>author note</w:t></w:r></w:p>";
        let mut carrier = DocxCarrier::from_bytes(&create_test_docx(body)).unwrap();
        assert_eq!(carrier.extract_text().unwrap(), None);

        carrier.embed_text("pw:message").unwrap();
        assert_eq!(carrier.extract_text().unwrap().as_deref(), Some("pw:message"));
        assert!(carrier.document_xml().contains("author note"));
    }

    #[test]
    fn test_payload_split_across_runs() {
        let style = format!("<w:rPr><w:rStyle w:val=\"{PAYLOAD_STYLE}\"/><w:vanish/></w:rPr>");
        let body = format!(
            "<w:p><w:r>{style}<w:t>pw:hid</w:t></w:r><w:r>{style}<w:t>den</w:t></w:r></w:p>"
        );
        let carrier = DocxCarrier::from_bytes(&create_test_docx(&body)).unwrap();
        assert_eq!(carrier.extract_text().unwrap().as_deref(), Some("pw:hidden"));
    }

    #[test]
    fn test_paragraph_level_sect_pr_skipped() {
        let xml = format!("<w:body><w:p><w:pPr>{SECT_PR}</w:pPr></w:p><w:p/></w:body>");
        assert_eq!(insertion_point(&xml), xml.rfind("</w:body>"));
    }

    #[test]
    fn test_other_parts_copied() {
        let mut carrier = DocxCarrier::from_bytes(&create_test_docx("")).unwrap();
        carrier.embed_text("x").unwrap();

        let bytes = carrier.to_bytes().unwrap();
        let mut archive = ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap();
        assert_eq!(archive.len(), 2);
        assert!(archive.by_name("[Content_Types].xml").is_ok());
    }

    #[test]
    fn test_not_a_zip() {
        let result = DocxCarrier::from_bytes(b"PK but not really");
        assert!(matches!(result, Err(StegoError::NormalizationFailure(_))));
    }
}
