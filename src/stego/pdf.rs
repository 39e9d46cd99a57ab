//! PDF carrier: the frame lives in the document-information dictionary
//! under `/Message`. Page content is copied through untouched.

use lopdf::{Dictionary, Document, Object, ObjectId, StringFormat};

use super::{Carrier, TextSlot};
use crate::error::StegoError;
use crate::kind::CarrierKind;

/// Info-dictionary key holding the frame.
pub const MESSAGE_KEY: &str = "Message";

/// Byte-order mark of a UTF-16BE PDF text string.
const UTF16_BOM: [u8; 2] = [0xFE, 0xFF];

/// PDF carrier over a parsed document.
pub struct PdfCarrier {
    document: Document,
}

impl PdfCarrier {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StegoError> {
        let document = Document::load_mem(bytes)
            .map_err(|e| StegoError::NormalizationFailure(format!("invalid PDF: {e}")))?;
        Ok(Self { document })
    }

    /// The information dictionary, inline or referenced.
    fn info(&self) -> Option<&Dictionary> {
        match self.document.trailer.get(b"Info").ok()? {
            Object::Reference(id) => self.document.get_dictionary(*id).ok(),
            Object::Dictionary(dict) => Some(dict),
            _ => None,
        }
    }

    /// Returns the id of an indirect info dictionary, creating one when absent.
    fn info_id(&mut self) -> ObjectId {
        let inline = match self.document.trailer.get(b"Info") {
            Ok(Object::Reference(id)) if self.document.get_dictionary(*id).is_ok() => return *id,
            Ok(Object::Dictionary(dict)) => dict.clone(),
            _ => Dictionary::new(),
        };

        let id = self.document.add_object(inline);
        self.document.trailer.set("Info", id);
        id
    }
}

/// Decodes a PDF text string: UTF-16BE when it carries a BOM, else UTF-8.
fn decode_text_string(bytes: &[u8]) -> Result<String, StegoError> {
    match bytes.strip_prefix(&UTF16_BOM[..]) {
        Some(units) if units.len() % 2 != 0 => Err(StegoError::Malformed),
        Some(units) => {
            let units: Vec<u16> = units
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
                .collect();
            String::from_utf16(&units).map_err(|_| StegoError::Malformed)
        }
        None => String::from_utf8(bytes.to_vec()).map_err(|_| StegoError::Malformed),
    }
}

impl TextSlot for PdfCarrier {
    fn embed_text(&mut self, frame: &str) -> Result<(), StegoError> {
        let id = self.info_id();
        let info = self
            .document
            .get_object_mut(id)
            .and_then(|object| object.as_dict_mut())
            .map_err(|e| StegoError::Carrier(e.to_string()))?;

        info.set(
            MESSAGE_KEY,
            Object::String(frame.as_bytes().to_vec(), StringFormat::Literal),
        );
        Ok(())
    }

    fn extract_text(&self) -> Result<Option<String>, StegoError> {
        let stored = self
            .info()
            .and_then(|info| info.get(MESSAGE_KEY.as_bytes()).ok());

        match stored {
            Some(Object::String(bytes, _)) if !bytes.is_empty() => {
                decode_text_string(bytes).map(Some)
            }
            _ => Ok(None),
        }
    }
}

impl Carrier for PdfCarrier {
    fn kind(&self) -> CarrierKind {
        CarrierKind::Pdf
    }

    fn to_bytes(&self) -> Result<Vec<u8>, StegoError> {
        let mut document = self.document.clone();
        let mut bytes = Vec::new();
        document
            .save_to(&mut bytes)
            .map_err(|e| StegoError::Carrier(e.to_string()))?;
        Ok(bytes)
    }
}

/// Builds a one-page PDF, optionally with a `/Title` in an indirect info dictionary.
#[cfg(test)]
pub(crate) fn create_test_pdf(title: Option<&str>) -> Vec<u8> {
    use lopdf::dictionary;

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    });
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => vec![page_id.into()],
        "Count" => 1,
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    if let Some(title) = title {
        let info_id = doc.add_object(dictionary! {
            "Title" => Object::string_literal(title),
        });
        doc.trailer.set("Info", info_id);
    }

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}
