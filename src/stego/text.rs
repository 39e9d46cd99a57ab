//! Zero-width steganography for plain text.
//!
//! Each payload bit becomes one invisible code point appended after the
//! visible content: U+200B (zero-width space) for 0, U+200D (zero-width
//! joiner) for 1.
//!
//! The channel is the tail of the trailing run of those two symbols that
//! spells whole bytes of plausible frame text. A second embed replaces that
//! tail. Symbols the author typed (a trailing joiner, a run that is not text)
//! stay part of the visible content and are never rewritten.

use super::{BitChannel, Carrier, Framing};
use crate::error::StegoError;
use crate::kind::CarrierKind;
use crate::payload;

/// Symbol for a 0 bit.
pub const ZERO: char = '\u{200B}';

/// Symbol for a 1 bit.
pub const ONE: char = '\u{200D}';

fn is_symbol(c: char) -> bool {
    c == ZERO || c == ONE
}

/// Plain-text carrier.
#[derive(Debug, Clone)]
pub struct TextCarrier {
    visible: String,
    suffix: Vec<bool>,
}

impl TextCarrier {
    /// Reads a UTF-8 text file.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StegoError> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| StegoError::NormalizationFailure(format!("not UTF-8 text: {e}")))?;
        Ok(Self::from_text(text))
    }

    pub fn from_text(text: &str) -> Self {
        let content = text.trim_end_matches(is_symbol);
        let run: Vec<bool> = text[content.len()..].chars().map(|c| c == ONE).collect();

        // symbols ahead of the last whole byte belong to the content
        let loose = run.len() % 8;
        let bytes = payload::bits_to_bytes(&run[loose..]);
        let start = match (0..bytes.len()).find(|&k| payload::is_plausible_frame(&bytes[k..])) {
            Some(skip) => loose + skip * 8,
            None => run.len(),
        };

        // both symbols are three bytes in UTF-8
        let split = content.len() + start * ZERO.len_utf8();
        Self {
            visible: text[..split].to_string(),
            suffix: run[start..].to_vec(),
        }
    }

    /// The content without the payload suffix.
    pub fn visible(&self) -> &str {
        &self.visible
    }

    /// Renders visible content followed by the encoded suffix.
    pub fn to_text(&self) -> String {
        let mut out = String::with_capacity(self.visible.len() + self.suffix.len() * 3);
        out.push_str(&self.visible);
        out.extend(self.suffix.iter().map(|&bit| if bit { ONE } else { ZERO }));
        out
    }
}

impl BitChannel for TextCarrier {
    /// Append-only, so effectively unbounded.
    fn capacity(&self) -> usize {
        usize::MAX
    }

    fn write_bits(&mut self, bits: &[bool]) -> Result<(), StegoError> {
        self.suffix = bits.to_vec();
        Ok(())
    }

    fn read_bits(&self, count: Option<usize>) -> Result<Vec<bool>, StegoError> {
        let count = count.unwrap_or(self.suffix.len()).min(self.suffix.len());
        Ok(self.suffix[..count].to_vec())
    }

    fn framing(&self) -> Framing {
        Framing::Exact
    }
}

impl Carrier for TextCarrier {
    fn kind(&self) -> CarrierKind {
        CarrierKind::Text
    }

    fn to_bytes(&self) -> Result<Vec<u8>, StegoError> {
        Ok(self.to_text().into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::{self, Frame};

    #[test]
    fn test_hi_appends_sixteen_symbols() {
        let original = "Dear diary, nothing happened today.";
        let mut carrier = TextCarrier::from_text(original);
        carrier
            .write_bits(&payload::to_bits(&Frame::from_text("hi")))
            .unwrap();

        let out = carrier.to_text();
        assert!(out.starts_with(original));

        let suffix = &out[original.len()..];
        assert_eq!(suffix.chars().count(), 16);
        assert!(suffix.chars().all(is_symbol));
    }

    #[test]
    fn test_symbols_map_to_bits() {
        let mut carrier = TextCarrier::from_text("x");
        carrier.write_bits(&[false, true, true]).unwrap();
        assert_eq!(carrier.to_text(), "x\u{200B}\u{200D}\u{200D}");
    }

    #[test]
    fn test_reload_reads_suffix() {
        let mut carrier = TextCarrier::from_text("hello");
        let bits = payload::to_bits(&Frame::from_text("secret"));
        carrier.write_bits(&bits).unwrap();

        let reloaded = TextCarrier::from_bytes(&carrier.to_bytes().unwrap()).unwrap();
        assert_eq!(reloaded.visible(), "hello");
        assert_eq!(reloaded.read_bits(None).unwrap(), bits);
    }

    #[test]
    fn test_rewrite_replaces_suffix() {
        let mut carrier = TextCarrier::from_text("hello");
        carrier
            .write_bits(&payload::to_bits(&Frame::from_text("first")))
            .unwrap();
        let mut reloaded = TextCarrier::from_text(&carrier.to_text());
        assert_eq!(reloaded.visible(), "hello");

        let second = payload::to_bits(&Frame::from_text("second"));
        reloaded.write_bits(&second).unwrap();
        assert_eq!(reloaded.to_text().chars().count(), "hello".len() + 48);
        assert_eq!(
            TextCarrier::from_text(&reloaded.to_text()).read_bits(None).unwrap(),
            second
        );
    }

    #[test]
    fn test_trailing_joiner_kept() {
        let original = "Family \u{1F468}\u{200D}";
        let mut carrier = TextCarrier::from_text(original);
        assert_eq!(carrier.visible(), original);
        assert!(carrier.read_bits(None).unwrap().is_empty());

        let bits = payload::to_bits(&Frame::from_text("hi"));
        carrier.write_bits(&bits).unwrap();
        let out = carrier.to_text();
        assert!(out.starts_with(original));
        assert_eq!(out[original.len()..].chars().count(), 16);

        let reloaded = TextCarrier::from_text(&out);
        assert_eq!(reloaded.visible(), original);
        assert_eq!(reloaded.read_bits(None).unwrap(), bits);
    }

    #[test]
    fn test_non_text_run_is_content() {
        // eight zero-width spaces spell a NUL byte
        let original = format!("hello{}", ZERO.to_string().repeat(8));
        let mut carrier = TextCarrier::from_text(&original);
        assert_eq!(carrier.visible(), original);
        assert!(carrier.read_bits(None).unwrap().is_empty());

        let bits = payload::to_bits(&Frame::from_text("ok"));
        carrier.write_bits(&bits).unwrap();
        let out = carrier.to_text();
        assert!(out.starts_with(&original));

        let reloaded = TextCarrier::from_text(&out);
        assert_eq!(reloaded.visible(), original);
        assert_eq!(reloaded.read_bits(None).unwrap(), bits);
    }

    #[test]
    fn test_inner_joiner_not_read() {
        // family emoji uses U+200D between its members
        let carrier = TextCarrier::from_text("hi \u{1F468}\u{200D}\u{1F469} there");
        assert!(carrier.read_bits(None).unwrap().is_empty());
    }

    #[test]
    fn test_read_count_clamped() {
        let mut carrier = TextCarrier::from_text("");
        carrier.write_bits(&[true, false]).unwrap();
        assert_eq!(carrier.read_bits(Some(10)).unwrap(), vec![true, false]);
    }

    #[test]
    fn test_invalid_utf8() {
        let result = TextCarrier::from_bytes(&[0xC3, 0x28]);
        assert!(matches!(result, Err(StegoError::NormalizationFailure(_))));
    }
}
