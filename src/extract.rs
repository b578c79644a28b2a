//! Text extraction for uploaded files (PDF and plain text).
//!
//! The caller supplies a path and, optionally, the declared file kind;
//! otherwise the kind comes from the extension. Output is cleaned with
//! [`docqa_core::text::clean_text`].

use std::path::Path;

use docqa_core::text::clean_text;
use docqa_core::{RagError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Pdf,
    Text,
}

impl FileKind {
    /// `.pdf` is PDF; `.txt`, `.md`, and `.text` are plain text.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(FileKind::Pdf),
            "txt" | "md" | "text" => Some(FileKind::Text),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedText {
    pub text: String,
    pub file_size: u64,
}

pub fn extract_file(path: &Path, kind: Option<FileKind>) -> Result<ExtractedText> {
    let shown = path.display().to_string();
    let kind = match kind.or_else(|| FileKind::from_path(path)) {
        Some(kind) => kind,
        None => return Err(RagError::text_extraction(shown, "Unsupported file type")),
    };

    if !path.is_file() {
        return Err(RagError::text_extraction(shown, "File not found"));
    }
    let bytes = std::fs::read(path).map_err(|e| RagError::text_extraction(&shown, e))?;

    let raw = match kind {
        FileKind::Pdf => {
            extract_pdf(&bytes).map_err(|reason| RagError::text_extraction(&shown, reason))?
        }
        FileKind::Text => decode_text(&bytes).ok_or_else(|| {
            RagError::text_extraction(&shown, "Unable to decode file with supported encodings")
        })?,
    };

    let text = clean_text(&raw);
    tracing::debug!(path = %shown, ?kind, chars = text.chars().count(), "extracted text");
    Ok(ExtractedText {
        text,
        file_size: bytes.len() as u64,
    })
}

/// Page texts joined by a blank line. Fails when no page yields text.
fn extract_pdf(bytes: &[u8]) -> std::result::Result<String, String> {
    let pages = pdf_extract::extract_text_from_mem_by_pages(bytes)
        .map_err(|e| format!("PDF extraction failed: {}", e))?;

    let text = pages
        .iter()
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");

    if text.is_empty() {
        return Err("No text content found in PDF".to_string());
    }
    Ok(text)
}

/// Decode as UTF-8, then Windows-1252, then ISO-8859-1.
pub fn decode_text(bytes: &[u8]) -> Option<String> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    if let Ok(text) = std::str::from_utf8(bytes) {
        return Some(text.to_string());
    }
    if let Some(text) = decode_cp1252(bytes) {
        tracing::debug!("decoded text as windows-1252");
        return Some(text);
    }
    tracing::debug!("decoded text as iso-8859-1");
    Some(bytes.iter().map(|&b| char::from(b)).collect())
}

/// 0x80..=0x9F in Windows-1252. `None` marks the five undefined bytes.
const CP1252_HIGH: [Option<char>; 32] = [
    Some('\u{20AC}'), None, Some('\u{201A}'), Some('\u{0192}'),
    Some('\u{201E}'), Some('\u{2026}'), Some('\u{2020}'), Some('\u{2021}'),
    Some('\u{02C6}'), Some('\u{2030}'), Some('\u{0160}'), Some('\u{2039}'),
    Some('\u{0152}'), None, Some('\u{017D}'), None,
    None, Some('\u{2018}'), Some('\u{2019}'), Some('\u{201C}'),
    Some('\u{201D}'), Some('\u{2022}'), Some('\u{2013}'), Some('\u{2014}'),
    Some('\u{02DC}'), Some('\u{2122}'), Some('\u{0161}'), Some('\u{203A}'),
    Some('\u{0153}'), None, Some('\u{017E}'), Some('\u{0178}'),
];

fn decode_cp1252(bytes: &[u8]) -> Option<String> {
    bytes
        .iter()
        .map(|&b| match b {
            0x80..=0x9F => CP1252_HIGH[(b - 0x80) as usize],
            _ => Some(char::from(b)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_from_extension() {
        assert_eq!(FileKind::from_path(Path::new("a/Report.PDF")), Some(FileKind::Pdf));
        assert_eq!(FileKind::from_path(Path::new("notes.txt")), Some(FileKind::Text));
        assert_eq!(FileKind::from_path(Path::new("slides.pptx")), None);
        assert_eq!(FileKind::from_path(Path::new("README")), None);
    }

    #[test]
    fn utf8_wins_when_valid() {
        assert_eq!(decode_text("naïve café".as_bytes()).unwrap(), "naïve café");
    }

    #[test]
    fn bom_is_stripped() {
        assert_eq!(decode_text(b"\xEF\xBB\xBFhello").unwrap(), "hello");
    }

    #[test]
    fn cp1252_smart_quotes() {
        let bytes = b"\x93quoted\x94 \x80 5";
        assert_eq!(decode_text(bytes).unwrap(), "\u{201C}quoted\u{201D} \u{20AC} 5");
    }

    #[test]
    fn latin1_covers_bytes_cp1252_leaves_undefined() {
        // 0x81 is undefined in Windows-1252.
        let bytes = b"caf\xE9 \x81";
        assert!(decode_cp1252(bytes).is_none());
        assert_eq!(decode_text(bytes).unwrap(), "café \u{81}");
    }

    #[test]
    fn invalid_pdf_is_an_error() {
        assert!(extract_pdf(b"not a pdf").is_err());
    }
}
