//! Document ingestion: turn an input artifact into source text.
//!
//! Recognized encodings are PDF (extracted page by page, pages joined with
//! a blank line) and a small set of plain-text extensions. Anything else is
//! rejected, as is a document with no extractable text, before the pipeline
//! ever runs.

use std::path::Path;

use thiserror::Error;

/// Extensions treated as plain UTF-8 text
const TEXT_EXTENSIONS: [&str; 6] = ["txt", "md", "json", "py", "js", "rs"];

/// Errors raised while extracting source text from a document
#[derive(Debug, Error)]
pub enum IngestError {
    /// File extension is not a recognized encoding
    #[error("unsupported file type: .{0}")]
    Unsupported(String),

    /// Document could not be parsed
    #[error("failed to parse document: {0}")]
    Malformed(String),

    /// Extraction yielded no text
    #[error("document contains no extractable text")]
    Empty,

    /// Filesystem failure
    #[error("failed to read {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Extract source text from a file on disk
pub fn extract_path(path: &Path) -> Result<String, IngestError> {
    let ext = extension_of(path.to_string_lossy().as_ref())?;

    let text = if ext == "pdf" {
        let doc = lopdf::Document::load(path).map_err(|e| IngestError::Malformed(e.to_string()))?;
        pdf_text(&doc)
    } else {
        std::fs::read_to_string(path).map_err(|e| IngestError::Io {
            path: path.display().to_string(),
            source: e,
        })?
    };

    reject_empty(text)
}

/// Extract source text from an in-memory upload
pub fn extract_bytes(filename: &str, bytes: &[u8]) -> Result<String, IngestError> {
    let ext = extension_of(filename)?;

    let text = if ext == "pdf" {
        let doc =
            lopdf::Document::load_mem(bytes).map_err(|e| IngestError::Malformed(e.to_string()))?;
        pdf_text(&doc)
    } else {
        std::str::from_utf8(bytes)
            .map_err(|e| IngestError::Malformed(e.to_string()))?
            .to_string()
    };

    reject_empty(text)
}

/// Resolve the lowercase extension and check it is a recognized encoding
fn extension_of(filename: &str) -> Result<String, IngestError> {
    let ext = Path::new(filename)
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    if ext == "pdf" || TEXT_EXTENSIONS.contains(&ext.as_str()) {
        Ok(ext)
    } else {
        Err(IngestError::Unsupported(ext))
    }
}

/// Concatenate page text with a blank-line separator. Pages that fail to
/// extract contribute an empty string, matching a best-effort read.
fn pdf_text(doc: &lopdf::Document) -> String {
    let mut pages = Vec::new();

    for page_number in doc.get_pages().keys() {
        let text = doc.extract_text(&[*page_number]).unwrap_or_default();
        pages.push(text);
    }

    pages.join("\n\n")
}

fn reject_empty(text: String) -> Result<String, IngestError> {
    if text.trim().is_empty() {
        return Err(IngestError::Empty);
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_plain_text_extraction() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("notes.txt");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "The agent encodes pixels into a latent state.").unwrap();

        let text = extract_path(&path).unwrap();
        assert!(text.contains("latent state"));
    }

    #[test]
    fn test_unsupported_extension_rejected() {
        let err = extract_bytes("diagram.png", b"bytes").unwrap_err();
        assert!(matches!(err, IngestError::Unsupported(ext) if ext == "png"));
    }

    #[test]
    fn test_missing_extension_rejected() {
        let err = extract_bytes("README", b"text").unwrap_err();
        assert!(matches!(err, IngestError::Unsupported(_)));
    }

    #[test]
    fn test_empty_document_rejected() {
        let err = extract_bytes("empty.txt", b"  \n\t ").unwrap_err();
        assert!(matches!(err, IngestError::Empty));
    }

    #[test]
    fn test_invalid_utf8_rejected() {
        let err = extract_bytes("bad.txt", &[0xff, 0xfe, 0xfd]).unwrap_err();
        assert!(matches!(err, IngestError::Malformed(_)));
    }

    #[test]
    fn test_markdown_bytes_extraction() {
        let text = extract_bytes("paper.md", b"# Title\n\nBody text").unwrap();
        assert_eq!(text, "# Title\n\nBody text");
    }
}
