//! Text extraction for uploaded documents.
//!
//! The pipeline only sees the [`TextExtractor`] trait. [`DefaultExtractor`]
//! covers the three accepted formats: PDF through `pdf-extract`, DOCX by
//! reading the WordprocessingML part of the zip package, and legacy DOC by
//! handing the bytes to an Apache Tika server.

use crate::error::ExtractionError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    io::{Cursor, Read},
    path::Path,
    str::FromStr,
    time::Duration,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Doc,
    Docx,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> Result<Self, ExtractionError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();
        extension.parse()
    }
}

impl FromStr for DocumentFormat {
    type Err = ExtractionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pdf" => Ok(DocumentFormat::Pdf),
            "doc" => Ok(DocumentFormat::Doc),
            "docx" => Ok(DocumentFormat::Docx),
            other => Err(ExtractionError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DocumentFormat::Pdf => "pdf",
            DocumentFormat::Doc => "doc",
            DocumentFormat::Docx => "docx",
        };
        f.write_str(name)
    }
}

/// An uploaded document. Dropped once its text has been extracted.
#[derive(Debug, Clone)]
pub struct Document {
    bytes: Vec<u8>,
    format: DocumentFormat,
}

impl Document {
    pub fn new(bytes: Vec<u8>, format: DocumentFormat) -> Self {
        Self { bytes, format }
    }

    /// Reads a document from disk. The size limit is checked against the file
    /// metadata so an oversized file is never loaded.
    pub fn from_path(path: &Path, max_size: u64) -> Result<Self, ExtractionError> {
        let format = DocumentFormat::from_path(path)?;
        let size = std::fs::metadata(path)?.len();
        if size > max_size {
            return Err(ExtractionError::Oversized {
                size,
                limit: max_size,
            });
        }
        let bytes = std::fs::read(path)?;
        Ok(Self::new(bytes, format))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn format(&self) -> DocumentFormat {
        self.format
    }

    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

pub trait TextExtractor: Send + Sync {
    /// Returns non-empty UTF-8 text. Documents over `max_size` bytes are
    /// rejected before any parsing is attempted.
    fn extract(&self, document: &Document, max_size: u64) -> Result<String, ExtractionError>;
}

pub struct DefaultExtractor {
    tika_url: Option<String>,
    paragraph: Regex,
    run: Regex,
    run_content: Regex,
}

impl DefaultExtractor {
    pub fn new(tika_url: Option<String>) -> Self {
        Self {
            tika_url,
            // Lazy attributes so a self-closing <w:p .../> never swallows the next paragraph.
            paragraph: Regex::new(r"(?s)<w:p(?:\s[^>]*?)?(?:/>|>(.*?)</w:p>)")
                .expect("paragraph pattern is valid"),
            // `<w:rPr>` is not a run: the tag name must end right after `w:r`.
            run: Regex::new(r"(?s)<w:r(?:\s[^>]*)?>(.*?)</w:r>").expect("run pattern is valid"),
            run_content: Regex::new(r"(?s)<w:t(?:\s[^>]*)?>(.*?)</w:t>|<w:(tab|br|cr)(?:\s[^>]*)?/>")
                .expect("run content pattern is valid"),
        }
    }

    fn extract_pdf(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        pdf_extract::extract_text_from_mem(bytes).map_err(|e| ExtractionError::Unreadable {
            format: DocumentFormat::Pdf,
            reason: e.to_string(),
        })
    }

    fn extract_docx(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        let unreadable = |reason: String| ExtractionError::Unreadable {
            format: DocumentFormat::Docx,
            reason,
        };

        let mut archive =
            zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| unreadable(e.to_string()))?;
        let mut xml = String::new();
        archive
            .by_name("word/document.xml")
            .map_err(|e| unreadable(e.to_string()))?
            .read_to_string(&mut xml)
            .map_err(|e| unreadable(e.to_string()))?;

        Ok(self.docx_paragraphs(&xml).join("\n"))
    }

    fn docx_paragraphs(&self, xml: &str) -> Vec<String> {
        self.paragraph
            .captures_iter(xml)
            .map(|paragraph| {
                let body = paragraph.get(1).map_or("", |m| m.as_str());
                let mut text = String::new();
                for run in self.run.captures_iter(body) {
                    for content in self.run_content.captures_iter(&run[1]) {
                        match (content.get(1), content.get(2).map(|m| m.as_str())) {
                            (Some(t), _) => text.push_str(&unescape_xml(t.as_str())),
                            (None, Some("tab")) => text.push('\t'),
                            (None, _) => text.push('\n'),
                        }
                    }
                }
                text
            })
            .collect()
    }

    fn extract_doc(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        let base_url = self
            .tika_url
            .as_deref()
            .ok_or(ExtractionError::ConverterUnavailable(DocumentFormat::Doc))?;
        let unreadable = |reason: String| ExtractionError::Unreadable {
            format: DocumentFormat::Doc,
            reason,
        };

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| unreadable(e.to_string()))?;
        let response = client
            .put(format!("{}/tika", base_url.trim_end_matches('/')))
            .header("Accept", "text/plain")
            .body(bytes.to_vec())
            .send()
            .map_err(|e| unreadable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(unreadable(format!("Tika returned {}", response.status())));
        }

        let text = response.text().map_err(|e| unreadable(e.to_string()))?;
        Ok(text.trim().to_string())
    }
}

impl Default for DefaultExtractor {
    fn default() -> Self {
        Self::new(None)
    }
}

impl TextExtractor for DefaultExtractor {
    fn extract(&self, document: &Document, max_size: u64) -> Result<String, ExtractionError> {
        if document.len() > max_size {
            return Err(ExtractionError::Oversized {
                size: document.len(),
                limit: max_size,
            });
        }

        let text = match document.format() {
            DocumentFormat::Pdf => self.extract_pdf(document.bytes())?,
            DocumentFormat::Docx => self.extract_docx(document.bytes())?,
            DocumentFormat::Doc => self.extract_doc(document.bytes())?,
        };

        if text.trim().is_empty() {
            return Err(ExtractionError::Empty);
        }

        tracing::debug!(
            format = %document.format(),
            bytes = document.len(),
            chars = text.chars().count(),
            "extracted document text"
        );
        Ok(text)
    }
}

fn unescape_xml(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn docx_bytes(document_xml: &str) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Stored);
        writer.start_file("word/document.xml", options).unwrap();
        writer.write_all(document_xml.as_bytes()).unwrap();
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn format_is_taken_from_extension() {
        assert_eq!(
            DocumentFormat::from_path(Path::new("report.PDF")).unwrap(),
            DocumentFormat::Pdf
        );
        assert_eq!(
            DocumentFormat::from_path(Path::new("a/b/letter.docx")).unwrap(),
            DocumentFormat::Docx
        );
        assert!(matches!(
            DocumentFormat::from_path(Path::new("notes.txt")),
            Err(ExtractionError::UnsupportedFormat(ext)) if ext == "txt"
        ));
    }

    #[test]
    fn oversized_document_is_rejected_before_parsing() {
        // Not a valid PDF; parsing it would fail with Unreadable instead.
        let document = Document::new(vec![0u8; 64], DocumentFormat::Pdf);
        let err = DefaultExtractor::default().extract(&document, 63).unwrap_err();

        assert!(matches!(err, ExtractionError::Oversized { size: 64, limit: 63 }));
    }

    #[test]
    fn oversized_file_is_rejected_before_reading() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("large.docx");
        std::fs::write(&path, vec![0u8; 2048]).unwrap();

        let err = Document::from_path(&path, 1024).unwrap_err();
        assert!(matches!(
            err,
            ExtractionError::Oversized {
                size: 2048,
                limit: 1024
            }
        ));

        let document = Document::from_path(&path, 4096).unwrap();
        assert_eq!(document.format(), DocumentFormat::Docx);
        assert_eq!(document.len(), 2048);
    }

    #[test]
    fn corrupt_pdf_is_unreadable() {
        let document = Document::new(b"definitely not a pdf".to_vec(), DocumentFormat::Pdf);
        let err = DefaultExtractor::default()
            .extract(&document, 1024)
            .unwrap_err();

        assert!(matches!(
            err,
            ExtractionError::Unreadable { format: DocumentFormat::Pdf, .. }
        ));
    }

    #[test]
    fn docx_paragraphs_become_lines() {
        let xml = r#"<w:document><w:body>
            <w:p w:rsidR="00"><w:pPr><w:jc w:val="left"/></w:pPr><w:r><w:t>The cat was </w:t></w:r><w:r><w:t xml:space="preserve">chased &amp; caught.</w:t></w:r></w:p>
            <w:p/>
            <w:p><w:r><w:t>Second paragraph.</w:t></w:r></w:p>
        </w:body></w:document>"#;
        let document = Document::new(docx_bytes(xml), DocumentFormat::Docx);

        let text = DefaultExtractor::default().extract(&document, 1 << 20).unwrap();
        assert_eq!(text, "The cat was chased & caught.\n\nSecond paragraph.");
    }

    #[test]
    fn docx_tabs_and_breaks_separate_words() {
        let xml = r#"<w:document><w:body>
            <w:p><w:pPr><w:tabs><w:tab w:val="left" w:pos="720"/></w:tabs></w:pPr><w:r><w:rPr><w:b/></w:rPr><w:t>Name:</w:t><w:tab/><w:t>John</w:t></w:r></w:p>
            <w:p><w:r><w:t>Line one</w:t><w:br/><w:t>line two</w:t></w:r></w:p>
        </w:body></w:document>"#;
        let document = Document::new(docx_bytes(xml), DocumentFormat::Docx);

        let text = DefaultExtractor::default().extract(&document, 1 << 20).unwrap();
        assert_eq!(text, "Name:\tJohn\nLine one\nline two");
    }

    #[test]
    fn docx_without_text_is_empty() {
        let xml = "<w:document><w:body><w:p/><w:p></w:p></w:body></w:document>";
        let document = Document::new(docx_bytes(xml), DocumentFormat::Docx);

        let err = DefaultExtractor::default()
            .extract(&document, 1 << 20)
            .unwrap_err();
        assert!(matches!(err, ExtractionError::Empty));
    }

    #[test]
    fn doc_without_tika_is_unavailable() {
        let document = Document::new(b"\xD0\xCF\x11\xE0".to_vec(), DocumentFormat::Doc);
        let err = DefaultExtractor::default()
            .extract(&document, 1024)
            .unwrap_err();

        assert!(matches!(
            err,
            ExtractionError::ConverterUnavailable(DocumentFormat::Doc)
        ));
    }
}
