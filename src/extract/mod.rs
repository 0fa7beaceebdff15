
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

/// Supported document formats, detected from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// Line-oriented source code (`.py`)
    Code,
    /// Plain prose text (`.txt`)
    PlainText,
    /// Word documents (`.docx`)
    Docx,
    /// Page-extracted documents (`.pdf`)
    Pdf,
}

impl DocumentFormat {
    /// Detect the format from a path's extension, case-insensitively.
    /// Returns `None` for unsupported extensions; such files are skipped
    /// during ingestion without an error.
    #[inline]
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_lowercase();
        match extension.as_str() {
            "py" => Some(Self::Code),
            "txt" => Some(Self::PlainText),
            "docx" => Some(Self::Docx),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }
}

/// Read a document's text content using the format-appropriate reader.
#[inline]
pub fn extract_text(path: &Path, format: DocumentFormat) -> Result<String> {
    let text = match format {
        DocumentFormat::Code | DocumentFormat::PlainText => fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        DocumentFormat::Pdf => extract_pdf(path)?,
        DocumentFormat::Docx => extract_docx(path)?,
    };

    debug!("Extracted {} chars from {}", text.len(), path.display());
    Ok(text)
}

fn extract_pdf(path: &Path) -> Result<String> {
    pdf_extract::extract_text(path)
        .map_err(|e| anyhow::anyhow!("Failed to extract text from {}: {}", path.display(), e))
}

/// Concatenate the text runs of each paragraph, one paragraph per line.
fn extract_docx(path: &Path) -> Result<String> {
    let data =
        fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let doc = docx_rs::read_docx(&data)
        .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path.display(), e))?;

    let mut text = String::new();
    for child in doc.document.children {
        if let docx_rs::DocumentChild::Paragraph(para) = child {
            for child in para.children {
                if let docx_rs::ParagraphChild::Run(run) = child {
                    for child in run.children {
                        if let docx_rs::RunChild::Text(t) = child {
                            text.push_str(&t.text);
                        }
                    }
                }
            }
            text.push('\n');
        }
    }
    Ok(text)
}
