//! Uploaded document decoding for chat context

use std::path::Path;
use log::{debug, error};

/// Kinds of document accepted as chat context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind
{   PlainText
  , Pdf
}

impl DocumentKind
{   /// Detect from the file extension
    pub fn from_path(path: &Path) -> Option<Self>
    {   let ext = path.extension()?
          .to_str()?
          .to_ascii_lowercase();
        match ext.as_str()
        {   "txt" => Some(DocumentKind::PlainText)
          , "pdf" => Some(DocumentKind::Pdf)
          , _ => None
        }
    }
}

/// Read a `.txt` or `.pdf` file into text
pub fn read_document(path: &Path) -> Result<String, crate::error::Error>
{   let kind = DocumentKind::from_path(path).ok_or_else(|| {
      crate::error::Error::Document(format!(
        "unsupported file type: {} (expected .txt or .pdf)",
        path.display()
      ))
    })?;
    let bytes = std::fs::read(path).map_err(|e| {
      error!("Failed to read {}: {}", path.display(), e);
      crate::error::Error::Document(
        format!("{}: {}", path.display(), e)
      )
    })?;
    debug!("Read {} bytes from {}", bytes.len(), path.display());
    decode_document(&bytes, kind)
}

pub fn decode_document(
  bytes: &[u8]
, kind: DocumentKind
) -> Result<String, crate::error::Error>
{   match kind
    {   DocumentKind::PlainText => decode_text(bytes)
      , DocumentKind::Pdf => extract_pdf_text(bytes)
    }
}

fn decode_text(bytes: &[u8]) -> Result<String, crate::error::Error>
{   String::from_utf8(bytes.to_vec()).map_err(|e| {
      crate::error::Error::Document(
        format!("text file is not valid UTF-8: {}", e)
      )
    })
}

/// Page text is concatenated in page order
fn extract_pdf_text(bytes: &[u8]) -> Result<String, crate::error::Error>
{   pdf_extract::extract_text_from_mem(bytes).map_err(|e| {
      error!("PDF extraction failed: {}", e);
      crate::error::Error::Document(
        format!("could not extract PDF text: {}", e)
      )
    })
}
