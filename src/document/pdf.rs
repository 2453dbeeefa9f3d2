use thiserror::Error;

const PDF_MAGIC: &[u8] = b"%PDF-";

/// Failure while pulling text out of an uploaded PDF.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The PDF parser rejected the document.
    #[error("Error extracting PDF text: {0}")]
    Pdf(String),
}

/// Whether an upload looks like a PDF by both its name and its leading bytes.
pub fn is_pdf_upload(filename: &str, bytes: &[u8]) -> bool {
    filename.to_ascii_lowercase().ends_with(".pdf") && bytes.starts_with(PDF_MAGIC)
}

/// Extract the text layer of a PDF held in memory.
///
/// Pages are separated by newlines. Blocking; run it off the async executor.
pub fn extract_text(bytes: &[u8]) -> Result<String, ExtractionError> {
    let text = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|error| ExtractionError::Pdf(error.to_string()))?;

    // pdf-extract marks page breaks with form feeds.
    let text = text.replace('\x0C', "\n");
    let trimmed = text.trim();
    tracing::debug!(
        bytes = bytes.len(),
        chars = trimmed.len(),
        "Extracted PDF text"
    );
    Ok(trimmed.to_string())
}
