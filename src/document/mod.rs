//! PDF collaborators: text extraction for uploads and rendering for summary downloads.

mod pdf;
mod render;

pub use pdf::{ExtractionError, extract_text, is_pdf_upload};
pub use render::{RenderError, render_summary_pdf};
