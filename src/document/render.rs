use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference};
use thiserror::Error;

const TITLE: &str = "Content Summary";
const PAGE_WIDTH: Mm = Mm(215.9);
const PAGE_HEIGHT: Mm = Mm(279.4);
const MARGIN_MM: f32 = 25.4;
const BOTTOM_MARGIN_MM: f32 = 6.35;
const TITLE_SIZE: f32 = 18.0;
const BODY_SIZE: f32 = 11.0;
const LINE_HEIGHT_MM: f32 = 5.5;
const TITLE_GAP_MM: f32 = 12.0;
const PARAGRAPH_GAP_MM: f32 = 2.5;
/// Helvetica at 11pt fits roughly this many characters between the side margins.
const WRAP_COLUMNS: usize = 85;

/// Failure while producing the summary PDF.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The PDF writer rejected the document.
    #[error("Failed to render summary PDF: {0}")]
    Pdf(String),
}

/// Greedy word wrap at `columns` characters. Words longer than a line are split.
fn wrap_line(paragraph: &str, columns: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in paragraph.split_whitespace() {
        let mut word = word.to_string();
        while word.chars().count() > columns {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let split = word
                .char_indices()
                .nth(columns)
                .map_or(word.len(), |(offset, _)| offset);
            let rest = word.split_off(split);
            lines.push(word);
            word = rest;
        }
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > columns && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Wrapped paragraphs of the summary, skipping blank ones.
fn layout_paragraphs(summary: &str, columns: usize) -> Vec<Vec<String>> {
    summary
        .lines()
        .filter(|paragraph| !paragraph.trim().is_empty())
        .map(|paragraph| wrap_line(paragraph, columns))
        .collect()
}

struct PageCursor {
    doc: PdfDocumentReference,
    layer: printpdf::PdfLayerReference,
    y: f32,
    pages: usize,
}

impl PageCursor {
    fn ensure_room(&mut self, needed: f32) {
        if self.y - needed >= BOTTOM_MARGIN_MM {
            return;
        }
        let (page, layer) = self.doc.add_page(PAGE_WIDTH, PAGE_HEIGHT, "Layer 1");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = PAGE_HEIGHT.0 - MARGIN_MM;
        self.pages += 1;
    }

    fn write(&mut self, text: &str, size: f32, font: &IndirectFontRef) {
        self.ensure_room(LINE_HEIGHT_MM);
        self.y -= LINE_HEIGHT_MM;
        self.layer
            .use_text(text, size, Mm(MARGIN_MM), Mm(self.y), font);
    }
}

/// Render `summary` as a titled, word-wrapped, paginated US Letter PDF.
pub fn render_summary_pdf(summary: &str) -> Result<Vec<u8>, RenderError> {
    let (doc, page, layer) = PdfDocument::new(TITLE, PAGE_WIDTH, PAGE_HEIGHT, "Layer 1");
    let title_font = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|error| RenderError::Pdf(error.to_string()))?;
    let body_font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|error| RenderError::Pdf(error.to_string()))?;

    let layer = doc.get_page(page).get_layer(layer);
    let mut cursor = PageCursor {
        doc,
        layer,
        y: PAGE_HEIGHT.0 - MARGIN_MM,
        pages: 1,
    };

    cursor.write(TITLE, TITLE_SIZE, &title_font);
    cursor.y -= TITLE_GAP_MM;

    for paragraph in layout_paragraphs(summary, WRAP_COLUMNS) {
        for line in &paragraph {
            cursor.write(line, BODY_SIZE, &body_font);
        }
        cursor.y -= PARAGRAPH_GAP_MM;
    }

    tracing::debug!(
        pages = cursor.pages,
        chars = summary.len(),
        "Rendered summary PDF"
    );
    cursor
        .doc
        .save_to_bytes()
        .map_err(|error| RenderError::Pdf(error.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrap_respects_column_limit() {
        let text = "lorem ipsum dolor sit amet ".repeat(20);
        let lines = wrap_line(&text, 30);
        assert!(lines.len() > 1);
        assert!(lines.iter().all(|line| line.chars().count() <= 30));
        assert_eq!(
            lines.join(" "),
            text.split_whitespace().collect::<Vec<_>>().join(" ")
        );
    }

    #[test]
    fn wrap_splits_overlong_words() {
        let lines = wrap_line("tiny abcdefghij", 4);
        assert_eq!(lines, vec!["tiny", "abcd", "efgh", "ij"]);
    }

    #[test]
    fn layout_skips_blank_paragraphs() {
        let paragraphs = layout_paragraphs("First para.\n\n   \nSecond para.", 80);
        assert_eq!(
            paragraphs,
            vec![vec!["First para.".to_string()], vec!["Second para.".to_string()]]
        );
    }

    #[test]
    fn rendered_document_is_a_pdf() {
        let bytes = render_summary_pdf("A short summary.\nWith two paragraphs.").expect("pdf");
        assert!(bytes.starts_with(b"%PDF-"));
    }

    #[test]
    fn long_summaries_paginate() {
        let summary = "This sentence pads the summary out. ".repeat(600);
        let bytes = render_summary_pdf(&summary).expect("pdf");
        assert!(bytes.starts_with(b"%PDF-"));
        let short = render_summary_pdf("Short.").expect("pdf");
        assert!(bytes.len() > short.len());
    }
}
