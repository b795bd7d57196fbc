//! Assemble per-page OCR text into one document.
//!
//! Page text is appended verbatim so line breaks inside a page survive; only
//! the finished document is trimmed. Multi-page documents get a marker
//! before every page. Because of the final trim, the marker before page 1
//! loses its leading blank lines, so the full `"\n\n===== Page N =====\n\n"`
//! pattern occurs once per page boundary, before pages 2..=N.

/// Page-boundary marker inserted before page `page_num` (1-indexed).
pub fn page_marker(page_num: usize) -> String {
    format!("\n\n===== Page {page_num} =====\n\n")
}

/// Concatenate page texts in order.
///
/// A single page is returned trimmed and unmarked.
pub fn assemble<S: AsRef<str>>(page_texts: &[S]) -> String {
    let multi = page_texts.len() > 1;
    let mut out = String::with_capacity(page_texts.iter().map(|t| t.as_ref().len() + 32).sum());

    for (i, text) in page_texts.iter().enumerate() {
        if multi {
            out.push_str(&page_marker(i + 1));
        }
        out.push_str(text.as_ref());
    }

    out.trim().to_string()
}
