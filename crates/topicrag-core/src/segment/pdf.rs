use lopdf::Document;
use tracing::warn;

/// Extract text from a PDF, one string per page in page order.
///
/// Unreadable documents yield an empty list. A page whose text cannot be
/// extracted is skipped and the remaining pages are still returned.
pub fn extract_pages(bytes: &[u8]) -> Vec<String> {
    let doc = match Document::load_mem(bytes) {
        Ok(doc) => doc,
        Err(e) => {
            warn!(error = %e, "pdf could not be loaded");
            return Vec::new();
        }
    };
    let mut pages = Vec::new();
    for page_number in doc.get_pages().keys() {
        match doc.extract_text(&[*page_number]) {
            Ok(text) => pages.push(text),
            Err(e) => warn!(page = page_number, error = %e, "skipping pdf page"),
        }
    }
    pages
}
