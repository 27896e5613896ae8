//! Fixed-size character windows with overlap, pulled back to natural
//! boundaries.

use std::ops::Range;

fn is_boundary(c: char) -> bool {
    matches!(c, '.' | '!' | '?' | '\n')
}

/// Character ranges covering `text` with `overlap` characters shared between
/// consecutive windows.
///
/// A window that would end mid-text is pulled back to just after the last
/// sentence terminator or newline it contains, as long as that still leaves
/// the next window starting strictly after the current one. Requires
/// `0 < overlap < chunk_size`.
pub fn window_spans(chars: &[char], chunk_size: usize, overlap: usize) -> Vec<Range<usize>> {
    debug_assert!(overlap > 0 && overlap < chunk_size);
    let len = chars.len();
    let mut spans = Vec::new();
    let mut start = 0usize;
    while start < len {
        let mut end = (start + chunk_size).min(len);
        if end < len {
            // p + 1 - overlap must exceed start so the loop always advances
            let lowest = start + overlap;
            if let Some(p) = (lowest..end).rev().find(|&i| is_boundary(chars[i])) {
                end = p + 1;
            }
        }
        spans.push(start..end);
        if end >= len {
            break;
        }
        start = end - overlap;
    }
    spans
}

/// Window `text` and return the non-blank windows as owned strings.
pub fn split_windows(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    window_spans(&chars, chunk_size, overlap)
        .into_iter()
        .map(|r| chars[r].iter().collect::<String>())
        .filter(|w| !w.trim().is_empty())
        .collect()
}
