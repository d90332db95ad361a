use crate::document::{Marks, Span};

pub fn char_to_byte_idx(text: &str, char_idx: usize) -> usize {
    if char_idx == 0 {
        return 0;
    }
    for (count, (byte_idx, _)) in text.char_indices().enumerate() {
        if count == char_idx {
            return byte_idx;
        }
    }
    text.len()
}

pub(crate) fn split_text(text: &str, offset: usize) -> (String, String) {
    let byte_idx = char_to_byte_idx(text, offset);
    let left = text[..byte_idx].to_string();
    let right = text[byte_idx..].to_string();
    (left, right)
}

pub(crate) fn spans_char_len(spans: &[Span]) -> usize {
    spans.iter().map(Span::char_len).sum()
}

/// Makes sure a span boundary exists at `offset` and returns the index of the
/// first span starting at or after it.
pub(crate) fn split_spans_at(spans: &mut Vec<Span>, offset: usize) -> usize {
    let mut start = 0;
    for idx in 0..spans.len() {
        if offset == start {
            return idx;
        }
        let len = spans[idx].char_len();
        if offset < start + len {
            let (left, right) = split_text(&spans[idx].text, offset - start);
            let mut tail = spans[idx].clone();
            tail.text = right;
            spans[idx].text = left;
            spans.insert(idx + 1, tail);
            return idx + 1;
        }
        start += len;
    }
    spans.len()
}

/// Runs `f` on every span covering the char range `start..end`, splitting
/// spans at the range edges first. Returns whether any span was visited.
pub(crate) fn update_spans_in_range(
    spans: &mut Vec<Span>,
    start: usize,
    end: usize,
    mut f: impl FnMut(&mut Span),
) -> bool {
    if start >= end {
        return false;
    }
    let first = split_spans_at(spans, start);
    let last = split_spans_at(spans, end);
    let mut visited = false;
    for span in &mut spans[first..last] {
        if span.text.is_empty() {
            continue;
        }
        f(span);
        visited = true;
    }
    visited
}

/// Formatting of the spans covering `start..end`, skipping empty runs.
pub(crate) fn spans_in_range(spans: &[Span], start: usize, end: usize) -> Vec<&Span> {
    let mut result = Vec::new();
    let mut pos = 0;
    for span in spans {
        let len = span.char_len();
        let span_end = pos + len;
        if len > 0 && span_end > start && pos < end {
            result.push(span);
        }
        pos = span_end;
        if pos >= end {
            break;
        }
    }
    result
}

/// The formatting new text typed at `offset` picks up: the marks of the run
/// left of the cursor, and its link only while the cursor is inside it.
pub(crate) fn format_at(spans: &[Span], offset: usize) -> (Marks, Option<String>) {
    let mut pos = 0;
    let mut fallback = None;
    for span in spans {
        let len = span.char_len();
        if len == 0 {
            continue;
        }
        if fallback.is_none() {
            fallback = Some(span);
        }
        let span_end = pos + len;
        if offset > pos && offset <= span_end {
            let link = if offset < span_end {
                span.link.clone()
            } else {
                None
            };
            return (span.marks, link);
        }
        pos = span_end;
    }
    match fallback {
        Some(span) if offset == 0 => (span.marks, None),
        _ => (Marks::empty(), None),
    }
}

pub(crate) fn insert_text_at(spans: &mut Vec<Span>, offset: usize, text: &str) -> bool {
    if text.is_empty() {
        return false;
    }
    let (marks, link) = format_at(spans, offset);
    let idx = split_spans_at(spans, offset);
    spans.insert(
        idx,
        Span {
            text: text.to_string(),
            marks,
            link,
        },
    );
    prune_and_merge_spans(spans);
    true
}

/// Removes the char range `start..end` and returns whether anything changed.
pub(crate) fn remove_range(spans: &mut Vec<Span>, start: usize, end: usize) -> bool {
    if start >= end {
        return false;
    }
    let first = split_spans_at(spans, start);
    let last = split_spans_at(spans, end);
    if first >= last {
        return false;
    }
    spans.drain(first..last);
    prune_and_merge_spans(spans);
    true
}

/// Splits the spans at `offset`, keeping the head in place and returning the tail.
pub(crate) fn take_tail(spans: &mut Vec<Span>, offset: usize) -> Vec<Span> {
    let idx = split_spans_at(spans, offset);
    let tail = spans.split_off(idx);
    prune_and_merge_spans(spans);
    tail
}

pub(crate) fn prune_and_merge_spans(spans: &mut Vec<Span>) {
    spans.retain(|span| !span.text.is_empty());

    let mut i = 0;
    while i + 1 < spans.len() {
        if spans[i].same_format(&spans[i + 1]) {
            let right = spans.remove(i + 1);
            spans[i].text.push_str(&right.text);
        } else {
            i += 1;
        }
    }
}

pub(crate) fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

pub fn previous_word_boundary(text: &str, offset: usize) -> usize {
    let chars: Vec<char> = text.chars().collect();
    let mut idx = offset.min(chars.len());
    if idx == 0 {
        return 0;
    }

    while idx > 0 && chars[idx - 1].is_whitespace() {
        idx -= 1;
    }
    if idx == 0 {
        return 0;
    }

    while idx > 0 && is_word_char(chars[idx - 1]) {
        idx -= 1;
    }
    if idx > 0 && !is_word_char(chars[idx - 1]) && !chars[idx - 1].is_whitespace() {
        while idx > 0 && !is_word_char(chars[idx - 1]) && !chars[idx - 1].is_whitespace() {
            idx -= 1;
        }
    }
    idx
}

pub fn next_word_boundary(text: &str, offset: usize) -> usize {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    let mut idx = offset.min(len);
    if idx >= len {
        return len;
    }

    if chars[idx].is_whitespace() {
        while idx < len && chars[idx].is_whitespace() {
            idx += 1;
        }
        return idx;
    }

    if is_word_char(chars[idx]) {
        while idx < len && is_word_char(chars[idx]) {
            idx += 1;
        }
        while idx < len && !chars[idx].is_whitespace() && !is_word_char(chars[idx]) {
            idx += 1;
        }
        while idx < len && chars[idx].is_whitespace() {
            idx += 1;
        }
        return idx;
    }

    while idx < len && !chars[idx].is_whitespace() && !is_word_char(chars[idx]) {
        idx += 1;
    }
    while idx < len && chars[idx].is_whitespace() {
        idx += 1;
    }
    idx
}

/// Find the start of the word at the given offset (for word selection).
pub fn word_start_boundary(text: &str, offset: usize) -> usize {
    let chars: Vec<char> = text.chars().collect();
    let mut idx = offset.min(chars.len());
    if idx == 0 {
        return 0;
    }

    if idx < chars.len() && chars[idx].is_whitespace() {
        while idx > 0 && chars[idx - 1].is_whitespace() {
            idx -= 1;
        }
        if idx == 0 {
            return 0;
        }
    }

    let check_idx = if idx < chars.len() { idx } else { idx - 1 };

    if is_word_char(chars[check_idx]) {
        while idx > 0 && is_word_char(chars[idx - 1]) {
            idx -= 1;
        }
        return idx;
    }

    if !chars[check_idx].is_whitespace() {
        while idx > 0 && !chars[idx - 1].is_whitespace() && !is_word_char(chars[idx - 1]) {
            idx -= 1;
        }
    }
    idx
}

/// Find the end of the word at the given offset (for word selection).
pub fn word_end_boundary(text: &str, offset: usize) -> usize {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    let mut idx = offset.min(len);
    if idx >= len {
        return len;
    }

    if chars[idx].is_whitespace() {
        while idx < len && chars[idx].is_whitespace() {
            idx += 1;
        }
        if idx >= len {
            return len;
        }
    }

    if is_word_char(chars[idx]) {
        while idx < len && is_word_char(chars[idx]) {
            idx += 1;
        }
        return idx;
    }

    while idx < len && !chars[idx].is_whitespace() && !is_word_char(chars[idx]) {
        idx += 1;
    }
    idx
}
