use super::content::{format_at, prune_and_merge_spans, spans_in_range, update_spans_in_range};
use super::DocumentEditor;
use crate::document::{Mark, Marks, Span};

impl DocumentEditor {
    /// Flips `mark` across the selection. When only part of the selection
    /// carries the mark, the whole selection gets it.
    pub fn toggle_mark(&mut self, mark: Mark) -> bool {
        if self.selection_range().is_none() {
            return false;
        }
        let flag = mark.flag();
        let enable = !self.active_marks().contains(flag);
        self.update_selected_spans(|span| span.marks.set(flag, enable))
    }

    /// Links the selected text to `href`, replacing any existing link, or
    /// removes links from the selection when `href` is `None`.
    pub fn set_link(&mut self, href: Option<&str>) -> bool {
        if self.selection_range().is_none() {
            return false;
        }
        let href = href.map(str::to_string);
        let mut changed = false;
        let updated = self.update_selected_spans(|span| {
            if span.link != href {
                span.link = href.clone();
                changed = true;
            }
        });
        updated && changed
    }

    /// Marks active on every run of the selection. With a collapsed
    /// selection these are the marks newly typed text would get.
    pub fn active_marks(&self) -> Marks {
        let Some(spans) = self.selected_spans() else {
            let caret = self.selection.head;
            let block = &self.document.blocks[caret.block];
            let (marks, link) = format_at(&block.content, caret.offset);
            return if link.is_some() {
                marks | Marks::LINK
            } else {
                marks
            };
        };
        let mut iter = spans.into_iter();
        let Some(first) = iter.next() else {
            return Marks::empty();
        };
        iter.fold(first.active_marks(), |acc, span| acc & span.active_marks())
    }

    /// The href shared by every run of the selection, if there is one.
    pub fn active_link(&self) -> Option<&str> {
        let spans = self.selected_spans()?;
        let first = spans.first()?.link.as_deref()?;
        spans
            .iter()
            .all(|span| span.link.as_deref() == Some(first))
            .then_some(first)
    }

    fn selected_spans(&self) -> Option<Vec<&Span>> {
        let (start, end) = self.selection_range()?;
        let mut spans = Vec::new();
        for idx in start.block..=end.block {
            let block = &self.document.blocks[idx];
            let from = if idx == start.block { start.offset } else { 0 };
            let to = if idx == end.block {
                end.offset
            } else {
                block.char_len()
            };
            spans.extend(spans_in_range(&block.content, from, to));
        }
        Some(spans)
    }

    fn update_selected_spans(&mut self, mut f: impl FnMut(&mut Span)) -> bool {
        let Some((start, end)) = self.selection_range() else {
            return false;
        };
        let mut visited = false;
        for idx in start.block..=end.block {
            let block = &mut self.document.blocks[idx];
            let from = if idx == start.block { start.offset } else { 0 };
            let to = if idx == end.block {
                end.offset
            } else {
                block.char_len()
            };
            if update_spans_in_range(&mut block.content, from, to, &mut f) {
                visited = true;
            }
            prune_and_merge_spans(&mut block.content);
        }
        visited
    }
}

pub fn marks_label(marks: Marks) -> String {
    let mut labels = Vec::new();
    for (flag, label) in [
        (Marks::BOLD, Mark::Bold.label()),
        (Marks::ITALIC, Mark::Italic.label()),
        (Marks::UNDERLINE, Mark::Underline.label()),
        (Marks::LINK, "Link"),
    ] {
        if marks.contains(flag) {
            labels.push(label);
        }
    }
    labels.join(" + ")
}
