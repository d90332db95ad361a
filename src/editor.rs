use std::cmp::Ordering;

use crate::document::{Alignment, Block, BlockKind, Document};
use crate::markup;

use content::{insert_text_at, remove_range, spans_char_len, take_tail};

mod content;
mod cursor;
mod styles;

pub(crate) use content::prune_and_merge_spans;
pub use styles::marks_label;
pub use content::{
    char_to_byte_idx, next_word_boundary, previous_word_boundary, word_end_boundary,
    word_start_boundary,
};

/// A caret position: block index plus char offset into the block's text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct CursorPointer {
    pub block: usize,
    pub offset: usize,
}

impl CursorPointer {
    pub fn new(block: usize, offset: usize) -> Self {
        Self { block, offset }
    }
}

impl PartialOrd for CursorPointer {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CursorPointer {
    fn cmp(&self, other: &Self) -> Ordering {
        self.block
            .cmp(&other.block)
            .then(self.offset.cmp(&other.offset))
    }
}

/// The selection is the range between `anchor` (where it started) and
/// `head` (where the caret is). Both are equal when the selection is collapsed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    pub anchor: CursorPointer,
    pub head: CursorPointer,
}

impl Selection {
    pub fn caret(pointer: CursorPointer) -> Self {
        Self {
            anchor: pointer,
            head: pointer,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.head
    }

    /// Start and end in document order.
    pub fn ordered(&self) -> (CursorPointer, CursorPointer) {
        if self.anchor <= self.head {
            (self.anchor, self.head)
        } else {
            (self.head, self.anchor)
        }
    }
}

/// The in-memory model of the document open in the editor.
///
/// Every change goes through a command method; each returns whether the
/// document or selection changed, and commands that have nothing to act on
/// are no-ops returning `false`.
pub struct DocumentEditor {
    document: Document,
    selection: Selection,
}

impl DocumentEditor {
    pub fn new(mut document: Document) -> Self {
        document.ensure_initialized();
        Self {
            document,
            selection: Selection::default(),
        }
    }

    pub fn from_content(serialized: &str) -> Self {
        Self::new(markup::parse(serialized))
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Replaces the whole tree with the parsed `serialized` markup and puts
    /// the caret at the start.
    pub fn load_content(&mut self, serialized: &str) {
        self.document = markup::parse(serialized);
        self.selection = Selection::default();
        tracing::debug!(
            blocks = self.document.blocks.len(),
            bytes = serialized.len(),
            "loaded document content"
        );
    }

    pub fn serialize(&self) -> String {
        markup::write(&self.document)
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn cursor_pointer(&self) -> CursorPointer {
        self.selection.head
    }

    pub fn has_selection(&self) -> bool {
        !self.selection.is_collapsed()
    }

    /// Whether the selection covers at least one character. A range that only
    /// crosses a block boundary does not.
    pub fn selects_text(&self) -> bool {
        let Some((start, end)) = self.selection_range() else {
            return false;
        };
        if start.block == end.block {
            return start.offset < end.offset;
        }
        start.offset < self.block_len(start.block)
            || end.offset > 0
            || (start.block + 1..end.block).any(|idx| self.block_len(idx) > 0)
    }

    /// The ordered selection range, or `None` when the selection is collapsed.
    pub fn selection_range(&self) -> Option<(CursorPointer, CursorPointer)> {
        if self.selection.is_collapsed() {
            None
        } else {
            Some(self.selection.ordered())
        }
    }

    pub fn set_selection(&mut self, anchor: CursorPointer, head: CursorPointer) -> bool {
        let selection = Selection {
            anchor: self.clamp_pointer(anchor),
            head: self.clamp_pointer(head),
        };
        let changed = selection != self.selection;
        self.selection = selection;
        changed
    }

    pub fn move_to_pointer(&mut self, pointer: CursorPointer) -> bool {
        self.set_selection(pointer, pointer)
    }

    pub fn select_all(&mut self) -> bool {
        let last = self.document.blocks.len() - 1;
        let end = CursorPointer::new(last, self.block_len(last));
        self.set_selection(CursorPointer::default(), end)
    }

    pub fn collapse_selection(&mut self) -> bool {
        if self.selection.is_collapsed() {
            return false;
        }
        self.selection.anchor = self.selection.head;
        true
    }

    pub fn select_word_at_cursor(&mut self) -> bool {
        let head = self.selection.head;
        let text = self.document.blocks[head.block].plain_text();
        let start = word_start_boundary(&text, head.offset);
        let end = word_end_boundary(&text, head.offset);
        if start >= end {
            return false;
        }
        self.set_selection(
            CursorPointer::new(head.block, start),
            CursorPointer::new(head.block, end),
        )
    }

    pub(crate) fn block_len(&self, block: usize) -> usize {
        self.document
            .blocks
            .get(block)
            .map(Block::char_len)
            .unwrap_or(0)
    }

    fn clamp_pointer(&self, pointer: CursorPointer) -> CursorPointer {
        let block = pointer.block.min(self.document.blocks.len() - 1);
        CursorPointer::new(block, pointer.offset.min(self.block_len(block)))
    }

    /// Indices of the blocks the selection touches; the caret's block when collapsed.
    pub(crate) fn selected_block_range(&self) -> std::ops::RangeInclusive<usize> {
        let (start, end) = self.selection.ordered();
        start.block..=end.block
    }

    pub fn current_block_kind(&self) -> BlockKind {
        self.document.blocks[self.selection.head.block].kind
    }

    pub fn current_alignment(&self) -> Alignment {
        self.document.blocks[self.selection.head.block].alignment
    }

    pub fn set_block_kind(&mut self, kind: BlockKind) -> bool {
        let mut changed = false;
        for idx in self.selected_block_range() {
            let block = &mut self.document.blocks[idx];
            if block.kind != kind {
                block.kind = kind;
                changed = true;
            }
        }
        changed
    }

    pub fn set_block_alignment(&mut self, alignment: Alignment) -> bool {
        let mut changed = false;
        for idx in self.selected_block_range() {
            let block = &mut self.document.blocks[idx];
            if block.alignment != alignment {
                block.alignment = alignment;
                changed = true;
            }
        }
        changed
    }

    /// Removes the selected text, joining the first and last touched blocks.
    pub fn delete_selection(&mut self) -> bool {
        let Some((start, end)) = self.selection_range() else {
            return false;
        };
        if start.block == end.block {
            let block = &mut self.document.blocks[start.block];
            remove_range(&mut block.content, start.offset, end.offset);
        } else {
            let mut tail = {
                let last = &mut self.document.blocks[end.block];
                take_tail(&mut last.content, end.offset)
            };
            self.document.blocks.drain(start.block + 1..=end.block);
            let first = &mut self.document.blocks[start.block];
            let len = spans_char_len(&first.content);
            remove_range(&mut first.content, start.offset, len);
            first.content.append(&mut tail);
            prune_and_merge_spans(&mut first.content);
        }
        self.selection = Selection::caret(start);
        true
    }

    pub fn insert_char(&mut self, ch: char) -> bool {
        if ch == '\n' || ch == '\r' {
            return self.insert_paragraph_break();
        }
        if ch.is_control() {
            return false;
        }
        let mut buf = [0u8; 4];
        self.insert_text(ch.encode_utf8(&mut buf))
    }

    /// Inserts text at the caret, replacing a non-collapsed selection. Line
    /// breaks in `text` become paragraph breaks.
    pub fn insert_text(&mut self, text: &str) -> bool {
        let mut changed = self.delete_selection();
        for (idx, line) in text.split('\n').enumerate() {
            if idx > 0 {
                changed |= self.insert_paragraph_break();
            }
            let line: String = line.chars().filter(|ch| !ch.is_control()).collect();
            if line.is_empty() {
                continue;
            }
            let caret = self.selection.head;
            let block = &mut self.document.blocks[caret.block];
            if insert_text_at(&mut block.content, caret.offset, &line) {
                let caret = CursorPointer::new(caret.block, caret.offset + line.chars().count());
                self.selection = Selection::caret(caret);
                changed = true;
            }
        }
        changed
    }

    /// Splits the caret's block in two. Breaking at the end of a heading
    /// continues with a plain paragraph.
    pub fn insert_paragraph_break(&mut self) -> bool {
        self.delete_selection();
        let caret = self.selection.head;
        let block = &mut self.document.blocks[caret.block];
        let at_end = caret.offset >= block.char_len();
        let tail = take_tail(&mut block.content, caret.offset);
        let kind = if at_end && block.kind != BlockKind::Paragraph {
            BlockKind::Paragraph
        } else {
            block.kind
        };
        let new_block = Block {
            kind,
            alignment: block.alignment,
            content: tail,
        };
        self.document.blocks.insert(caret.block + 1, new_block);
        self.selection = Selection::caret(CursorPointer::new(caret.block + 1, 0));
        true
    }

    pub fn backspace(&mut self) -> bool {
        if self.delete_selection() {
            return true;
        }
        let caret = self.selection.head;
        if caret.offset > 0 {
            let block = &mut self.document.blocks[caret.block];
            if remove_range(&mut block.content, caret.offset - 1, caret.offset) {
                self.selection =
                    Selection::caret(CursorPointer::new(caret.block, caret.offset - 1));
                return true;
            }
            return false;
        }
        if caret.block == 0 {
            return false;
        }
        let previous_len = self.block_len(caret.block - 1);
        self.join_with_next(caret.block - 1);
        self.selection = Selection::caret(CursorPointer::new(caret.block - 1, previous_len));
        true
    }

    pub fn delete(&mut self) -> bool {
        if self.delete_selection() {
            return true;
        }
        let caret = self.selection.head;
        if caret.offset < self.block_len(caret.block) {
            let block = &mut self.document.blocks[caret.block];
            return remove_range(&mut block.content, caret.offset, caret.offset + 1);
        }
        if caret.block + 1 >= self.document.blocks.len() {
            return false;
        }
        self.join_with_next(caret.block);
        true
    }

    fn join_with_next(&mut self, index: usize) {
        let next = self.document.blocks.remove(index + 1);
        let block = &mut self.document.blocks[index];
        if block.is_empty() {
            // Joining into an empty block adopts the next block's formatting.
            *block = next;
        } else {
            block.content.extend(next.content);
        }
        prune_and_merge_spans(&mut block.content);
    }
}

impl Default for DocumentEditor {
    fn default() -> Self {
        Self::new(Document::new())
    }
}

#[cfg(test)]
#[path = "editor_tests.rs"]
mod editor_tests;


#[cfg(test)]
#[path = "editor/content_tests.rs"]
mod content_tests;

#[cfg(test)]
#[path = "editor/style_tests.rs"]
mod style_tests;
