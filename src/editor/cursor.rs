use super::content::{next_word_boundary, previous_word_boundary};
use super::{CursorPointer, DocumentEditor, Selection};

impl DocumentEditor {
    /// Moves the caret to `head`. With `extend` the anchor stays put and the
    /// selection grows or shrinks; otherwise the selection collapses.
    fn place_head(&mut self, head: CursorPointer, extend: bool) -> bool {
        let head = self.clamp_pointer(head);
        let previous = self.selection;
        if extend {
            self.selection.head = head;
        } else {
            self.selection = Selection::caret(head);
        }
        self.selection != previous
    }

    pub fn move_left(&mut self, extend: bool) -> bool {
        if !extend {
            if let Some((start, _)) = self.selection_range() {
                return self.place_head(start, false);
            }
        }
        let head = self.selection.head;
        let target = if head.offset > 0 {
            CursorPointer::new(head.block, head.offset - 1)
        } else if head.block > 0 {
            CursorPointer::new(head.block - 1, self.block_len(head.block - 1))
        } else {
            return false;
        };
        self.place_head(target, extend)
    }

    pub fn move_right(&mut self, extend: bool) -> bool {
        if !extend {
            if let Some((_, end)) = self.selection_range() {
                return self.place_head(end, false);
            }
        }
        let head = self.selection.head;
        let target = if head.offset < self.block_len(head.block) {
            CursorPointer::new(head.block, head.offset + 1)
        } else if head.block + 1 < self.document.blocks.len() {
            CursorPointer::new(head.block + 1, 0)
        } else {
            return false;
        };
        self.place_head(target, extend)
    }

    pub fn move_up(&mut self, extend: bool) -> bool {
        let head = self.selection.head;
        if head.block == 0 {
            return self.place_head(CursorPointer::new(0, 0), extend);
        }
        self.place_head(CursorPointer::new(head.block - 1, head.offset), extend)
    }

    pub fn move_down(&mut self, extend: bool) -> bool {
        let head = self.selection.head;
        let last = self.document.blocks.len() - 1;
        if head.block >= last {
            return self.place_head(CursorPointer::new(last, self.block_len(last)), extend);
        }
        self.place_head(CursorPointer::new(head.block + 1, head.offset), extend)
    }

    pub fn move_word_left(&mut self, extend: bool) -> bool {
        let head = self.selection.head;
        if head.offset == 0 {
            return self.move_left(extend);
        }
        let text = self.document.blocks[head.block].plain_text();
        let offset = previous_word_boundary(&text, head.offset);
        self.place_head(CursorPointer::new(head.block, offset), extend)
    }

    pub fn move_word_right(&mut self, extend: bool) -> bool {
        let head = self.selection.head;
        if head.offset >= self.block_len(head.block) {
            return self.move_right(extend);
        }
        let text = self.document.blocks[head.block].plain_text();
        let offset = next_word_boundary(&text, head.offset);
        self.place_head(CursorPointer::new(head.block, offset), extend)
    }

    pub fn move_to_block_start(&mut self, extend: bool) -> bool {
        let head = self.selection.head;
        self.place_head(CursorPointer::new(head.block, 0), extend)
    }

    pub fn move_to_block_end(&mut self, extend: bool) -> bool {
        let head = self.selection.head;
        self.place_head(
            CursorPointer::new(head.block, self.block_len(head.block)),
            extend,
        )
    }

    pub fn move_to_document_start(&mut self, extend: bool) -> bool {
        self.place_head(CursorPointer::default(), extend)
    }

    pub fn move_to_document_end(&mut self, extend: bool) -> bool {
        let last = self.document.blocks.len() - 1;
        self.place_head(CursorPointer::new(last, self.block_len(last)), extend)
    }
}
