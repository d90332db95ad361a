use ratatui::layout::Rect;

use crate::editor::{CursorPointer, DocumentEditor};
use crate::render::{CursorVisualPosition, RenderResult, render_document};
use crate::theme::Theme;

/// Visual state of the editing surface: where each caret position was drawn
/// on the last frame, the column vertical movement tries to keep, and the
/// viewport geometry. The editor itself lives in the document controller, so
/// every movement takes it by reference.
#[derive(Debug)]
pub struct EditorDisplay {
    visual_positions: Vec<CursorDisplay>,
    last_cursor_visual: Option<CursorVisualPosition>,
    preferred_column: Option<u16>,
    cursor_following: bool,
    last_view_height: usize,
    last_total_lines: usize,
    last_text_area: Rect,
}

impl Default for EditorDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl EditorDisplay {
    pub fn new() -> Self {
        Self {
            visual_positions: Vec::new(),
            last_cursor_visual: None,
            preferred_column: None,
            cursor_following: true,
            last_view_height: 1,
            last_total_lines: 0,
            last_text_area: Rect::default(),
        }
    }

    pub fn last_cursor_visual(&self) -> Option<CursorVisualPosition> {
        self.last_cursor_visual
    }

    /// Forget the remembered column, e.g. after horizontal movement or typing
    pub fn reset_preferred_column(&mut self) {
        self.preferred_column = None;
    }

    pub fn cursor_following(&self) -> bool {
        self.cursor_following
    }

    pub fn set_cursor_following(&mut self, following: bool) {
        self.cursor_following = following;
    }

    pub fn last_view_height(&self) -> usize {
        self.last_view_height
    }

    pub fn last_total_lines(&self) -> usize {
        self.last_total_lines
    }

    /// Drop positions from the previous document after switching documents
    pub fn clear(&mut self) {
        self.visual_positions.clear();
        self.last_cursor_visual = None;
        self.preferred_column = None;
        self.cursor_following = true;
    }

    /// Render the document at the given width and update internal state
    pub fn render(
        &mut self,
        editor: &DocumentEditor,
        wrap_width: usize,
        left_padding: usize,
        theme: &Theme,
    ) -> RenderResult {
        let result = render_document(editor, wrap_width, left_padding, theme);

        self.visual_positions = result
            .cursor_map
            .iter()
            .map(|(pointer, position)| CursorDisplay {
                pointer: *pointer,
                position: *position,
            })
            .collect();

        self.last_cursor_visual = result.cursor;
        if self.preferred_column.is_none() {
            self.preferred_column = result.cursor.map(|p| p.column);
        }

        result
    }

    /// Update tracking state after rendering (called from draw)
    pub fn update_after_render(&mut self, text_area: Rect, total_lines: usize) {
        self.last_text_area = text_area;
        self.last_total_lines = total_lines;
        self.last_view_height = (text_area.height as usize).max(1);
    }

    /// Move the caret by `delta` visual lines, keeping the preferred column.
    pub fn move_cursor_vertical(&mut self, editor: &mut DocumentEditor, delta: i32, extend: bool) {
        let logical = |editor: &mut DocumentEditor| {
            if delta < 0 {
                editor.move_up(extend)
            } else if delta > 0 {
                editor.move_down(extend)
            } else {
                false
            }
        };

        let pointer = editor.cursor_pointer();
        let current = self
            .visual_positions
            .iter()
            .find(|entry| entry.pointer == pointer)
            .map(|entry| entry.position)
            .or(self.last_cursor_visual);
        let Some(current) = current else {
            logical(editor);
            return;
        };

        let desired_column = self.preferred_column.unwrap_or(current.column);
        let max_line = self.max_line();
        let target_line = (current.line as i64 + delta as i64).clamp(0, max_line as i64) as usize;

        let destination = self
            .closest_pointer_on_line(target_line, desired_column)
            .or_else(|| self.search_nearest_line(target_line, delta, desired_column));

        match destination {
            Some(dest) if dest.pointer != pointer => {
                move_caret(editor, dest.pointer, extend);
                self.preferred_column = Some(desired_column);
                self.last_cursor_visual = Some(dest.position);
            }
            _ => {
                if logical(editor) {
                    self.preferred_column = None;
                }
            }
        }
    }

    /// Calculate the page jump distance based on viewport height
    pub fn page_jump_distance(&self) -> i32 {
        let viewport = self.last_view_height.max(1);
        let approx = ((viewport as f32) * 0.9).round() as usize;
        approx.max(1) as i32
    }

    /// Move by a page in the given direction (-1 for up, 1 for down)
    pub fn move_page(&mut self, editor: &mut DocumentEditor, direction: i32, extend: bool) {
        let distance = self.page_jump_distance();
        self.move_cursor_vertical(editor, distance * direction.signum(), extend);
    }

    /// Move the caret to the start of its visual line
    pub fn move_to_visual_line_start(&mut self, editor: &mut DocumentEditor, extend: bool) {
        self.move_to_visual_line_edge(editor, extend, false);
    }

    /// Move the caret to the end of its visual line
    pub fn move_to_visual_line_end(&mut self, editor: &mut DocumentEditor, extend: bool) {
        self.move_to_visual_line_edge(editor, extend, true);
    }

    fn move_to_visual_line_edge(&mut self, editor: &mut DocumentEditor, extend: bool, end: bool) {
        let pointer = editor.cursor_pointer();
        let line = self
            .visual_positions
            .iter()
            .find(|entry| entry.pointer == pointer)
            .map(|entry| entry.position.line)
            .or(self.last_cursor_visual.map(|position| position.line));
        let boundaries = line.and_then(|line| self.visual_line_boundaries(line));
        let Some((first, last)) = boundaries else {
            if end {
                editor.move_to_block_end(extend);
            } else {
                editor.move_to_block_start(extend);
            }
            return;
        };
        let target = if end { last } else { first };
        move_caret(editor, target.pointer, extend);
        self.last_cursor_visual = Some(target.position);
        self.preferred_column = Some(target.position.column);
    }

    fn max_line(&self) -> usize {
        self.visual_positions
            .iter()
            .map(|entry| entry.position.line)
            .max()
            .unwrap_or(0)
    }

    fn closest_pointer_on_line(&self, line: usize, column: u16) -> Option<CursorDisplay> {
        self.visual_positions
            .iter()
            .filter(|entry| entry.position.line == line)
            .min_by_key(|entry| column_distance(entry.position.column, column))
            .copied()
    }

    /// Search for the nearest line with content, starting from start_line and
    /// moving in delta direction
    fn search_nearest_line(
        &self,
        start_line: usize,
        delta: i32,
        column: u16,
    ) -> Option<CursorDisplay> {
        if delta == 0 {
            return None;
        }
        let max_line = self.max_line();
        let mut distance = 1usize;
        loop {
            let line = if delta < 0 {
                start_line.checked_sub(distance)?
            } else {
                let line = start_line + distance;
                if line > max_line {
                    return None;
                }
                line
            };
            if let Some(found) = self.closest_pointer_on_line(line, column) {
                return Some(found);
            }
            distance += 1;
        }
    }

    /// Find the closest pointer near a line (searching up and down if not found on exact line)
    fn closest_pointer_near_line(&self, line: usize, column: u16) -> Option<CursorDisplay> {
        if self.visual_positions.is_empty() {
            return None;
        }
        if let Some(hit) = self.closest_pointer_on_line(line, column) {
            return Some(hit);
        }
        let max_line = self.max_line();
        let mut distance = 1usize;
        while line.checked_sub(distance).is_some() || line + distance <= max_line {
            if let Some(prev) = line.checked_sub(distance)
                && let Some(hit) = self.closest_pointer_on_line(prev, column)
            {
                return Some(hit);
            }
            let next = line + distance;
            if next <= max_line
                && let Some(hit) = self.closest_pointer_on_line(next, column)
            {
                return Some(hit);
            }
            distance += 1;
        }
        None
    }

    /// Convert mouse coordinates to a cursor pointer
    pub fn pointer_from_mouse(
        &self,
        column: u16,
        row: u16,
        scroll_top: usize,
    ) -> Option<CursorDisplay> {
        let area = self.last_text_area;
        if area.width == 0 || area.height == 0 {
            return None;
        }
        let max_x = area.x.saturating_add(area.width);
        let max_y = area.y.saturating_add(area.height);
        if column < area.x || column >= max_x || row < area.y || row >= max_y {
            return None;
        }
        let line = scroll_top.saturating_add((row - area.y) as usize);
        let relative_column = column.saturating_sub(area.x);
        self.closest_pointer_near_line(line, relative_column)
    }

    /// Get the start and end boundaries of a visual line
    pub fn visual_line_boundaries(&self, line: usize) -> Option<(CursorDisplay, CursorDisplay)> {
        let mut entries: Vec<_> = self
            .visual_positions
            .iter()
            .filter(|entry| entry.position.line == line)
            .copied()
            .collect();
        entries.sort_by_key(|entry| (entry.position.column, entry.pointer.offset));
        Some((*entries.first()?, *entries.last()?))
    }

    /// Move the caret to a clicked position
    pub fn focus_display(
        &mut self,
        editor: &mut DocumentEditor,
        display: &CursorDisplay,
        extend: bool,
    ) {
        move_caret(editor, display.pointer, extend);
        self.last_cursor_visual = Some(display.position);
        self.preferred_column = Some(display.position.column);
        self.cursor_following = true;
    }
}

fn move_caret(editor: &mut DocumentEditor, pointer: CursorPointer, extend: bool) {
    if extend {
        let anchor = editor.selection().anchor;
        editor.set_selection(anchor, pointer);
    } else {
        editor.move_to_pointer(pointer);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CursorDisplay {
    pub pointer: CursorPointer,
    pub position: CursorVisualPosition,
}

fn column_distance(a: u16, b: u16) -> u16 {
    a.abs_diff(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(content: &str, width: usize) -> (EditorDisplay, DocumentEditor) {
        let editor = DocumentEditor::from_content(content);
        let mut display = EditorDisplay::new();
        let result = display.render(&editor, width, 0, &Theme::default());
        display.update_after_render(Rect::new(0, 0, width as u16, 10), result.total_lines);
        (display, editor)
    }

    fn rerender(display: &mut EditorDisplay, editor: &DocumentEditor, width: usize) {
        display.render(editor, width, 0, &Theme::default());
    }

    #[test]
    fn vertical_movement_follows_wrapped_lines() {
        let (mut display, mut editor) = rendered("<p>alpha beta gamma</p>", 10);
        editor.move_to_pointer(CursorPointer::new(0, 2));
        rerender(&mut display, &editor, 10);
        display.reset_preferred_column();

        display.move_cursor_vertical(&mut editor, 1, false);

        assert_eq!(editor.cursor_pointer(), CursorPointer::new(0, 13));
    }

    #[test]
    fn vertical_movement_skips_blank_separator_lines() {
        let (mut display, mut editor) = rendered("<p>one</p><p>two</p>", 40);

        display.move_cursor_vertical(&mut editor, 1, false);
        assert_eq!(editor.cursor_pointer(), CursorPointer::new(1, 0));

        rerender(&mut display, &editor, 40);
        display.move_cursor_vertical(&mut editor, -1, false);
        assert_eq!(editor.cursor_pointer(), CursorPointer::new(0, 0));
    }

    #[test]
    fn extending_vertical_movement_selects() {
        let (mut display, mut editor) = rendered("<p>one</p><p>two</p>", 40);

        display.move_cursor_vertical(&mut editor, 1, true);

        assert_eq!(
            editor.selection_range(),
            Some((CursorPointer::new(0, 0), CursorPointer::new(1, 0)))
        );
    }

    #[test]
    fn visual_line_edges() {
        let (mut display, mut editor) = rendered("<p>alpha beta gamma</p>", 10);
        editor.move_to_pointer(CursorPointer::new(0, 13));
        rerender(&mut display, &editor, 10);

        display.move_to_visual_line_start(&mut editor, false);
        assert_eq!(editor.cursor_pointer(), CursorPointer::new(0, 11));

        display.move_to_visual_line_end(&mut editor, false);
        assert_eq!(editor.cursor_pointer(), CursorPointer::new(0, 16));
    }

    #[test]
    fn mouse_maps_to_nearest_position() {
        let (display, _editor) = rendered("<p>one</p><p>two</p>", 40);

        let hit = display.pointer_from_mouse(30, 2, 0).unwrap();
        assert_eq!(hit.pointer, CursorPointer::new(1, 3));

        // Clicking the blank separator picks the closest line above.
        let hit = display.pointer_from_mouse(1, 1, 0).unwrap();
        assert_eq!(hit.pointer, CursorPointer::new(0, 1));

        assert!(display.pointer_from_mouse(50, 0, 0).is_none());
    }

    #[test]
    fn page_jump_is_ninety_percent_of_viewport() {
        let mut display = EditorDisplay::new();
        display.last_view_height = 20;
        assert_eq!(display.page_jump_distance(), 18);
    }
}
