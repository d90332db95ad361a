use ratatui::{
    style::{Modifier, Style},
    text::{Line, Span},
};
use unicode_width::UnicodeWidthChar;

use crate::document::{Alignment, Block, BlockKind, Marks, Span as DocSpan};
use crate::editor::{CursorPointer, DocumentEditor};
use crate::theme::Theme;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CursorVisualPosition {
    pub line: usize,
    pub column: u16,
}

#[derive(Debug)]
pub struct RenderResult {
    pub lines: Vec<Line<'static>>,
    pub cursor: Option<CursorVisualPosition>,
    pub total_lines: usize,
    /// Every addressable caret position and where it was drawn.
    pub cursor_map: Vec<(CursorPointer, CursorVisualPosition)>,
}

/// Lays out the editor's document as wrapped terminal lines, highlighting the
/// current selection and recording where every caret position ends up.
pub fn render_document(
    editor: &DocumentEditor,
    wrap_width: usize,
    left_padding: usize,
    theme: &Theme,
) -> RenderResult {
    let mut renderer = Renderer::new(editor, wrap_width.max(1), left_padding, theme);
    renderer.render_document(editor);
    renderer.finish()
}

struct Renderer<'a> {
    wrap_width: usize,
    left_padding: usize,
    theme: &'a Theme,
    caret: CursorPointer,
    selection: Option<(CursorPointer, CursorPointer)>,
    cursor: Option<CursorVisualPosition>,
    cursor_map: Vec<(CursorPointer, CursorVisualPosition)>,
    lines: Vec<Line<'static>>,
}

impl<'a> Renderer<'a> {
    fn new(
        editor: &DocumentEditor,
        wrap_width: usize,
        left_padding: usize,
        theme: &'a Theme,
    ) -> Self {
        Self {
            wrap_width,
            left_padding,
            theme,
            caret: editor.cursor_pointer(),
            selection: editor.selection_range(),
            cursor: None,
            cursor_map: Vec::new(),
            lines: Vec::new(),
        }
    }

    fn render_document(&mut self, editor: &DocumentEditor) {
        for (idx, block) in editor.document().blocks.iter().enumerate() {
            if idx > 0 {
                self.lines.push(Line::from(""));
            }
            self.render_block(idx, block);
        }
    }

    fn render_block(&mut self, index: usize, block: &Block) {
        let fragments = self.collect_fragments(index, block);
        let mut lines = wrap_fragments(&fragments, self.wrap_width);

        if block.kind != BlockKind::Paragraph {
            for line in &mut lines {
                for segment in &mut line.spans {
                    segment.style = segment.style.add_modifier(Modifier::BOLD);
                }
            }
        }

        let last = self.consume_lines(index, lines, block.alignment);

        let underline_char = match block.kind {
            BlockKind::Heading1 => Some('='),
            BlockKind::Heading2 => Some('-'),
            BlockKind::Heading3 | BlockKind::Paragraph => None,
        };
        if let (Some(ch), Some((indent, width))) = (underline_char, last) {
            let lead = " ".repeat(self.left_padding + indent);
            let rule: String = std::iter::repeat_n(ch, width.max(1)).collect();
            self.lines.push(Line::from(vec![
                Span::raw(lead),
                Span::styled(rule, Style::default().add_modifier(Modifier::BOLD)),
            ]));
        }
    }

    fn collect_fragments(&self, index: usize, block: &Block) -> Vec<Fragment> {
        let mut collector = FragmentCollector::default();
        let mut offset = 0;
        for span in &block.content {
            let base = self.span_style(span);
            for ch in span.text.chars() {
                self.mark_position(&mut collector, index, offset);
                let style = if self.is_selected(index, offset) {
                    base.patch(self.theme.selection_style())
                } else {
                    base
                };
                collector.push_char(ch, style);
                offset += 1;
            }
        }
        self.mark_position(&mut collector, index, offset);
        collector.finish()
    }

    fn mark_position(&self, collector: &mut FragmentCollector, block: usize, offset: usize) {
        collector.push_event(TextEventKind::Position(offset));
        if self.caret == CursorPointer::new(block, offset) {
            collector.push_event(TextEventKind::Caret);
        }
    }

    fn span_style(&self, span: &DocSpan) -> Style {
        let mut style = Style::default();
        if span.marks.contains(Marks::BOLD) {
            style = style.add_modifier(Modifier::BOLD);
        }
        if span.marks.contains(Marks::ITALIC) {
            style = style.add_modifier(Modifier::ITALIC);
        }
        if span.marks.contains(Marks::UNDERLINE) {
            style = style.add_modifier(Modifier::UNDERLINED);
        }
        if span.link.is_some() {
            style = style.patch(self.theme.link_style());
        }
        style
    }

    fn is_selected(&self, block: usize, offset: usize) -> bool {
        let pointer = CursorPointer::new(block, offset);
        self.selection
            .is_some_and(|(start, end)| start <= pointer && pointer < end)
    }

    /// Pushes the wrapped lines of one block. Returns the indent and content
    /// width of the last line.
    fn consume_lines(
        &mut self,
        block: usize,
        outputs: Vec<LineOutput>,
        alignment: Alignment,
    ) -> Option<(usize, usize)> {
        let mut last = None;
        for output in outputs {
            let indent = match alignment {
                Alignment::Left => 0,
                Alignment::Center => self.wrap_width.saturating_sub(output.width) / 2,
                Alignment::Right => self.wrap_width.saturating_sub(output.width),
            };
            let lead = self.left_padding + indent;

            let mut spans: Vec<Span<'static>> = Vec::with_capacity(output.spans.len() + 1);
            if lead > 0 {
                spans.push(Span::raw(" ".repeat(lead)));
            }
            for segment in output.spans {
                spans.push(Span::styled(segment.text, segment.style));
            }

            let line = self.lines.len();
            for event in output.events {
                let position = CursorVisualPosition {
                    line,
                    column: (lead + event.column) as u16,
                };
                match event.kind {
                    TextEventKind::Caret => self.cursor = Some(position),
                    TextEventKind::Position(offset) => self
                        .cursor_map
                        .push((CursorPointer::new(block, offset), position)),
                }
            }

            self.lines.push(Line::from(spans));
            last = Some((indent, output.width));
        }
        last
    }

    fn finish(mut self) -> RenderResult {
        if self.lines.is_empty() {
            self.lines.push(Line::from(""));
        }
        let total_lines = self.lines.len();
        RenderResult {
            lines: self.lines,
            cursor: self.cursor,
            total_lines,
            cursor_map: self.cursor_map,
        }
    }
}

#[derive(Clone, Debug)]
struct LineSegment {
    text: String,
    style: Style,
}

struct LineOutput {
    spans: Vec<LineSegment>,
    events: Vec<LocatedEvent>,
    width: usize,
}

#[derive(Clone, Copy)]
struct LocatedEvent {
    column: usize,
    kind: TextEventKind,
}

#[derive(Clone)]
struct Fragment {
    segments: Vec<LineSegment>,
    kind: FragmentKind,
    width: usize,
    events: Vec<TextEvent>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum FragmentKind {
    Word,
    Whitespace,
}

#[derive(Clone, Copy)]
struct TextEvent {
    offset: usize,
    kind: TextEventKind,
}

#[derive(Clone, Copy)]
enum TextEventKind {
    Position(usize),
    Caret,
}

/// Splits a block's characters into word and whitespace tokens. Events that
/// precede a character travel with the token that character starts.
#[derive(Default)]
struct FragmentCollector {
    fragments: Vec<Fragment>,
    builder: Option<TokenBuilder>,
    pending: Vec<TextEvent>,
}

impl FragmentCollector {
    fn push_event(&mut self, kind: TextEventKind) {
        self.pending.push(TextEvent { offset: 0, kind });
    }

    fn push_char(&mut self, ch: char, style: Style) {
        let is_whitespace = ch.is_whitespace();
        let continues = self
            .builder
            .as_ref()
            .is_some_and(|existing| existing.kind_matches(is_whitespace));
        if !continues {
            if let Some(existing) = self.builder.take() {
                self.fragments.push(existing.finish());
            }
            self.builder = Some(TokenBuilder::new(is_whitespace));
        }
        if let Some(current) = self.builder.as_mut() {
            current.add_events(&mut self.pending);
            current.push_char(ch, style);
        }
    }

    fn finish(mut self) -> Vec<Fragment> {
        if let Some(mut token) = self.builder.take() {
            token.add_events(&mut self.pending);
            self.fragments.push(token.finish());
        } else if !self.pending.is_empty() {
            self.fragments.push(Fragment {
                segments: Vec::new(),
                kind: FragmentKind::Word,
                width: 0,
                events: std::mem::take(&mut self.pending),
            });
        }
        self.fragments
    }
}

struct TokenBuilder {
    segments: Vec<LineSegment>,
    kind: FragmentKind,
    width: usize,
    events: Vec<TextEvent>,
}

impl TokenBuilder {
    fn new(is_whitespace: bool) -> Self {
        Self {
            segments: Vec::new(),
            kind: if is_whitespace {
                FragmentKind::Whitespace
            } else {
                FragmentKind::Word
            },
            width: 0,
            events: Vec::new(),
        }
    }

    fn kind_matches(&self, is_whitespace: bool) -> bool {
        matches!(
            (self.kind, is_whitespace),
            (FragmentKind::Whitespace, true) | (FragmentKind::Word, false)
        )
    }

    fn add_events(&mut self, pending: &mut Vec<TextEvent>) {
        for mut event in pending.drain(..) {
            event.offset = self.width;
            self.events.push(event);
        }
    }

    fn push_char(&mut self, ch: char, style: Style) {
        match self.segments.last_mut() {
            Some(segment) if segment.style == style => segment.text.push(ch),
            _ => self.segments.push(LineSegment {
                text: ch.to_string(),
                style,
            }),
        }
        self.width += UnicodeWidthChar::width(ch).unwrap_or(0);
    }

    fn finish(self) -> Fragment {
        Fragment {
            segments: self.segments,
            kind: self.kind,
            width: self.width,
            events: self.events,
        }
    }
}

fn wrap_fragments(fragments: &[Fragment], width: usize) -> Vec<LineOutput> {
    let mut outputs = Vec::new();
    let mut builder = LineBuilder::default();
    let mut pending_whitespace: Vec<Fragment> = Vec::new();

    for token in fragments {
        match token.kind {
            FragmentKind::Whitespace => pending_whitespace.push(token.clone()),
            FragmentKind::Word => {
                let whitespace_width: usize =
                    pending_whitespace.iter().map(|item| item.width).sum();
                if builder.width > 0 && builder.width + whitespace_width + token.width > width {
                    builder.consume_pending(&mut pending_whitespace);
                    outputs.push(builder.build_line());
                    builder = LineBuilder::default();
                }
                builder.consume_pending(&mut pending_whitespace);
                builder.append_token(token.clone());
            }
        }
    }

    builder.consume_pending(&mut pending_whitespace);
    outputs.push(builder.build_line());
    outputs
}

#[derive(Default)]
struct LineBuilder {
    segments: Vec<LineSegment>,
    events: Vec<LocatedEvent>,
    width: usize,
}

impl LineBuilder {
    fn consume_pending(&mut self, pending_whitespace: &mut Vec<Fragment>) {
        for fragment in pending_whitespace.drain(..) {
            self.append_token(fragment);
        }
    }

    fn append_token(&mut self, fragment: Fragment) {
        let start = self.width;
        self.segments.extend(fragment.segments);
        self.width += fragment.width;
        for event in fragment.events {
            self.events.push(LocatedEvent {
                column: start + event.offset,
                kind: event.kind,
            });
        }
    }

    fn build_line(mut self) -> LineOutput {
        if self.segments.is_empty() {
            self.segments.push(LineSegment {
                text: String::new(),
                style: Style::default(),
            });
        }
        self.events.sort_by_key(|event| event.column);
        LineOutput {
            spans: self.segments,
            events: self.events,
            width: self.width,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_text(line: &Line<'_>) -> String {
        line.spans.iter().map(|span| span.content.as_ref()).collect()
    }

    fn render(editor: &DocumentEditor, width: usize) -> RenderResult {
        render_document(editor, width, 0, &Theme::default())
    }

    fn position_of(result: &RenderResult, pointer: CursorPointer) -> CursorVisualPosition {
        result
            .cursor_map
            .iter()
            .find(|(candidate, _)| *candidate == pointer)
            .map(|(_, position)| *position)
            .unwrap()
    }

    #[test]
    fn marks_become_modifiers() {
        let editor = DocumentEditor::from_content(
            "<p><strong>b</strong><em>i</em><u>u</u><a href=\"/x\">l</a></p>",
        );
        let result = render(&editor, 40);
        let spans = &result.lines[0].spans;

        assert!(spans[0].style.add_modifier.contains(Modifier::BOLD));
        assert!(spans[1].style.add_modifier.contains(Modifier::ITALIC));
        assert!(spans[2].style.add_modifier.contains(Modifier::UNDERLINED));
        assert_eq!(spans[3].style.fg, Some(Theme::default().link_color));
    }

    #[test]
    fn wraps_words_and_moves_positions_to_next_line() {
        let editor = DocumentEditor::from_content("<p>alpha beta gamma</p>");
        let result = render(&editor, 10);

        assert_eq!(result.total_lines, 2);
        assert_eq!(line_text(&result.lines[0]).trim_end(), "alpha beta");
        assert_eq!(line_text(&result.lines[1]), "gamma");
        assert_eq!(
            position_of(&result, CursorPointer::new(0, 11)),
            CursorVisualPosition { line: 1, column: 0 }
        );
        assert_eq!(
            position_of(&result, CursorPointer::new(0, 16)),
            CursorVisualPosition { line: 1, column: 5 }
        );
    }

    #[test]
    fn cursor_follows_caret() {
        let mut editor = DocumentEditor::from_content("<p>one</p><p>two</p>");
        editor.move_to_pointer(CursorPointer::new(1, 2));
        let result = render(&editor, 40);

        // Blocks are separated by a blank line.
        assert_eq!(result.total_lines, 3);
        assert_eq!(result.cursor, Some(CursorVisualPosition { line: 2, column: 2 }));
    }

    #[test]
    fn alignment_indents_lines() {
        let editor = DocumentEditor::from_content(
            "<p style=\"text-align: center\">abc</p><p style=\"text-align: right\">abc</p>",
        );
        let result = render_document(&editor, 11, 2, &Theme::default());

        assert_eq!(position_of(&result, CursorPointer::new(0, 0)).column, 6);
        assert_eq!(position_of(&result, CursorPointer::new(1, 0)).column, 10);
        assert_eq!(line_text(&result.lines[2]), "          abc");
    }

    #[test]
    fn headings_are_bold_with_rules() {
        let editor = DocumentEditor::from_content("<h1>Title</h1><h3>Small</h3>");
        let result = render(&editor, 40);

        let texts: Vec<String> = result.lines.iter().map(line_text).collect();
        assert_eq!(texts, vec!["Title", "=====", "", "Small"]);
        assert!(result.lines[3].spans[0].style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn selection_is_highlighted() {
        let mut editor = DocumentEditor::from_content("<p>hello world</p>");
        editor.set_selection(CursorPointer::new(0, 0), CursorPointer::new(0, 5));
        let result = render(&editor, 40);
        let theme = Theme::default();

        let spans = &result.lines[0].spans;
        assert_eq!(spans[0].content, "hello");
        assert_eq!(spans[0].style.bg, Some(theme.selection_bg));
        assert_eq!(spans[1].style.bg, None);
    }

    #[test]
    fn empty_document_still_has_caret() {
        let editor = DocumentEditor::default();
        let result = render(&editor, 40);
        assert_eq!(result.total_lines, 1);
        assert_eq!(result.cursor, Some(CursorVisualPosition { line: 0, column: 0 }));
        assert_eq!(result.cursor_map.len(), 1);
    }
}
