//! Conversion between the document tree and the HTML-like markup stored in a
//! document's `content` field.
//!
//! [`write`] always produces the canonical form: block tags `p`, `h1`..`h3`
//! (with `style="text-align: ..."` for non-left blocks) and inline tags nested
//! as `a` > `strong` > `em` > `u`. [`parse`] accepts that form and is lenient
//! with anything else: it never fails, skips unknown tags while keeping their
//! text, and wraps stray text in paragraphs.

use crate::document::{Alignment, Block, BlockKind, Document, Marks, Span};
use crate::editor::prune_and_merge_spans;

pub fn write(document: &Document) -> String {
    let mut out = String::new();
    for block in &document.blocks {
        write_block(&mut out, block);
    }
    if out.is_empty() {
        out.push_str("<p></p>");
    }
    out
}

fn write_block(out: &mut String, block: &Block) {
    let tag = block.kind.tag();
    out.push('<');
    out.push_str(tag);
    if block.alignment != Alignment::Left {
        out.push_str(" style=\"text-align: ");
        out.push_str(block.alignment.css_value());
        out.push_str("\"");
    }
    out.push('>');

    let mut spans = block.content.clone();
    prune_and_merge_spans(&mut spans);
    for span in &spans {
        write_span(out, span);
    }

    out.push_str("</");
    out.push_str(tag);
    out.push('>');
}

fn write_span(out: &mut String, span: &Span) {
    if let Some(href) = &span.link {
        out.push_str("<a href=\"");
        escape_into(out, href, true);
        out.push_str("\">");
    }
    for (flag, tag) in INLINE_ORDER {
        if span.marks.contains(flag) {
            out.push('<');
            out.push_str(tag);
            out.push('>');
        }
    }
    escape_into(out, &span.text, false);
    for (flag, tag) in INLINE_ORDER.iter().rev() {
        if span.marks.contains(*flag) {
            out.push_str("</");
            out.push_str(tag);
            out.push('>');
        }
    }
    if span.link.is_some() {
        out.push_str("</a>");
    }
}

const INLINE_ORDER: [(Marks, &str); 3] = [
    (Marks::BOLD, "strong"),
    (Marks::ITALIC, "em"),
    (Marks::UNDERLINE, "u"),
];

fn escape_into(out: &mut String, text: &str, attribute: bool) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}

/// Parses stored markup. Empty or unreadable input yields an empty document.
pub fn parse(input: &str) -> Document {
    let mut parser = Parser::default();
    for token in Tokenizer::new(input) {
        parser.consume(token);
    }
    parser.finish()
}

#[derive(Debug, PartialEq)]
enum Token<'a> {
    Text(&'a str),
    Open(Tag),
    Close(String),
}

#[derive(Debug, PartialEq)]
struct Tag {
    name: String,
    attributes: Vec<(String, String)>,
}

impl Tag {
    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

struct Tokenizer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Tokenizer<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn starts_markup(rest: &str) -> bool {
        let mut chars = rest.chars();
        if chars.next() != Some('<') {
            return false;
        }
        matches!(chars.next(), Some(ch) if ch.is_ascii_alphabetic() || ch == '/' || ch == '!')
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let rest = &self.input[self.pos..];
            if rest.is_empty() {
                return None;
            }

            if !Self::starts_markup(rest) {
                // Text runs until the next thing that looks like a tag.
                let mut end = rest.len();
                for (idx, _) in rest.char_indices().skip(1) {
                    if Self::starts_markup(&rest[idx..]) {
                        end = idx;
                        break;
                    }
                }
                self.pos += end;
                return Some(Token::Text(&rest[..end]));
            }

            if let Some(comment) = rest.strip_prefix("<!--") {
                let skipped = comment.find("-->").map(|idx| idx + 3).unwrap_or(comment.len());
                self.pos += 4 + skipped;
                continue;
            }

            let Some(close_idx) = rest.find('>') else {
                // An unterminated tag is kept as text.
                self.pos = self.input.len();
                return Some(Token::Text(rest));
            };
            let inner = &rest[1..close_idx];
            self.pos += close_idx + 1;

            if inner.starts_with('!') {
                continue;
            }
            if let Some(name) = inner.strip_prefix('/') {
                return Some(Token::Close(name.trim().to_ascii_lowercase()));
            }
            return Some(Token::Open(parse_tag(inner.trim_end_matches('/'))));
        }
    }
}

fn parse_tag(inner: &str) -> Tag {
    let inner = inner.trim();
    let name_end = inner
        .find(|ch: char| ch.is_whitespace())
        .unwrap_or(inner.len());
    let name = inner[..name_end].to_ascii_lowercase();
    let mut attributes = Vec::new();

    let chars: Vec<char> = inner[name_end..].chars().collect();
    let mut idx = 0;
    while idx < chars.len() {
        while idx < chars.len() && (chars[idx].is_whitespace() || chars[idx] == '/') {
            idx += 1;
        }
        let key_start = idx;
        while idx < chars.len() && !chars[idx].is_whitespace() && chars[idx] != '=' {
            idx += 1;
        }
        let key: String = chars[key_start..idx].iter().collect();
        if key.is_empty() {
            break;
        }
        while idx < chars.len() && chars[idx].is_whitespace() {
            idx += 1;
        }
        let mut value = String::new();
        if idx < chars.len() && chars[idx] == '=' {
            idx += 1;
            while idx < chars.len() && chars[idx].is_whitespace() {
                idx += 1;
            }
            if idx < chars.len() && (chars[idx] == '"' || chars[idx] == '\'') {
                let quote = chars[idx];
                idx += 1;
                let value_start = idx;
                while idx < chars.len() && chars[idx] != quote {
                    idx += 1;
                }
                value = chars[value_start..idx].iter().collect();
                idx += 1;
            } else {
                let value_start = idx;
                while idx < chars.len() && !chars[idx].is_whitespace() {
                    idx += 1;
                }
                value = chars[value_start..idx].iter().collect();
            }
        }
        attributes.push((key.to_ascii_lowercase(), decode_entities(&value)));
    }

    Tag { name, attributes }
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let decoded = rest
            .find(';')
            .filter(|semi| *semi <= 10)
            .and_then(|semi| decode_entity(&rest[1..semi]).map(|ch| (ch, semi)));
        match decoded {
            Some((ch, semi)) => {
                out.push(ch);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let number = name.strip_prefix('#')?;
            let code = match number.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => number.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}

#[derive(Debug)]
enum InlineFrame {
    Marks(String, Marks),
    Link(String, String),
    Ignored(String),
}

impl InlineFrame {
    fn tag(&self) -> &str {
        match self {
            InlineFrame::Marks(tag, _) | InlineFrame::Link(tag, _) | InlineFrame::Ignored(tag) => {
                tag
            }
        }
    }
}

#[derive(Default)]
struct Parser {
    blocks: Vec<Block>,
    current: Option<Block>,
    inline: Vec<InlineFrame>,
}

const VOID_TAGS: [&str; 8] = ["img", "hr", "meta", "input", "link", "col", "wbr", "source"];

impl Parser {
    fn consume(&mut self, token: Token<'_>) {
        match token {
            Token::Text(text) => self.push_text(text),
            Token::Open(tag) => self.open(tag),
            Token::Close(name) => self.close(&name),
        }
    }

    fn open(&mut self, tag: Tag) {
        if let Some(kind) = block_kind_for(&tag.name) {
            self.finish_block();
            self.current = Some(Block {
                kind,
                alignment: alignment_for(&tag),
                content: Vec::new(),
            });
            return;
        }

        match tag.name.as_str() {
            "br" => {
                // A hard break splits the block, keeping its formatting.
                let template = self.current.as_ref().map(|block| Block {
                    kind: block.kind,
                    alignment: block.alignment,
                    content: Vec::new(),
                });
                self.finish_block();
                self.current = template;
            }
            "strong" | "b" => self.inline.push(InlineFrame::Marks(tag.name, Marks::BOLD)),
            "em" | "i" => self.inline.push(InlineFrame::Marks(tag.name, Marks::ITALIC)),
            "u" => self
                .inline
                .push(InlineFrame::Marks(tag.name, Marks::UNDERLINE)),
            "a" => {
                let frame = match tag.attribute("href") {
                    Some(href) => InlineFrame::Link(tag.name.clone(), href.to_string()),
                    None => InlineFrame::Ignored(tag.name.clone()),
                };
                self.inline.push(frame);
            }
            name if VOID_TAGS.contains(&name) => {}
            _ => self.inline.push(InlineFrame::Ignored(tag.name)),
        }
    }

    fn close(&mut self, name: &str) {
        if block_kind_for(name).is_some() {
            self.finish_block();
            return;
        }
        if let Some(idx) = self.inline.iter().rposition(|frame| frame.tag() == name) {
            self.inline.truncate(idx);
        }
    }

    fn push_text(&mut self, raw: &str) {
        if self.current.is_none() {
            if raw.trim().is_empty() {
                return;
            }
            self.current = Some(Block::new_paragraph());
        }
        let mut marks = Marks::empty();
        let mut link = None;
        for frame in &self.inline {
            match frame {
                InlineFrame::Marks(_, flag) => marks |= *flag,
                InlineFrame::Link(_, href) => link = Some(href.clone()),
                InlineFrame::Ignored(_) => {}
            }
        }
        let text = decode_entities(raw);
        if let Some(block) = self.current.as_mut() {
            block.content.push(Span { text, marks, link });
        }
    }

    fn finish_block(&mut self) {
        self.inline.clear();
        if let Some(mut block) = self.current.take() {
            prune_and_merge_spans(&mut block.content);
            self.blocks.push(block);
        }
    }

    fn finish(mut self) -> Document {
        self.finish_block();
        Document::new().with_blocks(self.blocks)
    }
}

fn block_kind_for(tag: &str) -> Option<BlockKind> {
    match tag {
        "li" | "blockquote" | "pre" => Some(BlockKind::Paragraph),
        other => BlockKind::from_tag(other),
    }
}

fn alignment_for(tag: &Tag) -> Alignment {
    if let Some(style) = tag.attribute("style") {
        for declaration in style.split(';') {
            let Some((key, value)) = declaration.split_once(':') else {
                continue;
            };
            if key.trim().eq_ignore_ascii_case("text-align") {
                if let Some(alignment) = Alignment::from_css_value(value) {
                    return alignment;
                }
            }
        }
    }
    tag.attribute("align")
        .and_then(Alignment::from_css_value)
        .unwrap_or_default()
}
