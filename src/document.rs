use bitflags::bitflags;

bitflags! {
    /// Inline marks carried by a text run.
    ///
    /// `LINK` never appears on a stored [`Span`]; the link lives in
    /// [`Span::link`] so it can carry its href. It is only set in the
    /// result of [`Span::active_marks`] and selection queries.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Marks: u8 {
        const BOLD = 0b0001;
        const ITALIC = 0b0010;
        const UNDERLINE = 0b0100;
        const LINK = 0b1000;
    }
}

/// A boolean mark that can be toggled on a selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Mark {
    Bold,
    Italic,
    Underline,
}

impl Mark {
    pub fn flag(self) -> Marks {
        match self {
            Mark::Bold => Marks::BOLD,
            Mark::Italic => Marks::ITALIC,
            Mark::Underline => Marks::UNDERLINE,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Mark::Bold => "Bold",
            Mark::Italic => "Italic",
            Mark::Underline => "Underline",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

impl Alignment {
    pub fn css_value(self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Alignment::Left => "aligned left",
            Alignment::Center => "centered",
            Alignment::Right => "aligned right",
        }
    }

    pub fn from_css_value(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "left" | "start" | "justify" => Some(Alignment::Left),
            "center" => Some(Alignment::Center),
            "right" | "end" => Some(Alignment::Right),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BlockKind {
    #[default]
    Paragraph,
    Heading1,
    Heading2,
    Heading3,
}

impl BlockKind {
    pub fn tag(self) -> &'static str {
        match self {
            BlockKind::Paragraph => "p",
            BlockKind::Heading1 => "h1",
            BlockKind::Heading2 => "h2",
            BlockKind::Heading3 => "h3",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "p" | "div" => Some(BlockKind::Paragraph),
            "h1" => Some(BlockKind::Heading1),
            "h2" => Some(BlockKind::Heading2),
            // The editor only offers three heading levels.
            "h3" | "h4" | "h5" | "h6" => Some(BlockKind::Heading3),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            BlockKind::Paragraph => "Paragraph",
            BlockKind::Heading1 => "Heading 1",
            BlockKind::Heading2 => "Heading 2",
            BlockKind::Heading3 => "Heading 3",
        }
    }
}

/// A run of text sharing one set of marks and at most one link.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub marks: Marks,
    pub link: Option<String>,
}

impl Span {
    pub fn new_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            marks: Marks::empty(),
            link: None,
        }
    }

    pub fn with_marks(mut self, marks: Marks) -> Self {
        self.marks = marks.difference(Marks::LINK);
        self
    }

    pub fn with_link(mut self, href: impl Into<String>) -> Self {
        self.link = Some(href.into());
        self
    }

    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn active_marks(&self) -> Marks {
        if self.link.is_some() {
            self.marks | Marks::LINK
        } else {
            self.marks
        }
    }

    pub(crate) fn same_format(&self, other: &Span) -> bool {
        self.marks == other.marks && self.link == other.link
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Block {
    pub kind: BlockKind,
    pub alignment: Alignment,
    pub content: Vec<Span>,
}

impl Block {
    pub fn new_paragraph() -> Self {
        Self::default()
    }

    pub fn new_heading(kind: BlockKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    pub fn with_content(mut self, content: Vec<Span>) -> Self {
        self.content = content;
        self
    }

    pub fn with_alignment(mut self, alignment: Alignment) -> Self {
        self.alignment = alignment;
        self
    }

    pub fn char_len(&self) -> usize {
        self.content.iter().map(Span::char_len).sum()
    }

    pub fn plain_text(&self) -> String {
        self.content.iter().map(|span| span.text.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.content.iter().all(|span| span.text.is_empty())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Document {
    pub blocks: Vec<Block>,
}

impl Document {
    /// An empty document: a single empty paragraph.
    pub fn new() -> Self {
        Self {
            blocks: vec![Block::new_paragraph()],
        }
    }

    pub fn with_blocks(mut self, blocks: Vec<Block>) -> Self {
        self.blocks = blocks;
        self.ensure_initialized();
        self
    }

    pub(crate) fn ensure_initialized(&mut self) {
        if self.blocks.is_empty() {
            self.blocks.push(Block::new_paragraph());
        }
    }

    pub fn plain_text(&self) -> String {
        self.blocks
            .iter()
            .map(Block::plain_text)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn word_count(&self) -> usize {
        self.blocks
            .iter()
            .map(|block| block.plain_text().split_whitespace().count())
            .sum()
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}
