//! Floating formatting toolbar bound to the editor's current selection.

use crate::document::{Alignment, Mark, Marks};
use crate::editor::DocumentEditor;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BarCommand {
    Toggle(Mark),
    Align(Alignment),
    Link,
    Unlink,
}

impl BarCommand {
    pub const ALL: [BarCommand; 8] = [
        BarCommand::Toggle(Mark::Bold),
        BarCommand::Toggle(Mark::Italic),
        BarCommand::Toggle(Mark::Underline),
        BarCommand::Align(Alignment::Left),
        BarCommand::Align(Alignment::Center),
        BarCommand::Align(Alignment::Right),
        BarCommand::Link,
        BarCommand::Unlink,
    ];

    pub fn label(self) -> &'static str {
        match self {
            BarCommand::Toggle(Mark::Bold) => "B",
            BarCommand::Toggle(Mark::Italic) => "I",
            BarCommand::Toggle(Mark::Underline) => "U",
            BarCommand::Align(Alignment::Left) => "Left",
            BarCommand::Align(Alignment::Center) => "Center",
            BarCommand::Align(Alignment::Right) => "Right",
            BarCommand::Link => "Link",
            BarCommand::Unlink => "Unlink",
        }
    }
}

/// Supplies the URL for the link command. `None` means the prompt was
/// cancelled.
pub trait LinkPrompt {
    fn prompt_url(&mut self, current: Option<&str>) -> Option<String>;
}

/// A prompt whose answer was collected before the command ran, such as a
/// dialog the user already submitted.
pub struct PromptAnswer(pub Option<String>);

impl LinkPrompt for PromptAnswer {
    fn prompt_url(&mut self, _current: Option<&str>) -> Option<String> {
        self.0.take()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PressOutcome {
    /// The editor command ran; `changed` tells whether the document changed.
    Executed { changed: bool },
    /// The link prompt was empty or cancelled, nothing ran.
    Cancelled,
    /// The bar is hidden, so it has no buttons to press.
    Hidden,
}

#[derive(Debug, Default)]
pub struct SelectionCommandBar {
    visible: bool,
    active: Marks,
    alignment: Option<Alignment>,
    focused: bool,
    highlighted: usize,
}

impl SelectionCommandBar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-reads the selection state. Never mutates the editor.
    pub fn on_selection_change(&mut self, editor: &DocumentEditor) {
        self.visible = editor.selects_text();
        if self.visible {
            self.active = editor.active_marks();
            self.alignment = uniform_alignment(editor);
        } else {
            self.active = Marks::empty();
            self.alignment = None;
            self.focused = false;
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn active_marks(&self) -> Marks {
        self.active
    }

    pub fn is_pressed(&self, command: BarCommand) -> bool {
        match command {
            BarCommand::Toggle(mark) => self.active.contains(mark.flag()),
            BarCommand::Align(alignment) => self.alignment == Some(alignment),
            BarCommand::Link => self.active.contains(Marks::LINK),
            BarCommand::Unlink => false,
        }
    }

    /// Whether keyboard focus sits on the bar rather than on the editor.
    pub fn has_focus(&self) -> bool {
        self.focused
    }

    pub fn focus(&mut self) -> bool {
        if !self.visible {
            return false;
        }
        self.focused = true;
        true
    }

    pub fn blur(&mut self) {
        self.focused = false;
    }

    pub fn highlighted(&self) -> BarCommand {
        BarCommand::ALL[self.highlighted]
    }

    pub fn move_highlight(&mut self, delta: isize) {
        let len = BarCommand::ALL.len() as isize;
        let next = (self.highlighted as isize + delta).rem_euclid(len);
        self.highlighted = next as usize;
    }

    /// Runs exactly one editor command for `command`, then hands focus back
    /// to the editor and refreshes the pressed state.
    pub fn press(
        &mut self,
        command: BarCommand,
        editor: &mut DocumentEditor,
        prompt: &mut dyn LinkPrompt,
    ) -> PressOutcome {
        if !self.visible {
            return PressOutcome::Hidden;
        }
        let changed = match command {
            BarCommand::Toggle(mark) => editor.toggle_mark(mark),
            BarCommand::Align(alignment) => editor.set_block_alignment(alignment),
            BarCommand::Unlink => editor.set_link(None),
            BarCommand::Link => {
                let url = prompt
                    .prompt_url(editor.active_link())
                    .map(|url| url.trim().to_string())
                    .filter(|url| !url.is_empty());
                let Some(url) = url else {
                    self.focused = false;
                    return PressOutcome::Cancelled;
                };
                editor.set_link(Some(&url))
            }
        };
        tracing::debug!(command = command.label(), changed, "command bar press");
        self.focused = false;
        self.on_selection_change(editor);
        PressOutcome::Executed { changed }
    }
}

fn uniform_alignment(editor: &DocumentEditor) -> Option<Alignment> {
    let blocks = &editor.document().blocks;
    let (start, end) = editor.selection().ordered();
    let first = blocks.get(start.block)?.alignment;
    blocks[start.block..=end.block]
        .iter()
        .all(|block| block.alignment == first)
        .then_some(first)
}
