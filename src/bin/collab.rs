use std::{
    env, io,
    sync::Arc,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use crossterm::{
    event::{
        self, DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture,
        Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent,
        MouseEventKind,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Position, Rect},
    style::{Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
};
use tokio::runtime::Handle;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use unicode_width::UnicodeWidthStr;

use collab_zone::command_bar::{BarCommand, PressOutcome, PromptAnswer, SelectionCommandBar};
use collab_zone::config::Config;
use collab_zone::document::{Alignment, BlockKind, Mark};
use collab_zone::documents::{Completion, DocumentListController, Job, ListKind, LoadState};
use collab_zone::editor::DocumentEditor;
use collab_zone::editor_display::EditorDisplay;
use collab_zone::logging;
use collab_zone::render::RenderResult;
use collab_zone::share::{ShareCompletion, ShareController, ShareJob, TerminalClipboard};
use collab_zone::status::{SELECT_DOCUMENT_FIRST, StatusMessage};
use collab_zone::sync::{DocumentId, DocumentSyncClient};
use collab_zone::theme::Theme;

const STATUS_TIMEOUT: Duration = Duration::from_secs(4);
const DOUBLE_CLICK_TIMEOUT: Duration = Duration::from_millis(400);
const MOUSE_SCROLL_LINES: usize = 3;
const LIST_WIDTH: u16 = 32;

const HELP: &str = "\
collab: edit and share Collab Zone documents from the terminal

Usage: collab [--help | --version]

Environment:
  COLLAB_API_BASE      document API base URL (default http://localhost:3000/api/collab)
  COLLAB_ORIGIN        origin used in share links (default: origin of COLLAB_API_BASE)
  COLLAB_TOKEN         bearer token sent with every request
  COLLAB_TIMEOUT_SECS  request timeout in seconds (default 20)
  COLLAB_LOG_DIR       directory for the rolling log file
  RUST_LOG             log filter (default collab_zone=info,collab=info)

Documents:
  Tab           switch between the document list and the editor
  Up/Down       move through the list, Enter opens the highlighted document
  F5            reload both document lists
  Ctrl-N        create a new document
  Ctrl-S        save the active document
  F2            rename the active document
  Ctrl-E        share the active document by email
  Ctrl-D        delete the active document
  Ctrl-Q        quit

Editing:
  Ctrl-B        bold
  Ctrl-I        italic (Alt-I where the terminal reports Ctrl-I as Tab)
  Ctrl-U        underline
  Ctrl-K        link the selection, Alt-K removes the link
  Alt-L         align left
  Alt-C         align center
  Alt-R         align right
  Alt-0         paragraph
  Alt-1..Alt-3  heading level 1 to 3
  Ctrl-A        select all
  F6            focus the selection toolbar (Left/Right, Enter, Esc)
  Esc           collapse the selection
";

fn main() -> Result<()> {
    match env::args().nth(1).as_deref() {
        Some("-h" | "--help") => {
            print!("{HELP}");
            return Ok(());
        }
        Some("-V" | "--version") => {
            println!("collab {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Some(other) => {
            eprintln!("Unknown argument '{other}'. See `collab --help`.");
            return Ok(());
        }
        None => {}
    }
    run()
}

fn editor_wrap_configuration(width: usize) -> (usize, usize) {
    if width == 0 {
        return (1, 0);
    }
    if width < 60 {
        let wrap_width = width.saturating_sub(1).max(1);
        return (wrap_width, 0);
    }
    if width < 100 {
        let padding = 2.min(width / 2);
        let wrap_width = width.saturating_sub(padding.saturating_mul(2)).max(1);
        return (wrap_width, padding);
    }
    let mut left_padding = width.saturating_sub(100) / 2 + 4;
    let max_padding = width.saturating_sub(1) / 2;
    if left_padding > max_padding {
        left_padding = max_padding;
    }
    let wrap_width = width.saturating_sub(left_padding.saturating_mul(2)).max(1);
    (wrap_width, left_padding)
}

fn run() -> Result<()> {
    let config = Config::from_env().context("invalid configuration")?;
    let _log_guard = logging::init(&config.log_dir)?;
    tracing::info!(api = %config.api_base, "starting collab");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let client = DocumentSyncClient::from_config(&config).context("failed to build HTTP client")?;
    let api = Arc::new(client);

    let documents = DocumentListController::new(api.clone());
    let sharing = ShareController::new(api, config.origin.clone(), Box::new(TerminalClipboard));
    let mut app = App::new(runtime.handle().clone(), documents, sharing);
    app.load_lists();

    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(
        stdout,
        EnterAlternateScreen,
        EnableMouseCapture,
        EnableBracketedPaste
    )
    .context("failed to initialize terminal")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to create terminal backend")?;
    terminal.clear().ok();

    let res = run_app(&mut terminal, &mut app).context("application error");

    disable_raw_mode().ok();
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture,
        DisableBracketedPaste
    )
    .ok();
    terminal.show_cursor().ok();

    if let Err(err) = &res {
        tracing::error!(error = %err, "collab exited with an error");
    }
    runtime.shutdown_timeout(Duration::from_millis(500));
    res
}

fn run_app<B: ratatui::backend::Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    let tick_rate = Duration::from_millis(100);
    let mut last_tick = Instant::now();
    let mut needs_redraw = true;

    while !app.should_quit() {
        if app.drain_outcomes() {
            needs_redraw = true;
        }

        if needs_redraw {
            terminal
                .draw(|frame| app.draw(frame))
                .context("failed to draw frame")?;
            needs_redraw = false;
        }

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));

        if event::poll(timeout).context("event poll failed")? {
            let evt = event::read().context("failed to read event")?;
            if let Event::Resize(_, _) = evt {
                needs_redraw = true;
                continue;
            }
            app.handle_event(evt);
            needs_redraw = true;
        }

        if last_tick.elapsed() >= tick_rate {
            let had_message_before = app.has_status_message();
            app.on_tick();
            last_tick = Instant::now();
            if had_message_before && !app.has_status_message() {
                needs_redraw = true;
            }
        }
    }

    Ok(())
}

/// A finished background request, delivered back to the UI thread.
enum Outcome {
    Documents(Completion),
    Saved(SaveTicket, Completion),
    Share(ShareCompletion),
}

/// Identifies the edits a save request carried.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct SaveTicket {
    session: u64,
    generation: u64,
}

/// Tracks which edits of the open document the server has confirmed.
/// Every document switch starts a new session, so answers to saves issued
/// for an earlier one are ignored.
#[derive(Debug, Default)]
struct SaveTracker {
    session: u64,
    edit_generation: u64,
    clean_generation: u64,
}

impl SaveTracker {
    fn edited(&mut self) {
        self.edit_generation += 1;
    }

    fn is_dirty(&self) -> bool {
        self.edit_generation != self.clean_generation
    }

    fn switched(&mut self) {
        self.session += 1;
        self.clean_generation = self.edit_generation;
    }

    fn issue(&self) -> SaveTicket {
        SaveTicket {
            session: self.session,
            generation: self.edit_generation,
        }
    }

    /// Marks the ticket's edits as stored. An older save answering after a
    /// newer one never moves the clean mark backwards.
    fn confirm(&mut self, ticket: SaveTicket) -> bool {
        if ticket.session != self.session || ticket.generation <= self.clean_generation {
            return false;
        }
        self.clean_generation = ticket.generation;
        true
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Focus {
    List,
    Editor,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DialogKind {
    Rename,
    Share,
    Link,
    ConfirmDelete,
}

impl DialogKind {
    fn title(self) -> &'static str {
        match self {
            DialogKind::Rename => "Rename document",
            DialogKind::Share => "Share document",
            DialogKind::Link => "Link",
            DialogKind::ConfirmDelete => "Delete document",
        }
    }

    fn prompt(self) -> &'static str {
        match self {
            DialogKind::Rename => "New title:",
            DialogKind::Share => "Recipient email:",
            DialogKind::Link => "URL:",
            DialogKind::ConfirmDelete => "Delete this document for everyone? (y/n)",
        }
    }

    fn has_input(self) -> bool {
        !matches!(self, DialogKind::ConfirmDelete)
    }
}

/// Single-line text field used by the dialogs.
#[derive(Debug, Default)]
struct TextInput {
    value: String,
    cursor: usize,
}

impl TextInput {
    fn with_value(value: impl Into<String>) -> Self {
        let value = value.into();
        let cursor = value.chars().count();
        Self { value, cursor }
    }

    fn byte_index(&self, char_idx: usize) -> usize {
        self.value
            .char_indices()
            .nth(char_idx)
            .map(|(idx, _)| idx)
            .unwrap_or(self.value.len())
    }

    fn insert(&mut self, ch: char) {
        let idx = self.byte_index(self.cursor);
        self.value.insert(idx, ch);
        self.cursor += 1;
    }

    fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let idx = self.byte_index(self.cursor);
        self.value.remove(idx);
    }

    fn delete(&mut self) {
        if self.cursor < self.value.chars().count() {
            let idx = self.byte_index(self.cursor);
            self.value.remove(idx);
        }
    }

    fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char(ch) => self.insert(ch),
            KeyCode::Backspace => self.backspace(),
            KeyCode::Delete => self.delete(),
            KeyCode::Left => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Right => self.cursor = (self.cursor + 1).min(self.value.chars().count()),
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.value.chars().count(),
            _ => return false,
        }
        true
    }

    fn cursor_column(&self) -> u16 {
        let before = &self.value[..self.byte_index(self.cursor)];
        before.width() as u16
    }
}

struct Dialog {
    kind: DialogKind,
    input: TextInput,
}

#[derive(Clone, Debug)]
enum ListRow {
    Heading(ListKind),
    Placeholder(&'static str),
    Entry(usize),
}

#[derive(Clone, Debug)]
struct ListEntry {
    id: DocumentId,
    title: String,
}

struct App {
    runtime: Handle,
    outcomes_tx: UnboundedSender<Outcome>,
    outcomes_rx: UnboundedReceiver<Outcome>,
    documents: DocumentListController,
    sharing: ShareController,
    command_bar: SelectionCommandBar,
    display: EditorDisplay,
    theme: Theme,
    focus: Focus,
    dialog: Option<Dialog>,
    list_cursor: usize,
    list_offset: usize,
    list_area: Rect,
    bar_buttons: Vec<(Rect, BarCommand)>,
    scroll_top: usize,
    should_quit: bool,
    saves: SaveTracker,
    in_flight: usize,
    status_message: Option<(StatusMessage, Instant)>,
    last_click_instant: Option<Instant>,
    last_click_position: Option<(u16, u16)>,
    mouse_click_count: u8,
    mouse_dragging: bool,
    last_viewport_height: usize,
    last_total_lines: usize,
}

impl App {
    fn new(runtime: Handle, documents: DocumentListController, sharing: ShareController) -> Self {
        let (outcomes_tx, outcomes_rx) = unbounded_channel();
        Self {
            runtime,
            outcomes_tx,
            outcomes_rx,
            documents,
            sharing,
            command_bar: SelectionCommandBar::new(),
            display: EditorDisplay::new(),
            theme: Theme::new(),
            focus: Focus::List,
            dialog: None,
            list_cursor: 0,
            list_offset: 0,
            list_area: Rect::default(),
            bar_buttons: Vec::new(),
            scroll_top: 0,
            should_quit: false,
            saves: SaveTracker::default(),
            in_flight: 0,
            status_message: None,
            last_click_instant: None,
            last_click_position: None,
            mouse_click_count: 0,
            mouse_dragging: false,
            last_viewport_height: 0,
            last_total_lines: 0,
        }
    }

    fn should_quit(&self) -> bool {
        self.should_quit
    }

    fn has_status_message(&self) -> bool {
        self.status_message.is_some()
    }

    fn is_dirty(&self) -> bool {
        self.saves.is_dirty()
    }

    fn show(&mut self, message: StatusMessage) {
        if message.is_error() {
            tracing::warn!(text = %message.text, "error shown to user");
        }
        self.status_message = Some((message, Instant::now()));
    }

    fn on_tick(&mut self) {
        self.prune_status_message();
    }

    fn prune_status_message(&mut self) {
        if let Some((_, instant)) = &self.status_message
            && instant.elapsed() > STATUS_TIMEOUT
        {
            self.status_message = None;
        }
    }

    fn editor(&self) -> &DocumentEditor {
        self.documents.editor()
    }

    // Background requests

    fn spawn_documents(&mut self, job: Job) {
        let tx = self.outcomes_tx.clone();
        self.in_flight += 1;
        self.runtime.spawn(async move {
            let completion = job.await;
            let _ = tx.send(Outcome::Documents(completion));
        });
    }

    fn spawn_save(&mut self, ticket: SaveTicket, job: Job) {
        let tx = self.outcomes_tx.clone();
        self.in_flight += 1;
        self.runtime.spawn(async move {
            let completion = job.await;
            let _ = tx.send(Outcome::Saved(ticket, completion));
        });
    }

    fn spawn_share(&mut self, job: ShareJob) {
        let tx = self.outcomes_tx.clone();
        self.in_flight += 1;
        self.runtime.spawn(async move {
            let completion = job.await;
            let _ = tx.send(Outcome::Share(completion));
        });
    }

    fn start(&mut self, job: Result<Job, StatusMessage>) {
        match job {
            Ok(job) => self.spawn_documents(job),
            Err(message) => self.show(message),
        }
    }

    fn load_lists(&mut self) {
        match self.documents.load() {
            Ok(jobs) => jobs.into_iter().for_each(|job| self.spawn_documents(job)),
            Err(message) => self.show(message),
        }
    }

    fn reload_lists(&mut self) {
        for kind in [ListKind::Owned, ListKind::Shared] {
            match self.documents.reload(kind) {
                Ok(Some(job)) => self.spawn_documents(job),
                Ok(None) => {}
                Err(message) => {
                    self.show(message);
                    return;
                }
            }
        }
    }

    fn drain_outcomes(&mut self) -> bool {
        let mut changed = false;
        while let Ok(outcome) = self.outcomes_rx.try_recv() {
            self.in_flight = self.in_flight.saturating_sub(1);
            changed = true;
            match outcome {
                Outcome::Documents(completion) => self.apply_completion(completion, None),
                Outcome::Saved(ticket, completion) => {
                    self.apply_completion(completion, Some(ticket))
                }
                Outcome::Share(completion) => {
                    let message = self.sharing.complete(completion);
                    self.show(message);
                }
            }
        }
        changed
    }

    fn apply_completion(&mut self, completion: Completion, ticket: Option<SaveTicket>) {
        let saved = matches!(&completion, Completion::Saved { result: Ok(()), .. });
        let previous = self.documents.active_id().cloned();

        let message = self.documents.apply(completion);

        if self.documents.active_id() != previous.as_ref() {
            self.document_switched();
        } else if let Some(ticket) = ticket.filter(|_| saved) {
            self.saves.confirm(ticket);
        }
        if let Some(message) = message {
            self.show(message);
        }
        self.clamp_list_cursor();
    }

    fn document_switched(&mut self) {
        self.display.clear();
        self.scroll_top = 0;
        self.saves.switched();
        self.command_bar.on_selection_change(self.documents.editor());
        if self.documents.active_id().is_some() {
            self.focus = Focus::Editor;
        }
    }

    // Document actions

    fn create_document(&mut self) {
        let job = self.documents.create_new();
        self.start(job);
    }

    fn save_document(&mut self) {
        match self.documents.save_active() {
            Ok(job) => {
                let ticket = self.saves.issue();
                self.spawn_save(ticket, job);
            }
            Err(message) => self.show(message),
        }
    }

    fn open_dialog(&mut self, kind: DialogKind) {
        if kind != DialogKind::Link && self.documents.active_id().is_none() {
            self.show(StatusMessage::error(SELECT_DOCUMENT_FIRST));
            return;
        }
        let input = match kind {
            DialogKind::Rename => TextInput::with_value(
                self.documents
                    .active_document()
                    .map(|document| document.title.clone())
                    .unwrap_or_default(),
            ),
            DialogKind::Link => {
                TextInput::with_value(self.editor().active_link().unwrap_or_default())
            }
            DialogKind::Share | DialogKind::ConfirmDelete => TextInput::default(),
        };
        self.dialog = Some(Dialog { kind, input });
    }

    fn submit_dialog(&mut self, dialog: Dialog) {
        let value = dialog.input.value;
        match dialog.kind {
            DialogKind::Rename => {
                let job = self.documents.rename_active(&value);
                self.start(job);
            }
            DialogKind::Share => {
                match self.sharing.share(self.documents.active_id(), &value) {
                    Ok(job) => self.spawn_share(job),
                    Err(message) => self.show(message),
                }
            }
            DialogKind::Link => {
                self.press_bar_command(BarCommand::Link, Some(value));
            }
            DialogKind::ConfirmDelete => {
                let job = self.documents.delete_active();
                self.start(job);
            }
        }
    }

    fn handle_dialog_key(&mut self, code: KeyCode, modifiers: KeyModifiers) {
        let Some(dialog) = self.dialog.as_mut() else {
            return;
        };
        match code {
            KeyCode::Esc => {
                self.dialog = None;
            }
            KeyCode::Enter => {
                if let Some(dialog) = self.dialog.take() {
                    self.submit_dialog(dialog);
                }
            }
            KeyCode::Char('y' | 'Y') if dialog.kind == DialogKind::ConfirmDelete => {
                if let Some(dialog) = self.dialog.take() {
                    self.submit_dialog(dialog);
                }
            }
            KeyCode::Char('n' | 'N') if dialog.kind == DialogKind::ConfirmDelete => {
                self.dialog = None;
            }
            _ if dialog.kind.has_input() && !modifiers.contains(KeyModifiers::CONTROL) => {
                dialog.input.handle_key(code);
            }
            _ => {}
        }
    }

    // Document list

    fn list_entries(&self) -> (Vec<ListRow>, Vec<ListEntry>) {
        let mut rows = Vec::new();
        let mut entries = Vec::new();
        for kind in [ListKind::Owned, ListKind::Shared] {
            rows.push(ListRow::Heading(kind));
            let list = self.documents.list(kind);
            match list.state() {
                LoadState::Unloaded => {
                    rows.push(ListRow::Placeholder("Not loaded (F5 to retry)"))
                }
                LoadState::Loading => rows.push(ListRow::Placeholder("Loading…")),
                LoadState::Loaded if list.documents().is_empty() => {
                    rows.push(ListRow::Placeholder("No documents"))
                }
                LoadState::Loaded => {
                    for document in list.documents() {
                        rows.push(ListRow::Entry(entries.len()));
                        entries.push(ListEntry {
                            id: document.id.clone(),
                            title: document.title.clone(),
                        });
                    }
                }
            }
        }
        (rows, entries)
    }

    fn clamp_list_cursor(&mut self) {
        let (_, entries) = self.list_entries();
        self.list_cursor = self.list_cursor.min(entries.len().saturating_sub(1));
    }

    fn open_entry(&mut self, index: usize) {
        let (_, entries) = self.list_entries();
        let Some(entry) = entries.get(index) else {
            return;
        };
        self.list_cursor = index;
        if self.documents.active_id() == Some(&entry.id) {
            self.focus = Focus::Editor;
            return;
        }
        if self.is_dirty() {
            tracing::info!("switching documents with unsaved changes");
        }
        match self.documents.select_active(&entry.id) {
            Ok(()) => self.document_switched(),
            Err(message) => self.show(message),
        }
    }

    fn handle_list_key(&mut self, code: KeyCode) {
        let (_, entries) = self.list_entries();
        match code {
            KeyCode::Up => self.list_cursor = self.list_cursor.saturating_sub(1),
            KeyCode::Down => {
                self.list_cursor = (self.list_cursor + 1).min(entries.len().saturating_sub(1))
            }
            KeyCode::Home => self.list_cursor = 0,
            KeyCode::End => self.list_cursor = entries.len().saturating_sub(1),
            KeyCode::Enter | KeyCode::Right => self.open_entry(self.list_cursor),
            _ => {}
        }
    }

    // Editor

    fn after_edit(&mut self, changed: bool) {
        if changed {
            self.saves.edited();
            self.display.reset_preferred_column();
        }
        self.display.set_cursor_following(true);
        self.command_bar.on_selection_change(self.documents.editor());
    }

    fn press_bar_command(&mut self, command: BarCommand, answer: Option<String>) {
        let outcome = self.command_bar.press(
            command,
            self.documents.editor_mut(),
            &mut PromptAnswer(answer),
        );
        if let PressOutcome::Executed { changed } = outcome {
            self.after_edit(changed);
        }
    }

    fn activate_bar_command(&mut self, command: BarCommand) {
        if command == BarCommand::Link {
            self.command_bar.blur();
            self.open_dialog(DialogKind::Link);
        } else {
            self.press_bar_command(command, None);
        }
    }

    fn handle_command_bar_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Left | KeyCode::BackTab => self.command_bar.move_highlight(-1),
            KeyCode::Right | KeyCode::Tab => self.command_bar.move_highlight(1),
            KeyCode::Enter | KeyCode::Char(' ') => {
                self.activate_bar_command(self.command_bar.highlighted())
            }
            KeyCode::Esc => self.command_bar.blur(),
            _ => {}
        }
    }

    fn handle_editor_key(&mut self, code: KeyCode, modifiers: KeyModifiers) {
        if self.documents.active_id().is_none() {
            return;
        }
        if self.command_bar.has_focus() {
            self.handle_command_bar_key(code);
            return;
        }

        let extend = modifiers.contains(KeyModifiers::SHIFT);
        let control = modifiers.contains(KeyModifiers::CONTROL);
        let alt = modifiers.contains(KeyModifiers::ALT);
        let editor = self.documents.editor_mut();
        let display = &mut self.display;

        let changed = match (code, modifiers) {
            (KeyCode::Char('b'), m) if m.contains(KeyModifiers::CONTROL) => {
                editor.toggle_mark(Mark::Bold)
            }
            (KeyCode::Char('i'), m)
                if m.contains(KeyModifiers::CONTROL) || m.contains(KeyModifiers::ALT) =>
            {
                editor.toggle_mark(Mark::Italic)
            }
            (KeyCode::Char('u'), m) if m.contains(KeyModifiers::CONTROL) => {
                editor.toggle_mark(Mark::Underline)
            }
            (KeyCode::Char('k'), m) if m.contains(KeyModifiers::CONTROL) => {
                if editor.has_selection() {
                    self.open_dialog(DialogKind::Link);
                } else {
                    self.show(StatusMessage::error("Select some text to link"));
                }
                return;
            }
            (KeyCode::Char('k'), m) if m.contains(KeyModifiers::ALT) => editor.set_link(None),
            (KeyCode::Char('a'), m) if m.contains(KeyModifiers::CONTROL) => {
                editor.select_all();
                false
            }
            (KeyCode::Char('l'), m) if m.contains(KeyModifiers::ALT) => {
                editor.set_block_alignment(Alignment::Left)
            }
            (KeyCode::Char('c'), m) if m.contains(KeyModifiers::ALT) => {
                editor.set_block_alignment(Alignment::Center)
            }
            (KeyCode::Char('r'), m) if m.contains(KeyModifiers::ALT) => {
                editor.set_block_alignment(Alignment::Right)
            }
            (KeyCode::Char(digit @ '0'..='3'), m) if m.contains(KeyModifiers::ALT) => {
                let kind = match digit {
                    '1' => BlockKind::Heading1,
                    '2' => BlockKind::Heading2,
                    '3' => BlockKind::Heading3,
                    _ => BlockKind::Paragraph,
                };
                editor.set_block_kind(kind)
            }
            (KeyCode::F(6), _) => {
                if !self.command_bar.focus() {
                    self.show(StatusMessage::error("Select some text to use the toolbar"));
                }
                return;
            }
            (KeyCode::Esc, _) => {
                editor.collapse_selection();
                false
            }
            (KeyCode::Left, _) => {
                let moved = if control {
                    editor.move_word_left(extend)
                } else {
                    editor.move_left(extend)
                };
                if moved {
                    display.reset_preferred_column();
                }
                false
            }
            (KeyCode::Right, _) => {
                let moved = if control {
                    editor.move_word_right(extend)
                } else {
                    editor.move_right(extend)
                };
                if moved {
                    display.reset_preferred_column();
                }
                false
            }
            (KeyCode::Up, _) => {
                display.move_cursor_vertical(editor, -1, extend);
                false
            }
            (KeyCode::Down, _) => {
                display.move_cursor_vertical(editor, 1, extend);
                false
            }
            (KeyCode::Home, _) if control => {
                editor.move_to_document_start(extend);
                false
            }
            (KeyCode::End, _) if control => {
                editor.move_to_document_end(extend);
                false
            }
            (KeyCode::Home, _) => {
                display.move_to_visual_line_start(editor, extend);
                false
            }
            (KeyCode::End, _) => {
                display.move_to_visual_line_end(editor, extend);
                false
            }
            (KeyCode::PageUp, _) => {
                display.move_page(editor, -1, extend);
                false
            }
            (KeyCode::PageDown, _) => {
                display.move_page(editor, 1, extend);
                false
            }
            (KeyCode::Backspace, _) => editor.backspace(),
            (KeyCode::Delete, _) => editor.delete(),
            (KeyCode::Enter, _) => editor.insert_paragraph_break(),
            (KeyCode::Char(ch), _) if !control && !alt => editor.insert_char(ch),
            _ => return,
        };
        self.after_edit(changed);
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Key(KeyEvent {
                code,
                modifiers,
                kind: KeyEventKind::Press,
                ..
            }) => self.handle_key(code, modifiers),
            Event::Mouse(mouse_event) => self.handle_mouse_event(mouse_event),
            Event::Paste(text) => {
                if self.dialog.is_none()
                    && self.focus == Focus::Editor
                    && self.documents.active_id().is_some()
                {
                    let changed = self.documents.editor_mut().insert_text(&text);
                    self.after_edit(changed);
                }
            }
            _ => {}
        }
    }

    fn handle_key(&mut self, code: KeyCode, modifiers: KeyModifiers) {
        if self.dialog.is_some() {
            self.handle_dialog_key(code, modifiers);
            return;
        }

        let control = modifiers.contains(KeyModifiers::CONTROL);
        match code {
            KeyCode::Char('q' | 'c') if control => self.should_quit = true,
            KeyCode::Char('n') if control => self.create_document(),
            KeyCode::Char('s') if control => self.save_document(),
            KeyCode::Char('e') if control => self.open_dialog(DialogKind::Share),
            KeyCode::Char('d') if control => self.open_delete_confirmation(),
            KeyCode::F(2) => self.open_dialog(DialogKind::Rename),
            KeyCode::F(5) => self.reload_lists(),
            KeyCode::Tab | KeyCode::BackTab if !self.command_bar.has_focus() => {
                self.focus = match self.focus {
                    Focus::List => Focus::Editor,
                    Focus::Editor => Focus::List,
                };
            }
            _ => match self.focus {
                Focus::List => self.handle_list_key(code),
                Focus::Editor => self.handle_editor_key(code, modifiers),
            },
        }
    }

    fn open_delete_confirmation(&mut self) {
        let Some(id) = self.documents.active_id() else {
            self.show(StatusMessage::error(SELECT_DOCUMENT_FIRST));
            return;
        };
        if !self.documents.list(ListKind::Owned).contains(id) {
            self.show(StatusMessage::error("Only the owner can delete a document"));
            return;
        }
        self.open_dialog(DialogKind::ConfirmDelete);
    }

    // Mouse

    fn register_click(&mut self, column: u16, row: u16) -> u8 {
        let now = Instant::now();
        let repeated = self
            .last_click_instant
            .is_some_and(|last| now.duration_since(last) <= DOUBLE_CLICK_TIMEOUT)
            && self.last_click_position == Some((column, row));
        self.mouse_click_count = if repeated {
            (self.mouse_click_count + 1).min(3)
        } else {
            1
        };
        self.last_click_instant = Some(now);
        self.last_click_position = Some((column, row));
        self.mouse_click_count
    }

    fn scroll_by_lines(&mut self, delta: isize) {
        self.display.set_cursor_following(false);
        let viewport = self.display.last_view_height().max(1);
        let max_scroll = self.display.last_total_lines().saturating_sub(viewport) as isize;
        let next = (self.scroll_top as isize + delta).clamp(0, max_scroll.max(0));
        self.scroll_top = next as usize;
    }

    fn handle_mouse_event(&mut self, event: MouseEvent) {
        if self.dialog.is_some() {
            return;
        }
        let (column, row) = (event.column, event.row);
        let extend = event.modifiers.contains(KeyModifiers::SHIFT);

        match event.kind {
            MouseEventKind::ScrollUp => self.scroll_by_lines(-(MOUSE_SCROLL_LINES as isize)),
            MouseEventKind::ScrollDown => self.scroll_by_lines(MOUSE_SCROLL_LINES as isize),
            MouseEventKind::Down(MouseButton::Left) => {
                let position = Position::new(column, row);
                if let Some(command) = self
                    .bar_buttons
                    .iter()
                    .find(|(rect, _)| rect.contains(position))
                    .map(|(_, command)| *command)
                {
                    self.activate_bar_command(command);
                    return;
                }
                if self.list_area.contains(position) {
                    self.focus = Focus::List;
                    self.click_list_row(row);
                    return;
                }
                let Some(target) = self.display.pointer_from_mouse(column, row, self.scroll_top)
                else {
                    return;
                };
                if self.documents.active_id().is_none() {
                    return;
                }
                self.focus = Focus::Editor;
                self.command_bar.blur();
                let clicks = self.register_click(column, row);
                let editor = self.documents.editor_mut();
                self.display.focus_display(editor, &target, extend);
                match clicks {
                    2 => {
                        editor.select_word_at_cursor();
                    }
                    3 => {
                        if let Some((start, end)) =
                            self.display.visual_line_boundaries(target.position.line)
                        {
                            editor.set_selection(start.pointer, end.pointer);
                        }
                    }
                    _ => {}
                }
                self.mouse_dragging = clicks == 1;
                self.after_edit(false);
            }
            MouseEventKind::Drag(MouseButton::Left) if self.mouse_dragging => {
                if let Some(target) = self.display.pointer_from_mouse(column, row, self.scroll_top)
                {
                    let editor = self.documents.editor_mut();
                    self.display.focus_display(editor, &target, true);
                    self.after_edit(false);
                }
            }
            MouseEventKind::Up(MouseButton::Left) => {
                self.mouse_dragging = false;
            }
            _ => {}
        }
    }

    fn click_list_row(&mut self, row: u16) {
        let inner_top = self.list_area.y.saturating_add(1);
        if row < inner_top {
            return;
        }
        let index = self.list_offset + (row - inner_top) as usize;
        let (rows, _) = self.list_entries();
        if let Some(ListRow::Entry(entry)) = rows.get(index) {
            self.open_entry(*entry);
        }
    }

    // Drawing

    fn draw(&mut self, frame: &mut Frame) {
        let area = frame.area();
        if area.height == 0 || area.width == 0 {
            return;
        }

        let vertical = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(1)])
            .split(area);
        let main_area = vertical[0];
        let status_area = vertical[1];

        let horizontal = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Length(LIST_WIDTH.min(main_area.width / 2)),
                Constraint::Min(1),
            ])
            .split(main_area);

        self.draw_document_list(frame, horizontal[0]);
        self.draw_editor(frame, horizontal[1]);

        let status_line = self.status_line(status_area.width as usize);
        let status_widget = Paragraph::new(status_line).style(self.theme.status_bar_style());
        frame.render_widget(status_widget, status_area);

        if self.dialog.is_some() {
            self.draw_dialog(frame, area);
        }
    }

    fn draw_document_list(&mut self, frame: &mut Frame, area: Rect) {
        self.list_area = area;
        let (rows, entries) = self.list_entries();
        let active = self.documents.active_id();

        let mut selected_row = None;
        let items: Vec<ListItem> = rows
            .iter()
            .enumerate()
            .map(|(row_idx, row)| match row {
                ListRow::Heading(kind) => ListItem::new(Line::from(Span::styled(
                    kind.label(),
                    self.theme.list_heading_style(),
                ))),
                ListRow::Placeholder(text) => ListItem::new(Line::from(Span::styled(
                    format!("  {text}"),
                    self.theme.list_placeholder_style(),
                ))),
                ListRow::Entry(index) => {
                    let entry = &entries[*index];
                    if *index == self.list_cursor {
                        selected_row = Some(row_idx);
                    }
                    let style = if active == Some(&entry.id) {
                        self.theme.list_active_style()
                    } else {
                        Style::default()
                    };
                    ListItem::new(Line::from(Span::styled(format!("  {}", entry.title), style)))
                }
            })
            .collect();

        let focused = self.focus == Focus::List;
        let highlight = if focused {
            Style::default().add_modifier(Modifier::REVERSED)
        } else {
            Style::default()
        };
        let list = List::new(items).highlight_style(highlight).block(
            Block::default()
                .title("Documents")
                .borders(Borders::ALL)
                .border_style(self.theme.border_style(focused)),
        );

        let mut state = ListState::default()
            .with_offset(self.list_offset)
            .with_selected(selected_row);
        frame.render_stateful_widget(list, area, &mut state);
        self.list_offset = state.offset();
    }

    fn draw_editor(&mut self, frame: &mut Frame, area: Rect) {
        let focused = self.focus == Focus::Editor;
        let title = match self.documents.active_document() {
            Some(document) if self.is_dirty() => format!("{}*", document.title),
            Some(document) => document.title.clone(),
            None => "No document".to_string(),
        };
        let block = Block::default()
            .title(Span::styled(title, self.theme.title_style()))
            .borders(Borders::ALL)
            .border_style(self.theme.border_style(focused));
        let inner = block.inner(area);
        frame.render_widget(block, area);
        self.bar_buttons.clear();

        if self.documents.active_id().is_none() {
            let hint = Paragraph::new("Select a document from the list or press Ctrl-N")
                .style(self.theme.list_placeholder_style())
                .wrap(Wrap { trim: true });
            frame.render_widget(hint, inner);
            self.display.update_after_render(Rect::default(), 0);
            return;
        }
        if inner.width < 2 || inner.height == 0 {
            return;
        }

        let text_area = Rect::new(inner.x, inner.y, inner.width - 1, inner.height);
        let scrollbar_area = Rect::new(inner.x + inner.width - 1, inner.y, 1, inner.height);

        let (wrap_width, left_padding) = editor_wrap_configuration(text_area.width as usize);
        let render = self.display.render(
            self.documents.editor(),
            wrap_width,
            left_padding,
            &self.theme,
        );
        self.display
            .update_after_render(text_area, render.total_lines);
        let viewport_height = text_area.height as usize;
        self.adjust_scroll(&render, viewport_height);
        self.last_viewport_height = viewport_height;
        self.last_total_lines = render.total_lines;

        let paragraph = Paragraph::new(Text::from(render.lines))
            .scroll((self.scroll_top as u16, 0));
        frame.render_widget(paragraph, text_area);
        self.draw_scrollbar(frame, scrollbar_area);

        let cursor_row = self
            .display
            .last_cursor_visual()
            .filter(|cursor| {
                cursor.line >= self.scroll_top && cursor.line < self.scroll_top + viewport_height
            })
            .map(|cursor| {
                let y = text_area.y + (cursor.line - self.scroll_top) as u16;
                let x = text_area.x + cursor.column.min(text_area.width - 1);
                (x, y)
            });

        if focused
            && !self.command_bar.has_focus()
            && self.dialog.is_none()
            && let Some((x, y)) = cursor_row
        {
            frame.set_cursor_position(Position::new(x, y));
        }

        if self.command_bar.is_visible() {
            self.draw_command_bar(frame, text_area, cursor_row);
        }
    }

    fn draw_scrollbar(&self, frame: &mut Frame, area: Rect) {
        let viewport = self.last_viewport_height;
        let total = self.last_total_lines;
        if area.height == 0 || viewport == 0 || total <= viewport {
            return;
        }
        let knob_size = ((viewport * viewport) / total).clamp(1, viewport);
        let max_scroll = total - viewport;
        let track = viewport - knob_size;
        let knob_start = (self.scroll_top.min(max_scroll) * track) / max_scroll.max(1);

        for row in 0..viewport.min(area.height as usize) {
            let style = if row >= knob_start && row < knob_start + knob_size {
                Style::default().add_modifier(Modifier::REVERSED)
            } else {
                Style::default()
            };
            let cell = Rect::new(area.x, area.y + row as u16, 1, 1);
            frame.render_widget(Paragraph::new(Span::styled(" ", style)), cell);
        }
    }

    /// Floats the formatting toolbar just above the caret line, or below it
    /// when the caret sits on the first visible line.
    fn draw_command_bar(&mut self, frame: &mut Frame, text_area: Rect, cursor: Option<(u16, u16)>) {
        let labels: Vec<(BarCommand, String)> = BarCommand::ALL
            .iter()
            .map(|command| (*command, format!(" {} ", command.label())))
            .collect();
        let width: u16 = labels
            .iter()
            .map(|(_, label)| label.width() as u16 + 1)
            .sum::<u16>()
            .saturating_sub(1);
        if text_area.width < width || text_area.height < 2 {
            return;
        }

        let (cursor_x, cursor_y) = cursor.unwrap_or((text_area.x, text_area.y + 1));
        let y = if cursor_y > text_area.y {
            cursor_y - 1
        } else {
            (cursor_y + 1).min(text_area.y + text_area.height - 1)
        };
        let max_x = text_area.x + text_area.width - width;
        let x = cursor_x.saturating_sub(width / 2).clamp(text_area.x, max_x);

        frame.render_widget(Clear, Rect::new(x, y, width, 1));
        let highlighted = self.command_bar.has_focus().then(|| self.command_bar.highlighted());
        let mut column = x;
        for (index, (command, label)) in labels.into_iter().enumerate() {
            if index > 0 {
                let separator = Rect::new(column, y, 1, 1);
                frame.render_widget(
                    Paragraph::new(Span::styled("│", self.theme.bar_style())),
                    separator,
                );
                column += 1;
            }
            let label_width = label.width() as u16;
            let rect = Rect::new(column, y, label_width, 1);
            let style = self.theme.bar_button_style(
                self.command_bar.is_pressed(command),
                highlighted == Some(command),
            );
            frame.render_widget(Paragraph::new(Span::styled(label, style)), rect);
            self.bar_buttons.push((rect, command));
            column += label_width;
        }
    }

    fn draw_dialog(&self, frame: &mut Frame, area: Rect) {
        let Some(dialog) = &self.dialog else {
            return;
        };
        if area.width < 10 || area.height < 5 {
            return;
        }
        let width = 56.min(area.width);
        let height = if dialog.kind.has_input() { 5 } else { 4 };
        let popup = Rect::new(
            area.x + (area.width - width) / 2,
            area.y + (area.height.saturating_sub(height)) / 2,
            width,
            height,
        );
        frame.render_widget(Clear, popup);

        let style = self.theme.dialog_style();
        let block = Block::default()
            .title(dialog.kind.title())
            .borders(Borders::ALL)
            .style(style)
            .border_style(self.theme.border_style(true));
        let inner = block.inner(popup);
        frame.render_widget(block, popup);

        let mut lines = vec![Line::from(dialog.kind.prompt())];
        if dialog.kind.has_input() {
            lines.push(Line::from(Span::styled(
                dialog.input.value.clone(),
                style.add_modifier(Modifier::UNDERLINED),
            )));
        }
        frame.render_widget(Paragraph::new(lines).style(style), inner);

        if dialog.kind.has_input() && inner.height > 1 {
            let x = inner.x + dialog.input.cursor_column().min(inner.width.saturating_sub(1));
            frame.set_cursor_position(Position::new(x, inner.y + 1));
        }
    }

    fn status_line(&mut self, terminal_width: usize) -> Line<'static> {
        self.prune_status_message();

        if let Some((message, _)) = &self.status_message {
            return Line::from(Span::styled(
                format!(" {}", message.text),
                self.theme.status_message_style(message.kind),
            ));
        }

        let mut spans = Vec::new();
        match self.documents.active_document() {
            Some(document) => {
                let marker = if self.is_dirty() { "*" } else { "" };
                spans.push(Span::styled(
                    format!(" {}{}", document.title, marker),
                    Style::default().fg(self.theme.title_color),
                ));
                let editor = self.editor();
                spans.push(Span::raw(format!(
                    ", {}, {} · {} words",
                    editor.current_block_kind().label(),
                    editor.current_alignment().label(),
                    editor.document().word_count()
                )));
            }
            None => spans.push(Span::raw(" No document")),
        }
        if self.in_flight > 0 {
            spans.push(Span::raw(" · syncing…"));
        }

        // Least important first
        let all_shortcuts = ["^E:Share", "F2:Rename", "^N:New", "^S:Save", "^Q:Quit"];
        let left_width: usize = spans.iter().map(|span| span.content.width()).sum();
        let min_padding = 1;
        let mut shown: Vec<&str> = Vec::new();
        let mut shortcuts_width = 0;
        for shortcut in all_shortcuts.iter().rev() {
            let test_width = if shown.is_empty() {
                shortcut.len()
            } else {
                shortcuts_width + 1 + shortcut.len()
            };
            if left_width + min_padding + test_width < terminal_width {
                shown.insert(0, shortcut);
                shortcuts_width = test_width;
            } else {
                break;
            }
        }
        if !shown.is_empty() {
            let padding = terminal_width
                .saturating_sub(left_width)
                .saturating_sub(shortcuts_width)
                .max(min_padding);
            spans.push(Span::raw(" ".repeat(padding)));
            spans.push(Span::raw(shown.join(" ")));
        }

        Line::from(spans)
    }

    fn adjust_scroll(&mut self, render: &RenderResult, viewport_height: usize) {
        let viewport = viewport_height.max(1);
        let max_scroll = render.total_lines.saturating_sub(viewport);
        if self.scroll_top > max_scroll {
            self.scroll_top = max_scroll;
        }
        if self.display.cursor_following()
            && let Some(cursor) = self.display.last_cursor_visual()
        {
            self.scroll_top = self.scroll_top_for_cursor(cursor.line, viewport, max_scroll);
        }
    }

    fn scroll_top_for_cursor(
        &self,
        cursor_line: usize,
        viewport: usize,
        max_scroll: usize,
    ) -> usize {
        let mut scroll = self.scroll_top.min(max_scroll);
        if viewport == 0 {
            return scroll;
        }

        let margin = if viewport >= 3 { 1 } else { 0 };
        let top_limit = scroll.saturating_add(margin);
        let bottom_offset = viewport.saturating_sub(1).saturating_sub(margin);
        let bottom_limit = scroll.saturating_add(bottom_offset);
        if cursor_line < top_limit {
            scroll = cursor_line.saturating_sub(margin);
        } else if cursor_line > bottom_limit {
            scroll = cursor_line.saturating_sub(bottom_offset);
        }

        scroll.min(max_scroll)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn older_save_answering_late_keeps_newer_edits_dirty() {
        let mut saves = SaveTracker::default();
        saves.edited();
        let first = saves.issue();
        saves.edited();
        let second = saves.issue();
        saves.edited();

        assert!(saves.confirm(second));
        assert!(saves.is_dirty());
        assert!(!saves.confirm(first));
        assert!(saves.is_dirty());

        let third = saves.issue();
        assert!(saves.confirm(third));
        assert!(!saves.is_dirty());
    }

    #[test]
    fn earlier_save_answering_first_leaves_newer_edits_dirty() {
        let mut saves = SaveTracker::default();
        saves.edited();
        let first = saves.issue();
        saves.edited();
        let _second = saves.issue();

        assert!(saves.confirm(first));
        assert!(saves.is_dirty());
    }

    #[test]
    fn save_from_a_previous_document_is_ignored() {
        let mut saves = SaveTracker::default();
        saves.edited();
        let ticket = saves.issue();
        saves.switched();
        saves.edited();

        assert!(!saves.confirm(ticket));
        assert!(saves.is_dirty());
    }

    #[test]
    fn narrow_terminals_wrap_without_padding() {
        assert_eq!(editor_wrap_configuration(0), (1, 0));
        assert_eq!(editor_wrap_configuration(40), (39, 0));
        assert_eq!(editor_wrap_configuration(80), (76, 2));
    }

    #[test]
    fn wide_terminals_center_the_text() {
        let (wrap, padding) = editor_wrap_configuration(140);
        assert_eq!(padding, 24);
        assert_eq!(wrap, 92);
    }

    #[test]
    fn text_input_edits_at_cursor() {
        let mut input = TextInput::with_value("héllo");
        input.handle_key(KeyCode::Home);
        input.handle_key(KeyCode::Right);
        input.handle_key(KeyCode::Delete);
        input.handle_key(KeyCode::Char('e'));
        assert_eq!(input.value, "hello");
        assert_eq!(input.cursor_column(), 2);

        input.handle_key(KeyCode::End);
        input.handle_key(KeyCode::Backspace);
        assert_eq!(input.value, "hell");
    }
}
