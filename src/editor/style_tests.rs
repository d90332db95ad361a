use super::*;
use crate::document::{Mark, Marks};

fn editor_with(content: &str) -> DocumentEditor {
    DocumentEditor::from_content(content)
}

#[test]
fn toggle_mark_splits_span() {
    let mut editor = editor_with("<p>hello world</p>");
    editor.set_selection(CursorPointer::new(0, 0), CursorPointer::new(0, 5));

    assert!(editor.toggle_mark(Mark::Bold));

    assert_eq!(editor.serialize(), "<p><strong>hello</strong> world</p>");
}

#[test]
fn toggle_mark_on_mixed_selection_turns_mark_on() {
    let mut editor = editor_with("<p><strong>hel</strong>lo world</p>");
    editor.set_selection(CursorPointer::new(0, 0), CursorPointer::new(0, 5));
    assert!(!editor.active_marks().contains(Marks::BOLD));

    assert!(editor.toggle_mark(Mark::Bold));

    assert!(editor.active_marks().contains(Marks::BOLD));
    assert_eq!(editor.serialize(), "<p><strong>hello</strong> world</p>");
}

#[test]
fn toggle_mark_twice_restores_plain_text() {
    let mut editor = editor_with("<p>styled text</p>");
    editor.set_selection(CursorPointer::new(0, 0), CursorPointer::new(0, 6));

    assert!(editor.toggle_mark(Mark::Underline));
    assert!(editor.toggle_mark(Mark::Underline));

    assert_eq!(editor.serialize(), "<p>styled text</p>");
}

#[test]
fn marks_combine_independently() {
    let mut editor = editor_with("<p>text</p>");
    editor.select_all();
    editor.toggle_mark(Mark::Bold);
    editor.toggle_mark(Mark::Italic);
    editor.toggle_mark(Mark::Underline);

    assert_eq!(
        editor.active_marks(),
        Marks::BOLD | Marks::ITALIC | Marks::UNDERLINE
    );
    assert_eq!(editor.serialize(), "<p><strong><em><u>text</u></em></strong></p>");
}

#[test]
fn toggle_mark_with_collapsed_selection_is_noop() {
    let mut editor = editor_with("<p>text</p>");
    editor.move_to_pointer(CursorPointer::new(0, 2));

    assert!(!editor.toggle_mark(Mark::Bold));
    assert_eq!(editor.serialize(), "<p>text</p>");
}

#[test]
fn toggle_mark_across_blocks() {
    let mut editor = editor_with("<p>first</p><p>second</p>");
    editor.set_selection(CursorPointer::new(0, 3), CursorPointer::new(1, 3));

    assert!(editor.toggle_mark(Mark::Italic));

    assert_eq!(
        editor.serialize(),
        "<p>fir<em>st</em></p><p><em>sec</em>ond</p>"
    );
}

#[test]
fn plain_selection_has_no_active_marks() {
    let editor_marks = {
        let mut editor = editor_with("<p>just some text</p>");
        editor.set_selection(CursorPointer::new(0, 0), CursorPointer::new(0, 4));
        editor.active_marks()
    };
    assert!(editor_marks.is_empty());
}

#[test]
fn set_link_replaces_existing_link() {
    let mut editor = editor_with("<p><a href=\"/old\">click here</a></p>");
    editor.set_selection(CursorPointer::new(0, 0), CursorPointer::new(0, 5));

    assert!(editor.set_link(Some("/new")));

    assert_eq!(
        editor.serialize(),
        "<p><a href=\"/new\">click</a><a href=\"/old\"> here</a></p>"
    );
    assert_eq!(editor.active_link(), Some("/new"));
    assert!(editor.active_marks().contains(Marks::LINK));
}

#[test]
fn set_link_none_removes_link() {
    let mut editor = editor_with("<p><a href=\"/old\"><strong>click</strong></a></p>");
    editor.select_all();

    assert!(editor.set_link(None));

    assert_eq!(editor.serialize(), "<p><strong>click</strong></p>");
    assert_eq!(editor.active_link(), None);
    assert!(!editor.set_link(None));
}

#[test]
fn active_link_requires_single_href() {
    let mut editor = editor_with("<p><a href=\"/a\">a</a><a href=\"/b\">b</a></p>");
    editor.select_all();

    assert_eq!(editor.active_link(), None);
    assert!(editor.active_marks().contains(Marks::LINK));
}

#[test]
fn collapsed_caret_reports_typing_marks() {
    let mut editor = editor_with("<p><em>slanted</em> upright</p>");
    editor.move_to_pointer(CursorPointer::new(0, 3));
    assert_eq!(editor.active_marks(), Marks::ITALIC);

    editor.move_to_pointer(CursorPointer::new(0, 10));
    assert!(editor.active_marks().is_empty());
}

#[test]
fn marks_label_lists_active_marks() {
    assert_eq!(marks_label(Marks::BOLD | Marks::LINK), "Bold + Link");
    assert_eq!(marks_label(Marks::empty()), "");
}
