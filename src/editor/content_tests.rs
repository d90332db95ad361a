use super::content::{
    format_at, insert_text_at, prune_and_merge_spans, remove_range, split_spans_at, take_tail,
};
use crate::document::{Marks, Span};

fn spans() -> Vec<Span> {
    vec![
        Span::new_text("Hello "),
        Span::new_text("World").with_marks(Marks::BOLD),
        Span::new_text("!"),
    ]
}

#[test]
fn split_spans_at_existing_boundary_keeps_spans() {
    let mut spans = spans();
    assert_eq!(split_spans_at(&mut spans, 6), 1);
    assert_eq!(spans.len(), 3);
}

#[test]
fn split_spans_inside_span_creates_boundary() {
    let mut spans = spans();
    assert_eq!(split_spans_at(&mut spans, 8), 2);
    assert_eq!(spans[1].text, "Wo");
    assert_eq!(spans[2].text, "rld");
    assert_eq!(spans[2].marks, Marks::BOLD);
}

#[test]
fn split_spans_past_end_returns_len() {
    let mut spans = spans();
    assert_eq!(split_spans_at(&mut spans, 42), 3);
}

#[test]
fn remove_range_across_spans_merges_neighbours() {
    let mut spans = spans();
    assert!(remove_range(&mut spans, 5, 12));
    assert_eq!(spans, vec![Span::new_text("Hello")]);
}

#[test]
fn take_tail_splits_formatting() {
    let mut spans = spans();
    let tail = take_tail(&mut spans, 8);
    assert_eq!(
        spans,
        vec![
            Span::new_text("Hello "),
            Span::new_text("Wo").with_marks(Marks::BOLD)
        ]
    );
    assert_eq!(
        tail,
        vec![
            Span::new_text("rld").with_marks(Marks::BOLD),
            Span::new_text("!")
        ]
    );
}

#[test]
fn insert_at_start_uses_first_run_marks() {
    let mut spans = vec![Span::new_text("bold").with_marks(Marks::BOLD)];
    assert!(insert_text_at(&mut spans, 0, ">"));
    assert_eq!(spans, vec![Span::new_text(">bold").with_marks(Marks::BOLD)]);
}

#[test]
fn insert_handles_multibyte_text() {
    let mut spans = vec![Span::new_text("héllo")];
    assert!(insert_text_at(&mut spans, 2, "ü"));
    assert_eq!(spans[0].text, "héüllo");
}

#[test]
fn format_inside_link_keeps_href() {
    let spans = vec![Span::new_text("abc").with_link("/a")];
    assert_eq!(format_at(&spans, 1), (Marks::empty(), Some("/a".to_string())));
    assert_eq!(format_at(&spans, 3), (Marks::empty(), None));
}

#[test]
fn prune_drops_empty_and_merges_equal_runs() {
    let mut spans = vec![
        Span::new_text("a"),
        Span::new_text(""),
        Span::new_text("b"),
        Span::new_text("c").with_link("/x"),
        Span::new_text("d").with_link("/y"),
    ];
    prune_and_merge_spans(&mut spans);
    assert_eq!(
        spans,
        vec![
            Span::new_text("ab"),
            Span::new_text("c").with_link("/x"),
            Span::new_text("d").with_link("/y"),
        ]
    );
}
