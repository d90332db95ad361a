use super::*;
use crate::document::Marks;
use crate::editor::CursorPointer;
use crate::status::StatusKind;
use crate::sync::fake::{Call, FakeDocumentApi, doc};

async fn loaded_controller(api: FakeDocumentApi) -> (Arc<FakeDocumentApi>, DocumentListController) {
    let api = Arc::new(api);
    let mut controller = DocumentListController::new(api.clone());
    for job in controller.load().unwrap() {
        assert_eq!(controller.run(job).await, None);
    }
    (api, controller)
}

fn rejected(result: Result<Job, StatusMessage>) -> StatusMessage {
    match result {
        Ok(_) => panic!("expected the operation to be rejected"),
        Err(message) => message,
    }
}

fn two_documents() -> FakeDocumentApi {
    FakeDocumentApi::new().with_owned(vec![
        doc("a", "Alpha", "<p>alpha body</p>"),
        doc("b", "Beta", "<p>beta body</p>"),
    ])
}

#[tokio::test]
async fn load_fetches_both_lists_once() {
    let api = Arc::new(
        two_documents().with_shared(vec![doc("s", "From a friend", "<p>shared</p>")]),
    );
    let mut controller = DocumentListController::new(api.clone());

    let jobs = controller.load().unwrap();
    assert_eq!(jobs.len(), 2);
    assert_eq!(controller.list(ListKind::Owned).state(), LoadState::Loading);
    assert_eq!(controller.list(ListKind::Shared).state(), LoadState::Loading);

    for job in jobs {
        assert_eq!(controller.run(job).await, None);
    }
    assert_eq!(controller.list(ListKind::Owned).state(), LoadState::Loaded);
    assert_eq!(controller.list(ListKind::Owned).documents().len(), 2);
    assert_eq!(controller.list(ListKind::Shared).documents()[0].title, "From a friend");

    assert!(controller.load().unwrap().is_empty());
    assert_eq!(api.calls(), vec![Call::ListOwned, Call::ListShared]);
}

#[tokio::test]
async fn failed_load_can_be_retried() {
    let api = Arc::new(two_documents());
    api.fail("list_shared", 503, None);
    let mut controller = DocumentListController::new(api.clone());

    let mut messages = Vec::new();
    for job in controller.load().unwrap() {
        messages.extend(controller.run(job).await);
    }
    assert_eq!(
        messages,
        vec![StatusMessage::error("Failed to load shared documents")]
    );
    assert_eq!(controller.list(ListKind::Shared).state(), LoadState::Unloaded);
    assert_eq!(controller.list(ListKind::Owned).state(), LoadState::Loaded);

    let retry = controller.load().unwrap();
    assert_eq!(retry.len(), 1);
    assert!(controller.reload(ListKind::Shared).unwrap().is_none());
}

#[tokio::test]
async fn signed_out_load_issues_no_request() {
    let api = Arc::new(FakeDocumentApi::signed_out());
    let mut controller = DocumentListController::new(api.clone());

    let Err(message) = controller.load() else {
        panic!("load should require a credential");
    };
    assert!(message.is_error());
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn save_without_active_document_is_rejected_locally() {
    let (api, mut controller) = loaded_controller(two_documents()).await;

    let message = rejected(controller.save_active_content("<p>x</p>".to_string()));

    assert_eq!(message, StatusMessage::error(SELECT_DOCUMENT_FIRST));
    assert_eq!(api.calls(), vec![Call::ListOwned, Call::ListShared]);
    assert_eq!(
        rejected(controller.rename_active("New")),
        StatusMessage::error(SELECT_DOCUMENT_FIRST)
    );
    assert_eq!(
        rejected(controller.delete_active()),
        StatusMessage::error(SELECT_DOCUMENT_FIRST)
    );
}

#[tokio::test]
async fn save_answered_after_switch_does_not_touch_new_document() {
    let (api, mut controller) = loaded_controller(two_documents()).await;
    controller.select_active(&DocumentId::new("a")).unwrap();
    controller.editor_mut().move_to_document_end(false);
    controller.editor_mut().insert_text(" edited");

    let pending = controller.save_active().unwrap();
    controller.select_active(&DocumentId::new("b")).unwrap();
    let completion = pending.await;

    assert_eq!(controller.apply(completion), None);
    assert_eq!(controller.editor().serialize(), "<p>beta body</p>");
    assert_eq!(controller.active_id(), Some(&DocumentId::new("b")));
    // The request itself still reached the server.
    assert!(api.calls().iter().any(|call| matches!(
        call,
        Call::Update { id, .. } if id == &DocumentId::new("a")
    )));

    controller.select_active(&DocumentId::new("a")).unwrap();
    assert_eq!(controller.editor().serialize(), "<p>alpha body edited</p>");
}

#[tokio::test]
async fn failed_save_after_switch_keeps_cached_content() {
    let (api, mut controller) = loaded_controller(two_documents()).await;
    api.fail("update", 500, Some("disk full"));
    controller.select_active(&DocumentId::new("a")).unwrap();
    controller.editor_mut().insert_text("lost ");

    let pending = controller.save_active().unwrap();
    controller.select_active(&DocumentId::new("b")).unwrap();

    assert_eq!(controller.apply(pending.await), None);
    controller.select_active(&DocumentId::new("a")).unwrap();
    assert_eq!(controller.editor().serialize(), "<p>alpha body</p>");
}

#[tokio::test]
async fn create_type_bold_and_save() {
    let (api, mut controller) = loaded_controller(two_documents()).await;

    let job = controller.create_new().unwrap();
    assert_eq!(
        controller.run(job).await,
        Some(StatusMessage::success("Document created"))
    );

    let owned = controller.list(ListKind::Owned).documents();
    assert_eq!(owned.len(), 3);
    assert_eq!(owned[0].title, "Untitled");
    assert_eq!(owned[0].content, "");
    let id = owned[0].id.clone();
    assert_eq!(controller.active_id(), Some(&id));
    assert_eq!(controller.editor().serialize(), "<p></p>");

    let editor = controller.editor_mut();
    editor.insert_text("Hello");
    assert!(editor.select_all());
    assert!(editor.toggle_mark(crate::document::Mark::Bold));
    let serialized = editor.serialize();
    assert!(serialized.contains("<strong>Hello</strong>"));

    let job = controller.save_active().unwrap();
    assert_eq!(
        controller.run(job).await,
        Some(StatusMessage::success("Document saved"))
    );

    assert_eq!(
        api.calls().last(),
        Some(&Call::Update {
            id: id.clone(),
            changes: DocumentChanges::content_and_title(serialized.clone(), "Untitled"),
        })
    );
    assert_eq!(controller.list(ListKind::Owned).get(&id).unwrap().content, serialized);
}

#[tokio::test]
async fn selecting_shared_document_loads_plain_content() {
    let (_api, mut controller) = loaded_controller(
        FakeDocumentApi::new().with_shared(vec![doc("s1", "Notes", "<p>just plain text</p>")]),
    )
    .await;

    controller.select_active(&DocumentId::new("s1")).unwrap();

    let editor = controller.editor_mut();
    assert_eq!(editor.serialize(), "<p>just plain text</p>");
    assert!(editor.set_selection(CursorPointer::new(0, 0), CursorPointer::new(0, 4)));
    assert_eq!(editor.active_marks(), Marks::empty());
}

#[tokio::test]
async fn failed_rename_keeps_title_and_reports_error() {
    let (api, mut controller) = loaded_controller(two_documents()).await;
    controller.select_active(&DocumentId::new("a")).unwrap();
    api.fail("update", 500, None);

    let job = controller.rename_active("Renamed").unwrap();
    let message = controller.run(job).await.unwrap();

    assert_eq!(message.kind, StatusKind::Error);
    assert_eq!(message.text, "Failed to rename document");
    assert_eq!(controller.active_document().unwrap().title, "Alpha");
}

#[tokio::test]
async fn rename_patches_whichever_list_holds_the_document() {
    let (api, mut controller) = loaded_controller(
        FakeDocumentApi::new().with_shared(vec![doc("s1", "Old", "<p>x</p>")]),
    )
    .await;
    controller.select_active(&DocumentId::new("s1")).unwrap();

    let job = controller.rename_active("  New title ").unwrap();
    assert_eq!(
        controller.run(job).await,
        Some(StatusMessage::success("Title updated"))
    );
    assert_eq!(
        controller.list(ListKind::Shared).documents()[0].title,
        "New title"
    );
    assert_eq!(
        api.calls().last(),
        Some(&Call::Update {
            id: DocumentId::new("s1"),
            changes: DocumentChanges::title("New title"),
        })
    );
    assert!(rejected(controller.rename_active("   ")).is_error());
}

#[tokio::test]
async fn failed_save_keeps_editor_and_shows_server_text() {
    let (api, mut controller) = loaded_controller(two_documents()).await;
    controller.select_active(&DocumentId::new("b")).unwrap();
    controller.editor_mut().select_all();
    controller.editor_mut().insert_text("rewritten");
    api.fail("update", 403, Some("Read-only document"));

    let job = controller.save_active().unwrap();
    let message = controller.run(job).await.unwrap();

    assert_eq!(
        message,
        StatusMessage::error("Failed to save document: Read-only document")
    );
    assert_eq!(controller.editor().serialize(), "<p>rewritten</p>");
    assert_eq!(
        controller.list(ListKind::Owned).get(&DocumentId::new("b")).unwrap().content,
        "<p>beta body</p>"
    );
}

#[tokio::test]
async fn delete_removes_owned_document_and_clears_editor() {
    let (api, mut controller) = loaded_controller(two_documents()).await;
    controller.select_active(&DocumentId::new("a")).unwrap();

    let job = controller.delete_active().unwrap();
    assert_eq!(
        controller.run(job).await,
        Some(StatusMessage::success("Document deleted"))
    );

    assert_eq!(controller.active_id(), None);
    assert_eq!(controller.editor().serialize(), "<p></p>");
    assert_eq!(controller.list(ListKind::Owned).documents().len(), 1);
    assert_eq!(api.owned().len(), 1);
}

#[tokio::test]
async fn shared_documents_cannot_be_deleted() {
    let (api, mut controller) = loaded_controller(
        FakeDocumentApi::new().with_shared(vec![doc("s1", "Theirs", "")]),
    )
    .await;
    controller.select_active(&DocumentId::new("s1")).unwrap();

    let message = rejected(controller.delete_active());

    assert_eq!(
        message,
        StatusMessage::error("Only the owner can delete a document")
    );
    assert!(!api.calls().iter().any(|call| matches!(call, Call::Delete { .. })));
}

#[tokio::test]
async fn create_finishing_after_switch_keeps_current_selection() {
    let (_api, mut controller) = loaded_controller(two_documents()).await;
    controller.select_active(&DocumentId::new("a")).unwrap();

    let pending = controller.create_new().unwrap();
    controller.select_active(&DocumentId::new("b")).unwrap();
    let message = controller.apply(pending.await);

    assert_eq!(message, Some(StatusMessage::success("Document created")));
    assert_eq!(controller.list(ListKind::Owned).documents()[0].title, "Untitled");
    assert_eq!(controller.active_id(), Some(&DocumentId::new("b")));
    assert_eq!(controller.editor().serialize(), "<p>beta body</p>");
}

#[test]
fn selecting_unknown_document_fails() {
    let mut controller = DocumentListController::new(Arc::new(FakeDocumentApi::new()));
    let message = controller.select_active(&DocumentId::new("missing")).unwrap_err();
    assert!(message.is_error());
    assert_eq!(controller.active_id(), None);
}
