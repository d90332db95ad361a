//! Owned and shared document lists plus the active document.
//!
//! Every operation is split in two: the issuing call checks preconditions
//! synchronously and returns a [`Job`] that performs the request, and
//! [`DocumentListController::apply`] folds the finished [`Completion`] back
//! into local state. The caller decides where jobs run; the controller itself
//! is only touched from the UI thread.
//!
//! Lists are patched locally after each mutation instead of being re-fetched,
//! so they are only eventually consistent with the server when another
//! session edits the same documents.

use std::sync::Arc;

use futures::future::BoxFuture;

use crate::editor::DocumentEditor;
use crate::error::SyncError;
use crate::status::{SELECT_DOCUMENT_FIRST, StatusMessage};
use crate::sync::{CollabDocument, DEFAULT_TITLE, DocumentApi, DocumentChanges, DocumentId};

pub type Job = BoxFuture<'static, Completion>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListKind {
    Owned,
    Shared,
}

impl ListKind {
    pub fn label(self) -> &'static str {
        match self {
            ListKind::Owned => "My documents",
            ListKind::Shared => "Shared with me",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LoadState {
    #[default]
    Unloaded,
    Loading,
    Loaded,
}

#[derive(Debug, Default)]
pub struct DocumentList {
    state: LoadState,
    documents: Vec<CollabDocument>,
}

impl DocumentList {
    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn documents(&self) -> &[CollabDocument] {
        &self.documents
    }

    pub fn get(&self, id: &DocumentId) -> Option<&CollabDocument> {
        self.documents.iter().find(|document| &document.id == id)
    }

    fn get_mut(&mut self, id: &DocumentId) -> Option<&mut CollabDocument> {
        self.documents.iter_mut().find(|document| &document.id == id)
    }

    pub fn contains(&self, id: &DocumentId) -> bool {
        self.get(id).is_some()
    }
}

/// A finished request, ready to be applied on the UI thread.
#[derive(Debug)]
pub enum Completion {
    Loaded {
        kind: ListKind,
        result: Result<Vec<CollabDocument>, SyncError>,
    },
    Created {
        active_when_issued: Option<DocumentId>,
        result: Result<CollabDocument, SyncError>,
    },
    Renamed {
        id: DocumentId,
        title: String,
        result: Result<(), SyncError>,
    },
    Saved {
        id: DocumentId,
        content: String,
        result: Result<(), SyncError>,
    },
    Deleted {
        id: DocumentId,
        result: Result<(), SyncError>,
    },
}

pub struct DocumentListController {
    api: Arc<dyn DocumentApi>,
    editor: DocumentEditor,
    owned: DocumentList,
    shared: DocumentList,
    active: Option<DocumentId>,
}

impl DocumentListController {
    pub fn new(api: Arc<dyn DocumentApi>) -> Self {
        Self {
            api,
            editor: DocumentEditor::default(),
            owned: DocumentList::default(),
            shared: DocumentList::default(),
            active: None,
        }
    }

    pub fn editor(&self) -> &DocumentEditor {
        &self.editor
    }

    pub fn editor_mut(&mut self) -> &mut DocumentEditor {
        &mut self.editor
    }

    pub fn list(&self, kind: ListKind) -> &DocumentList {
        match kind {
            ListKind::Owned => &self.owned,
            ListKind::Shared => &self.shared,
        }
    }

    fn list_mut(&mut self, kind: ListKind) -> &mut DocumentList {
        match kind {
            ListKind::Owned => &mut self.owned,
            ListKind::Shared => &mut self.shared,
        }
    }

    pub fn active_id(&self) -> Option<&DocumentId> {
        self.active.as_ref()
    }

    pub fn active_document(&self) -> Option<&CollabDocument> {
        self.active.as_ref().and_then(|id| self.find(id))
    }

    fn find(&self, id: &DocumentId) -> Option<&CollabDocument> {
        self.owned.get(id).or_else(|| self.shared.get(id))
    }

    fn find_mut(&mut self, id: &DocumentId) -> Option<&mut CollabDocument> {
        if self.owned.contains(id) {
            self.owned.get_mut(id)
        } else {
            self.shared.get_mut(id)
        }
    }

    fn require_credential(&self) -> Result<(), StatusMessage> {
        if self.api.has_credential() {
            Ok(())
        } else {
            Err(StatusMessage::error(SyncError::MissingCredential.to_string()))
        }
    }

    fn require_active(&self) -> Result<DocumentId, StatusMessage> {
        let id = self
            .active
            .clone()
            .ok_or_else(|| StatusMessage::error(SELECT_DOCUMENT_FIRST))?;
        self.require_credential()?;
        Ok(id)
    }

    /// Starts loading every list that has not been loaded yet.
    pub fn load(&mut self) -> Result<Vec<Job>, StatusMessage> {
        self.require_credential()?;
        let mut jobs = Vec::new();
        for kind in [ListKind::Owned, ListKind::Shared] {
            if self.list(kind).state == LoadState::Unloaded {
                jobs.push(self.start_load(kind));
            }
        }
        Ok(jobs)
    }

    /// Re-fetches one list, replacing it wholesale once the response arrives.
    pub fn reload(&mut self, kind: ListKind) -> Result<Option<Job>, StatusMessage> {
        self.require_credential()?;
        if self.list(kind).state == LoadState::Loading {
            return Ok(None);
        }
        Ok(Some(self.start_load(kind)))
    }

    fn start_load(&mut self, kind: ListKind) -> Job {
        self.list_mut(kind).state = LoadState::Loading;
        tracing::debug!(list = ?kind, "loading document list");
        let api = Arc::clone(&self.api);
        Box::pin(async move {
            let result = match kind {
                ListKind::Owned => api.list_owned().await,
                ListKind::Shared => api.list_shared().await,
            };
            Completion::Loaded { kind, result }
        })
    }

    /// Makes `id` the active document and loads its content into the editor.
    pub fn select_active(&mut self, id: &DocumentId) -> Result<(), StatusMessage> {
        let content = self
            .find(id)
            .map(|document| document.content.clone())
            .ok_or_else(|| StatusMessage::error("Document not found"))?;
        self.editor.load_content(&content);
        self.active = Some(id.clone());
        tracing::debug!(%id, "selected active document");
        Ok(())
    }

    pub fn create_new(&mut self) -> Result<Job, StatusMessage> {
        self.require_credential()?;
        let api = Arc::clone(&self.api);
        let active_when_issued = self.active.clone();
        Ok(Box::pin(async move {
            let result = api.create(DEFAULT_TITLE, "").await;
            Completion::Created {
                active_when_issued,
                result,
            }
        }))
    }

    pub fn rename_active(&mut self, title: &str) -> Result<Job, StatusMessage> {
        let id = self.require_active()?;
        let title = title.trim().to_string();
        if title.is_empty() {
            return Err(StatusMessage::error("Title cannot be empty"));
        }
        let api = Arc::clone(&self.api);
        Ok(Box::pin(async move {
            let result = api.update(&id, &DocumentChanges::title(title.clone())).await;
            Completion::Renamed { id, title, result }
        }))
    }

    /// Persists `content` together with the active document's current title.
    pub fn save_active_content(&mut self, content: String) -> Result<Job, StatusMessage> {
        let id = self.require_active()?;
        let title = self
            .find(&id)
            .map(|document| document.title.clone())
            .unwrap_or_else(|| DEFAULT_TITLE.to_string());
        let api = Arc::clone(&self.api);
        Ok(Box::pin(async move {
            let changes = DocumentChanges::content_and_title(content, title);
            let result = api.update(&id, &changes).await;
            let content = changes.content.unwrap_or_default();
            Completion::Saved {
                id,
                content,
                result,
            }
        }))
    }

    /// Saves whatever the editor currently holds.
    pub fn save_active(&mut self) -> Result<Job, StatusMessage> {
        let content = self.editor.serialize();
        self.save_active_content(content)
    }

    pub fn delete_active(&mut self) -> Result<Job, StatusMessage> {
        let id = self.require_active()?;
        if !self.owned.contains(&id) {
            return Err(StatusMessage::error("Only the owner can delete a document"));
        }
        let api = Arc::clone(&self.api);
        Ok(Box::pin(async move {
            let result = api.delete(&id).await;
            Completion::Deleted { id, result }
        }))
    }

    /// Awaits `job` and applies its completion.
    pub async fn run(&mut self, job: Job) -> Option<StatusMessage> {
        let completion = job.await;
        self.apply(completion)
    }

    /// Folds a finished request into local state. Returns the message to show,
    /// or `None` when the completion was stale or needs no notification.
    pub fn apply(&mut self, completion: Completion) -> Option<StatusMessage> {
        match completion {
            Completion::Loaded { kind, result } => self.apply_loaded(kind, result),
            Completion::Created {
                active_when_issued,
                result,
            } => Some(self.apply_created(active_when_issued, result)),
            Completion::Renamed { id, title, result } => {
                Some(self.apply_renamed(id, title, result))
            }
            Completion::Saved {
                id,
                content,
                result,
            } => self.apply_saved(id, content, result),
            Completion::Deleted { id, result } => Some(self.apply_deleted(id, result)),
        }
    }

    fn apply_loaded(
        &mut self,
        kind: ListKind,
        result: Result<Vec<CollabDocument>, SyncError>,
    ) -> Option<StatusMessage> {
        let list = self.list_mut(kind);
        match result {
            Ok(documents) => {
                tracing::info!(list = ?kind, count = documents.len(), "document list loaded");
                list.documents = documents;
                list.state = LoadState::Loaded;
                None
            }
            Err(err) => {
                list.state = LoadState::Unloaded;
                Some(failure(
                    match kind {
                        ListKind::Owned => "Failed to load your documents",
                        ListKind::Shared => "Failed to load shared documents",
                    },
                    &err,
                ))
            }
        }
    }

    fn apply_created(
        &mut self,
        active_when_issued: Option<DocumentId>,
        result: Result<CollabDocument, SyncError>,
    ) -> StatusMessage {
        let document = match result {
            Ok(document) => document,
            Err(err) => return failure("Failed to create document", &err),
        };
        let id = document.id.clone();
        self.owned.documents.insert(0, document);
        if self.active == active_when_issued {
            self.active = Some(id);
            self.editor.load_content("");
        } else {
            tracing::debug!(%id, "active document changed while creating, keeping selection");
        }
        StatusMessage::success("Document created")
    }

    fn apply_renamed(
        &mut self,
        id: DocumentId,
        title: String,
        result: Result<(), SyncError>,
    ) -> StatusMessage {
        if let Err(err) = result {
            return failure("Failed to rename document", &err);
        }
        if let Some(document) = self.find_mut(&id) {
            document.title = title;
        }
        StatusMessage::success("Title updated")
    }

    fn apply_saved(
        &mut self,
        id: DocumentId,
        content: String,
        result: Result<(), SyncError>,
    ) -> Option<StatusMessage> {
        if let (Ok(()), Some(document)) = (&result, self.find_mut(&id)) {
            document.content = content;
        }
        if self.active.as_ref() != Some(&id) {
            tracing::debug!(%id, "save answered for inactive document, staying silent");
            return None;
        }
        match result {
            Ok(()) => Some(StatusMessage::success("Document saved")),
            Err(err) => Some(failure("Failed to save document", &err)),
        }
    }

    fn apply_deleted(&mut self, id: DocumentId, result: Result<(), SyncError>) -> StatusMessage {
        if let Err(err) = result {
            return failure("Failed to delete document", &err);
        }
        self.owned.documents.retain(|document| document.id != id);
        if self.active.as_ref() == Some(&id) {
            self.active = None;
            self.editor.load_content("");
        }
        StatusMessage::success("Document deleted")
    }
}

/// Turns a failed request into an error message, adding the server's own
/// explanation when it sent one.
fn failure(action: &str, err: &SyncError) -> StatusMessage {
    match err {
        SyncError::MissingCredential | SyncError::InvalidRecipient => {
            StatusMessage::error(err.to_string())
        }
        _ => match err.server_message() {
            Some(message) => StatusMessage::error(format!("{action}: {message}")),
            None => StatusMessage::error(action),
        },
    }
}

#[cfg(test)]
#[path = "documents_tests.rs"]
mod tests;
