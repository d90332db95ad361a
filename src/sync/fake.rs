use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{CollabDocument, DocumentApi, DocumentChanges, DocumentId};
use crate::error::{SyncError, SyncResult};

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Call {
    ListOwned,
    ListShared,
    Create { title: String, content: String },
    Update { id: DocumentId, changes: DocumentChanges },
    Share { id: DocumentId, email: String },
    Delete { id: DocumentId },
}

impl Call {
    fn operation(&self) -> &'static str {
        match self {
            Call::ListOwned => "list_owned",
            Call::ListShared => "list_shared",
            Call::Create { .. } => "create",
            Call::Update { .. } => "update",
            Call::Share { .. } => "share",
            Call::Delete { .. } => "delete",
        }
    }
}

#[derive(Default)]
struct FakeState {
    owned: Vec<CollabDocument>,
    shared: Vec<CollabDocument>,
    next_id: u64,
    calls: Vec<Call>,
    failures: HashMap<&'static str, (u16, Option<String>)>,
}

/// In-memory [`DocumentApi`] that records every request it receives.
pub(crate) struct FakeDocumentApi {
    signed_in: bool,
    state: Mutex<FakeState>,
}

pub(crate) fn doc(id: &str, title: &str, content: &str) -> CollabDocument {
    CollabDocument {
        id: DocumentId::new(id),
        title: title.to_string(),
        content: content.to_string(),
    }
}

impl FakeDocumentApi {
    pub(crate) fn new() -> Self {
        Self {
            signed_in: true,
            state: Mutex::new(FakeState::default()),
        }
    }

    pub(crate) fn signed_out() -> Self {
        Self {
            signed_in: false,
            ..Self::new()
        }
    }

    pub(crate) fn with_owned(self, documents: Vec<CollabDocument>) -> Self {
        self.state.lock().unwrap().owned = documents;
        self
    }

    pub(crate) fn with_shared(self, documents: Vec<CollabDocument>) -> Self {
        self.state.lock().unwrap().shared = documents;
        self
    }

    /// Makes every later call of `operation` fail with `status`.
    pub(crate) fn fail(&self, operation: &'static str, status: u16, message: Option<&str>) {
        self.state
            .lock()
            .unwrap()
            .failures
            .insert(operation, (status, message.map(str::to_string)));
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub(crate) fn owned(&self) -> Vec<CollabDocument> {
        self.state.lock().unwrap().owned.clone()
    }

    fn record(&self, call: Call) -> SyncResult<std::sync::MutexGuard<'_, FakeState>> {
        let mut state = self.state.lock().unwrap();
        let operation = call.operation();
        state.calls.push(call);
        if let Some((status, message)) = state.failures.get(operation).cloned() {
            return Err(SyncError::Status { status, message });
        }
        Ok(state)
    }
}

#[async_trait]
impl DocumentApi for FakeDocumentApi {
    fn has_credential(&self) -> bool {
        self.signed_in
    }

    async fn list_owned(&self) -> SyncResult<Vec<CollabDocument>> {
        let state = self.record(Call::ListOwned)?;
        Ok(state.owned.clone())
    }

    async fn list_shared(&self) -> SyncResult<Vec<CollabDocument>> {
        let state = self.record(Call::ListShared)?;
        Ok(state.shared.clone())
    }

    async fn create(&self, title: &str, content: &str) -> SyncResult<CollabDocument> {
        let mut state = self.record(Call::Create {
            title: title.to_string(),
            content: content.to_string(),
        })?;
        state.next_id += 1;
        let created = doc(&format!("doc-{}", state.next_id), title, content);
        state.owned.insert(0, created.clone());
        Ok(created)
    }

    async fn update(&self, id: &DocumentId, changes: &DocumentChanges) -> SyncResult<()> {
        let mut state = self.record(Call::Update {
            id: id.clone(),
            changes: changes.clone(),
        })?;
        let FakeState { owned, shared, .. } = &mut *state;
        let found = owned.iter_mut().chain(shared.iter_mut()).find(|d| &d.id == id);
        let Some(document) = found else {
            return Err(SyncError::Status {
                status: 404,
                message: Some("Document not found".to_string()),
            });
        };
        if let Some(title) = &changes.title {
            document.title = title.clone();
        }
        if let Some(content) = &changes.content {
            document.content = content.clone();
        }
        Ok(())
    }

    async fn share(&self, id: &DocumentId, recipient: &str) -> SyncResult<()> {
        self.record(Call::Share {
            id: id.clone(),
            email: recipient.to_string(),
        })?;
        Ok(())
    }

    async fn delete(&self, id: &DocumentId) -> SyncResult<()> {
        let mut state = self.record(Call::Delete { id: id.clone() })?;
        state.owned.retain(|d| &d.id != id);
        Ok(())
    }
}
