//! Network contract for Collab Zone documents.
//!
//! Updates are last-write-wins: there is no version or ETag, so whichever
//! `update` reaches the server last replaces the stored title/content, and
//! nothing here attempts to merge concurrent edits.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response};
use serde::{Deserialize, Deserializer, Serialize, de::DeserializeOwned};
use url::Url;

use crate::config::Config;
use crate::error::{SyncError, SyncResult};

#[cfg(test)]
pub(crate) mod fake;

pub const DEFAULT_TITLE: &str = "Untitled";

/// Server-assigned document identifier. Accepts both string and numeric ids.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for DocumentId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(i64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(id) => DocumentId(id),
            RawId::Number(id) => DocumentId(id.to_string()),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollabDocument {
    #[serde(alias = "_id")]
    pub id: DocumentId,
    #[serde(default = "default_title", deserialize_with = "title_or_default")]
    pub title: String,
    /// Markup produced by the editor.
    #[serde(default, deserialize_with = "string_or_empty")]
    pub content: String,
}

fn default_title() -> String {
    DEFAULT_TITLE.to_string()
}

fn title_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_else(default_title))
}

fn string_or_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Serialize)]
struct CreateDocumentRequest<'a> {
    title: &'a str,
    content: &'a str,
}

/// A partial update: only the fields that are `Some` are sent.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl DocumentChanges {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            content: None,
        }
    }

    pub fn content_and_title(content: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            content: Some(content.into()),
        }
    }
}

#[derive(Debug, Serialize)]
struct ShareRequest<'a> {
    email: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DocumentList {
    Bare(Vec<CollabDocument>),
    Wrapped { documents: Vec<CollabDocument> },
}

impl From<DocumentList> for Vec<CollabDocument> {
    fn from(list: DocumentList) -> Self {
        match list {
            DocumentList::Bare(documents) | DocumentList::Wrapped { documents } => documents,
        }
    }
}

/// Share recipients must look like an email address.
pub fn is_valid_recipient(recipient: &str) -> bool {
    recipient.trim().contains('@')
}

/// Supplies the bearer token attached to every request.
pub trait CredentialProvider: Send + Sync {
    fn bearer_token(&self) -> Option<String>;
}

/// A token fixed at startup, usually from configuration.
#[derive(Clone, Debug, Default)]
pub struct StaticToken(Option<String>);

impl StaticToken {
    pub fn new(token: Option<String>) -> Self {
        Self(token.filter(|token| !token.trim().is_empty()))
    }
}

impl CredentialProvider for StaticToken {
    fn bearer_token(&self) -> Option<String> {
        self.0.clone()
    }
}

/// The document operations the controllers rely on.
#[async_trait]
pub trait DocumentApi: Send + Sync {
    /// Whether a credential is available; checked before issuing requests.
    fn has_credential(&self) -> bool;

    async fn list_owned(&self) -> SyncResult<Vec<CollabDocument>>;

    async fn list_shared(&self) -> SyncResult<Vec<CollabDocument>>;

    async fn create(&self, title: &str, content: &str) -> SyncResult<CollabDocument>;

    async fn update(&self, id: &DocumentId, changes: &DocumentChanges) -> SyncResult<()>;

    async fn share(&self, id: &DocumentId, recipient: &str) -> SyncResult<()>;

    async fn delete(&self, id: &DocumentId) -> SyncResult<()>;
}

/// [`DocumentApi`] over HTTP.
pub struct DocumentSyncClient {
    client: reqwest::Client,
    base: Url,
    credentials: Arc<dyn CredentialProvider>,
}

impl DocumentSyncClient {
    pub fn new(
        base: Url,
        timeout: Duration,
        credentials: Arc<dyn CredentialProvider>,
    ) -> SyncResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base,
            credentials,
        })
    }

    pub fn from_config(config: &Config) -> SyncResult<Self> {
        Self::new(
            config.api_base.clone(),
            config.request_timeout,
            Arc::new(StaticToken::new(config.token.clone())),
        )
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn authorized(&self, request: RequestBuilder) -> SyncResult<RequestBuilder> {
        let token = self
            .credentials
            .bearer_token()
            .ok_or(SyncError::MissingCredential)?;
        Ok(request.bearer_auth(token))
    }

    async fn send(&self, request: RequestBuilder, operation: &'static str) -> SyncResult<Response> {
        let request = self.authorized(request)?;
        let response = request.send().await.map_err(|err| {
            tracing::warn!(operation, error = %err, "document request failed");
            SyncError::Transport(err)
        })?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!(operation, status = status.as_u16(), "document request completed");
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let parsed: ErrorBody = serde_json::from_str(&body).unwrap_or_default();
        let message = parsed
            .error
            .or(parsed.message)
            .filter(|message| !message.trim().is_empty());
        tracing::warn!(
            operation,
            status = status.as_u16(),
            message = message.as_deref().unwrap_or(""),
            "document request rejected"
        );
        Err(SyncError::Status {
            status: status.as_u16(),
            message,
        })
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> SyncResult<T> {
        response
            .json::<T>()
            .await
            .map_err(|err| SyncError::Decode(err.to_string()))
    }
}

#[async_trait]
impl DocumentApi for DocumentSyncClient {
    fn has_credential(&self) -> bool {
        self.credentials.bearer_token().is_some()
    }

    async fn list_owned(&self) -> SyncResult<Vec<CollabDocument>> {
        let request = self.client.get(self.endpoint(&[]));
        let response = self.send(request, "list_owned").await?;
        Ok(Self::decode::<DocumentList>(response).await?.into())
    }

    async fn list_shared(&self) -> SyncResult<Vec<CollabDocument>> {
        let request = self.client.get(self.endpoint(&["shared"]));
        let response = self.send(request, "list_shared").await?;
        Ok(Self::decode::<DocumentList>(response).await?.into())
    }

    async fn create(&self, title: &str, content: &str) -> SyncResult<CollabDocument> {
        let request = self
            .client
            .post(self.endpoint(&[]))
            .json(&CreateDocumentRequest { title, content });
        let response = self.send(request, "create").await?;
        let document: CollabDocument = Self::decode(response).await?;
        tracing::info!(id = %document.id, "created document");
        Ok(document)
    }

    async fn update(&self, id: &DocumentId, changes: &DocumentChanges) -> SyncResult<()> {
        let request = self
            .client
            .put(self.endpoint(&[id.as_str()]))
            .json(changes);
        self.send(request, "update").await?;
        tracing::info!(
            %id,
            title = changes.title.is_some(),
            content = changes.content.is_some(),
            "updated document"
        );
        Ok(())
    }

    async fn share(&self, id: &DocumentId, recipient: &str) -> SyncResult<()> {
        let recipient = recipient.trim();
        if !is_valid_recipient(recipient) {
            return Err(SyncError::InvalidRecipient);
        }
        let request = self
            .client
            .post(self.endpoint(&[id.as_str(), "share"]))
            .json(&ShareRequest { email: recipient });
        self.send(request, "share").await?;
        tracing::info!(%id, "shared document");
        Ok(())
    }

    async fn delete(&self, id: &DocumentId) -> SyncResult<()> {
        let request = self.client.delete(self.endpoint(&[id.as_str()]));
        self.send(request, "delete").await?;
        tracing::info!(%id, "deleted document");
        Ok(())
    }
}
