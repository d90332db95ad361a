use std::io::{self, Write};
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use futures::future::BoxFuture;

use crate::error::SyncError;
use crate::status::{SELECT_DOCUMENT_FIRST, StatusMessage};
use crate::sync::{DocumentApi, DocumentId, is_valid_recipient};

pub type ShareJob = BoxFuture<'static, ShareCompletion>;

#[derive(Debug)]
pub struct ShareCompletion {
    pub id: DocumentId,
    pub recipient: String,
    pub result: Result<(), SyncError>,
}

/// Somewhere the share link can be copied to.
pub trait Clipboard: Send {
    fn write_text(&mut self, text: &str) -> io::Result<()>;
}

/// Copies through the terminal using the OSC 52 escape sequence, which most
/// modern terminal emulators forward to the system clipboard.
#[derive(Debug, Default)]
pub struct TerminalClipboard;

impl Clipboard for TerminalClipboard {
    fn write_text(&mut self, text: &str) -> io::Result<()> {
        let mut stdout = io::stdout();
        write!(stdout, "{}", osc52_sequence(text))?;
        stdout.flush()
    }
}

pub fn osc52_sequence(text: &str) -> String {
    format!("\x1b]52;c;{}\x07", STANDARD.encode(text))
}

/// The link a recipient opens to reach a shared document.
pub fn share_link(origin: &str, id: &DocumentId) -> String {
    format!("{}/collab-zone?doc={}", origin.trim_end_matches('/'), id)
}

pub struct ShareController {
    api: Arc<dyn DocumentApi>,
    origin: String,
    clipboard: Box<dyn Clipboard>,
}

impl ShareController {
    pub fn new(
        api: Arc<dyn DocumentApi>,
        origin: impl Into<String>,
        clipboard: Box<dyn Clipboard>,
    ) -> Self {
        Self {
            api,
            origin: origin.into(),
            clipboard,
        }
    }

    /// Validates the request and returns the job that sends it. Nothing is
    /// sent when there is no active document or the recipient is malformed.
    pub fn share(
        &self,
        active: Option<&DocumentId>,
        recipient: &str,
    ) -> Result<ShareJob, StatusMessage> {
        let id = active
            .cloned()
            .ok_or_else(|| StatusMessage::error(SELECT_DOCUMENT_FIRST))?;
        let recipient = recipient.trim().to_string();
        if !is_valid_recipient(&recipient) {
            return Err(StatusMessage::error(SyncError::InvalidRecipient.to_string()));
        }
        if !self.api.has_credential() {
            return Err(StatusMessage::error(SyncError::MissingCredential.to_string()));
        }

        tracing::debug!(%id, "sharing document");
        let api = Arc::clone(&self.api);
        Ok(Box::pin(async move {
            let result = api.share(&id, &recipient).await;
            ShareCompletion {
                id,
                recipient,
                result,
            }
        }))
    }

    /// Reports the outcome and copies the link on success.
    pub fn complete(&mut self, completion: ShareCompletion) -> StatusMessage {
        let ShareCompletion {
            id,
            recipient,
            result,
        } = completion;
        if let Err(err) = result {
            return match err.server_message() {
                Some(message) => StatusMessage::error(message),
                None if err.is_precondition() => StatusMessage::error(err.to_string()),
                None => StatusMessage::error("Failed to share document"),
            };
        }

        let link = share_link(&self.origin, &id);
        match self.clipboard.write_text(&link) {
            Ok(()) => StatusMessage::success(format!(
                "Shared with {recipient}. Link copied to clipboard"
            )),
            Err(err) => {
                tracing::warn!(error = %err, "could not write share link to clipboard");
                StatusMessage::success(format!("Shared with {recipient}. Link: {link}"))
            }
        }
    }

    pub async fn run(&mut self, job: ShareJob) -> StatusMessage {
        let completion = job.await;
        self.complete(completion)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::status::StatusKind;
    use crate::sync::fake::{Call, FakeDocumentApi};

    #[derive(Clone, Default)]
    struct MemoryClipboard(Arc<Mutex<Vec<String>>>);

    impl Clipboard for MemoryClipboard {
        fn write_text(&mut self, text: &str) -> io::Result<()> {
            self.0.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    struct BrokenClipboard;

    impl Clipboard for BrokenClipboard {
        fn write_text(&mut self, _text: &str) -> io::Result<()> {
            Err(io::Error::other("no terminal"))
        }
    }

    fn controller(api: &Arc<FakeDocumentApi>) -> (ShareController, MemoryClipboard) {
        let clipboard = MemoryClipboard::default();
        let controller = ShareController::new(
            api.clone(),
            "https://collab.example.com/",
            Box::new(clipboard.clone()),
        );
        (controller, clipboard)
    }

    fn rejected(result: Result<ShareJob, StatusMessage>) -> StatusMessage {
        match result {
            Ok(_) => panic!("expected the share to be rejected"),
            Err(message) => message,
        }
    }

    #[test]
    fn malformed_recipient_sends_nothing() {
        let api = Arc::new(FakeDocumentApi::new());
        let (controller, clipboard) = controller(&api);

        let message = rejected(controller.share(Some(&DocumentId::new("d1")), "not-an-email"));

        assert_eq!(message.kind, StatusKind::Error);
        assert!(api.calls().is_empty());
        assert!(clipboard.0.lock().unwrap().is_empty());
    }

    #[test]
    fn no_active_document_sends_nothing() {
        let api = Arc::new(FakeDocumentApi::new());
        let (controller, _clipboard) = controller(&api);

        let message = rejected(controller.share(None, "user@example.com"));

        assert_eq!(message, StatusMessage::error(SELECT_DOCUMENT_FIRST));
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn successful_share_copies_link() {
        let api = Arc::new(FakeDocumentApi::new());
        let (mut controller, clipboard) = controller(&api);

        let job = controller
            .share(Some(&DocumentId::new("d1")), " user@example.com ")
            .unwrap();
        let message = controller.run(job).await;

        assert_eq!(message.kind, StatusKind::Success);
        assert_eq!(
            clipboard.0.lock().unwrap().as_slice(),
            ["https://collab.example.com/collab-zone?doc=d1"]
        );
        assert_eq!(
            api.calls(),
            vec![Call::Share {
                id: DocumentId::new("d1"),
                email: "user@example.com".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn server_error_text_is_shown_verbatim() {
        let api = Arc::new(FakeDocumentApi::new());
        api.fail("share", 404, Some("User not found"));
        let (mut controller, clipboard) = controller(&api);

        let job = controller
            .share(Some(&DocumentId::new("d1")), "ghost@example.com")
            .unwrap();

        assert_eq!(controller.run(job).await, StatusMessage::error("User not found"));
        assert!(clipboard.0.lock().unwrap().is_empty());

        api.fail("share", 500, None);
        let job = controller
            .share(Some(&DocumentId::new("d1")), "ghost@example.com")
            .unwrap();
        assert_eq!(
            controller.run(job).await,
            StatusMessage::error("Failed to share document")
        );
    }

    #[tokio::test]
    async fn clipboard_failure_still_reports_link() {
        let api = Arc::new(FakeDocumentApi::new());
        let mut controller = ShareController::new(
            api.clone(),
            "http://localhost:3000",
            Box::new(BrokenClipboard),
        );

        let job = controller
            .share(Some(&DocumentId::new("7")), "a@b.c")
            .unwrap();
        let message = controller.run(job).await;

        assert_eq!(
            message,
            StatusMessage::success(
                "Shared with a@b.c. Link: http://localhost:3000/collab-zone?doc=7"
            )
        );
    }

    #[test]
    fn osc52_wraps_base64_payload() {
        assert_eq!(osc52_sequence("hi"), "\x1b]52;c;aGk=\x07");
    }
}
