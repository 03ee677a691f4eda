//! Indexing-status polling.
//!
//! A watch chain is one cancellable task per document: an initial status
//! check, then bounded, strictly sequential polls on a fixed cadence until a
//! terminal status is observed, the retry budget runs out, the owning view
//! cancels the token, or a fetch fails (fail-closed, the fetch itself is
//! never retried).

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::api::types::{Document, DocumentStatus};
use crate::api::KnowledgeBase;
use crate::config::PollingConfig;
use crate::error::SatchelResult;

pub const FAILED_FALLBACK: &str = "Check the worker logs for details.";

#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(2000),
            max_attempts: 40,
        }
    }
}

impl PollPolicy {
    pub fn from_config(config: &PollingConfig) -> Self {
        Self {
            interval: Duration::from_millis(config.interval_ms),
            max_attempts: config.max_attempts,
        }
    }
}

#[derive(Debug)]
pub enum WatchOutcome {
    Indexed(Document),
    Failed { document: Document, message: String },
    /// Retry budget exhausted without a terminal status. The job keeps
    /// running server-side; the UI says so instead of giving up silently.
    StillIndexing(Document),
    Cancelled,
}

impl WatchOutcome {
    /// Shared notice copy for both front ends. `None` for cancellation,
    /// which is deliberate teardown and never user-visible.
    pub fn describe(&self) -> Option<String> {
        match self {
            WatchOutcome::Indexed(doc) => {
                Some(format!("Indexing complete. {} is ready for questions.", doc.title))
            }
            WatchOutcome::Failed { message, .. } => Some(format!("Indexing failed: {}", message)),
            WatchOutcome::StillIndexing(doc) => Some(format!(
                "{} is still indexing. The job keeps running server-side; refresh later.",
                doc.title
            )),
            WatchOutcome::Cancelled => None,
        }
    }
}

/// Poll `doc_id` until a terminal status, the attempt budget, cancellation,
/// or a fetch error. `on_observe` fires for every fetched snapshot so views
/// can repaint intermediate states.
pub async fn watch_document<F>(
    backend: &dyn KnowledgeBase,
    doc_id: i64,
    policy: PollPolicy,
    cancel: &CancellationToken,
    mut on_observe: F,
) -> SatchelResult<WatchOutcome>
where
    F: FnMut(&Document),
{
    if cancel.is_cancelled() {
        return Ok(WatchOutcome::Cancelled);
    }

    // Initial status check; does not count against the poll budget.
    let mut document = backend.get_document(doc_id).await?;
    on_observe(&document);

    let mut polls = 0u32;
    loop {
        match document.status {
            DocumentStatus::Indexed => {
                debug!(doc_id, polls, "watch finished: indexed");
                return Ok(WatchOutcome::Indexed(document));
            }
            DocumentStatus::Failed => {
                let message = document
                    .error_message
                    .clone()
                    .unwrap_or_else(|| FAILED_FALLBACK.to_string());
                debug!(doc_id, polls, "watch finished: failed");
                return Ok(WatchOutcome::Failed { document, message });
            }
            DocumentStatus::Uploaded | DocumentStatus::Indexing => {}
        }

        if polls == policy.max_attempts {
            debug!(doc_id, polls, "watch budget exhausted");
            return Ok(WatchOutcome::StillIndexing(document));
        }

        tokio::select! {
            _ = cancel.cancelled() => return Ok(WatchOutcome::Cancelled),
            _ = tokio::time::sleep(policy.interval) => {}
        }

        document = backend.get_document(doc_id).await?;
        on_observe(&document);
        polls += 1;
    }
}

/// Serializes watch chains per document: the first start wins and later
/// starts for the same document are ignored until the guard drops.
#[derive(Clone, Default)]
pub struct WatchRegistry {
    active: Arc<Mutex<HashSet<i64>>>,
}

impl WatchRegistry {
    pub fn begin(&self, doc_id: i64) -> Option<WatchGuard> {
        let mut active = self.active.lock().unwrap();
        if !active.insert(doc_id) {
            return None;
        }
        Some(WatchGuard {
            active: Arc::clone(&self.active),
            doc_id,
        })
    }

    pub fn is_watching(&self, doc_id: i64) -> bool {
        self.active.lock().unwrap().contains(&doc_id)
    }
}

pub struct WatchGuard {
    active: Arc<Mutex<HashSet<i64>>>,
    doc_id: i64,
}

impl Drop for WatchGuard {
    fn drop(&mut self) {
        self.active.lock().unwrap().remove(&self.doc_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::{AskRequest, AskResponse, IndexAccepted, IndexJob};
    use crate::error::SatchelError;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn doc(id: i64, status: DocumentStatus) -> Document {
        Document {
            id,
            title: format!("Doc {}", id),
            status,
            chunks_count: 0,
            file: None,
            file_url: None,
            original_filename: None,
            created_at: None,
            last_indexed_at: None,
            error_message: None,
        }
    }

    fn network_error() -> SatchelError {
        SatchelError::Network {
            message: "connection refused".to_string(),
            source: None,
        }
    }

    /// Serves a scripted sequence of results from `get_document`; repeats the
    /// final entry once the script runs out.
    struct ScriptedBackend {
        script: Mutex<VecDeque<SatchelResult<Document>>>,
        last: Mutex<Option<Document>>,
        fetches: AtomicU32,
    }

    impl ScriptedBackend {
        fn new(script: Vec<SatchelResult<Document>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                last: Mutex::new(None),
                fetches: AtomicU32::new(0),
            }
        }

        fn fetches(&self) -> u32 {
            self.fetches.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl KnowledgeBase for ScriptedBackend {
        async fn login(&self, _username: &str, _password: &str) -> SatchelResult<String> {
            unimplemented!("not exercised by watch chains")
        }

        async fn list_documents(&self) -> SatchelResult<Vec<Document>> {
            unimplemented!("not exercised by watch chains")
        }

        async fn get_document(&self, _id: i64) -> SatchelResult<Document> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            match self.script.lock().unwrap().pop_front() {
                Some(Ok(document)) => {
                    *self.last.lock().unwrap() = Some(document.clone());
                    Ok(document)
                }
                Some(Err(err)) => Err(err),
                None => Ok(self
                    .last
                    .lock()
                    .unwrap()
                    .clone()
                    .expect("script exhausted with no prior document")),
            }
        }

        async fn upload_document(
            &self,
            _title: &str,
            _file_name: &str,
            _bytes: Vec<u8>,
        ) -> SatchelResult<Document> {
            unimplemented!("not exercised by watch chains")
        }

        async fn delete_document(&self, _id: i64) -> SatchelResult<()> {
            unimplemented!("not exercised by watch chains")
        }

        async fn start_indexing(&self, _id: i64) -> SatchelResult<IndexAccepted> {
            unimplemented!("not exercised by watch chains")
        }

        async fn fetch_job(&self, _job_id: &str) -> SatchelResult<IndexJob> {
            unimplemented!("not exercised by watch chains")
        }

        async fn ask(&self, _request: &AskRequest) -> SatchelResult<AskResponse> {
            unimplemented!("not exercised by watch chains")
        }
    }

    fn fast_policy() -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(1),
            max_attempts: 40,
        }
    }

    #[tokio::test]
    async fn test_stops_on_indexed_within_one_observation() {
        let backend = ScriptedBackend::new(vec![
            Ok(doc(1, DocumentStatus::Uploaded)),
            Ok(doc(1, DocumentStatus::Indexing)),
            Ok(doc(1, DocumentStatus::Indexed)),
        ]);
        let cancel = CancellationToken::new();

        let outcome = watch_document(&backend, 1, fast_policy(), &cancel, |_| {})
            .await
            .unwrap();

        assert!(matches!(outcome, WatchOutcome::Indexed(_)));
        // Terminal observation stops the chain; nothing polls past it.
        assert_eq!(backend.fetches(), 3);
    }

    #[tokio::test]
    async fn test_failed_surfaces_server_message() {
        let mut failed = doc(2, DocumentStatus::Failed);
        failed.error_message = Some("embedding worker crashed".to_string());
        let backend = ScriptedBackend::new(vec![
            Ok(doc(2, DocumentStatus::Indexing)),
            Ok(failed),
        ]);
        let cancel = CancellationToken::new();

        let outcome = watch_document(&backend, 2, fast_policy(), &cancel, |_| {})
            .await
            .unwrap();

        match outcome {
            WatchOutcome::Failed { message, .. } => {
                assert_eq!(message, "embedding worker crashed");
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(backend.fetches(), 2);
    }

    #[tokio::test]
    async fn test_failed_without_message_uses_fallback() {
        let backend = ScriptedBackend::new(vec![Ok(doc(3, DocumentStatus::Failed))]);
        let cancel = CancellationToken::new();

        let outcome = watch_document(&backend, 3, fast_policy(), &cancel, |_| {})
            .await
            .unwrap();

        match outcome {
            WatchOutcome::Failed { message, .. } => assert_eq!(message, FAILED_FALLBACK),
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_poll_budget_is_bounded() {
        let backend = ScriptedBackend::new(vec![Ok(doc(4, DocumentStatus::Indexing))]);
        let cancel = CancellationToken::new();

        let outcome = watch_document(&backend, 4, fast_policy(), &cancel, |_| {})
            .await
            .unwrap();

        assert!(matches!(outcome, WatchOutcome::StillIndexing(_)));
        // Initial status check plus the configured 40 polls, nothing more.
        assert_eq!(backend.fetches(), 41);
    }

    #[tokio::test]
    async fn test_fetch_error_fails_closed() {
        let backend = ScriptedBackend::new(vec![
            Ok(doc(5, DocumentStatus::Indexing)),
            Err(network_error()),
            Ok(doc(5, DocumentStatus::Indexed)),
        ]);
        let cancel = CancellationToken::new();

        let result = watch_document(&backend, 5, fast_policy(), &cancel, |_| {}).await;

        assert!(matches!(result, Err(SatchelError::Network { .. })));
        // The chain stops at the failed poll; the scripted recovery is
        // never observed because poll errors are not retried.
        assert_eq!(backend.fetches(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_before_start_issues_no_requests() {
        let backend = ScriptedBackend::new(vec![Ok(doc(6, DocumentStatus::Indexing))]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = watch_document(&backend, 6, fast_policy(), &cancel, |_| {})
            .await
            .unwrap();

        assert!(matches!(outcome, WatchOutcome::Cancelled));
        assert_eq!(backend.fetches(), 0);
    }

    #[tokio::test]
    async fn test_cancel_during_wait_stops_chain() {
        let backend = Arc::new(ScriptedBackend::new(vec![Ok(doc(
            7,
            DocumentStatus::Indexing,
        ))]));
        let cancel = CancellationToken::new();
        let policy = PollPolicy {
            interval: Duration::from_secs(60),
            max_attempts: 40,
        };

        let task = {
            let backend = Arc::clone(&backend);
            let cancel = cancel.clone();
            tokio::spawn(async move {
                watch_document(backend.as_ref(), 7, policy, &cancel, |_| {}).await
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        cancel.cancel();

        let outcome = task.await.unwrap().unwrap();
        assert!(matches!(outcome, WatchOutcome::Cancelled));
        assert_eq!(backend.fetches(), 1);
    }

    #[tokio::test]
    async fn test_observer_sees_every_snapshot() {
        let backend = ScriptedBackend::new(vec![
            Ok(doc(8, DocumentStatus::Uploaded)),
            Ok(doc(8, DocumentStatus::Indexing)),
            Ok(doc(8, DocumentStatus::Indexed)),
        ]);
        let cancel = CancellationToken::new();
        let mut seen = Vec::new();

        watch_document(&backend, 8, fast_policy(), &cancel, |d| seen.push(d.status))
            .await
            .unwrap();

        assert_eq!(
            seen,
            vec![
                DocumentStatus::Uploaded,
                DocumentStatus::Indexing,
                DocumentStatus::Indexed
            ]
        );
    }

    #[test]
    fn test_registry_first_start_wins() {
        let registry = WatchRegistry::default();

        let guard = registry.begin(1);
        assert!(guard.is_some());
        assert!(registry.is_watching(1));

        // Second start for the same document is ignored while one is live.
        assert!(registry.begin(1).is_none());

        // Other documents are unaffected.
        let other = registry.begin(2);
        assert!(other.is_some());

        drop(guard);
        assert!(!registry.is_watching(1));
        assert!(registry.begin(1).is_some());
    }

    #[test]
    fn test_outcome_copy() {
        let indexed = WatchOutcome::Indexed(doc(1, DocumentStatus::Indexed));
        assert_eq!(
            indexed.describe().unwrap(),
            "Indexing complete. Doc 1 is ready for questions."
        );

        let failed = WatchOutcome::Failed {
            document: doc(1, DocumentStatus::Failed),
            message: "boom".to_string(),
        };
        assert_eq!(failed.describe().unwrap(), "Indexing failed: boom");

        assert!(WatchOutcome::Cancelled.describe().is_none());
    }
}
