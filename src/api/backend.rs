//! Trait seam between the presentation layers and the REST gateway.
//!
//! Views and the poll loop depend on this trait, not on HTTP, so tests can
//! script the backend and count the requests a flow actually issues.

use async_trait::async_trait;

use crate::api::types::{AskRequest, AskResponse, Document, IndexAccepted, IndexJob};
use crate::error::SatchelResult;

#[async_trait]
pub trait KnowledgeBase: Send + Sync {
    /// Exchange credentials for an auth token.
    async fn login(&self, username: &str, password: &str) -> SatchelResult<String>;

    async fn list_documents(&self) -> SatchelResult<Vec<Document>>;

    async fn get_document(&self, id: i64) -> SatchelResult<Document>;

    async fn upload_document(
        &self,
        title: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> SatchelResult<Document>;

    async fn delete_document(&self, id: i64) -> SatchelResult<()>;

    /// Kick off a server-side indexing job. Acceptance (2xx) is the trigger
    /// for status polling.
    async fn start_indexing(&self, id: i64) -> SatchelResult<IndexAccepted>;

    async fn fetch_job(&self, job_id: &str) -> SatchelResult<IndexJob>;

    async fn ask(&self, request: &AskRequest) -> SatchelResult<AskResponse>;
}
