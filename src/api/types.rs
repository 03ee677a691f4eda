//! Wire types for the knowledge base REST API.
//!
//! Enums decode strictly: a status string the client does not know is a
//! schema error at the boundary, never a silently rendered blank.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Server-owned document lifecycle. The client only observes transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentStatus {
    Uploaded,
    Indexing,
    Indexed,
    Failed,
}

impl DocumentStatus {
    /// INDEXED and FAILED end a polling chain; nothing transitions out of
    /// them without a new indexing request.
    pub fn is_terminal(self) -> bool {
        matches!(self, DocumentStatus::Indexed | DocumentStatus::Failed)
    }

    pub fn label(self) -> &'static str {
        match self {
            DocumentStatus::Uploaded => "Uploaded",
            DocumentStatus::Indexing => "Indexing",
            DocumentStatus::Indexed => "Indexed",
            DocumentStatus::Failed => "Failed",
        }
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: i64,
    pub title: String,
    pub status: DocumentStatus,
    #[serde(default)]
    pub chunks_count: u32,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default)]
    pub file_url: Option<String>,
    #[serde(default)]
    pub original_filename: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub last_indexed_at: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl Document {
    /// Best display name for the stored file.
    pub fn file_label(&self) -> &str {
        self.original_filename
            .as_deref()
            .or(self.file.as_deref())
            .unwrap_or("Unavailable")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IndexJobStatus {
    Pending,
    Running,
    Done,
    Failed,
}

impl fmt::Display for IndexJobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            IndexJobStatus::Pending => "Pending",
            IndexJobStatus::Running => "Running",
            IndexJobStatus::Done => "Done",
            IndexJobStatus::Failed => "Failed",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexJob {
    pub id: i64,
    pub document: i64,
    pub status: IndexJobStatus,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub finished_at: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// Acknowledgement from `POST /api/docs/{id}/index/`. Acceptance starts the
/// polling chain; the job itself runs server-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexAccepted {
    pub job_id: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub non_field_errors: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AskRequest {
    pub question: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc_ids: Option<Vec<i64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explain: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AskSource {
    pub citation: String,
    #[serde(default)]
    pub doc_title: Option<String>,
    pub chunk_index: u32,
    pub score: f32,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AskTraceStep {
    pub name: String,
    #[serde(default)]
    pub detail: Option<String>,
    pub ms: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AskTrace {
    pub total_ms: u64,
    pub hits: u32,
    pub top_k: u32,
    pub steps: Vec<AskTraceStep>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AskResponse {
    pub answer: String,
    #[serde(default)]
    pub sources: Vec<AskSource>,
    #[serde(default)]
    pub trace: Option<AskTrace>,
}

/// Render a server timestamp for tables: RFC 3339 in, `YYYY-MM-DD HH:MM` out,
/// anything unparseable passed through untouched.
pub fn short_timestamp(raw: &str) -> String {
    match chrono::DateTime::parse_from_rfc3339(raw) {
        Ok(parsed) => parsed.format("%Y-%m-%d %H:%M").to_string(),
        Err(_) => raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_decodes_wire_payload() {
        let payload = serde_json::json!({
            "id": 7,
            "title": "Q1 Report",
            "file": "docs/q1.pdf",
            "file_url": "http://localhost:8000/media/docs/q1.pdf",
            "created_at": "2025-03-01T09:30:00Z",
            "status": "INDEXED",
            "chunks_count": 12,
            "last_indexed_at": "2025-03-01T09:32:10Z",
            "error_message": null
        });
        let doc: Document = serde_json::from_value(payload).unwrap();
        assert_eq!(doc.id, 7);
        assert_eq!(doc.status, DocumentStatus::Indexed);
        assert!(doc.status.is_terminal());
        assert_eq!(doc.chunks_count, 12);
        assert_eq!(doc.error_message, None);
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        let payload = serde_json::json!({
            "id": 1,
            "title": "x",
            "status": "EXPLODED"
        });
        assert!(serde_json::from_value::<Document>(payload).is_err());
    }

    #[test]
    fn test_terminal_states() {
        assert!(!DocumentStatus::Uploaded.is_terminal());
        assert!(!DocumentStatus::Indexing.is_terminal());
        assert!(DocumentStatus::Indexed.is_terminal());
        assert!(DocumentStatus::Failed.is_terminal());
    }

    #[test]
    fn test_ask_request_omits_unset_fields() {
        let request = AskRequest {
            question: "what is retention?".to_string(),
            ..Default::default()
        };
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(
            body,
            serde_json::json!({ "question": "what is retention?" })
        );

        let request = AskRequest {
            question: "q".to_string(),
            top_k: Some(6),
            doc_ids: Some(vec![1, 2]),
            explain: Some(true),
        };
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["top_k"], 6);
        assert_eq!(body["doc_ids"], serde_json::json!([1, 2]));
        assert_eq!(body["explain"], true);
    }

    #[test]
    fn test_ask_response_with_trace() {
        let payload = serde_json::json!({
            "answer": "42",
            "sources": [
                { "citation": "1", "doc_title": "Q1 Report", "chunk_index": 3, "score": 0.91, "text": "snippet" }
            ],
            "trace": {
                "total_ms": 120,
                "hits": 4,
                "top_k": 6,
                "steps": [
                    { "name": "embed", "ms": 20 },
                    { "name": "search", "detail": "pgvector", "ms": 40 },
                    { "name": "generate", "ms": 60 }
                ]
            }
        });
        let response: AskResponse = serde_json::from_value(payload).unwrap();
        assert_eq!(response.sources.len(), 1);
        let trace = response.trace.unwrap();
        assert_eq!(trace.steps.len(), 3);
        assert_eq!(trace.steps[1].detail.as_deref(), Some("pgvector"));
    }

    #[test]
    fn test_ask_response_without_extras() {
        let payload = serde_json::json!({ "answer": "just text" });
        let response: AskResponse = serde_json::from_value(payload).unwrap();
        assert!(response.sources.is_empty());
        assert!(response.trace.is_none());
    }

    #[test]
    fn test_token_response_shapes() {
        let ok: TokenResponse =
            serde_json::from_value(serde_json::json!({ "token": "abc" })).unwrap();
        assert_eq!(ok.token.as_deref(), Some("abc"));

        let err: TokenResponse = serde_json::from_value(serde_json::json!({
            "non_field_errors": ["Unable to log in with provided credentials."]
        }))
        .unwrap();
        assert!(err.token.is_none());
        assert_eq!(err.non_field_errors.len(), 1);
    }

    #[test]
    fn test_short_timestamp() {
        assert_eq!(
            short_timestamp("2025-03-01T09:30:00+00:00"),
            "2025-03-01 09:30"
        );
        assert_eq!(short_timestamp("not-a-date"), "not-a-date");
    }
}
