//! Ask flow: client-side validation, one-shot submission, trace rendering math.

use crate::api::types::{AskRequest, AskResponse, AskTrace};
use crate::api::KnowledgeBase;
use crate::error::{SatchelError, SatchelResult};

/// Minimum visible bar share so very fast steps still render.
pub const MIN_BAR_PERCENT: u16 = 5;

/// What the user has filled in, independent of which front end collected it.
#[derive(Debug, Clone)]
pub struct AskForm {
    pub question: String,
    pub top_k: Option<u32>,
    pub search_all: bool,
    pub selected_docs: Vec<i64>,
    pub explain: bool,
}

impl Default for AskForm {
    fn default() -> Self {
        Self {
            question: String::new(),
            top_k: None,
            search_all: true,
            selected_docs: Vec::new(),
            explain: false,
        }
    }
}

impl AskForm {
    /// Validation happens before any network call; a rejected form never
    /// reaches the backend.
    pub fn validate(&self) -> SatchelResult<AskRequest> {
        let question = self.question.trim();
        if question.is_empty() {
            return Err(SatchelError::validation("Enter a question to continue."));
        }
        if !self.search_all && self.selected_docs.is_empty() {
            return Err(SatchelError::validation(
                "Choose at least one document or search all.",
            ));
        }

        Ok(AskRequest {
            question: question.to_string(),
            top_k: self.top_k,
            doc_ids: if self.search_all {
                None
            } else {
                Some(self.selected_docs.clone())
            },
            explain: if self.explain { Some(true) } else { None },
        })
    }
}

/// Validate then submit. One request, one response, no client retry.
pub async fn submit(form: &AskForm, backend: &dyn KnowledgeBase) -> SatchelResult<AskResponse> {
    let request = form.validate()?;
    backend.ask(&request).await
}

pub fn max_step_ms(trace: &AskTrace) -> u64 {
    trace.steps.iter().map(|step| step.ms).max().unwrap_or(0)
}

/// Bar width for one trace step as a share of the slowest step.
pub fn bar_percent(step_ms: u64, max_ms: u64) -> u16 {
    if max_ms == 0 {
        return MIN_BAR_PERCENT;
    }
    let share = (step_ms as f64 / max_ms as f64) * 100.0;
    (share.round() as u16).clamp(MIN_BAR_PERCENT, 100)
}

/// Fixed-width bar for terminal output, proportional to the slowest step.
pub fn ascii_bar(step_ms: u64, max_ms: u64, width: usize) -> String {
    let percent = bar_percent(step_ms, max_ms) as usize;
    let filled = ((percent * width) / 100).max(1).min(width);
    let mut bar = "█".repeat(filled);
    bar.push_str(&"░".repeat(width - filled));
    bar
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::{AskSource, AskTraceStep, Document, IndexAccepted, IndexJob};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Default)]
    struct CountingBackend {
        asks: AtomicU32,
    }

    #[async_trait]
    impl KnowledgeBase for CountingBackend {
        async fn login(&self, _username: &str, _password: &str) -> SatchelResult<String> {
            unimplemented!()
        }

        async fn list_documents(&self) -> SatchelResult<Vec<Document>> {
            unimplemented!()
        }

        async fn get_document(&self, _id: i64) -> SatchelResult<Document> {
            unimplemented!()
        }

        async fn upload_document(
            &self,
            _title: &str,
            _file_name: &str,
            _bytes: Vec<u8>,
        ) -> SatchelResult<Document> {
            unimplemented!()
        }

        async fn delete_document(&self, _id: i64) -> SatchelResult<()> {
            unimplemented!()
        }

        async fn start_indexing(&self, _id: i64) -> SatchelResult<IndexAccepted> {
            unimplemented!()
        }

        async fn fetch_job(&self, _job_id: &str) -> SatchelResult<IndexJob> {
            unimplemented!()
        }

        async fn ask(&self, request: &AskRequest) -> SatchelResult<AskResponse> {
            self.asks.fetch_add(1, Ordering::SeqCst);
            Ok(AskResponse {
                answer: format!("answer to: {}", request.question),
                sources: vec![AskSource {
                    citation: "1".to_string(),
                    doc_title: Some("Q1 Report".to_string()),
                    chunk_index: 0,
                    score: 0.9,
                    text: Some("snippet".to_string()),
                }],
                trace: None,
            })
        }
    }

    #[tokio::test]
    async fn test_empty_question_is_rejected_without_network() {
        let backend = CountingBackend::default();
        let form = AskForm {
            question: "   ".to_string(),
            ..Default::default()
        };

        let result = submit(&form, &backend).await;

        assert!(matches!(result, Err(SatchelError::Validation { .. })));
        assert_eq!(backend.asks.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_restricted_scope_requires_selection() {
        let backend = CountingBackend::default();
        let form = AskForm {
            question: "what changed?".to_string(),
            search_all: false,
            selected_docs: Vec::new(),
            ..Default::default()
        };

        let result = submit(&form, &backend).await;

        assert!(matches!(result, Err(SatchelError::Validation { .. })));
        assert_eq!(backend.asks.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_valid_form_submits_once() {
        let backend = CountingBackend::default();
        let form = AskForm {
            question: "  what is the retention policy?  ".to_string(),
            top_k: Some(6),
            explain: true,
            ..Default::default()
        };

        let response = submit(&form, &backend).await.unwrap();

        assert_eq!(backend.asks.load(Ordering::SeqCst), 1);
        assert!(response.answer.contains("what is the retention policy?"));
    }

    #[test]
    fn test_request_shape_for_scoped_search() {
        let form = AskForm {
            question: "q".to_string(),
            search_all: false,
            selected_docs: vec![3, 5],
            ..Default::default()
        };
        let request = form.validate().unwrap();
        assert_eq!(request.doc_ids, Some(vec![3, 5]));
        assert_eq!(request.explain, None);

        let form = AskForm {
            question: "q".to_string(),
            ..Default::default()
        };
        let request = form.validate().unwrap();
        assert_eq!(request.doc_ids, None);
    }

    #[test]
    fn test_bar_percent_is_proportional_to_slowest_step() {
        let trace = AskTrace {
            total_ms: 120,
            hits: 4,
            top_k: 6,
            steps: vec![
                AskTraceStep { name: "embed".to_string(), detail: None, ms: 20 },
                AskTraceStep { name: "search".to_string(), detail: None, ms: 40 },
                AskTraceStep { name: "generate".to_string(), detail: None, ms: 60 },
            ],
        };
        let max = max_step_ms(&trace);
        assert_eq!(max, 60);
        assert_eq!(bar_percent(20, max), 33);
        assert_eq!(bar_percent(40, max), 67);
        assert_eq!(bar_percent(60, max), 100);
    }

    #[test]
    fn test_bar_percent_floors_tiny_steps() {
        assert_eq!(bar_percent(1, 1000), MIN_BAR_PERCENT);
        assert_eq!(bar_percent(0, 0), MIN_BAR_PERCENT);
    }

    #[test]
    fn test_ascii_bar_width() {
        let bar = ascii_bar(60, 60, 20);
        assert_eq!(bar.chars().count(), 20);
        assert!(bar.chars().all(|c| c == '█'));

        let bar = ascii_bar(30, 60, 20);
        assert_eq!(bar.chars().filter(|&c| c == '█').count(), 10);
        assert_eq!(bar.chars().count(), 20);
    }
}
