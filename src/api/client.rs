//! HTTP gateway to the knowledge base server.
//!
//! Every response is first normalized to `{ok, status, body}`, then decoded
//! strictly. The token is read from the shared session handle per request,
//! so login/logout apply without rebuilding the client.

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use reqwest::RequestBuilder;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use crate::api::backend::KnowledgeBase;
use crate::api::types::{
    AskRequest, AskResponse, Document, IndexAccepted, IndexJob, TokenRequest, TokenResponse,
};
use crate::config::ApiConfig;
use crate::error::{SatchelError, SatchelResult};
use crate::session::SessionHandle;

/// Uniform shape every response is normalized into before typed decoding.
#[derive(Debug)]
struct RawResponse {
    ok: bool,
    status: u16,
    body: Option<serde_json::Value>,
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: SessionHandle,
}

impl ApiClient {
    pub fn new(config: &ApiConfig, session: SessionHandle) -> SatchelResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.session.token() {
            Some(token) => builder.header("Authorization", format!("Token {}", token)),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> SatchelResult<RawResponse> {
        let response = builder.send().await?;
        let status = response.status().as_u16();
        let ok = response.status().is_success();

        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.contains("application/json"))
            .unwrap_or(false);

        let body = if is_json {
            Some(response.json::<serde_json::Value>().await?)
        } else {
            None
        };

        debug!(status, ok, "api response");
        Ok(RawResponse { ok, status, body })
    }

    fn decode<T: DeserializeOwned>(raw: RawResponse, what: &str) -> SatchelResult<T> {
        if !raw.ok {
            return Err(Self::error_for(raw, what));
        }
        let body = raw
            .body
            .ok_or_else(|| SatchelError::schema(what, "expected a JSON body"))?;
        serde_json::from_value(body).map_err(|e| SatchelError::schema(what, e.to_string()))
    }

    fn error_for(raw: RawResponse, what: &str) -> SatchelError {
        match raw.status {
            401 => SatchelError::Unauthorized,
            429 => SatchelError::RateLimited,
            404 => SatchelError::NotFound {
                what: what.to_string(),
            },
            status => SatchelError::Api {
                status,
                message: Self::detail_message(raw.body.as_ref())
                    .unwrap_or_else(|| format!("Request failed with status {}.", status)),
            },
        }
    }

    /// Pull the server's structured error text out of a failure payload.
    fn detail_message(body: Option<&serde_json::Value>) -> Option<String> {
        let body = body?;
        for key in ["detail", "error"] {
            if let Some(text) = body.get(key).and_then(|v| v.as_str()) {
                return Some(text.to_string());
            }
        }
        None
    }
}

#[async_trait]
impl KnowledgeBase for ApiClient {
    async fn login(&self, username: &str, password: &str) -> SatchelResult<String> {
        // Token exchange never carries an Authorization header.
        let raw = self
            .send(
                self.http
                    .post(self.url("/api/token/"))
                    .json(&TokenRequest { username, password }),
            )
            .await?;

        let status = raw.status;
        let ok = raw.ok;
        let parsed: TokenResponse = match raw.body {
            Some(body) => serde_json::from_value(body)
                .map_err(|e| SatchelError::schema("token response", e.to_string()))?,
            None => TokenResponse {
                token: None,
                non_field_errors: Vec::new(),
            },
        };

        if ok {
            if let Some(token) = parsed.token {
                return Ok(token);
            }
        }

        // Surface the first server-reported field error verbatim.
        let message = parsed
            .non_field_errors
            .into_iter()
            .next()
            .unwrap_or_else(|| "Login failed.".to_string());
        Err(SatchelError::Api { status, message })
    }

    async fn list_documents(&self) -> SatchelResult<Vec<Document>> {
        let raw = self
            .send(self.authorize(self.http.get(self.url("/api/docs/"))))
            .await?;
        Self::decode(raw, "document list")
    }

    async fn get_document(&self, id: i64) -> SatchelResult<Document> {
        let raw = self
            .send(self.authorize(self.http.get(self.url(&format!("/api/docs/{}/", id)))))
            .await?;
        Self::decode(raw, "document")
    }

    async fn upload_document(
        &self,
        title: &str,
        file_name: &str,
        bytes: Vec<u8>,
    ) -> SatchelResult<Document> {
        let form = Form::new()
            .text("title", title.to_string())
            .part("file", Part::bytes(bytes).file_name(file_name.to_string()));

        let raw = self
            .send(
                self.authorize(self.http.post(self.url("/api/docs/")))
                    .multipart(form),
            )
            .await?;
        Self::decode(raw, "uploaded document")
    }

    async fn delete_document(&self, id: i64) -> SatchelResult<()> {
        let raw = self
            .send(self.authorize(self.http.delete(self.url(&format!("/api/docs/{}/", id)))))
            .await?;
        if raw.ok {
            Ok(())
        } else {
            Err(Self::error_for(raw, "document"))
        }
    }

    async fn start_indexing(&self, id: i64) -> SatchelResult<IndexAccepted> {
        let raw = self
            .send(self.authorize(self.http.post(self.url(&format!("/api/docs/{}/index/", id)))))
            .await?;
        Self::decode(raw, "index acknowledgement")
    }

    async fn fetch_job(&self, job_id: &str) -> SatchelResult<IndexJob> {
        let raw = self
            .send(self.authorize(self.http.get(self.url(&format!("/api/jobs/{}/", job_id)))))
            .await?;
        Self::decode(raw, "index job")
    }

    async fn ask(&self, request: &AskRequest) -> SatchelResult<AskResponse> {
        let raw = self
            .send(self.authorize(self.http.post(self.url("/api/ask/")).json(request)))
            .await?;
        Self::decode(raw, "answer")
    }
}
