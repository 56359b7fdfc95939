//! Code Monster generation oracle adapter.
//!
//! Implements [`pipeline::GenerationOracle`] over a JSON HTTP endpoint. The
//! endpoint receives the full [`pipeline::GenerationRequest`] (prompt, target
//! language, recently learned patterns and, for revisions, the failing
//! candidate with its diagnostics) and answers with `{ "code": "..." }`.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** HTTP transport, request serialisation and response
//! parsing live here. The orchestration core sees only
//! [`pipeline::GenerationOracle`] and bounds every call with its own timeout.

use async_trait::async_trait;
use pipeline::{GenerationOracle, GenerationRequest, OracleError, OracleKind};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Longest slice of an error body carried into a diagnostic.
const MAX_ERROR_BODY_CHARS: usize = 512;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why a call to the generation endpoint produced no code.
#[derive(Debug, Error)]
pub enum GenerationCallError {
    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned HTTP {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("response contained no code")]
    EmptyCode,
}

impl From<GenerationCallError> for OracleError {
    fn from(e: GenerationCallError) -> Self {
        OracleError::failed(OracleKind::Generation, e.to_string())
    }
}

// ---------------------------------------------------------------------------
// Oracle
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    code: String,
}

/// [`GenerationOracle`] that POSTs each request to a fixed endpoint.
#[derive(Debug, Clone)]
pub struct HttpGenerationOracle {
    client: reqwest::Client,
    endpoint: String,
    bearer_token: Option<String>,
}

impl HttpGenerationOracle {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            bearer_token: None,
        }
    }

    /// Sends `Authorization: Bearer <token>` with every request.
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn call(&self, request: &GenerationRequest) -> Result<String, GenerationCallError> {
        let mut builder = self.client.post(&self.endpoint).json(request);
        if let Some(token) = &self.bearer_token {
            builder = builder.bearer_auth(token);
        }

        let transport = |source| GenerationCallError::Transport {
            endpoint: self.endpoint.clone(),
            source,
        };
        let response = builder.send().await.map_err(transport)?;
        let status = response.status();
        let body = response.text().await.map_err(transport)?;

        if !status.is_success() {
            return Err(GenerationCallError::Status {
                endpoint: self.endpoint.clone(),
                status: status.as_u16(),
                body: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }
        parse_response(&body)
    }
}

#[async_trait]
impl GenerationOracle for HttpGenerationOracle {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, OracleError> {
        debug!(
            endpoint = %self.endpoint,
            language = %request.language,
            revision = request.repair.is_some(),
            known_patterns = request.known_patterns.len(),
            "Requesting candidate"
        );
        Ok(self.call(request).await?)
    }
}

fn parse_response(body: &str) -> Result<String, GenerationCallError> {
    let parsed: GenerateResponse =
        serde_json::from_str(body).map_err(|e| GenerationCallError::Malformed(e.to_string()))?;
    if parsed.code.trim().is_empty() {
        return Err(GenerationCallError::EmptyCode);
    }
    Ok(parsed.code)
}
