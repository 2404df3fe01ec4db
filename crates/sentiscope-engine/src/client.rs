//! HTTP inference client.
//!
//! [`HttpInferenceClient`] issues exactly one authenticated `POST` per call
//! and converts every transport, status, timeout, and parse error into a
//! [`ServiceFailure`]. It never retries; callers apply their own fallback.

use crate::response;
use sentiscope_core::{
    CredentialsConfig, EndpointsConfig, EngineConfig, InferenceBackend, InferenceRequest,
    InferenceResult, Result, SentimentError, ServiceFailure,
};
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Reqwest-backed [`InferenceBackend`] for hosted inference endpoints.
pub struct HttpInferenceClient {
    client: reqwest::Client,
    endpoints: EndpointsConfig,
    credentials: CredentialsConfig,
}

impl HttpInferenceClient {
    /// Build a client from the engine configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SentimentError::Config`] if the underlying HTTP client cannot
    /// be constructed.
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_millis(config.timeouts.connect_timeout_ms))
            .timeout(Duration::from_millis(config.timeouts.request_timeout_ms))
            .build()
            .map_err(|e| SentimentError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoints: config.endpoints.clone(),
            credentials: config.credentials.clone(),
        })
    }

    /// JSON body for `request`.
    fn body(request: &InferenceRequest) -> Value {
        match request {
            InferenceRequest::DetectLanguage { text } | InferenceRequest::ClassifyText { text } => {
                json!({ "inputs": text })
            }
            InferenceRequest::Translate {
                text,
                source_language,
            } => json!({ "text": text, "sourceLanguage": source_language }),
            InferenceRequest::GenerateText { prompt } => json!({ "inputs": prompt }),
            InferenceRequest::ClassifyImage { image_url }
            | InferenceRequest::CaptionImage { image_url } => json!({ "inputs": image_url }),
            InferenceRequest::MatchImage {
                image_url,
                candidates,
            } => json!({ "inputs": { "image": image_url, "text": candidates } }),
        }
    }
}

fn classify_transport_error(e: &reqwest::Error) -> ServiceFailure {
    if e.is_timeout() {
        ServiceFailure::Timeout
    } else {
        ServiceFailure::Network(e.to_string())
    }
}

#[async_trait::async_trait]
impl InferenceBackend for HttpInferenceClient {
    async fn call(&self, request: &InferenceRequest) -> InferenceResult {
        let endpoint = request.endpoint();
        let url = self.endpoints.url_for(endpoint);
        let started = Instant::now();

        let response = self
            .client
            .post(url)
            .bearer_auth(self.credentials.token_for(endpoint))
            .json(&Self::body(request))
            .send()
            .await
            .map_err(|e| {
                let failure = classify_transport_error(&e);
                warn!(%endpoint, error = %failure, "Inference request failed");
                failure
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(%endpoint, status = status.as_u16(), "Inference endpoint returned an error status");
            return Err(ServiceFailure::Status(status.as_u16()));
        }

        let body = response.bytes().await.map_err(|e| {
            let failure = classify_transport_error(&e);
            warn!(%endpoint, error = %failure, "Failed to read inference response body");
            failure
        })?;

        let output = response::parse_output(endpoint, &body);
        match &output {
            Ok(_) => debug!(
                %endpoint,
                latency_ms = started.elapsed().as_millis() as u64,
                "Inference call succeeded"
            ),
            Err(e) => warn!(%endpoint, error = %e, "Inference response could not be parsed"),
        }
        output
    }

    fn name(&self) -> &'static str {
        "HttpInferenceClient"
    }
}
