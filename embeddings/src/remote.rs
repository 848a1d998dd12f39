//! OpenAI-compatible embedding client.

use crate::backend::{Embedder, check_input, embed_in_batches, finish};
use crate::config::EmbeddingConfig;
use crate::error::{EmbeddingError, Result};
use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Embedding backend that talks to an OpenAI-compatible `/embeddings` endpoint.
#[derive(Clone)]
pub struct RemoteBackend {
    client: Client,
    endpoint: String,
    model: String,
    dimension: usize,
    request_dimensions: Option<usize>,
    max_retries: usize,
    retry_backoff: Duration,
    batch_size: usize,
}

impl RemoteBackend {
    /// Build a client from configuration. Requires a credential and a known dimension.
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let api_key = config
            .api_key()
            .ok_or_else(|| EmbeddingError::BackendUnavailable {
                provider: "remote",
                reason: "no API key configured (set OPENAI_API_KEY)".to_string(),
            })?;
        let dimension =
            config
                .remote_dimension()
                .ok_or_else(|| EmbeddingError::BackendUnavailable {
                    provider: "remote",
                    reason: format!(
                        "unknown dimension for model `{}`; set remote_dimension",
                        config.remote_model
                    ),
                })?;

        let mut headers = HeaderMap::new();
        let auth = format!("Bearer {api_key}");
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth)
                .map_err(|_| EmbeddingError::InvalidInput("invalid API key".to_string()))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| EmbeddingError::ModelInitialization(e.to_string()))?;
        let endpoint = format!("{}/embeddings", config.base_url.trim_end_matches('/'));

        info!(
            "Initialized remote embedding backend: model {}, dimension {dimension}, endpoint {endpoint}",
            config.remote_model
        );

        Ok(Self {
            client,
            endpoint,
            model: config.remote_model.clone(),
            dimension,
            request_dimensions: config.remote_dimension,
            max_retries: config.max_retries.max(1),
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
            batch_size: config.batch_size.max(1),
        })
    }

    /// Send one request, retrying throttling, server errors and transport failures.
    async fn request(&self, inputs: Vec<String>) -> Result<Vec<Vec<f32>>> {
        let mut attempt = 0usize;
        loop {
            let request = EmbeddingRequest {
                model: &self.model,
                input: &inputs,
                dimensions: self.request_dimensions,
            };
            match self.client.post(&self.endpoint).json(&request).send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        let mut parsed: EmbeddingResponse = resp.json().await?;
                        parsed.data.sort_by_key(|entry| entry.index);
                        if parsed.data.len() != inputs.len() {
                            return Err(EmbeddingError::EmbeddingGeneration(format!(
                                "provider returned {} embeddings for {} inputs",
                                parsed.data.len(),
                                inputs.len()
                            )));
                        }
                        debug!("Received {} remote embeddings", parsed.data.len());
                        return Ok(parsed.data.into_iter().map(|entry| entry.embedding).collect());
                    }

                    let body = resp
                        .text()
                        .await
                        .unwrap_or_else(|_| "<body unavailable>".to_string());
                    if should_retry(status) && attempt + 1 < self.max_retries {
                        attempt += 1;
                        warn!("Embedding request returned {status}; retry {attempt}");
                        tokio::time::sleep(self.backoff(attempt)).await;
                        continue;
                    }
                    return Err(EmbeddingError::Request {
                        status: Some(status.as_u16()),
                        message: body,
                    });
                }
                Err(err) => {
                    if is_retryable_error(&err) && attempt + 1 < self.max_retries {
                        attempt += 1;
                        warn!("Embedding request failed ({err}); retry {attempt}");
                        tokio::time::sleep(self.backoff(attempt)).await;
                        continue;
                    }
                    return Err(err.into());
                }
            }
        }
    }

    fn backoff(&self, attempt: usize) -> Duration {
        let capped = attempt.min(5) as u32;
        self.retry_backoff * (1 << capped)
    }
}

fn should_retry(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_body() || err.is_request()
}

#[async_trait]
impl Embedder for RemoteBackend {
    fn identifier(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        check_input(text)?;
        let vector = self
            .request(vec![text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| EmbeddingError::EmbeddingGeneration("No embedding generated".into()))?;
        finish(vector, self.dimension)
    }

    async fn embed_many(&self, texts: &[String]) -> Vec<Option<Vec<f32>>> {
        embed_in_batches(texts, self.batch_size, self.dimension, |batch| {
            self.request(batch)
        })
        .await
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

    /// Answers with one vector per input, derived from the text, in reverse index order.
    struct EchoEmbeddings;

    impl Respond for EchoEmbeddings {
        fn respond(&self, request: &Request) -> ResponseTemplate {
            let body: Value = serde_json::from_slice(&request.body).unwrap();
            let inputs = body["input"].as_array().unwrap();
            let mut data: Vec<Value> = inputs
                .iter()
                .enumerate()
                .map(|(index, text)| {
                    let len = text.as_str().unwrap().len() as f32;
                    json!({"index": index, "embedding": [len, 1.0, 0.0]})
                })
                .collect();
            data.reverse();
            ResponseTemplate::new(200).set_body_json(json!({"data": data}))
        }
    }

    fn config_for(server: &MockServer) -> EmbeddingConfig {
        EmbeddingConfig {
            api_key: Some("sk-test".to_string()),
            base_url: server.uri(),
            remote_model: "test-model".to_string(),
            remote_dimension: Some(3),
            timeout_secs: 1,
            max_retries: 3,
            retry_backoff_ms: 1,
            ..Default::default()
        }
    }

    fn expected(text: &str) -> Vec<f32> {
        let mut v = vec![text.len() as f32, 1.0, 0.0];
        crate::normalize(&mut v);
        v
    }

    #[test]
    fn test_missing_key_is_unavailable() {
        let err = RemoteBackend::new(&EmbeddingConfig::default()).err().unwrap();
        assert!(matches!(
            err,
            EmbeddingError::BackendUnavailable {
                provider: "remote",
                ..
            }
        ));
    }

    #[test]
    fn test_unknown_model_requires_dimension() {
        let config = EmbeddingConfig {
            api_key: Some("sk-test".to_string()),
            remote_model: "custom".to_string(),
            ..Default::default()
        };
        assert!(RemoteBackend::new(&config).is_err());
    }

    #[tokio::test]
    async fn test_embed_many_restores_input_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(EchoEmbeddings)
            .mount(&server)
            .await;

        let backend = RemoteBackend::new(&config_for(&server)).unwrap();
        let texts = vec!["a".to_string(), "bbb".to_string(), "cc".to_string()];
        let batch = backend.embed_many(&texts).await;

        let mut individual = Vec::new();
        for text in &texts {
            individual.push(Some(backend.embed_one(text).await.unwrap()));
        }
        assert_eq!(batch, individual);
        assert_eq!(batch[1], Some(expected("bbb")));
    }

    #[tokio::test]
    async fn test_bad_item_does_not_fail_batch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("poison"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad input"))
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(EchoEmbeddings)
            .mount(&server)
            .await;

        let backend = RemoteBackend::new(&config_for(&server)).unwrap();
        let texts = vec!["one".to_string(), "poison".to_string(), "three".to_string()];
        let out = backend.embed_many(&texts).await;

        assert_eq!(
            out,
            vec![Some(expected("one")), None, Some(expected("three"))]
        );
    }

    #[tokio::test]
    async fn test_retries_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(EchoEmbeddings)
            .mount(&server)
            .await;

        let backend = RemoteBackend::new(&config_for(&server)).unwrap();
        let vector = backend.embed_one("mercy").await.unwrap();
        assert_eq!(vector, expected("mercy"));
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid key"))
            .expect(1)
            .mount(&server)
            .await;

        let backend = RemoteBackend::new(&config_for(&server)).unwrap();
        let err = backend.embed_one("mercy").await.unwrap_err();
        assert!(matches!(
            err,
            EmbeddingError::Request {
                status: Some(401),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_wrong_dimension_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"data": [{"index": 0, "embedding": [1.0, 0.0]}]})),
            )
            .mount(&server)
            .await;

        let backend = RemoteBackend::new(&config_for(&server)).unwrap();
        let err = backend.embed_one("mercy").await.unwrap_err();
        assert!(matches!(
            err,
            EmbeddingError::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        ));
    }

    #[tokio::test]
    async fn test_timeout_fails_instead_of_hanging() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let config = EmbeddingConfig {
            max_retries: 1,
            ..config_for(&server)
        };
        let backend = RemoteBackend::new(&config).unwrap();
        let err = backend.embed_one("mercy").await.unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_empty_text_is_invalid_input() {
        let server = MockServer::start().await;
        let backend = RemoteBackend::new(&config_for(&server)).unwrap();
        let err = backend.embed_one("   ").await.unwrap_err();
        assert!(matches!(err, EmbeddingError::InvalidInput(_)));
    }
}
