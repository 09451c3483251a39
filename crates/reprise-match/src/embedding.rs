//! Embedding provider capability and the OpenAI-compatible HTTP client.

use crate::error::EmbeddingError;
use log::{debug, info};
use reprise_config::EmbeddingConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const EMBEDDINGS_PATH: &str = "/embeddings";
const DEFAULT_BATCH_SIZE: usize = 25;
const V3_BATCH_SIZE: usize = 6;

/// Turns texts into fixed-length vectors.
pub trait EmbeddingProvider: Send + Sync {
    /// Largest batch accepted by `embed_batch`.
    fn max_batch_size(&self) -> usize;

    /// Embed one batch, returning one vector per input in input order.
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

/// Embed any number of texts, chunked at the provider's batch limit.
pub fn embed_all(
    provider: &dyn EmbeddingProvider,
    texts: &[String],
) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    let batch_size = provider.max_batch_size().max(1);
    let mut embeddings = Vec::with_capacity(texts.len());
    for chunk in texts.chunks(batch_size) {
        let batch = provider.embed_batch(chunk)?;
        if batch.len() != chunk.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: chunk.len(),
                actual: batch.len(),
            });
        }
        embeddings.extend(batch);
    }
    debug!(
        "embedded texts (count={}, batch_size={batch_size})",
        texts.len()
    );
    Ok(embeddings)
}

/// Batch limit for a model id; `v3` embedding models accept fewer inputs.
pub fn default_batch_size_for_model(model: &str) -> usize {
    if model.contains("embedding-v3") || model.ends_with("v3") {
        V3_BATCH_SIZE
    } else {
        DEFAULT_BATCH_SIZE
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a [String],
    model: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

/// OpenAI-compatible `/embeddings` client using a blocking HTTP transport.
#[derive(Clone)]
pub struct HttpEmbeddingProvider {
    client: reqwest::blocking::Client,
    endpoint: String,
    model: String,
    api_key: String,
    api_key_header: String,
    max_batch_size: usize,
}

impl HttpEmbeddingProvider {
    /// Build a provider, resolving the API key from the configured env vars.
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let api_key = resolve_api_key(&config.api_key_env, |name| std::env::var(name).ok())?;
        Self::new(config, api_key)
    }

    /// Build a provider with an explicit API key.
    pub fn new(config: &EmbeddingConfig, api_key: impl Into<String>) -> Result<Self, EmbeddingError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let provider = Self {
            client,
            endpoint: embeddings_endpoint(&config.base_url),
            model: config.model.clone(),
            api_key: api_key.into(),
            api_key_header: config.api_key_header.clone(),
            max_batch_size: config
                .max_batch_size
                .unwrap_or_else(|| default_batch_size_for_model(&config.model)),
        };
        info!(
            "embedding provider ready (endpoint={}, model={}, batch_size={})",
            provider.endpoint, provider.model, provider.max_batch_size
        );
        Ok(provider)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl EmbeddingProvider for HttpEmbeddingProvider {
    fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        if texts.len() > self.max_batch_size {
            return Err(EmbeddingError::BatchTooLarge {
                size: texts.len(),
                max: self.max_batch_size,
            });
        }

        let response = self
            .client
            .post(&self.endpoint)
            .header(self.api_key_header.as_str(), self.api_key.as_str())
            .json(&EmbeddingRequest {
                input: texts,
                model: &self.model,
            })
            .send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(EmbeddingError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let payload: EmbeddingResponse = response.json()?;
        if payload.data.len() != texts.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: texts.len(),
                actual: payload.data.len(),
            });
        }
        order_by_index(payload.data)
    }
}

/// Vectors in input order. Indices must cover `0..n` exactly; a response
/// with no indices at all is taken in the order given.
fn order_by_index(mut data: Vec<EmbeddingItem>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
    if data.iter().all(|item| item.index.is_none()) {
        return Ok(data.into_iter().map(|item| item.embedding).collect());
    }
    data.sort_by_key(|item| item.index);
    if let Some((position, item)) = data
        .iter()
        .enumerate()
        .find(|(position, item)| item.index != Some(*position))
    {
        return Err(EmbeddingError::UnexpectedIndex {
            position,
            index: item.index,
        });
    }
    Ok(data.into_iter().map(|item| item.embedding).collect())
}

/// `{base}/embeddings`, unless the base already names the endpoint.
fn embeddings_endpoint(base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if base.ends_with(EMBEDDINGS_PATH) {
        base.to_string()
    } else {
        format!("{base}{EMBEDDINGS_PATH}")
    }
}

/// First non-empty value among the named variables.
fn resolve_api_key<F>(names: &[String], lookup: F) -> Result<String, EmbeddingError>
where
    F: Fn(&str) -> Option<String>,
{
    names
        .iter()
        .find_map(|name| lookup(name).filter(|value| !value.trim().is_empty()))
        .ok_or_else(|| EmbeddingError::MissingCredentials {
            vars: names.join(", "),
        })
}

#[cfg(test)]
mod tests {
    use super::{
        EmbeddingItem, EmbeddingProvider, HttpEmbeddingProvider, default_batch_size_for_model,
        embed_all, embeddings_endpoint, order_by_index, resolve_api_key,
    };
    use crate::EmbeddingError;
    use pretty_assertions::assert_eq;
    use reprise_config::EmbeddingConfig;
    use std::sync::Mutex;

    fn item(index: Option<usize>, value: f32) -> EmbeddingItem {
        EmbeddingItem {
            index,
            embedding: vec![value],
        }
    }

    #[test]
    fn response_indices_must_cover_every_position() {
        let ordered = order_by_index(vec![item(Some(1), 1.0), item(Some(0), 0.0)]).expect("order");
        assert_eq!(ordered, vec![vec![0.0], vec![1.0]]);

        let gap = order_by_index(vec![item(Some(0), 0.0), item(Some(2), 2.0)]);
        assert!(matches!(
            gap,
            Err(EmbeddingError::UnexpectedIndex {
                position: 1,
                index: Some(2)
            })
        ));

        let partial = order_by_index(vec![item(Some(1), 1.0), item(None, 0.0)]);
        assert!(matches!(
            partial,
            Err(EmbeddingError::UnexpectedIndex {
                position: 0,
                index: None
            })
        ));
    }

    struct RecordingProvider {
        max: usize,
        batches: Mutex<Vec<usize>>,
        drop_last: bool,
    }

    impl EmbeddingProvider for RecordingProvider {
        fn max_batch_size(&self) -> usize {
            self.max
        }

        fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            self.batches.lock().expect("lock").push(texts.len());
            let mut out: Vec<Vec<f32>> = texts.iter().map(|t| vec![t.len() as f32]).collect();
            if self.drop_last {
                out.pop();
            }
            Ok(out)
        }
    }

    #[test]
    fn endpoint_suffix_is_not_duplicated() {
        assert_eq!(
            embeddings_endpoint("https://host/v1"),
            "https://host/v1/embeddings"
        );
        assert_eq!(
            embeddings_endpoint("https://host/v1/"),
            "https://host/v1/embeddings"
        );
        assert_eq!(
            embeddings_endpoint("https://host/v1/embeddings"),
            "https://host/v1/embeddings"
        );
    }

    #[test]
    fn v3_models_use_small_batches() {
        assert_eq!(default_batch_size_for_model("doubao-embedding-v3"), 6);
        assert_eq!(default_batch_size_for_model("custom-v3"), 6);
        assert_eq!(default_batch_size_for_model("text-embedding-3-small"), 25);
    }

    #[test]
    fn api_key_comes_from_first_set_variable() {
        let names = vec!["FIRST".to_string(), "SECOND".to_string()];
        let key = resolve_api_key(&names, |name| match name {
            "FIRST" => Some(" ".to_string()),
            "SECOND" => Some("secret".to_string()),
            _ => None,
        })
        .expect("key");
        assert_eq!(key, "secret");

        let err = resolve_api_key(&names, |_| None).expect_err("missing");
        assert!(matches!(
            err,
            EmbeddingError::MissingCredentials { ref vars } if vars == "FIRST, SECOND"
        ));
    }

    #[test]
    fn embed_all_chunks_at_provider_limit() {
        let provider = RecordingProvider {
            max: 2,
            batches: Mutex::new(Vec::new()),
            drop_last: false,
        };
        let texts: Vec<String> = ["a", "bb", "ccc", "dddd", "eeeee"]
            .iter()
            .map(|t| t.to_string())
            .collect();
        let embeddings = embed_all(&provider, &texts).expect("embed");
        assert_eq!(embeddings.len(), 5);
        assert_eq!(embeddings[4], vec![5.0]);
        assert_eq!(*provider.batches.lock().expect("lock"), vec![2, 2, 1]);
    }

    #[test]
    fn embed_all_rejects_short_responses() {
        let provider = RecordingProvider {
            max: 10,
            batches: Mutex::new(Vec::new()),
            drop_last: true,
        };
        let texts = vec!["a".to_string(), "b".to_string()];
        let err = embed_all(&provider, &texts).expect_err("mismatch");
        assert!(matches!(
            err,
            EmbeddingError::CountMismatch {
                expected: 2,
                actual: 1
            }
        ));
    }

    #[test]
    fn oversized_batch_is_rejected_before_sending() {
        let config = EmbeddingConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            max_batch_size: Some(1),
            ..EmbeddingConfig::default()
        };
        let provider = HttpEmbeddingProvider::new(&config, "key").expect("provider");
        let texts = vec!["a".to_string(), "b".to_string()];
        let err = provider.embed_batch(&texts).expect_err("too large");
        assert!(matches!(
            err,
            EmbeddingError::BatchTooLarge { size: 2, max: 1 }
        ));
        assert_eq!(provider.endpoint(), "http://127.0.0.1:9/embeddings");
    }
}
