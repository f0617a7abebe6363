//! HTTP client for external LLM services (vLLM, OpenAI, etc.)

use super::cache::{EmbeddingCache, EMBEDDING_TTL};
use crate::config::LLMServiceConfig;
use crate::error::{Result, SmartLeaseError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Trait for LLM service clients
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Generate a chat completion at the given sampling temperature
    async fn chat_completion(&self, messages: Vec<ChatMessage>, temperature: f32)
        -> Result<String>;

    /// Generate embeddings for text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Chat model name
    fn model_name(&self) -> &str;

    /// Embedding model name
    fn embedding_model(&self) -> &str;
}

/// Chat message for completion requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

/// vLLM/OpenAI-compatible client
pub struct VLLMClient {
    http_client: reqwest::Client,
    config: LLMServiceConfig,
    cache: EmbeddingCache,
}

impl VLLMClient {
    /// Create new client from configuration
    pub fn new(config: LLMServiceConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()?;

        Ok(Self {
            http_client,
            config,
            cache: EmbeddingCache::new(EMBEDDING_TTL),
        })
    }

    fn authorized(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.config.api_key {
            Some(ref api_key) => req.header("Authorization", format!("Bearer {}", api_key)),
            None => req,
        }
    }

    fn embed_request<'a>(&'a self, input: &'a [String]) -> EmbedRequest<'a> {
        EmbedRequest {
            model: &self.config.embedding_model,
            input,
            dimensions: self.config.embedding_dimensions,
        }
    }

    /// Fetch vectors for texts the cache did not have
    async fn fetch_embeddings(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        #[derive(Deserialize)]
        struct EmbedResponse {
            data: Vec<EmbedData>,
        }

        #[derive(Deserialize)]
        struct EmbedData {
            embedding: Vec<f32>,
        }

        let start = Instant::now();
        let url = format!("{}/v1/embeddings", self.config.embeddings_url());
        let req = self.authorized(
            self.http_client
                .post(&url)
                .json(&self.embed_request(texts)),
        );

        let response = req.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SmartLeaseError::ExternalError(format!(
                "Embedding service error (HTTP {}): {}",
                status, body
            )));
        }

        let embed_response: EmbedResponse = response.json().await?;

        if embed_response.data.len() != texts.len() {
            return Err(SmartLeaseError::ExternalError(format!(
                "Embedding service returned {} vectors for {} inputs",
                embed_response.data.len(),
                texts.len()
            )));
        }

        tracing::debug!(
            "Fetched {} embeddings in {:?}",
            texts.len(),
            start.elapsed()
        );

        Ok(embed_response
            .data
            .into_iter()
            .map(|d| d.embedding)
            .collect())
    }
}

#[async_trait]
impl LLMClient for VLLMClient {
    async fn chat_completion(
        &self,
        messages: Vec<ChatMessage>,
        temperature: f32,
    ) -> Result<String> {
        #[derive(Serialize)]
        struct ChatRequest {
            model: String,
            messages: Vec<ChatMessage>,
            temperature: f32,
            max_tokens: u32,
        }

        #[derive(Deserialize)]
        struct ChatResponse {
            choices: Vec<ChatChoice>,
        }

        #[derive(Deserialize)]
        struct ChatChoice {
            message: ChatMessage,
        }

        let start = Instant::now();
        let request = ChatRequest {
            model: self.config.model.clone(),
            messages,
            temperature,
            max_tokens: self.config.max_tokens,
        };

        let url = format!("{}/v1/chat/completions", self.config.url);
        let req = self.authorized(self.http_client.post(&url).json(&request));

        let response = req.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SmartLeaseError::ExternalError(format!(
                "LLM service error (HTTP {}): {}",
                status, body
            )));
        }

        let chat_response: ChatResponse = response.json().await?;

        let content = chat_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| SmartLeaseError::Llm("No response from LLM".to_string()))?
            .message
            .content;

        tracing::debug!("Chat completion took {:?}", start.elapsed());
        Ok(content)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let results = self.embed_batch(&[text.to_string()]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| SmartLeaseError::Llm("No embedding returned".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let model = &self.config.embedding_model;
        let mut results: Vec<Option<Vec<f32>>> = Vec::with_capacity(texts.len());
        let mut missing_texts = Vec::new();
        let mut missing_indices = Vec::new();

        for (i, text) in texts.iter().enumerate() {
            let cached = self.cache.get(&EmbeddingCache::key(model, text));
            if cached.is_none() {
                missing_texts.push(text.clone());
                missing_indices.push(i);
            }
            results.push(cached);
        }

        if missing_texts.is_empty() {
            tracing::debug!("All {} embeddings from cache", texts.len());
        } else {
            let fetched = self.fetch_embeddings(&missing_texts).await?;
            for ((vector, idx), text) in fetched.into_iter().zip(missing_indices).zip(&missing_texts) {
                self.cache
                    .insert(EmbeddingCache::key(model, text), vector.clone());
                results[idx] = Some(vector);
            }
        }

        results
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| SmartLeaseError::Llm("Missing embedding in batch".to_string()))
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }

    fn embedding_model(&self) -> &str {
        &self.config.embedding_model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_message_roles() {
        assert_eq!(ChatMessage::system("s").role, "system");
        assert_eq!(ChatMessage::user("u").role, "user");
    }

    #[test]
    fn test_embed_request_carries_configured_dimensions() {
        let input = vec!["two bedroom".to_string()];

        let client = VLLMClient::new(LLMServiceConfig::default()).unwrap();
        let body = serde_json::to_value(client.embed_request(&input)).unwrap();
        assert_eq!(body["model"], "snowflake-arctic-embed-l-v2.0");
        assert!(body.get("dimensions").is_none());

        let client = VLLMClient::new(LLMServiceConfig {
            embedding_dimensions: Some(768),
            ..LLMServiceConfig::default()
        })
        .unwrap();
        let body = serde_json::to_value(client.embed_request(&input)).unwrap();
        assert_eq!(body["dimensions"], 768);
        assert_eq!(body["input"][0], "two bedroom");
    }

    #[tokio::test]
    async fn test_unreachable_service_is_http_error() {
        let config = LLMServiceConfig {
            url: "http://127.0.0.1:9".to_string(),
            connect_timeout_secs: 1,
            timeout_secs: 2,
            ..LLMServiceConfig::default()
        };
        let client = VLLMClient::new(config).unwrap();
        let err = client.embed("two bedroom").await.unwrap_err();
        assert!(matches!(err, SmartLeaseError::Http(_)));
    }
}
