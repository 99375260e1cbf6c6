//! OpenAI-compatible `/embeddings` adapter.
//!
//! Requests are split into batches of at most `batch_size` texts with a fixed
//! pause between batches.

use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use deponent_config::EmbeddingsConfig;

use crate::EmbeddingProvider;

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

pub struct OpenAiEmbeddingProvider {
    api_key: Option<String>,
    api_base_url: String,
    model: String,
    batch_size: usize,
    batch_delay: Duration,
    client: Client,
}

impl OpenAiEmbeddingProvider {
    pub fn from_config(config: &EmbeddingsConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self {
            api_key: config.api_key(),
            api_base_url: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            batch_size: config.batch_size.max(1),
            batch_delay: Duration::from_millis(config.batch_delay_ms),
            client,
        })
    }

    async fn request(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let url = format!("{}/embeddings", self.api_base_url);
        let mut builder = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .json(&EmbeddingRequest {
                model: &self.model,
                input: texts,
            });
        if let Some(key) = &self.api_key {
            builder = builder.header(AUTHORIZATION, format!("Bearer {}", key));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("Embedding request failed: {}", e))?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Embedding API error ({}): {}", status, body);
        }
        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to parse embedding response: {}", e))?;
        order_embeddings(parsed, texts.len())
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.request(&[text])
            .await?
            .pop()
            .ok_or_else(|| anyhow::anyhow!("Empty embedding response"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        embed_in_batches(texts, self.batch_size, self.batch_delay, |chunk| {
            self.request(chunk)
        })
        .await
    }
}

/// Run `request` over `texts` in chunks of at most `batch_size`, sleeping
/// `delay` between chunks. Output order matches input order.
pub async fn embed_in_batches<'t, F, Fut>(
    texts: &'t [&'t str],
    batch_size: usize,
    delay: Duration,
    mut request: F,
) -> Result<Vec<Vec<f32>>>
where
    F: FnMut(&'t [&'t str]) -> Fut,
    Fut: Future<Output = Result<Vec<Vec<f32>>>>,
{
    let batch_size = batch_size.max(1);
    let mut out = Vec::with_capacity(texts.len());
    for (i, chunk) in texts.chunks(batch_size).enumerate() {
        if i > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let vectors = request(chunk).await?;
        if vectors.len() != chunk.len() {
            anyhow::bail!(
                "embedding batch {} returned {} vectors for {} inputs",
                i,
                vectors.len(),
                chunk.len()
            );
        }
        debug!(batch = i, size = chunk.len(), "Embedding batch complete");
        out.extend(vectors);
    }
    Ok(out)
}

fn order_embeddings(response: EmbeddingResponse, expected: usize) -> Result<Vec<Vec<f32>>> {
    let mut data = response.data;
    if data.len() != expected {
        anyhow::bail!(
            "Embedding response has {} vectors for {} inputs",
            data.len(),
            expected
        );
    }
    if data.iter().all(|d| d.index.is_some()) {
        data.sort_by_key(|d| d.index);
    }
    Ok(data.into_iter().map(|d| d.embedding).collect())
}
