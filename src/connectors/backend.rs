// src/connectors/backend.rs
use crate::connectors::messages::{CommentaryResponse, SpeechRequest, TradeRequest};
use crate::connectors::traits::{CommentarySource, ExecutionHandler, MarketDataSource};
use crate::error::ServiceError;
use crate::types::{AudioClip, IndicatorSnapshot, Language, MarketSnapshot, TradeIntent};
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::{header, Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

const MARKET_DATA: &str = "/market-data";
const INDICATORS: &str = "/indicators";
const COMMENTARY: &str = "/ai-commentary";
const TEXT_TO_SPEECH: &str = "/text-to-speech";
const TRADE: &str = "/trade";

/// HTTP client for the local analysis service. One instance is shared by
/// every loop; `reqwest::Client` pools connections internally.
pub struct LocalBackend {
    http_client: Client,
    base_url: Url,
}

impl LocalBackend {
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self> {
        let mut base_url =
            Url::parse(base_url).with_context(|| format!("invalid base url {}", base_url))?;
        if base_url.cannot_be_a_base() {
            bail!("base url {} cannot carry endpoint paths", base_url);
        }
        // Endpoints are joined relative to the base, so keep any path prefix as a directory.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let http_client = Client::builder()
            .timeout(request_timeout)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            http_client,
            base_url,
        })
    }

    fn endpoint(&self, path: &'static str, query: Option<(&str, &str)>) -> Result<Url, ServiceError> {
        let mut url = self
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ServiceError::Decode {
                endpoint: path,
                reason: format!("cannot build url: {}", e),
            })?;
        if let Some((key, value)) = query {
            url.query_pairs_mut().append_pair(key, value);
        }
        Ok(url)
    }

    fn checked(endpoint: &'static str, response: Response) -> Result<Response, ServiceError> {
        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::Status { endpoint, status });
        }
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        query: (&str, &str),
    ) -> Result<T, ServiceError> {
        let url = self.endpoint(endpoint, Some(query))?;
        debug!("GET {}", url);

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| ServiceError::from_reqwest(endpoint, e))?;

        Self::checked(endpoint, response)?
            .json::<T>()
            .await
            .map_err(|e| ServiceError::from_reqwest(endpoint, e))
    }
}

#[async_trait]
impl MarketDataSource for LocalBackend {
    async fn fetch_market_data(&self, symbol: &str) -> Result<Vec<MarketSnapshot>, ServiceError> {
        self.get_json(MARKET_DATA, ("symbol", symbol)).await
    }

    async fn fetch_indicators(&self, symbol: &str) -> Result<Vec<IndicatorSnapshot>, ServiceError> {
        self.get_json(INDICATORS, ("symbol", symbol)).await
    }
}

#[async_trait]
impl CommentarySource for LocalBackend {
    async fn fetch_commentary(&self, language: Language) -> Result<String, ServiceError> {
        let resp: CommentaryResponse = self
            .get_json(COMMENTARY, ("language", language.code()))
            .await?;
        Ok(resp.message)
    }

    async fn synthesize(&self, text: &str, language: Language) -> Result<AudioClip, ServiceError> {
        let url = self.endpoint(TEXT_TO_SPEECH, None)?;
        let body = SpeechRequest {
            text,
            language: language.code(),
        };

        let response = self
            .http_client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ServiceError::from_reqwest(TEXT_TO_SPEECH, e))?;
        let response = Self::checked(TEXT_TO_SPEECH, response)?;

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ServiceError::from_reqwest(TEXT_TO_SPEECH, e))?;

        debug!("Synthesized {} bytes of audio ({:?})", bytes.len(), content_type);
        Ok(AudioClip {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}

#[async_trait]
impl ExecutionHandler for LocalBackend {
    async fn place_order(&self, intent: &TradeIntent) -> Result<serde_json::Value, ServiceError> {
        let url = self.endpoint(TRADE, None)?;
        info!(
            "🚀 Sending Order: {} {} {}",
            intent.side, intent.volume, intent.symbol
        );

        let response = self
            .http_client
            .post(url)
            .json(&TradeRequest::from(intent))
            .send()
            .await
            .map_err(|e| ServiceError::from_reqwest(TRADE, e))?;

        Self::checked(TRADE, response)?
            .json::<serde_json::Value>()
            .await
            .map_err(|e| ServiceError::from_reqwest(TRADE, e))
    }
}
