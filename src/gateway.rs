//! gateway.rs — typed HTTP client for the Backend Gateway.
//! Centralizes every endpoint the client consumes; responses are validated
//! against explicit serde schemas instead of trusting ambient JSON shape.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CACHE_CONTROL, PRAGMA};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::GatewayError;
use crate::logging::{client_error, client_info};
use crate::settings::ClientSettings;

// ── Wire types ───────────────────────────────────────

/// One question/answer record from the shared log store. Immutable;
/// `time` is `YYYY-MM-DD HH:MM:SS` as written by the gateway.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LogEntry {
    pub id: i64,
    pub question: String,
    pub answer: String,
    pub time: String,
}

/// Headline stats sourced from the gateway; `saved_money` and `efficiency`
/// arrive preformatted and are treated as opaque facts.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct StatsResponse {
    pub total_calls: u64,
    pub today_calls: u64,
    pub saved_money: String,
    pub efficiency: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AdminStatsResponse {
    pub count: u64,
    pub saved_money: String,
    pub rating: f64,
}

/// Combined transcribe-and-ask result from `/ask-voice`.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct VoiceAnswer {
    pub user_text: String,
    pub answer: String,
}

#[derive(Debug, Deserialize)]
struct AskResponse {
    answer: String,
}

// ── Gateway trait ────────────────────────────────────

/// Seam for everything that talks to the Backend Gateway, so sessions,
/// players and pollers can be exercised against a mock in tests.
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn ask(&self, input: &str) -> Result<String, GatewayError>;
    async fn ask_voice(&self, audio_wav: Vec<u8>) -> Result<VoiceAnswer, GatewayError>;
    async fn text_to_speech(&self, input: &str) -> Result<Vec<u8>, GatewayError>;
    async fn logs(&self) -> Result<Vec<LogEntry>, GatewayError>;
    async fn stats(&self) -> Result<StatsResponse, GatewayError>;
    async fn admin_stats(&self) -> Result<AdminStatsResponse, GatewayError>;
}

// ── HTTP implementation ──────────────────────────────

pub struct HttpGateway {
    base_url: String,
    client: reqwest::Client,
}

impl HttpGateway {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("eduline/0.1")
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        let base_url = base_url.into().trim_end_matches('/').to_string();
        client_info(format!("Gateway client ready for {}", base_url));

        HttpGateway { base_url, client }
    }

    pub fn from_settings(settings: &ClientSettings) -> Self {
        Self::new(settings.gateway_url.clone())
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Telemetry freshness depends on never seeing a cached response,
    /// at any layer.
    fn no_cache_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache, no-store"));
        headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
        headers
    }

    async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, GatewayError> {
        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        let preview: String = body.chars().take(300).collect();
        client_error(format!("Gateway HTTP error {}: {}", status, preview));
        Err(GatewayError::Status { status, preview })
    }

    async fn decode<T: serde::de::DeserializeOwned>(resp: reqwest::Response) -> Result<T, GatewayError> {
        let body = resp.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            client_error(format!("Gateway response did not match schema: {}", e));
            GatewayError::Decode(e.to_string())
        })
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn ask(&self, input: &str) -> Result<String, GatewayError> {
        client_info(format!("POST /ask (input_len={})", input.len()));
        let resp = self
            .client
            .post(self.endpoint("/ask"))
            .json(&serde_json::json!({ "input": input }))
            .send()
            .await?;
        let parsed: AskResponse = Self::decode(Self::check_status(resp).await?).await?;
        Ok(parsed.answer)
    }

    async fn ask_voice(&self, audio_wav: Vec<u8>) -> Result<VoiceAnswer, GatewayError> {
        client_info(format!("POST /ask-voice (payload_kb={})", audio_wav.len() / 1024));
        let part = reqwest::multipart::Part::bytes(audio_wav)
            .file_name("question.wav")
            .mime_str("audio/wav")
            .map_err(|e| GatewayError::Decode(e.to_string()))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let resp = self
            .client
            .post(self.endpoint("/ask-voice"))
            .multipart(form)
            .send()
            .await?;
        Self::decode(Self::check_status(resp).await?).await
    }

    async fn text_to_speech(&self, input: &str) -> Result<Vec<u8>, GatewayError> {
        client_info(format!("POST /text-to-speech (input_len={})", input.len()));
        let resp = self
            .client
            .post(self.endpoint("/text-to-speech"))
            .json(&serde_json::json!({ "input": input }))
            .send()
            .await?;
        let resp = Self::check_status(resp).await?;
        let bytes = resp.bytes().await?;
        Ok(bytes.to_vec())
    }

    async fn logs(&self) -> Result<Vec<LogEntry>, GatewayError> {
        let resp = self
            .client
            .get(self.endpoint("/logs"))
            .headers(Self::no_cache_headers())
            .send()
            .await?;
        Self::decode(Self::check_status(resp).await?).await
    }

    async fn stats(&self) -> Result<StatsResponse, GatewayError> {
        let resp = self
            .client
            .get(self.endpoint("/stats"))
            .headers(Self::no_cache_headers())
            .send()
            .await?;
        Self::decode(Self::check_status(resp).await?).await
    }

    async fn admin_stats(&self) -> Result<AdminStatsResponse, GatewayError> {
        let resp = self
            .client
            .get(self.endpoint("/admin-stats"))
            .headers(Self::no_cache_headers())
            .send()
            .await?;
        Self::decode(Self::check_status(resp).await?).await
    }
}
