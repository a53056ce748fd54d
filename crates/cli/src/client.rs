//! API client for communicating with the suspension forecast service

use anyhow::{Context, Result};
use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Non-success response from the service
#[derive(Debug, Error)]
pub enum ApiError {
    /// The service answered with its `{error, message}` payload
    #[error("{error} ({status}): {message}")]
    Server {
        status: u16,
        error: String,
        message: String,
    },

    /// The service answered with something else
    #[error("API error ({status}): {body}")]
    Unexpected { status: u16, body: String },
}

/// API client for the forecast service
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base_url.join(path).context("Invalid path")
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        decode(response).await
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, url: Url, body: &B) -> Result<T> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        decode(response).await
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        self.get(self.url("health")?).await
    }

    /// Fetch the forecast for `city`, or the service default when `None`
    pub async fn forecast(
        &self,
        city: Option<&str>,
        days: Option<usize>,
        force_retrain: bool,
    ) -> Result<ForecastResponse> {
        let mut url = self.url("api/predictions/suspension-forecast")?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(city) = city {
                query.append_pair("city", city);
            }
            if let Some(days) = days {
                query.append_pair("days", &days.to_string());
            }
            if force_retrain {
                query.append_pair("force_retrain", "true");
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }
        self.get(url).await
    }

    pub async fn models(&self) -> Result<ModelInfoResponse> {
        self.get(self.url("api/predictions/model-info")?).await
    }

    pub async fn retrain(&self, city: Option<&str>) -> Result<RetrainResponse> {
        let body = RetrainRequest {
            city: city.map(str::to_string),
        };
        self.post(self.url("api/predictions/retrain")?, &body).await
    }

    pub async fn self_test(&self) -> Result<SelfTestResponse> {
        self.get(self.url("api/predictions/test")?).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let error = match serde_json::from_str::<ErrorResponse>(&body) {
            Ok(payload) => ApiError::Server {
                status: status.as_u16(),
                error: payload.error,
                message: payload.message.unwrap_or_default(),
            },
            Err(_) => ApiError::Unexpected {
                status: status.as_u16(),
                body,
            },
        };
        return Err(error.into());
    }

    response.json().await.context("Failed to parse response")
}

// API response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub timestamp: String,
    #[serde(default)]
    pub components: std::collections::BTreeMap<String, ComponentHealth>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: String,
    pub probability: f64,
    pub risk_level: String,
    pub confidence: String,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub action: String,
    pub message: String,
    pub high_risk_days: Vec<ForecastPoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Accuracy {
    pub accuracy: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    pub aic: f64,
    pub bic: f64,
    pub training_days: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastResponse {
    pub city: String,
    pub forecast: Vec<ForecastPoint>,
    pub recommendation: Recommendation,
    pub accuracy: Option<Accuracy>,
    pub model_info: ModelInfo,
    pub generated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSummary {
    pub city: String,
    pub last_trained: String,
    pub training_days: usize,
    pub accuracy: Option<f64>,
    pub aic: f64,
    pub bic: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfoResponse {
    pub models: Vec<ModelSummary>,
    pub total_models: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrainRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrainResponse {
    pub success: bool,
    pub message: String,
    pub trained_at: String,
    pub model_info: ModelInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelfTestResponse {
    pub status: String,
    pub message: String,
    pub sample_forecast: Vec<ForecastPoint>,
}
