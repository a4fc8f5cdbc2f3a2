//! Client for the remote prediction service.
//!
//! The service sits behind the [`PredictionService`] trait so the session
//! flow can be exercised against a stub. Response decoding is factored into
//! pure functions of (status, body): transport and shape problems become
//! errors that carry the raw payload for diagnosis, and the caller's session
//! state is never touched by a failed call.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::catalog::DataOptions;
use crate::config::Config;
use crate::session::{Advisory, Session};

/// Decoded `predictions` payload. The service sometimes returns a flat float
/// array and sometimes one vector per step; consumers only ever see the flat
/// form via [`Predictions::into_flat`].
#[derive(Debug, Clone, PartialEq)]
pub enum Predictions {
    Flat(Vec<f64>),
    PerStepVector(Vec<Vec<f64>>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawPredictions {
    Flat(Vec<f64>),
    PerStepVector(Vec<Vec<f64>>),
}

impl Predictions {
    /// Normalize to one scalar per step. For per-step vectors the LAST
    /// element of each vector is taken, matching what the upstream service
    /// emits today; its intent is undocumented there. Empty inner vectors
    /// are skipped.
    pub fn into_flat(self) -> Vec<f64> {
        match self {
            Predictions::Flat(v) => v,
            Predictions::PerStepVector(rows) => {
                rows.into_iter().filter_map(|row| row.last().copied()).collect()
            }
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Predictions::Flat(v) => v.len(),
            Predictions::PerStepVector(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Fused-endpoint payload: two independently produced traces keyed by raw
/// timestamp strings.
#[derive(Debug, Clone, Deserialize)]
pub struct FusedResponse {
    pub pred_fusion: HashMap<String, f64>,
    pub pred_cnn: HashMap<String, f64>,
}

/// Legacy single-endpoint payload: parallel time/risk arrays.
#[derive(Debug, Clone)]
pub struct LegacyForecast {
    pub time: Vec<f64>,
    pub risk: Vec<f64>,
}

const SNIPPET_LEN: usize = 300;

/// Body excerpt for error messages.
fn snippet(body: &str) -> &str {
    match body.char_indices().nth(SNIPPET_LEN) {
        Some((i, _)) => &body[..i],
        None => body,
    }
}

pub fn decode_predictions(status: StatusCode, body: &str) -> Result<Predictions> {
    if !status.is_success() {
        return Err(anyhow!("prediction service returned {}: {}", status, snippet(body)));
    }
    let value: serde_json::Value =
        serde_json::from_str(body).with_context(|| format!("malformed JSON: {}", snippet(body)))?;
    let preds = value
        .get("predictions")
        .ok_or_else(|| anyhow!("response does not contain 'predictions': {}", snippet(body)))?;
    let raw: RawPredictions = serde_json::from_value(preds.clone())
        .map_err(|_| anyhow!("'predictions' has unexpected shape: {}", snippet(body)))?;
    Ok(match raw {
        RawPredictions::Flat(v) => Predictions::Flat(v),
        RawPredictions::PerStepVector(rows) => Predictions::PerStepVector(rows),
    })
}

pub fn decode_fused(status: StatusCode, body: &str) -> Result<FusedResponse> {
    if !status.is_success() {
        return Err(anyhow!("fused prediction fetch returned {}: {}", status, snippet(body)));
    }
    serde_json::from_str(body)
        .with_context(|| format!("fused response missing pred_fusion/pred_cnn: {}", snippet(body)))
}

pub fn decode_legacy(status: StatusCode, body: &str) -> Result<LegacyForecast> {
    if !status.is_success() {
        return Err(anyhow!("predict endpoint returned {}: {}", status, snippet(body)));
    }
    #[derive(Deserialize)]
    struct Raw {
        time: Vec<f64>,
        risk: Vec<f64>,
    }
    let raw: Raw = serde_json::from_str(body)
        .with_context(|| format!("predict response missing time/risk arrays: {}", snippet(body)))?;
    if raw.time.len() != raw.risk.len() {
        return Err(anyhow!(
            "time/risk arrays differ in length: {} vs {}",
            raw.time.len(),
            raw.risk.len()
        ));
    }
    Ok(LegacyForecast { time: raw.time, risk: raw.risk })
}

/// Outbound operations against the prediction service.
#[async_trait]
pub trait PredictionService {
    /// POST /predict_from_url with the opaque data URL.
    async fn predict_from_url(&self, data_url: &str) -> Result<Predictions>;
    /// GET /predict_fusion_local_{code}.
    async fn predict_fusion(&self, code: u32) -> Result<FusedResponse>;
    /// GET /predict?person_id=&day_id= (legacy endpoint).
    async fn predict_person_day(&self, person_id: u32, day_id: u32) -> Result<LegacyForecast>;
}

/// HTTP implementation. One call per user action, no automatic retries;
/// timeouts bound every request.
pub struct HttpPredictionService {
    client: Client,
    base: String,
    predict_timeout: Duration,
    fused_timeout: Duration,
}

impl HttpPredictionService {
    pub fn new(cfg: &Config) -> Self {
        Self {
            client: Client::new(),
            base: cfg.api_base.trim_end_matches('/').to_string(),
            predict_timeout: Duration::from_secs(cfg.predict_timeout_secs),
            fused_timeout: Duration::from_secs(cfg.fused_timeout_secs),
        }
    }
}

#[async_trait]
impl PredictionService for HttpPredictionService {
    async fn predict_from_url(&self, data_url: &str) -> Result<Predictions> {
        let url = format!("{}/predict_from_url", self.base);
        let resp = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "url": data_url }))
            .timeout(self.predict_timeout)
            .send()
            .await
            .with_context(|| format!("POST {} failed", url))?;
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        decode_predictions(status, &body)
    }

    async fn predict_fusion(&self, code: u32) -> Result<FusedResponse> {
        let url = format!("{}/predict_fusion_local_{}", self.base, code);
        let resp = self
            .client
            .get(&url)
            .timeout(self.fused_timeout)
            .send()
            .await
            .with_context(|| format!("GET {} failed", url))?;
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        decode_fused(status, &body)
    }

    async fn predict_person_day(&self, person_id: u32, day_id: u32) -> Result<LegacyForecast> {
        let url = format!("{}/predict?person_id={}&day_id={}", self.base, person_id, day_id);
        let resp = self
            .client
            .get(&url)
            .timeout(self.predict_timeout)
            .send()
            .await
            .with_context(|| format!("GET {} failed", url))?;
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        decode_legacy(status, &body)
    }
}

/// Why a "Run Prediction" action did not produce a forecast.
#[derive(Debug)]
pub enum SelectionError {
    /// Recoverable user error; no network call was made and the session did
    /// not move.
    Advisory(Advisory),
    /// Transport, status, or response-shape failure; the session keeps
    /// whatever state it had when the call went out.
    Service(anyhow::Error),
}

/// Handler for the prediction action on the person/day selector. The catalog
/// gate runs before anything touches the network: an unmapped selection
/// never issues a call. On a mapped selection the session transitions to the
/// forecast page, the forecast is fetched and flattened, and a failed fetch
/// leaves the session exactly as the transition left it.
pub async fn run_selection(
    session: &mut Session,
    person: &str,
    day: &str,
    options: &DataOptions,
    service: &dyn PredictionService,
) -> Result<(Vec<f64>, PredictionSummary), SelectionError> {
    let data_url = session
        .select_person_day(person, day, options)
        .map_err(SelectionError::Advisory)?;
    let predictions = service
        .predict_from_url(&data_url)
        .await
        .map_err(SelectionError::Service)?;
    let flat = predictions.into_flat();
    let summary = PredictionSummary::from_flat(&flat).map_err(SelectionError::Service)?;
    Ok((flat, summary))
}

/// Headline view of a fetched forecast: the maximum risk and where it sits.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionSummary {
    pub max_risk: f64,
    pub max_risk_index: usize,
}

impl PredictionSummary {
    pub fn from_flat(predictions: &[f64]) -> Result<Self> {
        let (max_risk_index, max_risk) = predictions
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(i, v)| (i, *v))
            .ok_or_else(|| anyhow!("empty forecast: no predictions to summarize"))?;
        Ok(Self { max_risk, max_risk_index })
    }

    pub fn message(&self) -> &'static str {
        if self.max_risk < 0.3 {
            "Low hypoglycemia risk detected."
        } else if self.max_risk < 0.6 {
            "Moderate hypoglycemia risk - monitor closely."
        } else {
            "High hypoglycemia risk - intervention recommended!"
        }
    }
}
