//! Range-vector queries against the Prometheus-compatible backend.

use anyhow::{anyhow, Result};
use reqwest::Client as HttpClient;
use serde::Deserialize;

use crate::constants::metrics;
use crate::errors::MetricsError;

#[derive(Debug, Clone, Deserialize)]
struct PromResponse {
    status: String,
    data: PromData,
}

#[derive(Debug, Clone, Deserialize)]
struct PromData {
    result: Vec<PromSeries>,
}

/// One series from the backend: a label set plus (unix seconds, value)
/// sample points ordered oldest first.
#[derive(Debug, Clone, Deserialize)]
pub struct PromSeries {
    pub metric: PromLabels,
    pub values: Vec<(f64, String)>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PromLabels {
    #[serde(rename = "__name__")]
    pub name: String,
    #[serde(default)]
    pub channel: Option<String>,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub hostname: Option<String>,
    #[serde(default)]
    pub instance: Option<String>,
    #[serde(default)]
    pub job: Option<String>,
}

impl PromSeries {
    pub fn latest_point(&self) -> Option<&(f64, String)> {
        self.values.last()
    }

    fn first_point(&self) -> Option<&(f64, String)> {
        self.values.first()
    }

    pub fn latest_u64(&self) -> Result<u64> {
        self.parse_u64(self.latest_point())
    }

    pub fn first_u64(&self) -> Result<u64> {
        self.parse_u64(self.first_point())
    }

    pub fn latest_f64(&self) -> Result<f64> {
        let point = self.latest_point().ok_or_else(|| MetricsError::BadSample {
            metric: self.metric.name.clone(),
            reason: "no sample points".to_string(),
        })?;
        let value = point.1.parse::<f64>().map_err(|e| MetricsError::BadSample {
            metric: self.metric.name.clone(),
            reason: e.to_string(),
        })?;
        Ok(value)
    }

    fn parse_u64(&self, point: Option<&(f64, String)>) -> Result<u64> {
        let point = point.ok_or_else(|| MetricsError::BadSample {
            metric: self.metric.name.clone(),
            reason: "no sample points".to_string(),
        })?;
        // Counters may be rendered as "42" or "42.0".
        if let Ok(value) = point.1.parse::<u64>() {
            return Ok(value);
        }
        let value = point.1.parse::<f64>().map_err(|e| MetricsError::BadSample {
            metric: self.metric.name.clone(),
            reason: e.to_string(),
        })?;
        Ok(value as u64)
    }
}

/// Query the backend for every metric in `names` over the fixed lookback
/// window.
pub async fn range_query(
    client: &HttpClient,
    backend_url: &str,
    query_path: &str,
    names: &[String],
) -> Result<Vec<PromSeries>> {
    let query = format!(
        "{{__name__=~\"{}\"}}[{}s]",
        names.join("|"),
        metrics::WINDOW_SECS
    );
    let url = format!("{}{}", backend_url, query_path);

    let response = client
        .get(&url)
        .query(&[("query", query.as_str())])
        .send()
        .await
        .map_err(|e| MetricsError::Backend {
            reason: e.to_string(),
        })?;

    if !response.status().is_success() {
        return Err(MetricsError::Backend {
            reason: format!("HTTP {}", response.status()),
        }
        .into());
    }

    let envelope: PromResponse = response
        .json()
        .await
        .map_err(|e| anyhow!("Failed to decode metrics response: {}", e))?;

    if envelope.status != "success" {
        return Err(MetricsError::Backend {
            reason: format!("backend status '{}'", envelope.status),
        }
        .into());
    }

    Ok(envelope.data.result)
}

/// Shared nominal sample timestamp: the latest point across all series.
pub fn latest_timestamp(series: &[PromSeries]) -> Option<chrono::DateTime<chrono::Utc>> {
    series
        .iter()
        .filter_map(|s| s.latest_point())
        .map(|point| point.0)
        .fold(None, |max: Option<f64>, ts| match max {
            Some(m) if m >= ts => Some(m),
            _ => Some(ts),
        })
        .and_then(|ts| chrono::DateTime::from_timestamp(ts as i64, 0))
}
