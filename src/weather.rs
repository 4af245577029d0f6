use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{StatusCode, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::AppConfig;
use crate::errors::{AppError, AppResult};
use crate::geo::Coordinates;

#[derive(Debug, Clone, Serialize)]
pub struct WeatherSummary {
    pub city: String,
    pub temp_c: f64,
    pub description: String,
    pub condition_id: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherSource {
    Live,
    Demo(WeatherDegradation),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WeatherDegradation {
    NoKey,
    Unauthorized,
    RateLimited,
    RequestFailed,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeatherReport {
    pub summary: WeatherSummary,
    pub source: WeatherSource,
}

#[async_trait]
pub trait WeatherFetch: Send + Sync {
    async fn current(&self, center: Coordinates) -> AppResult<WeatherSummary>;
}

/// Weather for the view header. Like curation, this never surfaces an
/// error: a missing key or failed call degrades to a fixed demo summary
/// with the reason tagged on the report.
#[derive(Clone)]
pub struct WeatherService {
    inner: Option<Arc<dyn WeatherFetch>>,
}

impl WeatherService {
    pub fn new(config: &AppConfig) -> Self {
        let inner = config.weather_api_key.clone().map(|key| {
            Arc::new(OpenWeatherClient::new(
                key,
                config.weather_endpoint.clone(),
                config.request_timeout_secs,
            )) as Arc<dyn WeatherFetch>
        });
        Self { inner }
    }

    pub fn from_fetch(inner: Arc<dyn WeatherFetch>) -> Self {
        Self { inner: Some(inner) }
    }

    pub async fn current(&self, center: Coordinates) -> WeatherReport {
        let Some(client) = &self.inner else {
            return demo_report(WeatherDegradation::NoKey);
        };

        match client.current(center).await {
            Ok(summary) => WeatherReport {
                summary,
                source: WeatherSource::Live,
            },
            Err(err) => {
                let degradation = classify(&err);
                warn!(?err, ?degradation, "weather fetch degraded to demo summary");
                demo_report(degradation)
            }
        }
    }
}

fn classify(err: &AppError) -> WeatherDegradation {
    if let AppError::Http(http) = err {
        match http.status() {
            Some(StatusCode::UNAUTHORIZED) | Some(StatusCode::FORBIDDEN) => {
                return WeatherDegradation::Unauthorized
            }
            Some(StatusCode::TOO_MANY_REQUESTS) => return WeatherDegradation::RateLimited,
            _ => {}
        }
    }
    WeatherDegradation::RequestFailed
}

fn demo_report(degradation: WeatherDegradation) -> WeatherReport {
    WeatherReport {
        summary: WeatherSummary {
            city: "Vancouver".into(),
            temp_c: 8.0,
            description: "Partly cloudy".into(),
            condition_id: 803,
        },
        source: WeatherSource::Demo(degradation),
    }
}

pub struct OpenWeatherClient {
    http: reqwest::Client,
    api_key: SecretString,
    endpoint: String,
}

impl OpenWeatherClient {
    pub fn new(api_key: SecretString, endpoint: String, timeout_secs: u64) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .expect("weather http client");
        Self {
            http,
            api_key,
            endpoint,
        }
    }
}

#[async_trait]
impl WeatherFetch for OpenWeatherClient {
    async fn current(&self, center: Coordinates) -> AppResult<WeatherSummary> {
        let mut url = Url::parse(&self.endpoint)
            .map_err(|err| AppError::Config(format!("invalid weather endpoint: {err}")))?;
        url.query_pairs_mut()
            .append_pair("lat", &center.lat.to_string())
            .append_pair("lon", &center.lng.to_string())
            .append_pair("units", "metric")
            .append_pair("appid", self.api_key.expose_secret());

        let response = self.http.get(url).send().await?.error_for_status()?;
        let parsed: OpenWeatherResponse = response.json().await?;
        let condition = parsed.weather.into_iter().next();

        Ok(WeatherSummary {
            city: parsed.name.unwrap_or_else(|| "—".into()),
            temp_c: parsed.main.map(|m| m.temp).unwrap_or(0.0),
            description: condition
                .as_ref()
                .and_then(|c| c.description.clone())
                .unwrap_or_else(|| "—".into()),
            condition_id: condition.and_then(|c| c.id).unwrap_or(0),
        })
    }
}

#[derive(Deserialize)]
struct OpenWeatherResponse {
    name: Option<String>,
    main: Option<OpenWeatherMain>,
    #[serde(default)]
    weather: Vec<OpenWeatherCondition>,
}

#[derive(Deserialize)]
struct OpenWeatherMain {
    temp: f64,
}

#[derive(Deserialize)]
struct OpenWeatherCondition {
    id: Option<u32>,
    description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingFetch;

    #[async_trait]
    impl WeatherFetch for FailingFetch {
        async fn current(&self, _center: Coordinates) -> AppResult<WeatherSummary> {
            Err(AppError::Provider("boom".into()))
        }
    }

    struct FixedFetch;

    #[async_trait]
    impl WeatherFetch for FixedFetch {
        async fn current(&self, _center: Coordinates) -> AppResult<WeatherSummary> {
            Ok(WeatherSummary {
                city: "Burnaby".into(),
                temp_c: 11.0,
                description: "light rain".into(),
                condition_id: 500,
            })
        }
    }

    fn center() -> Coordinates {
        Coordinates::new(49.2827, -123.1207).unwrap()
    }

    #[tokio::test]
    async fn missing_key_yields_demo_summary() {
        let service = WeatherService { inner: None };
        let report = service.current(center()).await;
        assert_eq!(report.source, WeatherSource::Demo(WeatherDegradation::NoKey));
        assert_eq!(report.summary.condition_id, 803);
    }

    #[tokio::test]
    async fn fetch_failure_degrades_with_reason() {
        let service = WeatherService::from_fetch(Arc::new(FailingFetch));
        let report = service.current(center()).await;
        assert_eq!(
            report.source,
            WeatherSource::Demo(WeatherDegradation::RequestFailed)
        );
        assert_eq!(report.summary.city, "Vancouver");
    }

    #[tokio::test]
    async fn live_fetch_passes_through() {
        let service = WeatherService::from_fetch(Arc::new(FixedFetch));
        let report = service.current(center()).await;
        assert_eq!(report.source, WeatherSource::Live);
        assert_eq!(report.summary.city, "Burnaby");
    }
}
