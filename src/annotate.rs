use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::errors::{AppError, AppResult};
use crate::geo::Coordinates;
use crate::place::Place;

const MAX_ANNOTATION_CANDIDATES: usize = 5;

/// Short natural-language blurb for one curated place. The generative API
/// has no notion of place identity, so association back to a `Place` is by
/// name match or list position only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Annotation {
    pub name: String,
    pub description: String,
    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AnnotationCandidate {
    pub name: String,
    #[serde(rename = "type")]
    pub category: Option<String>,
    pub rating: Option<f64>,
}

impl AnnotationCandidate {
    pub fn from_places(places: &[Place]) -> Vec<Self> {
        places
            .iter()
            .take(MAX_ANNOTATION_CANDIDATES)
            .map(|p| Self {
                name: p.name.clone(),
                category: p.category.clone(),
                rating: p.rating,
            })
            .collect()
    }
}

#[async_trait]
pub trait Annotate: Send + Sync {
    async fn annotate(
        &self,
        center: Coordinates,
        candidates: &[AnnotationCandidate],
    ) -> AppResult<Vec<Annotation>>;
}

#[derive(Clone)]
pub struct AnnotationService {
    inner: Arc<dyn Annotate>,
}

impl AnnotationService {
    pub fn maybe_new(config: &AppConfig) -> Option<Self> {
        let key = config.gemini_api_key.clone()?;
        Some(Self {
            inner: Arc::new(GeminiClient::new(
                key,
                config.gemini_endpoint.clone(),
                config.request_timeout_secs,
            )),
        })
    }

    pub fn from_annotator(inner: Arc<dyn Annotate>) -> Self {
        Self { inner }
    }

    pub async fn annotate(
        &self,
        center: Coordinates,
        candidates: &[AnnotationCandidate],
    ) -> AppResult<Vec<Annotation>> {
        self.inner.annotate(center, candidates).await
    }
}

pub struct GeminiClient {
    http: reqwest::Client,
    api_key: SecretString,
    endpoint: String,
}

impl GeminiClient {
    pub fn new(api_key: SecretString, endpoint: String, timeout_secs: u64) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .expect("gemini http client");
        Self {
            http,
            api_key,
            endpoint,
        }
    }
}

#[async_trait]
impl Annotate for GeminiClient {
    async fn annotate(
        &self,
        center: Coordinates,
        candidates: &[AnnotationCandidate],
    ) -> AppResult<Vec<Annotation>> {
        let mut url = Url::parse(&self.endpoint)
            .map_err(|err| AppError::Config(format!("invalid gemini endpoint: {err}")))?;
        url.query_pairs_mut()
            .append_pair("key", self.api_key.expose_secret());

        let prompt = format!(
            "Suggest indoor rainy-day activities near ({:.4}, {:.4}) from:\n{}\nReturn JSON array: {{ name, description, category }}",
            center.lat,
            center.lng,
            serde_json::to_string(candidates)?
        );
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };

        let response = self.http.post(url).json(&body).send().await?.error_for_status()?;
        let parsed: GenerateResponse = response.json().await?;
        let text = parsed
            .candidates
            .and_then(|mut c| if c.is_empty() { None } else { Some(c.remove(0)) })
            .and_then(|c| c.content)
            .and_then(|mut c| if c.parts.is_empty() { None } else { Some(c.parts.remove(0)) })
            .map(|p| p.text)
            .ok_or_else(|| AppError::Provider("gemini response carried no text".into()))?;

        extract_annotations(&text)
            .ok_or_else(|| AppError::Provider("gemini text carried no JSON array".into()))
    }
}

/// The model wraps its JSON in prose and code fences; take the outermost
/// bracketed span and try to parse that.
fn extract_annotations(text: &str) -> Option<Vec<Annotation>> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<ResponseCandidate>>,
}

#[derive(Deserialize)]
struct ResponseCandidate {
    content: Option<Content>,
}
