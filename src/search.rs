use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::config::AppConfig;
use crate::errors::{AppError, AppResult};
use crate::geo::Coordinates;
use crate::place::{Place, Review};

#[async_trait]
pub trait PlaceSearch: Send + Sync {
    /// One textual search around `center`. `Ok` with an empty vec means the
    /// provider answered and found nothing.
    async fn text_search(
        &self,
        query: &str,
        center: Coordinates,
        radius_meters: u32,
    ) -> AppResult<Vec<Place>>;

    /// Richer per-place record, or `None` when the provider does not know
    /// the id.
    async fn place_details(&self, place_id: &str) -> AppResult<Option<Place>>;
}

#[derive(Clone)]
pub struct PlacesService {
    inner: Arc<dyn PlaceSearch>,
    rate_limiter: Arc<RateLimiter>,
}

impl PlacesService {
    /// Returns `None` when no Places key is configured; the pipeline treats
    /// that as the provider being unavailable and serves demo data.
    pub fn maybe_new(config: &AppConfig) -> Option<Self> {
        let key = config.places_api_key.clone()?;
        let client = HttpPlacesClient::new(
            key,
            config.places_search_endpoint.clone(),
            config.places_details_endpoint.clone(),
            config.request_timeout_secs,
        );
        Some(Self {
            inner: Arc::new(client),
            rate_limiter: Arc::new(RateLimiter::new(config.places_rate_limit_qps.max(1))),
        })
    }

    pub fn from_search(inner: Arc<dyn PlaceSearch>, qps: u32) -> Self {
        Self {
            inner,
            rate_limiter: Arc::new(RateLimiter::new(qps.max(1))),
        }
    }

    pub async fn text_search(
        &self,
        query: &str,
        center: Coordinates,
        radius_meters: u32,
    ) -> AppResult<Vec<Place>> {
        self.rate_limiter.wait().await;
        self.inner.text_search(query, center, radius_meters).await
    }

    pub async fn place_details(&self, place_id: &str) -> AppResult<Option<Place>> {
        self.rate_limiter.wait().await;
        self.inner.place_details(place_id).await
    }
}

struct RateLimiter {
    min_interval_ms: AtomicU64,
    last_tick: AsyncMutex<Option<Instant>>,
}

impl RateLimiter {
    fn new(qps: u32) -> Self {
        let interval_ms = (1000_f64 / qps.max(1) as f64).ceil() as u64;
        Self {
            min_interval_ms: AtomicU64::new(interval_ms.max(50)),
            last_tick: AsyncMutex::new(None),
        }
    }

    async fn wait(&self) {
        let interval = Duration::from_millis(self.min_interval_ms.load(Ordering::SeqCst));
        let mut guard = self.last_tick.lock().await;
        if let Some(prev) = *guard {
            let elapsed = prev.elapsed();
            if elapsed < interval {
                sleep(interval - elapsed).await;
            }
        }
        *guard = Some(Instant::now());
    }
}

pub struct HttpPlacesClient {
    http: reqwest::Client,
    api_key: SecretString,
    search_endpoint: String,
    details_endpoint: String,
}

impl HttpPlacesClient {
    pub fn new(
        api_key: SecretString,
        search_endpoint: String,
        details_endpoint: String,
        timeout_secs: u64,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .expect("places http client");
        Self {
            http,
            api_key,
            search_endpoint,
            details_endpoint,
        }
    }
}

#[async_trait]
impl PlaceSearch for HttpPlacesClient {
    async fn text_search(
        &self,
        query: &str,
        center: Coordinates,
        radius_meters: u32,
    ) -> AppResult<Vec<Place>> {
        let mut url = Url::parse(&self.search_endpoint)
            .map_err(|err| AppError::Config(format!("invalid search endpoint: {err}")))?;
        url.query_pairs_mut()
            .append_pair("query", query)
            .append_pair("location", &format!("{},{}", center.lat, center.lng))
            .append_pair("radius", &radius_meters.to_string())
            .append_pair("key", self.api_key.expose_secret());

        let response = self.http.get(url).send().await?.error_for_status()?;
        let parsed: SearchResponse = response.json().await?;
        match parsed.status.as_str() {
            "OK" => {}
            "ZERO_RESULTS" => return Ok(Vec::new()),
            other => return Err(AppError::Provider(format!("text search: {other}"))),
        }

        let results = parsed.results.unwrap_or_default();
        debug!(query, count = results.len(), "text search answered");
        Ok(results.into_iter().map(RawPlace::into_place).collect())
    }

    async fn place_details(&self, place_id: &str) -> AppResult<Option<Place>> {
        let mut url = Url::parse(&self.details_endpoint)
            .map_err(|err| AppError::Config(format!("invalid details endpoint: {err}")))?;
        url.query_pairs_mut()
            .append_pair("place_id", place_id)
            .append_pair(
                "fields",
                "place_id,name,rating,user_ratings_total,reviews,formatted_address,geometry,vicinity",
            )
            .append_pair("key", self.api_key.expose_secret());

        let response = self.http.get(url).send().await?.error_for_status()?;
        let parsed: DetailsResponse = response.json().await?;
        match parsed.status.as_str() {
            "OK" => Ok(parsed.result.map(RawPlace::into_place)),
            "NOT_FOUND" | "ZERO_RESULTS" => Ok(None),
            other => Err(AppError::Provider(format!("place details: {other}"))),
        }
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    status: String,
    results: Option<Vec<RawPlace>>,
}

#[derive(Deserialize)]
struct DetailsResponse {
    status: String,
    result: Option<RawPlace>,
}

#[derive(Deserialize)]
struct RawPlace {
    place_id: Option<String>,
    name: Option<String>,
    geometry: Option<RawGeometry>,
    rating: Option<f64>,
    user_ratings_total: Option<u64>,
    types: Option<Vec<String>>,
    formatted_address: Option<String>,
    vicinity: Option<String>,
    reviews: Option<Vec<RawReview>>,
}

#[derive(Deserialize)]
struct RawGeometry {
    location: Option<RawLocation>,
}

#[derive(Deserialize)]
struct RawLocation {
    lat: Option<f64>,
    lng: Option<f64>,
}

#[derive(Deserialize)]
struct RawReview {
    author_name: Option<String>,
    rating: Option<f64>,
    text: Option<String>,
    relative_time_description: Option<String>,
}

impl RawPlace {
    fn into_place(self) -> Place {
        let coordinates = self
            .geometry
            .and_then(|g| g.location)
            .and_then(|loc| Coordinates::new(loc.lat.unwrap_or(f64::NAN), loc.lng.unwrap_or(f64::NAN)));
        let mut place = Place {
            id: self.place_id.unwrap_or_default(),
            name: self.name.unwrap_or_default(),
            coordinates,
            rating: self.rating,
            rating_count: self.user_ratings_total,
            category: self.types.and_then(|mut t| {
                if t.is_empty() {
                    None
                } else {
                    Some(t.remove(0))
                }
            }),
            address: self.formatted_address.or(self.vicinity),
            reviews: self
                .reviews
                .unwrap_or_default()
                .into_iter()
                .map(|r| Review {
                    author: r.author_name.unwrap_or_default(),
                    rating: r.rating,
                    text: r.text.unwrap_or_default(),
                    relative_time: r.relative_time_description,
                })
                .collect(),
        };
        place.ensure_id();
        place
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_place_without_provider_id_gets_local_id() {
        let raw = RawPlace {
            place_id: None,
            name: Some("Nameless Corner".into()),
            geometry: Some(RawGeometry {
                location: Some(RawLocation {
                    lat: Some(49.0),
                    lng: Some(-123.0),
                }),
            }),
            rating: None,
            user_ratings_total: None,
            types: Some(vec!["cafe".into(), "food".into()]),
            formatted_address: Some("12 Water St".into()),
            vicinity: None,
            reviews: None,
        };

        let place = raw.into_place();
        assert!(place.id.starts_with("local_"));
        assert_eq!(place.category.as_deref(), Some("cafe"));
        assert!(place.coordinates.is_some());
    }

    #[test]
    fn raw_place_with_broken_geometry_has_no_coordinates() {
        let raw = RawPlace {
            place_id: Some("ChIJx".into()),
            name: Some("Ghost Pin".into()),
            geometry: Some(RawGeometry {
                location: Some(RawLocation {
                    lat: Some(49.0),
                    lng: None,
                }),
            }),
            rating: None,
            user_ratings_total: None,
            types: None,
            formatted_address: None,
            vicinity: None,
            reviews: None,
        };

        assert!(raw.into_place().coordinates.is_none());
    }
}
