use futures_util::future::join_all;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::annotate::{Annotation, AnnotationCandidate, AnnotationService};
use crate::config::AppConfig;
use crate::demo::demo_places;
use crate::errors::AppError;
use crate::geo::{format_distance, Coordinates};
use crate::place::Place;
use crate::search::PlacesService;
use crate::telemetry::TelemetryClient;

/// Per-call-site tuning. The three views differ only in these knobs.
#[derive(Debug, Clone)]
pub struct CurationRequest {
    pub queries: Vec<String>,
    pub radius_meters: u32,
    /// Final list length shown to the user.
    pub presentation_limit: usize,
    /// Cap on the deduplicated candidate pool, bounding enrichment cost.
    pub candidate_cap: usize,
    /// How many shuffled candidates get a detail fetch; 0 disables
    /// enrichment and ranks the whole candidate pool.
    pub enrichment_batch: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RankedPlace {
    pub place: Place,
    pub distance_km: f64,
    pub annotation: Option<Annotation>,
}

impl RankedPlace {
    pub fn distance_display(&self) -> String {
        format_distance(self.distance_km)
    }
}

/// Whether the result came from the live provider or the fallback dataset.
/// The original UI overwrote one status line for both; keeping the tag
/// explicit lets callers label degraded results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CurationSource {
    Live,
    Demo,
}

#[derive(Debug, Clone, Serialize)]
pub struct Curation {
    pub places: Vec<RankedPlace>,
    pub source: CurationSource,
}

/// Fan-out / merge / enrich / rank pipeline shared by all views. Holds no
/// state between invocations beyond the injected RNG; the caller owns the
/// user location and passes it in per call.
pub struct CurationPipeline {
    search: Option<PlacesService>,
    annotator: Option<AnnotationService>,
    telemetry: Option<TelemetryClient>,
    rng: Mutex<StdRng>,
}

impl CurationPipeline {
    pub fn new(config: &AppConfig, telemetry: Option<TelemetryClient>) -> Self {
        Self {
            search: PlacesService::maybe_new(config),
            annotator: AnnotationService::maybe_new(config),
            telemetry,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn with_parts(
        search: Option<PlacesService>,
        annotator: Option<AnnotationService>,
        telemetry: Option<TelemetryClient>,
        rng: StdRng,
    ) -> Self {
        Self {
            search,
            annotator,
            telemetry,
            rng: Mutex::new(rng),
        }
    }

    /// Runs one curation. Never fails: provider problems, empty results,
    /// and malformed annotations all narrow the output instead of
    /// surfacing, so the caller always gets a displayable ranked list.
    pub async fn curate(&self, center: Coordinates, request: &CurationRequest) -> Curation {
        let limit = request.presentation_limit.max(1);

        let (candidates, source) = match &self.search {
            Some(service) => {
                let merged = self.fan_out_and_merge(service, center, request).await;
                if merged.is_empty() {
                    self.note_degraded("empty_result");
                    (demo_places(center), CurationSource::Demo)
                } else {
                    (merged, CurationSource::Live)
                }
            }
            None => {
                self.note_degraded("provider_unavailable");
                (demo_places(center), CurationSource::Demo)
            }
        };

        let selection = self.select(candidates, request, limit, source).await;
        let mut ranked = rank(selection, center, limit);
        self.attach_annotations(center, &mut ranked).await;

        if let Some(telemetry) = &self.telemetry {
            let _ = telemetry.record(
                "curation_done",
                json!({ "source": source, "count": ranked.len() }),
            );
        }

        Curation {
            places: ranked,
            source,
        }
    }

    /// One search per query, joined without short-circuiting; a failed
    /// query contributes nothing. Results are flattened in query input
    /// order, so completion order never changes the merge.
    async fn fan_out_and_merge(
        &self,
        service: &PlacesService,
        center: Coordinates,
        request: &CurationRequest,
    ) -> Vec<Place> {
        let searches = request.queries.iter().map(|query| async move {
            match service.text_search(query, center, request.radius_meters).await {
                Ok(places) => places,
                Err(err) => {
                    warn!(?err, %query, "search query failed; skipping");
                    Vec::new()
                }
            }
        });
        let result_sets = join_all(searches).await;

        let mut seen = std::collections::HashSet::new();
        let mut unique = Vec::new();
        for place in result_sets.into_iter().flatten() {
            if place.name.is_empty() || place.coordinates.is_none() {
                debug!(id = %place.id, "dropping unplaceable result");
                continue;
            }
            if seen.insert(place.identity_key()) {
                unique.push(place);
            }
            if unique.len() >= request.candidate_cap.max(1) {
                break;
            }
        }
        unique
    }

    /// Picks the slice of candidates that reaches ranking. With enrichment
    /// enabled the pool is shuffled first so repeated refreshes vary, and
    /// the picked slice gets best-effort detail fetches. Demo data skips
    /// enrichment entirely: there is no provider to ask.
    async fn select(
        &self,
        mut candidates: Vec<Place>,
        request: &CurationRequest,
        limit: usize,
        source: CurationSource,
    ) -> Vec<Place> {
        if request.enrichment_batch == 0 || source == CurationSource::Demo {
            return candidates;
        }

        {
            let mut rng = self.rng.lock();
            candidates.shuffle(&mut *rng);
        }
        candidates.truncate(request.enrichment_batch.max(limit));

        let Some(service) = &self.search else {
            return candidates;
        };
        let enrichments = candidates.into_iter().map(|mut place| async move {
            if !place.has_provider_id() {
                return place;
            }
            match service.place_details(&place.id).await {
                Ok(Some(details)) => place.merge_details(details),
                Ok(None) => {}
                Err(err) => warn!(?err, id = %place.id, "detail fetch failed; keeping search record"),
            }
            place
        });
        join_all(enrichments).await
    }

    async fn attach_annotations(&self, center: Coordinates, ranked: &mut [RankedPlace]) {
        let Some(annotator) = &self.annotator else {
            return;
        };
        if ranked.is_empty() {
            return;
        }

        let places: Vec<Place> = ranked.iter().map(|r| r.place.clone()).collect();
        let candidates = AnnotationCandidate::from_places(&places);
        let annotations = match annotator.annotate(center, &candidates).await {
            Ok(annotations) => annotations,
            Err(err) => {
                self.note_annotation_failure(&err);
                return;
            }
        };

        // The generative API knows nothing about place identity: match by
        // name when possible, fall back to list position.
        for (idx, annotation) in annotations.into_iter().enumerate() {
            let slot = ranked
                .iter()
                .position(|r| r.place.name == annotation.name)
                .or_else(|| (idx < ranked.len()).then_some(idx));
            if let Some(slot) = slot {
                ranked[slot].annotation = Some(annotation);
            }
        }
    }

    fn note_degraded(&self, reason: &str) {
        warn!(reason, "curation degraded to demo dataset");
        if let Some(telemetry) = &self.telemetry {
            let _ = telemetry.record("curation_degraded", json!({ "reason": reason }));
        }
    }

    fn note_annotation_failure(&self, err: &AppError) {
        warn!(?err, "annotation skipped; returning unannotated list");
        if let Some(telemetry) = &self.telemetry {
            let _ = telemetry.record(
                "annotation_failed",
                json!({ "error": err.to_string() }),
            );
        }
    }
}

/// Stable ascending distance sort, then truncation to the display limit.
/// Ties keep merge order.
fn rank(places: Vec<Place>, center: Coordinates, limit: usize) -> Vec<RankedPlace> {
    let mut ranked: Vec<RankedPlace> = places
        .into_iter()
        .filter_map(|place| {
            let coordinates = place.coordinates?;
            Some(RankedPlace {
                distance_km: center.distance_km(&coordinates),
                place,
                annotation: None,
            })
        })
        .collect();
    ranked.sort_by(|a, b| {
        a.distance_km
            .partial_cmp(&b.distance_km)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked.truncate(limit);
    ranked
}
