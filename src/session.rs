use crate::geo::Coordinates;
use crate::pipeline::CurationRequest;

/// Fallback center when geolocation is unavailable or denied.
pub const DEFAULT_LOCATION: Coordinates = Coordinates {
    lat: 49.2827,
    lng: -123.1207,
};

/// Owns the user location for one browsing session. Set once from
/// geolocation or a manual search, changed only by an explicit
/// `set_location`, and never inferred from search results. Views pass the
/// session's location into the (stateless) pipeline per call.
#[derive(Debug, Clone)]
pub struct PlanSession {
    location: Coordinates,
    located: bool,
}

impl PlanSession {
    pub fn new() -> Self {
        Self {
            location: DEFAULT_LOCATION,
            located: false,
        }
    }

    pub fn set_location(&mut self, location: Coordinates) {
        self.location = location;
        self.located = true;
    }

    pub fn location(&self) -> Coordinates {
        self.location
    }

    /// False while still on the default center.
    pub fn is_located(&self) -> bool {
        self.located
    }
}

impl Default for PlanSession {
    fn default() -> Self {
        Self::new()
    }
}

/// The per-call-site tunings of the three original views, expressed as
/// presets over the one shared pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewPreset {
    /// Flat nearby-activities list: wide fan-out, no enrichment.
    Activities,
    /// One planning category each: narrow query, enriched picks.
    PlanCafe,
    PlanDinner,
    PlanRelax,
    /// Single combined query for the compact daily view.
    Today,
}

impl ViewPreset {
    pub fn request(&self) -> CurationRequest {
        match self {
            ViewPreset::Activities => CurationRequest {
                queries: vec![
                    "museums near me".into(),
                    "libraries near me".into(),
                    "indoor activities near me".into(),
                    "cafes near me".into(),
                ],
                radius_meters: 5000,
                presentation_limit: 10,
                candidate_cap: 10,
                enrichment_batch: 0,
            },
            ViewPreset::PlanCafe => plan_request("specialty coffee cafe near me", 12),
            ViewPreset::PlanDinner => plan_request("hearty dinner restaurant near me", 12),
            ViewPreset::PlanRelax => plan_request(
                "cocktail bar OR vinyl shop OR candle store OR library near me",
                16,
            ),
            ViewPreset::Today => CurationRequest {
                queries: vec!["cafes restaurants bars".into()],
                radius_meters: 4500,
                presentation_limit: 3,
                candidate_cap: 10,
                enrichment_batch: 0,
            },
        }
    }
}

fn plan_request(query: &str, candidate_cap: usize) -> CurationRequest {
    CurationRequest {
        queries: vec![query.into()],
        radius_meters: 5000,
        presentation_limit: 3,
        candidate_cap,
        enrichment_batch: 4,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_starts_on_default_center() {
        let session = PlanSession::new();
        assert!(!session.is_located());
        assert_eq!(session.location().lat, DEFAULT_LOCATION.lat);
    }

    #[test]
    fn set_location_is_the_only_mutation() {
        let mut session = PlanSession::new();
        let here = Coordinates::new(48.4284, -123.3656).unwrap();
        session.set_location(here);
        assert!(session.is_located());
        assert_eq!(session.location(), here);
    }

    #[test]
    fn activities_preset_fans_out_without_enrichment() {
        let request = ViewPreset::Activities.request();
        assert_eq!(request.queries.len(), 4);
        assert_eq!(request.presentation_limit, 10);
        assert_eq!(request.enrichment_batch, 0);
    }

    #[test]
    fn plan_presets_enrich_a_small_batch() {
        for preset in [
            ViewPreset::PlanCafe,
            ViewPreset::PlanDinner,
            ViewPreset::PlanRelax,
        ] {
            let request = preset.request();
            assert_eq!(request.queries.len(), 1);
            assert_eq!(request.presentation_limit, 3);
            assert_eq!(request.enrichment_batch, 4);
        }
        assert_eq!(ViewPreset::PlanRelax.request().candidate_cap, 16);
    }

    #[test]
    fn today_preset_uses_tighter_radius() {
        let request = ViewPreset::Today.request();
        assert_eq!(request.radius_meters, 4500);
        assert_eq!(request.presentation_limit, 3);
    }
}
