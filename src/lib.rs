mod annotate;
mod config;
mod demo;
mod errors;
mod geo;
mod pipeline;
mod place;
mod search;
mod session;
mod telemetry;
mod weather;

use once_cell::sync::OnceCell;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use annotate::{Annotate, Annotation, AnnotationCandidate, AnnotationService, GeminiClient};
pub use config::{AppConfig, PublicAppConfig};
pub use demo::demo_places;
pub use errors::{AppError, AppResult};
pub use geo::{format_distance, Coordinates};
pub use pipeline::{Curation, CurationPipeline, CurationRequest, CurationSource, RankedPlace};
pub use place::{Place, Review};
pub use search::{HttpPlacesClient, PlaceSearch, PlacesService};
pub use session::{PlanSession, ViewPreset, DEFAULT_LOCATION};
pub use telemetry::TelemetryClient;
pub use weather::{
    OpenWeatherClient, WeatherDegradation, WeatherFetch, WeatherReport, WeatherService,
    WeatherSource, WeatherSummary,
};

pub fn init_tracing() {
    static INIT: OnceCell<()> = OnceCell::new();
    let _ = INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,raincheck=debug"));
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    });
}
