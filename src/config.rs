use std::{env, io};

use secrecy::SecretString;
use serde::Serialize;
use tracing::debug;

const DEFAULT_SEARCH_RADIUS_M: u32 = 5_000;
const DEFAULT_TELEMETRY_BUFFER_MAX_BYTES: u64 = 5 * 1024 * 1024;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub places_api_key: Option<SecretString>,
    pub gemini_api_key: Option<SecretString>,
    pub weather_api_key: Option<SecretString>,
    pub places_search_endpoint: String,
    pub places_details_endpoint: String,
    pub gemini_endpoint: String,
    pub weather_endpoint: String,
    pub search_radius_meters: u32,
    pub places_rate_limit_qps: u32,
    pub request_timeout_secs: u64,
    pub telemetry_enabled_by_default: bool,
    pub telemetry_batch_size: usize,
    pub telemetry_buffer_max_bytes: u64,
}

/// Config view safe to hand to a UI layer: key presence only, never the keys.
#[derive(Clone, Debug, Serialize)]
pub struct PublicAppConfig {
    pub has_places_key: bool,
    pub has_gemini_key: bool,
    pub has_weather_key: bool,
    pub search_radius_meters: u32,
    pub places_rate_limit_qps: u32,
    pub telemetry_enabled_by_default: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        load_dotenv_if_applicable();
        Self {
            places_api_key: secret_var("GOOGLE_PLACES_API_KEY"),
            gemini_api_key: secret_var("GEMINI_API_KEY"),
            weather_api_key: secret_var("OPENWEATHER_API_KEY"),
            places_search_endpoint: env::var("PLACES_SEARCH_ENDPOINT").unwrap_or_else(|_| {
                "https://maps.googleapis.com/maps/api/place/textsearch/json".to_string()
            }),
            places_details_endpoint: env::var("PLACES_DETAILS_ENDPOINT").unwrap_or_else(|_| {
                "https://maps.googleapis.com/maps/api/place/details/json".to_string()
            }),
            gemini_endpoint: env::var("GEMINI_ENDPOINT").unwrap_or_else(|_| {
                "https://generativelanguage.googleapis.com/v1beta/models/gemini-pro:generateContent"
                    .to_string()
            }),
            weather_endpoint: env::var("WEATHER_ENDPOINT").unwrap_or_else(|_| {
                "https://api.openweathermap.org/data/2.5/weather".to_string()
            }),
            search_radius_meters: parse_u32("SEARCH_RADIUS_METERS", DEFAULT_SEARCH_RADIUS_M),
            places_rate_limit_qps: parse_u32("PLACES_RATE_LIMIT_QPS", 3),
            request_timeout_secs: parse_u64("REQUEST_TIMEOUT_SECS", 10),
            telemetry_enabled_by_default: parse_bool("TELEMETRY_ENABLED", true),
            telemetry_batch_size: parse_usize("TELEMETRY_BATCH_SIZE", 25),
            telemetry_buffer_max_bytes: parse_u64(
                "TELEMETRY_BUFFER_MAX_BYTES",
                DEFAULT_TELEMETRY_BUFFER_MAX_BYTES,
            ),
        }
    }

    pub fn public_profile(&self) -> PublicAppConfig {
        PublicAppConfig {
            has_places_key: self.places_api_key.is_some(),
            has_gemini_key: self.gemini_api_key.is_some(),
            has_weather_key: self.weather_api_key.is_some(),
            search_radius_meters: self.search_radius_meters,
            places_rate_limit_qps: self.places_rate_limit_qps,
            telemetry_enabled_by_default: self.telemetry_enabled_by_default,
        }
    }
}

fn secret_var(key: &str) -> Option<SecretString> {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(SecretString::from)
}

fn load_dotenv_if_applicable() {
    if !should_load_dotenv() {
        debug!("skipping .env load outside dev mode");
        return;
    }

    if let Err(err) = dotenvy::dotenv() {
        match &err {
            dotenvy::Error::Io(io_err) if io_err.kind() == io::ErrorKind::NotFound => {}
            _ => debug!(?err, "unable to load .env file"),
        }
    }
}

fn should_load_dotenv() -> bool {
    cfg!(debug_assertions) || parse_bool("ALLOW_DOTENV", false)
}

fn parse_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|v| matches!(v.trim(), "1" | "true" | "TRUE" | "True"))
        .unwrap_or(default)
}

fn parse_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

fn parse_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default)
}

fn parse_u32(key: &str, default: u32) -> u32 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_public_profile_without_secrets() {
        env::set_var("GOOGLE_PLACES_API_KEY", "secret");
        env::set_var("GEMINI_API_KEY", "secret");
        env::set_var("OPENWEATHER_API_KEY", "   ");
        env::set_var("SEARCH_RADIUS_METERS", "4500");
        env::set_var("TELEMETRY_ENABLED", "false");

        let config = AppConfig::from_env();
        let public = config.public_profile();

        assert!(public.has_places_key);
        assert!(public.has_gemini_key);
        // blank keys count as missing
        assert!(!public.has_weather_key);
        assert_eq!(public.search_radius_meters, 4500);
        assert!(!public.telemetry_enabled_by_default);
    }
}
