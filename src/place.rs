use base64::engine::general_purpose::STANDARD_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::geo::Coordinates;

pub const DEMO_ID_PREFIX: &str = "demo";
const LOCAL_ID_PREFIX: &str = "local_";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub author: String,
    pub rating: Option<f64>,
    pub text: String,
    pub relative_time: Option<String>,
}

/// A discovered point of interest. Search results and detail records share
/// this shape; `merge_details` folds a detail record into a search record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Place {
    pub id: String,
    pub name: String,
    pub coordinates: Option<Coordinates>,
    pub rating: Option<f64>,
    pub rating_count: Option<u64>,
    pub category: Option<String>,
    pub address: Option<String>,
    #[serde(default)]
    pub reviews: Vec<Review>,
}

impl Place {
    /// Dedup key: provider id when present, else `name|address`.
    pub fn identity_key(&self) -> String {
        if !self.id.is_empty() {
            return self.id.clone();
        }
        format!("{}|{}", self.name, self.address.as_deref().unwrap_or(""))
    }

    /// Fills in a stable derived id for records the provider returned
    /// without one, so downstream consumers always have something to key
    /// markers and cards on.
    pub fn ensure_id(&mut self) {
        if self.id.is_empty() {
            let mut hasher = Sha256::new();
            hasher.update(self.name.as_bytes());
            hasher.update(b"|");
            hasher.update(self.address.as_deref().unwrap_or("").as_bytes());
            self.id = format!("{LOCAL_ID_PREFIX}{}", STANDARD_NO_PAD.encode(hasher.finalize()));
        }
    }

    /// Demo records never came from a provider, so there is nothing to look
    /// up; derived local ids are equally unknown to the details endpoint.
    pub fn has_provider_id(&self) -> bool {
        !self.id.is_empty() && !self.is_demo() && !self.id.starts_with(LOCAL_ID_PREFIX)
    }

    pub fn is_demo(&self) -> bool {
        self.id.starts_with(DEMO_ID_PREFIX)
    }

    /// Folds a detail record into this search-stage record. Detail fields
    /// overwrite field-by-field; fields the detail response omitted keep
    /// their search-stage value. Reviews and rating counts from the detail
    /// fetch always supersede.
    pub fn merge_details(&mut self, details: Place) {
        if !details.name.is_empty() {
            self.name = details.name;
        }
        if details.coordinates.is_some() {
            self.coordinates = details.coordinates;
        }
        if details.rating.is_some() {
            self.rating = details.rating;
        }
        if details.category.is_some() {
            self.category = details.category;
        }
        if details.address.is_some() {
            self.address = details.address;
        }
        self.rating_count = details.rating_count.or(self.rating_count);
        if !details.reviews.is_empty() {
            self.reviews = details.reviews;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn search_place(id: &str, name: &str) -> Place {
        Place {
            id: id.into(),
            name: name.into(),
            coordinates: Coordinates::new(49.0, -123.0),
            rating: Some(4.2),
            rating_count: Some(10),
            category: Some("cafe".into()),
            address: Some("12 Water St".into()),
            reviews: Vec::new(),
        }
    }

    #[test]
    fn identity_key_prefers_provider_id() {
        let place = search_place("ChIJabc", "X");
        assert_eq!(place.identity_key(), "ChIJabc");
    }

    #[test]
    fn identity_key_falls_back_to_name_and_address() {
        let mut place = search_place("", "X");
        assert_eq!(place.identity_key(), "X|12 Water St");
        place.address = None;
        assert_eq!(place.identity_key(), "X|");
    }

    #[test]
    fn ensure_id_derives_stable_local_id() {
        let mut a = search_place("", "X");
        let mut b = search_place("", "X");
        a.ensure_id();
        b.ensure_id();
        assert_eq!(a.id, b.id);
        assert!(a.id.starts_with("local_"));
        assert!(!a.has_provider_id());
    }

    #[test]
    fn detail_fields_override_without_erasing() {
        let mut place = search_place("ChIJabc", "X");
        let details = Place {
            id: "ChIJabc".into(),
            name: String::new(),
            coordinates: None,
            rating: Some(4.9),
            rating_count: Some(120),
            category: None,
            address: None,
            reviews: vec![Review {
                author: "Lisa K.".into(),
                rating: Some(5.0),
                text: "Cozy".into(),
                relative_time: Some("a week ago".into()),
            }],
        };

        place.merge_details(details);
        assert_eq!(place.rating, Some(4.9));
        assert_eq!(place.name, "X");
        assert_eq!(place.address.as_deref(), Some("12 Water St"));
        assert_eq!(place.rating_count, Some(120));
        assert_eq!(place.reviews.len(), 1);
    }

    #[test]
    fn demo_ids_are_recognized() {
        let place = search_place("demo_cafe_1", "Coffee Shop");
        assert!(place.is_demo());
        assert!(!place.has_provider_id());
    }
}
