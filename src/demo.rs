use crate::geo::Coordinates;
use crate::place::{Place, Review};

/// Hand-authored fallback dataset. Entries are seeded from the caller's
/// center by fixed coordinate deltas so demo markers still land near the
/// user. Ids carry the `demo` prefix, which keeps them out of the
/// enrichment stage.
pub fn demo_places(center: Coordinates) -> Vec<Place> {
    vec![
        demo(
            "demo1",
            "Local Museum",
            center,
            0.01,
            0.01,
            Some(4.5),
            None,
            "museum",
            None,
            None,
        ),
        demo(
            "demo2",
            "Public Library",
            center,
            0.015,
            -0.01,
            Some(4.7),
            Some(89),
            "library",
            Some("Near you"),
            Some(review("Chris B.", 5.0, "Quiet, cozy, and a perfect rainy-day reset.")),
        ),
        demo(
            "demo_cafe_1",
            "Coffee Shop",
            center,
            0.010,
            0.012,
            Some(4.6),
            Some(230),
            "cafe",
            Some("Downtown"),
            Some(review(
                "Lisa K.",
                5.0,
                "Perfect spot to wait out the rain. Great espresso and cozy seating.",
            )),
        ),
        demo(
            "demo_cafe_2",
            "Bookstore Café Corner",
            center,
            0.006,
            -0.008,
            Some(4.7),
            Some(98),
            "cafe",
            Some("Gastown"),
            Some(review(
                "Noah P.",
                5.0,
                "Quiet vibe, good pastries, and a calm corner to plan the day.",
            )),
        ),
        demo(
            "demo_dinner_1",
            "Comfort Bowl House",
            center,
            0.014,
            0.002,
            Some(4.6),
            Some(410),
            "restaurant",
            Some("Main St"),
            Some(review(
                "John D.",
                5.0,
                "Huge portions. Exactly the heavy meal you want on a cold day.",
            )),
        ),
        demo(
            "demo_dinner_2",
            "Noodle + Broth Spot",
            center,
            0.008,
            0.015,
            Some(4.5),
            Some(330),
            "restaurant",
            Some("Chinatown"),
            Some(review(
                "Mike R.",
                5.0,
                "Warm, filling, and perfect when the weather is gross.",
            )),
        ),
        demo(
            "demo_relax_1",
            "Vinyl Listening Bar",
            center,
            0.012,
            -0.004,
            Some(4.6),
            Some(120),
            "bar",
            Some("Downtown"),
            Some(review(
                "Tom W.",
                5.0,
                "Great cocktails and music selection. Super relaxing.",
            )),
        ),
        demo(
            "demo_relax_2",
            "Candle & Scent Lab",
            center,
            -0.006,
            0.010,
            Some(4.8),
            Some(75),
            "store",
            Some("Mount Pleasant"),
            Some(review("Ava S.", 5.0, "Niche scents and calm vibes.")),
        ),
    ]
}

fn demo(
    id: &str,
    name: &str,
    center: Coordinates,
    d_lat: f64,
    d_lng: f64,
    rating: Option<f64>,
    rating_count: Option<u64>,
    category: &str,
    address: Option<&str>,
    top_review: Option<Review>,
) -> Place {
    Place {
        id: id.into(),
        name: name.into(),
        coordinates: Coordinates::new(center.lat + d_lat, center.lng + d_lng),
        rating,
        rating_count,
        category: Some(category.into()),
        address: address.map(Into::into),
        reviews: top_review.into_iter().collect(),
    }
}

fn review(author: &str, rating: f64, text: &str) -> Review {
    Review {
        author: author.into(),
        rating: Some(rating),
        text: text.into(),
        relative_time: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_demo_place_sits_at_fixed_offset() {
        let center = Coordinates::new(49.2827, -123.1207).unwrap();
        let places = demo_places(center);
        let first = places[0].coordinates.unwrap();
        assert!((first.lat - (center.lat + 0.01)).abs() < 1e-9);
        assert!((first.lng - (center.lng + 0.01)).abs() < 1e-9);
    }

    #[test]
    fn every_demo_place_is_marked_demo_and_placeable() {
        let center = Coordinates::new(0.0, 0.0).unwrap();
        for place in demo_places(center) {
            assert!(place.is_demo(), "{} not marked demo", place.id);
            assert!(place.coordinates.is_some());
            assert!(!place.name.is_empty());
        }
    }
}
