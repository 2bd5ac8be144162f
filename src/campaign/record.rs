use crate::classify::{Classification, Segment};
use crate::locations::LocationTarget;
use crate::provider::{Candidate, Coordinate};

/// Tag keys kept in the condensed type list, in output order
const TYPE_TAG_KEYS: &[&str] = &[
    "shop", "amenity", "wholesale", "industry", "product", "brand", "operator",
];

/// A classified establishment, ready to be written once to output
#[derive(Debug, Clone, PartialEq)]
pub struct EstablishmentRecord {
    /// Query of the location that produced this record
    pub location: String,
    pub provider_id: String,
    pub name: String,
    pub address: String,
    pub phone: String,
    pub website: String,
    pub coordinate: Option<Coordinate>,
    pub segment: Segment,

    /// NAICS code; empty when unknown
    pub industry_code: String,

    /// Informative tags as `key=value`, in [`TYPE_TAG_KEYS`] order
    pub raw_type_tags: Vec<String>,

    /// Segment of the search pass that found the establishment
    pub matched_pass: Segment,

    pub rating: Option<f64>,
    pub user_ratings: Option<u32>,
}

impl EstablishmentRecord {
    pub fn from_candidate(
        target: &LocationTarget,
        candidate: Candidate,
        classification: Classification,
        matched_pass: Segment,
    ) -> Self {
        let raw_type_tags = TYPE_TAG_KEYS
            .iter()
            .filter_map(|key| {
                candidate
                    .tags
                    .get(*key)
                    .map(|value| format!("{}={}", key, value))
            })
            .collect();

        Self {
            location: target.query.clone(),
            provider_id: candidate.provider_id,
            name: candidate.name,
            address: candidate.address,
            phone: candidate.phone,
            website: candidate.website,
            coordinate: candidate.coordinate,
            segment: classification.segment,
            industry_code: classification.industry_code,
            raw_type_tags,
            matched_pass,
            rating: candidate.rating,
            user_ratings: candidate.user_ratings,
        }
    }

    /// Type tags joined for a single output column
    pub fn types_summary(&self) -> String {
        self.raw_type_tags.join(", ")
    }
}
