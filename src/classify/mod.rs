//! Segment and industry-code classification
//!
//! Classification is a pure lookup over an establishment's name and tags.
//! The precedence is:
//! 1. Wholesale signals (a `shop=wholesale` tag, or "wholesale",
//!    "distributor" or "merchant wholesaler" anywhere in the name or tags)
//!    route to wholesale with a keyword-derived NAICS code
//! 2. A recognized retail tag routes to retail with the table code
//! 3. Otherwise the segment of the search pass is kept with an empty code

mod tables;

pub use tables::{
    retail_naics, wholesale_naics, DEFAULT_WHOLESALE_NAICS, RETAIL_TAGS, WHOLESALE_KEYWORD_NAICS,
    WHOLESALE_SIGNALS, WHOLESALE_TAGS,
};

use crate::provider::{Candidate, TagFilter};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Market segment of an establishment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Segment {
    Retail,
    Wholesale,
}

impl Segment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Segment::Retail => "retail",
            Segment::Wholesale => "wholesale",
        }
    }

    /// Tags searched for this segment
    pub fn search_tags(&self) -> &'static [TagFilter] {
        match self {
            Segment::Retail => RETAIL_TAGS,
            Segment::Wholesale => WHOLESALE_TAGS,
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of classifying one establishment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub segment: Segment,

    /// NAICS code, empty when no table entry applies
    pub industry_code: String,
}

impl Classification {
    pub fn new(segment: Segment, industry_code: impl Into<String>) -> Self {
        Self {
            segment,
            industry_code: industry_code.into(),
        }
    }
}

/// Assigns a segment and industry code to a candidate
pub trait Classifier: Send + Sync {
    /// `hint` is the segment of the search pass that found the candidate;
    /// it is only used when nothing in the candidate itself decides.
    fn classify(&self, candidate: &Candidate, hint: Segment) -> Classification;
}

/// Classifier driven by OSM tags and the static NAICS tables
#[derive(Debug, Clone, Copy, Default)]
pub struct OsmTagClassifier;

impl OsmTagClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Finds the configured tag the candidate carries, wholesale tags first
    fn matched_tag(candidate: &Candidate) -> Option<TagFilter> {
        WHOLESALE_TAGS
            .iter()
            .chain(RETAIL_TAGS.iter())
            .find(|(key, value)| candidate.tags.get(*key).map(String::as_str) == Some(*value))
            .copied()
    }

    /// Lowercased name and `key=value` tags, searched for keywords
    fn keyword_blob(candidate: &Candidate) -> String {
        let mut blob = candidate.name.to_lowercase();
        for tag in candidate.tag_strings() {
            blob.push(' ');
            blob.push_str(&tag.to_lowercase());
        }
        blob
    }
}

impl Classifier for OsmTagClassifier {
    fn classify(&self, candidate: &Candidate, hint: Segment) -> Classification {
        let matched = Self::matched_tag(candidate);
        let blob = Self::keyword_blob(candidate);

        let wholesale_tag = matched == Some(("shop", "wholesale"));
        if wholesale_tag || WHOLESALE_SIGNALS.iter().any(|s| blob.contains(s)) {
            let code = wholesale_naics(&blob).unwrap_or(DEFAULT_WHOLESALE_NAICS);
            return Classification::new(Segment::Wholesale, code);
        }

        match matched {
            Some(("shop", value)) => {
                Classification::new(Segment::Retail, retail_naics(value).unwrap_or_default())
            }
            Some(_) => Classification::new(Segment::Retail, ""),
            None => Classification::new(hint, ""),
        }
    }
}
