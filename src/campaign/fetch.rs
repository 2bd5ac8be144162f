//! One location's worth of provider calls and classification

use crate::campaign::record::EstablishmentRecord;
use crate::campaign::retry::{Attempted, RetryClass, RetryPolicy};
use crate::classify::{Classifier, Segment};
use crate::locations::LocationTarget;
use crate::provider::{Coordinate, ProviderError, SearchProvider, TagFilter};
use std::collections::{BTreeSet, HashSet};

/// One category-scoped search issued for every location
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchPass {
    pub segment: Segment,
    pub tags: &'static [TagFilter],
}

impl SearchPass {
    pub fn for_segment(segment: Segment) -> Self {
        Self {
            segment,
            tags: segment.search_tags(),
        }
    }
}

/// Retail pass first, then wholesale
pub fn default_passes() -> Vec<SearchPass> {
    vec![
        SearchPass::for_segment(Segment::Retail),
        SearchPass::for_segment(Segment::Wholesale),
    ]
}

/// Records found around a resolved location
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedLocation {
    pub coordinate: Coordinate,
    pub records: Vec<EstablishmentRecord>,
    pub provider_ids: BTreeSet<String>,

    /// Searches that ran out of retries and were treated as empty
    pub degraded_calls: u32,
}

/// Result of fetching one location
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Resolved(FetchedLocation),

    /// The geocoder had no match; `degraded` is set when it was never reached
    Unresolvable { degraded: bool },
}

/// Maps a provider error onto the retry policy's classes
pub fn classify_provider_error(err: &ProviderError) -> RetryClass {
    match err {
        ProviderError::Throttled { .. } => RetryClass::Throttled {
            retry_after: err.retry_after(),
        },
        e if e.is_retryable() => RetryClass::Transient,
        _ => RetryClass::Fatal,
    }
}

/// Geocodes a location, searches each pass around it and classifies the results
///
/// Does not consult the dedup ledger; the caller filters the returned ids.
pub struct FetchAndClassify {
    provider: Box<dyn SearchProvider>,
    classifier: Box<dyn Classifier>,
    policy: RetryPolicy,
    passes: Vec<SearchPass>,
}

impl FetchAndClassify {
    pub fn new(
        provider: Box<dyn SearchProvider>,
        classifier: Box<dyn Classifier>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            provider,
            classifier,
            policy,
            passes: default_passes(),
        }
    }

    pub fn with_passes(mut self, passes: Vec<SearchPass>) -> Self {
        self.passes = passes;
        self
    }

    /// Runs every pass for `target`
    ///
    /// Exhausted retries degrade to "no match" or "no candidates". Only a
    /// fatal provider error is returned as `Err`.
    pub async fn run(&self, target: &LocationTarget) -> Result<FetchOutcome, ProviderError> {
        let provider = self.provider.as_ref();
        let query = target.query.as_str();

        let geocoded = self
            .policy
            .run("geocode", classify_provider_error, || provider.geocode(query))
            .await?;

        let coordinate = match geocoded {
            Attempted::Done(Some(coordinate)) => coordinate,
            Attempted::Done(None) => return Ok(FetchOutcome::Unresolvable { degraded: false }),
            Attempted::Exhausted { attempts } => {
                tracing::warn!(
                    "Geocoding '{}' failed after {} attempts; treating as unresolvable",
                    query,
                    attempts
                );
                return Ok(FetchOutcome::Unresolvable { degraded: true });
            }
        };

        tracing::debug!(
            "Resolved '{}' to ({:.5}, {:.5})",
            query,
            coordinate.latitude,
            coordinate.longitude
        );

        let radius_meters = target.radius_meters();
        let mut seen = HashSet::new();
        let mut records = Vec::new();
        let mut provider_ids = BTreeSet::new();
        let mut degraded_calls = 0;

        for pass in &self.passes {
            let tags = pass.tags;
            let searched = self
                .policy
                .run("search", classify_provider_error, || {
                    provider.search(coordinate, radius_meters, tags)
                })
                .await?;

            let candidates = match searched {
                Attempted::Done(candidates) => candidates,
                Attempted::Exhausted { .. } => {
                    degraded_calls += 1;
                    Vec::new()
                }
            };
            tracing::debug!(
                "{} pass for '{}' returned {} candidates",
                pass.segment,
                query,
                candidates.len()
            );

            for candidate in candidates {
                if candidate.provider_id.is_empty() || !seen.insert(candidate.provider_id.clone()) {
                    continue;
                }

                let classification = self.classifier.classify(&candidate, pass.segment);
                tracing::debug!(
                    "{} '{}' -> {} {}",
                    candidate.provider_id,
                    candidate.name,
                    classification.segment,
                    classification.industry_code
                );

                let record =
                    EstablishmentRecord::from_candidate(target, candidate, classification, pass.segment);
                provider_ids.insert(record.provider_id.clone());
                records.push(record);
            }
        }

        Ok(FetchOutcome::Resolved(FetchedLocation {
            coordinate,
            records,
            provider_ids,
            degraded_calls,
        }))
    }
}
