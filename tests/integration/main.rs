//! Integration tests against mock geocoding, place-search and Census servers

mod campaign_tests;
mod census_tests;
mod common;
mod provider_tests;
