use crate::config::ProviderConfig;
use reqwest::Client;
use std::time::Duration;

/// Builds the HTTP client shared by the geocoder and the place search
///
/// The user agent comes straight from the configuration; public OSM
/// services reject requests that do not identify the caller.
pub fn build_http_client(config: &ProviderConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}
