//! Configuration module for Hive-Scan
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use hive_scan::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("campaign.toml")).unwrap();
//! println!("Locations file: {}", config.campaign.locations_path);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    BudgetConfig, CampaignConfig, CheckpointConfig, Config, ProviderConfig, RetryConfig,
    DEFAULT_GEOCODE_URL, DEFAULT_SEARCH_URL,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
