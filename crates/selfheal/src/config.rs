//! Healing configuration.
//!
//! Loadable from YAML (`.yaml`/`.yml`) or JSON (`.json`); any key left out
//! keeps its default. An explicit `similarity_threshold: null` turns
//! rejection off.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::encoder::DEFAULT_TOKEN_COLUMNS;
use crate::matcher::NeighborAlgorithm;
use crate::result::{HealError, HealResult};

/// Neighbors fetched per query
pub const DEFAULT_N_NEIGHBORS: usize = 1;

/// Minimum similarity for a healed locator to be returned
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.9;

/// Tags recorded when scraping a page
pub const DEFAULT_SCRAPE_TAGS: [&str; 10] = [
    "a", "div", "span", "button", "input", "select", "pre", "textarea", "svg", "img",
];

/// Configuration for scraping and healing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealConfig {
    /// Neighbors fetched per query; clamped to the page size
    pub n_neighbors: usize,
    /// Neighbor search strategy
    pub algorithm: NeighborAlgorithm,
    /// Minimum accepted similarity; `None` accepts any match
    pub similarity_threshold: Option<f64>,
    /// Record each element's on-screen rectangle while scraping
    pub capture_bounding_rect: bool,
    /// Columns encoded as whitespace-separated token lists
    pub token_columns: Vec<String>,
    /// Tags recorded when scraping a page
    pub scrape_tags: Vec<String>,
}

impl Default for HealConfig {
    fn default() -> Self {
        Self {
            n_neighbors: DEFAULT_N_NEIGHBORS,
            algorithm: NeighborAlgorithm::Auto,
            similarity_threshold: Some(DEFAULT_SIMILARITY_THRESHOLD),
            capture_bounding_rect: false,
            token_columns: DEFAULT_TOKEN_COLUMNS.iter().map(|c| (*c).to_string()).collect(),
            scrape_tags: DEFAULT_SCRAPE_TAGS.iter().map(|t| (*t).to_string()).collect(),
        }
    }
}

impl HealConfig {
    /// Create a new config
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set neighbors per query
    #[must_use]
    pub const fn with_n_neighbors(mut self, n: usize) -> Self {
        self.n_neighbors = n;
        self
    }

    /// Set search strategy
    #[must_use]
    pub const fn with_algorithm(mut self, algorithm: NeighborAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Set or clear the acceptance threshold
    #[must_use]
    pub const fn with_similarity_threshold(mut self, threshold: Option<f64>) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    /// Enable geometry capture
    #[must_use]
    pub const fn with_capture_bounding_rect(mut self, capture: bool) -> Self {
        self.capture_bounding_rect = capture;
        self
    }

    /// Set token-list columns
    #[must_use]
    pub fn with_token_columns<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.token_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Set scraped tags
    #[must_use]
    pub fn with_scrape_tags<S: Into<String>>(mut self, tags: impl IntoIterator<Item = S>) -> Self {
        self.scrape_tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Whether `similarity` passes the threshold. Only a strictly lower
    /// similarity is rejected.
    #[must_use]
    pub fn accepts(&self, similarity: f64) -> bool {
        self.similarity_threshold
            .map_or(true, |threshold| similarity >= threshold)
    }

    /// Check values are usable
    pub fn validate(&self) -> HealResult<()> {
        if self.n_neighbors == 0 {
            return Err(HealError::invalid_config("n_neighbors must be at least 1"));
        }
        if !self.algorithm.supports_cosine() {
            return Err(HealError::invalid_config(format!(
                "neighbor algorithm '{}' does not support the cosine metric",
                self.algorithm
            )));
        }
        if let Some(threshold) = self.similarity_threshold {
            if !threshold.is_finite() || !(0.0..=1.0).contains(&threshold) {
                return Err(HealError::invalid_config(format!(
                    "similarity_threshold must be within [0, 1], got {threshold}"
                )));
            }
        }
        if self.scrape_tags.is_empty() {
            return Err(HealError::invalid_config("scrape_tags must not be empty"));
        }
        Ok(())
    }

    /// Load and validate a config file
    pub fn load(path: &Path) -> HealResult<Self> {
        let text = fs::read_to_string(path)?;
        let config: Self = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => serde_json::from_str(&text)?,
            _ => serde_yaml_ng::from_str(&text)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Render as YAML
    pub fn to_yaml(&self) -> HealResult<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    /// Write as YAML, creating parent directories
    pub fn save(&self, path: &Path) -> HealResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, self.to_yaml()?)?;
        Ok(())
    }
}
