//! Locator healing.
//!
//! ```text
//! stale locator
//!      │
//!      ▼
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │ lookup       │──►│ align        │──►│ encode       │──►│ match        │
//! │ history+page │   │ page columns │   │ one-hot      │   │ cosine k-NN  │
//! └──────────────┘   └──────────────┘   └──────────────┘   └──────┬───────┘
//!                                                                 ▼
//!                                                       threshold → report
//! ```
//!
//! Every stage returns a [`HealResult`]; [`Healer::heal`] folds any failure
//! into `None` after logging it, so callers only ever see a replacement
//! locator or nothing.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span, warn};

use crate::config::HealConfig;
use crate::encoder::OneHotEncoder;
use crate::matcher::{nearest, CosineKnn, Neighbor, SimilarityIndex};
use crate::repository::Repository;
use crate::result::{HealError, HealResult};

/// Whether a candidate cleared the threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Similarity at or above the threshold
    Accepted,
    /// Similarity below the threshold
    Rejected,
}

/// Explanation of one healing decision
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealReport {
    /// Locator that no longer resolves
    pub old_locator: String,
    /// Locator of the closest element on the current page
    pub candidate_locator: String,
    /// Cosine similarity in `[0, 1]`
    pub similarity: f64,
    /// Threshold the similarity was held to
    pub threshold: Option<f64>,
    /// Outcome
    pub verdict: Verdict,
}

impl HealReport {
    /// Similarity as a percentage rounded to two decimals
    #[must_use]
    pub fn similarity_percent(&self) -> f64 {
        (self.similarity * 10_000.0).round() / 100.0
    }

    /// True when the candidate was accepted
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        self.verdict == Verdict::Accepted
    }
}

impl fmt::Display for HealReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Element with locator \"{}\" not found", self.old_locator)?;
        writeln!(f, "Similar element found with locator: {}", self.candidate_locator)?;
        writeln!(f, "Element similarity: {:.2}%", self.similarity_percent())?;
        match self.verdict {
            Verdict::Accepted => write!(f, "Element valid. Returning new locator"),
            Verdict::Rejected => write!(f, "Similarity below tolerance. Element not valid"),
        }
    }
}

/// Result of one healing attempt
#[derive(Debug)]
pub enum HealOutcome {
    /// A replacement was found and accepted
    Healed(HealReport),
    /// The closest element fell below the threshold
    Rejected(HealReport),
    /// No comparison was possible
    Failed(HealError),
}

impl HealOutcome {
    /// The replacement locator, if one was accepted
    #[must_use]
    pub fn replacement(self) -> Option<String> {
        match self {
            Self::Healed(report) => Some(report.candidate_locator),
            Self::Rejected(_) | Self::Failed(_) => None,
        }
    }

    /// The decision report, if a candidate was scored
    #[must_use]
    pub const fn report(&self) -> Option<&HealReport> {
        match self {
            Self::Healed(report) | Self::Rejected(report) => Some(report),
            Self::Failed(_) => None,
        }
    }

    /// The failure, if no candidate was scored
    #[must_use]
    pub const fn error(&self) -> Option<&HealError> {
        match self {
            Self::Failed(err) => Some(err),
            _ => None,
        }
    }

    /// True for [`HealOutcome::Healed`]
    #[must_use]
    pub const fn is_healed(&self) -> bool {
        matches!(self, Self::Healed(_))
    }
}

#[derive(Debug)]
struct Candidate {
    locator: String,
    neighbor: Neighbor,
}

/// Finds replacements for stale locators
#[derive(Debug)]
pub struct Healer<R, S = CosineKnn> {
    repository: R,
    backend: S,
    encoder: OneHotEncoder,
    config: HealConfig,
}

impl<R: Repository> Healer<R, CosineKnn> {
    /// Healer over `repository` using the cosine backend
    pub fn new(repository: R, config: HealConfig) -> HealResult<Self> {
        let backend = CosineKnn::new(config.algorithm)?;
        Self::with_backend(repository, config, backend)
    }
}

impl<R: Repository, S: SimilarityIndex> Healer<R, S> {
    /// Healer with a custom similarity backend
    pub fn with_backend(repository: R, config: HealConfig, backend: S) -> HealResult<Self> {
        config.validate()?;
        let encoder = OneHotEncoder::new().with_token_columns(config.token_columns.iter().cloned());
        Ok(Self {
            repository,
            backend,
            encoder,
            config,
        })
    }

    /// Active configuration
    #[must_use]
    pub const fn config(&self) -> &HealConfig {
        &self.config
    }

    /// Backing repository
    #[must_use]
    pub const fn repository(&self) -> &R {
        &self.repository
    }

    /// Backing repository, mutably (for scraping between heals)
    pub fn repository_mut(&mut self) -> &mut R {
        &mut self.repository
    }

    /// Give back the repository
    #[must_use]
    pub fn into_repository(self) -> R {
        self.repository
    }

    /// Replacement for `stale_locator`, or `None`. Never fails.
    #[must_use]
    pub fn heal(&self, stale_locator: &str) -> Option<String> {
        self.attempt(stale_locator).replacement()
    }

    /// Run the full pipeline and report what happened
    pub fn attempt(&self, stale_locator: &str) -> HealOutcome {
        let span = info_span!("heal", locator = stale_locator);
        let _guard = span.enter();

        let candidate = match self.find_candidate(stale_locator) {
            Ok(candidate) => candidate,
            Err(err) => {
                if err.is_missing_data() {
                    warn!(
                        error = %err,
                        "Element has never been found before or current page is empty"
                    );
                } else {
                    warn!(error = %err, "Healing failed");
                }
                return HealOutcome::Failed(err);
            }
        };

        let similarity = candidate.neighbor.similarity();
        let verdict = if self.config.accepts(similarity) {
            Verdict::Accepted
        } else {
            Verdict::Rejected
        };
        let report = HealReport {
            old_locator: stale_locator.to_string(),
            candidate_locator: candidate.locator,
            similarity,
            threshold: self.config.similarity_threshold,
            verdict,
        };

        match verdict {
            Verdict::Accepted => {
                info!(
                    candidate = %report.candidate_locator,
                    similarity_pct = report.similarity_percent(),
                    "Similar element accepted, returning new locator"
                );
                HealOutcome::Healed(report)
            }
            Verdict::Rejected => {
                warn!(
                    candidate = %report.candidate_locator,
                    similarity_pct = report.similarity_percent(),
                    threshold = ?report.threshold,
                    "Similarity below threshold, candidate rejected"
                );
                HealOutcome::Rejected(report)
            }
        }
    }

    fn find_candidate(&self, stale_locator: &str) -> HealResult<Candidate> {
        let historical = self.repository.read_historical(stale_locator)?;
        let page = self.repository.read_current_page()?;
        if historical.is_empty() {
            return Err(HealError::NeverObserved {
                locator: stale_locator.to_string(),
            });
        }
        if page.is_empty() {
            return Err(HealError::EmptyPage);
        }

        if historical.len() > 1 {
            debug!(rows = historical.len(), "Matching against the oldest historical row");
        }
        let element = page.attributes.project(&historical[0]);
        let encoded = self.encoder.encode(&page.attributes, std::slice::from_ref(&element))?;
        debug!(
            page_rows = page.len(),
            features = encoded.space.width(),
            "Encoded elements"
        );

        let query = encoded
            .elements
            .first()
            .ok_or_else(|| HealError::encoding("historical row was not encoded"))?;
        let k = self.config.n_neighbors.min(page.len());
        let neighbor = nearest(&self.backend, &encoded.page, query, k)?;
        let locator = page
            .locators
            .get(neighbor.index)
            .cloned()
            .ok_or_else(|| {
                HealError::matching(format!("neighbor row {} is not on the page", neighbor.index))
            })?;
        Ok(Candidate { locator, neighbor })
    }
}
