//! Selfheal: locator recovery for browser tests
//!
//! When a locator that used to find an element stops resolving, selfheal
//! looks up what that element looked like the last time it was found, compares
//! it with every element on the current page, and proposes the locator of the
//! closest match if it is similar enough.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    SELFHEAL Architecture                         │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ Browser    │    │ Scraper    │    │ Repository │            │
//! │   │ Driver     │───►│ + XPath    │───►│ history +  │            │
//! │   │            │    │ synthesis  │    │ page       │            │
//! │   └────────────┘    └────────────┘    └─────┬──────┘            │
//! │                                             ▼                   │
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ Healer     │◄───│ Cosine     │◄───│ One-hot    │            │
//! │   │ threshold  │    │ k-NN       │    │ encoder    │            │
//! │   └────────────┘    └────────────┘    └────────────┘            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use selfheal::{ElementRecord, HealConfig, Healer, MemoryRepository, Repository};
//!
//! let mut repo = MemoryRepository::new();
//! repo.write_element(
//!     &ElementRecord::new("//*[@id='login-button']", "button")
//!         .with_text("Log In")
//!         .with_attribute("class", "btn-primary"),
//! )?;
//! repo.write_page(&[
//!     ElementRecord::new("//*[@id='logo']", "img").with_attribute("src", "/logo.png"),
//!     ElementRecord::new("//*[@id='submit-btn']", "button")
//!         .with_text("Log In")
//!         .with_attribute("class", "btn-primary btn-lg"),
//! ])?;
//!
//! let healer = Healer::new(repo, HealConfig::default())?;
//! assert_eq!(
//!     healer.heal("//*[@id='login-button']").as_deref(),
//!     Some("//*[@id='submit-btn']")
//! );
//! # Ok::<(), selfheal::HealError>(())
//! ```

#![warn(missing_docs)]
// Lints are configured in workspace Cargo.toml [workspace.lints.clippy]

/// Configuration for scraping and healing
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
pub mod config;

/// Arena-backed document tree
#[allow(clippy::must_use_candidate, clippy::missing_const_for_fn)]
pub mod dom;

/// One-hot feature encoding
#[allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::missing_const_for_fn,
    clippy::cast_precision_loss,
    clippy::doc_markdown
)]
pub mod encoder;

/// Healing orchestration
#[allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::missing_const_for_fn,
    clippy::doc_markdown
)]
pub mod healing;

/// HTML parsing (html5ever)
#[cfg(feature = "html")]
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
pub mod html;

/// Nearest-neighbor search
#[allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::missing_const_for_fn,
    clippy::float_cmp
)]
pub mod matcher;

/// Element records and tables
#[allow(clippy::must_use_candidate, clippy::missing_const_for_fn)]
pub mod record;

/// Element storage
#[allow(clippy::missing_errors_doc, clippy::must_use_candidate)]
pub mod repository;

mod result;

/// Page scraping and driver collaborators
#[allow(
    clippy::missing_errors_doc,
    clippy::must_use_candidate,
    clippy::missing_const_for_fn,
    clippy::doc_markdown
)]
pub mod scraper;

/// Structural XPath synthesis
#[allow(clippy::must_use_candidate, clippy::doc_markdown)]
pub mod xpath;

pub use config::{HealConfig, DEFAULT_N_NEIGHBORS, DEFAULT_SCRAPE_TAGS, DEFAULT_SIMILARITY_THRESHOLD};
pub use dom::{DomTree, ElementNode, NodeId, NodeKind, DOCUMENT_TAG};
pub use encoder::{EncodedPage, FeatureMatrix, FeatureSpace, OneHotEncoder, DEFAULT_TOKEN_COLUMNS};
pub use healing::{HealOutcome, HealReport, Healer, Verdict};
#[cfg(feature = "html")]
pub use html::HtmlParser;
pub use matcher::{
    cosine_distance, nearest, CosineIndex, CosineKnn, Neighbor, NeighborAlgorithm,
    SimilarityIndex,
};
pub use record::{AttributeTable, ElementRecord, PageSnapshot, RecordTable};
pub use repository::{JsonRepository, MemoryRepository, Repository};
pub use result::{HealError, HealResult};
pub use scraper::{
    normalize_text, BoundingRect, BrowserDriver, DocumentDriver, FoundElement, PageParser,
    Scraper,
};
pub use xpath::{resolve, synthesize, synthesize_all, Anchor, SynthesizedLocator};

/// Prelude for convenient imports
pub mod prelude {
    pub use super::config::*;
    pub use super::healing::*;
    #[cfg(feature = "html")]
    pub use super::html::*;
    pub use super::matcher::{CosineKnn, NeighborAlgorithm, SimilarityIndex};
    pub use super::record::*;
    pub use super::repository::*;
    pub use super::result::*;
    pub use super::scraper::*;
    pub use super::xpath::{synthesize, synthesize_all, SynthesizedLocator};
}
