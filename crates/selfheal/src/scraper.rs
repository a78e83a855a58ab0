//! Collaborators around the healer: page parsing, the browser driver, and the
//! scraper that turns what the driver sees into repository rows.
//!
//! ```text
//! ┌────────────────┐  page_source   ┌──────────────┐  DomTree   ┌───────────┐
//! │ BrowserDriver  │───────────────►│ PageParser   │───────────►│ Scraper   │
//! │ (live or       │  current_url   └──────────────┘            │           │
//! │  DocumentDriver)│──────────────────────────────────────────►│ records   │
//! └────────────────┘  element_rect                              └─────┬─────┘
//!                                                                     ▼
//!                                                               Repository
//! ```
//!
//! The engine is synchronous; a driver backed by an async browser session
//! blocks inside its own implementation.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::HealConfig;
use crate::dom::{DomTree, ElementNode};
use crate::record::{ElementRecord, RECT_COLUMN};
use crate::repository::Repository;
use crate::result::{HealError, HealResult};
use crate::xpath;

/// Turns markup into a [`DomTree`]
pub trait PageParser {
    /// Parse `document`; element attributes such as `class` come back
    /// single-space joined
    fn get_elements(&self, document: &str) -> HealResult<DomTree>;
}

/// On-screen rectangle of an element
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingRect {
    /// X position
    pub x: f64,
    /// Y position
    pub y: f64,
    /// Width
    pub width: f64,
    /// Height
    pub height: f64,
}

impl BoundingRect {
    /// Create a new rectangle
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// True when the rectangle covers no area
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}

impl fmt::Display for BoundingRect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "x={} y={} width={} height={}",
            self.x, self.y, self.width, self.height
        )
    }
}

/// Collapse runs of whitespace and trim, so text read from markup and text
/// reported by a live browser compare equal
#[must_use]
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// What a driver reports about an element it located
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FoundElement {
    /// Tag name
    pub tag: String,
    /// Normalized text content
    pub text: String,
    /// Attributes by name
    pub attributes: BTreeMap<String, String>,
}

impl FoundElement {
    /// Element with no text or attributes
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    /// Set text content
    #[must_use]
    pub fn with_text(mut self, text: impl AsRef<str>) -> Self {
        self.text = normalize_text(text.as_ref());
        self
    }

    /// Add an attribute
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Snapshot of a parsed element
    #[must_use]
    pub fn from_node(node: ElementNode<'_>) -> Self {
        Self {
            tag: node.tag().to_string(),
            text: normalize_text(&node.text()),
            attributes: node.attributes().clone(),
        }
    }

    /// Flatten into a repository row
    #[must_use]
    pub fn to_record(&self, locator: &str, url: &str) -> ElementRecord {
        let mut record = ElementRecord::new(locator, self.tag.as_str())
            .with_text(self.text.as_str())
            .with_url(url);
        for (name, value) in &self.attributes {
            record = record.with_attribute(name.as_str(), value.as_str());
        }
        record
    }
}

/// The slice of browser control the scraper needs
pub trait BrowserDriver {
    /// URL of the loaded page
    fn current_url(&self) -> HealResult<String>;

    /// Markup of the loaded page
    fn page_source(&self) -> HealResult<String>;

    /// Locate an element; [`HealError::ElementNotFound`] when nothing matches
    fn find_element(&self, locator: &str) -> HealResult<FoundElement>;

    /// On-screen rectangle of the element at `locator`
    fn element_rect(&self, locator: &str) -> HealResult<BoundingRect>;
}

/// Driver over a fixed document with no browser behind it.
///
/// Resolves locators of the shape [`xpath::synthesize`] emits. A static
/// document has no layout, so elements without a rectangle registered via
/// [`DocumentDriver::with_rect`] report an empty one.
#[derive(Debug, Clone)]
pub struct DocumentDriver {
    url: String,
    source: String,
    tree: DomTree,
    rects: BTreeMap<String, BoundingRect>,
}

impl DocumentDriver {
    /// Load `source` as the page at `url`
    pub fn new<P: PageParser>(
        parser: &P,
        url: impl Into<String>,
        source: impl Into<String>,
    ) -> HealResult<Self> {
        let source = source.into();
        let tree = parser.get_elements(&source)?;
        Ok(Self {
            url: url.into(),
            source,
            tree,
            rects: BTreeMap::new(),
        })
    }

    /// Register the rectangle reported for `locator`
    #[must_use]
    pub fn with_rect(mut self, locator: impl Into<String>, rect: BoundingRect) -> Self {
        self.rects.insert(locator.into(), rect);
        self
    }

    /// Replace the loaded page, dropping registered rectangles
    pub fn navigate<P: PageParser>(
        &mut self,
        parser: &P,
        url: impl Into<String>,
        source: impl Into<String>,
    ) -> HealResult<()> {
        *self = Self::new(parser, url, source)?;
        Ok(())
    }

    /// Parsed page
    #[must_use]
    pub const fn tree(&self) -> &DomTree {
        &self.tree
    }

    fn resolve(&self, locator: &str) -> HealResult<ElementNode<'_>> {
        xpath::resolve(&self.tree, locator).ok_or_else(|| HealError::ElementNotFound {
            locator: locator.to_string(),
        })
    }
}

impl BrowserDriver for DocumentDriver {
    fn current_url(&self) -> HealResult<String> {
        Ok(self.url.clone())
    }

    fn page_source(&self) -> HealResult<String> {
        Ok(self.source.clone())
    }

    fn find_element(&self, locator: &str) -> HealResult<FoundElement> {
        self.resolve(locator).map(FoundElement::from_node)
    }

    fn element_rect(&self, locator: &str) -> HealResult<BoundingRect> {
        self.resolve(locator)?;
        Ok(self.rects.get(locator).copied().unwrap_or_default())
    }
}

/// Records what the driver currently shows
#[derive(Debug)]
pub struct Scraper<D, P> {
    driver: D,
    parser: P,
    scrape_tags: Vec<String>,
    capture_bounding_rect: bool,
}

impl<D: BrowserDriver, P: PageParser> Scraper<D, P> {
    /// Scraper using the tag list and geometry setting of `config`
    #[must_use]
    pub fn new(driver: D, parser: P, config: &HealConfig) -> Self {
        Self {
            driver,
            parser,
            scrape_tags: config.scrape_tags.clone(),
            capture_bounding_rect: config.capture_bounding_rect,
        }
    }

    /// Underlying driver
    #[must_use]
    pub const fn driver(&self) -> &D {
        &self.driver
    }

    /// Underlying driver, mutably
    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Build one row per element of a scraped tag on the current page.
    /// Elements whose rectangle cannot be read are logged and skipped.
    pub fn page_records(&self) -> HealResult<Vec<ElementRecord>> {
        let url = self.driver.current_url()?;
        let source = self.driver.page_source()?;
        let tree = self.parser.get_elements(&source)?;

        let mut records = Vec::new();
        for (node_id, locator) in xpath::synthesize_all(&tree, &self.scrape_tags) {
            let Some(node) = tree.element(node_id) else {
                continue;
            };
            let mut record = FoundElement::from_node(node).to_record(locator.as_str(), &url);
            if self.capture_bounding_rect {
                match self.rect_cell(locator.as_str()) {
                    Ok(cell) => record = record.with_attribute(RECT_COLUMN, cell),
                    Err(err) => {
                        warn!(locator = %locator, error = %err, "Skipping element");
                        continue;
                    }
                }
            }
            records.push(record);
        }
        debug!(%url, elements = records.len(), "Scraped page");
        Ok(records)
    }

    /// Replace the repository's current-page table with the current page.
    /// Returns the number of elements recorded.
    pub fn scrape_current_page<R: Repository>(&self, repository: &mut R) -> HealResult<usize> {
        let records = self.page_records()?;
        repository.write_page(&records)?;
        info!(elements = records.len(), "Saved current page");
        Ok(records.len())
    }

    /// Append an element the caller located with `locator` to the
    /// historical table
    pub fn save_found_element<R: Repository>(
        &self,
        element: &FoundElement,
        locator: &str,
        repository: &mut R,
    ) -> HealResult<ElementRecord> {
        let url = self.driver.current_url()?;
        let mut record = element.to_record(locator, &url);
        if self.capture_bounding_rect {
            record = record.with_attribute(RECT_COLUMN, self.rect_cell(locator)?);
        }
        repository.write_element(&record)?;
        debug!(locator, tag = %record.tag, "Saved found element");
        Ok(record)
    }

    fn rect_cell(&self, locator: &str) -> HealResult<String> {
        let rect = self.driver.element_rect(locator)?;
        Ok(serde_json::to_string(&rect)?)
    }
}
