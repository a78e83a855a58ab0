//! Categorical one-hot encoding of element attributes.
//!
//! The feature space is fitted on the current page only. Every distinct
//! non-empty value of a column becomes one binary feature; for token-list
//! columns (`class` by default) every distinct whitespace-separated token does.
//! Rows from elsewhere are projected into that space and anything the page
//! never showed is ignored, so an element whose `class` gained a token still
//! lines up with the rest of its attributes.
//!
//! # Weights
//!
//! Plain columns contribute `1.0` for their single active feature. A token
//! column contributes `1/sqrt(n)` to each known token, `n` being the number of
//! distinct tokens in the cell, so every column weighs the same no matter how
//! many classes an element carries.

use std::collections::BTreeMap;

use tracing::debug;

use crate::record::AttributeTable;
use crate::result::{HealError, HealResult};

/// Columns treated as whitespace-separated token lists by default
pub const DEFAULT_TOKEN_COLUMNS: [&str; 1] = ["class"];

/// Dense row-major matrix of encoded rows
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    width: usize,
    rows: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    /// Build from rows; every row must have `width` entries
    pub fn new(width: usize, rows: Vec<Vec<f64>>) -> HealResult<Self> {
        if let Some(bad) = rows.iter().position(|r| r.len() != width) {
            return Err(HealError::encoding(format!(
                "row {bad} has {} features, expected {width}",
                rows[bad].len()
            )));
        }
        Ok(Self { width, rows })
    }

    /// Number of features per row
    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Rows
    #[must_use]
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Number of rows
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when there are no rows
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone)]
struct ColumnSpace {
    name: String,
    tokenized: bool,
    offset: usize,
    categories: BTreeMap<String, usize>,
}

impl ColumnSpace {
    fn values<'v>(&self, cell: &'v str) -> Vec<&'v str> {
        let mut values: Vec<&str> = if self.tokenized {
            cell.split_whitespace().collect()
        } else if cell.is_empty() {
            Vec::new()
        } else {
            vec![cell]
        };
        values.sort_unstable();
        values.dedup();
        values
    }
}

/// Feature space fitted on a page
#[derive(Debug, Clone)]
pub struct FeatureSpace {
    columns: Vec<ColumnSpace>,
    width: usize,
}

impl FeatureSpace {
    /// Total number of features
    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Feature names as `<column>=<value>`, in feature order
    #[must_use]
    pub fn feature_names(&self) -> Vec<String> {
        let mut names = vec![String::new(); self.width];
        for column in &self.columns {
            for (value, local) in &column.categories {
                names[column.offset + local] = format!("{}={value}", column.name);
            }
        }
        names
    }

    /// Encode one row aligned with the fitted columns. Unknown values and
    /// tokens leave their features at zero.
    pub fn transform(&self, row: &[String]) -> HealResult<Vec<f64>> {
        if row.len() != self.columns.len() {
            return Err(HealError::encoding(format!(
                "row has {} columns, feature space was fitted on {}",
                row.len(),
                self.columns.len()
            )));
        }
        let mut encoded = vec![0.0; self.width];
        for (column, cell) in self.columns.iter().zip(row) {
            let values = column.values(cell);
            if values.is_empty() {
                continue;
            }
            let weight = if column.tokenized {
                1.0 / (values.len() as f64).sqrt()
            } else {
                1.0
            };
            for value in values {
                if let Some(local) = column.categories.get(value) {
                    encoded[column.offset + local] = weight;
                }
            }
        }
        Ok(encoded)
    }

    /// Encode many rows
    pub fn transform_all(&self, rows: &[Vec<String>]) -> HealResult<FeatureMatrix> {
        let encoded = rows
            .iter()
            .map(|r| self.transform(r))
            .collect::<HealResult<Vec<_>>>()?;
        FeatureMatrix::new(self.width, encoded)
    }
}

/// A page and the historical rows, encoded into the page's space
#[derive(Debug, Clone)]
pub struct EncodedPage {
    /// Fitted space
    pub space: FeatureSpace,
    /// Encoded page rows
    pub page: FeatureMatrix,
    /// Encoded historical rows, in input order
    pub elements: Vec<Vec<f64>>,
}

/// One-hot encoder configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneHotEncoder {
    token_columns: Vec<String>,
}

impl Default for OneHotEncoder {
    fn default() -> Self {
        Self {
            token_columns: DEFAULT_TOKEN_COLUMNS.iter().map(|c| (*c).to_string()).collect(),
        }
    }
}

impl OneHotEncoder {
    /// Encoder with the default token columns
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the set of token-list columns; an empty set gives plain
    /// whole-value one-hot encoding
    #[must_use]
    pub fn with_token_columns<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.token_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Token-list columns
    #[must_use]
    pub fn token_columns(&self) -> &[String] {
        &self.token_columns
    }

    /// Learn the categories of every column of `page`
    pub fn fit(&self, page: &AttributeTable) -> HealResult<FeatureSpace> {
        if page.is_empty() {
            return Err(HealError::encoding("page has no rows"));
        }
        if page.columns().is_empty() {
            return Err(HealError::encoding("page has no matchable columns"));
        }
        let width = page.columns().len();
        if let Some(bad) = page.rows().iter().position(|r| r.len() != width) {
            return Err(HealError::encoding(format!(
                "page row {bad} has {} cells, expected {width}",
                page.rows()[bad].len()
            )));
        }

        let mut columns = Vec::with_capacity(width);
        let mut offset = 0;
        for (index, name) in page.columns().iter().enumerate() {
            let mut column = ColumnSpace {
                name: name.clone(),
                tokenized: self.token_columns.iter().any(|t| t == name),
                offset,
                categories: BTreeMap::new(),
            };
            let mut seen: Vec<String> = Vec::new();
            for row in page.rows() {
                seen.extend(column.values(&row[index]).into_iter().map(str::to_string));
            }
            seen.sort_unstable();
            seen.dedup();
            column.categories = seen.into_iter().enumerate().map(|(i, v)| (v, i)).collect();
            offset += column.categories.len();
            columns.push(column);
        }

        if offset == 0 {
            return Err(HealError::encoding("page rows have no attribute values"));
        }
        debug!(columns = width, features = offset, "Fitted feature space");
        Ok(FeatureSpace {
            columns,
            width: offset,
        })
    }

    /// Fit on `page`, then encode both the page and `elements`
    pub fn encode(&self, page: &AttributeTable, elements: &[Vec<String>]) -> HealResult<EncodedPage> {
        if elements.is_empty() {
            return Err(HealError::encoding("no element rows to encode"));
        }
        let space = self.fit(page)?;
        let encoded_page = space.transform_all(page.rows())?;
        let encoded_elements = elements
            .iter()
            .map(|e| space.transform(e))
            .collect::<HealResult<Vec<_>>>()?;
        Ok(EncodedPage {
            space,
            page: encoded_page,
            elements: encoded_elements,
        })
    }
}
