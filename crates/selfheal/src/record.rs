//! Element records and the tables they live in.
//!
//! An [`ElementRecord`] is one flattened observation of an element. Records
//! are stored in a [`RecordTable`]: a fixed `loc, tag, text, url` prefix
//! followed by attribute columns unioned across every insert, with missing
//! cells as empty strings. Before matching, tables are narrowed to an
//! [`AttributeTable`] that drops the columns in [`NON_MATCHABLE_COLUMNS`].

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Locator column
pub const LOC_COLUMN: &str = "loc";
/// Tag column
pub const TAG_COLUMN: &str = "tag";
/// Text content column
pub const TEXT_COLUMN: &str = "text";
/// Source page URL column
pub const URL_COLUMN: &str = "url";
/// HTML `id` attribute
pub const ID_COLUMN: &str = "id";
/// Bounding rectangle column, present only when geometry capture is on
pub const RECT_COLUMN: &str = "rect";

/// Columns every table starts with, in order
pub const FIXED_COLUMNS: [&str; 4] = [LOC_COLUMN, TAG_COLUMN, TEXT_COLUMN, URL_COLUMN];

/// Columns that identify a record rather than describe the element; never
/// encoded
pub const NON_MATCHABLE_COLUMNS: [&str; 3] = [LOC_COLUMN, URL_COLUMN, ID_COLUMN];

/// One observed element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementRecord {
    /// Locator used to find the element
    #[serde(rename = "loc")]
    pub locator: String,
    /// Tag name
    pub tag: String,
    /// Text content
    #[serde(default)]
    pub text: String,
    /// Page the element was seen on
    #[serde(default)]
    pub url: String,
    /// Remaining attributes by name
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl ElementRecord {
    /// Create a record with no text, URL or attributes
    #[must_use]
    pub fn new(locator: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            locator: locator.into(),
            tag: tag.into(),
            text: String::new(),
            url: String::new(),
            attributes: BTreeMap::new(),
        }
    }

    /// Set text content
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Set source URL
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Add an attribute
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Value of a column; fixed columns win over same-named attributes
    #[must_use]
    pub fn value(&self, column: &str) -> Option<&str> {
        match column {
            LOC_COLUMN => Some(&self.locator),
            TAG_COLUMN => Some(&self.tag),
            TEXT_COLUMN => Some(&self.text),
            URL_COLUMN => Some(&self.url),
            other => self.attributes.get(other).map(String::as_str),
        }
    }

    fn attribute_columns(&self) -> impl Iterator<Item = &str> {
        self.attributes
            .keys()
            .map(String::as_str)
            .filter(|name| !FIXED_COLUMNS.contains(name))
    }
}

/// Column-aligned table of records, the persisted shape of both tables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordTable {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Default for RecordTable {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordTable {
    /// Empty table with the fixed columns
    #[must_use]
    pub fn new() -> Self {
        Self {
            columns: FIXED_COLUMNS.iter().map(|c| (*c).to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Build a table holding `records` in order
    #[must_use]
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a ElementRecord>) -> Self {
        let mut table = Self::new();
        for record in records {
            table.push(record);
        }
        table
    }

    /// Column names
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Raw rows, aligned with [`Self::columns`]
    #[must_use]
    pub fn rows(&self) -> &[Vec<String>] {
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

    /// Position of a column
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Append a row, widening the column set with any new attributes.
    /// Existing rows get empty cells for the new columns.
    pub fn push(&mut self, record: &ElementRecord) {
        for name in record.attribute_columns() {
            if self.column_index(name).is_none() {
                self.columns.push(name.to_string());
                for row in &mut self.rows {
                    row.push(String::new());
                }
            }
        }
        let row = self
            .columns
            .iter()
            .map(|c| record.value(c).unwrap_or_default().to_string())
            .collect();
        self.rows.push(row);
    }

    /// Drop exact duplicate rows, keeping the first occurrence
    pub fn dedup(&mut self) {
        let mut seen: HashSet<Vec<String>> = HashSet::with_capacity(self.rows.len());
        self.rows.retain(|row| seen.insert(row.clone()));
    }

    /// Check every row has one cell per column
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.rows.iter().all(|r| r.len() == self.columns.len())
    }

    /// Rows converted back into records. Empty attribute cells are treated
    /// as absent.
    #[must_use]
    pub fn records(&self) -> Vec<ElementRecord> {
        self.rows.iter().map(|row| self.record_at(row)).collect()
    }

    /// Records whose `loc` equals `locator`
    #[must_use]
    pub fn records_with_locator(&self, locator: &str) -> Vec<ElementRecord> {
        let Some(loc) = self.column_index(LOC_COLUMN) else {
            return Vec::new();
        };
        self.rows
            .iter()
            .filter(|row| row.get(loc).is_some_and(|v| v == locator))
            .map(|row| self.record_at(row))
            .collect()
    }

    fn record_at(&self, row: &[String]) -> ElementRecord {
        let mut record = ElementRecord::new("", "");
        for (column, value) in self.columns.iter().zip(row) {
            match column.as_str() {
                LOC_COLUMN => record.locator.clone_from(value),
                TAG_COLUMN => record.tag.clone_from(value),
                TEXT_COLUMN => record.text.clone_from(value),
                URL_COLUMN => record.url.clone_from(value),
                name if !value.is_empty() => {
                    record.attributes.insert(name.to_string(), value.clone());
                }
                _ => {}
            }
        }
        record
    }
}

/// Matchable columns of a set of records, reconciled onto one column set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeTable {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl AttributeTable {
    /// Build from records: the column set is the union of every record's
    /// matchable columns (fixed ones first, attributes in first-seen order);
    /// missing cells are empty.
    #[must_use]
    pub fn from_records(records: &[ElementRecord]) -> Self {
        let table = RecordTable::from_records(records);
        Self::from_table(&table)
    }

    /// Narrow a record table to its matchable columns
    #[must_use]
    pub fn from_table(table: &RecordTable) -> Self {
        let keep: Vec<usize> = table
            .columns()
            .iter()
            .enumerate()
            .filter(|(_, c)| !NON_MATCHABLE_COLUMNS.contains(&c.as_str()))
            .map(|(i, _)| i)
            .collect();
        let columns = keep.iter().map(|&i| table.columns()[i].clone()).collect();
        let rows = table
            .rows()
            .iter()
            .map(|row| {
                keep.iter()
                    .map(|&i| row.get(i).cloned().unwrap_or_default())
                    .collect()
            })
            .collect();
        Self { columns, rows }
    }

    /// Build directly from column names and rows
    #[must_use]
    pub fn from_parts(columns: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { columns, rows }
    }

    /// Column names
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Rows aligned with [`Self::columns`]
    #[must_use]
    pub fn rows(&self) -> &[Vec<String>] {
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

    /// Project a record onto this table's columns. Attributes the table has
    /// no column for are dropped; columns the record lacks are empty.
    #[must_use]
    pub fn project(&self, record: &ElementRecord) -> Vec<String> {
        self.columns
            .iter()
            .map(|c| record.value(c).unwrap_or_default().to_string())
            .collect()
    }
}

/// The current page as the matcher sees it: matchable rows plus the
/// locator of each row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSnapshot {
    /// Matchable attributes, one row per element
    pub attributes: AttributeTable,
    /// Locator of each row, same order
    pub locators: Vec<String>,
}

impl PageSnapshot {
    /// Split a current-page table into attributes and locators
    #[must_use]
    pub fn from_table(table: &RecordTable) -> Self {
        let locators = match table.column_index(LOC_COLUMN) {
            Some(loc) => table
                .rows()
                .iter()
                .map(|row| row.get(loc).cloned().unwrap_or_default())
                .collect(),
            None => vec![String::new(); table.len()],
        };
        Self {
            attributes: AttributeTable::from_table(table),
            locators,
        }
    }

    /// Number of elements on the page
    #[must_use]
    pub fn len(&self) -> usize {
        self.locators.len()
    }

    /// True when the page has no elements
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locators.is_empty()
    }
}
