//! Element repository.
//!
//! Two tables back the healer: the historical table (every element a caller
//! ever located, append-only, exact duplicates dropped) and the current-page
//! table (the last scrape, replaced wholesale). [`Repository`] is the handle
//! the healer and scraper are given; nothing here keeps paths in globals.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::record::{ElementRecord, PageSnapshot, RecordTable};
use crate::result::{HealError, HealResult};

/// Default store directory for [`JsonRepository`]
pub const DEFAULT_STORE_DIR: &str = "resources";

/// File holding the historical table
pub const HISTORICAL_FILE: &str = "elements.json";

/// File holding the current-page table
pub const CURRENT_PAGE_FILE: &str = "current_elements.json";

/// Storage for observed elements
pub trait Repository {
    /// Every historical row recorded under `locator`, oldest first
    fn read_historical(&self, locator: &str) -> HealResult<Vec<ElementRecord>>;

    /// The latest page snapshot
    fn read_current_page(&self) -> HealResult<PageSnapshot>;

    /// Append one record to the historical table
    fn write_element(&mut self, record: &ElementRecord) -> HealResult<()>;

    /// Replace the current-page table
    fn write_page(&mut self, records: &[ElementRecord]) -> HealResult<()>;
}

/// Tables kept in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    historical: RecordTable,
    current: RecordTable,
}

impl MemoryRepository {
    /// Empty repository
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Historical table
    #[must_use]
    pub const fn historical(&self) -> &RecordTable {
        &self.historical
    }

    /// Current-page table
    #[must_use]
    pub const fn current_page(&self) -> &RecordTable {
        &self.current
    }
}

impl Repository for MemoryRepository {
    fn read_historical(&self, locator: &str) -> HealResult<Vec<ElementRecord>> {
        Ok(self.historical.records_with_locator(locator))
    }

    fn read_current_page(&self) -> HealResult<PageSnapshot> {
        Ok(PageSnapshot::from_table(&self.current))
    }

    fn write_element(&mut self, record: &ElementRecord) -> HealResult<()> {
        self.historical.push(record);
        self.historical.dedup();
        Ok(())
    }

    fn write_page(&mut self, records: &[ElementRecord]) -> HealResult<()> {
        self.current = RecordTable::from_records(records);
        Ok(())
    }
}

/// Tables stored as JSON files in one directory
#[derive(Debug, Clone)]
pub struct JsonRepository {
    root: PathBuf,
}

impl Default for JsonRepository {
    fn default() -> Self {
        Self::new(DEFAULT_STORE_DIR)
    }
}

impl JsonRepository {
    /// Repository rooted at `root`; nothing is touched until first use
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store directory
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the historical table
    #[must_use]
    pub fn historical_path(&self) -> PathBuf {
        self.root.join(HISTORICAL_FILE)
    }

    /// Path of the current-page table
    #[must_use]
    pub fn current_page_path(&self) -> PathBuf {
        self.root.join(CURRENT_PAGE_FILE)
    }

    /// Load a table file
    pub fn load_table(path: &Path) -> HealResult<RecordTable> {
        let table_name = path.display().to_string();
        if !path.exists() {
            return Err(HealError::table_unavailable(table_name, "file not found"));
        }
        let json = fs::read_to_string(path)?;
        if json.trim().is_empty() {
            return Err(HealError::table_unavailable(table_name, "file is empty"));
        }
        let table: RecordTable = serde_json::from_str(&json)
            .map_err(|e| HealError::table_unavailable(table_name.clone(), e.to_string()))?;
        if !table.is_well_formed() {
            return Err(HealError::table_unavailable(
                table_name,
                "row width does not match column count",
            ));
        }
        Ok(table)
    }

    /// Write a table file via a temporary sibling so readers never see a
    /// half-written table
    pub fn save_table(path: &Path, table: &RecordTable) -> HealResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(table)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Whole historical table
    pub fn historical(&self) -> HealResult<RecordTable> {
        Self::load_table(&self.historical_path())
    }

    /// Whole current-page table
    pub fn current_page(&self) -> HealResult<RecordTable> {
        Self::load_table(&self.current_page_path())
    }
}

impl Repository for JsonRepository {
    fn read_historical(&self, locator: &str) -> HealResult<Vec<ElementRecord>> {
        let rows = self.historical()?.records_with_locator(locator);
        debug!(locator, rows = rows.len(), "Read historical rows");
        Ok(rows)
    }

    fn read_current_page(&self) -> HealResult<PageSnapshot> {
        let snapshot = PageSnapshot::from_table(&self.current_page()?);
        debug!(rows = snapshot.len(), "Read current page");
        Ok(snapshot)
    }

    fn write_element(&mut self, record: &ElementRecord) -> HealResult<()> {
        let path = self.historical_path();
        let mut table = if path.exists() {
            Self::load_table(&path)?
        } else {
            info!(path = %path.display(), "Creating historical table");
            RecordTable::new()
        };
        table.push(record);
        table.dedup();
        Self::save_table(&path, &table)?;
        debug!(locator = %record.locator, rows = table.len(), "Recorded element");
        Ok(())
    }

    fn write_page(&mut self, records: &[ElementRecord]) -> HealResult<()> {
        let table = RecordTable::from_records(records);
        Self::save_table(&self.current_page_path(), &table)?;
        debug!(rows = table.len(), "Replaced current page");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn login() -> ElementRecord {
        ElementRecord::new("//*[@id='login-button']", "button")
            .with_text("Log In")
            .with_attribute("class", "btn-primary")
    }

    mod memory_tests {
        use super::*;

        #[test]
        fn test_write_element_dedups() {
            let mut repo = MemoryRepository::new();
            repo.write_element(&login()).unwrap();
            repo.write_element(&login()).unwrap();
            assert_eq!(repo.historical().len(), 1);
            assert_eq!(repo.read_historical("//*[@id='login-button']").unwrap().len(), 1);
        }

        #[test]
        fn test_write_page_replaces() {
            let mut repo = MemoryRepository::new();
            repo.write_page(&[login(), ElementRecord::new("//a", "a")]).unwrap();
            repo.write_page(&[ElementRecord::new("//b", "b")]).unwrap();
            let page = repo.read_current_page().unwrap();
            assert_eq!(page.locators, vec!["//b"]);
        }

        #[test]
        fn test_empty_repository_reads() {
            let repo = MemoryRepository::new();
            assert!(repo.read_historical("//x").unwrap().is_empty());
            assert!(repo.read_current_page().unwrap().is_empty());
        }
    }

    mod json_tests {
        use super::*;

        #[test]
        fn test_missing_tables_are_unavailable() {
            let dir = tempfile::tempdir().unwrap();
            let repo = JsonRepository::new(dir.path());
            let err = repo.read_historical("//x").unwrap_err();
            assert!(matches!(err, HealError::TableUnavailable { .. }));
            assert!(repo.read_current_page().unwrap_err().is_missing_data());
        }

        #[test]
        fn test_empty_file_is_unavailable() {
            let dir = tempfile::tempdir().unwrap();
            let repo = JsonRepository::new(dir.path());
            fs::write(repo.current_page_path(), "  \n").unwrap();
            assert!(repo.read_current_page().unwrap_err().is_missing_data());
        }

        #[test]
        fn test_corrupt_file_is_unavailable_and_not_overwritten() {
            let dir = tempfile::tempdir().unwrap();
            let mut repo = JsonRepository::new(dir.path());
            fs::write(repo.historical_path(), "{not json").unwrap();
            assert!(repo.read_historical("//x").is_err());
            assert!(repo.write_element(&login()).is_err());
            assert_eq!(
                fs::read_to_string(repo.historical_path()).unwrap(),
                "{not json"
            );
        }

        #[test]
        fn test_historical_append_unions_columns() {
            let dir = tempfile::tempdir().unwrap();
            let mut repo = JsonRepository::new(dir.path().join("store"));
            repo.write_element(&login()).unwrap();
            repo.write_element(
                &ElementRecord::new("//*[@id='home']", "a").with_attribute("href", "/"),
            )
            .unwrap();
            repo.write_element(&login()).unwrap();

            let table = repo.historical().unwrap();
            assert_eq!(table.len(), 2);
            assert_eq!(table.columns(), &["loc", "tag", "text", "url", "class", "href"]);
            let rows = repo.read_historical("//*[@id='login-button']").unwrap();
            assert_eq!(rows, vec![login()]);
        }

        #[test]
        fn test_write_page_overwrites_file() {
            let dir = tempfile::tempdir().unwrap();
            let mut repo = JsonRepository::new(dir.path());
            repo.write_page(&[login()]).unwrap();
            repo.write_page(&[ElementRecord::new("//*[@id='submit-btn']", "button")])
                .unwrap();
            let page = repo.read_current_page().unwrap();
            assert_eq!(page.locators, vec!["//*[@id='submit-btn']"]);
            assert!(!dir.path().join("current_elements.json.tmp").exists());
        }

        #[test]
        fn test_ragged_table_is_rejected() {
            let dir = tempfile::tempdir().unwrap();
            let repo = JsonRepository::new(dir.path());
            fs::write(
                repo.current_page_path(),
                r#"{"columns":["loc","tag"],"rows":[["//a"]]}"#,
            )
            .unwrap();
            assert!(repo.read_current_page().is_err());
        }

        #[test]
        fn test_default_root() {
            assert_eq!(JsonRepository::default().root(), Path::new("resources"));
        }
    }
}
