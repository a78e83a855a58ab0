//! Command handlers
//!
//! Every handler opens a [`JsonRepository`] in the configured store and works
//! against a page read from disk through a [`DocumentDriver`].

use std::fs;

use selfheal::{
    BrowserDriver, DocumentDriver, ElementRecord, FoundElement, HealConfig, HealError,
    HealOutcome, HealReport, Healer, HtmlParser, JsonRepository, Scraper,
};
use serde::Serialize;
use tracing::debug;

use crate::commands::{
    ConfigArgs, HealArgs, LocateArgs, PageArgs, RecordArgs, ScrapeArgs, ThresholdArgs,
};
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::{OutputFormat, Reporter};

/// JSON result of `scrape`
#[derive(Debug, Serialize)]
pub struct ScrapeOutput {
    /// Page URL
    pub url: String,
    /// Number of elements recorded
    pub elements: usize,
    /// The current-page rows
    pub records: Vec<ElementRecord>,
}

/// JSON result of `record`
#[derive(Debug, Serialize)]
pub struct RecordOutput {
    /// Rows appended to the historical table
    pub recorded: Vec<ElementRecord>,
    /// Locators that did not resolve
    pub missing: Vec<String>,
}

/// JSON result of `heal`
#[derive(Debug, Serialize)]
pub struct HealOutput {
    /// Stale locator
    pub locator: String,
    /// Accepted replacement
    pub replacement: Option<String>,
    /// Decision report, when a candidate was scored
    pub report: Option<HealReport>,
    /// Why no candidate was scored
    pub error: Option<String>,
}

impl HealOutput {
    /// Summarize an outcome
    #[must_use]
    pub fn from_outcome(locator: &str, outcome: &HealOutcome) -> Self {
        Self {
            locator: locator.to_string(),
            replacement: match outcome {
                HealOutcome::Healed(report) => Some(report.candidate_locator.clone()),
                _ => None,
            },
            report: outcome.report().cloned(),
            error: outcome.error().map(ToString::to_string),
        }
    }
}

/// JSON result of `locate`
#[derive(Debug, Serialize)]
pub struct LocateOutput {
    /// Locator asked for
    pub requested: String,
    /// Locator that found the element
    pub resolved: Option<String>,
    /// True when `resolved` came from healing
    pub healed: bool,
    /// The element found
    pub element: Option<FoundElement>,
    /// Decision report, when healing ran
    pub report: Option<HealReport>,
}

/// Healing configuration from `--config`, or the defaults
pub fn load_heal_config(config: &CliConfig) -> CliResult<HealConfig> {
    match &config.heal_config {
        Some(path) => {
            debug!(path = %path.display(), "Loading healing configuration");
            Ok(HealConfig::load(path)?)
        }
        None => Ok(HealConfig::default()),
    }
}

/// Apply `--threshold` / `--no-threshold`
pub fn apply_threshold(heal: HealConfig, args: ThresholdArgs) -> CliResult<HealConfig> {
    let heal = if args.no_threshold {
        heal.with_similarity_threshold(None)
    } else if let Some(threshold) = args.threshold {
        heal.with_similarity_threshold(Some(threshold))
    } else {
        heal
    };
    heal.validate()
        .map_err(|e| CliError::invalid_argument(e.to_string()))?;
    Ok(heal)
}

fn open_page(page: &PageArgs) -> CliResult<DocumentDriver> {
    let source = fs::read_to_string(&page.page)?;
    Ok(DocumentDriver::new(
        &HtmlParser::new(),
        page.effective_url(),
        source,
    )?)
}

fn scraper_for(page: &PageArgs, heal: &HealConfig) -> CliResult<Scraper<DocumentDriver, HtmlParser>> {
    Ok(Scraper::new(open_page(page)?, HtmlParser::new(), heal))
}

/// `selfheal scrape`
pub fn run_scrape(config: &CliConfig, reporter: &Reporter, args: &ScrapeArgs) -> CliResult<()> {
    let mut heal = load_heal_config(config)?;
    if !args.tags.is_empty() {
        heal = heal.with_scrape_tags(args.tags.iter().cloned());
    }
    if args.capture_rect {
        heal = heal.with_capture_bounding_rect(true);
    }
    heal.validate()
        .map_err(|e| CliError::invalid_argument(e.to_string()))?;

    let scraper = scraper_for(&args.page, &heal)?;
    let mut repo = JsonRepository::new(config.store());
    let elements = scraper.scrape_current_page(&mut repo)?;
    let url = scraper.driver().current_url()?;

    match OutputFormat::from(args.format) {
        OutputFormat::Json => reporter.json(&ScrapeOutput {
            url,
            elements,
            records: repo.current_page()?.records(),
        }),
        OutputFormat::Text => {
            reporter.success(&format!("Scraped {elements} elements from {url}"));
            Ok(())
        }
    }
}

/// `selfheal record`
pub fn run_record(config: &CliConfig, reporter: &mut Reporter, args: &RecordArgs) -> CliResult<()> {
    let heal = load_heal_config(config)?;
    let scraper = scraper_for(&args.page, &heal)?;
    let mut repo = JsonRepository::new(config.store());

    let mut recorded = Vec::new();
    let mut missing = Vec::new();
    reporter.start_progress(args.locators.len() as u64, "Recording elements");
    for locator in &args.locators {
        match scraper.driver().find_element(locator) {
            Ok(element) => {
                recorded.push(scraper.save_found_element(&element, locator, &mut repo)?);
            }
            Err(HealError::ElementNotFound { .. }) => missing.push(locator.clone()),
            Err(err) => return Err(err.into()),
        }
        reporter.increment(1);
    }
    reporter.finish();

    match OutputFormat::from(args.format) {
        OutputFormat::Json => reporter.json(&RecordOutput {
            recorded,
            missing: missing.clone(),
        })?,
        OutputFormat::Text => {
            for record in &recorded {
                reporter.success(&format!("Recorded <{}> {}", record.tag, record.locator));
            }
            for locator in &missing {
                reporter.failure(&format!("No element matches {locator}"));
            }
        }
    }

    if missing.is_empty() {
        Ok(())
    } else {
        Err(CliError::invalid_argument(format!(
            "{} of {} locators did not resolve",
            missing.len(),
            args.locators.len()
        )))
    }
}

/// `selfheal locate`: find, and heal on failure
pub fn run_locate(config: &CliConfig, reporter: &Reporter, args: &LocateArgs) -> CliResult<()> {
    let heal = apply_threshold(load_heal_config(config)?, args.threshold)?;
    let scraper = scraper_for(&args.page, &heal)?;
    let json = OutputFormat::from(args.format) == OutputFormat::Json;

    match scraper.driver().find_element(&args.locator) {
        Ok(element) => {
            if !args.no_record {
                let mut repo = JsonRepository::new(config.store());
                scraper.save_found_element(&element, &args.locator, &mut repo)?;
            }
            if json {
                return reporter.json(&LocateOutput {
                    requested: args.locator.clone(),
                    resolved: Some(args.locator.clone()),
                    healed: false,
                    element: Some(element),
                    report: None,
                });
            }
            reporter.result(&args.locator);
            Ok(())
        }
        Err(HealError::ElementNotFound { .. }) => {
            reporter.warning(&format!("Locator {} did not resolve, healing", args.locator));
            let mut healer = Healer::new(JsonRepository::new(config.store()), heal)?;
            scraper.scrape_current_page(healer.repository_mut())?;

            let outcome = healer.attempt(&args.locator);
            let report = outcome.report().cloned();
            if !json {
                if let Some(report) = &report {
                    reporter.heal_report(report);
                }
                if let Some(err) = outcome.error() {
                    reporter.failure(&err.to_string());
                }
            }

            let Some(replacement) = outcome.replacement() else {
                if json {
                    reporter.json(&LocateOutput {
                        requested: args.locator.clone(),
                        resolved: None,
                        healed: false,
                        element: None,
                        report,
                    })?;
                }
                return Err(CliError::not_healed(&args.locator));
            };

            let element = scraper.driver().find_element(&replacement)?;
            if !args.no_record {
                scraper.save_found_element(&element, &replacement, healer.repository_mut())?;
            }
            if json {
                return reporter.json(&LocateOutput {
                    requested: args.locator.clone(),
                    resolved: Some(replacement),
                    healed: true,
                    element: Some(element),
                    report,
                });
            }
            reporter.result(&replacement);
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

/// `selfheal heal`
pub fn run_heal(config: &CliConfig, reporter: &Reporter, args: &HealArgs) -> CliResult<()> {
    let heal = apply_threshold(load_heal_config(config)?, args.threshold)?;
    let healer = Healer::new(JsonRepository::new(config.store()), heal)?;
    let outcome = healer.attempt(&args.locator);
    let output = HealOutput::from_outcome(&args.locator, &outcome);

    match OutputFormat::from(args.format) {
        OutputFormat::Json => reporter.json(&output)?,
        OutputFormat::Text => {
            if let Some(report) = &output.report {
                reporter.heal_report(report);
            }
            if let Some(err) = &output.error {
                reporter.failure(err);
            }
            if let Some(replacement) = &output.replacement {
                reporter.result(replacement);
            }
        }
    }

    match output.replacement {
        Some(_) => Ok(()),
        None => Err(CliError::not_healed(&args.locator)),
    }
}

/// `selfheal config`
pub fn run_config(config: &CliConfig, reporter: &Reporter, args: &ConfigArgs) -> CliResult<()> {
    let heal = load_heal_config(config)?;
    if let Some(path) = &args.write {
        heal.save(path)?;
        reporter.success(&format!("Wrote configuration to {}", path.display()));
    }
    match OutputFormat::from(args.format) {
        OutputFormat::Json => reporter.json(&heal),
        OutputFormat::Text => {
            reporter.result(heal.to_yaml()?.trim_end());
            Ok(())
        }
    }
}
