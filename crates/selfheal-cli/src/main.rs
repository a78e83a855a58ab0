//! Selfheal CLI: recover broken browser-test locators
//!
//! ## Usage
//!
//! ```bash
//! selfheal record login.html "//*[@id='login-button']"  # remember an element
//! selfheal scrape login-v2.html                           # snapshot the new page
//! selfheal heal "//*[@id='login-button']"                 # propose a replacement
//! selfheal locate login-v2.html "//*[@id='login-button']" # find, healing on failure
//! ```

use std::process::ExitCode;

use clap::Parser;
use selfheal_cli::{run, Cli, CliError};

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report_error(&e);
            ExitCode::from(e.exit_code())
        }
    }
}

fn report_error(error: &CliError) {
    eprintln!("Error: {error}");
}
