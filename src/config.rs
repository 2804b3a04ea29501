use std::{path::PathBuf, time::Duration};

use clap::Parser;

pub const DEFAULT_OUTPUT_DIR: &str = "event_datas";

#[derive(Debug, Parser, Clone)]
#[command(
    name = "eventclaw",
    version,
    about = "Collects Eventbrite search results and their ticket tiers into a JSON file"
)]
pub struct Cli {
    /// Search URL; prompted for interactively when omitted.
    #[arg(long, value_name = "URL")]
    pub url: Option<String>,

    #[arg(long, value_name = "DIR", default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,

    /// Pause after every search page.
    #[arg(long, value_name = "SECS", default_value_t = 2)]
    pub page_delay_secs: u64,

    #[arg(long, value_name = "SECS", default_value_t = 25)]
    pub timeout_secs: u64,

    /// Abort on malformed event pages instead of skipping them.
    #[arg(long, default_value_t = false)]
    pub strict: bool,
}

impl Cli {
    pub fn settings(&self) -> ScrapeSettings {
        ScrapeSettings {
            page_delay: Duration::from_secs(self.page_delay_secs),
            timeout: Duration::from_secs(self.timeout_secs),
            strict: self.strict,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScrapeSettings {
    pub page_delay: Duration,
    pub timeout: Duration,
    pub strict: bool,
}

impl Default for ScrapeSettings {
    fn default() -> Self {
        Self {
            page_delay: Duration::from_secs(2),
            timeout: Duration::from_secs(25),
            strict: false,
        }
    }
}

/// Fixed facts about the target site.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    pub origin: &'static str,
    pub search_api_path: &'static str,
    pub csrf_field: &'static str,
    pub allowed_hosts: &'static [&'static str],
}

impl SiteConfig {
    pub fn eventbrite() -> Self {
        Self {
            origin: "https://www.eventbrite.com",
            search_api_path: "/api/v3/destination/search/",
            csrf_field: "csrfmiddlewaretoken",
            allowed_hosts: &["www.eventbrite.com", "eventbrite.com"],
        }
    }

    pub fn referer(&self) -> String {
        format!("{}/", self.origin)
    }

    pub fn search_api_url(&self) -> String {
        format!("{}{}", self.origin, self.search_api_path)
    }
}
