use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use eventclaw::config::{Cli, SiteConfig};
use eventclaw::logging::init_logging;
use eventclaw::output::write_records;
use eventclaw::scrape::scrape_events;
use eventclaw::session::HttpSession;
use eventclaw::validate::is_valid_event_url;

fn prompt_for_url() -> Result<String> {
    print!("> Enter the Eventbrite URL: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("failed to read url from stdin")?;
    Ok(line.trim().to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();

    let url = match &cli.url {
        Some(url) => url.trim().to_string(),
        None => prompt_for_url()?,
    };

    if !is_valid_event_url(&url) {
        error!("Invalid Eventbrite URL");
        std::process::exit(1);
    }

    let settings = cli.settings();
    let site = SiteConfig::eventbrite();

    info!("Initializing the scraper");
    let session = HttpSession::new(settings.timeout).context("failed to build http client")?;

    let records = scrape_events(&session, &url, &site, &settings)
        .await
        .context("scrape failed")?;

    let path = write_records(&cli.output_dir, &records).context("failed to save event data")?;
    info!("Saved {} events to {}", records.len(), path.display());
    Ok(())
}
