use tracing::info;

use crate::bootstrap::fetch_initial_data;
use crate::collect::Collector;
use crate::config::{ScrapeSettings, SiteConfig};
use crate::error::Result;
use crate::model::EventRecord;
use crate::session::Transport;

/// Bootstrap page first, then every search page and its events.
pub async fn scrape_events<T: Transport + ?Sized>(
    transport: &T,
    search_url: &str,
    site: &SiteConfig,
    settings: &ScrapeSettings,
) -> Result<Vec<EventRecord>> {
    info!("Fetching the event data");
    let boot = fetch_initial_data(transport, search_url, site).await?;

    info!("Found {} pages to fetch", boot.page_count);
    let records = Collector::new(transport, site, settings)
        .collect(&boot.csrf_token, &boot.query, boot.page_count)
        .await?;

    info!("Found {} events", records.len());
    Ok(records)
}
