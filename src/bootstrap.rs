use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::config::SiteConfig;
use crate::error::{Result, ScrapeError};
use crate::session::Transport;

const SERVER_DATA_MARKER: &str = "window.__SERVER_DATA";

static SERVER_DATA_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)window\.__SERVER_DATA__ = (\{.*?\});").expect("valid server data regex")
});
static SCRIPT_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("script").expect("valid script selector"));

/// Search state captured from the bootstrap page. The query is a template:
/// pages are derived from it, never written into it.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    template: Map<String, Value>,
}

impl SearchQuery {
    pub fn new(template: Map<String, Value>) -> Self {
        Self { template }
    }

    pub fn template(&self) -> &Map<String, Value> {
        &self.template
    }

    pub fn for_page(&self, page: u32) -> Map<String, Value> {
        let mut query = self.template.clone();
        query.insert("page".to_string(), Value::from(page));
        query
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bootstrap {
    pub csrf_token: String,
    pub query: SearchQuery,
    pub page_count: u32,
}

pub async fn fetch_initial_data<T: Transport + ?Sized>(
    transport: &T,
    search_url: &str,
    site: &SiteConfig,
) -> Result<Bootstrap> {
    info!("Fetching search page {search_url}");
    let page = transport.get_page(search_url, &site.referer()).await?;
    debug!("bootstrap page status={} len={}", page.status, page.body.len());
    parse_bootstrap(&page.body, site)
}

pub fn parse_bootstrap(html: &str, site: &SiteConfig) -> Result<Bootstrap> {
    let doc = Html::parse_document(html);

    let csrf_sel = Selector::parse(&format!("input[name=\"{}\"]", site.csrf_field))
        .map_err(|e| ScrapeError::Extraction(format!("bad csrf selector: {e}")))?;
    let csrf_token = doc
        .select(&csrf_sel)
        .next()
        .and_then(|input| input.value().attr("value"))
        .map(str::to_string)
        .ok_or_else(|| {
            ScrapeError::Extraction(format!("no {} input with a value", site.csrf_field))
        })?;

    let script = doc
        .select(&SCRIPT_SEL)
        .map(|s| s.text().collect::<String>())
        .find(|text| text.contains(SERVER_DATA_MARKER))
        .ok_or_else(|| ScrapeError::Extraction("no window.__SERVER_DATA__ script".into()))?;

    let server_data = parse_server_data(&script)?;
    let (query, page_count) = extract_server_data(&server_data);

    Ok(Bootstrap {
        csrf_token,
        query,
        page_count,
    })
}

fn parse_server_data(script: &str) -> Result<Value> {
    let blob = SERVER_DATA_RE
        .captures(script)
        .and_then(|c| c.get(1))
        .ok_or_else(|| {
            ScrapeError::Extraction("window.__SERVER_DATA__ assignment not found".into())
        })?;
    serde_json::from_str(blob.as_str())
        .map_err(|e| ScrapeError::Extraction(format!("window.__SERVER_DATA__ is not JSON: {e}")))
}

/// `search_data.event_search` defaults to `{}`, `page_count` to 1.
fn extract_server_data(server_data: &Value) -> (SearchQuery, u32) {
    let template = server_data
        .pointer("/search_data/event_search")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();
    let page_count = server_data
        .get("page_count")
        .and_then(Value::as_u64)
        .map(|n| u32::try_from(n).unwrap_or(u32::MAX))
        .unwrap_or(1);
    (SearchQuery::new(template), page_count)
}
