use wreq::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, REFERER};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::time::sleep;
use tracing::{info, warn};

use crate::bootstrap::SearchQuery;
use crate::config::{ScrapeSettings, SiteConfig};
use crate::detail::{EventDetail, json_text, parse_event_detail};
use crate::error::{Result, ScrapeError};
use crate::model::{DateTime, EventRecord};
use crate::session::Transport;

// -------------------------
// Search API response
// -------------------------

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchResponse {
    events: Option<SearchEvents>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchEvents {
    results: Option<Vec<SearchResult>>,
}

/// One search hit. Fields are kept as raw JSON so an odd type (a numeric
/// name, say) becomes text instead of failing the whole page; missing or
/// null fields become "".
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SearchResult {
    name: Option<Value>,
    url: Option<Value>,
    start_date: Option<Value>,
    start_time: Option<Value>,
    end_date: Option<Value>,
    end_time: Option<Value>,
}

fn field_text(field: &Option<Value>) -> String {
    field.as_ref().map(json_text).unwrap_or_default()
}

impl SearchResult {
    fn event_url(&self) -> Option<String> {
        Some(field_text(&self.url)).filter(|url| !url.is_empty())
    }

    fn into_record(self, event_url: String, detail: EventDetail) -> EventRecord {
        EventRecord {
            event_name: field_text(&self.name),
            date_time: DateTime {
                start_date: field_text(&self.start_date),
                start_time: field_text(&self.start_time),
                end_date: field_text(&self.end_date),
                end_time: field_text(&self.end_time),
            },
            event_url,
            location: detail.location,
            prices: detail.prices,
        }
    }
}

// -------------------------
// Collector
// -------------------------

/// Walks search pages 1..=page_count in order, one event page at a time.
pub struct Collector<'a, T: Transport + ?Sized> {
    transport: &'a T,
    site: &'a SiteConfig,
    settings: &'a ScrapeSettings,
}

impl<'a, T: Transport + ?Sized> Collector<'a, T> {
    pub fn new(transport: &'a T, site: &'a SiteConfig, settings: &'a ScrapeSettings) -> Self {
        Self {
            transport,
            site,
            settings,
        }
    }

    pub async fn collect(
        &self,
        csrf_token: &str,
        query: &SearchQuery,
        page_count: u32,
    ) -> Result<Vec<EventRecord>> {
        let headers = api_headers(csrf_token, &self.site.referer())?;
        let mut records = Vec::new();

        info!("Fetching event data for {page_count} pages");
        for page in 1..=page_count {
            records.extend(self.collect_page(query, &headers, page).await?);
            // Unconditional, including after the last page.
            sleep(self.settings.page_delay).await;
        }

        Ok(records)
    }

    async fn collect_page(
        &self,
        query: &SearchQuery,
        headers: &HeaderMap,
        page: u32,
    ) -> Result<Vec<EventRecord>> {
        let payload = json!({
            "event_search": query.for_page(page),
            "debug_experiment_overrides": { "search_exp_4": "D" },
            "browse_surface": "search",
        });

        info!("Fetching event data for page {page}");
        let response = self
            .transport
            .post_json(&self.site.search_api_url(), headers.clone(), &payload)
            .await?;
        let results = search_results(response)?;
        info!("Found {} events in page {page}", results.len());

        let mut records = Vec::with_capacity(results.len());
        for result in results {
            let Some(event_url) = result.event_url() else {
                warn!("Search result {:?} has no url, skipping", field_text(&result.name));
                continue;
            };
            match self.fetch_record(result, event_url).await {
                Ok(record) => records.push(record),
                Err(e) if e.is_skippable(self.settings.strict) => {
                    warn!("Failed to get event data: {e}");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(records)
    }

    async fn fetch_record(&self, result: SearchResult, event_url: String) -> Result<EventRecord> {
        info!("Getting event data from {event_url}");
        let page = self
            .transport
            .get_page(&event_url, &self.site.referer())
            .await?;

        if page.status != 200 {
            return Err(ScrapeError::DetailFetch {
                url: event_url,
                status: page.status,
            });
        }

        let detail = parse_event_detail(&page.body).map_err(|reason| ScrapeError::DetailParse {
            url: event_url.clone(),
            reason,
        })?;
        Ok(result.into_record(event_url, detail))
    }
}

fn search_results(response: Value) -> Result<Vec<SearchResult>> {
    let response: SearchResponse = serde_json::from_value(response)?;
    Ok(response
        .events
        .and_then(|events| events.results)
        .unwrap_or_default())
}

fn api_headers(csrf_token: &str, referer: &str) -> Result<HeaderMap> {
    let invalid = |what: &str| ScrapeError::Extraction(format!("{what} is not a valid header value"));

    let mut h = HeaderMap::new();
    h.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    h.insert(ACCEPT, HeaderValue::from_static("application/json"));
    h.insert(
        REFERER,
        HeaderValue::from_str(referer).map_err(|_| invalid("referer"))?,
    );
    h.insert(
        HeaderName::from_static("x-csrftoken"),
        HeaderValue::from_str(csrf_token).map_err(|_| invalid("csrf token"))?,
    );
    Ok(h)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::Map;
    use tracing_test::traced_test;

    use super::*;
    use crate::model::PriceTier;
    use crate::session::fake::FakeTransport;

    const ORG: &str = r#"<script type="application/ld+json">{"@type":"Organization","name":"Eventbrite"}</script>"#;

    fn detail_page(street: &str, offers: &str) -> String {
        format!(
            r#"<html><head>{ORG}<script type="application/ld+json">{{"@type":"Event","location":{{"address":{{"streetAddress":"{street}"}}}},"offers":{offers}}}</script></head></html>"#
        )
    }

    fn result(n: u32) -> Value {
        json!({
            "name": format!("Event {n}"),
            "url": format!("https://www.eventbrite.com/e/event-{n}"),
            "start_date": format!("2026-11-0{n}"),
            "start_time": "19:00",
            "end_date": format!("2026-11-0{n}"),
            "end_time": "23:00",
        })
    }

    fn query() -> SearchQuery {
        let mut template = Map::new();
        template.insert("dates".into(), json!("current_future"));
        SearchQuery::new(template)
    }

    fn settings() -> ScrapeSettings {
        ScrapeSettings {
            page_delay: Duration::from_secs(2),
            ..ScrapeSettings::default()
        }
    }

    #[tokio::test(start_paused = true)]
    #[traced_test]
    async fn skips_failed_detail_pages_and_keeps_order() {
        let transport = FakeTransport::new()
            .with_search_page(json!({ "events": { "results": [result(1), result(2), result(3)] } }))
            .with_page(
                "https://www.eventbrite.com/e/event-1",
                200,
                &detail_page("1 First Ave", r#"[{"name":"GA","price":"10.00"}]"#),
            )
            .with_page("https://www.eventbrite.com/e/event-2", 404, "not found")
            .with_page(
                "https://www.eventbrite.com/e/event-3",
                200,
                &detail_page("3 Third Ave", r#"[{"name":"","price":null},{"name":"VIP","price":0}]"#),
            );
        let site = SiteConfig::eventbrite();
        let settings = settings();

        let records = Collector::new(&transport, &site, &settings)
            .collect("tok", &query(), 1)
            .await
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].event_name, "Event 1");
        assert_eq!(records[0].location, "1 First Ave");
        assert_eq!(records[0].date_time.start_time, "19:00");
        assert_eq!(records[1].event_url, "https://www.eventbrite.com/e/event-3");
        assert_eq!(
            records[1].prices,
            vec![PriceTier { name: "VIP".into(), price: "0".into() }]
        );
        assert_eq!(transport.gets.lock().unwrap().len(), 3);
        logs_assert(|lines: &[&str]| {
            let skips = lines
                .iter()
                .filter(|line| line.contains("WARN") && line.contains("Failed to get event data"))
                .collect::<Vec<_>>();
            match skips.as_slice() {
                [only] if only.contains("event-2") && only.contains("404") => Ok(()),
                other => Err(format!("expected one skip for event-2, got {other:?}")),
            }
        });
    }

    #[tokio::test(start_paused = true)]
    async fn posts_once_per_page_and_waits_after_each() {
        let transport = FakeTransport::new()
            .with_search_page(json!({ "events": { "results": [] } }))
            .with_search_page(json!({ "events": { "results": [result(1)] } }))
            .with_search_page(json!({}))
            .with_page(
                "https://www.eventbrite.com/e/event-1",
                200,
                &detail_page("1 First Ave", "[]"),
            );
        let site = SiteConfig::eventbrite();
        let settings = settings();

        let started = tokio::time::Instant::now();
        let records = Collector::new(&transport, &site, &settings)
            .collect("tok", &query(), 3)
            .await
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(transport.post_count(), 3);
        assert_eq!(transport.posted_pages(), vec![1, 2, 3]);
        let waited = started.elapsed();
        assert!(waited >= Duration::from_secs(6), "waited {waited:?}");
        assert!(waited < Duration::from_secs(7), "waited {waited:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn search_request_carries_csrf_and_payload() {
        let transport = FakeTransport::new();
        let site = SiteConfig::eventbrite();
        let settings = settings();

        Collector::new(&transport, &site, &settings)
            .collect("csrf-value", &query(), 1)
            .await
            .unwrap();

        let posts = transport.posts.lock().unwrap();
        let (url, headers, body) = &posts[0];
        assert_eq!(url, "https://www.eventbrite.com/api/v3/destination/search/");
        assert_eq!(headers.get("x-csrftoken").unwrap(), "csrf-value");
        assert_eq!(headers.get(REFERER).unwrap(), "https://www.eventbrite.com/");
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "application/json");
        assert_eq!(
            body,
            &json!({
                "event_search": { "dates": "current_future", "page": 1 },
                "debug_experiment_overrides": { "search_exp_4": "D" },
                "browse_surface": "search",
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_detail_is_skipped_unless_strict() {
        let transport = FakeTransport::new()
            .with_search_page(json!({ "events": { "results": [result(1), result(2)] } }))
            .with_page("https://www.eventbrite.com/e/event-1", 200, "<html>no data</html>")
            .with_page(
                "https://www.eventbrite.com/e/event-2",
                200,
                &detail_page("2 Second Ave", "[]"),
            );
        let site = SiteConfig::eventbrite();

        let lenient = settings();
        let records = Collector::new(&transport, &site, &lenient)
            .collect("tok", &query(), 1)
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].location, "2 Second Ave");

        let strict = ScrapeSettings { strict: true, ..settings() };
        let err = Collector::new(&transport, &site, &strict)
            .collect("tok", &query(), 1)
            .await
            .unwrap_err();
        assert!(matches!(err, ScrapeError::DetailParse { ref url, .. } if url.ends_with("event-1")));
    }

    #[tokio::test(start_paused = true)]
    async fn results_without_url_or_fields_are_handled() {
        let transport = FakeTransport::new()
            .with_search_page(json!({ "events": { "results": [
                { "name": "No link" },
                { "url": "https://www.eventbrite.com/e/bare", "start_date": null }
            ] } }))
            .with_page(
                "https://www.eventbrite.com/e/bare",
                200,
                &detail_page("", "[]"),
            );
        let site = SiteConfig::eventbrite();
        let settings = settings();

        let records = Collector::new(&transport, &site, &settings)
            .collect("tok", &query(), 1)
            .await
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].event_name, "");
        assert_eq!(records[0].date_time, DateTime::default());
    }

    #[tokio::test(start_paused = true)]
    async fn non_string_result_fields_become_text() {
        let transport = FakeTransport::new()
            .with_search_page(json!({ "events": { "results": [
                { "name": 2026, "url": "https://www.eventbrite.com/e/numbered", "start_date": "2026-12-31", "start_time": 2100, "end_date": true }
            ] } }))
            .with_page(
                "https://www.eventbrite.com/e/numbered",
                200,
                &detail_page("7 Year St", "[]"),
            );
        let site = SiteConfig::eventbrite();
        let settings = settings();

        let records = Collector::new(&transport, &site, &settings)
            .collect("tok", &query(), 1)
            .await
            .unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].event_name, "2026");
        assert_eq!(records[0].date_time.start_time, "2100");
        assert_eq!(records[0].date_time.end_date, "true");
        assert_eq!(records[0].date_time.end_time, "");
    }

    #[test]
    fn csrf_token_must_be_a_header_value() {
        assert!(api_headers("bad\ntoken", "https://www.eventbrite.com/").is_err());
    }
}
