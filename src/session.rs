use std::time::Duration;

use async_trait::async_trait;
use rand::{Rng, rng};
use serde_json::Value;
use tracing::debug;
use wreq::header::{
    ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL, HeaderMap, HeaderName, HeaderValue, REFERER,
    UPGRADE_INSECURE_REQUESTS,
};
use wreq_util::Emulation;

use crate::error::Result;

/// A fetched HTML document; the status is kept so callers decide what counts as success.
#[derive(Debug, Clone)]
pub struct Page {
    pub status: u16,
    pub body: String,
}

/// Everything the pipeline needs from the network.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Browser-style navigation GET.
    async fn get_page(&self, url: &str, referer: &str) -> Result<Page>;

    async fn post_json(&self, url: &str, headers: HeaderMap, body: &Value) -> Result<Value>;
}

// -------------------------
// Chrome-emulating session
// -------------------------

/// One client for the whole run: shared connection pool, cookie jar and browser identity.
/// The emulation profile fixes the TLS ClientHello, HTTP/2 settings and default
/// headers (user agent included) to those of the named Chrome release.
pub struct HttpSession {
    client: wreq::Client,
    profile: &'static str,
}

impl HttpSession {
    pub fn new(timeout: Duration) -> Result<Self> {
        let (emulation, profile) = random_chrome_profile();
        let client = wreq::Client::builder()
            .emulation(emulation)
            .cookie_store(true)
            .redirect(wreq::redirect::Policy::limited(8))
            .timeout(timeout)
            .build()?;
        debug!("session ready, emulating {profile}");
        Ok(Self { client, profile })
    }

    pub fn profile(&self) -> &str {
        self.profile
    }
}

#[async_trait]
impl Transport for HttpSession {
    async fn get_page(&self, url: &str, referer: &str) -> Result<Page> {
        let rsp = self
            .client
            .get(url)
            .headers(navigation_headers(referer))
            .send()
            .await?;
        // Capture before .text() consumes the response
        let status = rsp.status().as_u16();
        let final_url = rsp.url().clone();
        let body = rsp.text().await?;
        debug!("[fetch] {url} -> status={status} final={final_url} len={}", body.len());
        Ok(Page { status, body })
    }

    async fn post_json(&self, url: &str, headers: HeaderMap, body: &Value) -> Result<Value> {
        let rsp = self.client.post(url).headers(headers).json(body).send().await?;
        debug!("[post] {url} -> status={}", rsp.status());
        Ok(rsp.json::<Value>().await?)
    }
}

// -------------------------
// Browser header profile
// -------------------------

fn navigation_headers(referer: &str) -> HeaderMap {
    let mut h = HeaderMap::new();
    h.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
        ),
    );
    h.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    if let Ok(v) = HeaderValue::from_str(referer) {
        h.insert(REFERER, v);
    }
    h.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
    h.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
    h.insert(
        HeaderName::from_static("sec-fetch-site"),
        HeaderValue::from_static("same-origin"),
    );
    h.insert(
        HeaderName::from_static("sec-fetch-mode"),
        HeaderValue::from_static("navigate"),
    );
    h.insert(
        HeaderName::from_static("sec-fetch-dest"),
        HeaderValue::from_static("document"),
    );
    h
}

fn random_chrome_profile() -> (Emulation, &'static str) {
    match rng().random_range(0..3) {
        0 => (Emulation::Chrome131, "chrome131"),
        1 => (Emulation::Chrome132, "chrome132"),
        _ => (Emulation::Chrome133, "chrome133"),
    }
}

// -------------------------
// In-memory transport for tests
// -------------------------
