use crate::metrics::{MetricsCollector, RequestMetrics};
use crate::rate_limiter::{RateLimitConfig, RateLimiter};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use threadscout_core::{CoreError, FeedApiError};
use tracing::{debug, error, warn};
use url::Url;

const REDDIT_PUBLIC_BASE: &str = "https://www.reddit.com";
const SYNDICATION_BASE: &str = "https://api.rss2json.com/v1/api.json";

/// Envelope of the native JSON listing transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing<T> {
    #[serde(default)]
    pub kind: String,
    pub data: ListingData<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingData<T> {
    #[serde(default = "Vec::new")]
    pub children: Vec<ListingChild<T>>,
    #[serde(default)]
    pub after: Option<String>,
    #[serde(default)]
    pub before: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingChild<T> {
    #[serde(default)]
    pub kind: String,
    pub data: T,
}

/// One post as the native listing reports it. Counts default to zero when
/// the transport omits them; a missing timestamp fails the item later in
/// the normalizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostData {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub selftext: String,
    #[serde(default)]
    pub subreddit: String,
    #[serde(default)]
    pub permalink: String,
    #[serde(default)]
    pub created_utc: Option<f64>,
    #[serde(default)]
    pub num_comments: u32,
    #[serde(default)]
    pub ups: u32,
    #[serde(default)]
    pub stickied: bool,
}

/// Envelope of the syndication-proxy transport (RSS converted to JSON).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyndicationFeed {
    #[serde(default)]
    pub status: String,
    #[serde(default = "Vec::new")]
    pub items: Vec<SyndicationItem>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyndicationItem {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub guid: String,
    #[serde(default)]
    pub author: String,
    #[serde(default, rename = "pubDate")]
    pub pub_date: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub description: String,
}

impl SyndicationItem {
    /// Comment feeds put the body in `content`, some converters only fill
    /// `description`.
    pub fn body_markup(&self) -> &str {
        if !self.content.is_empty() {
            &self.content
        } else {
            &self.description
        }
    }
}

/// Read-only client for a community's public feeds. Cheap to share across
/// concurrent per-community fetches; all interior state is behind Arc.
#[derive(Debug)]
pub struct FeedClient {
    http_client: Client,
    rate_limiter: Arc<RateLimiter>,
    metrics: Arc<MetricsCollector>,
    base_url: String,
    syndication_url: String,
}

impl FeedClient {
    pub fn new(user_agent: &str) -> Self {
        Self::with_base_urls(user_agent, REDDIT_PUBLIC_BASE, SYNDICATION_BASE)
    }

    /// Override the upstream endpoints. Used by tests and by deployments
    /// that front the feed source with a caching proxy.
    pub fn with_base_urls(user_agent: &str, base_url: &str, syndication_url: &str) -> Self {
        let rate_limiter = Arc::new(RateLimiter::new(RateLimitConfig::public_feed()));
        let metrics = Arc::new(MetricsCollector::new());

        let http_client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http_client,
            rate_limiter,
            metrics,
            base_url: base_url.trim_end_matches('/').to_string(),
            syndication_url: syndication_url.to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build the syndication-proxy request URL for a raw feed URL.
    pub(crate) fn syndication_request_url(&self, rss_url: &str) -> String {
        match Url::parse_with_params(&self.syndication_url, &[("rss_url", rss_url)]) {
            Ok(url) => url.into(),
            // The base is a constant or caller-supplied URL; fall back to
            // the bare base so the request fails loudly upstream.
            Err(e) => {
                warn!("Invalid syndication base URL: {}", e);
                self.syndication_url.clone()
            }
        }
    }

    /// One GET, one attempt. Failures map to typed errors; callers decide
    /// whether to degrade to an empty result.
    pub(crate) async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, CoreError> {
        let _permit = self.rate_limiter.acquire_permit().await;
        debug!("Fetching {}", url);

        let start_time = Instant::now();
        let response = self.http_client.get(url).send().await;
        let response_time = start_time.elapsed();

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                error!("Network error for {}: {}", url, e);
                self.metrics
                    .record_request(RequestMetrics {
                        url: url.to_string(),
                        status_code: None,
                        response_time,
                        success: false,
                    })
                    .await;

                if e.is_timeout() {
                    return Err(CoreError::Feed(FeedApiError::RequestTimeout));
                }
                return Err(CoreError::Network(e));
            }
        };

        let status = response.status();
        self.metrics
            .record_request(RequestMetrics {
                url: url.to_string(),
                status_code: Some(status.as_u16()),
                response_time,
                success: status.is_success(),
            })
            .await;

        if !status.is_success() {
            error!("Request failed with status {} for {}", status, url);

            if status.as_u16() == 429 {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(60);
                return Err(CoreError::Feed(FeedApiError::RateLimitExceeded {
                    retry_after,
                }));
            } else if status.as_u16() == 403 {
                return Err(CoreError::Feed(FeedApiError::Forbidden {
                    resource: url.to_string(),
                }));
            } else if status.as_u16() == 404 {
                return Err(CoreError::Feed(FeedApiError::InvalidResponse {
                    details: "Resource not found".to_string(),
                }));
            } else if status.is_server_error() {
                return Err(CoreError::Feed(FeedApiError::ServerError {
                    status_code: status.as_u16(),
                }));
            }
            return Err(CoreError::Feed(FeedApiError::InvalidResponse {
                details: format!("Unexpected status {}", status),
            }));
        }

        response.json::<T>().await.map_err(|e| {
            error!("Failed to parse response from {}: {}", url, e);
            CoreError::Feed(FeedApiError::InvalidResponse {
                details: format!("Failed to parse response from {}", url),
            })
        })
    }

    pub async fn get_metrics(&self) -> crate::metrics::FetchMetrics {
        self.metrics.get_metrics().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_syndication_request_url_encodes_feed_url() {
        let client = FeedClient::new("threadscout-test/1.0");
        let url = client
            .syndication_request_url("https://www.reddit.com/r/rust/top.rss?t=day&limit=5");
        assert!(url.starts_with(SYNDICATION_BASE));
        assert!(url.contains("rss_url="));
        // The nested query separator must be percent-encoded
        assert!(!url.contains("t=day&limit"));
    }

    #[test]
    fn test_listing_deserializes_with_missing_counts() {
        let raw = r#"{
            "kind": "Listing",
            "data": {
                "children": [
                    {"kind": "t3", "data": {"id": "abc123", "title": "Any good tools?", "created_utc": 1700000000.0}}
                ],
                "after": null
            }
        }"#;
        let listing: Listing<PostData> = serde_json::from_str(raw).unwrap();
        let post = &listing.data.children[0].data;
        assert_eq!(post.id, "abc123");
        assert_eq!(post.num_comments, 0);
        assert_eq!(post.ups, 0);
        assert_eq!(post.created_utc, Some(1_700_000_000.0));
    }

    #[test]
    fn test_syndication_item_body_prefers_content() {
        let item = SyndicationItem {
            content: "<p>full body</p>".to_string(),
            description: "summary".to_string(),
            ..Default::default()
        };
        assert_eq!(item.body_markup(), "<p>full body</p>");

        let item = SyndicationItem {
            description: "summary".to_string(),
            ..Default::default()
        };
        assert_eq!(item.body_markup(), "summary");
    }
}
