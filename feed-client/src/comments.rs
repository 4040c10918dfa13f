use crate::api::{FeedClient, SyndicationFeed, SyndicationItem};
use crate::ingestor::clean_community_name;
use crate::normalizer::{self, truncate_chars};
use futures::future::join_all;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// At most this many grounding samples per community.
pub const MAX_SAMPLES: usize = 3;
/// Comments shorter than this carry no usable style signal.
pub const MIN_COMMENT_CHARS: usize = 20;
/// Samples are clipped to this length before deduplication.
pub const MAX_SAMPLE_CHARS: usize = 300;

/// A comment after markup cleanup, before quality filtering.
#[derive(Debug, Clone)]
pub struct RawComment {
    pub author: String,
    pub body: String,
}

impl FeedClient {
    /// Select up to three representative recent comments from a community,
    /// for grounding generated replies in the local writing style.
    ///
    /// Any transport or parse failure yields an empty list. An empty list
    /// is a valid outcome ("no grounding available"), not an error.
    pub async fn sample_grounding_comments(
        &self,
        community: &str,
        lookback_hours: i64,
    ) -> Vec<String> {
        let name = clean_community_name(community);
        if name.is_empty() {
            return Vec::new();
        }

        // The top-posts feed only supports coarse timeframes
        let timeframe = if lookback_hours <= 24 { "day" } else { "week" };
        let posts_rss = format!(
            "{}/r/{}/top.rss?t={}&limit=5",
            self.base_url(),
            name,
            timeframe
        );
        let url = self.syndication_request_url(&posts_rss);

        let feed: SyndicationFeed = match self.get_json(&url).await {
            Ok(feed) => feed,
            Err(e) => {
                warn!("Fetching top posts for r/{} failed: {}", name, e);
                return Vec::new();
            }
        };
        if feed.status != "ok" {
            warn!("Top-posts feed for r/{} returned status {:?}", name, feed.status);
            return Vec::new();
        }

        let post_ids: Vec<String> = feed
            .items
            .iter()
            .take(3)
            .filter_map(extract_item_post_id)
            .collect();
        if post_ids.is_empty() {
            debug!("No extractable post ids in top feed for r/{}", name);
            return Vec::new();
        }

        let fetches = post_ids
            .iter()
            .map(|post_id| self.fetch_post_comments(&name, post_id));
        let comments: Vec<RawComment> = join_all(fetches).await.into_iter().flatten().collect();

        let samples = select_grounding_samples(comments);
        info!("Selected {} grounding samples for r/{}", samples.len(), name);
        samples
    }

    async fn fetch_post_comments(&self, community: &str, post_id: &str) -> Vec<RawComment> {
        let comments_rss = format!(
            "{}/r/{}/comments/{}.rss?sort=top&limit=10",
            self.base_url(),
            community,
            post_id
        );
        let url = self.syndication_request_url(&comments_rss);

        let feed: SyndicationFeed = match self.get_json(&url).await {
            Ok(feed) => feed,
            Err(e) => {
                debug!("Fetching comments for post {} failed: {}", post_id, e);
                return Vec::new();
            }
        };
        if feed.status != "ok" {
            return Vec::new();
        }

        feed.items
            .into_iter()
            .map(|item| {
                let body =
                    normalizer::strip_boilerplate(&normalizer::strip_markup(item.body_markup()));
                RawComment {
                    author: item.author,
                    body,
                }
            })
            .collect()
    }
}

fn extract_item_post_id(item: &SyndicationItem) -> Option<String> {
    normalizer::extract_post_id(&item.link)
        .or_else(|| normalizer::extract_post_id(&item.guid))
        .or_else(|| item.guid.strip_prefix("t3_").map(str::to_string))
}

/// Quality-filter cleaned comments and pick the first unique samples, in
/// feed order. Feed order is the only engagement proxy the transport
/// gives us, so no re-sorting happens here.
pub fn select_grounding_samples(comments: Vec<RawComment>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut selected: Vec<String> = Vec::new();

    for comment in comments {
        if selected.len() >= MAX_SAMPLES {
            break;
        }

        let body = comment.body.trim();
        if body.is_empty() || body == "[deleted]" || body == "[removed]" {
            continue;
        }

        let author = comment.author.to_lowercase();
        if author.contains("bot") || author == "automoderator" {
            continue;
        }
        if body.to_lowercase().contains("i am a bot") {
            continue;
        }

        if body.chars().count() < MIN_COMMENT_CHARS {
            continue;
        }

        let text = if body.chars().count() > MAX_SAMPLE_CHARS {
            format!("{}...", truncate_chars(body, MAX_SAMPLE_CHARS))
        } else {
            body.to_string()
        };

        if seen.insert(text.clone()) {
            selected.push(text);
        }
    }

    selected
}
