use crate::api::{FeedClient, Listing, PostData};
use crate::normalizer;
use chrono::Utc;
use threadscout_core::{CommunityContext, Post};
use tracing::{info, warn};

impl FeedClient {
    /// Fetch recent posts for one community, filtered to the lookback
    /// window, along with the activity context derived from that window.
    ///
    /// Invalid input short-circuits without a network call. Transport and
    /// parse failures degrade to `(vec![], None)` so one community can
    /// never abort a multi-community scan.
    pub async fn fetch_posts(
        &self,
        community: &str,
        lookback_hours: i64,
    ) -> (Vec<Post>, Option<CommunityContext>) {
        let name = clean_community_name(community);
        if name.is_empty() {
            warn!("Empty community name, skipping fetch");
            return (Vec::new(), None);
        }
        if lookback_hours <= 0 {
            warn!("Non-positive lookback window ({}h), skipping fetch", lookback_hours);
            return (Vec::new(), None);
        }

        let url = format!("{}/r/{}/new.json?limit=100", self.base_url(), name);
        let listing: Listing<PostData> = match self.get_json(&url).await {
            Ok(listing) => listing,
            Err(e) => {
                warn!("Fetching posts for r/{} failed: {}", name, e);
                return (Vec::new(), None);
            }
        };

        let now = Utc::now().timestamp();
        let (posts, context) = filter_and_contextualize(listing, &name, lookback_hours, now);
        info!(
            "Retrieved {} posts from r/{} within the last {}h",
            posts.len(),
            name,
            lookback_hours
        );
        (posts, context)
    }
}

/// Trim the requested name and drop a leading `r/` prefix if present.
pub fn clean_community_name(community: &str) -> String {
    let trimmed = community.trim();
    let trimmed = trimmed.strip_prefix('/').unwrap_or(trimmed);
    trimmed.strip_prefix("r/").unwrap_or(trimmed).to_string()
}

/// Normalize every listing child, keep posts inside the lookback window,
/// and derive the community's activity context. Pure so the windowing and
/// rate arithmetic are testable without a transport.
pub fn filter_and_contextualize(
    listing: Listing<PostData>,
    community: &str,
    lookback_hours: i64,
    now: i64,
) -> (Vec<Post>, Option<CommunityContext>) {
    let threshold = now - lookback_hours * 3600;

    let posts: Vec<Post> = listing
        .data
        .children
        .into_iter()
        .filter_map(|child| normalizer::normalize(child.data.into(), community))
        .filter(|post| post.created_utc >= threshold)
        .collect();

    let context = if posts.is_empty() {
        None
    } else {
        Some(CommunityContext {
            community: community.to_string(),
            posts_in_window: posts.len() as u32,
            avg_posts_per_hour: round2(posts.len() as f64 / lookback_hours as f64),
        })
    };

    (posts, context)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
