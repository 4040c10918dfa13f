use crate::api::{PostData, SyndicationItem};
use chrono::DateTime;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::sync::OnceLock;
use threadscout_core::Post;
use tracing::debug;

/// Bound on normalized body length, to keep memory and prompt sizes sane.
pub const MAX_BODY_CHARS: usize = 600;

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]*>").expect("valid markup regex"))
}

fn boilerplate_re() -> &'static Regex {
    // Provenance lines some feed renderings inject below the body
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)submitted by\s+/?u/\S+|\[link\]|\[comments\]")
            .expect("valid boilerplate regex")
    })
}

fn post_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"comments/([a-z0-9]+)").expect("valid post-id regex"))
}

/// A feed item before normalization, built from either transport shape.
#[derive(Debug, Clone, Default)]
pub struct RawFeedItem {
    pub source_id: Option<String>,
    pub title: String,
    pub body: String,
    pub link: String,
    pub guid: String,
    pub published: String,
    pub created_utc: Option<f64>,
    pub num_comments: u32,
    pub ups: u32,
}

impl From<PostData> for RawFeedItem {
    fn from(data: PostData) -> Self {
        Self {
            source_id: if data.id.is_empty() {
                None
            } else {
                Some(data.id)
            },
            title: data.title,
            body: data.selftext,
            link: data.permalink,
            guid: String::new(),
            published: String::new(),
            created_utc: data.created_utc,
            num_comments: data.num_comments,
            ups: data.ups,
        }
    }
}

impl From<SyndicationItem> for RawFeedItem {
    fn from(item: SyndicationItem) -> Self {
        let body = item.body_markup().to_string();
        Self {
            source_id: None,
            title: item.title,
            body,
            link: item.link,
            guid: item.guid,
            published: item.pub_date,
            created_utc: None,
            num_comments: 0,
            ups: 0,
        }
    }
}

/// Turn one raw feed item into a Post. A malformed item (no title, no
/// parseable timestamp) yields None and is skipped by the caller.
pub fn normalize(item: RawFeedItem, community: &str) -> Option<Post> {
    let title = strip_markup(&item.title);
    if title.is_empty() {
        debug!("Dropping feed item without a title");
        return None;
    }

    let created_utc = match parse_timestamp(item.created_utc, &item.published) {
        Some(ts) => ts,
        None => {
            debug!("Dropping feed item with unparseable date: {:?}", item.published);
            return None;
        }
    };

    let body = truncate_chars(&strip_boilerplate(&strip_markup(&item.body)), MAX_BODY_CHARS);

    let id = item
        .source_id
        .or_else(|| extract_post_id(&item.link))
        .or_else(|| extract_post_id(&item.guid))
        .or_else(|| item.guid.strip_prefix("t3_").map(str::to_string))
        .unwrap_or_else(|| fallback_id(&title, community, created_utc));

    Some(Post {
        id,
        title,
        body,
        community: community.to_string(),
        permalink: item.link,
        created_utc,
        num_comments: item.num_comments,
        ups: item.ups,
    })
}

/// Strip markup tags and decode the handful of entities feed bodies
/// actually carry, then trim.
pub fn strip_markup(raw: &str) -> String {
    let without_tags = tag_re().replace_all(raw, "");
    without_tags
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .trim()
        .to_string()
}

/// Remove "submitted by ..." and "[link] [comments]" footer fragments.
pub fn strip_boilerplate(text: &str) -> String {
    boilerplate_re().replace_all(text, "").trim().to_string()
}

/// Canonical post id from a permalink of the form `.../comments/<id>/...`.
pub fn extract_post_id(link: &str) -> Option<String> {
    post_id_re()
        .captures(link)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Deterministic identifier for items whose permalink carries no post id.
/// Hashes (title, community, hour-truncated timestamp) so the same item
/// keeps the same id across overlapping scan windows.
fn fallback_id(title: &str, community: &str, created_utc: i64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(title.as_bytes());
    hasher.update(b"|");
    hasher.update(community.as_bytes());
    hasher.update(b"|");
    hasher.update((created_utc / 3600).to_le_bytes());
    let digest = hasher.finalize();
    let hex: String = digest.iter().take(6).map(|b| format!("{:02x}", b)).collect();
    format!("fb_{}", hex)
}

fn parse_timestamp(created_utc: Option<f64>, published: &str) -> Option<i64> {
    if let Some(ts) = created_utc {
        return Some(ts as i64);
    }
    if published.is_empty() {
        return None;
    }
    DateTime::parse_from_rfc2822(published)
        .or_else(|_| DateTime::parse_from_rfc3339(published))
        .map(|dt| dt.timestamp())
        .ok()
}

/// Char-boundary-safe truncation.
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        text.chars().take(max_chars).collect()
    }
}
