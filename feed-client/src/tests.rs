use crate::api::{FeedClient, Listing, PostData};
use crate::ingestor::filter_and_contextualize;

fn unreachable_client() -> FeedClient {
    // Connection-refused immediately; exercises the degrade-to-empty path
    // without waiting on a timeout.
    FeedClient::with_base_urls(
        "threadscout-test/1.0",
        "http://127.0.0.1:1",
        "http://127.0.0.1:1",
    )
}

#[tokio::test]
async fn test_client_creation() {
    let client = FeedClient::new("threadscout-test/1.0");
    assert_eq!(client.base_url(), "https://www.reddit.com");

    let metrics = client.get_metrics().await;
    assert_eq!(metrics.total_requests, 0);
}

#[tokio::test]
async fn test_transport_failure_degrades_to_empty() {
    let client = unreachable_client();

    let (posts, context) = client.fetch_posts("rust", 24).await;
    assert!(posts.is_empty());
    assert!(context.is_none());

    let samples = client.sample_grounding_comments("rust", 24).await;
    assert!(samples.is_empty());
}

#[tokio::test]
async fn test_failed_requests_are_recorded() {
    let client = unreachable_client();

    let _ = client.fetch_posts("rust", 24).await;

    let metrics = client.get_metrics().await;
    assert_eq!(metrics.total_requests, 1);
    assert_eq!(metrics.failed_requests, 1);
    assert_eq!(metrics.successful_requests, 0);
}

#[test]
fn test_listing_fixture_through_normalizer() {
    let now = 1_700_000_000;
    let raw = format!(
        r#"{{
            "kind": "Listing",
            "data": {{
                "children": [
                    {{"kind": "t3", "data": {{
                        "id": "1fresh1",
                        "title": "Looking for tool recommendations",
                        "selftext": "<p>What do people actually use for this?</p>",
                        "subreddit": "startups",
                        "permalink": "/r/startups/comments/1fresh1/looking_for_tool/",
                        "created_utc": {fresh},
                        "num_comments": 2,
                        "ups": 9
                    }}}},
                    {{"kind": "t3", "data": {{
                        "id": "2stale2",
                        "title": "Old discussion",
                        "selftext": "",
                        "subreddit": "startups",
                        "permalink": "/r/startups/comments/2stale2/old_discussion/",
                        "created_utc": {stale},
                        "num_comments": 40,
                        "ups": 310
                    }}}}
                ],
                "after": null
            }}
        }}"#,
        fresh = now - 1800,
        stale = now - 60 * 3600
    );

    let listing: Listing<PostData> = serde_json::from_str(&raw).unwrap();
    let (posts, context) = filter_and_contextualize(listing, "startups", 24, now);

    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].id, "1fresh1");
    assert_eq!(posts[0].body, "What do people actually use for this?");
    assert_eq!(posts[0].num_comments, 2);

    let context = context.unwrap();
    assert_eq!(context.posts_in_window, 1);
    assert_eq!(context.avg_posts_per_hour, 0.04); // round(1 / 24, 2)
}
