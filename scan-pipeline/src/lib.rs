use chrono::Utc;
use feed_client::FeedClient;
use futures::future::join_all;
use llm_interface::{build_prompt, CompletionProvider};
use scoring_engine::OpportunityScorer;
use std::collections::HashMap;
use threadscout_core::{
    CommunityContext, CoreError, DraftedReply, Opportunity, Persona, Post, PromptSpec,
    ReplyIntent, ReplyLength,
};
use tracing::{info, warn};
use uuid::Uuid;

/// Grounding samples describe the current tone of a community, so the
/// sampler always looks at the most recent day of comments.
const GROUNDING_LOOKBACK_HOURS: i64 = 24;

/// Where posts and grounding comments come from. A seam over the feed
/// client so orchestration stays testable without a network.
pub trait PostSource {
    async fn fetch_posts(
        &self,
        community: &str,
        lookback_hours: i64,
    ) -> (Vec<Post>, Option<CommunityContext>);

    async fn sample_grounding_comments(&self, community: &str, lookback_hours: i64)
        -> Vec<String>;
}

impl PostSource for FeedClient {
    async fn fetch_posts(
        &self,
        community: &str,
        lookback_hours: i64,
    ) -> (Vec<Post>, Option<CommunityContext>) {
        FeedClient::fetch_posts(self, community, lookback_hours).await
    }

    async fn sample_grounding_comments(
        &self,
        community: &str,
        lookback_hours: i64,
    ) -> Vec<String> {
        FeedClient::sample_grounding_comments(self, community, lookback_hours).await
    }
}

/// Caller-facing pipeline: scan communities into a ranked opportunity
/// list, then draft a grounded reply for a selected opportunity.
pub struct Pipeline<S: PostSource> {
    source: S,
    scorer: OpportunityScorer,
}

impl<S: PostSource> Pipeline<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            scorer: OpportunityScorer::new(),
        }
    }

    pub fn with_scorer(source: S, scorer: OpportunityScorer) -> Self {
        Self { source, scorer }
    }

    /// Scan the requested communities and return opportunities ranked by
    /// score, highest first. One community failing (or being empty) never
    /// affects the others.
    pub async fn scan(
        &self,
        communities: &[String],
        lookback_hours: i64,
        keywords: &[String],
    ) -> Result<Vec<Opportunity>, CoreError> {
        if communities.iter().all(|c| c.trim().is_empty()) {
            return Err(CoreError::InvalidInput {
                message: "no communities requested".to_string(),
            });
        }
        if lookback_hours <= 0 {
            return Err(CoreError::InvalidInput {
                message: format!("lookback window must be positive, got {}", lookback_hours),
            });
        }

        let run_id = Uuid::new_v4();
        info!(
            "Scan {} starting across {} communities ({}h window)",
            run_id,
            communities.len(),
            lookback_hours
        );

        let fetches = communities
            .iter()
            .map(|community| self.source.fetch_posts(community, lookback_hours));
        let results = join_all(fetches).await;

        let mut pool: Vec<Post> = Vec::new();
        let mut contexts: HashMap<String, CommunityContext> = HashMap::new();
        for (posts, context) in results {
            pool.extend(posts);
            if let Some(context) = context {
                contexts.insert(context.community.clone(), context);
            }
        }

        if pool.is_empty() {
            warn!("Scan {} found no posts in the requested window", run_id);
        }

        let now = Utc::now().timestamp();
        let mut opportunities: Vec<Opportunity> = pool
            .into_iter()
            .map(|post| {
                let context = contexts.get(&post.community);
                let result = self.scorer.score_at(&post, keywords, context, now);
                Opportunity::new(post, result, now)
            })
            .collect();

        // Stable sort: ties keep fetch order
        opportunities.sort_by(|a, b| b.score.cmp(&a.score));

        info!(
            "Scan {} produced {} ranked opportunities",
            run_id,
            opportunities.len()
        );
        Ok(opportunities)
    }

    /// Draft a reply for one opportunity: sample grounding comments from
    /// its community, assemble the prompt, and call the completion
    /// provider once. Generation failures propagate as typed errors.
    pub async fn draft_reply<P: CompletionProvider>(
        &self,
        opportunity: &Opportunity,
        intent: ReplyIntent,
        persona: Persona,
        length: ReplyLength,
        instructions: Option<String>,
        provider: &P,
    ) -> Result<DraftedReply, CoreError> {
        let community = &opportunity.post.community;
        let style_examples = self
            .source
            .sample_grounding_comments(community, GROUNDING_LOOKBACK_HOURS)
            .await;
        let grounding_used = !style_examples.is_empty();
        if !grounding_used {
            info!("No grounding samples available for r/{}", community);
        }

        let spec = PromptSpec {
            title: opportunity.post.title.clone(),
            body: opportunity.post.body.clone(),
            intent,
            persona,
            length,
            instructions,
            style_examples,
        };

        let prompt = build_prompt(&spec);
        let text = provider.complete(&prompt).await?;

        Ok(DraftedReply {
            text,
            grounding_used,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use llm_interface::AssembledPrompt;
    use threadscout_core::{LlmError, ScoringResult};

    struct StubSource {
        posts: HashMap<String, (Vec<Post>, Option<CommunityContext>)>,
        samples: Vec<String>,
    }

    impl StubSource {
        fn new() -> Self {
            Self {
                posts: HashMap::new(),
                samples: Vec::new(),
            }
        }

        fn with_community(
            mut self,
            community: &str,
            posts: Vec<Post>,
            context: Option<CommunityContext>,
        ) -> Self {
            self.posts.insert(community.to_string(), (posts, context));
            self
        }

        fn with_samples(mut self, samples: Vec<String>) -> Self {
            self.samples = samples;
            self
        }
    }

    impl PostSource for StubSource {
        async fn fetch_posts(
            &self,
            community: &str,
            _lookback_hours: i64,
        ) -> (Vec<Post>, Option<CommunityContext>) {
            self.posts
                .get(community)
                .cloned()
                .unwrap_or((Vec::new(), None))
        }

        async fn sample_grounding_comments(
            &self,
            _community: &str,
            _lookback_hours: i64,
        ) -> Vec<String> {
            self.samples.clone()
        }
    }

    struct StubProvider {
        response: Result<String, ()>,
    }

    impl CompletionProvider for StubProvider {
        async fn complete(&self, _prompt: &AssembledPrompt) -> Result<String, CoreError> {
            match &self.response {
                Ok(text) => Ok(text.clone()),
                Err(()) => Err(CoreError::Llm(LlmError::ServiceUnavailable {
                    provider: "stub".to_string(),
                })),
            }
        }
    }

    fn post(id: &str, community: &str, title: &str, age_secs: i64) -> Post {
        Post {
            id: id.to_string(),
            title: title.to_string(),
            body: String::new(),
            community: community.to_string(),
            permalink: format!("/r/{}/comments/{}/post/", community, id),
            created_utc: Utc::now().timestamp() - age_secs,
            num_comments: 5,
            ups: 3,
        }
    }

    fn opportunity(community: &str) -> Opportunity {
        Opportunity::new(
            post("abc123", community, "Any good tool for this?", 600),
            ScoringResult {
                score: 65,
                explanation: vec!["Low competition (5 comments) (+10)".to_string()],
            },
            Utc::now().timestamp(),
        )
    }

    #[tokio::test]
    async fn test_scan_rejects_empty_community_list() {
        let pipeline = Pipeline::new(StubSource::new());

        let result = pipeline.scan(&[], 24, &[]).await;
        assert!(matches!(result, Err(CoreError::InvalidInput { .. })));

        let blank = vec!["  ".to_string()];
        let result = pipeline.scan(&blank, 24, &[]).await;
        assert!(matches!(result, Err(CoreError::InvalidInput { .. })));
    }

    #[tokio::test]
    async fn test_scan_rejects_non_positive_lookback() {
        let pipeline = Pipeline::new(StubSource::new());
        let communities = vec!["rust".to_string()];

        let result = pipeline.scan(&communities, 0, &[]).await;
        assert!(matches!(result, Err(CoreError::InvalidInput { .. })));
    }

    #[tokio::test]
    async fn test_scan_ranks_across_communities() {
        let context = CommunityContext {
            community: "slowtown".to_string(),
            posts_in_window: 2,
            avg_posts_per_hour: 0.5,
        };
        let source = StubSource::new()
            .with_community(
                "slowtown",
                vec![
                    post("aaa111", "slowtown", "Any tool recommendations?", 600),
                    post("bbb222", "slowtown", "Unrelated chatter", 100_000),
                ],
                Some(context),
            )
            .with_community(
                "busytown",
                vec![post("ccc333", "busytown", "Another unrelated post", 100_000)],
                None,
            );

        let pipeline = Pipeline::new(source);
        let communities = vec!["slowtown".to_string(), "busytown".to_string()];
        let opportunities = pipeline.scan(&communities, 24, &[]).await.unwrap();

        assert_eq!(opportunities.len(), 3);
        // Keyword + fresh + low competition + slow community ranks first
        assert_eq!(opportunities[0].post.id, "aaa111");
        for pair in opportunities.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        // Posts from the context-less community still score, with the
        // velocity rule reporting unavailable data
        let contextless = opportunities
            .iter()
            .find(|o| o.post.id == "ccc333")
            .unwrap();
        assert!(contextless
            .explanation
            .iter()
            .any(|line| line.contains("velocity data unavailable")));
    }

    #[tokio::test]
    async fn test_scan_tolerates_empty_communities() {
        let source = StubSource::new().with_community(
            "onlyone",
            vec![post("aaa111", "onlyone", "A fresh question", 300)],
            None,
        );
        let pipeline = Pipeline::new(source);

        // "ghost" is unknown to the stub: it fetches as empty, like a
        // community whose transport failed mid-scan
        let communities = vec!["ghost".to_string(), "onlyone".to_string()];
        let opportunities = pipeline.scan(&communities, 24, &[]).await.unwrap();
        assert_eq!(opportunities.len(), 1);
        assert_eq!(opportunities[0].post.community, "onlyone");
    }

    #[tokio::test]
    async fn test_draft_reply_reports_grounding() {
        let source = StubSource::new().with_samples(vec![
            "honestly the simplest setup won here".to_string(),
        ]);
        let pipeline = Pipeline::new(source);
        let provider = StubProvider {
            response: Ok("A generated reply.".to_string()),
        };

        let reply = pipeline
            .draft_reply(
                &opportunity("rust"),
                ReplyIntent::HelpFirst,
                Persona::NeutralPeer,
                ReplyLength::Medium,
                None,
                &provider,
            )
            .await
            .unwrap();

        assert_eq!(reply.text, "A generated reply.");
        assert!(reply.grounding_used);
    }

    #[tokio::test]
    async fn test_draft_reply_without_grounding() {
        let pipeline = Pipeline::new(StubSource::new());
        let provider = StubProvider {
            response: Ok("A generated reply.".to_string()),
        };

        let reply = pipeline
            .draft_reply(
                &opportunity("rust"),
                ReplyIntent::SoftCredibility,
                Persona::LightAuthority,
                ReplyLength::Short,
                Some("keep it friendly".to_string()),
                &provider,
            )
            .await
            .unwrap();

        assert!(!reply.grounding_used);
    }

    #[tokio::test]
    async fn test_draft_reply_propagates_generation_failure() {
        let pipeline = Pipeline::new(StubSource::new());
        let provider = StubProvider { response: Err(()) };

        let result = pipeline
            .draft_reply(
                &opportunity("rust"),
                ReplyIntent::HelpFirst,
                Persona::NeutralPeer,
                ReplyLength::Medium,
                None,
                &provider,
            )
            .await;

        assert!(matches!(
            result,
            Err(CoreError::Llm(LlmError::ServiceUnavailable { .. }))
        ));
    }
}
