use chrono::Utc;
use threadscout_core::{CommunityContext, Post, ScoringResult};

/// Keywords assumed to signal tool-seeking intent when the caller
/// supplies none.
const DEFAULT_INTENT_KEYWORDS: [&str; 6] = [
    "tool",
    "tools",
    "alternative",
    "alternatives",
    "recommend",
    "best",
];

/// Tunable rule constants. The defaults encode the published scoring
/// rules; swap in different weights without touching ingestion or
/// sampling code.
#[derive(Debug, Clone)]
pub struct ScoringWeights {
    pub intent_per_match: i64,
    pub intent_cap: i64,
    pub very_low_competition_comments: u32,
    pub very_low_competition_bonus: i64,
    pub low_competition_comments: u32,
    pub low_competition_bonus: i64,
    pub fresh_minutes: i64,
    pub fresh_bonus: i64,
    pub recent_minutes: i64,
    pub recent_bonus: i64,
    pub slow_velocity_max: f64,
    pub slow_velocity_bonus: i64,
    pub moderate_velocity_max: f64,
    pub moderate_velocity_bonus: i64,
    pub churn_penalty: i64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            intent_per_match: 20,
            intent_cap: 40,
            very_low_competition_comments: 3,
            very_low_competition_bonus: 20,
            low_competition_comments: 8,
            low_competition_bonus: 10,
            fresh_minutes: 60,
            fresh_bonus: 25,
            recent_minutes: 180,
            recent_bonus: 15,
            slow_velocity_max: 2.0,
            slow_velocity_bonus: 15,
            moderate_velocity_max: 6.0,
            moderate_velocity_bonus: 8,
            churn_penalty: 5,
        }
    }
}

/// Deterministic opportunity scorer. Stateless apart from its weights:
/// the same post, keywords, context, and clock always produce the same
/// score and the same explanation list in the same order.
#[derive(Debug, Clone, Default)]
pub struct OpportunityScorer {
    weights: ScoringWeights,
}

impl OpportunityScorer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weights(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    /// Score against the current wall clock.
    pub fn score(
        &self,
        post: &Post,
        keywords: &[String],
        context: Option<&CommunityContext>,
    ) -> ScoringResult {
        self.score_at(post, keywords, context, Utc::now().timestamp())
    }

    /// Pure scoring function. Rule groups run in a fixed order; the order
    /// fixes explanation ordering, not the numeric outcome.
    pub fn score_at(
        &self,
        post: &Post,
        keywords: &[String],
        context: Option<&CommunityContext>,
        now: i64,
    ) -> ScoringResult {
        let w = &self.weights;
        let mut score: i64 = 0;
        let mut explanation: Vec<String> = Vec::new();

        // 1. Intent signal
        let intent_keywords: Vec<String> = if keywords.is_empty() {
            DEFAULT_INTENT_KEYWORDS
                .iter()
                .map(|k| k.to_string())
                .collect()
        } else {
            keywords.iter().map(|k| k.to_lowercase()).collect()
        };

        let title = post.title.to_lowercase();
        let matched: Vec<&String> = intent_keywords
            .iter()
            .filter(|k| !k.is_empty() && title.contains(k.as_str()))
            .collect();

        if !matched.is_empty() {
            let intent_score = (matched.len() as i64 * w.intent_per_match).min(w.intent_cap);
            score += intent_score;
            let terms: Vec<&str> = matched.iter().map(|k| k.as_str()).collect();
            explanation.push(format!(
                "High-intent keywords found ({}) (+{})",
                terms.join(", "),
                intent_score
            ));
        }

        // 2. Competition signal
        if post.num_comments < w.very_low_competition_comments {
            score += w.very_low_competition_bonus;
            explanation.push(format!(
                "Very low competition ({} comments) (+{})",
                post.num_comments, w.very_low_competition_bonus
            ));
        } else if post.num_comments < w.low_competition_comments {
            score += w.low_competition_bonus;
            explanation.push(format!(
                "Low competition ({} comments) (+{})",
                post.num_comments, w.low_competition_bonus
            ));
        } else {
            explanation.push(format!(
                "Crowded thread ({} comments) (+0)",
                post.num_comments
            ));
        }

        // 3. Freshness signal
        let age_minutes = (now - post.created_utc).max(0) / 60;
        if age_minutes < w.fresh_minutes {
            score += w.fresh_bonus;
            explanation.push(format!("Posted within last hour (+{})", w.fresh_bonus));
        } else if age_minutes < w.recent_minutes {
            score += w.recent_bonus;
            explanation.push(format!("Posted within last 3 hours (+{})", w.recent_bonus));
        } else {
            explanation.push(format!("Older post ({}h ago)", age_minutes / 60));
        }

        // 4. Community velocity signal
        match context {
            Some(context) => {
                let rate = context.avg_posts_per_hour;
                if rate < w.slow_velocity_max {
                    score += w.slow_velocity_bonus;
                    explanation.push(format!(
                        "Slow-moving subreddit ({} posts/hr) (+{})",
                        rate, w.slow_velocity_bonus
                    ));
                } else if rate < w.moderate_velocity_max {
                    score += w.moderate_velocity_bonus;
                    explanation.push(format!(
                        "Moderate posting velocity ({} posts/hr) (+{})",
                        rate, w.moderate_velocity_bonus
                    ));
                } else {
                    score -= w.churn_penalty;
                    explanation.push(format!(
                        "High content churn ({} posts/hr) (-{})",
                        rate, w.churn_penalty
                    ));
                }
            }
            None => {
                explanation.push("Subreddit velocity data unavailable".to_string());
            }
        }

        let score = score.clamp(0, 100) as u8;
        if score == 0 {
            explanation.push("No strong opportunity signals detected".to_string());
        }

        ScoringResult { score, explanation }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000;

    fn post(title: &str, num_comments: u32, created_utc: i64) -> Post {
        Post {
            id: "abc123".to_string(),
            title: title.to_string(),
            body: String::new(),
            community: "startups".to_string(),
            permalink: "/r/startups/comments/abc123/post/".to_string(),
            created_utc,
            num_comments,
            ups: 0,
        }
    }

    fn context(avg_posts_per_hour: f64) -> CommunityContext {
        CommunityContext {
            community: "startups".to_string(),
            posts_in_window: 10,
            avg_posts_per_hour,
        }
    }

    #[test]
    fn test_composite_score() {
        // 20 intent + 20 competition + 25 freshness + 15 velocity
        let scorer = OpportunityScorer::new();
        let post = post("Any good tool for this?", 2, NOW);
        let context = context(1.0);

        let result = scorer.score_at(&post, &[], Some(&context), NOW);
        assert_eq!(result.score, 80);
        assert_eq!(result.explanation.len(), 4);
        assert!(result.explanation[0].contains("tool"));
        assert!(result.explanation[1].contains("Very low competition"));
        assert!(result.explanation[2].contains("within last hour"));
        assert!(result.explanation[3].contains("Slow-moving"));
    }

    #[test]
    fn test_intent_rule_caps_at_forty() {
        let scorer = OpportunityScorer::new();
        // Three distinct default keywords in one title
        let post = post("Best tool or alternative?", 20, NOW - 10 * 3600);

        let result = scorer.score_at(&post, &[], None, NOW);
        // 40 intent + 0 competition + 0 freshness + 0 velocity
        assert_eq!(result.score, 40);
        assert!(result.explanation[0].contains("(+40)"));
    }

    #[test]
    fn test_two_keyword_matches_score_forty() {
        let scorer = OpportunityScorer::new();
        let post = post("Recommend a tool please", 20, NOW - 10 * 3600);

        let result = scorer.score_at(&post, &[], None, NOW);
        assert_eq!(result.score, 40);
    }

    #[test]
    fn test_caller_keywords_replace_defaults() {
        let scorer = OpportunityScorer::new();
        let post = post("Struggling with churn analytics", 20, NOW - 10 * 3600);

        let keywords = vec!["Churn".to_string()];
        let result = scorer.score_at(&post, &keywords, None, NOW);
        assert_eq!(result.score, 20);
        assert!(result.explanation[0].contains("churn"));

        // Default keywords no longer apply once the caller supplies a set
        let other = Post {
            title: "Best tool around".to_string(),
            ..post
        };
        let result = scorer.score_at(&other, &keywords, None, NOW);
        assert_eq!(result.score, 0);
    }

    #[test]
    fn test_zero_score_appends_no_signals_line() {
        let scorer = OpportunityScorer::new();
        // Older than 3 hours, 10 comments, no keyword match, no context
        let post = post("Weekly discussion thread", 10, NOW - 4 * 3600);

        let result = scorer.score_at(&post, &[], None, NOW);
        assert_eq!(result.score, 0);
        assert_eq!(
            result.explanation.last().map(String::as_str),
            Some("No strong opportunity signals detected")
        );
        assert!(result
            .explanation
            .iter()
            .any(|line| line.contains("Older post (4h ago)")));
        assert!(result
            .explanation
            .iter()
            .any(|line| line == "Subreddit velocity data unavailable"));
    }

    #[test]
    fn test_high_churn_penalty_clamps_at_zero() {
        let scorer = OpportunityScorer::new();
        let post = post("Weekly discussion thread", 10, NOW - 4 * 3600);
        let context = context(9.5);

        let result = scorer.score_at(&post, &[], Some(&context), NOW);
        // -5 velocity clamps up to 0
        assert_eq!(result.score, 0);
        assert!(result
            .explanation
            .iter()
            .any(|line| line.contains("High content churn")));
    }

    #[test]
    fn test_competition_buckets() {
        let scorer = OpportunityScorer::new();
        let old = NOW - 10 * 3600;

        let result = scorer.score_at(&post("nothing here", 2, old), &[], None, NOW);
        assert!(result.explanation[0].contains("Very low competition (2 comments) (+20)"));

        let result = scorer.score_at(&post("nothing here", 7, old), &[], None, NOW);
        assert!(result.explanation[0].contains("Low competition (7 comments) (+10)"));

        let result = scorer.score_at(&post("nothing here", 8, old), &[], None, NOW);
        assert!(result.explanation[0].contains("Crowded thread (8 comments) (+0)"));
    }

    #[test]
    fn test_freshness_buckets() {
        let scorer = OpportunityScorer::new();

        let result = scorer.score_at(&post("nothing here", 10, NOW - 59 * 60), &[], None, NOW);
        assert!(result
            .explanation
            .iter()
            .any(|l| l.contains("within last hour (+25)")));

        let result = scorer.score_at(&post("nothing here", 10, NOW - 120 * 60), &[], None, NOW);
        assert!(result
            .explanation
            .iter()
            .any(|l| l.contains("within last 3 hours (+15)")));
    }

    #[test]
    fn test_velocity_buckets() {
        let scorer = OpportunityScorer::new();
        let post = post("nothing here", 10, NOW - 10 * 3600);

        let result = scorer.score_at(&post, &[], Some(&context(5.9)), NOW);
        assert!(result
            .explanation
            .iter()
            .any(|l| l.contains("Moderate posting velocity (5.9 posts/hr) (+8)")));
    }

    #[test]
    fn test_determinism_and_bounds() {
        let scorer = OpportunityScorer::new();
        let post = post("Any good tool for this?", 2, NOW - 30 * 60);
        let context = context(1.5);

        let first = scorer.score_at(&post, &[], Some(&context), NOW);
        let second = scorer.score_at(&post, &[], Some(&context), NOW);
        assert_eq!(first, second);
        assert!(first.score <= 100);
    }

    #[test]
    fn test_custom_weights() {
        let weights = ScoringWeights {
            intent_per_match: 30,
            intent_cap: 30,
            ..Default::default()
        };
        let scorer = OpportunityScorer::with_weights(weights);
        let post = post("Best tool around", 20, NOW - 10 * 3600);

        let result = scorer.score_at(&post, &[], None, NOW);
        assert_eq!(result.score, 30);
        assert!(result.explanation[0].contains("(+30)"));
    }
}
