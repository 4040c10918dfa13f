use crate::error::{ConfigError, CoreError};
use serde::Deserialize;
use std::path::Path;

/// A normalized post from a community feed. Immutable once built by the
/// feed normalizer; everything downstream reads it as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    pub id: String,
    pub title: String,
    pub body: String,
    pub community: String,
    pub permalink: String,
    pub created_utc: i64,
    pub num_comments: u32,
    pub ups: u32,
}

/// Posting activity observed for one community during a scan window.
#[derive(Debug, Clone, PartialEq)]
pub struct CommunityContext {
    pub community: String,
    pub posts_in_window: u32,
    pub avg_posts_per_hour: f64,
}

/// Score plus the ordered list of rule explanations that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringResult {
    pub score: u8,
    pub explanation: Vec<String>,
}

/// A scored post ready for display. Lives for one scan session.
#[derive(Debug, Clone)]
pub struct Opportunity {
    pub post: Post,
    pub score: u8,
    pub explanation: Vec<String>,
    pub post_age: String,
    pub formatted_ups: String,
}

impl Opportunity {
    pub fn new(post: Post, result: ScoringResult, now: i64) -> Self {
        let post_age = age_bucket(post.created_utc, now);
        let formatted_ups = format_count(post.ups);
        Self {
            post,
            score: result.score,
            explanation: result.explanation,
            post_age,
            formatted_ups,
        }
    }
}

/// Human-readable age bucket for display ("42m ago", "3h ago", "2d ago").
pub fn age_bucket(created_utc: i64, now: i64) -> String {
    let age_secs = (now - created_utc).max(0);
    if age_secs < 60 {
        "just now".to_string()
    } else if age_secs < 3600 {
        format!("{}m ago", age_secs / 60)
    } else if age_secs < 86400 {
        format!("{}h ago", age_secs / 3600)
    } else {
        format!("{}d ago", age_secs / 86400)
    }
}

/// Compact count formatting for display ("842", "1.2k", "3.4m").
pub fn format_count(count: u32) -> String {
    if count >= 1_000_000 {
        format!("{:.1}m", count as f64 / 1_000_000.0)
    } else if count >= 1_000 {
        format!("{:.1}k", count as f64 / 1_000.0)
    } else {
        count.to_string()
    }
}

/// Strategic posture of a generated reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReplyIntent {
    HelpFirst,
    SoftCredibility,
    ConversionAware,
}

impl ReplyIntent {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReplyIntent::HelpFirst => "help-first",
            ReplyIntent::SoftCredibility => "soft-credibility",
            ReplyIntent::ConversionAware => "conversion-aware",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "help-first" => Some(ReplyIntent::HelpFirst),
            "soft-credibility" => Some(ReplyIntent::SoftCredibility),
            "conversion-aware" => Some(ReplyIntent::ConversionAware),
            _ => None,
        }
    }
}

/// Voice the generated reply is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Persona {
    NeutralPeer,
    ExperiencedPractitioner,
    CuriousCollaborator,
    BuilderIndieHacker,
    LightAuthority,
}

impl Persona {
    pub fn as_str(&self) -> &'static str {
        match self {
            Persona::NeutralPeer => "neutral-peer",
            Persona::ExperiencedPractitioner => "experienced-practitioner",
            Persona::CuriousCollaborator => "curious-collaborator",
            Persona::BuilderIndieHacker => "builder-indie-hacker",
            Persona::LightAuthority => "light-authority",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "neutral-peer" => Some(Persona::NeutralPeer),
            "experienced-practitioner" => Some(Persona::ExperiencedPractitioner),
            "curious-collaborator" => Some(Persona::CuriousCollaborator),
            "builder-indie-hacker" => Some(Persona::BuilderIndieHacker),
            "light-authority" => Some(Persona::LightAuthority),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReplyLength {
    Short,
    Medium,
    Long,
}

impl ReplyLength {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReplyLength::Short => "short",
            ReplyLength::Medium => "medium",
            ReplyLength::Long => "long",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "short" => Some(ReplyLength::Short),
            "medium" => Some(ReplyLength::Medium),
            "long" => Some(ReplyLength::Long),
            _ => None,
        }
    }
}

/// Everything the prompt assembler needs for one reply. Built once per
/// generate request, never mutated afterwards.
#[derive(Debug, Clone)]
pub struct PromptSpec {
    pub title: String,
    pub body: String,
    pub intent: ReplyIntent,
    pub persona: Persona,
    pub length: ReplyLength,
    pub instructions: Option<String>,
    pub style_examples: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DraftedReply {
    pub text: String,
    pub grounding_used: bool,
}

/// Application defaults, passed explicitly into the pipeline. No globals.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default)]
    pub communities: Vec<String>,
    #[serde(default = "default_lookback_hours")]
    pub lookback_hours: i64,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default = "default_persona")]
    pub persona: Persona,
    #[serde(default = "default_length")]
    pub length: ReplyLength,
    #[serde(default = "default_intent")]
    pub intent: ReplyIntent,
    #[serde(default)]
    pub openai_api_key: Option<String>,
}

fn default_user_agent() -> String {
    "threadscout/0.1 (community post monitoring)".to_string()
}

fn default_lookback_hours() -> i64 {
    24
}

fn default_persona() -> Persona {
    Persona::NeutralPeer
}

fn default_length() -> ReplyLength {
    ReplyLength::Medium
}

fn default_intent() -> ReplyIntent {
    ReplyIntent::HelpFirst
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            communities: Vec::new(),
            lookback_hours: default_lookback_hours(),
            keywords: Vec::new(),
            persona: default_persona(),
            length: default_length(),
            intent: default_intent(),
            openai_api_key: None,
        }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let raw = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;
        let mut config: AppConfig = toml::from_str(&raw).map_err(ConfigError::Parse)?;
        config.apply_env();
        Ok(config)
    }

    /// Environment overrides for values that should not live in a file.
    pub fn apply_env(&mut self) {
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            if !key.is_empty() {
                self.openai_api_key = Some(key);
            }
        }
    }
}
