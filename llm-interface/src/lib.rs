pub mod prompt;

pub use prompt::{build_prompt, AssembledPrompt};

use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use threadscout_core::{CoreError, LlmError};
use tracing::{debug, error, warn};

const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
const PROVIDER_NAME: &str = "openai";
const DEFAULT_MODEL: &str = "gpt-4o";

/// A completion service that turns an assembled prompt into reply text.
/// One attempt per call: generation is user-initiated and potentially
/// paid, so retry decisions belong to the user, not this layer.
pub trait CompletionProvider {
    async fn complete(&self, prompt: &AssembledPrompt) -> Result<String, CoreError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default = "Vec::new")]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct OpenAiProvider {
    api_key: String,
    model: String,
    base_url: String,
    http_client: Client,
}

impl OpenAiProvider {
    pub fn new(api_key: String) -> Self {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            api_key,
            model: DEFAULT_MODEL.to_string(),
            base_url: OPENAI_API_BASE.to_string(),
            http_client,
        }
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    /// Override the API endpoint. Used by tests and proxied deployments.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    async fn chat(
        &self,
        system: &str,
        user: &str,
        temperature: f32,
        max_tokens: u32,
    ) -> Result<String, CoreError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature,
            max_tokens,
        };

        let url = format!("{}/chat/completions", self.base_url);
        debug!("Requesting completion from {} ({})", PROVIDER_NAME, self.model);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Completion request failed: {}", e);
                if e.is_timeout() {
                    CoreError::Llm(LlmError::RequestTimeout {
                        provider: PROVIDER_NAME.to_string(),
                    })
                } else {
                    CoreError::Network(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            error!("Completion request returned status {}", status);
            return Err(CoreError::Llm(map_error_status(
                status.as_u16(),
                response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok()),
            )));
        }

        let completion: ChatResponse = response.json().await.map_err(|e| {
            error!("Failed to parse completion response: {}", e);
            CoreError::Llm(LlmError::InvalidResponseFormat {
                provider: PROVIDER_NAME.to_string(),
            })
        })?;

        let text = completion
            .choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
            .map(str::trim)
            .unwrap_or_default();

        if text.is_empty() {
            return Err(CoreError::Llm(LlmError::EmptyCompletion {
                provider: PROVIDER_NAME.to_string(),
            }));
        }

        Ok(text.to_string())
    }

    /// Suggest up to five communities worth scanning for a product, from
    /// its URL and keywords. A convenience helper, not a pipeline stage:
    /// failures degrade to an empty list.
    pub async fn suggest_communities(&self, product_url: &str, keywords: &[String]) -> Vec<String> {
        let system = "You are a Reddit expert. Your task is to suggest relevant subreddits \
             where people discuss problems, tools, alternatives, and recommendations related \
             to a given website and its keywords.\n\n\
             Constraints:\n\
             - Return ONLY subreddit names\n\
             - No \"r/\" prefix\n\
             - Lowercase\n\
             - Max 5 subreddits\n\
             - Min 1 subreddit if confident\n\
             - Prefer well-known, active subreddits\n\
             - Avoid niche or dead subreddits\n\
             - Output as a comma-separated list";

        let user = format!(
            "Website URL: {}\nKeywords: {}\n\nSuggest relevant subreddits:",
            product_url,
            keywords.join(", ")
        );

        match self.chat(system, &user, 0.5, 300).await {
            Ok(content) => parse_community_list(&content),
            Err(e) => {
                warn!("Community suggestion failed: {}", e);
                Vec::new()
            }
        }
    }
}

impl CompletionProvider for OpenAiProvider {
    async fn complete(&self, prompt: &AssembledPrompt) -> Result<String, CoreError> {
        // Balanced creativity for natural responses; room for long replies
        self.chat(
            &prompt.system_instructions,
            &prompt.user_instructions,
            0.8,
            1000,
        )
        .await
    }
}

fn map_error_status(status_code: u16, retry_after: Option<u64>) -> LlmError {
    match status_code {
        401 | 403 => LlmError::InvalidApiKey {
            provider: PROVIDER_NAME.to_string(),
        },
        429 => LlmError::RateLimitExceeded {
            provider: PROVIDER_NAME.to_string(),
            retry_after: retry_after.unwrap_or(60),
        },
        404 => LlmError::ModelNotAvailable {
            model: DEFAULT_MODEL.to_string(),
        },
        code if code >= 500 => LlmError::ServiceUnavailable {
            provider: PROVIDER_NAME.to_string(),
        },
        _ => LlmError::InvalidResponseFormat {
            provider: PROVIDER_NAME.to_string(),
        },
    }
}

/// Parse a comma-separated community list, dropping prefixes and noise.
fn parse_community_list(content: &str) -> Vec<String> {
    content
        .split(',')
        .map(|name| {
            let name = name.trim().to_lowercase();
            let name = name.strip_prefix("/r/").unwrap_or(&name);
            name.strip_prefix("r/").unwrap_or(name).to_string()
        })
        .filter(|name| !name.is_empty())
        .take(5)
        .collect()
}
