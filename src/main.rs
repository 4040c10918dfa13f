use feed_client::FeedClient;
use llm_interface::OpenAiProvider;
use scan_pipeline::Pipeline;
use std::path::Path;
use threadscout_core::{AppConfig, ConfigError, CoreError, ErrorExt};

const USAGE: &str = "\
Usage: threadscout <communities> [options]

  <communities>            comma-separated community names, e.g. startups,SaaS

Options:
  --hours <n>              lookback window in hours (default from config: 24)
  --keywords <a,b,c>       intent keywords; omit to use the built-in set
  --config <path>          TOML config file
  --draft                  draft a reply for the top opportunity
  --instructions <text>    extra instructions for the drafted reply";

#[tokio::main]
async fn main() -> Result<(), CoreError> {
    tracing_subscriber::fmt()
        .with_env_filter("threadscout=info,feed_client=info,scan_pipeline=info")
        .init();

    tracing::info!("Starting Threadscout - community opportunity scanner");

    let options = match CliOptions::parse(std::env::args().skip(1)) {
        Ok(options) => options,
        Err(e) => {
            eprintln!("{}", e.user_friendly_message());
            eprintln!("\n{}", USAGE);
            return Err(e);
        }
    };
    if options.help {
        println!("{}", USAGE);
        return Ok(());
    }

    let config = match &options.config_path {
        Some(path) => AppConfig::load(Path::new(path))?,
        None => {
            let mut config = AppConfig::default();
            config.apply_env();
            config
        }
    };

    let communities = if options.communities.is_empty() {
        config.communities.clone()
    } else {
        options.communities.clone()
    };
    if communities.is_empty() {
        let e = CoreError::InvalidInput {
            message: "no communities given; pass a comma-separated list or set them in the config"
                .to_string(),
        };
        eprintln!("{}", e.user_friendly_message());
        eprintln!("\n{}", USAGE);
        return Err(e);
    }
    let lookback_hours = options.hours.unwrap_or(config.lookback_hours);
    let keywords = if options.keywords.is_empty() {
        config.keywords.clone()
    } else {
        options.keywords.clone()
    };

    let client = FeedClient::new(&config.user_agent);
    let pipeline = Pipeline::new(client);

    let opportunities = pipeline
        .scan(&communities, lookback_hours, &keywords)
        .await
        .map_err(|e| {
            e.log_error();
            e
        })?;

    if opportunities.is_empty() {
        println!("No opportunities found in the last {}h.", lookback_hours);
        return Ok(());
    }

    println!(
        "{} opportunities, ranked by score:\n",
        opportunities.len()
    );
    for opportunity in &opportunities {
        println!(
            "[{:>3}] r/{}  {}  {} comments  {} ups",
            opportunity.score,
            opportunity.post.community,
            opportunity.post_age,
            opportunity.post.num_comments,
            opportunity.formatted_ups
        );
        println!("      {}", opportunity.post.title);
        for line in &opportunity.explanation {
            println!("        - {}", line);
        }
        println!();
    }

    if options.draft {
        let top = &opportunities[0];
        let api_key = config.openai_api_key.clone().ok_or(CoreError::Config(
            ConfigError::MissingEnvironmentVariable {
                var_name: "OPENAI_API_KEY".to_string(),
            },
        ))?;
        let provider = OpenAiProvider::new(api_key);

        let reply = pipeline
            .draft_reply(
                top,
                config.intent,
                config.persona,
                config.length,
                options.instructions.clone(),
                &provider,
            )
            .await
            .map_err(|e| {
                e.log_error();
                e
            })?;

        println!("--- Draft reply for \"{}\" ---", top.post.title);
        if !reply.grounding_used {
            println!("(no grounding samples were available; style is ungrounded)");
        }
        println!("{}", reply.text);
    }

    Ok(())
}

#[derive(Debug, Default)]
struct CliOptions {
    communities: Vec<String>,
    hours: Option<i64>,
    keywords: Vec<String>,
    config_path: Option<String>,
    instructions: Option<String>,
    draft: bool,
    help: bool,
}

impl CliOptions {
    fn parse(args: impl Iterator<Item = String>) -> Result<Self, CoreError> {
        let mut options = CliOptions::default();
        let mut args = args;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--help" | "-h" => options.help = true,
                "--draft" => options.draft = true,
                "--hours" => {
                    let value = args.next().ok_or_else(|| missing_value("--hours"))?;
                    options.hours =
                        Some(value.parse::<i64>().map_err(|_| CoreError::InvalidInput {
                            message: format!("--hours expects a number, got '{}'", value),
                        })?);
                }
                "--keywords" => {
                    let value = args.next().ok_or_else(|| missing_value("--keywords"))?;
                    options.keywords = split_list(&value);
                }
                "--config" => {
                    options.config_path =
                        Some(args.next().ok_or_else(|| missing_value("--config"))?);
                }
                "--instructions" => {
                    options.instructions =
                        Some(args.next().ok_or_else(|| missing_value("--instructions"))?);
                }
                flag if flag.starts_with("--") => {
                    return Err(CoreError::InvalidInput {
                        message: format!("unknown option '{}'", flag),
                    });
                }
                positional => {
                    options.communities.extend(split_list(positional));
                }
            }
        }

        Ok(options)
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

fn missing_value(flag: &str) -> CoreError {
    CoreError::InvalidInput {
        message: format!("{} requires a value", flag),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliOptions {
        CliOptions::parse(args.iter().map(|s| s.to_string())).unwrap()
    }

    #[test]
    fn test_parse_communities_and_flags() {
        let options = parse(&["startups,SaaS", "--hours", "48", "--keywords", "tool,alternative"]);
        assert_eq!(options.communities, vec!["startups", "SaaS"]);
        assert_eq!(options.hours, Some(48));
        assert_eq!(options.keywords, vec!["tool", "alternative"]);
        assert!(!options.draft);
    }

    #[test]
    fn test_parse_draft_and_instructions() {
        let options = parse(&["rust", "--draft", "--instructions", "be brief"]);
        assert!(options.draft);
        assert_eq!(options.instructions.as_deref(), Some("be brief"));
    }

    #[test]
    fn test_parse_rejects_unknown_flag() {
        let result = CliOptions::parse(["--frobnicate".to_string()].into_iter());
        assert!(matches!(result, Err(CoreError::InvalidInput { .. })));
    }

    #[test]
    fn test_parse_rejects_bad_hours() {
        let result =
            CliOptions::parse(["rust".to_string(), "--hours".to_string(), "soon".to_string()].into_iter());
        assert!(matches!(result, Err(CoreError::InvalidInput { .. })));
    }
}
