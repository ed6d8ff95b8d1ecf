use anyhow::{ensure, Context, Result};
use serde::{Deserialize, Serialize};

use crate::model::{BlockKind, Priority};
use crate::repair::Candidate;
use crate::time;

pub const DEFAULT_MODEL: &str = "google/gemini-3-flash-preview";
pub const DEFAULT_API_KEY_ENV: &str = "OPENROUTER_API_KEY";

/// System prompt for an LLM that turns a free-form description of a day into
/// timed blocks.
///
/// The schedule builder will:
/// 1) Validate the blocks and fall back to local extraction if they are unusable.
/// 2) Sort and de-overlap them, so the model does not need to be exact.
pub const DAY_SCHEDULE_SYSTEM_PROMPT: &str = r#"You are a planning assistant that turns a description of someone's day into a schedule.

Goal
- Read the user's description and produce the activities of one 24-hour day.
- Keep times the user states explicitly. Place everything else at sensible times.
- Include sleep, meals and short breaks when the user works long hours, unless they say they do not want breaks.

Output format (STRICT)
- Output ONLY valid JSON. No markdown, no surrounding prose, no code fences.
- Output MUST be a JSON object with a single key "blocks" holding an array.
- Each array element MUST be an object with exactly these keys:
  - "title": string, short and human-readable
  - "startTime": string, 24-hour "HH:MM"
  - "endTime": string, 24-hour "HH:MM"; may be earlier than startTime only for activities that cross midnight (such as sleep)
  - "type": one of "work", "exercise", "sleep", "meal", "break", "personal", "commute", "wellness"
  - "priority": one of "low", "medium", "high", or null
  - "description": string or null
- No additional keys are allowed.

Hard constraints
- Every block MUST last at least 5 minutes.
- Blocks SHOULD NOT overlap.
- Return fewer blocks rather than inventing activities the user did not ask for, except sleep, meals and breaks.
"#;

/// JSON Schema for `DAY_SCHEDULE_SYSTEM_PROMPT` output.
///
/// Many LLM APIs can enforce this schema via structured outputs.
pub const DAY_SCHEDULE_JSON_SCHEMA: &str = r#"{
  "type": "object",
  "additionalProperties": false,
  "required": ["blocks"],
  "properties": {
    "blocks": {
      "type": "array",
      "items": {
        "type": "object",
        "additionalProperties": false,
        "required": ["title", "startTime", "endTime", "type", "priority", "description"],
        "properties": {
          "title": { "type": "string" },
          "startTime": { "type": "string" },
          "endTime": { "type": "string" },
          "type": {
            "type": "string",
            "enum": ["work", "exercise", "sleep", "meal", "break", "personal", "commute", "wellness"]
          },
          "priority": { "type": ["string", "null"], "enum": ["low", "medium", "high", null] },
          "description": { "type": ["string", "null"] }
        }
      }
    }
  }
}"#;

/// One block as returned by the intent service, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedBlock {
    pub title: String,
    pub start_time: String,
    pub end_time: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ParsedDay {
    pub blocks: Vec<ParsedBlock>,
}

fn parse_priority(raw: &str) -> Option<Priority> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "low" => Some(Priority::Low),
        "medium" => Some(Priority::Medium),
        "high" => Some(Priority::High),
        _ => None,
    }
}

pub fn validate_parsed_day(day: &ParsedDay) -> Result<()> {
    ensure!(!day.blocks.is_empty(), "schedule must contain at least one block");

    for (idx, block) in day.blocks.iter().enumerate() {
        ensure!(
            !block.title.trim().is_empty(),
            "block {idx}: title must not be empty"
        );
        let start = time::time_to_minutes(&block.start_time)
            .with_context(|| format!("block {idx}: invalid startTime"))?;
        let end = time::time_to_minutes(&block.end_time)
            .with_context(|| format!("block {idx}: invalid endTime"))?;
        ensure!(start != end, "block {idx}: startTime and endTime must differ");
        ensure!(
            BlockKind::parse(&block.kind).is_some(),
            "block {idx}: unknown type {:?}",
            block.kind
        );
        if let Some(priority) = &block.priority {
            ensure!(
                parse_priority(priority).is_some(),
                "block {idx}: unknown priority {priority:?}"
            );
        }
    }

    Ok(())
}

impl ParsedDay {
    /// Validates the day and converts it into repair candidates.
    pub fn to_candidates(&self) -> Result<Vec<Candidate>> {
        validate_parsed_day(self)?;

        self.blocks
            .iter()
            .map(|block| -> Result<Candidate> {
                let start = time::time_to_minutes(&block.start_time)?;
                let end = time::time_to_minutes(&block.end_time)?;
                let kind = BlockKind::parse(&block.kind)
                    .with_context(|| format!("unknown type {:?}", block.kind))?;
                let mut candidate =
                    Candidate::new(block.title.trim(), kind, start).with_end(end);
                candidate.priority = block.priority.as_deref().and_then(parse_priority);
                candidate.description = block
                    .description
                    .as_deref()
                    .map(str::trim)
                    .filter(|d| !d.is_empty())
                    .map(str::to_string);
                Ok(candidate)
            })
            .collect()
    }
}

/// The external text-to-schedule collaborator.
#[allow(async_fn_in_trait)]
pub trait IntentParser {
    async fn parse_day(&self, text: &str) -> Result<ParsedDay>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,
    /// Environment variable holding the OpenRouter API key.
    pub api_key_env: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
        }
    }
}

impl LlmConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(!self.model.trim().is_empty(), "llm.model must not be empty");
        ensure!(
            !self.api_key_env.trim().is_empty(),
            "llm.api_key_env must not be empty"
        );
        Ok(())
    }
}

#[cfg(feature = "llm")]
pub mod openrouter {
    use super::*;

    use anyhow::{Context, Result};
    use async_openai::{
        config::OpenAIConfig,
        types::chat::{
            ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
            CreateChatCompletionRequestArgs, CreateChatCompletionResponse, ResponseFormat,
            ResponseFormatJsonSchema,
        },
        Client,
    };
    use serde::de::DeserializeOwned;
    use serde_json::Value;
    use std::time::Duration;
    use tokio::time::sleep;
    use tracing::{debug, warn};

    const OPENROUTER_API_BASE: &str = "https://openrouter.ai/api/v1";

    #[derive(Debug, Clone)]
    pub struct OpenRouterIntentParser {
        client: Client<OpenAIConfig>,
        model: String,
        response_format: ResponseFormat,
    }

    impl OpenRouterIntentParser {
        pub fn from_env() -> Result<Self> {
            Self::from_config(&LlmConfig::default())
        }

        /// Reads the API key from the configured environment variable
        /// (a `.env` file is honoured) and applies the configured model.
        pub fn from_config(config: &LlmConfig) -> Result<Self> {
            dotenvy::dotenv().ok();
            let api_key = std::env::var(&config.api_key_env)
                .with_context(|| format!("{} is not set", config.api_key_env))?;
            Ok(Self::new(api_key)?.with_model(config.model.clone()))
        }

        pub fn new(api_key: impl Into<String>) -> Result<Self> {
            let schema: Value = serde_json::from_str(DAY_SCHEDULE_JSON_SCHEMA)
                .context("DAY_SCHEDULE_JSON_SCHEMA must be valid JSON")?;

            let config = OpenAIConfig::new()
                .with_api_key(api_key.into())
                .with_api_base(OPENROUTER_API_BASE);

            // OpenRouter encourages these headers; set them to your app.
            let config = config
                .with_header("HTTP-Referer", "https://github.com")
                .context("failed to set HTTP-Referer header")?;
            let config = config
                .with_header("X-Title", "dayflow")
                .context("failed to set X-Title header")?;

            let response_format = ResponseFormat::JsonSchema {
                json_schema: ResponseFormatJsonSchema {
                    name: "daily_schedule".to_string(),
                    description: None,
                    schema: Some(schema),
                    strict: Some(true),
                },
            };

            Ok(Self {
                client: Client::with_config(config),
                model: DEFAULT_MODEL.to_string(),
                response_format,
            })
        }

        pub fn with_model(mut self, model: impl Into<String>) -> Self {
            self.model = model.into();
            self
        }

        pub fn model(&self) -> &str {
            &self.model
        }
    }

    impl IntentParser for OpenRouterIntentParser {
        async fn parse_day(&self, text: &str) -> Result<ParsedDay> {
            request_day_with_retry(self, text).await
        }
    }

    async fn request_day_with_retry(
        client: &OpenRouterIntentParser,
        text: &str,
    ) -> Result<ParsedDay> {
        let retry_delays = [Duration::from_secs(0), Duration::from_secs(10)];

        let mut attempt = 0usize;
        loop {
            match request_day_once(client, text).await {
                Ok(day) => return Ok(day),
                Err(err) => {
                    if attempt >= retry_delays.len() {
                        return Err(err).context("LLM request failed after retries");
                    }

                    let delay = retry_delays[attempt];
                    attempt += 1;
                    warn!(
                        target: "dayflow::llm",
                        attempt,
                        error = %format!("{err:#}"),
                        "schedule request failed; retrying"
                    );
                    if delay > Duration::from_secs(0) {
                        sleep(delay).await;
                    }
                }
            }
        }
    }

    async fn request_day_once(client: &OpenRouterIntentParser, text: &str) -> Result<ParsedDay> {
        let user_prompt = build_user_prompt(text);

        let request = CreateChatCompletionRequestArgs::default()
            .model(client.model.as_str())
            .messages([
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(DAY_SCHEDULE_SYSTEM_PROMPT)
                    .build()?
                    .into(),
                ChatCompletionRequestUserMessageArgs::default()
                    .content(user_prompt)
                    .build()?
                    .into(),
            ])
            .response_format(client.response_format.clone())
            .temperature(0.0)
            .build()
            .context("failed to build OpenRouter request")?;

        debug!(target: "dayflow::llm", model = %client.model, "requesting schedule");
        let response = client
            .client
            .chat()
            .create(request)
            .await
            .context("OpenRouter chat completion request failed")?;

        let day: ParsedDay =
            parse_chat_completion_json(&response).context("failed to parse structured output")?;
        validate_parsed_day(&day).context("LLM output failed validation")?;
        Ok(day)
    }

    fn parse_chat_completion_json<T: DeserializeOwned>(
        response: &CreateChatCompletionResponse,
    ) -> Result<T> {
        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .context("missing choices[0].message.content")?;

        serde_json::from_str::<T>(content.trim()).context("assistant content is not valid JSON")
    }

    fn build_user_prompt(text: &str) -> String {
        format!("Description of the day:\n{text}\n\nReturn ONLY the JSON object.")
    }
}

#[cfg(not(feature = "llm"))]
pub mod openrouter {
    use super::*;

    use anyhow::{anyhow, Result};

    #[derive(Debug, Clone)]
    pub struct OpenRouterIntentParser;

    impl OpenRouterIntentParser {
        pub fn from_env() -> Result<Self> {
            Err(anyhow!(
                "LLM support is disabled (build with --features llm)"
            ))
        }

        pub fn from_config(_config: &LlmConfig) -> Result<Self> {
            Self::from_env()
        }

        pub fn new(_api_key: impl Into<String>) -> Result<Self> {
            Self::from_env()
        }

        pub fn with_model(self, _model: impl Into<String>) -> Self {
            self
        }

        pub fn model(&self) -> &str {
            DEFAULT_MODEL
        }
    }

    impl IntentParser for OpenRouterIntentParser {
        async fn parse_day(&self, _text: &str) -> Result<ParsedDay> {
            Err(anyhow!(
                "LLM support is disabled (build with --features llm)"
            ))
        }
    }
}
